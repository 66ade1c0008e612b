/// Task-group coordinator
///
/// For each layout the coordinator starts one task per metric domain plus an
/// input task, a process-view task and a frame-flush task. A resize, a manual
/// refresh or a quit request cancels the whole group and waits for every task to
/// finish before the next layout is used. Providers and the input handler live
/// outside the group so their state carries over.

pub mod surface;
pub mod task;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event};
use parking_lot::Mutex;
use ratatui::{backend::Backend, Terminal};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::core::config::{DashboardConfig, TermSize};
use crate::core::cpu::CpuSnapshot;
use crate::core::memory::MemorySnapshot;
use crate::core::network::NetworkSnapshot;
use crate::core::processes::{ProcessControl, ProcessList};
use crate::core::provider::SharedProvider;
use crate::core::system_info::SystemSnapshot;
use crate::input::{Action, InputHandler, UiState};
use crate::screens::dashboard::DashboardRenderer;
use crate::screens::layout::{Layout, LayoutEngine, SectionId};

pub use surface::DisplaySurface;
pub use task::DomainTask;

/// Consecutive terminal read/draw failures tolerated before giving up
const MAX_TERMINAL_FAILURES: u32 = 50;

/// Requests that end the current task group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Resize,
    Refresh,
    Quit,
}

/// What the coordinator is doing right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Starting,
    Running(TermSize),
    SizeWarning(TermSize),
    Stopped,
}

/// Source of terminal events, polled without blocking
pub trait EventSource: Send + 'static {
    fn poll_event(&mut self) -> io::Result<Option<Event>>;
}

pub struct CrosstermEvents;

impl EventSource for CrosstermEvents {
    fn poll_event(&mut self) -> io::Result<Option<Event>> {
        if event::poll(Duration::ZERO)? {
            Ok(Some(event::read()?))
        } else {
            Ok(None)
        }
    }
}

pub struct ProviderSet {
    pub system: SharedProvider<SystemSnapshot>,
    pub cpu: SharedProvider<CpuSnapshot>,
    pub memory: SharedProvider<MemorySnapshot>,
    pub network: SharedProvider<NetworkSnapshot>,
    pub processes: SharedProvider<ProcessList>,
}

pub struct Coordinator<B: Backend> {
    config: DashboardConfig,
    engine: LayoutEngine,
    renderer: DashboardRenderer,
    providers: ProviderSet,
    terminal: Arc<Mutex<Terminal<B>>>,
    surface: Arc<DisplaySurface>,
    events: Arc<tokio::sync::Mutex<Box<dyn EventSource>>>,
    input: Arc<tokio::sync::Mutex<InputHandler>>,
    ui: watch::Receiver<UiState>,
    processes: Arc<watch::Sender<ProcessList>>,
    phase: watch::Sender<Phase>,
    groups: watch::Sender<u64>,
}

impl<B: Backend + Send + 'static> Coordinator<B> {
    pub fn new(
        config: DashboardConfig,
        engine: LayoutEngine,
        providers: ProviderSet,
        control: Arc<dyn ProcessControl>,
        terminal: Terminal<B>,
        events: Box<dyn EventSource>,
    ) -> Self {
        let (processes, processes_rx) = watch::channel(ProcessList::default());
        let input = InputHandler::new(control, processes_rx);
        let ui = input.subscribe();
        let (phase, _) = watch::channel(Phase::Starting);
        let (groups, _) = watch::channel(0);

        Self {
            renderer: DashboardRenderer::new(config.thresholds),
            config,
            engine,
            providers,
            terminal: Arc::new(Mutex::new(terminal)),
            surface: Arc::new(DisplaySurface::new(TermSize::new(0, 0))),
            events: Arc::new(tokio::sync::Mutex::new(events)),
            input: Arc::new(tokio::sync::Mutex::new(input)),
            ui,
            processes: Arc::new(processes),
            phase,
            groups,
        }
    }

    pub fn terminal(&self) -> Arc<Mutex<Terminal<B>>> {
        self.terminal.clone()
    }

    pub fn phase(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    /// Number of task groups started so far
    pub fn groups(&self) -> watch::Receiver<u64> {
        self.groups.subscribe()
    }

    fn terminal_size(&self) -> Result<TermSize> {
        let area = self.terminal.lock().size().context("Failed to read terminal size")?;
        Ok(TermSize::new(area.width, area.height))
    }

    /// Run task groups until a quit request
    pub async fn run(self) -> Result<()> {
        let (signal_tx, mut signal_rx) = mpsc::unbounded_channel();

        let interrupt_tx = signal_tx.clone();
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = interrupt_tx.send(Signal::Quit);
            }
        });

        let result = self.run_groups(&signal_tx, &mut signal_rx).await;

        interrupt.abort();
        self.phase.send_replace(Phase::Stopped);
        info!("coordinator stopped");
        result
    }

    async fn run_groups(
        &self,
        signal_tx: &mpsc::UnboundedSender<Signal>,
        signal_rx: &mut mpsc::UnboundedReceiver<Signal>,
    ) -> Result<()> {
        loop {
            let size = self.terminal_size()?;
            let layout = match self.engine.compute(size.height, size.width) {
                Ok(layout) => Arc::new(layout),
                Err(e) => {
                    info!(error = %e, "terminal below minimum size");
                    if self.size_warning(size, signal_rx).await? == Signal::Quit {
                        return Ok(());
                    }
                    continue;
                }
            };

            let mut group = self.spawn_group(layout.clone(), signal_tx.clone()).await;
            self.phase.send_replace(Phase::Running(size));

            let signal = loop {
                tokio::select! {
                    signal = signal_rx.recv() => break signal.unwrap_or(Signal::Quit),
                    Some(joined) = group.join_next() => log_join(joined),
                }
            };

            cancel(&mut group).await;
            info!(width = size.width, height = size.height, ?signal, "task group stopped");

            match signal {
                Signal::Quit => return Ok(()),
                Signal::Refresh => {
                    self.terminal.lock().clear().context("Failed to clear terminal")?;
                }
                Signal::Resize => {
                    tokio::time::sleep(self.config.cadence.resize_debounce).await;
                    // Coalesce the burst of resize events a drag produces
                    while let Ok(pending) = signal_rx.try_recv() {
                        if pending == Signal::Quit {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    /// Show the warning until the terminal is big enough or the user quits
    async fn size_warning(
        &self,
        mut size: TermSize,
        signal_rx: &mut mpsc::UnboundedReceiver<Signal>,
    ) -> Result<Signal> {
        let min = self.engine.minimum_size();
        self.phase.send_replace(Phase::SizeWarning(size));
        let mut failures = 0;

        loop {
            self.surface.reset(size);
            let renderer = self.renderer;
            self.surface
                .draw(self.surface.area(), |buf| renderer.size_warning(size, min, buf))?;

            let polled = self.flush().and_then(|_| self.poll_quit_keys_now());
            match polled {
                Ok(true) => return Ok(Signal::Quit),
                Ok(false) => failures = 0,
                Err(e) => {
                    failures += 1;
                    warn!(error = %e, failures, "size warning refresh failed");
                    if failures >= MAX_TERMINAL_FAILURES {
                        return Err(e).context("Terminal keeps failing");
                    }
                }
            }

            tokio::select! {
                signal = signal_rx.recv() => {
                    if signal.unwrap_or(Signal::Quit) == Signal::Quit {
                        return Ok(Signal::Quit);
                    }
                }
                _ = tokio::time::sleep(self.config.cadence.size_warning_poll) => {}
            }

            let current = self.terminal_size()?;
            if current.fits(min) {
                info!(width = current.width, height = current.height, "terminal large enough again");
                return Ok(Signal::Resize);
            }
            if current != size {
                size = current;
                self.phase.send_replace(Phase::SizeWarning(size));
            }
        }
    }

    /// Drain pending events while no input task runs; only quit keys matter
    fn poll_quit_keys_now(&self) -> io::Result<bool> {
        // No group is running, so nothing else holds the event source
        let Ok(mut events) = self.events.try_lock() else {
            return Ok(false);
        };
        while let Some(event) = events.poll_event()? {
            if let Event::Key(key) = event {
                if Action::from_key(key) == Some(Action::Quit) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn flush(&self) -> io::Result<()> {
        let surface = self.surface.clone();
        let mut terminal = self.terminal.lock();
        terminal.draw(|frame| surface.copy_into(frame.buffer_mut()))?;
        Ok(())
    }

    async fn spawn_group(&self, layout: Arc<Layout>, signals: mpsc::UnboundedSender<Signal>) -> JoinSet<()> {
        let size = layout.size();
        info!(width = size.width, height = size.height, "starting task group");
        self.groups.send_modify(|started| *started += 1);

        self.surface.reset(size);
        let renderer = self.renderer;
        for section in layout.sections() {
            let drawn = self.surface.draw(section.area(), |buf| {
                match section.id {
                    SectionId::Instructions => renderer.instructions(section, buf),
                    // Stays up until the first lookup succeeds
                    SectionId::System => renderer.unavailable(section, "Collecting system information...", buf),
                    _ => {
                        renderer.frame(section, buf);
                    }
                }
            });
            if let Err(e) = drawn {
                debug!(error = %e, "section frame skipped");
            }
        }

        {
            let mut input = self.input.lock().await;
            input.set_visible_rows(layout.process_rows());
            input.publish();
        }

        let cadence = &self.config.cadence;
        let mut group = JoinSet::new();

        let section = layout.section(SectionId::System);
        let surface = self.surface.clone();
        group.spawn(
            DomainTask::new("system", self.providers.system.clone(), cadence.system_info, cadence.system_info_retry)
                .run(move |info: SystemSnapshot| {
                    surface.draw(section.area(), |buf| renderer.system(&section, &info, buf))
                }),
        );

        let section = layout.section(SectionId::Cpu);
        let surface = self.surface.clone();
        group.spawn(
            DomainTask::new("cpu", self.providers.cpu.clone(), cadence.cpu, cadence.error_backoff).run(
                move |cpu: CpuSnapshot| surface.draw(section.area(), |buf| renderer.cpu(&section, &cpu, buf)),
            ),
        );

        let section = layout.section(SectionId::Memory);
        let surface = self.surface.clone();
        group.spawn(
            DomainTask::new("memory", self.providers.memory.clone(), cadence.memory, cadence.error_backoff).run(
                move |memory: MemorySnapshot| {
                    surface.draw(section.area(), |buf| renderer.memory(&section, &memory, buf))
                },
            ),
        );

        let section = layout.section(SectionId::Network);
        let surface = self.surface.clone();
        group.spawn(
            DomainTask::new("network", self.providers.network.clone(), cadence.network, cadence.error_backoff).run(
                move |network: NetworkSnapshot| {
                    surface.draw(section.area(), |buf| renderer.network(&section, &network, buf))
                },
            ),
        );

        let processes = self.processes.clone();
        group.spawn(
            DomainTask::new(
                "processes",
                self.providers.processes.clone(),
                cadence.processes,
                cadence.error_backoff,
            )
            .run(move |list: ProcessList| {
                processes.send_replace(list);
                Ok(())
            }),
        );

        group.spawn(process_view(
            self.surface.clone(),
            renderer,
            layout.clone(),
            self.ui.clone(),
            self.processes.subscribe(),
        ));

        group.spawn(input_loop(
            self.events.clone(),
            self.input.clone(),
            cadence.input,
            signals.clone(),
        ));

        group.spawn(flush_loop(
            self.terminal.clone(),
            self.surface.clone(),
            size,
            cadence.frame,
            signals,
        ));

        group
    }
}

/// Redraw the process panel whenever the list or the UI state changes
async fn process_view(
    surface: Arc<DisplaySurface>,
    renderer: DashboardRenderer,
    layout: Arc<Layout>,
    mut ui: watch::Receiver<UiState>,
    mut processes: watch::Receiver<ProcessList>,
) {
    let section = layout.section(SectionId::Processes);
    loop {
        let state = ui.borrow_and_update().clone();
        let list = processes.borrow_and_update().clone();
        if let Err(e) = surface.draw(section.area(), |buf| renderer.processes(&section, &list, &state, buf)) {
            debug!(error = %e, "process panel skipped");
        }

        tokio::select! {
            changed = ui.changed() => if changed.is_err() { return },
            changed = processes.changed() => if changed.is_err() { return },
        }
    }
}

async fn input_loop(
    events: Arc<tokio::sync::Mutex<Box<dyn EventSource>>>,
    input: Arc<tokio::sync::Mutex<InputHandler>>,
    cadence: Duration,
    signals: mpsc::UnboundedSender<Signal>,
) {
    let mut failures = 0;
    loop {
        let signal = {
            let mut events = events.lock().await;
            let mut input = input.lock().await;

            let mut signal = None;
            loop {
                match events.poll_event() {
                    Ok(Some(event)) => {
                        if let Some(s) = input.handle_event(event) {
                            signal = Some(s);
                            break;
                        }
                    }
                    Ok(None) => {
                        failures = 0;
                        break;
                    }
                    Err(e) => {
                        failures += 1;
                        warn!(error = %e, failures, "terminal event read failed");
                        if failures >= MAX_TERMINAL_FAILURES {
                            signal = Some(Signal::Quit);
                        }
                        break;
                    }
                }
            }

            input.drain_kill_reports();
            input.publish();
            signal
        };

        if let Some(signal) = signal {
            let _ = signals.send(signal);
            return;
        }
        tokio::time::sleep(cadence).await;
    }
}

/// Push the surface to the terminal at a fixed rate; report size changes
async fn flush_loop<B: Backend>(
    terminal: Arc<Mutex<Terminal<B>>>,
    surface: Arc<DisplaySurface>,
    size: TermSize,
    cadence: Duration,
    signals: mpsc::UnboundedSender<Signal>,
) {
    let mut failures = 0;
    loop {
        let flushed = {
            let mut terminal = terminal.lock();
            match terminal.size() {
                Ok(area) if TermSize::new(area.width, area.height) == size => terminal
                    .draw(|frame| surface.copy_into(frame.buffer_mut()))
                    .map(|_| true),
                Ok(_) => Ok(false),
                Err(e) => Err(e),
            }
        };

        match flushed {
            Ok(true) => failures = 0,
            Ok(false) => {
                debug!("terminal size changed under the layout");
                let _ = signals.send(Signal::Resize);
                return;
            }
            Err(e) => {
                // Next tick redraws the whole surface anyway
                failures += 1;
                warn!(error = %e, failures, "frame flush failed");
                if failures >= MAX_TERMINAL_FAILURES {
                    let _ = signals.send(Signal::Quit);
                    return;
                }
            }
        }
        tokio::time::sleep(cadence).await;
    }
}

/// Abort every task and wait until all of them are gone
async fn cancel(group: &mut JoinSet<()>) {
    group.abort_all();
    while let Some(joined) = group.join_next().await {
        log_join(joined);
    }
}

fn log_join(joined: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        if e.is_panic() {
            warn!(error = %e, "task panicked");
        }
    }
}
