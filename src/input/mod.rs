/// Keyboard handling for the dashboard
///
/// The input handler is the only writer of [`UiState`]. After each batch of
/// events it re-clamps the state against the latest process list and publishes
/// a copy on a watch channel for the process panel to draw.

pub mod state;

use std::sync::Arc;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::{mpsc, watch};
use tracing::info;

use crate::core::processes::{KillOutcome, ProcessControl, ProcessList};
use crate::scheduler::Signal;

pub use state::{LineEditor, SortKey, UiState};

/// What a key press asks for, before it touches any state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Up,
    Down,
    PageUp,
    PageDown,
    Top,
    Bottom,
    CycleSort,
    ReverseSort,
    StartSearch,
    ClearSearch,
    Kill,
    ToggleDetails,
    Refresh,
    Quit,
}

impl Action {
    pub fn from_key(key: KeyEvent) -> Option<Action> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let action = match key.code {
            KeyCode::Char('c') if ctrl => Action::Quit,
            KeyCode::Char('l') if ctrl => Action::Refresh,
            _ if ctrl => return None,
            KeyCode::Up => Action::Up,
            KeyCode::Down => Action::Down,
            KeyCode::PageUp => Action::PageUp,
            KeyCode::PageDown => Action::PageDown,
            KeyCode::Char('g') | KeyCode::Home => Action::Top,
            KeyCode::Char('G') | KeyCode::End => Action::Bottom,
            KeyCode::Char('s') => Action::CycleSort,
            KeyCode::Char('r') => Action::ReverseSort,
            KeyCode::Char('/') => Action::StartSearch,
            KeyCode::Esc => Action::ClearSearch,
            KeyCode::Char('k') => Action::Kill,
            KeyCode::Char('d') => Action::ToggleDetails,
            KeyCode::F(5) => Action::Refresh,
            KeyCode::Char('q') => Action::Quit,
            _ => return None,
        };
        Some(action)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KillReport {
    pub pid: u32,
    pub outcome: KillOutcome,
}

pub struct InputHandler {
    state: UiState,
    visible_rows: usize,
    processes: watch::Receiver<ProcessList>,
    published: watch::Sender<UiState>,
    control: Arc<dyn ProcessControl>,
    kill_tx: mpsc::UnboundedSender<KillReport>,
    kill_rx: mpsc::UnboundedReceiver<KillReport>,
}

impl InputHandler {
    pub fn new(control: Arc<dyn ProcessControl>, processes: watch::Receiver<ProcessList>) -> Self {
        let (published, _) = watch::channel(UiState::default());
        let (kill_tx, kill_rx) = mpsc::unbounded_channel();
        Self {
            state: UiState::default(),
            visible_rows: 1,
            processes,
            published,
            control,
            kill_tx,
            kill_rx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<UiState> {
        self.published.subscribe()
    }

    pub fn state(&self) -> &UiState {
        &self.state
    }

    /// Number of process rows the current layout shows
    pub fn set_visible_rows(&mut self, rows: usize) {
        self.visible_rows = rows.max(1);
    }

    pub fn handle_event(&mut self, event: Event) -> Option<Signal> {
        match event {
            Event::Resize(_, _) => Some(Signal::Resize),
            Event::Key(key) if key.kind != KeyEventKind::Release => self.handle_key(key),
            _ => None,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Signal> {
        if self.state.editor.is_some() {
            return self.handle_search_key(key);
        }
        // Any other key dismisses the last kill message
        self.state.status = None;
        Action::from_key(key).and_then(|action| self.apply(action))
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> Option<Signal> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(Signal::Quit);
        }
        let editor = self.state.editor.as_mut()?;

        match key.code {
            KeyCode::Enter => {
                self.state.search = editor.take();
                self.state.editor = None;
                self.state.go_top();
            }
            KeyCode::Esc => {
                self.state.editor = None;
            }
            KeyCode::Backspace => editor.pop(),
            KeyCode::Char(c) => editor.push(c),
            _ => {}
        }
        None
    }

    fn row_count(&self) -> usize {
        let processes = self.processes.borrow();
        self.state.visible_rows(&processes).len()
    }

    pub fn apply(&mut self, action: Action) -> Option<Signal> {
        let count = self.row_count();
        let visible = self.visible_rows;

        match action {
            Action::Up => self.state.move_up(count, visible),
            Action::Down => self.state.move_down(count, visible),
            Action::PageUp => {
                self.state.selected = self.state.selected.saturating_sub(visible);
                self.state.clamp(count, visible);
            }
            Action::PageDown => {
                self.state.selected = self.state.selected.saturating_add(visible);
                self.state.clamp(count, visible);
            }
            Action::Top => self.state.go_top(),
            Action::Bottom => self.state.go_bottom(count, visible),
            Action::CycleSort => self.state.cycle_sort(),
            Action::ReverseSort => self.state.reverse_sort(),
            Action::StartSearch => self.state.editor = Some(LineEditor::default()),
            Action::ClearSearch => {
                if !self.state.search.is_empty() {
                    self.state.search.clear();
                    self.state.go_top();
                }
            }
            Action::ToggleDetails => self.state.show_details = !self.state.show_details,
            Action::Kill => self.request_kill(),
            Action::Refresh => return Some(Signal::Refresh),
            Action::Quit => return Some(Signal::Quit),
        }
        None
    }

    /// Hand the selected process to the controller without waiting for it
    fn request_kill(&mut self) {
        let target = {
            let processes = self.processes.borrow();
            self.state
                .selected_record(&processes)
                .map(|record| (record.pid, record.name.clone()))
        };

        let Some((pid, name)) = target else {
            self.state.status = Some("No process selected".to_string());
            return;
        };

        info!(pid, name = %name, "kill requested");
        self.state.status = Some(format!("Terminating {} ({})...", pid, name));

        let termination = self.control.terminate(pid);
        let reports = self.kill_tx.clone();
        tokio::spawn(async move {
            let outcome = termination.await;
            let _ = reports.send(KillReport { pid, outcome });
        });
    }

    /// Fold finished kill requests into the status line
    pub fn drain_kill_reports(&mut self) -> bool {
        let mut any = false;
        while let Ok(report) = self.kill_rx.try_recv() {
            self.state.status = Some(report.outcome.describe(report.pid));
            any = true;
        }
        any
    }

    /// Clamp against the current list and publish when something changed
    pub fn publish(&mut self) {
        let count = self.row_count();
        self.state.clamp(count, self.visible_rows);

        let state = &self.state;
        self.published.send_if_modified(|current| {
            if current == state {
                false
            } else {
                *current = state.clone();
                true
            }
        });
    }
}
