/// Panel rendering
///
/// Every function here draws one section into a cell buffer. Nothing touches the
/// terminal directly; the frame-flush task copies the buffer out.

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        block::{Position, Title},
        Block, BorderType, Borders, Cell, Clear, Paragraph, Row, Scrollbar, ScrollbarOrientation,
        ScrollbarState, StatefulWidget, Table, Widget, Wrap,
    },
};

use crate::core::config::{TermSize, UsageThresholds};
use crate::core::cpu::CpuSnapshot;
use crate::core::memory::MemorySnapshot;
use crate::core::network::NetworkSnapshot;
use crate::core::processes::ProcessRecord;
use crate::core::system_info::SystemSnapshot;
use crate::input::UiState;
use crate::screens::layout::Section;
use crate::utils::{format_bytes, format_rate, format_uptime, truncate_string};
use crate::widgets::UsageBar;

/// Width given to one per-core bar before cores start sharing a row
const CORE_CELL_WIDTH: u16 = 24;

pub const INSTRUCTIONS: &[&str] = &[
    "CONTROLS:",
    "↑/↓: Navigate   s: Sort   r: Reverse sort",
    "k: Kill process   /: Search   q: Quit",
    "d: Details   g/G: Top/Bottom   F5: Refresh",
];

fn label_style() -> Style {
    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
}

fn field<'a>(label: &'a str, value: String) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("{}: ", label), label_style()),
        Span::raw(value),
    ])
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DashboardRenderer {
    thresholds: UsageThresholds,
}

impl DashboardRenderer {
    pub fn new(thresholds: UsageThresholds) -> Self {
        Self { thresholds }
    }

    fn usage_style(&self, percent: f32) -> Style {
        Style::default().fg(self.thresholds.level(percent).color())
    }

    /// Clear the section and draw its rounded border; returns the inner area
    pub fn frame(&self, section: &Section, buf: &mut Buffer) -> Rect {
        self.framed(section, Self::titled(section), buf)
    }

    fn framed<'a, T: Into<Title<'a>>>(&self, section: &Section, title: T, buf: &mut Buffer) -> Rect {
        let area = section.area();
        Clear.render(area, buf);
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(title)
            .render(area, buf);
        section.inner()
    }

    fn titled(section: &Section) -> Line<'static> {
        Line::from(Span::styled(format!(" {} ", section.id.title()), label_style()))
    }

    pub fn system(&self, section: &Section, info: &SystemSnapshot, buf: &mut Buffer) {
        let inner = self.framed(section, Self::titled(section), buf);

        let host = match &info.ip {
            Some(ip) => format!("{} ({})", info.host, ip),
            None => info.host.clone(),
        };
        let disk = match &info.disk {
            Some(disk) => format!(
                "{} {:.0}% used, {} free",
                disk.mount_point,
                disk.used_percent,
                format_bytes(disk.free_bytes)
            ),
            None => "-".to_string(),
        };

        let lines = vec![
            field("OS", info.os.clone()),
            field("Kernel", info.kernel.clone()),
            field("Host", host),
            field("CPU", format!("{} ({} cores)", info.cpu_model, info.cores)),
            field(
                "RAM",
                format!("{} free of {}", format_bytes(info.ram_available), format_bytes(info.ram_total)),
            ),
            field("Disk", disk),
            field("Uptime", format_uptime(info.uptime)),
        ];
        Paragraph::new(lines).render(inner, buf);
    }

    /// Placeholder body for a provider that has nothing to show yet
    pub fn unavailable(&self, section: &Section, reason: &str, buf: &mut Buffer) {
        let inner = self.framed(section, Self::titled(section), buf);
        Paragraph::new(Line::from(Span::styled(
            truncate_string(reason, usize::from(inner.width)),
            Style::default().fg(Color::Yellow),
        )))
        .render(inner, buf);
    }

    pub fn cpu(&self, section: &Section, cpu: &CpuSnapshot, buf: &mut Buffer) {
        let inner = self.framed(section, Self::titled(section), buf);
        if inner.height == 0 {
            return;
        }

        UsageBar::new(cpu.usage, self.thresholds)
            .label("CPU")
            .render(Rect::new(inner.x, inner.y, inner.width, 1), buf);

        // Rows between the overall bar and the info line
        let core_rows = inner.height.saturating_sub(2);
        let cores = cpu.cores.len() as u16;
        if core_rows > 0 && cores > 0 {
            let mut per_row = (inner.width / CORE_CELL_WIDTH).max(1);
            if cores.div_ceil(per_row) > core_rows {
                per_row = cores.div_ceil(core_rows);
            }
            let cell_width = inner.width / per_row;

            for (idx, usage) in cpu.cores.iter().enumerate() {
                let idx = idx as u16;
                let row = idx / per_row;
                if row >= core_rows || cell_width == 0 {
                    break;
                }
                let label = format!("C{}", idx);
                let area = Rect::new(
                    inner.x + (idx % per_row) * cell_width,
                    inner.y + 1 + row,
                    cell_width.saturating_sub(1).max(1),
                    1,
                );
                UsageBar::new(*usage, self.thresholds).label(&label).render(area, buf);
            }
        }

        if inner.height >= 2 {
            let mut spans = vec![
                Span::styled("Freq: ", label_style()),
                Span::raw(format!("{} MHz  ", cpu.frequency_mhz)),
                Span::styled("Load: ", label_style()),
                Span::raw(format!(
                    "{:.2} {:.2} {:.2}",
                    cpu.load_avg[0], cpu.load_avg[1], cpu.load_avg[2]
                )),
            ];
            let hottest = cpu
                .temperatures
                .iter()
                .map(|t| t.celsius)
                .fold(None, |acc: Option<f32>, t| Some(acc.map_or(t, |a| a.max(t))));
            if let Some(celsius) = hottest {
                spans.push(Span::styled("  Temp: ", label_style()));
                spans.push(Span::raw(format!("{:.0}°C", celsius)));
            }
            let info_row = Rect::new(inner.x, inner.y + inner.height - 1, inner.width, 1);
            Paragraph::new(Line::from(spans)).render(info_row, buf);
        }
    }

    pub fn memory(&self, section: &Section, memory: &MemorySnapshot, buf: &mut Buffer) {
        let inner = self.framed(section, Self::titled(section), buf);
        let rows = [
            ("RAM", memory.ram_percent, memory.ram_used, memory.ram_total),
            ("Swap", memory.swap_percent, memory.swap_used, memory.swap_total),
        ];

        for (i, (label, percent, _, _)) in rows.iter().enumerate() {
            let i = i as u16;
            if i >= inner.height {
                return;
            }
            UsageBar::new(*percent, self.thresholds)
                .label(label)
                .render(Rect::new(inner.x, inner.y + i, inner.width, 1), buf);
        }

        // Absolute figures when the panel has room for them
        for (i, (label, _, used, total)) in rows.iter().enumerate() {
            let y = 2 + i as u16;
            if y >= inner.height {
                return;
            }
            let line = field(label, format!("{} / {}", format_bytes(*used), format_bytes(*total)));
            Paragraph::new(line).render(Rect::new(inner.x, inner.y + y, inner.width, 1), buf);
        }
    }

    pub fn network(&self, section: &Section, network: &NetworkSnapshot, buf: &mut Buffer) {
        let inner = self.framed(section, Self::titled(section), buf);

        let mut lines = vec![
            Line::from(vec![
                Span::styled("Down: ", label_style()),
                Span::styled(format_rate(network.rates.recv_kbps), Style::default().fg(Color::Green)),
            ]),
            Line::from(vec![
                Span::styled("Up:   ", label_style()),
                Span::styled(format_rate(network.rates.sent_kbps), Style::default().fg(Color::Yellow)),
            ]),
        ];
        lines.extend(
            network
                .interfaces
                .iter()
                .filter(|(name, _)| name.as_str() != "lo")
                .map(|(name, ip)| Line::from(format!("{}: {}", name, ip))),
        );
        Paragraph::new(lines).render(inner, buf);
    }

    pub fn instructions(&self, section: &Section, buf: &mut Buffer) {
        let inner = self.framed(section, Self::titled(section), buf);
        let lines: Vec<Line> = INSTRUCTIONS
            .iter()
            .enumerate()
            .map(|(i, text)| {
                if i == 0 {
                    Line::from(Span::styled(*text, label_style()))
                } else {
                    Line::from(*text)
                }
            })
            .collect();
        Paragraph::new(lines).wrap(Wrap { trim: false }).render(inner, buf);
    }

    /// Process table with selection, scrolling, search and status decorations
    pub fn processes(&self, section: &Section, processes: &[ProcessRecord], ui: &UiState, buf: &mut Buffer) {
        let rows_all = ui.visible_rows(processes);
        let visible = usize::from(section.inner_height.saturating_sub(1)).max(1);

        // The list may have changed since the input task clamped
        let mut ui = ui.clone();
        ui.clamp(rows_all.len(), visible);

        let order = if ui.descending { "▼" } else { "▲" };
        let mut block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Line::from(vec![
                Span::styled(format!(" {} ", section.id.title()), label_style()),
                Span::raw(format!("[{} {}] ", ui.sort_key.label(), order)),
            ]));

        if let Some(editor) = &ui.editor {
            block = block.title(
                Title::from(Span::styled(
                    format!(" Search: {}_ ", editor.text()),
                    Style::default().fg(Color::Yellow),
                ))
                .position(Position::Bottom),
            );
        } else if !ui.search.is_empty() {
            block = block.title(
                Title::from(Span::styled(
                    format!(" Filter: {} ({}) ", ui.search, rows_all.len()),
                    Style::default().fg(Color::Cyan),
                ))
                .position(Position::Bottom),
            );
        }
        if let Some(status) = &ui.status {
            block = block.title(
                Title::from(Span::styled(format!(" {} ", status), Style::default().fg(Color::Magenta)))
                    .position(Position::Bottom)
                    .alignment(Alignment::Right),
            );
        }
        if ui.scroll > 0 {
            block = block.title(Title::from("↑").alignment(Alignment::Right));
        }
        if ui.scroll + visible < rows_all.len() {
            block = block.title(
                Title::from("↓")
                    .alignment(Alignment::Right)
                    .position(Position::Bottom),
            );
        }

        let area = section.area();
        Clear.render(area, buf);
        block.render(area, buf);
        let inner = section.inner();
        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let scrollable = rows_all.len() > visible;
        let table_area = if scrollable {
            Rect::new(inner.x, inner.y, inner.width.saturating_sub(1), inner.height)
        } else {
            inner
        };

        let mut header = vec!["PID", "NAME", "USER", "MEM%", "CPU%", "STATUS"];
        let mut widths = vec![
            Constraint::Length(7),
            Constraint::Min(12),
            Constraint::Length(10),
            Constraint::Length(6),
            Constraint::Length(6),
            Constraint::Length(9),
        ];
        if ui.show_details {
            header.extend(["READ/s", "WRITE/s", "CONN", "THR"]);
            widths.extend([
                Constraint::Length(10),
                Constraint::Length(10),
                Constraint::Length(5),
                Constraint::Length(4),
            ]);
        }

        let rows: Vec<Row> = rows_all
            .iter()
            .enumerate()
            .skip(ui.scroll)
            .take(visible)
            .map(|(idx, p)| {
                let mut cells = vec![
                    Cell::from(p.pid.to_string()),
                    Cell::from(p.name.clone()),
                    Cell::from(truncate_string(&p.user, 10)),
                    Cell::from(Span::styled(
                        format!("{:>5.1}", p.memory_percent),
                        self.usage_style(p.memory_percent),
                    )),
                    Cell::from(Span::styled(
                        format!("{:>5.1}", p.cpu_percent),
                        self.usage_style(p.cpu_percent),
                    )),
                    Cell::from(p.status.clone()),
                ];
                if ui.show_details {
                    cells.extend([
                        Cell::from(format!("{}/s", format_bytes(p.read_rate as u64))),
                        Cell::from(format!("{}/s", format_bytes(p.write_rate as u64))),
                        Cell::from(p.connections.to_string()),
                        Cell::from(p.threads.to_string()),
                    ]);
                }

                let row = Row::new(cells);
                if idx == ui.selected {
                    row.style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
                } else {
                    row
                }
            })
            .collect();

        let table = Table::new(rows, widths)
            .header(Row::new(header).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)))
            .column_spacing(1);
        Widget::render(table, table_area, buf);

        if scrollable {
            let track = Rect::new(inner.x, inner.y + 1, inner.width, inner.height.saturating_sub(1));
            let mut state = ScrollbarState::new(rows_all.len().saturating_sub(visible)).position(ui.scroll);
            Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(None)
                .end_symbol(None)
                .render(track, buf, &mut state);
        }
    }

    /// Whole-screen notice shown instead of the panels
    pub fn size_warning(&self, current: TermSize, min: TermSize, buf: &mut Buffer) {
        let area = buf.area;
        Clear.render(area, buf);
        if area.height == 0 {
            return;
        }

        let lines = vec![
            Line::from(Span::styled(
                format!("Terminal too small. Min size: {}x{}", min.width, min.height),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )),
            Line::from(format!("Current size: {}x{}", current.width, current.height)),
        ];
        let height = (lines.len() as u16).min(area.height);
        let top = area.y + (area.height - height) / 2;
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .render(Rect::new(area.x, top, area.width, height), buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::DashboardConfig;
    use crate::core::cpu::Temperature;
    use crate::core::processes::record;
    use crate::screens::layout::{LayoutEngine, SectionId};

    fn screen_text(buf: &Buffer) -> String {
        let area = buf.area;
        let mut text = String::new();
        for y in area.top()..area.bottom() {
            for x in area.left()..area.right() {
                text.push_str(buf.get(x, y).symbol());
            }
            text.push('\n');
        }
        text
    }

    fn setup(width: u16, height: u16) -> (crate::screens::layout::Layout, Buffer) {
        let layout = LayoutEngine::from_config(&DashboardConfig::default(), 4)
            .compute(height, width)
            .unwrap();
        (layout, Buffer::empty(Rect::new(0, 0, width, height)))
    }

    #[test]
    fn test_frame_draws_rounded_border_and_title() {
        let (layout, mut buf) = setup(80, 24);
        let section = layout.section(SectionId::Memory);
        let inner = DashboardRenderer::default().frame(&section, &mut buf);

        assert_eq!(inner, section.inner());
        assert_eq!(buf.get(section.x, section.y).symbol(), "╭");
        assert!(screen_text(&buf).contains("MEMORY"));
    }

    #[test]
    fn test_cpu_panel() {
        let (layout, mut buf) = setup(100, 30);
        let cpu = CpuSnapshot {
            usage: 50.0,
            cores: vec![10.0, 20.0, 30.0, 95.0],
            frequency_mhz: 2400,
            temperatures: vec![Temperature {
                label: "Core 0".to_string(),
                celsius: 61.0,
            }],
            load_avg: [0.5, 0.25, 0.75],
        };
        DashboardRenderer::default().cpu(&layout.section(SectionId::Cpu), &cpu, &mut buf);

        let text = screen_text(&buf);
        assert!(text.contains("CPU: "));
        assert!(text.contains("C3: "));
        assert!(text.contains("2400 MHz"));
        assert!(text.contains("0.50 0.25 0.75"));
        assert!(text.contains("61°C"));
    }

    #[test]
    fn test_memory_and_network_panels() {
        let (layout, mut buf) = setup(80, 24);
        let renderer = DashboardRenderer::default();
        renderer.memory(
            &layout.section(SectionId::Memory),
            &MemorySnapshot::from_bytes(1 << 30, 4 << 30, 0, 0),
            &mut buf,
        );

        let mut network = NetworkSnapshot::default();
        network.rates.recv_kbps = 12.5;
        network.interfaces.insert("eth0".to_string(), "10.0.0.2".to_string());
        renderer.network(&layout.section(SectionId::Network), &network, &mut buf);

        let text = screen_text(&buf);
        assert!(text.contains("RAM: "));
        assert!(text.contains("25%"));
        assert!(text.contains("Swap: "));
        assert!(text.contains("12.5 KB/s"));
        assert!(text.contains("eth0: 10.0.0.2"));
    }

    #[test]
    fn test_process_table_highlights_selection() {
        let (layout, mut buf) = setup(100, 30);
        let section = layout.section(SectionId::Processes);
        let processes = vec![record(11, "alpha", 2.0, 1.0), record(22, "beta", 9.0, 3.0)];
        let ui = UiState {
            selected: 1,
            ..UiState::default()
        };
        DashboardRenderer::default().processes(&section, &processes, &ui, &mut buf);

        let text = screen_text(&buf);
        assert!(text.contains("PID"));
        assert!(text.contains("STATUS"));
        assert!(text.contains("[MEM% ▼]"));

        // beta sorts first, so row 1 (alpha) is the highlighted one
        let inner = section.inner();
        let first = buf.get(inner.x, inner.y + 1);
        let second = buf.get(inner.x, inner.y + 2);
        assert_eq!(first.symbol(), "2");
        assert_eq!(second.symbol(), "1");
        assert_eq!(second.bg, Color::DarkGray);
        assert_ne!(first.bg, Color::DarkGray);
    }

    #[test]
    fn test_process_table_details_and_status() {
        let (layout, mut buf) = setup(160, 30);
        let processes = vec![record(5, "worker", 1.0, 1.0)];
        let ui = UiState {
            show_details: true,
            status: Some("Process 5 terminated".to_string()),
            search: "work".to_string(),
            ..UiState::default()
        };
        DashboardRenderer::default().processes(
            &layout.section(SectionId::Processes),
            &processes,
            &ui,
            &mut buf,
        );

        let text = screen_text(&buf);
        assert!(text.contains("READ/s"));
        assert!(text.contains("THR"));
        assert!(text.contains("Process 5 terminated"));
        assert!(text.contains("Filter: work (1)"));
    }

    #[test]
    fn test_long_list_shows_scroll_markers() {
        let (layout, mut buf) = setup(80, 24);
        let section = layout.section(SectionId::Processes);
        let processes: Vec<ProcessRecord> = (1..=40)
            .map(|pid| record(pid, "proc", pid as f32, 0.0))
            .collect();
        let ui = UiState {
            selected: 20,
            scroll: 18,
            ..UiState::default()
        };
        DashboardRenderer::default().processes(&section, &processes, &ui, &mut buf);

        let text = screen_text(&buf);
        assert!(text.contains('↑'));
        assert!(text.contains('↓'));
    }

    #[test]
    fn test_process_panel_clamps_stale_state() {
        let (layout, mut buf) = setup(80, 24);
        let section = layout.section(SectionId::Processes);
        let ui = UiState {
            selected: 99,
            scroll: 90,
            ..UiState::default()
        };
        // Must not index past the two rows that exist
        DashboardRenderer::default().processes(
            &section,
            &[record(1, "a", 1.0, 1.0), record(2, "b", 2.0, 2.0)],
            &ui,
            &mut buf,
        );
        let inner = section.inner();
        assert_eq!(buf.get(inner.x, inner.y + 1).symbol(), "2");
        assert_eq!(buf.get(inner.x, inner.y + 2).bg, Color::DarkGray);
    }

    #[test]
    fn test_size_warning_message() {
        let mut buf = Buffer::empty(Rect::new(0, 0, 40, 10));
        DashboardRenderer::default().size_warning(TermSize::new(40, 10), TermSize::new(80, 24), &mut buf);
        let text = screen_text(&buf);
        assert!(text.contains("Min size: 80x24"));
        assert!(text.contains("Current size: 40x10"));
    }

    #[test]
    fn test_instructions_panel() {
        let (layout, mut buf) = setup(80, 24);
        DashboardRenderer::default().instructions(&layout.section(SectionId::Instructions), &mut buf);
        let text = screen_text(&buf);
        assert!(text.contains("CONTROLS:"));
        assert!(text.contains("q: Quit"));
    }
}
