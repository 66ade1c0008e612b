/// Selection, scroll, sort and search state for the process panel
///
/// `UiState` is written only by the input task. Readers get a cloned copy and
/// call [`UiState::clamp`] against the list they are about to draw, because the
/// process list can shrink between two keystrokes.

use std::cmp::Ordering;

use crate::core::processes::ProcessRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Memory,
    Cpu,
    Pid,
    Name,
}

impl SortKey {
    pub fn next(self) -> Self {
        match self {
            SortKey::Memory => SortKey::Cpu,
            SortKey::Cpu => SortKey::Pid,
            SortKey::Pid => SortKey::Name,
            SortKey::Name => SortKey::Memory,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortKey::Memory => "MEM%",
            SortKey::Cpu => "CPU%",
            SortKey::Pid => "PID",
            SortKey::Name => "NAME",
        }
    }

    fn compare(&self, a: &ProcessRecord, b: &ProcessRecord) -> Ordering {
        match self {
            SortKey::Memory => a.memory_percent.total_cmp(&b.memory_percent),
            SortKey::Cpu => a.cpu_percent.total_cmp(&b.cpu_percent),
            SortKey::Pid => a.pid.cmp(&b.pid),
            SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        }
    }
}

/// Single-line text input used for the search prompt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineEditor {
    buffer: String,
}

impl LineEditor {
    pub fn push(&mut self, c: char) {
        self.buffer.push(c);
    }

    pub fn pop(&mut self) {
        self.buffer.pop();
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.buffer)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UiState {
    pub selected: usize,
    pub scroll: usize,
    pub sort_key: SortKey,
    pub descending: bool,
    pub search: String,
    /// Present while the search prompt is open
    pub editor: Option<LineEditor>,
    pub show_details: bool,
    /// Outcome of the last kill request, shown in the panel border
    pub status: Option<String>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            selected: 0,
            scroll: 0,
            sort_key: SortKey::default(),
            descending: true,
            search: String::new(),
            editor: None,
            show_details: false,
            status: None,
        }
    }
}

impl UiState {
    /// Restore `selected < count` and keep the selection inside the window
    pub fn clamp(&mut self, count: usize, visible: usize) {
        let visible = visible.max(1);
        if count == 0 {
            self.selected = 0;
            self.scroll = 0;
            return;
        }

        self.selected = self.selected.min(count - 1);
        let max_scroll = count.saturating_sub(visible);
        self.scroll = self.scroll.min(max_scroll);

        if self.selected < self.scroll {
            self.scroll = self.selected;
        } else if self.selected >= self.scroll + visible {
            self.scroll = self.selected + 1 - visible;
        }
    }

    pub fn move_up(&mut self, count: usize, visible: usize) {
        self.selected = self.selected.saturating_sub(1);
        self.clamp(count, visible);
    }

    pub fn move_down(&mut self, count: usize, visible: usize) {
        self.selected = self.selected.saturating_add(1);
        self.clamp(count, visible);
    }

    pub fn go_top(&mut self) {
        self.selected = 0;
        self.scroll = 0;
    }

    pub fn go_bottom(&mut self, count: usize, visible: usize) {
        self.selected = count.saturating_sub(1);
        self.scroll = count.saturating_sub(visible.max(1));
        self.clamp(count, visible);
    }

    pub fn cycle_sort(&mut self) {
        self.sort_key = self.sort_key.next();
    }

    pub fn reverse_sort(&mut self) {
        self.descending = !self.descending;
    }

    /// Rows to show: search filter applied, then sorted
    pub fn visible_rows<'a>(&self, processes: &'a [ProcessRecord]) -> Vec<&'a ProcessRecord> {
        let needle = self.search.to_lowercase();
        let mut rows: Vec<&ProcessRecord> = processes
            .iter()
            .filter(|p| needle.is_empty() || p.name.to_lowercase().contains(&needle))
            .collect();

        rows.sort_by(|a, b| {
            let order = self.sort_key.compare(a, b).then_with(|| a.pid.cmp(&b.pid));
            if self.descending {
                order.reverse()
            } else {
                order
            }
        });
        rows
    }

    /// The record under the cursor after filtering and sorting
    pub fn selected_record<'a>(&self, processes: &'a [ProcessRecord]) -> Option<&'a ProcessRecord> {
        self.visible_rows(processes).get(self.selected).copied()
    }
}
