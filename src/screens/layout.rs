/// Panel geometry for the dashboard
///
/// The screen is split into a left column (system, cpu, processes) and a right
/// column (network, memory, instructions). Upper panels get fixed or
/// minimum-driven heights and the last panel of each column takes whatever is
/// left. Every call recomputes from scratch: the right column's lower panels are
/// placed at offsets derived from the panels above them, so patching one panel
/// would leave the others stale.

use ratatui::layout::Rect;

use crate::core::config::{ContentSizes, DashboardConfig, TermSize};
use crate::core::error::{MonitorError, MonitorResult};

/// Share of the usable width given to the left column
const LEFT_COLUMN_SHARE: f32 = 0.65;
/// Upper bound for the system panel height
const SYSTEM_MAX_HEIGHT: u16 = 12;
/// Share of the usable height the system and cpu panels may claim
const UPPER_PANEL_SHARE: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SectionId {
    System,
    Cpu,
    Memory,
    Network,
    Processes,
    Instructions,
}

impl SectionId {
    pub const ALL: [SectionId; 6] = [
        SectionId::System,
        SectionId::Cpu,
        SectionId::Processes,
        SectionId::Network,
        SectionId::Memory,
        SectionId::Instructions,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            SectionId::System => "SYSTEM",
            SectionId::Cpu => "CPU",
            SectionId::Memory => "MEMORY",
            SectionId::Network => "NETWORK",
            SectionId::Processes => "PROCESSES",
            SectionId::Instructions => "INSTRUCTIONS",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    pub id: SectionId,
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    pub inner_width: u16,
    pub inner_height: u16,
}

impl Section {
    fn new(id: SectionId, x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            id,
            x,
            y,
            width,
            height,
            inner_width: width.saturating_sub(2),
            inner_height: height.saturating_sub(2),
        }
    }

    /// Outer rectangle including the border
    pub fn area(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// Drawable rectangle inside the border
    pub fn inner(&self) -> Rect {
        Rect::new(self.x + 1, self.y + 1, self.inner_width, self.inner_height)
    }
}

/// Geometry of every section for one terminal size. Never mutated after
/// construction; a resize produces a new `Layout`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    size: TermSize,
    sections: Vec<Section>,
}

impl Layout {
    pub fn size(&self) -> TermSize {
        self.size
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, id: SectionId) -> Section {
        // Every Layout is built with all six sections
        self.sections
            .iter()
            .copied()
            .find(|section| section.id == id)
            .unwrap_or_else(|| Section::new(id, 0, 0, 0, 0))
    }

    /// Rows available to process entries (inner height minus the header row)
    pub fn process_rows(&self) -> usize {
        usize::from(self.section(SectionId::Processes).inner_height.saturating_sub(1)).max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutHints {
    pub sizes: ContentSizes,
    pub cpu_cores: usize,
}

#[derive(Debug, Clone)]
pub struct LayoutEngine {
    hints: LayoutHints,
    margin: u16,
    min_terminal: TermSize,
}

impl LayoutEngine {
    pub fn new(hints: LayoutHints, margin: u16, min_terminal: TermSize) -> Self {
        Self {
            hints,
            margin,
            min_terminal,
        }
    }

    pub fn from_config(config: &DashboardConfig, cpu_cores: usize) -> Self {
        Self::new(
            LayoutHints {
                sizes: config.content_sizes.clone(),
                cpu_cores,
            },
            config.margin,
            config.min_terminal,
        )
    }

    fn left_min_width(&self) -> u16 {
        let sizes = &self.hints.sizes;
        sizes.system.min_w.max(sizes.cpu.min_w).max(sizes.processes.min_w)
    }

    fn right_min_width(&self) -> u16 {
        let sizes = &self.hints.sizes;
        sizes.network.min_w.max(sizes.memory.min_w).max(sizes.instructions.min_w)
    }

    /// Smallest terminal for which every section minimum can be honoured
    pub fn required_size(&self) -> TermSize {
        let m = self.margin;
        let sizes = &self.hints.sizes;
        let left_h = sizes.system.min_h + sizes.cpu.min_h + sizes.processes.min_h;
        let right_h = sizes.network.min_h + sizes.memory.min_h + sizes.instructions.min_h;

        TermSize::new(
            self.left_min_width() + self.right_min_width() + 3 * m,
            left_h.max(right_h) + 4 * m,
        )
    }

    /// Global minimum: the configured one, raised to what the sections need
    pub fn minimum_size(&self) -> TermSize {
        self.min_terminal.max(self.required_size())
    }

    pub fn compute(&self, height: u16, width: u16) -> MonitorResult<Layout> {
        let min = self.minimum_size();
        if !TermSize::new(width, height).fits(min) {
            return Err(MonitorError::InsufficientSpace {
                width,
                height,
                min_width: min.width,
                min_height: min.height,
            });
        }

        let m = self.margin;
        let sizes = &self.hints.sizes;
        let available_w = width - 2 * m;
        let available_h = height - 2 * m;
        // Height shared by the three panels of one column, gaps removed
        let column_h = available_h - 2 * m;

        // Columns
        let right_min = self.right_min_width();
        let proportional = (f32::from(available_w) * LEFT_COLUMN_SHARE) as u16;
        let left_w = self
            .left_min_width()
            .max(proportional)
            .min(available_w - m - right_min);
        let right_w = available_w - m - left_w;

        // Left column, top-down
        let upper_cap = (f32::from(available_h) * UPPER_PANEL_SHARE) as u16;
        let mut system_h = sizes.system.min_h.max(SYSTEM_MAX_HEIGHT.min(upper_cap));
        let core_rows = u16::try_from(4 + (self.hints.cpu_cores + 1) / 2).unwrap_or(u16::MAX);
        let mut cpu_h = sizes.cpu.min_h.max(upper_cap.min(core_rows));

        let overflow = (system_h + cpu_h + sizes.processes.min_h).saturating_sub(column_h);
        if overflow > 0 {
            let from_cpu = overflow.min(cpu_h - sizes.cpu.min_h);
            cpu_h -= from_cpu;
            system_h -= (overflow - from_cpu).min(system_h - sizes.system.min_h);
        }
        let processes_h = column_h - system_h - cpu_h;

        // Right column, top-down
        let network_h = sizes.network.min_h;
        let memory_h = sizes.memory.min_h;
        let instructions_h = column_h - network_h - memory_h;

        let left_x = m;
        let right_x = m + left_w + m;

        let system_y = m;
        let cpu_y = system_y + system_h + m;
        let processes_y = cpu_y + cpu_h + m;

        let network_y = m;
        let memory_y = network_y + network_h + m;
        let instructions_y = memory_y + memory_h + m;

        Ok(Layout {
            size: TermSize::new(width, height),
            sections: vec![
                Section::new(SectionId::System, left_x, system_y, left_w, system_h),
                Section::new(SectionId::Cpu, left_x, cpu_y, left_w, cpu_h),
                Section::new(SectionId::Processes, left_x, processes_y, left_w, processes_h),
                Section::new(SectionId::Network, right_x, network_y, right_w, network_h),
                Section::new(SectionId::Memory, right_x, memory_y, right_w, memory_h),
                Section::new(SectionId::Instructions, right_x, instructions_y, right_w, instructions_h),
            ],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn engine(cores: usize) -> LayoutEngine {
        LayoutEngine::from_config(&DashboardConfig::default(), cores)
    }

    fn overlaps(a: Rect, b: Rect) -> bool {
        a.x < b.x + b.width && b.x < a.x + a.width && a.y < b.y + b.height && b.y < a.y + a.height
    }

    #[test]
    fn test_default_minimum_is_80x24() {
        assert_eq!(engine(8).minimum_size(), TermSize::new(80, 24));
    }

    #[test]
    fn test_refuses_small_terminal() {
        let err = engine(8).compute(10, 40).unwrap_err();
        assert!(matches!(
            err,
            MonitorError::InsufficientSpace { width: 40, height: 10, min_width: 80, min_height: 24 }
        ));
    }

    #[test]
    fn test_80x24_layout() {
        let layout = engine(8).compute(24, 80).unwrap();
        let system = layout.section(SectionId::System);
        let processes = layout.section(SectionId::Processes);
        let network = layout.section(SectionId::Network);

        // 65% of 78 would starve the right column, so the left one is capped
        assert_eq!(system.area(), Rect::new(1, 1, 47, 8));
        assert_eq!(system.inner(), Rect::new(2, 2, 45, 6));
        assert_eq!(layout.section(SectionId::Cpu).height, 5);
        assert_eq!(processes.height, 7);
        assert_eq!(processes.y + processes.height, 23);
        assert_eq!(network.x, 49);
        assert_eq!(network.x + network.width, 79);
    }

    #[test]
    fn test_excess_height_flows_to_last_panels() {
        let small = engine(4).compute(24, 100).unwrap();
        let tall = engine(4).compute(60, 100).unwrap();

        assert!(tall.section(SectionId::Processes).height > small.section(SectionId::Processes).height);
        assert!(tall.section(SectionId::Instructions).height > small.section(SectionId::Instructions).height);
        assert_eq!(
            tall.section(SectionId::Memory).height,
            small.section(SectionId::Memory).height
        );
    }

    #[test]
    fn test_more_cores_give_taller_cpu_panel() {
        let few = engine(2).compute(60, 120).unwrap();
        let many = engine(16).compute(60, 120).unwrap();
        assert!(many.section(SectionId::Cpu).height > few.section(SectionId::Cpu).height);
    }

    #[test]
    fn test_left_column_takes_65_percent() {
        let layout = engine(4).compute(40, 200).unwrap();
        assert_eq!(layout.section(SectionId::Cpu).width, 128);
    }

    #[test]
    fn test_required_size_grows_with_minimums() {
        let mut config = DashboardConfig::default();
        config.content_sizes.processes.min_w = 70;
        let engine = LayoutEngine::from_config(&config, 4);
        assert_eq!(engine.minimum_size().width, 70 + 30 + 3);
        assert!(engine.compute(24, 80).is_err());
        assert!(engine.compute(24, 103).is_ok());
    }

    proptest! {
        #[test]
        fn prop_sections_respect_minimums_and_do_not_overlap(
            height in 24u16..200,
            width in 80u16..400,
            cores in 1usize..256,
        ) {
            let engine = engine(cores);
            let sizes = DashboardConfig::default().content_sizes;
            let layout = engine.compute(height, width).unwrap();
            let screen = Rect::new(0, 0, width, height);

            for section in layout.sections() {
                let min = sizes.get(section.id);
                prop_assert!(section.height >= min.min_h, "{:?} too short", section.id);
                prop_assert!(section.width >= min.min_w, "{:?} too narrow", section.id);
                prop_assert_eq!(screen.intersection(section.area()), section.area());
            }

            let sections = layout.sections();
            for (i, a) in sections.iter().enumerate() {
                for b in &sections[i + 1..] {
                    prop_assert!(!overlaps(a.area(), b.area()), "{:?} overlaps {:?}", a.id, b.id);
                }
            }
        }

        #[test]
        fn prop_compute_is_idempotent(height in 0u16..200, width in 0u16..400, cores in 1usize..64) {
            let engine = engine(cores);
            let first = engine.compute(height, width).ok();
            let second = engine.compute(height, width).ok();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_below_minimum_is_refused(height in 0u16..24, width in 0u16..80) {
            prop_assert!(engine(4).compute(height, width).is_err());
        }
    }
}
