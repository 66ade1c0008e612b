/// Horizontal percentage bar: `LABEL: ████░░░░  42%`

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

use crate::core::config::UsageThresholds;

pub const FILL: char = '█';
pub const EMPTY: char = '░';

/// Width reserved after the bar for " 100%"
const PERCENT_WIDTH: u16 = 5;

/// Split `width` cells into (filled, empty) for `percent`
///
/// Out-of-range values are clamped to [0, 100] and NaN counts as 0, so the two
/// halves always add up to `width`.
pub fn bar_cells(percent: f32, width: u16) -> (u16, u16) {
    let p = if percent.is_nan() { 0.0 } else { percent.clamp(0.0, 100.0) };
    let filled = ((f64::from(p) / 100.0) * f64::from(width)).floor() as u16;
    let filled = filled.min(width);
    (filled, width - filled)
}

/// Percentage text shown next to a bar
pub fn percent_label(percent: f32) -> String {
    let p = if percent.is_nan() { 0.0 } else { percent.clamp(0.0, 100.0) };
    format!("{:.0}%", p)
}

pub struct UsageBar<'a> {
    percent: f32,
    label: Option<&'a str>,
    thresholds: UsageThresholds,
}

impl<'a> UsageBar<'a> {
    pub fn new(percent: f32, thresholds: UsageThresholds) -> Self {
        Self {
            percent,
            label: None,
            thresholds,
        }
    }

    pub fn label(mut self, label: &'a str) -> Self {
        self.label = Some(label);
        self
    }
}

impl Widget for UsageBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        let mut x = area.x;
        let right = area.x + area.width;

        if let Some(label) = self.label {
            let text = format!("{}: ", label);
            let (end, _) = buf.set_stringn(x, area.y, &text, usize::from(area.width), Style::default());
            x = end;
        }

        let bar_width = right.saturating_sub(x).saturating_sub(PERCENT_WIDTH);
        let (filled, empty) = bar_cells(self.percent, bar_width);
        let color = self.thresholds.level(self.percent).color();

        // Writes start only at cells inside the area
        if filled > 0 {
            let fill: String = std::iter::repeat(FILL).take(usize::from(filled)).collect();
            buf.set_string(x, area.y, &fill, Style::default().fg(color));
        }
        if empty > 0 {
            let rest: String = std::iter::repeat(EMPTY).take(usize::from(empty)).collect();
            buf.set_string(x + filled, area.y, &rest, Style::default().fg(Color::DarkGray));
        }
        x += bar_width;

        let remaining = usize::from(right.saturating_sub(x));
        if remaining > 0 {
            let text = format!("{:>width$}", percent_label(self.percent), width = usize::from(PERCENT_WIDTH));
            buf.set_stringn(x, area.y, &text, remaining, Style::default().fg(color));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn row_text(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width).map(|x| buf.get(x, y).symbol()).collect()
    }

    #[test]
    fn test_half_bar() {
        assert_eq!(bar_cells(50.0, 10), (5, 5));
        assert_eq!(percent_label(50.0), "50%");
    }

    #[test]
    fn test_edges() {
        assert_eq!(bar_cells(0.0, 10), (0, 10));
        assert_eq!(bar_cells(100.0, 10), (10, 0));
        assert_eq!(bar_cells(150.0, 10), (10, 0));
        assert_eq!(bar_cells(-5.0, 10), (0, 10));
        assert_eq!(bar_cells(f32::NAN, 10), (0, 10));
        assert_eq!(bar_cells(99.9, 10), (9, 1));
        assert_eq!(percent_label(f32::NAN), "0%");
    }

    #[test]
    fn test_render_labelled_bar() {
        let area = Rect::new(0, 0, 20, 1);
        let mut buf = Buffer::empty(area);
        UsageBar::new(50.0, UsageThresholds::default())
            .label("CPU")
            .render(area, &mut buf);

        // "CPU: " (5) + bar (10) + "  50%" (5)
        assert_eq!(row_text(&buf, 0), "CPU: █████░░░░░  50%");
        assert_eq!(buf.get(5, 0).fg, Color::Green);
    }

    #[test]
    fn test_render_critical_colour() {
        let area = Rect::new(0, 0, 15, 1);
        let mut buf = Buffer::empty(area);
        UsageBar::new(90.0, UsageThresholds::default()).render(area, &mut buf);
        assert_eq!(buf.get(0, 0).fg, Color::Red);
        assert_eq!(buf.get(0, 0).symbol(), "█");
    }

    #[test]
    fn test_render_into_tiny_area_does_not_panic() {
        let area = Rect::new(0, 0, 3, 1);
        let mut buf = Buffer::empty(area);
        UsageBar::new(42.0, UsageThresholds::default())
            .label("Swap")
            .render(area, &mut buf);
        assert_eq!(row_text(&buf, 0), "Swa");
    }

    proptest! {
        #[test]
        fn prop_cells_add_up(percent in -50.0f32..200.0, width in 0u16..500) {
            let (filled, empty) = bar_cells(percent, width);
            prop_assert_eq!(filled + empty, width);
            let p = percent.clamp(0.0, 100.0);
            prop_assert_eq!(filled, ((f64::from(p) / 100.0) * f64::from(width)).floor() as u16);
        }

        #[test]
        fn prop_more_usage_never_fills_less(a in 0.0f32..100.0, b in 0.0f32..100.0, width in 0u16..300) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(bar_cells(lo, width).0 <= bar_cells(hi, width).0);
        }
    }
}
