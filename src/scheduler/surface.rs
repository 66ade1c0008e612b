/// The logical display buffer shared by all panel tasks
///
/// Panel tasks draw into their own rectangle; the frame-flush task is the only
/// code that copies the buffer to the terminal, so a half-drawn panel never
/// reaches the screen on its own.

use parking_lot::Mutex;
use ratatui::{buffer::Buffer, layout::Rect};

use crate::core::config::TermSize;
use crate::core::error::{MonitorError, MonitorResult};

pub struct DisplaySurface {
    buffer: Mutex<Buffer>,
}

impl DisplaySurface {
    pub fn new(size: TermSize) -> Self {
        Self {
            buffer: Mutex::new(Buffer::empty(Rect::new(0, 0, size.width, size.height))),
        }
    }

    pub fn area(&self) -> Rect {
        self.buffer.lock().area
    }

    /// Start over with a blank buffer of `size`
    pub fn reset(&self, size: TermSize) {
        *self.buffer.lock() = Buffer::empty(Rect::new(0, 0, size.width, size.height));
    }

    /// Run `draw` against the buffer if `area` lies fully inside it
    pub fn draw<F>(&self, area: Rect, draw: F) -> MonitorResult<()>
    where
        F: FnOnce(&mut Buffer),
    {
        let mut buffer = self.buffer.lock();
        if buffer.area.intersection(area) != area {
            return Err(MonitorError::OutOfBounds(area));
        }
        draw(&mut buffer);
        Ok(())
    }

    /// Copy every cell both buffers share into `target`
    pub fn copy_into(&self, target: &mut Buffer) {
        let source = self.buffer.lock();
        let shared = source.area.intersection(target.area);
        for y in shared.top()..shared.bottom() {
            for x in shared.left()..shared.right() {
                *target.get_mut(x, y) = source.get(x, y).clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::style::Style;

    #[test]
    fn test_draw_inside_area() {
        let surface = DisplaySurface::new(TermSize::new(10, 4));
        surface
            .draw(Rect::new(2, 1, 5, 1), |buf| {
                buf.set_string(2, 1, "hello", Style::default());
            })
            .unwrap();

        let mut target = Buffer::empty(Rect::new(0, 0, 10, 4));
        surface.copy_into(&mut target);
        assert_eq!(target.get(2, 1).symbol(), "h");
        assert_eq!(target.get(6, 1).symbol(), "o");
    }

    #[test]
    fn test_draw_outside_is_rejected() {
        let surface = DisplaySurface::new(TermSize::new(10, 4));
        let mut called = false;
        let result = surface.draw(Rect::new(8, 0, 5, 1), |_| called = true);

        assert!(matches!(result, Err(MonitorError::OutOfBounds(_))));
        assert!(!called);
    }

    #[test]
    fn test_reset_shrinks_and_clears() {
        let surface = DisplaySurface::new(TermSize::new(80, 24));
        surface
            .draw(Rect::new(0, 0, 1, 1), |buf| {
                buf.set_string(0, 0, "x", Style::default());
            })
            .unwrap();

        surface.reset(TermSize::new(40, 10));
        assert_eq!(surface.area(), Rect::new(0, 0, 40, 10));
        assert!(surface.draw(Rect::new(0, 0, 80, 24), |_| {}).is_err());

        // A larger target only receives the shared cells
        let mut target = Buffer::empty(Rect::new(0, 0, 80, 24));
        surface.copy_into(&mut target);
        assert_eq!(target.get(0, 0).symbol(), " ");
    }
}
