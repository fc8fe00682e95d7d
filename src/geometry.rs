use serde::{Deserialize, Serialize};

use crate::config::WindowConfig;

/// Smallest surface the host will ever ask the compositor for.
/// Resize requests below this (including zero) are clamped up, never rejected.
pub(crate) const MIN_WIDTH: u32 = 160;
pub(crate) const MIN_HEIGHT: u32 = 120;

/// Pixel length as a display-space offset, saturating instead of wrapping.
fn px(len: u32) -> i32 {
    i32::try_from(len).unwrap_or(i32::MAX)
}

/// Logical rectangle of the primary output, in display space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkArea {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl WorkArea {
    pub(crate) const FALLBACK: WorkArea = WorkArea {
        x: 0,
        y: 0,
        width: 1920,
        height: 1080,
    };

    pub fn right(&self) -> i32 {
        self.x.saturating_add(px(self.width))
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(px(self.height))
    }
}

/// Window bounds in display space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowGeometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Layer-shell margins, in the `(top, right, bottom, left)` order the
/// compositor protocol uses.
pub(crate) type Margins = (i32, i32, i32, i32);

impl WindowGeometry {
    /// Place a `window.width × window.height` surface in the bottom-right
    /// corner of `area`, inset by the configured margins. Oversized configs
    /// are shrunk to fit so the window never starts left of or above `area`.
    pub fn initial(area: WorkArea, window: &WindowConfig) -> Self {
        let room_x = area.width.saturating_sub(window.margin_x).max(MIN_WIDTH);
        let room_y = area.height.saturating_sub(window.margin_y).max(MIN_HEIGHT);
        let width = window.width.clamp(MIN_WIDTH, room_x);
        let height = window.height.clamp(MIN_HEIGHT, room_y);
        Self {
            x: area
                .right()
                .saturating_sub(px(width))
                .saturating_sub(px(window.margin_x))
                .max(area.x),
            y: area
                .bottom()
                .saturating_sub(px(height))
                .saturating_sub(px(window.margin_y))
                .max(area.y),
            width,
            height,
        }
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(px(self.height))
    }

    /// Bounds after a content-driven resize.
    ///
    /// The bottom edge and `x` are held; the top edge moves. Sizes are clamped
    /// to `[MIN_*, room left in the work area]`.
    pub fn resized(&self, area: WorkArea, width: i64, height: i64) -> Self {
        let bottom = self.bottom();
        let max_width = area.right().saturating_sub(self.x).max(MIN_WIDTH as i32) as i64;
        let max_height = bottom.saturating_sub(area.y).max(MIN_HEIGHT as i32) as i64;
        let width = width.clamp(MIN_WIDTH as i64, max_width) as u32;
        let height = height.clamp(MIN_HEIGHT as i64, max_height) as u32;
        Self {
            x: self.x,
            y: bottom.saturating_sub(px(height)),
            width,
            height,
        }
    }

    /// Margins for a surface anchored bottom + left, relative to `area`.
    pub(crate) fn margins(&self, area: WorkArea) -> Margins {
        (0, 0, area.bottom() - self.bottom(), self.x - area.x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(width: u32, height: u32, margin: u32) -> WindowConfig {
        WindowConfig {
            width,
            height,
            margin_x: margin,
            margin_y: margin,
        }
    }

    #[test]
    fn initial_bounds_on_1080p() {
        let geo = WindowGeometry::initial(WorkArea::FALLBACK, &config(450, 750, 20));
        assert_eq!(
            geo,
            WindowGeometry {
                x: 1450,
                y: 310,
                width: 450,
                height: 750
            }
        );
        assert_eq!(geo.bottom(), 1060);
    }

    #[test]
    fn initial_bounds_respect_output_origin() {
        let area = WorkArea {
            x: 1920,
            y: 0,
            width: 2560,
            height: 1440,
        };
        let geo = WindowGeometry::initial(area, &config(450, 750, 20));
        assert_eq!(geo.x, 1920 + 2560 - 450 - 20);
        assert_eq!(geo.bottom(), 1420);
        assert_eq!(geo.margins(area), (0, 0, 20, 2560 - 450 - 20));
    }

    #[test]
    fn resize_holds_bottom_edge_and_x() {
        let area = WorkArea::FALLBACK;
        let geo = WindowGeometry::initial(area, &config(450, 750, 20));
        for (w, h) in [(450, 200), (300, 900), (600, 1000), (451, 751), (160, 120)] {
            let next = geo.resized(area, w, h);
            assert_eq!(next.bottom(), geo.bottom(), "bottom moved for {w}x{h}");
            assert_eq!(next.x, geo.x, "x moved for {w}x{h}");
        }
    }

    #[test]
    fn resize_grows_upward() {
        let area = WorkArea::FALLBACK;
        let geo = WindowGeometry::initial(area, &config(450, 750, 20));
        let next = geo.resized(area, 450, 900);
        assert_eq!(
            next,
            WindowGeometry {
                x: 1450,
                y: 160,
                width: 450,
                height: 900
            }
        );
    }

    #[test]
    fn degenerate_sizes_clamp_to_minimum() {
        let area = WorkArea::FALLBACK;
        let geo = WindowGeometry::initial(area, &config(450, 750, 20));
        for (w, h) in [(0, 0), (-5, -100), (1, 1)] {
            let next = geo.resized(area, w, h);
            assert_eq!((next.width, next.height), (MIN_WIDTH, MIN_HEIGHT));
            assert_eq!(next.bottom(), geo.bottom());
        }
    }

    #[test]
    fn oversized_requests_clamp_to_work_area() {
        let area = WorkArea::FALLBACK;
        let geo = WindowGeometry::initial(area, &config(450, 750, 20));
        let next = geo.resized(area, 10_000, 10_000);
        assert_eq!(next.y, area.y);
        assert_eq!(next.height, 1060);
        assert_eq!(next.width, 470);
        assert_eq!(next.bottom(), geo.bottom());
    }

    #[test]
    fn bottom_margin_matches_configured_margin() {
        let area = WorkArea::FALLBACK;
        let geo = WindowGeometry::initial(area, &config(450, 750, 20));
        assert_eq!(geo.margins(area), (0, 0, 20, 1450));
        let grown = geo.resized(area, 450, 300);
        assert_eq!(grown.margins(area), geo.margins(area));
    }

    #[test]
    fn huge_config_values_stay_inside_work_area() {
        let area = WorkArea::FALLBACK;
        let geo = WindowGeometry::initial(area, &config(u32::MAX, u32::MAX, 20));
        assert_eq!(
            geo,
            WindowGeometry {
                x: 0,
                y: 0,
                width: 1900,
                height: 1060
            }
        );

        let geo = WindowGeometry::initial(area, &config(450, 750, u32::MAX));
        assert!(geo.x >= area.x && geo.y >= area.y);
        assert!(geo.x <= area.right() && geo.bottom() <= area.bottom());
    }

    #[test]
    fn huge_work_area_does_not_wrap() {
        let area = WorkArea {
            x: 0,
            y: 0,
            width: u32::MAX,
            height: u32::MAX,
        };
        assert_eq!(area.right(), i32::MAX);
        assert_eq!(area.bottom(), i32::MAX);
        let geo = WindowGeometry::initial(area, &config(450, 750, 20));
        assert!(geo.x > 0 && geo.y > 0);
    }
}
