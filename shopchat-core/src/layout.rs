// ABOUTME: Panel sizing derived from the host viewport, recomputed on every resize
// ABOUTME: Pure function of the current dimensions plus a tracker holding the last result

/// Widths below this are treated as a phone-sized viewport
pub const COMPACT_BREAKPOINT: f64 = 640.0;
/// Fixed gap between the panel and the bottom of the viewport
pub const BOTTOM_MARGIN: f64 = 16.0;

const COMPACT_HEIGHT_RATIO: f64 = 0.9;
const COMPACT_HEIGHT_CAP: f64 = 650.0;
const REGULAR_HEIGHT_RATIO: f64 = 0.85;
const REGULAR_HEIGHT_CAP: f64 = 750.0;
const COMPACT_PANEL_WIDTH: f64 = 384.0;
const REGULAR_PANEL_WIDTH: f64 = 420.0;

/// Host viewport size in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Sizing bounds for the chat panel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelLayout {
    pub is_compact: bool,
    pub max_height: f64,
    pub bottom_margin: f64,
    pub panel_width: f64,
    /// 1% of the viewport height
    pub vh_unit: f64,
    /// 1% of the viewport width
    pub vw_unit: f64,
}

/// Compute the panel bounds for a viewport
pub fn compute_layout(viewport: Viewport) -> PanelLayout {
    let width = viewport.width.max(0.0);
    let height = viewport.height.max(0.0);
    let is_compact = width < COMPACT_BREAKPOINT;

    let max_height = if is_compact {
        (height * COMPACT_HEIGHT_RATIO).min(COMPACT_HEIGHT_CAP)
    } else {
        (height * REGULAR_HEIGHT_RATIO).min(REGULAR_HEIGHT_CAP)
    };
    let panel_width = if is_compact {
        COMPACT_PANEL_WIDTH
    } else {
        REGULAR_PANEL_WIDTH
    }
    .min(width);

    PanelLayout {
        is_compact,
        max_height,
        bottom_margin: BOTTOM_MARGIN,
        panel_width,
        vh_unit: height * 0.01,
        vw_unit: width * 0.01,
    }
}

/// Holds the layout for the most recent viewport event
#[derive(Debug, Clone)]
pub struct LayoutTracker {
    viewport: Viewport,
    layout: PanelLayout,
}

impl LayoutTracker {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            layout: compute_layout(viewport),
        }
    }

    /// Recompute eagerly on resize or orientation change
    pub fn on_viewport_change(&mut self, viewport: Viewport) -> PanelLayout {
        if viewport != self.viewport {
            tracing::debug!(
                width = viewport.width,
                height = viewport.height,
                "Viewport changed"
            );
        }
        self.viewport = viewport;
        self.layout = compute_layout(viewport);
        self.layout
    }

    pub fn current(&self) -> PanelLayout {
        self.layout
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_layout_caps_height() {
        let layout = compute_layout(Viewport::new(375.0, 812.0));
        assert!(layout.is_compact);
        assert_eq!(layout.max_height, 650.0);
        assert_eq!(layout.panel_width, 375.0);
        assert_eq!(layout.bottom_margin, BOTTOM_MARGIN);
    }

    #[test]
    fn test_compact_layout_short_screen_uses_ratio() {
        let layout = compute_layout(Viewport::new(600.0, 500.0));
        assert!(layout.is_compact);
        assert!((layout.max_height - 450.0).abs() < 1e-9);
        assert_eq!(layout.panel_width, 384.0);
    }

    #[test]
    fn test_regular_layout() {
        let layout = compute_layout(Viewport::new(1440.0, 800.0));
        assert!(!layout.is_compact);
        assert!((layout.max_height - 680.0).abs() < 1e-9);
        assert_eq!(layout.panel_width, 420.0);

        let tall = compute_layout(Viewport::new(1440.0, 1200.0));
        assert_eq!(tall.max_height, 750.0);
    }

    #[test]
    fn test_breakpoint_is_exclusive() {
        assert!(!compute_layout(Viewport::new(640.0, 800.0)).is_compact);
        assert!(compute_layout(Viewport::new(639.9, 800.0)).is_compact);
    }

    #[test]
    fn test_tracker_recomputes_on_change() {
        let mut tracker = LayoutTracker::new(Viewport::new(1024.0, 768.0));
        assert!(!tracker.current().is_compact);

        let layout = tracker.on_viewport_change(Viewport::new(390.0, 844.0));
        assert!(layout.is_compact);
        assert_eq!(tracker.current(), layout);
        assert!((tracker.current().vh_unit - 8.44).abs() < 1e-9);
    }
}
