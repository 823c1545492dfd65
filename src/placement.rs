//! Canvas placement geometry for generated images.
//!
//! Everything here is pure and total: placement depends only on the parent
//! widget snapshot and static offsets, so results are deterministic and the
//! functions have no failure modes.
use serde::{Deserialize, Serialize};

/// Horizontal offset from the parent widget. Places the image to the right of
/// the prompt widget.
pub const DEFAULT_OFFSET_X: f64 = 300.0;

/// Vertical offset from the parent widget, slightly below for visual hierarchy.
pub const DEFAULT_OFFSET_Y: f64 = 50.0;

/// A 2D position on the canvas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WidgetLocation {
    pub x: f64,
    pub y: f64,
}

/// Widget dimensions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WidgetSize {
    pub width: f64,
    pub height: f64,
}

/// Read-only snapshot of the widget that triggered a generation run.
/// The pipeline never mutates it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParentWidget {
    pub id: String,
    pub location: WidgetLocation,
    pub size: WidgetSize,
    pub scale: f64,
    pub depth: f64,
}

/// Offsets applied when computing image placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementConfig {
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        PlacementConfig {
            offset_x: DEFAULT_OFFSET_X,
            offset_y: DEFAULT_OFFSET_Y,
        }
    }
}

/// Compute the coordinates for placing an image relative to its parent widget.
/// By default the image lands to the right of the parent (x+300, y+50).
pub fn calculate_placement(parent: &ParentWidget) -> (f64, f64) {
    calculate_placement_with_config(parent, &PlacementConfig::default())
}

/// Placement with custom offsets.
pub fn calculate_placement_with_config(
    parent: &ParentWidget,
    config: &PlacementConfig,
) -> (f64, f64) {
    (
        parent.location.x + config.offset_x,
        parent.location.y + config.offset_y,
    )
}

/// Placement accounting for the parent's width: the image abuts the parent's
/// right edge plus the configured horizontal offset.
pub fn calculate_placement_with_size(
    parent: &ParentWidget,
    config: &PlacementConfig,
) -> (f64, f64) {
    (
        parent.location.x + parent.size.width + config.offset_x,
        parent.location.y + config.offset_y,
    )
}

/// Placement centered horizontally below the parent, for layouts where
/// responses appear underneath their prompts.
pub fn calculate_centered_placement(parent: &ParentWidget, new_width: f64) -> (f64, f64) {
    (
        parent.location.x + (parent.size.width - new_width) / 2.0,
        parent.location.y + parent.size.height + DEFAULT_OFFSET_Y,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parent(x: f64, y: f64, width: f64, height: f64) -> ParentWidget {
        ParentWidget {
            id: "w1".to_string(),
            location: WidgetLocation { x, y },
            size: WidgetSize { width, height },
            scale: 1.0,
            depth: 0.0,
        }
    }

    #[test]
    fn default_placement_offsets_right_and_down() {
        let (x, y) = calculate_placement(&parent(100.0, 200.0, 400.0, 300.0));
        assert_eq!(x, 400.0);
        assert_eq!(y, 250.0);
    }

    #[test]
    fn default_placement_from_origin() {
        let (x, y) = calculate_placement(&parent(0.0, 0.0, 0.0, 0.0));
        assert_eq!(x, DEFAULT_OFFSET_X);
        assert_eq!(y, DEFAULT_OFFSET_Y);
    }

    #[test]
    fn custom_offsets() {
        let config = PlacementConfig {
            offset_x: 10.0,
            offset_y: -20.0,
        };
        let (x, y) = calculate_placement_with_config(&parent(100.0, 100.0, 50.0, 50.0), &config);
        assert_eq!(x, 110.0);
        assert_eq!(y, 80.0);
    }

    #[test]
    fn size_aware_placement_abuts_right_edge() {
        let config = PlacementConfig {
            offset_x: 25.0,
            offset_y: 5.0,
        };
        let (x, y) = calculate_placement_with_size(&parent(100.0, 200.0, 400.0, 300.0), &config);
        assert_eq!(x, 525.0);
        assert_eq!(y, 205.0);
    }

    #[test]
    fn centered_placement_below_parent() {
        let (x, y) = calculate_centered_placement(&parent(100.0, 200.0, 400.0, 300.0), 200.0);
        assert_eq!(x, 200.0);
        assert_eq!(y, 550.0);
    }

    #[test]
    fn centered_placement_wider_than_parent() {
        let (x, y) = calculate_centered_placement(&parent(0.0, 0.0, 100.0, 100.0), 300.0);
        assert_eq!(x, -100.0);
        assert_eq!(y, 150.0);
    }
}
