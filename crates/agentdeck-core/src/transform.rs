//! Canvas transform math: world↔screen mapping, pointer-pinned zoom,
//! and fit-to-bounds. Pure functions over [`CanvasTransform`].
//!
//! World coordinates are canvas-content space; screen coordinates are
//! viewport pixels. The two are related by `screen = offset + world * zoom`.

use serde::{Deserialize, Serialize};

use crate::types::{AgentTile, Point, Size};

pub const MIN_ZOOM: f64 = 0.25;
pub const MAX_ZOOM: f64 = 3.0;

/// Ephemeral per-view transform. Never persisted.
///
/// Invariant: `zoom` stays within `[MIN_ZOOM, MAX_ZOOM]` for any
/// transform produced by this module.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasTransform {
    pub zoom: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Default for CanvasTransform {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

/// Clamp a requested zoom into the allowed range. Idempotent.
pub fn clamp_zoom(zoom: f64) -> f64 {
    zoom.clamp(MIN_ZOOM, MAX_ZOOM)
}

/// Map a viewport-pixel point into canvas-content space.
pub fn screen_to_world(t: &CanvasTransform, screen: Point) -> Point {
    Point {
        x: (screen.x - t.offset_x) / t.zoom,
        y: (screen.y - t.offset_y) / t.zoom,
    }
}

/// Exact inverse of [`screen_to_world`] for any `zoom > 0`.
pub fn world_to_screen(t: &CanvasTransform, world: Point) -> Point {
    Point {
        x: t.offset_x + world.x * t.zoom,
        y: t.offset_y + world.y * t.zoom,
    }
}

/// Zoom anchored at a screen point: the world point currently under
/// `screen_point` stays under it after the zoom change.
pub fn zoom_at_screen_point(
    t: &CanvasTransform,
    requested_zoom: f64,
    screen_point: Point,
) -> CanvasTransform {
    let world = screen_to_world(t, screen_point);
    let next_zoom = clamp_zoom(requested_zoom);

    CanvasTransform {
        zoom: next_zoom,
        offset_x: screen_point.x - world.x * next_zoom,
        offset_y: screen_point.y - world.y * next_zoom,
    }
}

/// Fit all tile rectangles into the viewport with `padding_px` on each
/// side, centered, at the largest allowed zoom. An empty tile slice
/// returns the current transform unchanged.
pub fn zoom_to_fit(
    tiles: &[AgentTile],
    viewport: Size,
    padding_px: f64,
    current: &CanvasTransform,
) -> CanvasTransform {
    if tiles.is_empty() {
        return *current;
    }

    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for tile in tiles {
        min_x = min_x.min(tile.position.x);
        min_y = min_y.min(tile.position.y);
        max_x = max_x.max(tile.position.x + tile.size.width);
        max_y = max_y.max(tile.position.y + tile.size.height);
    }

    let bounds_width = (max_x - min_x).max(1.0);
    let bounds_height = (max_y - min_y).max(1.0);
    let available_width = (viewport.width - padding_px * 2.0).max(1.0);
    let available_height = (viewport.height - padding_px * 2.0).max(1.0);

    let zoom = clamp_zoom((available_width / bounds_width).min(available_height / bounds_height));
    let center_x = (min_x + max_x) / 2.0;
    let center_y = (min_y + max_y) / 2.0;

    CanvasTransform {
        zoom,
        offset_x: viewport.width / 2.0 - center_x * zoom,
        offset_y: viewport.height / 2.0 - center_y * zoom,
    }
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TileRole;
    use proptest::prelude::*;

    fn make_tile(id: &str, position: Point, size: Size) -> AgentTile {
        AgentTile::new(
            id.into(),
            format!("agent-{id}"),
            format!("Tile {id}"),
            TileRole::Coding,
            format!("agent:{id}:main"),
            position,
            size,
        )
    }

    #[test]
    fn clamp_zoom_bounds() {
        assert!((clamp_zoom(0.1) - 0.25).abs() < 1e-9);
        assert!((clamp_zoom(5.0) - 3.0).abs() < 1e-9);
        assert!((clamp_zoom(1.2) - 1.2).abs() < 1e-9);
    }

    #[test]
    fn clamp_zoom_idempotent() {
        for z in [0.01, 0.25, 1.0, 2.9, 3.0, 100.0] {
            assert_eq!(clamp_zoom(z), clamp_zoom(clamp_zoom(z)));
        }
    }

    #[test]
    fn screen_world_roundtrip() {
        let t = CanvasTransform {
            zoom: 1.5,
            offset_x: 120.0,
            offset_y: -80.0,
        };
        let world = Point::new(300.0, -200.0);
        let screen = world_to_screen(&t, world);
        let back = screen_to_world(&t, screen);
        assert!((back.x - world.x).abs() < 1e-6);
        assert!((back.y - world.y).abs() < 1e-6);
    }

    #[test]
    fn zoom_pins_point_under_cursor() {
        let t = CanvasTransform {
            zoom: 1.0,
            offset_x: 50.0,
            offset_y: 25.0,
        };
        let screen_point = Point::new(200.0, 150.0);
        let world_point = screen_to_world(&t, screen_point);

        let next = zoom_at_screen_point(&t, 2.0, screen_point);
        let pinned = world_to_screen(&next, world_point);

        assert!((pinned.x - screen_point.x).abs() < 1e-6);
        assert!((pinned.y - screen_point.y).abs() < 1e-6);
    }

    #[test]
    fn zoom_at_screen_point_clamps() {
        let t = CanvasTransform::default();
        let next = zoom_at_screen_point(&t, 10.0, Point::new(0.0, 0.0));
        assert!((next.zoom - MAX_ZOOM).abs() < 1e-9);
    }

    #[test]
    fn zoom_to_fit_empty_is_noop() {
        let current = CanvasTransform {
            zoom: 1.2,
            offset_x: 40.0,
            offset_y: -20.0,
        };
        let result = zoom_to_fit(&[], Size::new(900.0, 700.0), 40.0, &current);
        assert_eq!(result, current);
    }

    #[test]
    fn zoom_to_fit_places_bounds_inside_padding() {
        let tiles = vec![
            make_tile("1", Point::new(120.0, 80.0), Size::new(400.0, 300.0)),
            make_tile("2", Point::new(700.0, 500.0), Size::new(240.0, 200.0)),
        ];
        let viewport = Size::new(1200.0, 800.0);
        let padding = 60.0;
        let current = CanvasTransform::default();

        let t = zoom_to_fit(&tiles, viewport, padding, &current);

        let top_left = world_to_screen(&t, Point::new(120.0, 80.0));
        let bottom_right = world_to_screen(&t, Point::new(940.0, 700.0));
        assert!(top_left.x >= padding - 0.5);
        assert!(top_left.y >= padding - 0.5);
        assert!(bottom_right.x <= viewport.width - padding + 0.5);
        assert!(bottom_right.y <= viewport.height - padding + 0.5);
    }

    #[test]
    fn zoom_to_fit_centers_single_tile() {
        let tiles = vec![make_tile("1", Point::new(0.0, 0.0), Size::new(100.0, 100.0))];
        let viewport = Size::new(1000.0, 1000.0);
        let t = zoom_to_fit(&tiles, viewport, 100.0, &CanvasTransform::default());

        let center = world_to_screen(&t, Point::new(50.0, 50.0));
        assert!((center.x - 500.0).abs() < 1e-6);
        assert!((center.y - 500.0).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn prop_roundtrip(
            zoom in 0.25f64..3.0,
            offset_x in -5000.0f64..5000.0,
            offset_y in -5000.0f64..5000.0,
            x in -10_000.0f64..10_000.0,
            y in -10_000.0f64..10_000.0,
        ) {
            let t = CanvasTransform { zoom, offset_x, offset_y };
            let p = Point::new(x, y);
            let back = screen_to_world(&t, world_to_screen(&t, p));
            prop_assert!((back.x - p.x).abs() < 1e-6);
            prop_assert!((back.y - p.y).abs() < 1e-6);
        }

        #[test]
        fn prop_zoom_keeps_anchor(
            zoom in 0.25f64..3.0,
            requested in 0.01f64..10.0,
            px in -2000.0f64..2000.0,
            py in -2000.0f64..2000.0,
        ) {
            let t = CanvasTransform { zoom, offset_x: 33.0, offset_y: -17.0 };
            let screen_point = Point::new(px, py);
            let world_point = screen_to_world(&t, screen_point);
            let next = zoom_at_screen_point(&t, requested, screen_point);
            let pinned = world_to_screen(&next, world_point);
            prop_assert!((pinned.x - screen_point.x).abs() < 1e-6);
            prop_assert!((pinned.y - screen_point.y).abs() < 1e-6);
            prop_assert!(next.zoom >= MIN_ZOOM && next.zoom <= MAX_ZOOM);
        }
    }
}
