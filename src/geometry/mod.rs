//! Oriented layer boxes and the transform handles drawn around the selected
//! layer. A layer box is the unrotated text box placed at the layer's
//! top-left anchor and rotated about that anchor.

pub mod hit_testing;

use egui::emath::Rot2;
use egui::{Pos2, Rect, Vec2};

use crate::layer::TextLayer;
use crate::text::FontBook;

/// Side of the square resize handles
pub const HANDLE_SIZE: f32 = 10.0;
/// Distance of the rotate handle above the top edge
pub const ROTATION_HANDLE_OFFSET: f32 = 30.0;
/// Extra pick radius around handles
pub const HANDLE_PICK_RADIUS: f32 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Rotate,
}

impl Handle {
    pub const ALL: [Handle; 5] = [
        Handle::TopLeft,
        Handle::TopRight,
        Handle::BottomLeft,
        Handle::BottomRight,
        Handle::Rotate,
    ];

    pub fn is_corner(self) -> bool {
        !matches!(self, Handle::Rotate)
    }

    /// The corner that stays fixed while this corner is dragged
    pub fn opposite(self) -> Option<Handle> {
        match self {
            Handle::TopLeft => Some(Handle::BottomRight),
            Handle::TopRight => Some(Handle::BottomLeft),
            Handle::BottomLeft => Some(Handle::TopRight),
            Handle::BottomRight => Some(Handle::TopLeft),
            Handle::Rotate => None,
        }
    }
}

/// A rectangle of `size` whose top-left corner sits at `origin`, rotated by
/// `rotation` degrees clockwise about that corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedBox {
    pub origin: Pos2,
    pub size: Vec2,
    pub rotation: f32,
}

impl OrientedBox {
    pub fn for_layer(layer: &TextLayer, fonts: &FontBook) -> Self {
        Self {
            origin: layer.position,
            size: fonts.measure(layer),
            rotation: layer.rotation,
        }
    }

    fn rot(&self) -> Rot2 {
        Rot2::from_angle(self.rotation.to_radians())
    }

    /// Box-local point to canvas coordinates
    pub fn to_canvas(&self, local: Vec2) -> Pos2 {
        self.origin + self.rot() * local
    }

    /// Canvas point to box-local coordinates
    pub fn to_local(&self, canvas: Pos2) -> Vec2 {
        self.rot().inverse() * (canvas - self.origin)
    }

    pub fn local_rect(&self) -> Rect {
        Rect::from_min_size(Pos2::ZERO, self.size)
    }

    pub fn center(&self) -> Pos2 {
        self.to_canvas(self.size / 2.0)
    }

    /// Corners in drawing order: top-left, top-right, bottom-right, bottom-left
    pub fn corners(&self) -> [Pos2; 4] {
        [
            self.to_canvas(Vec2::ZERO),
            self.to_canvas(Vec2::new(self.size.x, 0.0)),
            self.to_canvas(self.size),
            self.to_canvas(Vec2::new(0.0, self.size.y)),
        ]
    }

    pub fn handle_local(&self, handle: Handle) -> Vec2 {
        match handle {
            Handle::TopLeft => Vec2::ZERO,
            Handle::TopRight => Vec2::new(self.size.x, 0.0),
            Handle::BottomLeft => Vec2::new(0.0, self.size.y),
            Handle::BottomRight => self.size,
            Handle::Rotate => Vec2::new(self.size.x / 2.0, -ROTATION_HANDLE_OFFSET),
        }
    }

    pub fn handle_position(&self, handle: Handle) -> Pos2 {
        self.to_canvas(self.handle_local(handle))
    }

    /// Axis-aligned bounds of the rotated box
    pub fn bounds(&self) -> Rect {
        let corners = self.corners();
        let mut rect = Rect::from_min_max(corners[0], corners[0]);
        for corner in &corners[1..] {
            rect.extend_with(*corner);
        }
        rect
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quarter_turn_rotates_about_origin() {
        let oriented = OrientedBox {
            origin: Pos2::new(100.0, 50.0),
            size: Vec2::new(40.0, 20.0),
            rotation: 90.0,
        };
        let top_right = oriented.handle_position(Handle::TopRight);
        assert!((top_right - Pos2::new(100.0, 90.0)).length() < 1e-3);

        let local = oriented.to_local(Pos2::new(90.0, 70.0));
        assert!((local - Vec2::new(20.0, 10.0)).length() < 1e-3);

        let bounds = oriented.bounds();
        assert!((bounds.min - Pos2::new(80.0, 50.0)).length() < 1e-3);
        assert!((bounds.max - Pos2::new(100.0, 90.0)).length() < 1e-3);
    }
}
