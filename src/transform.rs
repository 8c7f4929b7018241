//! Pointer gestures on the selected layer: drag to move, corner handles to
//! resize, the top handle to rotate.
//!
//! Every frame is computed from the geometry captured when the gesture began,
//! never from the previous frame, so the committed result only depends on the
//! start state and the final pointer position. Scale is folded into the font
//! size immediately and never stored on the layer.

use egui::emath::Rot2;
use egui::{Pos2, Vec2};
use log::{debug, info};

use crate::geometry::hit_testing::hit_test;
use crate::geometry::{Handle, OrientedBox};
use crate::layer::{LayerId, LayerPatch, TextLayer, normalize_degrees};
use crate::scene::Scene;
use crate::selection::{self, HitTarget, Selection, SelectionInput};
use crate::text::FontBook;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformLimits {
    pub min_font_size: f32,
    pub max_font_size: f32,
    /// Smallest box a resize may shrink a layer to
    pub min_box: Vec2,
}

impl Default for TransformLimits {
    fn default() -> Self {
        Self {
            min_font_size: 10.0,
            max_font_size: 150.0,
            min_box: Vec2::new(20.0, 16.0),
        }
    }
}

/// The part of a layer a gesture may change
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerGeometry {
    pub position: Pos2,
    pub font_size: f32,
    pub rotation: f32,
}

impl LayerGeometry {
    pub fn of(layer: &TextLayer) -> Self {
        Self {
            position: layer.position,
            font_size: layer.font_size,
            rotation: layer.rotation,
        }
    }

    fn patch(&self) -> LayerPatch {
        LayerPatch {
            position: Some(self.position),
            font_size: Some(self.font_size),
            rotation: Some(self.rotation),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureKind {
    Move,
    Resize,
    Rotate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    Dragging {
        layer: LayerId,
        start: LayerGeometry,
        start_pointer: Pos2,
    },
    Resizing {
        layer: LayerId,
        start: LayerGeometry,
        handle: Handle,
        /// Opposite corner, fixed in canvas space
        anchor: Pos2,
        /// The anchor relative to the box origin, unrotated
        anchor_local: Vec2,
        /// Anchor to dragged corner at gesture start
        diagonal: Vec2,
        start_size: Vec2,
        /// Last scale factor that passed the limits
        scale: f32,
    },
    Rotating {
        layer: LayerId,
        start: LayerGeometry,
        center: Pos2,
        half_size: Vec2,
    },
}

impl Gesture {
    pub fn layer(&self) -> LayerId {
        match self {
            Gesture::Dragging { layer, .. } | Gesture::Resizing { layer, .. } | Gesture::Rotating { layer, .. } => *layer,
        }
    }

    pub fn kind(&self) -> GestureKind {
        match self {
            Gesture::Dragging { .. } => GestureKind::Move,
            Gesture::Resizing { .. } => GestureKind::Resize,
            Gesture::Rotating { .. } => GestureKind::Rotate,
        }
    }

    /// Layer geometry when the gesture began
    pub fn start(&self) -> LayerGeometry {
        match self {
            Gesture::Dragging { start, .. } | Gesture::Resizing { start, .. } | Gesture::Rotating { start, .. } => *start,
        }
    }
}

/// Result of a pointer-down
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerDown {
    pub target: HitTarget,
    /// New selection, if the press changed it
    pub selection: Option<Selection>,
    pub gesture: Option<GestureKind>,
}

/// A finished gesture and the geometry written to the scene
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureCommit {
    pub layer: LayerId,
    pub kind: GestureKind,
    pub geometry: LayerGeometry,
}

#[derive(Debug, Clone, Default)]
pub struct TransformController {
    gesture: Option<Gesture>,
    limits: TransformLimits,
}

impl TransformController {
    pub fn new(limits: TransformLimits) -> Self {
        Self { gesture: None, limits }
    }

    pub fn limits(&self) -> TransformLimits {
        self.limits
    }

    pub fn gesture(&self) -> Option<&Gesture> {
        self.gesture.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.gesture.is_some()
    }

    /// Hit-test `pos`, update the selection and start a gesture on whatever
    /// was grabbed. Pressing the bare surface deselects and starts nothing.
    pub fn pointer_down(&mut self, scene: &mut Scene, fonts: &FontBook, pos: Pos2) -> PointerDown {
        if self.gesture.is_some() {
            // a second press without a release, e.g. focus lost mid-drag
            self.cancel(scene);
        }

        let target = hit_test(scene, fonts, pos);
        let changed = selection::transition(scene, SelectionInput::PointerDown(target));

        self.gesture = match target {
            HitTarget::Surface => None,
            HitTarget::Layer(id) => scene.layer(id).map(|layer| Gesture::Dragging {
                layer: id,
                start: LayerGeometry::of(layer),
                start_pointer: pos,
            }),
            HitTarget::Handle(id, Handle::Rotate) => scene.layer(id).map(|layer| {
                let bounds = OrientedBox::for_layer(layer, fonts);
                Gesture::Rotating {
                    layer: id,
                    start: LayerGeometry::of(layer),
                    center: bounds.center(),
                    half_size: bounds.size / 2.0,
                }
            }),
            HitTarget::Handle(id, handle) => scene.layer(id).and_then(|layer| {
                let opposite = handle.opposite()?;
                let bounds = OrientedBox::for_layer(layer, fonts);
                let anchor = bounds.handle_position(opposite);
                Some(Gesture::Resizing {
                    layer: id,
                    start: LayerGeometry::of(layer),
                    handle,
                    anchor,
                    anchor_local: bounds.handle_local(opposite),
                    diagonal: bounds.handle_position(handle) - anchor,
                    start_size: bounds.size,
                    scale: 1.0,
                })
            }),
        };

        if let Some(gesture) = &self.gesture {
            debug!("Gesture {:?} started on layer {}", gesture.kind(), gesture.layer());
        }

        PointerDown {
            target,
            selection: changed,
            gesture: self.gesture.as_ref().map(Gesture::kind),
        }
    }

    /// Apply the live frame for `pos`. Returns whether the scene changed.
    pub fn pointer_move(&mut self, scene: &mut Scene, pos: Pos2) -> bool {
        let Some(geometry) = self.frame(pos) else {
            return false;
        };
        let Some(layer) = self.gesture.as_ref().map(Gesture::layer) else {
            return false;
        };
        if !scene.contains(layer) {
            debug!("Gesture target {layer} disappeared, dropping gesture");
            self.gesture = None;
            return false;
        }
        if scene.layer(layer).map(LayerGeometry::of) == Some(geometry) {
            return false;
        }
        scene.update_layer(layer, &geometry.patch())
    }

    /// Finish the gesture at `pos` and commit its geometry
    pub fn pointer_up(&mut self, scene: &mut Scene, pos: Pos2) -> Option<GestureCommit> {
        self.pointer_move(scene, pos);
        let gesture = self.gesture.take()?;
        let layer = scene.layer(gesture.layer())?;
        let geometry = LayerGeometry::of(layer);
        if geometry == gesture.start() {
            return None;
        }

        info!(
            "Committed {:?} on layer {}: pos=({:.1}, {:.1}) size={:.1} rotation={:.1}",
            gesture.kind(),
            gesture.layer(),
            geometry.position.x,
            geometry.position.y,
            geometry.font_size,
            geometry.rotation
        );
        Some(GestureCommit {
            layer: gesture.layer(),
            kind: gesture.kind(),
            geometry,
        })
    }

    /// Abort the gesture and put the layer back where it started
    pub fn cancel(&mut self, scene: &mut Scene) -> bool {
        let Some(gesture) = self.gesture.take() else {
            return false;
        };
        debug!("Gesture {:?} on layer {} cancelled", gesture.kind(), gesture.layer());
        let start = gesture.start();
        if scene.layer(gesture.layer()).map(LayerGeometry::of) == Some(start) {
            return false;
        }
        scene.update_layer(gesture.layer(), &start.patch())
    }

    /// Geometry for the current gesture at pointer `pos`. A resize frame that
    /// breaks the limits keeps the last accepted scale.
    fn frame(&mut self, pos: Pos2) -> Option<LayerGeometry> {
        let limits = self.limits;
        match self.gesture.as_mut()? {
            Gesture::Dragging { start, start_pointer, .. } => Some(LayerGeometry {
                position: start.position + (pos - *start_pointer),
                ..*start
            }),
            Gesture::Resizing {
                start,
                anchor,
                anchor_local,
                diagonal,
                start_size,
                scale,
                ..
            } => {
                if let Some(accepted) = resize_scale(&limits, *anchor, *diagonal, *start_size, start.font_size, pos) {
                    *scale = accepted;
                }
                let font_size = (start.font_size * *scale).max(limits.min_font_size);
                let effective = font_size / start.font_size;
                let rot = Rot2::from_angle(start.rotation.to_radians());
                Some(LayerGeometry {
                    position: *anchor - rot * (*anchor_local * effective),
                    font_size,
                    rotation: start.rotation,
                })
            }
            Gesture::Rotating { start, center, half_size, .. } => {
                let rotation = rotation_towards(*center, pos).unwrap_or(start.rotation);
                let rot = Rot2::from_angle(rotation.to_radians());
                Some(LayerGeometry {
                    position: *center - rot * *half_size,
                    font_size: start.font_size,
                    rotation,
                })
            }
        }
    }
}

/// Uniform scale for a corner drag: the pointer projected onto the starting
/// anchor-to-corner diagonal. `None` when the frame must be rejected.
pub fn resize_scale(
    limits: &TransformLimits,
    anchor: Pos2,
    diagonal: Vec2,
    start_size: Vec2,
    start_font: f32,
    pointer: Pos2,
) -> Option<f32> {
    let length_sq = diagonal.length_sq();
    if length_sq <= f32::EPSILON || start_font <= 0.0 {
        return None;
    }
    let scale = (pointer - anchor).dot(diagonal) / length_sq;
    if !scale.is_finite() || scale <= 0.0 {
        return None;
    }
    let size = start_size * scale;
    if scale < 1.0 && (size.x < limits.min_box.x || size.y < limits.min_box.y) {
        return None;
    }
    if start_font * scale > limits.max_font_size {
        return None;
    }
    Some(scale)
}

/// Rotation in degrees that points the layer's top edge at `pointer`.
/// Straight up is 0, clockwise positive.
pub fn rotation_towards(center: Pos2, pointer: Pos2) -> Option<f32> {
    let delta = pointer - center;
    if delta.length_sq() <= f32::EPSILON {
        return None;
    }
    Some(normalize_degrees(delta.y.atan2(delta.x).to_degrees() + 90.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{LayerDefaults, create_layer};

    struct Fixture {
        scene: Scene,
        fonts: FontBook,
        controller: TransformController,
        id: LayerId,
    }

    fn fixture() -> Fixture {
        let fonts = FontBook::with_defaults().expect("fonts");
        let mut scene = Scene::new(Vec2::new(600.0, 600.0), (10.0, 150.0));
        let mut layer = create_layer(&LayerDefaults::default(), 0, scene.canvas_size());
        layer.content = "HELLO".to_owned();
        layer.position = Pos2::new(200.0, 200.0);
        let id = layer.id;
        scene.add_layer(layer);
        Fixture {
            scene,
            fonts,
            controller: TransformController::new(TransformLimits::default()),
            id,
        }
    }

    fn bounds(f: &Fixture) -> OrientedBox {
        OrientedBox::for_layer(f.scene.layer(f.id).expect("layer"), &f.fonts)
    }

    #[test]
    fn test_drag_commits_final_position() {
        let mut f = fixture();
        let grab = bounds(&f).center();
        let down = f.controller.pointer_down(&mut f.scene, &f.fonts, grab);
        assert_eq!(down.gesture, Some(GestureKind::Move));

        f.controller.pointer_move(&mut f.scene, grab + Vec2::new(5.0, 5.0));
        let commit = f
            .controller
            .pointer_up(&mut f.scene, grab + Vec2::new(30.0, -10.0))
            .expect("commit");
        assert_eq!(commit.kind, GestureKind::Move);
        assert!((commit.geometry.position - Pos2::new(230.0, 190.0)).length() < 0.001);
        let position = f.scene.layer(f.id).map(|l| l.position).expect("layer");
        assert_eq!(position, commit.geometry.position);
        assert!(!f.controller.is_active());
    }

    #[test]
    fn test_click_without_movement_commits_nothing() {
        let mut f = fixture();
        let grab = bounds(&f).center();
        f.controller.pointer_down(&mut f.scene, &f.fonts, grab);
        assert_eq!(f.controller.pointer_up(&mut f.scene, grab), None);
    }

    #[test]
    fn test_surface_press_deselects_without_gesture() {
        let mut f = fixture();
        let down = f.controller.pointer_down(&mut f.scene, &f.fonts, Pos2::new(5.0, 5.0));
        assert_eq!(down.target, HitTarget::Surface);
        assert_eq!(down.selection, Some(Selection::Idle));
        assert_eq!(down.gesture, None);
    }

    #[test]
    fn test_resize_grows_font_and_keeps_anchor() {
        let mut f = fixture();
        let before = bounds(&f);
        let corner = before.handle_position(Handle::BottomRight);
        let down = f.controller.pointer_down(&mut f.scene, &f.fonts, corner);
        assert_eq!(down.gesture, Some(GestureKind::Resize));

        let target = before.origin + before.size * 1.5;
        let commit = f.controller.pointer_up(&mut f.scene, target).expect("commit");
        assert!((commit.geometry.font_size - 48.0).abs() < 0.01);

        let after = bounds(&f);
        assert!((after.origin - before.origin).length() < 0.01);
        assert!((after.size.x - before.size.x * 1.5).abs() < 0.1);
    }

    #[test]
    fn test_resize_from_top_left_keeps_bottom_right() {
        let mut f = fixture();
        let before = bounds(&f);
        let fixed = before.handle_position(Handle::BottomRight);
        let corner = before.handle_position(Handle::TopLeft);
        f.controller.pointer_down(&mut f.scene, &f.fonts, corner);
        f.controller
            .pointer_up(&mut f.scene, fixed - before.size * 1.25)
            .expect("commit");

        let after = bounds(&f);
        assert!((after.handle_position(Handle::BottomRight) - fixed).length() < 0.1);
    }

    #[test]
    fn test_resize_below_minimum_box_is_rejected() {
        let mut f = fixture();
        let before = bounds(&f);
        let corner = before.handle_position(Handle::BottomRight);
        f.controller.pointer_down(&mut f.scene, &f.fonts, corner);

        // shrink to a sliver: height 32 * 0.1 is far below 16
        f.controller.pointer_move(&mut f.scene, before.origin + before.size * 0.1);
        assert_eq!(f.scene.layer(f.id).map(|l| l.font_size), Some(32.0));

        f.controller.pointer_up(&mut f.scene, before.origin + before.size * 0.1);
        let layer = f.scene.layer(f.id).expect("layer");
        assert_eq!(layer.font_size, 32.0);
        assert_eq!(layer.position, before.origin);
    }

    #[test]
    fn test_rejected_frame_keeps_last_accepted_scale() {
        let mut f = fixture();
        let before = bounds(&f);
        let corner = before.handle_position(Handle::BottomRight);
        f.controller.pointer_down(&mut f.scene, &f.fonts, corner);

        f.controller.pointer_move(&mut f.scene, before.origin + before.size * 0.75);
        let accepted = f.scene.layer(f.id).map(|l| l.font_size).expect("layer");
        assert!((accepted - 24.0).abs() < 0.01);
        f.controller.pointer_move(&mut f.scene, before.origin + before.size * 0.05);
        assert_eq!(f.scene.layer(f.id).map(|l| l.font_size), Some(accepted));
    }

    #[test]
    fn test_resize_above_max_font_is_rejected() {
        let mut f = fixture();
        let before = bounds(&f);
        let corner = before.handle_position(Handle::BottomRight);
        f.controller.pointer_down(&mut f.scene, &f.fonts, corner);
        f.controller.pointer_up(&mut f.scene, before.origin + before.size * 10.0);
        assert_eq!(f.scene.layer(f.id).map(|l| l.font_size), Some(32.0));
    }

    #[test]
    fn test_rotate_keeps_center_fixed() {
        let mut f = fixture();
        let before = bounds(&f);
        let handle = before.handle_position(Handle::Rotate);
        let down = f.controller.pointer_down(&mut f.scene, &f.fonts, handle);
        assert_eq!(down.gesture, Some(GestureKind::Rotate));

        let commit = f
            .controller
            .pointer_up(&mut f.scene, before.center() + Vec2::new(100.0, 0.0))
            .expect("commit");
        assert!((commit.geometry.rotation - 90.0).abs() < 0.01);
        assert!((bounds(&f).center() - before.center()).length() < 0.01);
    }

    #[test]
    fn test_rotation_is_normalized() {
        let center = Pos2::new(100.0, 100.0);
        let up = rotation_towards(center, Pos2::new(100.0, 0.0)).expect("angle");
        assert!(up < 0.01 || up > 359.99);
        let left = rotation_towards(center, Pos2::new(0.0, 100.0)).expect("angle");
        assert!((left - 270.0).abs() < 0.01);
        assert_eq!(rotation_towards(center, center), None);
    }

    #[test]
    fn test_cancel_restores_start() {
        let mut f = fixture();
        let grab = bounds(&f).center();
        f.controller.pointer_down(&mut f.scene, &f.fonts, grab);
        f.controller.pointer_move(&mut f.scene, grab + Vec2::new(80.0, 80.0));
        assert!(f.controller.cancel(&mut f.scene));
        assert_eq!(f.scene.layer(f.id).map(|l| l.position), Some(Pos2::new(200.0, 200.0)));
    }

    #[test]
    fn test_removed_layer_drops_gesture() {
        let mut f = fixture();
        let grab = bounds(&f).center();
        f.controller.pointer_down(&mut f.scene, &f.fonts, grab);
        f.scene.remove_layer(f.id);
        assert!(!f.controller.pointer_move(&mut f.scene, grab + Vec2::new(10.0, 0.0)));
        assert!(!f.controller.is_active());
    }
}
