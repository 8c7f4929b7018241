use egui::Pos2;

use super::{HANDLE_PICK_RADIUS, HANDLE_SIZE, Handle, OrientedBox};
use crate::scene::Scene;
use crate::selection::HitTarget;
use crate::text::FontBook;

/// Slack around a layer box so thin or empty layers can still be grabbed
pub const LAYER_PICK_SLOP: f32 = 4.0;

/// Which handle of `bounds` is under `pos`, if any
pub fn handle_at(bounds: &OrientedBox, pos: Pos2) -> Option<Handle> {
    let radius = HANDLE_SIZE / 2.0 + HANDLE_PICK_RADIUS;
    Handle::ALL
        .into_iter()
        .map(|handle| (handle, bounds.handle_position(handle).distance(pos)))
        .filter(|(_, distance)| *distance <= radius)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(handle, _)| handle)
}

/// Whether `pos` falls inside the box, transparent parts included
pub fn box_contains(bounds: &OrientedBox, pos: Pos2) -> bool {
    bounds.local_rect().expand(LAYER_PICK_SLOP).contains(bounds.to_local(pos).to_pos2())
}

/// Resolve a pointer-down position against the scene.
///
/// Handles of the selected layer win over everything, then layers from the
/// top of the stack down. Anything else is the drawing surface itself; the
/// background image is part of the surface and never a target.
pub fn hit_test(scene: &Scene, fonts: &FontBook, pos: Pos2) -> HitTarget {
    if let Some(selected) = scene.selected_layer() {
        let bounds = OrientedBox::for_layer(selected, fonts);
        if let Some(handle) = handle_at(&bounds, pos) {
            return HitTarget::Handle(selected.id, handle);
        }
    }

    scene
        .layers()
        .iter()
        .rev()
        .find(|layer| box_contains(&OrientedBox::for_layer(layer, fonts), pos))
        .map_or(HitTarget::Surface, |layer| HitTarget::Layer(layer.id))
}
