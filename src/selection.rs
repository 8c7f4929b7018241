//! Which layer is active, and the rules for changing it.
//!
//! ```text
//!   pointer on layer L            pointer on layer M
//!  ┌──────┐ ───────────► ┌──────────────┐ ───────────► ┌──────────────┐
//!  │ Idle │              │ Selected(L)  │              │ Selected(M)  │
//!  └──────┘ ◄─────────── └──────────────┘              └──────────────┘
//!        pointer on surface | L removed | export
//! ```

use crate::geometry::Handle;
use crate::layer::LayerId;
use crate::scene::Scene;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Selection {
    #[default]
    Idle,
    Selected(LayerId),
}

impl Selection {
    pub fn layer_id(&self) -> Option<LayerId> {
        match self {
            Selection::Idle => None,
            Selection::Selected(id) => Some(*id),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Selection::Idle)
    }
}

/// What a pointer-down landed on. Only [`HitTarget::Surface`] means the
/// drawing surface itself was hit; any layer box, including its transparent
/// parts, counts as the layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Surface,
    Layer(LayerId),
    Handle(LayerId, Handle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionInput {
    PointerDown(HitTarget),
    LayerRemoved(LayerId),
    ExportRequested,
}

/// Apply one input to the scene's selection. Returns the new selection when
/// it changed.
pub fn transition(scene: &mut Scene, input: SelectionInput) -> Option<Selection> {
    let before = scene.selection();
    let target = match (before, input) {
        (_, SelectionInput::PointerDown(HitTarget::Layer(id))) => Some(id),
        // handles only exist on the selected layer, so they keep it selected
        (_, SelectionInput::PointerDown(HitTarget::Handle(id, _))) => Some(id),
        (_, SelectionInput::PointerDown(HitTarget::Surface)) => None,
        (Selection::Selected(current), SelectionInput::LayerRemoved(removed)) if current == removed => None,
        (_, SelectionInput::LayerRemoved(_)) => before.layer_id(),
        (_, SelectionInput::ExportRequested) => None,
    };

    match scene.select(target) {
        Ok(true) => Some(scene.selection()),
        Ok(false) => None,
        Err(err) => {
            log::warn!("Ignoring selection input {input:?}: {err}");
            None
        }
    }
}
