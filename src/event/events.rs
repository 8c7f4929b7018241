use crate::api::MemeId;
use crate::layer::LayerId;
use crate::selection::Selection;
use crate::transform::{GestureKind, LayerGeometry};

#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    SelectionChanged(Selection),
    LayerChanged(LayerEvent),
    BackgroundChanged { width: u32, height: u32 },
    BackgroundFailed { message: String },
    Publish(PublishEvent),
}

/// Changes to the layer list or to a single layer
#[derive(Debug, Clone, PartialEq)]
pub enum LayerEvent {
    Added { id: LayerId, index: usize },
    Removed { id: LayerId, index: usize },
    Updated { id: LayerId },
    Transformed {
        id: LayerId,
        kind: GestureKind,
        old: LayerGeometry,
        new: LayerGeometry,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PublishEvent {
    Started { title: String },
    Succeeded { id: MemeId, title: String },
    Failed { message: String },
}
