pub mod editor_panel;
pub mod gallery_panel;

pub use editor_panel::EditorPanel;
pub use gallery_panel::{GalleryAction, GalleryPanel};
