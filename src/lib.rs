#![warn(clippy::all, rust_2018_idioms)]

pub mod api;
pub mod app;
pub mod config;
pub mod editor;
pub mod error;
pub mod event;
pub mod export;
pub mod file_handler;
pub mod gallery;
pub mod geometry;
pub mod layer;
pub mod loader;
pub mod panels;
pub mod renderer;
pub mod scene;
pub mod selection;
pub mod surface;
pub mod task;
pub mod text;
pub mod texture_manager;
pub mod transform;
pub mod widgets;

pub use app::MemeApp;
pub use editor::{EditorServices, EditorSession, SessionNotice};
pub use error::{ExportError, LoadError, RenderError};
pub use layer::{LayerId, LayerPatch, TextLayer};
pub use renderer::{Frame, Renderer};
pub use scene::Scene;
pub use selection::{HitTarget, Selection};
