//! The editable scene: one optional background image, an ordered stack of
//! text layers and a single selection pointer.
//!
//! Every mutation bumps [`Scene::version`] so the renderer and the publish
//! flow can tell whether a presented frame reflects the current state.

use std::sync::Arc;

use egui::Vec2;
use log::debug;
use tiny_skia::{ColorU8, IntSize, Pixmap};

use crate::error::{LoadError, SceneError};
use crate::layer::{LayerId, LayerPatch, TextLayer};
use crate::selection::Selection;

/// Largest background accepted, per side
pub const MAX_BACKGROUND_SIDE: u32 = 8192;

/// Where a background came from, kept for logging and the edit entry point
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackgroundSource {
    File(String),
    Url(String),
    Memory,
}

/// A decoded raster image, premultiplied and ready to be drawn
#[derive(Clone)]
pub struct Background {
    pixmap: Arc<Pixmap>,
    source: BackgroundSource,
}

impl std::fmt::Debug for Background {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Background")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("source", &self.source)
            .finish()
    }
}

impl Background {
    /// Decode encoded image bytes (PNG, JPEG, GIF, WebP, BMP)
    pub fn decode(bytes: &[u8], source: BackgroundSource) -> Result<Self, LoadError> {
        let decoded = image::load_from_memory(bytes)?;
        Self::from_rgba(&decoded.to_rgba8(), source)
    }

    pub fn from_rgba(rgba: &image::RgbaImage, source: BackgroundSource) -> Result<Self, LoadError> {
        let (width, height) = rgba.dimensions();
        if width > MAX_BACKGROUND_SIDE || height > MAX_BACKGROUND_SIDE {
            return Err(LoadError::TooLarge { width, height });
        }
        let size = IntSize::from_wh(width, height).ok_or(LoadError::Empty)?;
        let mut pixmap = Pixmap::new(size.width(), size.height()).ok_or(LoadError::Empty)?;

        for (dst, src) in pixmap.pixels_mut().iter_mut().zip(rgba.pixels()) {
            let [r, g, b, a] = src.0;
            *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
        }

        Ok(Self { pixmap: Arc::new(pixmap), source })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn source(&self) -> &BackgroundSource {
        &self.source
    }
}

#[derive(Debug, Clone)]
pub struct Scene {
    canvas_size: Vec2,
    font_range: (f32, f32),
    background: Option<Background>,
    layers: Vec<TextLayer>,
    selection: Selection,
    version: u64,
}

impl Scene {
    pub fn new(canvas_size: Vec2, font_range: (f32, f32)) -> Self {
        Self {
            canvas_size,
            font_range,
            background: None,
            layers: Vec::new(),
            selection: Selection::Idle,
            version: 0,
        }
    }

    pub fn canvas_size(&self) -> Vec2 {
        self.canvas_size
    }

    pub fn font_range(&self) -> (f32, f32) {
        self.font_range
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    fn mark_modified(&mut self) {
        self.version += 1;
    }

    pub fn background(&self) -> Option<&Background> {
        self.background.as_ref()
    }

    /// Replace the background. `None` is tolerated and leaves the scene as is.
    pub fn set_background(&mut self, background: Option<Background>) -> bool {
        let Some(background) = background else {
            return false;
        };
        debug!("Background set: {}x{} from {:?}", background.width(), background.height(), background.source());
        self.background = Some(background);
        self.mark_modified();
        true
    }

    /// Layers in z-order, bottom first
    pub fn layers(&self) -> &[TextLayer] {
        &self.layers
    }

    pub fn layer(&self, id: LayerId) -> Option<&TextLayer> {
        self.layers.iter().find(|layer| layer.id == id)
    }

    pub fn contains(&self, id: LayerId) -> bool {
        self.layer(id).is_some()
    }

    /// Append on top and select it immediately
    pub fn add_layer(&mut self, layer: TextLayer) {
        debug!("Layer added: {}", layer.id);
        self.selection = Selection::Selected(layer.id);
        self.layers.push(layer);
        self.mark_modified();
    }

    /// Merge `patch` into the matching layer; unknown ids are ignored
    pub fn update_layer(&mut self, id: LayerId, patch: &LayerPatch) -> bool {
        let font_range = self.font_range;
        let Some(layer) = self.layers.iter_mut().find(|layer| layer.id == id) else {
            return false;
        };
        if patch.is_empty() {
            return false;
        }
        layer.apply(patch, font_range);
        self.mark_modified();
        true
    }

    /// Remove the matching layer, clearing the selection if it pointed at it
    pub fn remove_layer(&mut self, id: LayerId) -> Option<TextLayer> {
        let index = self.layers.iter().position(|layer| layer.id == id)?;
        let removed = self.layers.remove(index);
        if self.selection.layer_id() == Some(id) {
            self.selection = Selection::Idle;
        }
        debug!("Layer removed: {id}");
        self.mark_modified();
        Some(removed)
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn selected_layer(&self) -> Option<&TextLayer> {
        self.selection.layer_id().and_then(|id| self.layer(id))
    }

    /// Point the selection at `id`, or clear it with `None`.
    /// Ids that are not in the scene are rejected so the selection never dangles.
    pub fn select(&mut self, id: Option<LayerId>) -> Result<bool, SceneError> {
        let next = match id {
            Some(id) if !self.contains(id) => return Err(SceneError::UnknownLayer(id)),
            Some(id) => Selection::Selected(id),
            None => Selection::Idle,
        };
        if next == self.selection {
            return Ok(false);
        }
        self.selection = next;
        self.mark_modified();
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{LayerDefaults, create_layer};

    fn scene() -> Scene {
        Scene::new(Vec2::new(600.0, 600.0), (10.0, 150.0))
    }

    fn layer(scene: &Scene) -> TextLayer {
        create_layer(&LayerDefaults::default(), scene.layers().len(), scene.canvas_size())
    }

    fn assert_selection_valid(scene: &Scene) {
        if let Some(id) = scene.selection().layer_id() {
            assert!(scene.contains(id), "selection points at a removed layer");
        }
    }

    #[test]
    fn test_add_layer_selects_it() {
        let mut scene = scene();
        let first = layer(&scene);
        let first_id = first.id;
        scene.add_layer(first);
        assert_eq!(scene.selection(), Selection::Selected(first_id));

        let second = layer(&scene);
        let second_id = second.id;
        scene.add_layer(second);
        assert_eq!(scene.selection(), Selection::Selected(second_id));
        assert_eq!(scene.layers().last().map(|l| l.id), Some(second_id));
    }

    #[test]
    fn test_remove_selected_clears_selection() {
        let mut scene = scene();
        let l = layer(&scene);
        let id = l.id;
        scene.add_layer(l);
        assert!(scene.remove_layer(id).is_some());
        assert_eq!(scene.selection(), Selection::Idle);
        assert!(scene.layers().is_empty());
    }

    #[test]
    fn test_remove_other_keeps_selection() {
        let mut scene = scene();
        let a = layer(&scene);
        let a_id = a.id;
        scene.add_layer(a);
        let b = layer(&scene);
        let b_id = b.id;
        scene.add_layer(b);

        scene.remove_layer(a_id);
        assert_eq!(scene.selection(), Selection::Selected(b_id));
    }

    #[test]
    fn test_selection_invariant_over_mixed_sequence() {
        let mut scene = scene();
        let mut ids = Vec::new();
        for step in 0..24 {
            if step % 3 == 2 {
                let id = ids.remove(step % ids.len());
                scene.remove_layer(id);
            } else {
                let l = layer(&scene);
                ids.push(l.id);
                scene.add_layer(l);
            }
            assert_selection_valid(&scene);
        }
        for id in ids {
            scene.remove_layer(id);
            assert_selection_valid(&scene);
        }
        assert_eq!(scene.selection(), Selection::Idle);
    }

    #[test]
    fn test_update_layer_is_isolated() {
        let mut scene = scene();
        let a = layer(&scene);
        let a_id = a.id;
        scene.add_layer(a);
        let b = layer(&scene);
        let before_b = b.clone();
        scene.add_layer(b);

        assert!(scene.update_layer(a_id, &LayerPatch::content("HELLO")));
        assert_eq!(scene.layer(a_id).map(|l| l.content.as_str()), Some("HELLO"));
        assert_eq!(scene.layers()[1], before_b);
        assert_eq!(scene.layers()[0].id, a_id);
    }

    #[test]
    fn test_update_unknown_layer_is_noop() {
        let mut scene = scene();
        let version = scene.version();
        assert!(!scene.update_layer(LayerId::new(), &LayerPatch::content("x")));
        assert_eq!(scene.version(), version);
    }

    #[test]
    fn test_select_unknown_is_rejected() {
        let mut scene = scene();
        let ghost = LayerId::new();
        assert_eq!(scene.select(Some(ghost)), Err(SceneError::UnknownLayer(ghost)));
        assert_eq!(scene.selection(), Selection::Idle);
    }

    #[test]
    fn test_set_background_none_is_tolerated() {
        let mut scene = scene();
        assert!(!scene.set_background(None));
        assert!(scene.background().is_none());

        let rgba = image::RgbaImage::from_pixel(4, 2, image::Rgba([10, 20, 30, 255]));
        let bg = Background::from_rgba(&rgba, BackgroundSource::Memory).expect("background");
        assert!(scene.set_background(Some(bg)));
        assert_eq!(scene.background().map(|b| (b.width(), b.height())), Some((4, 2)));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result = Background::decode(b"definitely not an image", BackgroundSource::Memory);
        assert!(matches!(result, Err(LoadError::Decode(_))));
    }

    #[test]
    fn test_empty_image_rejected() {
        let rgba = image::RgbaImage::new(0, 0);
        assert!(matches!(
            Background::from_rgba(&rgba, BackgroundSource::Memory),
            Err(LoadError::Empty)
        ));
    }
}
