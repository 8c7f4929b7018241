//! The drawing surface: the latest rendered frame and the version the host
//! has actually put on screen.
//!
//! The host calls [`Surface::mark_presented`] after it has shown a frame.
//! That is the render-completed signal the publish flow waits on before it
//! captures pixels.

use std::io::Cursor;

use log::{error, trace};

use crate::error::ExportError;
use crate::renderer::Frame;

#[derive(Debug, Default)]
pub struct Surface {
    latest: Option<Frame>,
    presented_version: Option<u64>,
}

impl Surface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the frame waiting to be shown
    pub fn submit(&mut self, frame: Frame) {
        self.latest = Some(frame);
    }

    pub fn latest(&self) -> Option<&Frame> {
        self.latest.as_ref()
    }

    /// The host has displayed the latest frame
    pub fn mark_presented(&mut self) {
        if let Some(frame) = &self.latest {
            trace!("Presented scene version {}", frame.scene_version());
            self.presented_version = Some(frame.scene_version());
        }
    }

    pub fn presented_version(&self) -> Option<u64> {
        self.presented_version
    }

    /// Whether a frame showing at least `version` has been presented
    pub fn has_presented(&self, version: u64) -> bool {
        self.presented_version.is_some_and(|presented| presented >= version)
    }

    /// Encode the presented frame as PNG at the canvas' native size
    pub fn capture_png(&self) -> Result<Vec<u8>, ExportError> {
        let frame = self
            .latest
            .as_ref()
            .filter(|frame| Some(frame.scene_version()) == self.presented_version)
            .ok_or(ExportError::Capture)?;

        let mut bytes = Cursor::new(Vec::new());
        frame
            .image()
            .write_to(&mut bytes, image::ImageFormat::Png)
            .map_err(|err| {
                error!("PNG encoding failed: {err}");
                ExportError::Capture
            })?;
        Ok(bytes.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::Renderer;
    use crate::scene::Scene;
    use crate::text::FontBook;
    use egui::Vec2;
    use std::sync::Arc;

    fn frame(scene: &Scene) -> Frame {
        let fonts = Arc::new(FontBook::with_defaults().expect("fonts"));
        Renderer::new(scene.canvas_size(), fonts)
            .expect("renderer")
            .render(scene)
            .expect("frame")
    }

    #[test]
    fn test_capture_requires_presented_frame() {
        let scene = Scene::new(Vec2::new(40.0, 30.0), (10.0, 150.0));
        let mut surface = Surface::new();
        assert!(matches!(surface.capture_png(), Err(ExportError::Capture)));

        surface.submit(frame(&scene));
        assert!(!surface.has_presented(scene.version()));
        assert!(matches!(surface.capture_png(), Err(ExportError::Capture)));

        surface.mark_presented();
        assert!(surface.has_presented(scene.version()));
        let png = surface.capture_png().expect("png");
        let decoded = image::load_from_memory(&png).expect("decodes");
        assert_eq!((decoded.width(), decoded.height()), (40, 30));
    }
}
