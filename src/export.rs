//! Flattening the canvas into a PNG and publishing it.
//!
//! ```text
//!  Idle ──request──► AwaitingFrame ──frame presented──► Uploading ──ok──► Published ──delay──► Idle
//!                                                           │
//!                                                           └──error──► Idle
//! ```
//!
//! A request deselects first and then waits until the surface has presented
//! a frame at least as new as the deselected scene, so the selection
//! adornment can never end up in the capture.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::api::{Meme, MemeApi};
use crate::error::ExportError;
use crate::event::{EditorEvent, EventBus, PublishEvent};
use crate::scene::Scene;
use crate::selection::{self, SelectionInput};
use crate::surface::Surface;
use crate::task::{Pending, Spawner, spawn_task};

pub const PNG_MIME: &str = "image/png";

/// A named PNG file, alive only for the duration of one upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub title: String,
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    pub fn png(title: &str, bytes: Vec<u8>) -> Self {
        let title = title.trim();
        Self {
            title: title.to_owned(),
            file_name: format!("{title}.png"),
            mime: PNG_MIME,
            bytes,
        }
    }
}

enum PublishPhase {
    Idle,
    AwaitingFrame {
        title: String,
        scene_version: u64,
    },
    Uploading {
        title: String,
        pending: Pending<Result<Meme, ExportError>>,
    },
    Published {
        at: Instant,
    },
}

impl std::fmt::Debug for PublishPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::AwaitingFrame { title, scene_version } => f
                .debug_struct("AwaitingFrame")
                .field("title", title)
                .field("scene_version", scene_version)
                .finish(),
            Self::Uploading { title, .. } => f.debug_struct("Uploading").field("title", title).finish_non_exhaustive(),
            Self::Published { at } => f.debug_struct("Published").field("at", at).finish(),
        }
    }
}

/// What the page around the editor should do after a poll
#[derive(Debug, Clone, PartialEq)]
pub enum PublishNotice {
    Published(Meme),
    Failed(String),
    NavigateToGallery,
}

pub struct PublishFlow {
    phase: PublishPhase,
    spawner: Arc<dyn Spawner>,
    api: Arc<dyn MemeApi>,
    navigate_delay: Duration,
}

impl std::fmt::Debug for PublishFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishFlow")
            .field("phase", &self.phase)
            .field("navigate_delay", &self.navigate_delay)
            .finish_non_exhaustive()
    }
}

impl PublishFlow {
    pub fn new(spawner: Arc<dyn Spawner>, api: Arc<dyn MemeApi>, navigate_delay: Duration) -> Self {
        Self {
            phase: PublishPhase::Idle,
            spawner,
            api,
            navigate_delay,
        }
    }

    /// A publish is outstanding; the trigger must stay disabled
    pub fn is_busy(&self) -> bool {
        !matches!(self.phase, PublishPhase::Idle)
    }

    /// Deselection is done but the capture has not happened yet
    pub fn is_awaiting_frame(&self) -> bool {
        matches!(self.phase, PublishPhase::AwaitingFrame { .. })
    }

    /// Validate and start a publish. Checks run in order: already busy, no
    /// background, empty title. Failing any of them touches nothing.
    pub fn request(&mut self, scene: &mut Scene, title: &str, events: &EventBus) -> Result<(), ExportError> {
        if self.is_busy() {
            return Err(ExportError::Busy);
        }
        if scene.background().is_none() {
            return Err(ExportError::NoImage);
        }
        let title = title.trim();
        if title.is_empty() {
            return Err(ExportError::TitleRequired);
        }

        if let Some(selection) = selection::transition(scene, SelectionInput::ExportRequested) {
            events.emit(EditorEvent::SelectionChanged(selection));
        }
        info!("Publishing '{title}', waiting for scene version {}", scene.version());
        self.phase = PublishPhase::AwaitingFrame {
            title: title.to_owned(),
            scene_version: scene.version(),
        };
        events.emit(EditorEvent::Publish(PublishEvent::Started { title: title.to_owned() }));
        Ok(())
    }

    /// Advance the flow. Call once per frame, after the surface was updated.
    pub fn poll(&mut self, now: Instant, scene: &mut Scene, surface: &Surface, events: &EventBus) -> Vec<PublishNotice> {
        let mut notices = Vec::new();
        self.phase = match std::mem::replace(&mut self.phase, PublishPhase::Idle) {
            PublishPhase::Idle => PublishPhase::Idle,
            PublishPhase::AwaitingFrame { title, scene_version } => {
                if let Some(selection) = selection::transition(scene, SelectionInput::ExportRequested) {
                    // something got selected again before the capture
                    events.emit(EditorEvent::SelectionChanged(selection));
                    PublishPhase::AwaitingFrame {
                        title,
                        scene_version: scene.version(),
                    }
                } else if !surface.has_presented(scene_version) {
                    PublishPhase::AwaitingFrame { title, scene_version }
                } else {
                    match surface.capture_png() {
                        Ok(bytes) => self.upload(ExportArtifact::png(&title, bytes)),
                        Err(err) => {
                            notices.push(self.fail(&err, events));
                            PublishPhase::Idle
                        }
                    }
                }
            }
            PublishPhase::Uploading { title, mut pending } => match pending.try_take() {
                Ok(None) => PublishPhase::Uploading { title, pending },
                Ok(Some(Ok(meme))) => {
                    info!("Published '{title}' as {}", meme.id);
                    events.emit(EditorEvent::Publish(PublishEvent::Succeeded {
                        id: meme.id.clone(),
                        title,
                    }));
                    notices.push(PublishNotice::Published(meme));
                    PublishPhase::Published { at: now }
                }
                Ok(Some(Err(err))) => {
                    notices.push(self.fail(&err, events));
                    PublishPhase::Idle
                }
                Err(lost) => {
                    notices.push(self.fail(&lost, events));
                    PublishPhase::Idle
                }
            },
            PublishPhase::Published { at } => {
                if now.saturating_duration_since(at) >= self.navigate_delay {
                    notices.push(PublishNotice::NavigateToGallery);
                    PublishPhase::Idle
                } else {
                    PublishPhase::Published { at }
                }
            }
        };
        notices
    }

    /// Time left before the flow asks to navigate, while published
    pub fn navigate_in(&self, now: Instant) -> Option<Duration> {
        match self.phase {
            PublishPhase::Published { at } => Some(self.navigate_delay.saturating_sub(now.saturating_duration_since(at))),
            _ => None,
        }
    }

    fn upload(&self, artifact: ExportArtifact) -> PublishPhase {
        info!("Uploading {} ({} bytes)", artifact.file_name, artifact.bytes.len());
        let api = Arc::clone(&self.api);
        let title = artifact.title.clone();
        let pending = spawn_task(self.spawner.as_ref(), "publish-meme", move || {
            api.create_meme(&artifact, &artifact.title).map_err(ExportError::from)
        });
        PublishPhase::Uploading { title, pending }
    }

    fn fail(&self, err: &dyn std::fmt::Display, events: &EventBus) -> PublishNotice {
        let message = err.to_string();
        warn!("Publish failed: {message}");
        events.emit(EditorEvent::Publish(PublishEvent::Failed { message: message.clone() }));
        PublishNotice::Failed(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, ListQuery, MemeId, MemePage};
    use crate::layer::{LayerDefaults, create_layer};
    use crate::scene::{Background, BackgroundSource};
    use crate::task::InlineSpawner;
    use egui::Vec2;

    struct RejectingApi;

    impl MemeApi for RejectingApi {
        fn list_memes(&self, _query: &ListQuery) -> Result<MemePage, ApiError> {
            Ok(MemePage::default())
        }
        fn create_meme(&self, _file: &ExportArtifact, _title: &str) -> Result<Meme, ApiError> {
            Err(ApiError::Status { status: 413, message: "File too large".to_owned() })
        }
        fn delete_meme(&self, _id: &MemeId) -> Result<(), ApiError> {
            Ok(())
        }
        fn download(&self, _url: &str) -> Result<Vec<u8>, ApiError> {
            Ok(Vec::new())
        }
    }

    fn flow() -> PublishFlow {
        PublishFlow::new(Arc::new(InlineSpawner), Arc::new(RejectingApi), Duration::ZERO)
    }

    fn scene(with_background: bool) -> Scene {
        let mut scene = Scene::new(Vec2::new(50.0, 50.0), (10.0, 150.0));
        let layer = create_layer(&LayerDefaults::default(), 0, scene.canvas_size());
        scene.add_layer(layer);
        if with_background {
            let rgba = image::RgbaImage::from_pixel(2, 2, image::Rgba([0, 0, 0, 255]));
            scene.set_background(Background::from_rgba(&rgba, BackgroundSource::Memory).ok());
        }
        scene
    }

    #[test]
    fn test_artifact_naming() {
        let artifact = ExportArtifact::png("  t1 ", vec![1, 2, 3]);
        assert_eq!(artifact.file_name, "t1.png");
        assert_eq!(artifact.mime, "image/png");
        assert_eq!(artifact.title, "t1");
    }

    #[test]
    fn test_missing_background_rejected_first() {
        let mut scene = scene(false);
        let version = scene.version();
        let result = flow().request(&mut scene, "", &EventBus::new());
        assert!(matches!(result, Err(ExportError::NoImage)));
        assert_eq!(scene.version(), version);
        assert!(!scene.selection().is_idle());
    }

    #[test]
    fn test_blank_title_rejected() {
        let mut scene = scene(true);
        let result = flow().request(&mut scene, "   \t", &EventBus::new());
        assert!(matches!(result, Err(ExportError::TitleRequired)));
        assert!(!scene.selection().is_idle());
    }

    #[test]
    fn test_request_deselects_and_blocks_second_request() {
        let mut scene = scene(true);
        let mut flow = flow();
        flow.request(&mut scene, "t1", &EventBus::new()).expect("started");
        assert!(scene.selection().is_idle());
        assert!(flow.is_awaiting_frame());
        assert!(matches!(flow.request(&mut scene, "t1", &EventBus::new()), Err(ExportError::Busy)));
    }

    #[test]
    fn test_no_capture_before_presented_frame() {
        let mut scene = scene(true);
        let mut flow = flow();
        let surface = Surface::new();
        flow.request(&mut scene, "t1", &EventBus::new()).expect("started");
        for _ in 0..3 {
            assert!(flow.poll(Instant::now(), &mut scene, &surface, &EventBus::new()).is_empty());
            assert!(flow.is_awaiting_frame());
        }
    }
}
