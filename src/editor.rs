//! One editor session: the scene and everything that acts on it, from mount
//! to unmount. Nothing outlives the session.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use egui::Pos2;
use log::{debug, info, warn};

use crate::api::{Meme, MemeApi};
use crate::config::EditorConfig;
use crate::error::{ExportError, RenderError};
use crate::event::{EditorEvent, EventBus, LayerEvent};
use crate::export::{PublishFlow, PublishNotice};
use crate::geometry::hit_testing::hit_test;
use crate::layer::{LayerId, LayerPatch, create_layer};
use crate::loader::{ImageLoader, LoadTicket};
use crate::renderer::{Frame, Renderer};
use crate::scene::{BackgroundSource, Scene};
use crate::selection::{self, HitTarget, Selection, SelectionInput};
use crate::surface::Surface;
use crate::task::Spawner;
use crate::text::FontBook;
use crate::transform::{Gesture, GestureCommit, PointerDown, TransformController};

/// Shared collaborators a session is mounted with
#[derive(Clone)]
pub struct EditorServices {
    pub api: Arc<dyn MemeApi>,
    pub spawner: Arc<dyn Spawner>,
    pub fonts: Arc<FontBook>,
    pub config: EditorConfig,
}

/// Something the page around the editor should react to
#[derive(Debug, Clone, PartialEq)]
pub enum SessionNotice {
    Success(String),
    Error(String),
    NavigateToGallery,
}

pub struct EditorSession {
    config: EditorConfig,
    fonts: Arc<FontBook>,
    scene: Scene,
    controller: TransformController,
    renderer: Renderer,
    surface: Surface,
    loader: ImageLoader,
    publish: PublishFlow,
    events: EventBus,
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("scene_version", &self.scene.version())
            .field("layers", &self.scene.layers().len())
            .field("selection", &self.scene.selection())
            .field("publish", &self.publish)
            .finish_non_exhaustive()
    }
}

impl EditorSession {
    /// Start a fresh session with an empty scene
    pub fn mount(services: EditorServices) -> Result<Self, RenderError> {
        let EditorServices { api, spawner, fonts, config } = services;
        let renderer = Renderer::new(config.canvas_size(), Arc::clone(&fonts))?;
        info!("Editor mounted ({}x{})", config.canvas_width, config.canvas_height);
        Ok(Self {
            scene: Scene::new(config.canvas_size(), config.font_range()),
            controller: TransformController::new(config.transform_limits()),
            renderer,
            surface: Surface::new(),
            loader: ImageLoader::new(Arc::clone(&spawner), Arc::clone(&api)),
            publish: PublishFlow::new(spawner, api, Duration::from_millis(config.navigate_delay_ms)),
            events: EventBus::new(),
            fonts,
            config,
        })
    }

    /// Start a session pre-loaded with an existing meme's image
    pub fn mount_for_edit(services: EditorServices, image_url: &str) -> Result<Self, RenderError> {
        let mut session = Self::mount(services)?;
        session.load_url(image_url);
        Ok(session)
    }

    /// End the session. Pending loads are abandoned with it.
    pub fn unmount(mut self) {
        self.loader.cancel();
        if self.publish.is_busy() {
            warn!("Editor unmounted while a publish was outstanding");
        }
        info!("Editor unmounted with {} layers", self.scene.layers().len());
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn controller(&self) -> &TransformController {
        &self.controller
    }

    // =========================================================================
    // LAYERS
    // =========================================================================

    /// Add a layer with the configured defaults on top and select it
    pub fn add_text_layer(&mut self) -> LayerId {
        let before = self.scene.selection();
        let layer = create_layer(&self.config.layer_defaults, self.scene.layers().len(), self.scene.canvas_size());
        let id = layer.id;
        self.scene.add_layer(layer);
        self.events.emit(EditorEvent::LayerChanged(LayerEvent::Added {
            id,
            index: self.scene.layers().len() - 1,
        }));
        self.emit_selection_if_changed(before);
        id
    }

    pub fn update_layer(&mut self, id: LayerId, patch: &LayerPatch) -> bool {
        let changed = self.scene.update_layer(id, patch);
        if changed {
            self.events.emit(EditorEvent::LayerChanged(LayerEvent::Updated { id }));
        }
        changed
    }

    pub fn remove_layer(&mut self, id: LayerId) -> bool {
        if self.controller.gesture().is_some_and(|gesture| gesture.layer() == id) {
            self.controller.cancel(&mut self.scene);
        }
        let before = self.scene.selection();
        let Some(index) = self.scene.layers().iter().position(|layer| layer.id == id) else {
            return false;
        };
        self.scene.remove_layer(id);
        self.events.emit(EditorEvent::LayerChanged(LayerEvent::Removed { id, index }));
        self.emit_selection_if_changed(before);
        true
    }

    pub fn remove_selected(&mut self) -> bool {
        match self.scene.selection().layer_id() {
            Some(id) => self.remove_layer(id),
            None => false,
        }
    }

    /// Select a layer from outside the canvas, e.g. a layer list
    pub fn select_layer(&mut self, id: LayerId) {
        let before = self.scene.selection();
        selection::transition(&mut self.scene, SelectionInput::PointerDown(HitTarget::Layer(id)));
        self.emit_selection_if_changed(before);
    }

    // =========================================================================
    // POINTER
    // =========================================================================

    /// Pointer pressed at `pos` in canvas coordinates
    pub fn pointer_down(&mut self, pos: Pos2) -> Option<PointerDown> {
        if self.publish.is_awaiting_frame() {
            return None;
        }
        let before = self.scene.selection();
        let down = self.controller.pointer_down(&mut self.scene, &self.fonts, pos);
        self.emit_selection_if_changed(before);
        Some(down)
    }

    pub fn pointer_move(&mut self, pos: Pos2) -> bool {
        self.controller.pointer_move(&mut self.scene, pos)
    }

    pub fn pointer_up(&mut self, pos: Pos2) -> Option<GestureCommit> {
        let old = self.controller.gesture().map(Gesture::start)?;
        let commit = self.controller.pointer_up(&mut self.scene, pos)?;
        self.events.emit(EditorEvent::LayerChanged(LayerEvent::Transformed {
            id: commit.layer,
            kind: commit.kind,
            old,
            new: commit.geometry,
        }));
        Some(commit)
    }

    pub fn cancel_gesture(&mut self) -> bool {
        self.controller.cancel(&mut self.scene)
    }

    /// Escape: abort the gesture in progress, otherwise clear the selection
    pub fn escape(&mut self) {
        if self.controller.is_active() {
            self.cancel_gesture();
            return;
        }
        let before = self.scene.selection();
        selection::transition(&mut self.scene, SelectionInput::PointerDown(HitTarget::Surface));
        self.emit_selection_if_changed(before);
    }

    /// The layer under a double click, selected so its text can be edited
    pub fn double_click(&mut self, pos: Pos2) -> Option<LayerId> {
        match hit_test(&self.scene, &self.fonts, pos) {
            HitTarget::Layer(id) | HitTarget::Handle(id, _) => {
                self.select_layer(id);
                Some(id)
            }
            HitTarget::Surface => None,
        }
    }

    // =========================================================================
    // BACKGROUND
    // =========================================================================

    pub fn load_bytes(&mut self, bytes: Vec<u8>) -> LoadTicket {
        self.loader.request_bytes(bytes, BackgroundSource::Memory)
    }

    pub fn load_path(&mut self, path: &Path) -> LoadTicket {
        self.loader.request_path(path)
    }

    pub fn load_url(&mut self, url: &str) -> LoadTicket {
        self.loader.request_url(url)
    }

    pub fn is_loading(&self) -> bool {
        self.loader.is_loading()
    }

    // =========================================================================
    // FRAMES & PUBLISH
    // =========================================================================

    /// The frame for the current scene, rendering it if the scene moved on
    pub fn render(&mut self) -> Result<&Frame, RenderError> {
        let stale = self
            .surface
            .latest()
            .is_none_or(|frame| frame.scene_version() != self.scene.version());
        if stale {
            let frame = self.renderer.render(&self.scene)?;
            self.surface.submit(frame);
        }
        self.surface.latest().ok_or(RenderError::InvalidCanvasSize {
            width: self.config.canvas_width,
            height: self.config.canvas_height,
        })
    }

    /// The host has shown the frame returned by [`Self::render`]
    pub fn present(&mut self) {
        self.surface.mark_presented();
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn publish(&mut self, title: &str) -> Result<(), ExportError> {
        let result = self.publish.request(&mut self.scene, title, &self.events);
        if let Err(err) = &result {
            debug!("Publish rejected: {err}");
        }
        result
    }

    pub fn is_publishing(&self) -> bool {
        self.publish.is_busy()
    }

    /// Pick up finished loads and advance the publish flow. Call once per frame.
    pub fn poll(&mut self) -> Vec<SessionNotice> {
        self.poll_at(Instant::now())
    }

    pub fn poll_at(&mut self, now: Instant) -> Vec<SessionNotice> {
        let mut notices = Vec::new();

        if let Some(outcome) = self.loader.poll() {
            match outcome.result {
                Ok(background) => {
                    let (width, height) = (background.width(), background.height());
                    self.scene.set_background(Some(background));
                    self.events.emit(EditorEvent::BackgroundChanged { width, height });
                }
                Err(err) => {
                    let message = err.to_string();
                    self.events.emit(EditorEvent::BackgroundFailed { message: message.clone() });
                    notices.push(SessionNotice::Error(message));
                }
            }
        }

        for notice in self.publish.poll(now, &mut self.scene, &self.surface, &self.events) {
            notices.push(match notice {
                PublishNotice::Published(meme) => SessionNotice::Success(published_message(&meme)),
                PublishNotice::Failed(message) => SessionNotice::Error(message),
                PublishNotice::NavigateToGallery => SessionNotice::NavigateToGallery,
            });
        }
        notices
    }

    /// Time until a pending navigation fires, so the host can schedule a repaint
    pub fn navigate_in(&self) -> Option<Duration> {
        self.publish.navigate_in(Instant::now())
    }

    fn emit_selection_if_changed(&self, before: Selection) {
        let after = self.scene.selection();
        if after != before {
            self.events.emit(EditorEvent::SelectionChanged(after));
        }
    }
}

fn published_message(meme: &Meme) -> String {
    if meme.title.is_empty() {
        "Meme published!".to_owned()
    } else {
        format!("Meme \"{}\" published!", meme.title)
    }
}
