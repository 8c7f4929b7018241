use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::{MemeApi, SortDirection};
use crate::config::AppConfig;
use crate::editor::{EditorServices, EditorSession, SessionNotice};
use crate::error::RenderError;
use crate::event::LogEventHandler;
use crate::file_handler::{DroppedImage, preview_files_being_dropped, take_dropped_image};
use crate::gallery::{GalleryNotice, GalleryState};
use crate::panels::{EditorPanel, GalleryAction, GalleryPanel};
use crate::task::{Spawner, ThreadSpawner};
use crate::text::FontBook;
use crate::widgets::Toasts;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Route {
    #[default]
    Create,
    Gallery,
}

/// The part of the app we persist between runs.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)] // if we add new fields, give them default values when deserializing old state
struct Preferences {
    gallery_sort: SortDirection,
}

pub struct MemeApp {
    services: EditorServices,
    route: Route,
    /// Present exactly while the Create page is shown
    session: Option<EditorSession>,
    editor_panel: EditorPanel,
    gallery: GalleryState,
    gallery_panel: GalleryPanel,
    toasts: Toasts,
}

impl MemeApp {
    /// Called once before the first frame.
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: AppConfig,
        fonts: Arc<FontBook>,
        api: Arc<dyn MemeApi>,
    ) -> Result<Self, RenderError> {
        let preferences: Preferences = cc
            .storage
            .and_then(|storage| eframe::get_value(storage, eframe::APP_KEY))
            .unwrap_or_default();
        let spawner: Arc<dyn Spawner> = Arc::new(ThreadSpawner::with_repaint(cc.egui_ctx.clone()));

        let services = EditorServices {
            api: Arc::clone(&api),
            spawner: Arc::clone(&spawner),
            fonts,
            config: config.editor.clone(),
        };
        let session = mount(&services, None)?;

        Ok(Self {
            gallery: GalleryState::new(api, spawner, config.page_size, preferences.gallery_sort),
            services,
            route: Route::Create,
            session: Some(session),
            editor_panel: EditorPanel::default(),
            gallery_panel: GalleryPanel::default(),
            toasts: Toasts::default(),
        })
    }

    pub fn route(&self) -> Route {
        self.route
    }

    /// Leave the current page and enter `route`. Entering Create always
    /// starts a fresh session.
    fn navigate(&mut self, route: Route, edit_url: Option<&str>) {
        if let Some(session) = self.session.take() {
            session.unmount();
        }
        self.editor_panel.reset();
        self.route = route;
        log::info!("Navigated to {route:?}");

        match route {
            Route::Create => match mount(&self.services, edit_url) {
                Ok(session) => self.session = Some(session),
                Err(err) => {
                    log::error!("Could not start the editor: {err}");
                    self.toasts.error(format!("Could not start the editor: {err}"));
                }
            },
            Route::Gallery => self.gallery.refresh(),
        }
    }

    fn top_bar(&mut self, ctx: &egui::Context) {
        let mut target = None;
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.heading("Meme Studio");
                ui.separator();
                if ui.selectable_label(self.route == Route::Create, "Create").clicked() {
                    target = Some(Route::Create);
                }
                if ui.selectable_label(self.route == Route::Gallery, "Gallery").clicked() {
                    target = Some(Route::Gallery);
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    egui::widgets::global_theme_preference_buttons(ui);
                });
            });
        });
        if let Some(route) = target {
            if route != self.route {
                self.navigate(route, None);
            }
        }
    }

    fn create_page(&mut self, ctx: &egui::Context) {
        let Some(session) = self.session.as_mut() else {
            egui::CentralPanel::default().show(ctx, |ui| {
                ui.centered_and_justified(|ui| {
                    if ui.button("Retry").clicked() {
                        self.navigate(Route::Create, None);
                    }
                });
            });
            return;
        };

        preview_files_being_dropped(ctx);
        match take_dropped_image(ctx) {
            Some(Ok(DroppedImage::Bytes { bytes, .. })) => {
                session.load_bytes(bytes);
            }
            Some(Ok(DroppedImage::Path(path))) => {
                session.load_path(&path);
            }
            Some(Err(err)) => self.toasts.error(err.to_string()),
            None => {}
        }

        if ctx.memory(|memory| memory.focused().is_none()) {
            let (delete, escape) = ctx.input(|i| {
                (
                    i.key_pressed(egui::Key::Delete) || i.key_pressed(egui::Key::Backspace),
                    i.key_pressed(egui::Key::Escape),
                )
            });
            if delete {
                session.remove_selected();
            }
            if escape {
                session.escape();
            }
        }

        self.editor_panel.sidebar(ctx, session, &mut self.toasts);
        self.editor_panel.canvas(ctx, session);

        let mut navigate = false;
        for notice in session.poll() {
            match notice {
                SessionNotice::Success(message) => self.toasts.success(message),
                SessionNotice::Error(message) => self.toasts.error(message),
                SessionNotice::NavigateToGallery => navigate = true,
            }
        }

        // keep frames coming while the publish flow waits on them
        if session.surface().presented_version() != Some(session.scene().version()) || session.is_publishing() {
            ctx.request_repaint();
        }
        if let Some(delay) = session.navigate_in() {
            ctx.request_repaint_after(delay);
        }

        if navigate {
            self.navigate(Route::Gallery, None);
        }
    }

    fn gallery_page(&mut self, ctx: &egui::Context) {
        for notice in self.gallery.poll() {
            match notice {
                GalleryNotice::Info(message) => self.toasts.success(message),
                GalleryNotice::Error(message) => self.toasts.error(message),
            }
        }

        match self.gallery_panel.show(ctx, &mut self.gallery, &mut self.toasts) {
            Some(GalleryAction::Edit { image_url }) => self.navigate(Route::Create, Some(&image_url)),
            Some(GalleryAction::Create) => self.navigate(Route::Create, None),
            None => {}
        }
    }
}

fn mount(services: &EditorServices, edit_url: Option<&str>) -> Result<EditorSession, RenderError> {
    let session = match edit_url {
        Some(url) => EditorSession::mount_for_edit(services.clone(), url)?,
        None => EditorSession::mount(services.clone())?,
    };
    session.events().subscribe(Box::new(LogEventHandler));
    Ok(session)
}

impl eframe::App for MemeApp {
    /// Called by the frame work to save state before shutdown.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        let preferences = Preferences {
            gallery_sort: self.gallery.sort(),
        };
        eframe::set_value(storage, eframe::APP_KEY, &preferences);
    }

    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.top_bar(ctx);

        match self.route {
            Route::Create => self.create_page(ctx),
            Route::Gallery => self.gallery_page(ctx),
        }

        self.toasts.show(ctx);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if let Some(session) = self.session.take() {
            session.unmount();
        }
    }
}
