use egui::{Color32, Pos2, Rect, RichText, Vec2};

use crate::api::Meme;
use crate::gallery::{GalleryState, GalleryView, Thumbnail};
use crate::texture_manager::TextureManager;
use crate::widgets::{ConfirmChoice, PageRequest, Toasts, confirm_dialog, pagination};

const GRID_COLUMNS: usize = 3;
const CARD_WIDTH: f32 = 220.0;
const THUMB_HEIGHT: f32 = 160.0;

/// Navigation the gallery asks of the app
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GalleryAction {
    /// Open the editor with this image as the background
    Edit { image_url: String },
    Create,
}

/// UI-only state of the Gallery page
pub struct GalleryPanel {
    search_input: String,
    textures: TextureManager<String>,
}

impl Default for GalleryPanel {
    fn default() -> Self {
        Self {
            search_input: String::new(),
            textures: TextureManager::new("thumbnail", 64),
        }
    }
}

impl GalleryPanel {
    pub fn show(&mut self, ctx: &egui::Context, gallery: &mut GalleryState, toasts: &mut Toasts) -> Option<GalleryAction> {
        self.textures.begin_frame();
        let mut action = None;

        egui::TopBottomPanel::top("gallery_toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let search = ui.add(egui::TextEdit::singleline(&mut self.search_input).hint_text("Search memes"));
                let submitted = search.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                if ui.button("🔍 Search").clicked() || submitted {
                    gallery.submit_search(&self.search_input);
                }
                let sort_label = format!("Sort: {}", gallery.sort().label());
                if ui.button(sort_label).clicked() {
                    gallery.toggle_sort();
                }
                if ui.button("⟳ Refresh").clicked() {
                    gallery.refresh();
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| match gallery.view() {
            GalleryView::Loading => {
                ui.centered_and_justified(|ui| {
                    ui.spinner();
                });
            }
            GalleryView::Empty => {
                ui.vertical_centered(|ui| {
                    ui.add_space(80.0);
                    ui.heading("No memes found");
                    if ui.button("Create the first one").clicked() {
                        action = Some(GalleryAction::Create);
                    }
                });
            }
            GalleryView::Grid { items, pagination: pages } => {
                let items = items.to_vec();
                let mut page_request = None;
                egui::ScrollArea::vertical().show(ui, |ui| {
                    for row in items.chunks(GRID_COLUMNS) {
                        ui.horizontal_top(|ui| {
                            for meme in row {
                                if let Some(card_action) = self.card(ui, gallery, meme, toasts) {
                                    action = Some(card_action);
                                }
                            }
                        });
                        ui.add_space(8.0);
                    }
                    if let Some(pages) = pages {
                        ui.separator();
                        page_request = pagination(ui, pages);
                    }
                });
                match page_request {
                    Some(PageRequest::Previous) => gallery.previous_page(),
                    Some(PageRequest::Next) => gallery.next_page(),
                    None => {}
                }
            }
        });

        if let Some(meme) = gallery.pending_delete().cloned() {
            let message = format!("Delete \"{}\"? This cannot be undone.", meme.title);
            match confirm_dialog(ctx, "Delete meme", &message, "Delete") {
                Some(ConfirmChoice::Confirm) => gallery.confirm_delete(),
                Some(ConfirmChoice::Cancel) => gallery.cancel_delete(),
                None => {}
            }
        }

        if let Some(meme) = gallery.previewed().cloned() {
            self.preview(ctx, gallery, &meme);
        }

        action
    }

    fn card(&mut self, ui: &mut egui::Ui, gallery: &mut GalleryState, meme: &Meme, toasts: &mut Toasts) -> Option<GalleryAction> {
        let mut action = None;
        egui::Frame::group(ui.style()).show(ui, |ui| {
            ui.set_width(CARD_WIDTH);
            ui.vertical(|ui| {
                let thumb = self.thumbnail(ui, gallery, meme, Vec2::new(CARD_WIDTH, THUMB_HEIGHT));
                if thumb.clicked() {
                    gallery.preview(meme);
                }
                ui.label(RichText::new(&meme.title).strong());
                ui.weak(meme.created_label());
                ui.horizontal(|ui| {
                    if let Some(url) = &meme.image_url {
                        if ui.small_button("✏ Edit").clicked() {
                            action = Some(GalleryAction::Edit { image_url: url.clone() });
                        }
                    }
                    if ui.small_button("🔗 Share").clicked() {
                        match gallery.share_link(meme) {
                            Some(link) => {
                                ui.ctx().copy_text(link);
                                toasts.info("Link copied to clipboard");
                            }
                            None => toasts.error("This meme has no image link"),
                        }
                    }
                    let delete = egui::Button::new(RichText::new("🗑").color(Color32::from_rgb(207, 34, 46)));
                    if ui.add_enabled(!gallery.is_deleting(), delete).clicked() {
                        gallery.request_delete(meme);
                    }
                });
            });
        });
        action
    }

    fn thumbnail(&mut self, ui: &mut egui::Ui, gallery: &mut GalleryState, meme: &Meme, max: Vec2) -> egui::Response {
        let (rect, response) = ui.allocate_exact_size(max, egui::Sense::click());
        let Some(url) = &meme.image_url else {
            ui.painter().rect_filled(rect, 4.0, Color32::from_gray(40));
            return response;
        };

        match gallery.thumbnails().get(url) {
            Thumbnail::Ready(image) => {
                let size = Vec2::new(image.width() as f32, image.height() as f32);
                let texture = self
                    .textures
                    .get_or_create_texture(url, 0, || Ok(image.as_ref().clone()), ui.ctx());
                match texture {
                    Ok(texture) => {
                        let scale = (max.x / size.x).min(max.y / size.y);
                        let image_rect = Rect::from_center_size(rect.center(), size * scale);
                        let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));
                        ui.painter().image(texture, image_rect, uv, Color32::WHITE);
                    }
                    Err(err) => {
                        log::warn!("Thumbnail texture for {url} failed: {err}");
                        ui.painter().rect_filled(rect, 4.0, Color32::from_gray(40));
                    }
                }
            }
            Thumbnail::Loading => {
                ui.painter().rect_filled(rect, 4.0, Color32::from_gray(40));
                ui.put(Rect::from_center_size(rect.center(), Vec2::splat(24.0)), egui::Spinner::new());
            }
            Thumbnail::Failed => {
                ui.painter().rect_filled(rect, 4.0, Color32::from_gray(40));
                ui.painter().text(
                    rect.center(),
                    egui::Align2::CENTER_CENTER,
                    "Image unavailable",
                    egui::FontId::proportional(14.0),
                    Color32::GRAY,
                );
            }
        }
        response.on_hover_cursor(egui::CursorIcon::PointingHand)
    }

    fn preview(&mut self, ctx: &egui::Context, gallery: &mut GalleryState, meme: &Meme) {
        let mut open = true;
        egui::Window::new(meme.title.as_str())
            .id(egui::Id::new("meme_preview"))
            .open(&mut open)
            .collapsible(false)
            .default_size([480.0, 520.0])
            .show(ctx, |ui| {
                self.thumbnail(ui, gallery, meme, Vec2::new(460.0, 460.0));
                ui.weak(meme.created_label());
            });
        if !open {
            gallery.close_preview();
        }
    }
}
