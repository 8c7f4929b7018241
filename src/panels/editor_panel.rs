use egui::{Color32, CursorIcon, Pos2, Rect, Sense};

use crate::editor::EditorSession;
use crate::file_handler::pick_image_file;
use crate::geometry::Handle;
use crate::geometry::hit_testing::hit_test;
use crate::layer::{FontFamily, LayerPatch, TextAlign, TextLayer};
use crate::selection::HitTarget;
use crate::texture_manager::TextureManager;
use crate::widgets::Toasts;

const CANVAS_TEXTURE: &str = "canvas";

/// UI-only state of the Create page: text inputs and the canvas texture
pub struct EditorPanel {
    title: String,
    url_input: String,
    /// Focus the content field on the next frame, after a double click
    focus_content: bool,
    textures: TextureManager<&'static str>,
}

impl Default for EditorPanel {
    fn default() -> Self {
        Self {
            title: String::new(),
            url_input: String::new(),
            focus_content: false,
            textures: TextureManager::new("editor", 2),
        }
    }
}

impl EditorPanel {
    /// Forget everything typed for the previous session
    pub fn reset(&mut self) {
        self.title.clear();
        self.url_input.clear();
        self.focus_content = false;
        self.textures.clear_cache();
    }

    pub fn sidebar(&mut self, ctx: &egui::Context, session: &mut EditorSession, toasts: &mut Toasts) {
        egui::SidePanel::left("editor_sidebar")
            .resizable(true)
            .default_width(260.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.background_section(ui, session);
                    ui.separator();
                    self.layers_section(ui, session);
                    ui.separator();
                    self.style_section(ui, session);
                    ui.separator();
                    self.publish_section(ui, session, toasts);
                });
            });
    }

    fn background_section(&mut self, ui: &mut egui::Ui, session: &mut EditorSession) {
        ui.heading("Image");
        if ui.button("📂 Open image…").clicked() {
            if let Some(path) = pick_image_file() {
                session.load_path(&path);
            }
        }
        ui.horizontal(|ui| {
            ui.add(egui::TextEdit::singleline(&mut self.url_input).hint_text("https://…"));
            let enabled = !self.url_input.trim().is_empty();
            if ui.add_enabled(enabled, egui::Button::new("Fetch")).clicked() {
                session.load_url(self.url_input.trim());
            }
        });
        if session.is_loading() {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Loading image…");
            });
        } else if let Some(background) = session.scene().background() {
            ui.weak(format!("{} × {}", background.width(), background.height()));
        } else {
            ui.weak("Drop an image onto the window or open one above");
        }
    }

    fn layers_section(&mut self, ui: &mut egui::Ui, session: &mut EditorSession) {
        ui.horizontal(|ui| {
            ui.heading("Text");
            if ui.button("➕ Add text").clicked() {
                session.add_text_layer();
                self.focus_content = true;
            }
        });

        let selected = session.scene().selection().layer_id();
        let mut clicked = None;
        for (index, layer) in session.scene().layers().iter().enumerate().rev() {
            let label = format!("{}. {}", index + 1, first_line(&layer.content));
            if ui.selectable_label(selected == Some(layer.id), label).clicked() {
                clicked = Some(layer.id);
            }
        }
        if let Some(id) = clicked {
            session.select_layer(id);
        }
    }

    fn style_section(&mut self, ui: &mut egui::Ui, session: &mut EditorSession) {
        let Some(layer) = session.scene().selected_layer().cloned() else {
            ui.weak("Select a text to edit it");
            return;
        };
        let (min_size, max_size) = session.scene().font_range();
        let patch = self.layer_controls(ui, &layer, min_size, max_size);

        if !patch.is_empty() {
            session.update_layer(layer.id, &patch);
        }
        if ui.button("🗑 Delete text").clicked() {
            session.remove_layer(layer.id);
        }
    }

    fn layer_controls(&mut self, ui: &mut egui::Ui, layer: &TextLayer, min_size: f32, max_size: f32) -> LayerPatch {
        let mut patch = LayerPatch::default();

        let mut content = layer.content.clone();
        let response = ui.add(egui::TextEdit::multiline(&mut content).desired_rows(3).desired_width(f32::INFINITY));
        if std::mem::take(&mut self.focus_content) {
            response.request_focus();
        }
        if response.changed() {
            patch.content = Some(content);
        }

        egui::Grid::new("layer_style_grid")
            .num_columns(2)
            .spacing([12.0, 6.0])
            .show(ui, |ui| {
                ui.label("Font");
                let mut family = layer.font_family;
                egui::ComboBox::from_id_salt("font_family")
                    .selected_text(family.label())
                    .show_ui(ui, |ui| {
                        for option in FontFamily::ALL {
                            ui.selectable_value(&mut family, option, option.label());
                        }
                    });
                if family != layer.font_family {
                    patch.font_family = Some(family);
                }
                ui.end_row();

                ui.label("Style");
                ui.horizontal(|ui| {
                    let mut style = layer.font_style;
                    ui.toggle_value(&mut style.bold, egui::RichText::new("B").strong());
                    ui.toggle_value(&mut style.italic, egui::RichText::new("I").italics());
                    if style != layer.font_style {
                        patch.font_style = Some(style);
                    }
                });
                ui.end_row();

                ui.label("Align");
                ui.horizontal(|ui| {
                    let mut align = layer.align;
                    for option in TextAlign::ALL {
                        ui.selectable_value(&mut align, option, option.label());
                    }
                    if align != layer.align {
                        patch.align = Some(align);
                    }
                });
                ui.end_row();

                ui.label("Size");
                let mut size = layer.font_size;
                if ui.add(egui::Slider::new(&mut size, min_size..=max_size).integer()).changed() {
                    patch.font_size = Some(size);
                }
                ui.end_row();

                ui.label("Rotation");
                let mut rotation = layer.rotation;
                if ui
                    .add(egui::Slider::new(&mut rotation, 0.0..=359.0).suffix("°").integer())
                    .changed()
                {
                    patch.rotation = Some(rotation);
                }
                ui.end_row();

                ui.label("Fill");
                let mut fill = layer.fill;
                if ui.color_edit_button_srgba(&mut fill).changed() {
                    patch.fill = Some(fill);
                }
                ui.end_row();

                ui.label("Outline");
                ui.horizontal(|ui| {
                    let mut stroke = layer.stroke;
                    if ui.color_edit_button_srgba(&mut stroke).changed() {
                        patch.stroke = Some(stroke);
                    }
                    let mut width = layer.stroke_width;
                    if ui.add(egui::Slider::new(&mut width, 0.0..=10.0).step_by(0.5)).changed() {
                        patch.stroke_width = Some(width);
                    }
                });
                ui.end_row();
            });

        patch
    }

    fn publish_section(&mut self, ui: &mut egui::Ui, session: &mut EditorSession, toasts: &mut Toasts) {
        ui.heading("Publish");
        ui.add(egui::TextEdit::singleline(&mut self.title).hint_text("Meme title"));
        ui.horizontal(|ui| {
            let busy = session.is_publishing();
            if ui.add_enabled(!busy, egui::Button::new("🚀 Publish")).clicked() {
                if let Err(err) = session.publish(&self.title) {
                    toasts.error(err.to_string());
                }
            }
            if busy {
                ui.spinner();
            }
        });
    }

    /// The canvas itself, scaled to fit, with pointer input mapped back to
    /// canvas coordinates
    pub fn canvas(&mut self, ctx: &egui::Context, session: &mut EditorSession) {
        egui::CentralPanel::default()
            .frame(egui::Frame::central_panel(&ctx.style()).fill(Color32::from_gray(24)))
            .show(ctx, |ui| {
                self.textures.begin_frame();
                let canvas_size = session.scene().canvas_size();

                let texture = match session.render() {
                    Ok(frame) => self.textures.get_or_create_texture(
                        &CANVAS_TEXTURE,
                        frame.scene_version(),
                        || Ok(frame.to_color_image()),
                        ctx,
                    ),
                    Err(err) => {
                        log::error!("Rendering the canvas failed: {err}");
                        return;
                    }
                };
                let texture = match texture {
                    Ok(texture) => texture,
                    Err(err) => {
                        log::error!("Uploading the canvas failed: {err}");
                        return;
                    }
                };

                let available = ui.available_size();
                let scale = (available.x / canvas_size.x).min(available.y / canvas_size.y).clamp(0.1, 1.0);
                let display = canvas_size * scale;
                let rect = Rect::from_center_size(ui.max_rect().center(), display);
                let response = ui.allocate_rect(rect, Sense::click_and_drag());

                ui.painter().image(
                    texture,
                    rect,
                    Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                    Color32::WHITE,
                );
                session.present();

                let to_canvas = |pos: Pos2| -> Pos2 { ((pos - rect.min) / scale).to_pos2() };
                self.handle_pointer(ctx, &response, session, to_canvas);
            });
    }

    fn handle_pointer(
        &mut self,
        ctx: &egui::Context,
        response: &egui::Response,
        session: &mut EditorSession,
        to_canvas: impl Fn(Pos2) -> Pos2,
    ) {
        let (pressed, released, press_origin, latest) = ctx.input(|i| {
            (
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.pointer.press_origin(),
                i.pointer.latest_pos(),
            )
        });

        if pressed && response.hovered() {
            if let Some(origin) = press_origin {
                session.pointer_down(to_canvas(origin));
            }
        }

        if session.controller().is_active() {
            match latest {
                Some(pos) if released => {
                    session.pointer_up(to_canvas(pos));
                }
                Some(pos) => {
                    session.pointer_move(to_canvas(pos));
                }
                None => {
                    session.cancel_gesture();
                }
            }
        }

        if response.double_clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                if session.double_click(to_canvas(pos)).is_some() {
                    self.focus_content = true;
                }
            }
        }

        if let Some(pos) = response.hover_pos() {
            let target = hit_test(session.scene(), session.fonts(), to_canvas(pos));
            ctx.set_cursor_icon(cursor_for(target, session.controller().is_active()));
        }
    }
}

fn cursor_for(target: HitTarget, dragging: bool) -> CursorIcon {
    match target {
        HitTarget::Handle(_, Handle::TopLeft | Handle::BottomRight) => CursorIcon::ResizeNwSe,
        HitTarget::Handle(_, Handle::TopRight | Handle::BottomLeft) => CursorIcon::ResizeNeSw,
        HitTarget::Handle(_, Handle::Rotate) => CursorIcon::Alias,
        HitTarget::Layer(_) if dragging => CursorIcon::Grabbing,
        HitTarget::Layer(_) => CursorIcon::Grab,
        HitTarget::Surface => CursorIcon::Default,
    }
}

fn first_line(content: &str) -> String {
    let line = content.lines().next().unwrap_or_default();
    if line.chars().count() > 24 {
        format!("{}…", line.chars().take(24).collect::<String>())
    } else if line.is_empty() {
        "(empty)".to_owned()
    } else {
        line.to_owned()
    }
}
