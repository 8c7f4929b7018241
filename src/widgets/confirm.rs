#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmChoice {
    Confirm,
    Cancel,
}

/// Centered modal asking the user to confirm a destructive action
pub fn confirm_dialog(ctx: &egui::Context, title: &str, message: &str, confirm_label: &str) -> Option<ConfirmChoice> {
    let mut choice = None;
    egui::Window::new(title)
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
        .show(ctx, |ui| {
            ui.label(message);
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                let confirm = egui::Button::new(egui::RichText::new(confirm_label).color(egui::Color32::WHITE))
                    .fill(egui::Color32::from_rgb(207, 34, 46));
                if ui.add(confirm).clicked() {
                    choice = Some(ConfirmChoice::Confirm);
                }
                if ui.button("Cancel").clicked() {
                    choice = Some(ConfirmChoice::Cancel);
                }
            });
        });
    if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
        choice = Some(ConfirmChoice::Cancel);
    }
    choice
}
