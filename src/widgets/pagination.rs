use crate::gallery::PaginationView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest {
    Previous,
    Next,
}

/// "Previous / Page n of m / Next" row
pub fn pagination(ui: &mut egui::Ui, view: PaginationView) -> Option<PageRequest> {
    let mut request = None;
    ui.horizontal(|ui| {
        if ui.add_enabled(view.has_previous(), egui::Button::new("◀ Previous")).clicked() {
            request = Some(PageRequest::Previous);
        }
        ui.label(view.label());
        if ui.add_enabled(view.has_next(), egui::Button::new("Next ▶")).clicked() {
            request = Some(PageRequest::Next);
        }
    });
    request
}
