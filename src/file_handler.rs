use std::path::PathBuf;

use eframe::egui;

use crate::error::LoadError;

/// Extensions offered by the open dialog and accepted from drops
pub const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "webp", "bmp"];

/// An image file dropped onto the window, to become the canvas background
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DroppedImage {
    Bytes { name: String, bytes: Vec<u8> },
    Path(PathBuf),
}

/// Takes the first file dropped this frame. A file that is not an image is
/// an error so the user can be told why nothing happened.
pub fn take_dropped_image(ctx: &egui::Context) -> Option<Result<DroppedImage, LoadError>> {
    let mut files = ctx.input(|i| i.raw.dropped_files.clone()).into_iter();
    let file = files.next()?;
    for extra in files {
        log::info!("Ignoring extra dropped file: {}", display_name(&extra));
    }

    let file_name = display_name(&file);
    if !is_image_file(&file) {
        log::warn!("Dropped file is not a supported type: {}", file_name);
        return Some(Err(LoadError::NotAnImage(file_name)));
    }
    if let Some(bytes) = &file.bytes {
        log::info!("Image dropped from memory: {} ({} bytes)", file_name, bytes.len());
        Some(Ok(DroppedImage::Bytes { name: file_name, bytes: bytes.to_vec() }))
    } else if let Some(path) = file.path {
        log::info!("Image dropped from path: {}", path.display());
        Some(Ok(DroppedImage::Path(path)))
    } else {
        log::warn!("Dropped file has no accessible data: {}", file_name);
        Some(Err(LoadError::NotAnImage(file_name)))
    }
}

fn display_name(file: &egui::DroppedFile) -> String {
    if let Some(path) = &file.path {
        path.display().to_string()
    } else if !file.name.is_empty() {
        file.name.clone()
    } else {
        "unknown".to_owned()
    }
}

/// Check if a file is an image based on MIME type or extension
fn is_image_file(file: &egui::DroppedFile) -> bool {
    if !file.mime.is_empty() {
        file.mime.starts_with("image/")
    } else if let Some(ext) = file.path.as_ref().and_then(|path| path.extension()) {
        let ext = ext.to_string_lossy().to_lowercase();
        IMAGE_EXTENSIONS.contains(&ext.as_str())
    } else {
        false
    }
}

/// Native dialog for choosing a background image. Blocks until closed.
pub fn pick_image_file() -> Option<PathBuf> {
    let path = rfd::FileDialog::new()
        .set_title("Open image")
        .add_filter("Images", &IMAGE_EXTENSIONS)
        .pick_file();
    match &path {
        Some(path) => log::info!("Image picked: {}", path.display()),
        None => log::debug!("Open image dialog cancelled"),
    }
    path
}

/// Dark overlay listing the files being dragged over the window
pub fn preview_files_being_dropped(ctx: &egui::Context) {
    use egui::{Align2, Color32, FontId, Id, LayerId, Order};

    if ctx.input(|i| i.raw.hovered_files.is_empty()) {
        return;
    }

    let text = ctx.input(|i| {
        let mut text = "Drop an image to use it as the background:\n".to_owned();
        for file in &i.raw.hovered_files {
            if let Some(path) = &file.path {
                text += &format!("\n{}", path.display());
            } else {
                text += "\n(Path not available)";
            }
        }
        text
    });

    let painter = ctx.layer_painter(LayerId::new(Order::Foreground, Id::new("file_drop_target")));
    let screen_rect = ctx.screen_rect();
    painter.rect_filled(screen_rect, 0.0, Color32::from_black_alpha(192));
    painter.text(
        screen_rect.center(),
        Align2::CENTER_CENTER,
        text,
        FontId::proportional(20.0),
        Color32::WHITE,
    );
}
