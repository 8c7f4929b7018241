use std::time::{Duration, Instant};

use egui::{Align2, Color32, RichText};

const TOAST_LIFETIME: Duration = Duration::from_secs(4);
const MAX_TOASTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

impl ToastKind {
    fn color(&self) -> Color32 {
        match self {
            ToastKind::Success => Color32::from_rgb(46, 160, 67),
            ToastKind::Error => Color32::from_rgb(207, 34, 46),
            ToastKind::Info => Color32::from_rgb(30, 144, 255),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
    created: Instant,
}

/// Transient notifications in the top-right corner. They dismiss themselves
/// after a few seconds or when clicked.
#[derive(Debug, Default)]
pub struct Toasts {
    toasts: Vec<Toast>,
}

impl Toasts {
    pub fn push(&mut self, kind: ToastKind, message: impl Into<String>) {
        let message = message.into();
        log::debug!("Toast {kind:?}: {message}");
        self.toasts.push(Toast { kind, message, created: Instant::now() });
        if self.toasts.len() > MAX_TOASTS {
            self.toasts.remove(0);
        }
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(ToastKind::Success, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(ToastKind::Error, message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(ToastKind::Info, message);
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }

    fn expire(&mut self, now: Instant) {
        self.toasts.retain(|toast| now.saturating_duration_since(toast.created) < TOAST_LIFETIME);
    }

    pub fn show(&mut self, ctx: &egui::Context) {
        self.expire(Instant::now());
        if self.toasts.is_empty() {
            return;
        }

        let mut dismissed = None;
        egui::Area::new(egui::Id::new("toasts"))
            .anchor(Align2::RIGHT_TOP, egui::vec2(-16.0, 16.0))
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                for (index, toast) in self.toasts.iter().enumerate() {
                    let response = egui::Frame::popup(ui.style())
                        .fill(toast.kind.color())
                        .show(ui, |ui| {
                            ui.set_max_width(280.0);
                            ui.label(RichText::new(&toast.message).color(Color32::WHITE));
                        })
                        .response
                        .interact(egui::Sense::click());
                    if response.clicked() {
                        dismissed = Some(index);
                    }
                    ui.add_space(6.0);
                }
            });

        if let Some(index) = dismissed {
            self.toasts.remove(index);
        }
        ctx.request_repaint_after(Duration::from_millis(250));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oldest_toast_dropped_when_full() {
        let mut toasts = Toasts::default();
        for i in 0..6 {
            toasts.info(format!("toast {i}"));
        }
        assert_eq!(toasts.len(), MAX_TOASTS);
        assert_eq!(toasts.toasts[0].message, "toast 2");
    }

    #[test]
    fn test_toasts_expire() {
        let mut toasts = Toasts::default();
        toasts.error("boom");
        toasts.expire(Instant::now() + TOAST_LIFETIME);
        assert!(toasts.is_empty());
    }
}
