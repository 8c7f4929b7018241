pub mod confirm;
pub mod pagination;
pub mod toast;

pub use confirm::{ConfirmChoice, confirm_dialog};
pub use pagination::{PageRequest, pagination};
pub use toast::{ToastKind, Toasts};
