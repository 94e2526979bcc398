pub mod overlay;
pub mod popup;

pub use overlay::OverlaySlot;
pub use popup::{ActiveTab, FocusedTab, PopupController, ScanOutcome};
