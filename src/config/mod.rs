pub mod env;
mod loader;

pub use env::{
    AppConfig, DirectoryConfig, ExtractionConfig, OverlayConfig, PlatformProfile, SenderSource,
    Thresholds,
};
pub use loader::load_config;
