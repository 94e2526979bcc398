pub mod message;
pub mod types;

pub use message::{RuntimeMessage, ScanReply, ScanStatus};
pub use types::{
    AnalysisRequest, AnalysisResult, ExtractionResult, HealthReport, RelayResponse,
    CONVERSATIONAL_CATEGORY,
};
