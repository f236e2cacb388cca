pub mod analysis;
pub mod catalog;
pub mod message;

pub use analysis::{AnalysisOutcome, ChatOutcome, ChatRequest, ModelResult, ModelStatus};
pub use catalog::{default_catalog, ModelDescriptor};
pub use message::{ContentPart, ImageUrl, ModelMessage, Role, Turn};
