pub mod image_normalizer;
pub mod metrics;
pub mod model_client;
pub mod orchestrator;
pub mod prompt;
pub mod providers;

pub use image_normalizer::{normalize, EncodedImage, ImageError};
pub use self::metrics::{get_metrics, init_metrics};
pub use model_client::ModelClient;
pub use orchestrator::AnalysisOrchestrator;
