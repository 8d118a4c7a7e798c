pub mod classifier;
pub mod config;
pub mod error;
pub mod handlers;
pub mod logger;
pub mod models;
pub mod preprocess;
pub mod verdict;

pub use classifier::{Classifier, OnnxClassifier};
pub use config::{LogConfig, ServiceConfig};
pub use error::{ApiError, ConfigError, ImageDecodeError, InferenceError, ModelLoadError};
pub use handlers::AppState;
pub use logger::Logger;
pub use verdict::Verdict;
