//! Unified configuration loading for sandhi.
//!
//! Loads all configuration from a single TOML file. Every section and field
//! is optional; omitted values take the built-in defaults.

mod defaults;
mod error;
mod input;
mod model;
mod preprocess;
mod registration;
mod sandhi;
mod transforms;

// Re-export main types
pub use error::ConfigLoadError;
pub use sandhi::{DEFAULT_CONFIG_FILE, SandhiConfig};

// Re-export section types
pub use input::InputSection;
pub use model::{ModelSection, SchedulerSection};
pub use preprocess::{PreprocessSection, SegmenterSection};
pub use registration::RegistrationSection;
pub use transforms::TransformsSection;
