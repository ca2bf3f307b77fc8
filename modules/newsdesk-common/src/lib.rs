pub mod config;
pub mod error;
pub mod file_config;
pub mod prompt_registry;
pub mod template;
pub mod types;

pub use config::AppConfig;
pub use error::NewsdeskError;
pub use file_config::{load_config, DedupSettings, FileConfig};
pub use prompt_registry::{PromptArticle, PromptRegistry};
pub use types::*;
