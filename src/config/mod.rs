pub mod interactive;
pub mod settings;

pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    Config, ConfigError, EmbeddingConfig, GeminiConfig, OpenAiConfig, StorageConfig, StorageMode,
};
