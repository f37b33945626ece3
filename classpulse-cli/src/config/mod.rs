mod loader;
mod types;

pub use loader::{ConfigLoader, DEFAULT_CONFIG_PATH};
pub use types::{ClasspulseConfig, DeadLetterConfig, StorageConfig};
