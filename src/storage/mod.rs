pub mod json_file;
pub mod settings;

pub use json_file::JsonFileStore;
pub use settings::{MemoryStore, SettingsStore, StoreScope};
