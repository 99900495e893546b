pub mod settings;

pub use settings::{Settings, DEFAULT_DATA_PATH};
