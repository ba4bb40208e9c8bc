pub mod settings;

pub use settings::{RegimeSettings, Settings};
