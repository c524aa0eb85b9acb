//! Configuration loaded from `.cask.toml`.

pub mod settings;

pub use settings::{parse_duration, Settings};
