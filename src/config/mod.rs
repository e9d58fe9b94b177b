//! Configuration management for the Blink client
//!
//! This module handles loading and validating the settings shared by the
//! library and the `blink` binary.

pub mod loader;
pub mod settings;

pub use loader::ConfigLoader;
pub use settings::{
    AccountSettings, ApiSettings, LoggingSettings, NetworkSettings, SessionSettings, Settings,
    VideoSettings,
};
