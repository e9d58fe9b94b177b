//! Error handling for the Blink client
//!
//! This module defines the error taxonomy and the helpers used to render it.

pub mod formatting;
pub mod types;

pub use formatting::{format_error, format_error_for_logging};
pub use types::{Error, Result};
