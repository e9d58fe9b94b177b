//! Video retrieval
//!
//! Manifest listing, clip download and clip deletion on top of the
//! authorized transport.

pub mod pipeline;

pub use pipeline::{VIDEO_MEDIA_TYPE, VideoPipeline};
