//! Data models for the application
//!
//! Each sub-module covers one feature area; everything is re-exported here.

mod media;
mod storage;
mod video;

pub use media::*;
pub use storage::*;
pub use video::*;
