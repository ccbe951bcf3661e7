//! Repositories for the data access layer
//!
//! Each repository is responsible for a single domain entity and is exposed through a
//! trait so services can be tested against alternative implementations.

pub mod video;

pub use video::{InMemoryVideoRepository, RepositoryError, VideoRepository};
