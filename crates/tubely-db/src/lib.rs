//! Tubely metadata store
//!
//! Repositories for the video records that the upload pipeline reads and updates.

pub mod db;

pub use db::{InMemoryVideoRepository, RepositoryError, VideoRepository};
