//! # Recording Library Module
//!
//! Owns the local recording mirror database and provides repository patterns
//! for data access.
//!
//! ## Overview
//!
//! This module manages:
//! - SQLite database schema and migrations
//! - Domain models for recordings, metadata, playback formats and types
//! - Read-side repositories with filtering and pagination
//! - Aggregate statistics over the mirrored recordings

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;

pub use db::{create_pool, create_test_pool, DatabaseConfig};
pub use error::{LibraryError, Result};
