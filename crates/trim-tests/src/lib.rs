//! Integration tests for Trim.
//!
//! This crate provides:
//! - A lockstep encoder/decoder link for end-to-end tests
//! - Seeded payload generators

pub mod link;
pub mod payload;

pub use link::{Link, Transfer};
pub use payload::PayloadGen;
