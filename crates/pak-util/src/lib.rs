#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Shared utilities for pak.
//!
//! This crate provides pure helper functions with no logging/tracing dependencies.
//! Logging is handled by the library and CLI crates to keep this one lightweight.

pub mod fs;
