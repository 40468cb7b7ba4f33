//! # ziBot Common
//!
//! Shared identifiers, error types, logging and small utilities for ziBot.
//!
//! This crate provides the foundational types used across all other crates
//! in the ziBot workspace. Nothing in here talks to the chat platform.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod logging;
pub mod types;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod test_utils;

pub use logging::*;
pub use types::*;
pub use utils::*;
