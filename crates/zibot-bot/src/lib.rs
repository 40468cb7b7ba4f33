//! # ziBot
//!
//! Discord command bot with rate-limited commands and interactive paged
//! messages.
//!
//! This is the main binary crate. It connects the command core from
//! `zibot-commands` to the Discord gateway through serenity and owns the
//! application lifecycle: startup, background maintenance and shutdown.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod bot;
pub mod error;
pub mod handler;
pub mod transport;

pub use bot::*;
pub use error::*;
pub use handler::*;
pub use transport::*;
