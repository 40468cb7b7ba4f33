//! # ziBot Commands
//!
//! Command handling core for ziBot.
//!
//! This crate provides the command registry, the cooldown rate limiter, the
//! dispatcher that turns text messages into handler calls, and interactive
//! paged messages driven by reactions. It talks to the chat platform only
//! through the [`Transport`] trait, so everything here runs without a
//! gateway connection.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod about;
pub mod admin;
pub mod context;
pub mod cooldown;
pub mod dispatcher;
pub mod framework;
pub mod fun;
pub mod help;
pub mod paging;
pub mod registry;
pub mod transport;
pub mod uptime;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use context::*;
pub use cooldown::*;
pub use dispatcher::*;
pub use framework::*;
pub use paging::*;
pub use registry::*;
pub use transport::*;
