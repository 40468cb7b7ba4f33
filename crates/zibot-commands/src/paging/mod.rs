//! Interactive paged messages.
//!
//! A handler returns a [`PageSet`]; the dispatcher sends the first page and
//! hands the message to the [`SessionSupervisor`], which owns one
//! [`PagingSession`] per hosting message until it is stopped, times out, or
//! the supervisor shuts down.

pub mod page;
pub mod session;
pub mod supervisor;

pub use page::*;
pub use session::*;
pub use supervisor::*;

use thiserror::Error;

/// Errors raised while building pages.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PagingError {
    /// A page set needs at least one page.
    #[error("A page set needs at least one page")]
    EmptyPageSet,
}
