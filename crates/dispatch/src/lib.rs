//! Conversation distribution for the helpdesk core.
//!
//! Three pieces sit on top of the entity store:
//!
//! - [`engine`]: evaluates distribution rules against an unassigned
//!   conversation and either assigns an attendant or parks the
//!   conversation on the waiting queue.
//! - [`queue`]: the supervisor-facing queue operations — listing in drain
//!   order, manual override assignment, the auto-retry pass, and stats.
//! - [`actions`]: conversation lifecycle transitions (resolve, close,
//!   transfer) and internal notes.
//!
//! Every operation takes the acting tenant and the evaluation instant
//! explicitly, so outcomes are reproducible for a fixed rule set and time.

pub mod actions;
pub mod engine;
pub mod error;
pub mod notify;
pub mod queue;
mod schedule;

pub use engine::{distribute, Outcome};
pub use error::{DispatchError, Result};
pub use notify::{LogNotifier, Notifier, NotifyError};
