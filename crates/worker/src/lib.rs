//! Notification delivery worker.
//!
//! Pulls pending notifications from the store through two paths, a one-off backlog scan and
//! a live feed, and delivers each through the sender registered for its type.

pub mod backlog;
pub mod dispatcher;
pub mod registry;
pub mod sender;
pub mod worker;

pub use dispatcher::{DispatchOutcome, DispatchStats, Dispatcher};
pub use registry::{SenderRegistry, build_registry};
pub use sender::{SendError, Sender};
pub use worker::{Worker, WorkerError};
