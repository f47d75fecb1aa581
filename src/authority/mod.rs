//! Remote authority (main node) interface.
//!
//! The authority owns the identity database and the task queue. The
//! room node consumes it through the narrow [`MainNode`] trait:
//! session initialization, one access-verdict operation, visit
//! reporting, and the task fetch/report pair. The shipped
//! implementation is [`HttpMainNode`]; tests substitute scripted
//! implementations.

pub mod http;

pub use http::HttpMainNode;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{AccessCheck, Descriptor, Task, TaskResult, Visit};

/// Session-based connection to the remote authority.
#[async_trait]
pub trait MainNode: Send + Sync {
    /// Establishes the session. Blocks (retrying with a fixed delay)
    /// until a session token is obtained -- the node never enters its
    /// loop unauthenticated.
    ///
    /// # Errors
    ///
    /// Implementations that cannot retry (test doubles) may fail
    /// instead of blocking.
    async fn initialize(&self) -> Result<()>;

    /// Asks the authority for a verdict on a descriptor. `Ok(None)`
    /// means the authority answered but unsuccessfully (malformed or
    /// `success = false`); the caller treats that as no decision.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`](crate::Error::Transport) when the
    /// authority is unreachable, [`Error::Unauthorized`](crate::Error::Unauthorized)
    /// when re-authentication failed.
    async fn check_access_by_descriptor(
        &self,
        descriptor: &Descriptor,
    ) -> Result<Option<AccessCheck>>;

    /// Reports a completed visit. Best-effort from the controller's
    /// perspective; failures are logged, never fatal.
    ///
    /// # Errors
    ///
    /// Transport and authorization failures, as above.
    async fn report_visit(&self, visit: &Visit) -> Result<()>;

    /// Fetches tasks the authority wants executed now.
    ///
    /// # Errors
    ///
    /// Transport and authorization failures, as above.
    async fn pending_tasks(&self) -> Result<Vec<Task>>;

    /// Reports the outcome of one executed task. Results are reported
    /// individually, never batched.
    ///
    /// # Errors
    ///
    /// Transport and authorization failures, as above.
    async fn report_task_result(&self, result: &TaskResult) -> Result<()>;
}
