//! The room-node controller.
//!
//! [`RoomNode`] owns the control loop: two independent cadences --
//! fast access checks, slower task work -- evaluated cooperatively in
//! one loop. Each iteration runs whichever deadline has passed (zero,
//! one, or both), reschedules it to `now + period`, then sleeps until
//! the earliest deadline. An error escaping either tick is logged and
//! the loop moves on; the node runs until the process is killed.
//!
//! Startup: settle delay for the hardware, force the idle display
//! state, register task handlers (warning about declared task types
//! left without one), initialize the authority session, loop.

pub mod engine;
pub mod gate;
pub mod handlers;

pub use engine::{AccessDecision, AccessEngine, VerdictSource};
pub use gate::Gate;

use std::sync::Arc;

use chrono::Utc;
use tokio::time::Instant;

use crate::authority::MainNode;
use crate::config::NodeConfig;
use crate::error::Result;
use crate::node::handlers::{CancelTaskHandler, OpenDoorHandler, ScheduleTaskHandler};
use crate::tasker::Tasker;
use crate::types::{TaskType, User, Visit};

/// One unattended access-control endpoint.
pub struct RoomNode {
    engine: AccessEngine,
    gate: Arc<Gate>,
    authority: Arc<dyn MainNode>,
    tasker: Arc<Tasker>,
    config: NodeConfig,
}

impl RoomNode {
    /// Assembles a node from its injected collaborators.
    pub fn new(
        engine: AccessEngine,
        gate: Arc<Gate>,
        authority: Arc<dyn MainNode>,
        tasker: Arc<Tasker>,
        config: NodeConfig,
    ) -> Self {
        Self {
            engine,
            gate,
            authority,
            tasker,
            config,
        }
    }

    /// Runs the node: startup sequence, then the control loop. Under
    /// normal operation this never returns.
    ///
    /// # Errors
    ///
    /// Only a failed session initialization can surface here, and only
    /// from authority implementations that do not retry internally.
    pub async fn start(&self) -> Result<()> {
        self.setup().await?;
        self.run().await
    }

    async fn setup(&self) -> Result<()> {
        tokio::time::sleep(self.config.settle_delay()).await;
        self.gate.idle();
        self.register_handlers();
        for kind in self.tasker.missing_handlers() {
            tracing::warn!(%kind, "declared task type has no handler");
        }
        self.authority.initialize().await?;
        tracing::info!("room node up");
        Ok(())
    }

    /// Installs the built-in handlers for every declared task type.
    pub fn register_handlers(&self) {
        let storage = self.tasker.storage();
        self.tasker.register(
            TaskType::OpenDoor,
            Arc::new(OpenDoorHandler::new(Arc::clone(&self.gate))),
        );
        self.tasker.register(
            TaskType::ScheduleTask,
            Arc::new(ScheduleTaskHandler::new(Arc::clone(&storage))),
        );
        self.tasker.register(
            TaskType::CancelTask,
            Arc::new(CancelTaskHandler::new(storage, Arc::clone(&self.authority))),
        );
    }

    async fn run(&self) -> Result<()> {
        let mut next_access = Instant::now();
        let mut next_tasks = Instant::now();
        loop {
            let now = Instant::now();

            if next_access <= now {
                if let Err(e) = self.access_tick().await {
                    tracing::warn!(error = %e, "access check failed");
                }
                next_access = now + self.config.access_period();
            }

            if next_tasks <= now {
                if let Err(e) = self.task_tick().await {
                    tracing::warn!(error = %e, "task round failed");
                }
                next_tasks = now + self.config.task_period();
            }

            tokio::time::sleep_until(next_access.min(next_tasks)).await;
        }
    }

    /// One access check: decide, then sequence the hardware. A granted
    /// visit is reported to the authority asynchronously; losing that
    /// report never blocks or fails the loop.
    pub async fn access_tick(&self) -> Result<()> {
        match self.engine.check().await? {
            None => {}
            Some(AccessDecision::Granted { user }) => {
                let name_line = user.as_ref().map(User::display_line).unwrap_or_default();
                self.gate.admit(&name_line).await;
                if let Some(user) = user {
                    self.spawn_visit_report(user.id);
                }
            }
            Some(AccessDecision::Denied) => {
                self.gate.reject().await;
            }
        }
        Ok(())
    }

    /// One task round: drain the authority's pending tasks, then the
    /// due deferred tasks, and report every result individually.
    pub async fn task_tick(&self) -> Result<()> {
        let pending = self.authority.pending_tasks().await?;
        let mut results = Vec::with_capacity(pending.len());
        for task in &pending {
            results.push(self.tasker.perform(task).await);
        }
        results.extend(self.tasker.perform_suitable_tasks().await?);

        for result in &results {
            self.authority.report_task_result(result).await?;
        }
        Ok(())
    }

    fn spawn_visit_report(&self, user_id: i64) {
        let authority = Arc::clone(&self.authority);
        let visit = Visit {
            user_id,
            at: Utc::now(),
        };
        tokio::spawn(async move {
            if let Err(e) = authority.report_visit(&visit).await {
                tracing::warn!(error = %e, user_id = visit.user_id, "visit report failed");
            }
        });
    }
}
