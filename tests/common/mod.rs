//! Shared test doubles: a scripted authority and stub recognition
//! capabilities. Everything records its interactions so tests can
//! assert on sequences.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use gatenode::authority::MainNode;
use gatenode::constants::{DESCRIPTOR_LEN, MATCH_THRESHOLD};
use gatenode::error::Result;
use gatenode::recognition::{Detector, Frame, NormalizedFrame, Normalizer, Recognizer};
use gatenode::types::{AccessCheck, Descriptor, Rectangle, Task, TaskResult, User, Visit};

/// In-memory authority with a fixed access verdict and a script of
/// pending-task batches. Records visits and reported results.
#[derive(Default)]
pub struct ScriptedAuthority {
    check: Mutex<Option<AccessCheck>>,
    pending: Mutex<VecDeque<Vec<Task>>>,
    pub checks: AtomicUsize,
    pub visits: Mutex<Vec<Visit>>,
    pub reported: Mutex<Vec<TaskResult>>,
}

impl ScriptedAuthority {
    /// An authority that answers every descriptor check unsuccessfully.
    pub fn new() -> Self {
        Self::default()
    }

    /// An authority returning the given verdict for every check.
    pub fn with_check(check: AccessCheck) -> Self {
        let authority = Self::default();
        *authority.check.lock() = Some(check);
        authority
    }

    /// An authority granting access to `user` on every check.
    pub fn granting(user: User) -> Self {
        Self::with_check(AccessCheck {
            is_known: true,
            accessed: true,
            user: Some(user),
        })
    }

    /// Queues one batch of pending tasks for the next fetch.
    pub fn push_pending(&self, tasks: Vec<Task>) {
        self.pending.lock().push_back(tasks);
    }
}

#[async_trait]
impl MainNode for ScriptedAuthority {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn check_access_by_descriptor(
        &self,
        _descriptor: &Descriptor,
    ) -> Result<Option<AccessCheck>> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        Ok(self.check.lock().clone())
    }

    async fn report_visit(&self, visit: &Visit) -> Result<()> {
        self.visits.lock().push(visit.clone());
        Ok(())
    }

    async fn pending_tasks(&self) -> Result<Vec<Task>> {
        Ok(self.pending.lock().pop_front().unwrap_or_default())
    }

    async fn report_task_result(&self, result: &TaskResult) -> Result<()> {
        self.reported.lock().push(*result);
        Ok(())
    }
}

/// Detector reporting the same rectangles for every frame.
pub struct FixedDetector(pub Vec<Rectangle>);

impl Detector for FixedDetector {
    fn find_faces(&self, _frame: &Frame) -> Vec<Rectangle> {
        self.0.clone()
    }
}

/// Normalizer passing the frame bytes through as the chip.
pub struct PassNormalizer;

impl Normalizer for PassNormalizer {
    fn normalize(&self, frame: &Frame, _rectangle: Rectangle) -> Result<NormalizedFrame> {
        Ok(NormalizedFrame {
            data: frame.data.clone(),
        })
    }
}

/// Recognizer producing a constant descriptor and comparing with the
/// standard Euclidean threshold.
pub struct ConstRecognizer(pub f64);

impl Recognizer for ConstRecognizer {
    fn extract_descriptor(&self, _chip: &NormalizedFrame) -> Result<Descriptor> {
        Descriptor::new(vec![self.0; DESCRIPTOR_LEN])
    }

    fn similar(&self, a: &Descriptor, b: &Descriptor) -> bool {
        a.distance(b) < MATCH_THRESHOLD
    }
}

/// A frame with arbitrary content; the stub pipeline never inspects it.
pub fn blank_frame() -> Frame {
    Frame::new(32, 32, vec![0; 32 * 32])
}

/// A registered test user.
pub fn user(id: i64) -> User {
    User {
        id,
        name: "Alan".to_string(),
        surname: "Turing".to_string(),
        patronymic: "Mathison".to_string(),
        position: None,
    }
}
