//! Controller tests with simulated hardware and a scripted authority.
//!
//! These drive single ticks rather than the endless loop: one access
//! tick per access scenario, one task round per task scenario.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pretty_assertions::assert_eq;
use serde_json::json;

use common::{blank_frame, user, ConstRecognizer, FixedDetector, PassNormalizer, ScriptedAuthority};
use gatenode::hardware::{Camera, SimCamera, SimDisplay, SimDoor};
use gatenode::node::{AccessEngine, Gate, RoomNode, VerdictSource};
use gatenode::recognition::FaceNormalizer;
use gatenode::store::{MemoryTaskStorage, TaskStorage};
use gatenode::tasker::Tasker;
use gatenode::types::{AccessCheck, Rectangle, Task, TaskParams, TaskResult, TaskStatus, TaskType};
use gatenode::NodeConfig;

struct TestNode {
    node: RoomNode,
    door: Arc<SimDoor>,
    display: Arc<SimDisplay>,
    authority: Arc<ScriptedAuthority>,
    storage: Arc<dyn TaskStorage>,
}

fn test_config() -> NodeConfig {
    let mut config = NodeConfig::default();
    // Collapse the hardware holds so ticks are instant.
    config.door_open_secs = 0;
    config.deny_hold_ms = 0;
    config.settle_delay_secs = 0;
    config
}

fn build(authority: ScriptedAuthority, faces: Vec<Rectangle>) -> TestNode {
    build_with_camera(
        authority,
        faces,
        Arc::new(SimCamera::fixed(blank_frame())),
    )
}

fn build_with_camera(
    authority: ScriptedAuthority,
    faces: Vec<Rectangle>,
    camera: Arc<dyn Camera>,
) -> TestNode {
    let config = test_config();
    let authority = Arc::new(authority);
    let door = Arc::new(SimDoor::new());
    let display = Arc::new(SimDisplay::new());
    let gate = Arc::new(Gate::new(
        Arc::clone(&door) as _,
        Arc::clone(&display) as _,
        config.door_open(),
        config.deny_hold(),
    ));
    let engine = AccessEngine::new(
        camera,
        FaceNormalizer::new(Arc::new(FixedDetector(faces)), Arc::new(PassNormalizer)),
        Arc::new(ConstRecognizer(0.0)),
        VerdictSource::Authority(Arc::clone(&authority) as _),
    );
    let storage: Arc<dyn TaskStorage> = Arc::new(MemoryTaskStorage::new());
    let tasker = Arc::new(Tasker::new(Arc::clone(&storage)));
    let node = RoomNode::new(
        engine,
        gate,
        Arc::clone(&authority) as _,
        tasker,
        config,
    );
    node.register_handlers();
    TestNode {
        node,
        door,
        display,
        authority,
        storage,
    }
}

fn one_face() -> Vec<Rectangle> {
    vec![Rectangle::new(4, 4, 16, 16)]
}

fn params(value: serde_json::Value) -> TaskParams {
    value.as_object().cloned().expect("object params")
}

/// Waits for the spawned visit report to land.
async fn visits_reported(authority: &ScriptedAuthority) -> usize {
    for _ in 0..50 {
        let count = authority.visits.lock().len();
        if count > 0 {
            return count;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    0
}

#[tokio::test]
async fn granted_access_opens_door_and_reports_visit() {
    let fixture = build(ScriptedAuthority::granting(user(9)), one_face());

    fixture.node.access_tick().await.unwrap();

    assert_eq!(fixture.door.opens().len(), 1);
    let updates = fixture.display.updates();
    assert_eq!(updates[0].0, "access granted");
    assert_eq!(updates[0].1, "Turing A. M.");
    assert_eq!(updates[1].0, "gatenode");

    assert_eq!(visits_reported(&fixture.authority).await, 1);
    assert_eq!(fixture.authority.visits.lock()[0].user_id, 9);
}

#[tokio::test]
async fn known_visitor_without_permission_is_denied() {
    let fixture = build(
        ScriptedAuthority::with_check(AccessCheck {
            is_known: true,
            accessed: false,
            user: Some(user(9)),
        }),
        one_face(),
    );

    fixture.node.access_tick().await.unwrap();

    assert!(fixture.door.opens().is_empty());
    assert_eq!(fixture.display.updates()[0].0, "access denied");
    assert!(fixture.authority.visits.lock().is_empty());
}

#[tokio::test]
async fn authority_without_verdict_is_a_denial() {
    let fixture = build(ScriptedAuthority::new(), one_face());

    fixture.node.access_tick().await.unwrap();

    assert!(fixture.door.opens().is_empty());
    assert_eq!(fixture.display.updates()[0].0, "access denied");
}

#[tokio::test]
async fn empty_frame_leaves_everything_untouched() {
    let fixture = build(ScriptedAuthority::granting(user(1)), vec![]);

    fixture.node.access_tick().await.unwrap();

    assert!(fixture.door.opens().is_empty());
    assert!(fixture.display.updates().is_empty());
    assert_eq!(fixture.authority.checks.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn camera_fault_is_contained_to_its_tick() {
    let fixture = build_with_camera(
        ScriptedAuthority::granting(user(1)),
        one_face(),
        Arc::new(SimCamera::failing()),
    );

    assert!(fixture.node.access_tick().await.is_err());
    assert!(fixture.door.opens().is_empty());

    // The node keeps working: the task round still runs.
    fixture.node.task_tick().await.unwrap();
}

#[tokio::test]
async fn task_round_drains_both_sources_and_reports_each_result() {
    let fixture = build(ScriptedAuthority::new(), vec![]);

    // One immediate task from the authority...
    fixture
        .authority
        .push_pending(vec![Task::new(1, TaskType::OpenDoor)]);

    // ...and one deferred task already due.
    let now = Utc::now();
    let due = gatenode::types::DeferredTask::new(
        Task::new(2, TaskType::OpenDoor),
        now - chrono::Duration::seconds(1),
        now + chrono::Duration::seconds(60),
    )
    .unwrap();
    fixture.storage.add(due).await.unwrap();

    fixture.node.task_tick().await.unwrap();

    assert_eq!(fixture.door.opens().len(), 2);
    assert_eq!(
        *fixture.authority.reported.lock(),
        vec![
            TaskResult::new(1, TaskStatus::Done),
            TaskResult::new(2, TaskStatus::Done),
        ]
    );
}

#[tokio::test]
async fn schedule_task_persists_then_runs_when_due() {
    let fixture = build(ScriptedAuthority::new(), vec![]);
    let now = Utc::now();

    fixture.authority.push_pending(vec![Task::with_params(
        10,
        TaskType::ScheduleTask,
        params(json!({
            "task": {"id": 42, "type": "OPEN_DOOR"},
            "after": (now - chrono::Duration::seconds(1)).to_rfc3339(),
            "before": (now + chrono::Duration::seconds(60)).to_rfc3339(),
        })),
    )]);

    // First round schedules; the deferred task is harvested in the
    // same round because its window is already open.
    fixture.node.task_tick().await.unwrap();

    assert_eq!(
        *fixture.authority.reported.lock(),
        vec![
            TaskResult::new(10, TaskStatus::Done),
            TaskResult::new(42, TaskStatus::Done),
        ]
    );
    assert_eq!(fixture.door.opens().len(), 1);
    assert!(fixture.storage.get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn malformed_schedule_params_report_parameters_error() {
    let fixture = build(ScriptedAuthority::new(), vec![]);

    fixture.authority.push_pending(vec![Task::with_params(
        10,
        TaskType::ScheduleTask,
        params(json!({"task": {"id": 42}})),
    )]);

    fixture.node.task_tick().await.unwrap();

    assert_eq!(
        *fixture.authority.reported.lock(),
        vec![TaskResult::new(10, TaskStatus::ParametersError)]
    );
    assert!(fixture.storage.get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn cancel_task_removes_and_acknowledges_the_cancelled_id() {
    let fixture = build(ScriptedAuthority::new(), vec![]);
    let now = Utc::now();

    let scheduled = gatenode::types::DeferredTask::new(
        Task::new(42, TaskType::OpenDoor),
        now + chrono::Duration::seconds(600),
        now + chrono::Duration::seconds(700),
    )
    .unwrap();
    fixture.storage.add(scheduled).await.unwrap();

    fixture.authority.push_pending(vec![Task::with_params(
        11,
        TaskType::CancelTask,
        params(json!({"task_id": 42})),
    )]);

    fixture.node.task_tick().await.unwrap();

    assert!(fixture.storage.get_all().await.unwrap().is_empty());
    assert_eq!(
        *fixture.authority.reported.lock(),
        vec![
            TaskResult::new(42, TaskStatus::Cancelled),
            TaskResult::new(11, TaskStatus::Done),
        ]
    );
}

#[tokio::test]
async fn cancelling_twice_stays_quiet() {
    let fixture = build(ScriptedAuthority::new(), vec![]);

    for round in [11, 12] {
        fixture.authority.push_pending(vec![Task::with_params(
            round,
            TaskType::CancelTask,
            params(json!({"task_id": 42})),
        )]);
        fixture.node.task_tick().await.unwrap();
    }

    let reported = fixture.authority.reported.lock();
    assert_eq!(reported[1], TaskResult::new(11, TaskStatus::Done));
    assert_eq!(reported[3], TaskResult::new(12, TaskStatus::Done));
}
