//! Actuation gate: the door/display sequencer.
//!
//! Owns the only two pieces of hardware with user-visible state and
//! guarantees the ordering of every sequence: display update ->
//! actuate -> hold -> restore idle. An async mutex serializes
//! sequences, so at most one door-open (or denial hold) is in flight
//! and display writes never interleave.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::constants::text;
use crate::hardware::{Display, Door};

/// Door and display sequencer shared by the controller and the
/// `OPEN_DOOR` task handler.
pub struct Gate {
    door: Arc<dyn Door>,
    display: Arc<dyn Display>,
    open_hold: Duration,
    deny_hold: Duration,
    sequence: Mutex<()>,
}

impl Gate {
    /// Creates a gate over the given hardware with the configured hold
    /// periods.
    pub fn new(
        door: Arc<dyn Door>,
        display: Arc<dyn Display>,
        open_hold: Duration,
        deny_hold: Duration,
    ) -> Self {
        Self {
            door,
            display,
            open_hold,
            deny_hold,
            sequence: Mutex::new(()),
        }
    }

    /// Puts the display into the idle state. Used at startup to force a
    /// known hardware state and after every sequence.
    pub fn idle(&self) {
        self.display.update(text::WAITING.0, text::WAITING.1);
    }

    /// Grant sequence: granted text (with the visitor's name line),
    /// door unlocked for the open hold, then idle again.
    pub async fn admit(&self, name_line: &str) {
        let _sequence = self.sequence.lock().await;
        self.display.update(text::ACCESS_GRANTED, name_line);
        self.door.open(self.open_hold);
        tokio::time::sleep(self.open_hold).await;
        self.idle();
    }

    /// Denial sequence: denied text, a brief hold, then idle again.
    /// The door is not touched.
    pub async fn reject(&self) {
        let _sequence = self.sequence.lock().await;
        self.display.update(text::ACCESS_DENIED.0, text::ACCESS_DENIED.1);
        tokio::time::sleep(self.deny_hold).await;
        self.idle();
    }
}
