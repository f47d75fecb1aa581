//! Simulated hardware devices.
//!
//! In-process stand-ins for the physical door, display, and camera.
//! Each records its interactions so tests (and diskless bring-up) can
//! assert on actuation sequences. **Never wire these to a production
//! node** -- they keep every interaction in memory forever.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::hardware::{Camera, Display, Door};
use crate::recognition::Frame;

/// Simulated door recording every open call with its hold period.
#[derive(Debug, Default)]
pub struct SimDoor {
    opens: Mutex<Vec<Duration>>,
}

impl SimDoor {
    /// Creates a closed door with no recorded opens.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `open` call so far, in order.
    pub fn opens(&self) -> Vec<Duration> {
        self.opens.lock().clone()
    }
}

impl Door for SimDoor {
    fn open(&self, period: Duration) {
        tracing::debug!(?period, "sim door open");
        self.opens.lock().push(period);
    }
}

/// Simulated display recording every update.
#[derive(Debug, Default)]
pub struct SimDisplay {
    lines: Mutex<Vec<(String, String)>>,
}

impl SimDisplay {
    /// Creates a blank display.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every update so far, in order.
    pub fn updates(&self) -> Vec<(String, String)> {
        self.lines.lock().clone()
    }

    /// The currently shown lines, if anything was ever written.
    pub fn current(&self) -> Option<(String, String)> {
        self.lines.lock().last().cloned()
    }
}

impl Display for SimDisplay {
    fn update(&self, line1: &str, line2: &str) {
        self.lines.lock().push((line1.to_string(), line2.to_string()));
    }
}

/// Simulated camera serving frames from a script.
///
/// Construct with [`fixed`](Self::fixed) for an endless identical feed,
/// or [`scripted`](Self::scripted) for a finite frame sequence; a
/// scripted camera fails once its frames run out, which is how tests
/// exercise the controller's fault isolation.
#[derive(Debug)]
pub struct SimCamera {
    queue: Mutex<VecDeque<Frame>>,
    fallback: Option<Frame>,
}

impl SimCamera {
    /// A camera that returns a clone of `frame` forever.
    pub fn fixed(frame: Frame) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback: Some(frame),
        }
    }

    /// A camera that serves the given frames in order, then fails.
    pub fn scripted(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            queue: Mutex::new(frames.into_iter().collect()),
            fallback: None,
        }
    }

    /// A camera that always fails.
    pub fn failing() -> Self {
        Self::scripted([])
    }
}

impl Camera for SimCamera {
    fn frame(&self) -> Result<Frame> {
        if let Some(frame) = self.queue.lock().pop_front() {
            return Ok(frame);
        }
        self.fallback
            .clone()
            .ok_or_else(|| Error::Camera("simulated feed exhausted".to_string()))
    }
}
