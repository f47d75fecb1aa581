//! Hardware capability traits.
//!
//! The physical devices -- electromechanical door lock, two-line text
//! display, camera -- are external. The node consumes them through the
//! small interfaces below, composed by dependency injection; there is
//! no device registry and no inheritance. Door and display calls are
//! fire-and-forget: this core does not distinguish their failures from
//! success.

pub mod sim;

pub use sim::{SimCamera, SimDisplay, SimDoor};

use std::time::Duration;

use crate::error::Result;
use crate::recognition::Frame;

/// A door with an electromechanical lock.
pub trait Door: Send + Sync {
    /// Unlocks the door for the given period. Returns immediately; the
    /// lock re-engages on its own.
    fn open(&self, period: Duration);
}

/// A two-line informational text display.
pub trait Display: Send + Sync {
    /// Replaces both display lines.
    fn update(&self, line1: &str, line2: &str);
}

/// A camera delivering video as individual frames.
pub trait Camera: Send + Sync {
    /// Captures one frame. May block briefly.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Camera`](crate::Error::Camera) when no frame
    /// can be produced; the controller treats that as a per-iteration
    /// fault, not a fatal one.
    fn frame(&self) -> Result<Frame>;
}
