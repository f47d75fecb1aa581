//! Crate-wide constants: descriptor geometry, the descriptor match
//! threshold, and the display text shown by the node.

/// Number of elements in a face descriptor.
pub const DESCRIPTOR_LEN: usize = 128;

/// Euclidean distance below which two descriptors are considered the
/// same person (the usual threshold for dlib resnet embeddings).
pub const MATCH_THRESHOLD: f64 = 0.6;

/// Text lines for the two-line hardware display.
pub mod text {
    /// Idle state, shown between access events.
    pub const WAITING: (&str, &str) = ("gatenode", "waiting for visitors");

    /// First line shown while the door is held open. The second line
    /// carries the visitor's name when one is known.
    pub const ACCESS_GRANTED: &str = "access granted";

    /// Shown after a denied or undecided access check.
    pub const ACCESS_DENIED: (&str, &str) = ("access denied", "");
}
