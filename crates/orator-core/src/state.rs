//! Recording session lifecycle states.

use std::fmt;

/// The current state of a recording session.
///
/// `Stopped` and `Finalizing` are transient: a session passes through them
/// inside `stop()` and is never observed in either between calls unless
/// finalization panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No capture in progress and nothing buffered
    Idle,
    /// Actively capturing audio from the input device
    Recording,
    /// Capture suspended, hardware stream still held
    Paused,
    /// Capture ended, stream released, chunks not yet finalized
    Stopped,
    /// Concatenating chunks into the final clip
    Finalizing,
    /// A finalized clip is available for playback/upload
    Ready,
    /// Finalization failed; reset() to go again
    Failed,
}

impl SessionState {
    /// Terminal until `reset()` is called.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Ready | SessionState::Failed)
    }

    /// True while the session holds the hardware capture stream.
    pub fn is_capturing(self) -> bool {
        matches!(self, SessionState::Recording | SessionState::Paused)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionState::Idle => "idle",
            SessionState::Recording => "recording",
            SessionState::Paused => "paused",
            SessionState::Stopped => "stopped",
            SessionState::Finalizing => "finalizing",
            SessionState::Ready => "ready",
            SessionState::Failed => "failed",
        };
        f.write_str(label)
    }
}
