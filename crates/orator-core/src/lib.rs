//! Core recording session and configuration for orator.
//!
//! This crate is platform-agnostic: the session state machine talks to the
//! microphone only through the [`CapturePort`] trait, so everything here is
//! testable without audio hardware. The cpal implementation lives in
//! `orator-audio`.

mod capture;
mod clip;
mod config;
mod session;
mod state;

pub use capture::{
    CaptureError, CapturePort, CaptureStream, ChunkEncoding, ChunkSink, DeviceId, InputDevice,
    MediaType, PcmSpec,
};
pub use clip::AudioClip;
pub use config::{Config, ConfigManager};
pub use session::{RecordingSession, SessionError};
pub use state::SessionState;

/// Application name
pub const APP_NAME: &str = "orator";

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";
