// Re-export from sub-crates
pub use orator_api::{ApiClient, ApiError};
pub use orator_audio::CpalCapture;
pub use orator_core::{
    APP_NAME, AudioClip, Config, ConfigManager, DEFAULT_LOG_LEVEL, DeviceId, RecordingSession,
    SessionError, SessionState,
};

// App-specific modules
pub mod auth;
pub mod cli;
pub mod coach;
pub mod record;
pub mod review;

// Version from this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
