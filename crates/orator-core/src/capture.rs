//! Capture port abstraction.
//!
//! Device enumeration, permission prompts, and the platform stream are
//! modeled as fallible calls on a trait so the session can run against a
//! fake port in tests instead of a real microphone. The cpal-backed
//! implementation lives in the `orator-audio` crate.

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    /// The user or platform refused microphone access
    #[error("microphone permission denied")]
    PermissionDenied,
    /// The requested device could not be opened
    #[error("input device unavailable: {0}")]
    DeviceUnavailable(String),
    /// Sample format not supported
    #[error("sample format not supported: {0}")]
    SampleFormatNotSupported(String),
    /// generic anyhow error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CaptureError>;

/// Opaque identifier for an audio input device. The platform default is
/// used when no id is given.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceId(pub String);

impl DeviceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        DeviceId(s.to_owned())
    }
}

/// An enumerable audio input device.
#[derive(Debug, Clone)]
pub struct InputDevice {
    pub id: DeviceId,
    pub label: String,
    /// Whether this is the platform default input
    pub default: bool,
}

/// Media type tag carried by a finalized clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Wav,
    Webm,
    Ogg,
}

impl MediaType {
    pub fn mime(self) -> &'static str {
        match self {
            MediaType::Wav => "audio/wav",
            MediaType::Webm => "audio/webm",
            MediaType::Ogg => "audio/ogg",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            MediaType::Wav => "wav",
            MediaType::Webm => "webm",
            MediaType::Ogg => "ogg",
        }
    }

    /// Guess a media type from a file extension. Unknown extensions fall
    /// back to WAV, the one container every transcription backend accepts.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "webm" => MediaType::Webm,
            "ogg" | "oga" | "opus" => MediaType::Ogg,
            _ => MediaType::Wav,
        }
    }
}

/// Interleaved i16 little-endian PCM parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmSpec {
    pub sample_rate: u32,
    pub channels: u16,
}

/// What the bytes pushed into the [`ChunkSink`] actually are, which decides
/// how finalization assembles them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkEncoding {
    /// Raw interleaved i16 LE samples; finalization wraps them in a WAV
    /// container.
    Pcm(PcmSpec),
    /// Chunks already carry container framing (e.g. a compressed stream);
    /// finalization is ordered concatenation tagged with this type.
    Encoded(MediaType),
}

#[derive(Debug, Default)]
struct SinkInner {
    accepting: bool,
    chunks: Vec<Bytes>,
}

/// Buffer the platform stream pushes captured chunks into.
///
/// Cheaply cloneable so the stream callback can own a handle while the
/// session keeps another. The session creates a fresh sink on every start;
/// a stale stream that has not fully quiesced still holds the previous
/// sink, so its late chunks can never land in a new recording's buffer.
#[derive(Debug, Clone)]
pub struct ChunkSink {
    inner: Arc<Mutex<SinkInner>>,
}

impl ChunkSink {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SinkInner {
                accepting: true,
                chunks: Vec::new(),
            })),
        }
    }

    /// Append a chunk in arrival order. Returns `false` when the sink is
    /// gated (paused or closed); the chunk is dropped without touching the
    /// buffer.
    pub fn push(&self, chunk: Bytes) -> bool {
        if chunk.is_empty() {
            return false;
        }
        let mut inner = self.inner.lock();
        if !inner.accepting {
            return false;
        }
        inner.chunks.push(chunk);
        true
    }

    /// Gate or un-gate the sink without dropping buffered chunks.
    pub(crate) fn set_accepting(&self, accepting: bool) {
        self.inner.lock().accepting = accepting;
    }

    /// Permanently stop accepting chunks.
    pub(crate) fn close(&self) {
        self.set_accepting(false);
    }

    /// Number of chunks collected so far.
    pub fn len(&self) -> usize {
        self.inner.lock().chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().chunks.is_empty()
    }

    /// Drain the buffered chunks in arrival order, leaving the sink closed.
    pub(crate) fn take_chunks(&self) -> Vec<Bytes> {
        let mut inner = self.inner.lock();
        inner.accepting = false;
        std::mem::take(&mut inner.chunks)
    }
}

impl Default for ChunkSink {
    fn default() -> Self {
        Self::new()
    }
}

/// An open hardware capture stream. Dropping the stream releases the
/// device; this is the only way the session lets go of the microphone.
///
/// Deliberately not `Send`: platform streams (cpal included) are tied to
/// the thread that opened them, and the session is a single-owner state
/// machine driven from one thread anyway.
pub trait CaptureStream {
    /// Suspend delivery of chunks without releasing the device.
    fn pause(&mut self) -> Result<()>;

    /// Resume delivery after a pause.
    fn resume(&mut self) -> Result<()>;

    /// Encoding of the chunks this stream pushes into its sink.
    fn encoding(&self) -> ChunkEncoding;
}

/// Factory for capture streams, one per platform audio backend.
pub trait CapturePort {
    /// Enumerate available input devices. May trigger a platform
    /// permission prompt.
    fn list_devices(&self) -> Result<Vec<InputDevice>>;

    /// Open an exclusive capture stream for the given device, or the
    /// platform default when `None`. Captured chunks are pushed into
    /// `sink` in arrival order until the stream is paused or dropped.
    fn open(&self, device: Option<&DeviceId>, sink: ChunkSink) -> Result<Box<dyn CaptureStream>>;
}
