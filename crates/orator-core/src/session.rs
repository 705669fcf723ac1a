//! The recording session state machine.
//!
//! One session owns at most one hardware capture stream at a time and is
//! responsible for releasing it on every exit path: `stop()`, a start
//! failure, or teardown. The platform callback side only ever sees a
//! [`ChunkSink`] handle, never the session itself.

use std::io::Cursor;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use bytes::{Bytes, BytesMut};
use hound::WavWriter;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::capture::{
    CaptureError, CapturePort, CaptureStream, ChunkEncoding, ChunkSink, DeviceId, InputDevice,
    MediaType, PcmSpec,
};
use crate::clip::AudioClip;
use crate::state::SessionState;

#[derive(Debug, Error)]
pub enum SessionError {
    /// The user or platform refused microphone access
    #[error("microphone permission denied")]
    PermissionDenied,
    /// The selected device could not be opened
    #[error("input device unavailable: {0}")]
    DeviceUnavailable(String),
    /// The operation is not allowed in the current state
    #[error("{op} is not valid in the {state} state")]
    InvalidState {
        op: &'static str,
        state: SessionState,
    },
    /// stop() was reached with zero captured chunks
    #[error("recording captured no audio")]
    EmptyRecording,
    /// Chunk assembly failed
    #[error("failed to finalize recording: {0}")]
    Finalize(#[source] anyhow::Error),
    /// Capture backend error that is not a permission or device problem
    #[error(transparent)]
    Capture(CaptureError),
}

impl From<CaptureError> for SessionError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::PermissionDenied => SessionError::PermissionDenied,
            CaptureError::DeviceUnavailable(name) => SessionError::DeviceUnavailable(name),
            other => SessionError::Capture(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// Lifecycle of one microphone capture: start/pause/resume/stop, chunk
/// accumulation, and finalization into an [`AudioClip`].
pub struct RecordingSession {
    port: Box<dyn CapturePort>,
    state: SessionState,
    sink: ChunkSink,
    stream: Option<Box<dyn CaptureStream>>,
    encoding: ChunkEncoding,
    /// Capture time accumulated across pause/resume cycles.
    recorded: Duration,
    /// Set while in `Recording`; `None` otherwise.
    started_at: Option<Instant>,
    clip: Option<AudioClip>,
}

impl RecordingSession {
    pub fn new(port: Box<dyn CapturePort>) -> Self {
        Self {
            port,
            state: SessionState::Idle,
            sink: ChunkSink::new(),
            stream: None,
            encoding: ChunkEncoding::Pcm(PcmSpec {
                sample_rate: 16_000,
                channels: 1,
            }),
            recorded: Duration::ZERO,
            started_at: None,
            clip: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Capture time so far. Advances only while `Recording`; frozen in
    /// `Paused` and after `stop()`; reset by the next `start()`.
    pub fn elapsed(&self) -> Duration {
        self.recorded + self.started_at.map(|t| t.elapsed()).unwrap_or_default()
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed().as_secs()
    }

    /// Number of chunks buffered since the last start.
    pub fn chunk_count(&self) -> usize {
        self.sink.len()
    }

    /// Enumerate input devices via the capture port. Enumeration failure
    /// degrades to an empty list; callers fall back to the default device.
    pub fn list_input_devices(&self) -> Vec<InputDevice> {
        match self.port.list_devices() {
            Ok(devices) => devices,
            Err(err) => {
                warn!(error = %err, "device enumeration failed, continuing with default device");
                Vec::new()
            }
        }
    }

    /// Acquire a capture stream and begin recording. Valid from `Idle` or
    /// `Ready` (the latter implicitly resets the previous recording). On
    /// failure the session stays in `Idle` with no stream held.
    pub fn start(&mut self, device: Option<&DeviceId>) -> Result<()> {
        match self.state {
            SessionState::Idle | SessionState::Ready => {}
            state => return Err(SessionError::InvalidState { op: "start", state }),
        }

        // A fresh sink per start: any stream from a previous session still
        // quiescing holds the old sink, so its late chunks land nowhere.
        let sink = ChunkSink::new();
        let stream = self.port.open(device, sink.clone())?;

        self.encoding = stream.encoding();
        self.sink = sink;
        self.stream = Some(stream);
        self.clip = None;
        self.recorded = Duration::ZERO;
        self.started_at = Some(Instant::now());
        self.state = SessionState::Recording;

        info!(device = ?device.map(DeviceId::as_str), encoding = ?self.encoding, "recording started");
        Ok(())
    }

    /// Suspend chunk accumulation and the elapsed clock without releasing
    /// the hardware stream. Valid only from `Recording`.
    pub fn pause(&mut self) -> Result<()> {
        if self.state != SessionState::Recording {
            return Err(SessionError::InvalidState {
                op: "pause",
                state: self.state,
            });
        }

        self.sink.set_accepting(false);
        if let Some(stream) = self.stream.as_mut() {
            // The sink gate is authoritative; a backend that cannot pause
            // keeps delivering into a closed sink.
            if let Err(err) = stream.pause() {
                warn!(error = %err, "backend pause failed, relying on sink gate");
            }
        }
        if let Some(started) = self.started_at.take() {
            self.recorded += started.elapsed();
        }
        self.state = SessionState::Paused;
        debug!(elapsed = ?self.recorded, chunks = self.sink.len(), "recording paused");
        Ok(())
    }

    /// Resume accumulation after a pause. Valid only from `Paused`.
    pub fn resume(&mut self) -> Result<()> {
        if self.state != SessionState::Paused {
            return Err(SessionError::InvalidState {
                op: "resume",
                state: self.state,
            });
        }

        if let Some(stream) = self.stream.as_mut() {
            if let Err(err) = stream.resume() {
                warn!(error = %err, "backend resume failed");
            }
        }
        self.sink.set_accepting(true);
        self.started_at = Some(Instant::now());
        self.state = SessionState::Recording;
        debug!("recording resumed");
        Ok(())
    }

    /// End the capture, release the hardware stream, and finalize the
    /// collected chunks into a clip. Valid from `Recording` or `Paused`.
    /// The stream is released even when finalization fails.
    pub fn stop(&mut self) -> Result<()> {
        if !self.state.is_capturing() {
            return Err(SessionError::InvalidState {
                op: "stop",
                state: self.state,
            });
        }

        if let Some(started) = self.started_at.take() {
            self.recorded += started.elapsed();
        }
        self.sink.close();

        // Dropping the stream releases the device. This happens before any
        // finalization work so a failure below can never leak the mic.
        drop(self.stream.take());
        self.state = SessionState::Stopped;

        self.state = SessionState::Finalizing;
        let chunks = self.sink.take_chunks();
        if chunks.is_empty() {
            warn!("stop with zero captured chunks");
            self.state = SessionState::Failed;
            return Err(SessionError::EmptyRecording);
        }

        match finalize(chunks, self.encoding) {
            Ok(clip) => {
                info!(
                    bytes = clip.len(),
                    media = clip.media_type().mime(),
                    duration = ?self.recorded,
                    "recording finalized"
                );
                self.clip = Some(clip);
                self.state = SessionState::Ready;
                Ok(())
            }
            Err(err) => {
                self.state = SessionState::Failed;
                Err(err)
            }
        }
    }

    /// Clear the session back to `Idle`. Valid from the terminal states
    /// (`Ready`, `Failed`); a no-op from `Idle`. Callers must `stop()`
    /// before resetting a live recording.
    pub fn reset(&mut self) -> Result<()> {
        match self.state {
            SessionState::Idle | SessionState::Ready | SessionState::Failed => {}
            state => return Err(SessionError::InvalidState { op: "reset", state }),
        }

        self.sink = ChunkSink::new();
        self.clip = None;
        self.recorded = Duration::ZERO;
        self.started_at = None;
        self.state = SessionState::Idle;
        Ok(())
    }

    /// Read-only view of the finalized clip for local playback. Valid only
    /// in `Ready`.
    pub fn export_for_playback(&self) -> Result<&AudioClip> {
        match (&self.clip, self.state) {
            (Some(clip), SessionState::Ready) => Ok(clip),
            _ => Err(SessionError::InvalidState {
                op: "export_for_playback",
                state: self.state,
            }),
        }
    }

    /// Owned copy of the finalized clip for the upload collaborator. The
    /// session keeps its own copy, so a failed upload can be retried
    /// without re-recording; repeated calls return equal payloads.
    pub fn export_for_upload(&self) -> Result<AudioClip> {
        self.export_for_playback().cloned()
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        self.sink.close();
        if self.stream.take().is_some() {
            info!("session dropped mid-capture, releasing stream");
        }
    }
}

/// Assemble chunks, in arrival order, into one deliverable clip.
fn finalize(chunks: Vec<Bytes>, encoding: ChunkEncoding) -> Result<AudioClip> {
    match encoding {
        // Chunks already carry container framing: concatenate as-is.
        ChunkEncoding::Encoded(media) => {
            let total: usize = chunks.iter().map(|c| c.len()).sum();
            let mut data = BytesMut::with_capacity(total);
            for chunk in &chunks {
                data.extend_from_slice(chunk);
            }
            Ok(AudioClip::new(data.freeze(), media))
        }
        ChunkEncoding::Pcm(spec) => wrap_wav(chunks, spec),
    }
}

/// Wrap raw i16 LE PCM chunks in a WAV container, in memory.
fn wrap_wav(chunks: Vec<Bytes>, spec: PcmSpec) -> Result<AudioClip> {
    let wav_spec = hound::WavSpec {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let total: usize = chunks.iter().map(|c| c.len()).sum();
    let mut cursor = Cursor::new(Vec::with_capacity(44 + total));
    let mut writer = WavWriter::new(&mut cursor, wav_spec)
        .map_err(|e| SessionError::Finalize(anyhow!("wav header: {e}")))?;

    for chunk in &chunks {
        // Chunks are whole i16 frames; a torn trailing byte is dropped.
        for sample in chunk.chunks_exact(2) {
            writer
                .write_sample(i16::from_le_bytes([sample[0], sample[1]]))
                .map_err(|e| SessionError::Finalize(anyhow!("wav sample: {e}")))?;
        }
    }
    writer
        .finalize()
        .map_err(|e| SessionError::Finalize(anyhow!("wav finalize: {e}")))?;

    Ok(AudioClip::new(
        Bytes::from(cursor.into_inner()),
        MediaType::Wav,
    ))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use super::*;

    /// Capture port that hands out counted fake streams and stashes every
    /// sink it is given, so tests can feed chunks and watch stream handles.
    struct FakePort {
        encoding: ChunkEncoding,
        deny_permission: bool,
        missing_device: bool,
        streams_open: Arc<AtomicUsize>,
        sinks: Arc<Mutex<Vec<ChunkSink>>>,
    }

    impl FakePort {
        fn containered() -> Self {
            Self {
                encoding: ChunkEncoding::Encoded(MediaType::Webm),
                deny_permission: false,
                missing_device: false,
                streams_open: Arc::new(AtomicUsize::new(0)),
                sinks: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn pcm(sample_rate: u32, channels: u16) -> Self {
            Self {
                encoding: ChunkEncoding::Pcm(PcmSpec {
                    sample_rate,
                    channels,
                }),
                ..Self::containered()
            }
        }
    }

    struct FakeStream {
        encoding: ChunkEncoding,
        streams_open: Arc<AtomicUsize>,
    }

    impl CaptureStream for FakeStream {
        fn pause(&mut self) -> crate::capture::Result<()> {
            Ok(())
        }

        fn resume(&mut self) -> crate::capture::Result<()> {
            Ok(())
        }

        fn encoding(&self) -> ChunkEncoding {
            self.encoding
        }
    }

    impl Drop for FakeStream {
        fn drop(&mut self) {
            self.streams_open.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl CapturePort for FakePort {
        fn list_devices(&self) -> crate::capture::Result<Vec<InputDevice>> {
            Err(CaptureError::Other(anyhow!("enumeration not supported")))
        }

        fn open(
            &self,
            _device: Option<&DeviceId>,
            sink: ChunkSink,
        ) -> crate::capture::Result<Box<dyn CaptureStream>> {
            if self.deny_permission {
                return Err(CaptureError::PermissionDenied);
            }
            if self.missing_device {
                return Err(CaptureError::DeviceUnavailable("fake".into()));
            }
            self.sinks.lock().push(sink);
            self.streams_open.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeStream {
                encoding: self.encoding,
                streams_open: self.streams_open.clone(),
            }))
        }
    }

    /// Session plus the port-side handles the tests poke at.
    fn harness(port: FakePort) -> (RecordingSession, Arc<AtomicUsize>, Arc<Mutex<Vec<ChunkSink>>>) {
        let streams = port.streams_open.clone();
        let sinks = port.sinks.clone();
        (RecordingSession::new(Box::new(port)), streams, sinks)
    }

    fn current_sink(sinks: &Arc<Mutex<Vec<ChunkSink>>>) -> ChunkSink {
        sinks.lock().last().expect("no sink captured").clone()
    }

    #[test]
    fn full_capture_produces_ready_clip() {
        let (mut session, streams, sinks) = harness(FakePort::containered());
        session.start(None).unwrap();
        assert_eq!(session.state(), SessionState::Recording);
        assert_eq!(streams.load(Ordering::SeqCst), 1);

        let sink = current_sink(&sinks);
        sink.push(Bytes::from(vec![1u8; 10]));
        sink.push(Bytes::from(vec![2u8; 20]));
        sink.push(Bytes::from(vec![3u8; 15]));

        session.stop().unwrap();
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(streams.load(Ordering::SeqCst), 0);

        let clip = session.export_for_playback().unwrap();
        assert!(clip.len() >= 45);
        assert_eq!(clip.media_type(), MediaType::Webm);
        // containered chunks concatenate without overhead
        assert_eq!(clip.len(), 45);
    }

    #[test]
    fn empty_recording_fails_and_releases_stream() {
        let (mut session, streams, _sinks) = harness(FakePort::containered());
        session.start(None).unwrap();
        let err = session.stop().unwrap_err();
        assert!(matches!(err, SessionError::EmptyRecording));
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(streams.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn pause_resume_stop_ends_terminal() {
        let (mut session, streams, sinks) = harness(FakePort::containered());
        session.start(None).unwrap();
        let sink = current_sink(&sinks);
        sink.push(Bytes::from_static(b"first"));

        session.pause().unwrap();
        assert_eq!(session.state(), SessionState::Paused);
        // gated while paused
        assert!(!sink.push(Bytes::from_static(b"ignored")));

        session.resume().unwrap();
        assert_eq!(session.state(), SessionState::Recording);
        assert!(sink.push(Bytes::from_static(b"second")));

        session.stop().unwrap();
        assert!(session.state().is_terminal());
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(streams.load(Ordering::SeqCst), 0);

        let clip = session.export_for_playback().unwrap();
        assert_eq!(clip.data().as_ref(), b"firstsecond");
    }

    #[test]
    fn invalid_transitions_mutate_nothing() {
        let (mut session, _streams, sinks) = harness(FakePort::containered());

        // nothing is running yet
        assert!(matches!(
            session.pause(),
            Err(SessionError::InvalidState { op: "pause", .. })
        ));
        assert!(matches!(
            session.resume(),
            Err(SessionError::InvalidState { op: "resume", .. })
        ));
        assert!(matches!(
            session.stop(),
            Err(SessionError::InvalidState { op: "stop", .. })
        ));
        assert_eq!(session.state(), SessionState::Idle);

        session.start(None).unwrap();
        current_sink(&sinks).push(Bytes::from_static(b"data"));
        let chunks_before = session.chunk_count();
        let elapsed_before = session.elapsed();

        assert!(matches!(
            session.resume(),
            Err(SessionError::InvalidState { op: "resume", .. })
        ));
        assert!(matches!(
            session.reset(),
            Err(SessionError::InvalidState { op: "reset", .. })
        ));
        assert_eq!(session.state(), SessionState::Recording);
        assert_eq!(session.chunk_count(), chunks_before);
        assert!(session.elapsed() >= elapsed_before);
    }

    #[test]
    fn elapsed_is_frozen_while_paused() {
        let (mut session, _streams, sinks) = harness(FakePort::containered());
        session.start(None).unwrap();
        current_sink(&sinks).push(Bytes::from_static(b"x"));

        let during = session.elapsed();
        let later = session.elapsed();
        assert!(later >= during);

        session.pause().unwrap();
        let frozen = session.elapsed();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(session.elapsed(), frozen);

        session.resume().unwrap();
        assert!(session.elapsed() >= frozen);
    }

    #[test]
    fn reset_returns_to_idle_and_clears_everything() {
        let (mut session, _streams, sinks) = harness(FakePort::containered());
        session.start(None).unwrap();
        current_sink(&sinks).push(Bytes::from_static(b"payload"));
        session.stop().unwrap();
        assert_eq!(session.state(), SessionState::Ready);

        session.reset().unwrap();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.chunk_count(), 0);
        assert_eq!(session.elapsed(), Duration::ZERO);
        assert!(session.export_for_playback().is_err());

        // reset from Idle is a harmless no-op
        session.reset().unwrap();
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn reset_recovers_from_failed() {
        let (mut session, _streams, _sinks) = harness(FakePort::containered());
        session.start(None).unwrap();
        assert!(session.stop().is_err());
        assert_eq!(session.state(), SessionState::Failed);

        // start is not valid from Failed; reset is the way out
        assert!(matches!(
            session.start(None),
            Err(SessionError::InvalidState { op: "start", .. })
        ));
        session.reset().unwrap();
        session.start(None).unwrap();
        assert_eq!(session.state(), SessionState::Recording);
    }

    #[test]
    fn start_from_ready_resets_previous_recording() {
        let (mut session, streams, sinks) = harness(FakePort::containered());
        session.start(None).unwrap();
        current_sink(&sinks).push(Bytes::from_static(b"old"));
        session.stop().unwrap();

        session.start(None).unwrap();
        assert_eq!(session.state(), SessionState::Recording);
        assert_eq!(session.chunk_count(), 0);
        assert!(session.export_for_playback().is_err());
        assert_eq!(streams.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn late_chunk_from_stale_stream_cannot_corrupt_new_recording() {
        let (mut session, _streams, sinks) = harness(FakePort::containered());
        session.start(None).unwrap();
        let stale_sink = current_sink(&sinks);
        stale_sink.push(Bytes::from_static(b"old"));
        session.stop().unwrap();

        session.start(None).unwrap();
        // the platform had not fully quiesced and delivers one more chunk
        // through the handle it was given for the previous recording
        assert!(!stale_sink.push(Bytes::from_static(b"late")));
        assert_eq!(session.chunk_count(), 0);

        current_sink(&sinks).push(Bytes::from_static(b"new"));
        session.stop().unwrap();
        assert_eq!(
            session.export_for_playback().unwrap().data().as_ref(),
            b"new"
        );
    }

    #[test]
    fn permission_denied_leaves_idle_with_no_stream() {
        let port = FakePort {
            deny_permission: true,
            ..FakePort::containered()
        };
        let (mut session, streams, _sinks) = harness(port);
        let err = session.start(None).unwrap_err();
        assert!(matches!(err, SessionError::PermissionDenied));
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(streams.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn device_unavailable_is_surfaced() {
        let port = FakePort {
            missing_device: true,
            ..FakePort::containered()
        };
        let (mut session, _streams, _sinks) = harness(port);
        assert!(matches!(
            session.start(None),
            Err(SessionError::DeviceUnavailable(_))
        ));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn enumeration_failure_degrades_to_empty_list() {
        let (session, _streams, _sinks) = harness(FakePort::containered());
        assert!(session.list_input_devices().is_empty());
    }

    #[test]
    fn export_for_upload_is_idempotent() {
        let (mut session, _streams, sinks) = harness(FakePort::containered());
        session.start(None).unwrap();
        current_sink(&sinks).push(Bytes::from_static(b"payload"));
        session.stop().unwrap();

        let first = session.export_for_upload().unwrap();
        let second = session.export_for_upload().unwrap();
        assert_eq!(first, second);
        // exporting does not consume the session's copy
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.export_for_playback().unwrap(), &first);
    }

    #[test]
    fn export_outside_ready_is_rejected() {
        let (mut session, _streams, _sinks) = harness(FakePort::containered());
        assert!(session.export_for_upload().is_err());
        session.start(None).unwrap();
        assert!(matches!(
            session.export_for_playback(),
            Err(SessionError::InvalidState { .. })
        ));
    }

    #[test]
    fn pcm_chunks_are_wrapped_in_a_wav_container() {
        let (mut session, _streams, sinks) = harness(FakePort::pcm(16_000, 1));
        session.start(None).unwrap();

        // 100 i16 samples split unevenly across two chunks
        let samples: Vec<u8> = (0..100i16).flat_map(i16::to_le_bytes).collect();
        let sink = current_sink(&sinks);
        sink.push(Bytes::from(samples[..60].to_vec()));
        sink.push(Bytes::from(samples[60..].to_vec()));

        session.stop().unwrap();
        let clip = session.export_for_playback().unwrap();
        assert_eq!(clip.media_type(), MediaType::Wav);
        assert_eq!(&clip.data()[..4], b"RIFF");
        assert_eq!(&clip.data()[8..12], b"WAVE");
        // 44-byte header + 200 bytes of samples
        assert_eq!(clip.len(), 244);

        let mut reader = hound::WavReader::new(Cursor::new(clip.data().to_vec())).unwrap();
        assert_eq!(reader.spec().sample_rate, 16_000);
        assert_eq!(reader.spec().channels, 1);
        let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, (0..100i16).collect::<Vec<_>>());
    }

    #[test]
    fn dropping_a_live_session_releases_the_stream() {
        let (mut session, streams, _sinks) = harness(FakePort::containered());
        session.start(None).unwrap();
        assert_eq!(streams.load(Ordering::SeqCst), 1);
        drop(session);
        assert_eq!(streams.load(Ordering::SeqCst), 0);
    }
}
