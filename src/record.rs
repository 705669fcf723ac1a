//! Interactive record-and-upload flow.
//!
//! The session runs synchronously on the calling thread (capture streams
//! are thread-bound); only the upload hops onto the tokio runtime.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, anyhow};
use bytes::Bytes;
use orator_api::ApiClient;
use orator_audio::CpalCapture;
use orator_core::{
    AudioClip, Config, DeviceId, MediaType, RecordingSession, SessionError, SessionState,
};
use tokio::runtime::Runtime;
use tracing::info;

use crate::review;

/// Run the interactive recording loop, then upload the finalized clip.
pub fn run(
    runtime: &Runtime,
    config: &Config,
    client: &ApiClient,
    device: Option<String>,
) -> Result<()> {
    let mut session = RecordingSession::new(Box::new(CpalCapture::new()));

    let wanted = device
        .or_else(|| config.device().map(str::to_owned))
        .map(DeviceId);

    session.start(wanted.as_ref()).map_err(friendly_start_err)?;
    println!("Recording. Commands: pause, resume, stop, cancel");

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("failed to read command")?;
        match line.trim() {
            "pause" => report(session.pause()),
            "resume" => report(session.resume()),
            "stop" => {
                match session.stop() {
                    Ok(()) => {}
                    Err(SessionError::EmptyRecording) => {
                        println!("Nothing was captured; the microphone stayed silent.");
                    }
                    Err(err) => eprintln!("error: {err}"),
                }
                break;
            }
            "cancel" => {
                // dropping the session releases the stream
                println!("Recording discarded.");
                return Ok(());
            }
            "" | "status" => {
                println!(
                    "state: {}  elapsed: {}s  chunks: {}",
                    session.state(),
                    session.elapsed_seconds(),
                    session.chunk_count()
                );
            }
            other => println!("unknown command: {other}"),
        }
        if !session.state().is_capturing() {
            break;
        }
    }

    if session.state() != SessionState::Ready {
        return Ok(());
    }

    if session.elapsed() < config.discard_under() {
        info!(elapsed = ?session.elapsed(), "discarding recording under the configured minimum");
        println!("Recording too short, discarded.");
        return Ok(());
    }

    let clip = session.export_for_upload()?;
    println!(
        "Captured {}s of audio ({} KiB). Uploading...",
        session.elapsed_seconds(),
        clip.len() / 1024
    );
    upload_with_retry(runtime, client, &clip, config.language())
}

/// Upload an existing audio file; the media type is taken from the
/// extension.
pub fn analyze_file(
    runtime: &Runtime,
    config: &Config,
    client: &ApiClient,
    path: &Path,
) -> Result<()> {
    let data = std::fs::read(path).with_context(|| format!("failed to read {path:?}"))?;
    if data.is_empty() {
        return Err(anyhow!("{path:?} is empty"));
    }
    let media = path
        .extension()
        .and_then(|e| e.to_str())
        .map(MediaType::from_extension)
        .unwrap_or(MediaType::Wav);
    let clip = AudioClip::new(Bytes::from(data), media);
    upload_with_retry(runtime, client, &clip, config.language())
}

/// Submit an already-transcribed speech as plain text.
pub fn analyze_transcript_file(runtime: &Runtime, client: &ApiClient, path: &Path) -> Result<()> {
    let transcript =
        std::fs::read_to_string(path).with_context(|| format!("failed to read {path:?}"))?;
    let transcript = transcript.trim();
    if transcript.is_empty() {
        return Err(anyhow!("{path:?} is empty"));
    }
    let analysis = runtime.block_on(client.analyze_transcript(transcript))?;
    review::print_analysis(&analysis);
    Ok(())
}

/// The clip survives upload failures, so the user can retry without
/// re-recording. When the user gives up, the clip is written to disk so
/// `orator analyze <file>` can resubmit it later.
fn upload_with_retry(
    runtime: &Runtime,
    client: &ApiClient,
    clip: &AudioClip,
    language: Option<&str>,
) -> Result<()> {
    loop {
        match runtime.block_on(client.analyze_audio(clip, language)) {
            Ok(analysis) => {
                review::print_analysis(&analysis);
                return Ok(());
            }
            Err(err) => {
                eprintln!("upload failed: {err}");
                if !confirm("Retry upload?")? {
                    let dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
                    match save_clip(clip, &dir) {
                        Ok(path) => println!(
                            "Recording saved to {}; resubmit it with `orator analyze {}`",
                            path.display(),
                            path.display()
                        ),
                        Err(save_err) => eprintln!("could not save recording: {save_err}"),
                    }
                    return Err(err.into());
                }
            }
        }
    }
}

/// Write the clip into `dir` under a timestamped name, so an abandoned
/// upload never discards the audio.
fn save_clip(clip: &AudioClip, dir: &Path) -> Result<PathBuf> {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let name = format!("recording-{seconds}.{}", clip.media_type().extension());
    let path = dir.join(name);
    std::fs::write(&path, clip.data())
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

fn friendly_start_err(err: SessionError) -> anyhow::Error {
    match &err {
        SessionError::PermissionDenied => {
            anyhow!("microphone access was denied; check your system audio permissions")
        }
        SessionError::DeviceUnavailable(name) => {
            anyhow!("could not open input device '{name}'; run `orator devices` to list them")
        }
        _ => err.into(),
    }
}

fn report(result: Result<(), SessionError>) {
    if let Err(err) = result {
        eprintln!("error: {err}");
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush().ok();
    let mut answer = String::new();
    io::stdin()
        .read_line(&mut answer)
        .context("failed to read answer")?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
