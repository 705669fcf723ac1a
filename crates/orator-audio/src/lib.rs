//! cpal-backed implementation of the capture port.
//!
//! Captured samples are converted to interleaved i16 little-endian PCM and
//! pushed into the session's [`ChunkSink`] one cpal callback at a time, so
//! the core sees the same chunk-arrival model regardless of what the
//! device's native sample format is.

use anyhow::anyhow;
use bytes::Bytes;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Host, Sample, SizedSample};
use orator_core::{
    CaptureError, CapturePort, CaptureStream, ChunkEncoding, ChunkSink, DeviceId, InputDevice,
    PcmSpec,
};
use tracing::{debug, error, info};

type Result<T> = std::result::Result<T, CaptureError>;

/// Capture port over the platform's default cpal host.
pub struct CpalCapture {
    host: Host,
}

impl CpalCapture {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    fn resolve_device(&self, wanted: Option<&DeviceId>) -> Result<Device> {
        let Some(id) = wanted else {
            return self
                .host
                .default_input_device()
                .ok_or_else(|| CaptureError::DeviceUnavailable("default".into()));
        };

        let devices = self
            .host
            .input_devices()
            .map_err(|e| CaptureError::Other(anyhow!("input device enumeration: {e}")))?;
        for device in devices {
            if device.name().map(|n| n == id.as_str()).unwrap_or(false) {
                return Ok(device);
            }
        }
        Err(CaptureError::DeviceUnavailable(id.as_str().to_owned()))
    }
}

impl Default for CpalCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl CapturePort for CpalCapture {
    fn list_devices(&self) -> Result<Vec<InputDevice>> {
        let default_name = self
            .host
            .default_input_device()
            .and_then(|d| d.name().ok());

        let devices = self
            .host
            .input_devices()
            .map_err(|e| CaptureError::Other(anyhow!("input device enumeration: {e}")))?;

        let mut out = Vec::new();
        for device in devices {
            // devices that refuse to report a name are skipped
            let Ok(name) = device.name() else { continue };
            out.push(InputDevice {
                id: DeviceId(name.clone()),
                default: Some(&name) == default_name.as_ref(),
                label: name,
            });
        }
        Ok(out)
    }

    fn open(&self, device: Option<&DeviceId>, sink: ChunkSink) -> Result<Box<dyn CaptureStream>> {
        let device = self.resolve_device(device)?;
        let config = device.default_input_config().map_err(|e| {
            CaptureError::DeviceUnavailable(format!(
                "{}: {e}",
                device.name().unwrap_or_else(|_| "unknown".into())
            ))
        })?;

        info!(
            device_name = %device.name().unwrap_or_else(|_| "unknown".into()),
            sample_rate = config.sample_rate().0,
            channels = config.channels(),
            format = ?config.sample_format(),
            "opening capture stream"
        );

        let spec = PcmSpec {
            sample_rate: config.sample_rate().0,
            channels: config.channels(),
        };

        let stream = match config.sample_format() {
            cpal::SampleFormat::I8 => build_stream::<i8>(&device, &config.into(), sink)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config.into(), sink)?,
            cpal::SampleFormat::I32 => build_stream::<i32>(&device, &config.into(), sink)?,
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config.into(), sink)?,
            sample_format => {
                return Err(CaptureError::SampleFormatNotSupported(format!(
                    "{sample_format:?}"
                )));
            }
        };

        stream
            .play()
            .map_err(|e| CaptureError::Other(anyhow!("failed to start stream: {e}")))?;

        Ok(Box::new(CpalStream {
            stream,
            encoding: ChunkEncoding::Pcm(spec),
        }))
    }
}

/// An open cpal input stream. Dropping it releases the device.
struct CpalStream {
    stream: cpal::Stream,
    encoding: ChunkEncoding,
}

impl CaptureStream for CpalStream {
    fn pause(&mut self) -> Result<()> {
        self.stream
            .pause()
            .map_err(|e| CaptureError::Other(anyhow!("stream pause: {e}")))
    }

    fn resume(&mut self) -> Result<()> {
        self.stream
            .play()
            .map_err(|e| CaptureError::Other(anyhow!("stream resume: {e}")))
    }

    fn encoding(&self) -> ChunkEncoding {
        self.encoding
    }
}

fn build_stream<T>(
    device: &Device,
    config: &cpal::StreamConfig,
    sink: ChunkSink,
) -> Result<cpal::Stream>
where
    T: SizedSample,
    i16: FromSample<T>,
{
    let err_fn = move |err| {
        error!("an error occurred on stream: {}", err);
    };

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &_| push_chunk(data, &sink),
            err_fn,
            None,
        )
        .map_err(|e| match e {
            cpal::BuildStreamError::DeviceNotAvailable => {
                CaptureError::DeviceUnavailable("device disappeared while opening".into())
            }
            other => CaptureError::Other(anyhow!("build input stream: {other}")),
        })
}

/// Convert one callback's samples to i16 LE bytes and hand them to the
/// sink. The sink drops the chunk when the session has paused or stopped.
fn push_chunk<T>(input: &[T], sink: &ChunkSink)
where
    T: SizedSample,
    i16: FromSample<T>,
{
    if input.is_empty() {
        return;
    }
    let mut bytes = Vec::with_capacity(input.len() * 2);
    for &sample in input {
        bytes.extend_from_slice(&i16::from_sample(sample).to_le_bytes());
    }
    if !sink.push(Bytes::from(bytes)) {
        // Normal right after pause/stop while the backend quiesces.
        debug!("chunk dropped by gated sink");
    }
}
