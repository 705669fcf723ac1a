//! Finalized audio clips.

use bytes::Bytes;

use crate::capture::MediaType;

/// A finalized recording: one contiguous audio payload plus its media-type
/// tag. Backed by [`Bytes`], so cloning for a retried upload is O(1) and
/// every clone observes the same payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    data: Bytes,
    media_type: MediaType,
}

impl AudioClip {
    pub fn new(data: Bytes, media_type: MediaType) -> Self {
        Self { data, media_type }
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// File name used when the clip is sent as a multipart upload.
    pub fn file_name(&self) -> String {
        format!("recording.{}", self.media_type.extension())
    }
}
