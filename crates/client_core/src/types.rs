use std::{fmt, sync::Arc};

use crate::error::ClientError;

/// A file offered by the user before validation.
#[derive(Clone)]
pub struct VideoCandidate {
    pub file_name: String,
    pub media_type: String,
    pub data: Vec<u8>,
}

impl VideoCandidate {
    pub fn new(
        file_name: impl Into<String>,
        media_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.into(),
            data,
        }
    }
}

impl fmt::Debug for VideoCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoCandidate")
            .field("file_name", &self.file_name)
            .field("media_type", &self.media_type)
            .field("size", &self.data.len())
            .finish()
    }
}

/// A validated video. Cloning shares the underlying bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct VideoSelection {
    file_name: String,
    media_type: String,
    data: Arc<Vec<u8>>,
}

impl VideoSelection {
    /// Accepts only `video/*` media types and, when a limit is given, files no
    /// larger than `max_bytes`.
    pub fn validate(
        candidate: VideoCandidate,
        max_bytes: Option<u64>,
    ) -> Result<Self, ClientError> {
        let media_type = candidate.media_type.trim().to_ascii_lowercase();
        if !media_type.starts_with("video/") {
            return Err(ClientError::validation(format!(
                "'{}' is not a video file (media type '{}')",
                candidate.file_name, candidate.media_type
            )));
        }

        let size = candidate.data.len() as u64;
        if let Some(limit) = max_bytes {
            if size > limit {
                return Err(ClientError::validation(format!(
                    "'{}' is {size} bytes, larger than the {limit} byte upload limit",
                    candidate.file_name
                )));
            }
        }

        Ok(Self {
            file_name: candidate.file_name,
            media_type,
            data: Arc::new(candidate.data),
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn data(&self) -> Arc<Vec<u8>> {
        Arc::clone(&self.data)
    }
}

impl fmt::Debug for VideoSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoSelection")
            .field("file_name", &self.file_name)
            .field("media_type", &self.media_type)
            .field("size", &self.data.len())
            .finish()
    }
}

/// Result of a successful upload: where the backend stored the video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub video_url: String,
}

impl UploadOutcome {
    pub fn new(video_url: impl Into<String>) -> Self {
        Self {
            video_url: video_url.into(),
        }
    }
}

/// Monotonic tag identifying the selection/stage an asynchronous result
/// belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_video_media_types_case_insensitively() {
        let selection = VideoSelection::validate(
            VideoCandidate::new("clip.mp4", "Video/MP4", vec![0; 16]),
            None,
        )
        .expect("valid video");
        assert_eq!(selection.media_type(), "video/mp4");
        assert_eq!(selection.size(), 16);
    }

    #[test]
    fn rejects_non_video_candidates() {
        let err = VideoSelection::validate(
            VideoCandidate::new("notes.txt", "text/plain", b"hi".to_vec()),
            None,
        )
        .expect_err("not a video");
        assert!(err.is_validation());
    }

    #[test]
    fn rejects_candidates_over_size_limit() {
        let candidate = VideoCandidate::new("clip.mp4", "video/mp4", vec![0; 11]);
        assert!(VideoSelection::validate(candidate.clone(), Some(10)).is_err());
        assert!(VideoSelection::validate(candidate, Some(11)).is_ok());
    }
}
