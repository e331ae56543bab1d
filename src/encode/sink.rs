use std::path::PathBuf;

use crate::{
    encode::negotiate::CodecSpec,
    foundation::{
        core::{FrameRgba, Fps},
        error::{ReelError, ReelResult},
    },
};

/// Configuration handed to a [`FrameSink`] before any frames are pushed.
#[derive(Clone, Debug)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frame rate.
    pub fps: Fps,
    /// Negotiated codec/container pairing.
    pub codec: CodecSpec,
}

/// The finalized output of one compose pass.
///
/// Exactly one artifact exists per successful pass; it is never mutated
/// after creation.
#[derive(Clone, Debug)]
pub struct VideoArtifact {
    /// Container tag of the encoded bytes (e.g. `webm`, `mp4`).
    pub container: &'static str,
    /// Local path the concatenated bytes were written to.
    pub path: PathBuf,
    /// Total artifact size in bytes.
    pub len_bytes: u64,
}

/// Sink contract for consuming rendered frames in timeline order.
///
/// `begin` is called once before any frame, `push_frame` once per frame in
/// strict emission order, then exactly one of `finish` (success, yielding
/// the artifact) or `abort` (failure, discarding buffered output). After
/// either, the session is over and no further calls are made.
pub trait FrameSink {
    /// Acquire the encoding session.
    fn begin(&mut self, cfg: SinkConfig) -> ReelResult<()>;
    /// Push one frame in emission order.
    fn push_frame(&mut self, frame: &FrameRgba) -> ReelResult<()>;
    /// Flush buffered chunks and produce the artifact.
    fn finish(&mut self) -> ReelResult<VideoArtifact>;
    /// Tear the session down, discarding any buffered output. Idempotent.
    fn abort(&mut self);
}

/// In-memory sink for tests and debugging.
///
/// Records the session lifecycle and every pushed frame; `finish` fabricates
/// an artifact describing what would have been written.
#[derive(Debug, Default)]
pub struct MemorySink {
    cfg: Option<SinkConfig>,
    /// Frames in arrival order.
    pub frames: Vec<FrameRgba>,
    /// Whether `finish` completed.
    pub finished: bool,
    /// Whether `abort` was called.
    pub aborted: bool,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// The configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<&SinkConfig> {
        self.cfg.as_ref()
    }
}

impl FrameSink for MemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> ReelResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.finished = false;
        self.aborted = false;
        Ok(())
    }

    fn push_frame(&mut self, frame: &FrameRgba) -> ReelResult<()> {
        if self.cfg.is_none() {
            return Err(ReelError::encoder("memory sink not started"));
        }
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> ReelResult<VideoArtifact> {
        let cfg = self
            .cfg
            .take()
            .ok_or_else(|| ReelError::encoder("memory sink not started"))?;
        self.finished = true;
        let len_bytes = self
            .frames
            .iter()
            .map(|f| f.data.len() as u64)
            .sum();
        Ok(VideoArtifact {
            container: cfg.codec.container,
            path: PathBuf::new(),
            len_bytes,
        })
    }

    fn abort(&mut self) {
        self.cfg = None;
        self.frames.clear();
        self.aborted = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::negotiate::CODEC_PREFERENCES;

    fn cfg() -> SinkConfig {
        SinkConfig {
            width: 4,
            height: 2,
            fps: Fps { num: 25, den: 1 },
            codec: CODEC_PREFERENCES[0],
        }
    }

    fn frame() -> FrameRgba {
        FrameRgba {
            width: 4,
            height: 2,
            data: vec![0u8; 32],
            premultiplied: true,
        }
    }

    #[test]
    fn push_before_begin_is_an_error() {
        let mut sink = MemorySink::new();
        assert!(sink.push_frame(&frame()).is_err());
    }

    #[test]
    fn finish_reports_container_and_frame_bytes() {
        let mut sink = MemorySink::new();
        sink.begin(cfg()).unwrap();
        sink.push_frame(&frame()).unwrap();
        sink.push_frame(&frame()).unwrap();
        let artifact = sink.finish().unwrap();
        assert_eq!(artifact.container, "webm");
        assert_eq!(artifact.len_bytes, 64);
        assert!(sink.finished);
    }

    #[test]
    fn abort_discards_buffered_frames() {
        let mut sink = MemorySink::new();
        sink.begin(cfg()).unwrap();
        sink.push_frame(&frame()).unwrap();
        sink.abort();
        assert!(sink.aborted);
        assert!(sink.frames.is_empty());
        assert!(sink.finish().is_err());
    }
}
