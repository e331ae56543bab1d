//! storyreel is the scene compositor of a story-to-video pipeline.
//!
//! It turns an ordered sequence of timed caption/image scenes into a single
//! encoded video artifact:
//!
//! 1. **Sequence**: per-scene frame counts and transition windows from scene
//!    timings ([`scene::timeline`])
//! 2. **Render**: background, letterboxed image (or placeholder), wrapped
//!    caption with backing boxes, painted per frame ([`render::frame`])
//! 3. **Blend**: linear cross-dissolve at scene boundaries via an opacity
//!    layer over the incoming scene
//! 4. **Encode**: frames streamed to the system `ffmpeg` with the first
//!    supported codec/container from a preference table ([`encode`])
//!
//! The key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Exclusive ownership**: one [`Compositor`] invocation owns its surface
//!   and encoder session; concurrent videos need independent instances.
//! - **Injectable boundaries**: image source, codec probe, frame sink, audio
//!   monitor and frame pacer are traits, so the whole sequencer runs in
//!   tests without a media backend or wall-clock delays.
//! - **Full repaint**: every frame starts from an opaque background fill; no
//!   pixels survive between frames.
//!
//! Background audio is played locally for monitoring during the pass and is
//! not multiplexed into the artifact.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

/// Image resolution and decoding.
pub mod assets;
/// Background-audio monitoring.
pub mod audio;
/// The scene sequencer and its runtime environment.
pub mod compose;
/// Codec negotiation and frame sinks.
pub mod encode;
/// Errors and shared core types.
pub mod foundation;
/// Frame painting and transition blending.
pub mod render;
/// Scene data model and timeline math.
pub mod scene;
/// Caption wrapping, shaping and measurement.
pub mod text;

pub use assets::image::{FsImageSource, ImageSource, PreparedImage, decode_image};
pub use audio::monitor::{AudioMonitor, FfplayMonitor, NullMonitor};
pub use compose::pacer::{FramePacer, NoopPacer, RealTimePacer};
pub use compose::session::{ComposeEnv, Compositor, compose_to_file};
pub use encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
pub use encode::negotiate::{
    CODEC_PREFERENCES, CodecProbe, CodecSpec, FfmpegProbe, is_ffmpeg_on_path, select_codec,
};
pub use encode::sink::{FrameSink, MemorySink, SinkConfig, VideoArtifact};
pub use foundation::core::{Canvas, Fps, FrameRgba};
pub use foundation::error::{ReelError, ReelResult};
pub use render::frame::{FrameRenderer, ImagePaint, PLACEHOLDER_TEXT};
pub use scene::model::{CompositorConfig, Scene, StoryScript, validate_scenes};
pub use scene::timeline::{frames_for_scene, transition_frames, transition_progress};
pub use text::shape::{CaptionShaper, FixedAdvanceShaper, ParleyShaper, ShapedLine, ShapedRun};
pub use text::wrap::wrap_caption;
