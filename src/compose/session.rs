use std::path::Path;

use anyhow::Context as _;

use crate::{
    assets::image::{FsImageSource, ImageSource},
    audio::monitor::{AudioMonitor, FfplayMonitor},
    compose::pacer::{FramePacer, RealTimePacer},
    encode::{
        ffmpeg::{FfmpegSink, FfmpegSinkOpts},
        negotiate::{CodecProbe, FfmpegProbe, select_codec},
        sink::{FrameSink, SinkConfig, VideoArtifact},
    },
    foundation::error::ReelResult,
    render::frame::{FrameRenderer, ImagePaint},
    scene::{
        model::{CompositorConfig, Scene, validate_scenes},
        timeline::{frames_for_scene, transition_frames, transition_progress},
    },
    text::shape::{CaptionShaper, ParleyShaper},
};

/// Runtime boundaries a compose pass talks to.
///
/// Every collaborator is a trait object so the full sequencer runs
/// hermetically in tests: in-memory sink, stub image source, no-op pacer.
pub struct ComposeEnv<'a> {
    /// Resolves scene image references.
    pub images: &'a mut dyn ImageSource,
    /// Codec capability probe for output negotiation.
    pub probe: &'a dyn CodecProbe,
    /// Destination for rendered frames.
    pub sink: &'a mut dyn FrameSink,
    /// Background audio playback for local monitoring.
    pub audio: &'a mut dyn AudioMonitor,
    /// Real-time (or test-time) frame pacing.
    pub pacer: &'a mut dyn FramePacer,
}

/// Drives the scene loop: one compositor invocation owns its render surface
/// and encoder session exclusively for the duration of the pass.
pub struct Compositor {
    cfg: CompositorConfig,
    renderer: FrameRenderer,
}

impl Compositor {
    /// Build a compositor, registering the caption font from
    /// `cfg.font_source`.
    pub fn new(cfg: CompositorConfig) -> ReelResult<Self> {
        cfg.validate()?;
        let font_bytes = std::fs::read(&cfg.font_source).with_context(|| {
            format!(
                "read caption font from '{}'",
                cfg.font_source.display()
            )
        })?;
        let shaper = ParleyShaper::from_font_bytes(font_bytes)?;
        Self::with_shaper(cfg, Box::new(shaper))
    }

    /// Build a compositor around an explicit shaper.
    pub fn with_shaper(cfg: CompositorConfig, shaper: Box<dyn CaptionShaper>) -> ReelResult<Self> {
        let renderer = FrameRenderer::new(cfg.clone(), shaper)?;
        Ok(Self { cfg, renderer })
    }

    /// Compose `scenes` into one video artifact.
    ///
    /// Exactly one of `Ok(artifact)` or `Err(_)` comes back. On any failure
    /// after startup the sink is aborted (no partial artifact) and background
    /// audio is stopped; per-scene image failures are absorbed and only
    /// degrade that scene to the placeholder.
    #[tracing::instrument(skip_all, fields(scenes = scenes.len()))]
    pub fn compose(
        &mut self,
        scenes: &[Scene],
        background_audio: Option<&str>,
        env: &mut ComposeEnv<'_>,
    ) -> ReelResult<VideoArtifact> {
        validate_scenes(scenes)?;

        // Codec negotiation and sink acquisition both happen before any
        // frame is drawn; failures here leave the pass untouched.
        let codec = select_codec(env.probe)?;
        tracing::debug!(codec = %codec.label(), "negotiated output encoding");
        env.sink.begin(SinkConfig {
            width: self.cfg.canvas.width,
            height: self.cfg.canvas.height,
            fps: self.cfg.fps,
            codec,
        })?;

        if let Some(source) = background_audio {
            // Monitoring only; a dead speaker must not kill the render.
            if let Err(e) = env.audio.start(source, self.cfg.monitor_volume) {
                tracing::warn!(error = %e, "background audio failed to start, continuing without it");
            }
        }
        env.pacer.begin(self.cfg.fps);

        let result = self.run_scene_loop(scenes, env);
        env.audio.stop();
        match result {
            Ok(()) => env.sink.finish(),
            Err(e) => {
                env.sink.abort();
                Err(e)
            }
        }
    }

    fn run_scene_loop(&mut self, scenes: &[Scene], env: &mut ComposeEnv<'_>) -> ReelResult<()> {
        let fps = self.cfg.fps;
        let dissolve_frames = transition_frames(self.cfg.transition_secs, fps);

        // The incoming scene's image is resolved once at the boundary and
        // handed over as the loop advances; no state outlives the iteration.
        let mut current_image = resolve_image(&scenes[0], 0, env.images);

        for (i, scene) in scenes.iter().enumerate() {
            let frames = frames_for_scene(scene, fps);
            tracing::debug!(scene = i, frames, "rendering scene");
            for _ in 0..frames {
                let frame = self.renderer.render_scene(scene, current_image.as_ref())?;
                env.sink.push_frame(&frame)?;
                env.pacer.tick();
            }

            if let Some(next) = scenes.get(i + 1) {
                let next_image = resolve_image(next, i + 1, env.images);
                for k in 0..dissolve_frames {
                    let progress = transition_progress(k, dissolve_frames);
                    let frame = self.renderer.render_transition(
                        scene,
                        current_image.as_ref(),
                        next,
                        next_image.as_ref(),
                        progress,
                    )?;
                    env.sink.push_frame(&frame)?;
                    env.pacer.tick();
                }
                current_image = next_image;
            }
        }

        Ok(())
    }
}

fn resolve_image(scene: &Scene, idx: usize, images: &mut dyn ImageSource) -> Option<ImagePaint> {
    let url = scene.image_url.as_deref()?;
    match images
        .load(url)
        .and_then(|img| ImagePaint::from_prepared(&img))
    {
        Ok(paint) => Some(paint),
        Err(e) => {
            tracing::warn!(scene = idx, url, error = %e, "image load failed, rendering placeholder");
            None
        }
    }
}

/// Compose with the production collaborators: filesystem images, system
/// ffmpeg encoding, ffplay audio monitoring, real-time pacing.
pub fn compose_to_file(
    cfg: CompositorConfig,
    scenes: &[Scene],
    background_audio: Option<&str>,
    out_path: impl AsRef<Path>,
) -> ReelResult<VideoArtifact> {
    let mut compositor = Compositor::new(cfg)?;

    let mut images = FsImageSource;
    let probe = FfmpegProbe;
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(out_path.as_ref()));
    let mut audio = FfplayMonitor::new();
    let mut pacer = RealTimePacer::new();

    let mut env = ComposeEnv {
        images: &mut images,
        probe: &probe,
        sink: &mut sink,
        audio: &mut audio,
        pacer: &mut pacer,
    };
    compositor.compose(scenes, background_audio, &mut env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assets::image::PreparedImage,
        audio::monitor::NullMonitor,
        compose::pacer::NoopPacer,
        encode::negotiate::CodecSpec,
        encode::sink::MemorySink,
        foundation::core::FrameRgba,
        foundation::error::ReelError,
        text::shape::FixedAdvanceShaper,
    };

    struct AlwaysProbe;
    impl CodecProbe for AlwaysProbe {
        fn supports(&self, _spec: &CodecSpec) -> bool {
            true
        }
    }

    struct NeverProbe;
    impl CodecProbe for NeverProbe {
        fn supports(&self, _spec: &CodecSpec) -> bool {
            false
        }
    }

    struct SolidImages;
    impl ImageSource for SolidImages {
        fn load(&mut self, _url: &str) -> ReelResult<PreparedImage> {
            PreparedImage::from_rgba8(2, 2, vec![255u8; 16])
        }
    }

    struct BrokenImages;
    impl ImageSource for BrokenImages {
        fn load(&mut self, url: &str) -> ReelResult<PreparedImage> {
            Err(ReelError::image_load(format!("no such image '{url}'")))
        }
    }

    #[derive(Default)]
    struct RecordingMonitor {
        started: u32,
        stopped: u32,
    }
    impl AudioMonitor for RecordingMonitor {
        fn start(&mut self, _source: &str, _volume: f32) -> ReelResult<()> {
            self.started += 1;
            Ok(())
        }
        fn stop(&mut self) {
            self.stopped += 1;
        }
    }

    /// Sink whose `push_frame` fails after `ok_frames` successes.
    #[derive(Default)]
    struct FailingSink {
        ok_frames: u32,
        pushed: u32,
        begun: bool,
        aborted: bool,
        finished: bool,
    }
    impl FrameSink for FailingSink {
        fn begin(&mut self, _cfg: SinkConfig) -> ReelResult<()> {
            self.begun = true;
            Ok(())
        }
        fn push_frame(&mut self, _frame: &FrameRgba) -> ReelResult<()> {
            if self.pushed >= self.ok_frames {
                return Err(ReelError::encoder("synthetic encode failure"));
            }
            self.pushed += 1;
            Ok(())
        }
        fn finish(&mut self) -> ReelResult<VideoArtifact> {
            self.finished = true;
            Ok(VideoArtifact {
                container: "webm",
                path: std::path::PathBuf::new(),
                len_bytes: 0,
            })
        }
        fn abort(&mut self) {
            self.aborted = true;
        }
    }

    fn test_compositor() -> Compositor {
        let mut cfg = CompositorConfig::new("unused.ttf");
        cfg.canvas.width = 64;
        cfg.canvas.height = 36;
        Compositor::with_shaper(cfg, Box::new(FixedAdvanceShaper::default())).unwrap()
    }

    fn scene(text: &str, start: f64, end: f64, image: Option<&str>) -> Scene {
        Scene {
            text: text.to_string(),
            start_time: start,
            end_time: end,
            image_url: image.map(str::to_string),
        }
    }

    #[test]
    fn reference_scenario_emits_expected_frame_total() {
        // 2s + 3s scenes at 25 fps with a 0.5s dissolve: 50 + 13 + 75.
        let mut compositor = test_compositor();
        let scenes = vec![
            scene("first", 0.0, 2.0, Some("a.png")),
            scene("second", 2.0, 5.0, Some("b.png")),
        ];

        let mut sink = MemorySink::new();
        let mut images = SolidImages;
        let mut audio = NullMonitor;
        let mut pacer = NoopPacer;
        let mut env = ComposeEnv {
            images: &mut images,
            probe: &AlwaysProbe,
            sink: &mut sink,
            audio: &mut audio,
            pacer: &mut pacer,
        };

        let artifact = compositor.compose(&scenes, None, &mut env).unwrap();
        assert_eq!(sink.frames.len(), 50 + 13 + 75);
        assert!(sink.finished);
        assert_eq!(artifact.container, "webm");
    }

    #[test]
    fn empty_input_fails_without_touching_the_sink() {
        let mut compositor = test_compositor();
        let mut sink = MemorySink::new();
        let mut images = SolidImages;
        let mut audio = NullMonitor;
        let mut pacer = NoopPacer;
        let mut env = ComposeEnv {
            images: &mut images,
            probe: &AlwaysProbe,
            sink: &mut sink,
            audio: &mut audio,
            pacer: &mut pacer,
        };

        let err = compositor.compose(&[], None, &mut env).unwrap_err();
        assert!(matches!(err, ReelError::EmptyInput));
        assert!(sink.config().is_none());
        assert!(sink.frames.is_empty());
    }

    #[test]
    fn unsupported_codec_fails_before_any_frame() {
        let mut compositor = test_compositor();
        let scenes = vec![scene("only", 0.0, 1.0, None)];
        let mut sink = MemorySink::new();
        let mut images = SolidImages;
        let mut audio = NullMonitor;
        let mut pacer = NoopPacer;
        let mut env = ComposeEnv {
            images: &mut images,
            probe: &NeverProbe,
            sink: &mut sink,
            audio: &mut audio,
            pacer: &mut pacer,
        };

        let err = compositor.compose(&scenes, None, &mut env).unwrap_err();
        assert!(matches!(err, ReelError::UnsupportedEncoding(_)));
        assert!(sink.config().is_none(), "sink must never start");
        assert!(sink.frames.is_empty(), "zero frames must be rendered");
    }

    #[test]
    fn image_load_failure_is_absorbed_per_scene() {
        let mut compositor = test_compositor();
        let scenes = vec![scene("no picture", 0.0, 1.0, Some("missing.png"))];
        let mut sink = MemorySink::new();
        let mut images = BrokenImages;
        let mut audio = NullMonitor;
        let mut pacer = NoopPacer;
        let mut env = ComposeEnv {
            images: &mut images,
            probe: &AlwaysProbe,
            sink: &mut sink,
            audio: &mut audio,
            pacer: &mut pacer,
        };

        compositor.compose(&scenes, None, &mut env).unwrap();
        assert_eq!(sink.frames.len(), 25);
    }

    #[test]
    fn single_scene_has_no_transition_frames() {
        let mut compositor = test_compositor();
        let scenes = vec![scene("solo", 0.0, 2.0, None)];
        let mut sink = MemorySink::new();
        let mut images = SolidImages;
        let mut audio = NullMonitor;
        let mut pacer = NoopPacer;
        let mut env = ComposeEnv {
            images: &mut images,
            probe: &AlwaysProbe,
            sink: &mut sink,
            audio: &mut audio,
            pacer: &mut pacer,
        };

        compositor.compose(&scenes, None, &mut env).unwrap();
        assert_eq!(sink.frames.len(), 50);
    }

    #[test]
    fn mid_pass_failure_aborts_sink_and_stops_audio() {
        let mut compositor = test_compositor();
        let scenes = vec![
            scene("a", 0.0, 1.0, None),
            scene("b", 1.0, 2.0, None),
        ];
        let mut sink = FailingSink {
            ok_frames: 10,
            ..FailingSink::default()
        };
        let mut images = SolidImages;
        let mut audio = RecordingMonitor::default();
        let mut pacer = NoopPacer;
        let mut env = ComposeEnv {
            images: &mut images,
            probe: &AlwaysProbe,
            sink: &mut sink,
            audio: &mut audio,
            pacer: &mut pacer,
        };

        let err = compositor
            .compose(&scenes, Some("music.mp3"), &mut env)
            .unwrap_err();
        assert!(matches!(err, ReelError::Encoder(_)));
        assert!(sink.begun);
        assert!(sink.aborted, "partial output must be discarded");
        assert!(!sink.finished);
        assert_eq!(audio.started, 1);
        assert_eq!(audio.stopped, 1, "audio must be stopped on the error path");
    }

    #[test]
    fn audio_monitor_runs_for_successful_passes_too() {
        let mut compositor = test_compositor();
        let scenes = vec![scene("a", 0.0, 0.2, None)];
        let mut sink = MemorySink::new();
        let mut images = SolidImages;
        let mut audio = RecordingMonitor::default();
        let mut pacer = NoopPacer;
        let mut env = ComposeEnv {
            images: &mut images,
            probe: &AlwaysProbe,
            sink: &mut sink,
            audio: &mut audio,
            pacer: &mut pacer,
        };

        compositor
            .compose(&scenes, Some("music.mp3"), &mut env)
            .unwrap();
        assert_eq!(audio.started, 1);
        assert_eq!(audio.stopped, 1);
    }

    #[test]
    fn zero_transition_config_produces_hard_cuts() {
        let mut cfg = CompositorConfig::new("unused.ttf");
        cfg.canvas.width = 64;
        cfg.canvas.height = 36;
        cfg.transition_secs = 0.0;
        let mut compositor =
            Compositor::with_shaper(cfg, Box::new(FixedAdvanceShaper::default())).unwrap();
        let scenes = vec![
            scene("a", 0.0, 1.0, None),
            scene("b", 1.0, 2.0, None),
        ];
        let mut sink = MemorySink::new();
        let mut images = SolidImages;
        let mut audio = NullMonitor;
        let mut pacer = NoopPacer;
        let mut env = ComposeEnv {
            images: &mut images,
            probe: &AlwaysProbe,
            sink: &mut sink,
            audio: &mut audio,
            pacer: &mut pacer,
        };

        compositor.compose(&scenes, None, &mut env).unwrap();
        assert_eq!(sink.frames.len(), 50);
    }
}
