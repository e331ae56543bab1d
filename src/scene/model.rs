use std::path::PathBuf;

use crate::foundation::{
    core::{Canvas, Fps},
    error::{ReelError, ReelResult},
};

/// One timed caption/image segment of the story.
///
/// Scene data is produced upstream (script generation, TTS timing, image
/// generation) and is read-only during compositing.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Scene {
    /// Caption text rendered over the scene.
    pub text: String,
    /// Scene start in seconds from the start of the video.
    pub start_time: f64,
    /// Scene end in seconds; `end_time > start_time` expected, but shorter or
    /// inverted ranges degrade to a single frame rather than erroring.
    pub end_time: f64,
    /// Optional image reference (path or URL); absent draws the placeholder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Scene {
    /// Scene duration in seconds, clamped to be non-negative.
    pub fn duration_secs(&self) -> f64 {
        (self.end_time - self.start_time).max(0.0)
    }

    fn validate(&self, idx: usize) -> ReelResult<()> {
        if !self.start_time.is_finite() || !self.end_time.is_finite() {
            return Err(ReelError::validation(format!(
                "scene {idx} has non-finite times"
            )));
        }
        if self.start_time < 0.0 || self.end_time < 0.0 {
            return Err(ReelError::validation(format!(
                "scene {idx} has negative times"
            )));
        }
        Ok(())
    }
}

/// A full scene script plus optional background audio, as consumed by the CLI.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct StoryScript {
    /// Ordered scene sequence.
    pub scenes: Vec<Scene>,
    /// Optional background audio source played for local monitoring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_audio: Option<String>,
}

/// Validate an ordered scene sequence ahead of a compose pass.
///
/// Only structurally bad data is rejected; overlapping or zero-length scenes
/// are allowed and degrade to a one-frame minimum downstream.
pub fn validate_scenes(scenes: &[Scene]) -> ReelResult<()> {
    if scenes.is_empty() {
        return Err(ReelError::EmptyInput);
    }
    for (idx, scene) in scenes.iter().enumerate() {
        scene.validate(idx)?;
    }
    Ok(())
}

/// Compositor settings: surface, timing, caption styling and palette.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct CompositorConfig {
    /// Output surface size.
    pub canvas: Canvas,
    /// Output frame rate.
    pub fps: Fps,
    /// Cross-dissolve duration between adjacent scenes, in seconds.
    pub transition_secs: f64,
    /// Caption font file (TTF/OTF) registered at session start.
    pub font_source: PathBuf,
    /// Caption font size in pixels.
    pub font_size: f32,
    /// Distance from the caption block's bottom edge to the surface bottom.
    pub margin_bottom: f32,
    /// Caption padding; the wrap width is `canvas.width - 4 * padding`.
    pub padding: f32,
    /// Opaque background fill (straight RGBA; alpha forced opaque on paint).
    pub background_rgba: [u8; 4],
    /// Caption text color.
    pub caption_rgba: [u8; 4],
    /// Translucent backing box behind each caption line.
    pub caption_box_rgba: [u8; 4],
    /// Translucent placeholder rectangle for scenes without an image.
    pub placeholder_rgba: [u8; 4],
    /// Background-audio monitor volume in `0.0..=1.0`.
    pub monitor_volume: f32,
}

impl CompositorConfig {
    /// Default settings over the given caption font.
    pub fn new(font_source: impl Into<PathBuf>) -> Self {
        Self {
            canvas: Canvas {
                width: 1280,
                height: 720,
            },
            fps: Fps { num: 25, den: 1 },
            transition_secs: 0.5,
            font_source: font_source.into(),
            font_size: 32.0,
            margin_bottom: 70.0,
            padding: 10.0,
            background_rgba: [0, 0, 0, 255],
            caption_rgba: [240, 240, 240, 255],
            caption_box_rgba: [0, 0, 0, 160],
            placeholder_rgba: [70, 70, 80, 150],
            monitor_volume: 0.5,
        }
    }

    /// Maximum caption line width in pixels.
    pub fn wrap_width(&self) -> f32 {
        (self.canvas.width as f32 - 4.0 * self.padding).max(1.0)
    }

    /// Caption line height in pixels.
    pub fn line_height(&self) -> f32 {
        1.2 * self.font_size
    }

    /// Reject configurations the pipeline cannot honor.
    pub fn validate(&self) -> ReelResult<()> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(ReelError::validation("canvas width/height must be > 0"));
        }
        if !self.canvas.width.is_multiple_of(2) || !self.canvas.height.is_multiple_of(2) {
            // yuv420p output requires even dimensions.
            return Err(ReelError::validation("canvas width/height must be even"));
        }
        if self.canvas.width > u32::from(u16::MAX) || self.canvas.height > u32::from(u16::MAX) {
            return Err(ReelError::validation("canvas dimensions exceed u16"));
        }
        Fps::new(self.fps.num, self.fps.den)?;
        if !self.transition_secs.is_finite() || self.transition_secs < 0.0 {
            return Err(ReelError::validation(
                "transition_secs must be finite and >= 0",
            ));
        }
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(ReelError::validation("font_size must be finite and > 0"));
        }
        if !self.margin_bottom.is_finite() || self.margin_bottom < 0.0 {
            return Err(ReelError::validation("margin_bottom must be >= 0"));
        }
        if !self.padding.is_finite() || self.padding < 0.0 {
            return Err(ReelError::validation("padding must be >= 0"));
        }
        if !self.monitor_volume.is_finite() || !(0.0..=1.0).contains(&self.monitor_volume) {
            return Err(ReelError::validation("monitor_volume must be in 0.0..=1.0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(start: f64, end: f64) -> Scene {
        Scene {
            text: "hello".to_string(),
            start_time: start,
            end_time: end,
            image_url: None,
        }
    }

    #[test]
    fn empty_scene_list_is_rejected() {
        assert!(matches!(validate_scenes(&[]), Err(ReelError::EmptyInput)));
    }

    #[test]
    fn zero_length_and_overlapping_scenes_pass_validation() {
        let scenes = vec![scene(0.0, 0.0), scene(1.0, 0.5)];
        assert!(validate_scenes(&scenes).is_ok());
    }

    #[test]
    fn negative_or_nan_times_are_rejected() {
        assert!(validate_scenes(&[scene(-1.0, 2.0)]).is_err());
        assert!(validate_scenes(&[scene(0.0, f64::NAN)]).is_err());
    }

    #[test]
    fn script_json_roundtrip() {
        let script = StoryScript {
            scenes: vec![Scene {
                text: "once upon a time".to_string(),
                start_time: 0.0,
                end_time: 2.5,
                image_url: Some("scenes/001.png".to_string()),
            }],
            background_audio: Some("music/loop.mp3".to_string()),
        };
        let s = serde_json::to_string_pretty(&script).unwrap();
        let de: StoryScript = serde_json::from_str(&s).unwrap();
        assert_eq!(de.scenes.len(), 1);
        assert_eq!(de.scenes[0].image_url.as_deref(), Some("scenes/001.png"));
        assert_eq!(de.background_audio.as_deref(), Some("music/loop.mp3"));
    }

    #[test]
    fn image_url_is_optional_in_json() {
        let de: Scene =
            serde_json::from_str(r#"{"text":"t","start_time":0.0,"end_time":1.0}"#).unwrap();
        assert!(de.image_url.is_none());
    }

    #[test]
    fn config_validation_catches_bad_values() {
        let mut cfg = CompositorConfig::new("fonts/caption.ttf");
        assert!(cfg.validate().is_ok());

        cfg.canvas.width = 1281;
        assert!(cfg.validate().is_err());

        cfg.canvas.width = 1280;
        cfg.font_size = 0.0;
        assert!(cfg.validate().is_err());

        cfg.font_size = 32.0;
        cfg.monitor_volume = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn wrap_width_accounts_for_padding() {
        let cfg = CompositorConfig::new("fonts/caption.ttf");
        assert_eq!(cfg.wrap_width(), 1280.0 - 40.0);
        assert_eq!(cfg.line_height(), 38.4);
    }
}
