use std::process::{Command, Stdio};
use std::sync::OnceLock;

use crate::foundation::error::{ReelError, ReelResult};

/// One candidate container/codec pairing for the output artifact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CodecSpec {
    /// Container format tag, also the artifact file extension.
    pub container: &'static str,
    /// ffmpeg video encoder name; `None` lets the container pick its default.
    pub video_codec: Option<&'static str>,
    /// Audio encoder the pairing would use. The captured stream is video-only
    /// today, but the pairing is probed as a unit so a future audio track
    /// does not change the negotiation result.
    pub audio_codec: Option<&'static str>,
}

impl CodecSpec {
    /// Human-readable label, e.g. `webm (libvpx-vp9 + libopus)`.
    pub fn label(&self) -> String {
        match (self.video_codec, self.audio_codec) {
            (Some(v), Some(a)) => format!("{} ({v} + {a})", self.container),
            (Some(v), None) => format!("{} ({v})", self.container),
            _ => format!("{} (default codecs)", self.container),
        }
    }
}

/// Preference-ordered candidates, modern and efficient first, ending with a
/// generic container with unspecified codecs.
pub const CODEC_PREFERENCES: &[CodecSpec] = &[
    CodecSpec {
        container: "webm",
        video_codec: Some("libvpx-vp9"),
        audio_codec: Some("libopus"),
    },
    CodecSpec {
        container: "webm",
        video_codec: Some("libvpx"),
        audio_codec: Some("libopus"),
    },
    CodecSpec {
        container: "mp4",
        video_codec: Some("libx264"),
        audio_codec: Some("aac"),
    },
    CodecSpec {
        container: "webm",
        video_codec: None,
        audio_codec: None,
    },
];

/// Capability probe supplied by the runtime boundary.
///
/// Keeping this a trait keeps negotiation (and everything above it) testable
/// without a real media backend.
pub trait CodecProbe {
    /// Whether the runtime can encode with every codec the candidate names.
    fn supports(&self, spec: &CodecSpec) -> bool;
}

/// Pick the first supported candidate from `CODEC_PREFERENCES`.
pub fn select_codec(probe: &dyn CodecProbe) -> ReelResult<CodecSpec> {
    select_codec_from(probe, CODEC_PREFERENCES)
}

/// Pick the first supported candidate from an explicit preference list.
pub fn select_codec_from(
    probe: &dyn CodecProbe,
    candidates: &[CodecSpec],
) -> ReelResult<CodecSpec> {
    for spec in candidates {
        if probe.supports(spec) {
            return Ok(*spec);
        }
    }
    Err(ReelError::unsupported_encoding(
        "no candidate codec/container pairing is supported by this runtime",
    ))
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Probe backed by the system `ffmpeg` binary.
///
/// The encoder list is read once (`ffmpeg -encoders`) and cached for the
/// process lifetime. When ffmpeg is missing, nothing is supported.
#[derive(Debug, Default)]
pub struct FfmpegProbe;

static ENCODER_LIST: OnceLock<Option<String>> = OnceLock::new();

fn encoder_list() -> Option<&'static str> {
    ENCODER_LIST
        .get_or_init(|| {
            let out = Command::new("ffmpeg")
                .args(["-hide_banner", "-encoders"])
                .stderr(Stdio::null())
                .output()
                .ok()?;
            if !out.status.success() {
                return None;
            }
            Some(String::from_utf8_lossy(&out.stdout).into_owned())
        })
        .as_deref()
}

fn encoder_available(list: &str, name: &str) -> bool {
    // `ffmpeg -encoders` lines look like ` V....D libx264  ...`; match the
    // encoder name as its own column.
    list.lines()
        .any(|line| line.split_whitespace().nth(1) == Some(name))
}

impl CodecProbe for FfmpegProbe {
    fn supports(&self, spec: &CodecSpec) -> bool {
        let Some(list) = encoder_list() else {
            return false;
        };
        for codec in [spec.video_codec, spec.audio_codec].into_iter().flatten() {
            if !encoder_available(list, codec) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ListProbe(&'static [&'static str]);

    impl CodecProbe for ListProbe {
        fn supports(&self, spec: &CodecSpec) -> bool {
            [spec.video_codec, spec.audio_codec]
                .into_iter()
                .flatten()
                .all(|c| self.0.contains(&c))
        }
    }

    #[test]
    fn preference_order_is_respected() {
        let everything = ListProbe(&["libvpx-vp9", "libvpx", "libopus", "libx264", "aac"]);
        let spec = select_codec(&everything).unwrap();
        assert_eq!(spec.video_codec, Some("libvpx-vp9"));
        assert_eq!(spec.container, "webm");
    }

    #[test]
    fn falls_back_past_unsupported_candidates() {
        let h264_only = ListProbe(&["libx264", "aac"]);
        let spec = select_codec(&h264_only).unwrap();
        assert_eq!(spec.container, "mp4");
        assert_eq!(spec.video_codec, Some("libx264"));
    }

    #[test]
    fn codecless_fallback_matches_any_probe_with_a_runtime() {
        // A probe with no named encoders still supports the final candidate,
        // because that candidate names no codecs at all.
        let bare = ListProbe(&[]);
        let spec = select_codec(&bare).unwrap();
        assert_eq!(spec.container, "webm");
        assert_eq!(spec.video_codec, None);
    }

    #[test]
    fn runtime_supporting_nothing_yields_unsupported_encoding() {
        struct Nothing;
        impl CodecProbe for Nothing {
            fn supports(&self, _spec: &CodecSpec) -> bool {
                false
            }
        }
        let err = select_codec_from(&Nothing, CODEC_PREFERENCES).unwrap_err();
        assert!(matches!(
            err,
            crate::foundation::error::ReelError::UnsupportedEncoding(_)
        ));
    }

    #[test]
    fn encoder_column_matching_avoids_substring_hits() {
        let list = " V....D libx264     H.264\n A....D aac     AAC\n";
        assert!(encoder_available(list, "libx264"));
        assert!(encoder_available(list, "aac"));
        assert!(!encoder_available(list, "x264"));
        assert!(!encoder_available(list, "libvpx-vp9"));
    }

    #[test]
    fn labels_are_descriptive() {
        assert_eq!(
            CODEC_PREFERENCES[0].label(),
            "webm (libvpx-vp9 + libopus)"
        );
        assert_eq!(CODEC_PREFERENCES[3].label(), "webm (default codecs)");
    }
}
