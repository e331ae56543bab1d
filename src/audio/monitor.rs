use std::process::{Child, Command, Stdio};

use crate::foundation::error::{ReelError, ReelResult};

/// Plays background audio locally while a compose pass runs.
///
/// Monitoring only: the audio is not multiplexed into the artifact. `stop`
/// must be idempotent and leave no playback session behind; the next `start`
/// always begins from the start of the source.
pub trait AudioMonitor {
    /// Start looping playback of `source` at `volume` in `0.0..=1.0`.
    fn start(&mut self, source: &str, volume: f32) -> ReelResult<()>;
    /// Stop playback and release the session. Idempotent.
    fn stop(&mut self);
}

/// Monitor that never plays anything.
#[derive(Debug, Default)]
pub struct NullMonitor;

impl AudioMonitor for NullMonitor {
    fn start(&mut self, _source: &str, _volume: f32) -> ReelResult<()> {
        Ok(())
    }

    fn stop(&mut self) {}
}

/// Monitor backed by the `ffplay` binary from the ffmpeg install.
///
/// Playback loops until stopped; stopping kills and reaps the child process,
/// so nothing keeps playing after the compose pass returns.
#[derive(Debug, Default)]
pub struct FfplayMonitor {
    child: Option<Child>,
}

impl FfplayMonitor {
    /// Create an idle monitor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a playback session is currently live.
    pub fn is_playing(&self) -> bool {
        self.child.is_some()
    }
}

impl AudioMonitor for FfplayMonitor {
    fn start(&mut self, source: &str, volume: f32) -> ReelResult<()> {
        self.stop();

        let volume = (volume.clamp(0.0, 1.0) * 100.0).round() as u32;
        let child = Command::new("ffplay")
            .args([
                "-nodisp",
                "-loglevel",
                "error",
                "-loop",
                "0",
                "-volume",
                &volume.to_string(),
            ])
            .arg(source)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                ReelError::render(format!(
                    "failed to spawn ffplay for background audio '{source}': {e}"
                ))
            })?;

        self.child = Some(child);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for FfplayMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
