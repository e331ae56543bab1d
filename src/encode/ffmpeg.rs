use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use crate::{
    encode::sink::{FrameSink, SinkConfig, VideoArtifact},
    foundation::{
        core::{FrameRgba, flatten_premul_over_bg},
        error::{ReelError, ReelResult},
    },
};

/// Options for [`FfmpegSink`] output.
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Output file path; the extension is replaced by the negotiated
    /// container tag on finalize.
    pub out_path: PathBuf,
    /// Overwrite the output file if it already exists.
    pub overwrite: bool,
    /// Background color used to flatten alpha (straight RGBA8).
    pub bg_rgba: [u8; 4],
}

impl FfmpegSinkOpts {
    /// Options writing to `out_path` with defaults.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
            bg_rgba: [0, 0, 0, 255],
        }
    }
}

/// Sink that spawns the system `ffmpeg` binary and streams raw frames to its
/// stdin while draining the encoded container from its stdout.
///
/// Encoded bytes arrive as chunks on a drain thread, are buffered in arrival
/// order, and are concatenated into the artifact file on `finish`. `abort`
/// kills the encoder and discards everything buffered, so a failed compose
/// pass never leaves a partial artifact behind.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    chunk_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<Vec<u8>>>>>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,

    scratch: Vec<u8>,
    cfg: Option<SinkConfig>,
}

impl FfmpegSink {
    /// Create a sink that will encode into `opts.out_path`.
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            child: None,
            stdin: None,
            chunk_drain: None,
            stderr_drain: None,
            scratch: Vec::new(),
            cfg: None,
        }
    }

    fn artifact_path(&self, container: &str) -> PathBuf {
        self.opts.out_path.with_extension(container)
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> ReelResult<()> {
        if cfg.width == 0 || cfg.height == 0 {
            return Err(ReelError::validation("sink width/height must be non-zero"));
        }
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(ReelError::validation(
                "sink width/height must be even (required for yuv420p output)",
            ));
        }

        let out_path = self.artifact_path(cfg.codec.container);
        ensure_parent_dir(&out_path)?;
        if !self.opts.overwrite && out_path.exists() {
            return Err(ReelError::validation(format!(
                "output file '{}' already exists",
                out_path.display()
            )));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Input: raw straight-alpha RGBA8 frames, flattened before writing.
        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
            "-r",
            &format!("{}/{}", cfg.fps.num, cfg.fps.den),
            "-i",
            "pipe:0",
        ]);
        cmd.args(output_args(&cfg));

        let mut child = cmd.spawn().map_err(|e| {
            ReelError::capture(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ReelError::capture("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| ReelError::capture("failed to open ffmpeg stdout (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ReelError::capture("failed to open ffmpeg stderr (unexpected)"))?;

        // Encoded chunks are buffered in arrival order and concatenated on
        // finalize; emission is fire-and-forget from the frame loop's side.
        let chunk_drain = std::thread::spawn(move || {
            let mut chunks = Vec::new();
            let mut buf = vec![0u8; 64 * 1024];
            loop {
                let n = stdout.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                chunks.push(buf[..n].to_vec());
            }
            Ok(chunks)
        });
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        self.scratch = vec![0u8; (cfg.width * cfg.height * 4) as usize];
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.chunk_drain = Some(chunk_drain);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg);
        Ok(())
    }

    fn push_frame(&mut self, frame: &FrameRgba) -> ReelResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| ReelError::encoder("ffmpeg sink not started"))?;

        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(ReelError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        if frame.data.len() != self.scratch.len() {
            return Err(ReelError::validation(
                "frame.data size mismatch with width*height*4",
            ));
        }

        if frame.premultiplied {
            flatten_premul_over_bg(&mut self.scratch, &frame.data, self.opts.bg_rgba)?;
        } else {
            self.scratch.copy_from_slice(&frame.data);
        }

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(ReelError::encoder("ffmpeg sink is already finalized"));
        };
        stdin
            .write_all(&self.scratch)
            .map_err(|e| ReelError::encoder(format!("failed to write frame to ffmpeg stdin: {e}")))
    }

    fn finish(&mut self) -> ReelResult<VideoArtifact> {
        let cfg = self
            .cfg
            .take()
            .ok_or_else(|| ReelError::encoder("ffmpeg sink not started"))?;
        drop(self.stdin.take());

        let mut child = self
            .child
            .take()
            .ok_or_else(|| ReelError::encoder("ffmpeg sink not started"))?;
        let status = child
            .wait()
            .map_err(|e| ReelError::encoder(format!("failed to wait for ffmpeg to finish: {e}")))?;

        let chunks = match self.chunk_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| ReelError::encoder("ffmpeg stdout drain thread panicked"))?
                .map_err(|e| ReelError::encoder(format!("ffmpeg stdout read failed: {e}")))?,
            None => Vec::new(),
        };
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| ReelError::encoder("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| ReelError::encoder(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(ReelError::encoder(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }

        let out_path = self.artifact_path(cfg.codec.container);
        let len_bytes = chunks.iter().map(|c| c.len() as u64).sum();
        let mut file = std::fs::File::create(&out_path).map_err(|e| {
            ReelError::encoder(format!("create artifact '{}': {e}", out_path.display()))
        })?;
        for chunk in &chunks {
            file.write_all(chunk).map_err(|e| {
                ReelError::encoder(format!("write artifact '{}': {e}", out_path.display()))
            })?;
        }

        Ok(VideoArtifact {
            container: cfg.codec.container,
            path: out_path,
            len_bytes,
        })
    }

    fn abort(&mut self) {
        self.cfg = None;
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(handle) = self.chunk_drain.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.stderr_drain.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        // A dropped live session must not leave the encoder running.
        if self.child.is_some() {
            self.abort();
        }
    }
}

fn output_args(cfg: &SinkConfig) -> Vec<String> {
    let mut args: Vec<String> = vec!["-an".to_string()];
    if let Some(codec) = cfg.codec.video_codec {
        args.push("-c:v".to_string());
        args.push(codec.to_string());
    }
    args.push("-pix_fmt".to_string());
    args.push("yuv420p".to_string());
    if cfg.codec.container == "mp4" {
        // MP4 cannot be written to a non-seekable pipe without fragmenting.
        args.push("-movflags".to_string());
        args.push("+frag_keyframe+empty_moov".to_string());
    }
    args.push("-f".to_string());
    args.push(cfg.codec.container.to_string());
    args.push("pipe:1".to_string());
    args
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> ReelResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}
