// Frame-addressable video input.
// Visual expectation: `read_frame()` hands back the frame at the cursor as a
// display-sized 0x00RRGGBB buffer, then moves the cursor on by one.

use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::OnceLock;

use image::RgbImage;
use serde::Deserialize;

use crate::error::{ViewerError, ViewerResult};
use crate::types::FrameBuffer;

/// Snapshot of an open stream.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoInfo {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    /// 0.0 when the container does not report a rate.
    pub fps: f64,
    pub total_frames: u64,
    /// Seconds; 0.0 when `fps` is unknown.
    pub duration: f64,
}

impl VideoInfo {
    pub fn new(path: impl Into<PathBuf>, width: u32, height: u32, fps: f64, total_frames: u64) -> Self {
        let duration = if fps > 0.0 {
            total_frames as f64 / fps
        } else {
            0.0
        };
        Self {
            path: path.into(),
            width,
            height,
            fps,
            total_frames,
            duration,
        }
    }

    /// "3m 7.52s"
    pub fn duration_label(&self) -> String {
        let minutes = (self.duration / 60.0).floor();
        let seconds = self.duration - minutes * 60.0;
        format!("{}m {:.2}s", minutes as u64, seconds)
    }
}

/// A decodable stream with a cursor. The cursor is the index of the *next*
/// frame `read_frame` will return.
pub trait VideoSource {
    fn info(&self) -> &VideoInfo;
    fn position(&self) -> u64;
    fn set_position(&mut self, frame: u64);
    /// Decode the frame at the cursor and advance the cursor by one.
    fn read_frame(&mut self) -> ViewerResult<FrameBuffer>;
}

/// Check if ffmpeg/ffprobe are on PATH. Cached per process.
pub fn ffmpeg_available() -> bool {
    static AVAILABLE: OnceLock<bool> = OnceLock::new();
    *AVAILABLE.get_or_init(|| {
        ["ffmpeg", "ffprobe"].iter().all(|tool| {
            Command::new(tool)
                .arg("-version")
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map(|s| s.success())
                .unwrap_or(false)
        })
    })
}

/* ---------------------------- ffprobe metadata ---------------------------- */

#[derive(Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(Deserialize)]
struct ProbeOut {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

fn parse_ff_ratio(s: &str) -> Option<f64> {
    let (num, den) = s.split_once('/')?;
    let num = num.trim().parse::<f64>().ok()?;
    let den = den.trim().parse::<f64>().ok()?;
    if den <= 0.0 || num <= 0.0 {
        return None;
    }
    Some(num / den)
}

fn parse_probe(path: &Path, json: &[u8]) -> ViewerResult<VideoInfo> {
    let parsed: ProbeOut = serde_json::from_slice(json)
        .map_err(|e| ViewerError::video_open(path, format!("ffprobe json parse failed: {e}")))?;
    let stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| ViewerError::video_open(path, "no video stream found"))?;
    let width = stream
        .width
        .ok_or_else(|| ViewerError::video_open(path, "missing video width"))?;
    let height = stream
        .height
        .ok_or_else(|| ViewerError::video_open(path, "missing video height"))?;

    let fps = stream
        .r_frame_rate
        .as_deref()
        .and_then(parse_ff_ratio)
        .or_else(|| stream.avg_frame_rate.as_deref().and_then(parse_ff_ratio))
        .unwrap_or(0.0);

    let duration = stream
        .duration
        .as_deref()
        .or_else(|| parsed.format.as_ref().and_then(|f| f.duration.as_deref()))
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);

    let total_frames = stream
        .nb_frames
        .as_deref()
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or_else(|| (duration * fps).round().max(0.0) as u64);

    Ok(VideoInfo::new(path, width, height, fps, total_frames))
}

/* ---------------------------- ffmpeg decoding ----------------------------- */

/// A running `ffmpeg` that streams raw frames; killed and reaped on drop.
struct DecodeStream {
    child: Child,
    stdout: BufReader<ChildStdout>,
    next: u64,
}

impl Drop for DecodeStream {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Decodes through the system `ffmpeg`, scaled to the display size.
/// Sequential reads share one pipe; any other seek restarts the decoder.
/// The last decoded frame is kept, so re-reading it after a settle is free.
pub struct FfmpegSource {
    info: VideoInfo,
    out_width: u32,
    out_height: u32,
    position: u64,
    stream: Option<DecodeStream>,
    last: Option<(u64, FrameBuffer)>,
    decoder_starts: u32,
}

impl FfmpegSource {
    pub fn open(path: &Path, out_size: (u32, u32)) -> ViewerResult<Self> {
        if !path.is_file() {
            return Err(ViewerError::video_open(path, "file does not exist"));
        }
        let out = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-print_format",
                "json",
                "-show_streams",
                "-show_format",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ViewerError::video_open(path, format!("failed to run ffprobe: {e}")))?;
        if !out.status.success() {
            return Err(ViewerError::video_open(
                path,
                format!("ffprobe failed: {}", String::from_utf8_lossy(&out.stderr).trim()),
            ));
        }
        let info = parse_probe(path, &out.stdout)?;
        let (out_width, out_height) = out_size;
        if out_width == 0 || out_height == 0 {
            return Err(ViewerError::config("decode size must be positive"));
        }
        tracing::info!(
            path = %path.display(),
            width = info.width,
            height = info.height,
            fps = info.fps,
            frames = info.total_frames,
            "video opened"
        );
        Ok(Self {
            info,
            out_width,
            out_height,
            position: 0,
            stream: None,
            last: None,
            decoder_starts: 0,
        })
    }

    /// How many times a decoder process has been started.
    pub fn decoder_starts(&self) -> u32 {
        self.decoder_starts
    }

    fn frame_len(&self) -> usize {
        self.out_width as usize * self.out_height as usize * 3
    }

    fn spawn_at(&self, frame: u64) -> ViewerResult<DecodeStream> {
        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-v", "error", "-nostdin"]);
        let seekable = self.info.fps > 0.0;
        if seekable && frame > 0 {
            // half a frame early so float error never skips the target
            let t = ((frame as f64 - 0.5) / self.info.fps).max(0.0);
            cmd.args(["-ss", &format!("{t:.6}")]);
        }
        cmd.arg("-i")
            .arg(&self.info.path)
            .args([
                "-an",
                "-vsync",
                "passthrough",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgb24",
                "-s",
                &format!("{}x{}", self.out_width, self.out_height),
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        let mut child = cmd
            .spawn()
            .map_err(|e| ViewerError::decode(format!("failed to spawn ffmpeg: {e}")))?;
        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ViewerError::decode("ffmpeg has no stdout pipe"));
        };
        let mut stream = DecodeStream {
            child,
            stdout: BufReader::new(stdout),
            next: if seekable { frame } else { 0 },
        };
        tracing::debug!(frame, seekable, "ffmpeg decoder started");

        // No usable rate: decode from the start and drop frames up to the target.
        if stream.next < frame {
            let mut scratch = vec![0u8; self.frame_len()];
            while stream.next < frame {
                stream
                    .stdout
                    .read_exact(&mut scratch)
                    .map_err(|e| ViewerError::decode(format!("stream ended before frame {frame}: {e}")))?;
                stream.next += 1;
            }
        }
        Ok(stream)
    }
}

impl VideoSource for FfmpegSource {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn set_position(&mut self, frame: u64) {
        self.position = frame;
    }

    fn read_frame(&mut self) -> ViewerResult<FrameBuffer> {
        let pos = self.position;
        if let Some((index, frame)) = &self.last {
            if *index == pos {
                let frame = frame.clone();
                self.position = pos + 1;
                return Ok(frame);
            }
        }
        if self.stream.as_ref().is_none_or(|s| s.next != pos) {
            self.stream = None;
            self.stream = Some(self.spawn_at(pos)?);
            self.decoder_starts += 1;
        }
        let mut buf = vec![0u8; self.frame_len()];
        let Some(stream) = self.stream.as_mut() else {
            return Err(ViewerError::decode("decoder not running"));
        };
        if let Err(e) = stream.stdout.read_exact(&mut buf) {
            self.stream = None;
            return Err(ViewerError::decode(format!("no frame at {pos}: {e}")));
        }
        stream.next += 1;
        self.position = pos + 1;

        let img = RgbImage::from_raw(self.out_width, self.out_height, buf)
            .ok_or_else(|| ViewerError::decode("decoded frame has the wrong size"))?;
        let frame = FrameBuffer::from_rgb_image(&img);
        self.last = Some((pos, frame.clone()));
        Ok(frame)
    }
}

/* ----------------------------- test pattern ------------------------------- */

/// Synthetic source: frame `n` has `n` packed into its top-left pixel and a
/// white bar at column `n % width`. Used for `--pattern` and in tests.
#[derive(Clone, Debug)]
pub struct PatternSource {
    info: VideoInfo,
    position: u64,
    frames: u64,
    fail_from: Option<u64>,
}

impl PatternSource {
    pub const BACKGROUND: u32 = 0x00_20_20_28;
    pub const BAR: u32 = 0x00_FF_FF_FF;

    pub fn new(total_frames: u64, width: u32, height: u32) -> Self {
        Self {
            info: VideoInfo::new(
                format!("pattern:{total_frames}"),
                width,
                height,
                25.0,
                total_frames,
            ),
            position: 0,
            frames: total_frames,
            fail_from: None,
        }
    }

    /// Reports a frame count of 0, like a container without one, but still
    /// decodes every frame.
    pub fn without_frame_count(mut self) -> Self {
        self.info.total_frames = 0;
        self.info.duration = 0.0;
        self
    }

    /// Every read at or past `frame` fails, like a truncated file.
    pub fn failing_from(mut self, frame: u64) -> Self {
        self.fail_from = Some(frame);
        self
    }

    pub fn frame(&self, index: u64) -> FrameBuffer {
        let w = self.info.width as usize;
        let h = self.info.height as usize;
        let mut fb = FrameBuffer::filled(w, h, Self::BACKGROUND);
        if w > 0 {
            let bar = (index % w as u64) as usize;
            for y in 0..h {
                fb.pixels[y * w + bar] = Self::BAR;
            }
        }
        if let Some(first) = fb.pixels.first_mut() {
            *first = (index & 0x00FF_FFFF) as u32;
        }
        fb
    }

    /// Recover the frame index a pattern frame was drawn for.
    pub fn index_of(fb: &FrameBuffer) -> Option<u64> {
        fb.pixels.first().map(|p| u64::from(*p))
    }
}

impl VideoSource for PatternSource {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn set_position(&mut self, frame: u64) {
        self.position = frame;
    }

    fn read_frame(&mut self) -> ViewerResult<FrameBuffer> {
        let pos = self.position;
        let end = self.fail_from.unwrap_or(u64::MAX).min(self.frames);
        if pos >= end {
            return Err(ViewerError::decode(format!("no frame at {pos}: end of stream")));
        }
        self.position = pos + 1;
        Ok(self.frame(pos))
    }
}
