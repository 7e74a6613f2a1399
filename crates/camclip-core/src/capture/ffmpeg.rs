//! Capture backend driving an `ffmpeg` child process.
//!
//! Linux reads cameras through V4L2 (enumerated from sysfs) and the
//! microphone through PulseAudio. macOS uses AVFoundation. The child writes
//! WebM to stdout; a pump task buffers it and flushes one chunk per timeslice.

use crate::{
    CaptureError,
    capture::{
        CaptureBackend, CaptureConstraints, CaptureDevice, ChunkSink, CodecProfile, MediaEncoder,
        MediaStream, MediaTrack, TrackKind,
    },
};

use std::{
    io,
    panic::Location,
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use async_trait::async_trait;
use error_location::ErrorLocation;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    process::{Child, ChildStderr, ChildStdout, Command},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tracing::{debug, info, instrument, warn};

const SYSFS_VIDEO4LINUX: &str = "/sys/class/video4linux";
const DEFAULT_V4L2_DEVICE: &str = "/dev/video0";
const DEFAULT_AVFOUNDATION_DEVICE: &str = "0";
const VP9_ENCODER: &str = "libvpx-vp9";
const READ_BUFFER_SIZE: usize = 64 * 1024;
/// How long ffmpeg gets to finalise the container after `q`.
const STOP_GRACE: Duration = Duration::from_secs(5);
/// ffmpeg must survive this long after spawn to count as started.
const STARTUP_CHECK: Duration = Duration::from_millis(300);
const EBUSY: i32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Platform {
    Linux,
    MacOs,
    Unsupported,
}

impl Platform {
    fn current() -> Self {
        match std::env::consts::OS {
            "linux" => Platform::Linux,
            "macos" => Platform::MacOs,
            _ => Platform::Unsupported,
        }
    }
}

/// [`CaptureBackend`] built on the `ffmpeg` command-line tool.
pub struct FfmpegBackend {
    binary: PathBuf,
    platform: Platform,
    sysfs_root: PathBuf,
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegBackend {
    /// Backend using `ffmpeg` from `PATH`.
    pub fn new() -> Self {
        Self::with_binary("ffmpeg")
    }

    /// Backend using a specific ffmpeg executable.
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            platform: Platform::current(),
            sysfs_root: PathBuf::from(SYSFS_VIDEO4LINUX),
        }
    }

    #[track_caller]
    fn unsupported(&self) -> CaptureError {
        CaptureError::UnsupportedEnvironment {
            reason: format!("no camera capture support for {}", std::env::consts::OS),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    async fn available_encoders(&self) -> Result<String, CaptureError> {
        let output = Command::new(&self.binary)
            .args(["-hide_banner", "-encoders"])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| spawn_error(&self.binary, e))?;

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn list_avfoundation_devices(&self) -> Result<Vec<CaptureDevice>, CaptureError> {
        // Always exits non-zero; the listing is on stderr.
        let output = Command::new(&self.binary)
            .args([
                "-hide_banner",
                "-f",
                "avfoundation",
                "-list_devices",
                "true",
                "-i",
                "",
            ])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| spawn_error(&self.binary, e))?;

        Ok(parse_avfoundation_devices(&String::from_utf8_lossy(
            &output.stderr,
        )))
    }

    fn input_args(&self, constraints: &CaptureConstraints) -> Result<Vec<String>, CaptureError> {
        match self.platform {
            Platform::Linux => {
                let node = constraints
                    .device_id
                    .clone()
                    .unwrap_or_else(|| DEFAULT_V4L2_DEVICE.to_string());
                probe_device_node(Path::new(&node))?;

                let mut args = vec!["-f".into(), "v4l2".into(), "-i".into(), node];
                if constraints.audio {
                    args.extend(["-f".into(), "pulse".into(), "-i".into(), "default".into()]);
                }
                Ok(args)
            }
            Platform::MacOs => {
                let video = constraints
                    .device_id
                    .clone()
                    .unwrap_or_else(|| DEFAULT_AVFOUNDATION_DEVICE.to_string());
                let audio = if constraints.audio { "0" } else { "none" };
                Ok(vec![
                    "-f".into(),
                    "avfoundation".into(),
                    "-framerate".into(),
                    "30".into(),
                    "-i".into(),
                    format!("{}:{}", video, audio),
                ])
            }
            Platform::Unsupported => Err(self.unsupported()),
        }
    }
}

#[async_trait]
impl CaptureBackend for FfmpegBackend {
    #[instrument(skip(self))]
    async fn enumerate_devices(&self) -> Result<Vec<CaptureDevice>, CaptureError> {
        let devices = match self.platform {
            Platform::Linux => enumerate_v4l2(&self.sysfs_root)?,
            Platform::MacOs => self.list_avfoundation_devices().await?,
            Platform::Unsupported => return Err(self.unsupported()),
        };

        debug!(count = devices.len(), "Enumerated capture devices");

        Ok(devices)
    }

    #[instrument(skip(self))]
    async fn open_stream(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn MediaStream>, CaptureError> {
        if self.platform == Platform::Unsupported {
            return Err(self.unsupported());
        }

        let encoders = self.available_encoders().await?;
        let input_args = self.input_args(constraints)?;

        let video_label = constraints
            .device_id
            .clone()
            .unwrap_or_else(|| "default camera".to_string());
        let mut tracks = vec![MediaTrack {
            kind: TrackKind::Video,
            label: video_label,
            live: true,
        }];
        if constraints.audio {
            tracks.push(MediaTrack {
                kind: TrackKind::Audio,
                label: "default microphone".to_string(),
                live: true,
            });
        }

        Ok(Box::new(FfmpegStream {
            binary: self.binary.clone(),
            input_args,
            constraints: constraints.clone(),
            vp9_available: encoders.contains(VP9_ENCODER),
            tracks,
        }))
    }
}

struct FfmpegStream {
    binary: PathBuf,
    input_args: Vec<String>,
    constraints: CaptureConstraints,
    vp9_available: bool,
    tracks: Vec<MediaTrack>,
}

impl MediaStream for FfmpegStream {
    fn tracks(&self) -> Vec<MediaTrack> {
        self.tracks.clone()
    }

    #[track_caller]
    fn create_encoder(
        &mut self,
        profile: CodecProfile,
    ) -> Result<Box<dyn MediaEncoder>, CaptureError> {
        if self.tracks.iter().all(|t| !t.live) {
            return Err(CaptureError::UnknownCaptureError {
                reason: "stream already stopped".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if profile == CodecProfile::Vp9 && !self.vp9_available {
            return Err(CaptureError::UnknownCaptureError {
                reason: format!("{} encoder not available in this ffmpeg build", VP9_ENCODER),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(Box::new(FfmpegEncoder {
            binary: self.binary.clone(),
            args: encoder_args(&self.input_args, &self.constraints, profile),
            profile,
            child: None,
            pump: None,
            stderr: None,
        }))
    }

    fn stop(&mut self) {
        for track in &mut self.tracks {
            track.live = false;
        }
    }
}

pub(crate) struct FfmpegEncoder {
    binary: PathBuf,
    args: Vec<String>,
    profile: CodecProfile,
    child: Option<Child>,
    pump: Option<JoinHandle<()>>,
    stderr: Option<JoinHandle<String>>,
}

#[async_trait]
impl MediaEncoder for FfmpegEncoder {
    fn profile(&self) -> CodecProfile {
        self.profile
    }

    async fn start(&mut self, timeslice: Duration, sink: ChunkSink) -> Result<(), CaptureError> {
        if self.child.is_some() {
            return Err(CaptureError::UnknownCaptureError {
                reason: "encoder already started".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let mut child = Command::new(&self.binary)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(&self.binary, e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CaptureError::UnknownCaptureError {
                reason: "failed to capture encoder output".to_string(),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let stderr = child.stderr.take().map(|s| tokio::spawn(collect_stderr(s)));
        let pump = tokio::spawn(pump_chunks(stdout, timeslice, sink));

        // Missing devices and audio servers make ffmpeg exit right away.
        tokio::time::sleep(STARTUP_CHECK).await;
        match child.try_wait() {
            Ok(Some(status)) => {
                let _ = pump.await;
                let stderr = match stderr {
                    Some(handle) => handle.await.unwrap_or_default(),
                    None => String::new(),
                };
                warn!(%status, "Encoder exited during startup");
                return Err(classify_ffmpeg_failure(&stderr));
            }
            Ok(None) => {}
            Err(e) => warn!(error = ?e, "Failed to poll encoder process"),
        }

        self.stderr = stderr;
        self.pump = Some(pump);
        self.child = Some(child);

        info!(codec = self.profile.mime_type(), "Encoder started");

        Ok(())
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        // ffmpeg finalises the container when it reads 'q'.
        if let Some(mut stdin) = child.stdin.take() {
            let _ = stdin.write_all(b"q").await;
        }

        let status = match tokio::time::timeout(STOP_GRACE, child.wait()).await {
            Ok(Ok(status)) => Some(status),
            Ok(Err(e)) => {
                warn!(error = ?e, "Failed to wait for encoder");
                None
            }
            Err(_) => {
                warn!("Encoder did not exit in time, killing");
                let _ = child.kill().await;
                None
            }
        };

        if let Some(pump) = self.pump.take() {
            let _ = pump.await;
        }

        let stderr = match self.stderr.take() {
            Some(handle) => handle.await.unwrap_or_default(),
            None => String::new(),
        };

        match status {
            Some(status) if !status.success() => Err(classify_ffmpeg_failure(&stderr)),
            _ => {
                info!("Encoder stopped");
                Ok(())
            }
        }
    }

    fn is_active(&self) -> bool {
        self.child.is_some()
    }
}

async fn pump_chunks(mut stdout: ChildStdout, timeslice: Duration, sink: ChunkSink) {
    let mut pending = Vec::new();
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    let mut flush = tokio::time::interval(timeslice);
    flush.set_missed_tick_behavior(MissedTickBehavior::Delay);
    flush.tick().await;

    loop {
        tokio::select! {
            read = stdout.read(&mut buf) => match read {
                Ok(0) => break,
                Ok(n) => pending.extend_from_slice(&buf[..n]),
                Err(e) => {
                    warn!(error = ?e, "Encoder output read failed");
                    break;
                }
            },
            _ = flush.tick() => {
                if !pending.is_empty() && sink.send(std::mem::take(&mut pending)).is_err() {
                    break;
                }
            }
        }
    }

    if !pending.is_empty() {
        let _ = sink.send(pending);
    }
}

async fn collect_stderr(mut stderr: ChildStderr) -> String {
    let mut text = String::new();
    let _ = stderr.read_to_string(&mut text).await;
    text
}

fn encoder_args(
    input: &[String],
    constraints: &CaptureConstraints,
    profile: CodecProfile,
) -> Vec<String> {
    let mut args: Vec<String> = ["-hide_banner", "-loglevel", "error", "-nostats"]
        .into_iter()
        .map(String::from)
        .collect();

    args.extend(input.iter().cloned());
    args.extend([
        "-vf".to_string(),
        format!(
            "scale={}:{}",
            constraints.ideal.width, constraints.ideal.height
        ),
        "-b:v".to_string(),
        constraints.bitrate_bps.to_string(),
    ]);

    if profile == CodecProfile::Vp9 {
        args.extend(
            ["-c:v", VP9_ENCODER, "-deadline", "realtime", "-cpu-used", "8"]
                .into_iter()
                .map(String::from),
        );
    }

    args.extend(["-f", "webm", "pipe:1"].into_iter().map(String::from));
    args
}

/// List V4L2 capture nodes from sysfs. Metadata nodes (index != 0) are skipped.
fn enumerate_v4l2(sysfs_root: &Path) -> Result<Vec<CaptureDevice>, CaptureError> {
    let entries = std::fs::read_dir(sysfs_root).map_err(|e| CaptureError::UnsupportedEnvironment {
        reason: format!("cannot read {}: {}", sysfs_root.display(), e),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let mut devices = Vec::new();
    for entry in entries.flatten() {
        let node = entry.file_name().to_string_lossy().into_owned();
        if !node.starts_with("video") {
            continue;
        }

        let index = std::fs::read_to_string(entry.path().join("index")).unwrap_or_default();
        if !index.trim().is_empty() && index.trim() != "0" {
            continue;
        }

        let name = std::fs::read_to_string(entry.path().join("name"))
            .map(|n| n.trim().to_string())
            .unwrap_or_else(|_| node.clone());

        devices.push(CaptureDevice::new(format!("/dev/{}", node), name));
    }

    devices.sort_by(|a, b| natural_node_order(&a.id).cmp(&natural_node_order(&b.id)));

    Ok(devices)
}

fn natural_node_order(id: &str) -> (usize, String) {
    let digits: String = id.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    let number = digits.chars().rev().collect::<String>().parse().unwrap_or(usize::MAX);
    (number, id.to_string())
}

pub(crate) fn parse_avfoundation_devices(listing: &str) -> Vec<CaptureDevice> {
    let mut in_video_section = false;
    let mut devices = Vec::new();

    for line in listing.lines() {
        if line.contains("AVFoundation video devices") {
            in_video_section = true;
            continue;
        }
        if line.contains("AVFoundation audio devices") {
            break;
        }
        if !in_video_section {
            continue;
        }

        let Some((_, rest)) = line.split_once("] [") else {
            continue;
        };
        let Some((index, name)) = rest.split_once("] ") else {
            continue;
        };
        if index.parse::<u32>().is_err() || name.starts_with("Capture screen") {
            continue;
        }

        devices.push(CaptureDevice::new(index, name.trim()));
    }

    devices
}

#[track_caller]
fn probe_device_node(path: &Path) -> Result<(), CaptureError> {
    std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map(drop)
        .map_err(|e| map_open_error(path, e))
}

#[track_caller]
pub(crate) fn map_open_error(path: &Path, e: io::Error) -> CaptureError {
    let location = ErrorLocation::from(Location::caller());
    let reason = format!("{}: {}", path.display(), e);

    match e.kind() {
        io::ErrorKind::PermissionDenied => CaptureError::PermissionDenied { reason, location },
        io::ErrorKind::NotFound => CaptureError::DeviceNotFound { reason, location },
        _ if e.raw_os_error() == Some(EBUSY) => CaptureError::DeviceBusy { reason, location },
        _ => CaptureError::UnknownCaptureError { reason, location },
    }
}

#[track_caller]
fn spawn_error(binary: &Path, e: io::Error) -> CaptureError {
    let location = ErrorLocation::from(Location::caller());

    if e.kind() == io::ErrorKind::NotFound {
        CaptureError::UnsupportedEnvironment {
            reason: format!("{} not found", binary.display()),
            location,
        }
    } else {
        CaptureError::UnknownCaptureError {
            reason: format!("failed to run {}: {}", binary.display(), e),
            location,
        }
    }
}

/// Map ffmpeg's error output onto the capture taxonomy.
#[track_caller]
pub(crate) fn classify_ffmpeg_failure(stderr: &str) -> CaptureError {
    let location = ErrorLocation::from(Location::caller());
    let lower = stderr.to_lowercase();
    let reason = stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("ffmpeg exited with an error")
        .to_string();

    if lower.contains("permission denied")
        || lower.contains("not authorized")
        || lower.contains("operation not permitted")
    {
        CaptureError::PermissionDenied { reason, location }
    } else if lower.contains("device or resource busy") {
        CaptureError::DeviceBusy { reason, location }
    } else if lower.contains("no such file or directory") || lower.contains("no such device") {
        CaptureError::DeviceNotFound { reason, location }
    } else {
        CaptureError::UnknownCaptureError { reason, location }
    }
}

#[cfg(test)]
impl FfmpegEncoder {
    pub(crate) fn with_command(binary: impl Into<PathBuf>, args: &[&str]) -> Self {
        Self {
            binary: binary.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
            profile: CodecProfile::PlatformDefault,
            child: None,
            pump: None,
            stderr: None,
        }
    }
}

#[cfg(test)]
impl FfmpegBackend {
    pub(crate) fn with_sysfs_root(root: impl Into<PathBuf>) -> Self {
        Self {
            binary: PathBuf::from("ffmpeg"),
            platform: Platform::Linux,
            sysfs_root: root.into(),
        }
    }
}
