mod backend;
mod constraints;
mod device;
pub(crate) mod ffmpeg;
mod session;

pub use backend::{
    ARTIFACT_MIME_TYPE, CaptureBackend, ChunkSink, CodecProfile, MediaEncoder, MediaStream,
    MediaTrack, TrackKind,
};
pub use constraints::{CaptureConstraints, FacingMode};
pub use device::{CaptureDevice, select_device};
pub use ffmpeg::FfmpegBackend;
pub use session::CaptureSession;
