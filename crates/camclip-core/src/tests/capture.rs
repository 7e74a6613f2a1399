use crate::{
    CaptureBackend, CaptureConstraints, CaptureDevice, CaptureError, CaptureSession, CodecProfile,
    FacingMode, FfmpegBackend, MediaEncoder, QualityTier,
    capture::ffmpeg::{
        FfmpegEncoder, classify_ffmpeg_failure, map_open_error, parse_avfoundation_devices,
    },
    select_device,
    tests::support::{FakeBackend, FakeFailure},
};

use std::{io, path::Path};

/// WHAT: A physical camera is preferred over a virtual one listed first
/// WHY: Virtual cameras (OBS etc.) usually show a static or empty feed
#[test]
fn given_virtual_camera_first_when_selecting_then_physical_camera_chosen() {
    // Given: A virtual camera followed by a built-in one
    let devices = vec![
        CaptureDevice::new("2", "OBS Virtual Camera"),
        CaptureDevice::new("0", "FaceTime HD Camera"),
    ];

    // When: Selecting without a configured device
    let chosen = select_device(&devices, None);

    // Then: The built-in camera wins
    assert_eq!(chosen.map(|d| d.id.as_str()), Some("0"));
}

/// WHAT: Only virtual cameras falls back to the first enumerated device
/// WHY: Recording with a virtual camera beats not recording at all
#[test]
fn given_only_virtual_cameras_when_selecting_then_first_device_chosen() {
    // Given: Two virtual cameras
    let devices = vec![
        CaptureDevice::new("a", "ManyCam Virtual Webcam"),
        CaptureDevice::new("b", "Snap Camera"),
    ];

    // When: Selecting
    let chosen = select_device(&devices, None);

    // Then: The first one is used
    assert_eq!(chosen.map(|d| d.id.as_str()), Some("a"));
}

/// WHAT: A configured device id wins when it was enumerated
/// WHY: Users pick a camera explicitly in the config file
#[test]
fn given_configured_device_when_selecting_then_configured_device_chosen() {
    // Given: Two physical cameras and a configured id
    let devices = vec![
        CaptureDevice::new("/dev/video0", "Integrated Camera"),
        CaptureDevice::new("/dev/video4", "Logitech C920"),
    ];

    // When: Selecting with the second id configured
    let chosen = select_device(&devices, Some("/dev/video4"));
    let missing = select_device(&devices, Some("/dev/video9"));

    // Then: The configured camera is chosen, unknown ids fall back
    assert_eq!(chosen.map(|d| d.id.as_str()), Some("/dev/video4"));
    assert_eq!(missing.map(|d| d.id.as_str()), Some("/dev/video0"));
}

/// WHAT: Keyword matching respects word boundaries
/// WHY: "obs" must not flag a camera named after a person or brand
#[test]
fn given_names_containing_keyword_fragments_when_checking_then_only_whole_words_match() {
    // Given/When/Then: Fragments inside words do not match
    assert!(!CaptureDevice::new("0", "Jacobs Webcam").is_virtual());
    assert!(CaptureDevice::new("1", "OBS Virtual Camera").is_virtual());
    assert!(CaptureDevice::new("2", "Dummy video device (0x0000)").is_virtual());
    assert!(select_device(&[], None).is_none());
}

/// WHAT: Constraints follow the tier table and face the user
/// WHY: The capture request is derived once per session from the tier
#[test]
fn given_high_tier_when_deriving_constraints_then_full_hd_user_facing() {
    // Given/When: Constraints for High pinned to one device
    let constraints = CaptureConstraints::for_tier(QualityTier::High, Some("cam".to_string()));

    // Then: 1920x1080, user-facing, with audio
    assert_eq!((constraints.ideal.width, constraints.ideal.height), (1920, 1080));
    assert_eq!(constraints.facing, FacingMode::User);
    assert_eq!(constraints.device_id.as_deref(), Some("cam"));
    assert!(constraints.audio);
    assert_eq!(constraints.bitrate_bps, QualityTier::High.bitrate_bps());
}

/// WHAT: Session opens the preferred device with VP9
/// WHY: VP9 is the preferred codec whenever the stack supports it
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_vp9_support_when_opening_session_then_vp9_encoder_on_physical_camera() {
    // Given: Fake backend listing a virtual and a built-in camera
    let backend = FakeBackend::default();

    // When: Opening a Medium session
    let session = CaptureSession::open(&backend, QualityTier::Medium, None)
        .await
        .unwrap();

    // Then: VP9 on the built-in camera at 720p
    assert_eq!(session.codec(), Some(CodecProfile::Vp9));
    assert_eq!(session.device().map(|d| d.id.as_str()), Some("/dev/video0"));
    assert_eq!(session.constraints().ideal.height, 720);
    assert_eq!(backend.opens(), 1);
}

/// WHAT: Missing VP9 silently falls back to the platform default codec
/// WHY: Codec fallback must never surface as a capture failure
#[tokio::test]
async fn given_no_vp9_when_opening_session_then_platform_default_codec() {
    // Given: Backend without VP9
    let backend = FakeBackend {
        vp9_supported: false,
        ..FakeBackend::default()
    };

    // When: Opening a session
    let result = CaptureSession::open(&backend, QualityTier::Low, None).await;

    // Then: The session opens with the default codec
    assert!(matches!(
        result.as_ref().map(|s| s.codec()),
        Ok(Some(CodecProfile::PlatformDefault))
    ));
}

/// WHAT: Enumeration failure downgrades to "no preferred device"
/// WHY: Listing cameras is optional; opening the default device still works
#[tokio::test]
async fn given_enumeration_failure_when_opening_session_then_default_device_used() {
    // Given: Backend whose enumeration fails
    let backend = FakeBackend {
        fail_enumeration: true,
        ..FakeBackend::default()
    };

    // When: Opening a session
    let result = CaptureSession::open(&backend, QualityTier::Low, None).await;

    // Then: The stream opens without a device id
    assert!(result.is_ok());
    assert_eq!(backend.last_constraints().and_then(|c| c.device_id), None);
}

/// WHAT: Permission errors from the backend reach the caller unchanged
/// WHY: Each failure kind maps to a distinct user-facing message
#[tokio::test]
async fn given_permission_denied_when_opening_session_then_permission_error() {
    // Given: Backend refusing access
    let backend = FakeBackend {
        open_failure: Some(FakeFailure::PermissionDenied),
        ..FakeBackend::default()
    };

    // When: Opening a session
    let result = CaptureSession::open(&backend, QualityTier::Low, None).await;

    // Then: PermissionDenied with the access message
    let error = result.err();
    assert!(matches!(error, Some(CaptureError::PermissionDenied { .. })));
    assert_eq!(
        error.map(|e| e.user_message()).as_deref(),
        Some("To record video, you must allow access to the camera and microphone.")
    );
}

/// WHAT: If no codec can be built the acquired tracks are released
/// WHY: A failed open must not leave the camera light on
#[tokio::test]
async fn given_no_usable_codec_when_opening_session_then_stream_released() {
    // Given: Backend where both codec profiles fail
    let backend = FakeBackend {
        vp9_supported: false,
        default_codec_fails: true,
        ..FakeBackend::default()
    };

    // When: Opening a session
    let result = CaptureSession::open(&backend, QualityTier::Low, None).await;

    // Then: The error surfaces and the stream was stopped
    assert!(result.is_err());
    assert_eq!(backend.opens(), 1);
    assert_eq!(backend.releases(), 1);
}

/// WHAT: Teardown is idempotent and drop does not release twice
/// WHY: Every exit path calls teardown; double release must be harmless
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_open_session_when_tearing_down_twice_then_released_once() {
    // Given: An open session
    let backend = FakeBackend::default();
    let mut session = CaptureSession::open(&backend, QualityTier::Low, None)
        .await
        .unwrap();

    // When: Tearing down twice then dropping
    session.teardown();
    session.teardown();
    let tracks_after = session.tracks();
    drop(session);

    // Then: Exactly one release, no tracks held, encoder gone
    assert_eq!(backend.releases(), 1);
    assert!(tracks_after.is_empty());
}

/// WHAT: AVFoundation listing yields only camera entries
/// WHY: Screen capture devices and microphones are not cameras
#[test]
fn given_avfoundation_listing_when_parsing_then_video_devices_only() {
    // Given: Typical ffmpeg -list_devices output
    let listing = "\
[AVFoundation indev @ 0x7f8] AVFoundation video devices:
[AVFoundation indev @ 0x7f8] [0] FaceTime HD Camera
[AVFoundation indev @ 0x7f8] [1] OBS Virtual Camera
[AVFoundation indev @ 0x7f8] [2] Capture screen 0
[AVFoundation indev @ 0x7f8] AVFoundation audio devices:
[AVFoundation indev @ 0x7f8] [0] MacBook Pro Microphone
: Input/output error";

    // When: Parsing
    let devices = parse_avfoundation_devices(listing);

    // Then: Two cameras with their indices
    assert_eq!(
        devices,
        vec![
            CaptureDevice::new("0", "FaceTime HD Camera"),
            CaptureDevice::new("1", "OBS Virtual Camera"),
        ]
    );
}

/// WHAT: ffmpeg failures are classified into the capture taxonomy
/// WHY: The user message depends on the failure kind
#[test]
fn given_ffmpeg_stderr_when_classifying_then_matching_variant() {
    // Given/When/Then: Each known phrase maps to its variant
    assert!(matches!(
        classify_ffmpeg_failure("Cannot open video device /dev/video0: Device or resource busy"),
        CaptureError::DeviceBusy { .. }
    ));
    assert!(matches!(
        classify_ffmpeg_failure("/dev/video3: No such file or directory"),
        CaptureError::DeviceNotFound { .. }
    ));
    assert!(matches!(
        classify_ffmpeg_failure("Failed to open device: Permission denied"),
        CaptureError::PermissionDenied { .. }
    ));
    assert!(matches!(
        classify_ffmpeg_failure("Conversion failed!"),
        CaptureError::UnknownCaptureError { reason, .. } if reason == "Conversion failed!"
    ));
}

/// WHAT: Device node open errors map onto capture errors
/// WHY: Probing the node gives a precise error before ffmpeg starts
#[test]
fn given_io_errors_when_mapping_open_failure_then_matching_variant() {
    // Given: A device path
    let path = Path::new("/dev/video0");

    // When/Then: Each io error kind maps to its variant
    assert!(matches!(
        map_open_error(path, io::Error::from(io::ErrorKind::PermissionDenied)),
        CaptureError::PermissionDenied { .. }
    ));
    assert!(matches!(
        map_open_error(path, io::Error::from(io::ErrorKind::NotFound)),
        CaptureError::DeviceNotFound { .. }
    ));
    assert!(matches!(
        map_open_error(path, io::Error::from_raw_os_error(16)),
        CaptureError::DeviceBusy { .. }
    ));
}

/// WHAT: V4L2 enumeration reads capture nodes from sysfs in numeric order
/// WHY: Metadata nodes share the camera name but cannot stream video
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_sysfs_tree_when_enumerating_then_capture_nodes_listed() {
    // Given: A fake sysfs tree with a camera, its metadata node and a loopback
    let root = tempfile::tempdir().unwrap();
    for (node, name, index) in [
        ("video10", "v4l2loopback", "0"),
        ("video0", "Integrated Camera: Integrated C", "0"),
        ("video1", "Integrated Camera: Integrated C", "1"),
    ] {
        let dir = root.path().join(node);
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("name"), format!("{}\n", name)).unwrap();
        std::fs::write(dir.join("index"), format!("{}\n", index)).unwrap();
    }
    let backend = FfmpegBackend::with_sysfs_root(root.path());

    // When: Enumerating
    let devices = backend.enumerate_devices().await.unwrap();

    // Then: Two capture nodes, numerically ordered, metadata node skipped
    assert_eq!(
        devices,
        vec![
            CaptureDevice::new("/dev/video0", "Integrated Camera: Integrated C"),
            CaptureDevice::new("/dev/video10", "v4l2loopback"),
        ]
    );
    assert_eq!(
        select_device(&devices, None).map(|d| d.id.as_str()),
        Some("/dev/video0")
    );
}

/// WHAT: Real ffmpeg capture produces a WebM artifact
/// WHY: Exercises the child-process pipeline end to end
#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
#[allow(clippy::unwrap_used)]
async fn given_real_camera_when_recording_two_seconds_then_webm_bytes_emitted() {
    // Given: The host camera through ffmpeg
    let backend = FfmpegBackend::new();
    let mut session = CaptureSession::open(&backend, QualityTier::Low, None)
        .await
        .unwrap();
    let (sink, mut chunks) = tokio::sync::mpsc::unbounded_channel();

    // When: Recording for two seconds
    session
        .start_recording(std::time::Duration::from_secs(1), sink)
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_secs(2)).await;
    session.stop_recording().await.unwrap();
    session.teardown();

    // Then: The first bytes carry the EBML magic
    let mut artifact = Vec::new();
    while let Ok(chunk) = chunks.try_recv() {
        artifact.extend(chunk);
    }
    assert!(artifact.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]));
}

/// WHAT: An encoder process that dies on launch fails the start
/// WHY: A missing device or audio server must surface before recording begins
#[cfg(unix)]
#[tokio::test]
async fn given_encoder_exiting_at_launch_when_starting_then_start_fails_with_cause() {
    // Given: A process that reports a busy device and exits
    let mut encoder = FfmpegEncoder::with_command(
        "/bin/sh",
        &["-c", "echo '/dev/video0: Device or resource busy' >&2; exit 1"],
    );
    let (sink, _chunks) = tokio::sync::mpsc::unbounded_channel();

    // When: Starting
    let result = encoder.start(std::time::Duration::from_secs(1), sink).await;

    // Then: The start fails with the classified cause and nothing runs
    assert!(matches!(result, Err(CaptureError::DeviceBusy { .. })));
    assert!(!encoder.is_active());
}

/// WHAT: An encoder process that stays up starts and stops cleanly
/// WHY: The startup check must not reject a healthy encoder
#[cfg(unix)]
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_long_running_encoder_when_starting_then_active_until_stopped() {
    // Given: A process that writes output and exits once stdin closes
    let mut encoder =
        FfmpegEncoder::with_command("/bin/sh", &["-c", "printf webm; cat > /dev/null"]);
    let (sink, mut chunks) = tokio::sync::mpsc::unbounded_channel();

    // When: Starting then stopping
    encoder
        .start(std::time::Duration::from_secs(1), sink)
        .await
        .unwrap();
    assert!(encoder.is_active());
    encoder.stop().await.unwrap();

    // Then: Inactive, output delivered
    assert!(!encoder.is_active());
    let mut artifact = Vec::new();
    while let Ok(chunk) = chunks.try_recv() {
        artifact.extend(chunk);
    }
    assert_eq!(artifact, b"webm");
}
