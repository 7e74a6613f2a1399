/// Name fragments that mark a software or virtual camera.
pub(crate) const VIRTUAL_CAMERA_KEYWORDS: &[&str] = &[
    "obs",
    "virtual",
    "snap camera",
    "manycam",
    "droidcam",
    "xsplit",
    "v4l2loopback",
    "dummy",
];

/// A camera advertised by a capture backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureDevice {
    /// Backend-specific identifier (device node, index, ...).
    pub id: String,
    /// Advertised human-readable name.
    pub name: String,
}

impl CaptureDevice {
    /// Create a device descriptor.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Whether the advertised name indicates a virtual/software camera.
    pub fn is_virtual(&self) -> bool {
        let name = self.name.to_lowercase();
        VIRTUAL_CAMERA_KEYWORDS
            .iter()
            .any(|keyword| contains_word(&name, keyword))
    }
}

/// Pick the device to open.
///
/// Order: the configured id if it was enumerated, then the first physical
/// camera, then the first enumerated device. `None` when the list is empty.
pub fn select_device<'a>(
    devices: &'a [CaptureDevice],
    configured: Option<&str>,
) -> Option<&'a CaptureDevice> {
    if let Some(id) = configured
        && let Some(device) = devices.iter().find(|d| d.id == id)
    {
        return Some(device);
    }

    devices
        .iter()
        .find(|d| !d.is_virtual())
        .or_else(|| devices.first())
}

// "obs" must not match "Jacobs Cam"; multi-word keywords match as phrases.
fn contains_word(haystack: &str, keyword: &str) -> bool {
    haystack.match_indices(keyword).any(|(start, _)| {
        let end = start + keyword.len();
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}
