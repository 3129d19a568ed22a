/// A raw captured frame: RGB8 pixel data plus dimensions, prior to JPEG
/// encoding (done by the frame streamer, not the capability itself).
pub struct CapturedFrame {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

/// Monitor enumeration and raw capture. Grounded on
/// `original_source/agent/control/screen.py`'s grab step; the convert/resize/
/// encode steps live in `remote-agent-core`'s frame streamer, which is the
/// only caller of this trait.
pub trait ScreenCapability: Send + Sync {
    fn capture(&self, monitor_index: usize) -> anyhow::Result<CapturedFrame>;
    fn monitor_count(&self) -> anyhow::Result<usize>;
}
