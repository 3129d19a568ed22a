use image::{DynamicImage, RgbImage};
use xcap::Monitor;

use crate::screen::{CapturedFrame, ScreenCapability};

pub struct XcapScreenCapability;

impl ScreenCapability for XcapScreenCapability {
    fn capture(&self, monitor_index: usize) -> anyhow::Result<CapturedFrame> {
        let monitors = Monitor::all()?;
        let monitor = monitors
            .get(monitor_index)
            .ok_or_else(|| anyhow::anyhow!("no monitor at index {monitor_index}"))?;
        let image = monitor.capture_image()?;
        let rgb: RgbImage = DynamicImage::ImageRgba8(image).to_rgb8();
        Ok(CapturedFrame {
            width: rgb.width(),
            height: rgb.height(),
            rgb: rgb.into_raw(),
        })
    }

    fn monitor_count(&self) -> anyhow::Result<usize> {
        Ok(Monitor::all()?.len())
    }
}
