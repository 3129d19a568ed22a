//! Frame Streamer: paced capture loop, adaptive quality, subscriber
//! fan-out. Grounded on `original_source/agent/control/screen.py`'s
//! grab -> convert -> resize -> encode pipeline shape; crates used in place
//! of the original's `mss`/`Pillow` are `xcap` (capture, via
//! `remote-agent-capability`) and `image` (JPEG encode), per DESIGN.md.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageBuffer, Rgb};
use remote_agent_capability::ScreenCapability;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{trace, warn};

use crate::events::{CoreEvent, EventSender};

const SLIDING_WINDOW: Duration = Duration::from_secs(5);
const SLIDING_WINDOW_CAP: usize = 100;
const TARGET_BUDGET_CAP_BYTES: f64 = 100.0 * 1024.0;

pub struct FrameMetrics {
    pub capture_ms: u64,
    pub encode_ms: u64,
    pub size_bytes: usize,
    pub quality: u8,
    pub timestamp_ms: i64,
}

struct AdaptiveQuality {
    samples: VecDeque<(Instant, usize)>,
    quality: AtomicU8,
    min_quality: u8,
    max_quality: u8,
}

impl AdaptiveQuality {
    fn new(initial: u8, min: u8, max: u8) -> Mutex<Self> {
        Mutex::new(Self {
            samples: VecDeque::new(),
            quality: AtomicU8::new(initial),
            min_quality: min,
            max_quality: max,
        })
    }

    fn record_and_adjust(&mut self, size_bytes: usize, frame_interval: Duration) {
        let now = Instant::now();
        self.samples.push_back((now, size_bytes));
        while self.samples.len() > SLIDING_WINDOW_CAP {
            self.samples.pop_front();
        }
        while let Some((t, _)) = self.samples.front() {
            if now.duration_since(*t) > SLIDING_WINDOW {
                self.samples.pop_front();
            } else {
                break;
            }
        }

        let throughput = if self.samples.len() >= 2 {
            let total: usize = self.samples.iter().map(|(_, s)| *s).sum();
            let span = self
                .samples
                .back()
                .unwrap()
                .0
                .duration_since(self.samples.front().unwrap().0)
                .as_secs_f64();
            if span > 0.0 {
                total as f64 / span
            } else {
                f64::INFINITY
            }
        } else {
            f64::INFINITY
        };

        let target_budget = (throughput * frame_interval.as_secs_f64() * 0.8).min(TARGET_BUDGET_CAP_BYTES);

        let current = self.quality.load(Ordering::SeqCst);
        if (size_bytes as f64) > 1.2 * target_budget {
            let next = current.saturating_sub(5).max(self.min_quality);
            self.quality.store(next, Ordering::SeqCst);
        } else if (size_bytes as f64) < 0.5 * target_budget {
            let next = (current + 2).min(self.max_quality);
            self.quality.store(next, Ordering::SeqCst);
        }
    }

    fn current(&self) -> u8 {
        self.quality.load(Ordering::SeqCst).clamp(self.min_quality, self.max_quality)
    }

    fn set(&self, quality: u8) {
        self.quality
            .store(quality.clamp(self.min_quality, self.max_quality), Ordering::SeqCst);
    }
}

pub struct FrameStreamer {
    screen: Arc<dyn ScreenCapability>,
    events: EventSender,
    quality_controller: Mutex<AdaptiveQuality>,
    target_fps: AtomicU32,
    min_fps: u32,
    max_fps: u32,
    scale: f64,
    monitor_index: usize,
    running: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl FrameStreamer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        screen: Arc<dyn ScreenCapability>,
        events: EventSender,
        min_fps: u32,
        max_fps: u32,
        initial_fps: u32,
        min_quality: u8,
        max_quality: u8,
        initial_quality: u8,
        scale: f64,
        monitor_index: usize,
    ) -> Self {
        Self {
            screen,
            events,
            quality_controller: AdaptiveQuality::new(initial_quality, min_quality, max_quality),
            target_fps: AtomicU32::new(initial_fps.clamp(min_fps.max(1), max_fps.min(30))),
            min_fps: min_fps.max(1),
            max_fps: max_fps.min(30),
            scale: scale.clamp(0.1, 1.0),
            monitor_index,
            running: Arc::new(AtomicBool::new(false)),
            task: Mutex::new(None),
        }
    }

    pub fn set_target_fps(&self, fps: u32) {
        self.target_fps
            .store(fps.clamp(self.min_fps, self.max_fps), Ordering::SeqCst);
    }

    pub async fn set_quality(&self, quality: u8) {
        self.quality_controller.lock().await.set(quality);
    }

    pub async fn get_quality(&self) -> u8 {
        self.quality_controller.lock().await.current()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Idempotent: calling `start` while already running is a no-op.
    pub async fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let streamer = self.clone();
        let handle = tokio::spawn(async move {
            while streamer.running.load(Ordering::SeqCst) {
                let frame_start = Instant::now();
                let fps = streamer.target_fps.load(Ordering::SeqCst).max(1);
                let interval = Duration::from_secs_f64(1.0 / fps as f64);

                match streamer.capture_single_frame().await {
                    Ok((data_base64, metrics)) => {
                        streamer
                            .quality_controller
                            .lock()
                            .await
                            .record_and_adjust(metrics.size_bytes, interval);
                        streamer
                            .events
                            .send(CoreEvent::Frame {
                                data_base64,
                                timestamp_ms: metrics.timestamp_ms,
                                quality: metrics.quality,
                                size_bytes: metrics.size_bytes,
                            })
                            .await;
                    }
                    Err(e) => {
                        warn!(error = %e, "frame capture failed, skipping this tick");
                    }
                }

                let elapsed = frame_start.elapsed();
                if elapsed > interval.mul_f64(1.5) {
                    trace!(?elapsed, ?interval, "frame streamer falling behind");
                }
                let remaining = interval.saturating_sub(elapsed);
                if !remaining.is_zero() {
                    tokio::time::sleep(remaining).await;
                }
            }
        });
        *self.task.lock().await = Some(handle);
    }

    pub async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.task.lock().await.take() {
            let _ = handle.await;
        }
    }

    /// On-demand one-shot capture, independent of the running loop.
    pub async fn capture_single_frame(&self) -> anyhow::Result<(String, FrameMetrics)> {
        let screen = self.screen.clone();
        let monitor_index = self.monitor_index;
        let scale = self.scale;
        let quality = self.get_quality().await;

        let capture_start = Instant::now();
        let (jpeg_bytes, capture_ms, encode_ms) = tokio::task::spawn_blocking(move || {
            let capture_t0 = Instant::now();
            let frame = screen.capture(monitor_index)?;
            let capture_ms = capture_t0.elapsed().as_millis() as u64;

            let encode_t0 = Instant::now();
            let (width, height) = if (scale - 1.0).abs() > f64::EPSILON {
                (
                    ((frame.width as f64) * scale).round() as u32,
                    ((frame.height as f64) * scale).round() as u32,
                )
            } else {
                (frame.width, frame.height)
            };

            let image: ImageBuffer<Rgb<u8>, Vec<u8>> =
                ImageBuffer::from_raw(frame.width, frame.height, frame.rgb)
                    .ok_or_else(|| anyhow::anyhow!("captured frame buffer size mismatch"))?;
            let image = if (width, height) != (frame.width, frame.height) {
                image::imageops::resize(&image, width, height, image::imageops::FilterType::Lanczos3)
            } else {
                image
            };

            let mut buf = Vec::new();
            let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
            encoder.encode_image(&image)?;
            let encode_ms = encode_t0.elapsed().as_millis() as u64;
            Ok::<_, anyhow::Error>((buf, capture_ms, encode_ms))
        })
        .await??;

        let size_bytes = jpeg_bytes.len();
        let data_base64 = BASE64.encode(&jpeg_bytes);
        let timestamp_ms = chrono::Utc::now().timestamp_millis();
        let _ = capture_start;

        Ok((
            data_base64,
            FrameMetrics {
                capture_ms,
                encode_ms,
                size_bytes,
                quality,
                timestamp_ms,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remote_agent_capability::CapturedFrame;
    use crate::events::EventHub;

    struct SolidColorScreen;
    impl ScreenCapability for SolidColorScreen {
        fn capture(&self, _monitor_index: usize) -> anyhow::Result<CapturedFrame> {
            Ok(CapturedFrame {
                width: 4,
                height: 4,
                rgb: vec![128u8; 4 * 4 * 3],
            })
        }
        fn monitor_count(&self) -> anyhow::Result<usize> {
            Ok(1)
        }
    }

    #[tokio::test]
    async fn quality_stays_in_bounds_under_adjustment() {
        let (_hub, events) = EventHub::setup();
        let streamer = Arc::new(FrameStreamer::new(
            Arc::new(SolidColorScreen),
            events,
            2,
            10,
            5,
            30,
            90,
            70,
            1.0,
            0,
        ));
        {
            let mut controller = streamer.quality_controller.lock().await;
            for _ in 0..10 {
                controller.record_and_adjust(400_000, Duration::from_millis(200));
            }
        }
        let q = streamer.get_quality().await;
        assert!((30..=90).contains(&q));
    }

    #[tokio::test]
    async fn capture_single_frame_produces_jpeg_base64() {
        let (_hub, events) = EventHub::setup();
        let streamer = Arc::new(FrameStreamer::new(
            Arc::new(SolidColorScreen),
            events,
            2,
            10,
            5,
            30,
            90,
            70,
            1.0,
            0,
        ));
        let (data, metrics) = streamer.capture_single_frame().await.unwrap();
        assert!(!data.is_empty());
        assert!(metrics.size_bytes > 0);
    }
}
