use crate::error::CallError;
use crate::media::{LocalMedia, MediaSource};
use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};
use webrtc::api::media_engine::MIME_TYPE_OPUS;
use webrtc::media::Sample;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// Half of a 256-point FFT.
pub const FREQUENCY_BIN_COUNT: usize = 128;

/// Opus-трек, в который внешний конвейер захвата пишет закодированные
/// кадры и уровни спектра.
pub struct TrackMedia {
    track: Arc<TrackLocalStaticSample>,
    enabled: AtomicBool,
    stopped: AtomicBool,
    levels: Mutex<Vec<u8>>,
}

impl TrackMedia {
    pub fn opus(stream_id: impl Into<String>) -> Self {
        let track = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                clock_rate: 48_000,
                channels: 2,
                ..Default::default()
            },
            "audio".to_owned(),
            stream_id.into(),
        ));

        Self {
            track,
            enabled: AtomicBool::new(true),
            stopped: AtomicBool::new(false),
            levels: Mutex::new(vec![0; FREQUENCY_BIN_COUNT]),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Write one encoded frame. Frames are dropped while muted or stopped.
    pub async fn write_frame(&self, data: Bytes, duration: Duration) -> Result<()> {
        if self.is_stopped() || !self.is_enabled() {
            return Ok(());
        }

        self.track
            .write_sample(&Sample {
                data,
                duration,
                ..Default::default()
            })
            .await?;
        Ok(())
    }

    /// Replace the current spectrum. Ignored once stopped.
    pub fn publish_levels(&self, bins: &[u8]) {
        if self.is_stopped() {
            return;
        }
        if let Ok(mut levels) = self.levels.lock() {
            levels.clear();
            levels.extend_from_slice(bins);
        }
    }
}

impl LocalMedia for TrackMedia {
    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    fn stop(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Ok(mut levels) = self.levels.lock() {
            levels.iter_mut().for_each(|b| *b = 0);
        }
        debug!("Local track {} stopped", self.track.stream_id());
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    fn frequency_data(&self, out: &mut Vec<u8>) {
        out.clear();
        if self.is_stopped() || !self.is_enabled() {
            out.resize(FREQUENCY_BIN_COUNT, 0);
            return;
        }
        if let Ok(levels) = self.levels.lock() {
            out.extend_from_slice(&levels);
        }
    }

    fn track(&self) -> Option<Arc<dyn TrackLocal + Send + Sync>> {
        Some(self.track.clone() as Arc<dyn TrackLocal + Send + Sync>)
    }
}

/// Источник, создающий новый `TrackMedia` на каждый вход в звонок и
/// передающий его конвейеру захвата через канал.
pub struct TrackMediaSource {
    stream_prefix: String,
    counter: AtomicU64,
    capture_tx: mpsc::UnboundedSender<Arc<TrackMedia>>,
}

impl TrackMediaSource {
    pub fn new(
        stream_prefix: impl Into<String>,
    ) -> (Self, mpsc::UnboundedReceiver<Arc<TrackMedia>>) {
        let (capture_tx, capture_rx) = mpsc::unbounded_channel();
        let source = Self {
            stream_prefix: stream_prefix.into(),
            counter: AtomicU64::new(0),
            capture_tx,
        };
        (source, capture_rx)
    }
}

#[async_trait]
impl MediaSource for TrackMediaSource {
    async fn acquire(&self) -> Result<Arc<dyn LocalMedia>, CallError> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let media = Arc::new(TrackMedia::opus(format!("{}-{}", self.stream_prefix, n)));

        self.capture_tx
            .send(media.clone())
            .map_err(|_| CallError::MediaUnavailable("capture pipeline is gone".to_owned()))?;

        info!("Local audio track acquired");
        Ok(media as Arc<dyn LocalMedia>)
    }
}
