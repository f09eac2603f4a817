use crate::error::CallError;
use async_trait::async_trait;
use std::sync::Arc;
use webrtc::track::track_local::TrackLocal;

/// Локальный аудиопоток (микрофон).
///
/// Потоком владеет менеджер звонка. Соединения и детектор речи получают
/// его только на время и никогда не вызывают `stop`.
pub trait LocalMedia: Send + Sync {
    /// Mute/unmute without releasing the capture device.
    fn set_enabled(&self, enabled: bool);

    /// Release the capture device. Idempotent.
    fn stop(&self);

    fn is_stopped(&self) -> bool;

    /// Current frequency-magnitude bins, one byte per bin. Overwrites `out`.
    fn frequency_data(&self, out: &mut Vec<u8>);

    /// Track to attach to outgoing peer connections, if this media has one.
    fn track(&self) -> Option<Arc<dyn TrackLocal + Send + Sync>> {
        None
    }
}

/// Получение доступа к микрофону. Может занять время (запрос разрешения)
/// или завершиться отказом.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn acquire(&self) -> Result<Arc<dyn LocalMedia>, CallError>;
}
