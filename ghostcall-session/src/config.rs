use std::time::Duration;

/// Настройки звонка: ICE-серверы, детектор речи, таймеры и повторы.
#[derive(Clone, Debug)]
pub struct CallConfig {
    pub ice_servers: Vec<String>,
    pub speaking_interval: Duration,
    /// Средняя амплитуда спектра (0..=255), выше которой считаем, что участник говорит.
    pub speaking_threshold: f32,
    pub reconcile_interval: Duration,
    /// Сколько плитка может висеть в `disconnected`, прежде чем сверка её уберёт.
    pub disconnect_grace: Duration,
    pub max_signal_retries: u32,
    pub retry_backoff: Duration,
    pub max_retry_backoff: Duration,
}

impl CallConfig {
    /// Exponential backoff for the given retry number (1-based), capped.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.retry_backoff
            .saturating_mul(1u32 << shift)
            .min(self.max_retry_backoff)
    }
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![
                "stun:stun.l.google.com:19302".to_owned(),
                "stun:stun1.l.google.com:19302".to_owned(),
            ],
            speaking_interval: Duration::from_millis(200),
            speaking_threshold: 10.0,
            reconcile_interval: Duration::from_secs(3),
            disconnect_grace: Duration::from_secs(10),
            max_signal_retries: 3,
            retry_backoff: Duration::from_millis(500),
            max_retry_backoff: Duration::from_secs(4),
        }
    }
}
