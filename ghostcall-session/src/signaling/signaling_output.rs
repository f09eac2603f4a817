use async_trait::async_trait;
use ghostcall_core::ClientEvent;

/// Трейт, который должна реализовать внешняя система (сигнальный сервер),
/// чтобы менеджер звонка мог отправлять события остальным участникам.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    /// Отправить событие на сервер. Доставка не гарантируется.
    async fn emit(&self, event: ClientEvent);
}
