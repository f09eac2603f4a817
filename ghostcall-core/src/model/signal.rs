use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Непрозрачный сигнальный payload. Менеджер звонка его не разбирает,
/// только передаёт адресованному соединению.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct SignalPayload(pub Value);

impl SignalPayload {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn into_inner(self) -> Value {
        self.0
    }
}

impl From<Value> for SignalPayload {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
