//! Интерфейс сервиса синтеза речи

use async_trait::async_trait;

use crate::audio::AudioBuffer;
use crate::error::Result;

/// Запрос на синтез одного чанка
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    /// Голос провайдера
    pub voice: String,
    /// Текст для озвучки
    pub text: String,
    /// Учётные данные передаются в каждом вызове, глобального состояния нет
    pub credentials: Option<String>,
}

/// Сервис синтеза речи
///
/// Реализация возвращает декодированный PCM; длительность результата
/// произвольная, подгонка под окно чанка выполняется после.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioBuffer>;
}
