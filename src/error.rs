//! Модуль обработки ошибок библиотеки dub-sync
//!
//! Парсер сценария и планировщик чанков ошибок не возвращают: некорректные строки
//! понижаются до простых реплик или отбрасываются. Ошибки здесь описывают нарушения
//! предусловий (подгонка длительности), сбои внешних сервисов синтеза и работу кэша.

use thiserror::Error;

/// Ошибки библиотеки dub-sync
#[derive(Debug, Error)]
pub enum DubSyncError {
    /// Ошибка ввода-вывода
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка сериализации/десериализации JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Целевая длительность не положительна или не конечна
    #[error("Invalid target duration: {0}")]
    InvalidTargetDuration(f64),

    /// Пустой аудиобуфер передан туда, где нужен звук
    #[error("Empty audio buffer: {0}")]
    EmptyBuffer(String),

    /// Неверный формат аудио (частота, число каналов, длина)
    #[error("Invalid audio format: {0}")]
    InvalidFormat(String),

    /// Ошибка сервиса синтеза речи
    #[error("Speech synthesis error: {0}")]
    Synthesis(String),

    /// Обработка прервана по сигналу отмены
    #[error("Generation cancelled")]
    Cancelled,

    /// Повреждённая запись кэша
    #[error("Cache entry corrupted: {0}")]
    CacheCorrupted(String),

    /// Чанк отсутствует в текущем плане
    #[error("Unknown chunk: {0}")]
    UnknownChunk(String),

    /// Ошибка конфигурации
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Другая ошибка
    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<&str> for DubSyncError {
    fn from(s: &str) -> Self {
        DubSyncError::Other(anyhow::anyhow!(s.to_string()))
    }
}

impl From<String> for DubSyncError {
    fn from(s: String) -> Self {
        DubSyncError::Other(anyhow::anyhow!(s))
    }
}

/// Тип Result для библиотеки dub-sync
pub type Result<T> = std::result::Result<T, DubSyncError>;
