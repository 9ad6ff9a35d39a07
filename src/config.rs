//! Модуль конфигурации библиотеки dub-sync
//!
//! Все пороги планирования и подгонки (0.6 с паузы, 15 с на чанк, 0.05 с допуска)
//! подобраны эмпирически, поэтому вынесены в настройки, а не зашиты в код.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DubSyncError, Result};

/// Параметры разбора сценария
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ParserConfig {
    /// Минимальная оценочная длительность реплики без конца (секунды)
    pub min_estimated_duration: f64,
    /// Секунд на слово при оценке длительности
    pub seconds_per_word: f64,
    /// Говорящий для субтитров без явного имени
    pub default_speaker: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            min_estimated_duration: 1.5,
            seconds_per_word: 0.4,
            default_speaker: "Narrator".to_string(),
        }
    }
}

/// Параметры объединения реплик в чанки
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlannerConfig {
    /// Максимальная пауза между репликами одного чанка (секунды, строго меньше)
    pub max_merge_gap: f64,
    /// Максимальный охват чанка при объединении (секунды, строго меньше)
    pub max_chunk_span: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_merge_gap: 0.6,
            max_chunk_span: 15.0,
        }
    }
}

/// Параметры SOLA
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FitConfig {
    /// Допуск, при котором буфер возвращается без изменений (секунды)
    pub tolerance: f64,
    /// Длина последовательности (мс)
    pub sequence_ms: f64,
    /// Длина зоны кроссфейда (мс)
    pub overlap_ms: f64,
    /// Окно поиска фазы (мс)
    pub seek_ms: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.05,
            sequence_ms: 20.0,
            overlap_ms: 8.0,
            seek_ms: 10.0,
        }
    }
}

/// Параметры сведения таймлайна
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MixConfig {
    /// Пиковый уровень после защиты от клиппинга
    pub clip_ceiling: f32,
}

impl Default for MixConfig {
    fn default() -> Self {
        Self { clip_ceiling: 0.95 }
    }
}

/// Конфигурация библиотеки
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DubSyncConfig {
    /// Идентификатор провайдера синтеза (входит в отпечаток чанка)
    pub provider: String,
    /// Учётные данные провайдера, передаются в каждый запрос
    pub credentials: Option<String>,
    /// Голос по умолчанию
    pub default_voice: String,
    /// Соответствие говорящий -> голос
    pub voices: HashMap<String, String>,
    pub parser: ParserConfig,
    pub planner: PlannerConfig,
    pub fit: FitConfig,
    pub mix: MixConfig,
    /// Директория для кэша на диске
    pub cache_dir: Option<String>,
    /// Максимальный размер кэша в байтах
    pub max_cache_size: Option<u64>,
}

impl Default for DubSyncConfig {
    fn default() -> Self {
        Self {
            provider: "default".to_string(),
            credentials: None,
            default_voice: "alloy".to_string(),
            voices: HashMap::new(),
            parser: ParserConfig::default(),
            planner: PlannerConfig::default(),
            fit: FitConfig::default(),
            mix: MixConfig::default(),
            cache_dir: None,
            max_cache_size: Some(1024 * 1024 * 1024), // 1 GB
        }
    }
}

impl DubSyncConfig {
    /// Загрузить конфигурацию из JSON-строки
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Загрузить конфигурацию из JSON-файла
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        log::debug!("Loading config from {}", path.as_ref().display());
        Self::from_json_str(&contents)
    }

    /// Голос для говорящего
    pub fn voice_for(&self, speaker: &str) -> &str {
        self.voices
            .get(speaker)
            .map(String::as_str)
            .unwrap_or(&self.default_voice)
    }

    /// Проверить согласованность параметров
    pub fn validate(&self) -> Result<()> {
        if self.provider.trim().is_empty() {
            return Err(DubSyncError::Configuration("provider must not be empty".to_string()));
        }
        if !(self.parser.min_estimated_duration > 0.0) || !(self.parser.seconds_per_word > 0.0) {
            return Err(DubSyncError::Configuration(
                "duration estimate parameters must be positive".to_string(),
            ));
        }
        if !(self.planner.max_chunk_span > 0.0) {
            return Err(DubSyncError::Configuration("max_chunk_span must be positive".to_string()));
        }
        let fit = &self.fit;
        if !(fit.tolerance >= 0.0) || !(fit.overlap_ms > 0.0) || !(fit.seek_ms > 0.0) {
            return Err(DubSyncError::Configuration("SOLA windows must be positive".to_string()));
        }
        if fit.overlap_ms >= fit.sequence_ms {
            return Err(DubSyncError::Configuration(format!(
                "overlap ({} ms) must be shorter than sequence ({} ms)",
                fit.overlap_ms, fit.sequence_ms
            )));
        }
        if !(self.mix.clip_ceiling > 0.0 && self.mix.clip_ceiling <= 1.0) {
            return Err(DubSyncError::Configuration("clip_ceiling must be in (0, 1]".to_string()));
        }
        Ok(())
    }
}
