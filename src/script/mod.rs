//! Модуль для работы со сценарием
//!
//! Превращает текст сценария (или готовые субтитры) в упорядоченный список
//! реплик с вычисленными временами начала и конца.

pub mod analyzer;
pub mod cues;
pub mod parser;

use serde::{Deserialize, Serialize};

pub use analyzer::{analyze_line_timing, TimingMetrics};
pub use cues::{lines_from_cues, Subtitle};
pub use parser::{parse_script, parse_script_with};

/// Реплика сценария
///
/// Времена в секундах от начала таймлайна, `end_time > start_time`.
/// После создания не изменяется.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptLine {
    /// Исходная строка сценария
    pub original_text: String,
    /// Имя говорящего
    pub speaker_name: String,
    /// Произносимый текст без ремарок
    pub spoken_text: String,
    /// Время начала
    pub start_time: f64,
    /// Время окончания
    pub end_time: f64,
}

impl ScriptLine {
    /// Длительность реплики
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Количество слов произносимого текста
    pub fn word_count(&self) -> usize {
        self.spoken_text.split_whitespace().count()
    }
}
