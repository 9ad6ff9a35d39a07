//! Пословные тайминги
//!
//! Тайминги оцениваются эвристически, пропорционально числу символов в слове,
//! а не измеряются. Реальное выравнивание (forced alignment) можно подставить
//! через [`WordTimingEstimator`], контракт склейки таймлайна от этого не меняется.

use serde::{Deserialize, Serialize};

/// Тайминг слова (в секундах)
///
/// Внутри чанка отсчитывается от нуля, после склейки от начала таймлайна.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTiming {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

impl WordTiming {
    /// Тайминг, сдвинутый на `offset` секунд
    pub fn shifted(&self, offset: f64) -> Self {
        Self {
            word: self.word.clone(),
            start: self.start + offset,
            end: self.end + offset,
        }
    }
}

/// Оценщик пословных таймингов
pub trait WordTimingEstimator: Send + Sync {
    /// Распределить `duration` секунд между словами текста.
    ///
    /// Результат упорядочен по `start`, у каждого слова `end >= start`.
    fn estimate(&self, text: &str, duration: f64) -> Vec<WordTiming>;
}

/// Распределение времени пропорционально количеству символов
#[derive(Debug, Clone, Copy, Default)]
pub struct CharProportionalEstimator;

impl WordTimingEstimator for CharProportionalEstimator {
    fn estimate(&self, text: &str, duration: f64) -> Vec<WordTiming> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let total_chars: usize = words.iter().map(|w| w.chars().count()).sum();
        if words.is_empty() || total_chars == 0 || !(duration > 0.0) {
            return Vec::new();
        }

        let mut timings = Vec::with_capacity(words.len());
        let mut consumed = 0usize;

        for word in words {
            let start = duration * consumed as f64 / total_chars as f64;
            consumed += word.chars().count();
            let end = duration * consumed as f64 / total_chars as f64;

            timings.push(WordTiming {
                word: word.to_string(),
                start,
                end,
            });
        }

        timings
    }
}
