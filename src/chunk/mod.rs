//! Модуль планирования чанков дубляжа
//!
//! Чанк: подряд идущие реплики одного говорящего, которые синтезируются
//! и подгоняются по длительности как единое целое.

pub mod fingerprint;
pub mod planner;

use serde::{Deserialize, Serialize};

use crate::script::ScriptLine;

pub use fingerprint::{fingerprint, ChunkId};
pub use planner::{plan_chunks, plan_chunks_with};

/// Чанк дубляжа
///
/// Производные данные: пересчитываются при каждом изменении сценария
/// или провайдера и не хранятся как первоисточник.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DubbingChunk {
    /// Отпечаток входных данных генерации
    pub id: ChunkId,
    /// Имя говорящего (общее для всех реплик)
    pub speaker_name: String,
    /// Реплики в исходном порядке
    pub lines: Vec<ScriptLine>,
    /// Начало первой реплики
    pub start_time: f64,
    /// Конец последней реплики
    pub end_time: f64,
}

impl DubbingChunk {
    /// Произносимый текст всех реплик через пробел
    pub fn spoken_text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.spoken_text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Целевая длительность чанка
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}
