//! Планировщик чанков
//!
//! Свёртка реплик слева направо. Реплика присоединяется к текущему чанку, если
//! совпадает говорящий, пауза меньше `max_merge_gap` (перекрытие тоже подходит:
//! импорт из SRT иногда даёт наложение) и охват чанка остаётся меньше
//! `max_chunk_span`. Ограничение охвата только запрещает объединение: одиночная
//! длинная реплика всё равно становится отдельным чанком.

use log::debug;

use crate::chunk::{fingerprint, DubbingChunk};
use crate::config::PlannerConfig;
use crate::script::ScriptLine;

/// Чанк до вычисления отпечатка
struct PendingChunk {
    speaker_name: String,
    lines: Vec<ScriptLine>,
    start_time: f64,
    end_time: f64,
}

impl PendingChunk {
    fn start(line: &ScriptLine) -> Self {
        Self {
            speaker_name: line.speaker_name.clone(),
            lines: vec![line.clone()],
            start_time: line.start_time,
            end_time: line.end_time,
        }
    }

    fn accepts(&self, line: &ScriptLine, config: &PlannerConfig) -> bool {
        if line.speaker_name != self.speaker_name {
            return false;
        }

        let gap = line.start_time - self.end_time;
        if gap >= config.max_merge_gap {
            return false;
        }

        // Реплика, закончившаяся до начала чанка, дала бы отрицательное окно
        if line.end_time <= self.start_time {
            return false;
        }

        line.end_time - self.start_time < config.max_chunk_span
    }

    fn push(&mut self, line: &ScriptLine) {
        self.end_time = line.end_time;
        self.lines.push(line.clone());
    }

    fn finalize(self, provider: &str) -> DubbingChunk {
        let text = self
            .lines
            .iter()
            .map(|line| line.spoken_text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        DubbingChunk {
            id: fingerprint(provider, &self.speaker_name, &text, self.start_time, self.end_time),
            speaker_name: self.speaker_name,
            lines: self.lines,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}

/// Планирование чанков с настройками по умолчанию
pub fn plan_chunks(lines: &[ScriptLine], provider: &str) -> Vec<DubbingChunk> {
    plan_chunks_with(lines, provider, &PlannerConfig::default())
}

/// Планирование чанков
///
/// Тотальная функция без побочных эффектов: повторный вызов на тех же данных
/// даёт побитово одинаковые идентификаторы.
pub fn plan_chunks_with(lines: &[ScriptLine], provider: &str, config: &PlannerConfig) -> Vec<DubbingChunk> {
    let mut pending: Vec<PendingChunk> = Vec::new();
    let mut current: Option<PendingChunk> = None;

    for line in lines {
        if let Some(chunk) = current.as_mut() {
            if chunk.accepts(line, config) {
                chunk.push(line);
                continue;
            }
        }

        if let Some(done) = current.replace(PendingChunk::start(line)) {
            pending.push(done);
        }
    }
    pending.extend(current);

    let chunks: Vec<DubbingChunk> = pending.into_iter().map(|chunk| chunk.finalize(provider)).collect();

    debug!(
        "Planned {} chunks from {} lines for provider '{}'",
        chunks.len(),
        lines.len(),
        provider
    );
    chunks
}
