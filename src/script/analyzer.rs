//! Модуль для анализа временных меток реплик
//!
//! Метрики используются только для диагностики: оркестратор пишет их в лог
//! перед планированием.

use crate::script::ScriptLine;

/// Метрики временных меток реплик
#[derive(Debug, Clone, PartialEq)]
pub struct TimingMetrics {
    /// Средняя длительность реплики
    pub avg_duration: f64,
    /// Минимальная длительность реплики
    pub min_duration: f64,
    /// Максимальная длительность реплики
    pub max_duration: f64,
    /// Средний положительный интервал между репликами
    pub avg_gap: f64,
    /// Количество перекрывающихся соседних реплик
    pub overlaps: usize,
    /// Конец последней реплики
    pub total_span: f64,
}

/// Анализ временных меток реплик
pub fn analyze_line_timing(lines: &[ScriptLine]) -> TimingMetrics {
    if lines.is_empty() {
        return TimingMetrics {
            avg_duration: 0.0,
            min_duration: 0.0,
            max_duration: 0.0,
            avg_gap: 0.0,
            overlaps: 0,
            total_span: 0.0,
        };
    }

    let mut total_duration = 0.0;
    let mut min_duration = f64::MAX;
    let mut max_duration: f64 = 0.0;
    let mut total_gap = 0.0;
    let mut gap_count = 0;
    let mut overlaps = 0;
    let mut total_span: f64 = 0.0;

    for (i, line) in lines.iter().enumerate() {
        let duration = line.duration();

        total_duration += duration;
        min_duration = min_duration.min(duration);
        max_duration = max_duration.max(duration);
        total_span = total_span.max(line.end_time);

        if let Some(next) = lines.get(i + 1) {
            let gap = next.start_time - line.end_time;
            if gap > 0.0 {
                total_gap += gap;
                gap_count += 1;
            } else if gap < 0.0 {
                overlaps += 1;
            }
        }
    }

    TimingMetrics {
        avg_duration: total_duration / lines.len() as f64,
        min_duration,
        max_duration,
        avg_gap: if gap_count > 0 { total_gap / gap_count as f64 } else { 0.0 },
        overlaps,
        total_span,
    }
}
