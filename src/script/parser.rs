//! Модуль для парсинга сценария
//!
//! Каждая непустая строка сценария сопоставляется с тремя формами по приоритету:
//!
//! 1. `[start -> end] Говорящий: текст` (явное окно);
//! 2. `[start] Говорящий: текст` (только начало);
//! 3. `Говорящий: текст` (без времени).
//!
//! Парсер никогда не возвращает ошибку: нераспознанная метка времени заменяется
//! курсором, строки без двоеточия считаются ремарками и пропускаются.

use lazy_static::lazy_static;
use log::{debug, trace};
use regex::Regex;

use crate::config::ParserConfig;
use crate::script::ScriptLine;

lazy_static! {
    static ref WINDOW_RE: Regex = Regex::new(r"^\[([^\]]*?)->([^\]]*)\]\s*(.*)$").unwrap();
    static ref START_RE: Regex = Regex::new(r"^\[([^\]]*)\]\s*(.*)$").unwrap();
    static ref TIMESTAMP_RE: Regex = Regex::new(r"^(\d{1,2}):(\d{2}):(\d{2})(?:\.(\d{1,3}))?$").unwrap();
    static ref STAGE_DIRECTION_RE: Regex = Regex::new(r"\[[^\]]*\]").unwrap();
}

/// Парсинг сценария с настройками по умолчанию
pub fn parse_script(text: &str) -> Vec<ScriptLine> {
    parse_script_with(text, &ParserConfig::default())
}

/// Парсинг сценария
///
/// Возвращает реплики в порядке следования в тексте. Чистая функция от входа.
pub fn parse_script_with(text: &str, config: &ParserConfig) -> Vec<ScriptLine> {
    let mut lines = Vec::new();
    let mut cursor = 0.0_f64;

    for raw in text.lines() {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }

        let (start, end, content) = split_timing(trimmed);

        let Some((speaker_name, spoken_text)) = split_dialogue(content) else {
            trace!("Skipping scene direction: {}", trimmed);
            continue;
        };

        let start_time = start.unwrap_or(cursor);
        let end_time = match end {
            Some(end) if end > start_time => end,
            _ => estimate_end(start_time, &spoken_text, config),
        };

        cursor = cursor.max(end_time);

        lines.push(ScriptLine {
            original_text: trimmed.to_string(),
            speaker_name,
            spoken_text,
            start_time,
            end_time,
        });
    }

    debug!("Parsed {} dialogue lines, timeline cursor at {:.3}s", lines.len(), cursor);
    lines
}

/// Отделяет метки времени от содержимого строки.
///
/// Нераспознанная метка даёт `None` вместо времени, но скобки всё равно снимаются.
fn split_timing(line: &str) -> (Option<f64>, Option<f64>, &str) {
    if let Some(caps) = WINDOW_RE.captures(line) {
        let start = caps.get(1).and_then(|m| parse_timestamp(m.as_str()));
        let end = caps.get(2).and_then(|m| parse_timestamp(m.as_str()));
        let content = caps.get(3).map_or("", |m| m.as_str());
        return (start, end, content);
    }

    if let Some(caps) = START_RE.captures(line) {
        let start = caps.get(1).and_then(|m| parse_timestamp(m.as_str()));
        let content = caps.get(2).map_or("", |m| m.as_str());
        return (start, None, content);
    }

    (None, None, line)
}

/// Парсинг строки времени в формате HH:MM:SS[.mmm]
pub(crate) fn parse_timestamp(token: &str) -> Option<f64> {
    let caps = TIMESTAMP_RE.captures(token.trim())?;

    let hours = caps[1].parse::<u64>().ok()?;
    let minutes = caps[2].parse::<u64>().ok()?;
    let seconds = caps[3].parse::<u64>().ok()?;
    if minutes >= 60 || seconds >= 60 {
        return None;
    }

    let millis = match caps.get(4) {
        Some(fraction) => {
            let digits = fraction.as_str();
            let value = digits.parse::<u64>().ok()?;
            match digits.len() {
                1 => value * 100,
                2 => value * 10,
                _ => value,
            }
        }
        None => 0,
    };

    let total_ms = hours * 3_600_000 + minutes * 60_000 + seconds * 1000 + millis;
    Some(total_ms as f64 / 1000.0)
}

/// Делит содержимое на говорящего и произносимый текст.
///
/// `None` для ремарок: нет двоеточия, пустое имя или пустой текст после удаления `[...]`.
pub(crate) fn split_dialogue(content: &str) -> Option<(String, String)> {
    let (speaker, rest) = content.split_once(':')?;

    let speaker = speaker.trim();
    if speaker.is_empty() {
        return None;
    }

    let spoken = clean_spoken_text(rest);
    if spoken.is_empty() {
        return None;
    }

    Some((speaker.to_string(), spoken))
}

/// Удаляет ремарки в квадратных скобках и схлопывает пробелы
pub(crate) fn clean_spoken_text(text: &str) -> String {
    let without_directions = STAGE_DIRECTION_RE.replace_all(text, " ");
    without_directions.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Оценка конца реплики без явного окна
pub(crate) fn estimate_end(start_time: f64, spoken_text: &str, config: &ParserConfig) -> f64 {
    let words = spoken_text.split_whitespace().count() as f64;
    start_time + config.min_estimated_duration.max(words * config.seconds_per_word)
}
