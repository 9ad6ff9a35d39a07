//! Модуль для приёма готовых субтитров
//!
//! Разбор файлов SRT/VTT выполняется снаружи; сюда приходят уже готовые тройки
//! (начало, конец, текст), которые превращаются в реплики того же вида, что и
//! после парсинга сценария.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::ParserConfig;
use crate::script::parser::{clean_spoken_text, estimate_end, split_dialogue};
use crate::script::ScriptLine;

/// Структура для хранения субтитра
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtitle {
    /// Время начала субтитра (секунды)
    pub start_time: f64,
    /// Время окончания субтитра (секунды)
    pub end_time: f64,
    /// Текст субтитра
    pub text: String,
}

impl Subtitle {
    /// Создать новый экземпляр Subtitle
    pub fn new(start_time: f64, end_time: f64, text: impl Into<String>) -> Self {
        Self {
            start_time,
            end_time,
            text: text.into(),
        }
    }
}

impl From<(f64, f64, String)> for Subtitle {
    fn from((start_time, end_time, text): (f64, f64, String)) -> Self {
        Self::new(start_time, end_time, text)
    }
}

/// Преобразует субтитры в реплики.
///
/// Субтитр вида `Имя: текст` сохраняет говорящего, остальные приписываются
/// `config.default_speaker`. Многострочный текст склеивается в одну строку.
pub fn lines_from_cues(cues: &[Subtitle], config: &ParserConfig) -> Vec<ScriptLine> {
    let mut lines = Vec::with_capacity(cues.len());

    for cue in cues {
        let text = cue.text.split_whitespace().collect::<Vec<_>>().join(" ");

        let (speaker_name, spoken_text) = match split_dialogue(&text) {
            Some(dialogue) => dialogue,
            None => (config.default_speaker.clone(), clean_spoken_text(&text)),
        };

        if spoken_text.is_empty() {
            continue;
        }

        let start_time = if cue.start_time.is_finite() { cue.start_time.max(0.0) } else { 0.0 };
        let end_time = if cue.end_time.is_finite() && cue.end_time > start_time {
            cue.end_time
        } else {
            estimate_end(start_time, &spoken_text, config)
        };

        lines.push(ScriptLine {
            original_text: cue.text.clone(),
            speaker_name,
            spoken_text,
            start_time,
            end_time,
        });
    }

    debug!("Converted {} of {} cues into dialogue lines", lines.len(), cues.len());
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cues_keep_windows() {
        let cues = vec![
            Subtitle::new(1.0, 2.5, "Anna: Good morning"),
            Subtitle::new(3.0, 4.0, "How are you?"),
        ];
        let lines = lines_from_cues(&cues, &ParserConfig::default());

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].speaker_name, "Anna");
        assert_eq!(lines[0].spoken_text, "Good morning");
        assert_eq!(lines[0].start_time, 1.0);
        assert_eq!(lines[0].end_time, 2.5);

        assert_eq!(lines[1].speaker_name, "Narrator");
        assert_eq!(lines[1].spoken_text, "How are you?");
    }

    #[test]
    fn test_cue_with_broken_window_gets_estimate() {
        let cues = vec![Subtitle::new(5.0, 5.0, "Short line")];
        let lines = lines_from_cues(&cues, &ParserConfig::default());
        assert_eq!(lines[0].end_time, 6.5);
    }

    #[test]
    fn test_direction_only_cue_dropped() {
        let cues = vec![
            Subtitle::from((0.0, 1.0, "[music]".to_string())),
            Subtitle::new(1.0, 2.0, "Line\nsplit across rows"),
        ];
        let lines = lines_from_cues(&cues, &ParserConfig::default());

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].spoken_text, "Line split across rows");
    }
}
