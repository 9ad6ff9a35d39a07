//! # Подгонка длительности (SOLA)
//!
//! Synchronized Overlap-Add: изменение длительности аудио без изменения высоты тона.
//! Вход режется на зёрна ("последовательности", ~20 мс); каждое следующее зерно
//! ищется в окне ~10 мс вокруг номинальной позиции так, чтобы его начало лучше
//! всего совпадало по фазе с хвостом уже записанного выхода, и вклеивается
//! линейным кроссфейдом длиной ~8 мс.
//!
//! Фазовое выравнивание здесь обязательно: без него на стыках появляются щелчки
//! и провалы громкости из-за взаимного гашения.
//!
//! ## Пример
//!
//! ```rust,ignore
//! let rendered = AudioBuffer::mono(samples, 24000);
//! let fitted = fit_duration(&rendered, 3.5)?;
//! assert!((fitted.buffer.duration() - 3.5).abs() < 0.05);
//! ```

use log::{debug, trace};

use crate::audio::AudioBuffer;
use crate::config::FitConfig;
use crate::error::{DubSyncError, Result};

/// Результат подгонки
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    /// Подогнанный буфер
    pub buffer: AudioBuffer,
    /// Коэффициент `D_in / D_target` (>1 ускорение, <1 замедление)
    pub ratio: f64,
}

/// Размеры окон SOLA в семплах
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SolaWindows {
    sequence: usize,
    overlap: usize,
    seek: usize,
}

impl SolaWindows {
    fn new(sample_rate: u32, config: &FitConfig) -> Self {
        let to_samples = |ms: f64| (ms * sample_rate as f64 / 1000.0).round() as usize;

        let sequence = to_samples(config.sequence_ms).max(2);
        let overlap = to_samples(config.overlap_ms).clamp(1, sequence - 1);
        let seek = to_samples(config.seek_ms).max(1);

        Self {
            sequence,
            overlap,
            seek,
        }
    }

    /// Шаг выхода между соседними зёрнами
    fn hop(&self) -> usize {
        self.sequence - self.overlap
    }
}

/// Подгонка длительности с настройками по умолчанию
pub fn fit_duration(buffer: &AudioBuffer, target_seconds: f64) -> Result<FitResult> {
    fit_duration_with(buffer, target_seconds, &FitConfig::default())
}

/// Подгоняет буфер под целевую длительность с сохранением высоты тона.
///
/// Если длительности отличаются меньше чем на `config.tolerance`, вход
/// возвращается без изменений с коэффициентом 1.0. Иначе каждый канал
/// обрабатывается SOLA независимо, результат содержит ровно
/// `floor(input_frames / ratio)` кадров.
///
/// # Ошибки
///
/// * `DubSyncError::InvalidTargetDuration`: целевая длительность не положительна
/// * `DubSyncError::EmptyBuffer`: во входном буфере нет семплов
/// * `DubSyncError::InvalidFormat`: нулевая частота или число каналов
pub fn fit_duration_with(buffer: &AudioBuffer, target_seconds: f64, config: &FitConfig) -> Result<FitResult> {
    if !target_seconds.is_finite() || target_seconds <= 0.0 {
        return Err(DubSyncError::InvalidTargetDuration(target_seconds));
    }
    buffer.validate()?;
    if buffer.is_empty() {
        return Err(DubSyncError::EmptyBuffer("cannot fit an empty buffer".to_string()));
    }

    let input_duration = buffer.duration();
    if (input_duration - target_seconds).abs() < config.tolerance {
        trace!(
            "Fit skipped: {:.3}s already within {:.3}s of {:.3}s",
            input_duration,
            config.tolerance,
            target_seconds
        );
        return Ok(FitResult {
            buffer: buffer.clone(),
            ratio: 1.0,
        });
    }

    let ratio = input_duration / target_seconds;
    let output_frames = (buffer.frames() as f64 / ratio).floor() as usize;
    let windows = SolaWindows::new(buffer.sample_rate, config);

    debug!(
        "SOLA fit {:.3}s -> {:.3}s (ratio {:.3}, {} ch, seq/ovl/seek {}/{}/{} samples)",
        input_duration,
        target_seconds,
        ratio,
        buffer.channels,
        windows.sequence,
        windows.overlap,
        windows.seek
    );

    let channels = buffer
        .to_channels()
        .iter()
        .map(|channel| stretch_channel(channel, ratio, output_frames, windows))
        .collect();

    let mut fitted = AudioBuffer::from_channels(channels, buffer.sample_rate);
    fitted.clamp_in_place();

    Ok(FitResult { buffer: fitted, ratio })
}

/// SOLA для одного канала
fn stretch_channel(input: &[f32], ratio: f64, output_frames: usize, windows: SolaWindows) -> Vec<f32> {
    let SolaWindows {
        sequence,
        overlap,
        seek,
    } = windows;
    let hop = windows.hop();

    // Короче одного зерна: копируем/обрезаем и добиваем тишиной
    if input.len() < sequence {
        let mut output = input[..input.len().min(output_frames)].to_vec();
        output.resize(output_frames, 0.0);
        return output;
    }

    let mut output = vec![0.0f32; output_frames + sequence];
    output[..sequence].copy_from_slice(&input[..sequence]);

    // Номинальный шаг по входу: выходной шаг, умноженный на коэффициент.
    // Номинальная позиция считается от начала, поэтому сдвиги поиска не накапливаются.
    let input_hop = hop as f64 * ratio;
    let half_seek = seek / 2;
    let last_input_start = input.len() - sequence;

    let mut out_pos = hop;
    let mut step = 1usize;

    // Когда номинальная позиция уходит за конец входа, окно поиска прижимается
    // к последнему зерну: выход заполняется до конца без обрыва в тишину.
    while out_pos + sequence <= output.len() {
        let nominal = (step as f64 * input_hop).round() as usize;
        let hi = (nominal + half_seek).min(last_input_start);
        let lo = nominal.saturating_sub(half_seek).min(hi);

        let best = best_offset(&output[out_pos..out_pos + overlap], input, lo, hi, nominal);

        for i in 0..overlap {
            let fade_in = i as f32 / overlap as f32;
            output[out_pos + i] = output[out_pos + i] * (1.0 - fade_in) + input[best + i] * fade_in;
        }
        output[out_pos + overlap..out_pos + sequence].copy_from_slice(&input[best + overlap..best + sequence]);

        out_pos += hop;
        step += 1;
    }

    output.truncate(output_frames);
    output
}

/// Ищет смещение с максимальной взаимной корреляцией с хвостом выхода.
///
/// При равенстве выбирается смещение ближе к номинальному (важно для тишины).
fn best_offset(tail: &[f32], input: &[f32], lo: usize, hi: usize, nominal: usize) -> usize {
    let mut best = lo;
    let mut best_corr = f64::NEG_INFINITY;

    for offset in lo..=hi {
        let corr: f64 = tail
            .iter()
            .zip(&input[offset..offset + tail.len()])
            .map(|(&a, &b)| a as f64 * b as f64)
            .sum();

        let closer = offset.abs_diff(nominal) < best.abs_diff(nominal);
        if corr > best_corr || (corr == best_corr && closer) {
            best_corr = corr;
            best = offset;
        }
    }

    best
}
