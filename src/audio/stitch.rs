//! # Склейка таймлайна
//!
//! Чанки не конкатенируются, а **складываются** в общий буфер по абсолютным
//! смещениям. Так каждый чанк стоит ровно на своём плановом времени, сколько бы
//! ни "уплыли" предыдущие после подгонки, а небольшие наложения окон не
//! выбрасывают звук. Сведение это только линейное сложение плюс защита от клиппинга.

use log::{debug, info, warn};

use crate::audio::{AudioBuffer, WordTiming};
use crate::cache::SegmentSource;
use crate::chunk::{ChunkId, DubbingChunk};
use crate::config::MixConfig;

/// Положение чанка на таймлайне
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub chunk_id: ChunkId,
    /// Абсолютное время начала (секунды)
    pub start_time: f64,
}

impl Placement {
    pub fn new(chunk_id: ChunkId, start_time: f64) -> Self {
        Self { chunk_id, start_time }
    }
}

/// Положения всех чанков в порядке сценария
pub fn placements_for(chunks: &[DubbingChunk]) -> Vec<Placement> {
    chunks
        .iter()
        .map(|chunk| Placement::new(chunk.id.clone(), chunk.start_time))
        .collect()
}

/// Результат склейки
#[derive(Debug, Clone, PartialEq)]
pub struct StitchedTimeline {
    /// Сведённый буфер от нуля до конца последнего сегмента
    pub buffer: AudioBuffer,
    /// Пословные тайминги относительно начала таймлайна
    pub word_timings: Vec<WordTiming>,
    /// Чанки, попавшие в сведение
    pub placed: Vec<ChunkId>,
    /// Чанки без записи в кэше
    pub missing: Vec<ChunkId>,
    /// Чанки с несовместимым или повреждённым буфером
    pub skipped: Vec<ChunkId>,
    /// Коэффициент защиты от клиппинга (1.0, если не применялся)
    pub gain: f32,
}

/// Склейка с настройками сведения по умолчанию
pub fn stitch<S: SegmentSource + ?Sized>(placements: &[Placement], source: &S) -> Option<StitchedTimeline> {
    stitch_with(placements, source, &MixConfig::default())
}

/// Склеивает сегменты из кэша в один таймлайн.
///
/// Отсутствующие записи пропускаются: частичный таймлайн допустим (например,
/// предпросмотр посреди генерации). Если нет ни одного сегмента, возвращает
/// `None`: "нечего сводить" отличается от "сведена тишина".
pub fn stitch_with<S: SegmentSource + ?Sized>(
    placements: &[Placement],
    source: &S,
    config: &MixConfig,
) -> Option<StitchedTimeline> {
    let mut present = Vec::new();
    let mut missing = Vec::new();
    let mut skipped = Vec::new();

    for placement in placements {
        match source.segment(&placement.chunk_id) {
            Some(segment) => match segment.buffer.validate() {
                Ok(()) => present.push((placement, segment)),
                Err(e) => {
                    warn!("Skipping chunk {}: {}", placement.chunk_id, e);
                    skipped.push(placement.chunk_id.clone());
                }
            },
            None => missing.push(placement.chunk_id.clone()),
        }
    }

    let Some((_, first)) = present.first() else {
        debug!("Nothing to stitch: none of {} chunks has usable audio", placements.len());
        return None;
    };

    let sample_rate = first.buffer.sample_rate;
    let channels = first.buffer.channels;

    present.retain(|(placement, segment)| {
        let compatible = segment.buffer.sample_rate == sample_rate && segment.buffer.channels == channels;
        if !compatible {
            warn!(
                "Skipping chunk {}: {} Hz/{} ch does not match timeline {} Hz/{} ch",
                placement.chunk_id, segment.buffer.sample_rate, segment.buffer.channels, sample_rate, channels
            );
            skipped.push(placement.chunk_id.clone());
        }
        compatible
    });

    let offsets: Vec<usize> = present
        .iter()
        .map(|(placement, _)| (placement.start_time.max(0.0) * sample_rate as f64).round() as usize)
        .collect();

    let total_frames = present
        .iter()
        .zip(&offsets)
        .map(|((_, segment), offset)| offset + segment.buffer.frames())
        .max()
        .unwrap_or(0);

    let width = channels as usize;
    let mut mix = AudioBuffer::silence(total_frames, sample_rate, channels);
    let mut word_timings = Vec::new();
    let mut placed = Vec::with_capacity(present.len());

    for ((placement, segment), offset) in present.iter().zip(&offsets) {
        let start = offset * width;
        let target = &mut mix.samples[start..start + segment.buffer.samples.len()];
        for (out, &sample) in target.iter_mut().zip(&segment.buffer.samples) {
            *out += sample;
        }

        let shift = placement.start_time.max(0.0);
        word_timings.extend(segment.word_timings.iter().map(|timing| timing.shifted(shift)));
        placed.push(placement.chunk_id.clone());
    }

    word_timings.sort_by(|a, b| a.start.total_cmp(&b.start));

    let gain = mix.limit_peak(config.clip_ceiling);
    if gain < 1.0 {
        debug!("Mix peak above 1.0, scaled by {:.3}", gain);
    }

    info!(
        "Stitched {} segments into {:.3}s timeline ({} missing, {} skipped)",
        placed.len(),
        mix.duration(),
        missing.len(),
        skipped.len()
    );

    Some(StitchedTimeline {
        buffer: mix,
        word_timings,
        placed,
        missing,
        skipped,
        gain,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{FittedSegment, GenerationCache};
    use crate::chunk::fingerprint;

    fn segment(id: &ChunkId, samples: Vec<f32>, sample_rate: u32, words: &[(&str, f64, f64)]) -> FittedSegment {
        FittedSegment {
            chunk_id: id.clone(),
            buffer: AudioBuffer::mono(samples, sample_rate),
            word_timings: words
                .iter()
                .map(|&(word, start, end)| WordTiming {
                    word: word.to_string(),
                    start,
                    end,
                })
                .collect(),
            stretch_ratio: 1.0,
        }
    }

    fn id(n: u32) -> ChunkId {
        fingerprint("p", "A", &n.to_string(), n as f64, n as f64 + 1.0)
    }

    #[test]
    fn test_segments_added_at_offsets() {
        let mut cache = GenerationCache::new();
        cache.insert_if_absent(segment(&id(1), vec![0.25; 10], 10, &[("one", 0.0, 1.0)]));
        cache.insert_if_absent(segment(&id(2), vec![0.5; 10], 10, &[("two", 0.0, 0.5), ("three", 0.5, 1.0)]));

        let placements = vec![Placement::new(id(1), 0.0), Placement::new(id(2), 2.0)];
        let timeline = stitch(&placements, &cache).unwrap();

        assert_eq!(timeline.buffer.frames(), 30);
        assert_eq!(timeline.buffer.samples[5], 0.25);
        assert_eq!(timeline.buffer.samples[15], 0.0);
        assert_eq!(timeline.buffer.samples[25], 0.5);
        assert_eq!(timeline.gain, 1.0);

        let words: Vec<_> = timeline.word_timings.iter().map(|w| (w.word.as_str(), w.start)).collect();
        assert_eq!(words, vec![("one", 0.0), ("two", 2.0), ("three", 2.5)]);
    }

    #[test]
    fn test_overlap_is_summed() {
        let mut cache = GenerationCache::new();
        cache.insert_if_absent(segment(&id(1), vec![0.25; 10], 10, &[]));
        cache.insert_if_absent(segment(&id(2), vec![0.25; 10], 10, &[]));

        let placements = vec![Placement::new(id(1), 0.0), Placement::new(id(2), 0.5)];
        let timeline = stitch(&placements, &cache).unwrap();

        assert_eq!(timeline.buffer.frames(), 15);
        assert_eq!(timeline.buffer.samples[2], 0.25);
        assert_eq!(timeline.buffer.samples[7], 0.5);
        assert_eq!(timeline.buffer.samples[12], 0.25);
    }

    #[test]
    fn test_clipping_avoided() {
        let mut cache = GenerationCache::new();
        cache.insert_if_absent(segment(&id(1), vec![0.8; 10], 10, &[]));
        cache.insert_if_absent(segment(&id(2), vec![0.8; 10], 10, &[]));

        let placements = vec![Placement::new(id(1), 0.0), Placement::new(id(2), 0.0)];
        let timeline = stitch(&placements, &cache).unwrap();

        assert!(timeline.gain < 1.0);
        assert!((timeline.buffer.peak() - 0.95).abs() < 1e-6);
    }

    #[test]
    fn test_missing_entries_skipped() {
        let mut cache = GenerationCache::new();
        cache.insert_if_absent(segment(&id(1), vec![0.1; 10], 10, &[]));

        let placements = vec![Placement::new(id(1), 1.0), Placement::new(id(2), 5.0)];
        let timeline = stitch(&placements, &cache).unwrap();

        assert_eq!(timeline.buffer.frames(), 20);
        assert_eq!(timeline.placed, vec![id(1)]);
        assert_eq!(timeline.missing, vec![id(2)]);
    }

    #[test]
    fn test_no_segments_is_none() {
        let cache = GenerationCache::new();
        assert!(stitch(&[Placement::new(id(1), 0.0)], &cache).is_none());
        assert!(stitch(&[], &cache).is_none());
    }

    #[test]
    fn test_incompatible_format_skipped() {
        let mut cache = GenerationCache::new();
        cache.insert_if_absent(segment(&id(1), vec![0.1; 10], 10, &[]));
        cache.insert_if_absent(segment(&id(2), vec![0.1; 20], 20, &[("lost", 0.0, 1.0)]));

        let placements = vec![Placement::new(id(1), 0.0), Placement::new(id(2), 0.0)];
        let timeline = stitch(&placements, &cache).unwrap();

        assert_eq!(timeline.skipped, vec![id(2)]);
        assert!(timeline.word_timings.is_empty());
        assert_eq!(timeline.buffer.frames(), 10);
    }

    #[test]
    fn test_restitch_is_idempotent() {
        let mut cache = GenerationCache::new();
        cache.insert_if_absent(segment(&id(1), vec![0.3; 10], 10, &[("a", 0.0, 1.0)]));
        let placements = vec![Placement::new(id(1), 0.7)];

        let first = stitch(&placements, &cache).unwrap();
        let second = stitch(&placements, &cache).unwrap();
        assert_eq!(first, second);
    }
}
