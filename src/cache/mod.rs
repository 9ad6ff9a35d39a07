//! Кэш сгенерированных сегментов
//!
//! Ключ: отпечаток чанка, значение: подогнанный по длительности буфер вместе
//! с пословными таймингами. Запись пишется целиком или не пишется вовсе:
//! частично сгенерированных сегментов в кэше не бывает.

pub mod store;

use std::collections::HashMap;

use log::debug;

use crate::audio::{AudioBuffer, WordTiming};
use crate::chunk::{ChunkId, DubbingChunk};

pub use store::{DiskCacheStore, SegmentMeta};

/// Готовый сегмент: аудио, подогнанное под окно чанка
#[derive(Debug, Clone, PartialEq)]
pub struct FittedSegment {
    pub chunk_id: ChunkId,
    pub buffer: AudioBuffer,
    /// Тайминги слов относительно начала чанка
    pub word_timings: Vec<WordTiming>,
    /// Коэффициент растяжения, применённый при подгонке
    pub stretch_ratio: f64,
}

impl FittedSegment {
    pub fn duration(&self) -> f64 {
        self.buffer.duration()
    }
}

/// Источник сегментов для склейки таймлайна
pub trait SegmentSource {
    fn segment(&self, id: &ChunkId) -> Option<&FittedSegment>;
}

impl SegmentSource for HashMap<ChunkId, FittedSegment> {
    fn segment(&self, id: &ChunkId) -> Option<&FittedSegment> {
        self.get(id)
    }
}

/// Кэш генерации в памяти
#[derive(Debug, Clone, Default)]
pub struct GenerationCache {
    entries: HashMap<ChunkId, FittedSegment>,
}

impl GenerationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &ChunkId) -> Option<&FittedSegment> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &ChunkId) -> bool {
        self.entries.contains_key(id)
    }

    /// Записать сегмент, если записи с таким ключом ещё нет.
    ///
    /// Возвращает `false`, если запись уже была (и осталась нетронутой).
    pub fn insert_if_absent(&mut self, segment: FittedSegment) -> bool {
        if self.entries.contains_key(&segment.chunk_id) {
            return false;
        }
        self.entries.insert(segment.chunk_id.clone(), segment);
        true
    }

    /// Перезаписать сегмент (принудительная перегенерация)
    pub fn replace(&mut self, segment: FittedSegment) -> Option<FittedSegment> {
        self.entries.insert(segment.chunk_id.clone(), segment)
    }

    pub fn remove(&mut self, id: &ChunkId) -> Option<FittedSegment> {
        self.entries.remove(id)
    }

    /// Удалить записи, которых нет в текущем плане.
    ///
    /// Возвращает количество удалённых записей.
    pub fn retain_planned(&mut self, chunks: &[DubbingChunk]) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|id, _| chunks.iter().any(|chunk| &chunk.id == id));
        let dropped = before - self.entries.len();
        if dropped > 0 {
            debug!("Dropped {} stale cache entries", dropped);
        }
        dropped
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ChunkId, &FittedSegment)> {
        self.entries.iter()
    }
}

impl SegmentSource for GenerationCache {
    fn segment(&self, id: &ChunkId) -> Option<&FittedSegment> {
        self.get(id)
    }
}

impl FromIterator<FittedSegment> for GenerationCache {
    fn from_iter<I: IntoIterator<Item = FittedSegment>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|segment| (segment.chunk_id.clone(), segment))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{fingerprint, plan_chunks};
    use crate::script::parse_script;

    fn segment(id: &ChunkId, value: f32) -> FittedSegment {
        FittedSegment {
            chunk_id: id.clone(),
            buffer: AudioBuffer::mono(vec![value; 4], 8000),
            word_timings: Vec::new(),
            stretch_ratio: 1.0,
        }
    }

    #[test]
    fn test_insert_is_write_once() {
        let id = fingerprint("p", "A", "hello", 0.0, 1.0);
        let mut cache = GenerationCache::new();

        assert!(cache.insert_if_absent(segment(&id, 0.1)));
        assert!(!cache.insert_if_absent(segment(&id, 0.9)));
        assert_eq!(cache.get(&id).unwrap().buffer.samples[0], 0.1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_replace_overwrites() {
        let id = fingerprint("p", "A", "hello", 0.0, 1.0);
        let mut cache = GenerationCache::new();
        cache.insert_if_absent(segment(&id, 0.1));

        let previous = cache.replace(segment(&id, 0.9));
        assert_eq!(previous.unwrap().buffer.samples[0], 0.1);
        assert_eq!(cache.get(&id).unwrap().buffer.samples[0], 0.9);
    }

    #[test]
    fn test_retain_planned() {
        let chunks = plan_chunks(&parse_script("A: one\nB: two"), "p");
        let stale = fingerprint("p", "C", "gone", 0.0, 1.0);

        let mut cache: GenerationCache = chunks.iter().map(|chunk| segment(&chunk.id, 0.2)).collect();
        cache.insert_if_absent(segment(&stale, 0.3));
        assert_eq!(cache.len(), 3);

        assert_eq!(cache.retain_planned(&chunks), 1);
        assert!(!cache.contains(&stale));
        assert!(chunks.iter().all(|chunk| cache.contains(&chunk.id)));
    }

    #[test]
    fn test_remove_and_empty() {
        let id = fingerprint("p", "A", "x", 0.0, 1.0);
        let mut cache = GenerationCache::new();
        assert!(cache.is_empty());

        cache.insert_if_absent(segment(&id, 0.5));
        assert!(cache.remove(&id).is_some());
        assert!(cache.is_empty());
        assert!(cache.segment(&id).is_none());
    }
}
