//! Дисковое хранилище кэша
//!
//! Каждая запись хранится парой файлов в директории кэша:
//! - `<chunk_id>.pcm`: семплы f32 little-endian, каналы чередуются;
//! - `<chunk_id>.json`: метаданные [`SegmentMeta`] с контрольной суммой блоба.
//!
//! Оба файла пишутся через временный файл и атомарное переименование, поэтому
//! оборванная запись не оставляет полузаписанный сегмент под настоящим именем.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::audio::{AudioBuffer, WordTiming};
use crate::cache::{FittedSegment, GenerationCache};
use crate::chunk::ChunkId;
use crate::config::DubSyncConfig;
use crate::error::{DubSyncError, Result};

const BLOB_EXTENSION: &str = "pcm";
const META_EXTENSION: &str = "json";

/// Метаданные записи кэша
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentMeta {
    pub chunk_id: ChunkId,
    pub sample_rate: u32,
    pub channels: u16,
    /// Количество кадров в блобе
    pub frames: usize,
    pub stretch_ratio: f64,
    pub word_timings: Vec<WordTiming>,
    /// MD5 блоба в hex
    pub checksum: String,
    pub created_at: DateTime<Utc>,
}

/// Разложить сегмент на метаданные и блоб
pub fn encode(segment: &FittedSegment) -> (SegmentMeta, Bytes) {
    let blob = segment.buffer.to_le_bytes();
    let meta = SegmentMeta {
        chunk_id: segment.chunk_id.clone(),
        sample_rate: segment.buffer.sample_rate,
        channels: segment.buffer.channels,
        frames: segment.buffer.frames(),
        stretch_ratio: segment.stretch_ratio,
        word_timings: segment.word_timings.clone(),
        checksum: format!("{:x}", md5::compute(&blob)),
        created_at: Utc::now(),
    };
    (meta, blob)
}

/// Собрать сегмент обратно, проверив контрольную сумму и длину блоба
pub fn decode(meta: SegmentMeta, blob: &[u8]) -> Result<FittedSegment> {
    let checksum = format!("{:x}", md5::compute(blob));
    if checksum != meta.checksum {
        return Err(DubSyncError::CacheCorrupted(format!(
            "{}: checksum mismatch (expected {}, got {})",
            meta.chunk_id, meta.checksum, checksum
        )));
    }

    let buffer = AudioBuffer::from_le_bytes(blob, meta.sample_rate, meta.channels)
        .map_err(|e| DubSyncError::CacheCorrupted(format!("{}: {}", meta.chunk_id, e)))?;
    if buffer.frames() != meta.frames {
        return Err(DubSyncError::CacheCorrupted(format!(
            "{}: expected {} frames, blob has {}",
            meta.chunk_id,
            meta.frames,
            buffer.frames()
        )));
    }

    Ok(FittedSegment {
        chunk_id: meta.chunk_id,
        buffer,
        word_timings: meta.word_timings,
        stretch_ratio: meta.stretch_ratio,
    })
}

/// Кэш сегментов на диске
#[derive(Debug, Clone)]
pub struct DiskCacheStore {
    /// Директория для кэша
    cache_dir: PathBuf,
    /// Максимальный размер кэша в байтах
    max_size: Option<u64>,
}

impl DiskCacheStore {
    /// Открыть хранилище, создав директорию при необходимости
    pub fn new(cache_dir: impl Into<PathBuf>, max_size: Option<u64>) -> Result<Self> {
        let cache_dir = cache_dir.into();
        if !cache_dir.exists() {
            fs::create_dir_all(&cache_dir)?;
        }

        Ok(Self { cache_dir, max_size })
    }

    /// Хранилище по настройкам; без `cache_dir` используется временная директория
    pub fn from_config(config: &DubSyncConfig) -> Result<Self> {
        let cache_dir = match &config.cache_dir {
            Some(dir) => PathBuf::from(dir),
            None => std::env::temp_dir().join("dub-sync-cache"),
        };
        Self::new(cache_dir, config.max_cache_size)
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn blob_path(&self, id: &ChunkId) -> PathBuf {
        self.cache_dir.join(format!("{}.{}", id, BLOB_EXTENSION))
    }

    fn meta_path(&self, id: &ChunkId) -> PathBuf {
        self.cache_dir.join(format!("{}.{}", id, META_EXTENSION))
    }

    /// Записать файл атомарно
    fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<()> {
        let mut file = NamedTempFile::new_in(&self.cache_dir)?;
        file.write_all(data)?;
        file.flush()?;
        file.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Сохранить сегмент.
    ///
    /// Блоб пишется раньше метаданных: запись без метаданных не видна при загрузке.
    pub fn save(&self, segment: &FittedSegment) -> Result<()> {
        let (meta, blob) = encode(segment);
        let meta_json = serde_json::to_vec_pretty(&meta)?;

        self.write_atomic(&self.blob_path(&segment.chunk_id), &blob)?;
        self.write_atomic(&self.meta_path(&segment.chunk_id), &meta_json)?;
        debug!("Saved {} ({} bytes) to disk cache", segment.chunk_id, blob.len());

        self.check_cache_size(&segment.chunk_id)
    }

    /// Сохранить все записи кэша в памяти
    pub fn save_all(&self, cache: &GenerationCache) -> Result<usize> {
        let mut saved = 0;
        for (_, segment) in cache.iter() {
            self.save(segment)?;
            saved += 1;
        }
        Ok(saved)
    }

    /// Загрузить одну запись; `Ok(None)`, если её нет
    pub fn load(&self, id: &ChunkId) -> Result<Option<FittedSegment>> {
        let meta_path = self.meta_path(id);
        if !meta_path.exists() {
            return Ok(None);
        }

        let meta: SegmentMeta = serde_json::from_slice(&fs::read(&meta_path)?)
            .map_err(|e| DubSyncError::CacheCorrupted(format!("{}: invalid metadata: {}", id, e)))?;
        if &meta.chunk_id != id {
            return Err(DubSyncError::CacheCorrupted(format!(
                "{}: metadata belongs to {}",
                id, meta.chunk_id
            )));
        }

        let blob = fs::read(self.blob_path(id))
            .map_err(|e| DubSyncError::CacheCorrupted(format!("{}: missing audio blob: {}", id, e)))?;

        decode(meta, &blob).map(Some)
    }

    /// Идентификаторы всех записей с метаданными
    pub fn ids(&self) -> Result<Vec<ChunkId>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.cache_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(META_EXTENSION) {
                continue;
            }
            if let Some(id) = path.file_stem().and_then(|s| s.to_str()).and_then(ChunkId::parse) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Загрузить весь кэш. Повреждённые записи пропускаются с предупреждением.
    pub fn load_all(&self) -> Result<GenerationCache> {
        let mut cache = GenerationCache::new();
        let mut skipped = 0;

        for id in self.ids()? {
            match self.load(&id) {
                Ok(Some(segment)) => {
                    cache.insert_if_absent(segment);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Skipping cache entry {}: {}", id, e);
                    skipped += 1;
                }
            }
        }

        info!(
            "Loaded {} cache entries from {} ({} skipped)",
            cache.len(),
            self.cache_dir.display(),
            skipped
        );
        Ok(cache)
    }

    /// Удалить запись; `true`, если что-то было удалено
    pub fn remove(&self, id: &ChunkId) -> Result<bool> {
        let mut removed = false;
        for path in [self.meta_path(id), self.blob_path(id)] {
            if path.exists() {
                fs::remove_file(path)?;
                removed = true;
            }
        }
        Ok(removed)
    }

    /// Очистить кэш
    pub fn clear(&self) -> Result<()> {
        for file in fs::read_dir(&self.cache_dir)? {
            let file = file?;
            if file.file_type()?.is_file() {
                fs::remove_file(file.path())?;
            }
        }
        Ok(())
    }

    /// Суммарный размер файлов кэша в байтах
    pub fn size_on_disk(&self) -> Result<u64> {
        let mut total = 0;
        for entry in fs::read_dir(&self.cache_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                total += entry.metadata()?.len();
            }
        }
        Ok(total)
    }

    /// Проверить размер кэша и удалить самые старые записи, кроме `keep`
    fn check_cache_size(&self, keep: &ChunkId) -> Result<()> {
        let Some(max_size) = self.max_size else {
            return Ok(());
        };

        let mut total_size = self.size_on_disk()?;
        if total_size <= max_size {
            return Ok(());
        }

        let mut entries: Vec<(ChunkId, SystemTime, u64)> = Vec::new();
        for id in self.ids()? {
            if &id == keep {
                continue;
            }
            let meta = fs::metadata(self.meta_path(&id))?;
            let blob_size = fs::metadata(self.blob_path(&id)).map(|m| m.len()).unwrap_or(0);
            entries.push((id, meta.modified()?, meta.len() + blob_size));
        }

        // От старых к новым
        entries.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

        for (id, _, size) in entries {
            if total_size <= max_size {
                break;
            }
            self.remove(&id)?;
            total_size = total_size.saturating_sub(size);
            debug!("Evicted {} from disk cache", id);
        }

        Ok(())
    }
}
