//! Оркестрация дубляжа
//!
//! Связывает этапы: разбор сценария, планирование чанков, синтез с подгонкой
//! длительности и склейку. Генерация идёт по одному чанку в порядке сценария;
//! сигнал отмены проверяется только между чанками, начатая подгонка всегда
//! доводится до конца.

pub mod backend;

use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use crate::audio::{
    fit_duration_with, placements_for, stitch_with, CharProportionalEstimator, StitchedTimeline, WordTimingEstimator,
};
use crate::cache::{DiskCacheStore, FittedSegment, GenerationCache, SegmentSource};
use crate::chunk::{plan_chunks_with, ChunkId, DubbingChunk};
use crate::config::DubSyncConfig;
use crate::error::{DubSyncError, Result};
use crate::progress::{ProcessStep, ProgressObserver, ProgressReporter, ProgressTracker};
use crate::script::{analyze_line_timing, lines_from_cues, parse_script_with, ScriptLine, Subtitle};

pub use backend::{SpeechBackend, SynthesisRequest};

/// Параметры прохода генерации
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Перегенерировать даже закэшированные чанки
    pub force: bool,
}

/// Итог прохода генерации
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationReport {
    /// Синтезированы в этом проходе
    pub generated: Vec<ChunkId>,
    /// Взяты из кэша
    pub reused: Vec<ChunkId>,
    /// Ошибки синтеза или подгонки; записи кэша не тронуты
    pub failed: Vec<(ChunkId, String)>,
    /// Сегменты есть в памяти, но не записаны на диск
    pub persist_failed: Vec<(ChunkId, String)>,
    /// Проход остановлен сигналом отмены
    pub cancelled: bool,
}

impl GenerationReport {
    /// Все чанки плана обработаны без ошибок
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.failed.is_empty()
    }

    /// Превратить отчёт в ошибку, если проход отменён или есть сбои
    pub fn into_result(self) -> Result<Self> {
        if self.cancelled {
            return Err(DubSyncError::Cancelled);
        }
        if let Some((id, message)) = self.failed.first() {
            return Err(DubSyncError::Synthesis(format!(
                "{} of {} chunks failed, first {}: {}",
                self.failed.len(),
                self.failed.len() + self.generated.len() + self.reused.len(),
                id,
                message
            )));
        }
        Ok(self)
    }
}

/// Основная структура для работы с библиотекой
pub struct DubSync {
    config: DubSyncConfig,
    progress_tracker: Option<ProgressTracker>,
    estimator: Box<dyn WordTimingEstimator>,
    store: Option<DiskCacheStore>,
}

impl DubSync {
    pub fn new(config: DubSyncConfig) -> Self {
        Self {
            config,
            progress_tracker: None,
            estimator: Box::new(CharProportionalEstimator),
            store: None,
        }
    }

    pub fn with_progress_reporter(config: DubSyncConfig, reporter: Box<dyn ProgressReporter>) -> Self {
        let mut dub_sync = Self::new(config);
        dub_sync.progress_tracker = Some(ProgressTracker::with_reporter(reporter));
        dub_sync
    }

    /// Заменить оценщик пословных таймингов
    pub fn with_estimator(mut self, estimator: Box<dyn WordTimingEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    /// Дублировать сгенерированные сегменты на диск
    pub fn with_disk_cache(mut self, store: DiskCacheStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Добавить наблюдателя прогресса
    pub fn add_observer(&mut self, observer: Box<dyn ProgressObserver>) -> usize {
        self.progress_tracker
            .get_or_insert_with(ProgressTracker::new)
            .add_observer(observer)
    }

    pub fn config(&self) -> &DubSyncConfig {
        &self.config
    }

    fn step(&self, step: ProcessStep) {
        if let Some(t) = &self.progress_tracker {
            t.set_step(step);
        }
    }

    fn progress(&self, progress: f32, details: impl FnOnce() -> String) {
        if let Some(t) = &self.progress_tracker {
            t.update_step_progress(progress, Some(details()));
        }
    }

    /// Разобрать сценарий и спланировать чанки
    pub fn plan(&self, script: &str, provider: &str) -> Vec<DubbingChunk> {
        self.step(ProcessStep::ScriptParsing);
        let lines = parse_script_with(script, &self.config.parser);
        self.progress(100.0, || format!("Реплик: {}", lines.len()));

        self.plan_lines(&lines, provider)
    }

    /// Спланировать чанки по субтитрам
    pub fn plan_cues(&self, cues: &[Subtitle], provider: &str) -> Vec<DubbingChunk> {
        self.step(ProcessStep::ScriptParsing);
        let lines = lines_from_cues(cues, &self.config.parser);
        self.progress(100.0, || format!("Реплик: {}", lines.len()));

        self.plan_lines(&lines, provider)
    }

    fn plan_lines(&self, lines: &[ScriptLine], provider: &str) -> Vec<DubbingChunk> {
        let metrics = analyze_line_timing(lines);
        debug!(
            "Script timing: avg {:.2}s, gaps {:.2}s, {} overlaps, span {:.2}s",
            metrics.avg_duration, metrics.avg_gap, metrics.overlaps, metrics.total_span
        );

        self.step(ProcessStep::ChunkPlanning);
        let chunks = plan_chunks_with(lines, provider, &self.config.planner);
        self.progress(100.0, || format!("Чанков: {}", chunks.len()));

        info!("Planned {} chunks from {} lines", chunks.len(), lines.len());
        chunks
    }

    /// Загрузить кэш с диска (пустой, если дисковый кэш не подключён)
    pub fn load_cache(&self) -> Result<GenerationCache> {
        match &self.store {
            Some(store) => store.load_all(),
            None => Ok(GenerationCache::new()),
        }
    }

    /// Синтезировать и подогнать один чанк
    async fn produce_segment(&self, chunk: &DubbingChunk, backend: &dyn SpeechBackend) -> Result<FittedSegment> {
        let target = chunk.duration();
        if !(target > 0.0) || !target.is_finite() {
            return Err(DubSyncError::InvalidTargetDuration(target));
        }

        let text = chunk.spoken_text();
        let request = SynthesisRequest {
            voice: self.config.voice_for(&chunk.speaker_name).to_string(),
            text: text.clone(),
            credentials: self.config.credentials.clone(),
        };

        let rendered = backend.synthesize(&request).await?;
        let fitted = fit_duration_with(&rendered, target, &self.config.fit)?;
        let word_timings = self.estimator.estimate(&text, fitted.buffer.duration());

        debug!(
            "{}: rendered {:.3}s, fitted to {:.3}s (ratio {:.3})",
            chunk.id,
            rendered.duration(),
            fitted.buffer.duration(),
            fitted.ratio
        );

        Ok(FittedSegment {
            chunk_id: chunk.id.clone(),
            buffer: fitted.buffer,
            word_timings,
            stretch_ratio: fitted.ratio,
        })
    }

    fn persist(&self, segment: &FittedSegment) -> Result<()> {
        match &self.store {
            Some(store) => store.save(segment).map_err(|e| {
                warn!("Failed to persist {}: {}", segment.chunk_id, e);
                e
            }),
            None => Ok(()),
        }
    }

    /// Проход генерации по плану.
    ///
    /// Закэшированные чанки пропускаются (если не задан `force`). Ошибка одного
    /// чанка не прерывает проход: она попадает в отчёт, запись кэша не меняется.
    pub async fn generate(
        &self,
        chunks: &[DubbingChunk],
        backend: &dyn SpeechBackend,
        cache: &mut GenerationCache,
        cancel: &CancellationToken,
        options: &GenerateOptions,
    ) -> GenerationReport {
        self.step(ProcessStep::SpeechGeneration);
        let mut report = GenerationReport::default();
        let total = chunks.len();

        for (i, chunk) in chunks.iter().enumerate() {
            if cancel.is_cancelled() {
                info!("Generation cancelled after {} of {} chunks", i, total);
                report.cancelled = true;
                break;
            }

            if !options.force && cache.contains(&chunk.id) {
                debug!("{}: cache hit", chunk.id);
                report.reused.push(chunk.id.clone());
            } else {
                match self.produce_segment(chunk, backend).await {
                    Ok(segment) => {
                        if let Err(e) = self.persist(&segment) {
                            report.persist_failed.push((chunk.id.clone(), e.to_string()));
                        }
                        if options.force {
                            cache.replace(segment);
                        } else {
                            cache.insert_if_absent(segment);
                        }
                        report.generated.push(chunk.id.clone());
                    }
                    Err(e) => {
                        warn!("{}: generation failed: {}", chunk.id, e);
                        report.failed.push((chunk.id.clone(), e.to_string()));
                    }
                }
            }

            self.progress((i + 1) as f32 / total as f32 * 100.0, || {
                format!("Чанк {}/{}", i + 1, total)
            });
        }

        info!(
            "Generation pass: {} generated, {} reused, {} failed, {} not persisted{}",
            report.generated.len(),
            report.reused.len(),
            report.failed.len(),
            report.persist_failed.len(),
            if report.cancelled { ", cancelled" } else { "" }
        );
        report
    }

    /// Принудительно перегенерировать один чанк; остальные записи не трогаются
    pub async fn regenerate(
        &self,
        chunk_id: &ChunkId,
        chunks: &[DubbingChunk],
        backend: &dyn SpeechBackend,
        cache: &mut GenerationCache,
    ) -> Result<()> {
        let chunk = chunks
            .iter()
            .find(|chunk| &chunk.id == chunk_id)
            .ok_or_else(|| DubSyncError::UnknownChunk(chunk_id.to_string()))?;

        let segment = self.produce_segment(chunk, backend).await?;
        // Запись на диск не обязательна для замены в памяти, ошибка уже в логе
        let _ = self.persist(&segment);
        cache.replace(segment);
        info!("Regenerated {}", chunk_id);
        Ok(())
    }

    /// Склеить таймлайн из кэша; `None`, если нет ни одного сегмента
    pub fn stitch<S: SegmentSource + ?Sized>(&self, chunks: &[DubbingChunk], source: &S) -> Option<StitchedTimeline> {
        self.step(ProcessStep::TimelineStitching);
        let timeline = stitch_with(&placements_for(chunks), source, &self.config.mix);

        if let Some(t) = &self.progress_tracker {
            t.complete();
        }
        timeline
    }
}

impl Default for DubSync {
    fn default() -> Self {
        Self::new(DubSyncConfig::default())
    }
}
