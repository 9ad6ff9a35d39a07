//! Основной файл библиотеки dub-sync
//!
//! Планирование, подгонка длительности и склейка многоголосого дубляжа:
//! сценарий с метками времени превращается в чанки, каждый чанк синтезируется,
//! подгоняется под своё окно без изменения высоты тона (SOLA), а готовые
//! сегменты складываются в общий таймлайн с пословными таймингами.

pub mod audio;
pub mod cache;
pub mod chunk;
pub mod config;
pub mod error;
pub mod logger;
pub mod notification;
pub mod pipeline;
pub mod progress;
pub mod script;


use tokio_util::sync::CancellationToken;

pub use audio::{fit_duration, stitch, AudioBuffer, FitResult, StitchedTimeline, WordTiming};
pub use cache::{DiskCacheStore, FittedSegment, GenerationCache, SegmentSource};
pub use chunk::{fingerprint, plan_chunks, ChunkId, DubbingChunk};
pub use config::DubSyncConfig;
pub use error::{DubSyncError, Result};
pub use pipeline::{DubSync, GenerateOptions, GenerationReport, SpeechBackend, SynthesisRequest};
pub use script::{parse_script, ScriptLine};

use crate::progress::ProgressReporter;

/// Озвучить сценарий целиком: план, генерация, склейка.
///
/// Ошибка синтеза любого чанка прерывает работу до склейки.
pub async fn dub_script(
    script: &str,
    backend: &dyn SpeechBackend,
    config: DubSyncConfig,
) -> Result<Option<StitchedTimeline>> {
    config.validate()?;
    let dub = attach_disk_cache(DubSync::new(config))?;
    run(dub, script, backend).await
}

/// То же, что [`dub_script`], с отслеживанием прогресса
pub async fn dub_script_with_progress(
    script: &str,
    backend: &dyn SpeechBackend,
    config: DubSyncConfig,
    reporter: Box<dyn ProgressReporter>,
) -> Result<Option<StitchedTimeline>> {
    config.validate()?;
    let dub = attach_disk_cache(DubSync::with_progress_reporter(config, reporter))?;
    run(dub, script, backend).await
}

/// Подключить дисковый кэш, если в настройках задана директория
fn attach_disk_cache(dub: DubSync) -> Result<DubSync> {
    if dub.config().cache_dir.is_none() {
        return Ok(dub);
    }
    let store = DiskCacheStore::from_config(dub.config())?;
    Ok(dub.with_disk_cache(store))
}

async fn run(dub: DubSync, script: &str, backend: &dyn SpeechBackend) -> Result<Option<StitchedTimeline>> {
    let provider = dub.config().provider.clone();
    let chunks = dub.plan(script, &provider);

    let mut cache = dub.load_cache()?;
    cache.retain_planned(&chunks);

    dub.generate(
        &chunks,
        backend,
        &mut cache,
        &CancellationToken::new(),
        &GenerateOptions::default(),
    )
    .await
    .into_result()?;

    Ok(dub.stitch(&chunks, &cache))
}
