use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::audio::AudioBuffer;
use crate::cache::DiskCacheStore;
use crate::config::DubSyncConfig;
use crate::error::{DubSyncError, Result};
use crate::notification::ChannelProgressObserver;
use crate::pipeline::{SpeechBackend, SynthesisRequest};
use crate::progress::{DefaultProgressReporter, ProgressReporter};
use crate::{dub_script, dub_script_with_progress};

const SCRIPT: &str = "[00:00:00.500 -> 00:00:02.000] Host: Welcome back\n\
                      [00:00:02.300 -> 00:00:04.000] Guest: Thanks for having me\n\
                      [stage: lights dim]\n\
                      Host: Let's start";

/// Стерео-сигнал постоянной амплитуды, 0.25 с на слово
struct FlatBackend {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl SpeechBackend for FlatBackend {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioBuffer> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if request.credentials.is_none() {
            return Err(DubSyncError::Synthesis("missing credentials".to_string()));
        }
        let words = request.text.split_whitespace().count();
        let frames = words * 2000;
        Ok(AudioBuffer::new(vec![0.2; frames * 2], 8000, 2))
    }
}

fn config(cache_dir: Option<String>) -> DubSyncConfig {
    DubSyncConfig {
        provider: "flat".to_string(),
        credentials: Some("token".to_string()),
        cache_dir,
        ..DubSyncConfig::default()
    }
}

#[tokio::test]
async fn test_dub_script_end_to_end() {
    let calls = Arc::new(AtomicUsize::new(0));
    let backend = FlatBackend { calls: calls.clone() };

    let timeline = dub_script(SCRIPT, &backend, config(None)).await.unwrap().unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(timeline.placed.len(), 3);
    assert_eq!(timeline.buffer.channels, 2);
    // "Let's start": курсор 4.0 + 1.5 с
    assert!((timeline.buffer.duration() - 5.5).abs() < 0.05);
    assert_eq!(timeline.word_timings.len(), 2 + 4 + 2);
    assert!((timeline.word_timings[0].start - 0.5).abs() < 1e-9);
}

#[tokio::test]
async fn test_dub_script_reuses_disk_cache() {
    let dir = tempfile::tempdir().unwrap();
    let cache_dir = Some(dir.path().to_string_lossy().to_string());
    let calls = Arc::new(AtomicUsize::new(0));
    let backend = FlatBackend { calls: calls.clone() };

    let first = dub_script(SCRIPT, &backend, config(cache_dir.clone())).await.unwrap().unwrap();
    let second = dub_script(SCRIPT, &backend, config(cache_dir)).await.unwrap().unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(first.buffer, second.buffer);

    let store = DiskCacheStore::new(dir.path(), None).unwrap();
    assert_eq!(store.ids().unwrap().len(), 3);
}

#[tokio::test]
async fn test_dub_script_reports_synthesis_failure() {
    let backend = FlatBackend {
        calls: Arc::new(AtomicUsize::new(0)),
    };
    let mut config = config(None);
    config.credentials = None;

    let result = dub_script(SCRIPT, &backend, config).await;
    assert!(matches!(result, Err(DubSyncError::Synthesis(_))));
}

#[tokio::test]
async fn test_invalid_config_rejected() {
    let backend = FlatBackend {
        calls: Arc::new(AtomicUsize::new(0)),
    };
    let mut config = config(None);
    config.fit.overlap_ms = 50.0;

    let result = dub_script(SCRIPT, &backend, config).await;
    assert!(matches!(result, Err(DubSyncError::Configuration(_))));
}

#[tokio::test]
async fn test_progress_reaches_channel() {
    let (tx, mut rx) = mpsc::channel(256);
    let mut reporter = DefaultProgressReporter::new();
    reporter.add_observer(Box::new(ChannelProgressObserver::new(tx)));

    let backend = FlatBackend {
        calls: Arc::new(AtomicUsize::new(0)),
    };
    dub_script_with_progress(SCRIPT, &backend, config(None), Box::new(reporter))
        .await
        .unwrap();

    let mut last = None;
    while let Ok(update) = rx.try_recv() {
        last = Some(update);
    }
    let last = last.unwrap();
    assert_eq!(last.total_progress, 100.0);
    assert_eq!(last.details.as_deref(), Some("Процесс завершен"));
}
