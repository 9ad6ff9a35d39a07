//! Пример полного прохода дубляжа
//!
//! Вместо реального сервиса синтеза используется генератор тона: у каждого
//! голоса своя высота, длительность пропорциональна числу слов. Запуск:
//!
//! ```bash
//! RUST_LOG=dub_sync=debug cargo run --example dub_script
//! ```

use async_trait::async_trait;
use dub_sync::{
    cache::GenerationCache,
    logger::init_logger,
    notification::LogProgressObserver,
    AudioBuffer, DubSync, DubSyncConfig, GenerateOptions, Result, SpeechBackend, SynthesisRequest,
};
use tokio_util::sync::CancellationToken;

const SCRIPT: &str = r#"
[00:00:00.500 -> 00:00:03.000] Narrator: In a quiet town by the sea [softly]
Narrator: lived an old lighthouse keeper.
[00:00:05.000 -> 00:00:06.500] Keeper: Another storm tonight.
[00:00:06.700] Child: Can I help you with the lamp?
(thunder)
Keeper: Hold the ladder, then.
"#;

/// Генератор тона вместо сервиса синтеза
struct ToneBackend {
    sample_rate: u32,
}

impl ToneBackend {
    fn pitch(voice: &str) -> f32 {
        match voice {
            "onyx" => 110.0,
            "nova" => 330.0,
            _ => 220.0,
        }
    }
}

#[async_trait]
impl SpeechBackend for ToneBackend {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioBuffer> {
        let words = request.text.split_whitespace().count().max(1);
        let frames = words * self.sample_rate as usize * 3 / 10;
        let pitch = Self::pitch(&request.voice);

        let samples = (0..frames)
            .map(|i| {
                let t = i as f32 / self.sample_rate as f32;
                0.3 * (2.0 * std::f32::consts::PI * pitch * t).sin()
            })
            .collect();
        Ok(AudioBuffer::mono(samples, self.sample_rate))
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    init_logger();

    let mut config = DubSyncConfig {
        provider: "tone".to_string(),
        ..DubSyncConfig::default()
    };
    config.voices.insert("Keeper".to_string(), "onyx".to_string());
    config.voices.insert("Child".to_string(), "nova".to_string());

    let mut dub = DubSync::new(config);
    dub.add_observer(Box::new(LogProgressObserver::with_prefix("[demo] ")));

    let chunks = dub.plan(SCRIPT, "tone");
    for chunk in &chunks {
        println!(
            "{} {:>8} {:6.2}-{:6.2}  {}",
            chunk.id,
            chunk.speaker_name,
            chunk.start_time,
            chunk.end_time,
            chunk.spoken_text()
        );
    }

    let backend = ToneBackend { sample_rate: 24000 };
    let mut cache = GenerationCache::new();
    let report = dub
        .generate(
            &chunks,
            &backend,
            &mut cache,
            &CancellationToken::new(),
            &GenerateOptions::default(),
        )
        .await
        .into_result()?;
    println!("Generated {} chunks", report.generated.len());

    for chunk in &chunks {
        if let Some(segment) = cache.get(&chunk.id) {
            println!("{} stretch ratio {:.3}", chunk.id, segment.stretch_ratio);
        }
    }

    match dub.stitch(&chunks, &cache) {
        Some(timeline) => {
            println!(
                "Timeline: {:.2}s, {} Hz, peak {:.3}, {} words",
                timeline.buffer.duration(),
                timeline.buffer.sample_rate,
                timeline.buffer.peak(),
                timeline.word_timings.len()
            );
            for word in timeline.word_timings.iter().take(5) {
                println!("  {:6.3}-{:6.3} {}", word.start, word.end, word.word);
            }
        }
        None => println!("No audio to stitch"),
    }

    Ok(())
}
