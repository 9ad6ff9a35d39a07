use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::audio::{placements_for, stitch, AudioBuffer, Placement, WordTiming};
use crate::cache::FittedSegment;
use crate::chunk::{plan_chunks, ChunkId};
use crate::script::parse_script;

const SAMPLE_RATE: u32 = 1000;

fn constant_segment(id: &ChunkId, seconds: f64, value: f32) -> FittedSegment {
    let frames = (seconds * SAMPLE_RATE as f64) as usize;
    FittedSegment {
        chunk_id: id.clone(),
        buffer: AudioBuffer::mono(vec![value; frames], SAMPLE_RATE),
        word_timings: vec![WordTiming {
            word: id.to_string(),
            start: 0.0,
            end: seconds,
        }],
        stretch_ratio: 1.0,
    }
}

#[test]
fn test_missing_entry_leaves_silence() {
    let script = "[00:00:00.000 -> 00:00:01.000] A: one\n\
                  [00:00:02.000 -> 00:00:03.000] B: two\n\
                  [00:00:04.000 -> 00:00:05.000] A: three";
    let chunks = plan_chunks(&parse_script(script), "p");
    assert_eq!(chunks.len(), 3);

    let mut source = HashMap::new();
    for chunk in [&chunks[0], &chunks[2]] {
        source.insert(chunk.id.clone(), constant_segment(&chunk.id, chunk.duration(), 0.5));
    }

    let timeline = stitch(&placements_for(&chunks), &source).unwrap();
    let samples = &timeline.buffer.samples;

    assert_eq!(timeline.missing, vec![chunks[1].id.clone()]);
    assert_eq!(samples.len(), 5000);
    assert!(samples[..1000].iter().all(|&s| s == 0.5));
    assert!(samples[1000..4000].iter().all(|&s| s == 0.0));
    assert!(samples[4000..].iter().all(|&s| s == 0.5));
    assert_eq!(timeline.word_timings.len(), 2);
    assert_eq!(timeline.word_timings[1].start, 4.0);
}

#[test]
fn test_random_layouts_never_panic() {
    let mut rng = StdRng::seed_from_u64(9);

    for round in 0..20 {
        let mut source = HashMap::new();
        let mut placements = Vec::new();

        for n in 0..rng.gen_range(0..8) {
            let id = crate::chunk::fingerprint("p", "A", &format!("{}-{}", round, n), n as f64, n as f64 + 1.0);
            let start = rng.gen_range(0.0..10.0);
            let seconds = rng.gen_range(0.0..3.0);

            if rng.gen_bool(0.7) {
                source.insert(id.clone(), constant_segment(&id, seconds, rng.gen_range(-1.0..1.0)));
            }
            placements.push(Placement::new(id, start));
        }

        let Some(timeline) = stitch(&placements, &source) else {
            assert!(placements.iter().all(|p| !source.contains_key(&p.chunk_id)));
            continue;
        };

        assert!(timeline.buffer.peak() <= 1.0 + 1e-6);
        assert_eq!(timeline.placed.len() + timeline.missing.len(), placements.len());
        assert!(timeline
            .word_timings
            .windows(2)
            .all(|pair| pair[0].start <= pair[1].start));

        let expected_end = placements
            .iter()
            .filter_map(|p| {
                let segment = source.get(&p.chunk_id)?;
                Some((p.start_time * SAMPLE_RATE as f64).round() as usize + segment.buffer.frames())
            })
            .max()
            .unwrap_or(0);
        assert_eq!(timeline.buffer.frames(), expected_end);
    }
}

#[test]
fn test_ragged_buffer_is_skipped() {
    let good = crate::chunk::fingerprint("p", "A", "good", 1.0, 2.0);
    let ragged = crate::chunk::fingerprint("p", "A", "ragged", 0.0, 1.0);

    let mut source = HashMap::new();
    source.insert(
        ragged.clone(),
        FittedSegment {
            chunk_id: ragged.clone(),
            buffer: AudioBuffer::new(vec![0.1; 5], 10, 2),
            word_timings: Vec::new(),
            stretch_ratio: 1.0,
        },
    );

    let alone = stitch(&[Placement::new(ragged.clone(), 0.0)], &source);
    assert!(alone.is_none());

    source.insert(good.clone(), constant_segment(&good, 1.0, 0.25));
    let placements = vec![Placement::new(ragged.clone(), 0.0), Placement::new(good.clone(), 1.0)];
    let timeline = stitch(&placements, &source).unwrap();

    assert_eq!(timeline.skipped, vec![ragged]);
    assert_eq!(timeline.placed, vec![good]);
    assert_eq!(timeline.buffer.frames(), 2000);
    assert!(timeline.buffer.samples[1000..].iter().all(|&s| s == 0.25));
}
