//! Аудио: буфер PCM, подгонка длительности (SOLA), пословные тайминги и склейка таймлайна

mod buffer;
pub mod sola;
pub mod stitch;
pub mod timing;

pub use buffer::{compute_rms, AudioBuffer};
pub use sola::{fit_duration, fit_duration_with, FitResult};
pub use stitch::{placements_for, stitch, stitch_with, Placement, StitchedTimeline};
pub use timing::{CharProportionalEstimator, WordTiming, WordTimingEstimator};
