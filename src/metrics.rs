use std::collections::VecDeque;
use std::time::Instant;

use crate::util::{percent, std_dev};

/// Number of per-tick wpm samples kept for the consistency score.
pub const WPM_HISTORY_LEN: usize = 10;

/// Characters per "word" in the wpm convention.
const CHARS_PER_WORD: f64 = 5.0;

/// Live race metrics, recomputed on every metrics tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsSnapshot {
    pub wpm: u32,
    pub accuracy: u32,
    pub elapsed_secs: f64,
    /// typed length / reference length * 100
    pub completion: f64,
    pub total_chars: usize,
    pub correct_chars: usize,
    pub incorrect_chars: usize,
    /// best contiguous correct run anywhere in the typed prefix
    pub longest_run: usize,
    pub max_wpm: u32,
    pub consistency: u32,
}

impl Default for MetricsSnapshot {
    fn default() -> Self {
        Self {
            wpm: 0,
            accuracy: 100,
            elapsed_secs: 0.0,
            completion: 0.0,
            total_chars: 0,
            correct_chars: 0,
            incorrect_chars: 0,
            longest_run: 0,
            max_wpm: 0,
            consistency: 100,
        }
    }
}

/// FIFO of the most recent per-tick wpm samples, never longer than
/// [`WPM_HISTORY_LEN`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WpmHistory {
    samples: VecDeque<u32>,
}

impl WpmHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with `wpm` appended and the oldest sample evicted
    /// when full.
    pub fn with_sample(&self, wpm: u32) -> Self {
        let mut samples = self.samples.clone();
        samples.push_back(wpm);
        while samples.len() > WPM_HISTORY_LEN {
            samples.pop_front();
        }
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> impl Iterator<Item = u32> + '_ {
        self.samples.iter().copied()
    }

    /// 100 minus the standard deviation of the samples, floored at 0.
    pub fn consistency(&self) -> u32 {
        let values: Vec<f64> = self.samples.iter().map(|&w| w as f64).collect();
        match std_dev(&values) {
            Some(sd) => (100.0 - sd).max(0.0).round() as u32,
            None => 100,
        }
    }
}

/// Words per minute from correct characters, 0 for degenerate elapsed times.
pub fn words_per_minute(correct_chars: usize, elapsed_secs: f64) -> u32 {
    let minutes = elapsed_secs / 60.0;
    if minutes <= 0.0 {
        return 0;
    }
    let wpm = (correct_chars as f64 / CHARS_PER_WORD / minutes).round();
    if wpm.is_finite() && wpm > 0.0 {
        wpm as u32
    } else {
        0
    }
}

/// Counts matches against the reference and the longest correct run.
/// Positions past the end of the reference count as mismatches.
fn score_prefix(reference: &[char], typed: &[char]) -> (usize, usize) {
    let mut correct = 0;
    let mut run = 0;
    let mut longest = 0;

    for (idx, c) in typed.iter().enumerate() {
        if reference.get(idx) == Some(c) {
            correct += 1;
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }

    (correct, longest)
}

/// Computes a fresh snapshot and the extended wpm history.
///
/// Pure: the caller stores both results. `previous_max_wpm` carries the
/// running maximum across ticks of the same race.
pub fn calculate(
    reference: &[char],
    typed: &[char],
    started_at: Instant,
    now: Instant,
    history: &WpmHistory,
    previous_max_wpm: u32,
) -> (MetricsSnapshot, WpmHistory) {
    let elapsed_secs = now.saturating_duration_since(started_at).as_secs_f64();
    let (correct_chars, longest_run) = score_prefix(reference, typed);
    let total_chars = typed.len();

    let wpm = words_per_minute(correct_chars, elapsed_secs);
    let accuracy = if total_chars == 0 {
        100
    } else {
        percent(correct_chars, total_chars)
    };
    let completion = if reference.is_empty() {
        0.0
    } else {
        total_chars as f64 / reference.len() as f64 * 100.0
    };

    let history = history.with_sample(wpm);

    let snapshot = MetricsSnapshot {
        wpm,
        accuracy,
        elapsed_secs,
        completion,
        total_chars,
        correct_chars,
        incorrect_chars: total_chars - correct_chars,
        longest_run,
        max_wpm: previous_max_wpm.max(wpm),
        consistency: history.consistency(),
    };

    (snapshot, history)
}
