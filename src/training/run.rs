//! Folding the passes of a run into one score, and keeping the all-time best.

use crate::fitness::PassRecord;
use serde::{Deserialize, Serialize};

/// How the passes of a run are reduced to the run's fitness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunAcceptMode {
    /// The worst pass counts
    #[default]
    All,
    /// The pass recorded in the middle of the run counts. The records are taken in the order
    /// they were driven, not sorted by fitness.
    Median,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunResult {
    pub fitness: f64,
    /// Elapsed time of the counted pass, if that pass reached the final checkpoint
    pub completion_time: Option<f64>,
}

/// Reduce the pass records of one run. Returns [None] for a run without passes.
pub fn aggregate(
    mode: RunAcceptMode,
    records: &[PassRecord],
    checkpoint_count: usize,
) -> Option<RunResult> {
    let counted = match mode {
        RunAcceptMode::All => records
            .iter()
            .min_by(|l, r| l.fitness.total_cmp(&r.fitness))?,
        RunAcceptMode::Median => records.get(records.len().checked_sub(1)? / 2)?,
    };
    Some(RunResult {
        fitness: counted.fitness,
        completion_time: counted
            .completed(checkpoint_count)
            .then_some(counted.elapsed_time),
    })
}

/// The best run seen so far, across all generations.
#[derive(Debug, Clone, PartialEq)]
pub struct BestRecord {
    pub fitness: f64,
    pub completion_time: Option<f64>,
    pub generation: usize,
    pub run: usize,
    pub breakthroughs: u32,
    evaluated: bool,
}

impl Default for BestRecord {
    fn default() -> Self {
        Self {
            fitness: f64::NEG_INFINITY,
            completion_time: None,
            generation: 0,
            run: 0,
            breakthroughs: 0,
            evaluated: false,
        }
    }
}

impl BestRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any run has been considered yet
    pub fn evaluated(&self) -> bool {
        self.evaluated
    }

    /// Fold a finished run into the record. Returns true on a breakthrough.
    ///
    /// A breakthrough needs a fitness above the best so far. Run 0 of a generation re-drives the
    /// unmutated champion, so it only counts when it is the very first evaluation. The best
    /// completion time is tracked separately and improves on any faster finish.
    pub fn consider(&mut self, result: &RunResult, generation: usize, run: usize) -> bool {
        if let Some(time) = result.completion_time.filter(|t| *t >= 0.) {
            if self.completion_time.map_or(true, |best| time < best) {
                self.completion_time = Some(time);
            }
        }

        let first = !self.evaluated;
        self.evaluated = true;
        if result.fitness > self.fitness && (run > 0 || first) {
            self.fitness = result.fitness;
            self.generation = generation;
            self.run = run;
            self.breakthroughs += 1;
            true
        } else {
            false
        }
    }
}

/// File name a breakthrough checkpoint is written under
pub fn checkpoint_file_name(
    track_name: &str,
    unix_secs: u64,
    best_time: Option<f64>,
    breakthroughs: u32,
    generation: usize,
    run: usize,
) -> String {
    let track: String = track_name
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    let time = best_time.map_or_else(|| "none".to_owned(), |t| format!("{t:.3}"));
    format!("{track}_{unix_secs}_{time}_{breakthroughs}_{generation}-{run}.txt")
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::assert_f64_approx;

    fn record(fitness: f64, elapsed_time: f64, reached_checkpoint: usize) -> PassRecord {
        PassRecord {
            fitness,
            elapsed_time,
            reached_checkpoint,
        }
    }

    fn scored(fitness: f64) -> RunResult {
        RunResult {
            fitness,
            completion_time: None,
        }
    }

    #[test]
    fn test_all_takes_worst_pass() {
        let records = [record(5., 1., 3), record(2., 2., 3), record(8., 3., 1)];
        let result = aggregate(RunAcceptMode::All, &records, 3).unwrap();
        assert_f64_approx!(result.fitness, 2.);
        assert_eq!(result.completion_time, Some(2.));
    }

    #[test]
    fn test_all_drops_time_of_unfinished_worst() {
        let records = [record(5., 1., 3), record(2., 2., 1)];
        let result = aggregate(RunAcceptMode::All, &records, 3).unwrap();
        assert_f64_approx!(result.fitness, 2.);
        assert_eq!(result.completion_time, None);
    }

    #[test]
    fn test_median_is_positional() {
        let records = [record(5., 1., 0), record(2., 2., 0), record(8., 3., 0)];
        let result = aggregate(RunAcceptMode::Median, &records, 3).unwrap();
        assert_f64_approx!(result.fitness, 2.);

        let even = [record(5., 1., 0), record(2., 2., 0), record(8., 3., 0), record(1., 1., 0)];
        assert_f64_approx!(
            aggregate(RunAcceptMode::Median, &even, 3).unwrap().fitness,
            2.
        );
    }

    #[test]
    fn test_empty_run() {
        assert_eq!(aggregate(RunAcceptMode::All, &[], 1), None);
        assert_eq!(aggregate(RunAcceptMode::Median, &[], 1), None);
    }

    #[test]
    fn test_first_evaluation_breaks_through_at_run_zero() {
        let mut best = BestRecord::new();
        assert!(best.consider(&scored(1.), 0, 0));
        assert_eq!(best.breakthroughs, 1);
        assert!(best.evaluated());
    }

    #[test]
    fn test_run_zero_excluded_after_first_evaluation() {
        let mut best = BestRecord::new();
        best.consider(&scored(10.), 0, 3);
        assert_eq!(best.breakthroughs, 1);

        assert!(!best.consider(&scored(15.), 1, 0));
        assert_eq!(best.breakthroughs, 1);
        assert_f64_approx!(best.fitness, 10.);

        assert!(best.consider(&scored(15.), 1, 1));
        assert_eq!(best.breakthroughs, 2);
        assert_f64_approx!(best.fitness, 15.);
        assert_eq!((best.generation, best.run), (1, 1));
    }

    #[test]
    fn test_equal_fitness_is_no_breakthrough() {
        let mut best = BestRecord::new();
        best.consider(&scored(4.), 0, 0);
        assert!(!best.consider(&scored(4.), 0, 1));
    }

    #[test]
    fn test_completion_time_tracked_independently() {
        let mut best = BestRecord::new();
        best.consider(&scored(10.), 0, 0);
        let weak_but_fast = RunResult {
            fitness: 3.,
            completion_time: Some(12.5),
        };
        assert!(!best.consider(&weak_but_fast, 0, 1));
        assert_eq!(best.completion_time, Some(12.5));

        let slower = RunResult {
            fitness: 3.,
            completion_time: Some(20.),
        };
        best.consider(&slower, 0, 2);
        assert_eq!(best.completion_time, Some(12.5));
    }

    #[test]
    fn test_checkpoint_file_name() {
        assert_eq!(
            checkpoint_file_name("Oval", 1700000000, Some(12.3456), 4, 2, 7),
            "Oval_1700000000_12.346_4_2-7.txt"
        );
        assert_eq!(
            checkpoint_file_name("a/b", 5, None, 1, 0, 0),
            "a_b_5_none_1_0-0.txt"
        );
    }
}
