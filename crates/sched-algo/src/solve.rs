use sched_core::SolverProgress;

/// Receives one push per improved feasible solution during the solve,
/// as a plain trait object passed into the solve call rather than a
/// subclassed callback.
pub trait ProgressSink {
    fn on_solution(&mut self, wall_time_secs: f64, objective: f64, label: &str);
}

/// A sink that drops everything — used when no progress file is requested.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn on_solution(&mut self, _wall_time_secs: f64, _objective: f64, _label: &str) {}
}

/// Accumulates solution points into a `SolverProgress` document the caller
/// can serialize after (or during) the solve.
#[derive(Default)]
pub struct AccumulatingSink {
    pub progress: SolverProgress,
}

impl ProgressSink for AccumulatingSink {
    fn on_solution(&mut self, wall_time_secs: f64, objective: f64, label: &str) {
        self.progress.solutions.push(sched_core::SolverSolutionPoint {
            wall_time: wall_time_secs,
            objective,
            label: label.to_string(),
        });
    }
}

/// Knobs controlling one solve call, independent of the model's own
/// parameters.
#[derive(Debug, Clone, Copy)]
pub struct SolverConfig {
    pub num_workers: usize,
    pub time_limit_secs: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            num_workers: 8,
            time_limit_secs: 120,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulating_sink_records_points_in_order() {
        let mut sink = AccumulatingSink::default();
        sink.on_solution(0.5, 100.0, "first");
        sink.on_solution(1.2, 80.0, "second");
        assert_eq!(sink.progress.solutions.len(), 2);
        assert_eq!(sink.progress.solutions[1].objective, 80.0);
    }

    #[test]
    fn null_sink_drops_everything() {
        let mut sink = NullSink;
        sink.on_solution(1.0, 1.0, "x");
    }
}
