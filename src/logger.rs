//! Training progress logging.

/// Verbosity level for training output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// No output.
    Silent,
    /// Per-round metric lines and lifecycle messages.
    #[default]
    Info,
}

/// Stdout logger used by the boosting loop and cross-validation.
#[derive(Debug, Clone, Copy)]
pub struct TrainingLogger {
    verbosity: Verbosity,
}

impl TrainingLogger {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    /// Lifecycle message (bin construction, completion summary, ...).
    pub fn info(&self, message: &str) {
        if self.verbosity >= Verbosity::Info {
            println!("{message}");
        }
    }

    /// Per-round metric line in the stable `Iteration r: name = value`
    /// format consumers grep for.
    pub fn log_round(&self, round: u32, metric_name: &str, value: f32) {
        if self.verbosity >= Verbosity::Info {
            println!("Iteration {round}: {metric_name} = {value}");
        }
    }
}
