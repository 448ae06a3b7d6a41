use std::fmt;

/// Unified error type threaded through parsing, model building, solving and
/// output writing. Solver failures are carried as data (`Solver`) rather
/// than raised — the orchestrator reports them in the KPI file and keeps
/// going; everything else is a hard stop.
#[derive(thiserror::Error, Debug)]
pub enum ScheduleError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid input: {0}")]
    Input(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("solver reported: {0}")]
    Solver(String),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for ScheduleError {
    fn from(e: anyhow::Error) -> Self {
        ScheduleError::Other(e.to_string())
    }
}

impl From<String> for ScheduleError {
    fn from(s: String) -> Self {
        ScheduleError::Other(s)
    }
}

impl From<&str> for ScheduleError {
    fn from(s: &str) -> Self {
        ScheduleError::Other(s.to_string())
    }
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;

/// Adds row/column context to an [`ScheduleError::Input`] without losing
/// the original message.
pub fn input_err(context: impl fmt::Display, detail: impl fmt::Display) -> ScheduleError {
    ScheduleError::Input(format!("{context}: {detail}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ScheduleError = io_err.into();
        assert!(matches!(err, ScheduleError::Io(_)));
    }

    #[test]
    fn string_converts_to_other() {
        let err: ScheduleError = "boom".into();
        assert!(matches!(err, ScheduleError::Other(_)));
    }

    #[test]
    fn input_err_includes_context() {
        let err = input_err("demand_plan row 3", "missing qty_min");
        assert_eq!(
            err.to_string(),
            "invalid input: demand_plan row 3: missing qty_min"
        );
    }
}
