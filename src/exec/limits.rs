//! Resource limit enforcement for a selection's run: row count, the
//! number of columns a plan is allowed to materialize, and a soft wall-
//! clock timeout. Cooperative, not preemptive — callers check after a
//! step completes rather than interrupting mid-computation.

use std::time::{Duration, Instant};

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ResourceError {
    #[error("input has {actual} rows, limit is {limit}")]
    RowLimitExceeded { limit: usize, actual: usize },
    #[error("plan materializes {actual} columns, limit is {limit}")]
    ColumnLimitExceeded { limit: usize, actual: usize },
}

/// Caps applied to a single selection's execution (spec's ambient
/// configuration section: max rows, max materialized columns, a
/// per-selection timeout).
#[derive(Debug, Clone, Default)]
pub struct ResourceLimits {
    pub max_rows: Option<usize>,
    pub max_materialized_columns: Option<usize>,
    pub timeout: Option<Duration>,
}

impl ResourceLimits {
    pub fn check_rows(&self, actual: usize) -> Result<(), ResourceError> {
        match self.max_rows {
            Some(limit) if actual > limit => Err(ResourceError::RowLimitExceeded { limit, actual }),
            _ => Ok(()),
        }
    }

    pub fn check_columns(&self, actual: usize) -> Result<(), ResourceError> {
        match self.max_materialized_columns {
            Some(limit) if actual > limit => Err(ResourceError::ColumnLimitExceeded { limit, actual }),
            _ => Ok(()),
        }
    }

    pub fn timeout_controller(&self) -> QueryTimeout {
        QueryTimeout::new(self.timeout)
    }
}

#[derive(Debug, Clone)]
pub struct TimeoutError {
    pub timeout: Duration,
    pub elapsed: Duration,
}

impl std::fmt::Display for TimeoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "selection exceeded timeout of {:?} (ran for {:?})", self.timeout, self.elapsed)
    }
}

impl std::error::Error for TimeoutError {}

/// Started at a selection's entry, checked once after its plan has run.
pub struct QueryTimeout {
    start: Instant,
    timeout: Option<Duration>,
}

impl QueryTimeout {
    pub fn new(timeout: Option<Duration>) -> Self {
        QueryTimeout { start: Instant::now(), timeout }
    }

    pub fn check(&self) -> Result<(), TimeoutError> {
        if let Some(timeout) = self.timeout {
            let elapsed = self.start.elapsed();
            if elapsed > timeout {
                return Err(TimeoutError { timeout, elapsed });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_limit_rejects_oversized_input() {
        let limits = ResourceLimits { max_rows: Some(10), ..Default::default() };
        assert!(limits.check_rows(5).is_ok());
        assert!(matches!(
            limits.check_rows(11),
            Err(ResourceError::RowLimitExceeded { limit: 10, actual: 11 })
        ));
    }

    #[test]
    fn no_timeout_never_fails() {
        let controller = QueryTimeout::new(None);
        std::thread::sleep(Duration::from_millis(1));
        assert!(controller.check().is_ok());
    }

    #[test]
    fn expired_timeout_is_reported() {
        let controller = QueryTimeout::new(Some(Duration::from_millis(1)));
        std::thread::sleep(Duration::from_millis(20));
        assert!(controller.check().is_err());
    }
}
