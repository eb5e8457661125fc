// Error handling framework
//
// Every TriggerError variant is handled per business: the pipeline logs it,
// bumps a skip counter, and moves on to the next business. Only a failure to
// list businesses at all is allowed to surface to the runner as cycle-fatal.

use thiserror::Error;

/// Per-business trigger evaluation errors
#[derive(Error, Debug)]
pub enum TriggerError {
    #[error("weather data unavailable: {0}")]
    DataUnavailable(String),

    #[error("insufficient historical samples to compute a baseline")]
    InsufficientBaseline,

    #[error("malformed business record: {0}")]
    MalformedRecord(String),

    #[error("schedule creation failed: {0}")]
    SchedulingFailure(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TriggerError {
    /// Metrics label for the skip counter, one per taxonomy entry.
    pub fn reason(&self) -> &'static str {
        match self {
            TriggerError::DataUnavailable(_) => "data_unavailable",
            TriggerError::InsufficientBaseline => "insufficient_baseline",
            TriggerError::MalformedRecord(_) => "malformed_record",
            TriggerError::SchedulingFailure(_) => "scheduling_failure",
            TriggerError::Store(_) => "store_error",
        }
    }
}

/// Business repository errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database connection failed: {0}")]
    ConnectionFailed(String),

    #[error("query failed: {0}")]
    QueryFailed(String),

    #[error("business not found: {0}")]
    NotFound(String),

    #[error("version conflict on concurrent update of business {0}")]
    VersionConflict(String),

    #[error("migration failed: {0}")]
    MigrationFailed(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("record not found".to_string()),
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
                StoreError::ConnectionFailed(err.to_string())
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_error_display() {
        let err = TriggerError::DataUnavailable("forecast fetch timed out".to_string());
        assert!(err.to_string().contains("forecast fetch timed out"));
    }

    #[test]
    fn test_store_error_wraps_into_trigger_error() {
        let err: TriggerError = StoreError::VersionConflict("biz-1".to_string()).into();
        assert_eq!(err.reason(), "store_error");
    }

    #[test]
    fn test_reason_labels_are_distinct() {
        let reasons = [
            TriggerError::DataUnavailable(String::new()).reason(),
            TriggerError::InsufficientBaseline.reason(),
            TriggerError::MalformedRecord(String::new()).reason(),
            TriggerError::SchedulingFailure(String::new()).reason(),
        ];
        let mut unique = reasons.to_vec();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), reasons.len());
    }
}
