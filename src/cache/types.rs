use chrono::{DateTime, Utc};

/// Classified outcome of one fetch attempt, as recorded in the run log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchRunOutcome {
    Fresh,
    NotModified,
    Failed,
}

impl FetchRunOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchRunOutcome::Fresh => "fresh",
            FetchRunOutcome::NotModified => "not-modified",
            FetchRunOutcome::Failed => "failed",
        }
    }
}

/// One row of the fetch-run log.
#[derive(Debug, Clone)]
pub struct FetchRun {
    pub at: DateTime<Utc>,
    pub outcome: String,
    pub detail: Option<String>,
}

/// Snapshot of the cache state for the `status` command.
#[derive(Debug, Clone)]
pub struct CacheSummary {
    pub validator: Option<String>,
    pub validator_updated_at: Option<DateTime<Utc>>,
    pub payload_bytes: Option<u64>,
    pub total_runs: u64,
    pub recent_runs: Vec<FetchRun>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_strings() {
        assert_eq!(FetchRunOutcome::Fresh.as_str(), "fresh");
        assert_eq!(FetchRunOutcome::NotModified.as_str(), "not-modified");
        assert_eq!(FetchRunOutcome::Failed.as_str(), "failed");
    }
}
