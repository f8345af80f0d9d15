// Example result structures

use crate::state::TestStatus;
use serde::Serialize;

/// Outcome of a single example
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    pub name: String,
    pub status: TestStatus,
    pub duration_ms: u64,
    pub error_message: Option<String>,
    pub execution_time: i64,
}

impl TestResult {
    /// Create a pass result
    pub fn pass(name: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            name: name.into(),
            status: TestStatus::Pass,
            duration_ms,
            error_message: None,
            execution_time: chrono::Utc::now().timestamp(),
        }
    }

    /// Create a fail result
    pub fn fail(name: impl Into<String>, error_message: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            name: name.into(),
            status: TestStatus::Fail,
            duration_ms,
            error_message: Some(error_message.into()),
            execution_time: chrono::Utc::now().timestamp(),
        }
    }

    /// Create a skip result
    pub fn skip(name: impl Into<String>, reason: Option<String>, duration_ms: u64) -> Self {
        Self {
            name: name.into(),
            status: TestStatus::Skip,
            duration_ms,
            error_message: reason,
            execution_time: chrono::Utc::now().timestamp(),
        }
    }
}
