// Replay a JSON-lines event stream through a reporter

use std::io::BufRead;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, warn};

use super::Reporter;
use crate::state::TestResult;

/// One line of a streaming test-event log
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StreamEvent {
    SuiteStart {
        #[serde(rename = "testCount", default)]
        test_count: usize,
        #[serde(default)]
        seed: Option<u64>,
    },
    GroupStart {
        description: String,
    },
    GroupEnd {
        #[serde(default)]
        description: String,
    },
    TestStart {
        #[serde(rename = "testId")]
        test_id: String,
    },
    TestPass {
        #[serde(rename = "testId")]
        test_id: String,
        #[serde(default)]
        duration: u64,
    },
    TestFail {
        #[serde(rename = "testId")]
        test_id: String,
        #[serde(default)]
        duration: u64,
        #[serde(default)]
        message: Option<String>,
    },
    TestSkip {
        #[serde(rename = "testId")]
        test_id: String,
        #[serde(default)]
        duration: u64,
        #[serde(default)]
        message: Option<String>,
    },
    Message {
        message: String,
    },
    SuiteEnd {},
}

impl StreamEvent {
    /// Deliver this event to the reporter; returns true for the end of the suite
    pub fn dispatch(self, reporter: &mut Reporter) -> bool {
        match self {
            StreamEvent::SuiteStart { test_count, seed } => {
                reporter.set_seed(seed);
                reporter.start(test_count);
            }
            StreamEvent::GroupStart { description } => reporter.group_started(&description),
            StreamEvent::GroupEnd { description } => reporter.group_finished(&description),
            StreamEvent::TestStart { test_id } => reporter.example_started(&test_id),
            StreamEvent::TestPass { test_id, duration } => {
                reporter.example_finished(TestResult::pass(test_id, duration))
            }
            StreamEvent::TestFail {
                test_id,
                duration,
                message,
            } => reporter.example_finished(TestResult::fail(
                test_id,
                message.unwrap_or_else(|| "Unknown error".to_string()),
                duration,
            )),
            StreamEvent::TestSkip {
                test_id,
                duration,
                message,
            } => reporter.example_finished(TestResult::skip(test_id, message, duration)),
            StreamEvent::Message { message } => reporter.message(&message),
            StreamEvent::SuiteEnd {} => return true,
        }
        false
    }
}

/// Feed every event in `input` to `reporter`, then run the end-of-run sequence.
///
/// Returns the number of failed examples.
pub fn replay(input: impl BufRead, reporter: &mut Reporter) -> Result<usize> {
    let mut finished = false;

    for (index, line) in input.lines().enumerate() {
        let line = line.context("Failed to read event stream")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let event: StreamEvent = serde_json::from_str(line)
            .with_context(|| format!("Invalid event on line {}: {}", index + 1, line))?;
        debug!("Replaying {:?}", event);

        if event.dispatch(reporter) {
            finished = true;
            break;
        }
    }

    if !finished {
        warn!("Event stream ended without suite_end");
    }

    Ok(reporter.finish().failed())
}
