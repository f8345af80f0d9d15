// JSON formatter - writes one JSON document when the run closes

use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use serde::Serialize;

use super::{Formatter, split_outputs};
use crate::report::{Notification, Payload};
use crate::state::{TestResult, TestResults};
use crate::utils::Output;

const PROFILE_LIMIT: usize = 10;

#[derive(Debug, Default, Serialize)]
struct JsonReport {
    version: &'static str,
    messages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    examples: Vec<TestResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<Summary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary_line: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile: Option<Profile>,
}

#[derive(Debug, Serialize)]
struct Summary {
    duration_ms: u64,
    example_count: usize,
    failure_count: usize,
    pending_count: usize,
}

#[derive(Debug, Serialize)]
struct Profile {
    examples: Vec<TestResult>,
    slowest_ms: u64,
    total_ms: u64,
}

/// JSON formatter
pub struct JsonFormatter {
    type_name: String,
    output: Output,
    report: Mutex<JsonReport>,
}

impl JsonFormatter {
    pub fn new(type_name: &str, outputs: Vec<Output>) -> Self {
        let (output, _) = split_outputs(outputs);
        Self {
            type_name: type_name.to_string(),
            output,
            report: Mutex::new(JsonReport {
                version: env!("CARGO_PKG_VERSION"),
                ..JsonReport::default()
            }),
        }
    }

    fn summarize(report: &mut JsonReport, results: &TestResults) {
        report.examples = results.all().to_vec();
        report.summary = Some(Summary {
            duration_ms: results.metrics().total_duration_ms,
            example_count: results.total(),
            failure_count: results.failed(),
            pending_count: results.skipped(),
        });
        report.summary_line = Some(format!(
            "{} examples, {} failures, {} pending",
            results.total(),
            results.failed(),
            results.skipped()
        ));
    }
}

impl Formatter for JsonFormatter {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn output(&self) -> &Output {
        &self.output
    }

    fn notify(&self, notification: Notification, payload: &Payload<'_>) -> Result<()> {
        let mut report = self.report.lock().unwrap_or_else(PoisonError::into_inner);

        match (notification, payload) {
            (Notification::MESSAGE, Payload::Message(message)) => {
                report.messages.push(message.to_string());
            }
            (Notification::SEED, Payload::Seed(seed)) => report.seed = Some(*seed),
            (Notification::STOP | Notification::DUMP_SUMMARY, Payload::Summary(results)) => {
                Self::summarize(&mut report, results);
            }
            (Notification::DUMP_PROFILE, Payload::Summary(results)) => {
                let slowest: Vec<TestResult> = results
                    .slowest(PROFILE_LIMIT)
                    .into_iter()
                    .cloned()
                    .collect();
                report.profile = Some(Profile {
                    slowest_ms: slowest.iter().map(|r| r.duration_ms).sum(),
                    total_ms: results.metrics().total_duration_ms,
                    examples: slowest,
                });
            }
            (Notification::CLOSE, _) => {
                let json = serde_json::to_string(&*report)
                    .context("Failed to serialize test results to JSON")?;
                self.output
                    .write_line(&json)
                    .context("Failed to write JSON report")?;
            }
            _ => {}
        }
        Ok(())
    }
}
