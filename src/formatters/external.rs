// External formatter - delegates rendering to an executable

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Value, json};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use super::{Formatter, split_outputs};
use crate::report::{Notification, Payload};
use crate::utils::Output;

#[derive(Debug, Serialize)]
struct ExternalFormatterRequest<'a> {
    version: &'static str,
    formatter: &'a str,
    notification: &'static str,
    payload: Value,
}

/// Runs `executable` once per notification with a JSON request on stdin and
/// copies whatever it prints to the bound output
pub struct ExternalFormatter {
    type_name: String,
    output: Output,
    executable_path: PathBuf,
}

impl ExternalFormatter {
    pub fn new(type_name: &str, executable_path: PathBuf, outputs: Vec<Output>) -> Self {
        let (output, _) = split_outputs(outputs);
        Self {
            type_name: type_name.to_string(),
            output,
            executable_path,
        }
    }

    pub fn executable_path(&self) -> &PathBuf {
        &self.executable_path
    }
}

/// JSON form of a payload as seen by external formatters
pub fn payload_to_json(payload: &Payload<'_>) -> Value {
    match payload {
        Payload::Empty => Value::Null,
        Payload::Start { count } => json!({ "count": count }),
        Payload::Group { description, depth } => {
            json!({ "description": description, "depth": depth })
        }
        Payload::ExampleStarted { name } => json!({ "name": name }),
        Payload::Example(result) => serde_json::to_value(result).unwrap_or(Value::Null),
        Payload::Message(message) => json!({ "message": message }),
        Payload::Deprecation(notice) => serde_json::to_value(notice).unwrap_or(Value::Null),
        Payload::Summary(results) => json!({
            "total": results.total(),
            "passed": results.passed(),
            "failed": results.failed(),
            "skipped": results.skipped(),
            "duration": results.metrics().total_duration_ms,
        }),
        Payload::Seed(seed) => json!({ "seed": seed }),
    }
}

impl Formatter for ExternalFormatter {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn output(&self) -> &Output {
        &self.output
    }

    fn notify(&self, notification: Notification, payload: &Payload<'_>) -> Result<()> {
        let request = ExternalFormatterRequest {
            version: "1.0.0",
            formatter: &self.type_name,
            notification: notification.as_str(),
            payload: payload_to_json(payload),
        };

        let request_json =
            serde_json::to_string(&request).context("Failed to serialize formatter request")?;

        let mut child = Command::new(&self.executable_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| {
                format!(
                    "Failed to spawn formatter executable: {}",
                    self.executable_path.display()
                )
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(request_json.as_bytes())
                .context("Failed to write to formatter stdin")?;
        }

        let output = child
            .wait_with_output()
            .context("Failed to wait for formatter execution")?;

        if !output.status.success() {
            anyhow::bail!(
                "Formatter {} exited with status: {}",
                self.executable_path.display(),
                output.status
            );
        }

        if !output.stdout.is_empty() {
            self.output
                .write_str(&String::from_utf8_lossy(&output.stdout))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TestResult;

    #[test]
    fn test_payload_json() {
        let result = TestResult::fail("a", "boom", 7);
        let value = payload_to_json(&Payload::Example(&result));
        assert_eq!(value["name"], "a");
        assert_eq!(value["status"], "fail");
        assert_eq!(payload_to_json(&Payload::Seed(9))["seed"], 9);
    }

    #[test]
    fn test_missing_executable_is_an_error() {
        let formatter = ExternalFormatter::new(
            "Acme::Missing",
            PathBuf::from("/nonexistent/formatter-binary"),
            vec![Output::Stdout],
        );

        let err = formatter
            .notify(Notification::CLOSE, &Payload::Empty)
            .unwrap_err();
        assert!(err.to_string().contains("Failed to spawn"));
    }
}
