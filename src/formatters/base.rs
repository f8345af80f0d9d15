// Base formatters - shared plumbing and the plain-text summary

use anyhow::Result;
use console::Style;

use super::{Formatter, split_outputs};
use crate::report::{Notification, Payload};
use crate::state::{TestResults, TestStatus};
use crate::utils::Output;

/// Apply `style` when writing to a color-capable terminal
pub(crate) fn paint(output: &Output, text: &str, style: &Style) -> String {
    if output.is_terminal() && console::colors_enabled() {
        style.apply_to(text).to_string()
    } else {
        text.to_string()
    }
}

/// Formatter that observes the run without rendering anything
pub struct BaseFormatter {
    type_name: String,
    output: Output,
}

impl BaseFormatter {
    pub fn new(type_name: &str, outputs: Vec<Output>) -> Self {
        let (output, _) = split_outputs(outputs);
        Self {
            type_name: type_name.to_string(),
            output,
        }
    }
}

impl Formatter for BaseFormatter {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn output(&self) -> &Output {
        &self.output
    }

    fn notify(&self, _notification: Notification, _payload: &Payload<'_>) -> Result<()> {
        Ok(())
    }
}

/// Prints messages, failure and pending listings, and the closing summary
pub struct BaseTextFormatter {
    type_name: String,
    output: Output,
}

impl BaseTextFormatter {
    pub fn new(type_name: &str, outputs: Vec<Output>) -> Self {
        let (output, _) = split_outputs(outputs);
        Self {
            type_name: type_name.to_string(),
            output,
        }
    }

    /// Render the notifications every text formatter shares.
    ///
    /// Returns `false` for notifications this layer does not render.
    pub fn render(&self, notification: Notification, payload: &Payload<'_>) -> Result<bool> {
        match (notification, payload) {
            (Notification::MESSAGE, Payload::Message(message)) => {
                self.output.write_line(message)?;
            }
            (Notification::DUMP_PENDING, Payload::Summary(results)) => self.dump_pending(results)?,
            (Notification::DUMP_FAILURES, Payload::Summary(results)) => {
                self.dump_failures(results)?
            }
            (Notification::DUMP_SUMMARY, Payload::Summary(results)) => self.dump_summary(results)?,
            (Notification::SEED, Payload::Seed(seed)) => {
                self.output
                    .write_line(&format!("\nRandomized with seed {}", seed))?;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn dump_pending(&self, results: &TestResults) -> Result<()> {
        let pending: Vec<_> = results.with_status(TestStatus::Skip).collect();
        if pending.is_empty() {
            return Ok(());
        }

        self.output.write_line("\nPending:")?;
        for (i, result) in pending.iter().enumerate() {
            let line = format!("  {}) {}", i + 1, result.name);
            self.output
                .write_line(&paint(&self.output, &line, &Style::new().yellow()))?;
            if let Some(reason) = &result.error_message {
                self.output.write_line(&format!("     # {}", reason))?;
            }
        }
        Ok(())
    }

    fn dump_failures(&self, results: &TestResults) -> Result<()> {
        let failures: Vec<_> = results.with_status(TestStatus::Fail).collect();
        if failures.is_empty() {
            return Ok(());
        }

        self.output.write_line("\nFailures:")?;
        for (i, result) in failures.iter().enumerate() {
            self.output
                .write_line(&format!("\n  {}) {}", i + 1, result.name))?;
            let message = result.error_message.as_deref().unwrap_or("Unknown error");
            for line in message.lines() {
                self.output
                    .write_line(&paint(&self.output, &format!("     {}", line), &Style::new().red()))?;
            }
        }
        Ok(())
    }

    fn dump_summary(&self, results: &TestResults) -> Result<()> {
        let seconds = results.metrics().total_duration_ms as f64 / 1000.0;
        self.output
            .write_line(&format!("\nFinished in {:.5} seconds", seconds))?;

        let mut totals = format!(
            "{} example{}, {} failure{}",
            results.total(),
            if results.total() == 1 { "" } else { "s" },
            results.failed(),
            if results.failed() == 1 { "" } else { "s" },
        );
        if results.skipped() > 0 {
            totals.push_str(&format!(", {} pending", results.skipped()));
        }

        let style = if results.failed() > 0 {
            Style::new().red()
        } else if results.skipped() > 0 {
            Style::new().yellow()
        } else {
            Style::new().green()
        };
        self.output.write_line(&paint(&self.output, &totals, &style))?;
        Ok(())
    }
}

impl Formatter for BaseTextFormatter {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn output(&self) -> &Output {
        &self.output
    }

    fn notify(&self, notification: Notification, payload: &Payload<'_>) -> Result<()> {
        self.render(notification, payload)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TestResult;

    #[test]
    fn test_summary_counts() {
        let (output, buffer) = Output::buffer();
        let formatter = BaseTextFormatter::new("T", vec![output]);
        let mut results = TestResults::new();
        results.add(TestResult::pass("a", 1));
        results.add(TestResult::fail("b", "expected true", 1));

        formatter
            .notify(Notification::DUMP_SUMMARY, &Payload::Summary(&results))
            .unwrap();

        assert!(buffer.contents().contains("2 examples, 1 failure"));
    }

    #[test]
    fn test_failures_listing() {
        let (output, buffer) = Output::buffer();
        let formatter = BaseTextFormatter::new("T", vec![output]);
        let mut results = TestResults::new();
        results.add(TestResult::fail("checks login", "401 != 200", 1));

        formatter
            .notify(Notification::DUMP_FAILURES, &Payload::Summary(&results))
            .unwrap();

        let text = buffer.contents();
        assert!(text.contains("1) checks login"));
        assert!(text.contains("401 != 200"));
    }

    #[test]
    fn test_unrelated_notification_is_not_rendered() {
        let (output, buffer) = Output::buffer();
        let formatter = BaseTextFormatter::new("T", vec![output]);

        let handled = formatter
            .render(Notification::EXAMPLE_STARTED, &Payload::ExampleStarted { name: "x" })
            .unwrap();

        assert!(!handled);
        assert!(buffer.contents().is_empty());
    }
}
