// Documentation formatter - nested group and example names

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use console::Style;

use super::base::{BaseTextFormatter, paint};
use super::{Formatter, split_outputs};
use crate::report::{Notification, Payload};
use crate::state::TestResult;
use crate::utils::Output;

pub struct DocumentationFormatter {
    text: BaseTextFormatter,
    output: Output,
    depth: AtomicUsize,
}

impl DocumentationFormatter {
    pub fn new(type_name: &str, outputs: Vec<Output>) -> Self {
        let (output, _) = split_outputs(outputs);
        Self {
            text: BaseTextFormatter::new(type_name, vec![output.clone()]),
            output,
            depth: AtomicUsize::new(0),
        }
    }

    fn indent(&self) -> String {
        "  ".repeat(self.depth.load(Ordering::Relaxed))
    }

    fn example_line(&self, result: &TestResult, suffix: Option<String>, style: Style) -> Result<()> {
        let mut line = format!("{}{}", self.indent(), result.name);
        if let Some(suffix) = suffix {
            line.push_str(&format!(" ({})", suffix));
        }
        self.output.write_line(&paint(&self.output, &line, &style))?;
        Ok(())
    }
}

impl Formatter for DocumentationFormatter {
    fn type_name(&self) -> &str {
        self.text.type_name()
    }

    fn output(&self) -> &Output {
        &self.output
    }

    fn notify(&self, notification: Notification, payload: &Payload<'_>) -> Result<()> {
        match (notification, payload) {
            (Notification::EXAMPLE_GROUP_STARTED, Payload::Group { description, depth }) => {
                if *depth == 0 {
                    self.output.write_line("")?;
                }
                self.depth.store(*depth, Ordering::Relaxed);
                self.output
                    .write_line(&format!("{}{}", self.indent(), description))?;
                self.depth.store(depth + 1, Ordering::Relaxed);
                Ok(())
            }
            (Notification::EXAMPLE_GROUP_FINISHED, Payload::Group { depth, .. }) => {
                self.depth.store(*depth, Ordering::Relaxed);
                Ok(())
            }
            (Notification::EXAMPLE_PASSED, Payload::Example(result)) => {
                self.example_line(result, None, Style::new().green())
            }
            (Notification::EXAMPLE_FAILED, Payload::Example(result)) => {
                self.example_line(result, Some("FAILED".to_string()), Style::new().red())
            }
            (Notification::EXAMPLE_PENDING, Payload::Example(result)) => {
                let reason = result
                    .error_message
                    .clone()
                    .map(|r| format!("PENDING: {}", r))
                    .unwrap_or_else(|| "PENDING".to_string());
                self.example_line(result, Some(reason), Style::new().yellow())
            }
            _ => self.text.notify(notification, payload),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_output() {
        let (output, buffer) = Output::buffer();
        let formatter = DocumentationFormatter::new("D", vec![output]);
        let pass = TestResult::pass("adds", 1);
        let fail = TestResult::fail("subtracts", "off by one", 1);

        formatter
            .notify(
                Notification::EXAMPLE_GROUP_STARTED,
                &Payload::Group { description: "Calculator", depth: 0 },
            )
            .unwrap();
        formatter
            .notify(Notification::EXAMPLE_PASSED, &Payload::Example(&pass))
            .unwrap();
        formatter
            .notify(Notification::EXAMPLE_FAILED, &Payload::Example(&fail))
            .unwrap();

        assert_eq!(
            buffer.contents(),
            "\nCalculator\n  adds\n  subtracts (FAILED)\n"
        );
    }
}
