// Failure list formatter - one `name: message` line per failure

use anyhow::Result;

use super::{Formatter, split_outputs};
use crate::report::{Notification, Payload};
use crate::utils::Output;

pub struct FailureListFormatter {
    type_name: String,
    output: Output,
}

impl FailureListFormatter {
    pub fn new(type_name: &str, outputs: Vec<Output>) -> Self {
        let (output, _) = split_outputs(outputs);
        Self {
            type_name: type_name.to_string(),
            output,
        }
    }
}

impl Formatter for FailureListFormatter {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn output(&self) -> &Output {
        &self.output
    }

    fn notify(&self, notification: Notification, payload: &Payload<'_>) -> Result<()> {
        // `message` is subscribed only so no fallback prints into the list
        if let (Notification::EXAMPLE_FAILED, Payload::Example(result)) = (notification, payload) {
            let message = result
                .error_message
                .as_deref()
                .unwrap_or("Unknown error")
                .lines()
                .collect::<Vec<_>>()
                .join(" ");
            self.output
                .write_line(&format!("{}: {}", result.name, message))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TestResult;

    #[test]
    fn test_single_line_per_failure() {
        let (output, buffer) = Output::buffer();
        let formatter = FailureListFormatter::new("F", vec![output]);
        let fail = TestResult::fail("math/divides", "expected 1\ngot 2", 1);

        formatter
            .notify(Notification::EXAMPLE_FAILED, &Payload::Example(&fail))
            .unwrap();
        formatter
            .notify(Notification::MESSAGE, &Payload::Message("noise"))
            .unwrap();

        assert_eq!(buffer.contents(), "math/divides: expected 1 got 2\n");
    }
}
