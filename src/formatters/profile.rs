// Profile formatter - lists the slowest examples

use anyhow::Result;

use super::{Formatter, split_outputs};
use crate::report::{Notification, Payload};
use crate::state::TestResults;
use crate::utils::Output;

const PROFILE_LIMIT: usize = 10;

pub struct ProfileFormatter {
    type_name: String,
    output: Output,
}

impl ProfileFormatter {
    pub fn new(type_name: &str, outputs: Vec<Output>) -> Self {
        let (output, _) = split_outputs(outputs);
        Self {
            type_name: type_name.to_string(),
            output,
        }
    }

    fn dump_profile(&self, results: &TestResults) -> Result<()> {
        let slowest = results.slowest(PROFILE_LIMIT);
        if slowest.is_empty() {
            return Ok(());
        }

        let slowest_ms: u64 = slowest.iter().map(|r| r.duration_ms).sum();
        let total_ms = results.metrics().total_duration_ms;
        let percentage = if total_ms > 0 {
            slowest_ms as f64 / total_ms as f64 * 100.0
        } else {
            0.0
        };

        self.output.write_line(&format!(
            "\nTop {} slowest examples ({:.3} seconds, {:.1}% of total time):",
            slowest.len(),
            slowest_ms as f64 / 1000.0,
            percentage
        ))?;
        for result in slowest {
            self.output.write_line(&format!(
                "  {}\n    {:.3} seconds",
                result.name,
                result.duration_ms as f64 / 1000.0
            ))?;
        }
        Ok(())
    }
}

impl Formatter for ProfileFormatter {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn output(&self) -> &Output {
        &self.output
    }

    fn notify(&self, notification: Notification, payload: &Payload<'_>) -> Result<()> {
        if let (Notification::DUMP_PROFILE, Payload::Summary(results)) = (notification, payload) {
            self.dump_profile(results)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TestResult;

    #[test]
    fn test_lists_slowest_first() {
        let (output, buffer) = Output::buffer();
        let formatter = ProfileFormatter::new("P", vec![output]);
        let mut results = TestResults::new();
        results.add(TestResult::pass("quick", 5));
        results.add(TestResult::pass("sluggish", 1500));

        formatter
            .notify(Notification::DUMP_PROFILE, &Payload::Summary(&results))
            .unwrap();

        let text = buffer.contents();
        assert!(text.contains("Top 2 slowest examples"));
        assert!(text.find("sluggish").unwrap() < text.find("quick").unwrap());
    }
}
