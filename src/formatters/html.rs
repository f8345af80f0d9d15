// HTML formatter - a single self-contained report page

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;

use super::{Formatter, split_outputs};
use crate::report::{Notification, Payload};
use crate::state::{TestResult, TestStatus};
use crate::utils::Output;

/// HTML formatter
pub struct HtmlFormatter {
    type_name: String,
    output: Output,
    table_open: AtomicBool,
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

impl HtmlFormatter {
    pub fn new(type_name: &str, outputs: Vec<Output>) -> Self {
        let (output, _) = split_outputs(outputs);
        Self {
            type_name: type_name.to_string(),
            output,
            table_open: AtomicBool::new(false),
        }
    }

    fn close_table(&self) -> Result<()> {
        if self.table_open.swap(false, Ordering::Relaxed) {
            self.output.write_line("</table>")?;
        }
        Ok(())
    }

    fn example_row(&self, result: &TestResult) -> Result<()> {
        if !self.table_open.swap(true, Ordering::Relaxed) {
            self.output.write_line("<table class=\"examples\">")?;
        }

        let status = match result.status {
            TestStatus::Pass => "passed",
            TestStatus::Fail => "failed",
            TestStatus::Skip => "pending",
        };
        let detail = result
            .error_message
            .as_deref()
            .map(|m| format!("<pre>{}</pre>", escape_html(m)))
            .unwrap_or_default();

        self.output.write_line(&format!(
            "<tr class=\"{}\"><td>{}</td><td>{}ms</td><td>{}</td></tr>",
            status,
            escape_html(&result.name),
            result.duration_ms,
            detail
        ))?;
        Ok(())
    }
}

impl Formatter for HtmlFormatter {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn output(&self) -> &Output {
        &self.output
    }

    fn notify(&self, notification: Notification, payload: &Payload<'_>) -> Result<()> {
        match (notification, payload) {
            (Notification::START, Payload::Start { count }) => {
                self.output.write_line("<!DOCTYPE html>")?;
                self.output.write_line("<html><head><meta charset=\"utf-8\">")?;
                self.output.write_line("<title>Test Results</title></head><body>")?;
                self.output
                    .write_line(&format!("<p class=\"count\">{} examples</p>", count))?;
            }
            (Notification::EXAMPLE_GROUP_STARTED, Payload::Group { description, depth }) => {
                self.close_table()?;
                let level = (depth + 2).min(6);
                self.output.write_line(&format!(
                    "<h{level}>{}</h{level}>",
                    escape_html(description)
                ))?;
            }
            (
                Notification::EXAMPLE_PASSED
                | Notification::EXAMPLE_FAILED
                | Notification::EXAMPLE_PENDING,
                Payload::Example(result),
            ) => self.example_row(result)?,
            (Notification::DUMP_SUMMARY, Payload::Summary(results)) => {
                self.close_table()?;
                self.output.write_line(&format!(
                    "<p class=\"totals\">{} examples, {} failures, {} pending</p>",
                    results.total(),
                    results.failed(),
                    results.skipped()
                ))?;
                self.output.write_line("</body></html>")?;
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TestResults;

    #[test]
    fn test_escapes_example_content() {
        let (output, buffer) = Output::buffer();
        let formatter = HtmlFormatter::new("H", vec![output]);
        let fail = TestResult::fail("<script>", "a & \"b\"", 3);

        formatter
            .notify(Notification::EXAMPLE_FAILED, &Payload::Example(&fail))
            .unwrap();
        formatter
            .notify(Notification::DUMP_SUMMARY, &Payload::Summary(&TestResults::new()))
            .unwrap();

        let html = buffer.contents();
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("a &amp; &quot;b&quot;"));
        assert!(html.contains("</table>"));
        assert!(html.ends_with("</body></html>\n"));
    }
}
