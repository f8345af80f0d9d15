// Deprecation formatter - collects deprecation warnings and reports a total

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;

use super::Formatter;
use crate::report::{Notification, Payload};
use crate::utils::Output;

/// Writes each deprecation to the deprecation output and a total to the summary output.
///
/// The first output receives the warnings themselves, the second (when given)
/// the closing summary, so that warnings logged to a file still leave a trace
/// on the main stream.
pub struct DeprecationFormatter {
    type_name: String,
    deprecation_output: Output,
    summary_output: Output,
    count: AtomicUsize,
}

impl DeprecationFormatter {
    pub fn new(type_name: &str, outputs: Vec<Output>) -> Self {
        let mut outputs = outputs.into_iter();
        let deprecation_output = outputs.next().unwrap_or(Output::Stderr);
        let summary_output = outputs.next().unwrap_or_else(|| deprecation_output.clone());
        Self {
            type_name: type_name.to_string(),
            deprecation_output,
            summary_output,
            count: AtomicUsize::new(0),
        }
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    fn summary_line(&self, count: usize) -> String {
        let noun = if count == 1 { "warning" } else { "warnings" };
        match self.deprecation_output.path() {
            Some(path) => format!(
                "\n{} deprecation {} logged to {}",
                count,
                noun,
                path.display()
            ),
            None => format!("\n{} deprecation {} total", count, noun),
        }
    }
}

impl Formatter for DeprecationFormatter {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn output(&self) -> &Output {
        &self.deprecation_output
    }

    fn notify(&self, notification: Notification, payload: &Payload<'_>) -> Result<()> {
        match (notification, payload) {
            (Notification::DEPRECATION, Payload::Deprecation(notice)) => {
                if self.count.fetch_add(1, Ordering::Relaxed) == 0 {
                    self.deprecation_output.write_line("\nDeprecation Warnings:\n")?;
                }
                self.deprecation_output.write_line(&notice.message)?;
                if let Some(call_site) = &notice.call_site {
                    self.deprecation_output.write_line(call_site)?;
                }
            }
            (Notification::DEPRECATION_SUMMARY, _) => {
                let count = self.count();
                if count > 0 {
                    self.summary_output.write_line(&self.summary_line(count))?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}
