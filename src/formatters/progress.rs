// Progress formatter - one character per example

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use console::Style;

use super::base::{BaseTextFormatter, paint};
use super::{Formatter, split_outputs};
use crate::report::{Notification, Payload};
use crate::utils::Output;

const LINE_WIDTH: usize = 80;

/// Progress formatter
pub struct ProgressFormatter {
    text: BaseTextFormatter,
    output: Output,
    dots_count: AtomicUsize,
}

impl ProgressFormatter {
    pub fn new(type_name: &str, outputs: Vec<Output>) -> Self {
        let (output, _) = split_outputs(outputs);
        Self {
            text: BaseTextFormatter::new(type_name, vec![output.clone()]),
            output,
            dots_count: AtomicUsize::new(0),
        }
    }

    fn dot(&self, symbol: &str, style: Style) -> Result<()> {
        self.output.write_str(&paint(&self.output, symbol, &style))?;

        let count = self.dots_count.fetch_add(1, Ordering::Relaxed) + 1;
        if count >= LINE_WIDTH {
            self.output.write_str("\n")?;
            self.dots_count.store(0, Ordering::Relaxed);
        }
        Ok(())
    }
}

impl Formatter for ProgressFormatter {
    fn type_name(&self) -> &str {
        self.text.type_name()
    }

    fn output(&self) -> &Output {
        &self.output
    }

    fn notify(&self, notification: Notification, payload: &Payload<'_>) -> Result<()> {
        match notification {
            Notification::EXAMPLE_PASSED => self.dot(".", Style::new().green()),
            Notification::EXAMPLE_FAILED => self.dot("F", Style::new().red()),
            Notification::EXAMPLE_PENDING => self.dot("*", Style::new().yellow()),
            Notification::START_DUMP => {
                // Ensure newline after dots
                if self.dots_count.swap(0, Ordering::Relaxed) > 0 {
                    self.output.write_str("\n")?;
                }
                Ok(())
            }
            _ => self.text.notify(notification, payload),
        }
    }
}
