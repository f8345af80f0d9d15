// Fallback message formatter - keeps reporter messages visible when nothing else prints them

use anyhow::Result;

use super::{Formatter, split_outputs};
use crate::report::{Notification, Payload};
use crate::utils::Output;

pub struct FallbackMessageFormatter {
    type_name: String,
    output: Output,
}

impl FallbackMessageFormatter {
    pub fn new(type_name: &str, outputs: Vec<Output>) -> Self {
        let (output, _) = split_outputs(outputs);
        Self {
            type_name: type_name.to_string(),
            output,
        }
    }
}

impl Formatter for FallbackMessageFormatter {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn output(&self) -> &Output {
        &self.output
    }

    fn notify(&self, notification: Notification, payload: &Payload<'_>) -> Result<()> {
        if let (Notification::MESSAGE, Payload::Message(message)) = (notification, payload) {
            self.output.write_line(message)?;
        }
        Ok(())
    }
}
