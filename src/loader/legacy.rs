// Legacy adapter - lets formatters without registered notifications take part

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::Result;

use crate::formatters::{Formatter, FormatterTypeRef};
use crate::report::Notification;
use crate::utils::Output;

/// An adapted formatter together with the notifications it asked for
pub struct LegacyFormatter {
    pub formatter: Arc<dyn Formatter>,
    pub notifications: BTreeSet<Notification>,
}

/// Bridge for formatter types that never registered with the notification registry
pub trait LegacyAdapter: Send + Sync {
    fn load_formatter(
        &self,
        formatter_type: &FormatterTypeRef,
        outputs: Vec<Output>,
    ) -> Result<LegacyFormatter>;
}

/// Subscribes a legacy formatter to every notification method it exposes
#[derive(Debug, Default, Clone, Copy)]
pub struct ProbeAdapter;

impl LegacyAdapter for ProbeAdapter {
    fn load_formatter(
        &self,
        formatter_type: &FormatterTypeRef,
        outputs: Vec<Output>,
    ) -> Result<LegacyFormatter> {
        let formatter = formatter_type.instantiate(outputs)?;
        Ok(LegacyFormatter {
            formatter,
            notifications: formatter_type.methods(),
        })
    }
}
