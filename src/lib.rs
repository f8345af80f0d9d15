pub mod cli;
pub mod commands;
pub mod config;
pub mod formatters;
pub mod loader;
pub mod logging;
pub mod report;
pub mod state;
pub mod utils;

pub use formatters::{Formatter, FormatterType, FormatterTypeRef};
pub use loader::{ActiveFormatter, Loader, LoaderError};
pub use report::{Notification, NotificationRegistry, Reporter};
