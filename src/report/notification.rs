// Notification kinds - the lifecycle events a formatter can subscribe to

use std::fmt;

/// Opaque tag identifying one lifecycle event emitted by the reporter.
///
/// The loader never looks inside a notification; it only collects sets of
/// them and hands those sets to the reporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Notification(&'static str);

impl Notification {
    pub const START: Notification = Notification("start");
    pub const EXAMPLE_GROUP_STARTED: Notification = Notification("example_group_started");
    pub const EXAMPLE_GROUP_FINISHED: Notification = Notification("example_group_finished");
    pub const EXAMPLE_STARTED: Notification = Notification("example_started");
    pub const EXAMPLE_PASSED: Notification = Notification("example_passed");
    pub const EXAMPLE_FAILED: Notification = Notification("example_failed");
    pub const EXAMPLE_PENDING: Notification = Notification("example_pending");
    pub const MESSAGE: Notification = Notification("message");
    pub const DEPRECATION: Notification = Notification("deprecation");
    pub const DEPRECATION_SUMMARY: Notification = Notification("deprecation_summary");
    pub const STOP: Notification = Notification("stop");
    pub const START_DUMP: Notification = Notification("start_dump");
    pub const DUMP_PENDING: Notification = Notification("dump_pending");
    pub const DUMP_FAILURES: Notification = Notification("dump_failures");
    pub const DUMP_SUMMARY: Notification = Notification("dump_summary");
    pub const DUMP_PROFILE: Notification = Notification("dump_profile");
    pub const SEED: Notification = Notification("seed");
    pub const CLOSE: Notification = Notification("close");

    /// Every notification the reporter knows how to emit
    pub const ALL: [Notification; 18] = [
        Self::START,
        Self::EXAMPLE_GROUP_STARTED,
        Self::EXAMPLE_GROUP_FINISHED,
        Self::EXAMPLE_STARTED,
        Self::EXAMPLE_PASSED,
        Self::EXAMPLE_FAILED,
        Self::EXAMPLE_PENDING,
        Self::MESSAGE,
        Self::DEPRECATION,
        Self::DEPRECATION_SUMMARY,
        Self::STOP,
        Self::START_DUMP,
        Self::DUMP_PENDING,
        Self::DUMP_FAILURES,
        Self::DUMP_SUMMARY,
        Self::DUMP_PROFILE,
        Self::SEED,
        Self::CLOSE,
    ];

    /// Look up a notification by its name (e.g. `"example_passed"`)
    pub fn parse(name: &str) -> Option<Notification> {
        Self::ALL.iter().copied().find(|n| n.0 == name)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}
