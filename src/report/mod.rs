// Report module - notification kinds, subscription registry and the dispatching reporter

pub mod notification;
pub mod registry;
pub mod replay;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error};

use crate::formatters::Formatter;
use crate::state::{TestResult, TestResults, TestStatus};

pub use notification::Notification;
pub use registry::{NotificationRegistry, RegistrySnapshot};
pub use replay::{StreamEvent, replay};

/// Data handed to a formatter alongside a notification
#[derive(Debug, Clone, Copy)]
pub enum Payload<'a> {
    Empty,
    Start { count: usize },
    Group { description: &'a str, depth: usize },
    ExampleStarted { name: &'a str },
    Example(&'a TestResult),
    Message(&'a str),
    Deprecation(&'a DeprecationNotice),
    Summary(&'a TestResults),
    Seed(u64),
}

/// A deprecation reported during setup or the run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeprecationNotice {
    pub message: String,
    pub call_site: Option<String>,
}

impl DeprecationNotice {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            call_site: None,
        }
    }

    pub fn with_call_site(mut self, call_site: impl Into<String>) -> Self {
        self.call_site = Some(call_site.into());
        self
    }
}

impl fmt::Display for DeprecationNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(call_site) = &self.call_site {
            write!(f, " ({})", call_site)?;
        }
        Ok(())
    }
}

/// Event dispatcher formatters subscribe to
#[derive(Default)]
pub struct Reporter {
    listeners: BTreeMap<Notification, Vec<Arc<dyn Formatter>>>,
    pending_deprecations: Vec<DeprecationNotice>,
    results: TestResults,
    group_depth: usize,
    seed: Option<u64>,
    profile_examples: bool,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `listener` to each of `notifications`
    pub fn register_listener(
        &mut self,
        listener: Arc<dyn Formatter>,
        notifications: impl IntoIterator<Item = Notification>,
    ) {
        let mut wants_deprecations = false;
        for notification in notifications {
            let listeners = self.listeners.entry(notification).or_default();
            if listeners.iter().any(|l| Arc::ptr_eq(l, &listener)) {
                continue;
            }
            if notification == Notification::DEPRECATION && listeners.is_empty() {
                wants_deprecations = true;
            }
            listeners.push(Arc::clone(&listener));
        }

        debug!("Registered listener {}", listener.type_name());

        if wants_deprecations {
            for notice in std::mem::take(&mut self.pending_deprecations) {
                self.notify(Notification::DEPRECATION, &Payload::Deprecation(&notice));
            }
        }
    }

    /// Listeners subscribed to `notification`, in registration order
    pub fn registered_listeners(&self, notification: Notification) -> &[Arc<dyn Formatter>] {
        self.listeners
            .get(&notification)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every distinct listener, grouped by notification name; a listener appears
    /// under the first name it subscribes to
    pub fn listeners(&self) -> Vec<Arc<dyn Formatter>> {
        let mut all: Vec<Arc<dyn Formatter>> = Vec::new();
        for listener in self.listeners.values().flatten() {
            if !all.iter().any(|l| Arc::ptr_eq(l, listener)) {
                all.push(Arc::clone(listener));
            }
        }
        all
    }

    /// Send `notification` to its subscribers; a failing formatter does not stop the others
    pub fn notify(&self, notification: Notification, payload: &Payload<'_>) {
        for listener in self.registered_listeners(notification) {
            if let Err(e) = listener.notify(notification, payload) {
                error!(
                    "Formatter {} failed on {}: {:#}",
                    listener.type_name(),
                    notification,
                    e
                );
            }
        }
    }

    /// Report a deprecation; held back until someone listens for deprecations
    pub fn deprecation(&mut self, notice: DeprecationNotice) {
        if self.registered_listeners(Notification::DEPRECATION).is_empty() {
            self.pending_deprecations.push(notice);
        } else {
            self.notify(Notification::DEPRECATION, &Payload::Deprecation(&notice));
        }
    }

    pub fn pending_deprecations(&self) -> &[DeprecationNotice] {
        &self.pending_deprecations
    }

    pub fn set_seed(&mut self, seed: Option<u64>) {
        self.seed = seed;
    }

    pub fn set_profile_examples(&mut self, enabled: bool) {
        self.profile_examples = enabled;
    }

    pub fn profile_examples(&self) -> bool {
        self.profile_examples
    }

    pub fn results(&self) -> &TestResults {
        &self.results
    }

    pub fn start(&mut self, count: usize) {
        self.results = TestResults::new();
        self.notify(Notification::START, &Payload::Start { count });
    }

    pub fn group_started(&mut self, description: &str) {
        self.notify(
            Notification::EXAMPLE_GROUP_STARTED,
            &Payload::Group {
                description,
                depth: self.group_depth,
            },
        );
        self.group_depth += 1;
    }

    pub fn group_finished(&mut self, description: &str) {
        self.group_depth = self.group_depth.saturating_sub(1);
        self.notify(
            Notification::EXAMPLE_GROUP_FINISHED,
            &Payload::Group {
                description,
                depth: self.group_depth,
            },
        );
    }

    pub fn example_started(&self, name: &str) {
        self.notify(
            Notification::EXAMPLE_STARTED,
            &Payload::ExampleStarted { name },
        );
    }

    pub fn example_finished(&mut self, result: TestResult) {
        let notification = match result.status {
            TestStatus::Pass => Notification::EXAMPLE_PASSED,
            TestStatus::Fail => Notification::EXAMPLE_FAILED,
            TestStatus::Skip => Notification::EXAMPLE_PENDING,
        };
        self.notify(notification, &Payload::Example(&result));
        self.results.add(result);
    }

    pub fn message(&self, message: &str) {
        self.notify(Notification::MESSAGE, &Payload::Message(message));
    }

    /// Run the end-of-run notification sequence
    pub fn finish(&mut self) -> &TestResults {
        self.results.metrics.update_time();
        let summary = Payload::Summary(&self.results);

        self.notify(Notification::STOP, &summary);
        self.notify(Notification::START_DUMP, &Payload::Empty);
        self.notify(Notification::DUMP_PENDING, &summary);
        self.notify(Notification::DUMP_FAILURES, &summary);
        self.notify(Notification::DUMP_SUMMARY, &summary);
        if self.profile_examples {
            self.notify(Notification::DUMP_PROFILE, &summary);
        }
        self.notify(Notification::DEPRECATION_SUMMARY, &Payload::Empty);
        if let Some(seed) = self.seed {
            self.notify(Notification::SEED, &Payload::Seed(seed));
        }
        self.notify(Notification::CLOSE, &Payload::Empty);

        &self.results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::Output;
    use std::sync::Mutex;

    struct Recorder {
        output: Output,
        seen: Mutex<Vec<Notification>>,
    }

    impl Recorder {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                output: Output::Stdout,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<Notification> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl Formatter for Recorder {
        fn type_name(&self) -> &str {
            "Test::Recorder"
        }

        fn output(&self) -> &Output {
            &self.output
        }

        fn notify(&self, notification: Notification, _payload: &Payload<'_>) -> anyhow::Result<()> {
            self.seen.lock().unwrap().push(notification);
            Ok(())
        }
    }

    #[test]
    fn test_only_subscribed_notifications_are_delivered() {
        let recorder = Recorder::new();
        let mut reporter = Reporter::new();
        reporter.register_listener(recorder.clone(), [Notification::EXAMPLE_FAILED]);

        reporter.example_finished(TestResult::pass("a", 1));
        reporter.example_finished(TestResult::fail("b", "boom", 1));

        assert_eq!(recorder.seen(), vec![Notification::EXAMPLE_FAILED]);
        assert_eq!(reporter.results().total(), 2);
    }

    #[test]
    fn test_finish_sequence() {
        let recorder = Recorder::new();
        let mut reporter = Reporter::new();
        reporter.register_listener(recorder.clone(), Notification::ALL);
        reporter.set_seed(Some(42));

        reporter.finish();

        assert_eq!(
            recorder.seen(),
            vec![
                Notification::STOP,
                Notification::START_DUMP,
                Notification::DUMP_PENDING,
                Notification::DUMP_FAILURES,
                Notification::DUMP_SUMMARY,
                Notification::DEPRECATION_SUMMARY,
                Notification::SEED,
                Notification::CLOSE,
            ]
        );
    }

    #[test]
    fn test_deprecations_are_replayed_to_first_listener() {
        let mut reporter = Reporter::new();
        reporter.deprecation(DeprecationNotice::new("old api"));
        assert_eq!(reporter.pending_deprecations().len(), 1);

        let recorder = Recorder::new();
        reporter.register_listener(recorder.clone(), [Notification::DEPRECATION]);

        assert!(reporter.pending_deprecations().is_empty());
        assert_eq!(recorder.seen(), vec![Notification::DEPRECATION]);
    }

    #[test]
    fn test_listener_registered_once_per_notification() {
        let recorder = Recorder::new();
        let mut reporter = Reporter::new();
        reporter.register_listener(recorder.clone(), [Notification::MESSAGE]);
        reporter.register_listener(recorder.clone(), [Notification::MESSAGE]);

        assert_eq!(reporter.registered_listeners(Notification::MESSAGE).len(), 1);
        assert_eq!(reporter.listeners().len(), 1);
    }

    #[test]
    fn test_listeners_follow_notification_names() {
        let starter = Recorder::new();
        let closer = Recorder::new();
        let mut reporter = Reporter::new();
        reporter.register_listener(starter.clone(), [Notification::START]);
        reporter.register_listener(closer.clone(), [Notification::CLOSE]);

        let listeners = reporter.listeners();

        // "close" sorts before "start"
        let closer: Arc<dyn Formatter> = closer;
        let starter: Arc<dyn Formatter> = starter;
        assert!(Arc::ptr_eq(&listeners[0], &closer));
        assert!(Arc::ptr_eq(&listeners[1], &starter));
    }
}
