//! Log capture for pipeline assertions
//!
//! A `tracing_subscriber` layer that keeps each event's message, installed as
//! the thread's default subscriber for the lifetime of a guard.

use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing_subscriber::layer::{Context, SubscriberExt};

/// Messages recorded on this thread while the guard is alive
#[derive(Clone, Default)]
pub struct LogCapture {
    messages: Arc<Mutex<Vec<String>>>,
}

impl LogCapture {
    fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    /// Number of messages containing `pattern`
    pub fn count_matching(&self, pattern: &str) -> usize {
        self.messages()
            .iter()
            .filter(|message| message.contains(pattern))
            .count()
    }

    /// Panic unless some message contains `pattern`
    pub fn assert_contains(&self, pattern: &str) {
        let messages = self.messages();
        assert!(
            messages.iter().any(|message| message.contains(pattern)),
            "no log message contains '{}'; captured:\n{}",
            pattern,
            messages.join("\n")
        );
    }
}

struct MessageField<'a>(&'a mut String);

impl Visit for MessageField<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.0.push_str(value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0.push_str(&format!("{:?}", value));
        }
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for LogCapture {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut message = String::new();
        event.record(&mut MessageField(&mut message));
        self.messages.lock().unwrap().push(message);
    }
}

/// Capture `vsi_ai` logs on the current thread until the guard is dropped
///
/// Use with the default (current-thread) `#[tokio::test]` runtime.
pub fn capture_logs() -> (LogCapture, tracing::subscriber::DefaultGuard) {
    let capture = LogCapture::default();
    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new("vsi_ai=debug"))
        .with(capture.clone());
    (capture, tracing::subscriber::set_default(subscriber))
}
