use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};
use truthcord_core::normalize::normalize;

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{:?}", event));
    }
}

fn collect_events<T>(f: impl FnOnce() -> T) -> (T, Vec<String>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let subscriber = Registry::default().with(EventCollector {
        events: events.clone(),
    });
    let out = tracing::subscriber::with_default(subscriber, f);
    let events = events.lock().unwrap().clone();
    (out, events)
}

#[test]
fn two_header_cards_keep_the_first_and_warn() {
    let html = r#"<p><span class="h-card">@first</span> and <span class="h-card">@second</span></p>"#;
    let (normalized, events) = collect_events(|| normalize(html, "External link"));

    assert_eq!(normalized.header.as_deref(), Some("@first"));
    assert!(
        events
            .iter()
            .any(|e| e.contains("Multiple header cards found") && e.contains("@second")),
        "expected a warning about the second header card, got: {events:?}"
    );
}

#[test]
fn two_quote_inlines_keep_the_first_and_warn() {
    let html = concat!(
        r#"<p>a<span class="quote-inline">https://truthsocial.com/users/one/statuses/1</span></p>"#,
        r#"<p>b<span class="quote-inline">https://truthsocial.com/users/two/statuses/2</span></p>"#,
    );
    let (normalized, events) = collect_events(|| normalize(html, "External link"));

    assert_eq!(
        normalized.footer.as_deref(),
        Some("[one](https://truthsocial.com/users/one/statuses/1)")
    );
    assert_eq!(normalized.paragraphs, vec!["a", "b"]);
    assert!(events.iter().any(|e| e.contains("Multiple quote in lines found")));
}
