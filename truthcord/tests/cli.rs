use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::write;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

const SECRET_VARS: [&str; 5] = [
    "DISCORD_WEBHOOK_URL",
    "TRUTHSOCIAL_TOKEN",
    "AZURE_TRANSLATOR_KEY",
    "AZURE_TRANSLATOR_LOCATION",
    "IMGUR_CLIENT_ID",
];

fn temp_file(contents: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("Creating temp file failed");
    write(file.path(), contents).expect("Writing temp file failed");
    file
}

fn truthcord() -> Command {
    let mut cmd = Command::cargo_bin("truthcord").expect("Binary exists");
    for name in SECRET_VARS {
        cmd.env_remove(name);
    }
    cmd
}

#[test]
fn help_lists_subcommands() {
    truthcord()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run").and(predicate::str::contains("render")));
}

#[test]
fn run_without_config_file_fails() {
    truthcord()
        .args(["run", "--config", "/no/such/config.yaml", "--once"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn run_without_webhook_fails_at_startup() {
    let config = temp_file("account: alice\n");
    truthcord()
        .args(["run", "--once", "--config"])
        .arg(config.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("DISCORD_WEBHOOK_URL"));
}

#[test]
fn run_rejects_malformed_pull_since() {
    let config = temp_file("account: alice\n");
    truthcord()
        .env("DISCORD_WEBHOOK_URL", "http://127.0.0.1:9/hook")
        .args(["run", "--once", "--pull-since", "1d", "--config"])
        .arg(config.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("must start with '-'"));
}

#[test]
fn render_prints_message_without_delivering() {
    let config = temp_file("account: alice\n");
    let post = temp_file(
        r#"{
  "id": "112233",
  "created_at": "2024-01-01T00:00:00.000Z",
  "content": "<p>Hello <a href=\"https://example.com/a\">https://example.com/a</a></p>",
  "url": "https://truthsocial.com/@alice/112233",
  "account": {"id": "1", "username": "alice", "acct": "alice", "display_name": "Alice", "url": "https://truthsocial.com/@alice"},
  "media_attachments": []
}"#,
    );

    truthcord()
        .args(["render", "--config"])
        .arg(config.path())
        .arg("--post")
        .arg(post.path())
        .assert()
        .success()
        .stdout(
            predicate::str::contains(
                "-# :loudspeaker: [@alice](https://truthsocial.com/@alice) • <t:1704067200>",
            )
            .and(predicate::str::contains("Hello"))
            .and(predicate::str::contains("> -# [External link](https://example.com/a)")),
        );
}

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

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use truthcord::cli::{run, Cli, Commands};

    let cli = Cli {
        command: Commands::Render {
            config: std::path::PathBuf::from("dummy.yaml"),
            post: std::path::PathBuf::from("dummy.json"),
        },
    };
    assert!(run(cli).await.is_err());

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
    assert!(event_msgs
        .iter()
        .any(|msg| msg.contains("Failed to read config file")));
}
