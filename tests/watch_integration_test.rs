//! Live filesystem watch scenarios through the real notify backend.
//!
//! Timing-sensitive by nature: each scenario gives the OS watcher a settle
//! period before mutating files and a generous timeout before asserting.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use vigil::{EventKind, Expr, TriggerSet, WatchRegistry};

const SETTLE: Duration = Duration::from_millis(300);
const WAIT: Duration = Duration::from_secs(5);

fn channel_trigger(
    tx: mpsc::UnboundedSender<PathBuf>,
) -> impl Fn(&Path) + Send + Sync + 'static {
    move |path: &Path| {
        let _ = tx.send(path.to_path_buf());
    }
}

fn expr(text: &str) -> Expr {
    Expr::parse_str(text).unwrap()
}

async fn drain(rx: &mut mpsc::UnboundedReceiver<PathBuf>) -> usize {
    sleep(SETTLE).await;
    let mut n = 0;
    while rx.try_recv().is_ok() {
        n += 1;
    }
    n
}

#[tokio::test(flavor = "multi_thread")]
async fn test_change_event_reaches_trigger() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("watched.txt");
    fs::write(&file, "first").unwrap();

    let registry = WatchRegistry::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let triggers = TriggerSet::new().on(EventKind::Change, channel_trigger(tx));
    registry.watch(&file, expr(r#"["true"]"#), triggers).unwrap();

    sleep(SETTLE).await;
    fs::write(&file, "second").unwrap();

    let fired = timeout(WAIT, rx.recv()).await.expect("no change event");
    let fired = fired.expect("channel closed");
    assert_eq!(fired.file_name().unwrap(), "watched.txt");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_empty_expression_fires_only_on_truncation() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("sized.txt");
    fs::write(&file, "seed").unwrap();

    let registry = WatchRegistry::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let triggers = TriggerSet::new().on(EventKind::Change, channel_trigger(tx));
    registry.watch(&file, expr(r#"["empty"]"#), triggers).unwrap();

    sleep(SETTLE).await;

    // Non-empty write: the event arrives but the expression filters it.
    fs::write(&file, "non-empty content").unwrap();
    assert_eq!(drain(&mut rx).await, 0);

    // Truncation to zero bytes matches.
    fs::write(&file, "").unwrap();
    timeout(WAIT, rx.recv())
        .await
        .expect("no event for truncation")
        .expect("channel closed");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_change_expression_affects_live_events() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("gated.txt");
    fs::write(&file, "seed").unwrap();

    let registry = WatchRegistry::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let triggers = TriggerSet::new().on(EventKind::Change, channel_trigger(tx));
    registry
        .watch(&file, expr(r#"["false"]"#), triggers)
        .unwrap();

    sleep(SETTLE).await;
    fs::write(&file, "blocked").unwrap();
    assert_eq!(drain(&mut rx).await, 0);

    registry
        .change_expression(&file, expr(r#"["true"]"#))
        .unwrap();
    fs::write(&file, "allowed").unwrap();

    timeout(WAIT, rx.recv())
        .await
        .expect("no event after change_expression")
        .expect("channel closed");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_directory_watch_filters_new_files_by_suffix() {
    let dir = tempfile::tempdir().unwrap();

    let registry = WatchRegistry::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let triggers = TriggerSet::new().on(EventKind::Add, channel_trigger(tx));
    registry
        .watch(dir.path(), expr(r#"["suffix", "txt"]"#), triggers)
        .unwrap();

    sleep(SETTLE).await;
    fs::write(dir.path().join("note.txt"), "hello").unwrap();

    let fired = timeout(WAIT, rx.recv())
        .await
        .expect("no add event")
        .expect("channel closed");
    assert_eq!(fired.file_name().unwrap(), "note.txt");

    fs::write(dir.path().join("skip.log"), "nope").unwrap();
    assert_eq!(drain(&mut rx).await, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unlink_event_reaches_trigger() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("doomed.txt");
    fs::write(&file, "x").unwrap();

    let registry = WatchRegistry::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let triggers = TriggerSet::new().on(EventKind::Unlink, channel_trigger(tx));
    registry.watch(&file, expr(r#"["true"]"#), triggers).unwrap();

    sleep(SETTLE).await;
    fs::remove_file(&file).unwrap();

    timeout(WAIT, rx.recv())
        .await
        .expect("no unlink event")
        .expect("channel closed");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_deleted_watch_goes_quiet() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("quiet.txt");
    fs::write(&file, "x").unwrap();

    let registry = WatchRegistry::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let triggers = TriggerSet::new().on(EventKind::Change, channel_trigger(tx));
    registry.watch(&file, expr(r#"["true"]"#), triggers).unwrap();

    sleep(SETTLE).await;
    registry.delete_watch(&file).unwrap();

    fs::write(&file, "after delete").unwrap();
    assert_eq!(drain(&mut rx).await, 0);
}
