mod common;
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::tempdir;
use tokio::sync::mpsc;

use virtmod::fs::mock::MockFileSystem;
use virtmod::fs::RealFileSystem;
use virtmod::types::{WatchEventKind, WatchOptions};
use virtmod::watch::{
    collect_matching_files, materialize, snapshot, static_prefix, ContentFingerprint,
    WatchMatcher, WatchSignal, WatchStream, WatchTrigger,
};

type TestResult = Result<(), Box<dyn Error>>;

fn patterns(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn write(root: &Path, rel: &str, contents: &str) -> std::io::Result<()> {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)
}

#[test]
fn static_prefix_stops_at_first_glob() {
    assert_eq!(static_prefix("watched/**/*.txt"), Path::new("watched"));
    assert_eq!(static_prefix("a/b/*.rs"), Path::new("a/b"));
    assert_eq!(static_prefix("*.txt"), Path::new(""));
    assert_eq!(static_prefix("data/one.json"), Path::new("data"));
}

#[test]
fn matcher_rejects_patterns_leaving_the_base() {
    let options = WatchOptions::default();
    assert!(WatchMatcher::new(&patterns(&["../x/*.txt"]), &options).is_err());
    assert!(WatchMatcher::new(&patterns(&["/abs/*.txt"]), &options).is_err());
    assert!(WatchMatcher::new(&patterns(&[]), &options).is_err());
    assert!(WatchMatcher::new(&patterns(&["./ok/*.txt"]), &options).is_ok());
}

#[test]
fn matcher_applies_ignored_and_depth() -> TestResult {
    let options = WatchOptions {
        ignored: Some(vec!["**/*.tmp".into()]),
        depth: Some(1),
        ..WatchOptions::default()
    };
    let matcher = WatchMatcher::new(&patterns(&["src/**"]), &options)?;

    assert!(matcher.matches("src/a.txt"));
    assert!(matcher.matches("src/sub/b.txt"));
    assert!(!matcher.matches("src/sub/deeper/c.txt"));
    assert!(!matcher.matches("src/x.tmp"));
    assert!(!matcher.matches("other/a.txt"));
    Ok(())
}

#[test]
fn snapshot_is_sorted_regardless_of_listing_order() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_file("./watched/c.txt", "c");
    fs.add_file("./watched/a.txt", "a");
    fs.add_file("./watched/nested/b.txt", "b");
    fs.add_file("./watched/skip.md", "md");

    let files = snapshot(
        &fs,
        Path::new("."),
        &patterns(&["watched/**/*.txt"]),
        &WatchOptions::default(),
    )?;
    assert_eq!(
        files,
        vec!["watched/a.txt", "watched/c.txt", "watched/nested/b.txt"]
    );
    Ok(())
}

#[test]
fn snapshot_includes_matching_directories() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("./content/posts/one.md", "1");
    fs.add_dir("./content/drafts");

    let files = snapshot(
        &fs,
        Path::new("."),
        &patterns(&["content/*"]),
        &WatchOptions::default(),
    )?;
    assert_eq!(files, vec!["content/drafts", "content/posts"]);
    Ok(())
}

#[test]
fn snapshot_of_missing_root_is_empty() -> TestResult {
    let fs = MockFileSystem::new();
    let files = snapshot(
        &fs,
        Path::new("."),
        &patterns(&["nothing/**/*.txt"]),
        &WatchOptions::default(),
    )?;
    assert!(files.is_empty());
    Ok(())
}

#[test]
fn collect_matching_files_on_real_tree() -> TestResult {
    let dir = tempdir()?;
    write(dir.path(), "watched/b.txt", "b")?;
    write(dir.path(), "watched/a.txt", "a")?;
    write(dir.path(), "watched/ignore.tmp", "t")?;
    write(dir.path(), "top.txt", "top")?;

    let options = WatchOptions {
        ignored: Some(vec!["**/*.tmp".into()]),
        ..WatchOptions::default()
    };
    let matcher = WatchMatcher::new(&patterns(&["watched/*", "*.txt"]), &options)?;
    let files = collect_matching_files(&RealFileSystem, dir.path(), &matcher, true)?;

    assert_eq!(files, vec!["top.txt", "watched/a.txt", "watched/b.txt"]);
    Ok(())
}

#[test]
fn fingerprint_ignores_rewrites_with_same_content() {
    let fs = MockFileSystem::new();
    let path = Path::new("./gen.rs");
    fs.add_file(path, "v1");

    let mut fp = ContentFingerprint::capture(&fs, path);
    fs.add_file(path, "v1");
    assert!(!fp.refresh(&fs, path));

    fs.add_file(path, "v2");
    assert!(fp.refresh(&fs, path));
    assert!(!fp.refresh(&fs, path));

    fs.remove(path);
    assert!(fp.refresh(&fs, path));
}

#[tokio::test]
async fn stream_yields_ready_before_events() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    write(dir.path(), "watched/a.txt", "a")?;

    let mut stream = WatchStream::open(
        Arc::new(RealFileSystem),
        dir.path(),
        &patterns(&["watched/*.txt"]),
        &WatchEventKind::ALL,
        &WatchOptions::default(),
    )
    .await?;

    let first = with_timeout(stream.next()).await.unwrap()?;
    assert_eq!(first, WatchSignal::Ready(vec!["watched/a.txt".to_string()]));

    write(dir.path(), "watched/b.txt", "b")?;

    loop {
        match with_timeout(stream.next()).await.unwrap()? {
            WatchSignal::Event(trigger) if trigger.path == "watched/b.txt" => {
                assert!(matches!(
                    trigger.kind,
                    WatchEventKind::Add | WatchEventKind::Change
                ));
                break;
            }
            WatchSignal::Event(_) => continue,
            WatchSignal::Ready(_) => panic!("ready signalled twice"),
        }
    }
    Ok(())
}

#[tokio::test]
async fn materialize_reports_only_selected_events_inside_the_set() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    write(dir.path(), "watched/b.txt", "b")?;
    write(dir.path(), "watched/a.txt", "a")?;

    let (tx, mut rx) = mpsc::unbounded_channel::<WatchTrigger>();
    let (files, handle) = materialize(
        Arc::new(RealFileSystem),
        dir.path(),
        &patterns(&["watched/*.txt"]),
        &[WatchEventKind::Unlink],
        &WatchOptions::default(),
        move |trigger| {
            let _ = tx.send(trigger);
        },
    )
    .await?;
    assert_eq!(files, vec!["watched/a.txt", "watched/b.txt"]);

    // Neither of these qualifies: wrong kind, outside the set.
    write(dir.path(), "watched/a.txt", "changed")?;
    write(dir.path(), "watched/other.md", "md")?;
    fs::remove_file(dir.path().join("watched/b.txt"))?;

    let trigger = with_timeout(rx.recv()).await.unwrap();
    assert_eq!(trigger, WatchTrigger::new(WatchEventKind::Unlink, "watched/b.txt"));

    handle.close();
    Ok(())
}

#[tokio::test]
async fn closed_watcher_stops_reporting() -> TestResult {
    let dir = tempdir()?;
    write(dir.path(), "watched/a.txt", "a")?;

    let (tx, mut rx) = mpsc::unbounded_channel::<WatchTrigger>();
    let (_, handle) = materialize(
        Arc::new(RealFileSystem),
        dir.path(),
        &patterns(&["watched/*.txt"]),
        &WatchEventKind::ALL,
        &WatchOptions::default(),
        move |trigger| {
            let _ = tx.send(trigger);
        },
    )
    .await?;
    drop(handle);

    // The sender lives in the aborted task, so the channel closes.
    assert!(with_timeout(rx.recv()).await.is_none());
    Ok(())
}

#[tokio::test]
async fn stream_scans_through_the_given_filesystem() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_file("/virt/watched/b.txt", "b");
    fs.add_file("/virt/watched/a.txt", "a");

    let (files, handle) = materialize(
        Arc::new(fs),
        Path::new("/virt"),
        &patterns(&["watched/*.txt"]),
        &WatchEventKind::ALL,
        &WatchOptions::default(),
        |_| {},
    )
    .await?;
    assert_eq!(files, vec!["watched/a.txt", "watched/b.txt"]);
    assert!(!handle.is_finished());
    Ok(())
}
