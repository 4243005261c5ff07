use super::*;
use crate::event::FileChange;
use baamhackl_core::clock::SystemClock;
use std::fs;
use std::time::Duration;

struct Fixture {
    root: tempfile::TempDir,
    handler: Arc<Handler<SystemClock>>,
    scheduler: Scheduler<SystemClock>,
}

impl Fixture {
    fn new(script: &str) -> Self {
        Self::with_config(script, |_| {})
    }

    fn with_config(script: &str, adjust: impl FnOnce(&mut HandlerConfig)) -> Self {
        let root = tempfile::tempdir().unwrap();
        let mut cfg = HandlerConfig {
            name: "test".to_string(),
            path: root.path().to_path_buf(),
            command: vec![
                "/bin/sh".to_string(),
                "-c".to_string(),
                script.to_string(),
            ],
            retry_count: 0,
            retry_delay_initial: Duration::from_millis(10),
            ..HandlerConfig::default()
        };
        adjust(&mut cfg);

        let handler = Arc::new(Handler::new(Arc::new(cfg), SystemClock));
        let scheduler = Scheduler::new();
        scheduler.set_slots(2);
        scheduler.start();

        Self {
            root,
            handler,
            scheduler,
        }
    }

    fn event(&self, name: &str) -> ChangeEvent {
        ChangeEvent {
            handler_name: "test".to_string(),
            root_dir: self.root.path().to_path_buf(),
            change: FileChange {
                name: PathBuf::from(name),
                ..FileChange::default()
            },
        }
    }

    fn event_with_size(&self, name: &str, size: u64) -> ChangeEvent {
        let mut event = self.event(name);
        event.change.size = Some(size);
        event
    }


    async fn dispatch(&self, event: &ChangeEvent) -> Result<(), HandlerError> {
        Arc::clone(&self.handler)
            .handle(&self.scheduler, event)
            .await
    }

    async fn quiesce(&self) {
        self.scheduler
            .quiesce(&CancellationToken::new())
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn successful_task_empties_pending_and_archives() {
    let fixture = Fixture::new("true");
    let input = fixture.root.path().join("a.txt");
    fs::write(&input, b"data").unwrap();

    fixture.dispatch(&fixture.event("a.txt"))
        .await
        .unwrap();
    assert_eq!(fixture.handler.pending_len().await, 1);

    fixture.quiesce().await;

    assert_eq!(fixture.handler.pending_len().await, 0);
    assert!(!input.exists());
    assert!(fixture.root.path().join("_/success").is_dir());
}

#[tokio::test]
async fn duplicate_events_collapse_into_one_task() {
    let fixture = Fixture::new("sleep 0.1");
    fs::write(fixture.root.path().join("a.txt"), b"data").unwrap();

    for name in ["a.txt", "./a.txt", "b/../a.txt"] {
        fixture.dispatch(&fixture.event(name))
            .await
            .unwrap();
    }

    assert_eq!(fixture.handler.pending_len().await, 1);
    fixture.quiesce().await;
    assert_eq!(fixture.handler.pending_len().await, 0);

    // Only one task ran: one journal entry.
    let journal_entries: Vec<_> = fs::read_dir(fixture.root.path().join("_/journal"))
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name() != ".prune.lock")
        .collect();
    assert_eq!(journal_entries.len(), 1);
}

#[tokio::test]
async fn mismatched_root_is_rejected() {
    let fixture = Fixture::new("true");
    let other = tempfile::tempdir().unwrap();
    fs::write(fixture.root.path().join("a.txt"), b"data").unwrap();

    let mut event = fixture.event("a.txt");
    event.root_dir = other.path().to_path_buf();

    let err = fixture.dispatch(&event)
        .await
        .unwrap_err();

    assert!(matches!(err, HandlerError::RootMismatch));
    assert_eq!(fixture.handler.pending_len().await, 0);
}

#[tokio::test]
async fn events_under_infrastructure_dirs_are_ignored() {
    let fixture = Fixture::new("true");

    fixture.dispatch(&fixture.event("_/journal/x/log.txt"))
        .await
        .unwrap();

    assert_eq!(fixture.handler.pending_len().await, 0);
}

#[tokio::test]
async fn names_escaping_the_root_are_ignored() {
    let fixture = Fixture::new("true");

    fixture.dispatch(&fixture.event("../outside.txt"))
        .await
        .unwrap();

    assert_eq!(fixture.handler.pending_len().await, 0);
}

#[tokio::test]
async fn hidden_files_are_ignored_by_default() {
    let fixture = Fixture::new("true");
    fs::write(fixture.root.path().join(".hidden"), b"data").unwrap();

    fixture.dispatch(&fixture.event(".hidden"))
        .await
        .unwrap();

    assert_eq!(fixture.handler.pending_len().await, 0);
}

#[tokio::test]
async fn hidden_files_are_processed_when_configured() {
    let fixture = Fixture::with_config("true", |cfg| cfg.include_hidden = true);
    fs::write(fixture.root.path().join(".hidden"), b"data").unwrap();

    fixture.dispatch(&fixture.event(".hidden"))
        .await
        .unwrap();

    assert_eq!(fixture.handler.pending_len().await, 1);
    fixture.quiesce().await;
}

#[tokio::test]
async fn nested_paths_require_recursive_mode() {
    let fixture = Fixture::new("true");

    fixture.dispatch(&fixture.event("sub/dir/a.txt"))
        .await
        .unwrap();
    assert_eq!(fixture.handler.pending_len().await, 0);

    let recursive = Fixture::with_config("true", |cfg| cfg.recursive = true);
    fs::create_dir_all(recursive.root.path().join("sub/dir")).unwrap();
    fs::write(recursive.root.path().join("sub/dir/a.txt"), b"data").unwrap();

    recursive.dispatch(&recursive.event("sub/dir/a.txt"))
        .await
        .unwrap();
    assert_eq!(recursive.handler.pending_len().await, 1);
    recursive.quiesce().await;
}

#[tokio::test]
async fn size_gate_filters_events() {
    let fixture = Fixture::with_config("true", |cfg| {
        cfg.min_size_bytes = 10;
        cfg.max_size_bytes = 100;
    });

    for (size, expected_pending) in [(5, 0), (500, 0)] {
        fixture.dispatch(&fixture.event_with_size("a.txt", size))
            .await
            .unwrap();
        assert_eq!(fixture.handler.pending_len().await, expected_pending);
    }

    fs::write(fixture.root.path().join("a.txt"), b"exactly 50 bytes of content padding....").unwrap();
    fixture.dispatch(&fixture.event_with_size("a.txt", 50))
        .await
        .unwrap();
    assert_eq!(fixture.handler.pending_len().await, 1);
    fixture.quiesce().await;
}

#[tokio::test]
async fn failed_task_with_retries_stays_pending_until_resolved() {
    let fixture = Fixture::with_config("exit 1", |cfg| {
        cfg.retry_count = 1;
        cfg.retry_delay_initial = Duration::from_millis(10);
    });
    let input = fixture.root.path().join("a.txt");
    fs::write(&input, b"data").unwrap();

    fixture.dispatch(&fixture.event("a.txt"))
        .await
        .unwrap();

    fixture.quiesce().await;

    // Retry happened, then the failure became permanent and was archived.
    assert_eq!(fixture.handler.pending_len().await, 0);
    assert!(!input.exists());
    assert!(fixture.root.path().join("_/failure").is_dir());
}

#[tokio::test]
async fn prune_runs_under_the_pending_lock() {
    let fixture = Fixture::new("true");
    fs::create_dir_all(fixture.root.path().join("_/journal")).unwrap();

    fixture.handler.prune(&CancellationToken::new()).await.unwrap();

    assert!(fixture
        .root
        .path()
        .join("_/journal/.prune.lock")
        .exists());
}
