//! Re-run a target whenever files under a directory change.
//!
//! ```text
//! run ─► prompt ─► wait for relevant event ─► debounce ─► run ─► ...
//!            ▲                                               │
//!            └───────────────────────────────────────────────┘
//! cancellation (Ctrl-C) ends the loop at any wait; a run in progress
//! is allowed to finish first.
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use fnctl_core::IgnoreFilter;
use notify::event::{CreateKind, RemoveKind};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;

pub const PROMPT: &str = "[Watch] Change a file to trigger a rebuild...";

/// Something the watch loop re-runs on change.
#[allow(async_fn_in_trait)]
pub trait WatchTarget {
    async fn run_once(&self) -> anyhow::Result<()>;
}

pub struct WatchLoop {
    filter: IgnoreFilter,
    debounce: Duration,
}

impl WatchLoop {
    /// Watch `filter.root()`; `debounce` must be nonzero.
    pub fn new(filter: IgnoreFilter, debounce: Duration) -> Self {
        Self { filter, debounce }
    }

    pub fn root(&self) -> &Path {
        self.filter.root()
    }

    /// Run `target` now, then again after each burst of relevant changes,
    /// until `cancel` fires. Target failures are reported and the loop goes on.
    pub async fn run<T: WatchTarget>(
        &self,
        target: &T,
        cancel: &CancellationToken,
    ) -> Result<(), WatchError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                if tx.send(res).is_err() {
                    tracing::trace!("watch loop gone, dropping file event");
                }
            },
            Config::default(),
        )
        .map_err(|e| WatchError::Init { source: e })?;

        watcher
            .watch(self.root(), RecursiveMode::Recursive)
            .map_err(|e| WatchError::Watch {
                path: self.root().to_path_buf(),
                source: e,
            })?;
        tracing::info!(root = %self.root().display(), debounce_ms = self.debounce.as_millis() as u64, "watching");

        self.drive(target, rx, cancel).await;
        tracing::info!("watch stopped");
        Ok(())
    }

    async fn drive<T: WatchTarget>(
        &self,
        target: &T,
        mut events: UnboundedReceiver<notify::Result<Event>>,
        cancel: &CancellationToken,
    ) {
        if cancel.is_cancelled() {
            return;
        }
        self.run_target(target).await;

        loop {
            println!("{PROMPT}");

            // Block until something worth rebuilding for happens.
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    event = events.recv() => match event {
                        None => return,
                        Some(event) if self.is_relevant(&event) => break,
                        Some(_) => continue,
                    },
                }
            }

            // Collapse the rest of the burst.
            let deadline = sleep(self.debounce);
            tokio::pin!(deadline);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = &mut deadline => break,
                    event = events.recv() => match event {
                        None => break,
                        Some(event) if self.is_relevant(&event) => {
                            deadline.as_mut().reset(Instant::now() + self.debounce);
                        }
                        Some(_) => {}
                    },
                }
            }

            if cancel.is_cancelled() {
                return;
            }
            self.run_target(target).await;
        }
    }

    async fn run_target<T: WatchTarget>(&self, target: &T) {
        match target.run_once().await {
            Ok(()) => tracing::debug!("watch run finished"),
            Err(e) => {
                tracing::error!(error = %e, "watch run failed");
                eprintln!("Error: {e:#}");
            }
        }
    }

    fn is_relevant(&self, event: &notify::Result<Event>) -> bool {
        match event {
            Ok(event) => {
                if matches!(event.kind, EventKind::Access(_)) {
                    return false;
                }
                // A removed directory no longer exists to be stat'ed.
                let folder = matches!(
                    event.kind,
                    EventKind::Create(CreateKind::Folder) | EventKind::Remove(RemoveKind::Folder)
                );
                event
                    .paths
                    .iter()
                    .any(|p| !self.filter.is_ignored(p, folder || p.is_dir()))
            }
            Err(e) => {
                tracing::warn!(error = %e, "file watcher error");
                false
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("failed to start file watcher")]
    Init { source: notify::Error },

    #[error("failed to watch {path}")]
    Watch { path: PathBuf, source: notify::Error },
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, DataChange, ModifyKind};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc::UnboundedSender;

    const DEBOUNCE: Duration = Duration::from_millis(500);

    struct Counter {
        runs: AtomicUsize,
        fail: bool,
    }

    impl Counter {
        fn new(fail: bool) -> Self {
            Self {
                runs: AtomicUsize::new(0),
                fail,
            }
        }

        fn runs(&self) -> usize {
            self.runs.load(Ordering::SeqCst)
        }
    }

    impl WatchTarget for Counter {
        async fn run_once(&self) -> anyhow::Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("build failed");
            }
            Ok(())
        }
    }

    fn watch_loop() -> WatchLoop {
        let filter = IgnoreFilter::from_content(
            Path::new("/project"),
            Path::new("/project/.gitignore"),
            "*.log\nbuild/\n",
        )
        .unwrap();
        WatchLoop::new(filter, DEBOUNCE)
    }

    fn change(path: &str) -> notify::Result<Event> {
        Ok(Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path(PathBuf::from(path)))
    }

    /// Send `events` spaced `gap` apart, then wait `settle` and cancel.
    fn script(
        tx: UnboundedSender<notify::Result<Event>>,
        cancel: CancellationToken,
        bursts: Vec<Vec<notify::Result<Event>>>,
        gap: Duration,
        settle: Duration,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            for burst in bursts {
                for event in burst {
                    tx.send(event).unwrap();
                    sleep(gap).await;
                }
                sleep(settle).await;
            }
            cancel.cancel();
            drop(tx);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_changes_reruns_once() {
        let wl = watch_loop();
        let target = Counter::new(false);
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::unbounded_channel();

        let burst = (0..5).map(|_| change("/project/src/main.rs")).collect();
        let sender = script(
            tx,
            cancel.clone(),
            vec![burst],
            Duration::from_millis(100),
            Duration::from_secs(5),
        );

        wl.drive(&target, rx, &cancel).await;
        sender.await.unwrap();

        // initial run + one for the burst
        assert_eq!(target.runs(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_target_keeps_watching() {
        let wl = watch_loop();
        let target = Counter::new(true);
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::unbounded_channel();

        let sender = script(
            tx,
            cancel.clone(),
            vec![
                vec![change("/project/handler.py")],
                vec![change("/project/handler.py")],
            ],
            Duration::from_millis(10),
            Duration::from_secs(2),
        );

        wl.drive(&target, rx, &cancel).await;
        sender.await.unwrap();

        assert_eq!(target.runs(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn ignored_and_access_events_do_not_trigger() {
        let wl = watch_loop();
        let target = Counter::new(false);
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::unbounded_channel();

        let access = Ok(Event::new(EventKind::Access(AccessKind::Any))
            .add_path(PathBuf::from("/project/src/main.rs")));
        let sender = script(
            tx,
            cancel.clone(),
            vec![vec![
                change("/project/debug.log"),
                change("/project/build/out.bin"),
                change("/project/.git/index"),
                access,
                Err(notify::Error::generic("backend hiccup")),
            ]],
            Duration::from_millis(10),
            Duration::from_secs(2),
        );

        wl.drive(&target, rx, &cancel).await;
        sender.await.unwrap();

        assert_eq!(target.runs(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn removed_folders_are_matched_as_directories() {
        let wl = watch_loop();
        let target = Counter::new(false);
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::unbounded_channel();

        let removed = |path: &str| {
            Ok(Event::new(EventKind::Remove(RemoveKind::Folder)).add_path(PathBuf::from(path)))
        };
        let sender = script(
            tx,
            cancel.clone(),
            vec![vec![removed("/project/build")], vec![removed("/project/src")]],
            Duration::from_millis(10),
            Duration::from_secs(2),
        );

        wl.drive(&target, rx, &cancel).await;
        sender.await.unwrap();

        // `build/` is ignored even though it is gone; `src` is not
        assert_eq!(target.runs(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn removing_ignored_directory_does_not_trigger() {
        let wl = watch_loop();
        let target = Counter::new(false);
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::unbounded_channel();

        let sender = script(
            tx,
            cancel.clone(),
            vec![vec![Ok(Event::new(EventKind::Remove(RemoveKind::Folder))
                .add_path(PathBuf::from("/project/build")))]],
            Duration::from_millis(10),
            Duration::from_secs(2),
        );

        wl.drive(&target, rx, &cancel).await;
        sender.await.unwrap();

        assert_eq!(target.runs(), 1);
    }

    /// Cancels the loop from inside its own run.
    struct CancelOnRun {
        runs: AtomicUsize,
        cancel: CancellationToken,
    }

    impl WatchTarget for CancelOnRun {
        async fn run_once(&self) -> anyhow::Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            self.cancel.cancel();
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_run_ignores_queued_changes() {
        let wl = watch_loop();
        let cancel = CancellationToken::new();
        let target = CancelOnRun {
            runs: AtomicUsize::new(0),
            cancel: cancel.clone(),
        };
        let (tx, rx) = mpsc::unbounded_channel();
        for _ in 0..3 {
            tx.send(change("/project/src/main.rs")).unwrap();
        }

        wl.drive(&target, rx, &cancel).await;

        assert_eq!(target.runs.load(Ordering::SeqCst), 1);
        drop(tx);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_start_never_runs() {
        let wl = watch_loop();
        let target = Counter::new(false);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let (_tx, rx) = mpsc::unbounded_channel();

        wl.drive(&target, rx, &cancel).await;

        assert_eq!(target.runs(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_debounce_suppresses_rerun() {
        let wl = watch_loop();
        let target = Counter::new(false);
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::unbounded_channel();

        // cancel lands 100ms into a 500ms debounce window
        let sender = script(
            tx,
            cancel.clone(),
            vec![vec![change("/project/src/lib.rs")]],
            Duration::from_millis(0),
            Duration::from_millis(100),
        );

        wl.drive(&target, rx, &cancel).await;
        sender.await.unwrap();

        assert_eq!(target.runs(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn closed_event_stream_ends_loop() {
        let wl = watch_loop();
        let target = Counter::new(false);
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        drop(tx);

        wl.drive(&target, rx, &cancel).await;

        assert_eq!(target.runs(), 1);
    }
}
