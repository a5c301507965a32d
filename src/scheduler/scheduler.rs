use std::future::Future;
use std::pin::pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::{Either, select};
use snafu::Report;
use tracing::{debug, error, info, warn};

use crate::application::RuntimeConfig;
use crate::sink::ChangeSink;
use crate::sync::{SyncError, synchronize_tree};

pub struct Scheduler {
    config: Arc<RuntimeConfig>,
}

impl Scheduler {
    pub fn new(config: Arc<RuntimeConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Performs a single synchronization pass.
    pub async fn run_once<S: ChangeSink + ?Sized>(&self, sink: &mut S) -> Result<usize, SyncError> {
        let started = Instant::now();
        info!(
            "Synchronizing {} into {}",
            self.config.source.display(),
            self.config.replica.display()
        );

        let changes = synchronize_tree(&self.config.source, &self.config.replica, sink).await?;

        info!(
            changes,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Synchronization pass finished"
        );
        Ok(changes)
    }

    /// Runs a pass immediately, then one per interval tick until `shutdown` resolves.
    ///
    /// Failed passes are logged and the loop carries on; the next pass picks
    /// up where the failed one stopped. Returns the number of passes performed.
    pub async fn run_until<S, F>(&self, sink: &mut S, shutdown: F) -> u64
    where
        S: ChangeSink + ?Sized,
        F: Future<Output = ()>,
    {
        let period = self.config.interval();
        let mut shutdown = pin!(shutdown);
        let mut deadline = Instant::now();
        let mut passes = 0u64;

        loop {
            if let Err(err) = self.run_once(sink).await {
                error!("Synchronization pass failed: {}", Report::from_error(err));
            }
            passes += 1;

            let (next, skipped) = next_deadline(deadline, period, Instant::now());
            if skipped > 0 {
                warn!("Pass overran the interval, skipping {} tick(s)", skipped);
            }
            deadline = next;

            let wait = deadline.saturating_duration_since(Instant::now());
            debug!("Next pass in {} ms", wait.as_millis());
            match select(pin!(compio::time::sleep(wait)), shutdown.as_mut()).await {
                Either::Left(_) => {}
                Either::Right(_) => {
                    info!("Shutdown requested after {} pass(es)", passes);
                    return passes;
                }
            }
        }
    }
}

/// First tick after `previous` that has not already passed at `now`,
/// along with how many ticks were missed on the way.
pub fn next_deadline(previous: Instant, period: Duration, now: Instant) -> (Instant, u64) {
    let mut deadline = previous + period;
    let mut skipped = 0;
    while deadline < now {
        deadline += period;
        skipped += 1;
    }
    (deadline, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::num::NonZeroU64;
    use std::path::PathBuf;
    use tempfile::TempDir;

    use crate::sync::{ChangeEvent, ChangeKind};

    fn scheduler(temp_dir: &TempDir) -> (Scheduler, PathBuf, PathBuf) {
        let source = temp_dir.path().join("source");
        let replica = temp_dir.path().join("replica");
        fs::create_dir(&source).unwrap();
        fs::create_dir(&replica).unwrap();
        let config = RuntimeConfig {
            source: source.clone(),
            replica: replica.clone(),
            interval: NonZeroU64::new(1).unwrap(),
            log_file: None,
            append_log: false,
            once: false,
            quiet: true,
        };
        (Scheduler::new(Arc::new(config)), source, replica)
    }

    #[test]
    fn next_deadline_without_overrun() {
        let start = Instant::now();
        let period = Duration::from_millis(100);

        let (deadline, skipped) = next_deadline(start, period, start + Duration::from_millis(40));

        assert_eq!(deadline, start + period);
        assert_eq!(skipped, 0);
    }

    #[test]
    fn next_deadline_skips_elapsed_ticks() {
        let start = Instant::now();
        let period = Duration::from_millis(100);

        let (deadline, skipped) = next_deadline(start, period, start + Duration::from_millis(250));

        assert_eq!(deadline, start + Duration::from_millis(300));
        assert_eq!(skipped, 2);
    }

    #[test]
    fn next_deadline_on_the_tick_is_not_skipped() {
        let start = Instant::now();
        let period = Duration::from_millis(100);

        let (deadline, skipped) = next_deadline(start, period, start + period);

        assert_eq!(deadline, start + period);
        assert_eq!(skipped, 0);
    }

    #[compio::test]
    async fn run_once_mirrors_the_tree() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let (scheduler, source, replica) = scheduler(&temp_dir);
        fs::write(source.join("a.txt"), "a").unwrap();

        let mut events: Vec<ChangeEvent> = Vec::new();
        let changes = scheduler.run_once(&mut events).await.expect("Pass failed");

        assert_eq!(changes, 1);
        assert_eq!(fs::read_to_string(replica.join("a.txt")).unwrap(), "a");
    }

    #[compio::test]
    async fn startup_pass_runs_before_shutdown_is_checked() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let (scheduler, source, replica) = scheduler(&temp_dir);
        fs::create_dir(source.join("dir")).unwrap();

        let mut events: Vec<ChangeEvent> = Vec::new();
        let passes = scheduler
            .run_until(&mut events, futures::future::ready(()))
            .await;

        assert_eq!(passes, 1);
        assert!(replica.join("dir").is_dir());
    }

    #[compio::test]
    async fn later_ticks_pick_up_new_changes() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let (scheduler, source, replica) = scheduler(&temp_dir);
        let late_file = source.join("late.txt");

        let mut events: Vec<ChangeEvent> = Vec::new();
        let passes = scheduler
            .run_until(&mut events, async {
                compio::time::sleep(Duration::from_millis(400)).await;
                fs::write(&late_file, "late").unwrap();
                compio::time::sleep(Duration::from_millis(1200)).await;
            })
            .await;

        assert_eq!(passes, 2);
        assert_eq!(
            events.iter().map(|event| event.kind.clone()).collect::<Vec<_>>(),
            vec![ChangeKind::FileCreated {
                source: source.join("late.txt"),
                replica: replica.join("late.txt"),
            }]
        );
    }

    #[compio::test]
    async fn failed_passes_do_not_stop_the_loop() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let (scheduler, _source, replica) = scheduler(&temp_dir);
        fs::remove_dir(&replica).unwrap();

        let mut events: Vec<ChangeEvent> = Vec::new();
        assert!(scheduler.run_once(&mut events).await.is_err());

        let passes = scheduler
            .run_until(&mut events, compio::time::sleep(Duration::from_millis(1500)))
            .await;

        assert_eq!(passes, 2);
        assert!(events.is_empty());
    }
}
