//! Resolver lifecycle: watch startup, bounded sync wait, and shutdown.

use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{ResolverConfig, RESYNC_PERIOD};
use crate::error::ResolverError;
use crate::event::Notification;
use crate::index::DnsNameIndex;
use crate::metrics::{self, SyncWaitResult};
use crate::source::{NotificationStream, RegistrationSource};
use crate::sync::{ApplyOutcome, EventObserver, NoopObserver, Synchronizer};

/// How often `start` checks whether the watch has synced.
pub const SYNC_CHECK_INTERVAL: Duration = Duration::from_millis(100);
/// How often `start` logs while still waiting.
pub const SYNC_LOG_INTERVAL: Duration = Duration::from_millis(500);
/// How long `start` waits before serving with a partial index.
pub const SYNC_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle phase of a [`DnsNameResolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Built, watch not consumed yet.
    Created,
    /// Watch is being consumed.
    Started,
    /// Shutdown was requested. Terminal.
    Stopped,
}

/// Keeps a [`DnsNameIndex`] in sync with a watch of `DNSNameResolver` objects.
pub struct DnsNameResolver {
    config: Arc<ResolverConfig>,
    synchronizer: Synchronizer,
    synced: Arc<AtomicBool>,
    stream: Mutex<Option<NotificationStream>>,
    worker: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    stop_token: CancellationToken,
    /// True once shutdown has cancelled `stop_token`.
    stop_lock: Mutex<bool>,
}

impl DnsNameResolver {
    /// Validate the configuration and open the watch.
    pub async fn new<S>(config: ResolverConfig, source: &S) -> Result<Self, ResolverError>
    where
        S: RegistrationSource + ?Sized,
    {
        Self::with_observer(config, source, Arc::new(NoopObserver)).await
    }

    /// Like [`new`](Self::new), reporting every applied event to `observer`.
    pub async fn with_observer<S>(
        config: ResolverConfig,
        source: &S,
        observer: Arc<dyn EventObserver>,
    ) -> Result<Self, ResolverError>
    where
        S: RegistrationSource + ?Sized,
    {
        config.validate()?;

        let synchronizer =
            Synchronizer::with_observer(DnsNameIndex::new(), config.namespace_filter(), observer);
        let stream = source.watch(RESYNC_PERIOD).await?;

        info!(
            namespaces = ?config.namespaces,
            min_ttl = config.min_ttl,
            failure_threshold = config.failure_threshold,
            "initialized DNSNameResolver index"
        );

        Ok(Self {
            config: Arc::new(config),
            synchronizer,
            synced: Arc::new(AtomicBool::new(false)),
            stream: Mutex::new(Some(stream)),
            worker: tokio::sync::Mutex::new(None),
            stop_token: CancellationToken::new(),
            stop_lock: Mutex::new(false),
        })
    }

    /// The index kept by this resolver.
    pub fn index(&self) -> &DnsNameIndex {
        self.synchronizer.index()
    }

    /// The configuration this resolver was built with.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Whether the watch has delivered its initial listing.
    pub fn has_synced(&self) -> bool {
        self.synced.load(Ordering::Acquire)
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        if *self.stop_lock.lock() {
            Phase::Stopped
        } else if self.stream.lock().is_some() {
            Phase::Created
        } else {
            Phase::Started
        }
    }

    /// Start consuming the watch in the background, then wait for the
    /// initial sync for at most [`SYNC_TIMEOUT`].
    ///
    /// An unsynced watch at the deadline is not an error: the resolver
    /// serves with whatever has been indexed so far.
    pub async fn start(&self) -> Result<(), ResolverError> {
        // The shutdown flag stays locked until the stream has been taken.
        let stream = {
            let shut_down = self.stop_lock.lock();
            if *shut_down {
                return Err(ResolverError::Stopped);
            }
            self.stream
                .lock()
                .take()
                .ok_or(ResolverError::AlreadyStarted)?
        };

        let handle = tokio::spawn(consume(
            stream,
            self.synchronizer.clone(),
            self.synced.clone(),
            self.stop_token.clone(),
        ));
        *self.worker.lock().await = Some(handle);
        info!("started DNSNameResolver watch");

        self.wait_for_sync().await;
        Ok(())
    }

    async fn wait_for_sync(&self) {
        let started = Instant::now();
        let mut check = interval_at(started + SYNC_CHECK_INTERVAL, SYNC_CHECK_INTERVAL);
        let mut progress = interval_at(started + SYNC_LOG_INTERVAL, SYNC_LOG_INTERVAL);
        let deadline = sleep(SYNC_TIMEOUT);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = check.tick() => {
                    if self.has_synced() {
                        metrics::record_sync_wait(SyncWaitResult::Synced, started.elapsed());
                        return;
                    }
                }
                _ = progress.tick() => {
                    info!("waiting for DNSNameResolver watch sync before serving");
                }
                _ = self.stop_token.cancelled() => {
                    info!("shutdown requested while waiting for DNSNameResolver watch sync");
                    return;
                }
                _ = &mut deadline => {
                    warn!("serving with unsynced DNSNameResolver watch");
                    metrics::record_sync_wait(SyncWaitResult::TimedOut, started.elapsed());
                    return;
                }
            }
        }
    }

    /// Stop consuming the watch.
    ///
    /// Only the first call cancels the watch; later calls return
    /// [`ResolverError::ShutdownInProgress`].
    pub fn shutdown(&self) -> Result<(), ResolverError> {
        let mut shut_down = self.stop_lock.lock();
        if *shut_down {
            metrics::record_shutdown(false);
            return Err(ResolverError::ShutdownInProgress);
        }

        self.stop_token.cancel();
        *shut_down = true;
        metrics::record_shutdown(true);
        info!("DNSNameResolver shutdown requested");
        Ok(())
    }

    /// Wait for the background watch task to finish, after shutdown or
    /// once the stream ends.
    ///
    /// The task handle is only released once the join completes, so a
    /// dropped `wait` future can be followed by another `wait`.
    pub async fn wait(&self) {
        let mut worker = self.worker.lock().await;
        if let Some(handle) = worker.as_mut() {
            let result = handle.await;
            *worker = None;
            if let Err(e) = result {
                error!("DNSNameResolver watch task failed: {}", e);
            }
        }
    }
}

/// Deliver notifications to the synchronizer until cancelled or the stream ends.
async fn consume(
    mut stream: NotificationStream,
    synchronizer: Synchronizer,
    synced: Arc<AtomicBool>,
    stop: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;

            _ = stop.cancelled() => {
                info!("DNSNameResolver watch received shutdown signal");
                return;
            }

            next = stream.next() => {
                match next {
                    Some(Notification::Synced) => {
                        if !synced.swap(true, Ordering::AcqRel) {
                            let index = synchronizer.index();
                            info!(
                                regular = index.regular_count(),
                                wildcard = index.wildcard_count(),
                                "DNSNameResolver watch synced"
                            );
                            metrics::record_synced(true);
                            index.emit_metrics();
                        }
                    }
                    Some(notification) => {
                        if synchronizer.handle(notification) == Some(ApplyOutcome::Applied) {
                            synchronizer.index().emit_metrics();
                        }
                    }
                    None => {
                        debug!("DNSNameResolver watch stream ended");
                        return;
                    }
                }
            }
        }
    }
}
