//! Watch sources that feed notifications into the resolver.

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::stream::BoxStream;
use futures::StreamExt;
use parking_lot::Mutex;
use std::time::Duration;
use tracing::debug;

use crate::error::ResolverError;
use crate::event::Notification;

/// Stream of notifications for `DNSNameResolver` objects.
pub type NotificationStream = BoxStream<'static, Notification>;

/// Produces the notification stream for `DNSNameResolver` objects.
///
/// Implementations own reconnects and retries. The stream must deliver the
/// full current state first, follow it with [`Notification::Synced`], and
/// re-deliver every object at least once per `resync` period.
#[async_trait]
pub trait RegistrationSource: Send + Sync {
    /// Open the notification stream. Errors here abort startup.
    async fn watch(&self, resync: Duration) -> Result<NotificationStream, ResolverError>;
}

/// In-process source fed through a channel.
///
/// Notifications pushed to the sender are delivered in order; the stream ends
/// when every sender has been dropped.
#[derive(Debug)]
pub struct ChannelSource {
    receiver: Mutex<Option<mpsc::UnboundedReceiver<Notification>>>,
}

impl ChannelSource {
    /// Create a source and the sender that feeds it.
    pub fn new() -> (Self, mpsc::UnboundedSender<Notification>) {
        let (tx, rx) = mpsc::unbounded();
        let source = Self {
            receiver: Mutex::new(Some(rx)),
        };
        (source, tx)
    }
}

#[async_trait]
impl RegistrationSource for ChannelSource {
    async fn watch(&self, resync: Duration) -> Result<NotificationStream, ResolverError> {
        let receiver = self
            .receiver
            .lock()
            .take()
            .ok_or_else(|| ResolverError::Source("channel source is already being watched".into()))?;

        debug!(resync_secs = resync.as_secs(), "watching channel source");
        Ok(receiver.boxed())
    }
}
