//! Beacon client implementation.

use crate::builders::{AlertBuilder, BuildEvent, IdentifyBuilder, TrackBuilder, UserId};
use crate::config::{BeaconBuilder, Config};
use crate::event::Event;
use crate::payload::build_payload;
use crate::queue::{Delivery, EventQueue, QueueItem};
use crate::scheduler::{FlushScheduler, Trigger};
use crate::transport::HttpTransport;
use crate::types::{BatchRequest, BatchResponse, EventType, Payload};
use crate::validation::validate;
use crate::Error;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, instrument, warn};

/// Beacon event-ingestion client.
///
/// Events are validated and queued synchronously, then shipped in batches
/// of at most `flush_at` events by background tasks on the Tokio runtime
/// the client was built in. The first event is sent right away; after
/// that a batch goes out when `flush_at` events are waiting or when the
/// flush interval elapses, whichever comes first.
///
/// Cloning is cheap and clones share the same queue.
///
/// # Example
///
/// ```rust,no_run
/// use beacon::Beacon;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), beacon::Error> {
///     let client = Beacon::builder("key_xxx")
///         .flush_interval(Duration::from_secs(5))
///         .build()?;
///
///     let delivery = client
///         .track("signup", "usr_123")
///         .property("plan", "pro")
///         .send()?;
///
///     client.identify("usr_123").trait_("name", "John Doe").send()?;
///
///     // Optional: wait for this particular event to be acknowledged.
///     delivery.await?;
///
///     client.shutdown().await?;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Beacon {
    inner: Arc<Inner>,
}

struct Inner {
    config: Config,
    transport: HttpTransport,
    runtime: Handle,
    state: Mutex<State>,
    is_shutdown: AtomicBool,
    /// Background flush and timer tasks, awaited by shutdown.
    tasks: TaskTracker,
}

/// Everything enqueue and flush mutate. Never held across an `.await`.
struct State {
    queue: EventQueue,
    scheduler: FlushScheduler,
}

impl Beacon {
    /// Create a new builder with the given API key.
    pub fn builder(api_key: impl Into<String>) -> BeaconBuilder {
        BeaconBuilder::new(api_key)
    }

    /// Create a new client from config.
    pub(crate) fn from_config(config: Config) -> Result<Self, Error> {
        let runtime = Handle::try_current().map_err(|_| {
            Error::Config("client must be built inside a Tokio runtime".into())
        })?;
        let transport = HttpTransport::new(&config)?;
        let scheduler = FlushScheduler::new(config.flush_at(), config.flush_interval());

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                transport,
                runtime,
                state: Mutex::new(State {
                    queue: EventQueue::new(),
                    scheduler,
                }),
                is_shutdown: AtomicBool::new(false),
                tasks: TaskTracker::new(),
            }),
        })
    }

    /// Get the client configuration.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the number of events waiting to be sent.
    pub fn pending_event_count(&self) -> usize {
        self.inner.lock_state().queue.len()
    }

    // ============================================
    // EVENTS
    // ============================================

    /// Track a custom event for a user.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use beacon::Beacon;
    /// # fn example(client: &Beacon) -> Result<(), beacon::Error> {
    /// client.track("feature_used", "usr_123")
    ///     .property("feature", "export")
    ///     .send()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn track(
        &self,
        event_name: impl Into<String>,
        user_id: impl Into<UserId>,
    ) -> SendableTrack<'_> {
        SendableTrack {
            builder: TrackBuilder::new(event_name, user_id),
            client: self,
        }
    }

    /// Identify or update a user.
    pub fn identify(&self, user_id: impl Into<UserId>) -> SendableIdentify<'_> {
        SendableIdentify {
            builder: IdentifyBuilder::new(user_id),
            client: self,
        }
    }

    /// Send a legacy alert event.
    pub fn alert(
        &self,
        distinct_id: impl Into<UserId>,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> SendableAlert<'_> {
        SendableAlert {
            builder: AlertBuilder::new(distinct_id, name, message),
            client: self,
        }
    }

    /// Validate and queue a raw event.
    ///
    /// Returns the validation error immediately; nothing is queued in that
    /// case. Otherwise returns a [`Delivery`] that resolves once the event's
    /// batch has been sent or has failed.
    pub fn enqueue(&self, event_type: EventType, event: &Event) -> Result<Delivery, Error> {
        validate(event, event_type)?;

        if !self.inner.config.enabled() {
            debug!(event_type = %event_type, "client disabled, dropping event");
            return Ok(Delivery::resolved(Ok(None)));
        }

        self.ensure_not_shutdown()?;

        let (item, delivery) = QueueItem::new(build_payload(event_type, event));

        let mut guard = self.inner.lock_state();
        // Shutdown may have drained the queue since the check above.
        self.ensure_not_shutdown()?;
        let state = &mut *guard;
        state.queue.enqueue(item);

        match state.scheduler.on_enqueue(state.queue.len()) {
            Trigger::Flush => {
                debug!(event_type = %event_type, "flush triggered by enqueue");
                // Spawned under the lock so shutdown always sees the task.
                self.inner.spawn_flush();
            }
            Trigger::ArmTimer(interval) => {
                debug!(interval_ms = interval.as_millis() as u64, "arming flush timer");
                state
                    .scheduler
                    .arm(|id| self.inner.spawn_timer(id, interval));
            }
            Trigger::Wait => {}
        }

        Ok(delivery)
    }

    // ============================================
    // LIFECYCLE
    // ============================================

    /// Send the oldest `flush_at` queued events in one request.
    ///
    /// Returns `Ok(None)` when there was nothing to send or the client is
    /// disabled. Events past the first `flush_at` stay queued. Each sent
    /// event's [`Delivery`] resolves with the same outcome as this call.
    pub async fn flush(&self) -> Result<Option<BatchResponse>, Error> {
        self.inner.flush().await
    }

    /// Shutdown the client gracefully.
    ///
    /// Stops the flush timer, sends every queued event and waits for
    /// batches already in flight. Later events are rejected with
    /// [`Error::Shutdown`].
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<(), Error> {
        if self.inner.is_shutdown.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        info!("shutting down client");

        self.inner.lock_state().scheduler.cancel();

        let drained = self.drain().await;

        self.inner.tasks.close();
        self.inner.tasks.wait().await;
        debug!("background flushes finished");

        drained
    }

    // ============================================
    // INTERNAL
    // ============================================

    async fn drain(&self) -> Result<(), Error> {
        while self.inner.flush().await?.is_some() {}
        Ok(())
    }

    fn ensure_not_shutdown(&self) -> Result<(), Error> {
        if self.inner.is_shutdown.load(Ordering::SeqCst) {
            return Err(Error::Shutdown);
        }
        Ok(())
    }

    fn send_built<B: BuildEvent>(&self, builder: B) -> Result<Delivery, Error> {
        let event = builder.build();
        self.enqueue(B::EVENT_TYPE, &event)
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn spawn_flush(self: &Arc<Self>) {
        let inner = Arc::clone(self);
        self.tasks.spawn_on(
            async move {
                if let Err(e) = inner.flush().await {
                    debug!(error = %e, "background flush failed");
                }
            },
            &self.runtime,
        );
    }

    fn spawn_timer(self: &Arc<Self>, id: u64, interval: Duration) -> tokio::task::JoinHandle<()> {
        let inner = Arc::clone(self);
        self.tasks.spawn_on(
            async move {
                tokio::time::sleep(interval).await;

                let still_armed = inner.lock_state().scheduler.fire(id);
                if !still_armed {
                    return;
                }

                debug!("flush timer fired");
                if let Err(e) = inner.flush().await {
                    debug!(error = %e, "timed flush failed");
                }
            },
            &self.runtime,
        )
    }

    #[instrument(skip(self))]
    async fn flush(&self) -> Result<Option<BatchResponse>, Error> {
        if !self.config.enabled() {
            return Ok(None);
        }

        let sent_at = Utc::now();
        let batch = {
            let mut state = self.lock_state();
            if state.queue.is_empty() {
                return Ok(None);
            }
            state.scheduler.cancel();
            state.queue.take_batch(self.config.flush_at(), sent_at)
        };

        let (payloads, completions): (Vec<Payload>, Vec<_>) =
            batch.into_iter().map(QueueItem::into_parts).unzip();

        info!(event_count = payloads.len(), "flushing events");

        match self.send(&payloads, sent_at).await {
            Ok(body) => {
                for completion in completions {
                    completion.resolve(Ok(Some(body.clone())));
                }
                Ok(Some(BatchResponse {
                    batch_size: payloads.len(),
                    body,
                }))
            }
            Err(e) => {
                warn!(error = %e, event_count = payloads.len(), "flush failed");
                for completion in completions {
                    completion.resolve(Err(e.clone()));
                }
                Err(e)
            }
        }
    }

    async fn send(&self, payloads: &[Payload], sent_at: DateTime<Utc>) -> Result<Value, Error> {
        let request = BatchRequest {
            batch: payloads,
            sent_at,
        };
        self.transport.send(&request).await
    }
}

impl BeaconBuilder {
    /// Build the Beacon client.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build(self) -> Result<Beacon, Error> {
        let config = self.build_config()?;
        Beacon::from_config(config)
    }
}

// ============================================
// SENDABLE WRAPPERS
// ============================================

/// Sendable track event builder.
pub struct SendableTrack<'a> {
    builder: TrackBuilder,
    client: &'a Beacon,
}

impl<'a> SendableTrack<'a> {
    /// Add a property.
    pub fn property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.builder = self.builder.property(key, value);
        self
    }

    /// Set custom timestamp.
    pub fn timestamp(mut self, ts: DateTime<Utc>) -> Self {
        self.builder = self.builder.timestamp(ts);
        self
    }

    /// Set the idempotency key instead of generating one.
    pub fn message_id(mut self, id: impl Into<String>) -> Self {
        self.builder = self.builder.message_id(id);
        self
    }

    /// Add a context entry.
    pub fn context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.builder = self.builder.context(key, value);
        self
    }

    /// Validate and queue the event.
    pub fn send(self) -> Result<Delivery, Error> {
        self.client.send_built(self.builder)
    }
}

/// Sendable identify event builder.
pub struct SendableIdentify<'a> {
    builder: IdentifyBuilder,
    client: &'a Beacon,
}

impl<'a> SendableIdentify<'a> {
    /// Add a trait.
    pub fn trait_(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.builder = self.builder.trait_(key, value);
        self
    }

    /// Set custom timestamp.
    pub fn timestamp(mut self, ts: DateTime<Utc>) -> Self {
        self.builder = self.builder.timestamp(ts);
        self
    }

    /// Set the idempotency key instead of generating one.
    pub fn message_id(mut self, id: impl Into<String>) -> Self {
        self.builder = self.builder.message_id(id);
        self
    }

    /// Validate and queue the event.
    pub fn send(self) -> Result<Delivery, Error> {
        self.client.send_built(self.builder)
    }
}

/// Sendable alert event builder.
pub struct SendableAlert<'a> {
    builder: AlertBuilder,
    client: &'a Beacon,
}

impl<'a> SendableAlert<'a> {
    /// Add a property.
    pub fn property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.builder = self.builder.property(key, value);
        self
    }

    /// Set custom timestamp.
    pub fn timestamp(mut self, ts: DateTime<Utc>) -> Self {
        self.builder = self.builder.timestamp(ts);
        self
    }

    /// Validate and queue the event.
    pub fn send(self) -> Result<Delivery, Error> {
        self.client.send_built(self.builder)
    }
}
