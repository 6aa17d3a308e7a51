//! Keeps one inbound event stream open and feeds it to the dispatcher.
//!
//! The stream is refreshed on a fixed interval: the current subscription is
//! stopped, whatever it had already buffered is dispatched, and only then is
//! a new subscription opened. A failed or ended stream is left closed until
//! the next refresh.

use std::{sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    tokio::{
        sync::watch,
        time::{Instant, MissedTickBehavior},
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use herald_metrics::{counter, stream as stream_metrics};

use {
    herald_channels::{Subscription, Transport},
    herald_common::types::RawMessage,
};

use crate::Result;

/// Default time between forced stream refreshes.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(2 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Disconnected,
    Listening,
}

/// Receives every inbound event, one at a time.
#[async_trait]
pub trait InboundSink: Send + Sync {
    async fn handle(&self, raw: RawMessage);
}

pub struct StreamSupervisor {
    transport: Arc<dyn Transport>,
    sink: Arc<dyn InboundSink>,
    refresh_interval: Duration,
    state: watch::Sender<StreamState>,
}

impl StreamSupervisor {
    pub fn new(
        transport: Arc<dyn Transport>,
        sink: Arc<dyn InboundSink>,
        refresh_interval: Duration,
    ) -> Self {
        let (state, _) = watch::channel(StreamState::Disconnected);
        Self {
            transport,
            sink,
            refresh_interval,
            state,
        }
    }

    /// Observe state changes.
    pub fn state(&self) -> watch::Receiver<StreamState> {
        self.state.subscribe()
    }

    pub fn current_state(&self) -> StreamState {
        *self.state.borrow()
    }

    /// Open a subscription and move to `Listening`.
    pub async fn connect(&self) -> Result<Subscription> {
        match self.transport.subscribe().await {
            Ok(subscription) => {
                #[cfg(feature = "metrics")]
                counter!(stream_metrics::SUBSCRIPTIONS_TOTAL).increment(1);
                self.state.send_replace(StreamState::Listening);
                info!(self_id = self.transport.self_id(), "listening for events");
                Ok(subscription)
            },
            Err(e) => {
                #[cfg(feature = "metrics")]
                counter!(stream_metrics::ERRORS_TOTAL).increment(1);
                self.state.send_replace(StreamState::Disconnected);
                Err(e.into())
            },
        }
    }

    /// Dispatch events until `cancel` fires.
    ///
    /// `initial` is an already open subscription, typically the one bootstrap
    /// obtained; without it the supervisor connects immediately.
    pub async fn run(&self, initial: Option<Subscription>, cancel: CancellationToken) {
        let mut subscription = match initial {
            Some(subscription) => {
                self.state.send_replace(StreamState::Listening);
                Some(subscription)
            },
            None => self.try_connect().await,
        };

        let mut refresh = tokio::time::interval_at(
            Instant::now() + self.refresh_interval,
            self.refresh_interval,
        );
        refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = refresh.tick() => {
                    info!("refreshing event stream");
                    #[cfg(feature = "metrics")]
                    counter!(stream_metrics::REFRESHES_TOTAL).increment(1);
                    if let Some(previous) = subscription.take() {
                        self.release(previous).await;
                    }
                    subscription = self.try_connect().await;
                },
                event = next_event(&mut subscription) => match event {
                    Some(Ok(raw)) => self.sink.handle(raw).await,
                    Some(Err(e)) => {
                        warn!(error = %e, "event stream failed, waiting for the next refresh");
                        #[cfg(feature = "metrics")]
                        counter!(stream_metrics::ERRORS_TOTAL).increment(1);
                        if let Some(previous) = subscription.take() {
                            self.release(previous).await;
                        }
                    },
                    None => {
                        warn!("event stream ended, waiting for the next refresh");
                        if let Some(previous) = subscription.take() {
                            self.release(previous).await;
                        }
                    },
                },
            }
        }

        if let Some(mut current) = subscription.take() {
            current.stop();
        }
        self.state.send_replace(StreamState::Disconnected);
        info!("stream supervisor stopped");
    }

    async fn try_connect(&self) -> Option<Subscription> {
        match self.connect().await {
            Ok(subscription) => Some(subscription),
            Err(e) => {
                warn!(error = %e, "failed to subscribe, retrying at the next refresh");
                None
            },
        }
    }

    /// Stop `subscription` and dispatch what it had already buffered.
    async fn release(&self, mut subscription: Subscription) {
        let pending = subscription.stop_and_drain();
        drop(subscription);
        self.state.send_replace(StreamState::Disconnected);
        if !pending.is_empty() {
            debug!(count = pending.len(), "dispatching events buffered before release");
        }
        for raw in pending {
            self.sink.handle(raw).await;
        }
    }
}

/// Next event from the open subscription; never resolves while there is none.
async fn next_event(subscription: &mut Option<Subscription>) -> Option<Result<RawMessage>> {
    match subscription {
        Some(subscription) => subscription.next().await.map(|r| r.map_err(Into::into)),
        None => std::future::pending().await,
    }
}
