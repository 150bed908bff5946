//! Live order tracking.
//!
//! [`OrderTracker::start`] spawns a polling task per tracked order: fetch immediately, then every
//! [`DEFAULT_POLL_INTERVAL`] until the order reaches a terminal status. Snapshots are published through a `watch`
//! channel, so the UI always renders the latest accepted state and slow consumers simply skip intermediate ones.
//! The task dies with its [`TrackingHandle`]; dropping the view cannot leak a poller.
//!
//! The tracker is also where a stored payment session gets a second chance: `retry_payment` re-opens the widget
//! with the session token the backend kept on the order.

use std::{sync::Arc, time::Duration};

use log::{debug, error, info, warn};
use thiserror::Error;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};

use crate::{
    order_types::{Order, OrderId, PaymentMethod, PaymentStatus, SessionToken},
    payment::{PaymentOutcome, PaymentWidget, WidgetAdapter, WidgetError},
    traits::{OrderService, OrderServiceError},
};

/// How often a tracking task re-fetches a live order.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

//--------------------------------------    TrackingState    ---------------------------------------------------------

/// What the tracking view renders.
#[derive(Debug, Clone)]
pub enum TrackingState {
    /// The first fetch has not resolved yet.
    Loading,
    /// The last accepted snapshot.
    Live(Order),
    /// The order id does not exist. Terminal, never retried.
    NotFound,
    /// The first fetch failed before any snapshot existed. Polling keeps retrying; a later success replaces
    /// this state, and an established `Live` view never downgrades back to `Failed`.
    Failed(String),
}

impl TrackingState {
    pub fn order(&self) -> Option<&Order> {
        match self {
            TrackingState::Live(order) => Some(order),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("{0}")]
    Service(#[from] OrderServiceError),
    #[error("{0}")]
    Widget(#[from] WidgetError),
    #[error("Payment retry is not available: {0}")]
    RetryNotAvailable(&'static str),
    #[error("No order snapshot is available yet")]
    NoSnapshot,
}

//--------------------------------------    OrderTracker     ---------------------------------------------------------

/// Entry point for order reads, cancellation and payment retries.
#[derive(Clone)]
pub struct OrderTracker {
    api: Arc<dyn OrderService>,
    poll_interval: Duration,
}

impl OrderTracker {
    pub fn new<B: OrderService + 'static>(api: B) -> Self {
        Self { api: Arc::new(api), poll_interval: DEFAULT_POLL_INTERVAL }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// A single authoritative read, no polling.
    pub async fn fetch(&self, order_id: &OrderId) -> Result<Order, OrderServiceError> {
        self.api.fetch_order(order_id).await
    }

    /// Cancels an order on the server and returns the updated snapshot.
    pub async fn cancel_order(&self, order_id: &OrderId, reason: &str) -> Result<Order, OrderServiceError> {
        info!("🛰️ Cancelling order {order_id}: {reason}");
        self.api.cancel_order(order_id, reason).await
    }

    /// One-shot payment retry for an order fetched outside a live tracking view.
    ///
    /// Valid only for an unsettled gateway order with a stored session token. Returns the widget outcome together
    /// with a fresh snapshot, since the gateway may have settled the payment server-side by the time the widget
    /// closes.
    pub async fn retry_payment<W: PaymentWidget>(
        &self,
        order: &Order,
        widget: &WidgetAdapter<W>,
    ) -> Result<(PaymentOutcome, Order), TrackingError> {
        let token = retryable_token(order)?.clone();
        let outcome = widget.pay(&token).await?;
        debug!("🛰️ Payment retry for {} finished: {outcome}", order.order_id);
        let refreshed = self.api.fetch_order(&order.order_id).await?;
        Ok((outcome, refreshed))
    }

    /// Starts a polling task for `order_id` and returns the live view over it.
    pub fn start(&self, order_id: OrderId) -> TrackingHandle {
        let (state_tx, state_rx) = watch::channel(TrackingState::Loading);
        let (inject_tx, inject_rx) = mpsc::channel(4);
        let task =
            tokio::spawn(poll_order(Arc::clone(&self.api), order_id.clone(), self.poll_interval, state_tx, inject_rx));
        info!("🛰️ Tracking order {order_id} every {:?}", self.poll_interval);
        TrackingHandle { order_id, api: Arc::clone(&self.api), state: state_rx, inject: inject_tx, task }
    }
}

//--------------------------------------   TrackingHandle    ---------------------------------------------------------

/// A live view over one tracked order.
pub struct TrackingHandle {
    order_id: OrderId,
    api: Arc<dyn OrderService>,
    state: watch::Receiver<TrackingState>,
    inject: mpsc::Sender<Order>,
    task: JoinHandle<()>,
}

impl TrackingHandle {
    pub fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    /// The latest published state.
    pub fn current(&self) -> TrackingState {
        self.state.borrow().clone()
    }

    /// Waits for the next published state. Returns `None` once the poller has stopped and no further states will
    /// ever arrive; the final state stays available through [`TrackingHandle::current`].
    pub async fn changed(&mut self) -> Option<TrackingState> {
        match self.state.changed().await {
            Ok(()) => Some(self.state.borrow().clone()),
            Err(_) => None,
        }
    }

    /// True once the poller has stopped, whether by reaching a terminal state or by cancellation.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops polling immediately. Idempotent; dropping the handle does the same.
    pub fn cancel(&self) {
        self.task.abort();
    }

    /// Cancels the tracked order itself and publishes the cancelled snapshot right away, without waiting for the
    /// next poll tick.
    pub async fn cancel_order(&self, reason: &str) -> Result<Order, TrackingError> {
        info!("🛰️ Cancelling order {}: {reason}", self.order_id);
        let order = self.api.cancel_order(&self.order_id, reason).await?;
        let _ = self.inject.send(order.clone()).await;
        Ok(order)
    }

    /// Re-opens the payment widget with the session token stored on the current snapshot, then re-fetches to
    /// reconcile and publishes the fresh snapshot.
    pub async fn retry_payment<W: PaymentWidget>(
        &self,
        widget: &WidgetAdapter<W>,
    ) -> Result<(PaymentOutcome, Order), TrackingError> {
        let order = match self.current() {
            TrackingState::Live(order) => order,
            _ => return Err(TrackingError::NoSnapshot),
        };
        let token = retryable_token(&order)?.clone();
        let outcome = widget.pay(&token).await?;
        debug!("🛰️ Payment retry for {} finished: {outcome}", self.order_id);
        let refreshed = self.api.fetch_order(&self.order_id).await?;
        let _ = self.inject.send(refreshed.clone()).await;
        Ok((outcome, refreshed))
    }
}

impl Drop for TrackingHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

//--------------------------------------    Polling task     ---------------------------------------------------------

async fn poll_order(
    api: Arc<dyn OrderService>,
    order_id: OrderId,
    interval: Duration,
    state: watch::Sender<TrackingState>,
    mut inject: mpsc::Receiver<Order>,
) {
    let mut timer = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = timer.tick() => {
                match api.fetch_order(&order_id).await {
                    Ok(order) => {
                        if publish(&state, order) {
                            break;
                        }
                    },
                    Err(OrderServiceError::NotFound(_)) => {
                        warn!("🛰️ Order {order_id} was not found; tracking stops");
                        let _ = state.send(TrackingState::NotFound);
                        break;
                    },
                    Err(e) => {
                        // The borrow guard must not be held across the send below.
                        let has_snapshot = matches!(&*state.borrow(), TrackingState::Live(_));
                        if has_snapshot {
                            warn!("🛰️ Poll for {order_id} failed, keeping the last snapshot. {e}");
                        } else {
                            warn!("🛰️ Initial fetch of {order_id} failed. {e}");
                            let _ = state.send(TrackingState::Failed(e.to_string()));
                        }
                    },
                }
            },
            Some(order) = inject.recv() => {
                if publish(&state, order) {
                    break;
                }
            },
        }
    }
    debug!("🛰️ Tracking task for {order_id} stopped");
}

/// Publishes a snapshot unless it would move the order status backwards. A snapshot identical to the current
/// one is not re-sent, so watchers only wake on real changes. Returns true when the snapshot is terminal and
/// polling should stop.
fn publish(state: &watch::Sender<TrackingState>, order: Order) -> bool {
    // Copy the previous status out so the borrow guard is gone before the send.
    let previous = match &*state.borrow() {
        TrackingState::Live(previous) => Some(previous.status),
        _ => None,
    };
    if let Some(prev) = previous {
        if prev != order.status && !prev.can_transition_to(order.status) {
            error!("🛰️ Rejected a status regression on {}: {prev} -> {}", order.order_id, order.status);
            return false;
        }
    }
    let terminal = order.status.is_terminal();
    state.send_if_modified(|current| {
        if matches!(current, TrackingState::Live(prev) if *prev == order) {
            return false;
        }
        debug!("🛰️ {} is now {} / payment {}", order.order_id, order.status, order.payment_status);
        *current = TrackingState::Live(order);
        true
    });
    terminal
}

fn retryable_token(order: &Order) -> Result<&SessionToken, TrackingError> {
    if order.payment_details.method != PaymentMethod::Gateway {
        return Err(TrackingError::RetryNotAvailable("the order was not paid through the gateway"));
    }
    if order.payment_status != PaymentStatus::Pending {
        return Err(TrackingError::RetryNotAvailable("the payment is no longer pending"));
    }
    order
        .payment_details
        .session_token
        .as_ref()
        .ok_or(TrackingError::RetryNotAvailable("no payment session is stored on the order"))
}
