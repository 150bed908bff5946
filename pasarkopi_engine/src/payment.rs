//! The payment gateway widget seam.
//!
//! The hosted widget is modelled as a single async call: open it with a session token, get back exactly one
//! [`PaymentOutcome`]. Callers react to the outcome with an exhaustive match; there are no callbacks to forget to
//! wire up and no way to handle a result twice. [`WidgetAdapter`] additionally guarantees that only one widget
//! session runs at a time.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::order_types::SessionToken;

//--------------------------------------   PaymentOutcome    ---------------------------------------------------------

/// What the gateway reports about the payment attempt, as far as it got.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayReceipt {
    pub transaction_id: Option<String>,
    pub payment_type: Option<String>,
    pub virtual_account_number: Option<String>,
    pub bank: Option<String>,
}

/// The single result of one widget session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// The gateway confirmed the payment before the widget closed.
    Success(GatewayReceipt),
    /// The buyer picked an asynchronous channel (bank transfer, convenience store). The receipt carries the
    /// virtual account details to pay against; settlement arrives later via polling.
    Pending(GatewayReceipt),
    /// The gateway rejected the payment. The message is the gateway's own wording and is shown to the buyer
    /// as-is. No order is cancelled; the session stays open for a retry.
    Failed { message: String, receipt: Option<GatewayReceipt> },
    /// The buyer closed the widget without finishing. The session token remains valid and the payment can be
    /// retried from the tracking view.
    Cancelled,
}

impl std::fmt::Display for PaymentOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentOutcome::Success(_) => write!(f, "success"),
            PaymentOutcome::Pending(_) => write!(f, "pending"),
            PaymentOutcome::Failed { message, .. } => write!(f, "failed ({message})"),
            PaymentOutcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

//--------------------------------------    PaymentWidget    ---------------------------------------------------------

#[derive(Debug, Clone, Error)]
pub enum WidgetError {
    #[error("A payment widget is already open")]
    SessionInProgress,
    #[error("The payment widget could not be opened: {0}")]
    Sdk(String),
}

/// A hosted payment widget.
///
/// `open` resolves exactly once per session. An `Err` is an SDK-level failure (script not loaded, bad token); a
/// declined payment is not an error but [`PaymentOutcome::Failed`].
#[async_trait]
pub trait PaymentWidget: Send + Sync {
    async fn open(&self, token: &SessionToken) -> Result<PaymentOutcome, WidgetError>;
}

//--------------------------------------    WidgetAdapter    ---------------------------------------------------------

/// Serializes widget sessions.
///
/// The underlying SDK renders a single overlay; opening it twice stacks broken UI. The adapter turns a second
/// `pay` while one is in flight into [`WidgetError::SessionInProgress`]. The in-flight flag clears when the
/// session resolves, errors, or the future is dropped mid-flight.
pub struct WidgetAdapter<W> {
    widget: Arc<W>,
    in_flight: Arc<AtomicBool>,
}

impl<W> Clone for WidgetAdapter<W> {
    fn clone(&self) -> Self {
        Self { widget: Arc::clone(&self.widget), in_flight: Arc::clone(&self.in_flight) }
    }
}

struct OpenSession(Arc<AtomicBool>);

impl Drop for OpenSession {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl<W: PaymentWidget> WidgetAdapter<W> {
    pub fn new(widget: W) -> Self {
        Self { widget: Arc::new(widget), in_flight: Arc::new(AtomicBool::new(false)) }
    }

    /// Runs one widget session for `token` and returns its outcome.
    pub async fn pay(&self, token: &SessionToken) -> Result<PaymentOutcome, WidgetError> {
        if self.in_flight.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
            warn!("💳️ Rejected a widget open for {token} while another session is in progress");
            return Err(WidgetError::SessionInProgress);
        }
        let _open = OpenSession(Arc::clone(&self.in_flight));
        debug!("💳️ Opening the payment widget for session {token}");
        let outcome = self.widget.open(token).await;
        match &outcome {
            Ok(o) => debug!("💳️ Widget session {token} closed: {o}"),
            Err(e) => warn!("💳️ Widget session {token} failed: {e}"),
        }
        outcome
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;
    use crate::test_utils::fakes::ScriptedWidget;

    #[tokio::test]
    async fn second_open_during_a_session_is_rejected() {
        let _ = env_logger::try_init();
        let widget = ScriptedWidget::new().with_delay(Duration::from_millis(200)).push_success();
        let adapter = WidgetAdapter::new(widget);
        let first = adapter.clone();
        let session = tokio::spawn(async move { first.pay(&SessionToken::from("sess-one")).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(adapter.is_in_flight());
        let second = adapter.pay(&SessionToken::from("sess-two")).await;
        assert!(matches!(second, Err(WidgetError::SessionInProgress)));

        let outcome = session.await.unwrap().unwrap();
        assert!(matches!(outcome, PaymentOutcome::Success(_)));
        assert!(!adapter.is_in_flight());
    }

    #[tokio::test]
    async fn the_guard_resets_after_every_outcome() {
        let _ = env_logger::try_init();
        let widget = ScriptedWidget::new().push_cancelled().push_failed("card declined").push_success();
        let adapter = WidgetAdapter::new(widget);
        let token = SessionToken::from("sess-abc");

        assert_eq!(adapter.pay(&token).await.unwrap(), PaymentOutcome::Cancelled);
        assert!(!adapter.is_in_flight());
        let failed = adapter.pay(&token).await.unwrap();
        assert!(matches!(failed, PaymentOutcome::Failed { .. }));
        assert!(matches!(adapter.pay(&token).await.unwrap(), PaymentOutcome::Success(_)));
    }

    #[tokio::test]
    async fn the_guard_resets_after_an_sdk_error() {
        let _ = env_logger::try_init();
        let widget = ScriptedWidget::new().push_sdk_error("script failed to load").push_success();
        let adapter = WidgetAdapter::new(widget);
        let token = SessionToken::from("sess-abc");

        assert!(matches!(adapter.pay(&token).await, Err(WidgetError::Sdk(_))));
        assert!(!adapter.is_in_flight());
        assert!(adapter.pay(&token).await.is_ok());
    }

    #[tokio::test]
    async fn dropping_a_session_mid_flight_releases_the_guard() {
        let _ = env_logger::try_init();
        let widget = ScriptedWidget::new().with_delay(Duration::from_secs(60)).push_success();
        let adapter = WidgetAdapter::new(widget);
        let doomed = adapter.clone();
        let session = tokio::spawn(async move { doomed.pay(&SessionToken::from("sess-abc")).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(adapter.is_in_flight());
        session.abort();
        let _ = session.await;
        assert!(!adapter.is_in_flight());
    }
}
