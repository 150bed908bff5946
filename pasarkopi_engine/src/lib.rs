//! Pasar Kopi storefront engine
//!
//! The engine is the headless core of the Pasar Kopi marketplace client. It owns everything a storefront frontend
//! needs between "add to cart" and "order delivered", without knowing anything about HTTP or rendering:
//!
//! 1. The cart ([`mod@cart`]): a persistent cart that merges duplicate items, and an aggregator that splits the
//!    cart into per-vendor groups with deterministic fee totals.
//! 2. Checkout ([`mod@checkout`]): the orchestrator that turns a cart snapshot into placed orders. Cash checkouts
//!    place one order per vendor and compensate on partial failure; gateway checkouts place a single transaction
//!    and drive the hosted payment widget.
//! 3. Payment ([`mod@payment`]): the widget seam. One async call per session, one tagged outcome back, and an
//!    adapter that refuses to open two widgets at once.
//! 4. Tracking ([`mod@tracker`]): a polling tracker that publishes order snapshots to watchers, rejects status
//!    regressions, and stops by itself once the order reaches a terminal status.
//!
//! The engine talks to the outside world through the traits in [`mod@traits`]: [`OrderService`] for the remote
//! backend (implemented over HTTP in `pasarkopi_client`), [`AuthProvider`] for credentials and
//! [`KeyValueStore`] for persistence. Swap in the `test_utils` fakes and the whole flow runs in-memory.

pub mod cart;
pub mod checkout;
pub mod helpers;
pub mod order_types;
pub mod payment;
pub mod storage;
pub mod tracker;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use cart::{Cart, CartLine, CartStore, FeePolicy, NewLine, VendorGroup};
pub use checkout::{
    CheckoutError,
    CheckoutOrchestrator,
    CheckoutOutcome,
    CheckoutPolicy,
    CheckoutReceipt,
    CheckoutRequest,
};
pub use payment::{GatewayReceipt, PaymentOutcome, PaymentWidget, WidgetAdapter, WidgetError};
pub use tracker::{OrderTracker, TrackingError, TrackingHandle, TrackingState, DEFAULT_POLL_INTERVAL};
pub use traits::{
    AuthProvider,
    CredentialStore,
    GatewaySession,
    KeyValueStore,
    NewOrderRequest,
    NewTransactionRequest,
    OrderService,
    OrderServiceError,
    StorageError,
};
