use async_trait::async_trait;
use pasar_common::Rupiah;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::order_types::{
    DeliveryInfo,
    DeliveryMethod,
    Order,
    OrderId,
    OrderLineItem,
    PaymentMethod,
    SessionToken,
};

//-------------------------------------- Request payloads    ---------------------------------------------------------

/// Payload for creating one order for one vendor. Totals are computed client-side by the aggregator and echoed
/// back by the server; the server remains authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderRequest {
    pub vendor_id: String,
    pub vendor_name: String,
    pub line_items: Vec<OrderLineItem>,
    pub subtotal: Rupiah,
    pub delivery_fee: Rupiah,
    pub service_fee: Rupiah,
    pub total_amount: Rupiah,
    pub delivery_method: DeliveryMethod,
    pub delivery_info: DeliveryInfo,
    pub payment_method: PaymentMethod,
}

/// Payload for a gateway checkout: one transaction covering every vendor group in the cart snapshot. The backend
/// fans this out into per-vendor orders itself and returns a single payment session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransactionRequest {
    pub orders: Vec<NewOrderRequest>,
    pub delivery_method: DeliveryMethod,
    pub delivery_info: DeliveryInfo,
}

impl NewTransactionRequest {
    pub fn total_amount(&self) -> Rupiah {
        self.orders.iter().map(|o| o.total_amount).sum()
    }
}

/// What the backend returns for a gateway transaction: the widget session token plus the ids of the orders it
/// created, all still unpaid at this point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewaySession {
    pub session_token: SessionToken,
    pub order_ids: Vec<OrderId>,
    pub redirect_url: Option<String>,
}

//--------------------------------------  OrderServiceError  ---------------------------------------------------------

#[derive(Debug, Clone, Error)]
pub enum OrderServiceError {
    #[error("Not signed in")]
    NotAuthenticated,
    #[error("Order {0} was not found")]
    NotFound(OrderId),
    /// A non-2xx response. The message is the server's own wording and is shown to the buyer as-is.
    #[error("{message}")]
    Remote { status: u16, message: String },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Could not interpret the server response: {0}")]
    InvalidResponse(String),
}

//--------------------------------------    OrderService     ---------------------------------------------------------

/// The remote order service, as seen by the engine.
///
/// Implemented over HTTP by `pasarkopi_client::StorefrontApi` and in-memory by the `test_utils` fakes. All calls
/// require a signed-in buyer; implementations surface a missing credential as
/// [`OrderServiceError::NotAuthenticated`].
#[async_trait]
pub trait OrderService: Send + Sync {
    async fn create_order(&self, request: NewOrderRequest) -> Result<Order, OrderServiceError>;

    /// Single authoritative read of one order. Unknown ids are [`OrderServiceError::NotFound`].
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Order, OrderServiceError>;

    async fn create_gateway_transaction(
        &self,
        request: NewTransactionRequest,
    ) -> Result<GatewaySession, OrderServiceError>;

    /// Cancels an order that has not reached a terminal status and returns the updated snapshot.
    async fn cancel_order(&self, order_id: &OrderId, reason: &str) -> Result<Order, OrderServiceError>;
}
