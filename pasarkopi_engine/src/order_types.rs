//! The canonical order data model for the storefront.
//!
//! Every component in the workspace (engine, HTTP client, CLI) uses these types. There is exactly one definition of
//! an [`Order`] and of the two status state machines; wire formats, storage snapshots and UI projections all
//! round-trip through the same structs.
//!
//! The two status enums are independent axes: [`OrderStatus`] tracks fulfilment (what the kitchen and the courier
//! are doing), [`PaymentStatus`] tracks money. An order can be `delivered` while its payment is still `pending`
//! (cash on fulfilment) and `cancelled` while its payment is `paid` (which is what a refund flow looks like).

use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use pasar_common::Rupiah;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ConversionError(String);

//--------------------------------------    OrderStatus      ---------------------------------------------------------

/// The fulfilment state machine.
///
/// Statuses only ever move forward along [`OrderStatus::PROGRESSION`]; skipping a step is allowed (a vendor may
/// confirm and start preparing in one go) but moving backwards never is. `Cancelled` is reachable from any
/// non-terminal status and is itself terminal, as is `Delivered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order placed, waiting for the vendor to acknowledge it.
    Pending,
    /// The vendor has accepted the order.
    Confirmed,
    /// The kitchen is working on it.
    Preparing,
    /// Ready for pickup or waiting for a courier.
    Ready,
    /// A courier is on the way to the buyer.
    OnDelivery,
    /// Handed over. Terminal.
    Delivered,
    /// Cancelled by the buyer, the vendor or an admin. Terminal.
    Cancelled,
}

impl OrderStatus {
    /// The forward progression, in order. `Cancelled` sits outside the progression.
    pub const PROGRESSION: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::OnDelivery,
        OrderStatus::Delivered,
    ];

    /// Position of this status in the forward progression, or `None` for `Cancelled`.
    pub fn progression_rank(&self) -> Option<usize> {
        Self::PROGRESSION.iter().position(|s| s == self)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// A status never transitions to itself, a terminal status has no exits, and an "earlier" target status is
    /// always illegal. Any non-terminal status may move to `Cancelled`.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        if self.is_terminal() || *self == next {
            return false;
        }
        match (self.progression_rank(), next.progression_rank()) {
            (_, None) => true,
            (Some(cur), Some(nxt)) => nxt > cur,
            (None, Some(_)) => false,
        }
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Confirmed => write!(f, "confirmed"),
            OrderStatus::Preparing => write!(f, "preparing"),
            OrderStatus::Ready => write!(f, "ready"),
            OrderStatus::OnDelivery => write!(f, "on_delivery"),
            OrderStatus::Delivered => write!(f, "delivered"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "preparing" => Ok(Self::Preparing),
            "ready" => Ok(Self::Ready),
            "on_delivery" => Ok(Self::OnDelivery),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------   PaymentStatus     ---------------------------------------------------------

/// The payment state machine. Independent of [`OrderStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// No settlement yet. Cash orders stay pending until handover; gateway orders until the gateway confirms.
    Pending,
    /// Settled in full.
    Paid,
    /// The gateway rejected or could not complete the payment.
    Failed,
    /// The payment session lapsed before the buyer completed it.
    Expired,
    /// A completed payment that has been returned.
    Refunded,
}

impl PaymentStatus {
    /// Legal transitions: `pending` settles to exactly one of `paid`/`failed`/`expired`, and only a `paid`
    /// payment can be refunded.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (PaymentStatus::Pending, PaymentStatus::Paid)
                | (PaymentStatus::Pending, PaymentStatus::Failed)
                | (PaymentStatus::Pending, PaymentStatus::Expired)
                | (PaymentStatus::Paid, PaymentStatus::Refunded)
        )
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Paid => write!(f, "paid"),
            PaymentStatus::Failed => write!(f, "failed"),
            PaymentStatus::Expired => write!(f, "expired"),
            PaymentStatus::Refunded => write!(f, "refunded"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            "expired" => Ok(Self::Expired),
            "refunded" => Ok(Self::Refunded),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

//-------------------------------------- Methods and info    ---------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash on fulfilment. The order is created unpaid and settled at handover.
    Cash,
    /// Online payment through the hosted gateway widget.
    Gateway,
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Cash => write!(f, "cash"),
            PaymentMethod::Gateway => write!(f, "gateway"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(Self::Cash),
            "gateway" => Ok(Self::Gateway),
            s => Err(ConversionError(format!("Invalid payment method: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    Delivery,
    Pickup,
}

impl Display for DeliveryMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryMethod::Delivery => write!(f, "delivery"),
            DeliveryMethod::Pickup => write!(f, "pickup"),
        }
    }
}

impl FromStr for DeliveryMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delivery" => Ok(Self::Delivery),
            "pickup" => Ok(Self::Pickup),
            s => Err(ConversionError(format!("Invalid delivery method: {s}"))),
        }
    }
}

/// Contact and drop-off details shared by every order in one checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryInfo {
    pub name: String,
    pub phone: String,
    /// Required when the delivery method is `delivery`, unused for pickups.
    pub address: Option<String>,
    pub notes: Option<String>,
}

//--------------------------------------       OrderId       ---------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------    SessionToken     ---------------------------------------------------------

/// Opaque handle for a hosted payment widget session.
///
/// The token is ephemeral on the client but the backend persists it on the order, so an abandoned widget session
/// can be resumed later from the tracking view. `Display` masks the tail of the token so it can be logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken(pub String);

impl From<String> for SessionToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}******", self.0.get(..8).unwrap_or(&self.0))
    }
}

impl SessionToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------       Order         ---------------------------------------------------------

/// A single line of an order, snapshotted at checkout time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineItem {
    pub menu_item_id: String,
    pub name: String,
    /// Unit price at the moment the item entered the cart. Later menu edits do not touch placed orders.
    pub price: Rupiah,
    pub quantity: u32,
    pub notes: Option<String>,
}

impl OrderLineItem {
    pub fn line_total(&self) -> Rupiah {
        self.price.times(self.quantity)
    }
}

/// How (and whether) the order has been paid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    pub method: PaymentMethod,
    /// Gateway channel chosen by the buyer, e.g. `bank_transfer` or `qris`.
    pub gateway_payment_type: Option<String>,
    pub transaction_id: Option<String>,
    pub session_token: Option<SessionToken>,
    pub redirect_url: Option<String>,
    pub virtual_account_number: Option<String>,
    pub bank: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl PaymentDetails {
    pub fn for_method(method: PaymentMethod) -> Self {
        Self {
            method,
            gateway_payment_type: None,
            transaction_id: None,
            session_token: None,
            redirect_url: None,
            virtual_account_number: None,
            bank: None,
            paid_at: None,
        }
    }
}

/// One entry in the order's status audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEntry {
    pub status: OrderStatus,
    pub timestamp: DateTime<Utc>,
    pub notes: Option<String>,
}

/// A placed order for a single vendor.
///
/// Totals are computed once at creation and are immutable thereafter. The backend owns all mutation; clients only
/// ever observe new snapshots through polling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: OrderId,
    pub vendor_id: String,
    pub vendor_name: String,
    pub line_items: Vec<OrderLineItem>,
    pub subtotal: Rupiah,
    pub delivery_fee: Rupiah,
    pub service_fee: Rupiah,
    #[serde(default)]
    pub discount: Rupiah,
    pub total_amount: Rupiah,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub delivery_method: DeliveryMethod,
    pub delivery_info: DeliveryInfo,
    pub payment_details: PaymentDetails,
    #[serde(default)]
    pub history: Vec<StatusEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// True when the stored totals add up. Backends that disagree with the aggregator get flagged in the logs.
    pub fn totals_consistent(&self) -> bool {
        self.total_amount == self.subtotal + self.delivery_fee + self.service_fee - self.discount
    }

    /// A payment retry is only meaningful for an unsettled gateway order with a stored session token.
    pub fn is_gateway_retryable(&self) -> bool {
        self.payment_status == PaymentStatus::Pending
            && self.payment_details.method == PaymentMethod::Gateway
            && self.payment_details.session_token.is_some()
    }
}
