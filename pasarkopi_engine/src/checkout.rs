//! The checkout flow.
//!
//! [`CheckoutOrchestrator`] is the only writer in the whole purchase path: it validates the form, snapshots the
//! cart into vendor groups, creates orders through the [`OrderService`], runs the payment widget for gateway
//! checkouts and decides when the cart may be cleared. Everything it needs from the outside world arrives through
//! traits, so the entire flow is testable without a network.

use log::{debug, error, info};
use thiserror::Error;

use crate::{
    cart::{CartStore, FeePolicy, VendorGroup},
    helpers::is_valid_phone,
    order_types::{DeliveryInfo, DeliveryMethod, Order, OrderId, OrderLineItem, PaymentMethod, SessionToken},
    payment::{PaymentOutcome, PaymentWidget, WidgetAdapter, WidgetError},
    traits::{AuthProvider, KeyValueStore, NewOrderRequest, NewTransactionRequest, OrderService, OrderServiceError},
};

//-------------------------------------- Requests and receipts -------------------------------------------------------

/// What the checkout form submits.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub delivery_info: DeliveryInfo,
    pub delivery_method: DeliveryMethod,
    pub payment_method: PaymentMethod,
}

/// Behaviour knobs for the orchestrator.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckoutPolicy {
    /// Whether a gateway payment that ends [`PaymentOutcome::Pending`] clears the cart. Off by default: the
    /// items stay until money is confirmed. A kiosk-style frontend that trusts its buyers to finish the bank
    /// transfer can switch this on.
    pub clear_cart_on_pending: bool,
}

/// How the checkout ended, when it got far enough to produce orders.
#[derive(Debug, Clone)]
pub enum CheckoutOutcome {
    /// Cash on fulfilment: one unpaid order per vendor, in cart vendor order.
    CashPlaced { orders: Vec<Order> },
    /// Gateway: a single transaction covering all vendors, plus whatever the widget session ended with.
    Gateway {
        session_token: SessionToken,
        order_ids: Vec<OrderId>,
        redirect_url: Option<String>,
        payment: PaymentOutcome,
    },
}

#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    pub outcome: CheckoutOutcome,
    /// The first created order, the natural one to open in the tracking view.
    pub tracking_order_id: Option<OrderId>,
    pub cart_cleared: bool,
}

//--------------------------------------    CheckoutError    ---------------------------------------------------------

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("The cart is empty")]
    EmptyCart,
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("{0} does not look like a valid phone number")]
    InvalidPhone(String),
    #[error("Not signed in")]
    NotAuthenticated,
    #[error("{0}")]
    Service(#[from] OrderServiceError),
    /// The cash fan-out failed partway. Orders created before the failure have been cancelled again where
    /// possible; `uncompensated` lists the ones the cancellation itself failed for.
    #[error("Could not create the order for {vendor}: {source}")]
    PartialFailure {
        vendor: String,
        #[source]
        source: OrderServiceError,
        compensated: Vec<OrderId>,
        uncompensated: Vec<OrderId>,
    },
    #[error("{0}")]
    Widget(#[from] WidgetError),
}

//-------------------------------------- CheckoutOrchestrator --------------------------------------------------------

pub struct CheckoutOrchestrator<B, W> {
    orders: B,
    widget: WidgetAdapter<W>,
    fees: FeePolicy,
    policy: CheckoutPolicy,
}

impl<B, W> CheckoutOrchestrator<B, W>
where
    B: OrderService,
    W: PaymentWidget,
{
    pub fn new(orders: B, widget: WidgetAdapter<W>) -> Self {
        Self { orders, widget, fees: FeePolicy::default(), policy: CheckoutPolicy::default() }
    }

    pub fn with_fee_policy(mut self, fees: FeePolicy) -> Self {
        self.fees = fees;
        self
    }

    pub fn with_policy(mut self, policy: CheckoutPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn fee_policy(&self) -> &FeePolicy {
        &self.fees
    }

    /// Runs one checkout.
    ///
    /// The flow is:
    /// 1. Validate without touching the network: the cart must be non-empty, name and a plausible phone number
    ///    are always required, an address is required for deliveries, and the buyer must be signed in.
    /// 2. Snapshot the cart into vendor groups exactly once. Everything below works off the snapshot, so
    ///    concurrent cart edits cannot change what is charged.
    /// 3. Cash: create one order per vendor group, strictly in sequence. If a creation fails, the remaining
    ///    requests are never sent and the already-created sibling orders are cancelled again
    ///    ([`CheckoutError::PartialFailure`] reports how that went).
    /// 4. Gateway: create a single transaction carrying every group, then hand its session token to the widget
    ///    and wait for the one [`PaymentOutcome`].
    /// 5. Clear the cart only on cash success, gateway `Success`, or gateway `Pending` when
    ///    [`CheckoutPolicy::clear_cart_on_pending`] is set. `Failed` and `Cancelled` keep the cart so the buyer
    ///    can try again.
    pub async fn checkout<S, A>(
        &self,
        auth: &A,
        cart: &mut CartStore<S>,
        request: CheckoutRequest,
    ) -> Result<CheckoutReceipt, CheckoutError>
    where
        S: KeyValueStore,
        A: AuthProvider + ?Sized,
    {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        validate_delivery_info(&request.delivery_info, request.delivery_method)?;
        if !auth.is_signed_in() {
            return Err(CheckoutError::NotAuthenticated);
        }
        let groups = cart.group_by_vendor(&self.fees, request.delivery_method);
        info!(
            "📦️ Checkout started: {} vendor group(s), {} item(s), {} / {}",
            groups.len(),
            cart.total_items(),
            request.delivery_method,
            request.payment_method
        );
        match request.payment_method {
            PaymentMethod::Cash => self.checkout_cash(cart, &request, groups).await,
            PaymentMethod::Gateway => self.checkout_gateway(cart, &request, groups).await,
        }
    }

    async fn checkout_cash<S: KeyValueStore>(
        &self,
        cart: &mut CartStore<S>,
        request: &CheckoutRequest,
        groups: Vec<VendorGroup>,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        let mut created: Vec<Order> = Vec::with_capacity(groups.len());
        for group in &groups {
            match self.orders.create_order(order_request_for(group, request)).await {
                Ok(order) => {
                    debug!("📦️ Created order {} for {} ({})", order.order_id, group.vendor_name, group.total);
                    created.push(order);
                },
                Err(e) => {
                    error!(
                        "📦️ Order creation for {} failed, compensating {} earlier order(s). {e}",
                        group.vendor_name,
                        created.len()
                    );
                    let (compensated, uncompensated) = self.cancel_all(&created).await;
                    return Err(CheckoutError::PartialFailure {
                        vendor: group.vendor_name.clone(),
                        source: e,
                        compensated,
                        uncompensated,
                    });
                },
            }
        }
        let tracking_order_id = created.first().map(|o| o.order_id.clone());
        cart.clear();
        info!("📦️ Checkout complete: {} cash order(s) placed", created.len());
        Ok(CheckoutReceipt {
            outcome: CheckoutOutcome::CashPlaced { orders: created },
            tracking_order_id,
            cart_cleared: true,
        })
    }

    async fn checkout_gateway<S: KeyValueStore>(
        &self,
        cart: &mut CartStore<S>,
        request: &CheckoutRequest,
        groups: Vec<VendorGroup>,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        let transaction = NewTransactionRequest {
            orders: groups.iter().map(|g| order_request_for(g, request)).collect(),
            delivery_method: request.delivery_method,
            delivery_info: request.delivery_info.clone(),
        };
        let total = transaction.total_amount();
        let session = self.orders.create_gateway_transaction(transaction).await?;
        info!(
            "📦️ Gateway session {} open: {} order(s), {total} in total",
            session.session_token,
            session.order_ids.len()
        );
        let payment = self.widget.pay(&session.session_token).await?;
        let cart_cleared = match &payment {
            PaymentOutcome::Success(_) => true,
            PaymentOutcome::Pending(_) => self.policy.clear_cart_on_pending,
            PaymentOutcome::Failed { message, .. } => {
                error!("📦️ Gateway payment failed: {message}");
                false
            },
            PaymentOutcome::Cancelled => {
                info!("📦️ Widget closed without paying; session {} stays resumable", session.session_token);
                false
            },
        };
        if cart_cleared {
            cart.clear();
        }
        info!("📦️ Checkout complete: gateway payment {payment}");
        Ok(CheckoutReceipt {
            tracking_order_id: session.order_ids.first().cloned(),
            cart_cleared,
            outcome: CheckoutOutcome::Gateway {
                session_token: session.session_token,
                order_ids: session.order_ids,
                redirect_url: session.redirect_url,
                payment,
            },
        })
    }

    /// Compensating cancellation for a cash fan-out that failed partway. Returns the ids that were cancelled and
    /// the ids that could not be.
    async fn cancel_all(&self, created: &[Order]) -> (Vec<OrderId>, Vec<OrderId>) {
        let mut compensated = Vec::new();
        let mut uncompensated = Vec::new();
        for order in created {
            match self.orders.cancel_order(&order.order_id, COMPENSATION_REASON).await {
                Ok(_) => compensated.push(order.order_id.clone()),
                Err(e) => {
                    error!("📦️ Could not cancel order {} while unwinding the checkout. {e}", order.order_id);
                    uncompensated.push(order.order_id.clone());
                },
            }
        }
        (compensated, uncompensated)
    }
}

const COMPENSATION_REASON: &str = "A sibling order in the same checkout failed";

fn order_request_for(group: &VendorGroup, request: &CheckoutRequest) -> NewOrderRequest {
    NewOrderRequest {
        vendor_id: group.vendor_id.clone(),
        vendor_name: group.vendor_name.clone(),
        line_items: group
            .lines
            .iter()
            .map(|l| OrderLineItem {
                menu_item_id: l.menu_item_id.clone(),
                name: l.item.name.clone(),
                price: l.item.price,
                quantity: l.quantity,
                notes: l.notes.clone(),
            })
            .collect(),
        subtotal: group.subtotal,
        delivery_fee: group.delivery_fee,
        service_fee: group.service_fee,
        total_amount: group.total,
        delivery_method: request.delivery_method,
        delivery_info: request.delivery_info.clone(),
        payment_method: request.payment_method,
    }
}

/// Pre-network form validation. `address` is only required when the order is delivered.
pub fn validate_delivery_info(info: &DeliveryInfo, method: DeliveryMethod) -> Result<(), CheckoutError> {
    if info.name.trim().is_empty() {
        return Err(CheckoutError::MissingField("name"));
    }
    if info.phone.trim().is_empty() {
        return Err(CheckoutError::MissingField("phone"));
    }
    if !is_valid_phone(&info.phone) {
        return Err(CheckoutError::InvalidPhone(info.phone.clone()));
    }
    if method == DeliveryMethod::Delivery && info.address.as_deref().map_or(true, |a| a.trim().is_empty()) {
        return Err(CheckoutError::MissingField("delivery address"));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn info() -> DeliveryInfo {
        DeliveryInfo {
            name: "Budi".into(),
            phone: "081234567890".into(),
            address: Some("Jl. Braga No. 10, Bandung".into()),
            notes: None,
        }
    }

    #[test]
    fn delivery_requires_an_address() {
        let mut incomplete = info();
        incomplete.address = None;
        let err = validate_delivery_info(&incomplete, DeliveryMethod::Delivery).unwrap_err();
        assert!(matches!(err, CheckoutError::MissingField("delivery address")));

        incomplete.address = Some("   ".into());
        assert!(validate_delivery_info(&incomplete, DeliveryMethod::Delivery).is_err());
    }

    #[test]
    fn pickup_does_not_require_an_address() {
        let mut pickup = info();
        pickup.address = None;
        assert!(validate_delivery_info(&pickup, DeliveryMethod::Pickup).is_ok());
    }

    #[test]
    fn name_and_phone_are_always_required() {
        let mut missing_name = info();
        missing_name.name = "  ".into();
        let err = validate_delivery_info(&missing_name, DeliveryMethod::Pickup).unwrap_err();
        assert!(matches!(err, CheckoutError::MissingField("name")));

        let mut missing_phone = info();
        missing_phone.phone = String::new();
        let err = validate_delivery_info(&missing_phone, DeliveryMethod::Pickup).unwrap_err();
        assert!(matches!(err, CheckoutError::MissingField("phone")));
    }

    #[test]
    fn implausible_phone_numbers_are_rejected() {
        let mut bad_phone = info();
        bad_phone.phone = "call me maybe".into();
        let err = validate_delivery_info(&bad_phone, DeliveryMethod::Delivery).unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidPhone(_)));
    }
}
