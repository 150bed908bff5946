use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use pasar_common::{Rupiah, Secret};

use crate::{
    order_types::{
        DeliveryInfo,
        DeliveryMethod,
        Order,
        OrderId,
        OrderLineItem,
        OrderStatus,
        PaymentDetails,
        PaymentMethod,
        PaymentStatus,
        SessionToken,
        StatusEntry,
    },
    payment::{GatewayReceipt, PaymentOutcome, PaymentWidget, WidgetError},
    traits::{AuthProvider, GatewaySession, NewOrderRequest, NewTransactionRequest, OrderService, OrderServiceError},
};

//--------------------------------------     StaticAuth      ---------------------------------------------------------

/// An [`AuthProvider`] with a fixed credential, or none at all.
#[derive(Debug, Clone, Default)]
pub struct StaticAuth {
    token: Option<String>,
}

impl StaticAuth {
    pub fn signed_in(token: &str) -> Self {
        Self { token: Some(token.to_string()) }
    }

    pub fn signed_out() -> Self {
        Self { token: None }
    }
}

impl AuthProvider for StaticAuth {
    fn bearer_token(&self) -> Option<Secret<String>> {
        self.token.clone().map(Secret::new)
    }
}

//-------------------------------------- InMemoryOrderService --------------------------------------------------------

#[derive(Default)]
struct ServiceState {
    orders: HashMap<String, Order>,
    create_requests: Vec<NewOrderRequest>,
    transaction_requests: Vec<NewTransactionRequest>,
    cancel_requests: Vec<(OrderId, String)>,
    fetch_count: usize,
    next_id: u64,
    fail_create_at: Option<(usize, String)>,
    fail_transaction: Option<String>,
    fail_cancel_ids: HashSet<String>,
    fail_next_fetches: usize,
}

/// A real but in-memory [`OrderService`].
///
/// It assigns sequential ids, keeps the orders it creates, and can be scripted to fail specific calls. Tests drive
/// backend-side progress with [`InMemoryOrderService::set_status`] and friends, which a polling tracker then
/// observes exactly like it would observe a remote server.
#[derive(Clone, Default)]
pub struct InMemoryOrderService {
    state: Arc<Mutex<ServiceState>>,
}

impl InMemoryOrderService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the `call`-th `create_order` (1-based) with a 500 carrying `message`.
    pub fn fail_create_at(&self, call: usize, message: &str) {
        self.state.lock().unwrap().fail_create_at = Some((call, message.to_string()));
    }

    /// Fails the next `create_gateway_transaction` with a 500 carrying `message`.
    pub fn fail_next_transaction(&self, message: &str) {
        self.state.lock().unwrap().fail_transaction = Some(message.to_string());
    }

    /// Makes `cancel_order` fail for the given id.
    pub fn fail_cancel_for(&self, order_id: &OrderId) {
        self.state.lock().unwrap().fail_cancel_ids.insert(order_id.as_str().to_string());
    }

    /// Fails the next `n` fetches with a network error, then recovers.
    pub fn fail_next_fetches(&self, n: usize) {
        self.state.lock().unwrap().fail_next_fetches = n;
    }

    pub fn create_calls(&self) -> usize {
        self.state.lock().unwrap().create_requests.len()
    }

    pub fn transaction_calls(&self) -> usize {
        self.state.lock().unwrap().transaction_requests.len()
    }

    pub fn fetch_calls(&self) -> usize {
        self.state.lock().unwrap().fetch_count
    }

    pub fn create_requests(&self) -> Vec<NewOrderRequest> {
        self.state.lock().unwrap().create_requests.clone()
    }

    pub fn transaction_requests(&self) -> Vec<NewTransactionRequest> {
        self.state.lock().unwrap().transaction_requests.clone()
    }

    pub fn cancel_requests(&self) -> Vec<(OrderId, String)> {
        self.state.lock().unwrap().cancel_requests.clone()
    }

    pub fn order(&self, order_id: &OrderId) -> Option<Order> {
        self.state.lock().unwrap().orders.get(order_id.as_str()).cloned()
    }

    pub fn insert_order(&self, order: Order) {
        self.state.lock().unwrap().orders.insert(order.order_id.as_str().to_string(), order);
    }

    /// Scripts backend-side fulfilment progress. No transition checks: tests use this to simulate both correct
    /// and misbehaving servers.
    pub fn set_status(&self, order_id: &OrderId, status: OrderStatus) {
        let mut state = self.state.lock().unwrap();
        if let Some(order) = state.orders.get_mut(order_id.as_str()) {
            order.status = status;
            order.updated_at = Utc::now();
            order.history.push(StatusEntry { status, timestamp: order.updated_at, notes: None });
        }
    }

    pub fn set_payment_status(&self, order_id: &OrderId, status: PaymentStatus) {
        let mut state = self.state.lock().unwrap();
        if let Some(order) = state.orders.get_mut(order_id.as_str()) {
            order.payment_status = status;
            if status == PaymentStatus::Paid {
                order.payment_details.paid_at = Some(Utc::now());
            }
            order.updated_at = Utc::now();
        }
    }

    fn next_order_id(state: &mut ServiceState) -> OrderId {
        state.next_id += 1;
        OrderId(format!("order-{}", 1000 + state.next_id))
    }

    fn order_from_request(order_id: OrderId, request: &NewOrderRequest, session: Option<&SessionToken>) -> Order {
        let now = Utc::now();
        let mut payment_details = PaymentDetails::for_method(request.payment_method);
        payment_details.session_token = session.cloned();
        Order {
            order_id,
            vendor_id: request.vendor_id.clone(),
            vendor_name: request.vendor_name.clone(),
            line_items: request.line_items.clone(),
            subtotal: request.subtotal,
            delivery_fee: request.delivery_fee,
            service_fee: request.service_fee,
            discount: Rupiah::default(),
            total_amount: request.total_amount,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            delivery_method: request.delivery_method,
            delivery_info: request.delivery_info.clone(),
            payment_details,
            history: vec![StatusEntry { status: OrderStatus::Pending, timestamp: now, notes: None }],
            created_at: now,
            updated_at: now,
        }
    }
}

#[async_trait]
impl OrderService for InMemoryOrderService {
    async fn create_order(&self, request: NewOrderRequest) -> Result<Order, OrderServiceError> {
        let mut state = self.state.lock().unwrap();
        state.create_requests.push(request.clone());
        let call = state.create_requests.len();
        if let Some((at, message)) = &state.fail_create_at {
            if call == *at {
                return Err(OrderServiceError::Remote { status: 500, message: message.clone() });
            }
        }
        let order_id = Self::next_order_id(&mut state);
        let order = Self::order_from_request(order_id.clone(), &request, None);
        state.orders.insert(order_id.as_str().to_string(), order.clone());
        Ok(order)
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Order, OrderServiceError> {
        let mut state = self.state.lock().unwrap();
        state.fetch_count += 1;
        if state.fail_next_fetches > 0 {
            state.fail_next_fetches -= 1;
            return Err(OrderServiceError::Network("connection reset by peer".to_string()));
        }
        state.orders.get(order_id.as_str()).cloned().ok_or_else(|| OrderServiceError::NotFound(order_id.clone()))
    }

    async fn create_gateway_transaction(
        &self,
        request: NewTransactionRequest,
    ) -> Result<GatewaySession, OrderServiceError> {
        let mut state = self.state.lock().unwrap();
        state.transaction_requests.push(request.clone());
        if let Some(message) = state.fail_transaction.take() {
            return Err(OrderServiceError::Remote { status: 500, message });
        }
        let session_token = SessionToken(format!("sess-{:08x}", rand::random::<u32>()));
        let mut order_ids = Vec::with_capacity(request.orders.len());
        for order_request in &request.orders {
            let order_id = Self::next_order_id(&mut state);
            let order = Self::order_from_request(order_id.clone(), order_request, Some(&session_token));
            state.orders.insert(order_id.as_str().to_string(), order);
            order_ids.push(order_id);
        }
        Ok(GatewaySession {
            session_token: session_token.clone(),
            order_ids,
            redirect_url: Some(format!("https://pay.example.test/session/{}", session_token.as_str())),
        })
    }

    async fn cancel_order(&self, order_id: &OrderId, reason: &str) -> Result<Order, OrderServiceError> {
        let mut state = self.state.lock().unwrap();
        state.cancel_requests.push((order_id.clone(), reason.to_string()));
        if state.fail_cancel_ids.contains(order_id.as_str()) {
            return Err(OrderServiceError::Remote { status: 502, message: "cancellation rejected".to_string() });
        }
        let order = match state.orders.get_mut(order_id.as_str()) {
            Some(order) => order,
            None => return Err(OrderServiceError::NotFound(order_id.clone())),
        };
        order.status = OrderStatus::Cancelled;
        order.updated_at = Utc::now();
        order
            .history
            .push(StatusEntry { status: OrderStatus::Cancelled, timestamp: order.updated_at, notes: Some(reason.to_string()) });
        Ok(order.clone())
    }
}

//--------------------------------------   ScriptedWidget    ---------------------------------------------------------

/// A [`PaymentWidget`] that plays back a queue of outcomes and records every token it was opened with.
#[derive(Clone, Default)]
pub struct ScriptedWidget {
    script: Arc<Mutex<VecDeque<Result<PaymentOutcome, WidgetError>>>>,
    tokens: Arc<Mutex<Vec<SessionToken>>>,
    delay: Duration,
}

impl ScriptedWidget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every session take `delay` to resolve, to give tests a window for concurrent opens.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn push(self, outcome: Result<PaymentOutcome, WidgetError>) -> Self {
        self.script.lock().unwrap().push_back(outcome);
        self
    }

    pub fn push_success(self) -> Self {
        self.push(Ok(PaymentOutcome::Success(GatewayReceipt {
            transaction_id: Some("trx-0001".to_string()),
            payment_type: Some("qris".to_string()),
            virtual_account_number: None,
            bank: None,
        })))
    }

    pub fn push_pending(self) -> Self {
        self.push(Ok(PaymentOutcome::Pending(GatewayReceipt {
            transaction_id: Some("trx-0002".to_string()),
            payment_type: Some("bank_transfer".to_string()),
            virtual_account_number: Some("8808123456789012".to_string()),
            bank: Some("bca".to_string()),
        })))
    }

    pub fn push_failed(self, message: &str) -> Self {
        self.push(Ok(PaymentOutcome::Failed { message: message.to_string(), receipt: None }))
    }

    pub fn push_cancelled(self) -> Self {
        self.push(Ok(PaymentOutcome::Cancelled))
    }

    pub fn push_sdk_error(self, message: &str) -> Self {
        self.push(Err(WidgetError::Sdk(message.to_string())))
    }

    /// Every token the widget has been opened with, in order.
    pub fn tokens(&self) -> Vec<SessionToken> {
        self.tokens.lock().unwrap().clone()
    }

    pub fn sessions(&self) -> usize {
        self.tokens.lock().unwrap().len()
    }
}

#[async_trait]
impl PaymentWidget for ScriptedWidget {
    async fn open(&self, token: &SessionToken) -> Result<PaymentOutcome, WidgetError> {
        self.tokens.lock().unwrap().push(token.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.script.lock().unwrap().pop_front().expect("the widget script ran dry")
    }
}

//--------------------------------------    Sample orders    ---------------------------------------------------------

/// A fully populated, totals-consistent order for unit tests.
pub fn sample_order(order_id: &str, vendor_id: &str, method: PaymentMethod) -> Order {
    let now = Utc::now();
    let subtotal = Rupiah::new(24_000);
    let delivery_fee = Rupiah::new(5_000);
    let service_fee = Rupiah::new(240);
    Order {
        order_id: OrderId::from(order_id.to_string()),
        vendor_id: vendor_id.to_string(),
        vendor_name: "Kopi Aroma".to_string(),
        line_items: vec![OrderLineItem {
            menu_item_id: "item-kopi-susu".to_string(),
            name: "Es Kopi Susu".to_string(),
            price: Rupiah::new(12_000),
            quantity: 2,
            notes: None,
        }],
        subtotal,
        delivery_fee,
        service_fee,
        discount: Rupiah::default(),
        total_amount: subtotal + delivery_fee + service_fee,
        status: OrderStatus::Pending,
        payment_status: PaymentStatus::Pending,
        delivery_method: DeliveryMethod::Delivery,
        delivery_info: DeliveryInfo {
            name: "Budi".to_string(),
            phone: "081234567890".to_string(),
            address: Some("Jl. Braga No. 10, Bandung".to_string()),
            notes: None,
        },
        payment_details: PaymentDetails::for_method(method),
        history: vec![StatusEntry { status: OrderStatus::Pending, timestamp: now, notes: None }],
        created_at: now,
        updated_at: now,
    }
}
