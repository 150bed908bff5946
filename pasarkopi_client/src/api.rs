use std::sync::Arc;

use async_trait::async_trait;
use log::*;
use pasarkopi_engine::{
    order_types::{Order, OrderId},
    traits::{AuthProvider, GatewaySession, NewOrderRequest, NewTransactionRequest, OrderService, OrderServiceError},
};
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::StorefrontConfig,
    data_objects::{server_error_message, CancelOrderBody, OrderEnvelope},
    StorefrontApiError,
};

/// The order service over HTTP.
///
/// One instance per signed-in session. The credential is read from the [`AuthProvider`] on every request, so a
/// sign-out between calls takes effect immediately rather than at the next client rebuild.
pub struct StorefrontApi<A> {
    config: StorefrontConfig,
    client: Arc<Client>,
    auth: A,
}

impl<A: Clone> Clone for StorefrontApi<A> {
    fn clone(&self) -> Self {
        Self { config: self.config.clone(), client: Arc::clone(&self.client), auth: self.auth.clone() }
    }
}

impl<A: AuthProvider> StorefrontApi<A> {
    pub fn new(config: StorefrontConfig, auth: A) -> Result<Self, StorefrontApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| StorefrontApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client), auth })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<T, StorefrontApiError> {
        let token = self.auth.bearer_token().ok_or(StorefrontApiError::NotAuthenticated)?;
        let url = self.url(path);
        trace!("🌐️ Sending REST query: {url}");
        let mut req = self.client.request(method, url).bearer_auth(token.reveal());
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| StorefrontApiError::Transport(e.to_string()))?;
        if response.status().is_success() {
            trace!("🌐️ REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| StorefrontApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.map_err(|e| StorefrontApiError::Transport(e.to_string()))?;
            let message = server_error_message(&body).unwrap_or_else(|| {
                if body.trim().is_empty() {
                    format!("The order service returned an unexpected error ({status})")
                } else {
                    body
                }
            });
            Err(StorefrontApiError::QueryError { status, message })
        }
    }

    pub async fn post_order(&self, request: &NewOrderRequest) -> Result<Order, StorefrontApiError> {
        debug!("🌐️ Creating an order for {}", request.vendor_name);
        let result = self.rest_query::<OrderEnvelope, _>(Method::POST, "/api/orders", Some(request)).await?;
        info!("🌐️ Created order {} for {}", result.order.order_id, result.order.vendor_name);
        Ok(result.order)
    }

    pub async fn get_order(&self, order_id: &OrderId) -> Result<Order, StorefrontApiError> {
        let path = format!("/api/orders/{}", order_id.as_str());
        debug!("🌐️ Fetching order {order_id}");
        let result = self.rest_query::<OrderEnvelope, ()>(Method::GET, &path, None).await?;
        Ok(result.order)
    }

    pub async fn post_transaction(&self, request: &NewTransactionRequest) -> Result<GatewaySession, StorefrontApiError> {
        debug!("🌐️ Creating a gateway transaction for {} vendor group(s)", request.orders.len());
        let session =
            self.rest_query::<GatewaySession, _>(Method::POST, "/api/payment/create-transaction", Some(request)).await?;
        info!("🌐️ Gateway session {} created with {} order(s)", session.session_token, session.order_ids.len());
        Ok(session)
    }

    pub async fn post_cancel_order(&self, order_id: &OrderId, reason: &str) -> Result<Order, StorefrontApiError> {
        let path = format!("/api/orders/{}/cancel", order_id.as_str());
        debug!("🌐️ Cancelling order {order_id}");
        let result =
            self.rest_query::<OrderEnvelope, _>(Method::POST, &path, Some(CancelOrderBody { reason })).await?;
        info!("🌐️ Cancelled order {order_id}");
        Ok(result.order)
    }
}

#[async_trait]
impl<A> OrderService for StorefrontApi<A>
where A: AuthProvider + Send + Sync
{
    async fn create_order(&self, request: NewOrderRequest) -> Result<Order, OrderServiceError> {
        Ok(self.post_order(&request).await?)
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Order, OrderServiceError> {
        self.get_order(order_id).await.map_err(|e| match e {
            // A 404 on a fetch is the distinct "no such order" condition, not a generic server error.
            StorefrontApiError::QueryError { status: 404, .. } => OrderServiceError::NotFound(order_id.clone()),
            e => e.into(),
        })
    }

    async fn create_gateway_transaction(
        &self,
        request: NewTransactionRequest,
    ) -> Result<GatewaySession, OrderServiceError> {
        Ok(self.post_transaction(&request).await?)
    }

    async fn cancel_order(&self, order_id: &OrderId, reason: &str) -> Result<Order, OrderServiceError> {
        self.post_cancel_order(order_id, reason).await.map_err(|e| match e {
            StorefrontApiError::QueryError { status: 404, .. } => OrderServiceError::NotFound(order_id.clone()),
            e => e.into(),
        })
    }
}

#[cfg(test)]
mod test {
    use pasar_common::Secret;

    use super::*;

    #[derive(Clone)]
    struct FixedAuth(Option<String>);

    impl AuthProvider for FixedAuth {
        fn bearer_token(&self) -> Option<Secret<String>> {
            self.0.clone().map(Secret::new)
        }
    }

    fn api(auth: FixedAuth) -> StorefrontApi<FixedAuth> {
        let config = StorefrontConfig::default().with_base_url("https://api.pasarkopi.example/");
        StorefrontApi::new(config, auth).unwrap()
    }

    #[test]
    fn urls_join_the_base_without_double_slashes() {
        let api = api(FixedAuth(Some("jwt-abc".into())));
        assert_eq!(api.url("/api/orders"), "https://api.pasarkopi.example/api/orders");
        assert_eq!(api.url("/api/orders/order-1001/cancel"), "https://api.pasarkopi.example/api/orders/order-1001/cancel");
    }

    #[tokio::test]
    async fn requests_without_a_credential_fail_before_the_network() {
        let api = api(FixedAuth(None));
        let err = api.get_order(&OrderId::from("order-1001".to_string())).await.unwrap_err();
        assert!(matches!(err, StorefrontApiError::NotAuthenticated));

        let err = OrderService::fetch_order(&api, &OrderId::from("order-1001".to_string())).await.unwrap_err();
        assert!(matches!(err, OrderServiceError::NotAuthenticated));
    }
}
