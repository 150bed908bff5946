use async_trait::async_trait;
use log::warn;
use pasarkopi_engine::{
    order_types::SessionToken,
    GatewayReceipt,
    PaymentOutcome,
    PaymentWidget,
    WidgetError,
};

pub const DEFAULT_PAY_PAGE: &str = "https://pay.pasarkopi.example/session";

/// The CLI rendition of the hosted payment widget.
///
/// A terminal cannot embed the gateway's overlay, so this widget prints the hosted payment page URL for the
/// session and reports the payment as pending. Settlement then arrives through tracking, exactly as it would for
/// a bank transfer picked inside the real widget.
pub struct RedirectWidget {
    pay_page: String,
}

impl RedirectWidget {
    pub fn new_from_env_or_default() -> Self {
        let pay_page = std::env::var("PASAR_PAY_PAGE").unwrap_or_else(|_| {
            warn!("🪛️ PASAR_PAY_PAGE not set, using {DEFAULT_PAY_PAGE} as default");
            DEFAULT_PAY_PAGE.to_string()
        });
        Self { pay_page: pay_page.trim_end_matches('/').to_string() }
    }
}

#[async_trait]
impl PaymentWidget for RedirectWidget {
    async fn open(&self, token: &SessionToken) -> Result<PaymentOutcome, WidgetError> {
        println!("Complete the payment in your browser:");
        println!("  {}/{}", self.pay_page, token.as_str());
        Ok(PaymentOutcome::Pending(GatewayReceipt::default()))
    }
}
