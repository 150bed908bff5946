use std::time::Duration;

use anyhow::{bail, Result};
use pasarkopi_engine::{order_types::OrderId, PaymentOutcome, TrackingState};

use crate::{app::App, format::format_order, CancelParams, TrackParams};

pub async fn status(app: &App, order_id: &str) -> Result<()> {
    let order = app.tracker().fetch(&OrderId::from(order_id.to_string())).await?;
    print!("{}", format_order(&order)?);
    Ok(())
}

pub async fn track(app: &App, params: TrackParams) -> Result<()> {
    let interval = Duration::from_secs(params.interval.max(1));
    let tracker = app.tracker().with_poll_interval(interval);
    let mut handle = tracker.start(OrderId::from(params.order_id));
    println!("Tracking order {} (checking every {:?}, Ctrl-C to stop)\n", handle.order_id(), interval);
    while let Some(state) = handle.changed().await {
        match state {
            TrackingState::Loading => {},
            TrackingState::Live(order) => {
                print!("{}", format_order(&order)?);
                if order.status.is_terminal() {
                    println!("Order {} is {}; nothing further will change.", order.order_id, order.status);
                    break;
                }
                println!();
            },
            TrackingState::NotFound => {
                println!("Order {} was not found.", handle.order_id());
                break;
            },
            TrackingState::Failed(message) => println!("Could not fetch the order yet: {message}"),
        }
    }
    Ok(())
}

pub async fn retry_payment(app: &App, order_id: &str) -> Result<()> {
    let tracker = app.tracker();
    let order = tracker.fetch(&OrderId::from(order_id.to_string())).await?;
    if !order.is_gateway_retryable() {
        bail!(
            "Order {} has no retryable payment (payment is {} via {})",
            order.order_id,
            order.payment_status,
            order.payment_details.method
        );
    }
    let (outcome, refreshed) = tracker.retry_payment(&order, &app.widget()).await?;
    match outcome {
        PaymentOutcome::Success(_) => println!("Payment confirmed."),
        PaymentOutcome::Pending(_) => println!("Payment is pending; track the order to see it settle."),
        PaymentOutcome::Failed { message, .. } => println!("Payment failed: {message}"),
        PaymentOutcome::Cancelled => println!("Payment window dismissed; the session stays resumable."),
    }
    print!("{}", format_order(&refreshed)?);
    Ok(())
}

pub async fn cancel(app: &App, params: CancelParams) -> Result<()> {
    let order = app.tracker().cancel_order(&OrderId::from(params.order_id), &params.reason).await?;
    println!("Order {} is now {}.", order.order_id, order.status);
    Ok(())
}
