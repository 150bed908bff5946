use anyhow::Result;
use pasarkopi_engine::{
    order_types::{DeliveryInfo, DeliveryMethod, PaymentMethod},
    CheckoutError,
    CheckoutOutcome,
    CheckoutRequest,
    PaymentOutcome,
};

use crate::{app::App, format::format_orders, CheckoutParams};

pub async fn run_checkout(app: &App, params: CheckoutParams) -> Result<()> {
    let request = CheckoutRequest {
        delivery_info: DeliveryInfo {
            name: params.name,
            phone: params.phone,
            address: params.address,
            notes: params.notes,
        },
        delivery_method: params.method.parse::<DeliveryMethod>()?,
        payment_method: params.payment.parse::<PaymentMethod>()?,
    };
    let orchestrator = app.orchestrator();
    let mut cart = app.cart();
    let receipt = match orchestrator.checkout(&app.creds(), &mut cart, request).await {
        Ok(receipt) => receipt,
        Err(CheckoutError::PartialFailure { vendor, source, compensated, uncompensated }) => {
            println!("Could not create the order for {vendor}: {source}");
            if !compensated.is_empty() {
                let ids = compensated.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
                println!("The sibling orders created before the failure were cancelled again: {ids}");
            }
            if !uncompensated.is_empty() {
                let ids = uncompensated.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
                println!("These orders could not be cancelled and may still appear in your history: {ids}");
            }
            println!("Your cart is unchanged; fix the problem and check out again.");
            return Ok(());
        },
        Err(e) => return Err(e.into()),
    };

    match &receipt.outcome {
        CheckoutOutcome::CashPlaced { orders } => {
            println!("Placed {} order(s), payable on handover:\n", orders.len());
            println!("{}", format_orders(orders));
        },
        CheckoutOutcome::Gateway { session_token, order_ids, payment, .. } => {
            println!("Created {} order(s) under payment session {session_token}", order_ids.len());
            match payment {
                PaymentOutcome::Success(_) => println!("Payment confirmed."),
                PaymentOutcome::Pending(_) => {
                    println!("Payment is pending. Track the order to see it settle;");
                    println!("an unfinished session can be re-opened with `kopitools retry`.");
                },
                PaymentOutcome::Failed { message, .. } => println!("Payment failed: {message}"),
                PaymentOutcome::Cancelled => println!("Payment window dismissed; the session stays resumable."),
            }
        },
    }
    if receipt.cart_cleared {
        println!("The cart has been cleared.");
    }
    if let Some(order_id) = &receipt.tracking_order_id {
        println!("Follow progress with: kopitools track {}", order_id.as_str());
    }
    Ok(())
}
