use anyhow::Result;
use pasar_common::Rupiah;
use pasarkopi_engine::{cart::LineId, order_types::DeliveryMethod, FeePolicy, NewLine};

use crate::{
    app::App,
    format::{format_cart_lines, format_vendor_groups},
    AddParams,
    CartCommand,
    ShowParams,
};

pub fn handle(app: &App, cmd: CartCommand) -> Result<()> {
    let mut cart = app.cart();
    match cmd {
        CartCommand::Add(AddParams { item_id, name, price, vendor_id, vendor_name, quantity, notes }) => {
            let line = NewLine::new(item_id, name, Rupiah::new(price), vendor_id, vendor_name);
            let id = cart.add(line, quantity, notes);
            if let Some(line) = cart.find_line(&id) {
                println!("{} × {} in the cart as line {id}", line.quantity, line.item.name);
            }
        },
        CartCommand::Show(ShowParams { method }) => {
            let method = method.parse::<DeliveryMethod>()?;
            println!("{}", format_cart_lines(cart.lines()));
            if !cart.is_empty() {
                println!("{} item(s), {} in total\n", cart.total_items(), cart.total_price());
                let groups = cart.group_by_vendor(&FeePolicy::default(), method);
                print!("Per-warkop totals for {method}:\n{}", format_vendor_groups(&groups)?);
            }
        },
        CartCommand::Qty { line_id, quantity } => {
            let id = LineId::from(line_id);
            if cart.set_quantity(&id, quantity) {
                match cart.find_line(&id) {
                    Some(line) => println!("Line {id} is now {} × {}", line.quantity, line.item.name),
                    None => println!("Removed line {id}"),
                }
            } else {
                println!("No line {id} in the cart");
            }
        },
        CartCommand::Note { line_id, note } => {
            let id = LineId::from(line_id);
            if cart.set_notes(&id, note) {
                println!("Updated the notes on line {id}");
            } else {
                println!("No line {id} in the cart");
            }
        },
        CartCommand::Remove { line_id } => {
            let id = LineId::from(line_id);
            if cart.remove(&id) {
                println!("Removed line {id}");
            } else {
                println!("No line {id} in the cart");
            }
        },
        CartCommand::Clear => {
            cart.clear();
            println!("The cart is empty");
        },
    }
    Ok(())
}
