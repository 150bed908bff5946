use std::fmt::Write;

use anyhow::Result;
use pasarkopi_engine::{order_types::Order, CartLine, VendorGroup};
use prettytable::{
    format::{LinePosition, LineSeparator, TableFormat},
    row,
    Table,
};

fn markdown_format() -> TableFormat {
    prettytable::format::FormatBuilder::new()
        .column_separator('|')
        .borders('|')
        .separator(LinePosition::Title, LineSeparator::new('-', '|', '|', '|'))
        .padding(1, 1)
        .build()
}

fn markdown_style(table: &mut Table) {
    table.set_format(markdown_format());
}

pub fn format_cart_lines(lines: &[CartLine]) -> String {
    if lines.is_empty() {
        return "The cart is empty".to_string();
    }
    let mut table = Table::new();
    table.set_titles(row!["Line", "Item", "Warkop", "Qty", "Unit price", "Total", "Notes"]);
    for line in lines {
        table.add_row(row![
            line.id,
            line.item.name,
            line.vendor_name,
            line.quantity,
            line.item.price.to_string(),
            line.line_total().to_string(),
            line.notes.as_deref().unwrap_or_default()
        ]);
    }
    markdown_style(&mut table);
    table.to_string()
}

pub fn format_vendor_groups(groups: &[VendorGroup]) -> Result<String> {
    let mut f = String::new();
    for group in groups {
        writeln!(f, "{name} ({count} line(s))", name = group.vendor_name, count = group.lines.len())?;
        writeln!(f, "  Subtotal:     {}", group.subtotal)?;
        writeln!(f, "  Delivery fee: {}", group.delivery_fee)?;
        writeln!(f, "  Service fee:  {}", group.service_fee)?;
        writeln!(f, "  Total:        {}", group.total)?;
    }
    Ok(f)
}

pub fn format_order(order: &Order) -> Result<String> {
    let mut f = String::new();
    writeln!(f, "Order {id} from {vendor}   Created {created}", id = order.order_id, vendor = order.vendor_name, created = order.created_at)?;
    writeln!(
        f,
        "[{status:^12}] payment: {payment:8} ({method})   Updated {updated}",
        status = order.status.to_string(),
        payment = order.payment_status.to_string(),
        method = order.payment_details.method,
        updated = order.updated_at
    )?;
    writeln!(f, "-----------------------------------------------------------------------------")?;
    for item in &order.line_items {
        writeln!(
            f,
            "{qty:>3} × {name:30} {total:>12}",
            qty = item.quantity,
            name = item.name,
            total = item.line_total().to_string()
        )?;
        if let Some(notes) = &item.notes {
            writeln!(f, "      ({notes})")?;
        }
    }
    writeln!(f, "-----------------------------------------------------------------------------")?;
    writeln!(f, "Subtotal:     {:>12}", order.subtotal.to_string())?;
    writeln!(f, "Delivery fee: {:>12}", order.delivery_fee.to_string())?;
    writeln!(f, "Service fee:  {:>12}", order.service_fee.to_string())?;
    if !order.discount.is_zero() {
        writeln!(f, "Discount:     {:>12}", order.discount.to_string())?;
    }
    writeln!(f, "Total:        {:>12}", order.total_amount.to_string())?;
    if let Some(token) = &order.payment_details.session_token {
        writeln!(f, "Payment session: {token}")?;
    }
    Ok(f)
}

pub fn format_orders(orders: &[Order]) -> String {
    let mut table = Table::new();
    table.set_titles(row!["Order id", "Warkop", "Total", "Status", "Payment", "Updated At"]);
    for order in orders {
        table.add_row(row![
            order.order_id,
            order.vendor_name,
            order.total_amount.to_string(),
            order.status.to_string(),
            order.payment_status.to_string(),
            order.updated_at.to_string()
        ]);
    }
    markdown_style(&mut table);
    table.to_string()
}
