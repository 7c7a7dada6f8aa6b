//! Receipt text layout.
//!
//! Everything here is pure: a sale goes in, fixed-width text lines come out,
//! already split into pages. The PDF writer only positions them.
//!
//! ```text
//!         TALLY MARKET
//!      12 Harbour Street
//! ----------------------------------------
//! Receipt: 20260118-3F2A9C01
//! Sale id:
//! 3f2a9c01-5b7e-4d1a-9c3e-0a1b2c3d4e5f
//! Operator: op-7
//! Date: 2026-01-18 14:02:11 UTC
//! ----------------------------------------
//! #1 Ground coffee 250g
//!    COFFEE-250  1.5 un x 18.90
//!    disc 0.00  tax 0.00            28.35
//! ----------------------------------------
//! PAYMENTS
//! cash                              30.00
//! ----------------------------------------
//! Gross                             28.35
//! ...
//! Change                             1.65
//! ```

use chrono::SecondsFormat;
use tally_core::{Money, SaleAggregate};

/// Characters per line.
pub const WIDTH: usize = 40;

/// Smallest page that still fits a footer and some content.
pub const MIN_LINES_PER_PAGE: usize = 10;

/// Static decoration printed above every receipt.
#[derive(Debug, Clone, Copy)]
pub struct Header<'a> {
    pub store_name: &'a str,
    pub address_lines: &'a [String],
    pub currency_symbol: &'a str,
}

fn truncate(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

fn center(text: &str) -> String {
    let text = truncate(text, WIDTH);
    let pad = (WIDTH - text.chars().count()) / 2;
    format!("{}{}", " ".repeat(pad), text)
}

/// `left` and `right` on one line, `right` flush with the margin.
fn columns(left: &str, right: &str) -> String {
    let right_len = right.chars().count();
    let room = WIDTH.saturating_sub(right_len + 1);
    let left = truncate(left, room);
    let gap = WIDTH.saturating_sub(left.chars().count() + right_len).max(1);
    format!("{}{}{}", left, " ".repeat(gap), right)
}

fn rule() -> String {
    "-".repeat(WIDTH)
}

/// Lays out the full receipt body, unpaginated.
pub fn receipt_lines(sale: &SaleAggregate, header: Header<'_>) -> Vec<String> {
    let s = sale.sale();
    let amount = |m: Money| format!("{}{}", header.currency_symbol, m);
    let mut lines = Vec::new();

    // Header
    if !header.store_name.trim().is_empty() {
        lines.push(center(header.store_name));
    }
    for line in header.address_lines {
        lines.push(center(line));
    }
    lines.push(rule());
    lines.push(truncate(&format!("Receipt: {}", s.receipt_number), WIDTH));
    lines.push("Sale id:".to_string());
    lines.push(truncate(&s.id, WIDTH));
    lines.push(truncate(&format!("Operator: {}", s.operator_id), WIDTH));

    let timestamp = s.closed_at.unwrap_or(s.opened_at);
    lines.push(format!(
        "Date: {} UTC",
        timestamp.format("%Y-%m-%d %H:%M:%S")
    ));

    if let Some(name) = &s.customer_name {
        lines.push(truncate(&format!("Customer: {name}"), WIDTH));
    }
    if let Some(tax_id) = &s.customer_tax_id {
        lines.push(truncate(&format!("Tax id: {tax_id}"), WIDTH));
    }

    // Items
    lines.push(rule());
    for item in sale.items() {
        lines.push(truncate(
            &format!("#{} {}", item.sequence, item.product_name),
            WIDTH,
        ));
        lines.push(truncate(
            &format!(
                "   {}  {} {} x {}",
                item.sku, item.quantity, item.unit_label, item.unit_price
            ),
            WIDTH,
        ));
        lines.push(columns(
            &format!("   disc {}  tax {}", item.discount_value, item.tax_value),
            &item.net_total.to_string(),
        ));
    }

    // Payments
    lines.push(rule());
    lines.push("PAYMENTS".to_string());
    for payment in sale.payments() {
        lines.push(columns(payment.method.as_str(), &payment.amount.to_string()));
        if let Some(reference) = &payment.transaction_reference {
            lines.push(truncate(&format!("   ref {reference}"), WIDTH));
        }
    }

    // Summary
    lines.push(rule());
    lines.push(columns("Gross", &amount(s.total_gross)));
    lines.push(columns("Discount", &amount(s.total_discount)));
    lines.push(columns("Tax", &amount(s.total_tax)));
    lines.push(columns("TOTAL", &amount(s.total_net)));
    lines.push(columns("Paid", &amount(s.total_paid)));
    lines.push(columns("Change", &amount(s.change_due)));
    lines.push(rule());
    lines.push(center(&format!(
        "Closed {}",
        timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
    )));

    lines
}

/// Splits `lines` into pages of `lines_per_page`, the last line of each page
/// being a `page n/m` footer.
pub fn paginate(lines: Vec<String>, lines_per_page: usize) -> Vec<Vec<String>> {
    let body_per_page = lines_per_page.max(MIN_LINES_PER_PAGE) - 1;
    let chunks: Vec<Vec<String>> = lines
        .chunks(body_per_page)
        .map(<[String]>::to_vec)
        .collect();
    let total = chunks.len().max(1);

    if chunks.is_empty() {
        return vec![vec![center("page 1/1")]];
    }

    chunks
        .into_iter()
        .enumerate()
        .map(|(index, mut page)| {
            page.push(center(&format!("page {}/{}", index + 1, total)));
            page
        })
        .collect()
}
