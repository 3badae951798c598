//! Receipt composition: itemized totals, bonus points and the rendered
//! order document.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::checkout::stores::BasketLine;

/// One priced basket line as it appears on the receipt and on the persisted
/// order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReceiptLine {
    pub product_id: i32,
    pub name: String,
    pub quantity: i32,
    pub price: f64,
    pub total: f64,
    pub bonus: i64,
}

#[derive(Debug, Clone, Default)]
pub struct Itemization {
    pub lines: Vec<ReceiptLine>,
    pub subtotal: f64,
    pub bonus_total: i64,
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Prices every basket line at the buyer's tier. The bonus rate is rounded
/// per unit before multiplying by quantity, not on the line total.
pub fn itemize(items: &[BasketLine], is_deluxe: bool) -> Itemization {
    let mut itemization = Itemization::default();
    for item in items {
        let unit_price = if is_deluxe {
            item.deluxe_price
        } else {
            item.price
        };
        let total = unit_price * f64::from(item.quantity);
        let bonus = (unit_price / 10.0).round() as i64 * i64::from(item.quantity);

        itemization.subtotal += total;
        itemization.bonus_total += bonus;
        itemization.lines.push(ReceiptLine {
            product_id: item.product_id,
            name: item.name.clone(),
            quantity: item.quantity,
            price: unit_price,
            total,
            bonus,
        });
    }
    itemization
}

/// Redacts an email for display and persistence: vowels become `*`.
pub fn redact_email(email: &str) -> String {
    email
        .chars()
        .map(|c| if "aeiouAEIOU".contains(c) { '*' } else { c })
        .collect()
}

/// Strips CR/LF so attacker-controlled ids cannot forge document lines.
pub fn strip_crlf(value: &str) -> String {
    value.replace(['\r', '\n'], "")
}

pub struct ReceiptContext<'a> {
    pub app_name: &'a str,
    pub order_id: &'a str,
    pub email: &'a str,
    pub date: NaiveDate,
    pub itemization: &'a Itemization,
    pub discount_percent: u8,
    pub discount_amount: f64,
    pub delivery_price: f64,
    pub total_price: f64,
}

/// Renders the durable order document written to the document store.
pub fn render_document(ctx: &ReceiptContext) -> String {
    let mut doc = String::new();

    doc.push_str(&format!("{}\n", ctx.app_name));
    doc.push_str("==========\n\n");
    doc.push_str("Order Confirmation\n\n");
    doc.push_str(&format!("Customer: {}\n", ctx.email));
    doc.push_str(&format!("Order #: {}\n", ctx.order_id));
    doc.push_str(&format!("Date: {}\n\n", ctx.date));

    for line in &ctx.itemization.lines {
        doc.push_str(&format!(
            "{}x {} ea. {} = {}¤\n",
            line.quantity, line.name, line.price, line.total
        ));
    }
    if ctx.discount_percent > 0 {
        doc.push_str(&format!(
            "{}% discount from coupon: -{:.2}¤\n",
            ctx.discount_percent, ctx.discount_amount
        ));
    }
    doc.push_str(&format!("Delivery Price: {:.2}¤\n", ctx.delivery_price));
    doc.push_str(&format!("Total Price: {:.2}¤\n", ctx.total_price));
    doc.push_str(&format!(
        "Bonus Points Earned: {}\n",
        ctx.itemization.bonus_total
    ));
    doc.push_str(
        "(The bonus points from this order will be added 1:1 to your wallet ¤-fund \
         for future purchases!)\n\n",
    );
    doc.push_str("Thank you for your order!\n");

    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(price: f64, deluxe_price: f64, quantity: i32) -> BasketLine {
        BasketLine {
            product_id: 1,
            name: "Apple Juice".into(),
            quantity,
            price,
            deluxe_price,
        }
    }

    #[test]
    fn subtotal_is_exact_sum_of_quantity_times_unit_price() {
        let itemization = itemize(&[line(10.0, 8.0, 2), line(2.5, 2.0, 4)], false);
        assert_eq!(itemization.subtotal, 10.0 * 2.0 + 2.5 * 4.0);
        assert_eq!(itemization.lines.len(), 2);
        assert_eq!(itemization.lines[0].total, 20.0);
    }

    #[test]
    fn deluxe_membership_prices_lines_at_the_deluxe_rate() {
        let itemization = itemize(&[line(10.0, 8.0, 2)], true);
        assert_eq!(itemization.subtotal, 16.0);
        assert_eq!(itemization.lines[0].price, 8.0);
    }

    #[test]
    fn bonus_rate_rounds_per_unit_before_multiplying() {
        // 14/10 rounds to 1 per unit, not round(14 * 3 / 10) = 4.
        let itemization = itemize(&[line(14.0, 14.0, 3)], false);
        assert_eq!(itemization.bonus_total, 3);

        // 15/10 rounds half away from zero to 2 per unit.
        let itemization = itemize(&[line(15.0, 15.0, 2)], false);
        assert_eq!(itemization.bonus_total, 4);

        let itemization = itemize(&[line(10.0, 10.0, 2)], false);
        assert_eq!(itemization.bonus_total, 2);
    }

    #[test]
    fn empty_basket_itemizes_to_zero() {
        let itemization = itemize(&[], false);
        assert_eq!(itemization.subtotal, 0.0);
        assert_eq!(itemization.bonus_total, 0);
        assert!(itemization.lines.is_empty());
    }

    #[test]
    fn email_redaction_masks_vowels_only() {
        assert_eq!(redact_email("jim@juice.sh"), "j*m@j**c*.sh");
        assert_eq!(redact_email("ADMIN@shop.io"), "*DM*N@sh*p.**");
        assert_eq!(redact_email(""), "");
    }

    #[test]
    fn crlf_is_stripped_from_order_fields() {
        assert_eq!(strip_crlf("card\r\nDelivered: true"), "cardDelivered: true");
        assert_eq!(strip_crlf("wallet"), "wallet");
    }

    #[test]
    fn rendered_document_lists_items_discount_and_totals() {
        let itemization = itemize(&[line(10.0, 8.0, 2)], false);
        let doc = render_document(&ReceiptContext {
            app_name: "Vuln Shop",
            order_id: "beef-0123456789abcdef",
            email: "jim@juice.sh",
            date: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
            itemization: &itemization,
            discount_percent: 50,
            discount_amount: 10.0,
            delivery_price: 5.0,
            total_price: 15.0,
        });

        assert!(doc.contains("Vuln Shop"));
        assert!(doc.contains("Customer: jim@juice.sh"));
        assert!(doc.contains("Order #: beef-0123456789abcdef"));
        assert!(doc.contains("Date: 2024-06-15"));
        assert!(doc.contains("2x Apple Juice ea. 10 = 20¤"));
        assert!(doc.contains("50% discount from coupon: -10.00¤"));
        assert!(doc.contains("Delivery Price: 5.00¤"));
        assert!(doc.contains("Total Price: 15.00¤"));
        assert!(doc.contains("Bonus Points Earned: 2"));
    }

    #[test]
    fn rendered_document_omits_discount_line_without_discount() {
        let itemization = itemize(&[], false);
        let doc = render_document(&ReceiptContext {
            app_name: "Vuln Shop",
            order_id: "dead-0",
            email: "x@y.z",
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            itemization: &itemization,
            discount_percent: 0,
            discount_amount: 0.0,
            delivery_price: 0.0,
            total_price: 0.0,
        });
        assert!(!doc.contains("discount from coupon"));
        assert!(doc.contains("Total Price: 0.00¤"));
    }
}
