//! Checkout arithmetic: stock checks and the prices an order is written at.
//!
//! An order line is charged the catalog price at checkout less the book's
//! active discount, not the price captured when the line entered the cart.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{BookId, DiscountRate, Price, Quantity};

/// A cart line as seen at checkout, with the book's current price and stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutLine {
    pub book_id: BookId,
    pub quantity: Quantity,
    pub catalog_price: Price,
    pub stock: i32,
}

/// A book the customer asked for more copies of than are on the shelf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockShortfall {
    pub book_id: BookId,
    pub requested: i32,
    pub available: i32,
}

/// One line of a placed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub book_id: BookId,
    pub quantity: Quantity,
    /// Price per copy after discount.
    pub item_price: Price,
}

impl OrderLine {
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.item_price.times(self.quantity.as_u32())
    }
}

/// Lines that cannot be filled from current stock, in cart order.
#[must_use]
pub fn stock_shortfalls(lines: &[CheckoutLine]) -> Vec<StockShortfall> {
    lines
        .iter()
        .filter(|line| line.stock < line.quantity.get())
        .map(|line| StockShortfall {
            book_id: line.book_id,
            requested: line.quantity.get(),
            available: line.stock.max(0),
        })
        .collect()
}

/// Price every line at the catalog price less its active discount.
#[must_use]
pub fn price_lines(lines: &[CheckoutLine], rates: &HashMap<BookId, DiscountRate>) -> Vec<OrderLine> {
    lines
        .iter()
        .map(|line| OrderLine {
            book_id: line.book_id,
            quantity: line.quantity,
            item_price: rates
                .get(&line.book_id)
                .map_or(line.catalog_price, |rate| rate.apply(line.catalog_price)),
        })
        .collect()
}

/// Sum of the line totals.
#[must_use]
pub fn order_total(lines: &[OrderLine]) -> Price {
    let total = lines
        .iter()
        .map(|line| line.line_total().amount())
        .sum();
    Price::new(total).unwrap_or(Price::ZERO)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn price(s: &str) -> Price {
        Price::new(s.parse::<Decimal>().expect("decimal")).expect("price")
    }

    fn checkout_line(book: i32, quantity: i64, catalog: &str, stock: i32) -> CheckoutLine {
        CheckoutLine {
            book_id: BookId::new(book),
            quantity: Quantity::new(quantity).expect("quantity"),
            catalog_price: price(catalog),
            stock,
        }
    }

    #[test]
    fn test_shortfalls_list_only_unfillable_lines() {
        let lines = [
            checkout_line(1, 2, "10.00", 2),
            checkout_line(2, 3, "5.00", 1),
            checkout_line(3, 1, "8.00", 0),
        ];
        assert_eq!(
            stock_shortfalls(&lines),
            vec![
                StockShortfall { book_id: BookId::new(2), requested: 3, available: 1 },
                StockShortfall { book_id: BookId::new(3), requested: 1, available: 0 },
            ]
        );
        assert!(stock_shortfalls(&lines[..1]).is_empty());
    }

    #[test]
    fn test_discount_applies_to_catalog_price() {
        let lines = [checkout_line(1, 2, "20.00", 5), checkout_line(2, 1, "9.99", 5)];
        let rates = HashMap::from([(
            BookId::new(1),
            DiscountRate::new(Decimal::from(25)).expect("rate"),
        )]);

        let priced = price_lines(&lines, &rates);

        assert_eq!(priced[0].item_price, price("15.00"));
        assert_eq!(priced[1].item_price, price("9.99"));
        assert_eq!(order_total(&priced), price("39.99"));
    }

    #[test]
    fn test_empty_order_totals_zero() {
        assert_eq!(order_total(&[]), Price::ZERO);
    }
}
