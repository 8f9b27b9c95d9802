//! Cart metrics and checkout validation
//!
//! Pure derivations over a cart snapshot: no I/O, no mutation, no failure
//! paths. Every function returns a structured result so presentation code
//! can render without error handling. User-facing copy matches the
//! storefront locale.

use chrono::{DateTime, Utc};

use shared::cart::{CartLine, CartSummary};

/// Summary statistics derived from the cart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartMetrics {
    pub total_value: f64,
    pub total_items: u32,
    pub unique_items: u32,
    pub average_item_price: f64,
    pub reserved_items: u32,
    pub unavailable_items: u32,
}

/// Checkout eligibility plus the reasons against it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckoutValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Lines grouped by availability status. A line can appear in both
/// `available` and `reserved`.
#[derive(Debug, Default)]
pub struct StatusGroups<'a> {
    pub available: Vec<&'a CartLine>,
    pub unavailable: Vec<&'a CartLine>,
    pub reserved: Vec<&'a CartLine>,
}

/// Whether a reservation expiry lies in the past. No reservation is never
/// expired.
pub fn is_reservation_expired(reserved_until: Option<DateTime<Utc>>) -> bool {
    match reserved_until {
        Some(until) => until < Utc::now(),
        None => false,
    }
}

fn has_expired_reservation(line: &CartLine) -> bool {
    line.is_reserved && is_reservation_expired(line.reserved_until)
}

fn exceeds_stock(line: &CartLine) -> bool {
    line.quantity > line.variant.available_stock.unwrap_or(0)
}

/// Derive summary statistics. When no server summary is supplied the
/// totals are estimated from the lines.
pub fn calculate_metrics(items: &[CartLine], summary: Option<&CartSummary>) -> CartMetrics {
    let derived;
    let summary = match summary {
        Some(s) => s,
        None => {
            derived = CartSummary::from_lines(items);
            &derived
        }
    };

    let total_value = summary.total;
    let total_items = summary.total_items;
    let average_item_price = if total_items > 0 {
        total_value / f64::from(total_items)
    } else {
        0.0
    };

    CartMetrics {
        total_value,
        total_items,
        unique_items: items.len() as u32,
        average_item_price,
        reserved_items: items.iter().filter(|l| l.is_reserved).count() as u32,
        unavailable_items: items.iter().filter(|l| !l.is_available).count() as u32,
    }
}

/// Human string for a reservation expiry, bucketed by remaining time.
pub fn format_reservation_time(reserved_until: Option<DateTime<Utc>>) -> Option<String> {
    let until = reserved_until?;
    let remaining = until - Utc::now();

    if remaining.num_seconds() <= 0 {
        return Some("Резервирование истекло".to_string());
    }

    let minutes = remaining.num_minutes();
    let hours = minutes / 60;

    if hours > 0 {
        Some(format!("Зарезервировано на {} ч {} мин", hours, minutes % 60))
    } else {
        Some(format!("Зарезервировано на {} мин", minutes))
    }
}

/// Validate the cart for checkout.
///
/// An empty cart short-circuits with a single error. Unavailable lines and
/// stock-exceeding quantities block checkout; expired reservations only
/// warn.
pub fn validate_for_checkout(items: &[CartLine], summary: &CartSummary) -> CheckoutValidation {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if items.is_empty() {
        errors.push("Корзина пуста".to_string());
        return CheckoutValidation {
            is_valid: false,
            errors,
            warnings,
        };
    }

    if summary.has_unavailable {
        errors.push("В корзине есть недоступные товары".to_string());
    }

    let expired = items.iter().filter(|l| has_expired_reservation(l)).count();
    if expired > 0 {
        warnings.push(format!("У {expired} товаров истекло резервирование"));
    }

    if items.iter().any(|l| exceeds_stock(l)) {
        errors.push("Превышено доступное количество для некоторых товаров".to_string());
    }

    CheckoutValidation {
        is_valid: errors.is_empty(),
        errors,
        warnings,
    }
}

/// Ordered, human-readable hints for the cart state:
/// unavailable → reserved → expired → ready.
pub fn recommendations(items: &[CartLine], summary: &CartSummary) -> Vec<String> {
    let mut out = Vec::new();
    let metrics = calculate_metrics(items, Some(summary));

    if metrics.unavailable_items > 0 {
        out.push(format!(
            "Удалите {} недоступных товаров",
            metrics.unavailable_items
        ));
    }

    if metrics.reserved_items > 0 {
        out.push(format!(
            "У вас {} зарезервированных товаров",
            metrics.reserved_items
        ));
    }

    let expired = items.iter().filter(|l| has_expired_reservation(l)).count();
    if expired > 0 {
        out.push(format!("Обновите {expired} товаров с истекшим резервированием"));
    }

    if summary.total > 0.0 && metrics.unavailable_items == 0 {
        out.push("Корзина готова к оформлению заказа".to_string());
    }

    out
}

/// Group lines by availability status.
pub fn group_by_status(items: &[CartLine]) -> StatusGroups<'_> {
    StatusGroups {
        available: items.iter().filter(|l| l.is_available).collect(),
        unavailable: items.iter().filter(|l| !l.is_available).collect(),
        reserved: items.iter().filter(|l| l.is_reserved).collect(),
    }
}

/// Whether another unit of this line can be added.
pub fn can_increase_quantity(line: &CartLine) -> bool {
    line.variant.available_stock.unwrap_or(0) > line.quantity
}

/// Whether a unit can be removed without deleting the line.
pub fn can_decrease_quantity(line: &CartLine) -> bool {
    line.quantity > 1
}

/// Upper bound for the line's quantity stepper.
pub fn max_available_quantity(line: &CartLine) -> u32 {
    line.variant.available_stock.unwrap_or(0).max(line.quantity)
}

/// Whether any line blocks or degrades checkout.
pub fn has_cart_issues(items: &[CartLine]) -> bool {
    items
        .iter()
        .any(|l| !l.is_available || has_expired_reservation(l) || exceeds_stock(l))
}

/// The lines behind [`has_cart_issues`].
pub fn problematic_lines(items: &[CartLine]) -> Vec<&CartLine> {
    items
        .iter()
        .filter(|l| !l.is_available || has_expired_reservation(l) || exceeds_stock(l))
        .collect()
}

/// Zero-decimal ruble formatting with non-breaking thousands separators.
pub fn format_price(price: f64) -> String {
    let rounded = price.round() as i64;
    let negative = rounded < 0;
    let digits = rounded.unsigned_abs().to_string();

    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        let remaining = digits.len() - i;
        if i > 0 && remaining % 3 == 0 {
            grouped.push('\u{a0}');
        }
        grouped.push(c);
    }

    if negative {
        format!("-{grouped}\u{a0}₽")
    } else {
        format!("{grouped}\u{a0}₽")
    }
}

/// Display strings for the cart summary widget.
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedSummary {
    pub total: String,
    pub items_text: String,
    pub status_text: String,
}

/// Format the summary for display, with the pluralized item count.
pub fn format_summary(summary: &CartSummary) -> FormattedSummary {
    FormattedSummary {
        total: format_price(summary.total),
        items_text: format!("{} {}", summary.items_count, items_noun(summary.items_count)),
        status_text: if summary.has_unavailable {
            "Есть недоступные товары".to_string()
        } else {
            "Все товары доступны".to_string()
        },
    }
}

fn items_noun(count: u32) -> &'static str {
    let last_two = count % 100;
    if (11..=14).contains(&last_two) {
        return "товаров";
    }

    match count % 10 {
        1 => "товар",
        2..=4 => "товара",
        _ => "товаров",
    }
}
