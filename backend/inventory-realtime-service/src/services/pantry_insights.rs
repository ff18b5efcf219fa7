/// Keyword-based pantry helpers: product categorisation and restock/expiry
/// suggestions. Deterministic stand-ins until a model-backed classifier is
/// wired in.
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::days_remaining;

pub const CATEGORIES: [&str; 10] = [
    "Fruits & Vegetables",
    "Dairy & Eggs",
    "Meat & Seafood",
    "Bakery & Bread",
    "Pantry & Dry Goods",
    "Beverages",
    "Frozen Foods",
    "Snacks & Sweets",
    "Household & Cleaning",
    "Personal Care",
];

const DEFAULT_CATEGORY: &str = "Pantry & Dry Goods";

/// First matching rule wins.
const KEYWORD_RULES: &[(&[&str], &str)] = &[
    (&["apple", "banana", "vegetable"], "Fruits & Vegetables"),
    (&["milk", "cheese", "egg"], "Dairy & Eggs"),
    (&["meat", "chicken", "fish"], "Meat & Seafood"),
    (&["bread", "cake", "pastry"], "Bakery & Bread"),
];

/// Days-remaining range (inclusive) that counts as "expiring soon"
const EXPIRING_SOON_DAYS: std::ops::RangeInclusive<i64> = 0..=3;
const LOW_STOCK_THRESHOLD: f64 = 2.0;
const RECIPE_INGREDIENT_LIMIT: usize = 3;

pub fn categorize(product_name: &str) -> &'static str {
    let name = product_name.to_lowercase();
    KEYWORD_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|keyword| name.contains(keyword)))
        .map(|(_, category)| *category)
        .unwrap_or(DEFAULT_CATEGORY)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpiringSoon {
    pub product: String,
    pub expiry_date: DateTime<Utc>,
    pub days_remaining: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LowStock {
    pub product: String,
    pub current_quantity: f64,
    pub suggestion: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecipeSuggestion {
    pub name: String,
    pub description: String,
    pub ingredients: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Suggestions {
    pub expiring_soon: Vec<ExpiringSoon>,
    pub low_stock: Vec<LowStock>,
    pub recipe_suggestions: Vec<RecipeSuggestion>,
}

/// Build suggestions from a client-supplied inventory listing.
///
/// Items are loose JSON objects shaped like
/// `{"product": {"name": ..}, "expiry_date": .., "quantity": ..}`; fields that
/// are missing or malformed simply exclude the item from that section.
/// `preferences` is accepted for forward compatibility and not consulted yet.
pub fn suggest(inventory: &[Value], _preferences: &Map<String, Value>, now: DateTime<Utc>) -> Suggestions {
    let expiring_soon: Vec<ExpiringSoon> = inventory
        .iter()
        .filter_map(|item| {
            let expiry_date = item
                .get("expiry_date")
                .and_then(Value::as_str)
                .and_then(parse_expiry_date)?;
            let days = days_remaining(expiry_date, now);
            EXPIRING_SOON_DAYS.contains(&days).then(|| ExpiringSoon {
                product: product_name(item).to_string(),
                expiry_date,
                days_remaining: days,
            })
        })
        .collect();

    let low_stock = inventory
        .iter()
        .filter_map(|item| {
            let quantity = item.get("quantity").and_then(Value::as_f64)?;
            (quantity <= LOW_STOCK_THRESHOLD).then(|| LowStock {
                product: product_name(item).to_string(),
                current_quantity: quantity,
                suggestion: "Consider restocking soon".to_string(),
            })
        })
        .collect();

    let recipe_suggestions = vec![RecipeSuggestion {
        name: "Quick Pantry Meal".to_string(),
        description: "Use items that are expiring soon".to_string(),
        ingredients: expiring_soon
            .iter()
            .take(RECIPE_INGREDIENT_LIMIT)
            .map(|item| item.product.clone())
            .collect(),
    }];

    Suggestions {
        expiring_soon,
        low_stock,
        recipe_suggestions,
    }
}

/// Accepts RFC 3339, RFC 2822 (the inventory API's JSON date form) and
/// date-only `YYYY-MM-DD`, which is read as midnight UTC.
fn parse_expiry_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .map(|date| date.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|midnight| midnight.and_utc())
        })
}

fn product_name(item: &Value) -> &str {
    item.get("product")
        .and_then(|product| product.get("name"))
        .and_then(Value::as_str)
        .unwrap_or("Unknown product")
}
