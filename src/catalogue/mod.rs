//! Product payload normalization.
//!
//! Upstream product records arrive in the catalogue API's shape; the site
//! expects a flat record with trade/generic/strength naming and resolved
//! prices. Mapping is total: every field is optional on input and a
//! malformed record produces a best-effort, partially-empty output rather
//! than an error.

use serde::Serialize;
use serde_json::{json, Value};

/// A product record in the shape the site renders.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NormalizedProduct {
    pub trade: String,
    pub generic: String,
    pub strength: String,
    #[serde(rename = "class")]
    pub class_name: String,
    #[serde(rename = "tradePrice")]
    pub trade_price: Value,
    #[serde(rename = "retailPrice")]
    pub retail_price: Value,
    pub image_urls: Vec<String>,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub category_id: Value,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub id: Value,
}

/// Which payload shape a product endpoint returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// A collection: either `{"products": [...]}` or a bare array.
    Listing,
    /// A single product object.
    Detail,
}

/// Detect whether an upstream path serves product data, and in which shape.
pub fn product_shape(path: &str) -> Option<PayloadShape> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if !segments.iter().any(|s| *s == "products") {
        return None;
    }
    match segments.last() {
        Some(last) if last.bytes().all(|b| b.is_ascii_digit()) && !last.is_empty() => {
            Some(PayloadShape::Detail)
        }
        _ => Some(PayloadShape::Listing),
    }
}

/// Reshape an upstream payload for the client, preserving any envelope
/// fields (pagination and the like) around the product entries.
pub fn map_payload(shape: PayloadShape, payload: Value) -> Value {
    match shape {
        PayloadShape::Detail => {
            if payload.is_object() {
                normalized_value(&payload)
            } else {
                payload
            }
        }
        PayloadShape::Listing => match payload {
            Value::Array(items) => Value::Array(items.iter().map(normalized_value).collect()),
            Value::Object(mut envelope) => {
                if let Some(products) = envelope.remove("products") {
                    let mapped = match products {
                        Value::Array(items) => {
                            Value::Array(items.iter().map(normalized_value).collect())
                        }
                        other => other,
                    };
                    envelope.insert("products".to_string(), mapped);
                }
                Value::Object(envelope)
            }
            other => other,
        },
    }
}

fn normalized_value(raw: &Value) -> Value {
    serde_json::to_value(map_product(raw)).unwrap_or(Value::Null)
}

/// Map one raw product record. Never fails; absent fields get defaults.
pub fn map_product(raw: &Value) -> NormalizedProduct {
    let trade = str_field(raw, "name")
        .or_else(|| str_field(raw, "trade"))
        .unwrap_or_default();
    let description = str_field(raw, "description").unwrap_or_default();

    // Explicit generic/strength fields win; otherwise both derive from the
    // description alone, and with no description the full trade name stands
    // in for the generic.
    let generic = str_field(raw, "generic").unwrap_or_else(|| {
        if description.is_empty() {
            trade.clone()
        } else {
            description
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_string()
        }
    });
    let strength = str_field(raw, "strength").unwrap_or_else(|| {
        description
            .split_whitespace()
            .skip(1)
            .collect::<Vec<_>>()
            .join(" ")
    });

    let class_name = str_field(raw, "class").unwrap_or_else(|| "Uncategorized".to_string());

    let fallback_price = raw.get("price").filter(|v| !v.is_null()).cloned();
    let trade_price = price_of(raw, "trade")
        .or_else(|| fallback_price.clone())
        .unwrap_or_else(|| json!(0));
    let retail_price = price_of(raw, "retail")
        .or(fallback_price)
        .unwrap_or(Value::Null);

    NormalizedProduct {
        trade,
        generic,
        strength,
        class_name,
        trade_price,
        retail_price,
        image_urls: images_of(raw),
        category_id: raw.get("category_id").cloned().unwrap_or(Value::Null),
        id: raw.get("id").cloned().unwrap_or(Value::Null),
    }
}

fn str_field(raw: &Value, key: &str) -> Option<String> {
    raw.get(key)?.as_str().map(str::to_string).filter(|s| !s.is_empty())
}

fn price_of(raw: &Value, price_type: &str) -> Option<Value> {
    raw.get("prices")?
        .as_array()?
        .iter()
        .find(|p| p.get("price_type").and_then(Value::as_str) == Some(price_type))
        .and_then(|p| p.get("value"))
        .filter(|v| !v.is_null())
        .cloned()
}

fn images_of(raw: &Value) -> Vec<String> {
    if let Some(urls) = raw.get("image_urls").and_then(Value::as_array) {
        return urls
            .iter()
            .filter_map(|u| u.as_str().map(str::to_string))
            .collect();
    }
    raw.get("images")
        .and_then(Value::as_array)
        .map(|images| {
            images
                .iter()
                .filter_map(|image| {
                    image
                        .get("url")
                        .and_then(Value::as_str)
                        .or_else(|| image.as_str())
                        .map(str::to_string)
                })
                .collect()
        })
        .unwrap_or_default()
}
