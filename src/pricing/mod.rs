// src/pricing/mod.rs
//! Supplier price lookups: the quote type, the provider trait, and the
//! strict decoder for the provider's JSON payload.

pub mod http;

use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::LookupError;

/// One successful provider answer for a SKU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceQuote {
    pub sku: String,
    pub gross_price: Decimal,
    pub net_price: Decimal,
    pub currency: String,
    pub stock_available: u64,
}

/// A pricing provider keyed by SKU. One attempt per call, no retries.
#[async_trait]
pub trait PriceLookup: Send + Sync {
    async fn fetch_quote(&self, sku: &str) -> Result<PriceQuote, LookupError>;
}

// Provider wire field names.
const FIELD_GROSS: &str = "total";
const FIELD_NET: &str = "total_sin_impuestos";
const FIELD_STOCK: &str = "stock_disponible";
const FIELD_CURRENCY: &str = "moneda";
const FIELD_SKU: &str = "sku";

/// Decode a provider response body into a [`PriceQuote`].
///
/// Prices must be JSON numbers >= 0 and stock a non-negative JSON integer.
/// Numeric strings and nulls are rejected rather than coerced. `moneda` and
/// `sku` are optional and fall back to `default_currency` / `requested_sku`.
pub fn decode_quote(
    body: &[u8],
    requested_sku: &str,
    default_currency: &str,
) -> Result<PriceQuote, LookupError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| LookupError::Decode(e.to_string()))?;
    let Value::Object(obj) = value else {
        return Err(LookupError::Decode("expected a JSON object".to_string()));
    };

    let gross_price = required_price(&obj, FIELD_GROSS)?;
    let net_price = required_price(&obj, FIELD_NET)?;
    let stock_available = required_stock(&obj)?;

    let currency = optional_str(&obj, FIELD_CURRENCY)?
        .unwrap_or(default_currency)
        .to_string();
    let sku = optional_str(&obj, FIELD_SKU)?
        .unwrap_or(requested_sku)
        .to_string();

    Ok(PriceQuote {
        sku,
        gross_price,
        net_price,
        currency,
        stock_available,
    })
}

fn required_price(obj: &Map<String, Value>, field: &'static str) -> Result<Decimal, LookupError> {
    let n = match obj.get(field) {
        None | Some(Value::Null) => return Err(LookupError::invalid(field, "missing")),
        Some(Value::Number(n)) => n,
        Some(other) => {
            return Err(LookupError::invalid(
                field,
                format!("expected a number, got {other}"),
            ))
        }
    };

    // Exponent notation (1e3) does not parse as a plain decimal string.
    let d = Decimal::from_str(&n.to_string())
        .or_else(|_| Decimal::from_scientific(&n.to_string()))
        .map_err(|e| LookupError::invalid(field, e.to_string()))?;

    if d.is_sign_negative() && !d.is_zero() {
        return Err(LookupError::invalid(field, format!("negative value {d}")));
    }
    Ok(d)
}

fn required_stock(obj: &Map<String, Value>) -> Result<u64, LookupError> {
    match obj.get(FIELD_STOCK) {
        None | Some(Value::Null) => Err(LookupError::invalid(FIELD_STOCK, "missing")),
        Some(Value::Number(n)) => n.as_u64().ok_or_else(|| {
            LookupError::invalid(FIELD_STOCK, format!("expected a non-negative integer, got {n}"))
        }),
        Some(other) => Err(LookupError::invalid(
            FIELD_STOCK,
            format!("expected an integer, got {other}"),
        )),
    }
}

fn optional_str<'a>(
    obj: &'a Map<String, Value>,
    field: &'static str,
) -> Result<Option<&'a str>, LookupError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(LookupError::invalid(
            field,
            format!("expected a string, got {other}"),
        )),
    }
}
