//! Host-side data types handed to integrations by the analytics dispatcher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult};

/// An option value that hosts may supply as a boolean, a number or a string.
///
/// Widget options such as `responsive` or `iframeWidth` are forwarded to the
/// provider as given; a `1` stays a `1` and `"100%"` stays a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Number(value.into())
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Text(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Text(value)
    }
}

/// Generic user attributes attached to an identify call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Traits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

/// One product line of an order.
///
/// Ids, quantities and prices are forwarded exactly as the host sent them,
/// whether strings or numbers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// When an order was placed: an RFC 3339 string or epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderDate {
    Timestamp(DateTime<Utc>),
    EpochMillis(i64),
}

impl OrderDate {
    /// `None` when epoch milliseconds fall outside the representable range.
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        match *self {
            OrderDate::Timestamp(date) => Some(date),
            OrderDate::EpochMillis(millis) => DateTime::from_timestamp_millis(millis),
        }
    }
}

impl From<DateTime<Utc>> for OrderDate {
    fn from(date: DateTime<Utc>) -> Self {
        OrderDate::Timestamp(date)
    }
}

/// E-commerce transaction carried by a completed-order track call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon: Option<serde_json::Value>,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<OrderDate>,
}

impl Order {
    /// Read an order out of raw track properties. Unknown keys are ignored.
    pub fn from_properties(properties: &serde_json::Map<String, serde_json::Value>) -> BridgeResult<Self> {
        serde_json::from_value(serde_json::Value::Object(properties.clone()))
            .map_err(|e| BridgeError::Properties(e.to_string()))
    }
}
