//! Provider command vocabulary: the `[name, payload]` tuples placed on the
//! Curebit command queue.
//!
//! Fields the host left unset are `None` and skipped on the wire, so they
//! reach the provider as absent keys. `PurchaseRecord::customer_id` is the
//! exception: an anonymous purchase is sent as an explicit `null`. Order ids,
//! amounts and product ids are raw JSON values so strings and numbers reach
//! the provider untouched.

use affiliate_core::OptionValue;
use serde::ser::SerializeTuple;
use serde::{Serialize, Serializer};

/// A named instruction for the provider script.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Init(InitPayload),
    RegisterAffiliate(AffiliateRegistration),
    RegisterPurchase(PurchaseRecord),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Init(_) => "init",
            Command::RegisterAffiliate(_) => "register_affiliate",
            Command::RegisterPurchase(_) => "register_purchase",
        }
    }

    /// Render the command as the JSON tuple the provider drains.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Serialize for Command {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(self.name())?;
        match self {
            Command::Init(payload) => tuple.serialize_element(payload)?,
            Command::RegisterAffiliate(payload) => tuple.serialize_element(payload)?,
            Command::RegisterPurchase(payload) => tuple.serialize_element(payload)?,
        }
        tuple.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InitPayload {
    pub site_id: String,
    pub server: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AffiliateRegistration {
    pub responsive: OptionValue,
    pub device: String,
    pub iframe: IframeOptions,
    pub affiliate_member: AffiliateMember,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IframeOptions {
    pub width: OptionValue,
    pub height: OptionValue,
    pub frameborder: i64,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AffiliateMember {
    pub customer_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_number: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_date: Option<String>,
    pub customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Item {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}
