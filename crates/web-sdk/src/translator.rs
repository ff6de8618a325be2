//! Pure mapping from generic dispatcher calls to Curebit commands.
//!
//! Nothing here touches the environment; the same input always yields the
//! same command.

use affiliate_core::{Order, OrderDate, Product, Settings, Traits};
use chrono::SecondsFormat;

use crate::commands::{
    AffiliateMember, AffiliateRegistration, Command, IframeOptions, InitPayload, Item,
    PurchaseRecord,
};

/// Event names that carry a completed order, compared after trimming and
/// lowercasing.
const COMPLETED_ORDER_EVENTS: &[&str] = &["completed order", "order completed"];

/// Whether a track event name designates a completed order.
pub fn is_completed_order(event: &str) -> bool {
    let normalized = event.trim().to_lowercase();
    COMPLETED_ORDER_EVENTS.contains(&normalized.as_str())
}

pub fn build_init(settings: &Settings) -> Command {
    Command::Init(InitPayload {
        site_id: settings.site_id.clone(),
        server: settings.server.clone(),
    })
}

/// Build the `register_affiliate` command for an identified user.
pub fn build_identify(user_id: &str, traits: &Traits, settings: &Settings) -> Command {
    let (first_name, last_name) = member_names(traits);

    Command::RegisterAffiliate(AffiliateRegistration {
        responsive: settings.responsive.clone(),
        device: settings.device.clone(),
        iframe: IframeOptions {
            width: settings.iframe_width.clone(),
            height: settings.iframe_height.clone(),
            frameborder: settings.iframe_border,
            id: settings.iframe_id.clone().unwrap_or_default(),
            container: settings.iframe_container.clone(),
        },
        affiliate_member: AffiliateMember {
            customer_id: user_id.to_string(),
            first_name,
            last_name,
            email: traits.email.clone(),
        },
    })
}

/// Build the `register_purchase` command for a completed order.
///
/// `customer_id` and `traits` describe the host's current user, when it
/// tracks one.
pub fn build_purchase(order: &Order, customer_id: Option<&str>, traits: Option<&Traits>) -> Command {
    let (first_name, last_name) = traits.map(member_names).unwrap_or((None, None));

    Command::RegisterPurchase(PurchaseRecord {
        order_number: order.order_id.clone(),
        subtotal: order.total.clone(),
        coupon_code: order.coupon.clone(),
        order_date: order
            .date
            .as_ref()
            .and_then(OrderDate::to_utc)
            .map(|date| date.to_rfc3339_opts(SecondsFormat::Millis, true)),
        customer_id: customer_id.map(str::to_string),
        first_name,
        last_name,
        email: traits.and_then(|t| t.email.clone()),
        items: order.products.iter().map(build_item).collect(),
    })
}

fn build_item(product: &Product) -> Item {
    Item {
        product_id: product.sku.clone(),
        quantity: product.quantity.clone(),
        price: product.price.clone(),
        title: product.name.clone(),
        url: product.url.clone(),
        image_url: product.image.clone(),
    }
}

/// First and last name for a member: a full `name` wins over the separate
/// fields.
fn member_names(traits: &Traits) -> (Option<String>, Option<String>) {
    match traits.name.as_deref() {
        Some(name) => {
            let (first, last) = split_full_name(name);
            (Some(first), Some(last))
        }
        None => (traits.first_name.clone(), traits.last_name.clone()),
    }
}

/// Split the trimmed name on its first whitespace run. The last name may be
/// empty.
fn split_full_name(name: &str) -> (String, String) {
    let name = name.trim();
    match name.find(char::is_whitespace) {
        Some(idx) => (name[..idx].to_string(), name[idx..].trim_start().to_string()),
        None => (name.to_string(), String::new()),
    }
}
