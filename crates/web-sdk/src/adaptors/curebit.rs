//! Curebit affiliate-marketing integration: queues `init`,
//! `register_affiliate` and `register_purchase` commands on the `_curebitq`
//! global and loads the Curebit script once.
//!
//! Commands pushed before the script arrives wait in the queue; the script
//! drains it in order once it has executed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use affiliate_core::{BridgeResult, Order, Settings, Traits};
use tracing::{debug, info, warn};

use super::{Integration, Properties};
use crate::commands::Command;
use crate::env::Environment;
use crate::loader::{noop_loader, ScriptLoader};
use crate::translator;
use crate::user::{anonymous, UserSource};

/// Global holding the command queue.
pub const QUEUE_GLOBAL: &str = "_curebitq";
/// Global the Curebit script installs once loaded.
pub const NAMESPACE_GLOBAL: &str = "curebit";

const GLOBALS: &[&str] = &[QUEUE_GLOBAL, NAMESPACE_GLOBAL];

pub struct CurebitIntegration {
    settings: Settings,
    env: Arc<dyn Environment>,
    loader: Arc<dyn ScriptLoader>,
    user: Arc<dyn UserSource>,
    load_requested: AtomicBool,
}

impl CurebitIntegration {
    pub fn new(settings: Settings, env: Arc<dyn Environment>) -> Self {
        Self {
            settings,
            env,
            loader: noop_loader(),
            user: anonymous(),
            load_requested: AtomicBool::new(false),
        }
    }

    /// Attach the loader that fetches the Curebit script.
    pub fn with_loader(mut self, loader: Arc<dyn ScriptLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Attach the host's current-user record, used to attribute purchases.
    pub fn with_user(mut self, user: Arc<dyn UserSource>) -> Self {
        self.user = user;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Append a command to the Curebit queue, creating the queue if needed.
    pub fn enqueue(&self, command: Command) -> BridgeResult<()> {
        let queue = self.env.ensure_queue(QUEUE_GLOBAL)?;
        debug!(command = command.name(), "curebit command queued");
        queue.append(command);
        Ok(())
    }

    /// Start the script load unless one is already under way. A load the
    /// loader could not start leaves the next `initialize` free to retry.
    fn load(&self) {
        if self.load_requested.swap(true, Ordering::SeqCst) {
            debug!("curebit script load already requested");
            return;
        }
        info!(src = %self.settings.script_src, "loading curebit script");
        if !self.loader.load(&self.settings.script_src) {
            self.load_requested.store(false, Ordering::SeqCst);
            warn!(src = %self.settings.script_src, "curebit script load not started");
        }
    }

    fn completed_order(&self, properties: Option<&Properties>) -> BridgeResult<()> {
        let order = match properties {
            Some(props) => Order::from_properties(props)?,
            None => Order::default(),
        };
        let traits = self.user.traits();
        let customer_id = self
            .user
            .user_id()
            .or_else(|| traits.as_ref().and_then(|t| t.id.clone()));
        self.enqueue(translator::build_purchase(
            &order,
            customer_id.as_deref(),
            traits.as_ref(),
        ))
    }
}

impl Integration for CurebitIntegration {
    fn name(&self) -> &str {
        "Curebit"
    }

    fn globals(&self) -> &[&'static str] {
        GLOBALS
    }

    fn ready_on_initialize(&self) -> bool {
        true
    }

    fn initialize(&self) -> BridgeResult<()> {
        self.enqueue(translator::build_init(&self.settings))?;
        info!(site_id = %self.settings.site_id, "curebit initialized");
        self.load();
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.env.has_global(NAMESPACE_GLOBAL)
    }

    fn identify(&self, user_id: &str, traits: Option<&Traits>) -> BridgeResult<()> {
        let fallback = Traits::default();
        let traits = traits.unwrap_or(&fallback);
        self.enqueue(translator::build_identify(user_id, traits, &self.settings))
    }

    fn track(&self, event: &str, properties: Option<&Properties>) -> BridgeResult<()> {
        if translator::is_completed_order(event) {
            return self.completed_order(properties);
        }
        debug!(event, "curebit ignores event");
        Ok(())
    }

    fn validate_config(&self) -> BridgeResult<()> {
        self.settings.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MemoryEnvironment;
    use crate::loader::{RecordingLoader, TaskLoader};
    use crate::user::IdentifiedUser;
    use affiliate_core::{BridgeError, OptionValue};
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn test_settings() -> Settings {
        Settings {
            site_id: "curebit-87ab995d-736b-45ba-ac41-71f4dbb5c74a".into(),
            server: String::new(),
            ..Default::default()
        }
    }

    struct Harness {
        env: Arc<MemoryEnvironment>,
        loader: Arc<RecordingLoader>,
        curebit: CurebitIntegration,
    }

    fn harness(settings: Settings) -> Harness {
        let env = Arc::new(MemoryEnvironment::new());
        let loader = Arc::new(RecordingLoader::new());
        let curebit = CurebitIntegration::new(settings, env.clone()).with_loader(loader.clone());
        Harness { env, loader, curebit }
    }

    impl Harness {
        fn queued(&self) -> Vec<serde_json::Value> {
            self.env
                .queue(QUEUE_GLOBAL)
                .map(|q| q.snapshot().iter().map(Command::to_json).collect())
                .unwrap_or_default()
        }
    }

    fn order_properties() -> Properties {
        json!({
            "orderId": "ab535a52",
            "coupon": "save20",
            "date": "2014-02-11T20:31:44.123Z",
            "total": 647.92,
            "products": [{
                "sku": "5be59f56",
                "quantity": 8,
                "price": 80.99,
                "name": "my-product",
                "url": "//products.io/my-product",
                "image": "//products.io/my-product.webp"
            }]
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn test_metadata() {
        let h = harness(test_settings());
        assert_eq!(h.curebit.name(), "Curebit");
        assert!(h.curebit.ready_on_initialize());
        assert_eq!(h.curebit.globals(), &["_curebitq", "curebit"]);
    }

    #[test]
    fn test_initialize_pushes_settings() {
        let h = harness(test_settings());
        h.curebit.initialize().unwrap();
        assert_eq!(
            h.queued(),
            vec![json!(["init", {
                "site_id": "curebit-87ab995d-736b-45ba-ac41-71f4dbb5c74a",
                "server": ""
            }])]
        );
    }

    #[test]
    fn test_initialize_calls_load_once() {
        let h = harness(test_settings());
        h.curebit.initialize().unwrap();
        assert_eq!(
            h.loader.requests(),
            vec!["//d2jjzw81hqbuqv.cloudfront.net/integration/curebit-1.0.min.js".to_string()]
        );

        h.curebit.initialize().unwrap();
        assert_eq!(h.loader.count(), 1);
        assert_eq!(h.queued().len(), 2);
    }

    #[test]
    fn test_initialize_in_sealed_environment_fails() {
        let loader = Arc::new(RecordingLoader::new());
        let curebit = CurebitIntegration::new(test_settings(), Arc::new(MemoryEnvironment::sealed()))
            .with_loader(loader.clone());
        let err = curebit.initialize().unwrap_err();
        assert!(matches!(err, BridgeError::Environment(_)));
        assert_eq!(loader.count(), 0);
    }

    #[test]
    fn test_loaded_follows_namespace_global() {
        let h = harness(test_settings());
        assert!(!h.curebit.is_loaded());
        assert!(!h.curebit.is_loaded());
        h.env.set_global(NAMESPACE_GLOBAL, json!({}));
        assert!(h.curebit.is_loaded());
        assert!(h.curebit.is_loaded());
    }

    #[tokio::test]
    async fn test_load_changes_loaded_state() {
        let env = Arc::new(MemoryEnvironment::new());
        let script_env = env.clone();
        let loader = TaskLoader::new(move |_src: String| {
            let env = script_env.clone();
            async move {
                tokio::task::yield_now().await;
                env.set_global(NAMESPACE_GLOBAL, json!({ "version": "1.0" }));
            }
        });
        let curebit = CurebitIntegration::new(test_settings(), env.clone()).with_loader(Arc::new(loader));

        assert!(!curebit.is_loaded());
        curebit.initialize().unwrap();

        let mut loaded = false;
        for _ in 0..100 {
            if curebit.is_loaded() {
                loaded = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(loaded);
    }

    #[test]
    fn test_identify() {
        let h = harness(test_settings());
        h.curebit.initialize().unwrap();
        h.curebit.identify("id", None).unwrap();

        assert_eq!(
            h.queued()[1],
            json!(["register_affiliate", {
                "responsive": true,
                "device": "",
                "iframe": { "width": 0, "height": 0, "id": "", "frameborder": 0 },
                "affiliate_member": { "customer_id": "id" }
            }])
        );
    }

    #[test]
    fn test_identify_passes_options() {
        let h = harness(Settings {
            iframe_width: OptionValue::from(480),
            iframe_height: OptionValue::from("100%"),
            iframe_border: 1,
            iframe_id: Some("curebit-iframe".into()),
            responsive: OptionValue::from(1),
            device: "desktop".into(),
            ..test_settings()
        });
        h.curebit.initialize().unwrap();
        let traits = Traits {
            name: Some("john doe".into()),
            email: Some("my@email.com".into()),
            ..Default::default()
        };
        h.curebit.identify("id", Some(&traits)).unwrap();

        assert_eq!(
            h.queued()[1],
            json!(["register_affiliate", {
                "responsive": 1,
                "device": "desktop",
                "iframe": { "width": 480, "height": "100%", "frameborder": 1, "id": "curebit-iframe" },
                "affiliate_member": {
                    "customer_id": "id",
                    "first_name": "john",
                    "last_name": "doe",
                    "email": "my@email.com"
                }
            }])
        );
    }

    #[test]
    fn test_completed_order() {
        let h = harness(test_settings());
        h.curebit.initialize().unwrap();
        h.curebit
            .track("completed order", Some(&order_properties()))
            .unwrap();

        assert_eq!(
            h.queued()[1],
            json!(["register_purchase", {
                "coupon_code": "save20",
                "customer_id": null,
                "order_date": "2014-02-11T20:31:44.123Z",
                "order_number": "ab535a52",
                "subtotal": 647.92,
                "items": [{
                    "product_id": "5be59f56",
                    "quantity": 8,
                    "price": 80.99,
                    "title": "my-product",
                    "url": "//products.io/my-product",
                    "image_url": "//products.io/my-product.webp"
                }]
            }])
        );
    }

    #[test]
    fn test_completed_order_attributes_current_user() {
        let user = Arc::new(IdentifiedUser::new());
        user.identify(
            Some("user-42".into()),
            Traits {
                first_name: Some("Ada".into()),
                last_name: Some("Lovelace".into()),
                email: Some("ada@example.com".into()),
                ..Default::default()
            },
        );
        let env = Arc::new(MemoryEnvironment::new());
        let curebit = CurebitIntegration::new(test_settings(), env.clone()).with_user(user);
        curebit.track("Completed Order", Some(&order_properties())).unwrap();

        let queued = env.queue(QUEUE_GLOBAL).unwrap().snapshot();
        let json = queued[0].to_json();
        let payload = &json[1];
        assert_eq!(payload["customer_id"], "user-42");
        assert_eq!(payload["first_name"], "Ada");
        assert_eq!(payload["last_name"], "Lovelace");
        assert_eq!(payload["email"], "ada@example.com");
    }

    #[test]
    fn test_other_events_are_ignored() {
        let h = harness(test_settings());
        h.curebit.initialize().unwrap();
        h.curebit.track("viewed product", Some(&order_properties())).unwrap();
        h.curebit.track("signed up", None).unwrap();
        assert_eq!(h.queued().len(), 1);
    }

    #[test]
    fn test_malformed_order_is_an_error() {
        let h = harness(test_settings());
        let props = json!({ "products": 12 }).as_object().cloned().unwrap();
        let err = h.curebit.track("completed order", Some(&props)).unwrap_err();
        assert!(matches!(err, BridgeError::Properties(_)));
    }

    #[test]
    fn test_calls_before_load_keep_order() {
        let h = harness(test_settings());
        h.curebit.initialize().unwrap();
        h.curebit.identify("a", None).unwrap();
        h.curebit.track("completed order", None).unwrap();
        h.curebit.identify("b", None).unwrap();
        assert!(!h.curebit.is_loaded());

        let names: Vec<_> = h
            .env
            .queue(QUEUE_GLOBAL)
            .unwrap()
            .snapshot()
            .iter()
            .map(Command::name)
            .collect();
        assert_eq!(
            names,
            vec!["init", "register_affiliate", "register_purchase", "register_affiliate"]
        );
    }

    /// Declines its first load request, accepts later ones.
    #[derive(Default)]
    struct NoRuntimeThenReady {
        attempts: AtomicUsize,
    }

    impl ScriptLoader for NoRuntimeThenReady {
        fn load(&self, _src: &str) -> bool {
            self.attempts.fetch_add(1, Ordering::SeqCst) > 0
        }
    }

    #[test]
    fn test_load_not_started_is_retried_on_next_initialize() {
        let loader = Arc::new(NoRuntimeThenReady::default());
        let curebit = CurebitIntegration::new(test_settings(), Arc::new(MemoryEnvironment::new()))
            .with_loader(loader.clone());

        curebit.initialize().unwrap();
        curebit.initialize().unwrap();
        curebit.initialize().unwrap();
        assert_eq!(loader.attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_completed_order_with_numeric_ids_and_epoch_date() {
        let h = harness(test_settings());
        let props = json!({
            "orderId": 12345,
            "total": 10,
            "date": 1392150704000i64,
            "products": [{ "sku": 987, "quantity": 1, "price": 10 }]
        })
        .as_object()
        .cloned()
        .unwrap();
        h.curebit.track("completed order", Some(&props)).unwrap();

        assert_eq!(
            h.queued(),
            vec![json!(["register_purchase", {
                "order_number": 12345,
                "subtotal": 10,
                "order_date": "2014-02-11T20:31:44.000Z",
                "customer_id": null,
                "items": [{ "product_id": 987, "quantity": 1, "price": 10 }]
            }])]
        );
    }

    #[test]
    fn test_completed_order_falls_back_to_trait_id() {
        let user = Arc::new(IdentifiedUser::new());
        user.identify(
            None,
            Traits {
                id: Some("trait-7".into()),
                ..Default::default()
            },
        );
        let env = Arc::new(MemoryEnvironment::new());
        let curebit = CurebitIntegration::new(test_settings(), env.clone()).with_user(user);
        curebit.track("completed order", None).unwrap();

        let queued = env.queue(QUEUE_GLOBAL).unwrap().snapshot();
        assert_eq!(queued[0].to_json()[1]["customer_id"], "trait-7");
    }

    #[test]
    fn test_validate_config() {
        let h = harness(Settings {
            server: "https://www.curebit.com".into(),
            ..test_settings()
        });
        assert!(h.curebit.validate_config().is_ok());

        let bad = harness(Settings::default());
        assert!(bad.curebit.validate_config().is_err());
    }
}
