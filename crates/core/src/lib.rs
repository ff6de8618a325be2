pub mod config;
pub mod error;
pub mod types;

pub use config::Settings;
pub use error::{BridgeError, BridgeResult};
pub use types::{OptionValue, Order, OrderDate, Product, Traits};
