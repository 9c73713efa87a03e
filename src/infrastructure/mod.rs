pub mod driver;
pub mod js_executor;

pub use driver::{Driver, ElementHandle};
pub use js_executor::JsExecutor;
