//! Tether Scripting Bridge
//!
//! Typed calls from native engine code into script hooks.
//!
//! ## Architecture
//!
//! - **Args:** per-type lowering of native values into call arguments, with
//!   native objects boxed behind interpreter proxies for one call
//! - **Bridge:** `call` / `call_optional` / `call_override`, each with and
//!   without arguments and a typed return
//! - **Interface:** the boundary trait an interpreter binding implements;
//!   [`ScriptRuntime`] provides one on QuickJS
//!
//! ```ignore
//! let bridge = ScriptBridge::new(ScriptRuntime::new()?);
//! let args = bridge.args() << turn << &city;
//! let mut allowed = true;
//! if bridge.call_override_with_returning("GameHooks", "canFound", &args, &mut allowed) {
//!     // script decided
//! }
//! ```

pub mod args;
pub mod bridge;
pub mod config;
pub mod error;
pub mod ffi;
pub mod interface;
pub mod ret;
pub mod runtime;
pub mod stack;

#[cfg(test)]
mod stub;

pub use args::{ArgValue, Args, Array, ArrayArg, ArrayElement, RawArray, ScriptArg};
pub use bridge::{CallFailure, ScriptBridge};
pub use config::{AssertPolicy, BridgeConfig};
pub use error::ScriptError;
pub use ffi::{BoxedObject, ObjectHandle, ScriptObject};
pub use interface::ScriptInterface;
pub use ret::{CallReturn, ReturnBinding, ReturnSlot, Transport};
pub use runtime::ScriptRuntime;
pub use stack::StackFrame;

pub use rquickjs;
pub use serde_json;
pub use tether_metrics::TargetStats;

/// Bridge version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
