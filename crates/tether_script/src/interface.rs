//! Boundary between the marshaller and the embedded interpreter

use crate::args::ArgValue;
use crate::ffi::{ObjectHandle, ScriptObject};
use crate::ret::ReturnSlot;
use crate::stack::StackFrame;

/// What the marshaller needs from an interpreter binding.
///
/// Implementations are single-threaded and not reentrant: a script function
/// must not call back into the bridge that invoked it.
pub trait ScriptInterface {
    /// Invoke `module.function` with already lowered arguments.
    ///
    /// When `rval` is given, the slot is written only if the call succeeds.
    fn call_function(
        &self,
        module: &str,
        function: &str,
        args: &[ArgValue<'_>],
        rval: Option<ReturnSlot<'_>>,
    ) -> bool;

    /// Whether the last successful call ran a default implementation.
    ///
    /// Meaningful only immediately after a successful `call_function`.
    fn using_default_impl(&self) -> bool;

    /// Create the interpreter-side proxy for a boxed native object.
    ///
    /// The proxy stays reachable through its handle until
    /// [`release_object`](Self::release_object) is called for it.
    fn make_object(&self, object: &dyn ScriptObject) -> ObjectHandle;

    /// Drop the binding's reference to a proxy made by `make_object`.
    ///
    /// Called once per handle when the owning argument list drops. Scripts
    /// that kept the proxy still see it; the interpreter collects it after.
    fn release_object(&self, _handle: ObjectHandle) {}

    /// Fresh snapshot of the interpreter call stack, innermost frame first.
    fn stack_trace(&self) -> Vec<StackFrame>;
}
