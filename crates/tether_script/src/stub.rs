//! Counting, recording interpreter stand-in for tests

use crate::args::{ArgValue, ArrayArg};
use crate::ffi::{ObjectHandle, ScriptObject};
use crate::interface::ScriptInterface;
use crate::ret::ReturnSlot;
use crate::stack::StackFrame;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt::Debug;

/// What a stub function hands back
#[derive(Debug, Clone)]
pub(crate) enum StubValue {
    None,
    Long(i64),
    Str(String),
    IntList(Vec<i32>),
    /// Return the first argument, which must be a bool or integer
    EchoFirst,
}

#[derive(Debug, Clone)]
struct StubFunction {
    value: StubValue,
    default_impl: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub module: String,
    pub function: String,
    pub args: Vec<String>,
}

#[derive(Debug, Default)]
pub(crate) struct StubInterface {
    functions: RefCell<HashMap<(String, String), StubFunction>>,
    calls: RefCell<Vec<RecordedCall>>,
    frames: RefCell<Vec<StackFrame>>,
    using_default: Cell<bool>,
    proxies: Cell<u64>,
    released: RefCell<Vec<u64>>,
    stack_queries: Cell<usize>,
}

impl StubInterface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&self, module: &str, function: &str, value: StubValue) {
        self.insert(module, function, value, false);
    }

    /// Define a function that reports itself as the default implementation.
    pub fn define_default(&self, module: &str, function: &str, value: StubValue) {
        self.insert(module, function, value, true);
    }

    pub fn set_frames(&self, frames: Vec<StackFrame>) {
        *self.frames.borrow_mut() = frames;
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.borrow().clone()
    }

    pub fn proxies_created(&self) -> u64 {
        self.proxies.get()
    }

    /// Handles given back through `release_object`, in release order
    pub fn released(&self) -> Vec<u64> {
        self.released.borrow().clone()
    }

    pub fn stack_queries(&self) -> usize {
        self.stack_queries.get()
    }

    fn insert(&self, module: &str, function: &str, value: StubValue, default_impl: bool) {
        self.functions.borrow_mut().insert(
            (module.to_string(), function.to_string()),
            StubFunction {
                value,
                default_impl,
            },
        );
    }
}

fn describe(arg: &ArgValue<'_>) -> String {
    fn array<T: Debug>(name: &str, raw: &crate::args::RawArray<'_, T>) -> String {
        if raw.is_null() {
            format!("{name}(null)")
        } else {
            format!("{name}{:?}", raw.as_slice())
        }
    }

    match arg {
        ArgValue::Bool(b) => format!("Bool({b})"),
        ArgValue::Int(i) => format!("Int({i})"),
        ArgValue::Float(f) => format!("Float({f})"),
        ArgValue::Str(s) => format!("Str({s})"),
        ArgValue::Object(handle) => format!("Object({})", handle.0),
        ArgValue::Array(ArrayArg::Bool(raw)) => array("BoolArray", raw),
        ArgValue::Array(ArrayArg::Byte(raw)) => array("ByteArray", raw),
        ArgValue::Array(ArrayArg::Int(raw)) => array("IntArray", raw),
        ArgValue::Array(ArrayArg::Long(raw)) => array("LongArray", raw),
        ArgValue::Array(ArrayArg::Float(raw)) => array("FloatArray", raw),
        ArgValue::Array(ArrayArg::Double(raw)) => array("DoubleArray", raw),
    }
}

impl ScriptInterface for StubInterface {
    fn call_function(
        &self,
        module: &str,
        function: &str,
        args: &[ArgValue<'_>],
        rval: Option<ReturnSlot<'_>>,
    ) -> bool {
        self.using_default.set(false);
        self.calls.borrow_mut().push(RecordedCall {
            module: module.to_string(),
            function: function.to_string(),
            args: args.iter().map(describe).collect(),
        });

        let key = (module.to_string(), function.to_string());
        let Some(stub) = self.functions.borrow().get(&key).cloned() else {
            return false;
        };

        let value = match stub.value {
            StubValue::EchoFirst => match args.first() {
                Some(ArgValue::Bool(b)) => StubValue::Long(i64::from(*b)),
                Some(ArgValue::Int(i)) => StubValue::Long(*i),
                _ => return false,
            },
            other => other,
        };

        if let Some(slot) = rval {
            match (slot, value) {
                (ReturnSlot::Long(out), StubValue::Long(v)) => *out = v,
                (ReturnSlot::Str(out), StubValue::Str(v)) => *out = v,
                (ReturnSlot::IntList(out), StubValue::IntList(v)) => *out = v,
                _ => return false,
            }
        }

        self.using_default.set(stub.default_impl);
        true
    }

    fn using_default_impl(&self) -> bool {
        self.using_default.get()
    }

    fn make_object(&self, _object: &dyn ScriptObject) -> ObjectHandle {
        self.proxies.set(self.proxies.get() + 1);
        ObjectHandle(self.proxies.get())
    }

    fn release_object(&self, handle: ObjectHandle) {
        self.released.borrow_mut().push(handle.0);
    }

    fn stack_trace(&self) -> Vec<StackFrame> {
        self.stack_queries.set(self.stack_queries.get() + 1);
        self.frames.borrow().clone()
    }
}
