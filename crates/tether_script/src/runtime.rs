//! Script runtime management
//!
//! QuickJS-backed interpreter binding. Script modules are plain global
//! objects (`globalThis.GameHooks = { onTurn(turn) { ... } }`); fallback
//! handlers live under `globalThis.defaults` with the same layout and are only
//! used when the module itself does not define the function.

use crate::args::{ArgValue, ArrayArg};
use crate::error::ScriptError;
use crate::ffi::{ObjectHandle, ScriptObject};
use crate::interface::ScriptInterface;
use crate::ret::ReturnSlot;
use crate::stack::{self, StackFrame};
use rquickjs::function::{Rest, This};
use rquickjs::{Array, Context, Ctx, FromJs, Function, IntoJs, Object, Runtime, Value};
use std::cell::{Cell, RefCell};
use std::path::Path;

/// Global object holding default implementations
pub const DEFAULTS_GLOBAL: &str = "defaults";

/// Property naming the native type on every proxy object
pub const PROXY_TYPE_KEY: &str = "__type";

const PROXY_TABLE: &str = "__tetherProxies";

/// Script execution context
pub struct ScriptRuntime {
    #[allow(dead_code)] // Kept alive for context lifetime
    runtime: Runtime,
    pub context: Context,
    using_default: Cell<bool>,
    last_stack: RefCell<Option<String>>,
    next_proxy: Cell<u64>,
}

impl ScriptRuntime {
    pub fn new() -> Result<Self, ScriptError> {
        let runtime = Runtime::new()?;
        let context = Context::full(&runtime)?;

        context.with(|ctx| -> rquickjs::Result<()> {
            let globals = ctx.globals();
            globals.set(DEFAULTS_GLOBAL, Object::new(ctx.clone())?)?;
            globals.set(PROXY_TABLE, Object::new(ctx.clone())?)?;
            Ok(())
        })?;

        Ok(Self {
            runtime,
            context,
            using_default: Cell::new(false),
            last_stack: RefCell::new(None),
            next_proxy: Cell::new(1),
        })
    }

    pub fn execute_file(&self, path: &Path) -> Result<(), ScriptError> {
        let source = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.display().to_string(),
            source,
        })?;
        tracing::debug!(path = %path.display(), bytes = source.len(), "loading script");
        self.execute(&source)
    }

    pub fn execute(&self, source: &str) -> Result<(), ScriptError> {
        self.last_stack.take();
        self.context.with(|ctx| match ctx.eval::<(), _>(source) {
            Ok(()) => Ok(()),
            Err(rquickjs::Error::Exception) => Err(self.take_exception(&ctx)),
            Err(err) => Err(err.into()),
        })
    }

    /// Number of proxies still held for live argument lists
    pub fn proxy_count(&self) -> usize {
        self.context
            .with(|ctx| {
                ctx.globals()
                    .get::<_, Object>(PROXY_TABLE)
                    .map(|table| table.keys::<String>().count())
            })
            .unwrap_or(0)
    }

    fn take_exception(&self, ctx: &Ctx<'_>) -> ScriptError {
        let exception = ctx.catch();
        let (message, stack) = match exception.as_object() {
            Some(object) => (
                object.get::<_, Option<String>>("message").ok().flatten(),
                object.get::<_, Option<String>>("stack").ok().flatten(),
            ),
            None => (None, None),
        };
        let message = message
            .or_else(|| exception.as_string().and_then(|s| s.to_string().ok()))
            .unwrap_or_else(|| String::from("uncaught exception"));

        *self.last_stack.borrow_mut() = stack.clone();
        ScriptError::Exception {
            message,
            stack: stack.unwrap_or_default(),
        }
    }

    /// Run `module.function`, returning whether the default implementation ran.
    fn invoke<'js>(
        &self,
        ctx: &Ctx<'js>,
        module: &str,
        function: &str,
        args: &[ArgValue<'_>],
        rval: Option<ReturnSlot<'_>>,
    ) -> Result<bool, ScriptError> {
        let globals = ctx.globals();
        let (this, func, using_default) = match resolve(&globals, module, function)? {
            Some((this, func)) => (this, func, false),
            None => {
                let defaults: Object = globals.get(DEFAULTS_GLOBAL)?;
                match resolve(&defaults, module, function)? {
                    Some((this, func)) => (this, func, true),
                    None => {
                        return Err(ScriptError::MissingFunction {
                            module: module.to_string(),
                            function: function.to_string(),
                        })
                    }
                }
            }
        };

        let values = args
            .iter()
            .map(|arg| lower(ctx, arg))
            .collect::<rquickjs::Result<Vec<_>>>()?;

        let result: Value = match func.call((This(this), Rest(values))) {
            Ok(result) => result,
            Err(rquickjs::Error::Exception) => return Err(self.take_exception(ctx)),
            Err(err) => return Err(err.into()),
        };

        if let Some(slot) = rval {
            fill_slot(ctx, result, slot)?;
        }
        Ok(using_default)
    }
}

impl ScriptInterface for ScriptRuntime {
    fn call_function(
        &self,
        module: &str,
        function: &str,
        args: &[ArgValue<'_>],
        rval: Option<ReturnSlot<'_>>,
    ) -> bool {
        self.using_default.set(false);
        self.last_stack.take();
        let result = self
            .context
            .with(|ctx| self.invoke(&ctx, module, function, args, rval));

        match result {
            Ok(using_default) => {
                self.using_default.set(using_default);
                true
            }
            Err(err) => {
                tracing::debug!(module, function, error = %err, "script call did not complete");
                false
            }
        }
    }

    fn using_default_impl(&self) -> bool {
        self.using_default.get()
    }

    fn make_object(&self, object: &dyn ScriptObject) -> ObjectHandle {
        let created = self.context.with(|ctx| -> rquickjs::Result<ObjectHandle> {
            let proxy = json_to_js(&ctx, &object.to_script_value())?;
            if let Some(fields) = proxy.as_object() {
                fields.set(PROXY_TYPE_KEY, object.type_name())?;
            }
            let handle = ObjectHandle(self.next_proxy.get());
            let table: Object = ctx.globals().get(PROXY_TABLE)?;
            table.set(proxy_key(handle), proxy)?;
            self.next_proxy.set(handle.0 + 1);
            Ok(handle)
        });

        created.unwrap_or_else(|err| {
            tracing::warn!(type_name = object.type_name(), error = %err, "failed to create script proxy");
            ObjectHandle::NULL
        })
    }

    fn release_object(&self, handle: ObjectHandle) {
        let released = self.context.with(|ctx| -> rquickjs::Result<()> {
            let table: Object = ctx.globals().get(PROXY_TABLE)?;
            table.remove(proxy_key(handle))
        });
        if let Err(err) = released {
            tracing::warn!(handle = handle.0, error = %err, "failed to release script proxy");
        }
    }

    fn stack_trace(&self) -> Vec<StackFrame> {
        self.last_stack
            .borrow()
            .as_deref()
            .map(stack::parse_js_stack)
            .unwrap_or_default()
    }
}

fn proxy_key(handle: ObjectHandle) -> String {
    handle.0.to_string()
}

fn resolve<'js>(
    root: &Object<'js>,
    module: &str,
    function: &str,
) -> rquickjs::Result<Option<(Object<'js>, Function<'js>)>> {
    let Some(module) = root.get::<_, Value>(module)?.into_object() else {
        return Ok(None);
    };
    let func = module.get::<_, Value>(function)?.into_function();
    Ok(func.map(|func| (module, func)))
}

fn lower<'js>(ctx: &Ctx<'js>, arg: &ArgValue<'_>) -> rquickjs::Result<Value<'js>> {
    Ok(match *arg {
        ArgValue::Bool(b) => Value::new_bool(ctx.clone(), b),
        ArgValue::Int(i) => match i32::try_from(i) {
            Ok(small) => Value::new_int(ctx.clone(), small),
            Err(_) => Value::new_number(ctx.clone(), i as f64),
        },
        ArgValue::Float(f) => Value::new_number(ctx.clone(), f),
        ArgValue::Str(s) => s.into_js(ctx)?,
        ArgValue::Array(array) => lower_array(ctx, array)?,
        ArgValue::Object(handle) if handle.is_null() => Value::new_null(ctx.clone()),
        ArgValue::Object(handle) => {
            let table: Object = ctx.globals().get(PROXY_TABLE)?;
            table.get(proxy_key(handle))?
        }
    })
}

fn lower_array<'js>(ctx: &Ctx<'js>, array: ArrayArg<'_>) -> rquickjs::Result<Value<'js>> {
    fn fill<'js, T: Copy + IntoJs<'js>>(target: &Array<'js>, items: &[T]) -> rquickjs::Result<()> {
        for (index, item) in items.iter().enumerate() {
            target.set(index, *item)?;
        }
        Ok(())
    }

    let target = Array::new(ctx.clone())?;
    match array {
        ArrayArg::Bool(raw) => fill(&target, raw.as_slice())?,
        ArrayArg::Byte(raw) => fill(&target, raw.as_slice())?,
        ArrayArg::Int(raw) => fill(&target, raw.as_slice())?,
        ArrayArg::Long(raw) => fill(&target, raw.as_slice())?,
        ArrayArg::Float(raw) => fill(&target, raw.as_slice())?,
        ArrayArg::Double(raw) => fill(&target, raw.as_slice())?,
    }
    Ok(target.into_value())
}

fn json_to_js<'js>(ctx: &Ctx<'js>, value: &serde_json::Value) -> rquickjs::Result<Value<'js>> {
    use serde_json::Value as Json;

    Ok(match value {
        Json::Null => Value::new_null(ctx.clone()),
        Json::Bool(b) => Value::new_bool(ctx.clone(), *b),
        Json::Number(n) => match n.as_i64().and_then(|i| i32::try_from(i).ok()) {
            Some(i) => Value::new_int(ctx.clone(), i),
            None => Value::new_number(ctx.clone(), n.as_f64().unwrap_or(f64::NAN)),
        },
        Json::String(s) => s.as_str().into_js(ctx)?,
        Json::Array(items) => {
            let array = Array::new(ctx.clone())?;
            for (index, item) in items.iter().enumerate() {
                array.set(index, json_to_js(ctx, item)?)?;
            }
            array.into_value()
        }
        Json::Object(fields) => {
            let object = Object::new(ctx.clone())?;
            for (key, item) in fields {
                object.set(key.as_str(), json_to_js(ctx, item)?)?;
            }
            object.into_value()
        }
    })
}

fn fill_slot<'js>(ctx: &Ctx<'js>, value: Value<'js>, slot: ReturnSlot<'_>) -> Result<(), ScriptError> {
    let mismatch = ScriptError::ReturnType {
        expected: slot.expected(),
        found: format!("{:?}", value.type_of()),
    };
    let number = value
        .as_number()
        .or_else(|| value.as_bool().map(|b| if b { 1.0 } else { 0.0 }));

    match slot {
        ReturnSlot::Long(out) => *out = number.ok_or(mismatch)? as i64,
        ReturnSlot::Float(out) => *out = number.ok_or(mismatch)? as f32,
        ReturnSlot::Double(out) => *out = number.ok_or(mismatch)?,
        ReturnSlot::Str(out) => *out = value.as_string().ok_or(mismatch)?.to_string()?,
        ReturnSlot::IntList(out) => *out = Vec::<i32>::from_js(ctx, value)?,
        ReturnSlot::FloatList(out) => *out = Vec::<f32>::from_js(ctx, value)?,
    }
    Ok(())
}
