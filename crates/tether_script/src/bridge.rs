//! Typed call dispatch into script functions
//!
//! Three call modes, each with and without arguments and with and without a
//! typed return:
//!
//! - `call*`: the function must exist and succeed; failures go through the
//!   assertion path
//! - `call_optional*`: absence is fine; reports success as `bool`
//! - `call_override*`: succeeds only if the script really overrode the hook
//!   rather than running its default implementation

use crate::args::{ArgValue, Args};
use crate::config::{AssertPolicy, BridgeConfig};
use crate::interface::ScriptInterface;
use crate::ret::{CallReturn, ReturnBinding, ReturnSlot, Transport};
use crate::stack::{self, StackFrame};
use std::cell::RefCell;
use std::fmt;
use tether_metrics::{CallOutcome, CallStats, TargetStats};

/// A plain `call` that the interpreter could not complete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFailure {
    pub module: String,
    pub function: String,
    /// Empty unless stack capture is enabled
    pub stack: Vec<StackFrame>,
}

impl fmt::Display for CallFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.function)
    }
}

type AssertHandler = Box<dyn Fn(&CallFailure)>;

/// Native entry point for calling script functions
pub struct ScriptBridge<I> {
    iface: I,
    config: BridgeConfig,
    assert_handler: Option<AssertHandler>,
    stats: RefCell<CallStats>,
}

impl<I: ScriptInterface> ScriptBridge<I> {
    pub fn new(iface: I) -> Self {
        Self::with_config(iface, BridgeConfig::default())
    }

    pub fn with_config(iface: I, config: BridgeConfig) -> Self {
        Self {
            iface,
            config,
            assert_handler: None,
            stats: RefCell::new(CallStats::new()),
        }
    }

    /// Replace the assertion policy with a custom handler for failed calls.
    pub fn set_assert_handler(&mut self, handler: impl Fn(&CallFailure) + 'static) {
        self.assert_handler = Some(Box::new(handler));
    }

    pub fn interface(&self) -> &I {
        &self.iface
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Start an argument list bound to this bridge's interpreter.
    pub fn args(&self) -> Args<'_> {
        Args::new(&self.iface)
    }

    /// Fresh snapshot of the interpreter stack, innermost frame first.
    pub fn stack_trace(&self) -> Vec<StackFrame> {
        self.iface.stack_trace()
    }

    /// Statistics for one target (zeroed without the `metrics` feature).
    pub fn target_stats(&self, module: &str, function: &str) -> TargetStats {
        self.stats.borrow().get(&format!("{module}.{function}"))
    }

    pub fn total_stats(&self) -> TargetStats {
        self.stats.borrow().totals()
    }

    // NO RETURN VALUE, NO ARGUMENTS ==========================================

    /// Invoke a required function. Returns whether it succeeded; a failure
    /// has already gone through the assertion path.
    pub fn call(&self, module: &str, function: &str) -> bool {
        self.call_inner(module, function, &[])
    }

    /// Invoke a function whose absence is tolerated.
    pub fn call_optional(&self, module: &str, function: &str) -> bool {
        self.dispatch(module, function, &[], None) != CallOutcome::Failed
    }

    /// True only if the script actually overrode the hook.
    pub fn call_override(&self, module: &str, function: &str) -> bool {
        self.dispatch(module, function, &[], None) == CallOutcome::Succeeded
    }

    // RETURN VALUE, NO ARGUMENTS =============================================

    pub fn call_returning<R: ReturnBinding>(&self, module: &str, function: &str) -> CallReturn<R> {
        self.call_returning_inner(module, function, &[])
    }

    /// On success writes the result to `rval`; on failure leaves it untouched.
    pub fn call_optional_returning<R: ReturnBinding>(
        &self,
        module: &str,
        function: &str,
        rval: &mut R,
    ) -> bool {
        self.optional_inner(module, function, &[], rval)
    }

    /// Writes `rval` only when the script overrode the hook.
    pub fn call_override_returning<R: ReturnBinding>(
        &self,
        module: &str,
        function: &str,
        rval: &mut R,
    ) -> bool {
        self.override_inner(module, function, &[], rval)
    }

    // NO RETURN VALUE, ARGUMENTS =============================================

    pub fn call_with(&self, module: &str, function: &str, args: &Args<'_>) -> bool {
        self.call_inner(module, function, args.values())
    }

    pub fn call_optional_with(&self, module: &str, function: &str, args: &Args<'_>) -> bool {
        self.dispatch(module, function, args.values(), None) != CallOutcome::Failed
    }

    pub fn call_override_with(&self, module: &str, function: &str, args: &Args<'_>) -> bool {
        self.dispatch(module, function, args.values(), None) == CallOutcome::Succeeded
    }

    // RETURN VALUE, ARGUMENTS ================================================

    pub fn call_with_returning<R: ReturnBinding>(
        &self,
        module: &str,
        function: &str,
        args: &Args<'_>,
    ) -> CallReturn<R> {
        self.call_returning_inner(module, function, args.values())
    }

    pub fn call_optional_with_returning<R: ReturnBinding>(
        &self,
        module: &str,
        function: &str,
        args: &Args<'_>,
        rval: &mut R,
    ) -> bool {
        self.optional_inner(module, function, args.values(), rval)
    }

    pub fn call_override_with_returning<R: ReturnBinding>(
        &self,
        module: &str,
        function: &str,
        args: &Args<'_>,
        rval: &mut R,
    ) -> bool {
        self.override_inner(module, function, args.values(), rval)
    }

    // ========================================================================

    fn call_inner(&self, module: &str, function: &str, args: &[ArgValue<'_>]) -> bool {
        let succeeded = self.dispatch(module, function, args, None) != CallOutcome::Failed;
        if !succeeded {
            self.fail(module, function);
        }
        succeeded
    }

    fn call_returning_inner<R: ReturnBinding>(
        &self,
        module: &str,
        function: &str,
        args: &[ArgValue<'_>],
    ) -> CallReturn<R> {
        let mut transport = R::default_value();
        let succeeded =
            self.dispatch(module, function, args, Some(transport.slot())) != CallOutcome::Failed;
        if !succeeded {
            self.fail(module, function);
        }
        CallReturn {
            value: R::convert(transport),
            succeeded,
        }
    }

    fn optional_inner<R: ReturnBinding>(
        &self,
        module: &str,
        function: &str,
        args: &[ArgValue<'_>],
        rval: &mut R,
    ) -> bool {
        let mut transport = R::default_value();
        if self.dispatch(module, function, args, Some(transport.slot())) == CallOutcome::Failed {
            return false;
        }
        *rval = R::convert(transport);
        true
    }

    fn override_inner<R: ReturnBinding>(
        &self,
        module: &str,
        function: &str,
        args: &[ArgValue<'_>],
        rval: &mut R,
    ) -> bool {
        let mut transport = R::default_value();
        if self.dispatch(module, function, args, Some(transport.slot())) != CallOutcome::Succeeded {
            return false;
        }
        *rval = R::convert(transport);
        true
    }

    fn dispatch(
        &self,
        module: &str,
        function: &str,
        args: &[ArgValue<'_>],
        rval: Option<ReturnSlot<'_>>,
    ) -> CallOutcome {
        #[cfg(feature = "metrics")]
        let start = std::time::Instant::now();

        let outcome = if !self.iface.call_function(module, function, args, rval) {
            CallOutcome::Failed
        } else if self.iface.using_default_impl() {
            CallOutcome::Defaulted
        } else {
            CallOutcome::Succeeded
        };

        if self.config.log_calls {
            tracing::debug!(module, function, args = args.len(), ?outcome, "script call");
        }

        #[cfg(feature = "metrics")]
        self.stats
            .borrow_mut()
            .record(&format!("{module}.{function}"), outcome, start.elapsed());

        outcome
    }

    fn fail(&self, module: &str, function: &str) {
        let stack = if self.config.capture_stack_on_failure {
            self.iface.stack_trace()
        } else {
            Vec::new()
        };
        let failure = CallFailure {
            module: module.to_string(),
            function: function.to_string(),
            stack,
        };

        tracing::error!(
            call = %failure,
            traceback = %stack::format_trace(&failure.stack),
            "script call failed"
        );

        if let Some(handler) = &self.assert_handler {
            handler(&failure);
            return;
        }
        match self.config.assert_policy {
            AssertPolicy::Panic => panic!("script call failed: {failure}"),
            AssertPolicy::Log => {}
        }
    }
}

impl<I: fmt::Debug> fmt::Debug for ScriptBridge<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptBridge")
            .field("iface", &self.iface)
            .field("config", &self.config)
            .field("assert_handler", &self.assert_handler.is_some())
            .finish()
    }
}
