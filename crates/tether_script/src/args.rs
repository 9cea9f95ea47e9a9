//! Argument lists for script calls
//!
//! Values are lowered by static type through [`ScriptArg`]:
//! - scalars are copied in
//! - [`Array`] and ordered sequences are borrowed as (pointer, length)
//! - native objects are boxed and replaced by their proxy handle
//!
//! A type without a `ScriptArg` impl cannot be passed at all, so unsupported
//! arguments are rejected at build time.

use crate::ffi::{BoxedObject, ObjectHandle, ScriptObject};
use crate::interface::ScriptInterface;
use std::ops::Shl;

/// A value in the interpreter's call-argument representation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArgValue<'a> {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(&'a str),
    Array(ArrayArg<'a>),
    Object(ObjectHandle),
}

/// Borrowed (pointer, length) view over a primitive buffer.
///
/// The null state stands for an empty ordered sequence, which has no first
/// element to point at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawArray<'a, T> {
    data: Option<&'a [T]>,
}

impl<'a, T> RawArray<'a, T> {
    pub fn null() -> Self {
        Self { data: None }
    }

    /// View over an explicit buffer, kept as-is even when empty.
    pub fn from_slice(data: &'a [T]) -> Self {
        Self { data: Some(data) }
    }

    /// View over an ordered sequence; empty sequences lower to null.
    pub fn from_sequence(data: &'a [T]) -> Self {
        if data.is_empty() {
            Self::null()
        } else {
            Self::from_slice(data)
        }
    }

    pub fn as_ptr(&self) -> *const T {
        self.data.map_or(std::ptr::null(), <[T]>::as_ptr)
    }

    pub fn len(&self) -> usize {
        self.data.map_or(0, <[T]>::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_null(&self) -> bool {
        self.data.is_none()
    }

    pub fn as_slice(&self) -> &'a [T] {
        self.data.unwrap_or(&[])
    }
}

/// Typed primitive array argument
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArrayArg<'a> {
    Bool(RawArray<'a, bool>),
    Byte(RawArray<'a, u8>),
    Int(RawArray<'a, i32>),
    Long(RawArray<'a, i64>),
    Float(RawArray<'a, f32>),
    Double(RawArray<'a, f64>),
}

impl ArrayArg<'_> {
    pub fn len(&self) -> usize {
        match self {
            ArrayArg::Bool(a) => a.len(),
            ArrayArg::Byte(a) => a.len(),
            ArrayArg::Int(a) => a.len(),
            ArrayArg::Long(a) => a.len(),
            ArrayArg::Float(a) => a.len(),
            ArrayArg::Double(a) => a.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_null(&self) -> bool {
        match self {
            ArrayArg::Bool(a) => a.is_null(),
            ArrayArg::Byte(a) => a.is_null(),
            ArrayArg::Int(a) => a.is_null(),
            ArrayArg::Long(a) => a.is_null(),
            ArrayArg::Float(a) => a.is_null(),
            ArrayArg::Double(a) => a.is_null(),
        }
    }
}

/// Primitive element types that can be passed as arrays
pub trait ArrayElement: Sized {
    fn lower_array(array: RawArray<'_, Self>) -> ArrayArg<'_>;
}

macro_rules! impl_array_element {
    ($($ty:ty => $variant:ident),+ $(,)?) => {$(
        impl ArrayElement for $ty {
            fn lower_array(array: RawArray<'_, Self>) -> ArrayArg<'_> {
                ArrayArg::$variant(array)
            }
        }
    )+};
}

impl_array_element!(
    bool => Bool,
    u8 => Byte,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
);

/// Fixed-length buffer argument, passed without copying
#[derive(Debug, Clone, Copy)]
pub struct Array<'a, T> {
    vals: &'a [T],
}

impl<'a, T> Array<'a, T> {
    pub fn new(vals: &'a [T]) -> Self {
        Self { vals }
    }

    pub fn len(&self) -> usize {
        self.vals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vals.is_empty()
    }
}

/// Per-type lowering strategy into an [`Args`] list
pub trait ScriptArg<'a> {
    fn lower(self, args: &mut Args<'a>);
}

macro_rules! impl_scalar_arg {
    ($variant:ident($wide:ty): $($ty:ty),+) => {$(
        impl<'a> ScriptArg<'a> for $ty {
            fn lower(self, args: &mut Args<'a>) {
                args.push(ArgValue::$variant(<$wide>::from(self)));
            }
        }
    )+};
}

impl_scalar_arg!(Bool(bool): bool);
impl_scalar_arg!(Int(i64): i8, i16, i32, i64, u8, u16, u32);
impl_scalar_arg!(Float(f64): f32, f64);

impl<'a> ScriptArg<'a> for &'a str {
    fn lower(self, args: &mut Args<'a>) {
        args.push(ArgValue::Str(self));
    }
}

impl<'a> ScriptArg<'a> for &'a String {
    fn lower(self, args: &mut Args<'a>) {
        args.push(ArgValue::Str(self.as_str()));
    }
}

impl<'a, T: ArrayElement> ScriptArg<'a> for Array<'a, T> {
    fn lower(self, args: &mut Args<'a>) {
        args.push(ArgValue::Array(T::lower_array(RawArray::from_slice(self.vals))));
    }
}

impl<'a, T: ArrayElement> ScriptArg<'a> for &'a [T] {
    fn lower(self, args: &mut Args<'a>) {
        args.push(ArgValue::Array(T::lower_array(RawArray::from_sequence(self))));
    }
}

impl<'a, T: ArrayElement> ScriptArg<'a> for &'a Vec<T> {
    fn lower(self, args: &mut Args<'a>) {
        self.as_slice().lower(args);
    }
}

/// Arguments for one script call.
///
/// Boxed native objects live exactly as long as the list and are released in
/// reverse creation order when it drops. Calls borrow the list immutably, so
/// nothing can be appended once it has been submitted.
pub struct Args<'a> {
    iface: &'a dyn ScriptInterface,
    values: Vec<ArgValue<'a>>,
    wrapped: Vec<BoxedObject<'a>>,
}

impl<'a> Args<'a> {
    pub fn new(iface: &'a dyn ScriptInterface) -> Self {
        Self {
            iface,
            values: Vec::new(),
            wrapped: Vec::new(),
        }
    }

    pub fn add<T: ScriptArg<'a>>(&mut self, value: T) -> &mut Self {
        value.lower(self);
        self
    }

    /// Owned variant of [`add`](Self::add) for building a list in one expression.
    pub fn with<T: ScriptArg<'a>>(mut self, value: T) -> Self {
        value.lower(&mut self);
        self
    }

    /// Box `object`, create its proxy and append the proxy handle.
    pub fn add_wrapped<T: ScriptObject>(&mut self, object: T) -> &mut Self {
        let boxed = BoxedObject::new(Box::new(object), self.iface);
        self.values.push(ArgValue::Object(boxed.handle()));
        self.wrapped.push(boxed);
        self
    }

    /// Append an already lowered value.
    pub fn push(&mut self, value: ArgValue<'a>) {
        self.values.push(value);
    }

    /// Lowered values in call-signature order
    pub fn values(&self) -> &[ArgValue<'a>] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn wrapped(&self) -> &[BoxedObject<'a>] {
        &self.wrapped
    }
}

impl Drop for Args<'_> {
    fn drop(&mut self) {
        while let Some(boxed) = self.wrapped.pop() {
            drop(boxed);
        }
    }
}

impl<'a, T: ScriptArg<'a>> Shl<T> for Args<'a> {
    type Output = Args<'a>;

    fn shl(self, value: T) -> Self::Output {
        self.with(value)
    }
}

impl std::fmt::Debug for Args<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args")
            .field("values", &self.values)
            .field("wrapped", &self.wrapped)
            .finish()
    }
}

/// Build an argument list in one go.
///
/// ```ignore
/// let args = script_args!(bridge.interface(); turn, &city, &scores);
/// bridge.call_with("GameHooks", "onTurn", &args);
/// ```
#[macro_export]
macro_rules! script_args {
    ($iface:expr $(; $($arg:expr),* $(,)?)?) => {{
        #[allow(unused_mut)]
        let mut args = $crate::Args::new($iface);
        $($(args.add($arg);)*)?
        args
    }};
}
