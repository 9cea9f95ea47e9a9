//! FFI layer between native code and scripts
//!
//! Handle-based access to native objects from the script side. Native values
//! are never handed to the interpreter directly: each one is boxed, the
//! interpreter builds a proxy for the box, and only the proxy's handle travels
//! in the argument list.

use crate::interface::ScriptInterface;
use serde::Serialize;

/// Opaque handle to an interpreter-side proxy object
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ObjectHandle(pub u64);

impl ObjectHandle {
    /// Returned when the interpreter could not build a proxy
    pub const NULL: ObjectHandle = ObjectHandle(0);

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

/// A native type the interpreter can proxy.
///
/// Usually implemented through [`declare_script_object!`](crate::declare_script_object).
pub trait ScriptObject: 'static {
    /// Type tag exposed to scripts
    fn type_name(&self) -> &'static str;

    /// Snapshot of the object's fields for the proxy
    fn to_script_value(&self) -> serde_json::Value;
}

/// Boxed copy of a native object plus the proxy created for it.
///
/// Owned by the argument list that created it. Dropping it hands the proxy
/// back to the interpreter before the native copy is freed.
pub struct BoxedObject<'a> {
    object: Box<dyn ScriptObject>,
    handle: ObjectHandle,
    iface: &'a dyn ScriptInterface,
}

impl<'a> BoxedObject<'a> {
    /// Box `object` and create its proxy immediately.
    pub(crate) fn new(object: Box<dyn ScriptObject>, iface: &'a dyn ScriptInterface) -> Self {
        let handle = iface.make_object(object.as_ref());
        Self {
            object,
            handle,
            iface,
        }
    }

    pub fn handle(&self) -> ObjectHandle {
        self.handle
    }

    pub fn object(&self) -> &dyn ScriptObject {
        self.object.as_ref()
    }
}

impl Drop for BoxedObject<'_> {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            self.iface.release_object(self.handle);
        }
    }
}

impl std::fmt::Debug for BoxedObject<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxedObject")
            .field("type", &self.object.type_name())
            .field("handle", &self.handle)
            .finish()
    }
}

/// Serialize a native object for its proxy; used by the declaration macros.
#[doc(hidden)]
pub fn serialize_object<T: Serialize>(object: &T, type_name: &'static str) -> serde_json::Value {
    serde_json::to_value(object).unwrap_or_else(|err| {
        tracing::warn!(type_name, error = %err, "failed to serialize native object for script");
        serde_json::Value::Null
    })
}

/// Register native types that are passed to scripts as boxed copies.
///
/// Each type must be `Clone + Serialize + 'static`. Both `T` and `&T` become
/// valid arguments.
///
/// ```ignore
/// #[derive(Clone, Serialize)]
/// struct CityInfo { name: String, population: u32 }
///
/// tether_script::declare_script_object!(CityInfo);
/// ```
#[macro_export]
macro_rules! declare_script_object {
    ($($ty:ty),+ $(,)?) => {$(
        impl $crate::ScriptObject for $ty {
            fn type_name(&self) -> &'static str {
                stringify!($ty)
            }

            fn to_script_value(&self) -> $crate::serde_json::Value {
                $crate::ffi::serialize_object(self, stringify!($ty))
            }
        }

        impl<'a> $crate::ScriptArg<'a> for $ty {
            fn lower(self, args: &mut $crate::Args<'a>) {
                args.add_wrapped(self);
            }
        }

        impl<'a> $crate::ScriptArg<'a> for &'a $ty {
            fn lower(self, args: &mut $crate::Args<'a>) {
                args.add_wrapped(::std::clone::Clone::clone(self));
            }
        }
    )+};
}

/// Register a native type that reaches scripts through a wrapper type.
///
/// `$wrapper` must implement [`ScriptObject`] and `From<&$class>`; the
/// wrapper, not the class, is boxed. Both `$class` and `&$class` become valid
/// arguments.
#[macro_export]
macro_rules! declare_script_wrapper {
    ($wrapper:ty, $class:ty) => {
        impl<'a> $crate::ScriptArg<'a> for $class {
            fn lower(self, args: &mut $crate::Args<'a>) {
                args.add_wrapped(<$wrapper as ::std::convert::From<&$class>>::from(&self));
            }
        }

        impl<'a> $crate::ScriptArg<'a> for &'a $class {
            fn lower(self, args: &mut $crate::Args<'a>) {
                args.add_wrapped(<$wrapper as ::std::convert::From<&$class>>::from(self));
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::StubInterface;
    use crate::Args;

    struct Unit {
        id: u32,
        moves: u8,
    }

    struct UnitView {
        id: u32,
    }

    impl From<&Unit> for UnitView {
        fn from(unit: &Unit) -> Self {
            Self { id: unit.id }
        }
    }

    impl ScriptObject for UnitView {
        fn type_name(&self) -> &'static str {
            "UnitView"
        }

        fn to_script_value(&self) -> serde_json::Value {
            serde_json::json!({ "id": self.id })
        }
    }

    crate::declare_script_wrapper!(UnitView, Unit);

    #[test]
    fn wrapped_classes_pass_by_value_and_by_reference() {
        let iface = StubInterface::new();
        let scout = Unit { id: 7, moves: 2 };
        let args = Args::new(&iface)
            .with(Unit { id: 3, moves: 1 })
            .with(&scout);

        assert_eq!(iface.proxies_created(), 2);
        let ids: Vec<_> = args
            .wrapped()
            .iter()
            .map(|boxed| (boxed.object().type_name(), boxed.object().to_script_value()))
            .collect();
        assert_eq!(
            ids,
            vec![
                ("UnitView", serde_json::json!({ "id": 3 })),
                ("UnitView", serde_json::json!({ "id": 7 })),
            ]
        );
        assert_eq!(scout.moves, 2);
    }

    #[test]
    fn null_handles_are_not_released() {
        let iface = StubInterface::new();
        let boxed = BoxedObject {
            object: Box::new(UnitView { id: 1 }),
            handle: ObjectHandle::NULL,
            iface: &iface,
        };
        drop(boxed);
        assert!(iface.released().is_empty());
    }
}
