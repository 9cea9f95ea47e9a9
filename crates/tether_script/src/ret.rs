//! Return-value bindings
//!
//! A script returns values in a handful of transport types. Each native return
//! type names the transport it is received in and how to convert it back:
//! most types transport as themselves, while `bool` and the narrow integers
//! arrive as `i64` and are narrowed after receipt.

/// Typed out-slot the interpreter writes a successful return value into
#[derive(Debug)]
pub enum ReturnSlot<'r> {
    Long(&'r mut i64),
    Float(&'r mut f32),
    Double(&'r mut f64),
    Str(&'r mut String),
    IntList(&'r mut Vec<i32>),
    FloatList(&'r mut Vec<f32>),
}

impl ReturnSlot<'_> {
    /// Name of the expected script-side type, for diagnostics
    pub fn expected(&self) -> &'static str {
        match self {
            ReturnSlot::Long(_) => "integer",
            ReturnSlot::Float(_) | ReturnSlot::Double(_) => "number",
            ReturnSlot::Str(_) => "string",
            ReturnSlot::IntList(_) => "integer array",
            ReturnSlot::FloatList(_) => "number array",
        }
    }
}

/// A type the interpreter can write return values into directly
pub trait Transport: Default {
    fn slot(&mut self) -> ReturnSlot<'_>;
}

macro_rules! impl_transport {
    ($($ty:ty => $variant:ident),+ $(,)?) => {$(
        impl Transport for $ty {
            fn slot(&mut self) -> ReturnSlot<'_> {
                ReturnSlot::$variant(self)
            }
        }
    )+};
}

impl_transport!(
    i64 => Long,
    f32 => Float,
    f64 => Double,
    String => Str,
    Vec<i32> => IntList,
    Vec<f32> => FloatList,
);

/// Maps a native return type onto its transport type.
///
/// Argument lists deliberately have no binding, so they can never be mistaken
/// for a return type.
pub trait ReturnBinding: Sized {
    type Transport: Transport;

    /// Transport value used when the script produces nothing
    fn default_value() -> Self::Transport {
        Self::Transport::default()
    }

    fn convert(value: Self::Transport) -> Self;
}

macro_rules! bind_identity {
    ($($ty:ty),+) => {$(
        impl ReturnBinding for $ty {
            type Transport = $ty;

            fn convert(value: $ty) -> Self {
                value
            }
        }
    )+};
}

macro_rules! bind_narrowed {
    ($($ty:ty),+) => {$(
        impl ReturnBinding for $ty {
            type Transport = i64;

            fn convert(value: i64) -> Self {
                value as $ty
            }
        }
    )+};
}

bind_identity!(i64, f32, f64, String, Vec<i32>, Vec<f32>);
bind_narrowed!(i8, i16, i32, u8, u16, u32);

impl ReturnBinding for bool {
    type Transport = i64;

    fn convert(value: i64) -> Self {
        value != 0
    }
}

/// Result of a plain `call` with a typed return.
///
/// `value` holds the binding default when the call failed.
#[derive(Debug, Clone, PartialEq)]
pub struct CallReturn<R> {
    pub value: R,
    pub succeeded: bool,
}

impl<R> CallReturn<R> {
    pub fn into_value(self) -> R {
        self.value
    }
}

/// Convert a transported discriminant, falling back on unknown values.
#[doc(hidden)]
pub fn convert_enum<E: TryFrom<i64>>(value: i64, fallback: E) -> E {
    E::try_from(value).unwrap_or_else(|_| {
        tracing::warn!(
            value,
            enum_type = std::any::type_name::<E>(),
            "script returned an unknown discriminant, using fallback"
        );
        fallback
    })
}

/// Bind a fieldless enum to the integer transport.
///
/// The enum needs `TryFrom<i64>` for returns; as an argument it lowers to its
/// discriminant.
///
/// ```ignore
/// tether_script::declare_script_enum!(Yield, Yield::None);
/// ```
#[macro_export]
macro_rules! declare_script_enum {
    ($ty:ty, $fallback:expr) => {
        impl $crate::ReturnBinding for $ty {
            type Transport = i64;

            fn convert(value: i64) -> Self {
                $crate::ret::convert_enum::<$ty>(value, $fallback)
            }
        }

        impl<'a> $crate::ScriptArg<'a> for $ty {
            fn lower(self, args: &mut $crate::Args<'a>) {
                args.push($crate::ArgValue::Int(self as i64));
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::StubInterface;
    use crate::Args;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Terrain {
        Plains = 0,
        Hills = 1,
        Ocean = 4,
    }

    impl TryFrom<i64> for Terrain {
        type Error = i64;

        fn try_from(value: i64) -> Result<Self, Self::Error> {
            match value {
                0 => Ok(Terrain::Plains),
                1 => Ok(Terrain::Hills),
                4 => Ok(Terrain::Ocean),
                other => Err(other),
            }
        }
    }

    crate::declare_script_enum!(Terrain, Terrain::Plains);

    fn transport<R: ReturnBinding>(fill: impl FnOnce(ReturnSlot<'_>)) -> R {
        let mut value = R::default_value();
        fill(value.slot());
        R::convert(value)
    }

    #[test]
    fn bool_and_int_narrow_from_long() {
        let truthy: bool = transport(|slot| match slot {
            ReturnSlot::Long(out) => *out = 1,
            other => panic!("wrong slot {other:?}"),
        });
        assert!(truthy);

        let negative: i32 = transport(|slot| match slot {
            ReturnSlot::Long(out) => *out = -5,
            other => panic!("wrong slot {other:?}"),
        });
        assert_eq!(negative, -5);
    }

    #[test]
    fn defaults_are_zeroed_transports() {
        assert_eq!(bool::default_value(), 0);
        assert_eq!(String::default_value(), "");
        assert!(!bool::convert(bool::default_value()));
    }

    #[test]
    fn strings_transport_as_themselves() {
        let name: String = transport(|slot| match slot {
            ReturnSlot::Str(out) => out.push_str("Babylon"),
            other => panic!("wrong slot {other:?}"),
        });
        assert_eq!(name, "Babylon");
    }

    #[test]
    fn enums_fall_back_on_unknown_discriminants() {
        assert_eq!(Terrain::convert(4), Terrain::Ocean);
        assert_eq!(Terrain::convert(1), Terrain::Hills);
        assert_eq!(Terrain::convert(99), Terrain::Plains);
    }

    #[test]
    fn enums_lower_to_their_discriminant() {
        let iface = StubInterface::new();
        let args = Args::new(&iface).with(Terrain::Ocean);
        assert_eq!(args.values(), &[crate::ArgValue::Int(4)]);
    }
}
