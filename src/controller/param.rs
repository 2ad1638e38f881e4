//! Positional route parameters.

use std::fmt;

use crate::DispatchError;
use crate::router::PathParams;

/// The two parameter types an action may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    String,
    Integer,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
        })
    }
}

/// A type an action can take as a positional path parameter.
///
/// Implemented for [`String`] and the primitive integers only, so an action whose
/// signature names any other type does not compile.
pub trait RouteParam: Sized + Send + 'static {
    const KIND: ParamKind;

    /// Value used when the matched route has fewer captures than the action has
    /// parameters.
    fn missing() -> Self;

    /// Parse a captured segment. `None` means the segment is not a valid value.
    fn from_segment(raw: &str) -> Option<Self>;
}

impl RouteParam for String {
    const KIND: ParamKind = ParamKind::String;

    fn missing() -> Self {
        String::new()
    }

    fn from_segment(raw: &str) -> Option<Self> {
        Some(raw.to_owned())
    }
}

macro_rules! integer_params {
    ($($ty:ty),* $(,)?) => {
        $(
            impl RouteParam for $ty {
                const KIND: ParamKind = ParamKind::Integer;

                fn missing() -> Self {
                    1
                }

                fn from_segment(raw: &str) -> Option<Self> {
                    raw.parse().ok()
                }
            }
        )*
    };
}

integer_params!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

/// Coerce the capture at `index` into `P`.
pub(crate) fn extract<P: RouteParam>(params: &PathParams, index: usize) -> Result<P, DispatchError> {
    match params.get_index(index) {
        None => Ok(P::missing()),
        Some(raw) => P::from_segment(raw).ok_or_else(|| DispatchError::InvalidParam {
            position: index + 1,
            value: raw.to_owned(),
            kind: P::KIND,
        }),
    }
}
