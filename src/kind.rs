//! Numeric element kinds carried by sockets.
//!
//! The set of kinds is closed: six primitive types, one [`FrameData`] variant
//! each. Code that has to work on "whatever kind this socket holds" goes
//! through [`with_element_kind!`], which monomorphizes its body once per kind.

use crate::error::ContractViolation;
use std::fmt;
use std::str::FromStr;

/// Element kind of a socket, fixed for the socket's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementKind {
    /// 8-bit signed integer.
    I8,
    /// 16-bit signed integer.
    I16,
    /// 32-bit signed integer.
    I32,
    /// 64-bit signed integer.
    I64,
    /// Single precision float.
    F32,
    /// Double precision float.
    F64,
}

impl ElementKind {
    /// Every supported kind, in declaration order.
    pub const ALL: [ElementKind; 6] = [
        ElementKind::I8,
        ElementKind::I16,
        ElementKind::I32,
        ElementKind::I64,
        ElementKind::F32,
        ElementKind::F64,
    ];

    /// Size in bytes of one element.
    pub const fn size(self) -> usize {
        match self {
            ElementKind::I8 => 1,
            ElementKind::I16 => 2,
            ElementKind::I32 | ElementKind::F32 => 4,
            ElementKind::I64 | ElementKind::F64 => 8,
        }
    }

    /// Canonical name, as accepted by [`FromStr`].
    pub const fn name(self) -> &'static str {
        match self {
            ElementKind::I8 => "int8",
            ElementKind::I16 => "int16",
            ElementKind::I32 => "int32",
            ElementKind::I64 => "int64",
            ElementKind::F32 => "float",
            ElementKind::F64 => "double",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ElementKind {
    type Err = ContractViolation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "int8" | "i8" => Ok(ElementKind::I8),
            "int16" | "i16" => Ok(ElementKind::I16),
            "int32" | "i32" => Ok(ElementKind::I32),
            "int64" | "i64" => Ok(ElementKind::I64),
            "float" | "f32" => Ok(ElementKind::F32),
            "double" | "f64" => Ok(ElementKind::F64),
            other => Err(ContractViolation::UnsupportedKind(other.to_string())),
        }
    }
}

impl TryFrom<&str> for ElementKind {
    type Error = ContractViolation;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Run `$body` with `$T` aliased to the Rust type matching `$kind`.
///
/// ```
/// use commchain::{with_element_kind, Element, ElementKind};
///
/// let kind = ElementKind::I16;
/// let bytes = with_element_kind!(kind, T => std::mem::size_of::<T>());
/// assert_eq!(bytes, kind.size());
/// ```
#[macro_export]
macro_rules! with_element_kind {
    ($kind:expr, $T:ident => $body:expr) => {
        match $kind {
            $crate::ElementKind::I8 => {
                type $T = i8;
                $body
            }
            $crate::ElementKind::I16 => {
                type $T = i16;
                $body
            }
            $crate::ElementKind::I32 => {
                type $T = i32;
                $body
            }
            $crate::ElementKind::I64 => {
                type $T = i64;
                $body
            }
            $crate::ElementKind::F32 => {
                type $T = f32;
                $body
            }
            $crate::ElementKind::F64 => {
                type $T = f64;
                $body
            }
        }
    };
}

/// A Rust type that can travel through a socket.
///
/// Implemented for exactly the six types of [`ElementKind`]; it is not meant
/// to be implemented downstream.
pub trait Element: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Kind tag for this type.
    const KIND: ElementKind;

    /// Move a vector into the matching [`FrameData`] variant.
    fn wrap(data: Vec<Self>) -> FrameData;

    /// Borrow the elements if `data` holds this type.
    fn view(data: &FrameData) -> Option<&[Self]>;

    /// Mutably borrow the elements if `data` holds this type.
    fn view_mut(data: &mut FrameData) -> Option<&mut [Self]>;

    /// Deterministic value for position `i` (wraps for narrow integers).
    fn from_index(i: usize) -> Self;

    /// Append the native-endian bytes of `self`.
    fn extend_ne_bytes(self, out: &mut Vec<u8>);
}

macro_rules! impl_element {
    ($ty:ty, $variant:ident) => {
        impl Element for $ty {
            const KIND: ElementKind = ElementKind::$variant;

            fn wrap(data: Vec<Self>) -> FrameData {
                FrameData::$variant(data)
            }

            fn view(data: &FrameData) -> Option<&[Self]> {
                match data {
                    FrameData::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn view_mut(data: &mut FrameData) -> Option<&mut [Self]> {
                match data {
                    FrameData::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn from_index(i: usize) -> Self {
                i as $ty
            }

            fn extend_ne_bytes(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_ne_bytes());
            }
        }
    };
}

impl_element!(i8, I8);
impl_element!(i16, I16);
impl_element!(i32, I32);
impl_element!(i64, I64);
impl_element!(f32, F32);
impl_element!(f64, F64);

/// Typed storage behind a socket or a ring slot.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameData {
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl FrameData {
    /// Zero-filled storage of `len` elements.
    pub fn zeroed(kind: ElementKind, len: usize) -> Self {
        with_element_kind!(kind, T => T::wrap(vec![T::default(); len]))
    }

    /// Element kind held.
    pub fn kind(&self) -> ElementKind {
        match self {
            FrameData::I8(_) => ElementKind::I8,
            FrameData::I16(_) => ElementKind::I16,
            FrameData::I32(_) => ElementKind::I32,
            FrameData::I64(_) => ElementKind::I64,
            FrameData::F32(_) => ElementKind::F32,
            FrameData::F64(_) => ElementKind::F64,
        }
    }

    /// Number of elements held.
    pub fn len(&self) -> usize {
        with_element_kind!(self.kind(), T => T::view(self).map_or(0, <[T]>::len))
    }

    /// True when no element is held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Typed view. Fails unless `T` matches the held kind.
    pub fn as_slice<T: Element>(&self) -> Result<&[T], ContractViolation> {
        T::view(self).ok_or(ContractViolation::KindMismatch {
            expected: T::KIND,
            found: self.kind(),
        })
    }

    /// Typed mutable view. Fails unless `T` matches the held kind.
    pub fn as_mut_slice<T: Element>(&mut self) -> Result<&mut [T], ContractViolation> {
        let found = self.kind();
        T::view_mut(self).ok_or(ContractViolation::KindMismatch {
            expected: T::KIND,
            found,
        })
    }

    /// Overwrite `self` element-wise with `src`. Both sides must agree on kind
    /// and length.
    pub fn copy_from(&mut self, src: &FrameData) -> Result<(), ContractViolation> {
        with_element_kind!(self.kind(), T => {
            let from = src.as_slice::<T>()?;
            let to = self.as_mut_slice::<T>()?;
            if from.len() != to.len() {
                return Err(ContractViolation::BindMismatch {
                    dst: "frame".to_string(),
                    src: "frame".to_string(),
                    reason: "element counts differ",
                });
            }
            to.copy_from_slice(from);
            Ok(())
        })
    }

    /// Native-endian byte image, for byte-level comparisons.
    pub fn to_ne_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len() * self.kind().size());
        with_element_kind!(self.kind(), T => {
            if let Some(values) = T::view(self) {
                for &v in values {
                    v.extend_ne_bytes(&mut out);
                }
            }
        });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_round_trip() {
        for kind in ElementKind::ALL {
            assert_eq!(kind.name().parse::<ElementKind>().unwrap(), kind);
        }
        assert_eq!(ElementKind::try_from("f64").unwrap(), ElementKind::F64);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert_eq!(
            "complex64".parse::<ElementKind>(),
            Err(ContractViolation::UnsupportedKind("complex64".to_string()))
        );
    }

    #[test]
    fn zeroed_matches_kind_and_size() {
        for kind in ElementKind::ALL {
            let data = FrameData::zeroed(kind, 6);
            assert_eq!(data.kind(), kind);
            assert_eq!(data.len(), 6);
            assert_eq!(data.to_ne_bytes().len(), 6 * kind.size());
            assert!(data.to_ne_bytes().iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn typed_view_rejects_wrong_kind() {
        let data = FrameData::zeroed(ElementKind::I32, 4);
        assert!(data.as_slice::<i32>().is_ok());
        assert_eq!(
            data.as_slice::<f32>().unwrap_err(),
            ContractViolation::KindMismatch {
                expected: ElementKind::F32,
                found: ElementKind::I32,
            }
        );
    }

    #[test]
    fn copy_from_checks_geometry() {
        let mut dst = FrameData::zeroed(ElementKind::F64, 3);
        let src = FrameData::F64(vec![1.5, -2.0, 3.25]);
        dst.copy_from(&src).unwrap();
        assert_eq!(dst, src);

        let short = FrameData::F64(vec![1.0]);
        assert!(dst.copy_from(&short).is_err());
        let other = FrameData::I64(vec![1, 2, 3]);
        assert!(dst.copy_from(&other).is_err());
    }

    #[test]
    fn from_index_wraps_narrow_integers() {
        assert_eq!(i8::from_index(130), 130usize as i8);
        assert_eq!(f32::from_index(7), 7.0);
    }
}
