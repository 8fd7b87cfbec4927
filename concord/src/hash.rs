//! 32-bit hash codes for shard selection and ring placement.
//!
//! [`HashCode`] is the single capability both [`crate::map::ShardedMap`] and
//! [`crate::ring::HashRing`] dispatch on:
//!
//! - strings and byte slices: CRC-32 (IEEE) of their bytes
//! - integers: the value itself, sign-extended or truncated to 32 bits
//! - floats: truncated toward zero, then treated as an integer
//! - your own types: implement the trait, or `#[derive(HashCode)]`
//!
//! Types without a natural hash can fall back to [`hash_debug`], which
//! checksums the `Debug` rendering. It always succeeds but two values that
//! render identically collide.

use std::borrow::Cow;
use std::fmt::{self, Write as _};
use std::rc::Rc;
use std::sync::Arc;

#[doc(inline)]
pub use concord_derive::HashCode;

/// Produces the 32-bit hash used for placement.
///
/// Implementations must be deterministic for the lifetime of the process and
/// must agree with `Eq`: equal values return equal codes. If `K: Borrow<Q>`
/// is used for lookups, `K` and `Q` must return the same code.
pub trait HashCode {
    fn hash_code(&self) -> u32;
}

/// CRC-32 (IEEE) checksum of `bytes`.
#[inline]
#[must_use]
pub fn checksum(bytes: &[u8]) -> u32 {
    crc32fast::hash(bytes)
}

/// Fallback hash: CRC-32 of the value's `Debug` rendering.
#[must_use]
pub fn hash_debug<T: fmt::Debug + ?Sized>(value: &T) -> u32 {
    let mut hasher = ChecksumWriter(crc32fast::Hasher::new());
    // Writing into a hasher cannot fail; a Debug impl that errors just ends early.
    let _ = write!(hasher, "{value:?}");
    hasher.0.finalize()
}

struct ChecksumWriter(crc32fast::Hasher);

impl fmt::Write for ChecksumWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.update(s.as_bytes());
        Ok(())
    }
}

/// Maps a hash code onto one of 256 shards.
#[inline]
#[must_use]
pub const fn fold_to_byte(code: u32) -> u8 {
    (code & 0xFF) as u8
}

macro_rules! impl_integer {
    ($($t:ty),* $(,)?) => {
        $(
            impl HashCode for $t {
                #[inline]
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                fn hash_code(&self) -> u32 {
                    *self as u32
                }
            }
        )*
    };
}

impl_integer!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);

macro_rules! impl_float {
    ($($t:ty),* $(,)?) => {
        $(
            impl HashCode for $t {
                #[inline]
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                fn hash_code(&self) -> u32 {
                    (self.trunc() as i64) as u32
                }
            }
        )*
    };
}

impl_float!(f32, f64);

impl HashCode for bool {
    #[inline]
    fn hash_code(&self) -> u32 {
        u32::from(*self)
    }
}

impl HashCode for char {
    #[inline]
    fn hash_code(&self) -> u32 {
        u32::from(*self)
    }
}

impl HashCode for str {
    #[inline]
    fn hash_code(&self) -> u32 {
        checksum(self.as_bytes())
    }
}

impl HashCode for String {
    #[inline]
    fn hash_code(&self) -> u32 {
        checksum(self.as_bytes())
    }
}

impl HashCode for [u8] {
    #[inline]
    fn hash_code(&self) -> u32 {
        checksum(self)
    }
}

impl HashCode for Vec<u8> {
    #[inline]
    fn hash_code(&self) -> u32 {
        checksum(self)
    }
}

impl<const N: usize> HashCode for [u8; N] {
    #[inline]
    fn hash_code(&self) -> u32 {
        checksum(self)
    }
}

impl HashCode for Cow<'_, str> {
    #[inline]
    fn hash_code(&self) -> u32 {
        checksum(self.as_bytes())
    }
}

impl<T: HashCode + ?Sized> HashCode for &T {
    #[inline]
    fn hash_code(&self) -> u32 {
        (**self).hash_code()
    }
}

impl<T: HashCode + ?Sized> HashCode for Box<T> {
    #[inline]
    fn hash_code(&self) -> u32 {
        (**self).hash_code()
    }
}

impl<T: HashCode + ?Sized> HashCode for Arc<T> {
    #[inline]
    fn hash_code(&self) -> u32 {
        (**self).hash_code()
    }
}

impl<T: HashCode + ?Sized> HashCode for Rc<T> {
    #[inline]
    fn hash_code(&self) -> u32 {
        (**self).hash_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_matches_crc32_ieee() {
        // Standard CRC-32 check value.
        assert_eq!(checksum(b"123456789"), 0xCBF4_3926);
        assert_eq!(checksum(b""), 0);
    }

    #[test]
    fn test_string_forms_agree() {
        let owned = String::from("listLength");
        assert_eq!(owned.hash_code(), "listLength".hash_code());
        assert_eq!(owned.hash_code(), b"listLength".hash_code());
        assert_eq!(owned.hash_code(), owned.as_bytes().to_vec().hash_code());
        assert_eq!(owned.hash_code(), Cow::Borrowed("listLength").hash_code());
    }

    #[test]
    fn test_integers_keep_low_bits() {
        assert_eq!(300u16.hash_code(), 300);
        assert_eq!(fold_to_byte(300u16.hash_code()), 44);
        assert_eq!((-1i8).hash_code(), u32::MAX);
        assert_eq!(fold_to_byte((-1i64).hash_code()), 0xFF);
        assert_eq!(0x1_0000_0005u64.hash_code(), 5);
    }

    #[test]
    fn test_floats_truncate() {
        assert_eq!(12.9f64.hash_code(), 12);
        assert_eq!(12.1f32.hash_code(), 12);
        assert_eq!((-2.7f64).hash_code(), (-2i64).hash_code());
    }

    #[test]
    fn test_smart_pointers_delegate() {
        let key = "route";
        assert_eq!(Arc::new(key.to_string()).hash_code(), key.hash_code());
        assert_eq!(Box::new(7u32).hash_code(), 7);
        assert_eq!((&&9u8).hash_code(), 9);
    }

    #[test]
    fn test_hash_debug_is_stable() {
        #[derive(Debug)]
        struct Opaque {
            #[allow(dead_code)]
            id: u32,
        }

        let a = hash_debug(&Opaque { id: 1 });
        let b = hash_debug(&Opaque { id: 1 });
        let c = hash_debug(&Opaque { id: 2 });
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(hash_debug("plain"), checksum(b"\"plain\""));
    }
}
