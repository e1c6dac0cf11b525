//! Unparsers for text based formats.
//!
//! These work for any sequence whose elements can be built from ASCII bytes, so both for `String`
//! and for `Vec<u8>`. They have the signature of an [`Unparser`][crate::Unparser] and can be
//! passed to [`UnparserContext::write_earlier`] directly.
use crate::{Sequence, UnparserContext, UnparserError};

mod sealed {
    pub trait Sealed: itoap::Integer {}

    impl Sealed for i8 {}
    impl Sealed for u8 {}
    impl Sealed for i16 {}
    impl Sealed for u16 {}
    impl Sealed for i32 {}
    impl Sealed for u32 {}
    impl Sealed for i64 {}
    impl Sealed for u64 {}
    impl Sealed for i128 {}
    impl Sealed for u128 {}
    impl Sealed for isize {}
    impl Sealed for usize {}
}

/// Primitive integer types that can be written as decimal numbers.
pub trait Integer: sealed::Sealed + Copy {}

impl Integer for i8 {}
impl Integer for u8 {}
impl Integer for i16 {}
impl Integer for u16 {}
impl Integer for i32 {}
impl Integer for u32 {}
impl Integer for i64 {}
impl Integer for u64 {}
impl Integer for i128 {}
impl Integer for u128 {}
impl Integer for isize {}
impl Integer for usize {}

fn decimal<I: Integer>(value: I) -> Vec<u8> {
    let mut digits = Vec::with_capacity(I::MAX_LEN);
    itoap::write_to_vec(&mut digits, value);
    digits
}

fn to_sequence<S>(bytes: &[u8]) -> S
where
    S: Sequence,
    S::Element: From<u8>,
{
    let elements: Vec<S::Element> = bytes.iter().map(|&byte| byte.into()).collect();
    S::from_elements(&elements)
}

/// Writes a decimal number using ASCII digits.
pub fn write_ascii_digits<S, I>(
    value: &I,
    ctx: &mut UnparserContext<'_, S>,
) -> Result<(), UnparserError>
where
    S: Sequence,
    S::Element: From<u8>,
    I: Integer,
{
    ctx.write_sequence(to_sequence(&decimal(*value)))
}

/// Returns an unparser that writes a decimal number padded with leading zeros to exactly `width`
/// elements.
///
/// A minus sign is written before the padding. Numbers that need more than `width` elements are
/// rejected with [`UnparserError::Invalid`].
pub fn write_zero_padded<S, I>(
    width: usize,
) -> impl Fn(&I, &mut UnparserContext<'_, S>) -> Result<(), UnparserError>
where
    S: Sequence,
    S::Element: From<u8>,
    I: Integer,
{
    move |value, ctx| {
        let digits = decimal(*value);
        if digits.len() > width {
            return Err(ctx.invalid(format!(
                "{} does not fit into {width} digits",
                String::from_utf8_lossy(&digits)
            )));
        }
        let (sign, magnitude) = match digits.split_first() {
            Some((b'-', magnitude)) => (&digits[..1], magnitude),
            _ => (&digits[..0], &digits[..]),
        };
        let mut padded = Vec::with_capacity(width);
        padded.extend_from_slice(sign);
        padded.resize(width - magnitude.len(), b'0');
        padded.extend_from_slice(magnitude);
        ctx.write_sequence(to_sequence(&padded))
    }
}
