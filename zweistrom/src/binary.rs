//! Parsers and unparsers for binary formats.
use std::{borrow::Cow, fmt::Debug, marker::PhantomData};

use num_traits::{FromPrimitive, ToPrimitive};

use crate::{
    BoxFuture, ParseResult, Parser, ParserContext, ParserError, UnparserContext, UnparserError,
};

const PAYLOAD: u8 = 0x7f;
const CONTINUE: u8 = 0x80;
const SIGN: u8 = 0x40;

/// Reads the bytes of a LEB128 encoded value, calling `push` with each payload and its shift.
///
/// Returns the number of bytes read and whether every call of `push` succeeded.
async fn leb128_bytes(
    ctx: &ParserContext<Vec<u8>>,
    mut push: impl FnMut(u8, u32) -> bool,
) -> Result<(usize, u8, bool), ParserError> {
    let mut offset = 0;
    let mut shift = 0u32;
    let mut fits = true;
    loop {
        let Some(byte) = ctx.peek(offset).await? else {
            return Err(ctx.unexpected_end_of_input());
        };
        offset += 1;
        fits &= push(byte & PAYLOAD, shift);
        shift = shift.saturating_add(7);
        if byte & CONTINUE == 0 {
            return Ok((offset, byte, fits));
        }
    }
}

fn does_not_fit<I: 'static>(ctx: &ParserContext<Vec<u8>>) -> ParserError {
    ctx.invariant_failure(|| {
        format!(
            "LEB128 value does not fit into {}",
            std::any::type_name::<I>()
        )
    })
}

/// Parser created by [`uleb128`].
pub struct Uleb128<I> {
    _phantom: PhantomData<fn() -> I>,
}

/// Parses an unsigned LEB128 encoded integer.
///
/// Non-canonical encodings with trailing zero payloads are accepted. Fails without consuming
/// input if the value does not fit into `I`.
pub fn uleb128<I: FromPrimitive + Debug + 'static>() -> Uleb128<I> {
    Uleb128 {
        _phantom: PhantomData,
    }
}

impl<I: FromPrimitive + Debug + 'static> Parser<Vec<u8>> for Uleb128<I> {
    type Output = I;

    fn parse<'a>(&'a self, ctx: &'a ParserContext<Vec<u8>>) -> BoxFuture<'a, ParseResult<I>> {
        Box::pin(async move {
            let mut value = 0u128;
            let (len, _, fits) = leb128_bytes(ctx, |payload, shift| {
                if payload == 0 {
                    return true;
                }
                if shift >= u128::BITS {
                    return false;
                }
                let part = u128::from(payload);
                value |= part << shift;
                (part << shift) >> shift == part
            })
            .await?;
            let Some(value) = fits.then(|| I::from_u128(value)).flatten() else {
                return Err(does_not_fit::<I>(ctx));
            };
            ctx.skip(len);
            Ok(value)
        })
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("uleb128")
    }
}

/// Parser created by [`sleb128`].
pub struct Sleb128<I> {
    _phantom: PhantomData<fn() -> I>,
}

/// Parses a signed LEB128 encoded integer.
///
/// Fails without consuming input if the value does not fit into `I`.
pub fn sleb128<I: FromPrimitive + Debug + 'static>() -> Sleb128<I> {
    Sleb128 {
        _phantom: PhantomData,
    }
}

impl<I: FromPrimitive + Debug + 'static> Parser<Vec<u8>> for Sleb128<I> {
    type Output = I;

    fn parse<'a>(&'a self, ctx: &'a ParserContext<Vec<u8>>) -> BoxFuture<'a, ParseResult<I>> {
        Box::pin(async move {
            let mut bits = 0u128;
            let mut negative = false;
            let (len, last, fits) = leb128_bytes(ctx, |payload, shift| {
                if shift >= u128::BITS {
                    // Payloads past the width of the result may only repeat the sign
                    return payload == if negative { PAYLOAD } else { 0 };
                }
                bits |= u128::from(payload) << shift;
                negative = bits >> (u128::BITS - 1) != 0;
                let kept = u128::BITS - 1 - shift;
                if kept >= 7 {
                    return true;
                }
                let high = payload >> kept;
                high == 0 || high == PAYLOAD >> kept
            })
            .await?;

            let shift = (len as u32).saturating_mul(7);
            if shift < u128::BITS && last & SIGN != 0 {
                bits |= u128::MAX << shift;
            }
            let value = bits as i128;
            let Some(value) = fits.then(|| I::from_i128(value)).flatten() else {
                return Err(does_not_fit::<I>(ctx));
            };
            ctx.skip(len);
            Ok(value)
        })
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("sleb128")
    }
}

/// Writes an unsigned integer using the LEB128 encoding.
///
/// Negative values are rejected with [`UnparserError::Invalid`].
pub fn write_uleb128<I: ToPrimitive + Debug + ?Sized>(
    value: &I,
    ctx: &mut UnparserContext<'_, Vec<u8>>,
) -> Result<(), UnparserError> {
    let Some(mut value) = value.to_u128() else {
        return Err(ctx.invalid(format!("{value:?} cannot be encoded as unsigned LEB128")));
    };
    let mut bytes = vec![];
    loop {
        let byte = (value as u8) & PAYLOAD;
        value >>= 7;
        if value == 0 {
            bytes.push(byte);
            break;
        }
        bytes.push(byte | CONTINUE);
    }
    ctx.write_sequence(bytes)
}

/// Writes a signed integer using the LEB128 encoding.
pub fn write_sleb128<I: ToPrimitive + Debug + ?Sized>(
    value: &I,
    ctx: &mut UnparserContext<'_, Vec<u8>>,
) -> Result<(), UnparserError> {
    let Some(mut value) = value.to_i128() else {
        return Err(ctx.invalid(format!("{value:?} cannot be encoded as signed LEB128")));
    };
    let mut bytes = vec![];
    loop {
        let byte = (value as u8) & PAYLOAD;
        value >>= 7;
        let done = (value == 0 && byte & SIGN == 0) || (value == -1 && byte & SIGN != 0);
        if done {
            bytes.push(byte);
            break;
        }
        bytes.push(byte | CONTINUE);
    }
    ctx.write_sequence(bytes)
}
