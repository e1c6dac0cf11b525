//! Parsers for text based formats.
//!
//! These work for any sequence whose elements convert to a Unicode scalar value, so both for
//! `String` and for ASCII text in a `Vec<u8>`.
use std::{borrow::Cow, fmt::Debug, marker::PhantomData};

use num_traits::{
    ops::overflowing::{OverflowingAdd, OverflowingMul, OverflowingSub},
    FromPrimitive, Zero,
};

use crate::{BoxFuture, ParseResult, Parser, ParserContext, Sequence};

/// Integer types that decimal numbers can be parsed into.
pub trait DecimalInteger:
    Zero + FromPrimitive + OverflowingAdd + OverflowingSub + OverflowingMul + Debug + 'static
{
}

impl<I> DecimalInteger for I where
    I: Zero + FromPrimitive + OverflowingAdd + OverflowingSub + OverflowingMul + Debug + 'static
{
}

#[inline]
fn digit(element: impl Into<u32>) -> Option<u8> {
    match element.into() {
        code @ 0x30..=0x39 => Some((code - 0x30) as u8),
        _ => None,
    }
}

#[inline]
fn push_digit<I: DecimalInteger>(value: I, digit: u8, negative: bool) -> Option<I> {
    let (value, mul_overflow) = value.overflowing_mul(&I::from_u8(10)?);
    let digit = I::from_u8(digit)?;
    let (value, add_overflow) = if negative {
        value.overflowing_sub(&digit)
    } else {
        value.overflowing_add(&digit)
    };
    (!(mul_overflow || add_overflow)).then_some(value)
}

async fn decimal<S, I>(ctx: &ParserContext<S>, signed: bool) -> ParseResult<I>
where
    S: Sequence,
    S::Element: Into<u32>,
    I: DecimalInteger,
{
    let mut offset = 0;
    let mut negative = false;
    if signed && ctx.peek(0).await?.map(Into::<u32>::into) == Some('-' as u32) {
        // A lone '-' is not part of the number
        if ctx.peek(1).await?.and_then(digit).is_some() {
            negative = true;
            offset = 1;
        }
    }

    let start = offset;
    let mut value = Some(I::zero());
    while let Some(digit) = ctx.peek(offset).await?.and_then(digit) {
        offset += 1;
        value = value.and_then(|value| push_digit(value, digit, negative));
    }

    if offset == start {
        return Err(ctx.invariant_failure(|| "expected an ASCII digit".to_owned()));
    }
    let Some(value) = value else {
        return Err(ctx.invariant_failure(|| {
            format!(
                "decimal number does not fit into {}",
                std::any::type_name::<I>()
            )
        }));
    };
    ctx.skip(offset);
    Ok(value)
}

/// Parser created by [`ascii_digits`].
pub struct AsciiDigits<I> {
    _phantom: PhantomData<fn() -> I>,
}

/// Parses one or more ASCII digits as a decimal number.
///
/// Fails without consuming input if there is no digit or if the number overflows `I`.
pub fn ascii_digits<I: DecimalInteger>() -> AsciiDigits<I> {
    AsciiDigits {
        _phantom: PhantomData,
    }
}

impl<S, I> Parser<S> for AsciiDigits<I>
where
    S: Sequence,
    S::Element: Into<u32>,
    I: DecimalInteger,
{
    type Output = I;

    fn parse<'a>(&'a self, ctx: &'a ParserContext<S>) -> BoxFuture<'a, ParseResult<I>> {
        Box::pin(decimal(ctx, false))
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("ascii_digits")
    }
}

/// Parser created by [`signed_ascii_digits`].
pub struct SignedAsciiDigits<I> {
    _phantom: PhantomData<fn() -> I>,
}

/// Parses ASCII digits, optionally prefixed by `'-'`, as a decimal number.
///
/// A `'-'` that is not followed by a digit is not consumed, so on its own it fails like
/// [`ascii_digits`]. An explicit positive sign `'+'` is not accepted.
pub fn signed_ascii_digits<I: DecimalInteger>() -> SignedAsciiDigits<I> {
    SignedAsciiDigits {
        _phantom: PhantomData,
    }
}

impl<S, I> Parser<S> for SignedAsciiDigits<I>
where
    S: Sequence,
    S::Element: Into<u32>,
    I: DecimalInteger,
{
    type Output = I;

    fn parse<'a>(&'a self, ctx: &'a ParserContext<S>) -> BoxFuture<'a, ParseResult<I>> {
        Box::pin(decimal(ctx, true))
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("signed_ascii_digits")
    }
}

/// Parser created by [`tabs_or_spaces`].
#[derive(Clone, Copy, Debug)]
pub struct TabsOrSpaces;

/// Consumes any number of tab or space characters, returning how many were consumed.
pub fn tabs_or_spaces() -> TabsOrSpaces {
    TabsOrSpaces
}

impl<S> Parser<S> for TabsOrSpaces
where
    S: Sequence,
    S::Element: Into<u32>,
{
    type Output = usize;

    fn parse<'a>(&'a self, ctx: &'a ParserContext<S>) -> BoxFuture<'a, ParseResult<usize>> {
        Box::pin(async move {
            let mut offset = 0;
            while let Some(element) = ctx.peek(offset).await? {
                if !matches!(Into::<u32>::into(element), 0x09 | 0x20) {
                    break;
                }
                offset += 1;
            }
            ctx.skip(offset);
            Ok(offset)
        })
    }
}
