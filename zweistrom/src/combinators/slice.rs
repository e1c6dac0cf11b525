use std::borrow::Cow;

use crate::{BoxFuture, LookaheadOptions, ParseResult, Parser, ParserContext, Sequence};

/// Parser created by [`fixed_length`].
#[derive(Clone, Copy, Debug)]
pub struct FixedLength {
    length: usize,
}

/// Parses exactly `length` elements and returns them as a sequence.
pub fn fixed_length(length: usize) -> FixedLength {
    FixedLength { length }
}

impl<S: Sequence> Parser<S> for FixedLength {
    type Output = S;

    fn parse<'a>(&'a self, ctx: &'a ParserContext<S>) -> BoxFuture<'a, ParseResult<S>> {
        Box::pin(ctx.read_sequence(0, self.length))
    }

    fn name(&self) -> Cow<'static, str> {
        format!("fixed_length({})", self.length).into()
    }
}

/// Parser created by [`skip`].
#[derive(Clone, Copy, Debug)]
pub struct Skip {
    length: usize,
}

/// Consumes exactly `length` elements without buffering them as a sequence.
pub fn skip(length: usize) -> Skip {
    Skip { length }
}

impl<S: Sequence> Parser<S> for Skip {
    type Output = ();

    fn parse<'a>(&'a self, ctx: &'a ParserContext<S>) -> BoxFuture<'a, ParseResult<()>> {
        Box::pin(async move {
            if let Some(last) = self.length.checked_sub(1) {
                if ctx.peek(last).await?.is_none() {
                    return Err(ctx.unexpected_end_of_input());
                }
            }
            ctx.skip(self.length);
            Ok(())
        })
    }

    fn name(&self) -> Cow<'static, str> {
        format!("skip({})", self.length).into()
    }
}

/// Parser created by [`end_of_input`].
#[derive(Clone, Copy, Debug)]
pub struct EndOfInput;

/// Matches only at the end of the input or of the current slice.
pub fn end_of_input() -> EndOfInput {
    EndOfInput
}

impl<S: Sequence> Parser<S> for EndOfInput {
    type Output = ();

    fn parse<'a>(&'a self, ctx: &'a ParserContext<S>) -> BoxFuture<'a, ParseResult<()>> {
        Box::pin(async move {
            match ctx.peek(0).await? {
                None => Ok(()),
                Some(_) => Err(ctx.unexpected_remaining_input()),
            }
        })
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("end_of_input")
    }
}

/// Parser created by [`slice_bounded`].
#[derive(Clone, Copy, Debug)]
pub struct SliceBounded<P> {
    length: usize,
    parser: P,
}

/// Runs `parser` on the next `length` elements of input only.
///
/// The parser cannot look past the end of the slice and has to consume all of it.
pub fn slice_bounded<P>(length: usize, parser: P) -> SliceBounded<P> {
    SliceBounded { length, parser }
}

impl<S: Sequence, P: Parser<S>> Parser<S> for SliceBounded<P> {
    type Output = P::Output;

    fn parse<'a>(&'a self, ctx: &'a ParserContext<S>) -> BoxFuture<'a, ParseResult<P::Output>> {
        Box::pin(async move {
            let end = ctx.position() + self.length;
            let child = ctx.lookahead(LookaheadOptions::named("slice").slice_end(end));
            let value = self.parser.parse(&child).await?;
            let position = child.position();
            child.invariant(position == end, move || {
                format!("slice ends at {end}, but parsing stopped at {position}")
            })?;
            child.commit()?;
            Ok(value)
        })
    }

    fn name(&self) -> Cow<'static, str> {
        format!("slice_bounded({}, {})", self.length, self.parser.name()).into()
    }
}
