use std::borrow::Cow;

use crate::{BoxFuture, LookaheadOptions, ParseResult, Parser, ParserContext, ParserError, Sequence};

/// Separator of arrays without separators, matches without consuming any input.
#[derive(Clone, Copy, Debug)]
pub struct NoSeparator;

impl<S: Sequence> Parser<S> for NoSeparator {
    type Output = ();

    fn parse<'a>(&'a self, _ctx: &'a ParserContext<S>) -> BoxFuture<'a, ParseResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

/// Parser created by [`array`], [`non_empty_array`], [`separated_array`] and
/// [`separated_non_empty_array`].
#[derive(Clone, Copy, Debug)]
pub struct Array<P, Sep = NoSeparator> {
    element: P,
    separator: Sep,
    non_empty: bool,
}

/// Parses `element` as often as it matches.
///
/// Every iteration runs in a lookahead context which is committed only when the element matched
/// and consumed input. An element that matches without consuming input ends the array, so the
/// array always terminates.
pub fn array<P>(element: P) -> Array<P> {
    Array {
        element,
        separator: NoSeparator,
        non_empty: false,
    }
}

/// Variant of [`array`] that fails to match unless at least one element matched.
pub fn non_empty_array<P>(element: P) -> Array<P> {
    Array {
        element,
        separator: NoSeparator,
        non_empty: true,
    }
}

/// Variant of [`array`] with a `separator` parsed between consecutive elements.
///
/// A trailing separator, i.e. one that is not followed by an element, is not consumed.
pub fn separated_array<P, Sep>(element: P, separator: Sep) -> Array<P, Sep> {
    Array {
        element,
        separator,
        non_empty: false,
    }
}

/// Variant of [`separated_array`] that fails to match unless at least one element matched.
pub fn separated_non_empty_array<P, Sep>(element: P, separator: Sep) -> Array<P, Sep> {
    Array {
        element,
        separator,
        non_empty: true,
    }
}

impl<S, P, Sep> Parser<S> for Array<P, Sep>
where
    S: Sequence,
    P: Parser<S>,
    Sep: Parser<S>,
{
    type Output = Vec<P::Output>;

    fn parse<'a>(&'a self, ctx: &'a ParserContext<S>) -> BoxFuture<'a, ParseResult<Self::Output>> {
        Box::pin(async move {
            let mut values = vec![];
            loop {
                let child = ctx.lookahead(LookaheadOptions::named("array"));
                let start = child.position();
                let first = values.is_empty();
                let parsed = async {
                    if !first {
                        self.separator.parse(&child).await?;
                    }
                    self.element.parse(&child).await
                };
                match parsed.await {
                    Ok(value) if child.position() > start => {
                        child.commit()?;
                        values.push(value);
                    }
                    Ok(_) | Err(ParserError::ParsingFailed(_)) => break,
                    Err(err) => return Err(err),
                }
            }
            if self.non_empty {
                ctx.invariant(!values.is_empty(), || {
                    "expected at least one array element".to_owned()
                })?;
            }
            Ok(values)
        })
    }

    fn name(&self) -> Cow<'static, str> {
        format!("array({})", self.element.name()).into()
    }
}
