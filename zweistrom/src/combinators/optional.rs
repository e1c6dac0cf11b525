use std::borrow::Cow;

use crate::{BoxFuture, LookaheadOptions, ParseResult, Parser, ParserContext, ParserError, Sequence};

/// Parser created by [`optional`].
#[derive(Clone, Copy, Debug)]
pub struct Optional<P> {
    parser: P,
}

/// Makes `parser` optional.
///
/// The parser runs in a lookahead context. When it fails to match, this returns `None` and no input
/// is consumed.
pub fn optional<P>(parser: P) -> Optional<P> {
    Optional { parser }
}

impl<S: Sequence, P: Parser<S>> Parser<S> for Optional<P> {
    type Output = Option<P::Output>;

    fn parse<'a>(&'a self, ctx: &'a ParserContext<S>) -> BoxFuture<'a, ParseResult<Self::Output>> {
        Box::pin(async move {
            let child = ctx.lookahead(LookaheadOptions::named("optional"));
            match self.parser.parse(&child).await {
                Ok(value) => {
                    child.commit()?;
                    Ok(Some(value))
                }
                Err(ParserError::ParsingFailed(_)) => Ok(None),
                Err(err) => Err(err),
            }
        })
    }

    fn name(&self) -> Cow<'static, str> {
        format!("optional({})", self.parser.name()).into()
    }
}
