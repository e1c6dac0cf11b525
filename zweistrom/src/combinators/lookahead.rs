use std::borrow::Cow;

use crate::{BoxFuture, LookaheadOptions, ParseResult, Parser, ParserContext, ParserError, Sequence};

/// Parser created by [`lookahead`].
#[derive(Clone, Copy, Debug)]
pub struct Lookahead<P> {
    parser: P,
}

/// Runs `parser` without consuming any input.
pub fn lookahead<P>(parser: P) -> Lookahead<P> {
    Lookahead { parser }
}

impl<S: Sequence, P: Parser<S>> Parser<S> for Lookahead<P> {
    type Output = P::Output;

    fn parse<'a>(&'a self, ctx: &'a ParserContext<S>) -> BoxFuture<'a, ParseResult<P::Output>> {
        Box::pin(async move {
            let child = ctx.lookahead(LookaheadOptions::named("lookahead"));
            self.parser.parse(&child).await
        })
    }

    fn name(&self) -> Cow<'static, str> {
        format!("lookahead({})", self.parser.name()).into()
    }
}

/// Parser created by [`negative_lookahead`].
#[derive(Clone, Copy, Debug)]
pub struct NegativeLookahead<P> {
    parser: P,
}

/// Matches, without consuming any input, exactly when `parser` does not match.
pub fn negative_lookahead<P>(parser: P) -> NegativeLookahead<P> {
    NegativeLookahead { parser }
}

impl<S: Sequence, P: Parser<S>> Parser<S> for NegativeLookahead<P>
where
    P::Output: std::fmt::Debug,
{
    type Output = ();

    fn parse<'a>(&'a self, ctx: &'a ParserContext<S>) -> BoxFuture<'a, ParseResult<()>> {
        Box::pin(async move {
            let child = ctx.lookahead(LookaheadOptions::named("negative_lookahead"));
            match self.parser.parse(&child).await {
                Ok(value) => {
                    let name = self.parser.name();
                    let value = format!("{value:?}");
                    Err(ctx.invariant_failure(move || {
                        format!("{name} unexpectedly matched with {value}")
                    }))
                }
                Err(ParserError::ParsingFailed(_)) => Ok(()),
                Err(err) => Err(err),
            }
        })
    }

    fn name(&self) -> Cow<'static, str> {
        format!("negative_lookahead({})", self.parser.name()).into()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::{
        combinators::{array, element, exact_sequence},
        run_parser,
        source::complete,
        RunOptions,
    };

    #[tokio::test]
    async fn lookahead_does_not_consume() {
        let parser = (lookahead(exact_sequence("ab".to_owned())), element(), element());
        let parsed = run_parser(parser, complete("ab"), RunOptions::default()).await;
        assert_eq!(parsed.unwrap(), ("ab".to_owned(), 'a', 'b'));
    }

    #[tokio::test]
    async fn negative_lookahead_inverts_matches() {
        let until_end = array((negative_lookahead(exact_sequence("*/".to_owned())), element()));
        let parser = (until_end, exact_sequence("*/".to_owned()));
        let parsed = run_parser(&parser, complete("a*b*/"), RunOptions::default()).await;
        let (content, _) = parsed.unwrap();
        let content: String = content.into_iter().map(|(_, c)| c).collect();
        assert_eq!(content, "a*b");

        let parser = negative_lookahead(exact_sequence("x".to_owned()));
        let parsed = run_parser(&parser, complete("x"), RunOptions::default()).await;
        let err = parsed.unwrap_err();
        assert_matches!(err, ParserError::ParsingFailed(_));
        assert_eq!(
            err.parsing_failure().unwrap().message(),
            "exact_sequence(\"x\") unexpectedly matched with \"x\""
        );
    }
}
