use std::borrow::Cow;

use tracing::debug;

use crate::{
    BoxFuture, BoxedParser, LookaheadOptions, ParseResult, Parser, ParserContext, ParserError,
    Sequence,
};

/// Parser created by [`disjunction`].
pub struct Disjunction<S: Sequence, T> {
    parsers: Vec<BoxedParser<S, T>>,
}

/// Tries `parsers` in order and returns the output of the first one that matches.
///
/// Every alternative runs in its own lookahead context, so alternatives that fail to match do not
/// consume input. When no alternative matches, the failures are aggregated according to
/// [`RunOptions::error_join_mode`][crate::RunOptions::error_join_mode].
pub fn disjunction<S: Sequence, T>(parsers: Vec<BoxedParser<S, T>>) -> Disjunction<S, T> {
    Disjunction { parsers }
}

impl<S: Sequence, T: 'static> Parser<S> for Disjunction<S, T> {
    type Output = T;

    fn parse<'a>(&'a self, ctx: &'a ParserContext<S>) -> BoxFuture<'a, ParseResult<T>> {
        Box::pin(async move {
            if self.parsers.is_empty() {
                return Err(ctx.implementation_error("disjunction without alternatives"));
            }
            let mut failures = vec![];
            for (index, parser) in self.parsers.iter().enumerate() {
                let child =
                    ctx.lookahead(LookaheadOptions::named(format!("disjunction[{index}]")));
                match parser.parse(&child).await {
                    Ok(value) => {
                        child.commit()?;
                        debug!(index, position = ctx.position(), "disjunction matched");
                        return Ok(value);
                    }
                    Err(ParserError::ParsingFailed(failure)) => failures.push(*failure),
                    Err(err) => return Err(err),
                }
            }
            let names = self.parsers.iter().map(|parser| parser.name()).collect::<Vec<_>>();
            Err(ctx.join_failure(failures, move || {
                format!("expected one of: {}", names.join(", "))
            }))
        })
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("disjunction")
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::{
        combinators::exact_sequence, error::FailureKind, run_parser, source::complete,
        ErrorJoinMode, ParserExt, RunOptions,
    };

    fn keywords() -> Disjunction<String, String> {
        disjunction(vec![
            exact_sequence("for".to_owned()).boxed(),
            exact_sequence("f".to_owned()).boxed(),
            exact_sequence("fold".to_owned()).boxed(),
        ])
    }

    #[tokio::test]
    async fn first_match_wins() {
        let parser = (keywords(), exact_sequence("old".to_owned()));
        let parsed = run_parser(parser, complete("fold"), RunOptions::default());
        assert_eq!(parsed.await.unwrap(), ("f".to_owned(), "old".to_owned()));
        let parsed = run_parser(keywords(), complete("for"), RunOptions::default());
        assert_eq!(parsed.await.unwrap(), "for");
    }

    #[tokio::test]
    async fn failures_are_joined() {
        let options = RunOptions::default().error_join_mode(ErrorJoinMode::All);
        let parsed = run_parser(keywords(), complete("x"), options).await;
        let err = parsed.unwrap_err();
        let failure = err.parsing_failure().unwrap();
        assert_matches!(failure.kind(), FailureKind::Join(_));
        assert_eq!(failure.child_errors().len(), 3);
        assert_eq!(
            failure.message(),
            "expected one of: exact_sequence(\"for\"), exact_sequence(\"f\"), \
             exact_sequence(\"fold\")"
        );

        let parsed = run_parser(keywords(), complete("x"), RunOptions::default()).await;
        assert!(parsed.unwrap_err().parsing_failure().unwrap().child_errors().is_empty());

        let empty = disjunction::<String, ()>(vec![]);
        let parsed = run_parser(empty, complete("x"), RunOptions::default()).await;
        assert_matches!(parsed, Err(ParserError::Implementation(_)));
    }
}
