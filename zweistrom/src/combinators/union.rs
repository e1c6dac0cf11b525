use std::{borrow::Cow, fmt::Debug, rc::Rc};

use tokio::task::JoinSet;
use tracing::debug;

use crate::{
    error::ParsingFailure, BoxFuture, BoxedParser, LookaheadOptions, ParseResult, Parser,
    ParserContext, ParserError, Sequence,
};

/// Parser created by [`union`].
pub struct Union<S: Sequence, T> {
    parsers: Vec<BoxedParser<S, T>>,
}

/// Runs all `parsers` concurrently and returns the output of the single one that matches.
///
/// Every alternative runs as a separate task on its own lookahead context, all of them reading from
/// the same input. A union is unambiguous by construction: when more than one alternative matches,
/// this returns an implementation error listing all matching alternatives and their outputs.
///
/// As soon as all but one alternative failed, the remaining alternative's context is committed
/// while it is still running, so that it can stream through the input without the buffer growing.
/// When that alternative subsequently fails, the parent context may already have advanced.
///
/// Alternatives are spawned using [`tokio::task::spawn_local`], so this parser can only run within
/// a [`LocalSet`][tokio::task::LocalSet], as set up by [`run_parser`][crate::run_parser].
pub fn union<S: Sequence, T>(parsers: Vec<BoxedParser<S, T>>) -> Union<S, T> {
    Union { parsers }
}

impl<S: Sequence, T: Debug + 'static> Parser<S> for Union<S, T> {
    type Output = T;

    fn parse<'a>(&'a self, ctx: &'a ParserContext<S>) -> BoxFuture<'a, ParseResult<T>> {
        Box::pin(async move {
            if self.parsers.is_empty() {
                return Err(ctx.implementation_error("union without alternatives"));
            }

            let mut tasks = JoinSet::new();
            let mut handles = Vec::with_capacity(self.parsers.len());
            for (index, parser) in self.parsers.iter().enumerate() {
                let name = format!("union[{index}] {}", parser.name());
                let child = ctx.lookahead(LookaheadOptions::named(name));
                handles.push(child.commit_handle());
                let parser = Rc::clone(parser);
                tasks.spawn_local(async move {
                    let result = parser.parse(&child).await;
                    (index, child, result)
                });
            }

            let mut pending = vec![true; self.parsers.len()];
            let mut early_commit = None;
            let mut successes = vec![];
            let mut failures: Vec<(usize, ParsingFailure)> = vec![];
            let mut fatal = None;

            loop {
                if successes.is_empty() && early_commit.is_none() && fatal.is_none() {
                    let mut outstanding = pending.iter().enumerate().filter(|(_, open)| **open);
                    if let (Some((index, _)), None) = (outstanding.next(), outstanding.next()) {
                        debug!(index, "union committing to last remaining alternative");
                        handles[index].commit()?;
                        early_commit = Some(index);
                    }
                }

                let Some(joined) = tasks.join_next().await else {
                    break;
                };
                let (index, child, result) = match joined {
                    Ok(settled) => settled,
                    Err(err) => match err.try_into_panic() {
                        Ok(payload) => std::panic::resume_unwind(payload),
                        Err(err) => {
                            return Err(ctx.implementation_error(format!(
                                "union alternative was cancelled: {err}"
                            )))
                        }
                    },
                };
                pending[index] = false;

                match result {
                    Ok(value) => successes.push((index, child, value)),
                    Err(ParserError::ParsingFailed(failure)) => failures.push((index, *failure)),
                    Err(err) => {
                        fatal.get_or_insert(err);
                    }
                }
            }

            if let Some(err) = fatal {
                return Err(err);
            }

            if successes.len() > 1 {
                successes.sort_by_key(|&(index, _, _)| index);
                let matches = successes
                    .iter()
                    .map(|(_, child, value)| {
                        let name = child.debug_name().unwrap_or_default();
                        format!("{name} => {value:?}")
                    })
                    .collect::<Vec<_>>();
                return Err(ctx.implementation_error(format!(
                    "union is ambiguous, {} alternatives matched: {}",
                    matches.len(),
                    matches.join("; ")
                )));
            }

            let Some((index, child, value)) = successes.pop() else {
                failures.sort_by_key(|&(index, _)| index);
                let names = self.parsers.iter().map(|parser| parser.name()).collect::<Vec<_>>();
                let failures = failures.into_iter().map(|(_, failure)| failure).collect();
                return Err(ctx.join_failure(failures, move || {
                    format!("expected exactly one of: {}", names.join(", "))
                }));
            };
            if early_commit != Some(index) {
                child.commit()?;
            }
            debug!(index, position = ctx.position(), "union matched");
            Ok(value)
        })
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("union")
    }
}
