use std::rc::Rc;

use tokio::task::LocalSet;
use tracing::debug;

use crate::{
    error::ImplementationError, input_reader::InputReader, remaining::RemainingInput,
    source::ChunkSource, ErrorJoinMode, ParseResult, Parser, ParserContext, ParserError, Sequence,
};

/// Options for running a parser.
#[derive(Copy, Clone, Debug, Default)]
#[non_exhaustive]
pub struct RunOptions {
    /// How the failures of alternatives that all failed to match are aggregated.
    ///
    /// Defaults to [`ErrorJoinMode::None`].
    pub error_join_mode: ErrorJoinMode,
    /// Whether parsing failures record the debug names of the contexts they were raised in.
    ///
    /// Defaults to `false`.
    pub error_stack: bool,
}

impl RunOptions {
    /// Sets the [`error_join_mode`][Self#structfield.error_join_mode] field.
    #[inline]
    pub fn error_join_mode(mut self, mode: ErrorJoinMode) -> Self {
        self.error_join_mode = mode;
        self
    }

    /// Sets the [`error_stack`][Self#structfield.error_stack] field.
    #[inline]
    pub fn error_stack(mut self, enabled: bool) -> Self {
        self.error_stack = enabled;
        self
    }
}

/// Runs `parser` on the complete input produced by `source`.
///
/// Fails with an unexpected remaining input failure when the parser does not consume all of the
/// input. When the source produced an IO error, that error is returned as [`ParserError::Io`]
/// instead of whatever parsing failure it caused.
///
/// This sets up a [`LocalSet`] for the concurrently running alternatives of a
/// [`union`][crate::combinators::union], and thus has to be called within a tokio runtime.
pub async fn run_parser<S, P>(
    parser: P,
    source: impl ChunkSource<S>,
    options: RunOptions,
) -> ParseResult<P::Output>
where
    S: Sequence,
    P: Parser<S>,
{
    let reader = Rc::new(InputReader::new(source));
    let result = LocalSet::new()
        .run_until(async {
            let ctx = ParserContext::root(reader.clone(), options);
            let value = parser.parse(&ctx).await?;
            if ctx.peek(0).await?.is_some() {
                return Err(ctx.unexpected_remaining_input());
            }
            Ok(value)
        })
        .await;
    check_io_error(&reader, result)
}

/// Runs `parser` on a prefix of the input produced by `source`.
///
/// Returns the parsed value together with the input that was not consumed, or `None` if the source
/// is exhausted and all of its input was consumed.
pub async fn run_parser_with_remaining_input<S, P>(
    parser: P,
    source: impl ChunkSource<S>,
    options: RunOptions,
) -> ParseResult<(P::Output, Option<RemainingInput<S>>)>
where
    S: Sequence,
    P: Parser<S>,
{
    let reader = Rc::new(InputReader::new(source));
    let result = LocalSet::new()
        .run_until(async {
            let ctx = ParserContext::root(reader.clone(), options);
            let value = parser.parse(&ctx).await?;
            let at_end = ctx.peek(0).await?.is_none();
            Ok((value, at_end, ctx.position()))
        })
        .await;
    let (value, at_end, position) = check_io_error(&reader, result)?;

    if at_end {
        return Ok((value, None));
    }
    let reader = Rc::try_unwrap(reader).map_err(|_| {
        ImplementationError::new(position, "parser kept a reference to its context")
    })?;
    Ok((value, Some(reader.into_remaining())))
}

fn check_io_error<S: Sequence, T>(
    reader: &InputReader<S>,
    result: ParseResult<T>,
) -> ParseResult<T> {
    if let Err(err) = reader.take_io_error() {
        debug!(%err, "parsing stopped by an IO error");
        return Err(ParserError::Io(err));
    }
    result
}
