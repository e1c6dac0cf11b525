use std::borrow::Cow;

use crate::{BoxFuture, ParseResult, Parser, ParserContext, Sequence};

/// Parser created by [`element`].
#[derive(Clone, Copy, Debug)]
pub struct AnyElement;

/// Parses any single element.
pub fn element() -> AnyElement {
    AnyElement
}

impl<S: Sequence> Parser<S> for AnyElement {
    type Output = S::Element;

    fn parse<'a>(&'a self, ctx: &'a ParserContext<S>) -> BoxFuture<'a, ParseResult<S::Element>> {
        Box::pin(ctx.read(0))
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("element")
    }
}

/// Parser created by [`element_matching`].
#[derive(Clone, Copy)]
pub struct ElementMatching<F> {
    predicate: F,
}

/// Parses a single element for which `predicate` returns `true`.
pub fn element_matching<F>(predicate: F) -> ElementMatching<F> {
    ElementMatching { predicate }
}

impl<S, F> Parser<S> for ElementMatching<F>
where
    S: Sequence,
    F: Fn(&S::Element) -> bool,
{
    type Output = S::Element;

    fn parse<'a>(&'a self, ctx: &'a ParserContext<S>) -> BoxFuture<'a, ParseResult<S::Element>> {
        Box::pin(async move {
            let Some(element) = ctx.peek(0).await? else {
                return Err(ctx.unexpected_end_of_input());
            };
            ctx.invariant((self.predicate)(&element), move || {
                format!("unexpected element {element:?}")
            })?;
            ctx.skip(1);
            Ok(element)
        })
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("element_matching")
    }
}

/// Parser created by [`exact_element`].
#[derive(Clone, Copy, Debug)]
pub struct ExactElement<E> {
    element: E,
}

/// Parses a single element equal to `element`.
pub fn exact_element<E>(element: E) -> ExactElement<E> {
    ExactElement { element }
}

impl<S, E> Parser<S> for ExactElement<E>
where
    S: Sequence<Element = E>,
    E: Copy + PartialEq + std::fmt::Debug + 'static,
{
    type Output = E;

    fn parse<'a>(&'a self, ctx: &'a ParserContext<S>) -> BoxFuture<'a, ParseResult<E>> {
        Box::pin(async move {
            let expected = self.element;
            let Some(element) = ctx.peek(0).await? else {
                return Err(ctx.unexpected_end_of_input());
            };
            ctx.invariant(element == expected, move || {
                format!("expected {expected:?}, found {element:?}")
            })?;
            ctx.skip(1);
            Ok(element)
        })
    }

    fn name(&self) -> Cow<'static, str> {
        format!("exact_element({:?})", self.element).into()
    }
}

/// Parser created by [`exact_sequence`].
#[derive(Clone, Debug)]
pub struct ExactSequence<S: Sequence> {
    sequence: S,
    elements: Vec<S::Element>,
}

/// Parses exactly the given sequence.
///
/// The input is compared element by element, so the sequence does not need to be buffered as a
/// contiguous chunk.
pub fn exact_sequence<S: Sequence>(sequence: S) -> ExactSequence<S> {
    ExactSequence {
        elements: sequence.elements(),
        sequence,
    }
}

impl<S: Sequence> Parser<S> for ExactSequence<S> {
    type Output = S;

    fn parse<'a>(&'a self, ctx: &'a ParserContext<S>) -> BoxFuture<'a, ParseResult<S>> {
        Box::pin(async move {
            for (offset, &expected) in self.elements.iter().enumerate() {
                match ctx.peek(offset).await? {
                    Some(element) if element == expected => (),
                    Some(element) => {
                        let sequence = self.sequence.clone();
                        return Err(ctx.invariant_failure(move || {
                            format!(
                                "expected {sequence:?}, found {element:?} at offset {offset}"
                            )
                        }));
                    }
                    None => return Err(ctx.unexpected_end_of_input()),
                }
            }
            ctx.skip(self.elements.len());
            Ok(self.sequence.clone())
        })
    }

    fn name(&self) -> Cow<'static, str> {
        format!("exact_sequence({:?})", self.sequence).into()
    }
}

/// Parser created by [`predicate`].
#[derive(Clone, Copy)]
pub struct Predicate<P, F> {
    parser: P,
    predicate: F,
}

/// Runs `parser` and fails to match unless `predicate` holds for its output.
pub fn predicate<P, F>(parser: P, predicate: F) -> Predicate<P, F> {
    Predicate { parser, predicate }
}

impl<S, P, F> Parser<S> for Predicate<P, F>
where
    S: Sequence,
    P: Parser<S>,
    P::Output: std::fmt::Debug,
    F: Fn(&P::Output) -> bool,
{
    type Output = P::Output;

    fn parse<'a>(&'a self, ctx: &'a ParserContext<S>) -> BoxFuture<'a, ParseResult<P::Output>> {
        Box::pin(async move {
            let value = self.parser.parse(ctx).await?;
            if (self.predicate)(&value) {
                return Ok(value);
            }
            let name = self.parser.name();
            let found = format!("{value:?}");
            Err(ctx.invariant_failure(move || {
                format!("output {found} of {name} was rejected")
            }))
        })
    }

    fn name(&self) -> Cow<'static, str> {
        self.parser.name()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::{error::FailureKind, run_parser, source::IterSource, ParserError, RunOptions};

    fn chunked(chunks: &[&str]) -> IterSource<std::vec::IntoIter<String>> {
        IterSource::new(chunks.iter().map(|&chunk| chunk.to_owned()).collect::<Vec<_>>())
    }

    #[tokio::test]
    async fn exact_sequences_span_chunks() {
        let parser = (exact_sequence("foo".to_owned()), element());
        let parsed = run_parser(parser, chunked(&["f", "", "o", "ob"]), RunOptions::default());
        assert_eq!(parsed.await.unwrap(), ("foo".to_owned(), 'b'));
    }

    #[tokio::test]
    async fn mismatches_fail_without_consuming() {
        let parsed = run_parser(
            exact_sequence("foo".to_owned()),
            chunked(&["fob"]),
            RunOptions::default(),
        )
        .await;
        let err = parsed.unwrap_err();
        let failure = err.parsing_failure().unwrap();
        assert_matches!(failure.kind(), FailureKind::Invariant);
        assert_eq!(failure.position(), 0);
        assert_eq!(failure.message(), "expected \"foo\", found 'b' at offset 2");

        let parsed = run_parser(
            exact_sequence("foo".to_owned()),
            chunked(&["fo"]),
            RunOptions::default(),
        )
        .await;
        assert_matches!(
            parsed.unwrap_err().parsing_failure().map(|failure| failure.kind()),
            Some(FailureKind::UnexpectedEndOfInput)
        );
    }

    #[tokio::test]
    async fn single_elements() {
        let parser = (
            exact_element(b'x'),
            element_matching(|byte: &u8| byte.is_ascii_digit()),
            element(),
        );
        let source = IterSource::new([b"x7".to_vec(), b"!".to_vec()]);
        let parsed = run_parser(parser, source, RunOptions::default());
        assert_eq!(parsed.await.unwrap(), (b'x', b'7', b'!'));

        let parser = element_matching(|byte: &u8| byte.is_ascii_digit());
        let parsed = run_parser(parser, IterSource::new([b"a".to_vec()]), RunOptions::default());
        assert_matches!(parsed.await, Err(ParserError::ParsingFailed(_)));
    }

    #[tokio::test]
    async fn predicates_reject_outputs() {
        let parser = predicate(element(), |c: &char| *c != 'q');
        let parsed = run_parser(&parser, chunked(&["a"]), RunOptions::default()).await;
        assert_eq!(parsed.unwrap(), 'a');
        let parsed = run_parser(&parser, chunked(&["q"]), RunOptions::default()).await;
        let err = parsed.unwrap_err();
        assert_eq!(
            err.parsing_failure().unwrap().message(),
            "output 'q' of element was rejected"
        );
    }
}
