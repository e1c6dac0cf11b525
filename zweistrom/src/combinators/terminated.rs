use std::{borrow::Cow, fmt::Debug};

use crate::{
    combinators::{union, Union},
    context::index_of_elements,
    BoxFuture, LookaheadOptions, ParseResult, Parser, ParserContext, ParserError, ParserExt,
    Sequence,
};

/// Parser created by [`terminated_array`].
#[derive(Clone, Copy, Debug)]
pub struct TerminatedArray<P, T> {
    element: P,
    terminator: T,
}

/// Parses `element` until `terminator` matches, returning all elements and the terminator.
///
/// In every iteration exactly one of `element` and `terminator` must match. When both match, this
/// returns an implementation error. When neither matches, this fails with a join failure of both,
/// the terminator's failure first. An element that matches without consuming input is a parsing
/// failure.
///
/// This tries the two alternatives one after the other. See [`terminated_array_reference`] for an
/// equivalent implementation built from a [`union`].
pub fn terminated_array<P, T>(element: P, terminator: T) -> TerminatedArray<P, T> {
    TerminatedArray {
        element,
        terminator,
    }
}

impl<S, P, T> Parser<S> for TerminatedArray<P, T>
where
    S: Sequence,
    P: Parser<S>,
    T: Parser<S>,
{
    type Output = (Vec<P::Output>, T::Output);

    fn parse<'a>(&'a self, ctx: &'a ParserContext<S>) -> BoxFuture<'a, ParseResult<Self::Output>> {
        Box::pin(async move {
            let mut elements = vec![];
            loop {
                let terminator_ctx = ctx.lookahead(LookaheadOptions::named("terminator"));
                let terminator = self.terminator.parse(&terminator_ctx).await;
                let element_ctx = ctx.lookahead(LookaheadOptions::named("element"));
                let element = self.element.parse(&element_ctx).await;

                match (terminator, element) {
                    (Err(err), _) | (_, Err(err)) if !err.is_parsing_failure() => return Err(err),
                    (Ok(_), Ok(_)) => {
                        return Err(ctx.implementation_error(format!(
                            "both {} and terminator {} matched",
                            self.element.name(),
                            self.terminator.name()
                        )))
                    }
                    (Ok(terminator), Err(_)) => {
                        terminator_ctx.commit()?;
                        return Ok((elements, terminator));
                    }
                    (Err(_), Ok(element)) => {
                        ctx.invariant(element_ctx.position() > ctx.position(), || {
                            "array element matched without consuming input".to_owned()
                        })?;
                        element_ctx.commit()?;
                        elements.push(element);
                    }
                    (
                        Err(ParserError::ParsingFailed(terminator)),
                        Err(ParserError::ParsingFailed(element)),
                    ) => {
                        let name = self.terminator.name();
                        return Err(ctx.join_failure(vec![*terminator, *element], move || {
                            format!("expected array element or terminator {name}")
                        }));
                    }
                    (Err(err), Err(_)) => return Err(err),
                }
            }
        })
    }

    fn name(&self) -> Cow<'static, str> {
        format!("terminated_array({})", self.element.name()).into()
    }
}

/// Alternative of a single iteration of a [`TerminatedArrayReference`].
#[derive(Debug)]
pub enum Step<E, T> {
    /// The element matched.
    Element(E),
    /// The terminator matched.
    Terminator(T),
}

/// Parser created by [`terminated_array_reference`].
pub struct TerminatedArrayReference<S: Sequence, E, T> {
    step: Union<S, Step<E, T>>,
}

/// Equivalent of [`terminated_array`] that parses every iteration using a [`union`] of the
/// terminator and the element.
///
/// This is a direct expression of the semantics of `terminated_array` and serves as its reference.
pub fn terminated_array_reference<S, P, T>(
    element: P,
    terminator: T,
) -> TerminatedArrayReference<S, P::Output, T::Output>
where
    S: Sequence,
    P: Parser<S> + 'static,
    T: Parser<S> + 'static,
    P::Output: Debug,
    T::Output: Debug,
{
    TerminatedArrayReference {
        step: union(vec![
            terminator.map(Step::Terminator).boxed(),
            element.map(Step::Element).boxed(),
        ]),
    }
}

impl<S, E, T> Parser<S> for TerminatedArrayReference<S, E, T>
where
    S: Sequence,
    E: Debug + 'static,
    T: Debug + 'static,
{
    type Output = (Vec<E>, T);

    fn parse<'a>(&'a self, ctx: &'a ParserContext<S>) -> BoxFuture<'a, ParseResult<Self::Output>> {
        Box::pin(async move {
            let mut elements = vec![];
            loop {
                let start = ctx.position();
                match self.step.parse(ctx).await? {
                    Step::Terminator(terminator) => return Ok((elements, terminator)),
                    Step::Element(element) => {
                        ctx.invariant(ctx.position() > start, || {
                            "array element matched without consuming input".to_owned()
                        })?;
                        elements.push(element);
                    }
                }
            }
        })
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("terminated_array_reference")
    }
}

/// Parser created by [`terminated_sequence`].
#[derive(Clone, Debug)]
pub struct TerminatedSequence<S: Sequence> {
    terminator: S,
    elements: Vec<S::Element>,
}

/// Parses all input up to the first occurence of `terminator`, returning the content and the
/// terminator.
///
/// The terminator is searched using a window of input that grows geometrically while no
/// terminator is found. Close to the end of the input the window is instead narrowed down to the
/// available input, so that the search never requires more input than there is. When the input
/// ends without a terminator, this fails with an unexpected end of input.
pub fn terminated_sequence<S: Sequence>(terminator: S) -> TerminatedSequence<S> {
    TerminatedSequence {
        elements: terminator.elements(),
        terminator,
    }
}

impl<S: Sequence> TerminatedSequence<S> {
    const INITIAL_WINDOW: usize = 64;
}

impl<S: Sequence> Parser<S> for TerminatedSequence<S> {
    type Output = (S, S);

    fn parse<'a>(&'a self, ctx: &'a ParserContext<S>) -> BoxFuture<'a, ParseResult<(S, S)>> {
        Box::pin(async move {
            let needle = &self.elements;
            if needle.is_empty() {
                // Matches right away, even at the end of the input
                return Ok((S::empty(), self.terminator.clone()));
            }
            let mut window = Self::INITIAL_WINDOW.max(needle.len());
            // Largest window known to be available and smallest window known to be unavailable
            let mut available = 0;
            let mut unavailable: Option<usize> = None;
            let mut search_from = 0;

            loop {
                match ctx.peek_sequence(0, window).await? {
                    Some(haystack) => {
                        let haystack = haystack.elements();
                        if let Some(index) = index_of_elements(&haystack, needle, search_from) {
                            let content = ctx.read_sequence(0, index).await?;
                            ctx.skip(needle.len());
                            return Ok((content, self.terminator.clone()));
                        }
                        available = window;
                        search_from = (available + 1).saturating_sub(needle.len());
                        window = match unavailable {
                            None => window * 2,
                            Some(end) if end == available + 1 => {
                                return Err(ctx.unexpected_end_of_input())
                            }
                            Some(end) => available + (end - available + 1) / 2,
                        };
                    }
                    None => {
                        if window == available + 1 {
                            return Err(ctx.unexpected_end_of_input());
                        }
                        unavailable = Some(window);
                        window = available + (window - available) / 2;
                    }
                }
            }
        })
    }

    fn name(&self) -> Cow<'static, str> {
        format!("terminated_sequence({:?})", self.terminator).into()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::{
        combinators::{element, element_matching, end_of_input, exact_element, fixed_length},
        error::FailureKind,
        run_parser,
        source::{complete, IterSource},
        RunOptions,
    };

    fn text(input: &str) -> IterSource<std::option::IntoIter<String>> {
        complete(input)
    }

    #[tokio::test]
    async fn arrays_end_at_the_terminator() {
        let digit = element_matching(|c: &char| c.is_ascii_digit());
        let parser = terminated_array(digit, exact_element(';'));
        let parsed = run_parser(&parser, text("123;"), RunOptions::default()).await;
        assert_eq!(parsed.unwrap(), (vec!['1', '2', '3'], ';'));

        let parsed = run_parser(&parser, text("12x;"), RunOptions::default()).await;
        let err = parsed.unwrap_err();
        let failure = err.parsing_failure().unwrap();
        assert_matches!(failure.kind(), FailureKind::Join(_));
        assert_eq!(failure.position(), 2);
    }

    #[tokio::test]
    async fn ambiguous_iterations_are_implementation_errors() {
        let parser = terminated_array(element(), exact_element(';'));
        let parsed = run_parser(&parser, text("ab;"), RunOptions::default()).await;
        assert_matches!(parsed, Err(ParserError::Implementation(_)));

        let parser = terminated_array_reference(element(), exact_element(';'));
        let parsed = run_parser(&parser, text("ab;"), RunOptions::default()).await;
        assert_matches!(parsed, Err(ParserError::Implementation(_)));
    }

    #[tokio::test]
    async fn terminators_may_be_empty() {
        let parser = terminated_array(exact_element(b'a'), end_of_input());
        let source = IterSource::new([b"aaa".to_vec()]);
        let parsed = run_parser(&parser, source, RunOptions::default()).await;
        assert_eq!(parsed.unwrap(), (vec![b'a'; 3], ()));
    }

    #[tokio::test]
    async fn sequences_end_at_the_terminator() {
        let parser = (terminated_sequence("*/".to_owned()), element());
        let chunks = ["a*", "b*", "/c"].map(str::to_owned);
        let parsed = run_parser(parser, IterSource::new(chunks), RunOptions::default()).await;
        assert_eq!(parsed.unwrap(), (("a*b".to_owned(), "*/".to_owned()), 'c'));
    }

    #[tokio::test]
    async fn empty_terminators_match_immediately() {
        let parsed = run_parser(
            terminated_sequence(String::new()),
            text(""),
            RunOptions::default(),
        );
        assert_eq!(parsed.await.unwrap(), (String::new(), String::new()));

        let parser = (terminated_sequence(Vec::<u8>::new()), fixed_length(2));
        let parsed = run_parser(parser, complete(&b"ab"[..]), RunOptions::default()).await;
        assert_eq!(parsed.unwrap(), ((vec![], vec![]), b"ab".to_vec()));
    }

    #[tokio::test]
    async fn long_sequences_grow_the_window() {
        for len in [0, 1, 62, 63, 64, 65, 127, 128, 129, 1000, 4097] {
            let mut input = vec![b'x'; len];
            input.extend_from_slice(b"END");
            input.extend_from_slice(b"tail");
            let chunks: Vec<Vec<u8>> = input.chunks(7).map(<[u8]>::to_vec).collect();

            let parser = (terminated_sequence(b"END".to_vec()), fixed_length(4));
            let parsed = run_parser(parser, IterSource::new(chunks), RunOptions::default()).await;
            let ((content, terminator), tail) = parsed.unwrap();
            assert_eq!(content.len(), len);
            assert_eq!(terminator, b"END");
            assert_eq!(tail, b"tail");
        }
    }

    #[tokio::test]
    async fn missing_terminators_fail_at_the_end_of_input() {
        for len in [0, 1, 2, 63, 64, 65, 100, 128, 129, 1000] {
            let mut input = "y".repeat(len);
            input.push('E');
            input.push('N');
            let parser = terminated_sequence("END".to_owned());
            let parsed = run_parser(parser, complete(input), RunOptions::default()).await;
            let err = parsed.unwrap_err();
            assert_matches!(
                err.parsing_failure().map(|failure| failure.kind()),
                Some(FailureKind::UnexpectedEndOfInput)
            );
        }
    }
}
