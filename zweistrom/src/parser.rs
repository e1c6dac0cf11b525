use std::{borrow::Cow, future::Future, marker::PhantomData, pin::Pin, rc::Rc};

use crate::{ParserContext, ParserError, Sequence};

/// A boxed future that is not required to be [`Send`].
///
/// Parsers run on a single thread, so none of the futures produced by this crate are `Send`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Return type of parsers.
///
/// A [`ParserError::ParsingFailed`] value indicates that the input does not match the expected
/// input of the parser. Combinators that try alternatives recover from this error, any other error
/// is passed on.
pub type ParseResult<T> = Result<T, ParserError>;

/// An asynchronous parser producing values of type [`Output`][Self::Output] from a sequence type
/// `S`.
///
/// A parser consumes input by reading from the [`ParserContext`] it is given. It must not keep
/// references to the context after the returned future completed.
///
/// Parsers are usually composed from the combinators in [`combinators`][crate::combinators], but
/// can also be implemented directly, or from a closure using [`parser_fn`]. Tuples of parsers are
/// parsers that run their elements in order and produce a tuple of the outputs.
pub trait Parser<S: Sequence> {
    /// The type of the parsed value.
    type Output: 'static;

    /// Parses a value, advancing the context past the consumed input.
    fn parse<'a>(&'a self, ctx: &'a ParserContext<S>) -> BoxFuture<'a, ParseResult<Self::Output>>;

    /// A human readable name used in traces and error messages.
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed(std::any::type_name::<Self>())
    }
}

/// A type erased, reference counted parser.
pub type BoxedParser<S, T> = Rc<dyn Parser<S, Output = T>>;

impl<S: Sequence, P: Parser<S> + ?Sized> Parser<S> for Rc<P> {
    type Output = P::Output;

    #[inline]
    fn parse<'a>(&'a self, ctx: &'a ParserContext<S>) -> BoxFuture<'a, ParseResult<Self::Output>> {
        (**self).parse(ctx)
    }

    fn name(&self) -> Cow<'static, str> {
        (**self).name()
    }
}

impl<S: Sequence, P: Parser<S> + ?Sized> Parser<S> for &P {
    type Output = P::Output;

    #[inline]
    fn parse<'a>(&'a self, ctx: &'a ParserContext<S>) -> BoxFuture<'a, ParseResult<Self::Output>> {
        (**self).parse(ctx)
    }

    fn name(&self) -> Cow<'static, str> {
        (**self).name()
    }
}

impl<S: Sequence, P: Parser<S> + ?Sized> Parser<S> for Box<P> {
    type Output = P::Output;

    #[inline]
    fn parse<'a>(&'a self, ctx: &'a ParserContext<S>) -> BoxFuture<'a, ParseResult<Self::Output>> {
        (**self).parse(ctx)
    }

    fn name(&self) -> Cow<'static, str> {
        (**self).name()
    }
}

macro_rules! tuple_parser {
    ($($P:ident $p:ident),+) => {
        impl<S: Sequence, $($P: Parser<S>),+> Parser<S> for ($($P,)+) {
            type Output = ($($P::Output,)+);

            fn parse<'a>(
                &'a self,
                ctx: &'a ParserContext<S>,
            ) -> BoxFuture<'a, ParseResult<Self::Output>> {
                let ($($p,)+) = self;
                Box::pin(async move { Ok(($($p.parse(ctx).await?,)+)) })
            }
        }
    };
}

tuple_parser!(A a);
tuple_parser!(A a, B b);
tuple_parser!(A a, B b, C c);
tuple_parser!(A a, B b, C c, D d);
tuple_parser!(A a, B b, C c, D d, E e);
tuple_parser!(A a, B b, C c, D d, E e, F f);
tuple_parser!(A a, B b, C c, D d, E e, F f, G g);
tuple_parser!(A a, B b, C c, D d, E e, F f, G g, H h);

/// Parser created by [`parser_fn`].
pub struct ParserFn<F, T> {
    f: F,
    _output: PhantomData<fn() -> T>,
}

/// Creates a parser from a closure returning a boxed future.
///
/// ```
/// # use zweistrom::*;
/// let two = parser_fn(|ctx: &ParserContext<String>| {
///     Box::pin(async move { Ok((ctx.read(0).await?, ctx.read(0).await?)) })
/// });
/// # let _ = two;
/// ```
pub fn parser_fn<S, T, F>(f: F) -> ParserFn<F, T>
where
    S: Sequence,
    F: for<'a> Fn(&'a ParserContext<S>) -> BoxFuture<'a, ParseResult<T>>,
{
    ParserFn {
        f,
        _output: PhantomData,
    }
}

impl<S, T, F> Parser<S> for ParserFn<F, T>
where
    S: Sequence,
    T: 'static,
    F: for<'a> Fn(&'a ParserContext<S>) -> BoxFuture<'a, ParseResult<T>>,
{
    type Output = T;

    #[inline]
    fn parse<'a>(&'a self, ctx: &'a ParserContext<S>) -> BoxFuture<'a, ParseResult<T>> {
        (self.f)(ctx)
    }
}

/// Parser created by [`ParserExt::map`].
pub struct Map<P, F> {
    parser: P,
    f: F,
}

impl<S, P, F, T> Parser<S> for Map<P, F>
where
    S: Sequence,
    P: Parser<S>,
    F: Fn(P::Output) -> T,
    T: 'static,
{
    type Output = T;

    fn parse<'a>(&'a self, ctx: &'a ParserContext<S>) -> BoxFuture<'a, ParseResult<T>> {
        Box::pin(async move {
            let value = self.parser.parse(ctx).await?;
            Ok((self.f)(value))
        })
    }

    fn name(&self) -> Cow<'static, str> {
        self.parser.name()
    }
}

/// Parser created by [`lazy`].
pub struct Lazy<F> {
    f: F,
}

/// Defers constructing a parser until it is run.
///
/// This is used to define recursive grammars, where a parser contains itself. The closure is called
/// every time the parser runs.
pub fn lazy<F>(f: F) -> Lazy<F> {
    Lazy { f }
}

impl<S, F, P> Parser<S> for Lazy<F>
where
    S: Sequence,
    F: Fn() -> P,
    P: Parser<S> + 'static,
{
    type Output = P::Output;

    fn parse<'a>(&'a self, ctx: &'a ParserContext<S>) -> BoxFuture<'a, ParseResult<P::Output>> {
        let parser = (self.f)();
        Box::pin(async move { parser.parse(ctx).await })
    }
}

/// Parser created by [`named`].
pub struct Named<P> {
    name: Cow<'static, str>,
    parser: P,
}

/// Overrides the [name][Parser::name] of a parser.
pub fn named<P>(name: impl Into<Cow<'static, str>>, parser: P) -> Named<P> {
    Named {
        name: name.into(),
        parser,
    }
}

impl<S: Sequence, P: Parser<S>> Parser<S> for Named<P> {
    type Output = P::Output;

    #[inline]
    fn parse<'a>(&'a self, ctx: &'a ParserContext<S>) -> BoxFuture<'a, ParseResult<P::Output>> {
        self.parser.parse(ctx)
    }

    fn name(&self) -> Cow<'static, str> {
        self.name.clone()
    }
}

/// Additional methods for [`Parser`] values.
pub trait ParserExt<S: Sequence>: Parser<S> + Sized {
    /// Replaces a successfully parsed value with the value returned when applying the function `f`
    /// to it.
    fn map<F, T>(self, f: F) -> Map<Self, F>
    where
        F: Fn(Self::Output) -> T,
        T: 'static,
    {
        Map { parser: self, f }
    }

    /// Erases the type of the parser.
    fn boxed(self) -> BoxedParser<S, Self::Output>
    where
        Self: 'static,
    {
        Rc::new(self)
    }
}

impl<S: Sequence, P: Parser<S>> ParserExt<S> for P {}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::{
        combinators::{
            disjunction, element_matching, exact_sequence, non_empty_array, optional,
        },
        run_parser,
        source::complete,
        RunOptions,
    };

    #[derive(Debug, PartialEq)]
    enum Tree {
        Leaf(char),
        Node(Vec<Tree>),
    }

    fn tree() -> BoxedParser<String, Tree> {
        disjunction(vec![
            ParserExt::<String>::map(
                element_matching(|c: &char| c.is_ascii_lowercase()),
                Tree::Leaf,
            )
            .boxed(),
            (
                exact_sequence("(".to_owned()),
                non_empty_array(lazy(tree)),
                exact_sequence(")".to_owned()),
            )
                .map(|(_, children, _): (String, Vec<Tree>, String)| Tree::Node(children))
                .boxed(),
        ])
        .boxed()
    }

    #[tokio::test]
    async fn recursive_grammar() {
        let parsed = run_parser(tree(), complete("(a(bc)d)"), RunOptions::default()).await;
        assert_eq!(
            parsed.unwrap(),
            Tree::Node(vec![
                Tree::Leaf('a'),
                Tree::Node(vec![Tree::Leaf('b'), Tree::Leaf('c')]),
                Tree::Leaf('d'),
            ])
        );

        let parsed = run_parser(tree(), complete("(a(b)"), RunOptions::default()).await;
        assert_matches!(parsed, Err(ParserError::ParsingFailed(_)));
    }

    #[tokio::test]
    async fn tuples_run_in_order() {
        let parser = (
            exact_sequence("begin ".to_owned()),
            optional(exact_sequence("value ".to_owned())),
            exact_sequence("end".to_owned()),
        );
        let parsed = run_parser(&parser, complete("begin value end"), RunOptions::default()).await;
        assert_eq!(
            parsed.unwrap(),
            ("begin ".to_owned(), Some("value ".to_owned()), "end".to_owned())
        );

        let parsed = run_parser(&parser, complete("begin end"), RunOptions::default()).await;
        assert_eq!(parsed.unwrap().1, None);

        let parsed = run_parser(&parser, complete("begin value"), RunOptions::default()).await;
        let err = parsed.unwrap_err();
        assert_eq!(err.position(), Some(6));
    }

    #[tokio::test]
    async fn function_parsers() {
        let pair = parser_fn(|ctx: &ParserContext<String>| {
            Box::pin(async move {
                let first = ctx.read(0).await?;
                let second = ctx.read(0).await?;
                Ok((first, second))
            })
        });
        let parsed = run_parser(pair, complete("xy"), RunOptions::default()).await;
        assert_eq!(parsed.unwrap(), ('x', 'y'));
    }

    #[test]
    fn names() {
        let parser = named("greeting", exact_sequence("hi".to_owned()));
        assert_eq!(Parser::<String>::name(&parser), "greeting");
        let boxed: BoxedParser<String, String> = parser.boxed();
        assert_eq!(boxed.name(), "greeting");
        let mapped = named("len", exact_sequence("hi".to_owned())).map(|s: String| s.len());
        assert_eq!(Parser::<String>::name(&mapped), "len");
    }
}
