use std::{borrow::Cow, collections::BTreeMap};

use crate::{BoxFuture, BoxedParser, ParseResult, Parser, ParserContext, ParserExt, Sequence};

enum Field<S: Sequence, V> {
    Parsed(&'static str, BoxedParser<S, V>),
    Literal(&'static str, V),
    Ignored(BoxedParser<S, ()>),
}

/// Parser created by [`object`].
///
/// Fields are parsed in the order they were added. Failures are not recovered from, so a failing
/// field fails the whole object.
pub struct Object<S: Sequence, V> {
    fields: Vec<Field<S, V>>,
}

/// Creates an object parser without any fields.
///
/// Fields are added using [`field`][Object::field], [`literal`][Object::literal] and
/// [`ignored`][Object::ignored].
pub fn object<S: Sequence, V>() -> Object<S, V> {
    Object { fields: vec![] }
}

impl<S: Sequence, V: Clone + 'static> Object<S, V> {
    /// Adds a field whose value is parsed by `parser`.
    pub fn field<P>(mut self, name: &'static str, parser: P) -> Self
    where
        P: Parser<S, Output = V> + 'static,
    {
        self.fields.push(Field::Parsed(name, parser.boxed()));
        self
    }

    /// Adds a field with a fixed value that does not consume any input.
    pub fn literal(mut self, name: &'static str, value: V) -> Self {
        self.fields.push(Field::Literal(name, value));
        self
    }

    /// Adds a parser whose output is discarded.
    pub fn ignored<P: Parser<S> + 'static>(mut self, parser: P) -> Self {
        self.fields.push(Field::Ignored(parser.map(|_| ()).boxed()));
        self
    }
}

impl<S: Sequence, V: Clone + 'static> Parser<S> for Object<S, V> {
    type Output = BTreeMap<&'static str, V>;

    fn parse<'a>(&'a self, ctx: &'a ParserContext<S>) -> BoxFuture<'a, ParseResult<Self::Output>> {
        Box::pin(async move {
            let mut values = BTreeMap::new();
            for field in &self.fields {
                match field {
                    Field::Parsed(name, parser) => {
                        values.insert(*name, parser.parse(ctx).await?);
                    }
                    Field::Literal(name, value) => {
                        values.insert(*name, value.clone());
                    }
                    Field::Ignored(parser) => parser.parse(ctx).await?,
                }
            }
            Ok(values)
        })
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("object")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        combinators::{exact_sequence, fixed_length},
        run_parser,
        source::complete,
        RunOptions,
    };

    #[tokio::test]
    async fn fields_are_parsed_in_order() {
        let parser = object()
            .field("first", fixed_length(2))
            .ignored(exact_sequence("=".to_owned()))
            .literal("kind", "pair".to_owned())
            .field("second", fixed_length(3));
        let parsed = run_parser(parser, complete("ab=cde"), RunOptions::default()).await;
        let parsed = parsed.unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed["first"], "ab");
        assert_eq!(parsed["kind"], "pair");
        assert_eq!(parsed["second"], "cde");
    }
}
