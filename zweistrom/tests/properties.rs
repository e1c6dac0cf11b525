//! Property based tests comparing parsers against their unparsers and reference implementations.
use std::future::Future;

use proptest::prelude::*;

use zweistrom::{
    binary::{sleb128, uleb128, write_sleb128, write_uleb128},
    combinators::{
        array, element_matching, exact_element, fixed_length, slice_bounded, terminated_array,
        terminated_array_reference,
    },
    lazy, parser_fn, run_parser, run_parser_with_remaining_input, run_unparser,
    run_unparser_with_sink,
    source::{complete, IterSource},
    text::ascii_digits,
    write::text::write_zero_padded,
    BoxedParser, Chunk, FailureKind, ParseResult, Parser, ParserContext, ParserError, ParserExt,
    RunOptions, Sequence, UnparserContext, UnparserError,
};

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

fn chunked(input: &str, size: usize) -> IterSource<std::vec::IntoIter<String>> {
    let chars: Vec<char> = input.chars().collect();
    let chunks: Vec<String> = chars.chunks(size).map(|chunk| chunk.iter().collect()).collect();
    IterSource::new(chunks)
}

fn outcome<T>(result: ParseResult<T>) -> Result<T, &'static str> {
    match result {
        Ok(value) => Ok(value),
        Err(ParserError::ParsingFailed(_)) => Err("parsing failure"),
        Err(ParserError::Implementation(_)) => Err("implementation error"),
        Err(_) => Err("io error"),
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Node {
    Leaf(String),
    List(Vec<Node>),
}

fn arb_node() -> impl Strategy<Value = Node> {
    let leaf = "[a-z]{0,5}".prop_map(Node::Leaf);
    leaf.prop_recursive(3, 32, 4, |inner| {
        prop::collection::vec(inner, 0..4).prop_map(Node::List)
    })
}

/// Writes a tag, a three digit length prefix and the content of a node.
fn write_node(node: &Node, ctx: &mut UnparserContext<'_, String>) -> Result<(), UnparserError> {
    let tag = match node {
        Node::Leaf(_) => 'L',
        Node::List(_) => 'N',
    };
    ctx.write_element(tag)?;
    let prefix = ctx.write_later(3)?;
    let start = ctx.position();
    match node {
        Node::Leaf(text) => ctx.write_sequence(text.clone())?,
        Node::List(children) => {
            for child in children {
                write_node(child, ctx)?;
            }
        }
    }
    let len = ctx.position() - start;
    ctx.write_earlier(prefix, write_zero_padded(3), &len)
}

fn node() -> BoxedParser<String, Node> {
    parser_fn(|ctx: &ParserContext<String>| {
        Box::pin(async move {
            let tag = ctx.read(0).await?;
            let len = slice_bounded(3, ascii_digits::<usize>()).parse(ctx).await?;
            if tag == 'L' {
                return Ok(Node::Leaf(fixed_length(len).parse(ctx).await?));
            }
            ctx.invariant(tag == 'N', move || format!("unknown tag {tag:?}"))?;
            let children = slice_bounded(len, array(lazy(node))).parse(ctx).await?;
            Ok(Node::List(children))
        })
    })
    .boxed()
}

proptest! {
    #[test]
    fn leb128_round_trips(unsigned in any::<u64>(), signed in any::<i64>()) {
        let encoded = <Vec<u8>>::concat(&run_unparser(write_uleb128, &unsigned).unwrap());
        let decoded = run_parser(uleb128::<u64>(), complete(encoded), RunOptions::default());
        let decoded = block_on(decoded);
        prop_assert_eq!(decoded.unwrap(), unsigned);

        let encoded = <Vec<u8>>::concat(&run_unparser(write_sleb128, &signed).unwrap());
        let decoded = run_parser(sleb128::<i64>(), complete(encoded), RunOptions::default());
        let decoded = block_on(decoded);
        prop_assert_eq!(decoded.unwrap(), signed);
    }

    #[test]
    fn length_prefixed_trees_round_trip(tree in arb_node(), chunk_size in 1usize..8) {
        let mut streamed = String::new();
        let sink = |chunk: Chunk<String>| streamed.push_str(&chunk.into_sequence());
        run_unparser_with_sink(write_node, &tree, sink).unwrap();
        let encoded = String::concat(&run_unparser(write_node, &tree).unwrap());
        prop_assert_eq!(&streamed, &encoded);

        let source = chunked(&encoded, chunk_size);
        let decoded = block_on(run_parser(node(), source, RunOptions::default()));
        prop_assert_eq!(decoded.unwrap(), tree);
    }

    #[test]
    fn fixed_lengths_are_exact(
        input in "[a-z]{0,20}",
        len in 0usize..25,
        chunk_size in 1usize..6
    ) {
        let parsed = block_on(run_parser_with_remaining_input(
            fixed_length(len),
            chunked(&input, chunk_size),
            RunOptions::default(),
        ));
        if len <= input.len() {
            let (value, remaining) = parsed.unwrap();
            prop_assert_eq!(value, &input[..len]);
            let rest = match remaining {
                Some(remaining) => block_on(remaining.into_sequence()).unwrap(),
                None => String::new(),
            };
            prop_assert_eq!(rest, &input[len..]);
        } else {
            let err = parsed.map(|_| ()).unwrap_err();
            let failure = err.parsing_failure().unwrap();
            prop_assert!(matches!(failure.kind(), FailureKind::UnexpectedEndOfInput));
        }
    }

    #[test]
    fn terminated_array_matches_its_reference(input in "[ab;]{0,12}", chunk_size in 1usize..4) {
        let single = || {
            ParserExt::<String>::map(element_matching(|c: &char| *c != ';'), |c: char| {
                String::from(c)
            })
        };
        let sequential = block_on(run_parser(
            terminated_array(single(), exact_element(';')),
            chunked(&input, chunk_size),
            RunOptions::default(),
        ));
        let reference = block_on(run_parser(
            terminated_array_reference(single(), exact_element(';')),
            chunked(&input, chunk_size),
            RunOptions::default(),
        ));
        prop_assert_eq!(outcome(sequential), outcome(reference));

        let sequential = block_on(run_parser(
            terminated_array(fixed_length(2), exact_element(';')),
            chunked(&input, chunk_size),
            RunOptions::default(),
        ));
        let reference = block_on(run_parser(
            terminated_array_reference(fixed_length(2), exact_element(';')),
            chunked(&input, chunk_size),
            RunOptions::default(),
        ));
        prop_assert_eq!(outcome(sequential), outcome(reference));
    }
}
