use std::time::{Duration, Instant};

use assert_matches::assert_matches;

use zweistrom::{
    binary::uleb128,
    combinators::{
        array, disjunction, element, element_matching, exact_element, exact_sequence,
        fixed_length, optional, separated_array, slice_bounded, terminated_array,
        terminated_sequence, union,
    },
    parser_fn, run_parser, run_parser_with_remaining_input,
    source::{complete, ChunkSource, IoSource, IterSource},
    ErrorJoinMode, FailureKind, Parser, ParserContext, ParserError, ParserExt, RunOptions,
    Sequence,
};

fn text(input: &str) -> IterSource<std::option::IntoIter<String>> {
    complete(input)
}

fn position<S: Sequence>() -> impl Parser<S, Output = usize> {
    parser_fn(|ctx: &ParserContext<S>| Box::pin(async move { Ok(ctx.position()) }))
}

#[tokio::test]
async fn leb128_values_across_chunk_boundaries() {
    const INPUT: &[u8] = &[0x02, 0x7f, 0x80, 0x01, 0xe5, 0x8e, 0x26];
    for chunk_size in [1, 2, 3, 64] {
        let mut source = IoSource::new(INPUT);
        source.set_chunk_size(chunk_size);
        let parsed = run_parser(array(uleb128::<u64>()), source, RunOptions::default()).await;
        assert_eq!(parsed.unwrap(), [2, 127, 128, 624485]);
    }
}

async fn elapsed_parsing_single_chunk(len: usize) -> Duration {
    let input = "ä".repeat(len);
    let mut fastest = Duration::MAX;
    for _ in 0..3 {
        let start = Instant::now();
        let parsed = run_parser(array(element()), text(&input), RunOptions::default()).await;
        fastest = fastest.min(start.elapsed());
        assert_eq!(parsed.unwrap().len(), len);
    }
    fastest
}

#[tokio::test]
async fn single_chunk_text_parses_in_linear_time() {
    let small = elapsed_parsing_single_chunk(20_000).await;
    let large = elapsed_parsing_single_chunk(80_000).await;
    // Quadruple the input, which takes sixteen times as long when indexing is linear
    assert!(
        large < small * 10,
        "parsing 4x the input took {large:?} compared to {small:?}"
    );
}

#[tokio::test]
async fn exact_sequence_advances_past_the_match() {
    let parser = (exact_sequence("foo".to_owned()), position());
    let parsed = run_parser(parser, text("foo"), RunOptions::default()).await;
    assert_eq!(parsed.unwrap(), ("foo".to_owned(), 3));
}

#[tokio::test]
async fn identical_union_alternatives_are_ambiguous() {
    let parser = union(vec![
        exact_sequence("foo".to_owned()).boxed(),
        exact_sequence("foo".to_owned()).boxed(),
    ]);
    let parsed = run_parser(parser, text("foo"), RunOptions::default()).await;
    let err = assert_matches!(parsed, Err(ParserError::Implementation(err)) => err);
    assert!(err
        .message()
        .contains(r#"union[0] exact_sequence("foo") => "foo""#));
    assert!(err
        .message()
        .contains(r#"union[1] exact_sequence("foo") => "foo""#));
}

#[tokio::test]
async fn optional_failures_do_not_consume_input() {
    let prefix = (exact_sequence("ab".to_owned()), exact_sequence("x".to_owned()));
    let parser = (optional(prefix), fixed_length(3));
    let parsed = run_parser(parser, text("abc"), RunOptions::default()).await;
    assert_eq!(parsed.unwrap(), (None, "abc".to_owned()));
}

#[tokio::test]
async fn trailing_separators_are_not_consumed() {
    let letter = element_matching(|c: &char| c.is_ascii_alphabetic());
    let parser = (separated_array(letter, exact_element(',')), exact_element(','));
    let parsed = run_parser(parser, text("a,b,"), RunOptions::default()).await;
    assert_eq!(parsed.unwrap(), (vec!['a', 'b'], ','));
}

fn alternatives() -> impl Parser<String, Output = ()> {
    let shallow = (exact_sequence("a".to_owned()), exact_sequence("x".to_owned()));
    let furthest = (exact_sequence("ab".to_owned()), exact_sequence("x".to_owned()));
    let deepest = slice_bounded(1, exact_sequence("z".to_owned()));
    disjunction(vec![
        shallow.map(|_| ()).boxed(),
        furthest.map(|_| ()).boxed(),
        deepest.map(|_| ()).boxed(),
    ])
}

async fn join_failure(options: RunOptions) -> Vec<(usize, usize)> {
    let parsed = run_parser(alternatives(), text("abc"), options).await;
    let err = parsed.unwrap_err();
    let failure = err.parsing_failure().unwrap();
    let join = assert_matches!(failure.kind(), FailureKind::Join(join) => join);
    assert_eq!(join.mode(), options.error_join_mode);
    assert_eq!(failure.position(), 0);
    failure
        .child_errors()
        .iter()
        .map(|child| (child.position(), child.depth()))
        .collect()
}

#[tokio::test]
async fn join_modes_select_child_failures() {
    let options = RunOptions::default();
    assert!(join_failure(options).await.is_empty());
    assert_eq!(
        join_failure(options.error_join_mode(ErrorJoinMode::All)).await,
        [(1, 1), (2, 1), (0, 2)]
    );
    assert_eq!(
        join_failure(options.error_join_mode(ErrorJoinMode::Furthest)).await,
        [(2, 1)]
    );
    assert_eq!(
        join_failure(options.error_join_mode(ErrorJoinMode::Deepest)).await,
        [(0, 2)]
    );
}

#[tokio::test]
async fn failures_record_the_cursor_stack() {
    let options = RunOptions::default()
        .error_join_mode(ErrorJoinMode::Deepest)
        .error_stack(true);
    let parsed = run_parser(alternatives(), text("abc"), options).await;
    let err = parsed.unwrap_err();
    let failure = err.parsing_failure().unwrap();
    assert_eq!(failure.stack().unwrap(), ["root"]);
    let child = &failure.child_errors()[0];
    assert_eq!(child.stack().unwrap(), ["slice", "disjunction[2]", "root"]);

    let message = failure.to_string();
    assert!(message.starts_with("no alternative matched at position 0: expected one of:"));
    assert!(message.contains("\n  parsing failed at position 0"));
}

#[tokio::test]
async fn union_failures_are_joined_in_order() {
    let parser = union(vec![
        exact_sequence("bar".to_owned()).boxed(),
        (exact_sequence("f".to_owned()), exact_sequence("x".to_owned()))
            .map(|(f, x): (String, String)| f + &x)
            .boxed(),
    ]);
    let options = RunOptions::default().error_join_mode(ErrorJoinMode::All);
    let parsed = run_parser(parser, text("foo"), options).await;
    let err = parsed.unwrap_err();
    let positions: Vec<_> = err
        .parsing_failure()
        .unwrap()
        .child_errors()
        .iter()
        .map(|child| child.position())
        .collect();
    assert_eq!(positions, [0, 1]);
}

#[tokio::test]
async fn headers_split_across_many_chunks() {
    let header = format!("Name: {}\r\n\r\n", "x".repeat(300));
    let mut input = header.clone().into_bytes();
    input.extend_from_slice(b"body");
    let chunks: Vec<Vec<u8>> = input.chunks(7).map(<[u8]>::to_vec).collect();

    let (parsed, remaining) = run_parser_with_remaining_input(
        terminated_sequence(b"\r\n\r\n".to_vec()),
        IterSource::new(chunks),
        RunOptions::default(),
    )
    .await
    .unwrap();
    assert_eq!(parsed.0, header.as_bytes()[..header.len() - 4]);
    assert_eq!(parsed.1, b"\r\n\r\n");
    assert_eq!(remaining.unwrap().into_sequence().await.unwrap(), b"body");
}

#[tokio::test]
async fn terminated_arrays_report_both_alternatives() {
    let parser = terminated_array(
        element_matching(|c: &char| c.is_ascii_digit()),
        exact_element(';'),
    );
    let parsed = run_parser(&parser, text("12;"), RunOptions::default()).await;
    assert_eq!(parsed.unwrap(), (vec!['1', '2'], ';'));

    let options = RunOptions::default().error_join_mode(ErrorJoinMode::All);
    let parsed = run_parser(&parser, text("12x"), options).await;
    let err = parsed.unwrap_err();
    let failure = err.parsing_failure().unwrap();
    assert_eq!(failure.position(), 2);
    assert_eq!(failure.child_errors().len(), 2);
}

struct Unreadable;

impl ChunkSource<Vec<u8>> for Unreadable {
    fn next_chunk(&mut self) -> zweistrom::BoxFuture<'_, std::io::Result<Option<Vec<u8>>>> {
        Box::pin(async { Err(std::io::ErrorKind::PermissionDenied.into()) })
    }
}

#[tokio::test]
async fn io_errors_are_not_recovered_from() {
    let parser = optional(element());
    let parsed = run_parser(parser, Unreadable, RunOptions::default()).await;
    assert_matches!(
        parsed,
        Err(ParserError::Io(err)) if err.kind() == std::io::ErrorKind::PermissionDenied
    );
}
