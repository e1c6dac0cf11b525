//! The Zweistrom crate is a collection of parser and unparser combinators for streamed input.
//!
//! It targets codecs that have to go both ways: turning text or bytes into structured values and
//! turning those values back into text or bytes, for formats where the input arrives in chunks and
//! does not necessarily fit into memory at once.
//!
//! * _Streaming_: Input is pulled from a [`ChunkSource`][source::ChunkSource] only when a parser
//!   needs to look at it. Buffered input is released as soon as the outermost parser consumed it,
//!   so memory use is bounded by how far the parsers look ahead, not by the size of the input.
//!
//! * _Backtracking_: Every parser runs on a [`ParserContext`], a cursor into the shared input.
//!   Combinators that try alternatives create child contexts using
//!   [`lookahead`][ParserContext::lookahead], which are either committed to their parent, making
//!   their consumption permanent, or disposed, leaving the parent untouched.
//!
//! * _Asynchronous_: Parsers are async and suspend while waiting for input. This also allows
//!   running several alternatives concurrently, which [`union`][combinators::union] does to detect
//!   ambiguous grammars. Everything runs on a single thread within a tokio
//!   [`LocalSet`][tokio::task::LocalSet], so nothing here is `Send`.
//!
//! * _Error reporting_: A mismatch produces a [`ParsingFailure`] with the input position, the
//!   nesting depth of the context and a message that is only formatted when displayed. Combinators
//!   recover only from parsing failures. Violated invariants of the parsers themselves are reported
//!   as an [`ImplementationError`], and IO errors of the source take precedence over whatever
//!   failure they caused.
//!
//! * _Forward patching_: An [`Unparser`] can reserve output using
//!   [`write_later`][UnparserContext::write_later] and fill it in once its content is known, e.g.
//!   for a length prefix. Output before the first unfilled slot is passed on immediately.
//!
//! The engine is generic over the kind of input via the [`Sequence`] trait, implemented for
//! `String` (with `char` elements) and `Vec<u8>` (with `u8` elements).
//!
//! ## Using Zweistrom
//!
//! Parsers are built by combining smaller parsers and run using [`run_parser`]:
//! ```rust
//! use zweistrom::{
//!     combinators::{exact_element, separated_non_empty_array},
//!     run_parser,
//!     source::complete,
//!     text::ascii_digits,
//!     ParserExt, RunOptions,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), zweistrom::ParserError> {
//! let numbers = separated_non_empty_array(ascii_digits::<u32>(), exact_element(','));
//! // Parsers generic over the sequence type need it spelled out before mapping
//! let sum = ParserExt::<String>::map(numbers, |numbers: Vec<u32>| numbers.iter().sum::<u32>());
//! let parsed = run_parser(sum, complete::<String>("1,2,3"), RunOptions::default()).await?;
//! assert_eq!(parsed, 6);
//! # Ok(())
//! # }
//! ```
//!
//! Unparsers are functions or closures writing into an [`UnparserContext`]:
//! ```rust
//! use zweistrom::{run_unparser, write::text::write_zero_padded, UnparserContext, UnparserError};
//!
//! fn length_prefixed(
//!     payload: &str,
//!     ctx: &mut UnparserContext<String>,
//! ) -> Result<(), UnparserError> {
//!     let prefix = ctx.write_later(4)?;
//!     ctx.write_element(':')?;
//!     let start = ctx.position();
//!     ctx.write_sequence(payload.to_owned())?;
//!     let len = ctx.position() - start;
//!     ctx.write_earlier(prefix, write_zero_padded(4), &len)
//! }
//!
//! let output = run_unparser(length_prefixed, "hello").unwrap();
//! assert_eq!(output.concat(), "0005:hello");
//! ```

#![warn(missing_docs)]
mod chunk_buffer;
mod context;
mod error;
mod input_reader;
mod parser;
mod remaining;
mod run;
mod sequence;
mod unparser;

pub mod binary;
pub mod combinators;
pub mod source;
pub mod text;
pub mod write;

pub use context::{LookaheadOptions, ParserContext};
pub use error::{
    ErrorJoinMode, FailureKind, ImplementationError, JoinFailure, ParserError, ParsingFailure,
    UnparserError,
};
pub use input_reader::InputReader;
pub use parser::{
    lazy, named, parser_fn, BoxFuture, BoxedParser, Lazy, Map, Named, ParseResult, Parser,
    ParserExt, ParserFn,
};
pub use remaining::RemainingInput;
pub use run::{run_parser, run_parser_with_remaining_input, RunOptions};
pub use sequence::{Chunk, Sequence};
pub use unparser::{run_unparser, run_unparser_with_sink, Slot, Unparser, UnparserContext};
