//! Error types for parsing and unparsing.
use std::{borrow::Cow, fmt, io, rc::Rc};

use thiserror::Error;

/// A message that is only formatted when it is observed.
pub(crate) type LazyMessage = Rc<dyn Fn() -> String>;

/// Policy for aggregating the failures of alternatives that all failed to match.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ErrorJoinMode {
    /// Drop the failures of individual alternatives.
    #[default]
    None,
    /// Keep the failure raised at the deepest cursor nesting level.
    Deepest,
    /// Keep the failure raised at the furthest input position.
    Furthest,
    /// Keep the failures of all alternatives.
    All,
}

/// Any error returned by a parser.
///
/// Only [`ParsingFailed`][Self::ParsingFailed] is a recoverable "this alternative did not match"
/// signal. Combinators exploring alternatives catch it and nothing else; every other variant is
/// passed on unchanged to the caller of [`run_parser`][crate::run_parser].
#[derive(Error, Debug)]
pub enum ParserError {
    /// The input did not match the parser.
    #[error(transparent)]
    ParsingFailed(Box<ParsingFailure>),
    /// The parser was composed incorrectly.
    #[error(transparent)]
    Implementation(#[from] ImplementationError),
    /// Reading from the input source failed.
    #[error("IO error during parsing: {}", .0)]
    Io(#[source] io::Error),
}

impl ParserError {
    /// Returns `true` for recoverable parsing failures.
    #[inline]
    pub fn is_parsing_failure(&self) -> bool {
        matches!(self, ParserError::ParsingFailed(_))
    }

    /// Returns the parsing failure if this is one.
    pub fn parsing_failure(&self) -> Option<&ParsingFailure> {
        match self {
            ParserError::ParsingFailed(failure) => Some(failure),
            _ => None,
        }
    }

    /// Input position at which the error was raised, if known.
    pub fn position(&self) -> Option<usize> {
        match self {
            ParserError::ParsingFailed(failure) => Some(failure.position),
            ParserError::Implementation(err) => Some(err.position),
            ParserError::Io(_) => None,
        }
    }
}

impl From<ParsingFailure> for ParserError {
    fn from(failure: ParsingFailure) -> Self {
        ParserError::ParsingFailed(Box::new(failure))
    }
}

impl From<io::Error> for ParserError {
    fn from(err: io::Error) -> Self {
        ParserError::Io(err)
    }
}

/// A parser was composed in a way that violates an invariant of the engine.
///
/// This indicates a bug in the grammar, e.g. a union with more than one matching alternative, and
/// is never caught by combinators.
#[derive(Error, Debug)]
#[error("parser implementation invariant violated at position {position}: {message}")]
pub struct ImplementationError {
    position: usize,
    message: String,
}

impl ImplementationError {
    pub(crate) fn new(position: usize, message: impl Into<String>) -> Self {
        ImplementationError {
            position,
            message: message.into(),
        }
    }

    /// Input position at which the invariant was violated.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Description of the violated invariant.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// The kind of a [`ParsingFailure`].
#[derive(Debug)]
pub enum FailureKind {
    /// An explicit precondition of a parser did not hold, e.g. an unexpected element.
    Invariant,
    /// The input ended before the parser matched.
    UnexpectedEndOfInput,
    /// The parser matched, but did not consume the whole input.
    UnexpectedRemainingInput,
    /// Several alternatives failed to match.
    Join(JoinFailure),
}

/// The aggregated failures of several alternatives.
#[derive(Debug)]
pub struct JoinFailure {
    mode: ErrorJoinMode,
    child_errors: Vec<ParsingFailure>,
}

impl JoinFailure {
    pub(crate) fn new(mode: ErrorJoinMode, child_errors: Vec<ParsingFailure>) -> Self {
        let child_errors = match mode {
            ErrorJoinMode::None => vec![],
            ErrorJoinMode::All => child_errors,
            ErrorJoinMode::Deepest => first_max_by_key(child_errors, |failure| failure.depth),
            ErrorJoinMode::Furthest => first_max_by_key(child_errors, |failure| failure.position),
        };
        JoinFailure { mode, child_errors }
    }

    /// The join mode that selected the child errors.
    pub fn mode(&self) -> ErrorJoinMode {
        self.mode
    }

    /// The failures of the alternatives that were kept by the join mode.
    pub fn child_errors(&self) -> &[ParsingFailure] {
        &self.child_errors
    }
}

fn first_max_by_key(
    failures: Vec<ParsingFailure>,
    key: impl Fn(&ParsingFailure) -> usize,
) -> Vec<ParsingFailure> {
    let mut best: Option<ParsingFailure> = None;
    for failure in failures {
        if best.as_ref().map_or(true, |best| key(&failure) > key(best)) {
            best = Some(failure);
        }
    }
    best.into_iter().collect()
}

/// A recoverable failure: the input did not match what a parser expected.
///
/// The message is stored as a closure and only formatted when the failure is displayed, so that
/// failing alternatives stay cheap while backtracking.
pub struct ParsingFailure {
    kind: FailureKind,
    position: usize,
    depth: usize,
    message: LazyMessage,
    stack: Option<Vec<Cow<'static, str>>>,
}

impl ParsingFailure {
    pub(crate) fn new(
        kind: FailureKind,
        position: usize,
        depth: usize,
        message: LazyMessage,
        stack: Option<Vec<Cow<'static, str>>>,
    ) -> Self {
        ParsingFailure {
            kind,
            position,
            depth,
            message,
            stack,
        }
    }

    /// The kind of failure.
    pub fn kind(&self) -> &FailureKind {
        &self.kind
    }

    /// Input position at which the failure was raised.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Cursor nesting level at which the failure was raised.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Formats the failure message.
    pub fn message(&self) -> String {
        (self.message)()
    }

    /// Debug names of the cursor that raised the failure and its ancestors.
    ///
    /// Only recorded when [`RunOptions::error_stack`][crate::RunOptions::error_stack] is set.
    pub fn stack(&self) -> Option<&[Cow<'static, str>]> {
        self.stack.as_deref()
    }

    /// The aggregated child failures if this is a join failure.
    pub fn child_errors(&self) -> &[ParsingFailure] {
        match &self.kind {
            FailureKind::Join(join) => join.child_errors(),
            _ => &[],
        }
    }
}

impl fmt::Debug for ParsingFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParsingFailure")
            .field("kind", &self.kind)
            .field("position", &self.position)
            .field("depth", &self.depth)
            .field("message", &self.message())
            .field("stack", &self.stack)
            .finish()
    }
}

impl fmt::Display for ParsingFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            FailureKind::Invariant => "parsing failed",
            FailureKind::UnexpectedEndOfInput => "unexpected end of input",
            FailureKind::UnexpectedRemainingInput => "unexpected remaining input",
            FailureKind::Join(_) => "no alternative matched",
        };
        write!(f, "{kind} at position {}: {}", self.position, self.message())?;
        if let Some(stack) = &self.stack {
            write!(f, " (in {})", stack.join(" < "))?;
        }
        for child in self.child_errors() {
            for line in child.to_string().lines() {
                write!(f, "\n  {line}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ParsingFailure {}

/// Any error returned by an unparser.
#[derive(Error, Debug)]
pub enum UnparserError {
    /// A slot was filled with a different amount of output than was reserved for it.
    #[error("slot at position {position} reserved {expected} elements but was filled with {actual}")]
    SlotLengthMismatch {
        /// Position of the slot.
        position: usize,
        /// Reserved length.
        expected: usize,
        /// Length of the produced output.
        actual: usize,
    },
    /// A slot was filled more than once.
    #[error("slot at position {position} was already filled")]
    SlotAlreadyFilled {
        /// Position of the slot.
        position: usize,
    },
    /// Output was reserved with `write_later` but never filled.
    #[error("slot at position {position} was never filled")]
    UnfilledSlot {
        /// Position of the slot.
        position: usize,
    },
    /// The input value cannot be represented by the unparser.
    #[error("cannot unparse at position {position}: {message}")]
    Invalid {
        /// Output position at which the unparser gave up.
        position: usize,
        /// Description of the problem.
        message: String,
    },
}
