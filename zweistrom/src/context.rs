use std::{
    borrow::Cow,
    cell::RefCell,
    future::Future,
    rc::{Rc, Weak},
};

use tracing::trace;

use crate::{
    error::{FailureKind, ImplementationError, JoinFailure, LazyMessage, ParsingFailure},
    input_reader::InputReader,
    ParserError, RunOptions, Sequence,
};

type CursorRef = Rc<RefCell<Cursor>>;

struct Cursor {
    name: Option<Cow<'static, str>>,
    position: usize,
    slice_end: Option<usize>,
    depth: usize,
    parent: Option<CursorRef>,
    children: Vec<Weak<RefCell<Cursor>>>,
    committed: bool,
    disposed: bool,
}

/// Follows committed cursors up to the cursor their consumption is applied to.
fn resolve(cursor: &CursorRef) -> CursorRef {
    let mut current = Rc::clone(cursor);
    loop {
        let next = {
            let inner = current.borrow();
            match &inner.parent {
                Some(parent) if inner.committed => Some(Rc::clone(parent)),
                _ => None,
            }
        };
        match next {
            Some(parent) => current = parent,
            None => return current,
        }
    }
}

fn dispose_cursor(cursor: &CursorRef) {
    let children = {
        let mut inner = cursor.borrow_mut();
        if inner.disposed {
            return;
        }
        inner.disposed = true;
        trace!(cursor = ?inner.name, position = inner.position, "dispose");
        std::mem::take(&mut inner.children)
    };
    for child in children {
        if let Some(child) = child.upgrade() {
            dispose_cursor(&child);
        }
    }
}

fn commit_cursor<S: Sequence>(
    reader: &InputReader<S>,
    cursor: &CursorRef,
) -> Result<(), ParserError> {
    let (parent, position) = {
        let inner = cursor.borrow();
        let name = || inner.name.as_deref().unwrap_or("<unnamed>").to_owned();
        if inner.committed {
            return Err(commit_error(inner.position, || {
                format!("cursor {} was already committed", name())
            }));
        }
        if inner.disposed {
            return Err(commit_error(inner.position, || {
                format!("cursor {} was committed after being disposed", name())
            }));
        }
        let Some(parent) = &inner.parent else {
            return Err(commit_error(inner.position, || {
                "the root cursor cannot be committed".to_owned()
            }));
        };
        (Rc::clone(parent), inner.position)
    };

    let target = resolve(&parent);
    let is_root = {
        let mut target = target.borrow_mut();
        if position < target.position {
            let target_position = target.position;
            return Err(commit_error(position, || {
                format!("cannot commit backwards to before position {target_position}")
            }));
        }
        target.position = position;
        target.parent.is_none()
    };

    let mut inner = cursor.borrow_mut();
    inner.committed = true;
    trace!(cursor = ?inner.name, position, "commit");
    drop(inner);

    if is_root {
        reader.release_to(position);
    }
    Ok(())
}

#[cold]
#[inline(never)]
fn commit_error(position: usize, message: impl FnOnce() -> String) -> ParserError {
    ImplementationError::new(position, message()).into()
}

/// Options for creating a child context using [`ParserContext::lookahead`].
#[derive(Clone, Debug, Default)]
#[non_exhaustive]
pub struct LookaheadOptions {
    /// Name of the child context, used in traces and error stacks.
    pub debug_name: Option<Cow<'static, str>>,
    /// Absolute position at which the input of the child context ends.
    ///
    /// This is clamped to the slice end of the parent.
    pub slice_end: Option<usize>,
}

impl LookaheadOptions {
    /// Options for a child context with the given debug name.
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self::default().debug_name(name)
    }

    /// Sets the [`debug_name`][Self#structfield.debug_name] field.
    #[inline]
    pub fn debug_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.debug_name = Some(name.into());
        self
    }

    /// Sets the [`slice_end`][Self#structfield.slice_end] field.
    #[inline]
    pub fn slice_end(mut self, end: usize) -> Self {
        self.slice_end = Some(end);
        self
    }
}

/// A cursor into the input, organized as a tree to support backtracking.
///
/// All contexts of a parser run share a single [`InputReader`]. A child context is created with
/// [`lookahead`][Self::lookahead] and starts at the position of its parent. Any input it consumes
/// is private to it until it is [committed][Self::commit], which moves the parent to the child's
/// position. A child that is not committed is simply abandoned, which is how alternatives that did
/// not match are backtracked.
///
/// Dropping a context disposes it, together with all of its still open descendants. After a commit
/// the child keeps working as an alias of its parent, i.e. any further input it consumes directly
/// advances the parent.
///
/// Peeking and reading is asynchronous, as the requested input might not have arrived yet.
pub struct ParserContext<S: Sequence> {
    reader: Rc<InputReader<S>>,
    options: RunOptions,
    cursor: CursorRef,
}

impl<S: Sequence> Drop for ParserContext<S> {
    fn drop(&mut self) {
        dispose_cursor(&self.cursor);
    }
}

impl<S: Sequence> ParserContext<S> {
    pub(crate) fn root(reader: Rc<InputReader<S>>, options: RunOptions) -> Self {
        ParserContext {
            reader,
            options,
            cursor: Rc::new(RefCell::new(Cursor {
                name: Some(Cow::Borrowed("root")),
                position: 0,
                slice_end: None,
                depth: 0,
                parent: None,
                children: vec![],
                committed: false,
                disposed: false,
            })),
        }
    }

    /// The options the parser is run with.
    #[inline]
    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Absolute position of the next element to be consumed.
    pub fn position(&self) -> usize {
        resolve(&self.cursor).borrow().position
    }

    /// Absolute position at which the input of this context ends, if bounded.
    pub fn slice_end(&self) -> Option<usize> {
        resolve(&self.cursor).borrow().slice_end
    }

    /// Nesting level of this context, the root context has depth `0`.
    pub fn depth(&self) -> usize {
        self.cursor.borrow().depth
    }

    /// The debug name of this context.
    pub fn debug_name(&self) -> Option<Cow<'static, str>> {
        self.cursor.borrow().name.clone()
    }

    /// Returns whether this context was committed into its parent.
    pub fn is_committed(&self) -> bool {
        self.cursor.borrow().committed
    }

    /// Returns whether this context was disposed.
    pub fn is_disposed(&self) -> bool {
        self.cursor.borrow().disposed
    }

    fn bounds(&self) -> (usize, Option<usize>) {
        let target = resolve(&self.cursor);
        let target = target.borrow();
        (target.position, target.slice_end)
    }

    /// Returns the element `offset` elements after the current position without consuming it.
    ///
    /// Returns `None` at the end of the input or of the slice of this context.
    ///
    /// The position is captured when this is called, so a pending peek still resolves when the
    /// context is committed or disposed in the meantime.
    pub fn peek(
        &self,
        offset: usize,
    ) -> impl Future<Output = Result<Option<S::Element>, ParserError>> + '_ {
        let (position, slice_end) = self.bounds();
        let position = position + offset;
        async move {
            if slice_end.is_some_and(|end| position >= end) {
                return Ok(None);
            }
            self.reader.peek(position).await
        }
    }

    /// Returns the element `offset` elements after the current position, consuming it and all
    /// elements before it.
    ///
    /// Fails with an unexpected end of input if there is no such element.
    pub async fn read(&self, offset: usize) -> Result<S::Element, ParserError> {
        match self.peek(offset).await? {
            Some(element) => {
                self.skip(offset + 1);
                Ok(element)
            }
            None => Err(self.unexpected_end_of_input()),
        }
    }

    /// Returns the elements `start..end` relative to the current position without consuming them.
    ///
    /// Returns `None` if the input or the slice of this context ends before `end`.
    pub fn peek_sequence(
        &self,
        start: usize,
        end: usize,
    ) -> impl Future<Output = Result<Option<S>, ParserError>> + '_ {
        let (position, slice_end) = self.bounds();
        async move {
            if slice_end.is_some_and(|slice_end| position + end > slice_end) {
                return Ok(None);
            }
            self.reader
                .peek_sequence(position + start, position + end)
                .await
        }
    }

    /// Returns the elements `start..end` relative to the current position, consuming all elements
    /// up to `end`.
    ///
    /// Fails with an unexpected end of input if the input ends before `end`.
    pub async fn read_sequence(&self, start: usize, end: usize) -> Result<S, ParserError> {
        match self.peek_sequence(start, end).await? {
            Some(sequence) => {
                self.skip(end);
                Ok(sequence)
            }
            None => Err(self.unexpected_end_of_input()),
        }
    }

    /// Advances the position by `n` elements without reading them.
    pub fn skip(&self, n: usize) {
        let target = resolve(&self.cursor);
        let (position, is_root) = {
            let mut target = target.borrow_mut();
            target.position += n;
            (target.position, target.parent.is_none())
        };
        if is_root {
            self.reader.release_to(position);
        }
    }

    /// Index of the first occurence of `element` in `sequence`.
    pub fn index_of(&self, sequence: &S, element: S::Element) -> Option<usize> {
        sequence.elements().iter().position(|&item| item == element)
    }

    /// Index of the first occurence of `needle` in `haystack` starting at or after `from`.
    pub fn index_of_subsequence(&self, haystack: &S, needle: &S, from: usize) -> Option<usize> {
        index_of_elements(&haystack.elements(), &needle.elements(), from)
    }

    /// Creates a child context starting at the current position.
    pub fn lookahead(&self, options: LookaheadOptions) -> ParserContext<S> {
        let parent = resolve(&self.cursor);
        let child = {
            let mut inner = parent.borrow_mut();
            let slice_end = match (inner.slice_end, options.slice_end) {
                (Some(outer), Some(inner)) => Some(outer.min(inner)),
                (outer, inner) => outer.or(inner),
            };
            let child = Rc::new(RefCell::new(Cursor {
                name: options.debug_name,
                position: inner.position,
                slice_end,
                depth: inner.depth + 1,
                parent: Some(Rc::clone(&parent)),
                children: vec![],
                committed: false,
                disposed: false,
            }));
            inner.children.retain(|child| child.strong_count() > 0);
            inner.children.push(Rc::downgrade(&child));
            child
        };
        trace!(
            cursor = ?child.borrow().name,
            position = child.borrow().position,
            "lookahead"
        );
        ParserContext {
            reader: Rc::clone(&self.reader),
            options: self.options,
            cursor: child,
        }
    }

    /// Commits this context, moving its parent to this context's position.
    ///
    /// A context can be committed at most once, and the root context cannot be committed at all.
    pub fn commit(&self) -> Result<(), ParserError> {
        commit_cursor(&self.reader, &self.cursor)
    }

    /// Disposes this context and all of its open descendants.
    ///
    /// This is idempotent and happens automatically when the context is dropped.
    pub fn dispose(&self) {
        dispose_cursor(&self.cursor);
    }

    /// A handle that can commit this context while it is owned elsewhere.
    pub(crate) fn commit_handle(&self) -> CommitHandle<S> {
        CommitHandle {
            reader: Rc::clone(&self.reader),
            cursor: Rc::clone(&self.cursor),
        }
    }

    fn stack(&self) -> Vec<Cow<'static, str>> {
        let mut stack = vec![];
        let mut current = Some(Rc::clone(&self.cursor));
        while let Some(cursor) = current {
            let inner = cursor.borrow();
            stack.push(inner.name.clone().unwrap_or(Cow::Borrowed("<unnamed>")));
            current = inner.parent.clone();
        }
        stack
    }

    /// Creates a parsing failure of the given kind at the current position.
    pub(crate) fn failure(&self, kind: FailureKind, message: LazyMessage) -> ParserError {
        let stack = self.options.error_stack.then(|| self.stack());
        ParsingFailure::new(kind, self.position(), self.depth(), message, stack).into()
    }

    /// Checks that `condition` holds, failing to match otherwise.
    ///
    /// The message is only formatted when the failure is displayed.
    #[inline]
    pub fn invariant(
        &self,
        condition: bool,
        message: impl Fn() -> String + 'static,
    ) -> Result<(), ParserError> {
        if condition {
            Ok(())
        } else {
            Err(self.invariant_failure(message))
        }
    }

    /// Returns the contained value, failing to match on `None`.
    ///
    /// The message is only formatted when the failure is displayed.
    #[inline]
    pub fn invariant_some<T>(
        &self,
        value: Option<T>,
        message: impl Fn() -> String + 'static,
    ) -> Result<T, ParserError> {
        match value {
            Some(value) => Ok(value),
            None => Err(self.invariant_failure(message)),
        }
    }

    /// Creates a parsing failure at the current position.
    ///
    /// The message is only formatted when the failure is displayed.
    #[cold]
    #[inline(never)]
    pub fn invariant_failure(&self, message: impl Fn() -> String + 'static) -> ParserError {
        self.failure(FailureKind::Invariant, Rc::new(message))
    }

    /// Creates an unexpected end of input failure at the current position.
    #[cold]
    #[inline(never)]
    pub fn unexpected_end_of_input(&self) -> ParserError {
        self.failure(
            FailureKind::UnexpectedEndOfInput,
            Rc::new(|| "expected more input".to_owned()),
        )
    }

    /// Creates an unexpected remaining input failure at the current position.
    #[cold]
    #[inline(never)]
    pub fn unexpected_remaining_input(&self) -> ParserError {
        self.failure(
            FailureKind::UnexpectedRemainingInput,
            Rc::new(|| "expected end of input".to_owned()),
        )
    }

    /// Aggregates the failures of several alternatives according to the configured
    /// [`ErrorJoinMode`][crate::ErrorJoinMode].
    #[cold]
    #[inline(never)]
    pub fn join_failure(
        &self,
        child_errors: Vec<ParsingFailure>,
        message: impl Fn() -> String + 'static,
    ) -> ParserError {
        let join = JoinFailure::new(self.options.error_join_mode, child_errors);
        self.failure(FailureKind::Join(join), Rc::new(message))
    }

    /// Creates an implementation error at the current position.
    #[cold]
    #[inline(never)]
    pub fn implementation_error(&self, message: impl Into<String>) -> ParserError {
        ImplementationError::new(self.position(), message).into()
    }
}

/// Commits a context owned by a concurrently running task.
pub(crate) struct CommitHandle<S: Sequence> {
    reader: Rc<InputReader<S>>,
    cursor: CursorRef,
}

impl<S: Sequence> CommitHandle<S> {
    pub(crate) fn commit(&self) -> Result<(), ParserError> {
        commit_cursor(&self.reader, &self.cursor)
    }
}

pub(crate) fn index_of_elements<E: PartialEq>(
    haystack: &[E],
    needle: &[E],
    from: usize,
) -> Option<usize> {
    if needle.is_empty() {
        return (from <= haystack.len()).then_some(from);
    }
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|index| index + from)
}
