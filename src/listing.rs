// 📒 Listing Engine - ordered statements and their reorganization
//
// Statements live in one dense vector. Handles are positions into it: a
// handle denotes whatever statement currently sits at that index, so every
// mutating operation below states which handles survive and what they denote
// afterwards.

use crate::entry::Entry;
use crate::error::{LedgerError, LedgerResult};
use crate::money::{self, Money};
use crate::reader::RecordReader;
use crate::statement::{CommittableStatement, ListingStatement, Statement};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::io::BufRead;
use std::ops::{Index, Range};
use tracing::debug;

// ============================================================================
// HANDLES
// ============================================================================

/// Position of a statement in a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Handle(usize);

impl Handle {
    pub const fn new(index: usize) -> Self {
        Handle(index)
    }

    pub const fn index(self) -> usize {
        self.0
    }

    pub const fn next(self) -> Self {
        Handle(self.0 + 1)
    }
}

/// Half-open range of positions `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HandleRange {
    start: Handle,
    end: Handle,
}

impl HandleRange {
    pub fn new(start: Handle, end: Handle) -> Self {
        debug_assert!(start <= end, "range start after its end");
        HandleRange { start, end }
    }

    /// Empty range sitting at `position`.
    pub fn empty_at(position: Handle) -> Self {
        HandleRange::new(position, position)
    }

    pub fn start(&self) -> Handle {
        self.start
    }

    pub fn end(&self) -> Handle {
        self.end
    }

    pub fn len(&self) -> usize {
        self.end.0 - self.start.0
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.start <= handle && handle < self.end
    }

    pub fn handles(&self) -> impl Iterator<Item = Handle> {
        (self.start.0..self.end.0).map(Handle)
    }

    pub fn indices(&self) -> Range<usize> {
        self.start.0..self.end.0
    }
}

/// Unordered set of selected positions, iterated in ascending order.
pub type Selection = BTreeSet<Handle>;

// ============================================================================
// LISTING
// ============================================================================

/// Ordered sequence of statements, generic over plain or committable ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing<S> {
    name: String,
    statements: Vec<S>,
}

/// Archived listings hold plain statements.
pub type PlainListing = Listing<Statement>;

/// The live listing tracks which statements are committed.
pub type CommittableListing = Listing<CommittableStatement>;

/// Listing names are written on a single title line.
fn single_line(name: &str) -> String {
    name.replace(['\r', '\n'], " ").trim().to_string()
}

impl<S: ListingStatement> Listing<S> {
    pub fn new(name: impl AsRef<str>) -> Self {
        Listing {
            name: single_line(name.as_ref()),
            statements: Vec::new(),
        }
    }

    pub fn from_statements(name: impl AsRef<str>, statements: impl IntoIterator<Item = S>) -> Self {
        Listing {
            name: single_line(name.as_ref()),
            statements: statements.into_iter().collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl AsRef<str>) {
        self.name = single_line(name.as_ref());
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn statements(&self) -> &[S] {
        &self.statements
    }

    pub fn iter(&self) -> std::slice::Iter<'_, S> {
        self.statements.iter()
    }

    pub fn get(&self, handle: Handle) -> Option<&S> {
        self.statements.get(handle.0)
    }

    /// Handle to position `index`, or `None` past the end.
    pub fn handle(&self, index: usize) -> Option<Handle> {
        (index < self.statements.len()).then_some(Handle(index))
    }

    /// The past-the-end position.
    pub fn end(&self) -> Handle {
        Handle(self.statements.len())
    }

    /// Sum of every statement's amount.
    pub fn total(&self) -> Money {
        money::sum(self.statements.iter().map(|s| s.statement().amount()))
    }

    /// Date of the last statement in listing order.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.statements.last().map(|s| s.statement().date())
    }

    // ========================================================================
    // MUTATIONS
    // ========================================================================

    /// Appends a statement. Existing handles stay valid.
    pub fn add(&mut self, statement: impl Into<S>) -> Handle {
        self.statements.push(statement.into());
        Handle(self.statements.len() - 1)
    }

    /// Removes the statement at `handle` and returns the handle now denoting
    /// the following statement (or the end). Handles after it shift down.
    pub fn erase(&mut self, handle: Handle) -> Handle {
        debug_assert!(handle.0 < self.statements.len(), "erasing past the end");
        self.statements.remove(handle.0);
        handle
    }

    /// Orders statements by ascending date; equal dates may be reordered.
    pub fn sort(&mut self) {
        self.statements.sort_unstable_by_key(|s| s.statement().date());
    }

    /// Orders statements by ascending date, keeping equal dates in place.
    pub fn stable_sort(&mut self) {
        self.statements.sort_by_key(|s| s.statement().date());
    }

    /// Replaces the statement at `handle`, which keeps its position.
    pub fn alter(&mut self, handle: Handle, statement: impl Into<S>) {
        debug_assert!(handle.0 < self.statements.len(), "altering past the end");
        self.statements[handle.0] = statement.into();
    }

    /// Exchanges two statements; both handles now denote each other's former value.
    pub fn swap(&mut self, first: Handle, second: Handle) {
        debug_assert!(first.0 < self.statements.len() && second.0 < self.statements.len());
        self.statements.swap(first.0, second.0);
    }

    /// Moves the statement at `statement` up to `position` (`statement <= position`),
    /// shifting the statements in between down by one.
    pub fn move_up(&mut self, statement: Handle, position: Handle) {
        debug_assert!(statement <= position, "moving up towards a lower position");
        debug_assert!(position.0 < self.statements.len(), "moving past the end");
        self.statements[statement.0..=position.0].rotate_left(1);
    }

    /// Moves the statement at `statement` down to `position` (`statement >= position`),
    /// shifting the statements in between up by one.
    pub fn move_down(&mut self, statement: Handle, position: Handle) {
        debug_assert!(statement >= position, "moving down towards a higher position");
        debug_assert!(statement.0 < self.statements.len(), "moving past the end");
        self.statements[position.0..=statement.0].rotate_right(1);
    }

    /// Moves the statement at `statement` to `position`, in whichever direction.
    /// Moving a statement onto itself does nothing.
    pub fn move_statement(&mut self, statement: Handle, position: Handle) {
        if statement < position {
            self.move_up(statement, position);
        } else {
            self.move_down(statement, position);
        }
    }

    /// Collapses `range` into one composed statement made of every entry in it
    /// (a composed statement contributes its children, not its total).
    ///
    /// Empty and single-statement ranges are left alone and their start is
    /// returned. Otherwise the new statement takes the range's start position
    /// and handles past the range shift down by `range.len() - 1`.
    pub fn group_range(
        &mut self,
        description: impl AsRef<str>,
        date: NaiveDate,
        range: HandleRange,
    ) -> LedgerResult<Handle> {
        debug_assert!(range.end.0 <= self.statements.len(), "grouping past the end");
        if range.len() < 2 {
            return Ok(range.start);
        }

        let entries: Vec<Entry> = self.statements[range.indices()]
            .iter()
            .flat_map(|s| s.statement().entries().iter().cloned())
            .collect();
        let grouped = S::from(Statement::composed(description, date, entries)?);

        debug!(start = range.start.0, len = range.len(), "grouping statements");
        self.statements.splice(range.indices(), std::iter::once(grouped));
        Ok(range.start)
    }

    /// Brings the selected statements together right before the last selected
    /// one, keeping their relative order, and returns the contiguous range
    /// they now occupy (ready for [`Listing::group_range`]).
    ///
    /// An empty selection returns an empty range at the end and a single one
    /// returns its own one-element range; neither moves anything.
    pub fn gather_selection(&mut self, selection: &Selection) -> HandleRange {
        let (first, last) = match (selection.first(), selection.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => return HandleRange::empty_at(self.end()),
        };
        debug_assert!(last.0 < self.statements.len(), "selection past the end");
        if first == last {
            return HandleRange::new(first, first.next());
        }

        // Walking down from the highest selected position, each statement is
        // rotated up to sit right below the block gathered so far. Rotations
        // only touch positions above the statement being moved, so the lower
        // selected handles still denote the same statements.
        let end = last.next();
        let mut begin = end.0;
        for &handle in selection.iter().rev() {
            begin -= 1;
            self.move_up(handle, Handle(begin));
        }

        debug!(count = selection.len(), begin, "gathered selection");
        HandleRange::new(Handle(begin), end)
    }

    /// Replaces a composed statement with one simple statement per composed
    /// entry, in order, and returns the range covering them.
    ///
    /// A simple statement is left alone and its one-element range returned.
    /// Handles past the statement shift up by `entry_count - 1`.
    pub fn split(&mut self, handle: Handle) -> HandleRange {
        let index = handle.0;
        let children = self.statements[index].statement().composed_entries().to_vec();
        if children.is_empty() {
            return HandleRange::new(handle, handle.next());
        }

        let count = children.len();
        let parts = children
            .into_iter()
            .map(|entry| S::from(Statement::from(entry)));
        self.statements.splice(index..=index, parts);

        debug!(index, count, "split statement");
        HandleRange::new(handle, Handle(index + count))
    }

    // ========================================================================
    // TEXT FORMAT
    // ========================================================================

    /// Reads a listing: a title line, then statements until the input ends.
    ///
    /// Record failures are reported with the line the record starts on.
    pub fn read<R: BufRead>(input: R) -> LedgerResult<Self> {
        let mut records = RecordReader::new(input);
        let title = records
            .next_line()?
            .ok_or_else(|| LedgerError::parse("Listing", "missing title line"))?;

        let mut statements = Vec::new();
        while records.peek_record()?.is_some() {
            let start = records.line_number();
            let statement = S::read_record(&mut records).map_err(|e| e.at_line(start))?;
            statements.push(statement);
        }

        Ok(Listing::from_statements(title, statements))
    }
}

impl CommittableListing {
    /// Changes the commit flag at `handle` without touching the order.
    pub fn set_committed(&mut self, handle: Handle, committed: bool) {
        debug_assert!(handle.0 < self.statements.len(), "committing past the end");
        self.statements[handle.0].set_committed(committed);
    }

    pub fn committed_count(&self) -> usize {
        self.statements.iter().filter(|s| s.is_committed()).count()
    }

    /// Splits into the committed statements, as plain statements, and the
    /// uncommitted ones. Both keep their relative order.
    pub fn partition_committed(&self) -> (Vec<Statement>, Vec<CommittableStatement>) {
        let (committed, pending): (Vec<_>, Vec<_>) = self
            .statements
            .iter()
            .cloned()
            .partition(CommittableStatement::is_committed);

        let committed = committed
            .into_iter()
            .map(CommittableStatement::into_statement)
            .collect();
        (committed, pending)
    }
}

impl<S> Index<Handle> for Listing<S> {
    type Output = S;

    fn index(&self, handle: Handle) -> &S {
        &self.statements[handle.0]
    }
}

impl<'a, S> IntoIterator for &'a Listing<S> {
    type Item = &'a S;
    type IntoIter = std::slice::Iter<'a, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.iter()
    }
}

impl<S: fmt::Display> fmt::Display for Listing<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f)?;
        for statement in &self.statements {
            write!(f, "{statement}")?;
        }
        Ok(())
    }
}
