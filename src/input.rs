//! The uniform accessor contract implemented by every input variant.
//!
//! ### Eager vs lazy
//! - [`SequenceInput::as_list`] reads the whole source once and keeps the
//!   result for the lifetime of the input; later calls return the same slice.
//! - [`SequenceInput::as_generator`] returns a fresh pull-based iterator on each
//!   call. Files and cursors are opened only when the consumer first pulls from
//!   them and are closed as soon as they are exhausted, on error, or when the
//!   iterator is dropped early.
//!
//! Both accessors yield the same records in the same order for an unchanged
//! source; `as_list` is literally a full consumption of `as_generator`.
//!
//! ### Threads
//! The memoized list lives in a [`std::cell::OnceCell`], so inputs are `!Sync`:
//! sharing one instance across threads without a lock does not compile.
use std::cell::OnceCell;
use std::iter::FusedIterator;

use tracing::info;

use crate::error::Result;
use crate::record::SequenceRecord;

/// A lazily produced, finite stream of records.
///
/// The stream is fail-fast: after yielding an `Err` it yields nothing more.
pub type Records<'a> = Box<dyn Iterator<Item = Result<SequenceRecord>> + 'a>;

/// Read access shared by FASTA, JSON and database inputs.
pub trait SequenceInput {
    /// Fixed literal naming the variant: `"fasta"`, `"json"` or `"mongodb"`.
    fn data_type(&self) -> &'static str;

    /// All records, read on the first call and memoized afterwards.
    ///
    /// A failed read is not memoized; the next call tries again.
    fn as_list(&self) -> Result<&[SequenceRecord]>;

    /// A new, independent pass over the source.
    fn as_generator(&self) -> Records<'_>;
}

/// Fill `cache` from `records` on first use and hand out the stored slice.
pub(crate) fn memoized<'a>(
    cache: &'a OnceCell<Vec<SequenceRecord>>,
    data_type: &'static str,
    records: Records<'_>,
) -> Result<&'a [SequenceRecord]> {
    if let Some(done) = cache.get() {
        return Ok(done.as_slice());
    }
    let all = records.collect::<Result<Vec<_>>>()?;
    info!(data_type, n_records = all.len(), "materialized input");
    Ok(cache.get_or_init(|| all).as_slice())
}

type Resolve<'a, U> = Box<dyn FnOnce() -> Result<Vec<U>> + 'a>;
type Open<'a, U> = Box<dyn FnMut(U) -> Result<Records<'a>> + 'a>;

/// Pull-based walk over an ordered list of units (files, collections).
///
/// Nothing happens at construction. The unit list is resolved on the first
/// pull, and each unit is opened only once the previous one is exhausted, so
/// at most one file handle or cursor is alive at a time.
pub(crate) struct Walk<'a, U> {
    resolve: Option<Resolve<'a, U>>,
    open: Open<'a, U>,
    units: std::vec::IntoIter<U>,
    current: Option<Records<'a>>,
    finished: bool,
}

impl<'a, U: 'a> Walk<'a, U> {
    pub(crate) fn new(
        resolve: impl FnOnce() -> Result<Vec<U>> + 'a,
        open: impl FnMut(U) -> Result<Records<'a>> + 'a,
    ) -> Self {
        Walk {
            resolve: Some(Box::new(resolve)),
            open: Box::new(open),
            units: Vec::new().into_iter(),
            current: None,
            finished: false,
        }
    }

    fn fail(&mut self, e: crate::error::InputError) -> Option<Result<SequenceRecord>> {
        self.finished = true;
        self.current = None;
        Some(Err(e))
    }
}

impl<'a, U: 'a> Iterator for Walk<'a, U> {
    type Item = Result<SequenceRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if let Some(resolve) = self.resolve.take() {
            match resolve() {
                Ok(units) => self.units = units.into_iter(),
                Err(e) => return self.fail(e),
            }
        }
        loop {
            if let Some(current) = self.current.as_mut() {
                match current.next() {
                    Some(Ok(record)) => return Some(Ok(record)),
                    Some(Err(e)) => return self.fail(e),
                    // Dropping the exhausted stream releases its handle.
                    None => self.current = None,
                }
            }
            let Some(unit) = self.units.next() else {
                self.finished = true;
                return None;
            };
            match (self.open)(unit) {
                Ok(records) => self.current = Some(records),
                Err(e) => return self.fail(e),
            }
        }
    }
}

impl<'a, U: 'a> FusedIterator for Walk<'a, U> {}
