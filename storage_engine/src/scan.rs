//! The range-scan state machine: `Idle → Active → Exhausted`.

use crate::error::IndexError;
use crate::page;
use crate::pin::PinGuard;
use crate::traverse::find_leaf;
use common::api::{BufferPoolManager, PageId, INVALID_PAGE_ID};
use common::row_id::RowId;
use tracing::trace;

/// A relational operator supplied to `start_scan`. `Eq` is accepted here
/// only so that supplying it produces `BadOpcodes` rather than a type
/// error — range scans never use it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Lt,
    Lte,
    Gt,
    Gte,
    Eq,
}

fn satisfies_low(op: Operator, key: i32, low: i32) -> bool {
    match op {
        Operator::Gt => key > low,
        Operator::Gte => key >= low,
        _ => unreachable!("low_op is validated before this is called"),
    }
}

fn satisfies_high(op: Operator, key: i32, high: i32) -> bool {
    match op {
        Operator::Lt => key < high,
        Operator::Lte => key <= high,
        _ => unreachable!("high_op is validated before this is called"),
    }
}

enum Phase {
    Idle,
    Active { leaf: PinGuard, next_entry: usize, high: i32, high_op: Operator },
    Exhausted,
}

/// Owned by `Index`; holds the pinned leaf for the lifetime of an `Active`
/// scan. `start`/`next`/`end` mirror `Index::start_scan`/`scan_next`/`end_scan`
/// one-to-one.
pub struct ScanState {
    phase: Phase,
}

impl ScanState {
    pub fn new() -> Self {
        Self { phase: Phase::Idle }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.phase, Phase::Idle)
    }

    pub fn start(
        &mut self,
        bpm: &dyn BufferPoolManager,
        root_page_id: PageId,
        low: i32,
        low_op: Operator,
        high: i32,
        high_op: Operator,
    ) -> Result<(), IndexError> {
        // A call to start_scan always supersedes whatever scan state came
        // before it, valid or not: an implicit end_scan for an Active or
        // Exhausted scan, and the same Idle postcondition on failure.
        self.phase = Phase::Idle;

        if !matches!(low_op, Operator::Gt | Operator::Gte) || !matches!(high_op, Operator::Lt | Operator::Lte) {
            return Err(IndexError::BadOpcodes);
        }
        if low > high {
            return Err(IndexError::BadScanRange);
        }

        let (leaf_id, _path) = find_leaf(bpm, root_page_id, low)?;
        let mut leaf = PinGuard::new(bpm.fetch_page(leaf_id)?);
        let mut next_entry = 0usize;

        loop {
            let len = page::leaf::length(&leaf);
            if next_entry >= len {
                let right = page::leaf::right_sib(&leaf);
                if right == INVALID_PAGE_ID {
                    return Err(IndexError::NoSuchKeyFound);
                }
                leaf = PinGuard::new(bpm.fetch_page(right)?);
                next_entry = 0;
                continue;
            }

            let key = page::leaf::key_at(&leaf, next_entry);
            if !satisfies_low(low_op, key, low) {
                next_entry += 1;
                continue;
            }
            if !satisfies_high(high_op, key, high) {
                return Err(IndexError::NoSuchKeyFound);
            }
            break;
        }

        trace!(low, high, leaf = leaf.page_id(), next_entry, "scan positioned");
        self.phase = Phase::Active { leaf, next_entry, high, high_op };
        Ok(())
    }

    pub fn next(&mut self, bpm: &dyn BufferPoolManager) -> Result<RowId, IndexError> {
        let phase = std::mem::replace(&mut self.phase, Phase::Idle);

        match phase {
            Phase::Idle => Err(IndexError::ScanNotInitialized),
            Phase::Exhausted => {
                self.phase = Phase::Exhausted;
                Err(IndexError::IndexScanCompleted)
            }
            Phase::Active { leaf, mut next_entry, high, high_op } => {
                let key = page::leaf::key_at(&leaf, next_entry);
                if !satisfies_high(high_op, key, high) {
                    self.phase = Phase::Exhausted;
                    return Err(IndexError::IndexScanCompleted);
                }

                let rid = page::leaf::rid_at(&leaf, next_entry);
                next_entry += 1;

                if next_entry >= page::leaf::length(&leaf) {
                    let right = page::leaf::right_sib(&leaf);
                    drop(leaf);
                    if right == INVALID_PAGE_ID {
                        self.phase = Phase::Exhausted;
                    } else {
                        let next_leaf = PinGuard::new(bpm.fetch_page(right)?);
                        self.phase = Phase::Active { leaf: next_leaf, next_entry: 0, high, high_op };
                    }
                } else {
                    self.phase = Phase::Active { leaf, next_entry, high, high_op };
                }

                Ok(rid)
            }
        }
    }

    pub fn end(&mut self) -> Result<(), IndexError> {
        match self.phase {
            Phase::Idle => Err(IndexError::ScanNotInitialized),
            _ => {
                self.phase = Phase::Idle;
                Ok(())
            }
        }
    }
}
