//! The relation scanner: the bulk-build-time collaborator that hands the
//! index raw tuple bytes and the `RowId` they live at.
//!
//! The index never interprets a whole tuple. It asks the scanner for the
//! next `(record_bytes, RowId)` pair, reads a four-byte signed integer out
//! of `record_bytes` at a caller-supplied offset, and inserts that key.

use crate::row_id::RowId;

/// Signalled by a `RelationScanner` once every record has been produced.
/// This is the one error the bulk-build loop recovers from locally; any
/// other variant propagates out of `build`.
#[derive(Debug)]
pub enum RelationScanError {
    EndOfRelation,
    Io(std::io::Error),
}

impl std::fmt::Display for RelationScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelationScanError::EndOfRelation => write!(f, "end of relation"),
            RelationScanError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for RelationScanError {}

/// Yields `(record_bytes, RowId)` pairs until the relation is exhausted.
pub trait RelationScanner {
    fn next_record(&mut self) -> Result<(Vec<u8>, RowId), RelationScanError>;
}

/// A relation scanner over records already held in memory, grouped into
/// fixed-size pages the way a heap file would lay them out on disk. Mainly
/// useful for bulk-build tests and small demos; a real deployment would
/// scan a `TableHeap`'s slotted pages instead.
pub struct InMemoryRelationScanner {
    records: std::vec::IntoIter<Vec<u8>>,
    records_per_page: u16,
    next_slot: u16,
    next_page: usize,
}

impl InMemoryRelationScanner {
    pub fn new(records: Vec<Vec<u8>>, records_per_page: u16) -> Self {
        assert!(records_per_page > 0, "records_per_page must be positive");
        Self {
            records: records.into_iter(),
            records_per_page,
            next_slot: 0,
            next_page: 1,
        }
    }
}

impl RelationScanner for InMemoryRelationScanner {
    fn next_record(&mut self) -> Result<(Vec<u8>, RowId), RelationScanError> {
        let record = self.records.next().ok_or(RelationScanError::EndOfRelation)?;
        let rid = RowId { page_no: self.next_page, slot_no: self.next_slot };

        self.next_slot += 1;
        if self.next_slot >= self.records_per_page {
            self.next_slot = 0;
            self.next_page += 1;
        }

        Ok((record, rid))
    }
}

/// Reads a signed 32-bit integer out of `record_bytes` at `attr_byte_offset`,
/// the only key interpretation the index engine supports.
pub fn read_i32_attr(record_bytes: &[u8], attr_byte_offset: usize) -> i32 {
    let end = attr_byte_offset + 4;
    i32::from_ne_bytes(
        record_bytes[attr_byte_offset..end]
            .try_into()
            .expect("record too short for attribute offset"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assigns_row_ids_by_page_fill() {
        let records: Vec<Vec<u8>> = (0..5).map(|i: i32| i.to_ne_bytes().to_vec()).collect();
        let mut scanner = InMemoryRelationScanner::new(records, 2);

        let mut rids = Vec::new();
        loop {
            match scanner.next_record() {
                Ok((_, rid)) => rids.push(rid),
                Err(RelationScanError::EndOfRelation) => break,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(
            rids,
            vec![
                RowId { page_no: 1, slot_no: 0 },
                RowId { page_no: 1, slot_no: 1 },
                RowId { page_no: 2, slot_no: 0 },
                RowId { page_no: 2, slot_no: 1 },
                RowId { page_no: 3, slot_no: 0 },
            ]
        );
    }

    #[test]
    fn reads_integer_attribute_at_offset() {
        let mut bytes = vec![0xFFu8; 4];
        bytes.extend_from_slice(&42i32.to_ne_bytes());
        assert_eq!(read_i32_attr(&bytes, 4), 42);
    }
}
