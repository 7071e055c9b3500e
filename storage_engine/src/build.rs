//! Bulk build: drive a `RelationScanner` to completion, inserting one entry
//! per record.

use crate::error::IndexError;
use crate::index::Index;
use common::relation::{read_i32_attr, RelationScanError, RelationScanner};
use tracing::info;

/// Feeds every record a scanner yields through `index.insert`, reading the
/// key as a signed 32-bit integer at `attr_byte_offset` in each record's
/// bytes. `EndOfRelation` ends the loop normally; any other scanner error
/// propagates as an `IoError`.
pub fn build(index: &mut Index, attr_byte_offset: usize, scanner: &mut dyn RelationScanner) -> Result<usize, IndexError> {
    let mut inserted = 0usize;

    loop {
        match scanner.next_record() {
            Ok((record_bytes, rid)) => {
                let key = read_i32_attr(&record_bytes, attr_byte_offset);
                index.insert(key, rid)?;
                inserted += 1;
            }
            Err(RelationScanError::EndOfRelation) => break,
            Err(RelationScanError::Io(e)) => return Err(common::api::BpmError::IoError(e).into()),
        }
    }

    info!(inserted, "bulk build complete");
    Ok(inserted)
}
