//! The error kinds the index surfaces to callers.

use common::api::BpmError;
use thiserror::Error;

/// Every failure mode a public `Index` operation can return.
///
/// `EndOfRelation` deliberately has no variant here: it is a
/// `RelationScanError` consumed entirely inside bulk build, never something
/// a caller of `Index` sees.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index metadata does not match the caller's declared relation, offset, or type")]
    BadIndexInfo,

    #[error("scan operators must be low ∈ {{GT, GTE}} and high ∈ {{LT, LTE}}")]
    BadOpcodes,

    #[error("scan range is empty: low bound is greater than high bound")]
    BadScanRange,

    #[error("no entry satisfies both scan bounds")]
    NoSuchKeyFound,

    #[error("scan_next/end_scan called without an active scan")]
    ScanNotInitialized,

    #[error("scan_next called after the scan already completed")]
    IndexScanCompleted,

    #[error(transparent)]
    Bpm(#[from] BpmError),
}
