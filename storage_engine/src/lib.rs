//! A disk-resident B+-tree secondary index over a single integer attribute.
//!
//! [`Index`] is the public entry point: [`Index::open`] creates or reopens
//! an index file against any [`common::api::BufferPoolManager`], then
//! [`Index::insert`], [`Index::start_scan`]/[`Index::scan_next`]/
//! [`Index::end_scan`], and [`Index::close`] operate on it. [`build::build`]
//! drives a [`common::relation::RelationScanner`] to populate a fresh index
//! in one pass.

pub mod build;
pub mod error;
pub mod index;
pub mod metadata;
pub mod page;
pub mod pin;
pub mod scan;
pub mod traverse;

pub use build::build;
pub use error::IndexError;
pub use index::Index;
pub use scan::Operator;
