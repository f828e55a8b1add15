//! Input/output for screening archives and score reports.
//!
//! Archives are streams of concatenated molecular records delimited by a literal header
//! marker; the [`archive`] module turns them into a lazy sequence of records. The
//! [`report`] module appends scored candidates to a CSV file in the job output directory.

pub mod archive;
pub mod report;
