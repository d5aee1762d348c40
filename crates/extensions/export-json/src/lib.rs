//! # pagecase Export JSON
//!
//! [`ExportSink`](pagecase_protocols::ExportSink) that writes run records as
//! JSON files plus one source file per generated script.

mod sink;

pub use sink::{host_slug, JsonExportSink};
