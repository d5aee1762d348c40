//! Response parsing and validation.
//!
//! Model replies are untrusted input. Each parser locates the payload inside
//! whatever prose or fencing surrounds it, validates every record, and
//! reports what it discarded instead of failing on the first bad entry.

mod cases;
mod json;
mod script;

pub use cases::{parse_test_cases, ParsedCases, SkippedRecord};
pub use json::find_json_array;
pub use script::{extract_fenced_block, is_plausible_source_line, parse_script};
