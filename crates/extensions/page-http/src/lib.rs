//! # pagecase Page HTTP
//!
//! [`PageSource`](pagecase_protocols::PageSource) that fetches page markup
//! over HTTP. Markup is returned as served; scripts are not executed.

mod source;

pub use source::HttpPageSource;
