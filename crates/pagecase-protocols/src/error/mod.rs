//! Error types for the pagecase protocol layer.

mod export;
mod fetch;
mod generation;
mod parse;
mod pipeline;

pub use export::*;
pub use fetch::*;
pub use generation::*;
pub use parse::*;
pub use pipeline::*;
