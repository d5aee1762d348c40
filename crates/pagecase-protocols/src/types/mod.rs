//! Data model shared by every pipeline stage.

mod element;
mod run;
mod test_case;

pub use element::*;
pub use run::*;
pub use test_case::*;
