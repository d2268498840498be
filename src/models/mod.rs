pub mod enums;
pub mod latex;
pub mod tree;

pub use enums::*;
pub use latex::*;
pub use tree::*;

use thiserror::Error;

/// A string did not name any variant of a report enum.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {field} value: {value}")]
pub struct ParseEnumError {
    pub field: String,
    pub value: String,
}
