//! Actual ring state
//!
//! Reads the rings currently recorded in builder files by running the ring
//! builder in listing mode and parsing its output.

pub mod listing;
pub mod reader;
pub mod tool;

pub use listing::*;
pub use reader::*;
pub use tool::*;
