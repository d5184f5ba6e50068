//! Library half of the `chemharm` binary: logging setup and the JSON table
//! format.

pub mod input;
pub mod logging;
