//! File input and output: recommendation series and CSV exports.

pub mod export;
pub mod series;
