//!
//! ## Block Types
//!
//! - Block: `parser::block::Block`, lazily decoded from raw bytes.
//! - SBlock: `simple_proto::SBlock`, a summary with hashes and sizes only.
//!

/// simplified block summaries, for storage or transfer
pub mod simple_proto;
