//!
//! This module defines how to parse raw block bytes into Block structs.
//!

/// merged-mining envelope detection and decoding
pub mod auxpow;

/// the block aggregate and its raw bytes
pub mod block;

/// chain descriptors
pub mod chain;

/// define binary readers
pub mod reader;

/// split the transaction list into transactions
pub mod segmenter;

/// transaction decoder seam
pub mod transaction;

/// compact size integers
pub mod varint;

/// summary formats of block data
pub mod proto;

/// error handling
pub mod errors;
