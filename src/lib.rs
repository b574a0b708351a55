//!
//! # Introduction
//!
//! This library decodes raw blocks of bitcoin-like chains into
//! a header and an ordered list of transactions.
//!
//! A block never says where its transactions end: it only states how
//! many there are. Each transaction is decoded to find out its length,
//! and the next one starts right after it.
//!
//! Merge-mined chains (e.g. dogecoin) may put an AuxPOW envelope between
//! the header and the transaction count; it is detected and skipped
//! before the transactions are read.
//!
//! ## Caveat
//!
//! Block files, block indexes and scripts are not handled here:
//! callers bring the raw bytes of one block at a time.
//!
//! # Example
//!
//! ```rust
//! use auxpow_block_parser::{Block, Chain, RawBlock};
//!
//! let bytes: Vec<u8> = std::fs::read("block.bin").unwrap();
//! let block = Block::new(RawBlock::new(bytes, Chain::bitcoin(), None).unwrap());
//!
//! // only reads the count
//! let n = block.n_transactions().unwrap();
//!
//! // decodes every transaction, once
//! for tx in block.transactions().unwrap() {
//!     println!("{}", tx.txid);
//! }
//! ```
//!

pub(crate) mod api;
pub mod parser;

#[doc(inline)]
pub use crate::api::*;
