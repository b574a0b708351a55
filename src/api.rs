//!
//! Crates APIs, essential structs, functions, methods are all here!
//!
//! A single block is decoded lazily through `Block`. Many blocks are
//! decoded in parallel through `BlockParser`.
//!
//! # Example
//!
//! ```rust
//! use auxpow_block_parser::{Block, BlockParser, Chain, ParseConfig, RawBlock};
//!
//! let raw = RawBlock::from_hex("0100...", Chain::dogecoin(), Some(371337)).unwrap();
//! let block = Block::new(raw);
//! println!("{} has {} transactions", block, block.n_transactions().unwrap());
//!
//! // decode a batch of blocks on all cpus
//! let parser = BlockParser::new(ParseConfig::default(), None).unwrap();
//! let blocks = parser.parse_all(vec![]);
//! ```
//!
use log::{info, warn};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

// re-exports
pub use crate::parser::auxpow::{AuxPow, AUXPOW_VERSION_MARKERS};
pub use crate::parser::block::{Block, RawBlock, HEADER_SIZE};
pub use crate::parser::chain::Chain;
pub use crate::parser::errors::{OpError, OpErrorKind, OpResult};
pub use crate::parser::proto::simple_proto::{SBlock, SBlockHeader, STransaction};
pub use crate::parser::segmenter::{segment, ParseConfig, TransactionStream};
pub use crate::parser::transaction::{
    ConsensusDecoder, DecodeFailure, DecodedTransaction, ParsedTransaction, TxDecoder,
};
pub use crate::parser::varint::{decode_varint, encode_varint, Varint};
pub use bitcoin::hashes::hex::{FromHex, ToHex};
pub use bitcoin::{BlockHash, BlockHeader, Transaction, Txid};

///
/// Decodes batches of independent blocks on a dedicated thread pool.
///
/// Blocks share nothing, so each one is fully decoded by a single
/// worker; results come back in input order.
///
pub struct BlockParser {
    config: ParseConfig,
    pool: ThreadPool,
}

impl BlockParser {
    ///
    /// `threads`: number of worker threads, defaults to the number of cpus.
    ///
    pub fn new(config: ParseConfig, threads: Option<usize>) -> OpResult<BlockParser> {
        let threads = threads.unwrap_or_else(num_cpus::get);
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| OpError::from(format!("failed to build thread pool: {}", e)))?;
        Ok(BlockParser { config, pool })
    }

    #[inline]
    pub fn config(&self) -> &ParseConfig {
        &self.config
    }

    ///
    /// Build every block and decode its transactions eagerly.
    ///
    /// A block that fails to decode yields an `Err` in its slot and
    /// does not affect the others.
    ///
    pub fn parse_all(&self, raws: Vec<RawBlock>) -> Vec<OpResult<Block>> {
        info!("Start parsing {} blocks", raws.len());
        let config = self.config;
        let blocks: Vec<OpResult<Block>> = self.pool.install(|| {
            raws.into_par_iter()
                .map(|raw| -> OpResult<Block> {
                    let block = Block::with_decoder(raw, ConsensusDecoder, config);
                    block.transactions()?;
                    Ok(block)
                })
                .collect()
        });
        let failed = blocks.iter().filter(|b| b.is_err()).count();
        if failed > 0 {
            warn!("{} of {} blocks failed to parse", failed, blocks.len());
        }
        info!("Finished parsing {} blocks", blocks.len());
        blocks
    }

    /// Same as `parse_all`, keeping only the summaries.
    pub fn summarize_all(&self, raws: Vec<RawBlock>) -> Vec<OpResult<SBlock>> {
        let config = self.config;
        self.pool.install(|| {
            raws.into_par_iter()
                .map(|raw| SBlock::parse(&Block::with_decoder(raw, ConsensusDecoder, config)))
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::blockdata::constants::genesis_block;
    use bitcoin::consensus::serialize;
    use bitcoin::Network;

    #[test]
    fn test_parse_all_keeps_order_and_isolates_failures() {
        let genesis = serialize(&genesis_block(Network::Bitcoin));
        let mut broken = genesis.clone();
        broken.truncate(genesis.len() - 10);
        let raws = vec![
            RawBlock::new(genesis.clone(), Chain::bitcoin(), Some(0)).unwrap(),
            RawBlock::new(broken, Chain::bitcoin(), Some(1)).unwrap(),
            RawBlock::new(genesis, Chain::bitcoin(), Some(2)).unwrap(),
        ];
        let parser = BlockParser::new(ParseConfig::default(), Some(2)).unwrap();
        let blocks = parser.parse_all(raws);
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].as_ref().unwrap().height(), Some(0));
        assert!(blocks[1].is_err());
        assert_eq!(blocks[2].as_ref().unwrap().height(), Some(2));
    }

    #[test]
    fn test_summarize_all() {
        let genesis = serialize(&genesis_block(Network::Bitcoin));
        let raws = vec![RawBlock::new(genesis, Chain::bitcoin(), Some(0)).unwrap()];
        let parser = BlockParser::new(ParseConfig::default(), None).unwrap();
        let summaries = parser.summarize_all(raws);
        let summary = summaries[0].as_ref().unwrap();
        assert_eq!(summary.header.n_tx, 1);
        assert_eq!(summary.txdata.len(), 1);
        assert!(!summary.auxpow);
    }
}
