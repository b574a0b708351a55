use crate::parser::block::Block;
use crate::parser::errors::OpResult;
use crate::parser::transaction::{DecodedTransaction, TxDecoder};
use bitcoin::{BlockHash, TxMerkleNode};
use serde::{Deserialize, Serialize};

///
/// Block in a `simple` format.
///
/// A `SBlock` has the following precomputed:
/// - `block hash`
/// - `transaction count`
/// - `transaction hash` and `size` of every transaction
///
/// It keeps no transaction bodies, which makes it cheap to
/// store or transfer.
///
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SBlock {
    pub header: SBlockHeader,
    /// whether the block carried a merged-mining envelope
    pub auxpow: bool,
    pub txdata: Vec<STransaction>,
}

impl SBlock {
    /// decodes all transactions of `block` (cached in the block)
    pub fn parse<D: TxDecoder>(block: &Block<D>) -> OpResult<SBlock> {
        let txdata = block
            .transactions()?
            .iter()
            .map(STransaction::parse)
            .collect();
        Ok(SBlock {
            header: SBlockHeader::parse(block)?,
            auxpow: block.auxpow()?.is_some(),
            txdata,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SBlockHeader {
    pub block_hash: String,
    pub height: Option<u32>,
    pub version: i32,
    pub prev_blockhash: BlockHash,
    pub merkle_root: TxMerkleNode,
    pub time: u32,
    pub bits: u32,
    pub nonce: u32,
    pub n_tx: u64,
    /// block size in bytes
    pub size: usize,
}

impl SBlockHeader {
    pub fn parse<D: TxDecoder>(block: &Block<D>) -> OpResult<SBlockHeader> {
        let header = block.header()?;
        Ok(SBlockHeader {
            block_hash: block.hash().to_owned(),
            height: block.height(),
            version: header.version,
            prev_blockhash: header.prev_blockhash,
            merkle_root: header.merkle_root,
            time: header.time,
            bits: header.bits,
            nonce: header.nonce,
            n_tx: block.n_transactions()?,
            size: block.size(),
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct STransaction {
    pub txid: String,
    pub size: usize,
}

impl STransaction {
    pub fn parse<T: DecodedTransaction>(tx: &T) -> STransaction {
        STransaction {
            txid: tx.hash(),
            size: tx.size(),
        }
    }
}
