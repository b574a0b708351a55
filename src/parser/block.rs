use crate::parser::auxpow::{has_auxpow, parse_auxpow, AuxPow};
use crate::parser::chain::Chain;
use crate::parser::errors::{OpError, OpErrorKind, OpResult};
use crate::parser::reader::BlockchainRead;
use crate::parser::segmenter::{segment, ParseConfig, TransactionStream};
use crate::parser::transaction::{ConsensusDecoder, TxDecoder};
use crate::parser::varint::decode_varint;
use bitcoin::hashes::hex::FromHex;
use bitcoin::BlockHeader;
use bitcoin_hashes::hex::ToHex;
use bitcoin_hashes::{sha256d, Hash};
use log::warn;
use std::fmt;
use std::io::Cursor;
use std::sync::{Mutex, OnceLock};

pub const HEADER_SIZE: usize = 80;

///
/// Undecoded block bytes and the chain they come from.
///
/// Always at least `HEADER_SIZE` bytes long.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock {
    bytes: Vec<u8>,
    chain: Chain,
    height: Option<u32>,
}

impl RawBlock {
    pub fn new(bytes: Vec<u8>, chain: Chain, height: Option<u32>) -> OpResult<RawBlock> {
        if bytes.len() < HEADER_SIZE {
            return Err(OpError::new(OpErrorKind::TruncatedInput).join_msg(&format!(
                "block of {} bytes is shorter than its header",
                bytes.len()
            )));
        }
        Ok(RawBlock {
            bytes,
            chain,
            height,
        })
    }

    pub fn from_hex(hex: &str, chain: Chain, height: Option<u32>) -> OpResult<RawBlock> {
        RawBlock::new(Vec::<u8>::from_hex(hex)?, chain, height)
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    #[inline]
    pub fn height(&self) -> Option<u32> {
        self.height
    }

    #[inline]
    pub fn header_bytes(&self) -> &[u8] {
        &self.bytes[..HEADER_SIZE]
    }

    /// everything after the header
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.bytes[HEADER_SIZE..]
    }
}

/// where the transaction list begins
#[derive(Debug, Clone, Copy)]
struct TxListStart {
    count: u64,
    /// absolute offset of the first transaction
    offset: usize,
}

///
/// A block whose header, hash, and transactions are decoded on first
/// use and kept for the lifetime of the block.
///
/// Each cache is written once. While one caller decodes a field, other
/// callers of the same field wait and then read the stored value.
/// Errors are returned, not stored, and leave the other caches untouched.
///
pub struct Block<D: TxDecoder = ConsensusDecoder> {
    raw: RawBlock,
    decoder: D,
    config: ParseConfig,
    hash: OnceLock<String>,
    header: LazyField<BlockHeader>,
    auxpow: LazyField<Option<AuxPow<D::Tx>>>,
    tx_start: LazyField<TxListStart>,
    transactions: LazyField<Vec<D::Tx>>,
}

impl Block<ConsensusDecoder> {
    pub fn new(raw: RawBlock) -> Self {
        Block::with_decoder(raw, ConsensusDecoder, ParseConfig::default())
    }

    pub fn from_bytes(bytes: Vec<u8>, chain: Chain) -> OpResult<Self> {
        Ok(Block::new(RawBlock::new(bytes, chain, None)?))
    }
}

impl<D: TxDecoder> Block<D> {
    pub fn with_decoder(raw: RawBlock, decoder: D, config: ParseConfig) -> Self {
        Block {
            raw,
            decoder,
            config,
            hash: OnceLock::new(),
            header: LazyField::new(),
            auxpow: LazyField::new(),
            tx_start: LazyField::new(),
            transactions: LazyField::new(),
        }
    }

    /// double sha256 of the header, hex in reversed byte order
    pub fn hash(&self) -> &str {
        self.hash
            .get_or_init(|| sha256d::Hash::hash(self.raw.header_bytes()).to_hex())
    }

    pub fn header(&self) -> OpResult<&BlockHeader> {
        self.header.get_or_try_init(|| {
            Cursor::new(self.raw.header_bytes()).read_block_header()
        })
    }

    /// The merged-mining envelope, if the chain and payload carry one.
    pub fn auxpow(&self) -> OpResult<Option<&AuxPow<D::Tx>>> {
        let auxpow = self.auxpow.get_or_try_init(|| {
            let payload = self.raw.payload();
            if has_auxpow(&self.raw.chain, payload) {
                parse_auxpow(&self.decoder, payload, &self.config).map(Some)
            } else {
                Ok(None)
            }
        })?;
        Ok(auxpow.as_ref())
    }

    fn tx_start(&self) -> OpResult<&TxListStart> {
        self.tx_start.get_or_try_init(|| {
            let count_offset = HEADER_SIZE + self.auxpow()?.map_or(0, |a| a.size);
            let bytes = self.raw.bytes();
            let varint = decode_varint(bytes.get(count_offset..).unwrap_or(&[]))
                .map_err(|e| e.join_msg("transaction count"))?;
            Ok(TxListStart {
                count: varint.value,
                offset: count_offset + varint.consumed,
            })
        })
    }

    ///
    /// Number of transactions announced by the block.
    ///
    /// Reads only the count (and the AuxPOW envelope when present),
    /// not the transactions themselves.
    ///
    pub fn n_transactions(&self) -> OpResult<u64> {
        Ok(self.tx_start()?.count)
    }

    /// All transactions, in block order.
    pub fn transactions(&self) -> OpResult<&[D::Tx]> {
        let transactions = self.transactions.get_or_try_init(|| {
            let start = self.tx_start()?;
            match segment(
                &self.decoder,
                self.raw.bytes(),
                start.offset,
                start.count,
                &self.config,
            ) {
                Ok((transactions, _)) => Ok(transactions),
                Err(e) => {
                    warn!("failed to segment block {}: {}", self.hash(), e);
                    Err(e)
                }
            }
        })?;
        Ok(transactions)
    }

    /// Decode transactions one by one without caching them.
    pub fn iter_transactions(&self) -> OpResult<TransactionStream<'_, D>> {
        let start = self.tx_start()?;
        Ok(TransactionStream::new(
            &self.decoder,
            self.raw.bytes(),
            start.offset,
            start.count,
            &self.config,
        ))
    }

    #[inline]
    pub fn raw(&self) -> &RawBlock {
        &self.raw
    }

    #[inline]
    pub fn chain(&self) -> &Chain {
        &self.raw.chain
    }

    #[inline]
    pub fn height(&self) -> Option<u32> {
        self.raw.height
    }

    /// size in bytes
    #[inline]
    pub fn size(&self) -> usize {
        self.raw.bytes.len()
    }
}

impl<D: TxDecoder> fmt::Display for Block<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Block({})", self.hash())
    }
}

impl<D: TxDecoder> fmt::Debug for Block<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("hash", &self.hash())
            .field("chain", &self.raw.chain.symbol())
            .field("height", &self.raw.height)
            .field("size", &self.size())
            .field("config", &self.config)
            .finish()
    }
}

///
/// Write-once cache that lets a single caller compute the value.
///
/// Failed computations store nothing; the next caller tries again.
///
struct LazyField<T> {
    value: OnceLock<T>,
    init: Mutex<()>,
}

impl<T> LazyField<T> {
    fn new() -> Self {
        LazyField {
            value: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    fn get_or_try_init<F>(&self, init: F) -> OpResult<&T>
    where
        F: FnOnce() -> OpResult<T>,
    {
        if let Some(value) = self.value.get() {
            return Ok(value);
        }
        // a panicking initializer stored nothing, the lock is still usable
        let _guard = self.init.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(value) = self.value.get() {
            return Ok(value);
        }
        let value = init()?;
        Ok(self.value.get_or_init(|| value))
    }
}
