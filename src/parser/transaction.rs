//!
//! The seam between segmentation and transaction decoding.
//!
//! A decoder only ever sees a bounded window of the block. It either
//! returns a transaction that knows its exact serialized size, or
//! says why it could not: the window ended too early, or the bytes
//! are not a transaction at all.
//!
use crate::parser::reader::BlockchainRead;
use crate::parser::errors::OpErrorKind;
use bitcoin::hashes::hex::ToHex;
use bitcoin::{Transaction, Txid};
use std::io::Cursor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeFailure {
    /// ran out of bytes; a larger window may succeed
    Incomplete,
    /// bytes cannot form a transaction regardless of window size
    Malformed(String),
}

pub trait DecodedTransaction {
    /// number of bytes the transaction occupies in the block
    fn size(&self) -> usize;

    /// content hash, hex in display order
    fn hash(&self) -> String;
}

pub trait TxDecoder {
    type Tx: DecodedTransaction;

    fn try_decode(&self, window: &[u8]) -> Result<Self::Tx, DecodeFailure>;
}

/// `bitcoin::Transaction` with its serialized size and txid pre-computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTransaction {
    pub tx: Transaction,
    pub txid: Txid,
    size: usize,
}

impl DecodedTransaction for ParsedTransaction {
    #[inline]
    fn size(&self) -> usize {
        self.size
    }

    fn hash(&self) -> String {
        self.txid.to_hex()
    }
}

impl From<ParsedTransaction> for Transaction {
    fn from(parsed: ParsedTransaction) -> Transaction {
        parsed.tx
    }
}

/// Decodes with bitcoin consensus rules (segwit aware).
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsensusDecoder;

impl TxDecoder for ConsensusDecoder {
    type Tx = ParsedTransaction;

    fn try_decode(&self, window: &[u8]) -> Result<ParsedTransaction, DecodeFailure> {
        let mut reader = Cursor::new(window);
        match reader.read_transaction() {
            Ok(tx) => Ok(ParsedTransaction {
                txid: tx.txid(),
                size: reader.position() as usize,
                tx,
            }),
            Err(e) => match e.kind() {
                OpErrorKind::TruncatedInput => Err(DecodeFailure::Incomplete),
                _ => Err(DecodeFailure::Malformed(e.to_string())),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::blockdata::constants::genesis_block;
    use bitcoin::consensus::serialize;
    use bitcoin::Network;

    #[test]
    fn test_decode_exact_and_oversized_window() {
        let coinbase = genesis_block(Network::Bitcoin).txdata.remove(0);
        let mut bytes = serialize(&coinbase);
        let size = bytes.len();

        let parsed = ConsensusDecoder.try_decode(&bytes).unwrap();
        assert_eq!(parsed.size(), size);
        assert_eq!(
            parsed.hash(),
            "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b"
        );

        // trailing bytes belong to the next transaction
        bytes.extend_from_slice(&[0xab; 64]);
        let parsed = ConsensusDecoder.try_decode(&bytes).unwrap();
        assert_eq!(parsed.size(), size);
        assert_eq!(parsed.tx, coinbase);
    }

    #[test]
    fn test_decode_short_window() {
        let coinbase = genesis_block(Network::Bitcoin).txdata.remove(0);
        let bytes = serialize(&coinbase);
        assert_eq!(
            ConsensusDecoder.try_decode(&bytes[..bytes.len() - 1]),
            Err(DecodeFailure::Incomplete)
        );
        assert_eq!(
            ConsensusDecoder.try_decode(&[]),
            Err(DecodeFailure::Incomplete)
        );
    }
}
