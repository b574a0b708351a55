//!
//! Merged-mining (AuxPOW) envelopes.
//!
//! On merge-mined chains an AuxPOW block carries, between its own
//! header and its transaction count, a proof that the parent chain
//! did the work:
//!
//! ```text
//! parent coinbase tx | block hash (32) | coinbase branch | index (4)
//!     | blockchain branch | index (4) | parent header (80)
//! ```
//!
//! Each branch is a compact size followed by that many 32-byte hashes.
//!
use crate::parser::chain::Chain;
use crate::parser::errors::{OpError, OpErrorKind, OpResult};
use crate::parser::reader::BlockchainRead;
use crate::parser::segmenter::{decode_transaction, ParseConfig};
use crate::parser::transaction::{DecodedTransaction, TxDecoder};
use bitcoin::BlockHeader;
use log::debug;
use std::io::Cursor;

/// Leading bytes of the post-header payload that mark an AuxPOW block.
pub const AUXPOW_VERSION_MARKERS: [[u8; 4]; 4] = [
    [0x01, 0x00, 0x00, 0x00],
    [0x02, 0x00, 0x00, 0x00],
    [0x02, 0x00, 0x00, 0x20],
    [0x02, 0x10, 0x00, 0x20],
];

/// A decoded AuxPOW envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct AuxPow<T> {
    /// coinbase transaction of the parent block
    pub coinbase_tx: T,
    pub parent_hash: [u8; 32],
    pub coinbase_branch: Vec<[u8; 32]>,
    pub coinbase_index: u32,
    pub blockchain_branch: Vec<[u8; 32]>,
    pub blockchain_index: u32,
    pub parent_header: BlockHeader,
    /// bytes occupied by the whole envelope
    pub size: usize,
}

///
/// Whether `payload` (the block minus its 80-byte header) opens with
/// an AuxPOW envelope.
///
pub fn has_auxpow(chain: &Chain, payload: &[u8]) -> bool {
    if !chain.supports_merged_mining() {
        return false;
    }
    match payload.get(..4) {
        Some(marker) => AUXPOW_VERSION_MARKERS.iter().any(|m| m[..] == *marker),
        None => false,
    }
}

///
/// Decode the envelope at the start of `payload`.
///
/// The marker is not checked here, see `has_auxpow`.
///
pub fn parse_auxpow<D: TxDecoder>(
    decoder: &D,
    payload: &[u8],
    config: &ParseConfig,
) -> OpResult<AuxPow<D::Tx>> {
    let coinbase_tx = decode_transaction(decoder, payload, 0, config)
        .map_err(|e| envelope_error(&format!("parent coinbase: {}", e)))?;

    let mut reader = Cursor::new(payload);
    reader.set_position(coinbase_tx.size() as u64);
    let parent_hash = reader
        .read_u256()
        .map_err(|e| envelope_error(&format!("block hash: {}", e)))?;
    let coinbase_branch = read_merkle_branch(&mut reader, "coinbase branch")?;
    let coinbase_index = reader
        .read_u32()
        .map_err(|e| envelope_error(&format!("coinbase branch index: {}", e)))?;
    let blockchain_branch = read_merkle_branch(&mut reader, "blockchain branch")?;
    let blockchain_index = reader
        .read_u32()
        .map_err(|e| envelope_error(&format!("blockchain branch index: {}", e)))?;
    let parent_header = reader
        .read_block_header()
        .map_err(|e| envelope_error(&format!("parent header: {}", e)))?;

    let size = reader.position() as usize;
    debug!(
        "AuxPOW envelope: coinbase {} bytes, branches {}/{}, {} bytes total",
        coinbase_tx.size(),
        coinbase_branch.len(),
        blockchain_branch.len(),
        size
    );
    Ok(AuxPow {
        coinbase_tx,
        parent_hash,
        coinbase_branch,
        coinbase_index,
        blockchain_branch,
        blockchain_index,
        parent_header,
        size,
    })
}

///
/// Offset within `payload` where the transaction count starts:
/// the envelope size for AuxPOW blocks, otherwise 0.
///
pub fn auxpow_offset<D: TxDecoder>(
    chain: &Chain,
    decoder: &D,
    payload: &[u8],
    config: &ParseConfig,
) -> OpResult<usize> {
    if has_auxpow(chain, payload) {
        Ok(parse_auxpow(decoder, payload, config)?.size)
    } else {
        Ok(0)
    }
}

fn read_merkle_branch(reader: &mut Cursor<&[u8]>, name: &str) -> OpResult<Vec<[u8; 32]>> {
    let length = reader
        .read_compact_size()
        .map_err(|e| envelope_error(&format!("{} length: {}", name, e)))?
        .value;
    let remaining = (reader.get_ref().len() as u64).saturating_sub(reader.position());
    match length.checked_mul(32) {
        Some(bytes) if bytes <= remaining => {}
        _ => {
            return Err(envelope_error(&format!(
                "{} of {} hashes exceeds the remaining {} bytes",
                name, length, remaining
            )))
        }
    }
    (0..length)
        .map(|_| reader.read_u256())
        .collect::<OpResult<Vec<_>>>()
        .map_err(|e| envelope_error(&format!("{}: {}", name, e)))
}

#[inline]
fn envelope_error(msg: &str) -> OpError {
    OpError::new(OpErrorKind::InvalidAuxPowEnvelope).join_msg(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::segmenter::tests::{mock_tx, MockDecoder};
    use crate::parser::transaction::ConsensusDecoder;
    use crate::parser::varint::encode_varint;
    use bitcoin::blockdata::constants::genesis_block;
    use bitcoin::consensus::serialize;
    use bitcoin::Network;

    fn envelope_tail(coinbase_branch: u64, blockchain_branch: u64) -> Vec<u8> {
        let mut out = vec![0x11; 32];
        out.extend(encode_varint(coinbase_branch));
        for i in 0..coinbase_branch {
            out.extend(vec![i as u8; 32]);
        }
        out.extend(&[0, 0, 0, 0]);
        out.extend(encode_varint(blockchain_branch));
        for i in 0..blockchain_branch {
            out.extend(vec![0x80 | i as u8; 32]);
        }
        out.extend(&[3, 0, 0, 0]);
        out.extend(serialize(&genesis_block(Network::Bitcoin).header));
        out
    }

    #[test]
    fn test_marker_detection() {
        let doge = Chain::dogecoin();
        for marker in AUXPOW_VERSION_MARKERS.iter() {
            assert!(has_auxpow(&doge, marker));
            assert!(!has_auxpow(&Chain::bitcoin(), marker));
        }
        assert!(!has_auxpow(&doge, &[0x03, 0x00, 0x00, 0x00]));
        assert!(!has_auxpow(&doge, &[0x01, 0x00, 0x00]));
    }

    #[test]
    fn test_parse_mock_envelope() {
        let mut payload = mock_tx(150, 9);
        payload.extend(envelope_tail(3, 2));
        // transaction count and one transaction follow the envelope
        payload.push(1);
        payload.extend(mock_tx(20, 1));

        let config = ParseConfig::new(16, 1024).unwrap();
        let auxpow = parse_auxpow(&MockDecoder, &payload, &config).unwrap();
        let expected = 150 + 32 + 1 + 3 * 32 + 4 + 1 + 2 * 32 + 4 + 80;
        assert_eq!(auxpow.size, expected);
        assert_eq!(auxpow.coinbase_tx.size, 150);
        assert_eq!(auxpow.parent_hash, [0x11; 32]);
        assert_eq!(auxpow.coinbase_branch, vec![[0; 32], [1; 32], [2; 32]]);
        assert_eq!(auxpow.blockchain_branch, vec![[0x80; 32], [0x81; 32]]);
        assert_eq!(auxpow.blockchain_index, 3);
        assert_eq!(
            auxpow.parent_header,
            genesis_block(Network::Bitcoin).header
        );
        assert_eq!(payload[expected], 1);
    }

    #[test]
    fn test_offset_with_real_coinbase() {
        let coinbase = serialize(&genesis_block(Network::Bitcoin).txdata[0]);
        let mut payload = coinbase.clone();
        payload.extend(envelope_tail(0, 0));
        payload.push(0);

        let config = ParseConfig::default();
        let offset = auxpow_offset(&Chain::dogecoin(), &ConsensusDecoder, &payload, &config).unwrap();
        assert_eq!(offset, coinbase.len() + 32 + 1 + 4 + 1 + 4 + 80);
        // same bytes on a chain without merged mining
        let offset = auxpow_offset(&Chain::bitcoin(), &ConsensusDecoder, &payload, &config).unwrap();
        assert_eq!(offset, 0);
    }

    #[test]
    fn test_branch_past_end() {
        let mut payload = mock_tx(40, 9);
        payload.extend(vec![0x11; 32]);
        payload.extend(encode_varint(1000));
        payload.extend(vec![0; 64]);
        let config = ParseConfig::new(16, 1024).unwrap();
        let err = parse_auxpow(&MockDecoder, &payload, &config).unwrap_err();
        assert!(matches!(err.kind(), OpErrorKind::InvalidAuxPowEnvelope));
        assert!(err.message().contains("coinbase branch"));

        // absurd lengths must not overflow
        let mut payload = mock_tx(40, 9);
        payload.extend(vec![0x11; 32]);
        payload.extend(encode_varint(u64::MAX));
        let err = parse_auxpow(&MockDecoder, &payload, &config).unwrap_err();
        assert!(matches!(err.kind(), OpErrorKind::InvalidAuxPowEnvelope));
    }

    #[test]
    fn test_truncated_parent_header() {
        let mut payload = mock_tx(40, 9);
        let mut tail = envelope_tail(1, 1);
        tail.truncate(tail.len() - 1);
        payload.extend(tail);
        let config = ParseConfig::new(16, 1024).unwrap();
        let err = parse_auxpow(&MockDecoder, &payload, &config).unwrap_err();
        assert!(matches!(err.kind(), OpErrorKind::InvalidAuxPowEnvelope));
        assert!(err.message().contains("parent header"));
    }

    #[test]
    fn test_undecodable_coinbase() {
        let payload = vec![0x01, 0x00, 0x00, 0x00];
        let err = parse_auxpow(&ConsensusDecoder, &payload, &ParseConfig::default()).unwrap_err();
        assert!(matches!(err.kind(), OpErrorKind::InvalidAuxPowEnvelope));
    }
}
