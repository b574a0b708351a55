//!
//! Splits a run of back-to-back transactions into individual records.
//!
//! A block only states how many transactions follow, never where each
//! one ends. Each transaction is decoded to learn its length, and the
//! next one starts right after it. The decoder is handed a bounded
//! window which doubles while it reports `DecodeFailure::Incomplete`.
//!
use crate::parser::errors::{OpError, OpErrorKind, OpResult};
use crate::parser::transaction::{DecodeFailure, DecodedTransaction, TxDecoder};
use log::{debug, trace};
use std::convert::TryFrom;

/// 1 KiB
pub const DEFAULT_MIN_WINDOW: usize = 1 << 10;
/// 1 GiB
pub const DEFAULT_MAX_WINDOW: usize = 1 << 30;

/// Trial window bounds for transaction decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseConfig {
    min_window: usize,
    max_window: usize,
}

impl Default for ParseConfig {
    fn default() -> Self {
        ParseConfig {
            min_window: DEFAULT_MIN_WINDOW,
            max_window: DEFAULT_MAX_WINDOW,
        }
    }
}

impl ParseConfig {
    pub fn new(min_window: usize, max_window: usize) -> OpResult<ParseConfig> {
        if min_window == 0 {
            return Err(
                OpError::new(OpErrorKind::InvalidConfig).join_msg("min_window must be positive")
            );
        }
        if min_window > max_window {
            return Err(OpError::new(OpErrorKind::InvalidConfig)
                .join_msg(&format!("min_window {} > max_window {}", min_window, max_window)));
        }
        Ok(ParseConfig {
            min_window,
            max_window,
        })
    }

    #[inline]
    pub fn min_window(&self) -> usize {
        self.min_window
    }

    #[inline]
    pub fn max_window(&self) -> usize {
        self.max_window
    }
}

///
/// Decode the single transaction starting at `offset`.
///
/// The size reported by the decoded transaction, not the window,
/// tells the caller how far to advance.
///
pub fn decode_transaction<D: TxDecoder>(
    decoder: &D,
    buffer: &[u8],
    offset: usize,
    config: &ParseConfig,
) -> OpResult<D::Tx> {
    let data = buffer.get(offset..).unwrap_or(&[]);
    let remaining = data.len();
    let mut window = config.min_window;
    loop {
        let end = window.min(remaining);
        match decoder.try_decode(&data[..end]) {
            Ok(tx) => {
                let size = tx.size();
                if size == 0 || size > end {
                    return Err(decode_error(offset).join_msg(&format!(
                        "decoder reported size {} for a window of {}",
                        size, end
                    )));
                }
                return Ok(tx);
            }
            Err(DecodeFailure::Incomplete) => {
                if end == remaining {
                    return Err(decode_error(offset)
                        .join_msg(&format!("ran out of data after {} bytes", remaining)));
                }
                match window.checked_mul(2) {
                    Some(next) if next <= config.max_window => {
                        trace!("offset {}: window {} too small, trying {}", offset, window, next);
                        window = next;
                    }
                    _ => {
                        return Err(decode_error(offset).join_msg(&format!(
                            "no transaction within max window of {} bytes",
                            config.max_window
                        )));
                    }
                }
            }
            Err(DecodeFailure::Malformed(reason)) => {
                return Err(decode_error(offset).join_msg(&reason));
            }
        }
    }
}

#[inline]
fn decode_error(offset: usize) -> OpError {
    OpError::new(OpErrorKind::TransactionDecodeError).join_msg(&format!("at offset {}", offset))
}

///
/// Lazy sequence of the transactions in `buffer[start..]`.
///
/// Yields at most `count` items in on-buffer order and stops for good
/// after the first error. `restart` rewinds to the first transaction.
///
pub struct TransactionStream<'a, D: TxDecoder> {
    decoder: &'a D,
    buffer: &'a [u8],
    config: &'a ParseConfig,
    start: usize,
    count: u64,
    offset: usize,
    index: u64,
    failed: bool,
}

impl<'a, D: TxDecoder> TransactionStream<'a, D> {
    pub fn new(
        decoder: &'a D,
        buffer: &'a [u8],
        start: usize,
        count: u64,
        config: &'a ParseConfig,
    ) -> Self {
        TransactionStream {
            decoder,
            buffer,
            config,
            start,
            count,
            offset: start,
            index: 0,
            failed: false,
        }
    }

    /// bytes consumed since `start` by the transactions yielded so far
    #[inline]
    pub fn consumed(&self) -> usize {
        self.offset - self.start
    }

    /// offset of the next transaction within the buffer
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn restart(&mut self) {
        self.offset = self.start;
        self.index = 0;
        self.failed = false;
    }
}

impl<'a, D: TxDecoder> Iterator for TransactionStream<'a, D> {
    type Item = OpResult<D::Tx>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.index >= self.count {
            return None;
        }
        match decode_transaction(self.decoder, self.buffer, self.offset, self.config) {
            Ok(tx) => {
                self.offset += tx.size();
                self.index += 1;
                Some(Ok(tx))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e.join_msg(&format!("transaction {} of {}", self.index, self.count))))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            (0, Some(0))
        } else {
            (0, usize::try_from(self.count - self.index).ok())
        }
    }
}

///
/// Decode all `count` transactions in `buffer[start..]`.
///
/// Returns the transactions and the number of bytes they occupy.
/// Either every transaction is recovered or an error is returned.
///
pub fn segment<D: TxDecoder>(
    decoder: &D,
    buffer: &[u8],
    start: usize,
    count: u64,
    config: &ParseConfig,
) -> OpResult<(Vec<D::Tx>, usize)> {
    // a corrupt count must not drive the allocation
    let capacity = (count as usize).min(buffer.len().saturating_sub(start));
    let mut transactions = Vec::with_capacity(capacity);
    let mut stream = TransactionStream::new(decoder, buffer, start, count, config);
    for tx in &mut stream {
        transactions.push(tx?);
    }
    debug!(
        "segmented {} transactions over {} bytes",
        transactions.len(),
        stream.consumed()
    );
    Ok((transactions, stream.consumed()))
}
