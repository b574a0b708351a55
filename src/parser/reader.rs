use crate::parser::errors::OpResult;
use crate::parser::varint::{Varint, VARINT_U16_PREFIX, VARINT_U32_PREFIX, VARINT_U64_PREFIX};
use bitcoin::consensus::Decodable;
use bitcoin::{BlockHeader, Transaction};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

pub trait BlockchainRead: std::io::Read {
    /// Bitcoin compact size, little-endian after a one byte prefix.
    ///
    /// Non-canonical encodings (a wide prefix carrying a small value)
    /// are accepted and report their actual width.
    fn read_compact_size(&mut self) -> OpResult<Varint> {
        let prefix = self.read_u8()?;
        let varint = match prefix {
            VARINT_U16_PREFIX => Varint {
                value: ReadBytesExt::read_u16::<LittleEndian>(self)? as u64,
                consumed: 3,
            },
            VARINT_U32_PREFIX => Varint {
                value: ReadBytesExt::read_u32::<LittleEndian>(self)? as u64,
                consumed: 5,
            },
            VARINT_U64_PREFIX => Varint {
                value: ReadBytesExt::read_u64::<LittleEndian>(self)?,
                consumed: 9,
            },
            n => Varint {
                value: n as u64,
                consumed: 1,
            },
        };
        Ok(varint)
    }

    #[inline]
    fn read_u8(&mut self) -> OpResult<u8> {
        let mut slice = [0u8; 1];
        self.read_exact(&mut slice)?;
        Ok(slice[0])
    }

    #[inline]
    fn read_u256(&mut self) -> OpResult<[u8; 32]> {
        let mut arr = [0u8; 32];
        self.read_exact(&mut arr)?;
        Ok(arr)
    }

    #[inline]
    fn read_u32(&mut self) -> OpResult<u32> {
        let u = ReadBytesExt::read_u32::<LittleEndian>(self)?;
        Ok(u)
    }

    #[inline]
    fn read_transaction(&mut self) -> OpResult<Transaction> {
        Ok(Transaction::consensus_decode(self)?)
    }

    #[inline]
    fn read_block_header(&mut self) -> OpResult<BlockHeader> {
        Ok(BlockHeader::consensus_decode(self)?)
    }
}

impl BlockchainRead for Cursor<&[u8]> {}
