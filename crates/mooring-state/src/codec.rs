//! Stable byte layout for persisted sidechain records.
//!
//! This format is the on-disk contract and must not drift: raw 32-byte
//! hashes, little-endian integers, compact-size counts, immature
//! entries in ascending height order.
//!
//! Layout, in order:
//! 1. creation block hash, 32 raw bytes
//! 2. creation block height, i32 LE
//! 3. creation tx hash, 32 raw bytes
//! 4. balance, i64 LE
//! 5. creation data: compact-size length + raw bytes
//! 6. immature amounts: compact-size count + (i32 LE height, i64 LE amount) pairs

use std::collections::BTreeMap;
use std::io::{self, Write};

use mooring_core::{Amount, Hash};

use crate::error::StateError;
use crate::info::SidechainInfo;

// https://github.com/bitcoin/bitcoin/blob/master/src/serialize.h CompactSize
fn write_compact_size<W: Write>(writer: &mut W, size: u64) -> std::io::Result<()> {
    if size < 253 {
        writer.write_all(&[size as u8])?;
    } else if size <= 0xFFFF {
        writer.write_all(&[253])?;
        writer.write_all(&(size as u16).to_le_bytes())?;
    } else if size <= 0xFFFF_FFFF {
        writer.write_all(&[254])?;
        writer.write_all(&(size as u32).to_le_bytes())?;
    } else {
        writer.write_all(&[255])?;
        writer.write_all(&size.to_le_bytes())?;
    }
    Ok(())
}

/// Byte-slice cursor with strict bounds checking.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Reader { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], StateError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| StateError::Deserialization("record truncated".into()))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_hash(&mut self) -> Result<Hash, StateError> {
        let bytes = self.take(32)?;
        Hash::from_slice(bytes)
            .ok_or_else(|| StateError::Deserialization("bad hash length".into()))
    }

    fn read_i32(&mut self) -> Result<i32, StateError> {
        let bytes = self.take(4)?;
        let mut arr = [0u8; 4];
        arr.copy_from_slice(bytes);
        Ok(i32::from_le_bytes(arr))
    }

    fn read_i64(&mut self) -> Result<i64, StateError> {
        let bytes = self.take(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(bytes);
        Ok(i64::from_le_bytes(arr))
    }

    fn read_compact_size(&mut self) -> Result<u64, StateError> {
        let tag = self.take(1)?[0];
        let value = match tag {
            0..=252 => u64::from(tag),
            253 => {
                let bytes = self.take(2)?;
                u64::from(u16::from_le_bytes([bytes[0], bytes[1]]))
            }
            254 => {
                let bytes = self.take(4)?;
                let mut arr = [0u8; 4];
                arr.copy_from_slice(bytes);
                u64::from(u32::from_le_bytes(arr))
            }
            255 => {
                let bytes = self.take(8)?;
                let mut arr = [0u8; 8];
                arr.copy_from_slice(bytes);
                u64::from_le_bytes(arr)
            }
        };
        Ok(value)
    }

    fn finished(&self) -> bool {
        self.pos == self.bytes.len()
    }
}

fn write_info<W: Write>(writer: &mut W, info: &SidechainInfo) -> io::Result<()> {
    writer.write_all(info.creation_block_hash.as_bytes())?;
    writer.write_all(&info.creation_block_height.to_le_bytes())?;
    writer.write_all(info.creation_tx_hash.as_bytes())?;
    writer.write_all(&info.balance.to_le_bytes())?;
    write_compact_size(writer, info.creation_data.len() as u64)?;
    writer.write_all(&info.creation_data)?;
    write_compact_size(writer, info.immature_amounts.len() as u64)?;
    // BTreeMap iteration is already ascending by height.
    for (height, amount) in &info.immature_amounts {
        writer.write_all(&height.to_le_bytes())?;
        writer.write_all(&amount.to_le_bytes())?;
    }
    Ok(())
}

/// Encode a record into its stable byte layout.
pub fn encode_info(info: &SidechainInfo) -> Result<Vec<u8>, StateError> {
    let mut out = Vec::with_capacity(96 + info.creation_data.len());
    write_info(&mut out, info).map_err(|e| StateError::Serialization(e.to_string()))?;
    Ok(out)
}

/// Decode a record, rejecting truncation, trailing bytes, and
/// non-canonical immature ordering.
pub fn decode_info(bytes: &[u8]) -> Result<SidechainInfo, StateError> {
    let mut reader = Reader::new(bytes);

    let creation_block_hash = reader.read_hash()?;
    let creation_block_height = reader.read_i32()?;
    let creation_tx_hash = reader.read_hash()?;
    let balance = reader.read_i64()?;

    let data_len = reader.read_compact_size()?;
    let data_len = usize::try_from(data_len)
        .map_err(|_| StateError::Deserialization("creation data length".into()))?;
    let creation_data = reader.take(data_len)?.to_vec();

    let count = reader.read_compact_size()?;
    let mut immature_amounts: BTreeMap<i32, Amount> = BTreeMap::new();
    let mut prev_height: Option<i32> = None;
    for _ in 0..count {
        let height = reader.read_i32()?;
        let amount = reader.read_i64()?;
        if prev_height.is_some_and(|prev| prev >= height) {
            return Err(StateError::Deserialization(
                "immature entries out of order".into(),
            ));
        }
        prev_height = Some(height);
        immature_amounts.insert(height, amount);
    }

    if !reader.finished() {
        return Err(StateError::Deserialization("trailing bytes".into()));
    }

    Ok(SidechainInfo {
        creation_block_hash,
        creation_block_height,
        creation_tx_hash,
        balance,
        creation_data,
        immature_amounts,
    })
}

fn write_snapshot<W: Write>(
    writer: &mut W,
    data: &BTreeMap<Vec<u8>, Vec<u8>>,
) -> io::Result<()> {
    write_compact_size(writer, data.len() as u64)?;
    for (key, value) in data {
        write_compact_size(writer, key.len() as u64)?;
        writer.write_all(key)?;
        write_compact_size(writer, value.len() as u64)?;
        writer.write_all(value)?;
    }
    Ok(())
}

/// Encode a full store snapshot: compact-size entry count, then each
/// entry as a compact-size-framed key and value, in key order.
pub(crate) fn encode_snapshot(data: &BTreeMap<Vec<u8>, Vec<u8>>) -> Result<Vec<u8>, StateError> {
    let mut out = Vec::new();
    write_snapshot(&mut out, data).map_err(|e| StateError::Serialization(e.to_string()))?;
    Ok(out)
}

/// Decode a store snapshot, rejecting truncation and trailing bytes.
pub(crate) fn decode_snapshot(bytes: &[u8]) -> Result<BTreeMap<Vec<u8>, Vec<u8>>, StateError> {
    let mut reader = Reader::new(bytes);
    let count = reader.read_compact_size()?;
    let mut out = BTreeMap::new();
    for _ in 0..count {
        let key_len = usize::try_from(reader.read_compact_size()?)
            .map_err(|_| StateError::Deserialization("snapshot key length".into()))?;
        let key = reader.take(key_len)?.to_vec();
        let value_len = usize::try_from(reader.read_compact_size()?)
            .map_err(|_| StateError::Deserialization("snapshot value length".into()))?;
        let value = reader.take(value_len)?.to_vec();
        out.insert(key, value);
    }
    if !reader.finished() {
        return Err(StateError::Deserialization("trailing bytes".into()));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mooring_core::hash_blake3;

    fn sample_info() -> SidechainInfo {
        let mut info = SidechainInfo {
            creation_block_hash: hash_blake3(b"block"),
            creation_block_height: 1789,
            creation_tx_hash: hash_blake3(b"tx"),
            balance: 5_000,
            creation_data: vec![1, 2, 3, 4],
            immature_amounts: BTreeMap::new(),
        };
        info.immature_amounts.insert(1889, 250);
        info.immature_amounts.insert(1900, 750);
        info
    }

    #[test]
    fn test_roundtrip() {
        let info = sample_info();
        let bytes = encode_info(&info).unwrap();
        let decoded = decode_info(&bytes).unwrap();
        assert_eq!(info, decoded);
    }

    #[test]
    fn test_roundtrip_default_record() {
        let info = SidechainInfo::default();
        let bytes = encode_info(&info).unwrap();
        assert_eq!(decode_info(&bytes).unwrap(), info);
    }

    #[test]
    fn test_known_layout() {
        let info = SidechainInfo {
            creation_block_hash: Hash::new([0xAA; 32]),
            creation_block_height: 7,
            creation_tx_hash: Hash::new([0xBB; 32]),
            balance: 1000,
            creation_data: vec![0xCC],
            immature_amounts: BTreeMap::from([(107, 1000)]),
        };
        let bytes = encode_info(&info).unwrap();

        assert_eq!(&bytes[..32], &[0xAA; 32]);
        assert_eq!(&bytes[32..36], &7i32.to_le_bytes());
        assert_eq!(&bytes[36..68], &[0xBB; 32]);
        assert_eq!(&bytes[68..76], &1000i64.to_le_bytes());
        assert_eq!(&bytes[76..78], &[1, 0xCC]); // compact size + data
        assert_eq!(bytes[78], 1); // immature count
        assert_eq!(&bytes[79..83], &107i32.to_le_bytes());
        assert_eq!(&bytes[83..91], &1000i64.to_le_bytes());
        assert_eq!(bytes.len(), 91);
    }

    #[test]
    fn test_compact_size_boundaries() {
        for len in [0usize, 1, 252, 253, 300] {
            let info = SidechainInfo {
                creation_data: vec![0x11; len],
                ..Default::default()
            };
            let bytes = encode_info(&info).unwrap();
            assert_eq!(decode_info(&bytes).unwrap().creation_data.len(), len);
        }
    }

    #[test]
    fn test_truncation_rejected() {
        let bytes = encode_info(&sample_info()).unwrap();
        for cut in [0, 10, 31, 35, 68, bytes.len() - 1] {
            assert!(decode_info(&bytes[..cut]).is_err(), "cut at {cut}");
        }
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = encode_info(&sample_info()).unwrap();
        bytes.push(0);
        assert!(decode_info(&bytes).is_err());
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let mut data = BTreeMap::new();
        data.insert(vec![1, 2, 3], vec![4, 5]);
        data.insert(vec![9], Vec::new());

        let bytes = encode_snapshot(&data).unwrap();
        assert_eq!(decode_snapshot(&bytes).unwrap(), data);
        assert_eq!(
            decode_snapshot(&encode_snapshot(&BTreeMap::new()).unwrap()).unwrap(),
            BTreeMap::new()
        );
    }

    #[test]
    fn test_snapshot_truncation_rejected() {
        let mut data = BTreeMap::new();
        data.insert(vec![1, 2, 3], vec![4, 5]);
        let mut bytes = encode_snapshot(&data).unwrap();

        assert!(decode_snapshot(&bytes[..bytes.len() - 1]).is_err());
        bytes.push(0);
        assert!(decode_snapshot(&bytes).is_err());
    }

    #[test]
    fn test_unordered_entries_rejected() {
        let info = SidechainInfo {
            immature_amounts: BTreeMap::from([(10, 1), (20, 2)]),
            ..Default::default()
        };
        let mut bytes = encode_info(&info).unwrap();

        // Swap the two trailing (height, amount) pairs.
        let tail = bytes.len() - 24;
        let (first, second) = (
            bytes[tail..tail + 12].to_vec(),
            bytes[tail + 12..].to_vec(),
        );
        bytes[tail..tail + 12].copy_from_slice(&second);
        bytes[tail + 12..].copy_from_slice(&first);

        assert!(decode_info(&bytes).is_err());
    }
}
