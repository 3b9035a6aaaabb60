// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::car::CarV1Header;
use ahash::{HashMap, HashMapExt as _};
use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use integer_encoding::VarIntReader as _;
use parking_lot::Mutex;
use std::io::{
    self, BufReader,
    ErrorKind::{InvalidData, UnexpectedEof},
    Read, Seek, SeekFrom,
};
use tracing::debug;

/// A read-only [`Blockstore`] backed by an uncompressed CARv1 file.
///
/// On creation the whole file is scanned once to build an in-memory index
/// of CID to byte offset; `get` then seeks to the block and reads it on
/// demand. Random access is at the mercy of the OS page cache, but the
/// (near) depth-first access pattern of a split keeps reads mostly linear.
///
/// The reader must see immutable data for the index to stay correct.
pub struct CarBackedStore<ReaderT> {
    inner: Mutex<CarBackedStoreInner<ReaderT>>,
}

struct CarBackedStoreInner<ReaderT> {
    reader: ReaderT,
    index: HashMap<Cid, BlockLocation>,
    roots: Vec<Cid>,
}

#[derive(Clone, Copy, Debug)]
struct BlockLocation {
    offset: u64,
    len: u64,
}

impl<ReaderT: Read + Seek> CarBackedStore<ReaderT> {
    pub fn new(reader: ReaderT) -> io::Result<Self> {
        // Indexing does many small reads of frame lengths and CIDs before
        // each seek, so buffer them.
        let mut buf_reader = BufReader::with_capacity(1024, reader);
        let header = read_v1_header(&mut buf_reader)?;

        let mut index = HashMap::new();
        while let Some((cid, location)) = read_block_location_and_skip(&mut buf_reader)? {
            index.insert(cid, location);
        }
        if index.is_empty() {
            return Err(io::Error::new(
                InvalidData,
                "CARv1 files must contain at least one block",
            ));
        }
        debug!(blocks = index.len(), "indexed source CAR");

        Ok(Self {
            inner: Mutex::new(CarBackedStoreInner {
                // The buffer is only useful while indexing; gets seek anyway.
                reader: buf_reader.into_inner(),
                index,
                roots: header.roots.iter().copied().collect(),
            }),
        })
    }

    /// Roots declared by the file's header.
    pub fn roots(&self) -> Vec<Cid> {
        self.inner.lock().roots.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().index.is_empty()
    }
}

impl<ReaderT: Read + Seek> Blockstore for CarBackedStore<ReaderT> {
    fn get(&self, k: &Cid) -> anyhow::Result<Option<Vec<u8>>> {
        let inner = &mut *self.inner.lock();
        let Some(location) = inner.index.get(k).copied() else {
            return Ok(None);
        };
        inner.reader.seek(SeekFrom::Start(location.offset))?;
        let mut data = vec![0; location.len as usize];
        inner.reader.read_exact(&mut data)?;
        Ok(Some(data))
    }

    fn has(&self, k: &Cid) -> anyhow::Result<bool> {
        Ok(self.inner.lock().index.contains_key(k))
    }

    fn put_keyed(&self, k: &Cid, _block: &[u8]) -> anyhow::Result<()> {
        anyhow::bail!("CAR-backed store is read-only, refusing to write {k}")
    }
}

fn read_v1_header(reader: &mut BufReader<impl Read + Seek>) -> io::Result<CarV1Header> {
    let header_len = reader.read_varint::<usize>()?;
    let mut buf = vec![0; header_len];
    reader.read_exact(&mut buf)?;
    let header: CarV1Header = fvm_ipld_encoding::from_slice(&buf)
        .map_err(|e| io::Error::new(InvalidData, format!("invalid CAR header: {e}")))?;
    if header.version != 1 {
        return Err(io::Error::new(
            InvalidData,
            format!("unsupported CAR version {}", header.version),
        ));
    }
    Ok(header)
}

/// Reads one block frame's length and CID, records where its data lives,
/// and skips over the data. `None` on a clean end of file.
fn read_block_location_and_skip(
    reader: &mut BufReader<impl Read + Seek>,
) -> io::Result<Option<(Cid, BlockLocation)>> {
    let frame_len = match reader.read_varint::<usize>() {
        Ok(len) => len,
        Err(e) if e.kind() == UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    };
    let cid = Cid::read_bytes(&mut *reader).map_err(|e| io::Error::new(InvalidData, e))?;
    let data_len = frame_len
        .checked_sub(cid.encoded_len())
        .ok_or_else(|| io::Error::new(InvalidData, "block frame shorter than its CID"))?
        as u64;
    let offset = reader.stream_position()?;
    reader.seek_relative(data_len as i64)?;
    Ok(Some((cid, BlockLocation {
        offset,
        len: data_len,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::car::{CarBlock, CarWriter};
    use crate::test_utils::raw_leaf;
    use futures::{SinkExt as _, executor::block_on};
    use fvm_ipld_blockstore::MemoryBlockstore;
    use nunny::vec as nonempty;
    use std::io::Cursor;

    fn car_bytes(blocks: &[CarBlock]) -> Vec<u8> {
        let mut out = Vec::new();
        block_on(async {
            let mut writer =
                CarWriter::new_carv1(nonempty![blocks[0].cid], &mut out).unwrap();
            for block in blocks {
                writer.send(block.clone()).await.unwrap();
            }
            writer.close().await.unwrap();
        });
        out
    }

    fn sample_blocks() -> Vec<CarBlock> {
        let staging = MemoryBlockstore::new();
        let cids = [
            raw_leaf(&staging, 100, 0x01),
            raw_leaf(&staging, 2, 0x02),
            raw_leaf(&staging, 300, 0x03),
        ];
        cids.iter()
            .map(|info| CarBlock {
                cid: info.cid,
                data: staging.get(&info.cid).unwrap().unwrap(),
            })
            .collect()
    }

    #[test]
    fn serves_every_indexed_block() {
        let blocks = sample_blocks();
        let store = CarBackedStore::new(Cursor::new(car_bytes(&blocks))).unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(store.roots(), vec![blocks[0].cid]);
        for block in &blocks {
            assert!(store.has(&block.cid).unwrap());
            assert_eq!(store.get(&block.cid).unwrap(), Some(block.data.clone()));
        }
        // Seek back to an earlier block after reading a later one.
        assert_eq!(
            store.get(&blocks[0].cid).unwrap(),
            Some(blocks[0].data.clone())
        );
    }

    #[test]
    fn unknown_block_is_absent_and_writes_are_refused() {
        let blocks = sample_blocks();
        let store = CarBackedStore::new(Cursor::new(car_bytes(&blocks))).unwrap();

        let other = raw_leaf(&MemoryBlockstore::new(), 10, 0x99);
        assert!(!store.has(&other.cid).unwrap());
        assert_eq!(store.get(&other.cid).unwrap(), None);
        assert!(store.put_keyed(&other.cid, b"data").is_err());
    }

    #[test]
    fn header_only_car_is_rejected() {
        let blocks = sample_blocks();
        let bytes = car_bytes(&blocks[..1]);
        // Truncate to just the header frame.
        let header_end = bytes.len() - {
            let mut frame = Vec::new();
            blocks[0].write(&mut frame).unwrap();
            frame.len()
        };
        assert!(CarBackedStore::new(Cursor::new(bytes[..header_end].to_vec())).is_err());
    }

    #[test]
    fn garbage_input_is_rejected() {
        assert!(CarBackedStore::new(Cursor::new(b"not a car file".to_vec())).is_err());
    }
}
