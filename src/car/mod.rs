// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! CARv1 emission for boxes.
//!
//! A CAR file is a varint-framed header (DAG-CBOR `{roots, version}`)
//! followed by varint frames each holding a CID and that block's data. One
//! file is written per box: its roots are the box roots, and its blocks are
//! collected depth-first from them, pruning at the box's external set and at
//! sector commitment links, so the file holds exactly the blocks the box
//! covers in first-seen order.

use crate::cid_collections::CidHashSet;
use crate::error::Error;
use crate::splitter::DagBox;
use crate::store::DagService;
use crate::unixfs::DagNode;
use bytes::{Buf as _, BufMut as _, Bytes, BytesMut};
use cid::Cid;
use futures::{ready, Sink, StreamExt as _};
use fvm_ipld_blockstore::Blockstore;
use integer_encoding::VarInt as _;
use multihash_codetable::{Code, MultihashDigest as _};
use nunny::Vec as NonEmpty;
use pin_project_lite::pin_project;
use serde::{Deserialize, Serialize};
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::AsyncWrite;
use tokio_util::codec::Encoder as _;
use unsigned_varint::codec::UviBytes;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CarV1Header {
    // The roots array must contain one or more CIDs, each of which should be
    // present somewhere in the remainder of the CAR.
    // See <https://ipld.io/specs/transport/car/carv1/#constraints>
    pub roots: NonEmpty<Cid>,
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CarBlock {
    pub cid: Cid,
    pub data: Vec<u8>,
}

impl CarBlock {
    /// Writes a varint frame containing the CID and the data.
    pub fn write(&self, mut writer: &mut impl io::Write) -> io::Result<()> {
        let frame_length = self.cid.encoded_len() + self.data.len();
        writer.write_all(&frame_length.encode_var_vec())?;
        self.cid
            .write_bytes(&mut writer)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writer.write_all(&self.data)?;
        Ok(())
    }

    pub fn valid(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let code = Code::try_from(self.cid.hash().code())?;
        let actual = Cid::new_v1(self.cid.codec(), code.digest(&self.data));
        anyhow::ensure!(
            actual == self.cid,
            "CID/Block mismatch for block {}, actual: {actual}",
            self.cid
        );
        Ok(())
    }
}

pin_project! {
    /// Sink of [`CarBlock`]s writing a CARv1 stream.
    pub struct CarWriter<W> {
        #[pin]
        inner: W,
        buffer: BytesMut,
    }
}

impl<W: AsyncWrite> CarWriter<W> {
    pub fn new_carv1(roots: NonEmpty<Cid>, writer: W) -> io::Result<Self> {
        let car_header = CarV1Header { roots, version: 1 };

        let header_bytes = fvm_ipld_encoding::to_vec(&car_header)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let mut header_uvi_frame = BytesMut::new();
        UviBytes::default().encode(Bytes::from(header_bytes), &mut header_uvi_frame)?;

        Ok(Self {
            inner: writer,
            buffer: header_uvi_frame,
        })
    }
}

impl<W: AsyncWrite> Sink<CarBlock> for CarWriter<W> {
    type Error = io::Error;

    fn poll_ready(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        let mut this = self.as_mut().project();

        while !this.buffer.is_empty() {
            this = self.as_mut().project();
            let bytes_written = ready!(this.inner.poll_write(cx, this.buffer))?;
            this.buffer.advance(bytes_written);
        }
        Poll::Ready(Ok(()))
    }

    fn start_send(self: Pin<&mut Self>, item: CarBlock) -> Result<(), Self::Error> {
        item.write(&mut self.project().buffer.writer())
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        ready!(self.as_mut().poll_ready(cx))?;
        self.project().inner.poll_flush(cx)
    }

    fn poll_close(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        ready!(self.as_mut().poll_ready(cx))?;
        self.project().inner.poll_shutdown(cx)
    }
}

/// The blocks covered by `bx`, in first-seen depth-first order from its
/// roots, pruned by the box's link filter. Within one box a block appears
/// once, however many paths lead to it.
pub fn box_blocks<BS: Blockstore>(
    dag: &DagService<BS>,
    bx: &DagBox,
) -> Result<Vec<CarBlock>, Error> {
    let mut seen = CidHashSet::default();
    let mut out = Vec::new();
    let mut stack: Vec<Cid> = bx.roots.iter().rev().copied().collect();

    while let Some(cid) = stack.pop() {
        if !seen.insert(cid) {
            continue;
        }
        let data = dag.block_bytes(&cid)?;
        let node = DagNode::decode(&cid, &data)?;
        let internal: Vec<Cid> = bx.internal_links(node.links()).map(|l| l.cid).collect();
        for cid in internal.into_iter().rev() {
            stack.push(cid);
        }
        out.push(CarBlock { cid, data });
    }

    Ok(out)
}

/// Writes the CAR file for one box into `writer`.
pub async fn write_box_car<BS: Blockstore, W: AsyncWrite + Unpin>(
    dag: &DagService<BS>,
    bx: &DagBox,
    writer: W,
) -> Result<(), Error> {
    let roots = NonEmpty::new(bx.roots.clone())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "box has no roots"))?;
    let blocks = box_blocks(dag, bx)?;

    let sink = CarWriter::new_carv1(roots, writer)?;
    futures::stream::iter(blocks.into_iter().map(io::Result::Ok))
        .forward(sink)
        .await?;
    Ok(())
}

/// The CAR file for one box, buffered in memory. Boxes are budget-bounded,
/// so the buffer is too (modulo the single-oversize-node exception).
pub async fn box_car_bytes<BS: Blockstore>(
    dag: &DagService<BS>,
    bx: &DagBox,
) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();
    write_box_car(dag, bx, &mut out).await?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::splitter::{split, CancelToken, SplitConfig};
    use crate::store::CarBackedStore;
    use crate::test_utils::{covered_cids, dir_node, file_node, raw_leaf};
    use crate::unixfs::DAG_PB;
    use fvm_ipld_blockstore::{Blockstore as _, MemoryBlockstore};
    use fvm_ipld_encoding::IPLD_RAW;
    use futures::executor::block_on;
    use itertools::Itertools as _;
    use pretty_assertions::assert_eq;
    use quickcheck::{Arbitrary, Gen};
    use std::io::Cursor;

    impl Arbitrary for CarBlock {
        fn arbitrary(g: &mut Gen) -> CarBlock {
            let data = Vec::<u8>::arbitrary(g);
            let codec = g.choose(&[IPLD_RAW, DAG_PB]).unwrap();
            let cid = Cid::new_v1(*codec, Code::Sha2_256.digest(&data));
            CarBlock { cid, data }
        }
    }

    #[quickcheck_macros::quickcheck]
    fn car_blocks_roundtrip_through_a_car_file(blocks: Vec<CarBlock>) {
        let blocks: Vec<CarBlock> = blocks.into_iter().unique().collect();
        if blocks.is_empty() {
            return;
        }
        for block in &blocks {
            assert!(block.valid());
        }

        let mut car = Vec::new();
        block_on(async {
            let roots = NonEmpty::new(vec![blocks[0].cid]).unwrap();
            let sink = CarWriter::new_carv1(roots, &mut car).unwrap();
            futures::stream::iter(blocks.clone().into_iter().map(io::Result::Ok))
                .forward(sink)
                .await
                .unwrap();
        });

        let store = CarBackedStore::new(Cursor::new(car)).unwrap();
        assert_eq!(store.len(), blocks.len());
        for block in &blocks {
            assert_eq!(store.get(&block.cid).unwrap(), Some(block.data.clone()));
        }
    }

    #[test]
    fn corrupted_block_fails_validation() {
        let data = b"payload".to_vec();
        let cid = Cid::new_v1(IPLD_RAW, Code::Sha2_256.digest(&data));
        assert!(CarBlock { cid, data: b"tampered".to_vec() }.validate().is_err());
    }

    #[test]
    fn box_blocks_dedups_diamond_paths() {
        let store = MemoryBlockstore::new();
        let shared = raw_leaf(&store, 50, 0x01);
        let a = file_node(&store, &[&shared], 3);
        let b = file_node(&store, &[&shared], 4);
        let root = dir_node(&store, &[&a, &b]);

        let dag = DagService::new(&store);
        let bx = DagBox {
            roots: vec![root.cid],
            external: vec![],
        };
        let cids: Vec<Cid> = box_blocks(&dag, &bx).unwrap().iter().map(|b| b.cid).collect();
        // Depth-first, first-seen order; the shared leaf appears once.
        assert_eq!(cids, vec![root.cid, a.cid, shared.cid, b.cid]);
    }

    #[test]
    fn box_blocks_prunes_at_external_entries() {
        let store = MemoryBlockstore::new();
        let deep = raw_leaf(&store, 40, 0x11);
        let kept = raw_leaf(&store, 40, 0x12);
        let cut = file_node(&store, &[&deep], 5);
        let root = dir_node(&store, &[&kept, &cut]);

        let dag = DagService::new(&store);
        let bx = DagBox {
            roots: vec![root.cid],
            external: vec![cut.cid],
        };
        let cids: Vec<Cid> = box_blocks(&dag, &bx).unwrap().iter().map(|b| b.cid).collect();
        assert_eq!(cids, vec![root.cid, kept.cid]);
    }

    /// End to end: split a DAG, emit each box as CAR bytes, read them all
    /// back, and check the union of the archives is exactly the DAG.
    #[tokio::test]
    async fn emitted_archives_reassemble_the_dag() {
        let store = MemoryBlockstore::new();
        let leaves: Vec<_> = (0..6u8)
            .map(|i| raw_leaf(&store, 400, 0x20 + i))
            .collect();
        let pairs: Vec<_> = leaves
            .chunks(2)
            .map(|pair| file_node(&store, &[&pair[0], &pair[1]], 16))
            .collect();
        let root = dir_node(&store, &[&pairs[0], &pairs[1], &pairs[2]]);

        let dag = DagService::new(&store);
        let boxes = split(
            &dag,
            &SplitConfig::new(1024),
            root.cid,
            &CancelToken::default(),
        )
        .unwrap();
        assert!(boxes.len() > 1);

        let reassembled = MemoryBlockstore::new();
        for bx in &boxes {
            let bytes = box_car_bytes(&dag, bx).await.unwrap();
            let archive = CarBackedStore::new(Cursor::new(bytes)).unwrap();
            assert_eq!(archive.roots(), bx.roots);
            for cid in covered_cids(&dag, &bx.roots, &bx.external) {
                let data = archive.get(&cid).unwrap().expect("covered block in archive");
                reassembled.put_keyed(&cid, &data).unwrap();
            }
        }

        for cid in covered_cids(&dag, &[root.cid], &[]) {
            assert_eq!(
                reassembled.get(&cid).unwrap(),
                store.get(&cid).unwrap(),
                "block {cid} missing or different after reassembly",
            );
        }
    }

    #[test]
    fn empty_box_cannot_be_emitted() {
        let store = MemoryBlockstore::new();
        let dag = DagService::new(&store);
        let bx = DagBox::default();
        assert!(block_on(box_car_bytes(&dag, &bx)).is_err());
    }
}
