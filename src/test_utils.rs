// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Builders for small UnixFS DAGs used across the test suite.

use crate::cid_collections::CidHashSet;
use crate::store::DagService;
use crate::unixfs::proto::{self, DataType};
use crate::unixfs::DAG_PB;
use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::IPLD_RAW;
use multihash_codetable::{Code, MultihashDigest};
use prost::Message as _;

/// A block put into a test store, with the sizes the splitter will see for
/// it. `tree_size` carries the cumulative size a parent link declares.
#[derive(Clone, Debug)]
pub struct NodeInfo {
    pub cid: Cid,
    pub node_size: u64,
    pub tree_size: u64,
}

/// Puts a raw leaf of `len` bytes filled with `fill`. Distinct fills keep
/// distinct blocks from collapsing into one CID.
pub fn raw_leaf(store: &impl Blockstore, len: usize, fill: u8) -> NodeInfo {
    let data = vec![fill; len];
    let cid = Cid::new_v1(IPLD_RAW, Code::Sha2_256.digest(&data));
    store.put_keyed(&cid, &data).unwrap();
    NodeInfo {
        cid,
        node_size: data.len() as u64,
        tree_size: data.len() as u64,
    }
}

/// Puts a dag-pb node of the given UnixFS kind linking to `children`, with
/// `data_len` payload bytes in the envelope.
pub fn unixfs_node(
    store: &impl Blockstore,
    kind: DataType,
    children: &[&NodeInfo],
    data_len: usize,
) -> NodeInfo {
    let envelope = proto::Data {
        r#type: kind as i32,
        data: (data_len > 0).then(|| vec![0x5a; data_len]),
        filesize: (kind == DataType::File).then(|| {
            data_len as u64 + children.iter().map(|c| c.tree_size).sum::<u64>()
        }),
        blocksizes: vec![],
        hash_type: None,
        fanout: None,
    };
    let node = proto::PbNode {
        links: children
            .iter()
            .enumerate()
            .map(|(i, child)| proto::PbLink {
                hash: Some(child.cid.to_bytes()),
                name: Some(i.to_string()),
                tsize: Some(child.tree_size),
            })
            .collect(),
        data: Some(envelope.encode_to_vec()),
    };
    let bytes = node.encode_to_vec();
    let cid = Cid::new_v1(DAG_PB, Code::Sha2_256.digest(&bytes));
    store.put_keyed(&cid, &bytes).unwrap();

    let node_size = bytes.len() as u64;
    NodeInfo {
        cid,
        node_size,
        tree_size: node_size + children.iter().map(|c| c.tree_size).sum::<u64>(),
    }
}

pub fn file_node(store: &impl Blockstore, children: &[&NodeInfo], data_len: usize) -> NodeInfo {
    unixfs_node(store, DataType::File, children, data_len)
}

pub fn dir_node(store: &impl Blockstore, children: &[&NodeInfo]) -> NodeInfo {
    unixfs_node(store, DataType::Directory, children, 0)
}

/// All CIDs reachable from `roots` without crossing an entry of `external`,
/// depth-first, each at most once. Deliberately independent of the CAR
/// emission walk so the two can check each other.
pub fn covered_cids(
    dag: &DagService<impl Blockstore>,
    roots: &[Cid],
    external: &[Cid],
) -> Vec<Cid> {
    let mut seen = CidHashSet::default();
    let mut out = Vec::new();
    let mut stack: Vec<Cid> = roots.iter().rev().copied().collect();

    while let Some(cid) = stack.pop() {
        if external.contains(&cid) || !seen.insert(cid) {
            continue;
        }
        out.push(cid);
        for link in dag.links(&cid).unwrap().iter().rev() {
            stack.push(link.cid);
        }
    }

    out
}
