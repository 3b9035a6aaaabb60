// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Decoded node model and the size oracle over it.
//!
//! A block is either an IPLD raw leaf (codec `0x55`) or a dag-pb node
//! (codec `0x70`) carrying a UnixFS envelope. Decoding keeps only what the
//! splitter needs (sizes and links) and discards the payload.

pub mod proto;

use crate::error::Error;
use cid::Cid;
use fvm_ipld_encoding::IPLD_RAW;
use prost::Message as _;

/// Multicodec for MerkleDAG protobuf (dag-pb) blocks.
pub const DAG_PB: u64 = 0x70;

/// A named edge from a node to a child block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DagLink {
    pub name: String,
    /// Cumulative byte size of the sub-DAG rooted at [`DagLink::cid`], as
    /// declared by the parent block.
    pub tsize: u64,
    pub cid: Cid,
}

/// UnixFS node kinds. Only the first four are handled by the size oracle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnixFsKind {
    RawLeaf,
    Directory,
    File,
    Metadata,
    Symlink,
    HamtShard,
}

/// A dag-pb node reduced to the splitter's view of it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnixFsNode {
    kind_value: i32,
    encoded_len: u64,
    links: Vec<DagLink>,
}

impl UnixFsNode {
    pub fn kind(&self) -> Result<UnixFsKind, Error> {
        match proto::DataType::try_from(self.kind_value) {
            Ok(proto::DataType::Raw) => Ok(UnixFsKind::RawLeaf),
            Ok(proto::DataType::Directory) => Ok(UnixFsKind::Directory),
            Ok(proto::DataType::File) => Ok(UnixFsKind::File),
            Ok(proto::DataType::Metadata) => Ok(UnixFsKind::Metadata),
            Ok(proto::DataType::Symlink) => Ok(UnixFsKind::Symlink),
            Ok(proto::DataType::HamtShard) => Ok(UnixFsKind::HamtShard),
            Err(_) => Err(Error::UnrecognizedKind {
                value: self.kind_value,
            }),
        }
    }
}

/// The decoded form of a block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DagNode {
    /// Opaque byte payload, no outgoing links.
    Raw { size: u64 },
    UnixFs(UnixFsNode),
}

impl DagNode {
    /// Decodes the bytes of the block addressed by `cid`.
    pub fn decode(cid: &Cid, data: &[u8]) -> Result<DagNode, Error> {
        match cid.codec() {
            IPLD_RAW => Ok(DagNode::Raw {
                size: data.len() as u64,
            }),
            DAG_PB => {
                let node = proto::PbNode::decode(data).map_err(|e| Error::NodeDecode {
                    cid: *cid,
                    reason: e.to_string(),
                })?;
                let envelope_bytes = node.data.as_deref().ok_or_else(|| Error::NodeDecode {
                    cid: *cid,
                    reason: "dag-pb node has no unixfs envelope".to_string(),
                })?;
                let envelope =
                    proto::Data::decode(envelope_bytes).map_err(|e| Error::NodeDecode {
                        cid: *cid,
                        reason: format!("unixfs envelope: {e}"),
                    })?;
                let links = node
                    .links
                    .iter()
                    .map(|link| {
                        let hash = link.hash.as_deref().unwrap_or_default();
                        Ok(DagLink {
                            name: link.name.clone().unwrap_or_default(),
                            tsize: link.tsize.unwrap_or_default(),
                            cid: Cid::try_from(hash).map_err(|e| Error::NodeDecode {
                                cid: *cid,
                                reason: format!("link hash: {e}"),
                            })?,
                        })
                    })
                    .collect::<Result<Vec<_>, Error>>()?;
                Ok(DagNode::UnixFs(UnixFsNode {
                    kind_value: envelope.r#type,
                    encoded_len: data.len() as u64,
                    links,
                }))
            }
            codec => Err(Error::UnknownCodec { codec }),
        }
    }

    /// Encoded byte length of this node alone, ignoring its children.
    ///
    /// This counts block payload bytes only, not the framing the archive
    /// format adds per block; callers accept that approximation.
    pub fn size(&self) -> u64 {
        match self {
            DagNode::Raw { size } => *size,
            DagNode::UnixFs(node) => node.encoded_len,
        }
    }

    /// Total byte size of the sub-DAG rooted at this node.
    ///
    /// O(1): structured nodes declare the cumulative size of each child's
    /// sub-DAG in the link itself, so no traversal happens here.
    pub fn tree_size(&self) -> Result<u64, Error> {
        match self {
            DagNode::Raw { size } => Ok(*size),
            DagNode::UnixFs(node) => match node.kind()? {
                UnixFsKind::RawLeaf
                | UnixFsKind::Directory
                | UnixFsKind::File
                | UnixFsKind::HamtShard => Ok(node
                    .links
                    .iter()
                    .fold(node.encoded_len, |total, link| {
                        total.saturating_add(link.tsize)
                    })),
                UnixFsKind::Metadata => Err(Error::UnsupportedKind { kind: "metadata" }),
                UnixFsKind::Symlink => Err(Error::UnsupportedKind { kind: "symlink" }),
            },
        }
    }

    pub fn links(&self) -> &[DagLink] {
        match self {
            DagNode::Raw { .. } => &[],
            DagNode::UnixFs(node) => &node.links,
        }
    }

    pub fn into_links(self) -> Vec<DagLink> {
        match self {
            DagNode::Raw { .. } => Vec::new(),
            DagNode::UnixFs(node) => node.links,
        }
    }
}
