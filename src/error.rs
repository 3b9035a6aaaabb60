// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use thiserror::Error;

/// Failures surfaced while splitting a DAG into boxes or emitting them.
///
/// All of these are fatal for the traversal that raised them: the splitter
/// has no retry behavior, and boxes built before the failure are discarded
/// by the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// The block store failed while fetching a block.
    #[error("getting block {cid}: {error}")]
    BlockFetch { cid: Cid, error: anyhow::Error },
    /// The block store has no block for this CID.
    #[error("block {cid} not found in block store")]
    BlockNotFound { cid: Cid },
    /// The block's bytes are not a valid node of its declared codec.
    #[error("decoding node {cid}: {reason}")]
    NodeDecode { cid: Cid, reason: String },
    /// A UnixFS kind the size oracle does not handle.
    #[error("{kind} node support not implemented")]
    UnsupportedKind { kind: &'static str },
    /// A UnixFS type value outside the known enumeration.
    #[error("unrecognized unixfs node type {value}")]
    UnrecognizedKind { value: i32 },
    /// A node codec that is neither raw nor dag-pb.
    #[error("unknown node codec {codec:#x}")]
    UnknownCodec { codec: u64 },
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// Caller-initiated termination; partial output must be discarded.
    #[error("traversal cancelled")]
    Cancelled,
    #[error("writing archive: {0}")]
    ArchiveWrite(#[from] std::io::Error),
}
