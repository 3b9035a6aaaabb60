// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Wire messages for dag-pb and the UnixFS envelope it carries.
//!
//! Schemas follow the canonical `merkledag.proto` and `unixfs.proto`
//! (proto2). Tag numbers and field presence must not change.

/// A dag-pb edge to a child block.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PbLink {
    /// Binary CID of the target block.
    #[prost(bytes = "vec", optional, tag = "1")]
    pub hash: Option<Vec<u8>>,
    /// UTF-8 name of the link, for path resolution.
    #[prost(string, optional, tag = "2")]
    pub name: Option<String>,
    /// Cumulative size of the target's sub-DAG.
    #[prost(uint64, optional, tag = "3")]
    pub tsize: Option<u64>,
}

/// A dag-pb node: links plus an opaque data payload.
///
/// Field order in the wire encoding is links-then-data historically, hence
/// the tag numbering.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PbNode {
    #[prost(message, repeated, tag = "2")]
    pub links: Vec<PbLink>,
    #[prost(bytes = "vec", optional, tag = "1")]
    pub data: Option<Vec<u8>>,
}

/// The UnixFS envelope stored in a [`PbNode`]'s data payload.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Data {
    #[prost(enumeration = "DataType", required, tag = "1")]
    pub r#type: i32,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub data: Option<Vec<u8>>,
    #[prost(uint64, optional, tag = "3")]
    pub filesize: Option<u64>,
    #[prost(uint64, repeated, packed = "false", tag = "4")]
    pub blocksizes: Vec<u64>,
    #[prost(uint64, optional, tag = "5")]
    pub hash_type: Option<u64>,
    #[prost(uint64, optional, tag = "6")]
    pub fanout: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum DataType {
    Raw = 0,
    Directory = 1,
    File = 2,
    Metadata = 3,
    Symlink = 4,
    HamtShard = 5,
}
