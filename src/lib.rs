// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! `dagsplit` packs a content-addressed DAG into a series of bounded-size
//! [CARv1](https://ipld.io/specs/transport/car/carv1/) files.
//!
//! Instead of re-chunking nodes (expensive for very large DAGs), the DAG is
//! decomposed into *boxes*: partial DAGs delimited by their roots and an
//! explicit list of excluded sub-DAG roots. Concatenating the knowledge of
//! all boxes reconstructs the original DAG exactly, while each box stays
//! within a configured byte budget. One CAR file is emitted per box.
//!
//! The interesting parts live in [`splitter`]; everything else is plumbing
//! around it (UnixFS node decoding, a CAR-backed blockstore, CAR emission,
//! and the command-line front-end).

pub mod car;
pub mod cid_collections;
pub mod cli;
pub mod error;
pub mod splitter;
pub mod store;
pub mod unixfs;
pub mod utils;

#[cfg(test)]
mod test_utils;
