// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use ahash::HashSet;
use cid::{Cid, Version};
use multihash_codetable::Code;

const SHA2_256_SIZE: usize = 32;

// A CID occupies 96 bytes in memory: version, codec, hash code, digest
// length, and a 64-byte pre-allocated digest buffer. Nearly all CIDs in a
// UnixFS DAG are V1 with a 32-byte SHA2-256 digest, so the vast majority can
// be stored as (codec, digest) pairs in less than half the space.
#[derive(Debug, Default)]
pub struct CidHashSet {
    v1_sha256: HashSet<(u64, [u8; SHA2_256_SIZE])>,
    fallback: HashSet<Cid>,
}

impl CidHashSet {
    /// Adds a CID to the set. Returns whether it was absent before.
    pub fn insert(&mut self, cid: Cid) -> bool {
        match as_v1_sha256(&cid) {
            Some(key) => self.v1_sha256.insert(key),
            None => self.fallback.insert(cid),
        }
    }

    pub fn len(&self) -> usize {
        self.v1_sha256.len() + self.fallback.len()
    }

    pub fn is_empty(&self) -> bool {
        self.v1_sha256.is_empty() && self.fallback.is_empty()
    }
}

fn as_v1_sha256(cid: &Cid) -> Option<(u64, [u8; SHA2_256_SIZE])> {
    if cid.version() != Version::V1 || cid.hash().code() != u64::from(Code::Sha2_256) {
        return None;
    }
    let digest = cid.hash().digest().try_into().ok()?;
    Some((cid.codec(), digest))
}
