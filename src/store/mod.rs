// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Block fetching for the splitter: a thin decoding layer over any
//! [`Blockstore`], plus the stores the CLI composes under it.

mod car_backed;

pub use car_backed::CarBackedStore;

use crate::error::Error;
use crate::unixfs::{DagLink, DagNode};
use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use std::sync::atomic::{AtomicU64, Ordering};

/// Fetches and decodes nodes of a DAG out of a block store.
///
/// The store is read-only from the splitter's perspective; blocks may be
/// fetched more than once within a single split and no cache is kept here
/// beyond whatever the store provides.
pub struct DagService<BS> {
    store: BS,
}

impl<BS: Blockstore> DagService<BS> {
    pub fn new(store: BS) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &BS {
        &self.store
    }

    /// Raw bytes of the block addressed by `cid`. A missing block is an
    /// error: the traversal cannot proceed without it.
    pub fn block_bytes(&self, cid: &Cid) -> Result<Vec<u8>, Error> {
        self.store
            .get(cid)
            .map_err(|error| Error::BlockFetch { cid: *cid, error })?
            .ok_or(Error::BlockNotFound { cid: *cid })
    }

    /// Fetches and decodes the node addressed by `cid`.
    pub fn get(&self, cid: &Cid) -> Result<DagNode, Error> {
        DagNode::decode(cid, &self.block_bytes(cid)?)
    }

    /// The outgoing links of the node addressed by `cid`.
    pub fn links(&self, cid: &Cid) -> Result<Vec<DagLink>, Error> {
        Ok(self.get(cid)?.into_links())
    }
}

/// Forwarding wrapper that counts block store accesses.
///
/// The counters are informational (the CLI reports them after a split) and
/// are never consulted by the splitter itself.
pub struct CountingStore<BS> {
    inner: BS,
    gets: AtomicU64,
    checks: AtomicU64,
}

impl<BS> CountingStore<BS> {
    pub fn new(inner: BS) -> Self {
        Self {
            inner,
            gets: AtomicU64::new(0),
            checks: AtomicU64::new(0),
        }
    }

    /// (`get` calls, `has` calls) observed so far.
    pub fn stats(&self) -> (u64, u64) {
        (
            self.gets.load(Ordering::Relaxed),
            self.checks.load(Ordering::Relaxed),
        )
    }
}

impl<BS: Blockstore> Blockstore for CountingStore<BS> {
    fn get(&self, k: &Cid) -> anyhow::Result<Option<Vec<u8>>> {
        self.gets.fetch_add(1, Ordering::Relaxed);
        self.inner.get(k)
    }

    fn has(&self, k: &Cid) -> anyhow::Result<bool> {
        self.checks.fetch_add(1, Ordering::Relaxed);
        self.inner.has(k)
    }

    fn put_keyed(&self, k: &Cid, block: &[u8]) -> anyhow::Result<()> {
        self.inner.put_keyed(k, block)
    }
}
