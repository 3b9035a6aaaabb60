// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! The DAG splitting algorithm.
//!
//! [`split`] walks a DAG depth-first from one root and decides, node by
//! node, where to cut it into partial sub-DAGs that respect the box budget:
//!
//! - a sub-DAG whose declared total size fits the open box is committed
//!   whole and the walk prunes there;
//! - a sub-DAG too big to fit is split at its top node when it is worth
//!   splitting, committing just that node and descending into its children;
//! - otherwise the sub-DAG is deferred: its root is recorded as external to
//!   the open box and queued to head a later box.
//!
//! Cuts happen at the highest point that fails to fit, which keeps the
//! external lists and the box count small.

mod boxes;
mod walker;

pub use boxes::{BoxPacker, DagBox};

use crate::error::Error;
use crate::store::DagService;
use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Packing order. Only depth-first is implemented; breadth-first is a
/// reserved knob that [`SplitConfig::validate`] rejects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TraversalOrder {
    #[default]
    DepthFirst,
    BreadthFirst,
}

#[derive(Clone, Debug)]
pub struct SplitConfig {
    /// Hard byte ceiling for each box. A single node larger than this still
    /// gets packed, alone, into its own over-budget box.
    pub box_max_size: u64,
    /// Sub-DAGs at most this big are never split, only packed whole or
    /// deferred. Trades packing density for fewer cuts.
    pub min_subgraph_size: u64,
    pub traversal_order: TraversalOrder,
}

impl SplitConfig {
    pub fn new(box_max_size: u64) -> Self {
        Self {
            box_max_size,
            min_subgraph_size: 0,
            traversal_order: TraversalOrder::DepthFirst,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.box_max_size == 0 {
            return Err(Error::InvalidConfiguration(
                "box max size must be positive".to_string(),
            ));
        }
        if self.traversal_order == TraversalOrder::BreadthFirst {
            return Err(Error::InvalidConfiguration(
                "breadth-first pack not implemented yet".to_string(),
            ));
        }
        Ok(())
    }
}

/// Cooperative cancellation flag for a running split, checked before every
/// block fetch.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Packs the DAG rooted at `initial_root` into boxes.
///
/// Returns the sealed box sequence in creation order. On any failure,
/// cancellation included, no boxes are returned: a partial sequence would
/// not cover the DAG and is useless to a caller.
pub fn split<BS: Blockstore>(
    dag: &DagService<BS>,
    config: &SplitConfig,
    initial_root: Cid,
    cancel: &CancelToken,
) -> Result<Vec<DagBox>, Error> {
    config.validate()?;

    let mut packer = BoxPacker::new(config.box_max_size);
    walker::Walker {
        dag,
        packer: &mut packer,
        min_subgraph_size: config.min_subgraph_size,
        cancel,
        queue: Vec::new(),
    }
    .run(initial_root)?;

    Ok(packer.into_boxes())
}
