// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{BoxPacker, CancelToken};
use crate::cid_collections::CidHashSet;
use crate::error::Error;
use crate::store::DagService;
use crate::unixfs::DagLink;
use bytesize::ByteSize;
use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use tracing::{debug, info};

/// Drives the depth-first split of one DAG into boxes.
///
/// `queue` holds the roots that still need to be scanned and boxed: sub-DAGs
/// that did not fit where they were encountered and must head a later box.
/// It is LIFO (with node links pushed in reverse), which keeps leaves of one
/// sub-DAG together better than FIFO would.
pub(super) struct Walker<'a, BS> {
    pub dag: &'a DagService<BS>,
    pub packer: &'a mut BoxPacker,
    pub min_subgraph_size: u64,
    pub cancel: &'a CancelToken,
    pub queue: Vec<Cid>,
}

impl<BS: Blockstore> Walker<'_, BS> {
    pub(super) fn run(mut self, initial_root: Cid) -> Result<(), Error> {
        self.queue.push(initial_root);

        while let Some(root) = self.queue.pop() {
            let mark = self.queue.len();
            self.walk_dag(root)?;
            if self.queue.len() > mark {
                // The walk deferred sub-DAG roots, so they need a new box.
                self.packer.new_box();
                info!(box_id = self.packer.current_id(), "creating new box");
            }
        }

        Ok(())
    }

    /// Depth-first walk from `root`, deciding per node whether its sub-DAG
    /// is packed whole, split, or deferred. Links are pushed in reverse so
    /// the first link is visited first. Within one walk a CID is visited at
    /// most once; a later walk from another root may see it again.
    fn walk_dag(&mut self, root: Cid) -> Result<(), Error> {
        let mut visited = CidHashSet::default();
        let mut stack = vec![root];

        while let Some(cid) = stack.pop() {
            if !visited.insert(cid) {
                continue;
            }
            if let Some(links) = self.visit(cid, root)? {
                for link in links.iter().rev() {
                    stack.push(link.cid);
                }
            }
        }

        Ok(())
    }

    /// The per-node decision. Returns the node's links when the walk should
    /// descend into them, `None` when the sub-DAG is fully accounted for
    /// (packed whole, or deferred to a later box).
    fn visit(&mut self, cid: Cid, root: Cid) -> Result<Option<Vec<DagLink>>, Error> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let node = self.dag.get(&cid)?;
        let tree_size = node.tree_size()?;
        debug!(
            box_id = self.packer.current_id(),
            used = %ByteSize(self.packer.used()),
            %cid,
            tree_size = %ByteSize(tree_size),
            "checking node"
        );

        if self.packer.fits(tree_size) {
            // The entire sub-DAG fits: account for it all at once and prune
            // the walk. Only the top node is packed as a root; its children
            // are implicit in the DAG.
            self.packer.add_size(tree_size);
            if cid == root {
                self.packer.pack_root(cid);
            }
            debug!(box_id = self.packer.current_id(), "added entire sub-DAG to box");
            return Ok(None);
        }

        // Too big for the current box. Split off the parent node and inspect
        // the child sub-DAGs separately, unless the sub-DAG is too small to
        // be worth cutting. An empty box overrides the threshold: deferring
        // from an empty box would just re-encounter the same sub-DAG in the
        // next box and never terminate.
        if tree_size > self.min_subgraph_size || self.packer.is_empty() {
            let node_size = node.size();

            if self.packer.fits(node_size) || self.packer.is_empty() {
                // A node that doesn't fit anywhere still goes into an empty
                // box: it fits in no box, so it gets its own oversized one.
                self.packer.add_size(node_size);
                if cid == root {
                    self.packer.pack_root(cid);
                }
                debug!(
                    box_id = self.packer.current_id(),
                    node_size = %ByteSize(node_size),
                    "added node to box, descending into children"
                );
                return Ok(Some(node.into_links()));
            }
            debug!(
                node_size = %ByteSize(node_size),
                "node too big, adding as root for another box"
            );
        } else {
            debug!(
                tree_size = %ByteSize(tree_size),
                "sub-DAG below split threshold, adding as root for another box"
            );
        }

        // Process this node as the root of a later box.
        self.queue.push(cid);
        self.packer.add_external(cid);
        Ok(None)
    }
}
