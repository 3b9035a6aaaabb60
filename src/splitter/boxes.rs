// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::unixfs::DagLink;
use cid::Cid;
use fvm_shared::commcid::{FIL_COMMITMENT_SEALED, FIL_COMMITMENT_UNSEALED};

/// A partial DAG packaged for emission as one archive.
///
/// The partial DAGs are delimited by `roots`; sub-DAGs excluded from them
/// have their root CIDs recorded in `external`. Which external entry trims
/// which root is not tracked, so obtaining the partial DAGs means walking
/// each root and pruning wherever a link is contained in `external`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DagBox {
    /// Roots of the partial DAGs contained in this box, in packing order.
    pub roots: Vec<Cid>,
    /// Roots of the sub-DAGs excluded from this box. Each lives in a box
    /// sealed after this one.
    pub external: Vec<Cid>,
}

impl DagBox {
    /// Membership is by CID byte equality. Boxes being packed are small and
    /// hot in cache, so a linear scan beats anything fancier here.
    pub fn is_external(&self, cid: &Cid) -> bool {
        self.external.iter().any(|external| external == cid)
    }

    /// The subset of `links` an archive writer may follow inside this box,
    /// in their original order: links into other boxes are dropped, as are
    /// sector commitment CIDs, which address enormous out-of-band data and
    /// must never be walked.
    pub fn internal_links<'a>(
        &'a self,
        links: impl IntoIterator<Item = &'a DagLink>,
    ) -> impl Iterator<Item = &'a DagLink> {
        links
            .into_iter()
            .filter(move |link| !self.is_external(&link.cid) && !is_opaque_codec(link.cid.codec()))
    }
}

fn is_opaque_codec(codec: u64) -> bool {
    codec == FIL_COMMITMENT_SEALED || codec == FIL_COMMITMENT_UNSEALED
}

/// Builds the sequence of boxes for one split.
///
/// Only the last box is ever open for packing; once [`BoxPacker::new_box`]
/// is called the previous box is sealed and never touched again. The
/// used-size counter therefore only needs to exist for the open box.
#[derive(Debug)]
pub struct BoxPacker {
    boxes: Vec<DagBox>,
    used: u64,
    box_max_size: u64,
}

impl BoxPacker {
    /// Starts with a single empty open box.
    pub fn new(box_max_size: u64) -> Self {
        Self {
            boxes: vec![DagBox::default()],
            used: 0,
            box_max_size,
        }
    }

    /// Index of the box currently being packed, by definition the last one.
    pub fn current_id(&self) -> usize {
        self.boxes.len() - 1
    }

    pub fn current(&self) -> &DagBox {
        &self.boxes[self.boxes.len() - 1]
    }

    fn current_mut(&mut self) -> &mut DagBox {
        let last = self.boxes.len() - 1;
        &mut self.boxes[last]
    }

    /// Bytes consumed in the current box.
    pub fn used(&self) -> u64 {
        self.used
    }

    /// Remaining budget of the current box. Signed: a node bigger than the
    /// whole budget may be packed into an empty box, after which this goes
    /// negative. Saturates instead of wrapping on pathological sizes.
    pub fn remaining(&self) -> i64 {
        let max = i64::try_from(self.box_max_size).unwrap_or(i64::MAX);
        let used = i64::try_from(self.used).unwrap_or(i64::MAX);
        max.saturating_sub(used)
    }

    /// Whether `size` more bytes fit in the current box.
    pub fn fits(&self, size: u64) -> bool {
        i64::try_from(size).is_ok_and(|size| size <= self.remaining())
    }

    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    pub fn add_size(&mut self, size: u64) {
        self.used = self.used.saturating_add(size);
    }

    pub fn pack_root(&mut self, cid: Cid) {
        self.current_mut().roots.push(cid);
    }

    pub fn add_external(&mut self, cid: Cid) {
        self.current_mut().external.push(cid);
    }

    /// Seals the current box and opens a fresh empty one.
    pub fn new_box(&mut self) {
        self.boxes.push(DagBox::default());
        self.used = 0;
    }

    pub fn into_boxes(self) -> Vec<DagBox> {
        self.boxes
    }
}
