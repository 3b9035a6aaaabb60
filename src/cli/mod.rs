// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::car;
use crate::splitter::{self, CancelToken, SplitConfig, TraversalOrder};
use crate::store::{CarBackedStore, CountingStore, DagService};
use crate::utils::parse_byte_size;
use anyhow::Context as _;
use bytesize::ByteSize;
use cid::Cid;
use std::path::PathBuf;
use tracing::info;

/// Command-line options for the `dagsplit` binary.
#[derive(Debug, clap::Parser)]
#[command(name = env!("CARGO_PKG_NAME"), version, about = env!("CARGO_PKG_DESCRIPTION"))]
pub struct Cli {
    /// Root CID of the DAG to pack
    pub root: Cid,
    /// Maximum size of each generated CAR file, e.g. `1M` (suffixes are
    /// powers of 1024)
    #[arg(value_parser = parse_byte_size)]
    pub max_size: u64,
    /// CARv1 file to read the DAG's blocks from
    #[arg(long)]
    pub store: PathBuf,
    /// Directory to write the CAR files into
    #[arg(long, default_value = "dagsplitter-car-files")]
    pub output_dir: PathBuf,
    /// Minimum size of graph chunks to bother packing into boxes, in bytes
    #[arg(long, default_value_t = 0)]
    pub min_subgraph_size: u64,
    /// Pack in breadth-first order instead of the default depth-first
    #[arg(long)]
    pub breadth_first: bool,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = SplitConfig {
        box_max_size: cli.max_size,
        min_subgraph_size: cli.min_subgraph_size,
        traversal_order: if cli.breadth_first {
            TraversalOrder::BreadthFirst
        } else {
            TraversalOrder::DepthFirst
        },
    };
    // Fail on configuration before touching the store.
    config.validate()?;

    let file = std::fs::File::open(&cli.store)
        .with_context(|| format!("opening block store {}", cli.store.display()))?;
    let store = CountingStore::new(
        CarBackedStore::new(file)
            .with_context(|| format!("indexing block store {}", cli.store.display()))?,
    );
    let dag = DagService::new(store);

    let cancel = CancelToken::default();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let boxes = splitter::split(&dag, &config, cli.root, &cancel)?;

    let (gets, checks) = dag.store().stats();
    info!(gets, has = checks, "block store access stats");

    std::fs::create_dir_all(&cli.output_dir)
        .with_context(|| format!("creating directory {}", cli.output_dir.display()))?;
    info!(
        dir = %cli.output_dir.display(),
        boxes = boxes.len(),
        "writing CAR files"
    );

    let id_width = box_id_width(boxes.len());
    for (id, bx) in boxes.iter().enumerate() {
        let bytes = car::box_car_bytes(&dag, bx).await?;
        let filename = format!("box-{}-{:0id_width$}.car", cli.root, id);
        tokio::fs::write(cli.output_dir.join(&filename), &bytes)
            .await
            .with_context(|| format!("writing {filename}"))?;
        info!(size = %ByteSize(bytes.len() as u64), "{filename}");
    }

    Ok(())
}

/// Width of the zero-padded box index in output file names: the decimal
/// digit count of the box count, so a 10-box split yields `00` through `09`.
fn box_id_width(box_count: usize) -> usize {
    box_count.to_string().len()
}
