// src/scheduler/mod.rs
//
// Collection runs: the structures of a folder are split into load-balanced
// batches and every batch is analysed by its own worker process.

pub mod batches;
pub mod collection;
pub mod load_balance;
pub mod worker;

pub use batches::make_batches;
pub use collection::{Collection, CollectionStatus};
pub use load_balance::LoadBalanceIndex;
pub use worker::{RunReport, WorkerPool};

use crate::config::AnalysisConfig;
use crate::error::OmsResult;
use std::fs;
use std::path::Path;

/// Options of one collection run
#[derive(Clone, Debug)]
pub struct RunOptions {
    pub num_batches: usize,
    pub max_size: Option<usize>,
    pub overwrite: bool,
    pub redo_balance: bool,
}

/// Balances `collection` into batches and runs them on `pool`.
pub fn run_collection(
    collection: &Collection,
    output: &Path,
    options: &RunOptions,
    config: &AnalysisConfig,
    pool: &WorkerPool,
) -> OmsResult<RunReport> {
    fs::create_dir_all(output)?;

    let mut index = LoadBalanceIndex::load(output, options.redo_balance);
    let added = index.validate(&collection.entries);
    if added > 0 || options.redo_balance {
        index.save(output)?;
    }

    let batches = make_batches(&collection.entries, &index, options.num_batches, options.max_size)?;
    pool.run(&batches, output, options.overwrite, config)
}
