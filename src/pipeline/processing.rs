//! Processing pipeline

use crate::error::Result;
use crate::processing::{drop_null_data, load_and_truncate_data, ProcessingParams};
use super::{run_node, Catalog};
use polars::prelude::*;

/// Nodes in execution order
pub const PROCESSING_NODES: [&str; 4] = [
    "load_raw_data",
    "load_and_truncate_data",
    "drop_null_data",
    "save_processed_data",
];

/// raw CSV -> truncate and snapshot -> drop nulls -> processed CSV
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessingPipeline;

impl ProcessingPipeline {
    pub fn new() -> Self {
        Self
    }

    /// Run every node and return the processed table
    pub fn run(&self, catalog: &Catalog, params: &ProcessingParams) -> Result<DataFrame> {
        let raw = run_node(PROCESSING_NODES[0], || catalog.raw.load())?;
        self.run_on(catalog, raw, params)
    }

    /// Run on an already loaded raw table
    pub fn run_on(
        &self,
        catalog: &Catalog,
        raw: DataFrame,
        params: &ProcessingParams,
    ) -> Result<DataFrame> {
        let truncated = run_node(PROCESSING_NODES[1], || {
            load_and_truncate_data(raw, params, &catalog.intermediate)
        })?;
        let mut processed = run_node(PROCESSING_NODES[2], || drop_null_data(truncated))?;
        run_node(PROCESSING_NODES[3], || catalog.processed.save(&mut processed))?;
        Ok(processed)
    }
}
