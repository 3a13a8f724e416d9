//! Dataset adapters
//!
//! Every persisted table in the workflow is a CSV file described by a
//! [`CsvDataset`]; the [`Catalog`](crate::pipeline::Catalog) groups them.

mod csv_dataset;

pub use csv_dataset::{CsvDataset, CsvLoadArgs, CsvSaveArgs, DatasetDescription};
