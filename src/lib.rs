//! histboost: histogram-based gradient boosted decision trees.
//!
//! Trees are fit by second-order (Newton) optimization of a squared
//! error or logistic objective over quantile-binned features, with
//! per-node gradient/hessian histograms driving split finding.
//!
//! # Key Types
//!
//! - [`GBDT`] - the ensemble: train / predict / cv / save / load
//! - [`GBDTConfig`] / [`Task`] - validated training parameters
//! - [`DataMatrix`] - dense row-major features, labels, and bins
//! - [`Metric`] - evaluation metrics with a by-name resolver
//!
//! # Training
//!
//! ```ignore
//! use histboost::{DataMatrix, GBDT, GBDTConfig, Task};
//!
//! let data = DataMatrix::from_csv("train.csv", 0)?;
//! let mut model = GBDT::new(GBDTConfig::for_task(Task::Regression))?;
//! model.train(&data)?;
//! model.save_model("model.json")?;
//! ```
//!
//! Models round-trip through a native JSON shape and an
//! XGBoost-compatible shape; see the [`io`] module.

pub mod config;
pub mod data;
pub mod error;
pub mod gbdt;
pub mod io;
pub mod kernels;
pub mod logger;
pub mod metrics;
pub mod tree;
pub mod utils;

pub use config::{GBDTConfig, Task};
pub use data::{BinInfo, DataMatrix, MISSING_VALUE};
pub use error::{BoostError, Result};
pub use gbdt::GBDT;
pub use logger::Verbosity;
pub use metrics::Metric;
pub use tree::{SplitInfo, Tree, TreeNode};
pub use utils::run_with_threads;
