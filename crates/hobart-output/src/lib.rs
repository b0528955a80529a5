#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod drift;
pub mod export;
pub mod report;

pub use drift::{DriftError, Stability, population_stability_index};
pub use export::{ExportError, ExportFormat, decisions_to_string, export_decisions};
pub use report::DecisionReport;
