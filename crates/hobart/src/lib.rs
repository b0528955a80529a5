#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod catalog;
pub mod policy;

pub use catalog::{FeatureCatalog, FeatureInfo, SuperGroup, builtin_catalog};
pub use policy::{Grade, GradePolicy, ScorePolicy};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
