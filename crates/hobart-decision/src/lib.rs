#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod attribution;
pub mod error;
pub mod risk_type;
pub mod score;

pub use attribution::{AttributionAggregator, AttributionBundle, AttributionItem};
pub use error::{DecisionError, Result};
pub use risk_type::{RiskRuleThresholds, RiskSignals, RiskType, RiskTypeClassifier};
pub use score::{Band, DecisionRecord, ScoreEngine, band_for_score, pd_to_score};
