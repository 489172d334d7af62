//! Analysis modules.
//!
//! Duration parsing, column detection, feature-link resolution,
//! normalization into [`IssueSummary`](crate::models::IssueSummary) values,
//! and the rollup tables computed from them.

pub mod aggregator;
pub mod duration;
pub mod feature_link;
pub mod fields;
pub mod normalizer;

pub use aggregator::{top_contributors, RollupAccumulator};
pub use duration::RawValue;
pub use feature_link::resolve_feature_link;
pub use fields::{detect_fields, CanonicalField, FieldMapping, DEFAULT_EPIC_LINK_FIELD};
pub use normalizer::{normalize_all, Normalized, RawIssueSource, RecordError};
