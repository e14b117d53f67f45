//! Dataset analysis engine
//!
//! Loads the tabular advertising export (CSV), normalises dates, sorts
//! ascending by date and exposes the aggregate views the data stage needs:
//! a one-shot summary, low-CTR filtering, a daily timeline and grouped
//! performance by dimension.
//!
//! Ratios are always recomputed from summed counts for grouped views, and a
//! zero denominator yields 0.0 rather than NaN.

mod analysis;
mod engine;
mod record;
mod summary;

pub use analysis::{AnalysisBundle, AnalysisKind, LowCtrCampaign, LOW_CTR_ROWS, TIMELINE_ENTRIES};
pub use engine::{DatasetEngine, DatasetError, DatasetResult, LoadOptions};
pub use record::{ratio, DatasetRecord};
pub use summary::{
    DateRange, DatasetSummary, Dimension, GroupPerformance, PerformanceMetrics, TimelinePoint,
};
