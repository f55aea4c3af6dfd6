//! Result aggregation
//!
//! Protocols fill raw [`MetricTable`]s; [`ProtocolSummary`] reduces them and
//! [`ComparisonTable`] stacks the summaries of several configurations for
//! the Markdown/JSON report and the bar-chart figures.

pub mod aggregate;
pub mod plot;
pub mod table;

pub use aggregate::{
    round_metric, Comparison, ComparisonRow, ComparisonTable, ProtocolSummary, Stat,
    COMPARISON_DECIMALS, MAX_SOURCE_COLUMNS,
};
pub use plot::render_comparison;
pub use table::{MetricTable, WEIGHTING_MODES};
