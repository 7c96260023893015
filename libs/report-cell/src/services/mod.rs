pub mod aggregator;

pub use aggregator::ReportAggregator;
