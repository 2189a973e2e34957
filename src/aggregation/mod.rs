mod aggregator;

pub use aggregator::IntervalAggregator;
