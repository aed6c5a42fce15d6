pub mod buckets;
pub mod dates;
pub mod filter;
pub mod series;

pub use buckets::{AgeBuckets, AgeGroups, Granularity, Period};
pub use dates::{DateField, Week};
pub use filter::Selection;
pub use series::{ChartSeries, Layer};
