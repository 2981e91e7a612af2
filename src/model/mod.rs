pub mod period;
pub mod series;
pub mod signal;
pub mod time_point;

pub use period::{Period, DAY_MS};
pub use series::Series;
pub use signal::Signal;
pub use time_point::TimePoint;
