pub mod aggregate;
pub mod forecast;

pub use aggregate::{resample, Interval};
pub use forecast::forecast;
