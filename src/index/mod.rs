pub mod inverted;
pub mod results;
pub mod shared;
