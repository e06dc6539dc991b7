pub mod stock;
pub mod report;

pub use stock::*;
pub use report::*;
