//! Built-in patch drivers.

mod counter;
mod stamper;

pub use counter::Counter;
pub use stamper::Stamper;
