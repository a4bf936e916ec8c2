// Domain models

mod interface;
mod resolution;
mod traffic;

pub use interface::{InfoEntry, Interface, InterfaceId};
pub use resolution::Resolution;
pub use traffic::{Bucket, TrafficSample};
