//! Market data: ticker validation, snapshot model, quote provider, and the aggregator.

pub mod aggregator;
pub mod provider;
pub mod snapshot;
pub mod ticker;

pub use aggregator::*;
pub use provider::*;
pub use snapshot::*;
pub use ticker::*;
