//! Slice extraction - closure over the relation graph, then projection
//!
//! The closure engine walks the declared relations from a set of seeds and
//! returns the frozen set of object keys to include. The projector then
//! turns that set into referentially consistent tables.

pub mod closure;
pub mod projector;
pub mod resolve;
pub mod seeds;
pub mod writer;

pub use closure::{compute_closure, ClosureEngine, ClosureState};
pub use projector::{project, Projection, Projector};
pub use resolve::{Resolution, Resolver};
pub use seeds::{load_seeds, SeedError, SeedSpec};
pub use writer::{read_bundle, BundleWriter, TableWriter};
