//! The geometry-aware core: RCB partitioning, the import planner and the
//! local spatial index. See the module-level docs of each submodule for the
//! corresponding spec section.

pub(crate) mod filter;
pub mod import_planner;
pub mod kdtree;
pub mod rcb;
