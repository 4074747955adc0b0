//! Game-entity database builder: page captures in, a reconciled, versioned
//! JSON dataset out.

pub mod config;
pub mod dataset;
pub mod effects;
pub mod error;
pub mod id;
pub mod model;
pub mod page;
pub mod parser;
pub mod reconcile;
pub mod snapshot;
pub mod source;
