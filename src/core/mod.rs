//! Core library modules for intermediate-edges
//!
//! One module per pipeline stage, leaf-first: identities, the edge index,
//! sub-edge resolution, counting, aggregation, matrix assembly, persistence
//! and the query path.

pub mod aggregate;
pub mod config;
pub mod corpus;
pub mod counter;
pub mod edge;
pub mod error;
pub mod formats;
pub mod index;
pub mod matrix;
pub mod query;
pub mod resolver;
pub mod ways;

