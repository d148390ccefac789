//! Core data types and pure algebra the rest of the engine is built on:
//! the [`record`] model, [`label_algebra`]'s label/pair/cluster conversions,
//! and [`block_graph`]'s lazy label-vector/graph duality.

pub mod block_graph;
pub mod label_algebra;
pub mod record;
