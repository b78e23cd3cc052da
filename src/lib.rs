//! Hexagonal map generation library
//!
//! A staged pipeline over one per-cell arena: terrain, settlement
//! placement, reachability, render records.

pub mod arena;
pub mod biome;
pub mod config;
pub mod coords;
pub mod pipeline;
pub mod reach;
pub mod sampler;
pub mod seeds;
pub mod settlement;
pub mod sprite;
pub mod terrain;
