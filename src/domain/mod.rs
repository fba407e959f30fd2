//! Site domain: typed content blocks and public route paths.

pub mod blocks;
pub mod routes;
