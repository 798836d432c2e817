// Matching Engine
// Implements: table adaptation, match scoring, greedy per-project allocation, sheet output.
// The engine is synchronous; handlers own the only async boundary.

pub mod adapter;
pub mod allocator;
pub mod handlers;
pub mod scoring;
pub mod sheet;
