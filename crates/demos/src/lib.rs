//! Demo programs built on arbor.

/// Nested focusable blocks that split on demand.
pub mod focusgym;
/// Counters driven by repeating timers.
pub mod intervals;
