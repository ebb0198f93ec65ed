/// Data layer: core types, loading, interpolation and filtering.
///
/// Architecture:
/// ```text
///  API payload / databank file
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Vec<RawRecord>
///   └──────────┘
///        │
///        ▼
///   ┌────────────────┐
///   │ TimeSeriesStore │  sparse Series per (entity, indicator)
///   └────────────────┘
///        │
///        ▼
///   ┌─────────────┐
///   │ interpolate  │  value at any year inside the observed span
///   └─────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  frame    │  per-year joined snapshot, validity filtered
///   └──────────┘
/// ```
///
/// `filter` holds the shared year selection, `topology` the world map.

pub mod filter;
pub mod frame;
pub mod interpolate;
pub mod loader;
pub mod model;
pub mod store;
pub mod topology;
