/// Data layer: core types, loading, reshaping, filtering and aggregation.
///
/// Architecture:
/// ```text
///  inventory / recharges / locations  (.xlsx / .csv / .json / .parquet)
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  read file → RawTable (text cells)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  reshape  │  melt inventory, clean recharges → Dataset
///   └──────────┘
///        │            ┌───────┐
///        ├───────────▶│ cache │  Arc<Dataset> for `ttl`
///        ▼            └───────┘
///   ┌──────────┐
///   │  filter   │  locality → left join → row predicates
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐    ┌────────┐
///   │ aggregate  │    │ export │  rows → CSV
///   └───────────┘    └────────┘
/// ```

pub mod aggregate;
pub mod cache;
pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
pub mod reshape;
