/// Data layer: core types, parsing, calibration, decimation, windowing and
/// normalization.
///
/// Architecture:
/// ```text
///  {board}_{algorithm}/datos_{iteration}.txt
///        │
///        ▼
///   ┌──────────┐   ┌─────────────┐   ┌─────────────┐
///   │  loader   │──▶│   filter     │──▶│ calibration  │  → Record rows
///   └──────────┘   │ (Decimator)  │   └─────────────┘
///                  └─────────────┘
///
///  {board}_{algorithm}_{iteration}.csv
///        │
///        ▼
///   ┌──────────┐   ┌──────────────┐   ┌─────────────┐
///   │  loader   │──▶│    window      │──▶│  normalize   │  → NormalizedBoard
///   └──────────┘   │(SequenceBuilder)│   │  (z-score)   │
///                  └──────────────┘   └─────────────┘
/// ```

pub mod calibration;
pub mod filter;
pub mod loader;
pub mod model;
pub mod normalize;
pub mod window;
