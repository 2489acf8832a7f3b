/// Data layer: core types, loading, reshaping, and overlays.
///
/// Architecture:
/// ```text
///  prefs / diffprefs (wide)      diffsel / fracsurvive / muteffects (long)
///        │                                 │
///        │                                 ▼
///        │                          pivot long → wide
///        ▼                                 │
///   ┌──────────┐                           │
///   │  loader   │◄──────────────────────────┘
///   └──────────┘
///        │
///        ▼
///   ┌────────────┐
///   │ LogoMatrix  │  one row per site, one value per symbol
///   └────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ reshape   │  validate, exclude stop, stringency, clip, y-range
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ overlay   │  per-site annotations aligned to the site order
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod overlay;
pub mod reshape;
