//! `gofi-map` — the map query interface used by the macro-action library.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                 |
//! |----------------|----------------------------------------------------------|
//! | [`map`]        | `Lane`, `RoadMap` (lanes + R-tree), `RoadMapBuilder`     |
//! | [`router`]     | `LaneRouter` trait, `LaneRoute`, `DijkstraLaneRouter`    |
//! | [`descriptor`] | `MapDescriptor`: the plain-data form maps are stored in  |
//! | [`error`]      | `MapError`, `MapResult<T>`                               |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                       |
//! |---------|--------------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on the descriptor types.   |

pub mod descriptor;
pub mod error;
pub mod map;
pub mod router;


pub use descriptor::{LaneDescriptor, MapDescriptor};
pub use error::{MapError, MapResult};
pub use map::{Lane, MapBounds, RoadMap, RoadMapBuilder};
pub use router::{DijkstraLaneRouter, LaneRoute, LaneRouter, RouteSegment};
