//! # quietpath
//!
//! Core library of the quietpath route planner: a GraphML codec for an
//! attributed street network graph, and a noise exposure cost model that
//! turns per-edge noise measurements into routing costs.
//!
//! The two halves are coupled through the attribute registry in [`attrs`]:
//! the codec is what makes the routing attributes durable and exchangeable
//! (typed in memory, compact text on the wire), and the cost model is the
//! principal consumer of the decoded edge attributes (`noises`, `length`,
//! `bike_time_cost`).
//!
//! ```no_run
//! use quietpath::{import_graphml, noise};
//!
//! # fn main() -> quietpath::Result<()> {
//! let graph = import_graphml("graph.graphml")?;
//! let db_costs = noise::DbCostTable::new(noise::CostVersion::V3);
//!
//! for edge in &graph.edges {
//!     let length = edge.length().unwrap_or(0.0);
//!     let cost = noise::noise_adjusted_edge_cost(
//!         0.5,
//!         &db_costs,
//!         edge.noises(),
//!         length,
//!         edge.bike_time_cost(),
//!     )?;
//!     println!("edge cost: {cost}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod attrs;
pub mod config;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod graphml;
pub mod noise;

// Re-export main types
pub use attrs::{AttrValue, EdgeAttr, NodeAttr, NoiseSource};
pub use config::GraphConfig;
pub use error::{Error, Result};
pub use graph::{Edge, Graph, Node};
pub use graphml::{export_graphml, import_graphml};
pub use noise::{CostVersion, DbCostTable, NoiseMap, NoiseRange};
