//! Distance-vector routing simulation.
//!
//! A [`Network`] owns a fixed set of [`Router`]s joined by weighted links and
//! a single [`RoutingTable`] holding, for every router, the believed next hop
//! and cost towards every other router. The table starts out knowing only
//! direct links and is refined by Bellman-Ford relaxation each time a router
//! handles a packet, so routes converge as traffic flows.

pub mod algorithms;
pub mod config;
pub mod error;
pub mod network;
pub mod packet;
pub mod router;
pub mod routing_table;
pub mod types;

pub use config::SimulationConfig;
pub use error::{RoutingError, RoutingResult};
pub use network::{BatchReport, Network, RouteGap};
pub use network::topology::{LinkDescriptor, PacketDescriptor, RouterDescriptor, Scenario, Topology};
pub use packet::{Packet, PacketId, PacketState};
pub use router::{Disposition, PacketSwitch, Router, TableHandle};
pub use routing_table::{RouteEntry, RoutingTable};
pub use types::{Connection, Cost, NO_CONNECTION, RouterId, Weight};
