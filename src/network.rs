pub mod topology;

use log::{info, warn};
use std::collections::BTreeMap;

use crate::algorithms::dijkstra::{self, Adjacency, ShortestPaths};
use crate::config::SimulationConfig;
use crate::error::{RoutingError, RoutingResult};
use crate::packet::{Packet, PacketId};
use crate::router::{Disposition, PacketSwitch, Router, TableHandle};
use crate::routing_table::RoutingTable;
use crate::types::{Cost, RouterId, Weight};

pub use topology::{LinkDescriptor, PacketDescriptor, RouterDescriptor, Scenario, Topology};

/// Outcome of sending a batch of packets.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub delivered: usize,
    pub failures: Vec<(PacketId, RoutingError)>,
}

impl BatchReport {
    pub fn all_delivered(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A table entry that disagrees with the centralised shortest path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteGap {
    pub from: RouterId,
    pub to: RouterId,
    pub table: Option<Cost>,
    pub reference: Option<Cost>,
}

/// Owns the routers and the routing table they share, and drives packets
/// through them one hop at a time.
#[derive(Debug)]
pub struct Network {
    routers: BTreeMap<RouterId, Router>,
    routing_table: RoutingTable,
    config: SimulationConfig,
}

impl Network {
    pub fn new(topology: &Topology) -> RoutingResult<Self> {
        Self::with_config(topology, SimulationConfig::default())
    }

    pub fn with_config(topology: &Topology, config: SimulationConfig) -> RoutingResult<Self> {
        let routers = topology::build_routers(topology)?;
        Self::from_routers(routers, config)
    }

    pub fn from_routers(
        routers: BTreeMap<RouterId, Router>,
        config: SimulationConfig,
    ) -> RoutingResult<Self> {
        let routing_table = RoutingTable::create_routing_table(routers.values())?;
        let mut network = Self {
            routers,
            routing_table,
            config,
        };

        info!("Network built with {} routers", network.routers.len());
        if network.config.converge_on_start {
            network.converge()?;
        }
        Ok(network)
    }

    /// Sends each packet from its source in turn. A failed packet is
    /// recorded and the batch goes on.
    pub fn begin_packet_transmission(&mut self, packets: &mut [Packet]) -> BatchReport {
        let mut report = BatchReport::default();
        for packet in packets.iter_mut() {
            match self.transmit_packet(packet) {
                Ok(()) => report.delivered += 1,
                Err(err) => report.failures.push((packet.id(), err)),
            }
        }
        info!(
            "Transmission finished: {} delivered, {} failed",
            report.delivered,
            report.failures.len()
        );
        report
    }

    pub fn transmit_packet(&mut self, packet: &mut Packet) -> RoutingResult<()> {
        let result = self.forward(packet);
        if let Err(err) = &result {
            warn!("Packet {} stuck at {:?}: {}", packet.id(), packet.current_router(), err);
            packet.mark_stuck();
        }
        result
    }

    fn forward(&mut self, packet: &mut Packet) -> RoutingResult<()> {
        if packet.is_at_destination() {
            packet.mark_delivered();
            return Ok(());
        }
        for id in [packet.source(), packet.destination()] {
            if !self.routers.contains_key(&id) {
                return Err(RoutingError::RouterNotFound(id));
            }
        }

        let max_hops = self.config.max_hops;
        let mut handle = TableHandle::new(
            &mut self.routing_table,
            &self.routers,
            self.config.share_updates,
        );
        let mut current = packet.source();
        let mut hops = 0;

        loop {
            let router = self
                .routers
                .get(&current)
                .ok_or(RoutingError::RouterNotFound(current))?;

            match router.receive_packet(packet, &mut handle)? {
                Disposition::Delivered => return Ok(()),
                Disposition::Forward { to } => {
                    hops += 1;
                    if hops > max_hops {
                        return Err(RoutingError::HopLimitExceeded {
                            packet: packet.id(),
                            limit: max_hops,
                        });
                    }
                    current = to;
                }
            }
        }
    }

    /// Relaxes every router until no entry changes. Returns the number of
    /// passes, the last one being the pass that changed nothing.
    pub fn converge(&mut self) -> RoutingResult<usize> {
        let mut passes = 0;
        loop {
            passes += 1;
            let mut changed = false;
            for router in self.routers.values() {
                changed |= self.routing_table.try_update(router)?;
            }
            if !changed {
                break;
            }
        }
        info!("Routing table converged after {} passes", passes);
        Ok(passes)
    }

    /// Changes the weight of the link between two routers on both sides and
    /// in the routing table.
    pub fn update_bond(&mut self, a: RouterId, b: RouterId, weight: Weight) -> RoutingResult<()> {
        let mut linked = false;
        for (from, to) in [(a, b), (b, a)] {
            let router = self
                .routers
                .get_mut(&from)
                .ok_or(RoutingError::RouterNotFound(from))?;
            if let Some(connection) = router.connection(to).copied() {
                router.add_neighbour(to, connection.with_weight(weight));
                linked = true;
            }
        }
        if !linked {
            return Err(RoutingError::UnknownNeighbor {
                router: a,
                neighbor: b,
            });
        }
        self.routing_table.update_router_bond(a, b, Cost::from(weight))
    }

    /// Takes a router out of the network together with every link to it.
    pub fn remove_router(&mut self, id: RouterId) -> RoutingResult<Router> {
        let removed = self
            .routers
            .remove(&id)
            .ok_or(RoutingError::RouterNotFound(id))?;
        for router in self.routers.values_mut() {
            router.remove_neighbour(id);
        }
        self.routing_table.remove_router(id);
        Ok(removed)
    }

    /// Undirected view of the current links; a pair linked both ways keeps
    /// the cheaper weight, matching how the routing table is seeded.
    fn adjacency(&self) -> Adjacency {
        let mut adjacency = Adjacency::new();
        for router in self.routers.values() {
            for (&neighbour, connection) in router.neighbours() {
                let weight = Cost::from(connection.weight());
                adjacency.entry(router.id()).or_default().push((neighbour, weight));
                adjacency.entry(neighbour).or_default().push((router.id(), weight));
            }
        }
        adjacency
    }

    pub fn shortest_paths(&self, source: RouterId) -> ShortestPaths {
        dijkstra::shortest_paths(&self.adjacency(), source)
    }

    /// Entries whose cost differs from the true shortest distance.
    pub fn optimality_gaps(&self) -> RoutingResult<Vec<RouteGap>> {
        let adjacency = self.adjacency();
        let mut gaps = Vec::new();
        for &from in self.routers.keys() {
            let reference = dijkstra::shortest_paths(&adjacency, from);
            for &to in self.routers.keys().filter(|&&to| to != from) {
                let table = self.routing_table.distance(from, to)?;
                let expected = reference.distance(to);
                if table != expected {
                    gaps.push(RouteGap {
                        from,
                        to,
                        table,
                        reference: expected,
                    });
                }
            }
        }
        Ok(gaps)
    }

    pub fn router(&self, id: RouterId) -> Option<&Router> {
        self.routers.get(&id)
    }

    pub fn routers(&self) -> &BTreeMap<RouterId, Router> {
        &self.routers
    }

    pub fn routing_table(&self) -> &RoutingTable {
        &self.routing_table
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::PacketState;

    // [1]--7--[2]--5--[3]
    fn chain() -> Topology {
        Topology::new(vec![
            RouterDescriptor::new(1).link(2, 7),
            RouterDescriptor::new(2).link(3, 5),
            RouterDescriptor::new(3),
        ])
    }

    #[test]
    fn transmits_packet() {
        let mut network = Network::new(&chain()).unwrap();
        let mut packets = vec![Packet::new(1, 1, 3)];

        let report = network.begin_packet_transmission(&mut packets);

        assert!(report.all_delivered());
        assert_eq!(packets[0].path(), &[1, 2, 3]);
        assert_eq!(packets[0].state(), PacketState::Delivered);
    }

    #[test]
    fn transmits_packet_backwards_over_mirrored_links() {
        let mut network = Network::new(&chain()).unwrap();
        let mut packet = Packet::new(1, 3, 1);

        network.transmit_packet(&mut packet).unwrap();

        assert_eq!(packet.path(), &[3, 2, 1]);
    }

    #[test]
    fn retransmitting_a_delivered_packet_adds_no_hop() {
        let mut network = Network::new(&chain()).unwrap();
        let mut packet = Packet::new(1, 1, 3);
        network.transmit_packet(&mut packet).unwrap();

        network.transmit_packet(&mut packet).unwrap();

        assert_eq!(packet.path(), &[1, 2, 3]);
    }

    #[test]
    fn packet_for_unknown_router_fails_and_batch_continues() {
        let mut network = Network::new(&chain()).unwrap();
        let mut packets = vec![Packet::new(1, 1, 9), Packet::new(2, 1, 3)];

        let report = network.begin_packet_transmission(&mut packets);

        assert_eq!(report.delivered, 1);
        assert_eq!(report.failures, vec![(1, RoutingError::RouterNotFound(9))]);
        assert_eq!(packets[0].state(), PacketState::Stuck);
        assert_eq!(packets[1].path(), &[1, 2, 3]);
    }

    #[test]
    fn converge_reaches_shortest_paths() {
        let mut network = Network::new(&chain()).unwrap();

        let passes = network.converge().unwrap();

        assert!(passes >= 2);
        assert!(network.optimality_gaps().unwrap().is_empty());
        assert_eq!(network.routing_table().distance(1, 3).unwrap(), Some(12));
    }

    #[test]
    fn update_bond_changes_links_and_table() {
        let topology = Topology::new(vec![
            RouterDescriptor::new(1).link(2, 5),
            RouterDescriptor::new(2),
        ]);
        let mut network = Network::new(&topology).unwrap();

        network.update_bond(1, 2, 7).unwrap();

        assert_eq!(network.routing_table().distance(1, 2).unwrap(), Some(7));
        assert_eq!(network.routing_table().distance(2, 1).unwrap(), Some(7));
        assert_eq!(network.router(1).unwrap().connection(2).unwrap().weight(), 7);
        assert_eq!(network.router(2).unwrap().connection(1).unwrap().weight(), 7);
    }

    #[test]
    fn update_bond_between_strangers_fails() {
        let mut network = Network::new(&chain()).unwrap();

        let err = network.update_bond(1, 3, 2).unwrap_err();

        assert_eq!(
            err,
            RoutingError::UnknownNeighbor {
                router: 1,
                neighbor: 3
            }
        );
    }

    #[test]
    fn remove_router_drops_links_and_routes() {
        let mut network = Network::new(&chain()).unwrap();

        let removed = network.remove_router(3).unwrap();

        assert_eq!(removed.id(), 3);
        assert!(network.router(3).is_none());
        assert!(!network.router(2).unwrap().is_neighbour(3));
        assert!(!network.routing_table().has_router(3));
        assert_eq!(network.routing_table().distance(2, 3).unwrap(), None);
        assert_eq!(
            network.remove_router(3).unwrap_err(),
            RoutingError::RouterNotFound(3)
        );
    }

    #[test]
    fn converge_on_start_prepares_the_table() {
        let config = SimulationConfig {
            converge_on_start: true,
            ..SimulationConfig::default()
        };

        let network = Network::with_config(&chain(), config).unwrap();

        assert_eq!(network.routing_table().distance(3, 1).unwrap(), Some(12));
    }

    #[test]
    fn empty_topology_is_rejected() {
        let err = Network::new(&Topology::default()).unwrap_err();
        assert_eq!(err, RoutingError::EmptyNetwork);
    }
}
