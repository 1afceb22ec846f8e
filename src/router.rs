use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{RoutingError, RoutingResult};
use crate::packet::Packet;
use crate::routing_table::RoutingTable;
use crate::types::{Connection, Cost, RouterId};

/// What a router decided to do with a packet it received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Delivered,
    Forward { to: RouterId },
}

/// The two operations every router offers the forwarding loop.
pub trait PacketSwitch {
    fn receive_packet(
        &self,
        packet: &mut Packet,
        table: &mut TableHandle<'_>,
    ) -> RoutingResult<Disposition>;

    fn send_packet(&self, neighbour: RouterId, packet: &Packet) -> RoutingResult<Disposition>;
}

/// Access to the shared routing table granted to the router holding a packet.
///
/// Routers can relax the table around themselves and their neighbours and
/// ask for a next hop. They cannot write individual rows.
pub struct TableHandle<'a> {
    table: &'a mut RoutingTable,
    routers: &'a BTreeMap<RouterId, Router>,
    share_updates: bool,
}

impl<'a> TableHandle<'a> {
    pub fn new(
        table: &'a mut RoutingTable,
        routers: &'a BTreeMap<RouterId, Router>,
        share_updates: bool,
    ) -> Self {
        Self {
            table,
            routers,
            share_updates,
        }
    }

    pub fn relax_at(&mut self, router: &Router) -> RoutingResult<bool> {
        self.table.try_update(router)
    }

    /// Lets every neighbour of `router` run one relaxation pass of its own.
    pub fn share_update(&mut self, router: &Router) -> RoutingResult<()> {
        if !self.share_updates {
            return Ok(());
        }
        for neighbour_id in router.neighbour_ids() {
            let neighbour = self
                .routers
                .get(&neighbour_id)
                .ok_or(RoutingError::RouterNotFound(neighbour_id))?;
            self.table.try_update(neighbour)?;
        }
        Ok(())
    }

    pub fn next_hop(&self, router: &Router, packet: &Packet) -> RoutingResult<RouterId> {
        self.table.get_next_hop(router, packet)
    }
}

/// A node of the simulated network.
///
/// Neighbours are stored by id together with the connection leading to them;
/// the routers themselves are owned by the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Router {
    id: RouterId,
    neighbours: BTreeMap<RouterId, Connection>,
}

impl Router {
    pub fn new(id: RouterId) -> Self {
        Self {
            id,
            neighbours: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> RouterId {
        self.id
    }

    /// Inserts or replaces the link to `neighbour_id`.
    pub fn add_neighbour(&mut self, neighbour_id: RouterId, connection: Connection) {
        self.neighbours.insert(neighbour_id, connection);
    }

    pub fn remove_neighbour(&mut self, neighbour_id: RouterId) -> Option<Connection> {
        self.neighbours.remove(&neighbour_id)
    }

    pub fn connection(&self, neighbour_id: RouterId) -> Option<&Connection> {
        self.neighbours.get(&neighbour_id)
    }

    pub fn neighbours(&self) -> &BTreeMap<RouterId, Connection> {
        &self.neighbours
    }

    pub fn neighbour_ids(&self) -> impl Iterator<Item = RouterId> + '_ {
        self.neighbours.keys().copied()
    }

    pub fn neighbour_count(&self) -> usize {
        self.neighbours.len()
    }

    pub fn is_neighbour(&self, router_id: RouterId) -> bool {
        self.neighbours.contains_key(&router_id)
    }

    /// Direct link cost to `other`, looking at the links of both routers.
    ///
    /// Links may be registered on one side only, so `other`'s link back to
    /// this router counts as well. When both exist the cheaper one wins.
    /// Only meant for seeding the routing table.
    pub fn get_distance_to_possible_neighbour(&self, other: &Router) -> Option<Cost> {
        let own = self.connection(other.id).map(Connection::weight);
        let theirs = other.connection(self.id).map(Connection::weight);

        match (own, theirs) {
            (Some(a), Some(b)) => Some(Cost::from(a.min(b))),
            (Some(w), None) | (None, Some(w)) => Some(Cost::from(w)),
            (None, None) => None,
        }
    }

    fn is_destination(&self, packet: &Packet) -> bool {
        self.id == packet.destination()
    }
}

impl PacketSwitch for Router {
    fn receive_packet(
        &self,
        packet: &mut Packet,
        table: &mut TableHandle<'_>,
    ) -> RoutingResult<Disposition> {
        if self.is_destination(packet) && packet.current_router() == Some(self.id) {
            packet.mark_delivered();
            return Ok(Disposition::Delivered);
        }

        packet.record_hop(self.id);

        if self.is_destination(packet) {
            packet.mark_delivered();
            info!(
                "Packet {} reached destination {} via {:?}",
                packet.id(),
                self.id,
                packet.path()
            );
            return Ok(Disposition::Delivered);
        }

        if table.relax_at(self)? {
            debug!("Router {} updated its routes, sharing with neighbours", self.id);
            table.share_update(self)?;
        }

        let next = table.next_hop(self, packet)?;
        self.send_packet(next, packet)
    }

    fn send_packet(&self, neighbour: RouterId, packet: &Packet) -> RoutingResult<Disposition> {
        if !self.is_neighbour(neighbour) {
            return Err(RoutingError::UnknownNeighbor {
                router: self.id,
                neighbor: neighbour,
            });
        }
        debug!(
            "Router {} forwards packet {} to {}",
            self.id,
            packet.id(),
            neighbour
        );
        Ok(Disposition::Forward { to: neighbour })
    }
}
