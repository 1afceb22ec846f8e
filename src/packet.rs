use serde::{Deserialize, Serialize};

use crate::RouterId;

pub type PacketId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PacketState {
    /// Not yet handed to any router
    Created,
    /// Received by at least one router, destination not reached
    InTransit,
    Delivered,
    /// Forwarding aborted; the path shows how far the packet got
    Stuck,
}

/// A single transmission attempt through the network.
///
/// The identifiers are fixed at creation. The path grows by one router per
/// hop and is only touched by the router currently holding the packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    id: PacketId,
    source: RouterId,
    destination: RouterId,
    path: Vec<RouterId>,
    state: PacketState,
}

impl Packet {
    pub fn new(id: PacketId, source: RouterId, destination: RouterId) -> Self {
        Self {
            id,
            source,
            destination,
            path: Vec::new(),
            state: PacketState::Created,
        }
    }

    pub fn id(&self) -> PacketId {
        self.id
    }

    pub fn source(&self) -> RouterId {
        self.source
    }

    pub fn destination(&self) -> RouterId {
        self.destination
    }

    pub fn path(&self) -> &[RouterId] {
        &self.path
    }

    pub fn state(&self) -> PacketState {
        self.state
    }

    pub fn is_delivered(&self) -> bool {
        self.state == PacketState::Delivered
    }

    /// Router the packet currently sits on, if it has entered the network.
    pub fn current_router(&self) -> Option<RouterId> {
        self.path.last().copied()
    }

    /// True when the last recorded hop is the destination.
    pub fn is_at_destination(&self) -> bool {
        self.current_router() == Some(self.destination)
    }

    pub(crate) fn record_hop(&mut self, router: RouterId) {
        self.path.push(router);
        if self.state == PacketState::Created {
            self.state = PacketState::InTransit;
        }
    }

    pub(crate) fn mark_delivered(&mut self) {
        self.state = PacketState::Delivered;
    }

    pub(crate) fn mark_stuck(&mut self) {
        self.state = PacketState::Stuck;
    }
}
