//! Error types for routing table construction and packet forwarding.

use thiserror::Error;

use crate::RouterId;
use crate::packet::PacketId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    /// The routing table was built from an empty router set
    #[error("routing table: no routers provided")]
    EmptyNetwork,

    /// A router id has no row in the routing table or no router behind it
    #[error("router {0} not found")]
    RouterNotFound(RouterId),

    /// Two topology descriptors share the same id
    #[error("router {0} declared more than once")]
    DuplicateRouter(RouterId),

    /// A packet was handed to a router that is not a neighbour of the sender
    #[error("router {neighbor} is not a neighbour of router {router}")]
    UnknownNeighbor { router: RouterId, neighbor: RouterId },

    /// No neighbour of the router knows a path to the destination
    #[error("router {router} has no route to {destination}")]
    NoRouteToDestination {
        router: RouterId,
        destination: RouterId,
    },

    /// A descriptor lists a neighbour without a link to it
    #[error("create connection: connection from {from} to {to} can't be created")]
    MissingConnection { from: RouterId, to: RouterId },

    /// A link is declared on a router that is not its origin
    #[error("link {from} -> {to} declared on router {owner}")]
    InvalidLink {
        owner: RouterId,
        from: RouterId,
        to: RouterId,
    },

    /// A packet visited more routers than the configured limit
    #[error("packet {packet} exceeded the hop limit of {limit}")]
    HopLimitExceeded { packet: PacketId, limit: usize },
}

pub type RoutingResult<T> = Result<T, RoutingError>;
