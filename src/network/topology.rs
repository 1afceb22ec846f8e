//! Builds the router graph from a flat topology description.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use crate::error::{RoutingError, RoutingResult};
use crate::packet::{Packet, PacketId};
use crate::router::Router;
use crate::types::{Connection, RouterId, Weight};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkDescriptor {
    pub weight: Weight,
    pub from: RouterId,
    pub to: RouterId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterDescriptor {
    pub id: RouterId,
    #[serde(default)]
    pub links: Vec<LinkDescriptor>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    pub routers: Vec<RouterDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketDescriptor {
    pub id: PacketId,
    pub source: RouterId,
    pub destination: RouterId,
}

/// A topology plus the packets to send through it, as read by the CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(flatten)]
    pub topology: Topology,
    #[serde(default)]
    pub packets: Vec<PacketDescriptor>,
}

impl RouterDescriptor {
    pub fn new(id: RouterId) -> Self {
        Self {
            id,
            links: Vec::new(),
        }
    }

    pub fn link(mut self, to: RouterId, weight: Weight) -> Self {
        self.links.push(LinkDescriptor {
            weight,
            from: self.id,
            to,
        });
        self
    }
}

impl Topology {
    pub fn new(routers: Vec<RouterDescriptor>) -> Self {
        Self { routers }
    }
}

impl Scenario {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let scenario: Scenario = serde_json::from_str(&content)?;
        Ok(scenario)
    }

    pub fn packets(&self) -> Vec<Packet> {
        self.packets
            .iter()
            .map(|p| Packet::new(p.id, p.source, p.destination))
            .collect()
    }
}

/// Turns descriptors into routers with their neighbour maps filled in.
///
/// Every link must start at the router that declares it and end at a known
/// router. A link declared on one side only is mirrored onto the other so
/// that bonds are mutual.
pub fn build_routers(topology: &Topology) -> RoutingResult<BTreeMap<RouterId, Router>> {
    let mut routers = create_routers(&topology.routers)?;
    assign_neighbours(&mut routers, &topology.routers)?;
    mirror_bonds(&mut routers);
    Ok(routers)
}

fn create_routers(descriptors: &[RouterDescriptor]) -> RoutingResult<BTreeMap<RouterId, Router>> {
    let mut routers = BTreeMap::new();
    for descriptor in descriptors {
        if routers
            .insert(descriptor.id, Router::new(descriptor.id))
            .is_some()
        {
            return Err(RoutingError::DuplicateRouter(descriptor.id));
        }
    }
    Ok(routers)
}

fn assign_neighbours(
    routers: &mut BTreeMap<RouterId, Router>,
    descriptors: &[RouterDescriptor],
) -> RoutingResult<()> {
    for descriptor in descriptors {
        for link in &descriptor.links {
            if link.from != descriptor.id || link.to == descriptor.id {
                return Err(RoutingError::InvalidLink {
                    owner: descriptor.id,
                    from: link.from,
                    to: link.to,
                });
            }
            if !routers.contains_key(&link.to) {
                return Err(RoutingError::RouterNotFound(link.to));
            }
        }

        let mut neighbours = BTreeMap::new();
        for neighbour_id in neighbour_ids(descriptor) {
            neighbours.insert(neighbour_id, connection_to(descriptor, neighbour_id)?);
        }

        let router = routers
            .get_mut(&descriptor.id)
            .ok_or(RoutingError::RouterNotFound(descriptor.id))?;
        for (neighbour_id, connection) in neighbours {
            router.add_neighbour(neighbour_id, connection);
        }
    }
    Ok(())
}

fn mirror_bonds(routers: &mut BTreeMap<RouterId, Router>) {
    let declared: Vec<Connection> = routers
        .values()
        .flat_map(|router| router.neighbours().values().copied())
        .collect();

    for connection in declared {
        if let Some(target) = routers.get_mut(&connection.to_router()) {
            if !target.is_neighbour(connection.from_router()) {
                target.add_neighbour(connection.from_router(), connection.reversed());
            }
        }
    }
}

pub fn neighbour_ids(descriptor: &RouterDescriptor) -> BTreeSet<RouterId> {
    descriptor.links.iter().map(|link| link.to).collect()
}

/// Connection for the first link of `descriptor` that leads to `to`.
pub fn connection_to(descriptor: &RouterDescriptor, to: RouterId) -> RoutingResult<Connection> {
    descriptor
        .links
        .iter()
        .find(|link| link.to == to)
        .map(|link| Connection::new(link.weight, to, link.from))
        .ok_or(RoutingError::MissingConnection {
            from: descriptor.id,
            to,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn star() -> Topology {
        Topology::new(vec![
            RouterDescriptor::new(1).link(2, 3).link(3, 5),
            RouterDescriptor::new(2),
            RouterDescriptor::new(3),
        ])
    }

    #[test]
    fn creates_one_router_per_descriptor() {
        let routers = build_routers(&star()).unwrap();
        assert_eq!(routers.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn gets_router_neighbour_ids() {
        let descriptor = RouterDescriptor::new(1).link(2, 3).link(5, 5).link(2, 9);
        assert_eq!(neighbour_ids(&descriptor), BTreeSet::from([2, 5]));
    }

    #[test]
    fn creates_connection_from_first_matching_link() {
        let descriptor = RouterDescriptor::new(1).link(2, 5).link(3, 9).link(2, 1);

        assert_eq!(connection_to(&descriptor, 3).unwrap(), Connection::new(9, 3, 1));
        assert_eq!(connection_to(&descriptor, 2).unwrap(), Connection::new(5, 2, 1));
    }

    #[test]
    fn connection_to_missing_neighbour_fails() {
        let descriptor = RouterDescriptor::new(1);

        let err = connection_to(&descriptor, 3).unwrap_err();

        assert_eq!(err, RoutingError::MissingConnection { from: 1, to: 3 });
        assert!(err.to_string().contains("create connection"));
    }

    #[test]
    fn assigns_declared_neighbours() {
        let routers = build_routers(&star()).unwrap();

        assert_eq!(routers[&1].neighbour_count(), 2);
        assert_eq!(routers[&1].connection(2), Some(&Connection::new(3, 2, 1)));
        assert_eq!(routers[&1].connection(3), Some(&Connection::new(5, 3, 1)));
    }

    #[test]
    fn mirrors_one_sided_links() {
        let routers = build_routers(&star()).unwrap();

        assert_eq!(routers[&2].neighbour_count(), 1);
        assert_eq!(routers[&2].connection(1), Some(&Connection::new(3, 1, 2)));
        assert_eq!(routers[&3].connection(1), Some(&Connection::new(5, 1, 3)));
        assert_eq!(routers[&2].connection(3), None);
    }

    #[test]
    fn keeps_own_link_when_both_sides_declare_one() {
        let topology = Topology::new(vec![
            RouterDescriptor::new(1).link(2, 4),
            RouterDescriptor::new(2).link(1, 6),
        ]);

        let routers = build_routers(&topology).unwrap();

        assert_eq!(routers[&1].connection(2).unwrap().weight(), 4);
        assert_eq!(routers[&2].connection(1).unwrap().weight(), 6);
    }

    #[test]
    fn rejects_duplicate_router_ids() {
        let topology = Topology::new(vec![RouterDescriptor::new(1), RouterDescriptor::new(1)]);
        assert_eq!(
            build_routers(&topology).unwrap_err(),
            RoutingError::DuplicateRouter(1)
        );
    }

    #[test]
    fn rejects_links_to_unknown_routers() {
        let topology = Topology::new(vec![RouterDescriptor::new(1).link(7, 1)]);
        assert_eq!(
            build_routers(&topology).unwrap_err(),
            RoutingError::RouterNotFound(7)
        );
    }

    #[test]
    fn rejects_links_declared_on_the_wrong_router() {
        let topology = Topology::new(vec![
            RouterDescriptor {
                id: 1,
                links: vec![LinkDescriptor {
                    weight: 1,
                    from: 2,
                    to: 3,
                }],
            },
            RouterDescriptor::new(2),
            RouterDescriptor::new(3),
        ]);

        assert_eq!(
            build_routers(&topology).unwrap_err(),
            RoutingError::InvalidLink {
                owner: 1,
                from: 2,
                to: 3
            }
        );
    }

    #[test]
    fn parses_scenario_json() {
        let json = r#"{
            "routers": [
                { "id": 1, "links": [ { "weight": 7, "from": 1, "to": 2 } ] },
                { "id": 2 }
            ],
            "packets": [ { "id": 1, "source": 1, "destination": 2 } ]
        }"#;

        let scenario: Scenario = serde_json::from_str(json).unwrap();

        assert_eq!(scenario.topology.routers.len(), 2);
        assert!(scenario.topology.routers[1].links.is_empty());
        assert_eq!(scenario.packets()[0], Packet::new(1, 1, 2));
    }
}
