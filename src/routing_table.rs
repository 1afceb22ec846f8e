use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{RoutingError, RoutingResult};
use crate::packet::Packet;
use crate::router::Router;
use crate::types::{Cost, NO_CONNECTION, RouterId};

/// Cost of a route, then the number of links it spans.
type Metric = (Cost, u32);

/// What a router believes about one destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub next_hop: RouterId,
    pub cost: Option<Cost>,
    /// Links on the recorded route, zero while the destination is unreachable.
    pub hops: u32,
}

impl RouteEntry {
    pub fn new(next_hop: RouterId, cost: Option<Cost>, hops: u32) -> Self {
        Self {
            next_hop,
            cost,
            hops,
        }
    }

    pub fn unreachable(next_hop: RouterId) -> Self {
        Self::new(next_hop, NO_CONNECTION, 0)
    }

    fn metric(&self) -> Option<Metric> {
        self.cost.map(|cost| (cost, self.hops))
    }
}

fn join(first: Metric, rest: Metric) -> Metric {
    (first.0.saturating_add(rest.0), first.1.saturating_add(rest.1))
}

/// Distance-vector state for the whole network.
///
/// Holds one row per router, and in each row one entry per other router:
/// `router -> destination -> (next hop, cost)`. Rows never contain an entry
/// for their own router. Writes that touch a pair of routers always update
/// both directions together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutingTable {
    rows: BTreeMap<RouterId, BTreeMap<RouterId, RouteEntry>>,
}

impl RoutingTable {
    /// Seeds the table from the direct links of every router.
    ///
    /// Each router starts out knowing only its neighbours; every other
    /// destination is [`NO_CONNECTION`].
    pub fn create_routing_table<'a, I>(routers: I) -> RoutingResult<Self>
    where
        I: IntoIterator<Item = &'a Router>,
    {
        let routers: Vec<&Router> = routers.into_iter().collect();
        if routers.is_empty() {
            return Err(RoutingError::EmptyNetwork);
        }

        let mut rows = BTreeMap::new();
        for current in &routers {
            let row = routers
                .iter()
                .filter(|other| other.id() != current.id())
                .map(|other| {
                    let entry = match current.get_distance_to_possible_neighbour(other) {
                        Some(cost) => RouteEntry::new(other.id(), Some(cost), 1),
                        None => RouteEntry::unreachable(other.id()),
                    };
                    (other.id(), entry)
                })
                .collect();
            rows.entry(current.id()).or_insert(row);
        }

        debug!("Created routing table for {} routers", rows.len());
        Ok(Self { rows })
    }

    /// One Bellman-Ford relaxation pass anchored at `router`.
    ///
    /// For every neighbour `N` of the router and every destination `D != N`
    /// already in its row, the route through `N` replaces the current one when
    /// the current one is unknown or strictly more expensive. At equal cost the
    /// route with fewer hops wins. Returns whether anything changed.
    pub fn try_update(&mut self, router: &Router) -> RoutingResult<bool> {
        let origin = router.id();
        let destinations = self.destinations(origin)?;
        let mut updated = false;

        for neighbour in router.neighbour_ids() {
            let Some(to_neighbour) = self.metric(origin, neighbour)? else {
                continue;
            };
            if !self.has_router(neighbour) {
                return Err(RoutingError::RouterNotFound(neighbour));
            }

            for &destination in &destinations {
                if destination == neighbour {
                    continue;
                }
                let Some(onward) = self.metric(neighbour, destination)? else {
                    continue;
                };

                let candidate = join(to_neighbour, onward);
                let improves = self
                    .metric(origin, destination)?
                    .is_none_or(|current| candidate < current);

                if improves {
                    debug!(
                        "Router {}: route to {} via {} improved to {} over {} hops",
                        origin, destination, neighbour, candidate.0, candidate.1
                    );
                    self.write_pair(origin, neighbour, destination, candidate)?;
                    updated = true;
                }
            }
        }

        Ok(updated)
    }

    /// Records `cost` as the shortest path between `router` and `destination`
    /// through `via`, in both directions.
    ///
    /// The hop count is the sum of the recorded routes `router -> via` and
    /// `via -> destination`. Both entries are checked before either is
    /// written, so the pair is never left half updated.
    pub fn set_new_shortest_path(
        &mut self,
        router: RouterId,
        via: RouterId,
        destination: RouterId,
        cost: Cost,
    ) -> RoutingResult<()> {
        let onward = if via == destination {
            0
        } else {
            self.entry(via, destination)?.hops
        };
        let hops = self.entry(router, via)?.hops.saturating_add(onward).max(1);
        self.write_pair(router, via, destination, (cost, hops))
    }

    fn write_pair(
        &mut self,
        router: RouterId,
        via: RouterId,
        destination: RouterId,
        (cost, hops): Metric,
    ) -> RoutingResult<()> {
        self.entry(router, destination)?;
        self.entry(destination, router)?;

        let entry = RouteEntry::new(via, Some(cost), hops);
        *self.entry_mut(router, destination)? = entry;
        *self.entry_mut(destination, router)? = entry;
        Ok(())
    }

    /// Picks the neighbour of `router` to forward towards `destination`.
    ///
    /// Once the router has a route of its own, only neighbours whose recorded
    /// route is strictly shorter (cost first, then hops) are accepted, so the
    /// route length shrinks with every forward. A neighbour is scored by the
    /// weight of the link to it plus its recorded route (zero when it is the
    /// destination). Ties go to fewer hops, then to the destination itself,
    /// then to the lowest id.
    pub fn next_hop(&self, router: &Router, destination: RouterId) -> RoutingResult<RouterId> {
        let origin = router.id();
        let own = self.metric(origin, destination)?;
        let mut best: Option<(Metric, bool, RouterId)> = None;

        for (&neighbour, connection) in router.neighbours() {
            let remaining = if neighbour == destination {
                Some((0, 0))
            } else {
                self.metric(neighbour, destination)?
            };
            let Some(remaining) = remaining else {
                continue;
            };
            if own.is_some_and(|own| remaining >= own) {
                continue;
            }

            let first_leg = (Cost::from(connection.weight()), 1);
            let candidate = (join(first_leg, remaining), neighbour != destination, neighbour);
            if best.is_none_or(|current| candidate < current) {
                best = Some(candidate);
            }
        }

        best.map(|(_, _, neighbour)| neighbour)
            .ok_or(RoutingError::NoRouteToDestination {
                router: origin,
                destination,
            })
    }

    pub fn get_next_hop(&self, router: &Router, packet: &Packet) -> RoutingResult<RouterId> {
        self.next_hop(router, packet.destination())
    }

    /// Overwrites the direct entries between two routers, e.g. after a link
    /// cost change.
    pub fn update_router_bond(
        &mut self,
        router: RouterId,
        neighbour: RouterId,
        cost: Cost,
    ) -> RoutingResult<()> {
        self.entry(router, neighbour)?;
        self.entry(neighbour, router)?;

        *self.entry_mut(router, neighbour)? = RouteEntry::new(neighbour, Some(cost), 1);
        *self.entry_mut(neighbour, router)? = RouteEntry::new(router, Some(cost), 1);
        info!("Bond {} <-> {} set to {}", router, neighbour, cost);
        Ok(())
    }

    /// Drops the router's row and makes every other router forget its route
    /// to it. Nothing is relaxed afterwards.
    pub fn remove_router(&mut self, router: RouterId) -> bool {
        let removed = self.rows.remove(&router).is_some();
        for row in self.rows.values_mut() {
            if let Some(entry) = row.get_mut(&router) {
                *entry = RouteEntry::unreachable(router);
            }
        }
        if removed {
            info!("Removed router {} from routing table", router);
        }
        removed
    }

    pub fn has_router(&self, router: RouterId) -> bool {
        self.rows.contains_key(&router)
    }

    pub fn router_ids(&self) -> Vec<RouterId> {
        self.rows.keys().copied().collect()
    }

    /// Destinations present in the router's row.
    pub fn destinations(&self, router: RouterId) -> RoutingResult<Vec<RouterId>> {
        self.rows
            .get(&router)
            .map(|row| row.keys().copied().collect())
            .ok_or(RoutingError::RouterNotFound(router))
    }

    pub fn routes(&self, router: RouterId) -> Option<&BTreeMap<RouterId, RouteEntry>> {
        self.rows.get(&router)
    }

    pub fn entry(&self, from: RouterId, to: RouterId) -> RoutingResult<&RouteEntry> {
        self.rows
            .get(&from)
            .ok_or(RoutingError::RouterNotFound(from))?
            .get(&to)
            .ok_or(RoutingError::RouterNotFound(to))
    }

    fn entry_mut(&mut self, from: RouterId, to: RouterId) -> RoutingResult<&mut RouteEntry> {
        self.rows
            .get_mut(&from)
            .ok_or(RoutingError::RouterNotFound(from))?
            .get_mut(&to)
            .ok_or(RoutingError::RouterNotFound(to))
    }

    pub fn distance(&self, from: RouterId, to: RouterId) -> RoutingResult<Option<Cost>> {
        self.entry(from, to).map(|entry| entry.cost)
    }

    fn metric(&self, from: RouterId, to: RouterId) -> RoutingResult<Option<Metric>> {
        self.entry(from, to).map(RouteEntry::metric)
    }

    pub fn next_shortest_path_router(
        &self,
        from: RouterId,
        to: RouterId,
    ) -> RoutingResult<RouterId> {
        self.entry(from, to).map(|entry| entry.next_hop)
    }

    /// True when every pair of present routers agrees on the cost between them.
    pub fn is_symmetric(&self) -> bool {
        self.rows.iter().all(|(&from, row)| {
            row.iter().all(|(&to, entry)| match self.entry(to, from) {
                Ok(mirror) => mirror.cost == entry.cost,
                Err(_) => true,
            })
        })
    }
}

impl fmt::Display for RoutingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (router, row) in &self.rows {
            writeln!(f, "router {}:", router)?;
            for (destination, entry) in row {
                match entry.cost {
                    Some(cost) => writeln!(
                        f,
                        "  -> {:<6} via {:<6} cost {} ({} hops)",
                        destination, entry.next_hop, cost, entry.hops
                    )?,
                    None => writeln!(f, "  -> {:<6} unreachable", destination)?,
                }
            }
        }
        Ok(())
    }
}
