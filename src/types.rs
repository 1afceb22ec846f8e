use serde::{Deserialize, Serialize};

pub type RouterId = u64;

/// Cost of traversing a single link.
pub type Weight = u32;

/// Accumulated cost of a path. Wider than [`Weight`] so that summing link
/// weights along a path cannot overflow in practice.
pub type Cost = u64;

/// Marker for "no known path" in the routing table.
pub const NO_CONNECTION: Option<Cost> = None;

/// A weighted directed edge between two routers.
///
/// Equality is structural: two connections are equal when their weight and
/// both endpoints match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    weight: Weight,
    to_router: RouterId,
    from_router: RouterId,
}

impl Connection {
    pub fn new(weight: Weight, to_router: RouterId, from_router: RouterId) -> Self {
        Self {
            weight,
            to_router,
            from_router,
        }
    }

    pub fn weight(&self) -> Weight {
        self.weight
    }

    pub fn to_router(&self) -> RouterId {
        self.to_router
    }

    pub fn from_router(&self) -> RouterId {
        self.from_router
    }

    /// The same link seen from the other endpoint.
    pub fn reversed(&self) -> Self {
        Self::new(self.weight, self.from_router, self.to_router)
    }

    /// A copy of this link with a different weight.
    pub fn with_weight(&self, weight: Weight) -> Self {
        Self::new(weight, self.to_router, self.from_router)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_structural() {
        assert_eq!(Connection::new(5, 2, 1), Connection::new(5, 2, 1));
        assert_ne!(Connection::new(5, 2, 1), Connection::new(6, 2, 1));
        assert_ne!(Connection::new(5, 2, 1), Connection::new(5, 1, 2));
    }

    #[test]
    fn reversed_swaps_endpoints() {
        let conn = Connection::new(3, 2, 1).reversed();
        assert_eq!(conn.from_router(), 2);
        assert_eq!(conn.to_router(), 1);
        assert_eq!(conn.weight(), 3);
    }
}
