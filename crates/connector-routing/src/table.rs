use dashmap::DashMap;

use crate::traits::{Route, RoutingTable};

/// A concurrent prefix routing table backed by DashMap.
///
/// Keys are address prefixes; the empty prefix acts as a default route.
/// Lookups scan all prefixes, which is fine for the table sizes a single
/// connector holds.
pub struct PrefixRoutingTable {
    table: DashMap<String, Route>,
}

impl PrefixRoutingTable {
    /// Create a new, empty routing table.
    pub fn new() -> Self {
        Self {
            table: DashMap::new(),
        }
    }

    /// Insert or overwrite the route for `prefix`. Returns the previous route.
    pub fn insert(&self, prefix: impl Into<String>, route: Route) -> Option<Route> {
        let prefix = prefix.into();
        tracing::debug!(%prefix, next_hop = %route.next_hop, "route added");
        self.table.insert(prefix, route)
    }

    /// Remove the route for `prefix`. Returns the removed route if it existed.
    pub fn remove(&self, prefix: &str) -> Option<Route> {
        self.table.remove(prefix).map(|(_k, v)| v)
    }

    /// All prefixes in the table, sorted.
    pub fn prefixes(&self) -> Vec<String> {
        let mut prefixes: Vec<String> = self.table.iter().map(|r| r.key().clone()).collect();
        prefixes.sort();
        prefixes
    }

    /// Total number of routes in the table.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the table has no routes.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for PrefixRoutingTable {
    fn default() -> Self {
        Self::new()
    }
}

/// End of the address segment following `prefix`, i.e. the index of the next
/// `.` after it, or `None` if `prefix` already covers the last segment.
fn next_segment_end(address: &str, prefix: &str) -> Option<usize> {
    let start = prefix.len() + 1;
    address
        .get(start..)
        .and_then(|rest| rest.find('.'))
        .map(|i| start + i)
}

impl RoutingTable for PrefixRoutingTable {
    fn resolve(&self, address: &str) -> Option<Route> {
        self.table
            .iter()
            .filter(|entry| address.starts_with(entry.key().as_str()))
            .max_by_key(|entry| entry.key().len())
            .map(|entry| entry.value().clone())
    }

    fn shortest_unambiguous_prefix(&self, address: &str, prefix: &str) -> String {
        if !address.starts_with(prefix) {
            tracing::warn!(%address, %prefix, "prefix does not cover address, using full address");
            return address.to_string();
        }

        let mut shortest = prefix.to_string();
        for entry in self.table.iter() {
            let other = entry.key();
            // Grow along the address until `other` branches off or is reached.
            while other.starts_with(shortest.as_str()) && *other != shortest {
                match next_segment_end(address, &shortest) {
                    Some(end) => shortest = address[..end].to_string(),
                    None => {
                        shortest = address.to_string();
                        break;
                    }
                }
            }
        }
        shortest
    }
}
