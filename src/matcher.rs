//! Rule predicates evaluated against a topology snapshot
//!
//! Matching is pure and total: a malformed pattern only fails its own
//! predicate. Rules are tried in declaration order and the first match wins.

use crate::config::Rule;
use crate::randr::Topology;

impl Rule {
    /// True iff every predicate of the rule holds. A rule without predicates always matches.
    pub fn matches(&self, topology: &Topology) -> bool {
        self.outputs_absent.iter().all(|p| !topology.present(p))
            && self.outputs_disconnected.iter().all(|p| !topology.connected(p))
            && self.outputs_present.iter().all(|p| topology.present(p))
            && self.outputs_connected.iter().all(|p| topology.connected(p))
    }
}

/// First rule in priority order that matches the topology.
pub fn match_rules<'a>(rules: &'a [Rule], topology: &Topology) -> Option<&'a Rule> {
    rules.iter().find(|rule| rule.matches(topology))
}
