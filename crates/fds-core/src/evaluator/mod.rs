//! Required pod anti-affinity evaluation over the pod set of one workload.
//!
//! The scan is asymmetric (the term lives on `pod`, its selector is matched against `peer`)
//! and covers every ordered pair, so the overall outcome is symmetric.
//! Terms are OR-combined: a single matching pair and term flags the workload.
use std::collections::HashMap;

use fds_model::{AntiAffinityTerm, LabelSelector, Pod, Selector};
use tracing::{debug, warn};

use crate::topology::TopologyIndex;

/// Binary outcome of evaluating one workload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// No pair of pods violates a required anti-affinity term.
    Compliant,
    /// At least one pair of pods shares a topology domain it must not share.
    Violating,
}

/// Compiled selectors of one workload evaluation, keyed by selector content.
///
/// Replicas of a workload share the same pod template, so each distinct selector
/// is compiled once for the whole O(P²·R) scan. Absent selectors share one entry
/// compiled to [`Selector::nothing`].
/// A selector that fails to compile is remembered as unusable and warned about once.
#[derive(Debug, Default)]
pub struct SelectorCache<'a> {
    entries: HashMap<Option<&'a LabelSelector>, Option<Selector>>,
}

impl<'a> SelectorCache<'a> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Compiled selector of `term`, or `None` if its selector is invalid.
    pub fn compiled(&mut self, term: &'a AntiAffinityTerm) -> Option<&Selector> {
        self.entries
            .entry(term.label_selector.as_ref())
            .or_insert_with(|| match term.compile_selector() {
                Ok(compiled) => Some(compiled),
                Err(e) => {
                    warn!(
                        selector = ?term.label_selector,
                        topology_key = %term.topology_key,
                        error = %e,
                        "skipping anti-affinity term with invalid selector"
                    );
                    None
                }
            })
            .as_ref()
    }

    /// Number of distinct selectors seen so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been compiled yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Decide whether any pod pair of a workload violates a required anti-affinity term.
///
/// For every pod `p`, every term `r` of `p` and every other pod `q`:
/// the workload is violating if `r`'s selector matches `q`'s labels and both pods
/// resolve to the same value of `r.topology_key`. The scan stops at the first hit.
pub fn evaluate(pods: &[Pod], index: &TopologyIndex) -> Verdict {
    let mut cache = SelectorCache::new();

    for (i, pod) in pods.iter().enumerate() {
        for term in &pod.anti_affinity {
            let own = index.resolve(pod.node_name.as_deref(), &term.topology_key);
            if !own.is_resolved() {
                continue;
            }
            let Some(selector) = cache.compiled(term) else {
                continue;
            };

            let peer = pods
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, peer)| peer)
                .find(|peer| {
                    selector.matches(&peer.labels)
                        && own.same_domain(
                            &index.resolve(peer.node_name.as_deref(), &term.topology_key),
                        )
                });

            if let Some(peer) = peer {
                debug!(
                    pod = %pod.name,
                    peer = %peer.name,
                    topology_key = %term.topology_key,
                    "required anti-affinity violated"
                );
                return Verdict::Violating;
            }
        }
    }
    Verdict::Compliant
}
