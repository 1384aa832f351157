//! Output routing: which shared effect chain each track feeds.
//!
//! The router lives on the control plane. Connections are kept as edges of a
//! small track -> effect graph; after every change an immutable
//! [`RoutingTable`] snapshot is published for the audio thread, which picks it
//! up at its next block boundary.
use std::sync::Arc;

use arc_swap::ArcSwap;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RouteNode {
    Track(usize),
    Effect(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteChange {
    Disconnect { track: usize, effect: usize },
    Connect { track: usize, effect: usize },
}

/// Effect assignment per track id, as seen by the audio thread
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingTable {
    effect_for_track: Vec<Option<usize>>,
}

impl RoutingTable {
    pub fn new(track_count: usize) -> Self {
        Self {
            effect_for_track: vec![None; track_count],
        }
    }

    pub fn effect_for(&self, track: usize) -> Option<usize> {
        self.effect_for_track.get(track).copied().flatten()
    }

    /// Track feeding `effect`, if any
    pub fn source_of(&self, effect: usize) -> Option<usize> {
        self.effect_for_track.iter().position(|e| *e == Some(effect))
    }

    /// (track, effect) pairs for every connected track
    pub fn routes(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.effect_for_track
            .iter()
            .enumerate()
            .filter_map(|(track, effect)| effect.map(|e| (track, e)))
    }
}

pub struct OutputRouter {
    graph: DiGraph<RouteNode, ()>,
    track_nodes: Vec<NodeIndex>,
    effect_nodes: Vec<NodeIndex>,
    published: Arc<ArcSwap<RoutingTable>>,
    /// Replaced tables the audio thread may still be reading. Freed here once
    /// the router holds the last reference.
    retired: Vec<Arc<RoutingTable>>,
}

impl OutputRouter {
    pub fn new(track_count: usize, effect_count: usize) -> Self {
        let mut graph = DiGraph::new();
        let track_nodes = (0..track_count)
            .map(|t| graph.add_node(RouteNode::Track(t)))
            .collect();
        let effect_nodes = (0..effect_count)
            .map(|e| graph.add_node(RouteNode::Effect(e)))
            .collect();
        Self {
            graph,
            track_nodes,
            effect_nodes,
            published: Arc::new(ArcSwap::from_pointee(RoutingTable::new(track_count))),
            retired: Vec::new(),
        }
    }

    /// Shared snapshot the audio thread reads from
    pub fn table_handle(&self) -> Arc<ArcSwap<RoutingTable>> {
        self.published.clone()
    }

    pub fn table(&self) -> Arc<RoutingTable> {
        self.published.load_full()
    }

    pub fn effect_count(&self) -> usize {
        self.effect_nodes.len()
    }

    /// Effect track `track` is currently connected to
    pub fn effect_of(&self, track: usize) -> Option<usize> {
        let node = *self.track_nodes.get(track)?;
        self.graph
            .neighbors_directed(node, Direction::Outgoing)
            .find_map(|n| match self.graph[n] {
                RouteNode::Effect(e) => Some(e),
                RouteNode::Track(_) => None,
            })
    }

    /// Number of tracks feeding `effect`
    pub fn source_count(&self, effect: usize) -> usize {
        self.effect_nodes
            .get(effect)
            .map(|&node| self.graph.neighbors_directed(node, Direction::Incoming).count())
            .unwrap_or(0)
    }

    /// Assign `sources[i]` to effect `i` for the first `min(sources, effects)` slots.
    ///
    /// Only tracks whose effect actually changes are touched. Every stale
    /// connection is removed before any new one is made, so no effect ever has
    /// two sources and no track ever feeds two effects. Tracks beyond the last
    /// effect slot end up disconnected.
    pub fn reconnect(&mut self, sources: &[usize]) -> Vec<RouteChange> {
        let track_count = self.track_nodes.len();
        let mut desired = vec![None; track_count];
        for (effect, &track) in sources.iter().take(self.effect_nodes.len()).enumerate() {
            if track < track_count {
                desired[track] = Some(effect);
            }
        }

        let mut changes = Vec::new();
        for track in 0..track_count {
            if let Some(effect) = self.effect_of(track) {
                if desired[track] != Some(effect) {
                    self.disconnect(track, effect);
                    changes.push(RouteChange::Disconnect { track, effect });
                }
            }
        }
        for (track, want) in desired.iter().enumerate() {
            if let Some(effect) = *want {
                if self.effect_of(track) != Some(effect) {
                    self.graph
                        .add_edge(self.track_nodes[track], self.effect_nodes[effect], ());
                    changes.push(RouteChange::Connect { track, effect });
                }
            }
        }

        self.collect_retired();
        if !changes.is_empty() {
            let old = self.published.swap(Arc::new(RoutingTable {
                effect_for_track: desired,
            }));
            self.retired.push(old);
            log::debug!("[Router] {} routing changes: {:?}", changes.len(), changes);
        }
        changes
    }

    /// Drop retired tables nobody else references any more
    pub fn collect_retired(&mut self) -> usize {
        self.retired.retain(|table| Arc::strong_count(table) > 1);
        self.retired.len()
    }

    fn disconnect(&mut self, track: usize, effect: usize) {
        if let Some(edge) = self
            .graph
            .find_edge(self.track_nodes[track], self.effect_nodes[effect])
        {
            self.graph.remove_edge(edge);
        }
    }
}
