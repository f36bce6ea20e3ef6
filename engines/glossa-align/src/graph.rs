use petgraph::graph::{Graph, NodeIndex};
use petgraph::{Directed, Direction};
use glossa_protocol::{Token, TokenId};
use std::collections::HashMap;

/// Bipartite alignment graph over one candidate target-token stream.
///
/// Nodes are token ids from both languages; each edge runs from a target
/// token to one original-language id its `align` list declares. Built fresh
/// per rendered stream, queried per resolved span.
pub struct AlignmentIndex {
    graph: Graph<TokenId, (), Directed>,
    index_map: HashMap<TokenId, NodeIndex>,
    targets: HashMap<TokenId, Token>,
}

impl AlignmentIndex {
    pub fn build(stream: &[Token]) -> Self {
        let mut index = Self {
            graph: Graph::new(),
            index_map: HashMap::new(),
            targets: HashMap::new(),
        };

        for token in stream {
            if token.align.is_empty() {
                continue;
            }
            let target_idx = index.node_for(token.id);
            for &original in &token.align {
                let original_idx = index.node_for(original);
                index.graph.add_edge(target_idx, original_idx, ());
            }
            index.targets.insert(token.id, token.clone());
        }

        index
    }

    fn node_for(&mut self, id: TokenId) -> NodeIndex {
        let graph = &mut self.graph;
        *self
            .index_map
            .entry(id)
            .or_insert_with(|| graph.add_node(id))
    }

    /// Target tokens whose `align` list declares `original`.
    pub fn aligned_to(&self, original: TokenId) -> Vec<&Token> {
        let Some(&idx) = self.index_map.get(&original) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .filter_map(|n| self.targets.get(&self.graph[n]))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
