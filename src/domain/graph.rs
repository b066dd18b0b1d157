//! Read-only question graph store.
//!
//! Built once from node records, then shared by reference (`Arc<NodeGraph>`) between
//! sessions. Lookups never fail loudly: `get` returns `None` and callers decide.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::domain::entities::Node;
use crate::domain::error::DomainError;

/// Immutable mapping from node id to question definition.
#[derive(Debug, Clone, Default)]
pub struct NodeGraph {
    nodes: HashMap<String, Node>,
    /// Ids registered from a parent's inline refinement list
    refinement_ids: HashSet<String>,
}

impl NodeGraph {
    /// Build a graph from node records.
    ///
    /// Inline refinements become addressable nodes. A top-level node may repeat a
    /// refinement under its id only with an identical definition. Fails on duplicate
    /// top-level ids and on any two differing definitions under one refinement id.
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Result<Self, DomainError> {
        let mut map: HashMap<String, Node> = HashMap::new();
        for node in nodes {
            if map.contains_key(&node.id) {
                return Err(DomainError::DuplicateNode(node.id));
            }
            map.insert(node.id.clone(), node);
        }

        let mut refinement_ids = HashSet::new();
        let mut inlined: HashMap<String, Node> = HashMap::new();
        for node in map.values() {
            for refinement in &node.refinements {
                refinement_ids.insert(refinement.id.clone());
                let as_node = Node::from(refinement);
                let conflict = || DomainError::RefinementConflict {
                    node: node.id.clone(),
                    refinement: refinement.id.clone(),
                };
                if let Some(top_level) = map.get(&refinement.id) {
                    if *top_level != as_node {
                        return Err(conflict());
                    }
                    continue;
                }
                match inlined.get(&refinement.id) {
                    Some(existing) if *existing != as_node => return Err(conflict()),
                    Some(_) => {}
                    None => {
                        inlined.insert(refinement.id.clone(), as_node);
                    }
                }
            }
        }
        map.extend(inlined);

        Ok(Self {
            nodes: map,
            refinement_ids,
        })
    }

    /// Build from a keyed map, taking each node's id from its key.
    pub fn from_map(map: BTreeMap<String, Node>) -> Result<Self, DomainError> {
        Self::from_nodes(map.into_iter().map(|(id, mut node)| {
            node.id = id;
            node
        }))
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn has(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Whether `id` was registered as some node's refinement.
    pub fn is_refinement(&self, id: &str) -> bool {
        self.refinement_ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node ids in sorted order.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.nodes.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Collect every integrity defect: missing root, dangling `next`, broken weights.
    pub fn defects(&self, root: &str) -> Vec<DomainError> {
        let mut defects = Vec::new();
        if !self.has(root) {
            defects.push(DomainError::MissingRoot(root.to_string()));
        }

        for id in self.ids() {
            let Some(node) = self.get(id) else { continue };
            for answer in &node.answers {
                if let Some(target) = &answer.next {
                    if !self.has(target) {
                        defects.push(DomainError::DanglingNext {
                            node: node.id.clone(),
                            answer: answer.id.clone(),
                            target: target.clone(),
                        });
                    }
                }
            }
            for weight in &node.weights {
                if weight.min > weight.max {
                    defects.push(DomainError::InvalidWeight {
                        node: node.id.clone(),
                        weight: weight.id.clone(),
                        message: format!("min {} exceeds max {}", weight.min, weight.max),
                    });
                }
            }
        }
        defects
    }

    /// Fail with all defects if the graph is not sound.
    pub fn validate(&self, root: &str) -> Result<(), DomainError> {
        let defects = self.defects(root);
        if defects.is_empty() {
            Ok(())
        } else {
            Err(DomainError::InvalidGraph(defects))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{AnswerOption, Refinement};

    fn node(id: &str, answers: Vec<AnswerOption>) -> Node {
        Node {
            id: id.to_string(),
            question: format!("What is the {id}?"),
            answers,
            weights: vec![],
            refinements: vec![],
        }
    }

    fn answer(id: &str, next: Option<&str>) -> AnswerOption {
        AnswerOption {
            id: id.to_string(),
            label: id.to_string(),
            next: next.map(str::to_string),
        }
    }

    #[test]
    fn given_inline_refinement_when_building_then_registers_it_as_node() {
        let mut parent = node("hair", vec![answer("long", None)]);
        parent.refinements.push(Refinement {
            id: "hair_texture".into(),
            question: "What is the hair texture like?".into(),
            answers: vec![answer("wavy", None)],
            weights: vec![],
        });

        let graph = NodeGraph::from_nodes(vec![node("root", vec![]), parent]).unwrap();

        assert!(graph.has("hair_texture"));
        assert!(graph.is_refinement("hair_texture"));
        assert!(!graph.is_refinement("hair"));
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn given_top_level_node_differing_from_inline_refinement_when_building_then_fails() {
        let mut parent = node("hair", vec![answer("long", None)]);
        parent.refinements.push(Refinement {
            id: "hair_texture".into(),
            question: "What is the hair texture like?".into(),
            answers: vec![answer("wavy", Some("nowhere"))],
            weights: vec![],
        });
        let shadow = node("hair_texture", vec![answer("curly", None)]);

        let result = NodeGraph::from_nodes(vec![node("root", vec![]), parent, shadow]);

        assert_eq!(
            result.unwrap_err(),
            DomainError::RefinementConflict {
                node: "hair".into(),
                refinement: "hair_texture".into(),
            }
        );
    }

    #[test]
    fn given_top_level_copy_of_inline_refinement_when_building_then_accepts_it() {
        let refinement = Refinement {
            id: "hair_texture".into(),
            question: "What is the hair texture like?".into(),
            answers: vec![answer("wavy", None)],
            weights: vec![],
        };
        let mut parent = node("hair", vec![answer("long", None)]);
        parent.refinements.push(refinement.clone());

        let graph =
            NodeGraph::from_nodes(vec![node("root", vec![]), parent, Node::from(&refinement)]).unwrap();

        assert!(graph.is_refinement("hair_texture"));
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn given_duplicate_ids_when_building_then_fails() {
        let result = NodeGraph::from_nodes(vec![node("root", vec![]), node("root", vec![])]);
        assert_eq!(result.unwrap_err(), DomainError::DuplicateNode("root".into()));
    }

    #[test]
    fn given_dangling_next_when_validating_then_reports_defect() {
        let graph =
            NodeGraph::from_nodes(vec![node("root", vec![answer("a", Some("nowhere"))])]).unwrap();

        let defects = graph.defects("root");

        assert_eq!(defects.len(), 1);
        assert!(matches!(&defects[0], DomainError::DanglingNext { target, .. } if target == "nowhere"));
        assert!(graph.validate("root").is_err());
    }

    #[test]
    fn given_missing_root_when_validating_then_reports_missing_root() {
        let graph = NodeGraph::from_nodes(vec![node("start", vec![])]).unwrap();
        assert_eq!(
            graph.defects("root"),
            vec![DomainError::MissingRoot("root".into())]
        );
    }

    #[test]
    fn given_unknown_id_when_getting_then_returns_none() {
        let graph = NodeGraph::from_nodes(vec![node("root", vec![])]).unwrap();
        assert!(graph.get("missing").is_none());
        assert!(!graph.has("missing"));
    }
}
