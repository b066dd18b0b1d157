//! Interview engine: the stateful traversal core.
//!
//! Owns one session's position, history, temporary and committed selections, slider
//! state and custom elements. Every operation is synchronous and never fails: an
//! operation that cannot apply leaves state untouched and returns `false`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{
    AssembledPrompt, AssemblyRules, CustomElement, ElementKind, GrammarSanitizer, Node, NodeGraph,
    PromptAssembler, Sanitizer, Selection, WeightDef, WeightInstance, INTENSITY_ATTR,
};

/// Node ids and terms with special meaning to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterviewOptions {
    /// Session start node
    pub root_node: String,
    /// Answers at this node get a body-type suffix in the prompt
    pub body_type_node: String,
    /// Hub that weight-only nodes with `hub_prefix` route back to
    pub hub_node: String,
    pub hub_prefix: String,
    /// Negative terms appended after the fixed base list
    pub extra_negative: Vec<String>,
}

impl Default for InterviewOptions {
    fn default() -> Self {
        Self {
            root_node: "root".into(),
            body_type_node: "body_type".into(),
            hub_node: "nsfw_options".into(),
            hub_prefix: "nsfw".into(),
            extra_negative: Vec::new(),
        }
    }
}

impl InterviewOptions {
    pub fn assembly_rules(&self) -> AssemblyRules {
        AssemblyRules {
            root_node: self.root_node.clone(),
            body_type_node: self.body_type_node.clone(),
            extra_negative: self.extra_negative.clone(),
        }
    }
}

/// Uncommitted refinement choice at a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRefinement {
    pub refinement_id: String,
    pub answer_id: String,
}

/// Complete mutable state of one session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InterviewState {
    pub current_node_id: String,
    pub history: Vec<String>,
    /// node id -> answer id
    pub temp_answers: HashMap<String, String>,
    /// node id -> refinement choice
    pub temp_refinements: HashMap<String, PendingRefinement>,
    /// node id -> emphasis value
    pub temp_intensity: HashMap<String, f64>,
    /// weight id -> slider value
    pub weight_values: HashMap<String, f64>,
    /// Weight ids the user moved during the current node visit
    pub touched_weights: HashSet<String>,
    pub slider_enabled: HashMap<String, bool>,
    pub answers: Vec<Selection>,
    pub refinements: Vec<Selection>,
    pub weights: Vec<WeightInstance>,
    pub custom_elements: Vec<CustomElement>,
}

impl InterviewState {
    pub fn new(root: &str) -> Self {
        Self {
            current_node_id: root.to_string(),
            history: vec![root.to_string()],
            ..Self::default()
        }
    }
}

/// Ids created by one commit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommitOutcome {
    pub answer_id: Option<String>,
    pub refinement_id: Option<String>,
    pub weight_ids: Vec<String>,
}

impl CommitOutcome {
    pub fn is_empty(&self) -> bool {
        self.answer_id.is_none() && self.refinement_id.is_none() && self.weight_ids.is_empty()
    }
}

/// Current node weight resolved against session values.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveWeight {
    pub def: WeightDef,
    pub value: f64,
    pub enabled: bool,
    pub touched: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    Answer,
    Refinement,
}

/// One committed choice with the question it answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionSummary {
    pub selection_id: String,
    pub kind: SelectionKind,
    pub node_id: String,
    pub question: String,
    pub label: String,
}

/// Selection a weight attaches to: (selection id, label).
type Context = (String, String);

/// Single-session interview state machine over a shared graph.
#[derive(Debug)]
pub struct InterviewEngine {
    graph: Arc<NodeGraph>,
    options: InterviewOptions,
    assembler: PromptAssembler,
    state: InterviewState,
}

impl InterviewEngine {
    pub fn new(graph: Arc<NodeGraph>, options: InterviewOptions) -> Self {
        Self::with_sanitizer(graph, options, Arc::new(GrammarSanitizer))
    }

    pub fn with_sanitizer(
        graph: Arc<NodeGraph>,
        options: InterviewOptions,
        sanitizer: Arc<dyn Sanitizer>,
    ) -> Self {
        let assembler = PromptAssembler::new(options.assembly_rules(), sanitizer);
        let state = InterviewState::new(&options.root_node);
        Self {
            graph,
            options,
            assembler,
            state,
        }
    }

    // ============================================================
    // Queries
    // ============================================================

    pub fn graph(&self) -> &NodeGraph {
        &self.graph
    }

    pub fn options(&self) -> &InterviewOptions {
        &self.options
    }

    pub fn state(&self) -> &InterviewState {
        &self.state
    }

    pub fn current_node_id(&self) -> &str {
        &self.state.current_node_id
    }

    pub fn current_node(&self) -> Option<&Node> {
        self.graph.get(&self.state.current_node_id)
    }

    pub fn history(&self) -> &[String] {
        &self.state.history
    }

    pub fn answers(&self) -> &[Selection] {
        &self.state.answers
    }

    pub fn refinements(&self) -> &[Selection] {
        &self.state.refinements
    }

    pub fn weights(&self) -> &[WeightInstance] {
        &self.state.weights
    }

    pub fn custom_elements(&self) -> &[CustomElement] {
        &self.state.custom_elements
    }

    pub fn temporary_answer(&self, node_id: &str) -> Option<&str> {
        self.state.temp_answers.get(node_id).map(String::as_str)
    }

    pub fn temporary_refinement(&self, node_id: &str) -> Option<&PendingRefinement> {
        self.state.temp_refinements.get(node_id)
    }

    pub fn temporary_intensity(&self, node_id: &str) -> Option<f64> {
        self.state.temp_intensity.get(node_id).copied()
    }

    /// Weights of the current node with their effective values.
    pub fn active_weights(&self) -> Vec<ActiveWeight> {
        let Some(node) = self.current_node() else {
            return Vec::new();
        };
        node.weights
            .iter()
            .map(|def| ActiveWeight {
                value: self.weight_value(def),
                enabled: self.is_slider_enabled(&def.id),
                touched: self.state.touched_weights.contains(&def.id),
                def: def.clone(),
            })
            .collect()
    }

    /// Committed answers then committed refinements, each with its question text.
    pub fn selection_summary(&self) -> Vec<SelectionSummary> {
        let answers = self.state.answers.iter().map(|s| (SelectionKind::Answer, s));
        let refinements = self.state.refinements.iter().map(|s| (SelectionKind::Refinement, s));
        answers
            .chain(refinements)
            .map(|(kind, s)| SelectionSummary {
                selection_id: s.id.clone(),
                kind,
                node_id: s.origin_node_id.clone(),
                question: s.question_text.clone().unwrap_or_default(),
                label: s.label.clone(),
            })
            .collect()
    }

    /// Prompt pair built from committed state only.
    pub fn preview(&self) -> AssembledPrompt {
        self.assembler.assemble(
            &self.state.answers,
            &self.state.refinements,
            &self.state.weights,
            &self.state.custom_elements,
        )
    }

    /// Advisory: whether a "finish" affordance makes sense at the current node.
    pub fn is_finished(&self) -> bool {
        let Some(node) = self.current_node() else {
            return false;
        };
        if node.answers.is_empty() {
            return true;
        }

        let id = node.id.as_str();
        let no_successors = node.answers.iter().all(|a| a.next.is_none());

        // a directly addressed refinement is done once something is picked there
        if self.graph.is_refinement(id) {
            let selected = self.state.temp_answers.contains_key(id)
                || self.state.temp_refinements.contains_key(id)
                || self.state.answers.iter().any(|s| s.origin_node_id == id);
            return selected && no_successors;
        }

        let pending_refinements = !node.refinements.is_empty() && !self.has_refinement_selection(id);
        no_successors && !pending_refinements
    }

    // ============================================================
    // Temporary selection
    // ============================================================

    /// Choose an answer at the current node, replacing any earlier temporary choice.
    pub fn select_answer(&mut self, answer_id: &str) -> bool {
        let Some(node) = self.current_node() else {
            debug!("select_answer: current node {} not in graph", self.state.current_node_id);
            return false;
        };
        if node.answer(answer_id).is_none() {
            debug!("select_answer: {} has no answer {}", node.id, answer_id);
            return false;
        }
        let node_id = node.id.clone();
        self.state.temp_answers.insert(node_id, answer_id.to_string());
        true
    }

    /// Choose an answer of one of the current node's refinements.
    pub fn select_refinement(&mut self, refinement_id: &str, answer_id: &str) -> bool {
        let Some(node) = self.current_node() else {
            debug!("select_refinement: current node {} not in graph", self.state.current_node_id);
            return false;
        };
        let valid = node
            .refinement(refinement_id)
            .is_some_and(|r| r.answers.iter().any(|a| a.id == answer_id));
        if !valid {
            debug!("select_refinement: {} has no refinement answer {}/{}", node.id, refinement_id, answer_id);
            return false;
        }
        let node_id = node.id.clone();
        self.state.temp_refinements.insert(
            node_id,
            PendingRefinement {
                refinement_id: refinement_id.to_string(),
                answer_id: answer_id.to_string(),
            },
        );
        true
    }

    /// Set the emphasis for the selection about to be committed at the current node.
    pub fn set_intensity(&mut self, value: f64) -> bool {
        if !self.graph.has(&self.state.current_node_id) {
            return false;
        }
        self.state
            .temp_intensity
            .insert(self.state.current_node_id.clone(), value);
        true
    }

    /// Move a slider: stores the clamped value, marks it touched and enables it.
    pub fn set_weight_value(&mut self, weight_id: &str, value: f64) -> bool {
        let Some(def) = self.current_node().and_then(|n| n.weight(weight_id)) else {
            debug!("set_weight_value: no weight {} at {}", weight_id, self.state.current_node_id);
            return false;
        };
        let value = def.clamp(value);
        self.state.weight_values.insert(weight_id.to_string(), value);
        self.state.touched_weights.insert(weight_id.to_string());
        self.state.slider_enabled.insert(weight_id.to_string(), true);
        true
    }

    pub fn set_slider_enabled(&mut self, weight_id: &str, enabled: bool) -> bool {
        if self.current_node().and_then(|n| n.weight(weight_id)).is_none() {
            debug!("set_slider_enabled: no weight {} at {}", weight_id, self.state.current_node_id);
            return false;
        }
        self.state.slider_enabled.insert(weight_id.to_string(), enabled);
        true
    }

    // ============================================================
    // Commit
    // ============================================================

    /// Promote the current node's temporary state into committed collections.
    pub fn commit_current_selections(&mut self) -> CommitOutcome {
        let graph = Arc::clone(&self.graph);
        let node_id = self.state.current_node_id.clone();
        let Some(node) = graph.get(&node_id) else {
            debug!("commit: current node {} not in graph", node_id);
            return CommitOutcome::default();
        };

        let mut outcome = CommitOutcome::default();
        let mut fresh: Option<Context> = None;

        let answer = self
            .state
            .temp_answers
            .get(&node_id)
            .and_then(|answer_id| node.answer(answer_id));
        if let Some(option) = answer {
            let selection = Selection {
                id: new_id(),
                origin_node_id: node_id.clone(),
                refinement_id: None,
                answer_id: option.id.clone(),
                label: option.label.clone(),
                question_text: Some(node.question.clone()),
            };
            outcome.answer_id = Some(selection.id.clone());
            fresh = Some((selection.id.clone(), selection.label.clone()));
            self.state.answers.push(selection);
        }

        let refinement = self.state.temp_refinements.get(&node_id).and_then(|pending| {
            let r = node.refinement(&pending.refinement_id)?;
            let a = r.answers.iter().find(|a| a.id == pending.answer_id)?;
            Some((r, a))
        });
        if let Some((r, option)) = refinement {
            let selection = Selection {
                id: new_id(),
                origin_node_id: node_id.clone(),
                refinement_id: Some(r.id.clone()),
                answer_id: option.id.clone(),
                label: option.label.clone(),
                question_text: Some(r.question.clone()),
            };
            outcome.refinement_id = Some(selection.id.clone());
            if fresh.is_none() {
                fresh = Some((selection.id.clone(), selection.label.clone()));
            }
            self.state.refinements.push(selection);
        }

        let context = fresh.or_else(|| self.nearest_committed_selection());

        if let (Some(value), Some((selection_id, label))) =
            (self.state.temp_intensity.get(&node_id).copied(), context.as_ref())
        {
            let weight = WeightInstance {
                id: new_id(),
                attr_id: INTENSITY_ATTR.to_string(),
                value,
                template: String::new(),
                tags: Vec::new(),
                associated_selection_id: Some(selection_id.clone()),
                selection_label: Some(label.clone()),
            };
            outcome.weight_ids.push(weight.id.clone());
            self.state.weights.push(weight);
        }

        for def in &node.weights {
            if !self.is_slider_enabled(&def.id) {
                continue;
            }
            if !self.state.touched_weights.contains(&def.id) && context.is_none() {
                continue;
            }
            let value = self.weight_value(def);
            if let Some(id) = self.commit_weight(def, value, context.as_ref()) {
                outcome.weight_ids.push(id);
            }
        }

        self.clear_temporary(&node_id);
        info!(
            "commit at {}: answer={:?} refinement={:?} weights={}",
            node_id,
            outcome.answer_id,
            outcome.refinement_id,
            outcome.weight_ids.len()
        );
        outcome
    }

    /// Record a weight; an existing weight for the same attribute and selection is updated
    /// in place instead of duplicated.
    fn commit_weight(&mut self, def: &WeightDef, value: f64, context: Option<&Context>) -> Option<String> {
        let associated = context.map(|(id, _)| id.clone());
        if let Some(existing) = self
            .state
            .weights
            .iter_mut()
            .find(|w| w.attr_id == def.id && w.associated_selection_id == associated)
        {
            existing.value = value;
            return Some(existing.id.clone());
        }

        let weight = WeightInstance {
            id: new_id(),
            attr_id: def.id.clone(),
            value,
            template: def.template.clone(),
            tags: def.tags.clone(),
            associated_selection_id: associated,
            selection_label: context.map(|(_, label)| label.clone()),
        };
        let id = weight.id.clone();
        self.state.weights.push(weight);
        Some(id)
    }

    /// Most recent committed selection, searching the current node then history backwards.
    fn nearest_committed_selection(&self) -> Option<Context> {
        let current = std::iter::once(&self.state.current_node_id);
        current
            .chain(self.state.history.iter().rev())
            .find_map(|node_id| {
                self.state
                    .answers
                    .iter()
                    .rev()
                    .find(|s| &s.origin_node_id == node_id)
                    .or_else(|| {
                        self.state
                            .refinements
                            .iter()
                            .rev()
                            .find(|s| &s.origin_node_id == node_id)
                    })
            })
            .map(|s| (s.id.clone(), s.label.clone()))
    }

    // ============================================================
    // Navigation
    // ============================================================

    /// Follow the committed (preferred) or temporary answer's successor.
    pub fn go_to_next(&mut self) -> bool {
        let Some(node) = self.current_node() else {
            return false;
        };
        let next = self.hub_successor(node).or_else(|| {
            let committed = self
                .state
                .answers
                .iter()
                .rev()
                .find(|s| s.origin_node_id == node.id)
                .and_then(|s| node.answer(&s.answer_id))
                .and_then(|a| a.next.clone());
            committed.or_else(|| {
                self.state
                    .temp_answers
                    .get(&node.id)
                    .and_then(|answer_id| node.answer(answer_id))
                    .and_then(|a| a.next.clone())
            })
        });
        self.advance_to(next, "go_to_next")
    }

    /// Bypass the question: follow the first answer or refinement answer with a successor.
    pub fn skip_to_next(&mut self) -> bool {
        let Some(node) = self.current_node() else {
            return false;
        };
        let next = self.hub_successor(node).or_else(|| {
            node.answers
                .iter()
                .chain(node.refinements.iter().flat_map(|r| r.answers.iter()))
                .find_map(|a| a.next.clone())
        });
        self.advance_to(next, "skip_to_next")
    }

    /// Pop history; the root always stays.
    pub fn previous(&mut self) -> bool {
        if self.state.history.len() <= 1 {
            debug!("previous: already at the bottom of history");
            return false;
        }
        let leaving = self.state.current_node_id.clone();
        self.clear_temporary(&leaving);
        self.state.history.pop();
        if let Some(top) = self.state.history.last() {
            self.state.current_node_id = top.clone();
        }
        debug!("previous: {} -> {}", leaving, self.state.current_node_id);
        true
    }

    /// Move to an existing node, discarding temporary state of the node being left.
    ///
    /// Jumping to the current node discards its temporary state but reports
    /// `false` since the position does not change.
    pub fn jump_to(&mut self, node_id: &str) -> bool {
        if !self.graph.has(node_id) {
            debug!("jump_to: unknown node {}", node_id);
            return false;
        }
        let leaving = self.state.current_node_id.clone();
        self.clear_temporary(&leaving);
        if leaving == node_id {
            debug!("jump_to: already at {}", node_id);
            return false;
        }
        self.move_to(node_id);
        true
    }

    /// Browse to a category entry point, keeping all temporary state.
    pub fn jump_to_category(&mut self, node_id: &str) -> bool {
        if self.state.current_node_id == node_id {
            return false;
        }
        if !self.graph.has(node_id) {
            debug!("jump_to_category: {} not in graph, moving anyway", node_id);
        }
        self.move_to(node_id);
        true
    }

    /// Return every piece of state to session start.
    pub fn reset(&mut self) {
        info!("reset session");
        self.state = InterviewState::new(&self.options.root_node);
    }

    fn move_to(&mut self, node_id: &str) {
        self.state.current_node_id = node_id.to_string();
        if !self.state.history.iter().any(|h| h == node_id) {
            self.state.history.push(node_id.to_string());
        }
    }

    fn hub_successor(&self, node: &Node) -> Option<String> {
        (node.is_weight_only()
            && node.id.starts_with(&self.options.hub_prefix)
            && node.id != self.options.hub_node)
            .then(|| self.options.hub_node.clone())
    }

    fn advance_to(&mut self, next: Option<String>, op: &str) -> bool {
        let Some(next) = next else {
            debug!("{}: no successor at {}", op, self.state.current_node_id);
            return false;
        };
        if !self.graph.has(&next) {
            debug!("{}: successor {} not in graph", op, next);
            return false;
        }
        let leaving = self.state.current_node_id.clone();
        self.clear_temporary(&leaving);
        self.state.history.push(next.clone());
        self.state.current_node_id = next;
        debug!("{}: {} -> {}", op, leaving, self.state.current_node_id);
        true
    }

    fn clear_temporary(&mut self, node_id: &str) {
        self.state.temp_answers.remove(node_id);
        self.state.temp_refinements.remove(node_id);
        self.state.temp_intensity.remove(node_id);
        if let Some(node) = self.graph.get(node_id) {
            for def in &node.weights {
                self.state.touched_weights.remove(&def.id);
            }
        }
    }

    // ============================================================
    // Removal
    // ============================================================

    /// Delete a committed answer or refinement and every weight bound to it.
    pub fn remove_selection(&mut self, selection_id: &str) -> bool {
        let before = self.state.answers.len() + self.state.refinements.len();
        self.state.answers.retain(|s| s.id != selection_id);
        self.state.refinements.retain(|s| s.id != selection_id);
        let removed = before != self.state.answers.len() + self.state.refinements.len();

        let weights_before = self.state.weights.len();
        self.state
            .weights
            .retain(|w| w.associated_selection_id.as_deref() != Some(selection_id));
        debug!(
            "remove_selection {}: removed={} cascaded_weights={}",
            selection_id,
            removed,
            weights_before - self.state.weights.len()
        );
        removed
    }

    /// Delete one committed weight, standalone or bound.
    pub fn remove_weight(&mut self, weight_id: &str) -> bool {
        let before = self.state.weights.len();
        self.state.weights.retain(|w| w.id != weight_id);
        before != self.state.weights.len()
    }

    // ============================================================
    // Custom elements
    // ============================================================

    /// Add an enabled fragment; blank text is ignored.
    pub fn add_custom_element(&mut self, text: &str, kind: ElementKind) -> Option<String> {
        if text.trim().is_empty() {
            return None;
        }
        let element = CustomElement {
            id: new_id(),
            text: text.trim().to_string(),
            enabled: true,
            kind,
        };
        let id = element.id.clone();
        self.state.custom_elements.push(element);
        Some(id)
    }

    pub fn remove_custom_element(&mut self, id: &str) -> bool {
        let before = self.state.custom_elements.len();
        self.state.custom_elements.retain(|c| c.id != id);
        before != self.state.custom_elements.len()
    }

    pub fn toggle_custom_element(&mut self, id: &str) -> bool {
        self.with_custom_element(id, |c| c.enabled = !c.enabled)
    }

    pub fn set_custom_element_kind(&mut self, id: &str, kind: ElementKind) -> bool {
        self.with_custom_element(id, |c| c.kind = kind)
    }

    pub fn update_custom_element_text(&mut self, id: &str, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        self.with_custom_element(id, |c| c.text = text.trim().to_string())
    }

    fn with_custom_element(&mut self, id: &str, f: impl FnOnce(&mut CustomElement)) -> bool {
        match self.state.custom_elements.iter_mut().find(|c| c.id == id) {
            Some(element) => {
                f(element);
                true
            }
            None => false,
        }
    }

    // ============================================================
    // Helpers
    // ============================================================

    fn weight_value(&self, def: &WeightDef) -> f64 {
        self.state
            .weight_values
            .get(&def.id)
            .copied()
            .unwrap_or(def.default)
    }

    fn is_slider_enabled(&self, weight_id: &str) -> bool {
        self.state
            .slider_enabled
            .get(weight_id)
            .copied()
            .unwrap_or(false)
    }

    fn has_refinement_selection(&self, node_id: &str) -> bool {
        self.state.temp_refinements.contains_key(node_id)
            || self.state.refinements.iter().any(|s| s.origin_node_id == node_id)
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}
