//! Domain entities: core data structures

use serde::{Deserialize, Serialize};

/// Attribute id reserved for per-selection emphasis weights.
pub const INTENSITY_ATTR: &str = "intensity";

/// One selectable answer of a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: String,
    pub label: String,
    /// Successor node id, absent for terminal answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

/// Numeric slider definition attached to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightDef {
    pub id: String,
    pub label: String,
    /// Phrase rendered as `(template:value)`
    pub template: String,
    #[serde(default = "default_min")]
    pub min: f64,
    #[serde(default = "default_max")]
    pub max: f64,
    #[serde(default = "default_step")]
    pub step: f64,
    #[serde(default = "default_weight")]
    pub default: f64,
    /// Semantic tags driving template normalization
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl WeightDef {
    /// Clamp a value into this definition's range.
    pub fn clamp(&self, value: f64) -> f64 {
        if self.min <= self.max {
            value.clamp(self.min, self.max)
        } else {
            value
        }
    }
}

fn default_min() -> f64 {
    0.0
}

fn default_max() -> f64 {
    2.0
}

fn default_step() -> f64 {
    0.05
}

fn default_weight() -> f64 {
    1.0
}

/// Follow-up question asked after a node's primary answer.
/// Same shape as a node, without further nesting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Refinement {
    pub id: String,
    pub question: String,
    #[serde(default)]
    pub answers: Vec<AnswerOption>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub weights: Vec<WeightDef>,
}

/// One question definition in the interview graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Filled from the graph key when loading a graph file
    #[serde(default, skip_serializing)]
    pub id: String,
    pub question: String,
    #[serde(default)]
    pub answers: Vec<AnswerOption>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub weights: Vec<WeightDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub refinements: Vec<Refinement>,
}

impl Node {
    pub fn answer(&self, answer_id: &str) -> Option<&AnswerOption> {
        self.answers.iter().find(|a| a.id == answer_id)
    }

    pub fn refinement(&self, refinement_id: &str) -> Option<&Refinement> {
        self.refinements.iter().find(|r| r.id == refinement_id)
    }

    pub fn weight(&self, weight_id: &str) -> Option<&WeightDef> {
        self.weights.iter().find(|w| w.id == weight_id)
    }

    /// Node carrying sliders only, no answers to pick.
    pub fn is_weight_only(&self) -> bool {
        self.answers.is_empty() && !self.weights.is_empty()
    }
}

impl From<&Refinement> for Node {
    fn from(r: &Refinement) -> Self {
        Self {
            id: r.id.clone(),
            question: r.question.clone(),
            answers: r.answers.clone(),
            weights: r.weights.clone(),
            refinements: Vec::new(),
        }
    }
}

/// A committed (or pending) choice of one answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// Durable id, assigned at commit time
    pub id: String,
    /// Node the choice was made at
    pub origin_node_id: String,
    /// Refinement sub-question the answer belongs to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refinement_id: Option<String>,
    pub answer_id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_text: Option<String>,
}

/// A committed numeric modifier.
///
/// Standalone when `associated_selection_id` is `None`, otherwise bound to exactly
/// one committed selection and removed together with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightInstance {
    pub id: String,
    pub attr_id: String,
    pub value: f64,
    pub template: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub associated_selection_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_label: Option<String>,
}

impl WeightInstance {
    pub fn is_intensity(&self) -> bool {
        self.attr_id == INTENSITY_ATTR
    }

    pub fn is_standalone(&self) -> bool {
        self.associated_selection_id.is_none()
    }
}

/// Target prompt of a custom element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    #[default]
    Prompt,
    Negative,
}

impl std::str::FromStr for ElementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "prompt" | "positive" => Ok(Self::Prompt),
            "negative" => Ok(Self::Negative),
            other => Err(format!("unknown element kind: {other}")),
        }
    }
}

/// Free-form user fragment, independent of the node graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomElement {
    pub id: String,
    pub text: String,
    pub enabled: bool,
    pub kind: ElementKind,
}

/// Output of prompt assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AssembledPrompt {
    pub prompt: String,
    pub negative_prompt: String,
}
