//! Prompt assembly: committed state in, prompt pair out.
//!
//! Part order is fixed: answers, refinements, weights, enabled prompt custom elements.
//! Output depends only on the inputs; identical inputs give byte-identical output.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::trace;

use crate::domain::entities::{AssembledPrompt, CustomElement, ElementKind, Selection, WeightInstance};
use crate::domain::expander::{expand, is_intensity_adjective};
use crate::domain::normalizer::normalize;
use crate::domain::sanitizer::{GrammarSanitizer, Sanitizer};
use crate::domain::subject::extract_subject;

/// Fixed head of every negative prompt.
pub const BASE_NEGATIVE: &[&str] = &[
    "deformed",
    "distorted",
    "extra limbs",
    "low detail",
    "low quality",
    "bad anatomy",
];

const PART_SEPARATOR: &str = ", ";
const BODY_TYPE_SUFFIX: &str = " body type";

/// Node ids and terms the assembler treats specially.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyRules {
    /// Answers at the root get no subject; intensity bound to root answers is dropped
    pub root_node: String,
    /// Answers here get a " body type" suffix
    pub body_type_node: String,
    /// Appended to the negative prompt after the fixed base
    pub extra_negative: Vec<String>,
}

impl Default for AssemblyRules {
    fn default() -> Self {
        Self {
            root_node: "root".into(),
            body_type_node: "body_type".into(),
            extra_negative: Vec::new(),
        }
    }
}

/// Turns committed selections, weights and custom elements into prompt text.
#[derive(Clone)]
pub struct PromptAssembler {
    rules: AssemblyRules,
    sanitizer: Arc<dyn Sanitizer>,
}

impl std::fmt::Debug for PromptAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptAssembler")
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self::new(AssemblyRules::default(), Arc::new(GrammarSanitizer))
    }
}

impl PromptAssembler {
    pub fn new(rules: AssemblyRules, sanitizer: Arc<dyn Sanitizer>) -> Self {
        Self { rules, sanitizer }
    }

    pub fn rules(&self) -> &AssemblyRules {
        &self.rules
    }

    pub fn assemble(
        &self,
        answers: &[Selection],
        refinements: &[Selection],
        weights: &[WeightInstance],
        custom: &[CustomElement],
    ) -> AssembledPrompt {
        let mut parts: Vec<String> = Vec::new();

        parts.extend(answers.iter().map(|a| self.answer_part(a)).filter(|p| !p.is_empty()));

        parts.extend(
            refinements
                .iter()
                .map(|r| expand(&r.label, r.question_text.as_deref().unwrap_or_default()))
                .filter(|p| !p.is_empty()),
        );

        let mut emitted: HashSet<String> = HashSet::new();
        for weight in weights {
            let Some(text) = self.weight_text(weight, answers, refinements) else {
                continue;
            };
            if text.is_empty() || !emitted.insert(text.clone()) {
                trace!("assemble: skip duplicate weight text {:?}", text);
                continue;
            }
            parts.push(format!("({}:{:.2})", text, weight.value));
        }

        parts.extend(
            custom
                .iter()
                .filter(|c| c.enabled && c.kind == ElementKind::Prompt && !c.text.trim().is_empty())
                .map(|c| c.text.clone()),
        );

        let negative: Vec<String> = BASE_NEGATIVE
            .iter()
            .map(|s| s.to_string())
            .chain(self.rules.extra_negative.iter().cloned())
            .chain(
                custom
                    .iter()
                    .filter(|c| c.enabled && c.kind == ElementKind::Negative && !c.text.trim().is_empty())
                    .map(|c| c.text.clone()),
            )
            .collect();

        AssembledPrompt {
            prompt: parts.join(PART_SEPARATOR),
            negative_prompt: negative.join(PART_SEPARATOR),
        }
    }

    fn answer_part(&self, answer: &Selection) -> String {
        let question = answer.question_text.as_deref();
        let mut label = match question {
            Some(q) => expand(&answer.label, q),
            None => answer.label.trim().to_lowercase(),
        };

        if answer.origin_node_id == self.rules.body_type_node {
            label.push_str(BODY_TYPE_SUFFIX);
        } else if answer.origin_node_id != self.rules.root_node && !is_intensity_adjective(&answer.label) {
            if let Some(subject) = question.and_then(extract_subject) {
                // "Green eyes" under "What are the eyes like?" stays "green eyes"
                if !label.contains(&subject) {
                    label = format!("{label} {subject}");
                }
            }
        }
        label
    }

    /// Sanitized text of a weight fragment, `None` when the weight is not emitted.
    fn weight_text(
        &self,
        weight: &WeightInstance,
        answers: &[Selection],
        refinements: &[Selection],
    ) -> Option<String> {
        if weight.is_intensity() {
            let label = weight.selection_label.as_deref()?;
            let bound_to_root = weight
                .associated_selection_id
                .as_deref()
                .and_then(|id| answers.iter().chain(refinements).find(|s| s.id == id))
                .is_some_and(|s| s.origin_node_id == self.rules.root_node);
            if bound_to_root {
                return None;
            }
            return Some(self.sanitize(label, &weight.tags));
        }

        let mut template = weight.template.clone();
        if let Some(label) = weight.selection_label.as_deref() {
            let label = label.trim().to_lowercase();
            if !template.to_lowercase().contains(&label) {
                template = format!("{label} {template}");
            }
        }
        Some(self.sanitize(&template, &weight.tags))
    }

    fn sanitize(&self, text: &str, tags: &[String]) -> String {
        self.sanitizer.sanitize(&normalize(text, tags), tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection(id: &str, origin: &str, label: &str, question: Option<&str>) -> Selection {
        Selection {
            id: id.into(),
            origin_node_id: origin.into(),
            refinement_id: None,
            answer_id: label.to_lowercase(),
            label: label.into(),
            question_text: question.map(str::to_string),
        }
    }

    fn weight(attr: &str, template: &str, value: f64, bound: Option<(&str, &str)>) -> WeightInstance {
        WeightInstance {
            id: format!("w-{attr}-{value}"),
            attr_id: attr.into(),
            value,
            template: template.into(),
            tags: vec![],
            associated_selection_id: bound.map(|(id, _)| id.to_string()),
            selection_label: bound.map(|(_, label)| label.to_string()),
        }
    }

    fn element(text: &str, enabled: bool, kind: ElementKind) -> CustomElement {
        CustomElement {
            id: text.into(),
            text: text.into(),
            enabled,
            kind,
        }
    }

    fn base_negative() -> String {
        BASE_NEGATIVE.join(", ")
    }

    #[test]
    fn given_root_answer_only_when_assembling_then_prompt_is_lowercased_label() {
        let answers = vec![selection("s1", "root", "Male", Some("What is the character's gender?"))];

        let out = PromptAssembler::default().assemble(&answers, &[], &[], &[]);

        assert_eq!(out.prompt, "male");
        assert_eq!(
            out.negative_prompt,
            "deformed, distorted, extra limbs, low detail, low quality, bad anatomy"
        );
    }

    #[test]
    fn given_abstract_answer_in_breast_question_when_assembling_then_uses_anatomical_phrase() {
        let answers = vec![selection("s1", "bust", "Subtle", Some("What is the breast shape?"))];

        let out = PromptAssembler::default().assemble(&answers, &[], &[], &[]);

        assert_eq!(out.prompt, "subtle breast definition with gentle anatomical silhouette");
    }

    #[test]
    fn given_body_type_answer_when_assembling_then_appends_body_type_suffix() {
        let answers = vec![selection("s1", "body_type", "Athletic", Some("What is the body type?"))];

        let out = PromptAssembler::default().assemble(&answers, &[], &[], &[]);

        assert_eq!(out.prompt, "athletic body type");
    }

    #[test]
    fn given_concrete_answer_when_assembling_then_appends_question_subject() {
        let answers = vec![selection("s1", "hair_color", "Blonde", Some("What is the hair color?"))];

        let out = PromptAssembler::default().assemble(&answers, &[], &[], &[]);

        assert_eq!(out.prompt, "blonde hair color");
    }

    #[test]
    fn given_label_already_naming_subject_when_assembling_then_subject_is_not_repeated() {
        let answers = vec![selection("s2", "eyes", "Green eyes", Some("What are the eyes like?"))];

        let out = PromptAssembler::default().assemble(&answers, &[], &[], &[]);

        assert_eq!(out.prompt, "green eyes");
    }

    #[test]
    fn given_refinement_when_assembling_then_expanded_without_subject() {
        let refinements = vec![selection("r1", "hair_color", "Bold", Some("What lighting on the hair?"))];

        let out = PromptAssembler::default().assemble(&[], &refinements, &[], &[]);

        assert_eq!(out.prompt, "bold lighting");
    }

    #[test]
    fn given_bound_weight_when_assembling_then_label_prefixes_template() {
        let weights = vec![weight("augmentations", "augmentations", 0.75, Some(("s1", "Cybernetic")))];

        let out = PromptAssembler::default().assemble(&[], &[], &weights, &[]);

        assert_eq!(out.prompt, "(cybernetic augmentations:0.75)");
    }

    #[test]
    fn given_template_containing_label_when_assembling_then_does_not_prefix() {
        let weights = vec![weight("glow", "Cybernetic glow", 1.2, Some(("s1", "cybernetic")))];

        let out = PromptAssembler::default().assemble(&[], &[], &weights, &[]);

        assert_eq!(out.prompt, "(cybernetic glow:1.20)");
    }

    #[test]
    fn given_value_with_many_digits_when_assembling_then_renders_two_decimals() {
        let weights = vec![weight("glow", "glow", 1.0 / 3.0, None)];

        let out = PromptAssembler::default().assemble(&[], &[], &weights, &[]);

        assert_eq!(out.prompt, "(glow:0.33)");
    }

    #[test]
    fn given_duplicate_weight_texts_when_assembling_then_first_value_wins() {
        let weights = vec![
            weight("glow", "Glow", 0.5, None),
            weight("glow2", " glow ", 1.5, None),
        ];

        let out = PromptAssembler::default().assemble(&[], &[], &weights, &[]);

        assert_eq!(out.prompt, "(glow:0.50)");
    }

    #[test]
    fn given_intensity_bound_to_root_answer_when_assembling_then_skipped() {
        let answers = vec![selection("s1", "root", "Female", None)];
        let weights = vec![weight("intensity", "", 1.3, Some(("s1", "Female")))];

        let out = PromptAssembler::default().assemble(&answers, &[], &weights, &[]);

        assert_eq!(out.prompt, "female");
    }

    #[test]
    fn given_intensity_bound_to_non_root_answer_when_assembling_then_emits_label_weight() {
        let answers = vec![selection("s1", "hair_style", "Braids", None)];
        let weights = vec![weight("intensity", "", 1.3, Some(("s1", "Braids")))];

        let out = PromptAssembler::default().assemble(&answers, &[], &weights, &[]);

        assert_eq!(out.prompt, "braids, (braids:1.30)");
    }

    #[test]
    fn given_intensity_without_label_when_assembling_then_dropped() {
        let weights = vec![weight("intensity", "", 1.3, None)];

        let out = PromptAssembler::default().assemble(&[], &[], &weights, &[]);

        assert_eq!(out.prompt, "");
    }

    #[test]
    fn given_custom_elements_when_assembling_then_only_enabled_ones_appear() {
        let custom = vec![
            element("tattoos", true, ElementKind::Prompt),
            element("blurry", false, ElementKind::Negative),
            element("watermark", true, ElementKind::Negative),
        ];
        let answers = vec![selection("s1", "root", "Male", None)];

        let out = PromptAssembler::default().assemble(&answers, &[], &[], &custom);

        assert_eq!(out.prompt, "male, tattoos");
        assert!(!out.negative_prompt.contains("blurry"));
        assert_eq!(out.negative_prompt, format!("{}, watermark", base_negative()));
    }

    #[test]
    fn given_extra_negative_rules_when_assembling_then_follow_base_list() {
        let rules = AssemblyRules {
            extra_negative: vec!["jpeg artifacts".into()],
            ..AssemblyRules::default()
        };
        let assembler = PromptAssembler::new(rules, Arc::new(GrammarSanitizer));

        let out = assembler.assemble(&[], &[], &[], &[element("blur", true, ElementKind::Negative)]);

        assert_eq!(out.negative_prompt, format!("{}, jpeg artifacts, blur", base_negative()));
    }

    #[test]
    fn given_identical_inputs_when_assembling_twice_then_identical_output() {
        let answers = vec![selection("s1", "hair_color", "Red", Some("What is the hair color?"))];
        let weights = vec![
            weight("shine", "shine", 0.8, Some(("s1", "Red"))),
            weight("intensity", "", 1.1, Some(("s1", "Red"))),
        ];
        let custom = vec![element("freckles", true, ElementKind::Prompt)];
        let assembler = PromptAssembler::default();

        let first = assembler.assemble(&answers, &[], &weights, &custom);
        let second = assembler.assemble(&answers, &[], &weights, &custom);

        assert_eq!(first, second);
        assert_eq!(
            first.prompt,
            "red hair color, (red shine:0.80), (red:1.10), freckles"
        );
    }
}
