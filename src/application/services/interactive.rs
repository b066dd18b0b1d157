//! Interactive interview driver
//!
//! Presents the current question as a menu through the `Selector` boundary and
//! translates picks into engine operations until the user finishes or cancels.

use std::sync::Arc;

use tracing::debug;

use crate::application::services::interview::InterviewEngine;
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::AssembledPrompt;
use crate::infrastructure::traits::{SelectionItem, Selector};

/// What a menu entry does when picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuAction {
    Answer(String),
    Refine { refinement: String, answer: String },
    ToggleSlider(String),
    /// Move a slider by `steps` increments of its step size
    Nudge { weight: String, steps: i32 },
    CommitAndNext,
    Skip,
    Back,
    Preview,
    Finish,
}

/// One selectable menu line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub item: SelectionItem,
    pub action: MenuAction,
}

/// Drives one engine through a selector.
pub struct InteractiveSession<'a> {
    engine: &'a mut InterviewEngine,
    selector: Arc<dyn Selector>,
}

impl<'a> InteractiveSession<'a> {
    pub fn new(engine: &'a mut InterviewEngine, selector: Arc<dyn Selector>) -> Self {
        Self { engine, selector }
    }

    /// Run until finish or cancel, returning the prompt pair built from committed state.
    pub fn run(&mut self) -> ApplicationResult<AssembledPrompt> {
        self.run_with(|_| {})
    }

    /// Like `run`, handing every requested preview to `on_preview`.
    pub fn run_with(
        &mut self,
        mut on_preview: impl FnMut(&AssembledPrompt),
    ) -> ApplicationResult<AssembledPrompt> {
        loop {
            let entries = self.menu();
            let items: Vec<SelectionItem> = entries.iter().map(|e| e.item.clone()).collect();
            let prompt = self.prompt_line();

            let picked = self
                .selector
                .select_one(&items, &prompt)
                .map_err(|message| ApplicationError::Selection { message })?;
            let Some(picked) = picked else {
                debug!("run: selection cancelled");
                break;
            };
            let Some(entry) = entries.iter().find(|e| e.item.value == picked.value) else {
                debug!("run: unknown menu value {}", picked.value);
                continue;
            };
            if entry.action == MenuAction::Preview {
                on_preview(&self.engine.preview());
                continue;
            }
            if !self.apply(&entry.action) {
                break;
            }
        }
        Ok(self.engine.preview())
    }

    /// Apply one action; `false` ends the session.
    pub fn apply(&mut self, action: &MenuAction) -> bool {
        match action {
            MenuAction::Answer(answer) => {
                self.engine.select_answer(answer);
            }
            MenuAction::Refine { refinement, answer } => {
                self.engine.select_refinement(refinement, answer);
            }
            MenuAction::ToggleSlider(weight) => {
                let enabled = self
                    .engine
                    .active_weights()
                    .iter()
                    .any(|w| &w.def.id == weight && w.enabled);
                self.engine.set_slider_enabled(weight, !enabled);
            }
            MenuAction::Nudge { weight, steps } => {
                if let Some(active) = self.engine.active_weights().into_iter().find(|w| &w.def.id == weight) {
                    let value = active.value + f64::from(*steps) * active.def.step;
                    self.engine.set_weight_value(weight, value);
                }
            }
            MenuAction::CommitAndNext => {
                self.engine.commit_current_selections();
                self.engine.go_to_next();
            }
            MenuAction::Skip => {
                self.engine.skip_to_next();
            }
            MenuAction::Back => {
                self.engine.previous();
            }
            MenuAction::Preview => {}
            MenuAction::Finish => {
                self.engine.commit_current_selections();
                return false;
            }
        }
        true
    }

    /// Menu for the current node: answers, refinement answers, sliders, then actions.
    pub fn menu(&self) -> Vec<MenuEntry> {
        let mut actions: Vec<(String, MenuAction)> = Vec::new();

        if let Some(node) = self.engine.current_node() {
            let picked = self.engine.temporary_answer(&node.id);
            for answer in &node.answers {
                let mark = if picked == Some(answer.id.as_str()) { "*" } else { " " };
                actions.push((format!("{mark} {}", answer.label), MenuAction::Answer(answer.id.clone())));
            }

            let pending = self.engine.temporary_refinement(&node.id);
            for refinement in &node.refinements {
                for answer in &refinement.answers {
                    let chosen = pending
                        .is_some_and(|p| p.refinement_id == refinement.id && p.answer_id == answer.id);
                    let mark = if chosen { "*" } else { " " };
                    actions.push((
                        format!("{mark} {} -> {}", refinement.question, answer.label),
                        MenuAction::Refine {
                            refinement: refinement.id.clone(),
                            answer: answer.id.clone(),
                        },
                    ));
                }
            }

            for weight in self.engine.active_weights() {
                let state = if weight.enabled { "on" } else { "off" };
                actions.push((
                    format!("[{state}] {} ({:.2})", weight.def.label, weight.value),
                    MenuAction::ToggleSlider(weight.def.id.clone()),
                ));
                for (sign, steps) in [("+", 1), ("-", -1)] {
                    actions.push((
                        format!("[{sign}] {}", weight.def.label),
                        MenuAction::Nudge {
                            weight: weight.def.id.clone(),
                            steps,
                        },
                    ));
                }
            }
        }

        actions.push(("> commit and continue".into(), MenuAction::CommitAndNext));
        actions.push(("> skip question".into(), MenuAction::Skip));
        if self.engine.history().len() > 1 {
            actions.push(("> back".into(), MenuAction::Back));
        }
        actions.push(("> preview prompt".into(), MenuAction::Preview));
        actions.push(("> finish".into(), MenuAction::Finish));

        actions
            .into_iter()
            .enumerate()
            .map(|(idx, (label, action))| MenuEntry {
                item: SelectionItem {
                    display: format!("{:>2}. {}", idx + 1, label.trim()),
                    value: idx.to_string(),
                },
                action,
            })
            .collect()
    }

    fn prompt_line(&self) -> String {
        match self.engine.current_node() {
            Some(node) if self.engine.is_finished() => format!("{} (done) > ", node.question),
            Some(node) => format!("{} > ", node.question),
            None => format!("[{}] > ", self.engine.current_node_id()),
        }
    }
}
