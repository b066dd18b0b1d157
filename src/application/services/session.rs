//! Scripted sessions
//!
//! A session script is a TOML list of `[[step]]` tables, each one engine event.
//! Replaying a script drives an engine exactly as a presentation layer would.
//!
//! ```toml
//! [[step]]
//! op = "select"
//! answer = "female"
//!
//! [[step]]
//! op = "commit"
//!
//! [[step]]
//! op = "next"
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::application::services::interview::InterviewEngine;
use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::ElementKind;
use crate::infrastructure::traits::FileSystem;

/// One presentation-layer event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SessionEvent {
    Select {
        answer: String,
    },
    Refine {
        refinement: String,
        answer: String,
    },
    Intensity {
        value: f64,
    },
    Weight {
        id: String,
        value: f64,
    },
    Slider {
        id: String,
        enabled: bool,
    },
    Commit,
    Next,
    Skip,
    Back,
    Jump {
        node: String,
    },
    Category {
        node: String,
    },
    Custom {
        text: String,
        #[serde(default)]
        kind: ElementKind,
        #[serde(default = "enabled_by_default")]
        enabled: bool,
    },
    Reset,
}

fn enabled_by_default() -> bool {
    true
}

impl SessionEvent {
    /// Apply to an engine; `false` when the engine treated the event as a no-op.
    pub fn apply(&self, engine: &mut InterviewEngine) -> bool {
        match self {
            Self::Select { answer } => engine.select_answer(answer),
            Self::Refine { refinement, answer } => engine.select_refinement(refinement, answer),
            Self::Intensity { value } => engine.set_intensity(*value),
            Self::Weight { id, value } => engine.set_weight_value(id, *value),
            Self::Slider { id, enabled } => engine.set_slider_enabled(id, *enabled),
            Self::Commit => !engine.commit_current_selections().is_empty(),
            Self::Next => engine.go_to_next(),
            Self::Skip => engine.skip_to_next(),
            Self::Back => engine.previous(),
            Self::Jump { node } => engine.jump_to(node),
            Self::Category { node } => engine.jump_to_category(node),
            Self::Custom {
                text,
                kind,
                enabled,
            } => match engine.add_custom_element(text, *kind) {
                Some(id) if !enabled => engine.toggle_custom_element(&id),
                Some(_) => true,
                None => false,
            },
            Self::Reset => {
                engine.reset();
                true
            }
        }
    }
}

/// Ordered list of events.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionScript {
    #[serde(default, rename = "step")]
    pub steps: Vec<SessionEvent>,
}

/// Counts from replaying a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplayReport {
    pub applied: usize,
    pub ignored: usize,
}

/// Service for loading and replaying session scripts.
pub struct SessionService {
    fs: Arc<dyn FileSystem>,
}

impl SessionService {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Read and parse a script file.
    pub fn load_script(&self, path: &Path) -> ApplicationResult<SessionScript> {
        debug!("load_script: path={}", path.display());
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read session script", path)?;
        toml::from_str(&content).map_err(|e| ApplicationError::InvalidScript {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Apply every step in order.
    pub fn replay(&self, engine: &mut InterviewEngine, script: &SessionScript) -> ReplayReport {
        let mut report = ReplayReport::default();
        for (idx, step) in script.steps.iter().enumerate() {
            if step.apply(engine) {
                report.applied += 1;
            } else {
                debug!("replay: step {} had no effect: {:?}", idx + 1, step);
                report.ignored += 1;
            }
        }
        info!(
            "replay: {} applied, {} ignored, at node {}",
            report.applied,
            report.ignored,
            engine.current_node_id()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_script_toml_when_parsing_then_reads_steps_in_order() {
        let script: SessionScript = toml::from_str(
            r#"
[[step]]
op = "select"
answer = "female"

[[step]]
op = "commit"

[[step]]
op = "custom"
text = "blurry"
kind = "negative"
enabled = false
"#,
        )
        .expect("parse script");

        assert_eq!(
            script.steps,
            vec![
                SessionEvent::Select {
                    answer: "female".into()
                },
                SessionEvent::Commit,
                SessionEvent::Custom {
                    text: "blurry".into(),
                    kind: ElementKind::Negative,
                    enabled: false
                },
            ]
        );
    }

    #[test]
    fn given_unknown_op_when_parsing_then_fails() {
        let result: Result<SessionScript, _> = toml::from_str("[[step]]\nop = \"dance\"\n");
        assert!(result.is_err());
    }
}
