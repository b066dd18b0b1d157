//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/sceneprompt/sceneprompt.toml`
//! 3. Local config: `<dir>/.sceneprompt.toml`
//! 4. Environment variables: `SCENEPROMPT_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::application::services::InterviewOptions;
use crate::application::ApplicationError;
use crate::domain::expand_env_vars;

const APP_NAME: &str = "sceneprompt";
const ENV_PREFIX: &str = "SCENEPROMPT";

/// Node ids with special meaning and extra negative terms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InterviewConfig {
    pub root_node: String,
    pub body_type_node: String,
    pub hub_node: String,
    pub hub_prefix: String,
    /// Appended to every negative prompt after the fixed base terms
    pub extra_negative: Vec<String>,
}

impl Default for InterviewConfig {
    fn default() -> Self {
        let options = InterviewOptions::default();
        Self {
            root_node: options.root_node,
            body_type_node: options.body_type_node,
            hub_node: options.hub_node,
            hub_prefix: options.hub_prefix,
            extra_negative: options.extra_negative,
        }
    }
}

/// Raw interview config for intermediate parsing.
///
/// `None` means not specified, inherit from the layer below.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawInterviewConfig {
    pub root_node: Option<String>,
    pub body_type_node: Option<String>,
    pub hub_node: Option<String>,
    pub hub_prefix: Option<String>,
    pub extra_negative: Option<Vec<String>>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub graph: Option<PathBuf>,
    pub interview: RawInterviewConfig,
}

impl InterviewConfig {
    /// Merge arrays with union semantics and negation support.
    ///
    /// - Items from overlay are appended to base in order
    /// - Items prefixed with `!` remove the corresponding item from the result
    /// - Duplicates are de-duplicated, keeping the first occurrence
    ///
    /// Order is kept since the terms end up in the negative prompt.
    ///
    /// # Examples
    /// ```ignore
    /// merge_array(&["a", "b"], &["c"])       // → ["a", "b", "c"]
    /// merge_array(&["a", "b"], &["!a", "c"]) // → ["b", "c"]
    /// ```
    pub fn merge_array(base: &[String], overlay: &[String]) -> Vec<String> {
        let mut result: Vec<String> = base.iter().unique().cloned().collect();

        for term in overlay {
            if let Some(negated) = term.strip_prefix('!') {
                result.retain(|t| t != negated);
            } else if !result.contains(term) {
                result.push(term.clone());
            }
        }
        result
    }

    /// Merge overlay onto self: scalars replace, `extra_negative` unions.
    pub fn merge(&self, overlay: &RawInterviewConfig) -> Self {
        Self {
            extra_negative: overlay
                .extra_negative
                .as_ref()
                .map(|o| Self::merge_array(&self.extra_negative, o))
                .unwrap_or_else(|| self.extra_negative.clone()),
            ..self.apply_scalars(overlay)
        }
    }

    /// Apply global config onto defaults; arrays REPLACE instead of union.
    pub fn apply_global(&self, global: &RawInterviewConfig) -> Self {
        Self {
            extra_negative: global
                .extra_negative
                .clone()
                .unwrap_or_else(|| self.extra_negative.clone()),
            ..self.apply_scalars(global)
        }
    }

    fn apply_scalars(&self, overlay: &RawInterviewConfig) -> Self {
        let pick = |o: &Option<String>, base: &String| o.clone().unwrap_or_else(|| base.clone());
        Self {
            root_node: pick(&overlay.root_node, &self.root_node),
            body_type_node: pick(&overlay.body_type_node, &self.body_type_node),
            hub_node: pick(&overlay.hub_node, &self.hub_node),
            hub_prefix: pick(&overlay.hub_prefix, &self.hub_prefix),
            extra_negative: self.extra_negative.clone(),
        }
    }
}

/// Unified configuration for sceneprompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Question graph loaded when no `--graph` is given
    pub graph: PathBuf,
    pub interview: InterviewConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            graph: PathBuf::from("nodes.json"),
            interview: InterviewConfig::default(),
        }
    }
}

/// Get the XDG config directory for sceneprompt.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join(format!("{APP_NAME}.toml")))
}

/// Get the path to the local config file in a directory.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(format!(".{APP_NAME}.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Engine options derived from the `[interview]` table.
    pub fn interview_options(&self) -> InterviewOptions {
        InterviewOptions {
            root_node: self.interview.root_node.clone(),
            body_type_node: self.interview.body_type_node.clone(),
            hub_node: self.interview.hub_node.clone(),
            hub_prefix: self.interview.hub_prefix.clone(),
            extra_negative: self.interview.extra_negative.clone(),
        }
    }

    /// Expand `~`, `$VAR` and `${VAR}` in the graph path.
    fn expand_paths(&mut self) {
        let expanded = expand_env_vars(self.graph.to_string_lossy().as_ref());
        self.graph = PathBuf::from(expanded);
    }

    /// Merge a local layer: scalars replace, arrays union with negation.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            graph: overlay.graph.clone().unwrap_or_else(|| self.graph.clone()),
            interview: self.interview.merge(&overlay.interview),
        }
    }

    /// Apply the global layer: scalars and arrays replace.
    fn apply_global(&self, global: &RawSettings) -> Self {
        Self {
            graph: global.graph.clone().unwrap_or_else(|| self.graph.clone()),
            interview: self.interview.apply_global(&global.interview),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_dir` - Optional directory holding `.sceneprompt.toml`
    ///
    /// # Array Merge Semantics
    /// - Defaults → Global: REPLACE
    /// - Global → Local: UNION with `!term` negation
    /// - Any → Env vars: REPLACE
    pub fn load(local_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.apply_global(&raw);
            }
        }

        if let Some(dir) = local_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();

        Ok(current)
    }

    /// Apply `SCENEPROMPT_*` environment variables as explicit overrides.
    ///
    /// Nested keys use `__`: `SCENEPROMPT_INTERVIEW__ROOT_NODE=start`.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("interview.extra_negative")
                    .try_parsing(true),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("graph") {
            settings.graph = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("interview.root_node") {
            settings.interview.root_node = val;
        }
        if let Ok(val) = config.get_string("interview.body_type_node") {
            settings.interview.body_type_node = val;
        }
        if let Ok(val) = config.get_string("interview.hub_node") {
            settings.interview.hub_node = val;
        }
        if let Ok(val) = config.get_string("interview.hub_prefix") {
            settings.interview.hub_prefix = val;
        }
        if let Ok(val) = config.get::<Vec<String>>("interview.extra_negative") {
            settings.interview.extra_negative = val;
        } else if let Ok(val) = config.get_string("interview.extra_negative") {
            settings.interview.extra_negative = split_terms(&val);
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# sceneprompt configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/sceneprompt/sceneprompt.toml  (defines your baseline)
#   Local:  ./.sceneprompt.toml                     (project-specific additions)
#   Env:    SCENEPROMPT_* environment variables     (explicit overrides)
#
# Array Merge Semantics:
#   Global config REPLACES compiled defaults.
#   Local config UNIONS with global.
#   Use "!term" in local config to REMOVE an inherited item:
#     extra_negative = ["watermark", "!text"]

# Question graph (.json or .toml)
# graph = "~/prompts/nodes.json"

[interview]
# Node the interview starts at; its answers never get a subject suffix
# root_node = "root"

# Answers at this node are rendered as "<label> body type"
# body_type_node = "body_type"

# Weight-only nodes whose id starts with hub_prefix route back to hub_node
# hub_node = "nsfw_options"
# hub_prefix = "nsfw"

# Extra negative terms, appended after the built-in list
# extra_negative = ["watermark", "text"]
"#
        .to_string()
    }
}

fn split_terms(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn given_default_settings_then_interview_options_match_engine_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.interview_options(), InterviewOptions::default());
        assert_eq!(settings.graph, PathBuf::from("nodes.json"));
    }

    #[test]
    fn given_tilde_in_graph_when_expand_paths_then_expands_to_home() {
        let mut settings = Settings {
            graph: PathBuf::from("~/prompts/nodes.json"),
            ..Settings::default()
        };

        settings.expand_paths();

        let home = std::env::var("HOME").expect("HOME should be set");
        let graph = settings.graph.to_string_lossy();
        assert!(graph.starts_with(&home), "graph should start with home: {graph}");
        assert!(!graph.contains('~'));
    }

    #[rstest]
    #[case(&["a", "b"], &["c"], &["a", "b", "c"])]
    #[case(&["a", "b"], &["!a", "c"], &["b", "c"])]
    #[case(&["a", "b"], &["!x"], &["a", "b"])]
    #[case(&[], &["a"], &["a"])]
    #[case(&["a"], &[], &["a"])]
    #[case(&["a", "b"], &["a", "c"], &["a", "b", "c"])]
    #[case(&["watermark", "text"], &["frame"], &["watermark", "text", "frame"])]
    #[case(&["b", "a", "b"], &["!c"], &["b", "a"])]
    fn given_arrays_when_merging_then_unions_with_negation(
        #[case] base: &[&str],
        #[case] overlay: &[&str],
        #[case] expected: &[&str],
    ) {
        let result = InterviewConfig::merge_array(&strings(base), &strings(overlay));
        assert_eq!(result, strings(expected));
    }

    #[test]
    fn given_local_overlay_when_merging_then_scalars_replace_and_terms_union() {
        let base = InterviewConfig {
            extra_negative: strings(&["text", "watermark"]),
            ..InterviewConfig::default()
        };
        let overlay = RawInterviewConfig {
            root_node: Some("start".into()),
            extra_negative: Some(strings(&["!text", "frame"])),
            ..RawInterviewConfig::default()
        };

        let result = base.merge(&overlay);

        assert_eq!(result.root_node, "start");
        assert_eq!(result.hub_node, "nsfw_options");
        assert_eq!(result.extra_negative, strings(&["watermark", "frame"]));
    }

    #[test]
    fn given_global_overlay_when_applying_then_terms_replace() {
        let base = InterviewConfig {
            extra_negative: strings(&["text"]),
            ..InterviewConfig::default()
        };
        let global = RawInterviewConfig {
            extra_negative: Some(strings(&["watermark", "frame"])),
            ..RawInterviewConfig::default()
        };

        let result = base.apply_global(&global);

        assert_eq!(result.extra_negative, strings(&["watermark", "frame"]));
        assert_eq!(result.root_node, "root");
    }

    #[test]
    fn given_unspecified_terms_when_merging_then_keeps_base() {
        let base = InterviewConfig {
            extra_negative: strings(&["text"]),
            ..InterviewConfig::default()
        };

        let result = base.merge(&RawInterviewConfig::default());

        assert_eq!(result.extra_negative, strings(&["text"]));
    }

    #[test]
    fn given_comma_list_when_splitting_then_trims_and_drops_blanks() {
        assert_eq!(split_terms(" text, ,frame "), strings(&["text", "frame"]));
    }

    #[test]
    fn given_template_when_parsing_then_is_valid_toml() {
        let raw: RawSettings = toml::from_str(&Settings::template()).expect("template parses");
        assert!(raw.graph.is_none());
        assert!(raw.interview.extra_negative.is_none());
    }

    #[test]
    fn given_settings_when_serializing_then_round_trips_through_toml() {
        let settings = Settings::default();
        let text = settings.to_toml().expect("serialize");
        let back: Settings = toml::from_str(&text).expect("parse");
        assert_eq!(back, settings);
    }
}
