//! Command dispatch

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use itertools::Itertools;
use termtree::Tree;
use tracing::{debug, instrument};

use crate::application::services::InteractiveSession;
use crate::application::ApplicationError;
use crate::cli::args::{Cli, Commands, ConfigCommands, GraphCommands};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{expand_env_vars, AssembledPrompt, DomainError, NodeGraph};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::traits::{FileSystem, RealFileSystem};
use crate::infrastructure::InfraError;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Completion { shell }) => _completion(*shell),
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Show => _config_show(&load_container(cli)?),
            ConfigCommands::Init { global } => _config_init(&local_dir(cli)?, *global),
            ConfigCommands::Path => _config_path(&local_dir(cli)?),
        },
        Some(Commands::Graph { command }) => {
            let container = load_container(cli)?;
            match command {
                GraphCommands::Validate => _graph_validate(&container),
                GraphCommands::Show { node } => _graph_show(&container, node),
                GraphCommands::Tree { from, depth } => _graph_tree(&container, from.as_deref(), *depth),
            }
        }
        Some(Commands::Run { script, json }) => _run(&load_container(cli)?, script, *json),
        Some(Commands::Interview { json }) => _interview(&load_container(cli)?, *json),
        None => Ok(()),
    }
}

fn local_dir(cli: &Cli) -> CliResult<PathBuf> {
    match &cli.config_dir {
        Some(dir) => Ok(dir.clone()),
        None => std::env::current_dir()
            .map_err(|e| CliError::from(InfraError::io("resolve current directory", e))),
    }
}

/// Settings from all layers, with `--graph` taking precedence over config.
fn load_container(cli: &Cli) -> CliResult<ServiceContainer> {
    let dir = local_dir(cli)?;
    let mut settings = Settings::load(Some(&dir))?;
    if let Some(graph) = &cli.graph {
        settings.graph = PathBuf::from(expand_env_vars(&graph.to_string_lossy()));
    }
    debug!("graph={}", settings.graph.display());
    Ok(ServiceContainer::new(settings))
}

fn load_graph(container: &ServiceContainer) -> CliResult<Arc<NodeGraph>> {
    let graph = container.graph_loader().load(&container.settings.graph)?;
    Ok(Arc::new(graph))
}

fn print_prompt(result: &AssembledPrompt, json: bool) -> CliResult<()> {
    if json {
        let text = serde_json::to_string_pretty(result).map_err(|e| ApplicationError::OperationFailed {
            context: "serialize prompt".into(),
            source: Box::new(e),
        })?;
        output::info(&text);
    } else {
        output::prompt_pair(result);
    }
    Ok(())
}

#[instrument]
fn _completion(shell: Shell) -> CliResult<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
    Ok(())
}

#[instrument(skip(container))]
fn _graph_validate(container: &ServiceContainer) -> CliResult<()> {
    let path = &container.settings.graph;
    let graph = container.graph_loader().load_unchecked(path)?;
    let defects = graph.defects(&container.settings.interview.root_node);

    if defects.is_empty() {
        output::success(&format!("{}: {} nodes, no defects", path.display(), graph.len()));
        return Ok(());
    }

    output::header(&format!("{}: {} defects", path.display(), defects.len()));
    for defect in &defects {
        output::defect(defect);
    }
    Err(ApplicationError::Domain(DomainError::InvalidGraph(defects)).into())
}

#[instrument(skip(container))]
fn _graph_show(container: &ServiceContainer, node_id: &str) -> CliResult<()> {
    let graph = load_graph(container)?;
    let node = graph
        .get(node_id)
        .ok_or_else(|| CliError::InvalidArgs(format!("unknown node: {node_id}")))?;

    let kind = if graph.is_refinement(node_id) { " (refinement)" } else { "" };
    output::header(&format!("{}{kind}: {}", node.id, node.question));

    for answer in &node.answers {
        match &answer.next {
            Some(next) => output::detail(&format!("{} [{}] -> {next}", answer.label, answer.id)),
            None => output::detail(&format!("{} [{}]", answer.label, answer.id)),
        }
    }
    for refinement in &node.refinements {
        output::field("refinement", &format!("{} [{}]", refinement.question, refinement.id));
        for answer in &refinement.answers {
            output::detail(&format!("  {} [{}]", answer.label, answer.id));
        }
    }
    for weight in &node.weights {
        output::field(
            "weight",
            &format!(
                "{} [{}] {:.2}..{:.2} step {:.2} default {:.2}",
                weight.label, weight.id, weight.min, weight.max, weight.step, weight.default
            ),
        );
    }
    Ok(())
}

#[instrument(skip(container))]
fn _graph_tree(container: &ServiceContainer, from: Option<&str>, depth: Option<usize>) -> CliResult<()> {
    let graph = load_graph(container)?;
    let start = from.unwrap_or(&container.settings.interview.root_node);
    if !graph.has(start) {
        return Err(CliError::InvalidArgs(format!("unknown node: {start}")));
    }
    output::info(&graph_tree(&graph, start, depth));
    Ok(())
}

/// Reachable nodes from `start`; nodes already shown elsewhere are not expanded again.
pub fn graph_tree(graph: &NodeGraph, start: &str, depth: Option<usize>) -> Tree<String> {
    let mut seen = HashSet::new();
    grow(graph, start, 0, depth, &mut seen)
}

fn grow(
    graph: &NodeGraph,
    id: &str,
    level: usize,
    depth: Option<usize>,
    seen: &mut HashSet<String>,
) -> Tree<String> {
    let Some(node) = graph.get(id) else {
        return Tree::new(format!("{id} (missing)"));
    };
    if !seen.insert(id.to_string()) {
        return Tree::new(format!("{id} ..."));
    }

    let mut tree = Tree::new(format!("{id}: {}", node.question));
    if depth.is_some_and(|max| level >= max) {
        return tree;
    }

    let children = node
        .answers
        .iter()
        .filter_map(|a| a.next.as_deref())
        .chain(node.refinements.iter().map(|r| r.id.as_str()))
        .unique()
        .collect::<Vec<_>>();
    for child in children {
        tree.push(grow(graph, child, level + 1, depth, seen));
    }
    tree
}

#[instrument(skip(container))]
fn _run(container: &ServiceContainer, script_path: &Path, json: bool) -> CliResult<()> {
    let graph = load_graph(container)?;
    let sessions = container.session_service();
    let script = sessions.load_script(script_path)?;

    let mut engine = container.engine(graph);
    let report = sessions.replay(&mut engine, &script);
    if report.ignored > 0 {
        output::warning(&format!("{} of {} steps had no effect", report.ignored, script.steps.len()));
    }
    print_prompt(&engine.preview(), json)
}

#[instrument(skip(container))]
fn _interview(container: &ServiceContainer, json: bool) -> CliResult<()> {
    let graph = load_graph(container)?;
    let mut engine = container.engine(graph);

    let result = InteractiveSession::new(&mut engine, container.selector.clone()).run_with(output::preview)?;
    print_prompt(&result, json)
}

#[instrument(skip(container))]
fn _config_show(container: &ServiceContainer) -> CliResult<()> {
    output::info(&container.settings.to_toml()?);
    Ok(())
}

#[instrument]
fn _config_init(dir: &Path, global: bool) -> CliResult<()> {
    let path = if global {
        global_config_path().ok_or_else(|| ApplicationError::Config {
            message: "cannot determine global config directory".into(),
        })?
    } else {
        local_config_path(dir)
    };

    let fs = RealFileSystem;
    if fs.exists(&path) {
        return Err(CliError::Usage(format!("config file already exists: {}", path.display())));
    }
    fs.ensure_parent(&path)
        .map_err(|e| InfraError::io(format!("create directory for {}", path.display()), e))?;
    fs.write(&path, &Settings::template())
        .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;

    output::success(&format!("created {}", path.display()));
    Ok(())
}

#[instrument]
fn _config_path(dir: &Path) -> CliResult<()> {
    let fs = RealFileSystem;
    let describe = |path: &Path| {
        let state = if fs.exists(path) { "exists" } else { "not found" };
        format!("{} ({state})", path.display())
    };

    match global_config_path() {
        Some(path) => output::field("global", &describe(&path)),
        None => output::field("global", "unavailable"),
    }
    output::field("local", &describe(&local_config_path(dir)));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AnswerOption, Node, Refinement};

    fn answer(id: &str, next: Option<&str>) -> AnswerOption {
        AnswerOption {
            id: id.into(),
            label: id.into(),
            next: next.map(str::to_string),
        }
    }

    fn node(id: &str, answers: Vec<AnswerOption>) -> Node {
        Node {
            id: id.into(),
            question: format!("{id}?"),
            answers,
            weights: vec![],
            refinements: vec![],
        }
    }

    fn graph() -> NodeGraph {
        let mut root = node("root", vec![answer("a", Some("hair")), answer("b", Some("hair"))]);
        root.refinements.push(Refinement {
            id: "root_detail".into(),
            question: "Detail?".into(),
            answers: vec![answer("fine", None)],
            weights: vec![],
        });
        NodeGraph::from_nodes(vec![
            root,
            node("hair", vec![answer("back", Some("root"))]),
        ])
        .expect("graph")
    }

    #[test]
    fn given_cycle_when_rendering_tree_then_repeated_node_is_not_expanded() {
        let rendered = graph_tree(&graph(), "root", None).to_string();

        assert!(rendered.starts_with("root: root?"));
        assert_eq!(rendered.matches("hair: hair?").count(), 1);
        assert!(rendered.contains("root ..."));
        assert!(rendered.contains("root_detail: Detail?"));
    }

    #[test]
    fn given_depth_limit_when_rendering_tree_then_stops_at_depth() {
        let rendered = graph_tree(&graph(), "root", Some(0)).to_string();
        assert_eq!(rendered.trim_end(), "root: root?");
    }
}
