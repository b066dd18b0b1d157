//! Replaying scripted sessions against the engine

use std::fs;
use std::sync::Arc;

use tempfile::TempDir;

use sceneprompt::application::services::{
    GraphFormat, GraphLoader, InterviewEngine, InterviewOptions, SessionEvent, SessionScript,
    SessionService,
};
use sceneprompt::application::ApplicationError;
use sceneprompt::domain::ElementKind;
use sceneprompt::infrastructure::traits::RealFileSystem;

const SCENE: &str = include_str!("fixtures/scene_graph.json");

fn engine() -> InterviewEngine {
    let graph = GraphLoader::parse(SCENE, GraphFormat::Json).expect("fixture graph");
    InterviewEngine::new(Arc::new(graph), InterviewOptions::default())
}

fn service() -> SessionService {
    SessionService::new(Arc::new(RealFileSystem))
}

#[test]
fn given_script_file_when_replaying_then_prompt_reflects_steps() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("walk.toml");
    fs::write(
        &path,
        r#"
[[step]]
op = "select"
answer = "female"

[[step]]
op = "commit"

[[step]]
op = "next"

[[step]]
op = "jump"
node = "hair"

[[step]]
op = "select"
answer = "red"

[[step]]
op = "refine"
refinement = "hair_length"
answer = "long"

[[step]]
op = "weight"
id = "hair_shine"
value = 0.6

[[step]]
op = "commit"

[[step]]
op = "custom"
text = "tattoos"

[[step]]
op = "custom"
text = "blurry"
kind = "negative"
"#,
    )
    .unwrap();
    let mut engine = engine();

    // Act
    let script = service().load_script(&path).unwrap();
    let report = service().replay(&mut engine, &script);

    // Assert
    assert_eq!(report.applied, 10);
    assert_eq!(report.ignored, 0);
    let result = engine.preview();
    assert_eq!(
        result.prompt,
        "female, red hair, long, (red shine in the hair:0.60), tattoos"
    );
    assert!(result.negative_prompt.ends_with(", blurry"));
}

#[test]
fn given_noop_steps_when_replaying_then_counts_them_as_ignored() {
    // Arrange
    let script = SessionScript {
        steps: vec![
            SessionEvent::Back,
            SessionEvent::Select {
                answer: "no_such_answer".into(),
            },
            SessionEvent::Commit,
            SessionEvent::Skip,
            SessionEvent::Custom {
                text: "   ".into(),
                kind: ElementKind::Prompt,
                enabled: true,
            },
        ],
    };
    let mut engine = engine();

    // Act
    let report = service().replay(&mut engine, &script);

    // Assert
    assert_eq!(report.applied, 1, "only skip moves");
    assert_eq!(report.ignored, 4);
    assert_eq!(engine.current_node_id(), "body_type");
}

#[test]
fn given_disabled_custom_step_when_replaying_then_element_is_kept_but_off() {
    let script = SessionScript {
        steps: vec![SessionEvent::Custom {
            text: "grain".into(),
            kind: ElementKind::Prompt,
            enabled: false,
        }],
    };
    let mut engine = engine();

    service().replay(&mut engine, &script);

    assert_eq!(engine.custom_elements().len(), 1);
    assert!(!engine.custom_elements()[0].enabled);
    assert_eq!(engine.preview().prompt, "");
}

#[test]
fn given_category_and_reset_steps_when_replaying_then_engine_starts_over() {
    let script = SessionScript {
        steps: vec![
            SessionEvent::Category {
                node: "mood".into(),
            },
            SessionEvent::Slider {
                id: "haze".into(),
                enabled: true,
            },
            SessionEvent::Intensity { value: 1.2 },
            SessionEvent::Reset,
        ],
    };
    let mut engine = engine();

    let report = service().replay(&mut engine, &script);

    assert_eq!(report.applied, 4);
    assert_eq!(engine.current_node_id(), "root");
    assert_eq!(engine.history(), ["root"]);
}

#[test]
fn given_invalid_script_when_loading_then_reports_path() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("bad.toml");
    fs::write(&path, "[[step]]\nop = \"select\"\n").unwrap();

    let result = service().load_script(&path);

    match result {
        Err(ApplicationError::InvalidScript { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected invalid script, got {other:?}"),
    }
}
