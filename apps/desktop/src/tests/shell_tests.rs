use super::*;

use std::{
    fs,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use client_core::{DetectorApi, NoticeLevel};

fn offline_controller() -> WorkflowController {
    let api = DetectorApi::new("http://127.0.0.1:9").expect("api");
    WorkflowController::new(Arc::new(api))
}

#[test]
fn parses_commands_and_arguments() {
    assert_eq!(
        parse_command("select  ./bite photo.jpg "),
        Ok(ShellCommand::Select(PathBuf::from("./bite photo.jpg")))
    );
    assert_eq!(
        parse_command("drop a.png b.png"),
        Ok(ShellCommand::Drop(vec![
            PathBuf::from("a.png"),
            PathBuf::from("b.png")
        ]))
    );
    assert_eq!(parse_command("drop"), Ok(ShellCommand::Drop(Vec::new())));
    assert_eq!(parse_command("PREDICT"), Ok(ShellCommand::Predict));
    assert_eq!(parse_command("   "), Ok(ShellCommand::Nothing));
    assert_eq!(parse_command("exit"), Ok(ShellCommand::Quit));
}

#[test]
fn rejects_malformed_commands() {
    assert!(parse_command("select").is_err());
    assert!(parse_command("clear now").is_err());
    assert!(parse_command("upload x.png").is_err());
}

#[tokio::test]
async fn predict_without_selection_only_emits_notice() {
    let mut controller = offline_controller();
    let mut events = controller.subscribe_events();
    let mut out = String::new();

    let flow = execute(&mut controller, ShellCommand::Predict, &mut out).await;
    assert_eq!(flow, Flow::Continue);
    assert!(out.is_empty());
    assert_eq!(drain_notices(&mut events), ["✗ Please select an image first"]);
}

#[tokio::test]
async fn select_status_and_clear_round_trip() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("bedbug_shell_{suffix}"));
    fs::create_dir_all(&dir).expect("temp dir");
    let path = dir.join("bite.png");
    fs::write(&path, b"png").expect("write");

    let mut controller = offline_controller();
    let mut out = String::new();
    execute(&mut controller, ShellCommand::Select(path.clone()), &mut out).await;
    assert!(out.starts_with("selected"), "{out}");

    let report = status(&controller);
    assert!(report.contains("state: Selected"), "{report}");
    assert!(report.contains("bite.png (image/png, 3 bytes"), "{report}");

    out.clear();
    execute(&mut controller, ShellCommand::Clear, &mut out).await;
    assert_eq!(controller.state(), WorkflowState::Empty);
    assert!(status(&controller).contains("file: none"));

    fs::remove_dir_all(dir).expect("cleanup");
}

#[tokio::test]
async fn dropping_a_text_file_is_rejected() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("bedbug_shell_drop_{suffix}"));
    fs::create_dir_all(&dir).expect("temp dir");
    let path = dir.join("notes.txt");
    fs::write(&path, b"hello").expect("write");

    let mut controller = offline_controller();
    let mut events = controller.subscribe_events();
    let mut out = String::new();
    execute(&mut controller, ShellCommand::Drop(vec![path]), &mut out).await;

    assert_eq!(controller.state(), WorkflowState::Empty);
    assert!(!controller.is_drag_active());
    let notices = drain_notices(&mut events);
    assert_eq!(notices, ["✗ Please select a valid image file"]);

    fs::remove_dir_all(dir).expect("cleanup");
}

#[test]
fn notice_marks_success_and_error() {
    let notice = client_core::Notice {
        level: NoticeLevel::Success,
        message: "Prediction completed!".into(),
    };
    assert_eq!(render::notice(&notice), "✓ Prediction completed!");
}
