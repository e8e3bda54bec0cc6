//! CLI smoke entry point.
//!
//! # Responsibility
//! - Boot a task-board store, seed a sample project and print its summary.
//! - Keep output deterministic apart from generated ids and timestamps.

use log::error;
use serde_json::json;
use std::process::ExitCode;
use taskboard_core::{
    default_log_level, init_stderr_logging, record, CoreStore, ProjectExtension, StoreError,
};

fn main() -> ExitCode {
    if let Err(err) = init_stderr_logging(default_log_level()) {
        eprintln!("logging disabled: {err}");
    }

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_run module=cli status=error error={err}");
            eprintln!("taskboard: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), StoreError> {
    println!("taskboard_core ping={}", taskboard_core::ping());
    println!("taskboard_core version={}", taskboard_core::core_version());

    let core = CoreStore::new()?;
    let project = core
        .projects()
        .create(record([("name", json!("Launch")), ("status", json!("active"))]));
    for (title, status) in [
        ("Write docs", "done"),
        ("Ship build", "todo"),
        ("Review", "in-progress"),
        ("Announce", "done"),
    ] {
        core.tasks().create(record([
            ("projectId", json!(project.id())),
            ("title", json!(title)),
            ("status", json!(status)),
        ]));
    }

    if let Some(ext) = project.ext::<ProjectExtension>() {
        println!(
            "project={} tasks={} progress={}%",
            ext.display_name(),
            ext.task_count(),
            ext.progress()
        );
    }
    let snapshot = serde_json::to_string_pretty(&core.tasks().json())?;
    println!("{snapshot}");
    Ok(())
}
