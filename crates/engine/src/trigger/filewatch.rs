//! Filewatch trigger: react to filesystem events against a configured path.
//!
//! Raw `notify` events are bridged onto a tokio channel; an event whose
//! mapped kind intersects the workflow's `events` set fires the pipeline.
//! No debouncing — consecutive matching events produce consecutive
//! executions, serialised through this task.

use std::path::Path;

use notify::event::{EventKind, ModifyKind};
use notify::{RecursiveMode, Watcher};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::EngineError;
use crate::metrics;
use crate::models::{WatchEvent, Workflow};
use crate::pipeline;
use crate::runtime::WorkflowRuntime;

/// Map a raw notify event kind onto the supported vocabulary. Events with
/// no counterpart (access, unclassified) are ignored.
fn map_event_kind(kind: &EventKind) -> Option<WatchEvent> {
    match kind {
        EventKind::Create(_) => Some(WatchEvent::Create),
        EventKind::Remove(_) => Some(WatchEvent::Remove),
        EventKind::Modify(ModifyKind::Name(_)) => Some(WatchEvent::Rename),
        EventKind::Modify(ModifyKind::Metadata(_)) => Some(WatchEvent::Chmod),
        EventKind::Modify(_) => Some(WatchEvent::Write),
        _ => None,
    }
}

pub async fn run(
    runtime: &WorkflowRuntime,
    workflow: &Workflow,
    path: &Path,
    events: &[WatchEvent],
    cancel: &CancellationToken,
) -> Result<(), EngineError> {
    if !path.exists() {
        return Err(EngineError::TriggerSetup {
            workflow: workflow.name.clone(),
            message: format!("watch path does not exist: {}", path.display()),
        });
    }

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |event| {
        // Dropped receiver just means the trigger is shutting down.
        let _ = tx.send(event);
    })
    .map_err(|e| EngineError::TriggerSetup {
        workflow: workflow.name.clone(),
        message: format!("failed to create file watcher: {e}"),
    })?;

    watcher
        .watch(path, RecursiveMode::NonRecursive)
        .map_err(|e| EngineError::TriggerSetup {
            workflow: workflow.name.clone(),
            message: format!("failed to watch path '{}': {e}", path.display()),
        })?;

    info!(
        workflow_name = %workflow.name,
        watching_path = %path.display(),
        events_to_watch = ?events,
        "file watch trigger started"
    );

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            received = rx.recv() => {
                let Some(received) = received else {
                    error!(workflow_name = %workflow.name, "file watcher channel closed");
                    break;
                };
                match received {
                    Ok(event) => {
                        debug!(
                            workflow_name = %workflow.name,
                            event_kind = ?event.kind,
                            paths = ?event.paths,
                            "raw filesystem event received"
                        );

                        let Some(mapped) = map_event_kind(&event.kind) else {
                            continue;
                        };
                        if !events.contains(&mapped) {
                            continue;
                        }

                        metrics::record_trigger_fire(&workflow.name, "filewatch");
                        info!(
                            workflow_name = %workflow.name,
                            event_type = %mapped,
                            file_path = ?event.paths.first(),
                            "file watch trigger fired"
                        );

                        pipeline::run_once(runtime, workflow, cancel).await;
                    }
                    Err(watch_error) => {
                        error!(
                            workflow_name = %workflow.name,
                            error = %watch_error,
                            "file watcher error"
                        );
                    }
                }
            }
        }
    }

    // Dropping the watcher releases the underlying OS watch.
    drop(watcher);
    info!(workflow_name = %workflow.name, "file watch trigger stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, MetadataKind, RemoveKind, RenameMode};

    #[test]
    fn event_kind_mapping() {
        assert_eq!(
            map_event_kind(&EventKind::Create(CreateKind::File)),
            Some(WatchEvent::Create)
        );
        assert_eq!(
            map_event_kind(&EventKind::Modify(ModifyKind::Data(DataChange::Content))),
            Some(WatchEvent::Write)
        );
        assert_eq!(
            map_event_kind(&EventKind::Modify(ModifyKind::Name(RenameMode::Any))),
            Some(WatchEvent::Rename)
        );
        assert_eq!(
            map_event_kind(&EventKind::Modify(ModifyKind::Metadata(
                MetadataKind::Permissions
            ))),
            Some(WatchEvent::Chmod)
        );
        assert_eq!(
            map_event_kind(&EventKind::Remove(RemoveKind::File)),
            Some(WatchEvent::Remove)
        );
        assert_eq!(map_event_kind(&EventKind::Any), None);
    }
}
