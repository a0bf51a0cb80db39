use tracing::{info, warn};

use super::types::{AgentAction, PlanFailure, PlanReport, StepOutcome, StepStatus};
use crate::github::{encode_content, ContentStore, FileIdentity, FileSet};
use crate::utils::ProbeError;

/// Applies agent plans to a content store, one action at a time.
///
/// The caller's `FileSet` mirrors the store and is updated after every
/// successful mutation, so later actions see the revisions produced by
/// earlier ones. The first failure stops the plan; nothing is rolled back.
pub struct PlanExecutor<'a, S: ContentStore + ?Sized> {
    store: &'a S,
    commit_prefix: String,
}

impl<'a, S: ContentStore + ?Sized> PlanExecutor<'a, S> {
    pub fn new(store: &'a S, commit_prefix: impl Into<String>) -> Self {
        Self {
            store,
            commit_prefix: commit_prefix.into(),
        }
    }

    pub async fn execute(
        &self,
        plan: &[AgentAction],
        files: &mut FileSet,
    ) -> Result<PlanReport, PlanFailure> {
        let mut report = PlanReport::default();

        for (index, action) in plan.iter().enumerate() {
            let step = index + 1;
            info!("step {}/{}: {}", step, plan.len(), action.explanation());

            match self.apply(action, files).await {
                Ok((status, detail)) => report.steps.push(StepOutcome {
                    step,
                    action: action.to_string(),
                    status,
                    detail,
                }),
                Err(reason) => {
                    return Err(PlanFailure {
                        step,
                        action: action.to_string(),
                        reason,
                        completed: report.steps,
                    })
                }
            }
        }

        Ok(report)
    }

    async fn apply(
        &self,
        action: &AgentAction,
        files: &mut FileSet,
    ) -> Result<(StepStatus, String), ProbeError> {
        let message = format!("{}: {}", self.commit_prefix, action.explanation());

        match action {
            AgentAction::CreateFile {
                file_path, content, ..
            } => {
                if files.contains(file_path) {
                    return Err(ProbeError::AlreadyExists(file_path.clone()));
                }
                let written = self
                    .store
                    .write_file(file_path, &encode_content(content), &message, None)
                    .await?;
                files.upsert(written);
                Ok((StepStatus::Applied, format!("Created {}", file_path)))
            }
            AgentAction::UpdateFile {
                file_path, content, ..
            } => {
                let existing = files
                    .get(file_path)
                    .ok_or_else(|| ProbeError::NotFound(file_path.clone()))?;
                let written = self
                    .store
                    .write_file(
                        file_path,
                        &encode_content(content),
                        &message,
                        Some(&existing.revision),
                    )
                    .await?;
                files.upsert(written);
                Ok((StepStatus::Applied, format!("Updated {}", file_path)))
            }
            AgentAction::DeleteFile { file_path, .. } => match files.get(file_path) {
                None => {
                    warn!("{} is not in the file list, skipping delete", file_path);
                    Ok((StepStatus::Skipped, format!("{} already absent", file_path)))
                }
                Some(identity) => {
                    self.delete_tolerant(&identity, &message, files).await?;
                    Ok((StepStatus::Applied, format!("Deleted {}", file_path)))
                }
            },
            AgentAction::DeleteFolder { folder_path, .. } => {
                let mut targets = files.under_folder(folder_path);
                if targets.is_empty() {
                    return Ok((
                        StepStatus::Skipped,
                        format!("No files under {}", folder_path),
                    ));
                }
                // deepest first; stable, so equal depths keep path order
                targets.sort_by(|a, b| b.depth().cmp(&a.depth()));

                for identity in &targets {
                    info!("deleting from folder: {}", identity.path);
                    self.delete_tolerant(identity, &message, files).await?;
                }
                Ok((
                    StepStatus::Applied,
                    format!("Deleted {} file(s) under {}", targets.len(), folder_path),
                ))
            }
            AgentAction::MoveFile {
                source_path,
                destination_path,
                ..
            } => {
                self.move_file(source_path, destination_path, &message, files)
                    .await?;
                Ok((
                    StepStatus::Applied,
                    format!("Moved {} to {}", source_path, destination_path),
                ))
            }
            AgentAction::MoveFolder { .. }
            | AgentAction::CopyFile { .. }
            | AgentAction::CopyFolder { .. } => Err(ProbeError::UnsupportedAction(format!(
                "{} is not supported; ask for file-by-file operations instead",
                action.action_type()
            ))),
        }
    }

    /// Delete with the mirror's marker; a store-side "not found" counts as done
    async fn delete_tolerant(
        &self,
        identity: &FileIdentity,
        message: &str,
        files: &mut FileSet,
    ) -> Result<(), ProbeError> {
        match self
            .store
            .delete_file(&identity.path, &identity.revision, message)
            .await
        {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {
                warn!("{} was already deleted in the store", identity.path);
            }
            Err(err) => return Err(with_path(err, &identity.path)),
        }
        files.remove(&identity.path);
        Ok(())
    }

    /// Read, create at destination, delete source. Not atomic: a failed
    /// delete leaves both files in place and is reported as a partial move.
    async fn move_file(
        &self,
        source_path: &str,
        destination_path: &str,
        message: &str,
        files: &mut FileSet,
    ) -> Result<(), ProbeError> {
        let source = files
            .get(source_path)
            .ok_or_else(|| ProbeError::NotFound(source_path.to_string()))?;

        let remote = self.store.read_file(source_path).await?;
        let created = self
            .store
            .write_file(
                destination_path,
                &remote.encoded_content,
                &format!("{} (create destination)", message),
                None,
            )
            .await?;
        files.upsert(created);

        if let Err(err) = self
            .store
            .delete_file(
                source_path,
                &source.revision,
                &format!("{} (delete source)", message),
            )
            .await
        {
            warn!(
                "{} was created but {} could not be deleted",
                destination_path, source_path
            );
            return Err(ProbeError::PartialMove {
                source_path: source_path.to_string(),
                destination_path: destination_path.to_string(),
                reason: Box::new(err),
            });
        }
        files.remove(source_path);
        Ok(())
    }
}

fn with_path(err: ProbeError, path: &str) -> ProbeError {
    match err {
        ProbeError::RemoteStore { status, message } => ProbeError::RemoteStore {
            status,
            message: format!("{}: {}", path, message),
        },
        other => other,
    }
}

/// Convenience wrapper around [`PlanExecutor::execute`]
pub async fn execute_plan<S: ContentStore + ?Sized>(
    store: &S,
    plan: &[AgentAction],
    files: &mut FileSet,
    commit_prefix: &str,
) -> Result<PlanReport, PlanFailure> {
    PlanExecutor::new(store, commit_prefix)
        .execute(plan, files)
        .await
}
