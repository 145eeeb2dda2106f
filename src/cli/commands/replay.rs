use anyhow::Result;
use std::path::PathBuf;

use super::{new_ballot, print_event, with_snapshot_lock};
use crate::ballot::{replay, CommandLog, CommandOutcome, ReplayReport, WorkflowStatus};
use crate::config::BallotConfig;
use crate::persistence::{BallotSnapshot, FileSystemSnapshotStore, SnapshotReason, SnapshotStore};

/// Run a command log against a fresh ballot
pub struct ReplayCommand {
    pub store: FileSystemSnapshotStore,
    pub settings: BallotConfig,
    pub log_path: PathBuf,
    pub admin: Option<String>,
    pub save: bool,
}

impl ReplayCommand {
    pub fn new(store: FileSystemSnapshotStore, settings: BallotConfig, log_path: PathBuf) -> Self {
        Self {
            store,
            settings,
            log_path,
            admin: None,
            save: false,
        }
    }

    pub fn with_admin(mut self, admin: Option<String>) -> Self {
        self.admin = admin;
        self
    }

    pub fn with_save(mut self, save: bool) -> Self {
        self.save = save;
        self
    }

    pub async fn execute(&self) -> Result<ReplayReport> {
        let log = CommandLog::load(&self.log_path)?;
        println!(
            "📋 Replaying {} commands from {}",
            log.len(),
            self.log_path.display()
        );

        let ballot = new_ballot(self.admin.as_deref(), &self.settings);
        let report = replay(ballot, &log.commands);

        for entry in &report.entries {
            match &entry.outcome {
                CommandOutcome::Applied { events } => {
                    println!(
                        "✅ #{} {} by {}",
                        entry.index,
                        entry.command.operation(),
                        entry.caller
                    );
                    for event in events {
                        print_event(event);
                    }
                }
                CommandOutcome::Rejected { error } => {
                    println!(
                        "❌ #{} {} by {}: {error}",
                        entry.index,
                        entry.command.operation(),
                        entry.caller
                    );
                }
            }
        }

        println!();
        println!(
            "📊 {} applied, {} rejected",
            report.applied_count(),
            report.rejected_count()
        );
        println!("🎯 Phase: {}", report.ballot.current_phase());
        if report.ballot.current_phase() == WorkflowStatus::VotesTallied {
            println!("🏆 Winning proposal: {}", report.ballot.winning_proposal_id());
        }

        if self.save {
            with_snapshot_lock(&self.store, || async {
                self.store
                    .save(&BallotSnapshot::capture(&report.ballot, SnapshotReason::Replayed))
                    .await?;
                Ok(())
            })
            .await?;
            println!("💾 Saved to {}", self.store.path().display());
        }

        Ok(report)
    }
}
