use anyhow::Result;

use super::{load_ballot, new_ballot, print_event, with_snapshot_lock};
use crate::ballot::{Address, Command};
use crate::config::BallotConfig;
use crate::persistence::{BallotSnapshot, FileSystemSnapshotStore, SnapshotReason, SnapshotStore};

/// Apply a single command to the stored ballot
pub struct ExecCommand {
    pub store: FileSystemSnapshotStore,
    pub settings: BallotConfig,
    pub caller: Address,
    pub command: Command,
}

impl ExecCommand {
    pub fn new(
        store: FileSystemSnapshotStore,
        settings: BallotConfig,
        caller: impl Into<Address>,
        command: Command,
    ) -> Self {
        Self {
            store,
            settings,
            caller: caller.into(),
            command,
        }
    }

    pub async fn execute(&self) -> Result<()> {
        with_snapshot_lock(&self.store, || async {
            let mut ballot = match load_ballot(&self.store).await? {
                Some(ballot) => ballot,
                None => {
                    tracing::info!(
                        file = ?self.store.path(),
                        "No ballot snapshot found, creating a new ballot"
                    );
                    new_ballot(None, &self.settings)
                }
            };

            match ballot.apply(&self.caller, &self.command) {
                Ok(events) => {
                    println!("✅ {} applied for {}", self.command.operation(), self.caller);
                    for event in &events {
                        print_event(event);
                    }
                    self.store
                        .save(&BallotSnapshot::capture(&ballot, SnapshotReason::CommandApplied))
                        .await?;
                    println!("🎯 Phase: {}", ballot.current_phase());
                    Ok(())
                }
                Err(error) => {
                    println!("❌ {} rejected: {error}", self.command.operation());
                    Err(error.into())
                }
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ballot::WorkflowStatus;
    use tempfile::TempDir;

    fn settings() -> BallotConfig {
        BallotConfig {
            admin: "owner".to_string(),
            registration_policy: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_exec_creates_ballot_and_persists_command() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSystemSnapshotStore::new(temp_dir.path().join("ballot.json"), true);

        ExecCommand::new(
            store.clone(),
            settings(),
            "owner",
            Command::RegisterVoter {
                address: "alice".into(),
            },
        )
        .execute()
        .await
        .unwrap();

        let ballot = load_ballot(&store).await.unwrap().unwrap();
        assert!(ballot.is_registered(&Address::from("alice")));
        assert_eq!(ballot.current_phase(), WorkflowStatus::RegisteringVoters);
    }

    #[tokio::test]
    async fn test_rejected_command_leaves_snapshot_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSystemSnapshotStore::new(temp_dir.path().join("ballot.json"), true);

        let result = ExecCommand::new(store.clone(), settings(), "mallory", Command::StartVotingSession)
            .execute()
            .await;

        assert!(result.is_err());
        assert!(!store.exists().await);
    }
}
