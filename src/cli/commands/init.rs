use anyhow::Result;

use super::{new_ballot, with_snapshot_lock};
use crate::ballot::RegistrationPolicy;
use crate::config::BallotConfig;
use crate::persistence::{BallotSnapshot, FileSystemSnapshotStore, SnapshotReason, SnapshotStore};

pub struct InitCommand {
    pub store: FileSystemSnapshotStore,
    pub settings: BallotConfig,
    pub admin: Option<String>,
    pub force: bool,
}

impl InitCommand {
    pub fn new(store: FileSystemSnapshotStore, settings: BallotConfig) -> Self {
        Self {
            store,
            settings,
            admin: None,
            force: false,
        }
    }

    pub fn with_admin(mut self, admin: Option<String>) -> Self {
        self.admin = admin;
        self
    }

    pub fn with_restricted_registration(mut self, restrict: bool) -> Self {
        if restrict {
            self.settings.registration_policy = RegistrationPolicy::RegisteringVotersOnly;
        }
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub async fn execute(&self) -> Result<()> {
        with_snapshot_lock(&self.store, || async {
            if self.store.exists().await && !self.force {
                println!(
                    "❌ A ballot already exists at {}",
                    self.store.path().display()
                );
                println!("💡 Use --force to start over");
                anyhow::bail!("ballot snapshot already exists");
            }

            let ballot = new_ballot(self.admin.as_deref(), &self.settings);
            let snapshot_id = self
                .store
                .save(&BallotSnapshot::capture(&ballot, SnapshotReason::Created))
                .await?;

            println!("✅ Ballot created at {}", self.store.path().display());
            println!("   👑 Administrator: {}", ballot.admin());
            println!("   📋 Registration: {:?}", ballot.registration_policy());
            println!("   🆔 Snapshot: {snapshot_id}");
            Ok(())
        })
        .await
    }
}
