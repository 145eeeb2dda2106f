use anyhow::Result;

use super::load_ballot;
use crate::ballot::{Address, WorkflowStatus};
use crate::persistence::FileSystemSnapshotStore;

pub struct StatusCommand {
    pub store: FileSystemSnapshotStore,
    pub caller: Option<Address>,
}

impl StatusCommand {
    pub fn new(store: FileSystemSnapshotStore) -> Self {
        Self {
            store,
            caller: None,
        }
    }

    pub fn with_caller(mut self, caller: Option<String>) -> Self {
        self.caller = caller.map(Address::from);
        self
    }

    pub async fn execute(&self) -> Result<()> {
        let Some(ballot) = load_ballot(&self.store).await? else {
            println!("📭 No ballot at {}", self.store.path().display());
            println!("💡 Run 'ballot-box init' to create one");
            return Ok(());
        };

        println!("🗳️  Ballot at {}", self.store.path().display());
        println!("   👑 Administrator: {}", ballot.admin());
        println!("   🎯 Phase: {}", ballot.current_phase());
        println!("   👥 Voters: {}", ballot.voter_count());
        println!("   📝 Proposals: {}", ballot.proposal_count());
        println!("   ✉️  Votes cast: {}", ballot.votes_cast());
        if ballot.current_phase() == WorkflowStatus::VotesTallied {
            println!("   🏆 Winning proposal: {}", ballot.winning_proposal_id());
        }

        if let Some(caller) = &self.caller {
            println!();
            for proposal_id in 0..ballot.proposal_count() as u64 {
                match ballot.get_one_proposal(caller, proposal_id) {
                    Ok(proposal) => println!(
                        "   #{proposal_id} {} ({} votes)",
                        proposal.description, proposal.vote_count
                    ),
                    Err(error) => {
                        println!("❌ {error}");
                        return Err(error.into());
                    }
                }
            }
        }

        Ok(())
    }
}
