use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::ballot::{Command, ProposalId};

pub mod commands;

#[derive(Parser)]
#[command(name = "ballot-box")]
#[command(about = "Single-organizer ballot: register voters, collect proposals, vote, tally")]
#[command(long_about = "Ballot Box runs one ballot through its phases. The administrator registers voters \
                       and advances the workflow; registered voters submit proposals and cast one vote each. \
                       State is kept in a snapshot file between invocations.")]
pub struct Cli {
    /// Snapshot file to operate on
    #[arg(long, global = true, help = "Override storage.state_file_path from configuration")]
    pub state_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a fresh ballot snapshot
    Init {
        /// Administrator address
        #[arg(long, help = "Administrator address (defaults to ballot.admin from configuration)")]
        admin: Option<String>,
        /// Refuse voter registration once proposal registration has started
        #[arg(long, help = "Only allow voter registration during RegisteringVoters")]
        restrict_registration: bool,
        /// Overwrite an existing snapshot
        #[arg(long, help = "Overwrite an existing ballot snapshot")]
        force: bool,
    },
    /// Apply one command to the current ballot on behalf of a caller
    Exec {
        /// Identity issuing the command
        #[arg(long = "as", value_name = "ADDRESS", help = "Caller address")]
        caller: String,
        #[command(subcommand)]
        action: ExecAction,
    },
    /// Replay a JSON or TOML command log on a fresh ballot
    Replay {
        /// Command log file
        log: PathBuf,
        /// Administrator address
        #[arg(long, help = "Administrator address (defaults to ballot.admin from configuration)")]
        admin: Option<String>,
        /// Save the resulting ballot as the current snapshot
        #[arg(long, help = "Persist the replayed ballot to the snapshot file")]
        save: bool,
    },
    /// Show the phase, registry sizes and result of the current ballot
    Status {
        /// Registered voter to read proposals as
        #[arg(long = "as", value_name = "ADDRESS", help = "List proposals as this registered voter")]
        caller: Option<String>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ExecAction {
    /// Register a voter (administrator)
    RegisterVoter { address: String },
    /// Open proposal registration (administrator)
    StartProposals,
    /// Submit a proposal (registered voter)
    AddProposal { description: String },
    /// Close proposal registration (administrator)
    EndProposals,
    /// Open the voting session (administrator)
    StartVoting,
    /// Vote for a proposal (registered voter)
    Vote { proposal_id: ProposalId },
    /// Close the voting session (administrator)
    EndVoting,
    /// Count votes and record the winner (administrator)
    Tally,
}

impl ExecAction {
    pub fn into_command(self) -> Command {
        match self {
            ExecAction::RegisterVoter { address } => Command::RegisterVoter {
                address: address.into(),
            },
            ExecAction::StartProposals => Command::StartProposalsRegistering,
            ExecAction::AddProposal { description } => Command::AddProposal { description },
            ExecAction::EndProposals => Command::EndProposalsRegistering,
            ExecAction::StartVoting => Command::StartVotingSession,
            ExecAction::Vote { proposal_id } => Command::CastVote { proposal_id },
            ExecAction::EndVoting => Command::EndVotingSession,
            ExecAction::Tally => Command::TallyVotes,
        }
    }
}
