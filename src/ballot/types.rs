// Core types for the ballot workflow

use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::BallotError;

/// Sequential proposal identifier; 0 is the genesis proposal
pub type ProposalId = u64;

/// Caller identity passed explicitly into every command and query
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

impl From<String> for Address {
    fn from(address: String) -> Self {
        Self(address)
    }
}

impl PartialEq<str> for Address {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// The single privileged identity of a ballot instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdminAuthority {
    address: Address,
}

impl AdminAuthority {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn is_admin(&self, caller: &Address) -> bool {
        &self.address == caller
    }

    pub fn authorize(&self, caller: &Address) -> Result<(), BallotError> {
        if self.is_admin(caller) {
            Ok(())
        } else {
            Err(BallotError::Unauthorized {
                caller: caller.clone(),
            })
        }
    }
}

/// Ballot phases, in strict forward order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WorkflowStatus {
    RegisteringVoters,
    ProposalsRegistrationStarted,
    ProposalsRegistrationEnded,
    VotingSessionStarted,
    VotingSessionEnded,
    VotesTallied,
}

impl WorkflowStatus {
    pub const ALL: [WorkflowStatus; 6] = [
        WorkflowStatus::RegisteringVoters,
        WorkflowStatus::ProposalsRegistrationStarted,
        WorkflowStatus::ProposalsRegistrationEnded,
        WorkflowStatus::VotingSessionStarted,
        WorkflowStatus::VotingSessionEnded,
        WorkflowStatus::VotesTallied,
    ];

    /// Position in the workflow, starting at 0
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn next(self) -> Option<WorkflowStatus> {
        Self::ALL.get(self.ordinal() as usize + 1).copied()
    }

    pub fn is_terminal(self) -> bool {
        self == WorkflowStatus::VotesTallied
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowStatus::RegisteringVoters => "RegisteringVoters",
            WorkflowStatus::ProposalsRegistrationStarted => "ProposalsRegistrationStarted",
            WorkflowStatus::ProposalsRegistrationEnded => "ProposalsRegistrationEnded",
            WorkflowStatus::VotingSessionStarted => "VotingSessionStarted",
            WorkflowStatus::VotingSessionEnded => "VotingSessionEnded",
            WorkflowStatus::VotesTallied => "VotesTallied",
        };
        f.write_str(name)
    }
}

/// Registry entry for an address. Unknown addresses read as `Voter::default()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    pub is_registered: bool,
    pub has_voted: bool,
    /// Only meaningful when `has_voted` is set
    pub voted_proposal_id: ProposalId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub description: String,
    pub vote_count: u64,
}

impl Proposal {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            vote_count: 0,
        }
    }
}

/// Whether the administrator may register voters after the registration phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationPolicy {
    #[default]
    AnyPhase,
    RegisteringVotersOnly,
}

/// Notifications emitted on the success path of a command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum BallotEvent {
    VoterRegistered {
        address: Address,
    },
    ProposalRegistered {
        proposal_id: ProposalId,
    },
    WorkflowStatusChange {
        previous_status: WorkflowStatus,
        new_status: WorkflowStatus,
    },
    Voted {
        voter: Address,
        proposal_id: ProposalId,
    },
}

impl fmt::Display for BallotEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BallotEvent::VoterRegistered { address } => write!(f, "VoterRegistered({address})"),
            BallotEvent::ProposalRegistered { proposal_id } => {
                write!(f, "ProposalRegistered({proposal_id})")
            }
            BallotEvent::WorkflowStatusChange {
                previous_status,
                new_status,
            } => write!(f, "WorkflowStatusChange({previous_status} -> {new_status})"),
            BallotEvent::Voted { voter, proposal_id } => {
                write!(f, "Voted({voter}, {proposal_id})")
            }
        }
    }
}
