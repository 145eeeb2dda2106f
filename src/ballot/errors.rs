use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::{Address, ProposalId, WorkflowStatus};

/// Rejections of a ballot command. A rejected command never mutates the ballot.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum BallotError {
    #[error("Unauthorized: {caller} is not the ballot administrator")]
    Unauthorized { caller: Address },

    #[error("Invalid phase transition: {operation} requires {expected}, ballot is in {current}")]
    InvalidPhaseTransition {
        operation: String,
        expected: WorkflowStatus,
        current: WorkflowStatus,
    },

    #[error("Already registered: {address}")]
    AlreadyRegistered { address: Address },

    #[error("Caller {caller} is not a registered voter")]
    CallerNotVoter { caller: Address },

    #[error("Proposal description cannot be empty")]
    EmptyProposal,

    #[error("Voter {voter} has already voted")]
    AlreadyVoted { voter: Address },

    #[error("Proposal {proposal_id} not found ({proposal_count} registered)")]
    ProposalNotFound {
        proposal_id: ProposalId,
        proposal_count: usize,
    },

    #[error("Voting session is not open (ballot is in {current})")]
    VotingNotOpen { current: WorkflowStatus },
}

impl BallotError {
    /// Stable short name of the error kind, used in logs and reports
    pub fn kind(&self) -> &'static str {
        match self {
            BallotError::Unauthorized { .. } => "Unauthorized",
            BallotError::InvalidPhaseTransition { .. } => "InvalidPhaseTransition",
            BallotError::AlreadyRegistered { .. } => "AlreadyRegistered",
            BallotError::CallerNotVoter { .. } => "CallerNotVoter",
            BallotError::EmptyProposal => "EmptyProposal",
            BallotError::AlreadyVoted { .. } => "AlreadyVoted",
            BallotError::ProposalNotFound { .. } => "ProposalNotFound",
            BallotError::VotingNotOpen { .. } => "VotingNotOpen",
        }
    }
}

/// A ballot state that cannot have been produced by applying commands
#[derive(Debug, Error)]
pub enum StateError {
    #[error("State validation error: {0}")]
    ValidationError(String),
}
