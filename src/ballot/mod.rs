// Ballot Module - Phased Voting Workflow
//
// A single administrator registers voters, opens and closes proposal
// registration and the voting session, then tallies. Voters submit
// proposals and cast one vote each.

pub mod types;
pub mod errors;
pub mod workflow;
pub mod store;
pub mod commands;

#[cfg(test)]
pub mod tests;

pub use types::{
    Address, AdminAuthority, BallotEvent, Proposal, ProposalId, RegistrationPolicy, Voter,
    WorkflowStatus,
};
pub use errors::{BallotError, StateError};
pub use workflow::{PhaseCommand, WorkflowController};
pub use store::{leading_proposal, Ballot, BallotState, GENESIS_DESCRIPTION};
pub use commands::{replay, Command, CommandLog, CommandOutcome, ReplayEntry, ReplayReport, SignedCommand};
