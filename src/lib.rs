// Ballot Box Library - Phased Single-Organizer Voting
// This exposes the core components for testing and integration

pub mod ballot;
pub mod cli;
pub mod config;
pub mod persistence;
pub mod telemetry;

// Re-export key types for easy access
pub use ballot::{
    leading_proposal, replay, Address, Ballot, BallotError, BallotEvent, BallotState, Command,
    CommandLog, CommandOutcome, Proposal, ProposalId, RegistrationPolicy, ReplayReport,
    SignedCommand, Voter, WorkflowStatus,
};
pub use config::{config, log_env_file_status, BallotBoxConfig};
pub use persistence::{
    BallotSnapshot, FileSystemSnapshotStore, PersistenceError, SnapshotLock, SnapshotReason,
    SnapshotStore,
};
pub use telemetry::{create_command_span, generate_correlation_id, init_telemetry};
