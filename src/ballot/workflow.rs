use serde::{Deserialize, Serialize};
use statig::prelude::*;

use super::errors::BallotError;
use super::types::WorkflowStatus;

/// Administrator commands that move the ballot forward by one phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseCommand {
    StartProposalsRegistering,
    EndProposalsRegistering,
    StartVotingSession,
    EndVotingSession,
    TallyVotes,
}

impl PhaseCommand {
    pub const SEQUENCE: [PhaseCommand; 5] = [
        PhaseCommand::StartProposalsRegistering,
        PhaseCommand::EndProposalsRegistering,
        PhaseCommand::StartVotingSession,
        PhaseCommand::EndVotingSession,
        PhaseCommand::TallyVotes,
    ];

    pub fn operation(self) -> &'static str {
        match self {
            PhaseCommand::StartProposalsRegistering => "start_proposals_registering",
            PhaseCommand::EndProposalsRegistering => "end_proposals_registering",
            PhaseCommand::StartVotingSession => "start_voting_session",
            PhaseCommand::EndVotingSession => "end_voting_session",
            PhaseCommand::TallyVotes => "tally_votes",
        }
    }

    /// The only status this command may be issued from
    pub fn from_status(self) -> WorkflowStatus {
        match self {
            PhaseCommand::StartProposalsRegistering => WorkflowStatus::RegisteringVoters,
            PhaseCommand::EndProposalsRegistering => WorkflowStatus::ProposalsRegistrationStarted,
            PhaseCommand::StartVotingSession => WorkflowStatus::ProposalsRegistrationEnded,
            PhaseCommand::EndVotingSession => WorkflowStatus::VotingSessionStarted,
            PhaseCommand::TallyVotes => WorkflowStatus::VotingSessionEnded,
        }
    }

    pub fn to_status(self) -> WorkflowStatus {
        match self {
            PhaseCommand::StartProposalsRegistering => WorkflowStatus::ProposalsRegistrationStarted,
            PhaseCommand::EndProposalsRegistering => WorkflowStatus::ProposalsRegistrationEnded,
            PhaseCommand::StartVotingSession => WorkflowStatus::VotingSessionStarted,
            PhaseCommand::EndVotingSession => WorkflowStatus::VotingSessionEnded,
            PhaseCommand::TallyVotes => WorkflowStatus::VotesTallied,
        }
    }

    /// The command that leaves `status`, if any
    pub fn leaving(status: WorkflowStatus) -> Option<PhaseCommand> {
        Self::SEQUENCE
            .into_iter()
            .find(|command| command.from_status() == status)
    }
}

/// Phase graph driven by statig. Holds no data; the ballot store owns the rest.
#[derive(Debug, Default)]
pub struct PhaseMachine;

#[state_machine(
    initial = "State::registering_voters()",
    state(derive(Debug, Clone, PartialEq, Eq))
)]
impl PhaseMachine {
    #[state]
    fn registering_voters(event: &PhaseCommand) -> Outcome<State> {
        match event {
            PhaseCommand::StartProposalsRegistering => {
                Transition(State::proposals_registration_started())
            }
            _ => Handled,
        }
    }

    #[state]
    fn proposals_registration_started(event: &PhaseCommand) -> Outcome<State> {
        match event {
            PhaseCommand::EndProposalsRegistering => {
                Transition(State::proposals_registration_ended())
            }
            _ => Handled,
        }
    }

    #[state]
    fn proposals_registration_ended(event: &PhaseCommand) -> Outcome<State> {
        match event {
            PhaseCommand::StartVotingSession => Transition(State::voting_session_started()),
            _ => Handled,
        }
    }

    #[state]
    fn voting_session_started(event: &PhaseCommand) -> Outcome<State> {
        match event {
            PhaseCommand::EndVotingSession => Transition(State::voting_session_ended()),
            _ => Handled,
        }
    }

    #[state]
    fn voting_session_ended(event: &PhaseCommand) -> Outcome<State> {
        match event {
            PhaseCommand::TallyVotes => Transition(State::votes_tallied()),
            _ => Handled,
        }
    }

    #[state]
    fn votes_tallied(event: &PhaseCommand) -> Outcome<State> {
        tracing::debug!(event = ?event, "Ballot already tallied, ignoring phase command");
        Handled
    }
}

/// Owns the current phase and is the only thing allowed to advance it
pub struct WorkflowController {
    machine: StateMachine<PhaseMachine>,
}

impl std::fmt::Debug for WorkflowController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowController")
            .field("status", &self.status())
            .finish()
    }
}

impl Default for WorkflowController {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowController {
    pub fn new() -> Self {
        Self {
            machine: PhaseMachine.state_machine(),
        }
    }

    /// Rebuild a controller at `status` by walking the forward transitions
    pub fn resume_at(status: WorkflowStatus) -> Self {
        let mut controller = Self::new();
        while controller.status() < status {
            let Some(command) = PhaseCommand::leaving(controller.status()) else {
                break;
            };
            controller.machine.handle(&command);
        }
        controller
    }

    pub fn status(&self) -> WorkflowStatus {
        match self.machine.state() {
            State::RegisteringVoters { .. } => WorkflowStatus::RegisteringVoters,
            State::ProposalsRegistrationStarted { .. } => {
                WorkflowStatus::ProposalsRegistrationStarted
            }
            State::ProposalsRegistrationEnded { .. } => WorkflowStatus::ProposalsRegistrationEnded,
            State::VotingSessionStarted { .. } => WorkflowStatus::VotingSessionStarted,
            State::VotingSessionEnded { .. } => WorkflowStatus::VotingSessionEnded,
            State::VotesTallied { .. } => WorkflowStatus::VotesTallied,
        }
    }

    /// Fails with `InvalidPhaseTransition` unless the ballot is in `status`
    pub fn require(&self, operation: &str, status: WorkflowStatus) -> Result<(), BallotError> {
        let current = self.status();
        if current == status {
            Ok(())
        } else {
            Err(BallotError::InvalidPhaseTransition {
                operation: operation.to_string(),
                expected: status,
                current,
            })
        }
    }

    /// Validate that `command` is legal right now without applying it
    pub fn check(&self, command: PhaseCommand) -> Result<(), BallotError> {
        self.require(command.operation(), command.from_status())
    }

    /// Apply `command`, returning `(previous, new)` statuses
    pub fn advance(
        &mut self,
        command: PhaseCommand,
    ) -> Result<(WorkflowStatus, WorkflowStatus), BallotError> {
        self.check(command)?;
        let previous = self.status();
        self.machine.handle(&command);
        let current = self.status();
        debug_assert_eq!(current, command.to_status());
        Ok((previous, current))
    }
}
