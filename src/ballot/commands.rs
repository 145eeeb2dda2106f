// Command log: the ballot as a deterministic reducer over caller-tagged commands

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use super::errors::BallotError;
use super::store::Ballot;
use super::types::{Address, BallotEvent, ProposalId};
use crate::telemetry::{create_command_span, generate_correlation_id};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    RegisterVoter { address: Address },
    StartProposalsRegistering,
    AddProposal { description: String },
    EndProposalsRegistering,
    StartVotingSession,
    CastVote { proposal_id: ProposalId },
    EndVotingSession,
    TallyVotes,
}

impl Command {
    pub fn operation(&self) -> &'static str {
        match self {
            Command::RegisterVoter { .. } => "register_voter",
            Command::StartProposalsRegistering => "start_proposals_registering",
            Command::AddProposal { .. } => "add_proposal",
            Command::EndProposalsRegistering => "end_proposals_registering",
            Command::StartVotingSession => "start_voting_session",
            Command::CastVote { .. } => "cast_vote",
            Command::EndVotingSession => "end_voting_session",
            Command::TallyVotes => "tally_votes",
        }
    }
}

/// One entry of a command log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedCommand {
    pub caller: Address,
    #[serde(flatten)]
    pub command: Command,
}

impl SignedCommand {
    pub fn new(caller: impl Into<Address>, command: Command) -> Self {
        Self {
            caller: caller.into(),
            command,
        }
    }
}

/// Ordered list of commands, loadable from JSON or TOML
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandLog {
    pub commands: Vec<SignedCommand>,
}

impl CommandLog {
    /// Load a log file; `.toml` files are parsed as TOML, anything else as JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read command log {}", path.display()))?;

        let is_toml = path.extension().and_then(|ext| ext.to_str()) == Some("toml");
        let log = if is_toml {
            toml::from_str(&contents)
                .with_context(|| format!("Invalid TOML command log {}", path.display()))?
        } else {
            serde_json::from_str(&contents)
                .with_context(|| format!("Invalid JSON command log {}", path.display()))?
        };
        Ok(log)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    Applied { events: Vec<BallotEvent> },
    Rejected { error: BallotError },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayEntry {
    pub index: usize,
    pub caller: Address,
    pub command: Command,
    pub outcome: CommandOutcome,
}

#[derive(Debug)]
pub struct ReplayReport {
    pub entries: Vec<ReplayEntry>,
    pub ballot: Ballot,
}

impl ReplayReport {
    pub fn applied_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.outcome, CommandOutcome::Applied { .. }))
            .count()
    }

    pub fn rejected_count(&self) -> usize {
        self.entries.len() - self.applied_count()
    }
}

impl Ballot {
    /// Apply one command on behalf of `caller`, returning the events it emitted
    pub fn apply(
        &mut self,
        caller: &Address,
        command: &Command,
    ) -> Result<Vec<BallotEvent>, BallotError> {
        let correlation_id = generate_correlation_id();
        let span = create_command_span(command.operation(), caller.as_str(), &correlation_id);
        let _guard = span.enter();

        let mark = self.journal_len();
        let result = match command {
            Command::RegisterVoter { address } => self.register_voter(caller, address.clone()),
            Command::StartProposalsRegistering => self.start_proposals_registering(caller),
            Command::AddProposal { description } => {
                self.add_proposal(caller, description.as_str()).map(|_| ())
            }
            Command::EndProposalsRegistering => self.end_proposals_registering(caller),
            Command::StartVotingSession => self.start_voting_session(caller),
            Command::CastVote { proposal_id } => self.cast_vote(caller, *proposal_id),
            Command::EndVotingSession => self.end_voting_session(caller),
            Command::TallyVotes => self.tally_votes(caller).map(|_| ()),
        };

        match result {
            Ok(()) => Ok(self.events()[mark..].to_vec()),
            Err(error) => {
                warn!(
                    caller = %caller,
                    operation = command.operation(),
                    kind = error.kind(),
                    status = %self.current_phase(),
                    "Command rejected: {}",
                    error
                );
                Err(error)
            }
        }
    }
}

/// Apply every entry of `log` to `ballot` in order. Rejected entries are
/// recorded and skipped; they never stop the replay.
pub fn replay(mut ballot: Ballot, log: &[SignedCommand]) -> ReplayReport {
    let mut entries = Vec::with_capacity(log.len());

    for (index, entry) in log.iter().enumerate() {
        let outcome = match ballot.apply(&entry.caller, &entry.command) {
            Ok(events) => CommandOutcome::Applied { events },
            Err(error) => CommandOutcome::Rejected { error },
        };
        entries.push(ReplayEntry {
            index,
            caller: entry.caller.clone(),
            command: entry.command.clone(),
            outcome,
        });
    }

    let report = ReplayReport { entries, ballot };
    info!(
        commands = log.len(),
        applied = report.applied_count(),
        rejected = report.rejected_count(),
        status = %report.ballot.current_phase(),
        "Command log replayed"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ballot::WorkflowStatus;

    #[test]
    fn test_signed_command_json_shape() {
        let json = r#"{"caller": "owner", "command": "register_voter", "address": "alice"}"#;
        let entry: SignedCommand = serde_json::from_str(json).unwrap();

        assert_eq!(entry.caller, Address::from("owner"));
        assert_eq!(
            entry.command,
            Command::RegisterVoter {
                address: Address::from("alice")
            }
        );
    }

    #[test]
    fn test_unit_command_uses_command_tag() {
        let entry: SignedCommand =
            serde_json::from_str(r#"{"caller":"owner","command":"tally_votes"}"#).unwrap();
        assert_eq!(entry.command, Command::TallyVotes);

        let json = serde_json::to_value(SignedCommand::new(
            "alice",
            Command::CastVote { proposal_id: 1 },
        ))
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"caller": "alice", "command": "cast_vote", "proposal_id": 1})
        );
    }

    #[test]
    fn test_command_log_from_toml() {
        let toml_log = r#"
            [[commands]]
            caller = "owner"
            command = "start_proposals_registering"

            [[commands]]
            caller = "alice"
            command = "cast_vote"
            proposal_id = 2
        "#;
        let log: CommandLog = toml::from_str(toml_log).unwrap();

        assert_eq!(log.len(), 2);
        assert_eq!(log.commands[0].command, Command::StartProposalsRegistering);
        assert_eq!(log.commands[1].command, Command::CastVote { proposal_id: 2 });
    }

    #[test]
    fn test_apply_returns_only_new_events() {
        let owner = Address::from("owner");
        let mut ballot = Ballot::new(owner.clone());

        ballot
            .apply(&owner, &Command::RegisterVoter { address: "alice".into() })
            .unwrap();
        let events = ballot
            .apply(&owner, &Command::StartProposalsRegistering)
            .unwrap();

        assert_eq!(
            events,
            vec![BallotEvent::WorkflowStatusChange {
                previous_status: WorkflowStatus::RegisteringVoters,
                new_status: WorkflowStatus::ProposalsRegistrationStarted,
            }]
        );
        assert_eq!(ballot.events().len(), 2);
    }

    #[test]
    fn test_replay_continues_after_rejection() {
        let log = vec![
            SignedCommand::new("owner", Command::TallyVotes),
            SignedCommand::new("owner", Command::RegisterVoter { address: "alice".into() }),
            SignedCommand::new("bob", Command::RegisterVoter { address: "carol".into() }),
            SignedCommand::new("owner", Command::StartProposalsRegistering),
        ];

        let report = replay(Ballot::new(Address::from("owner")), &log);

        assert_eq!(report.applied_count(), 2);
        assert_eq!(report.rejected_count(), 2);
        assert!(matches!(
            report.entries[0].outcome,
            CommandOutcome::Rejected {
                error: BallotError::InvalidPhaseTransition { .. }
            }
        ));
        assert!(matches!(
            report.entries[2].outcome,
            CommandOutcome::Rejected {
                error: BallotError::Unauthorized { .. }
            }
        ));
        assert_eq!(
            report.ballot.current_phase(),
            WorkflowStatus::ProposalsRegistrationStarted
        );
    }
}
