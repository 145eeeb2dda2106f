use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::errors::{BallotError, StateError};
use super::types::{
    Address, AdminAuthority, BallotEvent, Proposal, ProposalId, RegistrationPolicy, Voter,
    WorkflowStatus,
};
use super::workflow::{PhaseCommand, WorkflowController};

/// Description of the placeholder proposal created when registration opens
pub const GENESIS_DESCRIPTION: &str = "GENESIS";

/// The ballot aggregate: voter registry, proposal registry, phase and tally result.
///
/// Every command takes the caller explicitly and either applies completely or
/// returns an error without touching any field.
#[derive(Debug)]
pub struct Ballot {
    admin: AdminAuthority,
    registration_policy: RegistrationPolicy,
    voters: BTreeMap<Address, Voter>,
    proposals: Vec<Proposal>,
    workflow: WorkflowController,
    winning_proposal_id: ProposalId,
    journal: Vec<BallotEvent>,
}

/// Plain data view of a ballot, used for snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotState {
    pub admin: AdminAuthority,
    pub registration_policy: RegistrationPolicy,
    pub status: WorkflowStatus,
    pub voters: BTreeMap<Address, Voter>,
    pub proposals: Vec<Proposal>,
    pub winning_proposal_id: ProposalId,
    pub events: Vec<BallotEvent>,
}

impl Ballot {
    pub fn new(admin: Address) -> Self {
        Self {
            admin: AdminAuthority::new(admin),
            registration_policy: RegistrationPolicy::default(),
            voters: BTreeMap::new(),
            proposals: Vec::new(),
            workflow: WorkflowController::new(),
            winning_proposal_id: 0,
            journal: Vec::new(),
        }
    }

    pub fn with_registration_policy(mut self, policy: RegistrationPolicy) -> Self {
        self.registration_policy = policy;
        self
    }

    fn emit(&mut self, event: BallotEvent) {
        info!(event = %event, status = %self.workflow.status(), "Ballot event");
        self.journal.push(event);
    }

    fn require_voter(&self, caller: &Address) -> Result<&Voter, BallotError> {
        match self.voters.get(caller) {
            Some(voter) if voter.is_registered => Ok(voter),
            _ => Err(BallotError::CallerNotVoter {
                caller: caller.clone(),
            }),
        }
    }

    fn require_proposal(&self, proposal_id: ProposalId) -> Result<usize, BallotError> {
        usize::try_from(proposal_id)
            .ok()
            .filter(|index| *index < self.proposals.len())
            .ok_or(BallotError::ProposalNotFound {
                proposal_id,
                proposal_count: self.proposals.len(),
            })
    }

    fn advance(&mut self, caller: &Address, command: PhaseCommand) -> Result<(), BallotError> {
        self.admin.authorize(caller)?;
        let (previous_status, new_status) = self.workflow.advance(command)?;
        self.emit(BallotEvent::WorkflowStatusChange {
            previous_status,
            new_status,
        });
        Ok(())
    }

    // ---- commands ----

    pub fn register_voter(&mut self, caller: &Address, address: Address) -> Result<(), BallotError> {
        self.admin.authorize(caller)?;
        if self.registration_policy == RegistrationPolicy::RegisteringVotersOnly {
            self.workflow
                .require("register_voter", WorkflowStatus::RegisteringVoters)?;
        }
        if self.voters.get(&address).is_some_and(|voter| voter.is_registered) {
            return Err(BallotError::AlreadyRegistered { address });
        }

        self.voters.insert(
            address.clone(),
            Voter {
                is_registered: true,
                ..Voter::default()
            },
        );
        self.emit(BallotEvent::VoterRegistered { address });
        Ok(())
    }

    pub fn start_proposals_registering(&mut self, caller: &Address) -> Result<(), BallotError> {
        self.admin.authorize(caller)?;
        self.workflow.check(PhaseCommand::StartProposalsRegistering)?;

        self.proposals.push(Proposal::new(GENESIS_DESCRIPTION));
        self.advance(caller, PhaseCommand::StartProposalsRegistering)
    }

    pub fn add_proposal(
        &mut self,
        caller: &Address,
        description: impl Into<String>,
    ) -> Result<ProposalId, BallotError> {
        self.workflow
            .require("add_proposal", WorkflowStatus::ProposalsRegistrationStarted)?;
        let description = description.into();
        if description.is_empty() {
            return Err(BallotError::EmptyProposal);
        }
        self.require_voter(caller)?;

        let proposal_id = self.proposals.len() as ProposalId;
        debug!(caller = %caller, proposal_id, description = %description, "Registering proposal");
        self.proposals.push(Proposal::new(description));
        self.emit(BallotEvent::ProposalRegistered { proposal_id });
        Ok(proposal_id)
    }

    pub fn end_proposals_registering(&mut self, caller: &Address) -> Result<(), BallotError> {
        self.advance(caller, PhaseCommand::EndProposalsRegistering)
    }

    pub fn start_voting_session(&mut self, caller: &Address) -> Result<(), BallotError> {
        self.advance(caller, PhaseCommand::StartVotingSession)
    }

    pub fn cast_vote(&mut self, caller: &Address, proposal_id: ProposalId) -> Result<(), BallotError> {
        let voter = *self.require_voter(caller)?;
        let current = self.workflow.status();
        if current != WorkflowStatus::VotingSessionStarted {
            return Err(BallotError::VotingNotOpen { current });
        }
        if voter.has_voted {
            return Err(BallotError::AlreadyVoted {
                voter: caller.clone(),
            });
        }
        let index = self.require_proposal(proposal_id)?;

        self.proposals[index].vote_count += 1;
        if let Some(record) = self.voters.get_mut(caller) {
            record.has_voted = true;
            record.voted_proposal_id = proposal_id;
        }
        self.emit(BallotEvent::Voted {
            voter: caller.clone(),
            proposal_id,
        });
        Ok(())
    }

    pub fn end_voting_session(&mut self, caller: &Address) -> Result<(), BallotError> {
        self.advance(caller, PhaseCommand::EndVotingSession)
    }

    /// Compute the winner and close the ballot
    pub fn tally_votes(&mut self, caller: &Address) -> Result<ProposalId, BallotError> {
        self.admin.authorize(caller)?;
        self.workflow.check(PhaseCommand::TallyVotes)?;

        let winner = leading_proposal(&self.proposals);
        self.winning_proposal_id = winner;
        info!(
            winning_proposal_id = winner,
            vote_count = ?self.proposals.get(winner as usize).map(|p| p.vote_count),
            "Votes tallied"
        );
        self.advance(caller, PhaseCommand::TallyVotes)?;
        Ok(winner)
    }

    // ---- queries ----

    /// Registry entry for `address`; unknown addresses return `Voter::default()`
    pub fn get_voter(&self, caller: &Address, address: &Address) -> Result<Voter, BallotError> {
        self.require_voter(caller)?;
        Ok(self.voters.get(address).copied().unwrap_or_default())
    }

    pub fn get_one_proposal(
        &self,
        caller: &Address,
        proposal_id: ProposalId,
    ) -> Result<Proposal, BallotError> {
        self.require_voter(caller)?;
        let index = self.require_proposal(proposal_id)?;
        Ok(self.proposals[index].clone())
    }

    pub fn current_phase(&self) -> WorkflowStatus {
        self.workflow.status()
    }

    /// Only meaningful once the ballot reached `VotesTallied`
    pub fn winning_proposal_id(&self) -> ProposalId {
        self.winning_proposal_id
    }

    pub fn admin(&self) -> &Address {
        self.admin.address()
    }

    pub fn registration_policy(&self) -> RegistrationPolicy {
        self.registration_policy
    }

    pub fn is_registered(&self, address: &Address) -> bool {
        self.voters.get(address).is_some_and(|voter| voter.is_registered)
    }

    pub fn voter_count(&self) -> usize {
        self.voters.len()
    }

    pub fn votes_cast(&self) -> usize {
        self.voters.values().filter(|voter| voter.has_voted).count()
    }

    pub fn proposal_count(&self) -> usize {
        self.proposals.len()
    }

    /// Every notification emitted so far, in application order
    pub fn events(&self) -> &[BallotEvent] {
        &self.journal
    }

    pub(crate) fn journal_len(&self) -> usize {
        self.journal.len()
    }

    // ---- snapshots ----

    pub fn to_state(&self) -> BallotState {
        BallotState {
            admin: self.admin.clone(),
            registration_policy: self.registration_policy,
            status: self.workflow.status(),
            voters: self.voters.clone(),
            proposals: self.proposals.clone(),
            winning_proposal_id: self.winning_proposal_id,
            events: self.journal.clone(),
        }
    }

    /// Rebuild a ballot, refusing any state that commands could not have produced
    pub fn from_state(state: BallotState) -> Result<Self, StateError> {
        validate_state(&state)?;

        Ok(Self {
            admin: state.admin,
            registration_policy: state.registration_policy,
            voters: state.voters,
            proposals: state.proposals,
            workflow: WorkflowController::resume_at(state.status),
            winning_proposal_id: state.winning_proposal_id,
            journal: state.events,
        })
    }
}

/// First proposal to reach the highest vote count; ties go to the lowest id
pub fn leading_proposal(proposals: &[Proposal]) -> ProposalId {
    let mut winner: ProposalId = 0;
    let mut max_votes = 0;
    for (id, proposal) in proposals.iter().enumerate() {
        if proposal.vote_count > max_votes {
            max_votes = proposal.vote_count;
            winner = id as ProposalId;
        }
    }
    winner
}

fn validate_state(state: &BallotState) -> Result<(), StateError> {
    let invalid = |reason: String| Err(StateError::ValidationError(reason));

    let registration_open = state.status >= WorkflowStatus::ProposalsRegistrationStarted;
    let genesis = state.proposals.first().map(|proposal| proposal.description.as_str());
    if registration_open && genesis != Some(GENESIS_DESCRIPTION) {
        return invalid(format!("{} without a genesis proposal", state.status));
    }
    if !registration_open && !state.proposals.is_empty() {
        return invalid(format!(
            "{} proposals registered before proposal registration opened",
            state.proposals.len()
        ));
    }
    if state.proposals.iter().any(|proposal| proposal.description.is_empty()) {
        return invalid("proposal with empty description".to_string());
    }

    let mut tallies = vec![0u64; state.proposals.len()];
    for (address, voter) in &state.voters {
        if !voter.is_registered {
            return invalid(format!("unregistered entry for {address}"));
        }
        if !voter.has_voted {
            continue;
        }
        if state.status < WorkflowStatus::VotingSessionStarted {
            return invalid(format!("{address} voted during {}", state.status));
        }
        match tallies.get_mut(voter.voted_proposal_id as usize) {
            Some(count) => *count += 1,
            None => {
                return invalid(format!(
                    "{address} voted for unknown proposal {}",
                    voter.voted_proposal_id
                ))
            }
        }
    }
    for (id, (proposal, expected)) in state.proposals.iter().zip(&tallies).enumerate() {
        if proposal.vote_count != *expected {
            return invalid(format!(
                "proposal {id} has {} votes but {expected} voters chose it",
                proposal.vote_count
            ));
        }
    }

    let expected_winner = if state.status == WorkflowStatus::VotesTallied {
        leading_proposal(&state.proposals)
    } else {
        0
    };
    if state.winning_proposal_id != expected_winner {
        return invalid(format!(
            "winning proposal {} does not match tally {expected_winner}",
            state.winning_proposal_id
        ));
    }

    validate_journal(state)
}

/// The event journal must account for every registration, proposal, vote and
/// phase change recorded in the state, in forward phase order.
fn validate_journal(state: &BallotState) -> Result<(), StateError> {
    let mut registrations = 0;
    let mut proposals = 0;
    let mut votes = 0;
    let mut phase = WorkflowStatus::RegisteringVoters;

    for event in &state.events {
        match event {
            BallotEvent::VoterRegistered { .. } => registrations += 1,
            BallotEvent::ProposalRegistered { .. } => proposals += 1,
            BallotEvent::Voted { .. } => votes += 1,
            BallotEvent::WorkflowStatusChange {
                previous_status,
                new_status,
            } => {
                if *previous_status != phase || phase.next() != Some(*new_status) {
                    return Err(StateError::ValidationError(format!(
                        "journal changes phase {previous_status} -> {new_status} while in {phase}"
                    )));
                }
                phase = *new_status;
            }
        }
    }

    let voted = state.voters.values().filter(|voter| voter.has_voted).count();
    let mismatch = if phase != state.status {
        Some(format!("journal ends in {phase}, state is {}", state.status))
    } else if registrations != state.voters.len() {
        Some(format!(
            "journal has {registrations} registrations for {} voters",
            state.voters.len()
        ))
    } else if proposals != state.proposals.len().saturating_sub(1) {
        Some(format!(
            "journal has {proposals} proposals for {} submitted",
            state.proposals.len().saturating_sub(1)
        ))
    } else if votes != voted {
        Some(format!("journal has {votes} votes for {voted} voters who voted"))
    } else {
        None
    };

    match mismatch {
        Some(reason) => Err(StateError::ValidationError(reason)),
        None => Ok(()),
    }
}
