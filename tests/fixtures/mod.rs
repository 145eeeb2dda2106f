#![allow(dead_code)]
/// Shared ballots and identities for integration tests
use ballot_box::{Address, Ballot, Command, SignedCommand};

pub const ADMIN: &str = "owner";

pub fn addr(name: &str) -> Address {
    Address::from(name)
}

pub fn admin() -> Address {
    addr(ADMIN)
}

/// Voters named `voter1` through `voter{count}`
pub fn voters(count: usize) -> Vec<Address> {
    (1..=count).map(|i| addr(&format!("voter{i}"))).collect()
}

/// Fresh ballot owned by [`ADMIN`] with `count` registered voters
pub fn ballot_with_voters(count: usize) -> Ballot {
    let owner = admin();
    let mut ballot = Ballot::new(owner.clone());
    for voter in voters(count) {
        ballot.register_voter(&owner, voter).unwrap();
    }
    ballot
}

/// Five registered voters, each with one proposal, voting session open
pub fn five_voter_ballot_in_voting() -> Ballot {
    let owner = admin();
    let mut ballot = ballot_with_voters(5);
    ballot.start_proposals_registering(&owner).unwrap();
    for (i, voter) in voters(5).iter().enumerate() {
        ballot
            .add_proposal(voter, format!("Proposal {}", i + 1))
            .unwrap();
    }
    ballot.end_proposals_registering(&owner).unwrap();
    ballot.start_voting_session(&owner).unwrap();
    ballot
}

/// The five-voter scenario as a command log: voter `i` votes for `i % 2`
pub fn five_voter_command_log() -> Vec<SignedCommand> {
    let mut log = Vec::new();
    for voter in voters(5) {
        log.push(SignedCommand::new(
            ADMIN,
            Command::RegisterVoter { address: voter },
        ));
    }
    log.push(SignedCommand::new(ADMIN, Command::StartProposalsRegistering));
    for (i, voter) in voters(5).into_iter().enumerate() {
        log.push(SignedCommand::new(
            voter,
            Command::AddProposal {
                description: format!("Proposal {}", i + 1),
            },
        ));
    }
    log.push(SignedCommand::new(ADMIN, Command::EndProposalsRegistering));
    log.push(SignedCommand::new(ADMIN, Command::StartVotingSession));
    for (i, voter) in voters(5).into_iter().enumerate() {
        log.push(SignedCommand::new(
            voter,
            Command::CastVote {
                proposal_id: ((i + 1) % 2) as u64,
            },
        ));
    }
    log.push(SignedCommand::new(ADMIN, Command::EndVotingSession));
    log.push(SignedCommand::new(ADMIN, Command::TallyVotes));
    log
}
