// Tests for the ballot store guards and tally

#[cfg(test)]
mod tests {
    use super::super::*;

    fn addr(name: &str) -> Address {
        Address::from(name)
    }

    fn ballot_with_voters(voters: &[&str]) -> Ballot {
        let owner = addr("owner");
        let mut ballot = Ballot::new(owner.clone());
        for voter in voters {
            ballot.register_voter(&owner, addr(voter)).unwrap();
        }
        ballot
    }

    /// Ballot in `VotingSessionStarted` with `proposals` voter proposals after genesis
    fn ballot_in_voting(voters: &[&str], proposals: &[&str]) -> Ballot {
        let owner = addr("owner");
        let mut ballot = ballot_with_voters(voters);
        ballot.start_proposals_registering(&owner).unwrap();
        for description in proposals {
            ballot.add_proposal(&addr(voters[0]), *description).unwrap();
        }
        ballot.end_proposals_registering(&owner).unwrap();
        ballot.start_voting_session(&owner).unwrap();
        ballot
    }

    #[test]
    fn test_register_voter_emits_event() {
        let ballot = ballot_with_voters(&["alice"]);

        assert!(ballot.is_registered(&addr("alice")));
        assert_eq!(
            ballot.events(),
            &[BallotEvent::VoterRegistered {
                address: addr("alice")
            }]
        );
    }

    #[test]
    fn test_register_voter_twice_fails_without_drift() {
        let owner = addr("owner");
        let mut ballot = ballot_with_voters(&["alice"]);

        let err = ballot.register_voter(&owner, addr("alice")).unwrap_err();

        assert_eq!(
            err,
            BallotError::AlreadyRegistered {
                address: addr("alice")
            }
        );
        assert_eq!(ballot.voter_count(), 1);
        assert_eq!(ballot.events().len(), 1);
    }

    #[test]
    fn test_register_voter_requires_admin() {
        let mut ballot = ballot_with_voters(&["alice"]);

        let err = ballot.register_voter(&addr("alice"), addr("bob")).unwrap_err();

        assert_eq!(
            err,
            BallotError::Unauthorized {
                caller: addr("alice")
            }
        );
        assert!(!ballot.is_registered(&addr("bob")));
    }

    #[test]
    fn test_registration_policy_any_phase_allows_late_registration() {
        let owner = addr("owner");
        let mut ballot = ballot_with_voters(&["alice"]);
        ballot.start_proposals_registering(&owner).unwrap();

        ballot.register_voter(&owner, addr("bob")).unwrap();

        assert!(ballot.is_registered(&addr("bob")));
    }

    #[test]
    fn test_registration_policy_registering_voters_only() {
        let owner = addr("owner");
        let mut ballot = Ballot::new(owner.clone())
            .with_registration_policy(RegistrationPolicy::RegisteringVotersOnly);
        ballot.register_voter(&owner, addr("alice")).unwrap();
        ballot.start_proposals_registering(&owner).unwrap();

        let err = ballot.register_voter(&owner, addr("bob")).unwrap_err();

        assert_eq!(
            err,
            BallotError::InvalidPhaseTransition {
                operation: "register_voter".to_string(),
                expected: WorkflowStatus::RegisteringVoters,
                current: WorkflowStatus::ProposalsRegistrationStarted,
            }
        );
        assert_eq!(ballot.voter_count(), 1);
    }

    #[test]
    fn test_get_voter_returns_default_for_unknown_address() {
        let ballot = ballot_with_voters(&["alice", "bob"]);

        let bob = ballot.get_voter(&addr("alice"), &addr("bob")).unwrap();
        assert!(bob.is_registered);
        assert!(!bob.has_voted);

        let carol = ballot.get_voter(&addr("alice"), &addr("carol")).unwrap();
        assert_eq!(carol, Voter::default());
        assert!(!carol.is_registered);
    }

    #[test]
    fn test_admin_is_not_implicitly_a_voter() {
        let ballot = ballot_with_voters(&["alice"]);

        let err = ballot.get_voter(&addr("owner"), &addr("alice")).unwrap_err();

        assert_eq!(
            err,
            BallotError::CallerNotVoter {
                caller: addr("owner")
            }
        );
    }

    #[test]
    fn test_genesis_proposal_occupies_id_zero() {
        let owner = addr("owner");
        let mut ballot = ballot_with_voters(&["alice"]);
        ballot.start_proposals_registering(&owner).unwrap();

        let genesis = ballot.get_one_proposal(&addr("alice"), 0).unwrap();
        assert_eq!(genesis.description, GENESIS_DESCRIPTION);
        assert_eq!(genesis.vote_count, 0);

        let id = ballot.add_proposal(&addr("alice"), "Plant more trees").unwrap();
        assert_eq!(id, 1);
        assert_eq!(
            ballot.events().last(),
            Some(&BallotEvent::ProposalRegistered { proposal_id: 1 })
        );
    }

    #[test]
    fn test_add_proposal_validation_order() {
        let owner = addr("owner");
        let mut ballot = ballot_with_voters(&["alice"]);

        // Outside the proposal phase the phase check wins, even for "" or a non-voter
        for (caller, description) in [("alice", "Too early"), ("alice", ""), ("mallory", "")] {
            let err = ballot.add_proposal(&addr(caller), description).unwrap_err();
            assert!(matches!(err, BallotError::InvalidPhaseTransition { .. }));
        }

        ballot.start_proposals_registering(&owner).unwrap();

        assert_eq!(
            ballot.add_proposal(&addr("alice"), "").unwrap_err(),
            BallotError::EmptyProposal
        );
        assert_eq!(
            ballot.add_proposal(&addr("mallory"), "").unwrap_err(),
            BallotError::EmptyProposal
        );
        assert_eq!(
            ballot.add_proposal(&addr("mallory"), "Sneaky").unwrap_err(),
            BallotError::CallerNotVoter {
                caller: addr("mallory")
            }
        );
        assert_eq!(ballot.proposal_count(), 1);

        ballot.end_proposals_registering(&owner).unwrap();
        let err = ballot.add_proposal(&addr("alice"), "").unwrap_err();
        assert_eq!(
            err,
            BallotError::InvalidPhaseTransition {
                operation: "add_proposal".to_string(),
                expected: WorkflowStatus::ProposalsRegistrationStarted,
                current: WorkflowStatus::ProposalsRegistrationEnded,
            }
        );
    }

    #[test]
    fn test_get_one_proposal_out_of_range() {
        let owner = addr("owner");
        let mut ballot = ballot_with_voters(&["alice"]);
        ballot.start_proposals_registering(&owner).unwrap();

        let err = ballot.get_one_proposal(&addr("alice"), 7).unwrap_err();

        assert_eq!(
            err,
            BallotError::ProposalNotFound {
                proposal_id: 7,
                proposal_count: 1
            }
        );
    }

    #[test]
    fn test_cast_vote_twice_counts_once() {
        let mut ballot = ballot_in_voting(&["alice"], &["Bike lanes"]);

        ballot.cast_vote(&addr("alice"), 1).unwrap();
        let err = ballot.cast_vote(&addr("alice"), 1).unwrap_err();

        assert_eq!(
            err,
            BallotError::AlreadyVoted {
                voter: addr("alice")
            }
        );
        assert_eq!(ballot.get_one_proposal(&addr("alice"), 1).unwrap().vote_count, 1);

        let alice = ballot.get_voter(&addr("alice"), &addr("alice")).unwrap();
        assert!(alice.has_voted);
        assert_eq!(alice.voted_proposal_id, 1);
    }

    #[test]
    fn test_cast_vote_outside_session() {
        let owner = addr("owner");
        let mut ballot = ballot_with_voters(&["alice"]);
        ballot.start_proposals_registering(&owner).unwrap();

        assert_eq!(
            ballot.cast_vote(&addr("alice"), 0).unwrap_err(),
            BallotError::VotingNotOpen {
                current: WorkflowStatus::ProposalsRegistrationStarted
            }
        );

        ballot.end_proposals_registering(&owner).unwrap();
        ballot.start_voting_session(&owner).unwrap();
        ballot.end_voting_session(&owner).unwrap();

        assert_eq!(
            ballot.cast_vote(&addr("alice"), 0).unwrap_err(),
            BallotError::VotingNotOpen {
                current: WorkflowStatus::VotingSessionEnded
            }
        );
        assert_eq!(ballot.votes_cast(), 0);
    }

    #[test]
    fn test_cast_vote_unknown_proposal_leaves_voter_untouched() {
        let mut ballot = ballot_in_voting(&["alice"], &["Bike lanes"]);

        let err = ballot.cast_vote(&addr("alice"), 2).unwrap_err();

        assert!(matches!(err, BallotError::ProposalNotFound { proposal_id: 2, .. }));
        let alice = ballot.get_voter(&addr("alice"), &addr("alice")).unwrap();
        assert!(!alice.has_voted);
    }

    #[test]
    fn test_non_voter_is_rejected_before_phase_checks() {
        let mut ballot = ballot_with_voters(&["alice"]);
        let mallory = addr("mallory");

        assert_eq!(
            ballot.cast_vote(&mallory, 0).unwrap_err(),
            BallotError::CallerNotVoter {
                caller: mallory.clone()
            }
        );
        assert_eq!(
            ballot.get_one_proposal(&mallory, 0).unwrap_err(),
            BallotError::CallerNotVoter {
                caller: mallory.clone()
            }
        );
        assert_eq!(ballot.events().len(), 1);
    }

    #[test]
    fn test_tally_tie_goes_to_lowest_id() {
        let voters = ["v1", "v2", "v3", "v4", "v5"];
        let owner = addr("owner");
        let mut ballot = ballot_in_voting(&voters, &["A", "B", "C"]);
        // counts [0, 2, 2, 1]
        ballot.cast_vote(&addr("v1"), 1).unwrap();
        ballot.cast_vote(&addr("v2"), 2).unwrap();
        ballot.cast_vote(&addr("v3"), 2).unwrap();
        ballot.cast_vote(&addr("v4"), 1).unwrap();
        ballot.cast_vote(&addr("v5"), 3).unwrap();
        ballot.end_voting_session(&owner).unwrap();

        let winner = ballot.tally_votes(&owner).unwrap();

        assert_eq!(winner, 1);
        assert_eq!(ballot.winning_proposal_id(), 1);
        assert_eq!(ballot.current_phase(), WorkflowStatus::VotesTallied);
    }

    #[test]
    fn test_leading_proposal_edge_cases() {
        let proposals = |counts: &[u64]| -> Vec<Proposal> {
            counts
                .iter()
                .map(|count| Proposal {
                    description: "p".to_string(),
                    vote_count: *count,
                })
                .collect()
        };

        assert_eq!(leading_proposal(&[]), 0);
        assert_eq!(leading_proposal(&proposals(&[0, 0, 0])), 0);
        assert_eq!(leading_proposal(&proposals(&[0, 2, 2, 1])), 1);
        assert_eq!(leading_proposal(&proposals(&[1, 0, 3])), 2);
    }

    #[test]
    fn test_tally_requires_admin_and_ended_session() {
        let owner = addr("owner");
        let mut ballot = ballot_in_voting(&["alice"], &["A"]);

        assert_eq!(
            ballot.tally_votes(&owner).unwrap_err(),
            BallotError::InvalidPhaseTransition {
                operation: "tally_votes".to_string(),
                expected: WorkflowStatus::VotingSessionEnded,
                current: WorkflowStatus::VotingSessionStarted,
            }
        );

        ballot.end_voting_session(&owner).unwrap();
        assert_eq!(
            ballot.tally_votes(&addr("alice")).unwrap_err(),
            BallotError::Unauthorized {
                caller: addr("alice")
            }
        );
        assert_eq!(ballot.current_phase(), WorkflowStatus::VotingSessionEnded);
    }

    #[test]
    fn test_phase_change_events_carry_previous_and_new() {
        let owner = addr("owner");
        let mut ballot = ballot_in_voting(&["alice"], &[]);
        ballot.end_voting_session(&owner).unwrap();
        ballot.tally_votes(&owner).unwrap();

        let transitions: Vec<(WorkflowStatus, WorkflowStatus)> = ballot
            .events()
            .iter()
            .filter_map(|event| match event {
                BallotEvent::WorkflowStatusChange {
                    previous_status,
                    new_status,
                } => Some((*previous_status, *new_status)),
                _ => None,
            })
            .collect();

        let expected: Vec<(WorkflowStatus, WorkflowStatus)> = WorkflowStatus::ALL
            .windows(2)
            .map(|pair| (pair[0], pair[1]))
            .collect();
        assert_eq!(transitions, expected);
    }

    #[test]
    fn test_state_round_trip_preserves_ballot() {
        let owner = addr("owner");
        let mut ballot = ballot_in_voting(&["alice", "bob"], &["A", "B"]);
        ballot.cast_vote(&addr("alice"), 2).unwrap();

        let restored = Ballot::from_state(ballot.to_state()).unwrap();

        assert_eq!(restored.to_state(), ballot.to_state());
        assert_eq!(restored.current_phase(), WorkflowStatus::VotingSessionStarted);

        let mut restored = restored;
        restored.cast_vote(&addr("bob"), 2).unwrap();
        restored.end_voting_session(&owner).unwrap();
        assert_eq!(restored.tally_votes(&owner).unwrap(), 2);
    }

    #[test]
    fn test_from_state_rejects_inconsistent_tallies() {
        let mut ballot = ballot_in_voting(&["alice"], &["A"]);
        ballot.cast_vote(&addr("alice"), 1).unwrap();

        let mut state = ballot.to_state();
        state.proposals[1].vote_count = 5;
        assert!(Ballot::from_state(state).is_err());

        let mut state = ballot.to_state();
        state.proposals.clear();
        assert!(Ballot::from_state(state).is_err());

        let mut state = ballot.to_state();
        state.winning_proposal_id = 1;
        assert!(Ballot::from_state(state).is_err());
    }

    #[test]
    fn test_from_state_requires_genesis_and_matching_journal() {
        let mut ballot = ballot_in_voting(&["alice", "bob"], &["A"]);
        ballot.cast_vote(&addr("alice"), 1).unwrap();

        let mut state = ballot.to_state();
        state.proposals[0].description = "Hijacked".to_string();
        assert!(Ballot::from_state(state).is_err());

        let mut state = ballot.to_state();
        state.events.clear();
        assert!(Ballot::from_state(state).is_err());

        // A vote recorded in the registry but missing from the journal
        let mut state = ballot.to_state();
        state.events.pop();
        assert!(matches!(
            Ballot::from_state(state),
            Err(StateError::ValidationError(_))
        ));

        // Phase changes must follow the forward order
        let mut state = ballot.to_state();
        let first_change = state
            .events
            .iter()
            .position(|event| matches!(event, BallotEvent::WorkflowStatusChange { .. }))
            .unwrap();
        state.events[first_change] = BallotEvent::WorkflowStatusChange {
            previous_status: WorkflowStatus::RegisteringVoters,
            new_status: WorkflowStatus::VotingSessionStarted,
        };
        assert!(Ballot::from_state(state).is_err());

        assert!(Ballot::from_state(ballot.to_state()).is_ok());
    }
}
