use std::collections::{HashMap, HashSet};

use rust_decimal::{Decimal, RoundingStrategy};

use crate::model::{
    db::{candidate::Candidate, vote::Vote},
    mongodb::Id,
};

/// A candidate's standing once every vote has been counted.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateResult {
    pub candidate: Candidate,
    pub total_score: f64,
    pub vote_count: u64,
    /// `total_score / vote_count` rounded to two decimals, or 0 without votes.
    pub average_score: f64,
}

/// Round half away from zero to two decimal places.
///
/// Rounding is decided on the exact decimal expansion of `value`, so anything
/// stored just below a midpoint rounds down: `1.005` (stored as
/// `1.00499999...`) becomes `1.0`, while the exactly representable `8.125`
/// becomes `8.13`. Values a [`Decimal`] cannot hold, such as NaN, are
/// returned unchanged.
pub fn round2(value: f64) -> f64 {
    let Some(exact) = Decimal::from_f64_retain(value) else {
        return value;
    };
    let mut rounded = exact.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    // Hundredths are exact integers, so one division gives the closest f64.
    // A zero mantissa also has no sign.
    rounded.mantissa() as f64 / 100.0
}

/// Rank an event's candidates by average score, highest first.
///
/// Votes for other events or for candidates not in `candidates` are skipped,
/// as are votes with a non-finite score. Candidates with equal averages keep
/// their order from `candidates`. A candidate listed more than once is ranked
/// once, at its first position.
pub fn compute_results(
    event_id: Id,
    candidates: Vec<Candidate>,
    votes: &[Vote],
) -> Vec<CandidateResult> {
    let mut listed = HashSet::with_capacity(candidates.len());
    let candidates = candidates
        .into_iter()
        .filter(|candidate| listed.insert(candidate.id))
        .collect::<Vec<_>>();

    let positions = candidates
        .iter()
        .enumerate()
        .map(|(position, candidate)| (candidate.id, position))
        .collect::<HashMap<_, _>>();

    let mut tallies = vec![(0.0_f64, 0_u64); candidates.len()];
    for vote in votes {
        if vote.event_id != event_id || !vote.score.is_finite() {
            continue;
        }
        if let Some(&position) = positions.get(&vote.candidate_id) {
            let (total, count) = &mut tallies[position];
            *total += vote.score;
            *count += 1;
        }
    }

    let mut results = candidates
        .into_iter()
        .zip(tallies)
        .map(|(candidate, (total_score, vote_count))| CandidateResult {
            candidate,
            total_score,
            vote_count,
            average_score: if vote_count > 0 {
                round2(total_score / vote_count as f64)
            } else {
                0.0
            },
        })
        .collect::<Vec<_>>();

    // `sort_by` is stable, which is what breaks ties.
    results.sort_by(|a, b| b.average_score.total_cmp(&a.average_score));
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(results: &[CandidateResult]) -> Vec<&str> {
        results.iter().map(|r| r.candidate.name.as_str()).collect()
    }

    fn votes_for(event_id: Id, candidate: &Candidate, scores: &[f64]) -> Vec<Vote> {
        scores
            .iter()
            .map(|&score| Vote::example(event_id, candidate.id, Id::new(), score))
            .collect()
    }

    #[test]
    fn averages_and_ranks() {
        let event = Id::new();
        let a = Candidate::example(event, 1, "A");
        let b = Candidate::example(event, 2, "B");
        let c = Candidate::example(event, 3, "C");
        let mut votes = votes_for(event, &a, &[8.0, 9.0]);
        votes.extend(votes_for(event, &b, &[10.0]));

        let results = compute_results(event, vec![a, b, c], &votes);

        assert_eq!(names(&results), vec!["B", "A", "C"]);
        assert_eq!(results[0].average_score, 10.0);
        assert_eq!(results[0].vote_count, 1);
        assert_eq!(results[1].average_score, 8.5);
        assert_eq!(results[1].total_score, 17.0);
        assert_eq!(results[1].vote_count, 2);
        assert_eq!(results[2].average_score, 0.0);
        assert_eq!(results[2].vote_count, 0);
    }

    #[test]
    fn ties_keep_input_order() {
        let event = Id::new();
        let first = Candidate::example(event, 1, "First");
        let second = Candidate::example(event, 2, "Second");
        let top = Candidate::example(event, 3, "Top");
        let mut votes = votes_for(event, &second, &[7.0]);
        votes.extend(votes_for(event, &first, &[6.0, 8.0]));
        votes.extend(votes_for(event, &top, &[9.0]));

        let results = compute_results(event, vec![first, second, top], &votes);

        assert_eq!(names(&results), vec!["Top", "First", "Second"]);
        assert_eq!(results[1].average_score, 7.0);
        assert_eq!(results[2].average_score, 7.0);
    }

    #[test]
    fn all_zero_preserves_order() {
        let event = Id::new();
        let candidates = ["X", "Y", "Z"]
            .iter()
            .enumerate()
            .map(|(i, name)| Candidate::example(event, i as u32 + 1, name))
            .collect::<Vec<_>>();
        let votes = votes_for(event, &candidates[2], &[0.0]);

        let results = compute_results(event, candidates, &votes);

        assert_eq!(names(&results), vec!["X", "Y", "Z"]);
        assert_eq!(results[2].vote_count, 1);
    }

    #[test]
    fn ignores_orphaned_and_foreign_votes() {
        let event = Id::new();
        let a = Candidate::example(event, 1, "A");
        let stranger = Candidate::example(event, 2, "Stranger");
        let mut votes = votes_for(event, &a, &[4.0]);
        votes.extend(votes_for(event, &stranger, &[10.0, 10.0]));
        votes.extend(votes_for(Id::new(), &a, &[10.0]));
        votes.push(Vote::example(event, a.id, Id::new(), f64::NAN));

        let results = compute_results(event, vec![a], &votes);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].total_score, 4.0);
        assert_eq!(results[0].vote_count, 1);
        assert_eq!(results[0].average_score, 4.0);
    }

    #[test]
    fn no_candidates_no_results() {
        let event = Id::new();
        let stray = Candidate::example(event, 1, "Stray");
        let votes = votes_for(event, &stray, &[5.0]);
        assert!(compute_results(event, Vec::new(), &votes).is_empty());
    }

    #[test]
    fn rounds_to_two_decimals() {
        let event = Id::new();
        let a = Candidate::example(event, 1, "A");
        let votes = votes_for(event, &a, &[10.0, 9.0, 9.0]);

        let results = compute_results(event, vec![a], &votes);

        assert_eq!(results[0].total_score, 28.0);
        assert_eq!(results[0].average_score, 9.33);
    }

    #[test]
    fn round2_is_half_away_from_zero() {
        assert_eq!(round2(8.125), 8.13);
        assert_eq!(round2(-8.125), -8.13);
        assert_eq!(round2(2.0 / 3.0), 0.67);
        assert!(round2(-0.001).is_sign_positive());
        assert_eq!(round2(1.005), 1.0);
        assert!(round2(f64::NAN).is_nan());
    }

    #[test]
    fn averages_just_below_a_midpoint_round_down() {
        let event = Id::new();
        let a = Candidate::example(event, 1, "A");
        let b = Candidate::example(event, 2, "B");
        // Stored as 2.67499999... and 1.00499999... respectively.
        let mut votes = votes_for(event, &a, &[2.5, 2.85]);
        votes.extend(votes_for(event, &b, &[1.0, 1.01]));

        let results = compute_results(event, vec![a, b], &votes);

        assert_eq!(results[0].average_score, 2.67);
        assert_eq!(results[1].average_score, 1.0);
    }

    #[test]
    fn repeated_candidates_are_ranked_once() {
        let event = Id::new();
        let a = Candidate::example(event, 1, "A");
        let b = Candidate::example(event, 2, "B");
        let mut votes = votes_for(event, &a, &[9.0]);
        votes.extend(votes_for(event, &b, &[5.0]));

        let results = compute_results(event, vec![a.clone(), b, a], &votes);

        assert_eq!(names(&results), vec!["A", "B"]);
        assert_eq!(results[0].total_score, 9.0);
        assert_eq!(results[0].vote_count, 1);
    }

    #[test]
    fn recomputing_is_idempotent() {
        let event = Id::new();
        let candidates = (1..=5)
            .map(|n| Candidate::example(event, n, &format!("C{n}")))
            .collect::<Vec<_>>();
        let votes = candidates
            .iter()
            .enumerate()
            .flat_map(|(i, c)| votes_for(event, c, &[i as f64, 10.0 - i as f64 / 2.0]))
            .collect::<Vec<_>>();

        let first = compute_results(event, candidates.clone(), &votes);
        let second = compute_results(event, candidates, &votes);
        assert_eq!(first, second);

        // Feeding the ranked order back in reproduces the same ranking.
        let reordered = first.iter().map(|r| r.candidate.clone()).collect();
        let third = compute_results(event, reordered, &votes);
        assert_eq!(first, third);
    }
}
