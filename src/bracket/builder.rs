use std::collections::HashSet;

use anyhow::{bail, ensure, Result};

/// A seeded single-elimination bracket before it is written to storage.
#[derive(Debug, Clone)]
pub struct BuiltBracket {
    pub rounds: Vec<BuiltRound>,
}

#[derive(Debug, Clone)]
pub struct BuiltRound {
    pub number: i32,
    pub pairings: Vec<Pairing>,
}

/// One pairing of adjacent bracket slots. Rounds beyond the first carry
/// back-references to the two earlier matches whose winners meet here.
#[derive(Debug, Clone)]
pub struct Pairing {
    pub match_number: i64,
    pub position: i32,
    pub home: Option<i64>,
    pub away: Option<i64>,
    pub feeder_home: Option<i64>,
    pub feeder_away: Option<i64>,
}

impl Pairing {
    /// A pairing with exactly one competitor, who advances without playing.
    pub fn is_bye(&self) -> bool {
        self.home.is_some() != self.away.is_some()
    }

    pub fn sole_competitor(&self) -> Option<i64> {
        match (self.home, self.away) {
            (Some(id), None) | (None, Some(id)) => Some(id),
            _ => None,
        }
    }
}

impl BuiltBracket {
    pub fn first_round(&self) -> &BuiltRound {
        &self.rounds[0]
    }
}

/// Number of rounds needed for `n` competitors: ceil(log2 n).
pub fn round_count(n: usize) -> u32 {
    let mut rounds = 0;
    while (1usize << rounds) < n {
        rounds += 1;
    }
    rounds
}

/// Builds the full bracket for competitors already in seed order. Match
/// numbers are assigned sequentially across rounds, starting at 1.
pub fn build_bracket(seeds: &[i64]) -> Result<BuiltBracket> {
    ensure!(
        seeds.len() >= 2,
        "A bracket needs at least 2 competitors, got {}",
        seeds.len()
    );
    ensure!(
        seeds.iter().collect::<HashSet<_>>().len() == seeds.len(),
        "Seed order contains a duplicate competitor"
    );

    let num_rounds = round_count(seeds.len());
    let total_slots = 1usize << num_rounds;
    let num_byes = total_slots - seeds.len();

    let slots = seat_seeds(seeds, total_slots, num_byes);

    let mut rounds = Vec::with_capacity(num_rounds as usize);
    let mut next_match_number: i64 = 1;

    let first = build_first_round(&slots, &mut next_match_number)?;
    let mut previous_numbers: Vec<i64> = first.pairings.iter().map(|p| p.match_number).collect();
    rounds.push(first);

    for round in 2..=num_rounds as i32 {
        let built = build_later_round(round, &previous_numbers, &mut next_match_number);
        previous_numbers = built.pairings.iter().map(|p| p.match_number).collect();
        rounds.push(built);
    }

    Ok(BuiltBracket { rounds })
}

/// Bye slots by balanced bisection: the candidate list starts at slot 0 and
/// doubles by mirroring at a halving step until it covers the bye count.
fn bye_positions(total_slots: usize, num_byes: usize) -> Vec<usize> {
    if num_byes == 0 {
        return Vec::new();
    }

    let mut candidates = vec![0usize];
    let mut step = total_slots;
    while candidates.len() < num_byes {
        step /= 2;
        let mirrored: Vec<usize> = candidates.iter().map(|p| p + step).collect();
        candidates.extend(mirrored);
    }

    candidates.truncate(num_byes);
    candidates
}

fn seat_seeds(seeds: &[i64], total_slots: usize, num_byes: usize) -> Vec<Option<i64>> {
    let byes: HashSet<usize> = bye_positions(total_slots, num_byes).into_iter().collect();

    let mut slots = vec![None; total_slots];
    let mut next_seed = seeds.iter();
    for (index, slot) in slots.iter_mut().enumerate() {
        if !byes.contains(&index) {
            *slot = next_seed.next().copied();
        }
    }
    slots
}

fn build_first_round(slots: &[Option<i64>], next_match_number: &mut i64) -> Result<BuiltRound> {
    let mut pairings = Vec::with_capacity(slots.len() / 2);

    for (position, pair) in slots.chunks(2).enumerate() {
        if pair[0].is_none() && pair[1].is_none() {
            bail!("Bracket produced an empty pairing at position {position}");
        }

        pairings.push(Pairing {
            match_number: *next_match_number,
            position: position as i32,
            home: pair[0],
            away: pair[1],
            feeder_home: None,
            feeder_away: None,
        });
        *next_match_number += 1;
    }

    Ok(BuiltRound {
        number: 1,
        pairings,
    })
}

fn build_later_round(
    round: i32,
    previous_numbers: &[i64],
    next_match_number: &mut i64,
) -> BuiltRound {
    let mut pairings = Vec::with_capacity(previous_numbers.len() / 2);

    for (position, feeders) in previous_numbers.chunks(2).enumerate() {
        pairings.push(Pairing {
            match_number: *next_match_number,
            position: position as i32,
            home: None,
            away: None,
            feeder_home: Some(feeders[0]),
            feeder_away: Some(feeders[1]),
        });
        *next_match_number += 1;
    }

    BuiltRound {
        number: round,
        pairings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_count_is_ceil_log2() {
        assert_eq!(round_count(2), 1);
        assert_eq!(round_count(3), 2);
        assert_eq!(round_count(4), 2);
        assert_eq!(round_count(5), 3);
        assert_eq!(round_count(8), 3);
        assert_eq!(round_count(9), 4);
        assert_eq!(round_count(16), 4);
    }

    #[test]
    fn rejects_fewer_than_two_competitors() {
        assert!(build_bracket(&[]).is_err());
        assert!(build_bracket(&[7]).is_err());
    }

    #[test]
    fn rejects_duplicate_competitors() {
        assert!(build_bracket(&[1, 2, 1]).is_err());
    }

    #[test]
    fn four_competitors_make_a_clean_two_round_bracket() {
        let bracket = build_bracket(&[10, 20, 30, 40]).unwrap();

        assert_eq!(bracket.rounds.len(), 2);
        let first = &bracket.rounds[0];
        assert_eq!(first.pairings.len(), 2);
        assert!(first.pairings.iter().all(|p| !p.is_bye()));
        assert_eq!(first.pairings[0].home, Some(10));
        assert_eq!(first.pairings[0].away, Some(20));
        assert_eq!(first.pairings[1].home, Some(30));
        assert_eq!(first.pairings[1].away, Some(40));

        let last = &bracket.rounds[1];
        assert_eq!(last.pairings.len(), 1);
        assert_eq!(last.pairings[0].match_number, 3);
        assert_eq!(last.pairings[0].feeder_home, Some(1));
        assert_eq!(last.pairings[0].feeder_away, Some(2));
    }

    #[test]
    fn five_competitors_get_three_rounds_and_three_byes() {
        let bracket = build_bracket(&[1, 2, 3, 4, 5]).unwrap();

        assert_eq!(bracket.rounds.len(), 3);

        let first = bracket.first_round();
        assert_eq!(first.pairings.len(), 4);

        let byes: Vec<_> = first.pairings.iter().filter(|p| p.is_bye()).collect();
        assert_eq!(byes.len(), 3);

        let played: Vec<_> = first.pairings.iter().filter(|p| !p.is_bye()).collect();
        assert_eq!(played.len(), 1);

        // All five competitors are seated exactly once.
        let mut seated: Vec<i64> = first
            .pairings
            .iter()
            .flat_map(|p| [p.home, p.away])
            .flatten()
            .collect();
        seated.sort_unstable();
        assert_eq!(seated, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn bye_positions_follow_balanced_bisection() {
        assert_eq!(bye_positions(8, 3), vec![0, 4, 2]);
        assert_eq!(bye_positions(8, 0), Vec::<usize>::new());
        assert_eq!(bye_positions(16, 5), vec![0, 8, 4, 12, 2]);
    }

    #[test]
    fn byes_never_produce_an_empty_pairing() {
        for n in 2..=33 {
            let seeds: Vec<i64> = (1..=n).collect();
            let bracket = build_bracket(&seeds).unwrap();
            for pairing in &bracket.first_round().pairings {
                assert!(
                    pairing.home.is_some() || pairing.away.is_some(),
                    "empty pairing for n={n}"
                );
            }
        }
    }

    #[test]
    fn match_numbers_are_sequential_and_unique() {
        let bracket = build_bracket(&(1..=11).collect::<Vec<i64>>()).unwrap();

        let numbers: Vec<i64> = bracket
            .rounds
            .iter()
            .flat_map(|r| r.pairings.iter().map(|p| p.match_number))
            .collect();

        let expected: Vec<i64> = (1..=numbers.len() as i64).collect();
        assert_eq!(numbers, expected);
    }

    #[test]
    fn every_feeder_references_the_previous_round() {
        let bracket = build_bracket(&(1..=9).collect::<Vec<i64>>()).unwrap();

        for window in bracket.rounds.windows(2) {
            let earlier: Vec<i64> = window[0].pairings.iter().map(|p| p.match_number).collect();
            for pairing in &window[1].pairings {
                assert!(earlier.contains(&pairing.feeder_home.unwrap()));
                assert!(earlier.contains(&pairing.feeder_away.unwrap()));
            }
        }
    }
}
