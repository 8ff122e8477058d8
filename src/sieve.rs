//! Lazy producer/filter prime sieve.
//!
//! A base generator yields candidates in ascending order and every discovered
//! prime appends one filter stage that suppresses its multiples. The chain is
//! stored in discovery order and walked iteratively: stage `i` reads from
//! stage `i - 1`, stage 0 reads from the generator, and total state is one
//! small struct per prime found so far.

use std::fmt;

/// Ordered, ascending set of primes produced by one sieve run.
///
/// Immutable once produced; results cross lane boundaries by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimeSet {
    primes: Vec<u32>,
}

impl PrimeSet {
    pub fn len(&self) -> usize {
        self.primes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primes.is_empty()
    }

    pub fn first(&self) -> Option<u32> {
        self.primes.first().copied()
    }

    pub fn last(&self) -> Option<u32> {
        self.primes.last().copied()
    }

    pub fn get(&self, index: usize) -> Option<u32> {
        self.primes.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.primes.iter().copied()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.primes
    }

    /// Structural invariant: starts at 2 and strictly increases.
    ///
    /// Used as the validation oracle for bounds that have no checkpoint entry.
    pub fn is_well_formed(&self) -> bool {
        if self.primes.is_empty() {
            return true;
        }
        self.primes[0] == 2 && self.primes.windows(2).all(|w| w[0] < w[1])
    }
}

/// Base generator: candidates 2..=bound with explicit cursor state.
struct CandidateStream {
    next: u32,
    bound: u32,
    done: bool,
}

impl CandidateStream {
    fn new(bound: u32) -> Self {
        Self {
            next: 2,
            bound,
            done: false,
        }
    }
}

impl Iterator for CandidateStream {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.done || self.next > self.bound {
            return None;
        }
        let candidate = self.next;
        // A bound of u32::MAX leaves no room for a successor cursor.
        match candidate.checked_add(1) {
            Some(next) => self.next = next,
            None => self.done = true,
        }
        Some(candidate)
    }
}

/// One chain stage: drops multiples of the prime it was created for.
struct FilterStage {
    prime: u32,
}

impl FilterStage {
    fn new(prime: u32) -> Self {
        Self { prime }
    }

    fn admits(&self, candidate: u32) -> bool {
        candidate % self.prime != 0
    }
}

/// The growing filter chain, pulled one prime at a time.
///
/// A candidate that any stage rejects is suppressed and the next candidate is
/// pulled; only exhaustion of the base generator ends iteration. A candidate
/// that survives every stage is the next prime and gains a stage of its own.
/// Stages never buffer more than the single candidate in flight.
struct SieveChain {
    source: CandidateStream,
    stages: Vec<FilterStage>,
}

impl SieveChain {
    fn new(bound: u32) -> Self {
        Self {
            source: CandidateStream::new(bound),
            stages: Vec::new(),
        }
    }
}

impl Iterator for SieveChain {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        // Stages are kept in discovery order, so the iterative walk visits
        // them exactly as a candidate would climb nested stages.
        'candidates: loop {
            let candidate = self.source.next()?;
            for stage in &self.stages {
                if !stage.admits(candidate) {
                    continue 'candidates;
                }
            }
            self.stages.push(FilterStage::new(candidate));
            return Some(candidate);
        }
    }
}

/// Compute all primes `<= bound` in ascending order.
///
/// Bounds below 2 yield the empty set. The same bound always yields the same
/// set; cost is one divisibility test per (candidate, earlier prime) pair.
pub fn sieve(bound: u32) -> PrimeSet {
    PrimeSet {
        primes: SieveChain::new(bound).collect(),
    }
}

/// Known-good answer for a specific bound, pinned as data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    pub bound: u32,
    pub count: usize,
    pub last: u32,
}

/// There are exactly 168 primes up to 1000 and the 168th is 997.
pub const CHECKPOINT_1000: Checkpoint = Checkpoint {
    bound: 1000,
    count: 168,
    last: 997,
};

/// Look up the pinned checkpoint for a bound, if one exists.
pub fn checkpoint_for(bound: u32) -> Option<Checkpoint> {
    if bound == CHECKPOINT_1000.bound {
        Some(CHECKPOINT_1000)
    } else {
        None
    }
}

impl Checkpoint {
    /// Check a produced set against this checkpoint.
    pub fn verify(&self, set: &PrimeSet) -> Result<(), CheckpointFailure> {
        if set.len() == self.count && set.last() == Some(self.last) {
            Ok(())
        } else {
            Err(CheckpointFailure {
                expected_count: self.count,
                expected_last: self.last,
                actual_count: set.len(),
                actual_last: set.last(),
            })
        }
    }
}

/// Details of a checkpoint mismatch, kept for the fatal error report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointFailure {
    pub expected_count: usize,
    pub expected_last: u32,
    pub actual_count: usize,
    pub actual_last: Option<u32>,
}

impl fmt::Display for CheckpointFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "expected {} primes ending in {}, got {}",
            self.expected_count, self.expected_last, self.actual_count
        )?;
        if let Some(last) = self.actual_last {
            write!(f, " ending in {}", last)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_below_two() {
        assert!(sieve(0).is_empty());
        assert!(sieve(1).is_empty());
    }

    #[test]
    fn test_two_is_the_first_prime() {
        let set = sieve(2);
        assert_eq!(set.as_slice(), &[2]);
    }

    #[test]
    fn test_first_primes() {
        let set = sieve(30);
        assert_eq!(set.as_slice(), &[2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
    }

    #[test]
    fn test_bound_is_inclusive() {
        assert_eq!(sieve(13).last(), Some(13));
        assert_eq!(sieve(12).last(), Some(11));
    }

    #[test]
    fn test_checkpoint_thousand() {
        let set = sieve(1000);
        assert_eq!(set.len(), 168);
        assert_eq!(set.first(), Some(2));
        assert_eq!(set.last(), Some(997));
        assert_eq!(set.get(167), Some(997));
        assert!(CHECKPOINT_1000.verify(&set).is_ok());
    }

    #[test]
    fn test_well_formed() {
        assert!(sieve(0).is_well_formed());
        assert!(sieve(100).is_well_formed());
        let bogus = PrimeSet {
            primes: vec![3, 5, 7],
        };
        assert!(!bogus.is_well_formed());
        let unordered = PrimeSet {
            primes: vec![2, 7, 5],
        };
        assert!(!unordered.is_well_formed());
    }

    #[test]
    fn test_determinism() {
        assert_eq!(sieve(500), sieve(500));
    }

    #[test]
    fn test_candidate_stream_yields_all_then_exhausts() {
        let mut stream = CandidateStream::new(4);
        assert_eq!(stream.next(), Some(2));
        assert_eq!(stream.next(), Some(3));
        assert_eq!(stream.next(), Some(4));
        assert_eq!(stream.next(), None);
        assert_eq!(stream.next(), None);
    }

    #[test]
    fn test_candidate_stream_stops_at_domain_top() {
        let mut stream = CandidateStream {
            next: u32::MAX,
            bound: u32::MAX,
            done: false,
        };
        assert_eq!(stream.next(), Some(u32::MAX));
        assert_eq!(stream.next(), None);
        assert_eq!(stream.next(), None);
    }

    #[test]
    fn test_filter_stage_admits() {
        let stage = FilterStage::new(3);
        assert!(stage.admits(4));
        assert!(stage.admits(5));
        assert!(!stage.admits(6));
        assert!(!stage.admits(9));
    }

    #[test]
    fn test_chain_grows_one_stage_per_prime() {
        let mut chain = SieveChain::new(50);
        let mut found = 0;
        while chain.next().is_some() {
            found += 1;
            assert_eq!(chain.stages.len(), found);
        }
        assert_eq!(found, 15);
    }

    #[test]
    fn test_checkpoint_lookup() {
        assert_eq!(checkpoint_for(1000), Some(CHECKPOINT_1000));
        assert_eq!(checkpoint_for(999), None);
    }

    #[test]
    fn test_checkpoint_failure_display() {
        let failure = CHECKPOINT_1000.verify(&sieve(991)).unwrap_err();
        assert_eq!(
            failure.to_string(),
            "expected 168 primes ending in 997, got 167 ending in 991"
        );

        let empty = CHECKPOINT_1000.verify(&sieve(1)).unwrap_err();
        assert_eq!(empty.to_string(), "expected 168 primes ending in 997, got 0");
    }
}
