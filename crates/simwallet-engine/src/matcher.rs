//! Same-recipient, near-same-time transaction matching.
//!
//! Both modes are greedy: each transaction takes the *first* unused candidate
//! in iteration order and stops. This is not a maximum bipartite matching and
//! results depend on the order the provider returned transactions in, so
//! callers keep the ascending block order from the fetch step.

use std::collections::HashSet;

use alloy::primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use simwallet_data::Transaction;

use crate::score::WalletScore;

/// Two transactions sent to the same contract within the match tolerance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimilarityMatch {
    /// Transaction from the first wallet.
    pub transaction_a: Transaction,
    /// Matched transaction from the second wallet.
    pub transaction_b: Transaction,
    /// Shared recipient.
    pub contract_address: Address,
    /// Timestamp of `transaction_a` (unix seconds).
    pub timestamp: u64,
    /// Value of `transaction_a` in wei.
    pub value: U256,
    /// Method signature of `transaction_a`, for display.
    pub method_signature: String,
}

/// Matches wallet A's history against wallet B's.
///
/// For every transaction in `a`, the first transaction in `b` with the same
/// recipient, within `tolerance_secs`, and not yet matched is taken. Each
/// hash in `b` is used at most once. Output is sorted by timestamp.
pub fn match_pairwise(
    a: &[Transaction],
    b: &[Transaction],
    tolerance_secs: u64,
) -> Vec<SimilarityMatch> {
    let mut used: HashSet<B256> = HashSet::new();
    let mut matches = Vec::new();

    for tx_a in a {
        let Some(contract) = tx_a.to else {
            continue;
        };

        let candidate = b.iter().find(|tx_b| {
            tx_b.to == Some(contract)
                && !used.contains(&tx_b.hash)
                && tx_a.timestamp.abs_diff(tx_b.timestamp) <= tolerance_secs
        });

        if let Some(tx_b) = candidate {
            used.insert(tx_b.hash);
            matches.push(SimilarityMatch {
                transaction_a: tx_a.clone(),
                transaction_b: tx_b.clone(),
                contract_address: contract,
                timestamp: tx_a.timestamp,
                value: tx_a.value,
                method_signature: tx_a.method_signature(),
            });
        }
    }

    matches.sort_by_key(|m| m.timestamp);
    matches
}

/// Credits at most one neighborhood transaction for `subject`.
///
/// Takes the first transaction in `neighborhood` that is not in `used`, goes
/// to the subject's recipient, and was not sent by `subject_wallet`. Its hash
/// is added to `used` and its sender's score incremented. The subject
/// transaction itself is never credited. Returns the credited wallet.
pub fn credit_neighborhood(
    subject: &Transaction,
    subject_wallet: Address,
    neighborhood: &[Transaction],
    used: &mut HashSet<B256>,
    scores: &mut WalletScore,
) -> Option<Address> {
    let contract = subject.to?;

    let candidate = neighborhood.iter().find(|tx| {
        tx.to == Some(contract)
            && tx.from != subject_wallet
            && tx.hash != subject.hash
            && !used.contains(&tx.hash)
    })?;

    used.insert(candidate.hash);
    scores.credit(candidate.from);
    Some(candidate.from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, Bytes};

    const CONTRACT: Address = address!("5300000000000000000000000000000000000004");
    const OTHER: Address = address!("5300000000000000000000000000000000000099");
    const WALLET_1: Address = address!("1111111111111111111111111111111111111111");
    const WALLET_2: Address = address!("2222222222222222222222222222222222222222");
    const WALLET_3: Address = address!("3333333333333333333333333333333333333333");

    fn tx(id: u64, from: Address, to: Address, timestamp: u64) -> Transaction {
        Transaction {
            block_number: timestamp / 2,
            timestamp,
            from,
            to: Some(to),
            hash: B256::left_padding_from(&id.to_be_bytes()),
            value: U256::from(id),
            input: Bytes::from_static(&[0x12, 0x34, 0x56, 0x78, 0x9a]),
        }
    }

    #[test]
    fn match_within_tolerance() {
        let w1 = vec![tx(1, WALLET_1, CONTRACT, 100)];
        let w2 = vec![tx(2, WALLET_2, CONTRACT, 130)];

        let matches = match_pairwise(&w1, &w2, 60);
        assert_eq!(matches.len(), 1);
        let m = &matches[0];
        assert_eq!(m.contract_address, CONTRACT);
        assert_eq!(m.timestamp, 100);
        assert_eq!(m.value, U256::from(1));
        assert_eq!(m.method_signature, "0x12345678");
        assert_eq!(m.transaction_b.hash, w2[0].hash);
    }

    #[test]
    fn no_match_beyond_tolerance() {
        let w1 = vec![tx(1, WALLET_1, CONTRACT, 100)];
        let w2 = vec![tx(2, WALLET_2, CONTRACT, 200)];
        assert!(match_pairwise(&w1, &w2, 60).is_empty());

        // Boundary: exactly 60s apart still matches, 61s does not.
        let w2 = vec![tx(3, WALLET_2, CONTRACT, 160)];
        assert_eq!(match_pairwise(&w1, &w2, 60).len(), 1);
        let w2 = vec![tx(4, WALLET_2, CONTRACT, 161)];
        assert!(match_pairwise(&w1, &w2, 60).is_empty());
    }

    #[test]
    fn different_recipient_never_matches() {
        let w1 = vec![tx(1, WALLET_1, CONTRACT, 100)];
        let w2 = vec![tx(2, WALLET_2, OTHER, 100)];
        assert!(match_pairwise(&w1, &w2, 60).is_empty());
    }

    #[test]
    fn zero_delta_same_recipient_matches() {
        let w1 = vec![tx(1, WALLET_1, CONTRACT, 100)];
        let w2 = vec![tx(2, WALLET_2, CONTRACT, 100)];

        let matches = match_pairwise(&w1, &w2, 60);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].transaction_b.hash, w2[0].hash);

        // Holds even with no tolerance at all.
        assert_eq!(match_pairwise(&w1, &w2, 0).len(), 1);
    }

    #[test]
    fn zero_delta_candidate_taken_by_earlier_transaction() {
        // A@90 claims B@100 first, leaving nothing for A@100.
        let w1 = vec![
            tx(1, WALLET_1, CONTRACT, 90),
            tx(2, WALLET_1, CONTRACT, 100),
        ];
        let w2 = vec![tx(3, WALLET_2, CONTRACT, 100)];

        let matches = match_pairwise(&w1, &w2, 60);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].transaction_a.hash, w1[0].hash);
        assert_eq!(matches[0].transaction_b.hash, w2[0].hash);
    }

    #[test]
    fn contract_creation_never_matches() {
        let mut creation = tx(1, WALLET_1, CONTRACT, 100);
        creation.to = None;
        let mut other_creation = tx(2, WALLET_2, CONTRACT, 100);
        other_creation.to = None;
        assert!(match_pairwise(&[creation], &[other_creation], 60).is_empty());
    }

    #[test]
    fn each_b_transaction_is_used_once() {
        // Two A transactions compete for the single B transaction.
        let w1 = vec![
            tx(1, WALLET_1, CONTRACT, 100),
            tx(2, WALLET_1, CONTRACT, 110),
        ];
        let w2 = vec![tx(3, WALLET_2, CONTRACT, 105)];

        let matches = match_pairwise(&w1, &w2, 60);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].transaction_a.hash, w1[0].hash);
    }

    #[test]
    fn greedy_first_match_is_not_optimal() {
        // A1 grabs B1 although B2 would also fit it; A2 can then only use B1
        // and is left unmatched. A maximum matching would pair both.
        let w1 = vec![
            tx(1, WALLET_1, CONTRACT, 100),
            tx(2, WALLET_1, CONTRACT, 30),
        ];
        let w2 = vec![
            tx(3, WALLET_2, CONTRACT, 80),
            tx(4, WALLET_2, CONTRACT, 150),
        ];

        let matches = match_pairwise(&w1, &w2, 60);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].transaction_b.hash, w2[0].hash);
    }

    #[test]
    fn output_sorted_by_timestamp() {
        let w1 = vec![
            tx(1, WALLET_1, CONTRACT, 500),
            tx(2, WALLET_1, OTHER, 100),
            tx(3, WALLET_1, CONTRACT, 300),
        ];
        let w2 = vec![
            tx(4, WALLET_2, CONTRACT, 290),
            tx(5, WALLET_2, OTHER, 120),
            tx(6, WALLET_2, CONTRACT, 510),
        ];

        let matches = match_pairwise(&w1, &w2, 60);
        let times: Vec<u64> = matches.iter().map(|m| m.timestamp).collect();
        assert_eq!(times, vec![100, 300, 500]);
    }

    #[test]
    fn pairwise_is_idempotent() {
        let w1: Vec<_> = (0..20)
            .map(|i| tx(i, WALLET_1, CONTRACT, 1_000 + i * 37))
            .collect();
        let w2: Vec<_> = (100..120)
            .map(|i| tx(i, WALLET_2, CONTRACT, 1_000 + (i - 100) * 41))
            .collect();
        assert_eq!(match_pairwise(&w1, &w2, 60), match_pairwise(&w1, &w2, 60));
    }

    #[test]
    fn neighborhood_credits_first_unused_foreign_sender() {
        let subject = tx(1, WALLET_1, CONTRACT, 100);
        let neighborhood = vec![
            subject.clone(),
            tx(2, WALLET_1, CONTRACT, 101),
            tx(3, WALLET_2, OTHER, 101),
            tx(4, WALLET_2, CONTRACT, 102),
            tx(5, WALLET_3, CONTRACT, 103),
        ];
        let mut used = HashSet::new();
        let mut scores = WalletScore::new();

        let credited =
            credit_neighborhood(&subject, WALLET_1, &neighborhood, &mut used, &mut scores);
        assert_eq!(credited, Some(WALLET_2));
        assert_eq!(scores.get(&WALLET_2), 1);
        assert_eq!(scores.get(&WALLET_3), 0);
        assert!(used.contains(&neighborhood[3].hash));
    }

    #[test]
    fn neighborhood_skips_used_transactions() {
        let first = tx(1, WALLET_1, CONTRACT, 100);
        let second = tx(2, WALLET_1, CONTRACT, 104);
        let neighborhood = vec![
            tx(3, WALLET_2, CONTRACT, 102),
            tx(4, WALLET_3, CONTRACT, 103),
        ];
        let mut used = HashSet::new();
        let mut scores = WalletScore::new();

        credit_neighborhood(&first, WALLET_1, &neighborhood, &mut used, &mut scores);
        credit_neighborhood(&second, WALLET_1, &neighborhood, &mut used, &mut scores);
        let third = credit_neighborhood(&second, WALLET_1, &neighborhood, &mut used, &mut scores);

        assert_eq!(scores.get(&WALLET_2), 1);
        assert_eq!(scores.get(&WALLET_3), 1);
        assert_eq!(third, None);
    }
}
