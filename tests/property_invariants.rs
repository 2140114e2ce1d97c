use proptest::prelude::*;
use rand::{rngs::StdRng, SeedableRng};

use drawstats::{
    analysis::{
        accumulator::{self, AnalysisRequest, Window},
        combos::{self, ComboKey, ComboMode},
    },
    core::ordering,
    draw::{DrawRecord, GameOutcome},
    types::{GameKind, Jurisdiction},
};

fn race_records() -> impl Strategy<Value = Vec<DrawRecord>> {
    prop::collection::vec(
        prop::sample::subsequence((1u8..=12).collect::<Vec<_>>(), 4),
        1..40,
    )
    .prop_map(|draws| {
        draws
            .into_iter()
            .enumerate()
            .map(|(i, placings)| DrawRecord {
                id: i as u64 + 1,
                source_id: format!("race-{}", i + 1),
                jurisdiction: Jurisdiction::Nsw,
                draw_number: Some(i as u64 + 1),
                date: None,
                created_at_ms: i as u64,
                outcome: GameOutcome::Trackside {
                    placings,
                    dividend_cents: None,
                },
            })
            .collect()
    })
}

fn pair_request() -> AnalysisRequest {
    AnalysisRequest {
        game: GameKind::Trackside,
        size: 2,
        mode: ComboMode::Boxed,
        window: Window::AllTime,
    }
}

proptest! {
    #[test]
    fn accumulation_is_deterministic(records in race_records()) {
        let a = accumulator::accumulate(&records, &pair_request());
        let b = accumulator::accumulate(&records, &pair_request());
        prop_assert_eq!(a.total_draws, b.total_draws);
        prop_assert_eq!(a.stats, b.stats);
    }

    #[test]
    fn drought_and_gap_invariants_hold(records in race_records()) {
        let tally = accumulator::accumulate(&records, &pair_request());
        let total = tally.total_draws;
        prop_assert_eq!(total, records.len());

        // One boxed pair per race, so hits across keys cover every draw.
        let hits: u64 = tally.stats.values().map(|s| s.count).sum();
        prop_assert_eq!(hits, total as u64);

        for stat in tally.stats.values() {
            prop_assert!(stat.count >= 1);
            let last = stat.last_index.unwrap();
            prop_assert!(last < total);
            prop_assert_eq!(stat.gaps.len() as u64, stat.count - 1);
            prop_assert_eq!(
                stat.max_gap,
                stat.gaps.iter().copied().max().unwrap_or(0)
            );

            let current = stat.current_drought(total);
            prop_assert_eq!(current, (total - 1 - last) as u64);
            prop_assert!(stat.longest_drought(total) >= current);
            prop_assert!(stat.longest_drought(total) >= stat.max_gap);

            // Gaps plus appearances never exceed the index span.
            let span: u64 = stat.gaps.iter().sum::<u64>() + stat.count - 1;
            prop_assert!(span <= last as u64);
        }
    }

    #[test]
    fn last_n_window_matches_suffix_accumulation(
        records in race_records(),
        n in 1usize..50,
    ) {
        let windowed = accumulator::accumulate(
            &records,
            &AnalysisRequest { window: Window::LastN(n), ..pair_request() },
        );
        let start = records.len().saturating_sub(n);
        let suffix = accumulator::accumulate(&records[start..], &pair_request());
        prop_assert_eq!(windowed.total_draws, suffix.total_draws);
        prop_assert_eq!(windowed.stats, suffix.stats);
    }

    #[test]
    fn canonical_sort_is_permutation_invariant(
        records in race_records().prop_flat_map(|r| Just(r.clone()).prop_shuffle().prop_map(move |s| (r.clone(), s))),
    ) {
        let (original, shuffled) = records;
        let mut a = original;
        let mut b = shuffled;
        ordering::canonical_sort(&mut a);
        ordering::canonical_sort(&mut b);
        let ids_a: Vec<u64> = a.iter().map(|r| r.id).collect();
        let ids_b: Vec<u64> = b.iter().map(|r| r.id).collect();
        prop_assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn boxed_keys_ignore_member_order(values in prop::sample::subsequence((1u8..=80).collect::<Vec<_>>(), 1..=6)) {
        let mut reversed = values.clone();
        reversed.reverse();
        prop_assert_eq!(ComboKey::boxed(&values), ComboKey::boxed(&reversed));
    }

    #[test]
    fn key_display_round_trips_through_parse(values in prop::collection::vec(1u8..=80, 1..=6)) {
        let key = ComboKey::ordered(&values);
        prop_assert_eq!(ComboKey::parse(&key.to_string()), Some(key));
    }

    #[test]
    fn subset_enumeration_count_matches_binomial(
        pool in prop::sample::subsequence((1u8..=80).collect::<Vec<_>>(), 1..=20),
        k in 1usize..=4,
    ) {
        let keys = combos::enumerate_boxed(&pool, k);
        prop_assert_eq!(
            keys.len() as u64,
            combos::binomial(pool.len() as u64, k as u64)
        );
        for key in &keys {
            prop_assert_eq!(key.len(), k);
            prop_assert!(key.values().windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn binomial_is_symmetric_and_recursive(n in 1u64..=30, k in 0u64..=30) {
        if k > n {
            // Choosing more than available is impossible; symmetry only
            // holds inside 0..=n.
            prop_assert_eq!(combos::binomial(n, k), 0);
        } else {
            prop_assert_eq!(combos::binomial(n, k), combos::binomial(n, n - k));
            if k >= 1 {
                prop_assert_eq!(
                    combos::binomial(n, k),
                    combos::binomial(n - 1, k - 1) + combos::binomial(n - 1, k)
                );
            }
        }
    }

    #[test]
    fn sampling_avoids_seen_keys_and_stays_in_domain(
        seed in any::<u64>(),
        want in 0usize..20,
    ) {
        let seen: hashbrown::HashSet<ComboKey> = (1u8..=10)
            .map(|n| ComboKey::boxed(&[n, n + 1]))
            .collect();
        let mut rng = StdRng::seed_from_u64(seed);
        let sampled = combos::sample_unseen(
            GameKind::Trackside,
            2,
            &seen,
            want,
            combos::DEFAULT_SAMPLE_ATTEMPTS,
            &mut rng,
        );

        prop_assert!(sampled.len() <= want);
        let mut distinct = hashbrown::HashSet::new();
        for key in &sampled {
            prop_assert_eq!(key.len(), 2);
            prop_assert!(!seen.contains(key));
            prop_assert!(key.values().iter().all(|&v| (1..=12).contains(&v)));
            prop_assert!(distinct.insert(key.clone()));
        }
    }
}
