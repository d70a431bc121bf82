mod common;

use std::sync::Arc;

use proptest::prelude::*;

use common::fixtures::seed_users;
use common::TestEnv;
use trash_expiry::constants::USER_OFFSET_CHECKPOINT;
use trash_expiry::expiration::RetentionPolicy;
use trash_expiry::store::operations::checkpoints::{decode_offset, encode_offset};
use trash_expiry::store::Store;
use trash_expiry::sweep::SweepOutcome;
use trash_expiry::workers::expire_trash;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn pt_increments_return_disjoint_ascending_ranges(
        deltas in prop::collection::vec(1_u64..5_000, 1..40),
    ) {
        let store = Store::temporary().expect("temporary store");
        let mut expected = 0_u64;
        for delta in deltas {
            let previous = store.increment_checkpoint("pt", delta).expect("increment");
            prop_assert_eq!(previous, expected);
            expected += delta;
        }
        prop_assert_eq!(store.get_checkpoint("pt").expect("get"), expected);
    }

    #[test]
    fn pt_binary_offsets_are_stable(value in 0_u64..0x3030_3030_3030_3030) {
        prop_assert_eq!(decode_offset(&encode_offset(value)), Some(value));
    }

    #[test]
    fn pt_every_user_is_visited_once_per_cycle(
        population in 0_usize..60,
        batch_size in 1_usize..25,
    ) {
        let env = TestEnv::new();
        seed_users(&env.store, population, Some(chrono::Utc::now()));
        let mut sweep = expire_trash::build(
            env.store.clone(),
            env.data_dir(),
            RetentionPolicy::from_obligation("auto, 30"),
        )
        .with_batch_size(batch_size);

        let mut visited = 0_usize;
        let mut expected_offset = 0_u64;
        let wrapped_at = loop {
            match sweep.run_once().expect("sweep") {
                SweepOutcome::Processed(report) => {
                    prop_assert_eq!(report.offset, expected_offset);
                    prop_assert!(report.fetched >= 1 && report.fetched <= batch_size);
                    visited += report.fetched;
                    expected_offset += batch_size as u64;
                }
                SweepOutcome::Wrapped { offset } => break offset,
                SweepOutcome::Disabled => unreachable!("policy has a maximum"),
            }
        };

        prop_assert_eq!(visited, population);
        prop_assert_eq!(wrapped_at, expected_offset);
        prop_assert_eq!(
            env.store.get_checkpoint(USER_OFFSET_CHECKPOINT).expect("get"),
            0
        );
    }
}

#[test]
fn concurrent_sweeps_never_share_a_batch() {
    let env = TestEnv::new();
    seed_users(&env.store, 100, Some(chrono::Utc::now()));
    let store: Arc<Store> = env.store.clone();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            let data_dir = env.data_dir().to_path_buf();
            std::thread::spawn(move || {
                let mut sweep = expire_trash::build(
                    store,
                    &data_dir,
                    RetentionPolicy::from_obligation("auto, 30"),
                )
                .with_batch_size(10);
                match sweep.run_once().expect("sweep") {
                    SweepOutcome::Processed(report) => report.offset,
                    other => panic!("unexpected outcome {other:?}"),
                }
            })
        })
        .collect();

    let mut offsets: Vec<u64> = handles
        .into_iter()
        .map(|h| h.join().expect("sweep thread"))
        .collect();
    offsets.sort_unstable();
    assert_eq!(offsets, vec![0, 10, 20, 30]);
}
