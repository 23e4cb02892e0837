use cogex_timing::{Clock, ManualClock, Scheduler};
use proptest::prelude::*;

proptest! {
    #[test]
    fn pops_are_sorted_and_clock_is_monotonic(
        delays in prop::collection::vec(0u64..5_000, 1..40),
        cancel_mask in prop::collection::vec(any::<bool>(), 40),
    ) {
        let mut scheduler = Scheduler::new(ManualClock::default());
        let mut live = Vec::new();
        for (i, delay) in delays.iter().enumerate() {
            let handle = scheduler.schedule(*delay, i);
            if cancel_mask[i] {
                prop_assert!(scheduler.cancel(handle));
            } else {
                live.push(i);
            }
        }

        let mut fired = Vec::new();
        let mut last = 0;
        while let Some(i) = scheduler.pop_due(u64::MAX) {
            prop_assert!(scheduler.clock().now() >= last);
            last = scheduler.clock().now();
            prop_assert_eq!(last, delays[i]);
            fired.push(i);
        }

        let mut expected = live.clone();
        expected.sort_by_key(|&i| (delays[i], i));
        prop_assert_eq!(fired, expected);
    }
}
