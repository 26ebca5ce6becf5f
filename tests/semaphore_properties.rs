use opguard::sync::{Semaphore, SemaphorePermit};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Action {
    Acquire,
    Release,
    UnmatchedRelease,
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        3 => Just(Action::Acquire),
        2 => Just(Action::Release),
        1 => Just(Action::UnmatchedRelease),
    ]
}

proptest! {
    #[test]
    fn permits_stay_within_bounds(
        max in 1usize..8,
        actions in proptest::collection::vec(action_strategy(), 0..64),
    ) {
        let sem = Semaphore::new(max);
        let mut held: Vec<SemaphorePermit> = Vec::new();
        let mut unmatched = false;

        for action in actions {
            match action {
                Action::Acquire => {
                    let before = sem.available_permits();
                    match sem.try_acquire() {
                        Some(permit) => {
                            prop_assert!(before > 0);
                            held.push(permit);
                        }
                        None => prop_assert_eq!(before, 0),
                    }
                }
                Action::Release => {
                    held.pop();
                }
                Action::UnmatchedRelease => {
                    unmatched |= sem.available_permits() < max;
                    sem.release();
                }
            }

            let available = sem.available_permits();
            prop_assert!(available <= max);
            if !unmatched {
                prop_assert_eq!(available + held.len(), max);
            }
        }

        drop(held);
        prop_assert_eq!(sem.available_permits(), max);
    }
}
