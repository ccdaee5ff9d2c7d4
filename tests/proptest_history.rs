use labelcraft::history::TimeTraveller;
use proptest::prelude::*;

mod proptest_helpers;

#[derive(Clone, Debug)]
enum Op {
    Record(u32),
    Undo,
    Redo,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => any::<u32>().prop_map(Op::Record),
        1 => Just(Op::Undo),
        1 => Just(Op::Redo),
    ]
}

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn undo_all_returns_to_start(values in prop::collection::vec(1u32..1000, 1..20)) {
        let mut history = TimeTraveller::new(None);
        history.attach(0u32);
        let mut current = 0;
        for value in values {
            let next = current + value;
            history.record_now(next);
            current = next;
        }

        let mut last = None;
        while let Some(state) = history.undo() {
            // Applying a snapshot notifies once; the latch swallows it.
            prop_assert!(!history.record_now(state));
            last = Some(state);
        }
        prop_assert_eq!(last, Some(0));
        prop_assert!(!history.can_undo());
    }

    #[test]
    fn undo_then_redo_is_identity(ops in prop::collection::vec(arb_op(), 0..40)) {
        let mut history = TimeTraveller::new(None);
        history.attach(0u32);
        for op in ops {
            match op {
                Op::Record(v) => {
                    history.record_now(v);
                }
                Op::Undo => {
                    if let Some(state) = history.undo() {
                        history.record_now(state);
                    }
                }
                Op::Redo => {
                    if let Some(state) = history.redo() {
                        history.record_now(state);
                    }
                }
            }
        }

        let before = history.current().copied();
        if let Some(state) = history.undo() {
            history.record_now(state);
            let redone = history.redo();
            prop_assert_eq!(redone, before);
        }
    }

    #[test]
    fn limit_bounds_length(
        limit in 1usize..8,
        values in prop::collection::vec(any::<u32>(), 0..40),
    ) {
        let mut history = TimeTraveller::new(Some(limit));
        history.attach(u32::MAX);
        for value in values {
            history.record_now(value);
            prop_assert!(history.len() <= limit);
        }
        prop_assert_eq!(history.reset(), Some(u32::MAX));
    }
}
