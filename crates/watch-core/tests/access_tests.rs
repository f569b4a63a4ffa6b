use proptest::prelude::*;
use watch_core::{AccessMode, ErrorKind, TypedView};
use watch_test_utils::BasicPoco;

fn any_mode() -> impl Strategy<Value = AccessMode> {
    prop_oneof![
        Just(AccessMode::ReadWrite),
        Just(AccessMode::NoSet),
        Just(AccessMode::ReadOnly),
    ]
}

#[test]
fn test_read_write_transitions() {
    let mode = AccessMode::ReadWrite;
    assert!(mode.validate_transition(AccessMode::ReadWrite).is_ok());
    assert!(mode.validate_transition(AccessMode::NoSet).is_ok());
    assert!(mode.validate_transition(AccessMode::ReadOnly).is_ok());
}

#[test]
fn test_read_only_is_terminal() {
    let mode = AccessMode::ReadOnly;
    assert!(mode.validate_transition(AccessMode::ReadOnly).is_ok());

    // Invalid
    assert!(mode.validate_transition(AccessMode::NoSet).is_err());
    assert!(mode.validate_transition(AccessMode::ReadWrite).is_err());
}

#[test]
fn test_no_set_view_reads_and_clears() {
    let view = TypedView::<BasicPoco>::new(true);
    view.set(&BasicPoco::INT_VALUE, 1).unwrap();
    let no_set = view.reference_copy(AccessMode::NoSet).unwrap();

    let err = no_set.set(&BasicPoco::INT_VALUE, 2).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AccessViolation);
    assert!(err.is_recoverable());

    assert_eq!(no_set.get(&BasicPoco::INT_VALUE).unwrap(), 1);
    assert_eq!(no_set.history(&BasicPoco::INT_VALUE).unwrap().len(), 1);
    no_set.clear_history().unwrap();
    no_set.clear().unwrap();
    assert!(!view.has_value(&BasicPoco::INT_VALUE));
}

proptest! {
    #[test]
    fn prop_copies_never_loosen(from in any_mode(), to in any_mode()) {
        let store = TypedView::<BasicPoco>::new(false);
        let source = store.reference_copy(from).unwrap();
        let copy = source.reference_copy(to);

        if to >= from {
            prop_assert_eq!(copy.unwrap().access_mode(), to);
        } else {
            prop_assert_eq!(copy.unwrap_err().kind(), ErrorKind::Argument);
        }
    }

    #[test]
    fn prop_mode_gates_every_mutation(mode in any_mode(), value in any::<i32>()) {
        let store = TypedView::<BasicPoco>::new(true);
        store.set(&BasicPoco::INT_VALUE, 0).unwrap();
        let view = store.reference_copy(mode).unwrap();

        prop_assert_eq!(view.set(&BasicPoco::INT_VALUE, value).is_ok(), mode.allows_set());
        prop_assert_eq!(view.clear_history().is_ok(), mode.allows_clear());
        prop_assert_eq!(view.clear().is_ok(), mode.allows_clear());
        prop_assert!(view.try_get(&BasicPoco::STRING_VALUE).is_none());
    }

    #[test]
    fn prop_history_matches_writes(values in proptest::collection::vec(any::<i32>(), 1..20)) {
        let view = TypedView::<BasicPoco>::new(true);
        for value in &values {
            view.set(&BasicPoco::INT_VALUE, *value).unwrap();
        }

        let history: Vec<i32> = view.history(&BasicPoco::INT_VALUE).unwrap().collect();
        prop_assert_eq!(view.get(&BasicPoco::INT_VALUE).unwrap(), *values.last().unwrap());
        prop_assert_eq!(history, values);
    }
}
