use std::cell::Cell;

use opguard::errors::OpguardError;
use opguard::Outcome;

fn failed() -> Outcome<i32> {
    Outcome::failure(OpguardError::Validation("bad input".to_string()))
}

#[test]
fn discriminants_match_variant() {
    let ok: Outcome<i32> = Outcome::success(1);
    assert!(ok.is_success());
    assert!(!ok.is_failure());
    assert_eq!(ok.message(), None);

    let err = failed();
    assert!(err.is_failure());
    assert_eq!(err.message(), Some("Validation error: bad input"));
}

#[test]
fn map_passes_failure_through_unchanged() {
    let mapped = failed().map(|v| v * 2);
    match mapped {
        Outcome::Failure { error, message } => {
            assert!(matches!(error, OpguardError::Validation(ref m) if m == "bad input"));
            assert_eq!(message, "Validation error: bad input");
        }
        Outcome::Success(_) => panic!("expected failure"),
    }

    assert_eq!(Outcome::<i32>::success(21).map(|v| v * 2).get_or_none(), Some(42));
}

#[test]
fn and_then_composes_without_nesting() {
    let half = |v: i32| -> Outcome<i32> {
        if v % 2 == 0 {
            Outcome::success(v / 2)
        } else {
            Outcome::failure(OpguardError::Validation(format!("{v} is odd")))
        }
    };

    assert_eq!(Outcome::success(8).and_then(half).and_then(half).get_or_none(), Some(2));

    let odd = Outcome::success(6).and_then(half).and_then(half);
    assert_eq!(odd.message(), Some("Validation error: 3 is odd"));
}

#[test]
fn callbacks_observe_without_consuming() {
    let seen_success = Cell::new(0);
    let seen_failure = Cell::new(false);

    let out = Outcome::<i32>::success(5)
        .on_success(|v| seen_success.set(*v))
        .on_failure(|_, _| seen_failure.set(true));
    assert_eq!(seen_success.get(), 5);
    assert!(!seen_failure.get());
    assert_eq!(out.get_or_none(), Some(5));

    let out = failed().on_failure(|_, msg| {
        assert_eq!(msg, "Validation error: bad input");
        seen_failure.set(true);
    });
    assert!(seen_failure.get());
    assert!(out.is_failure());
}

#[test]
fn get_or_throw_reports_generic_unwrap_error() {
    assert_eq!(Outcome::<i32>::success(3).get_or_throw().unwrap(), 3);

    match failed().get_or_throw() {
        Err(OpguardError::Unwrap(msg)) => assert_eq!(msg, "Validation error: bad input"),
        other => panic!("expected Unwrap error, got {other:?}"),
    }
}

#[test]
fn converts_from_result_and_back() {
    let from_err: Outcome<i32> =
        Err(OpguardError::ResourceState("gone".to_string())).into();
    assert_eq!(from_err.message(), Some("Resource state error: gone"));
    assert!(matches!(from_err.into_result(), Err(OpguardError::ResourceState(_))));

    let custom = Outcome::<(), _>::failure_with_message("raw", "custom message");
    assert_eq!(custom.message(), Some("custom message"));
    assert_eq!(custom.error(), Some(&"raw"));
}
