use natal_insight::insight::{
    ModelTier,
    reliability::{AttemptOutcome, RetryState},
};

const FAILED: AttemptOutcome = AttemptOutcome::Failed;

#[test]
fn given_high_capability_primary_when_first_attempt_fails_then_fallback_follows_without_backoff() {
    let transition = RetryState::initial().advance(FAILED, ModelTier::HighCapability, 3);
    assert_eq!(transition.next, RetryState::TryFallback { attempt: 2 });
    assert!(!transition.backoff);
    assert_eq!(
        transition.next.tier(ModelTier::HighCapability),
        Some(ModelTier::Economical)
    );
}

#[test]
fn given_fallback_when_it_fails_then_same_model_is_retried_after_backoff() {
    let transition =
        RetryState::TryFallback { attempt: 2 }.advance(FAILED, ModelTier::HighCapability, 3);
    assert_eq!(transition.next, RetryState::TryFallback { attempt: 3 });
    assert!(transition.backoff);
}

#[test]
fn given_economical_primary_when_attempt_fails_then_primary_is_retried_after_backoff() {
    let transition = RetryState::initial().advance(FAILED, ModelTier::Economical, 2);
    assert_eq!(transition.next, RetryState::TryPrimary { attempt: 2 });
    assert!(transition.backoff);
    assert_eq!(
        transition.next.tier(ModelTier::Economical),
        Some(ModelTier::Economical)
    );
}

#[test]
fn given_last_allowed_attempt_when_it_fails_then_state_is_failed() {
    let transition =
        RetryState::TryPrimary { attempt: 2 }.advance(FAILED, ModelTier::Economical, 2);
    assert_eq!(transition.next, RetryState::Failed { attempts: 2 });
    assert!(transition.next.is_terminal());
}

#[test]
fn given_fallback_budget_left_when_high_capability_fails_then_downgrade_happens_regardless_of_error_kind()
 {
    let transition = RetryState::initial().advance(FAILED, ModelTier::HighCapability, 2);
    assert_eq!(transition.next, RetryState::TryFallback { attempt: 2 });

    let exhausted = transition
        .next
        .advance(FAILED, ModelTier::HighCapability, 2);
    assert_eq!(exhausted.next, RetryState::Failed { attempts: 2 });
    assert!(!exhausted.backoff);
}

#[test]
fn given_success_when_advanced_then_attempt_count_is_kept() {
    let transition = RetryState::TryFallback { attempt: 2 }.advance(
        AttemptOutcome::Succeeded,
        ModelTier::HighCapability,
        2,
    );
    assert_eq!(transition.next, RetryState::Succeeded { attempts: 2 });
}

#[test]
fn given_single_attempt_budget_when_high_capability_fails_then_no_fallback_happens() {
    let transition = RetryState::initial().advance(FAILED, ModelTier::HighCapability, 1);
    assert_eq!(transition.next, RetryState::Failed { attempts: 1 });
}
