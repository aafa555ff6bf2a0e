use cadence_test::date;
use cadence_test::recur::{
    EndCondition, RecurError, RecurrenceEngine, RecurrenceRule, SeriesId, SeriesState,
    SeriesStatus,
};

#[test_log::test]
fn test_extend_count_then_continue() {
    let engine = RecurrenceEngine::new();
    let rule = RecurrenceRule::weekly(2, date(2024, 1, 1), EndCondition::AfterCount { count: 2 })
        .unwrap();
    let id = SeriesId::new();
    let mut state = SeriesState::new(id);

    engine
        .ensure_materialized_up_to(id, &rule, &mut state, date(2024, 12, 31))
        .unwrap();
    assert!(engine.next_occurrence(&rule, &state).is_none());

    let longer = rule
        .with_end_condition(EndCondition::AfterCount { count: 4 })
        .unwrap();
    let rule = engine.replace_rule(id, &state, &rule, longer).unwrap();
    assert_eq!(engine.next_occurrence(&rule, &state), Some(date(2024, 1, 29)));

    let emitted = engine
        .ensure_materialized_up_to(id, &rule, &mut state, date(2024, 12, 31))
        .unwrap();
    let indices: Vec<u64> = emitted.iter().map(|i| i.sequence_index).collect();
    assert_eq!(indices, vec![2, 3]);
}

#[test]
fn test_moving_anchor_after_materialization_is_rejected() {
    let engine = RecurrenceEngine::new();
    let rule = RecurrenceRule::daily(1, date(2024, 1, 1), EndCondition::Forever).unwrap();
    let id = SeriesId::new();
    let mut state = SeriesState::new(id);
    engine
        .ensure_materialized_up_to(id, &rule, &mut state, date(2024, 1, 1))
        .unwrap();

    let moved = RecurrenceRule::daily(1, date(2024, 1, 2), EndCondition::Forever).unwrap();
    let err = engine.replace_rule(id, &state, &rule, moved).unwrap_err();
    assert!(matches!(
        err,
        RecurError::RetroactiveEditError { index: 0, .. }
    ));
}

#[test]
fn test_until_shortened_to_last_materialized_date() {
    let engine = RecurrenceEngine::new();
    let rule = RecurrenceRule::daily(1, date(2024, 3, 1), EndCondition::Forever).unwrap();
    let id = SeriesId::new();
    let mut state = SeriesState::new(id);
    engine
        .ensure_materialized_up_to(id, &rule, &mut state, date(2024, 3, 4))
        .unwrap();

    let stop_now = rule
        .with_end_condition(EndCondition::UntilDate {
            until: date(2024, 3, 4),
        })
        .unwrap();
    let rule = engine.replace_rule(id, &state, &rule, stop_now).unwrap();

    assert!(
        engine
            .ensure_materialized_up_to(id, &rule, &mut state, date(2025, 1, 1))
            .unwrap()
            .is_empty()
    );

    let stop_earlier = rule
        .with_end_condition(EndCondition::UntilDate {
            until: date(2024, 3, 3),
        })
        .unwrap();
    let rule = engine.replace_rule(id, &state, &rule, stop_earlier).unwrap();
    assert_eq!(engine.status(&rule, &state), SeriesStatus::Exhausted);
    assert!(
        engine
            .ensure_materialized_up_to(id, &rule, &mut state, date(2025, 1, 1))
            .unwrap()
            .is_empty()
    );
    assert_eq!(state.materialized_count(), 4);
}
