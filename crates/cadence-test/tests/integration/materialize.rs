use cadence_test::recur::{
    EndCondition, OccurrenceInstance, RecurError, RecurrenceEngine, RecurrenceRule, SeriesId,
    SeriesState, SeriesStatus,
};
use cadence_test::{date, rule_from_form};
use chrono::{NaiveDate, TimeZone, Utc};

fn dates(instances: &[OccurrenceInstance]) -> Vec<NaiveDate> {
    instances.iter().map(|i| i.occurrence_date).collect()
}

#[test_log::test]
fn test_daily_todo_reopened_through_the_day() {
    let engine = RecurrenceEngine::new();
    let rule = rule_from_form("daily", 1, date(2025, 12, 29), None, Some(date(2025, 12, 31)))
        .expect("valid form");
    let id = SeriesId::new();
    let mut state = SeriesState::new(id);

    // The user opens "today's todos" three times on the same day.
    let mut created = Vec::new();
    for _ in 0..3 {
        created.extend(
            engine
                .ensure_materialized_up_to(id, &rule, &mut state, date(2025, 12, 30))
                .unwrap(),
        );
    }
    assert_eq!(dates(&created), vec![date(2025, 12, 29), date(2025, 12, 30)]);

    // Next day and the day after the series ends.
    let next = engine
        .ensure_materialized_up_to(id, &rule, &mut state, date(2026, 1, 2))
        .unwrap();
    assert_eq!(dates(&next), vec![date(2025, 12, 31)]);
    assert_eq!(engine.status(&rule, &state), SeriesStatus::Exhausted);
}

#[test]
fn test_state_round_trips_through_storage_between_calls() {
    let engine = RecurrenceEngine::new();
    let rule = RecurrenceRule::monthly(1, date(2024, 1, 31), EndCondition::Forever).unwrap();
    let id = SeriesId::new();
    let mut state = SeriesState::new(id);

    let first = engine
        .ensure_materialized_up_to(id, &rule, &mut state, date(2024, 2, 29))
        .unwrap();

    // Persist and reload both the rule and the cursor, as the caller would.
    let stored_rule = serde_json::to_string(&rule).unwrap();
    let stored_state = serde_json::to_string(&state).unwrap();
    let rule: RecurrenceRule = serde_json::from_str(&stored_rule).unwrap();
    let mut state: SeriesState = serde_json::from_str(&stored_state).unwrap();

    let second = engine
        .ensure_materialized_up_to(id, &rule, &mut state, date(2024, 5, 31))
        .unwrap();

    assert_eq!(dates(&first), vec![date(2024, 1, 31), date(2024, 2, 29)]);
    assert_eq!(
        dates(&second),
        vec![date(2024, 3, 29), date(2024, 4, 29), date(2024, 5, 29)]
    );
    assert_eq!(second[0].sequence_index, 2);
}

#[test]
fn test_after_count_three_across_many_calls() {
    let engine = RecurrenceEngine::new();
    let rule = rule_from_form("week", 1, date(2024, 1, 1), Some(3), None).unwrap();
    let id = SeriesId::new();
    let mut state = SeriesState::new(id);

    let total: usize = (0..10)
        .map(|_| {
            engine
                .ensure_materialized_up_to(id, &rule, &mut state, date(2030, 1, 1))
                .unwrap()
                .len()
        })
        .sum();
    assert_eq!(total, 3);
    assert_eq!(state.last_materialized_date(), Some(date(2024, 1, 15)));
}

#[test]
fn test_abandon_is_permanent_across_edits() {
    let engine = RecurrenceEngine::new();
    let rule = RecurrenceRule::daily(1, date(2024, 1, 1), EndCondition::AfterCount { count: 5 })
        .unwrap();
    let id = SeriesId::new();
    let mut state = SeriesState::new(id);

    engine
        .ensure_materialized_up_to(id, &rule, &mut state, date(2024, 1, 2))
        .unwrap();
    let abandoned_at = Utc.with_ymd_and_hms(2024, 1, 2, 18, 0, 0).unwrap();
    engine.abandon(id, &mut state, abandoned_at).unwrap();

    let extended = engine
        .replace_rule(id, &state, &rule, rule.with_end_condition(EndCondition::Forever).unwrap())
        .unwrap();
    let emitted = engine
        .ensure_materialized_up_to(id, &extended, &mut state, date(2030, 1, 1))
        .unwrap();

    assert!(emitted.is_empty());
    assert_eq!(state.materialized_count(), 2);
    assert_eq!(state.abandoned_at(), Some(abandoned_at));
}

#[test]
fn test_form_rejects_invalid_input() {
    assert!(rule_from_form("fortnightly", 1, date(2024, 1, 1), None, None).is_err());
    assert!(rule_from_form("day", 0, date(2024, 1, 1), None, None).is_err());
    assert!(rule_from_form("day", 1, date(2024, 1, 1), Some(2), Some(date(2024, 2, 1))).is_err());

    let err = rule_from_form("day", 1, date(2024, 1, 10), None, Some(date(2024, 1, 1)))
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RecurError>(),
        Some(RecurError::InvalidRuleError { field: "end_condition.until", .. })
    ));
}
