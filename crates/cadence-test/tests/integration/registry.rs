use std::collections::HashSet;

use cadence_test::date;
use cadence_test::recur::{
    EndCondition, RecurrenceEngine, RecurrenceRule, Series, SeriesRegistry, SeriesStatus,
    SeriesTimezone,
};
use chrono::{TimeZone, Utc};

#[test_log::test]
fn test_many_series_in_parallel() {
    let registry = SeriesRegistry::new(RecurrenceEngine::new().with_max_batch(50));
    let ids: Vec<_> = (1..=16u32)
        .map(|interval| {
            let rule =
                RecurrenceRule::daily(interval, date(2024, 1, 1), EndCondition::Forever).unwrap();
            registry.insert(Series::new(rule, SeriesTimezone::UTC))
        })
        .collect();

    std::thread::scope(|scope| {
        for &id in &ids {
            let registry = &registry;
            scope.spawn(move || {
                for _ in 0..4 {
                    registry.materialize(id, date(2024, 3, 31)).unwrap();
                }
            });
        }
    });

    for (offset, id) in ids.iter().enumerate() {
        let interval = u64::try_from(offset).unwrap() + 1;
        let series = registry.get(*id).unwrap();
        // 91 days from Jan 1 to Mar 31 inclusive, capped at 4 batches of 50.
        let expected = (90 / interval + 1).min(200);
        assert_eq!(series.state.materialized_count(), expected, "interval {interval}");
    }
}

#[test]
fn test_concurrent_reopen_and_abandon() {
    let registry = SeriesRegistry::default();
    let rule = RecurrenceRule::daily(1, date(2024, 1, 1), EndCondition::Forever).unwrap();
    let id = registry.insert(Series::new(rule, SeriesTimezone::UTC));
    let at = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

    let dates: Vec<_> = std::thread::scope(|scope| {
        let readers: Vec<_> = (0..6)
            .map(|_| scope.spawn(|| registry.materialize(id, date(2024, 12, 31)).unwrap()))
            .collect();
        scope.spawn(|| registry.abandon(id, at).unwrap());
        readers
            .into_iter()
            .flat_map(|r| r.join().unwrap())
            .map(|i| i.occurrence_date)
            .collect()
    });

    let unique: HashSet<_> = dates.iter().copied().collect();
    assert_eq!(unique.len(), dates.len());

    let stored = registry.get(id).unwrap();
    assert_eq!(
        u64::try_from(dates.len()).unwrap(),
        stored.state.materialized_count()
    );
    assert_eq!(registry.status(id).unwrap(), SeriesStatus::Abandoned);
}

#[test]
fn test_hydrate_from_storage() {
    let registry = SeriesRegistry::default();
    let rule = RecurrenceRule::yearly(1, date(2024, 2, 29), EndCondition::Forever).unwrap();
    let tz = SeriesTimezone::resolve("Europe/Paris").unwrap();
    let id = registry.insert(Series::new(rule, tz));
    registry.materialize(id, date(2026, 3, 1)).unwrap();

    let stored = serde_json::to_string(&registry.remove(id).unwrap()).unwrap();
    let restored: Series = serde_json::from_str(&stored).unwrap();
    assert_eq!(restored.timezone, tz);
    registry.insert(restored);

    let emitted = registry.materialize(id, date(2028, 12, 31)).unwrap();
    let dates: Vec<_> = emitted.iter().map(|i| i.occurrence_date).collect();
    assert_eq!(dates, vec![date(2027, 2, 28), date(2028, 2, 28)]);
}
