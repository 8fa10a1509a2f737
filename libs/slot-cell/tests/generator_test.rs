use std::sync::Arc;

use assert_matches::assert_matches;
use futures::future::join_all;
use tokio_test::assert_ok;
use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use uuid::Uuid;

use shared_config::AppConfig;
use slot_cell::{AvailabilityTemplate, FixedClock, SlotError, SlotGenerator, SlotStore};

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

// 2030-01-07 is a Monday.
fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 1, 7).unwrap()
}

fn setup() -> (SlotGenerator, Arc<SlotStore>, Arc<FixedClock>) {
    let store = Arc::new(SlotStore::new());
    let clock = Arc::new(FixedClock::new(monday().and_hms_opt(6, 0, 0).unwrap()));
    let generator = SlotGenerator::new(&AppConfig::default(), Arc::clone(&store), clock.clone());
    (generator, store, clock)
}

fn workday_template(doctor_id: Uuid) -> AvailabilityTemplate {
    AvailabilityTemplate {
        doctor_id,
        start_time: t(9, 0),
        end_time: t(17, 0),
        slot_duration_minutes: 30,
        break_start: Some(t(13, 0)),
        break_end: Some(t(14, 0)),
        weekdays: vec![Weekday::Mon],
        horizon_weeks: 1,
        start_date: None,
    }
}

#[tokio::test]
async fn lunch_break_splits_monday_into_fourteen_slots() {
    let (generator, store, _) = setup();
    let doctor = Uuid::new_v4();

    let summary = assert_ok!(generator.generate(&workday_template(doctor)).await);
    assert_eq!(summary.created, 14);
    assert_eq!(summary.skipped, 0);

    let slots = store.list_by_doctor(doctor, None).await;
    assert_eq!(slots.len(), 14);
    assert_eq!(slots.iter().filter(|s| s.end_time <= t(13, 0)).count(), 8);
    assert_eq!(slots.iter().filter(|s| s.start_time >= t(14, 0)).count(), 6);
    assert!(slots
        .iter()
        .all(|s| s.end_time <= t(13, 0) || s.start_time >= t(14, 0)));
    assert!(slots.iter().all(|s| s.date == monday() && !s.is_booked));
}

#[tokio::test]
async fn generated_slots_have_exact_length_and_never_overlap() {
    let (generator, store, _) = setup();
    let doctor = Uuid::new_v4();
    let template = AvailabilityTemplate {
        slot_duration_minutes: 45,
        weekdays: vec![Weekday::Mon, Weekday::Wed, Weekday::Fri],
        horizon_weeks: 3,
        break_start: Some(t(12, 10)),
        break_end: Some(t(12, 50)),
        ..workday_template(doctor)
    };

    generator.generate(&template).await.unwrap();
    let slots = store.list_by_doctor(doctor, None).await;
    assert!(!slots.is_empty());

    for slot in &slots {
        assert_eq!(slot.duration_minutes(), 45);
        assert!(matches!(slot.date.weekday(), Weekday::Mon | Weekday::Wed | Weekday::Fri));
        assert!(slot.end_time <= t(12, 10) || slot.start_time >= t(12, 50));
    }
    for pair in slots.windows(2) {
        assert!(!pair[0].overlaps(&pair[1]));
    }
}

#[tokio::test]
async fn regenerating_is_idempotent() {
    let (generator, store, _) = setup();
    let doctor = Uuid::new_v4();
    let template = AvailabilityTemplate {
        weekdays: vec![Weekday::Mon, Weekday::Tue],
        horizon_weeks: 2,
        ..workday_template(doctor)
    };

    let first = generator.generate(&template).await.unwrap();
    let second = generator.generate(&template).await.unwrap();

    assert_eq!(first.created, 14 * 4);
    assert_eq!(second.created, 0);
    assert_eq!(second.skipped, first.created);
    assert_eq!(store.len().await, first.created);
}

#[tokio::test]
async fn overlapping_template_with_other_duration_only_fills_gaps() {
    let (generator, store, _) = setup();
    let doctor = Uuid::new_v4();

    generator
        .generate(&AvailabilityTemplate {
            end_time: t(10, 0),
            break_start: None,
            break_end: None,
            ..workday_template(doctor)
        })
        .await
        .unwrap();

    let summary = generator
        .generate(&AvailabilityTemplate {
            end_time: t(11, 0),
            slot_duration_minutes: 60,
            break_start: None,
            break_end: None,
            ..workday_template(doctor)
        })
        .await
        .unwrap();

    assert_eq!(summary.created, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(store.list_by_doctor(doctor, None).await.len(), 3);
}

#[tokio::test]
async fn empty_weekday_set_generates_nothing() {
    let (generator, store, _) = setup();
    let summary = generator
        .generate(&AvailabilityTemplate {
            weekdays: vec![],
            ..workday_template(Uuid::new_v4())
        })
        .await
        .unwrap();

    assert_eq!(summary.created, 0);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn break_outside_working_hours_is_ignored() {
    let (generator, _, _) = setup();
    let summary = generator
        .generate(&AvailabilityTemplate {
            start_time: t(9, 0),
            end_time: t(12, 0),
            break_start: Some(t(18, 0)),
            break_end: Some(t(19, 0)),
            ..workday_template(Uuid::new_v4())
        })
        .await
        .unwrap();

    assert_eq!(summary.created, 6);
}

#[tokio::test]
async fn invalid_templates_are_rejected() {
    let (generator, store, _) = setup();
    let doctor = Uuid::new_v4();

    for bad in [
        AvailabilityTemplate { slot_duration_minutes: 20, ..workday_template(doctor) },
        AvailabilityTemplate { slot_duration_minutes: 0, ..workday_template(doctor) },
        AvailabilityTemplate { start_time: t(17, 0), end_time: t(9, 0), ..workday_template(doctor) },
        AvailabilityTemplate { start_time: t(9, 0), end_time: t(9, 0), ..workday_template(doctor) },
        AvailabilityTemplate { horizon_weeks: 0, ..workday_template(doctor) },
        AvailabilityTemplate { horizon_weeks: 13, ..workday_template(doctor) },
        AvailabilityTemplate {
            break_start: Some(t(14, 0)),
            break_end: Some(t(13, 0)),
            ..workday_template(doctor)
        },
    ] {
        assert_matches!(generator.generate(&bad).await, Err(SlotError::InvalidTemplate(_)));
    }
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn past_start_date_is_clamped_to_today() {
    let (generator, store, clock) = setup();
    let doctor = Uuid::new_v4();
    clock.set(monday().and_hms_opt(6, 0, 0).unwrap() + chrono::Duration::days(1));

    generator
        .generate(&AvailabilityTemplate {
            start_date: Some(monday()),
            weekdays: vec![Weekday::Mon],
            horizon_weeks: 1,
            ..workday_template(doctor)
        })
        .await
        .unwrap();

    let slots = store.list_by_doctor(doctor, None).await;
    assert_eq!(slots.len(), 14);
    assert!(slots.iter().all(|s| s.date == NaiveDate::from_ymd_opt(2030, 1, 14).unwrap()));
}

#[tokio::test]
async fn future_start_date_shifts_the_horizon() {
    let (generator, store, _) = setup();
    let doctor = Uuid::new_v4();
    let start = NaiveDate::from_ymd_opt(2030, 2, 4).unwrap();

    generator
        .generate(&AvailabilityTemplate {
            start_date: Some(start),
            ..workday_template(doctor)
        })
        .await
        .unwrap();

    let slots = store.list_by_doctor(doctor, None).await;
    assert!(slots.iter().all(|s| s.date == start));
}

#[tokio::test]
async fn single_slot_creation_follows_granularity() {
    let (generator, store, _) = setup();
    let doctor = Uuid::new_v4();

    let slot = generator
        .create_single(doctor, monday(), t(8, 0), None)
        .await
        .unwrap();
    assert_eq!(slot.end_time, t(8, 30));

    assert_matches!(
        generator.create_single(doctor, monday(), t(8, 15), Some(30)).await,
        Err(SlotError::SlotConflict { .. })
    );
    assert_matches!(
        generator.create_single(doctor, monday(), t(10, 0), Some(25)).await,
        Err(SlotError::InvalidTemplate(_))
    );
    assert_eq!(store.len().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_generation_never_duplicates() {
    let (generator, store, _) = setup();
    let generator = Arc::new(generator);
    let doctor = Uuid::new_v4();
    let template = AvailabilityTemplate {
        weekdays: vec![Weekday::Mon, Weekday::Wed],
        horizon_weeks: 2,
        ..workday_template(doctor)
    };

    let runs = (0..8).map(|_| {
        let generator = Arc::clone(&generator);
        let template = template.clone();
        tokio::spawn(async move { generator.generate(&template).await })
    });
    let summaries: Vec<_> = join_all(runs)
        .await
        .into_iter()
        .map(|joined| assert_ok!(joined.unwrap()))
        .collect();

    let created: usize = summaries.iter().map(|s| s.created).sum();
    assert_eq!(created, 14 * 4);
    assert!(summaries.iter().all(|s| s.created + s.skipped == 14 * 4));

    let slots = store.list_by_doctor(doctor, None).await;
    assert_eq!(slots.len(), 14 * 4);
    for pair in slots.windows(2) {
        assert!(!pair[0].overlaps(&pair[1]));
    }
}
