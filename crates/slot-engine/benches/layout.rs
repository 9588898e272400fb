//! Benchmarks for day layout and bulk slot planning.

use chrono::{Duration, TimeZone, Utc};
use criterion::{criterion_group, criterion_main, Criterion};
use slot_engine::{
    layout_day, plan_bulk_slots, BatchPolicy, BulkSlotRequest, CalendarEvent, DayOfWeek,
    DayWindow, SlotConfig, TimeOfDay, Zone,
};
use std::hint::black_box;

fn busy_day(n: i64) -> Vec<CalendarEvent> {
    let base = Utc.with_ymd_and_hms(2026, 3, 16, 8, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let start = base + Duration::minutes((i * 17) % 600);
            CalendarEvent {
                id: format!("ev-{}", i),
                start,
                end: start + Duration::minutes(30 + (i % 4) * 15),
                title: format!("Interview {}", i),
                metadata: Default::default(),
            }
        })
        .collect()
}

fn bench_layout(c: &mut Criterion) {
    let events = busy_day(60);
    let window = DayWindow::default();
    c.bench_function("layout_day_60_events", |b| {
        b.iter(|| layout_day(black_box(&events), &window, Zone::default()))
    });
}

fn bench_bulk(c: &mut Criterion) {
    let existing: Vec<SlotConfig> = DayOfWeek::ALL
        .into_iter()
        .filter_map(|day| SlotConfig::new(day, TimeOfDay::from_hm(18, 0).ok()?, 60).ok())
        .collect();
    let request = BulkSlotRequest {
        days: DayOfWeek::ALL.to_vec(),
        start: TimeOfDay::from_hm(8, 0).unwrap_or(TimeOfDay::MIDNIGHT),
        end: TimeOfDay::from_hm(17, 0).unwrap_or(TimeOfDay::MIDNIGHT).into(),
        duration: 15,
    };
    c.bench_function("plan_bulk_slots_week_15min", |b| {
        b.iter(|| plan_bulk_slots(black_box(&request), &existing, BatchPolicy::AbortBatch))
    });
}

criterion_group!(benches, bench_layout, bench_bulk);
criterion_main!(benches);
