use chrono::{NaiveDate, NaiveTime, Utc};
use common::UserId;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use domain::{
    Element, ElementCategory, ElementLine, HoldPolicy, Reservation, ReservationDraft, Space,
    SpaceKind, SubmissionRules, TimeWindow, check_availability, check_stock,
};

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, 10).unwrap()
}

fn window(start_minute: u32, minutes: u32) -> TimeWindow {
    let start = NaiveTime::from_hms_opt(7 + start_minute / 60, start_minute % 60, 0).unwrap();
    let end_minute = start_minute + minutes;
    let end = NaiveTime::from_hms_opt(7 + end_minute / 60, end_minute % 60, 0).unwrap();
    TimeWindow::new(date(), start, end).unwrap()
}

/// A busy day: `per_space` back-to-back half-hour slots in each space, every
/// reservation borrowing one unit of a shared element.
fn busy_day(spaces: &[Space], elements: &[Element], per_space: u32) -> Vec<Reservation> {
    let rules = SubmissionRules {
        reject_past_dates: false,
        ..SubmissionRules::default()
    };
    let mut schedule = Vec::new();
    for (s, space) in spaces.iter().enumerate() {
        for slot in 0..per_space {
            let element = &elements[(s + slot as usize) % elements.len()];
            let draft = ReservationDraft {
                space_id: space.id,
                requester_id: UserId::new(),
                window: window(slot * 30, 30),
                motive: "Benchmark reservation motive".to_string(),
                lines: vec![ElementLine::new(element.id, 1)],
            };
            let (reservation, _) = Reservation::submit(draft, &rules, date(), Utc::now()).unwrap();
            schedule.push(reservation);
        }
    }
    schedule
}

fn catalog() -> (Vec<Space>, Vec<Element>) {
    let spaces = (0..20)
        .map(|i| Space::new(format!("Room {i}"), SpaceKind::Classroom, 30, "Block B").unwrap())
        .collect();
    let elements = (0..8)
        .map(|i| Element::new(format!("Projector {i}"), ElementCategory::Technology, 50).unwrap())
        .collect();
    (spaces, elements)
}

fn bench_availability(c: &mut Criterion) {
    let (spaces, elements) = catalog();
    let mut group = c.benchmark_group("validators/availability");

    for per_space in [4u32, 12, 24] {
        let schedule = busy_day(&spaces, &elements, per_space);
        group.bench_with_input(
            BenchmarkId::from_parameter(schedule.len()),
            &schedule,
            |b, schedule| {
                b.iter(|| {
                    check_availability(&spaces[0], &window(60, 90), schedule, None, HoldPolicy::Soft)
                });
            },
        );
    }
    group.finish();
}

fn bench_stock(c: &mut Criterion) {
    let (spaces, elements) = catalog();
    let lines: Vec<ElementLine> = elements.iter().map(|e| ElementLine::new(e.id, 2)).collect();
    let mut group = c.benchmark_group("validators/stock");

    for per_space in [4u32, 12, 24] {
        let schedule = busy_day(&spaces, &elements, per_space);
        group.bench_with_input(
            BenchmarkId::from_parameter(schedule.len()),
            &schedule,
            |b, schedule| {
                b.iter(|| {
                    check_stock(&lines, &window(60, 90), &elements, schedule, None, HoldPolicy::Soft)
                        .unwrap()
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_availability, bench_stock);
criterion_main!(benches);
