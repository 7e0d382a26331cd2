use lamp_core::Millis;
use lamp_core::scheduler::Scheduler;
use lamp_core::timer::TaskTimer;

#[derive(Default)]
struct Counter {
    runs: heapless::Vec<u32, 16>,
}

fn record(counter: &mut Counter, now: Millis) {
    counter.runs.push(now.as_millis()).unwrap();
}

#[test]
fn timer_decides_across_the_boundary() {
    let timer = TaskTimer::starting_at(Millis::MAX.wrapping_add(u32::MAX), 5);
    assert_eq!(timer.last_run(), Millis::from_millis(u32::MAX - 1));
    assert!(!timer.is_due(Millis::from_millis(1)));
    assert!(timer.is_due(Millis::from_millis(3)));
}

#[test]
fn scheduler_behaves_the_same_near_zero_and_near_max() {
    fn run_from(start: u32) -> heapless::Vec<u32, 16> {
        let mut scheduler: Scheduler<Counter, 1> = Scheduler::new(Counter::default());
        scheduler.register("tick", 5, record).unwrap();

        // Align the first run with `start` so both runs share the same phase.
        let start = Millis::from_millis(start);
        scheduler.tick(start);

        let mut offsets = heapless::Vec::new();
        for step in 1..=20 {
            let now = start.wrapping_add(step);
            if !scheduler.tick(now).is_idle() {
                offsets.push(now.wrapping_since(start)).unwrap();
            }
        }
        offsets
    }

    let near_zero = run_from(1_000);
    let near_max = run_from(u32::MAX - 7);
    assert_eq!(near_zero.as_slice(), &[5, 10, 15, 20]);
    assert_eq!(near_zero, near_max);
}

#[test]
fn repeated_reading_is_idempotent_across_wrap() {
    let mut scheduler: Scheduler<Counter, 1> = Scheduler::new(Counter::default());
    scheduler.register("tick", 1, record).unwrap();

    let now = Millis::from_millis(2);
    scheduler.tick(Millis::MAX);
    scheduler.tick(now);
    scheduler.tick(now);

    assert_eq!(scheduler.context().runs.as_slice(), &[u32::MAX, 2]);
}
