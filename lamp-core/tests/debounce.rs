use lamp_core::Millis;
use lamp_core::debounce::{
    Button, ButtonEdge, ButtonPolarity, DEFAULT_DEBOUNCE_WINDOW_MS, DebouncePolicy, Debouncer,
    Edge,
};

fn ms(value: u32) -> Millis {
    Millis::from_millis(value)
}

/// Raw level at `t` for a waveform given as `(start_ms, level)` steps.
fn level_at(waveform: &[(u32, bool)], t: u32) -> bool {
    waveform
        .iter()
        .take_while(|(start, _)| *start <= t)
        .last()
        .is_some_and(|(_, level)| *level)
}

#[test]
fn bouncy_press_confirms_after_window() {
    // Active-high line: press at 0, bounce open at 10, closed again from 20.
    let waveform = [(0, true), (10, false), (20, true)];
    let mut debouncer = Debouncer::new(false, DEFAULT_DEBOUNCE_WINDOW_MS);

    let mut events = heapless::Vec::<(u32, Edge), 4>::new();
    for t in 0..=100 {
        if let Some(event) = debouncer.sample(level_at(&waveform, t), ms(t)) {
            events.push((t, event.edge)).unwrap();
        }
    }

    assert_eq!(events.as_slice(), &[(50, Edge::Rising)]);
}

#[test]
fn toggles_inside_window_after_change_are_rejected() {
    let mut debouncer = Debouncer::new(false, 50);
    assert!(debouncer.sample(true, ms(1_000)).is_some());

    // Chatter every 7 ms for the rest of the window.
    let mut level = true;
    for t in (1_007..1_050).step_by(7) {
        level = !level;
        assert_eq!(debouncer.sample(level, ms(t)), None, "t={t}");
    }
    assert!(debouncer.stable());
}

#[test]
fn held_change_emits_exactly_one_event() {
    let mut debouncer = Debouncer::new(false, 50);
    let mut count = 0;
    for t in 0..500 {
        if debouncer.sample(t >= 120, ms(t)).is_some() {
            count += 1;
        }
    }
    assert_eq!(count, 1);
    assert_eq!(debouncer.last_change(), ms(120));
}

#[test]
fn hold_confirm_rejects_short_taps() {
    let mut button =
        Button::with_policy(ButtonPolarity::ActiveHigh, DebouncePolicy::HoldConfirm, 50);

    for t in 100..130 {
        assert_eq!(button.sample(true, ms(t)), None);
    }
    assert_eq!(button.sample(false, ms(130)), None);
    assert!(!button.take_press());

    let mut edges = heapless::Vec::<(u32, ButtonEdge), 4>::new();
    for t in 200..400 {
        if let Some(edge) = button.sample(t < 300, ms(t)) {
            edges.push((t, edge)).unwrap();
        }
    }
    assert_eq!(
        edges.as_slice(),
        &[(250, ButtonEdge::Pressed), (300, ButtonEdge::Released)]
    );
    assert!(button.take_press());
}
