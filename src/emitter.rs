//! Translates a frame's tracked touches and vanished slots into an
//! ordered `evdev` multi-touch protocol type B event sequence and emits
//! it through a [`crate::device::sink::InputSink`].

use evdev::{AbsoluteAxisCode, EventType, InputEvent, KeyCode};

use crate::tracker::Touchpoint;

fn syn_report() -> InputEvent {
    InputEvent::new(EventType::SYNCHRONIZATION.0, 0, 0)
}

fn syn_mt_report() -> InputEvent {
    InputEvent::new(EventType::SYNCHRONIZATION.0, 1 /* SYN_MT_REPORT */, 0)
}

fn slot(slot: usize) -> InputEvent {
    InputEvent::new(EventType::ABSOLUTE.0, AbsoluteAxisCode::ABS_MT_SLOT.0, slot as i32)
}

fn tracking_id(id: i32) -> InputEvent {
    InputEvent::new(EventType::ABSOLUTE.0, AbsoluteAxisCode::ABS_MT_TRACKING_ID.0, id)
}

/// Build the ordered event batch for one frame: continuing/new touches
/// first (each as `SLOT, TRACKING_ID, TOUCH_MAJOR, POSITION_X,
/// POSITION_Y, MT_REPORT`), then an explicit liftoff for every vanished
/// slot (`SLOT, TRACKING_ID=-1`, no per-liftoff `MT_REPORT`), then the
/// frame's `SYN_REPORT` and, if any touch was present, `BTN_TOUCH`.
pub fn build_frame(touches: &[Touchpoint], vanished_slots: &[usize]) -> Vec<InputEvent> {
    let mut events = Vec::with_capacity(touches.len() * 6 + vanished_slots.len() * 2 + 2);

    for t in touches {
        events.push(slot(t.slot));
        events.push(tracking_id(t.tracking_id as i32));
        events.push(InputEvent::new(
            EventType::ABSOLUTE.0,
            AbsoluteAxisCode::ABS_MT_TOUCH_MAJOR.0,
            t.touch_major,
        ));
        events.push(InputEvent::new(EventType::ABSOLUTE.0, AbsoluteAxisCode::ABS_MT_POSITION_X.0, t.x));
        events.push(InputEvent::new(EventType::ABSOLUTE.0, AbsoluteAxisCode::ABS_MT_POSITION_Y.0, t.y));
        events.push(syn_mt_report());
    }

    for &s in vanished_slots {
        events.push(slot(s));
        events.push(tracking_id(-1));
    }

    events.push(syn_report());

    if !touches.is_empty() {
        events.push(InputEvent::new(EventType::KEY.0, KeyCode::BTN_TOUCH.0, 1));
        events.push(syn_report());
    } else if !vanished_slots.is_empty() {
        events.push(InputEvent::new(EventType::KEY.0, KeyCode::BTN_TOUCH.0, 0));
        events.push(syn_report());
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(slot_idx: usize, tracking_id: u32) -> Touchpoint {
        Touchpoint {
            raw_x: 0,
            raw_y: 0,
            x: 100,
            y: 200,
            i: 0.0,
            j: 0.0,
            pw: 1,
            touch_major: 25,
            slot: slot_idx,
            tracking_id,
            prev_loc: None,
            direction: 0.0,
            distance: 0,
        }
    }

    fn axis_values(events: &[InputEvent], code: u16) -> Vec<i32> {
        events
            .iter()
            .filter(|e| e.event_type() == EventType::ABSOLUTE && e.code() == code)
            .map(|e| e.value())
            .collect()
    }

    #[test]
    fn single_touch_emits_full_sequence_and_btn_touch() {
        let events = build_frame(&[touch(0, 7)], &[]);
        assert_eq!(axis_values(&events, AbsoluteAxisCode::ABS_MT_SLOT.0), vec![0]);
        assert_eq!(axis_values(&events, AbsoluteAxisCode::ABS_MT_TRACKING_ID.0), vec![7]);
        assert!(events
            .iter()
            .any(|e| e.event_type() == EventType::KEY && e.code() == KeyCode::BTN_TOUCH.0 && e.value() == 1));
    }

    #[test]
    fn liftoff_only_frame_reports_negative_tracking_id_and_btn_touch_zero() {
        let events = build_frame(&[], &[2]);
        assert_eq!(axis_values(&events, AbsoluteAxisCode::ABS_MT_SLOT.0), vec![2]);
        assert_eq!(axis_values(&events, AbsoluteAxisCode::ABS_MT_TRACKING_ID.0), vec![-1]);
        assert!(events
            .iter()
            .any(|e| e.event_type() == EventType::KEY && e.code() == KeyCode::BTN_TOUCH.0 && e.value() == 0));
    }

    #[test]
    fn continuing_touches_precede_liftoffs() {
        let events = build_frame(&[touch(0, 1)], &[1]);
        let tracking_ids = axis_values(&events, AbsoluteAxisCode::ABS_MT_TRACKING_ID.0);
        assert_eq!(tracking_ids, vec![1, -1]);
    }

    #[test]
    fn empty_frame_emits_no_events() {
        let events = build_frame(&[], &[]);
        assert!(events.is_empty());
    }
}
