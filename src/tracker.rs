//! Frame-to-frame correspondence: tracking IDs, slots, liftoff detection
//! and spurious-jump suppression.
//!
//! [`Tracker`] is pure data transformation over the current candidate list
//! and the touchpoint history; it never touches the matrix or any I/O.

use crate::config::{MAX_DELTA_ANGLE, MAX_DELTA_SQ, MAX_PREV_DELTA_SQ, MAX_TOUCH, TRACKING_ID_WRAP};
use crate::extractor::Candidate;
use crate::filters::smooth;

/// A tracked finger contact, carrying everything needed to render it and
/// to correspond it to the next frame.
#[derive(Debug, Clone, Copy)]
pub struct Touchpoint {
    pub raw_x: i32,
    pub raw_y: i32,
    pub x: i32,
    pub y: i32,
    pub i: f64,
    pub j: f64,
    pub pw: i64,
    pub touch_major: i32,
    pub slot: usize,
    pub tracking_id: u32,
    /// Index into the previous frame's touch list this touch continues
    /// from, if any.
    pub prev_loc: Option<usize>,
    pub direction: f64,
    pub distance: i64,
}

impl Touchpoint {
    fn from_candidate(c: Candidate) -> Self {
        Self {
            raw_x: c.x,
            raw_y: c.y,
            x: c.x,
            y: c.y,
            i: c.i,
            j: c.j,
            pw: c.pw,
            touch_major: c.touch_major,
            slot: 0,
            tracking_id: 0,
            prev_loc: None,
            direction: 0.0,
            distance: 0,
        }
    }
}

/// Process-local tracker state: the monotonic tracking-ID counter and the
/// slot occupancy bitmap. Lives for the process lifetime, owned by
/// [`crate::engine::Engine`].
#[derive(Debug, Default)]
pub struct TrackerState {
    next_tracking_id: u32,
    slot_in_use: [bool; MAX_TOUCH],
}

impl TrackerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues the next tracking ID without wrapping. The wrap is applied
    /// once per frame, after every touchdown in that frame has drawn its
    /// ID, so that two touchdowns landing in the same frame near the wrap
    /// boundary still get distinct, increasing IDs (e.g. `1000, 1001`)
    /// rather than one of them silently dropping back to an ID that may
    /// still be live on another slot.
    fn take_tracking_id(&mut self) -> u32 {
        let id = self.next_tracking_id;
        self.next_tracking_id += 1;
        id
    }

    fn wrap_tracking_id(&mut self) {
        if self.next_tracking_id > TRACKING_ID_WRAP {
            self.next_tracking_id = 0;
        }
    }
}

/// Result of one tracking step.
pub struct TrackResult {
    pub touches: Vec<Touchpoint>,
    /// Slots that were in use last frame but have no continuing touch
    /// this frame; the emitter reports a liftoff for each.
    pub vanished_slots: Vec<usize>,
}

fn squared_distance(ax: i32, ay: i32, bx: i32, by: i32) -> i64 {
    let dx = (ax - bx) as i64;
    let dy = (ay - by) as i64;
    dx * dx + dy * dy
}

/// Resolve correspondence between `candidates` (this frame) and `prev`
/// (last frame's touchpoints), assigning tracking IDs and slots.
/// `prev2` supplies the third point used by the smoothing filter.
pub fn track(
    candidates: &[Candidate],
    prev: &[Touchpoint],
    prev2: &[Touchpoint],
    state: &mut TrackerState,
) -> TrackResult {
    let mut touches: Vec<Touchpoint> = candidates.iter().copied().map(Touchpoint::from_candidate).collect();

    let closest = nearest_previous(&touches, prev);

    let mut new_slot_in_use = [false; MAX_TOUCH];

    for (idx, &loc) in closest.iter().enumerate() {
        match loc {
            None => {
                touches[idx].tracking_id = state.take_tracking_id();
            }
            Some((prev_idx, distance)) => {
                let predecessor = prev[prev_idx];
                if distance > MAX_DELTA_SQ {
                    let direction = atan2_displacement(&touches[idx], &predecessor);
                    let continues_fast_motion = predecessor.distance > MAX_PREV_DELTA_SQ
                        && (direction - predecessor.direction).abs() < MAX_DELTA_ANGLE;

                    if continues_fast_motion {
                        touches[idx].tracking_id = predecessor.tracking_id;
                        touches[idx].slot = predecessor.slot;
                        touches[idx].prev_loc = Some(prev_idx);
                        touches[idx].distance = distance;
                        touches[idx].direction = direction;
                        new_slot_in_use[predecessor.slot] = true;
                    } else {
                        touches[idx].tracking_id = state.take_tracking_id();
                    }
                } else {
                    touches[idx].prev_loc = Some(prev_idx);
                    touches[idx].distance = distance;
                    touches[idx].direction = atan2_displacement(&touches[idx], &predecessor);
                    touches[idx].tracking_id = predecessor.tracking_id;
                    touches[idx].slot = predecessor.slot;
                    new_slot_in_use[predecessor.slot] = true;

                    let grandparent = predecessor.prev_loc.map(|i| prev2[i]);
                    let (sx, sy) = smooth(
                        (touches[idx].raw_x, touches[idx].raw_y),
                        (predecessor.raw_x, predecessor.raw_y),
                        grandparent.map(|g| (g.raw_x, g.raw_y)),
                    );
                    touches[idx].x = sx;
                    touches[idx].y = sy;
                }
            }
        }
    }

    state.wrap_tracking_id();

    assign_free_slots(&mut touches, &mut new_slot_in_use);

    let vanished_slots: Vec<usize> = (0..MAX_TOUCH)
        .filter(|&s| state.slot_in_use[s] && !new_slot_in_use[s])
        .collect();

    state.slot_in_use = new_slot_in_use;

    TrackResult { touches, vanished_slots }
}

fn atan2_displacement(t: &Touchpoint, predecessor: &Touchpoint) -> f64 {
    ((t.x - predecessor.x) as f64).atan2((t.y - predecessor.y) as f64)
}

/// For each current touch, the index into `prev` of its nearest
/// predecessor and the squared distance to it, after resolving
/// collisions (two current touches naming the same predecessor) by
/// keeping the nearer one.
fn nearest_previous(touches: &[Touchpoint], prev: &[Touchpoint]) -> Vec<Option<(usize, i64)>> {
    let mut closest: Vec<Option<(usize, i64)>> = touches
        .iter()
        .map(|t| {
            prev.iter()
                .enumerate()
                .map(|(j, p)| (j, squared_distance(t.raw_x, t.raw_y, p.raw_x, p.raw_y)))
                .min_by_key(|&(_, d)| d)
        })
        .collect();

    for i in 0..closest.len() {
        for j in (i + 1)..closest.len() {
            if let (Some((li, di)), Some((lj, dj))) = (closest[i], closest[j]) {
                if li == lj {
                    // Strict `<`: an exact tie falls through to the
                    // `else` and keeps the later index, matching the
                    // original driver's own tie-break.
                    if di < dj {
                        closest[j] = None;
                    } else {
                        closest[i] = None;
                    }
                }
            }
        }
    }

    closest
}

/// Assign the lowest-indexed free slot to every touch that doesn't
/// already have one.
fn assign_free_slots(touches: &mut [Touchpoint], slot_in_use: &mut [bool; MAX_TOUCH]) {
    for t in touches.iter_mut() {
        if t.prev_loc.is_none() {
            if let Some(slot) = (0..MAX_TOUCH).find(|&s| !slot_in_use[s]) {
                t.slot = slot;
                slot_in_use[slot] = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate_at(x: i32, y: i32) -> Candidate {
        Candidate { i: 0.0, j: 0.0, pw: 1, touch_major: 25, x, y }
    }

    #[test]
    fn touchdown_assigns_tracking_id_zero_and_slot_zero() {
        let mut state = TrackerState::new();
        let result = track(&[candidate_at(500, 373)], &[], &[], &mut state);
        assert_eq!(result.touches.len(), 1);
        assert_eq!(result.touches[0].tracking_id, 0);
        assert_eq!(result.touches[0].slot, 0);
        assert!(result.vanished_slots.is_empty());
    }

    #[test]
    fn two_finger_spread_preserves_correspondence() {
        let mut state = TrackerState::new();
        let frame_a = track(&[candidate_at(100, 100), candidate_at(300, 100)], &[], &[], &mut state);
        let prev = frame_a.touches.clone();
        let frame_b =
            track(&[candidate_at(90, 100), candidate_at(310, 100)], &prev, &[], &mut state);
        assert_eq!(frame_b.touches[0].tracking_id, prev[0].tracking_id);
        assert_eq!(frame_b.touches[0].slot, prev[0].slot);
        assert_eq!(frame_b.touches[1].tracking_id, prev[1].tracking_id);
        assert_eq!(frame_b.touches[1].slot, prev[1].slot);
    }

    #[test]
    fn impossible_jump_with_no_prior_motion_forces_retouch() {
        let mut state = TrackerState::new();
        let frame_a = track(&[candidate_at(5, 5)], &[], &[], &mut state);
        let prev = frame_a.touches.clone();
        let frame_b = track(&[candidate_at(625, 875)], &prev, &[], &mut state);
        assert_ne!(frame_b.touches[0].tracking_id, prev[0].tracking_id);
        assert_eq!(frame_b.vanished_slots, vec![prev[0].slot]);
    }

    #[test]
    fn fast_continued_motion_is_not_broken_across_three_frames() {
        let mut state = TrackerState::new();
        let a = track(&[candidate_at(5, 5)], &[], &[], &mut state);
        let prev_a = a.touches.clone();
        let b = track(&[candidate_at(300, 300)], &prev_a, &[], &mut state);
        let prev_b = b.touches.clone();
        // Same direction as a->b, distance still over MAX_DELTA_SQ.
        let c = track(&[candidate_at(595, 595)], &prev_b, &prev_a, &mut state);

        assert_eq!(prev_b[0].tracking_id, prev_a[0].tracking_id, "b must have continued a");
        assert_eq!(c.touches[0].tracking_id, prev_b[0].tracking_id, "c must continue b");
        assert!(c.vanished_slots.is_empty());
    }

    #[test]
    fn vanished_touch_emits_liftoff_while_sibling_continues() {
        let mut state = TrackerState::new();
        let a = track(&[candidate_at(100, 100), candidate_at(800, 100)], &[], &[], &mut state);
        let prev = a.touches.clone();
        let b = track(&[candidate_at(105, 100)], &prev, &[], &mut state);
        assert_eq!(b.touches.len(), 1);
        assert_eq!(b.vanished_slots, vec![prev[1].slot]);
    }

    #[test]
    fn exactly_max_touch_peaks_get_distinct_slots() {
        let mut state = TrackerState::new();
        let cands: Vec<_> =
            (0..MAX_TOUCH).map(|k| candidate_at(50 + k as i32 * 150, 100)).collect();
        let result = track(&cands, &[], &[], &mut state);
        let mut slots: Vec<_> = result.touches.iter().map(|t| t.slot).collect();
        slots.sort_unstable();
        assert_eq!(slots, (0..MAX_TOUCH).collect::<Vec<_>>());
    }

    #[test]
    fn tracking_id_wraps_after_1000() {
        let mut state = TrackerState::new();
        state.next_tracking_id = 1001;
        let result = track(&[candidate_at(1, 1)], &[], &[], &mut state);
        assert_eq!(result.touches[0].tracking_id, 1001);
        assert_eq!(state.next_tracking_id, 0);
    }

    #[test]
    fn two_touchdowns_in_one_frame_near_wrap_both_get_distinct_ids() {
        let mut state = TrackerState::new();
        state.next_tracking_id = 1000;
        let result =
            track(&[candidate_at(100, 100), candidate_at(800, 100)], &[], &[], &mut state);
        let mut ids: Vec<_> = result.touches.iter().map(|t| t.tracking_id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1000, 1001], "the wrap must not apply until after this frame's assignments");
        assert_eq!(state.next_tracking_id, 0);
    }
}
