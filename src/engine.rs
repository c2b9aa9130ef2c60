//! Ties the decoder, extractor, tracker, filters and emitter together
//! into the process-local pipeline driven by the event loop.

use evdev::InputEvent;

use crate::config::{Config, Orientation};
use crate::decoder::{FrameDecoder, FrameEvent};
use crate::emitter;
use crate::extractor;
use crate::filters::Debounce;
use crate::tracker::{self, Touchpoint, TrackerState};

/// Owns the matrix (via the decoder), the three-frame touchpoint
/// history, the slot bitmap and tracking-ID counter (via [`TrackerState`]),
/// and the debounce filter's state. One `Engine` exists per running
/// driver; it has no knowledge of the serial device or the `uinput` sink.
pub struct Engine {
    decoder: FrameDecoder,
    orientation: Orientation,
    tracker_state: TrackerState,
    prev: Vec<Touchpoint>,
    prev2: Vec<Touchpoint>,
    debounce: Option<Debounce>,
}

impl Engine {
    pub fn new(config: &Config) -> Self {
        Self {
            decoder: FrameDecoder::new(),
            orientation: config.orientation,
            tracker_state: TrackerState::new(),
            prev: Vec::new(),
            prev2: Vec::new(),
            debounce: None,
        }
    }

    /// Feed a chunk of bytes read from the serial transport, returning
    /// every `evdev` event produced by any frame(s) this chunk completed.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<InputEvent> {
        let mut events = Vec::new();
        for frame_event in self.decoder.put_bytes(bytes) {
            let FrameEvent::EndOfFrame = frame_event;
            events.extend(self.process_frame());
        }
        events
    }

    fn process_frame(&mut self) -> Vec<InputEvent> {
        let candidates = extractor::extract(self.decoder.matrix(), self.orientation);
        let result = tracker::track(&candidates, &self.prev, &self.prev2, &mut self.tracker_state);
        let mut touches = result.touches;

        if touches.len() == 1 {
            let t = &mut touches[0];
            let mut debounce = self
                .debounce
                .filter(|d| d.tracking_id() == t.tracking_id)
                .unwrap_or_else(|| Debounce::new(t.tracking_id, (t.x, t.y)));
            let (x, y) = debounce.apply((t.x, t.y));
            t.x = x;
            t.y = y;
            self.debounce = Some(debounce);
        } else {
            self.debounce = None;
        }

        log::debug!(
            "frame: {} touch(es), {} liftoff(s)",
            touches.len(),
            result.vanished_slots.len()
        );

        let events = emitter::build_frame(&touches, &result.vanished_slots);

        self.prev2 = std::mem::take(&mut self.prev);
        self.prev = touches;

        events
    }

    /// Called when the serial transport has been idle past the
    /// inactivity timeout: lifts off every slot still considered active
    /// and clears all history, matching the original driver's full
    /// `liftoff()` + `clear_arrays()` sequence.
    pub fn on_idle_timeout(&mut self) -> Vec<InputEvent> {
        if self.prev.is_empty() {
            return Vec::new();
        }
        log::debug!("idle timeout: lifting off {} touch(es)", self.prev.len());
        let vanished: Vec<usize> = self.prev.iter().map(|t| t.slot).collect();
        let events = emitter::build_frame(&[], &vanished);
        self.prev.clear();
        self.prev2.clear();
        self.debounce = None;
        events
    }
}
