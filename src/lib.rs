//! Userspace touchscreen driver for the Cypress CTMA395 capacitive
//! multi-touch panel (HP TouchPad): decodes the panel's serial frame
//! format, extracts touch candidates, tracks them across frames, filters
//! their reported position, and emits `evdev` multi-touch events.
//!
//! The core pipeline (`decoder` through `emitter`, orchestrated by
//! `engine`) is pure and synchronous; `device` and `event_loop` are the
//! I/O glue that drives it from a real serial device and `uinput` sink.

pub mod config;
pub mod decoder;
pub mod device;
pub mod emitter;
pub mod engine;
pub mod error;
pub mod event_loop;
pub mod extractor;
pub mod filters;
pub mod tracker;
