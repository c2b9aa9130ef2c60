//! External collaborators: the serial transport, the `uinput` sink, and
//! scheduling priority. Everything here is glue around the core pipeline
//! in [`crate::engine`]; none of it is exercised by the core's own tests.

pub mod priority;
pub mod serial;
pub mod sink;

pub use serial::SerialDevice;
