/// A fatal error raised while standing up the driver's external
/// collaborators (serial transport, input sink). These are the only
/// errors that can escape the process before the main loop starts; once
/// running, the core pipeline never returns an error (see
/// [`crate::tracker`] and friends).
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// The serial character device could not be opened.
    #[error("failed to open touch serial device {path:?}: {source}")]
    SerialOpen { path: String, #[source] source: serialport::Error },

    /// The serial device could not be configured for non-blocking reads.
    #[error("failed to configure touch serial device {path:?}: {source}")]
    SerialConfigure { path: String, #[source] source: std::io::Error },

    /// The kernel `uinput` virtual device could not be created.
    #[error("failed to create uinput touch device: {0}")]
    InputSinkCreate(#[source] std::io::Error),

    /// The event loop could not be constructed, could not register a
    /// source, or exited with an I/O error. `calloop`'s error types differ
    /// per source kind, so the message is captured as text at the call
    /// site rather than threading a typed source through here.
    #[error("event loop setup failed: {0}")]
    EventLoop(String),
}
