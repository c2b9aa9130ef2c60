use std::io::{self, Read};
use std::os::fd::AsFd;

use calloop::{EventSource, Interest, Mode, Poll, PostAction, Readiness, Token, TokenFactory};

use crate::config::RECV_BUF_SIZE;

/// Adapts a readable byte transport into a `calloop` event source,
/// generalizing the Wayland-display adapter this crate started from to
/// any `Read + AsFd` device. Generates one callback invocation per chunk
/// successfully read, looping until the descriptor reports `WouldBlock`
/// so a single wakeup drains everything currently buffered by the
/// kernel — the same draining strategy the Wayland adapter uses for its
/// socket, applied here to the panel's serial stream.
pub struct SerialSource<T> {
    io: T,
    scratch: [u8; RECV_BUF_SIZE],
}

impl<T: Read + AsFd> SerialSource<T> {
    /// Wrap `io` for insertion into a `calloop` event loop. `io` must
    /// already be configured non-blocking by the caller.
    pub fn new(io: T) -> Self {
        Self { io, scratch: [0u8; RECV_BUF_SIZE] }
    }

    /// Access the underlying transport, e.g. to flush it at startup.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.io
    }
}

impl<T: Read + AsFd> EventSource for SerialSource<T> {
    type Event = Vec<u8>;
    type Metadata = ();
    type Ret = io::Result<()>;
    type Error = io::Error;

    fn process_events<F>(
        &mut self,
        _readiness: Readiness,
        _token: Token,
        mut callback: F,
    ) -> Result<PostAction, Self::Error>
    where
        F: FnMut(Vec<u8>, &mut ()) -> io::Result<()>,
    {
        loop {
            match self.io.read(&mut self.scratch) {
                Ok(0) => break,
                Ok(n) => callback(self.scratch[..n].to_vec(), &mut ())?,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e),
            }
        }
        Ok(PostAction::Continue)
    }

    fn register(&mut self, poll: &mut Poll, token_factory: &mut TokenFactory) -> calloop::Result<()> {
        let token = token_factory.token();
        unsafe { poll.register(self.io.as_fd(), Interest::READ, Mode::Level, token) }
    }

    fn reregister(&mut self, poll: &mut Poll, token_factory: &mut TokenFactory) -> calloop::Result<()> {
        let token = token_factory.token();
        poll.reregister(self.io.as_fd(), Interest::READ, Mode::Level, token)
    }

    fn unregister(&mut self, poll: &mut Poll) -> calloop::Result<()> {
        poll.unregister(self.io.as_fd())
    }
}
