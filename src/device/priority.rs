//! Real-time scheduling priority for the driver's single thread.
//!
//! Touch tracking degrades visibly under scheduling jitter, so the
//! original driver asks for `SCHED_FIFO` at the highest priority. This is
//! best-effort: most deployments won't grant `CAP_SYS_NICE` to a
//! userspace driver, and running at normal priority is still correct,
//! just less smooth under load.
const PRIORITY: i32 = 99;

/// Request `SCHED_FIFO` scheduling for the calling thread. Logs and
/// continues on failure rather than treating it as fatal.
pub fn request_realtime_priority() {
    let param = libc::sched_param { sched_priority: PRIORITY };
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        log::warn!("failed to set SCHED_FIFO priority {PRIORITY}: {err}");
    } else {
        log::info!("running at SCHED_FIFO priority {PRIORITY}");
    }
}
