use std::io;
use tokio::process::{Child, Command};

pub fn configure(_command: &mut Command) {}

/// SIGINT lets ffmpeg flush and finalize the container
pub fn send_interrupt(child: &Child) -> io::Result<()> {
    signal(child, libc::SIGINT)
}

pub fn send_terminate(child: &mut Child) -> io::Result<()> {
    signal(child, libc::SIGTERM)
}

fn signal(child: &Child, signal: libc::c_int) -> io::Result<()> {
    let pid = child
        .id()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "encoder already reaped"))?;
    let pid = libc::pid_t::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;

    // SAFETY: kill(2) has no memory-safety preconditions
    let rc = unsafe { libc::kill(pid, signal) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}
