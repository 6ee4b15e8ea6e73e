use std::io;
use tokio::process::{Child, Command};
use ::windows::Win32::System::Console::{GenerateConsoleCtrlEvent, CTRL_BREAK_EVENT};

/// CREATE_NEW_PROCESS_GROUP, so CTRL_BREAK reaches only the encoder
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

pub fn configure(command: &mut Command) {
    command.creation_flags(CREATE_NEW_PROCESS_GROUP);
}

pub fn send_interrupt(child: &Child) -> io::Result<()> {
    let pid = child
        .id()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "encoder already reaped"))?;

    // SAFETY: the process group id comes from a child we spawned
    unsafe { GenerateConsoleCtrlEvent(CTRL_BREAK_EVENT, pid) }
        .map_err(|e| io::Error::other(e.to_string()))
}

pub fn send_terminate(child: &mut Child) -> io::Result<()> {
    child.start_kill()
}
