//! Platform-specific encoder signalling
//!
//! Unix asks the encoder to stop with SIGINT, then SIGTERM. Windows has no
//! signals, so the encoder runs in its own process group and receives
//! CTRL_BREAK, then TerminateProcess.

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub use self::unix::{configure, send_interrupt, send_terminate};

#[cfg(target_os = "windows")]
mod windows;
#[cfg(target_os = "windows")]
pub use self::windows::{configure, send_interrupt, send_terminate};
