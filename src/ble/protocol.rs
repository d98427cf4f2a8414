//! Wire protocol for the command channel.
//!
//! A single ASCII command, `Vibrate:<N>;`, with `<N>` a decimal intensity
//! in `[0, 20]` and the literal `;` as the only framing.  The peripheral
//! never replies; every command goes out as a write-without-response.

use core::fmt::Write;

use heapless::String;

use crate::config::COMMAND_MAX;

/// Format the intensity command for `level`.
///
/// Range checking is the command writer's job; this only renders the text.
pub fn vibrate_command(level: u8) -> String<COMMAND_MAX> {
    let mut cmd = String::new();
    // Cannot overflow: "Vibrate:255;" is 12 bytes against a 20-byte buffer.
    let _ = write!(&mut cmd, "Vibrate:{};", level);
    cmd
}
