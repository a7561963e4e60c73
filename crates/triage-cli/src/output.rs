// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Terminal color setup for the binary.

/// Apply the NO_COLOR / FORCE_COLOR environment contract before any output
/// is produced. The `colored` crate already honors NO_COLOR on its own and
/// drops color when not writing to a terminal; FORCE_COLOR needs the
/// explicit override.
pub fn init() {
    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    } else if std::env::var("FORCE_COLOR").is_ok() {
        colored::control::set_override(true);
    }
}
