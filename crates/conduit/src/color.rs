//! Terminal color palette ("Tallinn Night") used by every human-readable
//! command output. Colors degrade automatically when stdout/stderr are not a
//! tty, and can be forced off with `--no-color`.

use std::sync::atomic::{AtomicBool, Ordering};

use owo_colors::{OwoColorize, Stream};

static NO_COLOR_FLAG: AtomicBool = AtomicBool::new(false);

/// Disable color output for the remainder of the process. Called once from
/// `main` when `--no-color` is passed, rather than mutating `NO_COLOR` in the
/// environment, since owo-colors' own env detection runs once at startup.
pub fn set_no_color() {
    NO_COLOR_FLAG.store(true, Ordering::Relaxed);
}

fn no_color() -> bool {
    NO_COLOR_FLAG.load(Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy)]
struct Rgb {
    r: u8,
    g: u8,
    b: u8,
}

impl Rgb {
    const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xFF) as u8,
            g: ((hex >> 8) & 0xFF) as u8,
            b: (hex & 0xFF) as u8,
        }
    }
}

const ICE: Rgb = Rgb::from_hex(0x7CB4C8);
const AURORA: Rgb = Rgb::from_hex(0x6B8F5E);
const COPPER: Rgb = Rgb::from_hex(0xC49A5C);
const EMBER: Rgb = Rgb::from_hex(0xB87060);
const KIRI: Rgb = Rgb::from_hex(0xA088B0);
const MUTED: Rgb = Rgb::from_hex(0x5C6370);

fn paint_stdout(text: &str, c: Rgb) -> String {
    if no_color() {
        return text.to_string();
    }
    text.if_supports_color(Stream::Stdout, |t| t.truecolor(c.r, c.g, c.b))
        .to_string()
}

fn paint_stderr(text: &str, c: Rgb) -> String {
    if no_color() {
        return text.to_string();
    }
    text.if_supports_color(Stream::Stderr, |t| t.truecolor(c.r, c.g, c.b))
        .to_string()
}

/// Primary accent: branch/worktree names, headers.
pub fn ice(text: &str) -> String {
    paint_stdout(text, ICE)
}

/// Active/success state.
pub fn aurora(text: &str) -> String {
    paint_stdout(text, AURORA)
}

/// Warning/idle state.
pub fn copper(text: &str) -> String {
    paint_stdout(text, COPPER)
}

/// Error/danger state.
pub fn ember(text: &str) -> String {
    paint_stdout(text, EMBER)
}

/// Agent/AI-authored text.
pub fn kiri(text: &str) -> String {
    paint_stdout(text, KIRI)
}

pub fn bold(text: &str) -> String {
    if no_color() {
        return text.to_string();
    }
    text.if_supports_color(Stream::Stdout, |t| t.bold()).to_string()
}

/// Secondary/borders/hints.
pub fn muted(text: &str) -> String {
    paint_stdout(text, MUTED)
}

pub fn error(text: &str) -> String {
    paint_stderr(text, EMBER)
}

pub fn warning(text: &str) -> String {
    paint_stderr(text, COPPER)
}

pub fn hint(text: &str) -> String {
    paint_stderr(text, MUTED)
}

/// Map a `conduit_store::SessionStatus`-flavored string to a color.
pub fn status(status_str: &str) -> String {
    match status_str {
        "running" => aurora(status_str),
        "idle" => muted(status_str),
        "waiting" => copper(status_str),
        "error" => ember(status_str),
        _ => muted(status_str),
    }
}

/// Map a worker/dev-server status string to a color.
pub fn worker_status(status_str: &str) -> String {
    match status_str {
        "completed" => aurora(status_str),
        "running" => kiri(status_str),
        "pending" => copper(status_str),
        "failed" => ember(status_str),
        _ => muted(status_str),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_decodes_expected_channels() {
        let rgb = Rgb::from_hex(0x7CB4C8);
        assert_eq!(rgb.r, 0x7C);
        assert_eq!(rgb.g, 0xB4);
        assert_eq!(rgb.b, 0xC8);
    }

    #[test]
    fn no_color_preserves_text() {
        set_no_color();
        assert_eq!(ice("branch/name"), "branch/name");
        assert_eq!(error("boom"), "boom");
        NO_COLOR_FLAG.store(false, Ordering::Relaxed);
    }

    #[test]
    fn status_mapping_preserves_text_when_uncolored() {
        set_no_color();
        assert_eq!(status("running"), "running");
        assert_eq!(status("unknown-state"), "unknown-state");
        NO_COLOR_FLAG.store(false, Ordering::Relaxed);
    }
}
