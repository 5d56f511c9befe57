//! Terminal detection: matches environment variables against a small
//! built-in rule table to pick a [`TermInfo`], the way upstream's
//! `chafa_term_db_detect` does.

use std::collections::HashMap;

use semver::Version;

use super::info::{Arg, TermInfo, TermSeq};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnvCmp {
    IsSet,
    Exact,
    Prefix,
    Suffix,
    VersionGe,
}

#[derive(Debug, Clone, Copy)]
struct EnvRule {
    include: bool,
    cmp: EnvCmp,
    var: &'static str,
    value: &'static str,
}

impl EnvRule {
    const fn incl(cmp: EnvCmp, var: &'static str, value: &'static str) -> Self {
        Self { include: true, cmp, var, value }
    }

    fn matches(&self, env: &dyn Fn(&str) -> Option<String>) -> bool {
        let actual = env(self.var);
        let hit = match (self.cmp, &actual) {
            (EnvCmp::IsSet, Some(_)) => true,
            (EnvCmp::IsSet, None) => false,
            (EnvCmp::Exact, Some(v)) => v == self.value,
            (EnvCmp::Prefix, Some(v)) => v.starts_with(self.value),
            (EnvCmp::Suffix, Some(v)) => v.ends_with(self.value),
            (EnvCmp::VersionGe, Some(v)) => version_ge(v, self.value),
            (_, None) => false,
        };
        hit == self.include
    }
}

/// Loosely compares two dotted/partial version strings (e.g.
/// `KONSOLE_VERSION=220370`) using `semver`, padding missing components
/// with zero so bare integers ("220370") compare as `220370.0.0`.
fn version_ge(actual: &str, min: &str) -> bool {
    let pad = |s: &str| -> Option<Version> {
        let parts: Vec<&str> = s.split('.').collect();
        let get = |i: usize| parts.get(i).copied().unwrap_or("0");
        format!("{}.{}.{}", get(0), get(1), get(2)).parse().ok()
    };
    match (pad(actual), pad(min)) {
        (Some(a), Some(b)) => a >= b,
        _ => false,
    }
}

#[derive(Debug, Clone, Copy)]
struct TermDef {
    name: &'static str,
    rules: &'static [EnvRule],
    pixel_passthrough: PassthroughKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassthroughKind {
    None,
    Tmux,
    Screen,
}

const RULES: &[TermDef] = &[
    TermDef {
        name: "kitty",
        rules: &[EnvRule::incl(EnvCmp::Exact, "TERM", "xterm-kitty")],
        pixel_passthrough: PassthroughKind::None,
    },
    TermDef {
        name: "iterm",
        rules: &[EnvRule::incl(EnvCmp::Exact, "TERM_PROGRAM", "iTerm.app")],
        pixel_passthrough: PassthroughKind::None,
    },
    TermDef {
        name: "mlterm",
        rules: &[EnvRule::incl(EnvCmp::Exact, "TERM", "mlterm")],
        pixel_passthrough: PassthroughKind::None,
    },
    TermDef {
        name: "foot",
        rules: &[EnvRule::incl(EnvCmp::Prefix, "TERM", "foot")],
        pixel_passthrough: PassthroughKind::None,
    },
    TermDef {
        name: "konsole",
        rules: &[EnvRule::incl(EnvCmp::IsSet, "KONSOLE_VERSION", "")],
        pixel_passthrough: PassthroughKind::None,
    },
    TermDef {
        name: "tmux",
        rules: &[EnvRule::incl(EnvCmp::IsSet, "TMUX", "")],
        pixel_passthrough: PassthroughKind::Tmux,
    },
    TermDef {
        name: "screen",
        rules: &[EnvRule::incl(EnvCmp::Exact, "TERM", "screen")],
        pixel_passthrough: PassthroughKind::Screen,
    },
    TermDef {
        name: "xterm-256color",
        rules: &[EnvRule::incl(EnvCmp::Exact, "TERM", "xterm-256color")],
        pixel_passthrough: PassthroughKind::None,
    },
    TermDef {
        name: "linux",
        rules: &[EnvRule::incl(EnvCmp::Exact, "TERM", "linux")],
        pixel_passthrough: PassthroughKind::None,
    },
];

/// Result of [`TermDb::detect`]: the matched terminal's name and whether
/// output must be wrapped for tmux/screen passthrough.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub name: String,
    pub passthrough: PassthroughKind,
}

/// Rule-based terminal sniffer plus a built-in VT220/xterm-256color
/// fallback [`TermInfo`].
pub struct TermDb;

impl Default for TermDb {
    fn default() -> Self {
        Self::new()
    }
}

impl TermDb {
    pub fn new() -> Self {
        Self
    }

    /// Matches `env` (a lookup closure so tests don't need real process
    /// environment) against the built-in rule table; returns `None` if
    /// nothing matches, in which case the caller should use
    /// [`TermDb::get_fallback_info`].
    pub fn detect(&self, env: impl Fn(&str) -> Option<String>) -> Option<Detection> {
        RULES
            .iter()
            .find(|def| def.rules.iter().all(|r| r.matches(&env)))
            .map(|def| Detection { name: def.name.to_string(), passthrough: def.pixel_passthrough })
    }

    pub fn detect_from_process_env(&self) -> Option<Detection> {
        self.detect(|k| std::env::var(k).ok())
    }

    /// A conservative baseline `TermInfo` any real terminal's detected
    /// info can be layered on top of via [`TermInfo::supplement`]: plain
    /// VT220 cursor/attribute control plus xterm's 256-color SGR
    /// extension and DECSIXEL framing.
    pub fn get_fallback_info(&self) -> TermInfo {
        let mut info = TermInfo::new();
        let set = |info: &mut TermInfo, seq, template: &str| info.set_seq(seq, template).expect("fallback templates are fixed and within length limits");

        set(&mut info, TermSeq::ResetTerminalSoft, "\x1b[!p");
        set(&mut info, TermSeq::ResetAttributes, "\x1b[0m");
        set(&mut info, TermSeq::Clear, "\x1b[H\x1b[2J");
        set(&mut info, TermSeq::InvertColors, "\x1b[7m");
        set(&mut info, TermSeq::CursorToTopLeft, "\x1b[H");
        set(&mut info, TermSeq::CursorToPos, "\x1b[%2;%1H");
        set(&mut info, TermSeq::CursorUp1, "\x1b[A");
        set(&mut info, TermSeq::CursorUp, "\x1b[%1A");
        set(&mut info, TermSeq::CursorDown1, "\x1b[B");
        set(&mut info, TermSeq::CursorDown, "\x1b[%1B");
        set(&mut info, TermSeq::CursorLeft1, "\x1b[D");
        set(&mut info, TermSeq::CursorLeft, "\x1b[%1D");
        set(&mut info, TermSeq::CursorRight1, "\x1b[C");
        set(&mut info, TermSeq::CursorRight, "\x1b[%1C");
        set(&mut info, TermSeq::EnableCursor, "\x1b[?25h");
        set(&mut info, TermSeq::DisableCursor, "\x1b[?25l");
        set(&mut info, TermSeq::EnableWrap, "\x1b[?7h");
        set(&mut info, TermSeq::DisableWrap, "\x1b[?7l");
        set(&mut info, TermSeq::SaveCursorPos, "\x1b7");
        set(&mut info, TermSeq::RestoreCursorPos, "\x1b8");
        set(&mut info, TermSeq::EnableAltScreen, "\x1b[?1049h");
        set(&mut info, TermSeq::DisableAltScreen, "\x1b[?1049l");

        set(&mut info, TermSeq::SetColorFgDirect, "\x1b[38;2;%1;%2;%3m");
        set(&mut info, TermSeq::SetColorBgDirect, "\x1b[48;2;%1;%2;%3m");
        set(&mut info, TermSeq::SetColorFg256, "\x1b[38;5;%1m");
        set(&mut info, TermSeq::SetColorBg256, "\x1b[48;5;%1m");
        set(&mut info, TermSeq::SetColorFg16, "\x1b[%1m");
        set(&mut info, TermSeq::SetColorBg16, "\x1b[%1m");
        set(&mut info, TermSeq::SetColorFg8, "\x1b[3%1m");
        set(&mut info, TermSeq::SetColorBg8, "\x1b[4%1m");
        set(&mut info, TermSeq::ResetColorFg, "\x1b[39m");
        set(&mut info, TermSeq::ResetColorBg, "\x1b[49m");
        set(&mut info, TermSeq::ResetColorFgbg, "\x1b[39;49m");

        set(&mut info, TermSeq::BeginSixels, "\x1bP%1;%2;%3q");
        set(&mut info, TermSeq::EndSixels, "\x1b\\");
        set(&mut info, TermSeq::EnableSixelScrolling, "\x1b[?80h");
        set(&mut info, TermSeq::DisableSixelScrolling, "\x1b[?80l");

        set(&mut info, TermSeq::BeginKittyImmediateImageV1, "\x1b_Ga=T,f=%1,s=%2,v=%3,c=%4,r=%5;");
        set(&mut info, TermSeq::EndKittyImage, "\x1b\\");
        set(&mut info, TermSeq::BeginKittyImageChunk, "\x1b_G");
        set(&mut info, TermSeq::EndKittyImageChunk, "\x1b\\");

        set(&mut info, TermSeq::BeginIterm2Image, "\x1b]1337;File=inline=1;width=%1;height=%2:");
        set(&mut info, TermSeq::EndIterm2Image, "\x07");

        set(&mut info, TermSeq::BeginTmuxPassthrough, "\x1bPtmux;");
        set(&mut info, TermSeq::EndTmuxPassthrough, "\x1b\\");
        set(&mut info, TermSeq::BeginScreenPassthrough, "\x1bP");
        set(&mut info, TermSeq::EndScreenPassthrough, "\x1b\\");

        set(&mut info, TermSeq::UpKey, "\x1b[A");
        set(&mut info, TermSeq::DownKey, "\x1b[B");
        set(&mut info, TermSeq::LeftKey, "\x1b[D");
        set(&mut info, TermSeq::RightKey, "\x1b[C");
        set(&mut info, TermSeq::HomeKey, "\x1b[H");
        set(&mut info, TermSeq::EndKey, "\x1b[F");
        set(&mut info, TermSeq::PageUpKey, "\x1b[5~");
        set(&mut info, TermSeq::PageDownKey, "\x1b[6~");
        set(&mut info, TermSeq::InsertKey, "\x1b[2~");
        set(&mut info, TermSeq::DeleteKey, "\x1b[3~");
        for (i, key) in [
            TermSeq::F1Key,
            TermSeq::F2Key,
            TermSeq::F3Key,
            TermSeq::F4Key,
            TermSeq::F5Key,
            TermSeq::F6Key,
            TermSeq::F7Key,
            TermSeq::F8Key,
            TermSeq::F9Key,
            TermSeq::F10Key,
            TermSeq::F11Key,
            TermSeq::F12Key,
        ]
        .into_iter()
        .enumerate()
        {
            info.set_seq(key, &format!("\x1b[{}~", 11 + i)).expect("fixed-width function-key templates fit");
        }

        info
    }
}

/// Looks up every environment variable the rule table references, as a
/// convenience for callers that want to snapshot the environment once.
pub fn snapshot_relevant_env() -> HashMap<&'static str, Option<String>> {
    const VARS: &[&str] = &["TERM", "TERM_PROGRAM", "TERMINAL_NAME", "KONSOLE_VERSION", "TMUX", "LC_TERMINAL"];
    VARS.iter().map(|&v| (v, std::env::var(v).ok())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_map(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + '_ {
        move |k| pairs.iter().find(|(n, _)| *n == k).map(|(_, v)| v.to_string())
    }

    #[test]
    fn detects_kitty_from_term_var() {
        let db = TermDb::new();
        let env = env_map(&[("TERM", "xterm-kitty")]);
        let d = db.detect(env).unwrap();
        assert_eq!(d.name, "kitty");
    }

    #[test]
    fn detects_tmux_passthrough() {
        let db = TermDb::new();
        let env = env_map(&[("TMUX", "/tmp/tmux-1000/default,1234,0")]);
        let d = db.detect(env).unwrap();
        assert_eq!(d.passthrough, PassthroughKind::Tmux);
    }

    #[test]
    fn unknown_term_yields_no_detection() {
        let db = TermDb::new();
        let env = env_map(&[("TERM", "some-unknown-term")]);
        assert!(db.detect(env).is_none());
    }

    #[test]
    fn version_ge_handles_bare_integer_versions() {
        assert!(version_ge("220370", "220370"));
        assert!(version_ge("220400", "220370"));
        assert!(!version_ge("220300", "220370"));
    }

    #[test]
    fn fallback_info_covers_core_sequences() {
        let db = TermDb::new();
        let info = db.get_fallback_info();
        assert!(info.has_seq(TermSeq::Clear));
        assert!(info.has_seq(TermSeq::BeginSixels));
        let mut out = Vec::new();
        info.try_emit(TermSeq::SetColorFgDirect, &[Arg::Guint8(1), Arg::Guint8(2), Arg::Guint8(3)], &mut out).unwrap();
        assert_eq!(out, b"\x1b[38;2;1;2;3m");
    }
}
