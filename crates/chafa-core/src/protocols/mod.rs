//! Graphics-protocol encoders: Sixel, Kitty, and iTerm2 image framing,
//! plus the tmux/Screen passthrough wrapper shared by all three when run
//! inside a multiplexer.

pub mod iterm2;
pub mod kitty;
pub mod passthrough;
pub mod sixel;
