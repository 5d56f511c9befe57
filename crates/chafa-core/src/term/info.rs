//! The closed set of named terminal control sequences
//! ([`TermSeq`]) and the templates that render them ([`TermInfo`]).

use std::collections::HashMap;

use crate::error::{ChafaError, ParseResult, Result};

/// Maximum length in bytes of any single emitted or parsed sequence,
/// matching the upstream `CHAFA_TERM_SEQ_LENGTH_MAX` bound used to size
/// stack buffers.
pub const TERM_SEQ_LENGTH_MAX: usize = 128;

/// One typed argument to a sequence template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arg {
    Guint(u32),
    Guint8(u8),
    Guint16Hex(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArgKind {
    None,
    Guint,
    Guint8,
    Guint16Hex,
}

/// Every control sequence Chafa's terminal layer knows how to emit or
/// parse. Names and argument counts are grounded 1:1 on the upstream
/// `CHAFA_TERM_SEQ_DEF` table (146 entries spanning VT220 cursor/color
/// control, sixel/Kitty/iTerm2 graphics framing, key input, and
/// tmux/screen passthrough).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum TermSeq {
    ResetTerminalSoft,
    ResetTerminalHard,
    ResetAttributes,
    Clear,
    InvertColors,
    CursorToTopLeft,
    CursorToBottomLeft,
    CursorToPos,
    CursorUp1,
    CursorUp,
    CursorDown1,
    CursorDown,
    CursorLeft1,
    CursorLeft,
    CursorRight1,
    CursorRight,
    CursorUpScroll,
    CursorDownScroll,
    InsertCells,
    DeleteCells,
    InsertRows,
    DeleteRows,
    SetScrollingRows,
    EnableInsert,
    DisableInsert,
    EnableCursor,
    DisableCursor,
    EnableEcho,
    DisableEcho,
    EnableWrap,
    DisableWrap,
    SetColorFgDirect,
    SetColorBgDirect,
    SetColorFgbgDirect,
    SetColorFg256,
    SetColorBg256,
    SetColorFgbg256,
    SetColorFg16,
    SetColorBg16,
    SetColorFgbg16,
    BeginSixels,
    EndSixels,
    RepeatChar,
    BeginKittyImmediateImageV1,
    EndKittyImage,
    BeginKittyImageChunk,
    EndKittyImageChunk,
    BeginIterm2Image,
    EndIterm2Image,
    EnableSixelScrolling,
    DisableSixelScrolling,
    EnableBold,
    SetColorFg8,
    SetColorBg8,
    SetColorFgbg8,
    ResetDefaultFg,
    SetDefaultFg,
    QueryDefaultFg,
    ResetDefaultBg,
    SetDefaultBg,
    QueryDefaultBg,
    ReturnKey,
    BackspaceKey,
    TabKey,
    TabShiftKey,
    UpKey,
    UpCtrlKey,
    UpShiftKey,
    DownKey,
    DownCtrlKey,
    DownShiftKey,
    LeftKey,
    LeftCtrlKey,
    LeftShiftKey,
    RightKey,
    RightCtrlKey,
    RightShiftKey,
    PageUpKey,
    PageUpCtrlKey,
    PageUpShiftKey,
    PageDownKey,
    PageDownCtrlKey,
    PageDownShiftKey,
    HomeKey,
    HomeCtrlKey,
    HomeShiftKey,
    EndKey,
    EndCtrlKey,
    EndShiftKey,
    InsertKey,
    InsertCtrlKey,
    InsertShiftKey,
    DeleteKey,
    DeleteCtrlKey,
    DeleteShiftKey,
    F1Key,
    F1CtrlKey,
    F1ShiftKey,
    F2Key,
    F2CtrlKey,
    F2ShiftKey,
    F3Key,
    F3CtrlKey,
    F3ShiftKey,
    F4Key,
    F4CtrlKey,
    F4ShiftKey,
    F5Key,
    F5CtrlKey,
    F5ShiftKey,
    F6Key,
    F6CtrlKey,
    F6ShiftKey,
    F7Key,
    F7CtrlKey,
    F7ShiftKey,
    F8Key,
    F8CtrlKey,
    F8ShiftKey,
    F9Key,
    F9CtrlKey,
    F9ShiftKey,
    F10Key,
    F10CtrlKey,
    F10ShiftKey,
    F11Key,
    F11CtrlKey,
    F11ShiftKey,
    F12Key,
    F12CtrlKey,
    F12ShiftKey,
    ResetColorFg,
    ResetColorBg,
    ResetColorFgbg,
    ResetScrollingRows,
    SaveCursorPos,
    RestoreCursorPos,
    SetSixelAdvanceDown,
    SetSixelAdvanceRight,
    EnableAltScreen,
    DisableAltScreen,
    BeginScreenPassthrough,
    EndScreenPassthrough,
    BeginTmuxPassthrough,
    EndTmuxPassthrough,
    BeginKittyImmediateVirtImageV1
}

impl TermSeq {
    pub const COUNT: usize = 146;

    pub fn arg_count(self) -> usize {
        match self {
            TermSeq::ResetTerminalSoft => 0,
            TermSeq::ResetTerminalHard => 0,
            TermSeq::ResetAttributes => 0,
            TermSeq::Clear => 0,
            TermSeq::InvertColors => 0,
            TermSeq::CursorToTopLeft => 0,
            TermSeq::CursorToBottomLeft => 0,
            TermSeq::CursorToPos => 2,
            TermSeq::CursorUp1 => 0,
            TermSeq::CursorUp => 1,
            TermSeq::CursorDown1 => 0,
            TermSeq::CursorDown => 1,
            TermSeq::CursorLeft1 => 0,
            TermSeq::CursorLeft => 1,
            TermSeq::CursorRight1 => 0,
            TermSeq::CursorRight => 1,
            TermSeq::CursorUpScroll => 0,
            TermSeq::CursorDownScroll => 0,
            TermSeq::InsertCells => 1,
            TermSeq::DeleteCells => 1,
            TermSeq::InsertRows => 1,
            TermSeq::DeleteRows => 1,
            TermSeq::SetScrollingRows => 2,
            TermSeq::EnableInsert => 0,
            TermSeq::DisableInsert => 0,
            TermSeq::EnableCursor => 0,
            TermSeq::DisableCursor => 0,
            TermSeq::EnableEcho => 0,
            TermSeq::DisableEcho => 0,
            TermSeq::EnableWrap => 0,
            TermSeq::DisableWrap => 0,
            TermSeq::SetColorFgDirect => 3,
            TermSeq::SetColorBgDirect => 3,
            TermSeq::SetColorFgbgDirect => 6,
            TermSeq::SetColorFg256 => 1,
            TermSeq::SetColorBg256 => 1,
            TermSeq::SetColorFgbg256 => 2,
            TermSeq::SetColorFg16 => 1,
            TermSeq::SetColorBg16 => 1,
            TermSeq::SetColorFgbg16 => 2,
            TermSeq::BeginSixels => 3,
            TermSeq::EndSixels => 0,
            TermSeq::RepeatChar => 1,
            TermSeq::BeginKittyImmediateImageV1 => 5,
            TermSeq::EndKittyImage => 0,
            TermSeq::BeginKittyImageChunk => 0,
            TermSeq::EndKittyImageChunk => 0,
            TermSeq::BeginIterm2Image => 2,
            TermSeq::EndIterm2Image => 0,
            TermSeq::EnableSixelScrolling => 0,
            TermSeq::DisableSixelScrolling => 0,
            TermSeq::EnableBold => 0,
            TermSeq::SetColorFg8 => 1,
            TermSeq::SetColorBg8 => 1,
            TermSeq::SetColorFgbg8 => 2,
            TermSeq::ResetDefaultFg => 0,
            TermSeq::SetDefaultFg => 3,
            TermSeq::QueryDefaultFg => 0,
            TermSeq::ResetDefaultBg => 0,
            TermSeq::SetDefaultBg => 3,
            TermSeq::QueryDefaultBg => 0,
            TermSeq::ReturnKey => 0,
            TermSeq::BackspaceKey => 0,
            TermSeq::TabKey => 0,
            TermSeq::TabShiftKey => 0,
            TermSeq::UpKey => 0,
            TermSeq::UpCtrlKey => 0,
            TermSeq::UpShiftKey => 0,
            TermSeq::DownKey => 0,
            TermSeq::DownCtrlKey => 0,
            TermSeq::DownShiftKey => 0,
            TermSeq::LeftKey => 0,
            TermSeq::LeftCtrlKey => 0,
            TermSeq::LeftShiftKey => 0,
            TermSeq::RightKey => 0,
            TermSeq::RightCtrlKey => 0,
            TermSeq::RightShiftKey => 0,
            TermSeq::PageUpKey => 0,
            TermSeq::PageUpCtrlKey => 0,
            TermSeq::PageUpShiftKey => 0,
            TermSeq::PageDownKey => 0,
            TermSeq::PageDownCtrlKey => 0,
            TermSeq::PageDownShiftKey => 0,
            TermSeq::HomeKey => 0,
            TermSeq::HomeCtrlKey => 0,
            TermSeq::HomeShiftKey => 0,
            TermSeq::EndKey => 0,
            TermSeq::EndCtrlKey => 0,
            TermSeq::EndShiftKey => 0,
            TermSeq::InsertKey => 0,
            TermSeq::InsertCtrlKey => 0,
            TermSeq::InsertShiftKey => 0,
            TermSeq::DeleteKey => 0,
            TermSeq::DeleteCtrlKey => 0,
            TermSeq::DeleteShiftKey => 0,
            TermSeq::F1Key => 0,
            TermSeq::F1CtrlKey => 0,
            TermSeq::F1ShiftKey => 0,
            TermSeq::F2Key => 0,
            TermSeq::F2CtrlKey => 0,
            TermSeq::F2ShiftKey => 0,
            TermSeq::F3Key => 0,
            TermSeq::F3CtrlKey => 0,
            TermSeq::F3ShiftKey => 0,
            TermSeq::F4Key => 0,
            TermSeq::F4CtrlKey => 0,
            TermSeq::F4ShiftKey => 0,
            TermSeq::F5Key => 0,
            TermSeq::F5CtrlKey => 0,
            TermSeq::F5ShiftKey => 0,
            TermSeq::F6Key => 0,
            TermSeq::F6CtrlKey => 0,
            TermSeq::F6ShiftKey => 0,
            TermSeq::F7Key => 0,
            TermSeq::F7CtrlKey => 0,
            TermSeq::F7ShiftKey => 0,
            TermSeq::F8Key => 0,
            TermSeq::F8CtrlKey => 0,
            TermSeq::F8ShiftKey => 0,
            TermSeq::F9Key => 0,
            TermSeq::F9CtrlKey => 0,
            TermSeq::F9ShiftKey => 0,
            TermSeq::F10Key => 0,
            TermSeq::F10CtrlKey => 0,
            TermSeq::F10ShiftKey => 0,
            TermSeq::F11Key => 0,
            TermSeq::F11CtrlKey => 0,
            TermSeq::F11ShiftKey => 0,
            TermSeq::F12Key => 0,
            TermSeq::F12CtrlKey => 0,
            TermSeq::F12ShiftKey => 0,
            TermSeq::ResetColorFg => 0,
            TermSeq::ResetColorBg => 0,
            TermSeq::ResetColorFgbg => 0,
            TermSeq::ResetScrollingRows => 0,
            TermSeq::SaveCursorPos => 0,
            TermSeq::RestoreCursorPos => 0,
            TermSeq::SetSixelAdvanceDown => 0,
            TermSeq::SetSixelAdvanceRight => 0,
            TermSeq::EnableAltScreen => 0,
            TermSeq::DisableAltScreen => 0,
            TermSeq::BeginScreenPassthrough => 0,
            TermSeq::EndScreenPassthrough => 0,
            TermSeq::BeginTmuxPassthrough => 0,
            TermSeq::EndTmuxPassthrough => 0,
            TermSeq::BeginKittyImmediateVirtImageV1 => 6,
        }
    }

    fn arg_kind(self) -> ArgKind {
        let n = self.arg_count();
        if n == 0 {
            return ArgKind::None;
        }
        match self {
            TermSeq::ResetTerminalSoft => ArgKind::None,
            TermSeq::ResetTerminalHard => ArgKind::None,
            TermSeq::ResetAttributes => ArgKind::None,
            TermSeq::Clear => ArgKind::None,
            TermSeq::InvertColors => ArgKind::None,
            TermSeq::CursorToTopLeft => ArgKind::None,
            TermSeq::CursorToBottomLeft => ArgKind::None,
            TermSeq::CursorToPos => ArgKind::Guint,
            TermSeq::CursorUp1 => ArgKind::None,
            TermSeq::CursorUp => ArgKind::Guint,
            TermSeq::CursorDown1 => ArgKind::None,
            TermSeq::CursorDown => ArgKind::Guint,
            TermSeq::CursorLeft1 => ArgKind::None,
            TermSeq::CursorLeft => ArgKind::Guint,
            TermSeq::CursorRight1 => ArgKind::None,
            TermSeq::CursorRight => ArgKind::Guint,
            TermSeq::CursorUpScroll => ArgKind::None,
            TermSeq::CursorDownScroll => ArgKind::None,
            TermSeq::InsertCells => ArgKind::Guint,
            TermSeq::DeleteCells => ArgKind::Guint,
            TermSeq::InsertRows => ArgKind::Guint,
            TermSeq::DeleteRows => ArgKind::Guint,
            TermSeq::SetScrollingRows => ArgKind::Guint,
            TermSeq::EnableInsert => ArgKind::None,
            TermSeq::DisableInsert => ArgKind::None,
            TermSeq::EnableCursor => ArgKind::None,
            TermSeq::DisableCursor => ArgKind::None,
            TermSeq::EnableEcho => ArgKind::None,
            TermSeq::DisableEcho => ArgKind::None,
            TermSeq::EnableWrap => ArgKind::None,
            TermSeq::DisableWrap => ArgKind::None,
            TermSeq::SetColorFgDirect => ArgKind::Guint8,
            TermSeq::SetColorBgDirect => ArgKind::Guint8,
            TermSeq::SetColorFgbgDirect => ArgKind::Guint8,
            TermSeq::SetColorFg256 => ArgKind::Guint8,
            TermSeq::SetColorBg256 => ArgKind::Guint8,
            TermSeq::SetColorFgbg256 => ArgKind::Guint8,
            TermSeq::SetColorFg16 => ArgKind::Guint8,
            TermSeq::SetColorBg16 => ArgKind::Guint8,
            TermSeq::SetColorFgbg16 => ArgKind::Guint8,
            TermSeq::BeginSixels => ArgKind::Guint,
            TermSeq::EndSixels => ArgKind::None,
            TermSeq::RepeatChar => ArgKind::Guint,
            TermSeq::BeginKittyImmediateImageV1 => ArgKind::Guint,
            TermSeq::EndKittyImage => ArgKind::None,
            TermSeq::BeginKittyImageChunk => ArgKind::None,
            TermSeq::EndKittyImageChunk => ArgKind::None,
            TermSeq::BeginIterm2Image => ArgKind::Guint,
            TermSeq::EndIterm2Image => ArgKind::None,
            TermSeq::EnableSixelScrolling => ArgKind::None,
            TermSeq::DisableSixelScrolling => ArgKind::None,
            TermSeq::EnableBold => ArgKind::None,
            TermSeq::SetColorFg8 => ArgKind::Guint8,
            TermSeq::SetColorBg8 => ArgKind::Guint8,
            TermSeq::SetColorFgbg8 => ArgKind::Guint8,
            TermSeq::ResetDefaultFg => ArgKind::None,
            TermSeq::SetDefaultFg => ArgKind::Guint16Hex,
            TermSeq::QueryDefaultFg => ArgKind::None,
            TermSeq::ResetDefaultBg => ArgKind::None,
            TermSeq::SetDefaultBg => ArgKind::Guint16Hex,
            TermSeq::QueryDefaultBg => ArgKind::None,
            TermSeq::ReturnKey => ArgKind::None,
            TermSeq::BackspaceKey => ArgKind::None,
            TermSeq::TabKey => ArgKind::None,
            TermSeq::TabShiftKey => ArgKind::None,
            TermSeq::UpKey => ArgKind::None,
            TermSeq::UpCtrlKey => ArgKind::None,
            TermSeq::UpShiftKey => ArgKind::None,
            TermSeq::DownKey => ArgKind::None,
            TermSeq::DownCtrlKey => ArgKind::None,
            TermSeq::DownShiftKey => ArgKind::None,
            TermSeq::LeftKey => ArgKind::None,
            TermSeq::LeftCtrlKey => ArgKind::None,
            TermSeq::LeftShiftKey => ArgKind::None,
            TermSeq::RightKey => ArgKind::None,
            TermSeq::RightCtrlKey => ArgKind::None,
            TermSeq::RightShiftKey => ArgKind::None,
            TermSeq::PageUpKey => ArgKind::None,
            TermSeq::PageUpCtrlKey => ArgKind::None,
            TermSeq::PageUpShiftKey => ArgKind::None,
            TermSeq::PageDownKey => ArgKind::None,
            TermSeq::PageDownCtrlKey => ArgKind::None,
            TermSeq::PageDownShiftKey => ArgKind::None,
            TermSeq::HomeKey => ArgKind::None,
            TermSeq::HomeCtrlKey => ArgKind::None,
            TermSeq::HomeShiftKey => ArgKind::None,
            TermSeq::EndKey => ArgKind::None,
            TermSeq::EndCtrlKey => ArgKind::None,
            TermSeq::EndShiftKey => ArgKind::None,
            TermSeq::InsertKey => ArgKind::None,
            TermSeq::InsertCtrlKey => ArgKind::None,
            TermSeq::InsertShiftKey => ArgKind::None,
            TermSeq::DeleteKey => ArgKind::None,
            TermSeq::DeleteCtrlKey => ArgKind::None,
            TermSeq::DeleteShiftKey => ArgKind::None,
            TermSeq::F1Key => ArgKind::None,
            TermSeq::F1CtrlKey => ArgKind::None,
            TermSeq::F1ShiftKey => ArgKind::None,
            TermSeq::F2Key => ArgKind::None,
            TermSeq::F2CtrlKey => ArgKind::None,
            TermSeq::F2ShiftKey => ArgKind::None,
            TermSeq::F3Key => ArgKind::None,
            TermSeq::F3CtrlKey => ArgKind::None,
            TermSeq::F3ShiftKey => ArgKind::None,
            TermSeq::F4Key => ArgKind::None,
            TermSeq::F4CtrlKey => ArgKind::None,
            TermSeq::F4ShiftKey => ArgKind::None,
            TermSeq::F5Key => ArgKind::None,
            TermSeq::F5CtrlKey => ArgKind::None,
            TermSeq::F5ShiftKey => ArgKind::None,
            TermSeq::F6Key => ArgKind::None,
            TermSeq::F6CtrlKey => ArgKind::None,
            TermSeq::F6ShiftKey => ArgKind::None,
            TermSeq::F7Key => ArgKind::None,
            TermSeq::F7CtrlKey => ArgKind::None,
            TermSeq::F7ShiftKey => ArgKind::None,
            TermSeq::F8Key => ArgKind::None,
            TermSeq::F8CtrlKey => ArgKind::None,
            TermSeq::F8ShiftKey => ArgKind::None,
            TermSeq::F9Key => ArgKind::None,
            TermSeq::F9CtrlKey => ArgKind::None,
            TermSeq::F9ShiftKey => ArgKind::None,
            TermSeq::F10Key => ArgKind::None,
            TermSeq::F10CtrlKey => ArgKind::None,
            TermSeq::F10ShiftKey => ArgKind::None,
            TermSeq::F11Key => ArgKind::None,
            TermSeq::F11CtrlKey => ArgKind::None,
            TermSeq::F11ShiftKey => ArgKind::None,
            TermSeq::F12Key => ArgKind::None,
            TermSeq::F12CtrlKey => ArgKind::None,
            TermSeq::F12ShiftKey => ArgKind::None,
            TermSeq::ResetColorFg => ArgKind::None,
            TermSeq::ResetColorBg => ArgKind::None,
            TermSeq::ResetColorFgbg => ArgKind::None,
            TermSeq::ResetScrollingRows => ArgKind::None,
            TermSeq::SaveCursorPos => ArgKind::None,
            TermSeq::RestoreCursorPos => ArgKind::None,
            TermSeq::SetSixelAdvanceDown => ArgKind::None,
            TermSeq::SetSixelAdvanceRight => ArgKind::None,
            TermSeq::EnableAltScreen => ArgKind::None,
            TermSeq::DisableAltScreen => ArgKind::None,
            TermSeq::BeginScreenPassthrough => ArgKind::None,
            TermSeq::EndScreenPassthrough => ArgKind::None,
            TermSeq::BeginTmuxPassthrough => ArgKind::None,
            TermSeq::EndTmuxPassthrough => ArgKind::None,
            TermSeq::BeginKittyImmediateVirtImageV1 => ArgKind::Guint,
        }
    }

    /// True for sequences that describe terminal *input* read back from the
    /// user (key codes) rather than output sent to draw something. A muxer
    /// passes these through unmodified regardless of its own capability
    /// list, so [`TermInfo::chain`] inherits them from `inner` even when
    /// `outer` doesn't separately declare them.
    fn is_inheritable(self) -> bool {
        self.name().ends_with("Key")
    }

    pub fn name(self) -> &'static str {
        match self {
            TermSeq::ResetTerminalSoft => "ResetTerminalSoft",
            TermSeq::ResetTerminalHard => "ResetTerminalHard",
            TermSeq::ResetAttributes => "ResetAttributes",
            TermSeq::Clear => "Clear",
            TermSeq::InvertColors => "InvertColors",
            TermSeq::CursorToTopLeft => "CursorToTopLeft",
            TermSeq::CursorToBottomLeft => "CursorToBottomLeft",
            TermSeq::CursorToPos => "CursorToPos",
            TermSeq::CursorUp1 => "CursorUp1",
            TermSeq::CursorUp => "CursorUp",
            TermSeq::CursorDown1 => "CursorDown1",
            TermSeq::CursorDown => "CursorDown",
            TermSeq::CursorLeft1 => "CursorLeft1",
            TermSeq::CursorLeft => "CursorLeft",
            TermSeq::CursorRight1 => "CursorRight1",
            TermSeq::CursorRight => "CursorRight",
            TermSeq::CursorUpScroll => "CursorUpScroll",
            TermSeq::CursorDownScroll => "CursorDownScroll",
            TermSeq::InsertCells => "InsertCells",
            TermSeq::DeleteCells => "DeleteCells",
            TermSeq::InsertRows => "InsertRows",
            TermSeq::DeleteRows => "DeleteRows",
            TermSeq::SetScrollingRows => "SetScrollingRows",
            TermSeq::EnableInsert => "EnableInsert",
            TermSeq::DisableInsert => "DisableInsert",
            TermSeq::EnableCursor => "EnableCursor",
            TermSeq::DisableCursor => "DisableCursor",
            TermSeq::EnableEcho => "EnableEcho",
            TermSeq::DisableEcho => "DisableEcho",
            TermSeq::EnableWrap => "EnableWrap",
            TermSeq::DisableWrap => "DisableWrap",
            TermSeq::SetColorFgDirect => "SetColorFgDirect",
            TermSeq::SetColorBgDirect => "SetColorBgDirect",
            TermSeq::SetColorFgbgDirect => "SetColorFgbgDirect",
            TermSeq::SetColorFg256 => "SetColorFg256",
            TermSeq::SetColorBg256 => "SetColorBg256",
            TermSeq::SetColorFgbg256 => "SetColorFgbg256",
            TermSeq::SetColorFg16 => "SetColorFg16",
            TermSeq::SetColorBg16 => "SetColorBg16",
            TermSeq::SetColorFgbg16 => "SetColorFgbg16",
            TermSeq::BeginSixels => "BeginSixels",
            TermSeq::EndSixels => "EndSixels",
            TermSeq::RepeatChar => "RepeatChar",
            TermSeq::BeginKittyImmediateImageV1 => "BeginKittyImmediateImageV1",
            TermSeq::EndKittyImage => "EndKittyImage",
            TermSeq::BeginKittyImageChunk => "BeginKittyImageChunk",
            TermSeq::EndKittyImageChunk => "EndKittyImageChunk",
            TermSeq::BeginIterm2Image => "BeginIterm2Image",
            TermSeq::EndIterm2Image => "EndIterm2Image",
            TermSeq::EnableSixelScrolling => "EnableSixelScrolling",
            TermSeq::DisableSixelScrolling => "DisableSixelScrolling",
            TermSeq::EnableBold => "EnableBold",
            TermSeq::SetColorFg8 => "SetColorFg8",
            TermSeq::SetColorBg8 => "SetColorBg8",
            TermSeq::SetColorFgbg8 => "SetColorFgbg8",
            TermSeq::ResetDefaultFg => "ResetDefaultFg",
            TermSeq::SetDefaultFg => "SetDefaultFg",
            TermSeq::QueryDefaultFg => "QueryDefaultFg",
            TermSeq::ResetDefaultBg => "ResetDefaultBg",
            TermSeq::SetDefaultBg => "SetDefaultBg",
            TermSeq::QueryDefaultBg => "QueryDefaultBg",
            TermSeq::ReturnKey => "ReturnKey",
            TermSeq::BackspaceKey => "BackspaceKey",
            TermSeq::TabKey => "TabKey",
            TermSeq::TabShiftKey => "TabShiftKey",
            TermSeq::UpKey => "UpKey",
            TermSeq::UpCtrlKey => "UpCtrlKey",
            TermSeq::UpShiftKey => "UpShiftKey",
            TermSeq::DownKey => "DownKey",
            TermSeq::DownCtrlKey => "DownCtrlKey",
            TermSeq::DownShiftKey => "DownShiftKey",
            TermSeq::LeftKey => "LeftKey",
            TermSeq::LeftCtrlKey => "LeftCtrlKey",
            TermSeq::LeftShiftKey => "LeftShiftKey",
            TermSeq::RightKey => "RightKey",
            TermSeq::RightCtrlKey => "RightCtrlKey",
            TermSeq::RightShiftKey => "RightShiftKey",
            TermSeq::PageUpKey => "PageUpKey",
            TermSeq::PageUpCtrlKey => "PageUpCtrlKey",
            TermSeq::PageUpShiftKey => "PageUpShiftKey",
            TermSeq::PageDownKey => "PageDownKey",
            TermSeq::PageDownCtrlKey => "PageDownCtrlKey",
            TermSeq::PageDownShiftKey => "PageDownShiftKey",
            TermSeq::HomeKey => "HomeKey",
            TermSeq::HomeCtrlKey => "HomeCtrlKey",
            TermSeq::HomeShiftKey => "HomeShiftKey",
            TermSeq::EndKey => "EndKey",
            TermSeq::EndCtrlKey => "EndCtrlKey",
            TermSeq::EndShiftKey => "EndShiftKey",
            TermSeq::InsertKey => "InsertKey",
            TermSeq::InsertCtrlKey => "InsertCtrlKey",
            TermSeq::InsertShiftKey => "InsertShiftKey",
            TermSeq::DeleteKey => "DeleteKey",
            TermSeq::DeleteCtrlKey => "DeleteCtrlKey",
            TermSeq::DeleteShiftKey => "DeleteShiftKey",
            TermSeq::F1Key => "F1Key",
            TermSeq::F1CtrlKey => "F1CtrlKey",
            TermSeq::F1ShiftKey => "F1ShiftKey",
            TermSeq::F2Key => "F2Key",
            TermSeq::F2CtrlKey => "F2CtrlKey",
            TermSeq::F2ShiftKey => "F2ShiftKey",
            TermSeq::F3Key => "F3Key",
            TermSeq::F3CtrlKey => "F3CtrlKey",
            TermSeq::F3ShiftKey => "F3ShiftKey",
            TermSeq::F4Key => "F4Key",
            TermSeq::F4CtrlKey => "F4CtrlKey",
            TermSeq::F4ShiftKey => "F4ShiftKey",
            TermSeq::F5Key => "F5Key",
            TermSeq::F5CtrlKey => "F5CtrlKey",
            TermSeq::F5ShiftKey => "F5ShiftKey",
            TermSeq::F6Key => "F6Key",
            TermSeq::F6CtrlKey => "F6CtrlKey",
            TermSeq::F6ShiftKey => "F6ShiftKey",
            TermSeq::F7Key => "F7Key",
            TermSeq::F7CtrlKey => "F7CtrlKey",
            TermSeq::F7ShiftKey => "F7ShiftKey",
            TermSeq::F8Key => "F8Key",
            TermSeq::F8CtrlKey => "F8CtrlKey",
            TermSeq::F8ShiftKey => "F8ShiftKey",
            TermSeq::F9Key => "F9Key",
            TermSeq::F9CtrlKey => "F9CtrlKey",
            TermSeq::F9ShiftKey => "F9ShiftKey",
            TermSeq::F10Key => "F10Key",
            TermSeq::F10CtrlKey => "F10CtrlKey",
            TermSeq::F10ShiftKey => "F10ShiftKey",
            TermSeq::F11Key => "F11Key",
            TermSeq::F11CtrlKey => "F11CtrlKey",
            TermSeq::F11ShiftKey => "F11ShiftKey",
            TermSeq::F12Key => "F12Key",
            TermSeq::F12CtrlKey => "F12CtrlKey",
            TermSeq::F12ShiftKey => "F12ShiftKey",
            TermSeq::ResetColorFg => "ResetColorFg",
            TermSeq::ResetColorBg => "ResetColorBg",
            TermSeq::ResetColorFgbg => "ResetColorFgbg",
            TermSeq::ResetScrollingRows => "ResetScrollingRows",
            TermSeq::SaveCursorPos => "SaveCursorPos",
            TermSeq::RestoreCursorPos => "RestoreCursorPos",
            TermSeq::SetSixelAdvanceDown => "SetSixelAdvanceDown",
            TermSeq::SetSixelAdvanceRight => "SetSixelAdvanceRight",
            TermSeq::EnableAltScreen => "EnableAltScreen",
            TermSeq::DisableAltScreen => "DisableAltScreen",
            TermSeq::BeginScreenPassthrough => "BeginScreenPassthrough",
            TermSeq::EndScreenPassthrough => "EndScreenPassthrough",
            TermSeq::BeginTmuxPassthrough => "BeginTmuxPassthrough",
            TermSeq::EndTmuxPassthrough => "EndTmuxPassthrough",
            TermSeq::BeginKittyImmediateVirtImageV1 => "BeginKittyImmediateVirtImageV1",
        }
    }
}

#[derive(Debug, Clone)]
enum TemplatePart {
    Literal(Vec<u8>),
    Arg(usize),
}

#[derive(Debug, Clone)]
struct Template {
    parts: Vec<TemplatePart>,
}

/// Parses a `set_seq`-style template string (literal bytes plus `%1`..`%9`
/// positional argument placeholders) into a [`Template`], matching the
/// upstream `chafa_term_info_set_seq` escaping convention.
fn parse_template(s: &str) -> Result<Template> {
    let bytes = s.as_bytes();
    let mut parts = Vec::new();
    let mut literal = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 1 < bytes.len() && bytes[i + 1].is_ascii_digit() {
            if !literal.is_empty() {
                parts.push(TemplatePart::Literal(std::mem::take(&mut literal)));
            }
            let digit = (bytes[i + 1] - b'0') as usize;
            if digit == 0 {
                return Err(ChafaError::bad_term_seq(i, "argument index must be >= 1"));
            }
            parts.push(TemplatePart::Arg(digit - 1));
            i += 2;
        } else {
            literal.push(bytes[i]);
            i += 1;
        }
    }
    if !literal.is_empty() {
        parts.push(TemplatePart::Literal(literal));
    }
    Ok(Template { parts })
}

fn format_arg(arg: Arg, out: &mut Vec<u8>) {
    match arg {
        Arg::Guint(v) => out.extend_from_slice(v.to_string().as_bytes()),
        Arg::Guint8(v) => out.extend_from_slice(v.to_string().as_bytes()),
        Arg::Guint16Hex(v) => out.extend_from_slice(format!("{v:04x}").as_bytes()),
    }
}

/// A resolved table of [`TermSeq`] templates for one terminal model.
/// Built by hand via [`TermInfo::set_seq`], or populated wholesale by a
/// [`crate::term::db::TermDb`] lookup.
#[derive(Debug, Clone, Default)]
pub struct TermInfo {
    seqs: HashMap<TermSeq, Template>,
}

impl TermInfo {
    pub fn new() -> Self {
        Self { seqs: HashMap::new() }
    }

    /// Registers the control sequence template for `seq`. `template` uses
    /// `%1`-style positional placeholders; the rendered sequence (with
    /// all placeholders substituted) must never exceed
    /// [`TERM_SEQ_LENGTH_MAX`] bytes for the seq's maximum-width
    /// arguments, or this returns an error.
    pub fn set_seq(&mut self, seq: TermSeq, template: &str) -> Result<()> {
        let parsed = parse_template(template)?;
        let max_arg_width = match seq.arg_kind() {
            ArgKind::None => 0,
            ArgKind::Guint => 10,
            ArgKind::Guint8 => 3,
            ArgKind::Guint16Hex => 4,
        };
        for part in &parsed.parts {
            if let TemplatePart::Arg(i) = part {
                if *i >= seq.arg_count() {
                    return Err(ChafaError::bad_term_seq(0, "argument index out of range for this sequence"));
                }
            }
        }
        let literal_len: usize = parsed
            .parts
            .iter()
            .map(|p| match p {
                TemplatePart::Literal(l) => l.len(),
                TemplatePart::Arg(_) => max_arg_width,
            })
            .sum();
        if literal_len > TERM_SEQ_LENGTH_MAX {
            return Err(ChafaError::bad_term_seq(0, "template exceeds maximum sequence length"));
        }
        self.seqs.insert(seq, parsed);
        Ok(())
    }

    pub fn has_seq(&self, seq: TermSeq) -> bool {
        self.seqs.contains_key(&seq)
    }

    /// Copies every registered sequence from `other` that this table does
    /// not already define, used to layer a generic fallback (e.g. VT220)
    /// underneath a more specific detected terminal.
    pub fn supplement(&mut self, other: &TermInfo) {
        for (seq, template) in &other.seqs {
            self.seqs.entry(*seq).or_insert_with(|| template.clone());
        }
    }

    /// Composes two `TermInfo`s for muxer passthrough: `inner` is the
    /// terminal chafa is actually drawing to, `outer` is the multiplexer
    /// (tmux/screen) standing between this process and `inner`. The result
    /// uses `inner`'s template for every sequence, except a
    /// non-inheritable one that `outer` doesn't also declare is dropped,
    /// since the muxer has no way to pass it through. Key-input sequences
    /// are inheritable unconditionally: they describe what the user typed,
    /// not a drawing capability a muxer could fail to forward.
    pub fn chain(inner: &TermInfo, outer: &TermInfo) -> TermInfo {
        let mut result = TermInfo::new();
        for (seq, template) in &inner.seqs {
            if seq.is_inheritable() || outer.has_seq(*seq) {
                result.seqs.insert(*seq, template.clone());
            }
        }
        result
    }

    /// Renders `seq` with `args` into `out`, appending to any existing
    /// content. Fails if the sequence isn't registered or the argument
    /// count doesn't match.
    pub fn try_emit(&self, seq: TermSeq, args: &[Arg], out: &mut Vec<u8>) -> Result<()> {
        if args.len() != seq.arg_count() {
            return Err(ChafaError::invalid_argument(format!(
                "{} expects {} args, got {}",
                seq.name(),
                seq.arg_count(),
                args.len()
            )));
        }
        let Some(template) = self.seqs.get(&seq) else {
            return Err(ChafaError::bad_term_seq(0, "sequence not defined for this terminal"));
        };
        for part in &template.parts {
            match part {
                TemplatePart::Literal(l) => out.extend_from_slice(l),
                TemplatePart::Arg(i) => format_arg(args[*i], out),
            }
        }
        Ok(())
    }

    /// Streaming match of `input` against every registered template,
    /// decoding `%1`..`%6` argument values as it goes. Returns
    /// `Success` with the matched seq, its decoded args, and the number of
    /// bytes consumed on an exact match; `Again` if `input` is a valid
    /// prefix of some template but more bytes are needed to know which
    /// argument values it encodes; `Failure` if no registered template
    /// could ever match `input` as given.
    pub fn parse_seq(&self, input: &[u8]) -> ParseResult<(TermSeq, Vec<Arg>, usize)> {
        let mut any_prefix = false;
        for (seq, template) in &self.seqs {
            let mut slots: Vec<Option<Arg>> = vec![None; seq.arg_count()];
            match match_parts(&template.parts, input, seq.arg_kind(), &mut slots) {
                MatchStep::Done(len) => {
                    let args = slots.into_iter().map(|a| a.unwrap_or_else(|| default_arg(seq.arg_kind()))).collect();
                    return ParseResult::Success((*seq, args, len));
                }
                MatchStep::NeedMore => any_prefix = true,
                MatchStep::Mismatch => {}
            }
        }
        if any_prefix {
            ParseResult::Again
        } else {
            ParseResult::Failure
        }
    }
}

fn default_arg(kind: ArgKind) -> Arg {
    match kind {
        ArgKind::None | ArgKind::Guint => Arg::Guint(0),
        ArgKind::Guint8 => Arg::Guint8(0),
        ArgKind::Guint16Hex => Arg::Guint16Hex(0),
    }
}

/// Outcome of matching one [`Template`] (or a suffix of it) against one
/// position in the input.
enum MatchStep {
    /// Matched to the end of the template, consuming this many bytes.
    Done(usize),
    /// `input` ran out while still a valid prefix of what the template
    /// could produce; more bytes might complete the match.
    NeedMore,
    /// `input` cannot match this template regardless of what follows.
    Mismatch,
}

fn match_parts(parts: &[TemplatePart], input: &[u8], kind: ArgKind, slots: &mut [Option<Arg>]) -> MatchStep {
    let Some((part, rest)) = parts.split_first() else {
        return MatchStep::Done(0);
    };
    match part {
        TemplatePart::Literal(lit) => match_literal(lit, input, rest, kind, slots),
        TemplatePart::Arg(idx) => match_arg(*idx, kind, input, rest, slots),
    }
}

fn match_literal(lit: &[u8], input: &[u8], rest: &[TemplatePart], kind: ArgKind, slots: &mut [Option<Arg>]) -> MatchStep {
    if input.len() < lit.len() {
        return if lit.starts_with(input) { MatchStep::NeedMore } else { MatchStep::Mismatch };
    }
    if &input[..lit.len()] != lit {
        return MatchStep::Mismatch;
    }
    match match_parts(rest, &input[lit.len()..], kind, slots) {
        MatchStep::Done(n) => MatchStep::Done(lit.len() + n),
        other => other,
    }
}

/// Matches one `%N` argument slot at the current input position. `Guint`
/// and `Guint8` are variable-width decimal runs, so this backtracks: it
/// tries the longest run of digits first and shrinks until the rest of the
/// template matches, since a greedy match is the common case and a shorter
/// one is only needed when a following literal itself starts with a digit.
/// `Guint16Hex` is fixed-width (`set_seq`'s `%04x`-style formatting), so no
/// backtracking is needed there.
fn match_arg(idx: usize, kind: ArgKind, input: &[u8], rest: &[TemplatePart], slots: &mut [Option<Arg>]) -> MatchStep {
    match kind {
        ArgKind::None => MatchStep::Mismatch,
        ArgKind::Guint16Hex => {
            if input.len() < 4 {
                return if input.iter().all(|b| b.is_ascii_hexdigit()) { MatchStep::NeedMore } else { MatchStep::Mismatch };
            }
            if !input[..4].iter().all(|b| b.is_ascii_hexdigit()) {
                return MatchStep::Mismatch;
            }
            let hex = std::str::from_utf8(&input[..4]).expect("ascii hex digits are valid utf-8");
            let value = u16::from_str_radix(hex, 16).expect("four validated hex digits always parse");
            slots[idx] = Some(Arg::Guint16Hex(value));
            match match_parts(rest, &input[4..], kind, slots) {
                MatchStep::Done(n) => MatchStep::Done(4 + n),
                other => other,
            }
        }
        ArgKind::Guint | ArgKind::Guint8 => {
            let max_len = input.iter().take_while(|b| b.is_ascii_digit()).count();
            if max_len == 0 {
                return if input.is_empty() { MatchStep::NeedMore } else { MatchStep::Mismatch };
            }
            let ran_out_of_input = max_len == input.len();
            for len in (1..=max_len).rev() {
                let digits = std::str::from_utf8(&input[..len]).expect("ascii digits are valid utf-8");
                let Ok(value) = digits.parse::<u32>() else { continue };
                if kind == ArgKind::Guint8 && value > u8::MAX as u32 {
                    continue;
                }
                slots[idx] = Some(if kind == ArgKind::Guint8 { Arg::Guint8(value as u8) } else { Arg::Guint(value) });
                match match_parts(rest, &input[len..], kind, slots) {
                    MatchStep::Done(n) => return MatchStep::Done(len + n),
                    MatchStep::NeedMore => {}
                    MatchStep::Mismatch => {}
                }
            }
            slots[idx] = None;
            if ran_out_of_input { MatchStep::NeedMore } else { MatchStep::Mismatch }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_emit_zero_arg_sequence() {
        let mut info = TermInfo::new();
        info.set_seq(TermSeq::Clear, "\x1b[2J").unwrap();
        let mut out = Vec::new();
        info.try_emit(TermSeq::Clear, &[], &mut out).unwrap();
        assert_eq!(out, b"\x1b[2J");
    }

    #[test]
    fn set_and_emit_with_positional_args() {
        let mut info = TermInfo::new();
        info.set_seq(TermSeq::CursorToPos, "\x1b[%2;%1H").unwrap();
        let mut out = Vec::new();
        info.try_emit(TermSeq::CursorToPos, &[Arg::Guint(5), Arg::Guint(10)], &mut out).unwrap();
        assert_eq!(out, b"\x1b[10;5H");
    }

    #[test]
    fn wrong_arg_count_is_rejected() {
        let mut info = TermInfo::new();
        info.set_seq(TermSeq::CursorUp, "\x1b[%1A").unwrap();
        let mut out = Vec::new();
        assert!(info.try_emit(TermSeq::CursorUp, &[], &mut out).is_err());
    }

    #[test]
    fn supplement_fills_in_missing_sequences_only() {
        let mut base = TermInfo::new();
        base.set_seq(TermSeq::Clear, "\x1b[2J").unwrap();

        let mut fallback = TermInfo::new();
        fallback.set_seq(TermSeq::Clear, "FALLBACK").unwrap();
        fallback.set_seq(TermSeq::ResetAttributes, "\x1b[0m").unwrap();

        base.supplement(&fallback);
        let mut out = Vec::new();
        base.try_emit(TermSeq::Clear, &[], &mut out).unwrap();
        assert_eq!(out, b"\x1b[2J");
        assert!(base.has_seq(TermSeq::ResetAttributes));
    }

    #[test]
    fn parse_seq_matches_registered_literal() {
        let mut info = TermInfo::new();
        info.set_seq(TermSeq::UpKey, "\x1b[A").unwrap();
        info.set_seq(TermSeq::DownKey, "\x1b[B").unwrap();
        let ParseResult::Success((seq, args, len)) = info.parse_seq(b"\x1b[Brest") else { panic!("expected a match") };
        assert_eq!(seq, TermSeq::DownKey);
        assert!(args.is_empty());
        assert_eq!(len, 3);
    }

    #[test]
    fn parse_seq_decodes_positional_args() {
        let mut info = TermInfo::new();
        info.set_seq(TermSeq::CursorToPos, "\x1b[%2;%1H").unwrap();
        let ParseResult::Success((seq, args, len)) = info.parse_seq(b"\x1b[10;5Hrest") else { panic!("expected a match") };
        assert_eq!(seq, TermSeq::CursorToPos);
        assert_eq!(args, vec![Arg::Guint(5), Arg::Guint(10)]);
        assert_eq!(len, 7);
    }

    #[test]
    fn parse_emit_inverse_for_an_argument_bearing_sequence() {
        let mut info = TermInfo::new();
        info.set_seq(TermSeq::SetColorFgDirect, "\x1b[38;2;%1;%2;%3m").unwrap();
        let args = [Arg::Guint8(12), Arg::Guint8(200), Arg::Guint8(7)];
        let mut emitted = Vec::new();
        info.try_emit(TermSeq::SetColorFgDirect, &args, &mut emitted).unwrap();

        let ParseResult::Success((seq, parsed_args, len)) = info.parse_seq(&emitted) else { panic!("expected a match") };
        assert_eq!(seq, TermSeq::SetColorFgDirect);
        assert_eq!(parsed_args, args);
        assert_eq!(len, emitted.len());
    }

    #[test]
    fn parse_seq_reports_again_on_truncated_input() {
        let mut info = TermInfo::new();
        info.set_seq(TermSeq::CursorUp, "\x1b[%1A").unwrap();
        assert_eq!(info.parse_seq(b"\x1b[12"), ParseResult::Again);
    }

    #[test]
    fn parse_seq_reports_failure_on_unrelated_input() {
        let mut info = TermInfo::new();
        info.set_seq(TermSeq::CursorUp, "\x1b[%1A").unwrap();
        assert_eq!(info.parse_seq(b"hello"), ParseResult::Failure);
    }

    #[test]
    fn chain_clears_non_inheritable_seqs_outer_lacks_but_keeps_keys() {
        let mut inner = TermInfo::new();
        inner.set_seq(TermSeq::Clear, "\x1b[2J").unwrap();
        inner.set_seq(TermSeq::BeginSixels, "\x1bPq").unwrap();
        inner.set_seq(TermSeq::UpKey, "\x1b[A").unwrap();

        let mut outer = TermInfo::new();
        outer.set_seq(TermSeq::Clear, "MUX-CLEAR").unwrap();

        let chained = TermInfo::chain(&inner, &outer);
        assert!(chained.has_seq(TermSeq::Clear));
        assert!(!chained.has_seq(TermSeq::BeginSixels));
        assert!(chained.has_seq(TermSeq::UpKey));

        let mut out = Vec::new();
        chained.try_emit(TermSeq::Clear, &[], &mut out).unwrap();
        assert_eq!(out, b"\x1b[2J");
    }
}
