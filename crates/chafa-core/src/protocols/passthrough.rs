//! tmux/GNU Screen passthrough wrapper: transparently chunks an inner
//! encoder's output into `DCS` packets sized for whichever multiplexer is
//! in play, escaping as needed. A pure wrapper over a byte sink, not a
//! modification of the inner encoder — inner encoders stay valid without it.

/// tmux doubles every embedded `ESC` and allows very large packets; Screen
/// does not double escapes but caps each packet at 200 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassthroughKind {
    Tmux,
    Screen,
}

impl PassthroughKind {
    fn packet_limit(self) -> usize {
        match self {
            PassthroughKind::Tmux => 1_000_000,
            PassthroughKind::Screen => 200,
        }
    }

    fn doubles_escape(self) -> bool {
        matches!(self, PassthroughKind::Tmux)
    }
}

/// Wraps raw bytes for one packet: `ESC P tmux;` or `ESC P`, the (possibly
/// escape-doubled) payload, then `ESC \`.
fn frame_packet(kind: PassthroughKind, payload: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(b"\x1bP");
    if kind == PassthroughKind::Tmux {
        out.extend_from_slice(b"tmux;");
    }
    if kind.doubles_escape() {
        for &b in payload {
            if b == 0x1b {
                out.push(0x1b);
            }
            out.push(b);
        }
    } else {
        out.extend_from_slice(payload);
    }
    out.extend_from_slice(b"\x1b\\");
}

/// Buffers an inner encoder's byte stream and flushes complete packets as
/// the configured limit is reached, splitting oversize sequences into
/// multiple framed packets. [`PassthroughEncoder::finish`]
/// must be called to flush any remainder and must not be interleaved with
/// further [`push`](Self::push) calls, since the end-of-sequence emit has
/// to stay atomic to one packet boundary from the caller's perspective.
pub struct PassthroughEncoder {
    kind: PassthroughKind,
    pending: Vec<u8>,
    out: Vec<u8>,
}

impl PassthroughEncoder {
    pub fn new(kind: PassthroughKind) -> Self {
        Self { kind, pending: Vec::new(), out: Vec::new() }
    }

    /// Appends bytes from the inner encoder, flushing full packets as the
    /// limit is reached. The escape-doubling accounting happens against
    /// the *post-doubling* size for tmux, since that's the wire size the
    /// limit actually bounds.
    pub fn push(&mut self, data: &[u8]) {
        self.pending.extend_from_slice(data);
        let limit = self.kind.packet_limit();
        while self.raw_payload_len_for(limit) >= limit {
            let take = self.payload_prefix_len(limit);
            let payload: Vec<u8> = self.pending.drain(..take).collect();
            frame_packet(self.kind, &payload, &mut self.out);
        }
    }

    /// Length in wire bytes the current `self.pending` buffer would occupy
    /// if flushed whole (post-escape-doubling for tmux).
    fn raw_payload_len_for(&self, _limit: usize) -> usize {
        if self.kind.doubles_escape() {
            self.pending.iter().map(|&b| if b == 0x1b { 2 } else { 1 }).sum()
        } else {
            self.pending.len()
        }
    }

    /// How many bytes of `self.pending` to take so the doubled payload fits
    /// in exactly `limit` wire bytes (tmux) or `limit` raw bytes (screen).
    fn payload_prefix_len(&self, limit: usize) -> usize {
        if !self.kind.doubles_escape() {
            return limit.min(self.pending.len());
        }
        let mut wire = 0usize;
        for (i, &b) in self.pending.iter().enumerate() {
            let w = if b == 0x1b { 2 } else { 1 };
            if wire + w > limit {
                return i;
            }
            wire += w;
        }
        self.pending.len()
    }

    /// Flushes any remaining buffered bytes as a final (possibly
    /// under-sized) packet and returns the complete wrapped byte stream.
    pub fn finish(mut self) -> Vec<u8> {
        if !self.pending.is_empty() {
            let payload = std::mem::take(&mut self.pending);
            frame_packet(self.kind, &payload, &mut self.out);
        }
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tmux_doubles_embedded_escapes() {
        let mut enc = PassthroughEncoder::new(PassthroughKind::Tmux);
        enc.push(b"\x1b[31mHi");
        let out = enc.finish();
        assert_eq!(out, b"\x1bPtmux;\x1b\x1b[31mHi\x1b\\");
    }

    #[test]
    fn screen_does_not_double_escapes_and_caps_at_200_bytes() {
        let payload = vec![b'x'; 200];
        let mut enc = PassthroughEncoder::new(PassthroughKind::Screen);
        enc.push(&payload);
        let out = enc.finish();

        // Exactly one 200-byte packet, no trailing empty second packet.
        let expected_len = 2 + 200 + 2; // "\x1bP" + payload + "\x1b\\"
        assert_eq!(out.len(), expected_len);
        assert!(out.starts_with(b"\x1bP"));
        assert!(out.ends_with(b"\x1b\\"));
        assert_eq!(out.iter().filter(|&&b| b == 0x1b).count(), 2);
    }

    #[test]
    fn screen_splits_oversize_payload_into_multiple_packets() {
        let payload = vec![b'y'; 450];
        let mut enc = PassthroughEncoder::new(PassthroughKind::Screen);
        enc.push(&payload);
        let out = enc.finish();
        let n_packets = out.windows(2).filter(|w| w == b"\x1bP").count();
        assert_eq!(n_packets, 3); // 200 + 200 + 50
    }
}
