// SPDX-License-Identifier: MIT
//
// Terminal key decoder.
//
// Turns raw stdin bytes into key events, one byte at a time. The line
// editor pulls keys on demand from a blocking source, so unlike a
// buffered event-loop parser there is no "incomplete sequence" state to
// carry across reads: when a sequence needs another byte, the decoder
// simply reads it.
//
// Handled input:
//
// - ASCII printable characters and C0 control bytes (Ctrl+letter)
// - UTF-8 multi-byte characters, with continuation-byte validation
// - CSI sequences for arrows, Home/End and Delete, including the xterm
//   modifier parameter (`CSI 1;2C` = Shift+Right, `CSI 1;5D` = Ctrl+Left)
//
// # Recovery
//
// Bad input never reaches the caller as an error:
//
// - A stray continuation byte or invalid lead byte is dropped.
// - A multi-byte sequence interrupted by a non-continuation byte is
//   dropped, and the interrupting byte is decoded on its own, so
//   `0xC3 'a'` yields just `a`.
// - ESC followed by anything but `[` yields a bare Escape key; the
//   following byte is decoded normally.
// - A well-formed CSI sequence we don't know yields `KeyCode::Unknown`,
//   which the editor ignores.

use std::io::{self, Read};

use bitflags::bitflags;

// ─── Event Types ────────────────────────────────────────────────────────────

/// A keyboard event with key identity and modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// Which key was pressed.
    pub code: KeyCode,
    /// Active modifier keys (Shift, Alt, Ctrl).
    pub modifiers: Modifiers,
}

impl KeyEvent {
    /// A key with no modifiers.
    #[must_use]
    pub const fn plain(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::empty(),
        }
    }

    /// A key with the given modifiers.
    #[must_use]
    pub const fn with(code: KeyCode, modifiers: Modifiers) -> Self {
        Self { code, modifiers }
    }

    /// Ctrl + an ASCII letter (`ctrl('c')` is byte 0x03).
    #[must_use]
    pub const fn ctrl(letter: char) -> Self {
        Self {
            code: KeyCode::Char(letter),
            modifiers: Modifiers::CTRL,
        }
    }

    /// Whether this is exactly Ctrl + `letter`.
    #[must_use]
    pub fn is_ctrl(&self, letter: char) -> bool {
        self.code == KeyCode::Char(letter) && self.modifiers == Modifiers::CTRL
    }
}

/// Identity of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    /// A Unicode character (printable, or a letter under Ctrl).
    Char(char),
    // ── Named keys ──────────────────────────────────────────────
    Enter,
    Tab,
    Backspace,
    Escape,
    Delete,
    // ── Navigation ──────────────────────────────────────────────
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    /// A well-formed escape sequence this decoder does not map.
    Unknown,
}

bitflags! {
    /// Keyboard modifier flags.
    ///
    /// Matches the xterm CSI modifier encoding where `param = 1 + bitmask`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0000_0001;
        const ALT   = 0b0000_0010;
        const CTRL  = 0b0000_0100;
    }
}

// ─── KeyDecoder ─────────────────────────────────────────────────────────────

/// Upper bound on CSI parameter bytes before a sequence is abandoned.
///
/// Real key sequences carry at most a handful of parameters. Anything
/// longer is line noise and must not grow the buffer without bound.
const MAX_CSI_LEN: usize = 32;

/// Pulls key events from a byte source.
///
/// Any [`Read`] works: `io::stdin()` in production, a byte slice in tests.
///
/// # Example
///
/// ```
/// use cl_term::input::{KeyCode, KeyDecoder, KeyEvent, Modifiers};
///
/// let mut keys = KeyDecoder::new(&b"a\x1b[1;5C"[..]);
/// assert_eq!(keys.next_key()?, Some(KeyEvent::plain(KeyCode::Char('a'))));
/// assert_eq!(
///     keys.next_key()?,
///     Some(KeyEvent::with(KeyCode::Right, Modifiers::CTRL))
/// );
/// assert_eq!(keys.next_key()?, None);
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct KeyDecoder<R> {
    source: R,
    /// One byte of push-back, used when a byte ends a sequence it does not
    /// belong to and must be decoded on its own.
    pending: Option<u8>,
}

impl<R: Read> KeyDecoder<R> {
    /// Wrap a byte source.
    pub const fn new(source: R) -> Self {
        Self {
            source,
            pending: None,
        }
    }

    /// Decode the next key. Returns `Ok(None)` at end of input.
    ///
    /// # Errors
    ///
    /// Returns an error only if the underlying read fails.
    pub fn next_key(&mut self) -> io::Result<Option<KeyEvent>> {
        loop {
            let Some(byte) = self.read_byte()? else {
                return Ok(None);
            };

            let key = match byte {
                0x1B => self.decode_escape()?,
                0x0A | 0x0D => Some(KeyEvent::plain(KeyCode::Enter)),
                0x09 => Some(KeyEvent::plain(KeyCode::Tab)),
                0x08 | 0x7F => Some(KeyEvent::plain(KeyCode::Backspace)),
                0x00 => Some(KeyEvent::ctrl('@')),
                b @ 0x01..=0x1A => Some(KeyEvent::ctrl(char::from(b + b'a' - 1))),
                b @ 0x20..=0x7E => Some(KeyEvent::plain(KeyCode::Char(char::from(b)))),
                b @ 0xC0..=0xFF => self.decode_utf8(b)?,
                // FS, GS, RS, US and bare continuation bytes.
                b => {
                    log::trace!("dropping stray byte {b:#04x}");
                    None
                }
            };

            if let Some(key) = key {
                return Ok(Some(key));
            }
        }
    }

    /// Read one byte, honouring the push-back slot and retrying `EINTR`.
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        if let Some(b) = self.pending.take() {
            return Ok(Some(b));
        }
        let mut buf = [0u8; 1];
        loop {
            match self.source.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(buf[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }

    // ── UTF-8 ───────────────────────────────────────────────────────────

    fn decode_utf8(&mut self, lead: u8) -> io::Result<Option<KeyEvent>> {
        let expected = utf8_char_len(lead);
        if expected == 0 {
            log::debug!("invalid UTF-8 lead byte {lead:#04x}");
            return Ok(None);
        }

        let mut bytes = [lead, 0, 0, 0];
        for slot in bytes.iter_mut().take(expected).skip(1) {
            let Some(b) = self.read_byte()? else {
                return Ok(None);
            };
            // Continuation bytes must start with 0b10xxxxxx.
            if b & 0xC0 != 0x80 {
                log::debug!("UTF-8 sequence from {lead:#04x} interrupted by {b:#04x}");
                self.pending = Some(b);
                return Ok(None);
            }
            *slot = b;
        }

        // Overlong encodings and surrogates pass the bit checks but not this.
        Ok(std::str::from_utf8(&bytes[..expected])
            .ok()
            .and_then(|s| s.chars().next())
            .map(|ch| KeyEvent::plain(KeyCode::Char(ch))))
    }

    // ── Escape sequences ────────────────────────────────────────────────

    fn decode_escape(&mut self) -> io::Result<Option<KeyEvent>> {
        let Some(next) = self.read_byte()? else {
            return Ok(Some(KeyEvent::plain(KeyCode::Escape)));
        };

        if next != b'[' {
            // Not a CSI sequence: degrade to a literal Escape and let the
            // following byte be decoded on its own.
            self.pending = Some(next);
            return Ok(Some(KeyEvent::plain(KeyCode::Escape)));
        }

        // Accumulate parameter/intermediate bytes until the final byte.
        let mut params = Vec::with_capacity(8);
        loop {
            let Some(b) = self.read_byte()? else {
                return Ok(None);
            };
            if (0x40..=0x7E).contains(&b) {
                return Ok(Some(csi_key(&params, b)));
            }
            if !(0x20..=0x3F).contains(&b) || params.len() >= MAX_CSI_LEN {
                log::trace!("abandoning malformed CSI sequence at byte {b:#04x}");
                return Ok(None);
            }
            params.push(b);
        }
    }
}

// ─── Stateless Helpers ──────────────────────────────────────────────────────

/// Map a complete CSI sequence (parameters + final byte) to a key.
fn csi_key(params_raw: &[u8], final_byte: u8) -> KeyEvent {
    let params = parse_csi_params(params_raw);
    let modifiers = params
        .get(1)
        .map_or(Modifiers::empty(), |p| decode_modifiers(p.0));

    let code = match final_byte {
        b'A' => KeyCode::Up,
        b'B' => KeyCode::Down,
        b'C' => KeyCode::Right,
        b'D' => KeyCode::Left,
        b'H' => KeyCode::Home,
        b'F' => KeyCode::End,
        b'~' => match params.first().map_or(0, |p| p.0) {
            1 | 7 => KeyCode::Home,
            3 => KeyCode::Delete,
            4 | 8 => KeyCode::End,
            _ => KeyCode::Unknown,
        },
        _ => KeyCode::Unknown,
    };

    if code == KeyCode::Unknown {
        log::trace!(
            "ignoring CSI {}{}",
            String::from_utf8_lossy(params_raw),
            char::from(final_byte)
        );
    }

    KeyEvent::with(code, modifiers)
}

/// CSI parameter: `(main_value, colon_sub_parameter)`.
struct CsiParam(u16, #[allow(dead_code)] u16);

/// Parse semicolon-separated CSI parameters with optional colon sub-params.
///
/// Examples:
/// - `1;2` → `[(1,0), (2,0)]`
/// - `1;5:1` → `[(1,0), (5,1)]`
/// - (empty) → `[]`
fn parse_csi_params(raw: &[u8]) -> Vec<CsiParam> {
    if raw.is_empty() {
        return Vec::new();
    }

    let mut params = Vec::with_capacity(4);
    let mut pos = 0;

    while pos <= raw.len() {
        let (main_val, next) = parse_u16_at(raw, pos);
        pos = next;

        // Check for colon sub-parameter.
        let sub_val = if pos < raw.len() && raw[pos] == b':' {
            pos += 1;
            let (v, n) = parse_u16_at(raw, pos);
            pos = n;
            v
        } else {
            0
        };

        params.push(CsiParam(main_val, sub_val));

        // Skip semicolon separator.
        if pos < raw.len() && raw[pos] == b';' {
            pos += 1;
        } else {
            break;
        }
    }

    params
}

/// Parse a u16 from bytes starting at `start`, stopping at non-digit.
/// Returns `(value, next_position)`.
fn parse_u16_at(buf: &[u8], start: usize) -> (u16, usize) {
    let mut val: u16 = 0;
    let mut pos = start;
    while pos < buf.len() && buf[pos].is_ascii_digit() {
        val = val
            .saturating_mul(10)
            .saturating_add(u16::from(buf[pos] - b'0'));
        pos += 1;
    }
    (val, pos)
}

/// Decode CSI modifier parameter into `Modifiers` bitflags.
///
/// The encoding is `1 + bitmask`. A parameter of 0 or 1 means no modifiers.
/// Bits we don't track (Super, Hyper, Meta) are dropped.
#[allow(clippy::cast_possible_truncation)]
const fn decode_modifiers(param: u16) -> Modifiers {
    let val = if param > 0 { param - 1 } else { 0 };
    Modifiers::from_bits_truncate(val as u8)
}

/// Expected byte length of a UTF-8 character from its lead byte.
/// Returns 0 for invalid lead bytes (continuation bytes, 0xF8..=0xFF).
const fn utf8_char_len(lead: u8) -> usize {
    match lead {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => 0,
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: decode every key in `data`.
    fn keys(data: &[u8]) -> Vec<KeyEvent> {
        let mut decoder = KeyDecoder::new(data);
        let mut out = Vec::new();
        while let Some(key) = decoder.next_key().unwrap() {
            out.push(key);
        }
        out
    }

    /// Helper: decode exactly one key.
    fn one(data: &[u8]) -> KeyEvent {
        let all = keys(data);
        assert_eq!(all.len(), 1, "expected 1 key, got {all:?}");
        all[0]
    }

    fn ch(c: char) -> KeyEvent {
        KeyEvent::plain(KeyCode::Char(c))
    }

    // ── ASCII Printable ─────────────────────────────────────────────────

    #[test]
    fn ascii_single_char() {
        assert_eq!(one(b"a"), ch('a'));
    }

    #[test]
    fn ascii_multiple_chars() {
        assert_eq!(keys(b"abc"), vec![ch('a'), ch('b'), ch('c')]);
    }

    #[test]
    fn empty_input_is_eof() {
        assert!(keys(b"").is_empty());
    }

    // ── Control Characters ──────────────────────────────────────────────

    #[test]
    fn ctrl_letters() {
        assert_eq!(one(b"\x01"), KeyEvent::ctrl('a'));
        assert_eq!(one(b"\x03"), KeyEvent::ctrl('c'));
        assert_eq!(one(b"\x04"), KeyEvent::ctrl('d'));
        assert_eq!(one(b"\x05"), KeyEvent::ctrl('e'));
        assert_eq!(one(b"\x10"), KeyEvent::ctrl('p'));
        assert_eq!(one(b"\x12"), KeyEvent::ctrl('r'));
        assert_eq!(one(b"\x18"), KeyEvent::ctrl('x'));
    }

    #[test]
    fn is_ctrl_matches_only_ctrl() {
        assert!(KeyEvent::ctrl('c').is_ctrl('c'));
        assert!(!ch('c').is_ctrl('c'));
    }

    #[test]
    fn enter_cr_and_lf() {
        assert_eq!(one(b"\r"), KeyEvent::plain(KeyCode::Enter));
        assert_eq!(one(b"\n"), KeyEvent::plain(KeyCode::Enter));
    }

    #[test]
    fn backspace_both_encodings() {
        assert_eq!(one(b"\x7F"), KeyEvent::plain(KeyCode::Backspace));
        assert_eq!(one(b"\x08"), KeyEvent::plain(KeyCode::Backspace));
    }

    #[test]
    fn tab() {
        assert_eq!(one(b"\t"), KeyEvent::plain(KeyCode::Tab));
    }

    // ── CSI ─────────────────────────────────────────────────────────────

    #[test]
    fn arrows() {
        assert_eq!(one(b"\x1b[A"), KeyEvent::plain(KeyCode::Up));
        assert_eq!(one(b"\x1b[B"), KeyEvent::plain(KeyCode::Down));
        assert_eq!(one(b"\x1b[C"), KeyEvent::plain(KeyCode::Right));
        assert_eq!(one(b"\x1b[D"), KeyEvent::plain(KeyCode::Left));
    }

    #[test]
    fn shift_arrow() {
        assert_eq!(
            one(b"\x1b[1;2D"),
            KeyEvent::with(KeyCode::Left, Modifiers::SHIFT)
        );
    }

    #[test]
    fn ctrl_arrow() {
        assert_eq!(
            one(b"\x1b[1;5C"),
            KeyEvent::with(KeyCode::Right, Modifiers::CTRL)
        );
    }

    #[test]
    fn ctrl_shift_arrow() {
        assert_eq!(
            one(b"\x1b[1;6D"),
            KeyEvent::with(KeyCode::Left, Modifiers::CTRL | Modifiers::SHIFT)
        );
    }

    #[test]
    fn home_end_letter_form() {
        assert_eq!(one(b"\x1b[H"), KeyEvent::plain(KeyCode::Home));
        assert_eq!(one(b"\x1b[F"), KeyEvent::plain(KeyCode::End));
    }

    #[test]
    fn shift_home_end() {
        assert_eq!(
            one(b"\x1b[1;2H"),
            KeyEvent::with(KeyCode::Home, Modifiers::SHIFT)
        );
        assert_eq!(
            one(b"\x1b[1;2F"),
            KeyEvent::with(KeyCode::End, Modifiers::SHIFT)
        );
    }

    #[test]
    fn home_end_tilde_form() {
        assert_eq!(one(b"\x1b[1~"), KeyEvent::plain(KeyCode::Home));
        assert_eq!(one(b"\x1b[7~"), KeyEvent::plain(KeyCode::Home));
        assert_eq!(one(b"\x1b[4~"), KeyEvent::plain(KeyCode::End));
        assert_eq!(one(b"\x1b[8~"), KeyEvent::plain(KeyCode::End));
    }

    #[test]
    fn delete() {
        assert_eq!(one(b"\x1b[3~"), KeyEvent::plain(KeyCode::Delete));
    }

    #[test]
    fn unknown_csi_is_reported_not_dropped() {
        assert_eq!(one(b"\x1b[15~").code, KeyCode::Unknown);
        assert_eq!(one(b"\x1b[Z").code, KeyCode::Unknown);
    }

    #[test]
    fn sequence_followed_by_text() {
        assert_eq!(
            keys(b"\x1b[Dx"),
            vec![KeyEvent::plain(KeyCode::Left), ch('x')]
        );
    }

    #[test]
    fn malformed_csi_is_dropped() {
        // 0x07 is not a valid parameter byte; the sequence is abandoned and
        // decoding resumes at the next byte.
        assert_eq!(keys(b"\x1b[1\x07q"), vec![ch('q')]);
    }

    #[test]
    fn overlong_csi_is_dropped() {
        let mut data = b"\x1b[".to_vec();
        data.extend(std::iter::repeat_n(b'1', MAX_CSI_LEN + 1));
        data.extend_from_slice(b"Aq");
        // The run of digits past the limit decodes as plain digits.
        let decoded = keys(&data);
        assert_eq!(decoded.last(), Some(&ch('q')));
        assert!(decoded.iter().all(|k| k.code != KeyCode::Up));
    }

    // ── Escape degradation ──────────────────────────────────────────────

    #[test]
    fn lone_escape_at_eof() {
        assert_eq!(one(b"\x1b"), KeyEvent::plain(KeyCode::Escape));
    }

    #[test]
    fn escape_non_bracket_degrades() {
        assert_eq!(
            keys(b"\x1bb"),
            vec![KeyEvent::plain(KeyCode::Escape), ch('b')]
        );
    }

    #[test]
    fn ss3_is_not_csi() {
        assert_eq!(
            keys(b"\x1bOA"),
            vec![KeyEvent::plain(KeyCode::Escape), ch('O'), ch('A')]
        );
    }

    // ── UTF-8 ───────────────────────────────────────────────────────────

    #[test]
    fn utf8_two_byte() {
        assert_eq!(one("é".as_bytes()), ch('é'));
    }

    #[test]
    fn utf8_three_byte() {
        assert_eq!(one("中".as_bytes()), ch('中'));
    }

    #[test]
    fn utf8_four_byte() {
        assert_eq!(one("🦀".as_bytes()), ch('🦀'));
    }

    #[test]
    fn utf8_bad_continuation_keeps_next_byte() {
        assert_eq!(keys(b"\xC3a"), vec![ch('a')]);
    }

    #[test]
    fn utf8_bad_continuation_mid_sequence() {
        assert_eq!(keys(b"\xE4\xB8z"), vec![ch('z')]);
    }

    #[test]
    fn utf8_stray_continuation_dropped() {
        assert_eq!(keys(b"\x80\xBFok"), vec![ch('o'), ch('k')]);
    }

    #[test]
    fn utf8_invalid_lead_dropped() {
        assert_eq!(keys(b"\xFFx"), vec![ch('x')]);
    }

    #[test]
    fn utf8_overlong_dropped() {
        // 0xC0 0x80 is an overlong encoding of NUL.
        assert_eq!(keys(b"\xC0\x80y"), vec![ch('y')]);
    }

    #[test]
    fn utf8_truncated_at_eof() {
        assert!(keys(b"\xE4\xB8").is_empty());
    }

    // ── Read errors ─────────────────────────────────────────────────────

    struct Flaky {
        calls: usize,
    }

    impl Read for Flaky {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.calls += 1;
            match self.calls {
                1 => Err(io::Error::from(io::ErrorKind::Interrupted)),
                2 => {
                    buf[0] = b'k';
                    Ok(1)
                }
                _ => Err(io::Error::other("gone")),
            }
        }
    }

    #[test]
    fn eintr_is_retried_and_other_errors_propagate() {
        let mut decoder = KeyDecoder::new(Flaky { calls: 0 });
        assert_eq!(decoder.next_key().unwrap(), Some(ch('k')));
        assert!(decoder.next_key().is_err());
    }

    // ── Helpers ─────────────────────────────────────────────────────────

    #[test]
    fn decode_modifier_values() {
        assert_eq!(decode_modifiers(0), Modifiers::empty());
        assert_eq!(decode_modifiers(1), Modifiers::empty());
        assert_eq!(decode_modifiers(2), Modifiers::SHIFT);
        assert_eq!(decode_modifiers(3), Modifiers::ALT);
        assert_eq!(decode_modifiers(5), Modifiers::CTRL);
        assert_eq!(decode_modifiers(6), Modifiers::CTRL | Modifiers::SHIFT);
    }

    #[test]
    fn csi_params_forms() {
        assert!(parse_csi_params(b"").is_empty());
        let p = parse_csi_params(b"1;5");
        assert_eq!((p[0].0, p[1].0), (1, 5));
        let p = parse_csi_params(b"1;5:1");
        assert_eq!((p[1].0, p[1].1), (5, 1));
    }

    #[test]
    fn parse_u16_saturates() {
        assert_eq!(parse_u16_at(b"99999999", 0).0, u16::MAX);
    }

    #[test]
    fn utf8_len_table() {
        assert_eq!(utf8_char_len(b'a'), 1);
        assert_eq!(utf8_char_len(0xC3), 2);
        assert_eq!(utf8_char_len(0xE4), 3);
        assert_eq!(utf8_char_len(0xF0), 4);
        assert_eq!(utf8_char_len(0x80), 0);
        assert_eq!(utf8_char_len(0xF8), 0);
    }
}
