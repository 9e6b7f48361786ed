//! The escape alphabet shared by the lexer and the code generator.
//!
//! The lexer decodes `\n`-style sequences in character and string literals;
//! the code generator encodes raw bytes back into `.string` directive
//! syntax. Both directions derive from the one table here so the alphabets
//! cannot drift apart.

/// (source character after `\`, decoded byte) pairs accepted in character
/// and string literals.
pub const ESCAPES: &[(u8, u8)] = &[
    (b'n', b'\n'),
    (b't', b'\t'),
    (b'r', b'\r'),
    (b'0', 0),
    (b'\\', b'\\'),
    (b'\'', b'\''),
    (b'"', b'"'),
];

/// Decode the character following a backslash in a literal.
///
/// Unknown escapes decode to the character itself, so `'\q'` is `'q'`.
pub fn unescape(c: u8) -> u8 {
    ESCAPES
        .iter()
        .find(|&&(src, _)| src == c)
        .map(|&(_, decoded)| decoded)
        .unwrap_or(c)
}

/// Encode one byte for an assembler `.string` directive.
///
/// Named escapes come back out as their two-character form, printable ASCII
/// passes through, and everything else becomes a three-digit octal escape.
pub fn escape_for_asm(b: u8) -> String {
    match b {
        b'\n' => "\\n".to_string(),
        b'\t' => "\\t".to_string(),
        b'\r' => "\\r".to_string(),
        b'\\' => "\\\\".to_string(),
        b'"' => "\\\"".to_string(),
        0x20..=0x7e => (b as char).to_string(),
        _ => format!("\\{:03o}", b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape_named() {
        assert_eq!(unescape(b'n'), b'\n');
        assert_eq!(unescape(b't'), b'\t');
        assert_eq!(unescape(b'r'), b'\r');
        assert_eq!(unescape(b'0'), 0);
        assert_eq!(unescape(b'\\'), b'\\');
        assert_eq!(unescape(b'\''), b'\'');
        assert_eq!(unescape(b'"'), b'"');
    }

    #[test]
    fn test_unescape_unknown_passes_through() {
        assert_eq!(unescape(b'q'), b'q');
    }

    #[test]
    fn test_escape_for_asm() {
        assert_eq!(escape_for_asm(b'\n'), "\\n");
        assert_eq!(escape_for_asm(b'"'), "\\\"");
        assert_eq!(escape_for_asm(b'A'), "A");
        assert_eq!(escape_for_asm(0x01), "\\001");
        assert_eq!(escape_for_asm(0xff), "\\377");
    }

    #[test]
    fn test_round_trip_through_table() {
        for &(src, decoded) in ESCAPES {
            assert_eq!(unescape(src), decoded);
        }
    }
}
