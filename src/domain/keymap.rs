//! Character-to-keycode translation for key-level backends
//!
//! Maps a character to the evdev keycode producing it on the US layout,
//! plus whether shift must be held. The table is static and deliberately
//! best-effort: anything it does not cover maps to `None` and is skipped
//! by the typing loop instead of failing the whole session.

/// Evdev keycode for the left shift modifier
pub const KEY_LEFTSHIFT: u32 = 42;

/// Evdev keycodes for `a`..`z` (`KEY_A`..`KEY_Z` are not contiguous)
const LETTER_CODES: [u32; 26] = [
    30, 48, 46, 32, 18, 33, 34, 35, 23, 36, 37, 38, 50, 49, 24, 25, 16, 19, 31, 20, 22, 47, 17,
    45, 21, 44,
];

/// A resolved (keycode, shift) pair for one character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyMapping {
    /// Evdev keycode (`KEY_*` value from `linux/input-event-codes.h`)
    pub keycode: u32,
    /// Whether left shift must be held around the key press
    pub shift: bool,
}

impl KeyMapping {
    const fn plain(keycode: u32) -> Self {
        Self {
            keycode,
            shift: false,
        }
    }

    const fn shifted(keycode: u32) -> Self {
        Self {
            keycode,
            shift: true,
        }
    }
}

/// Resolve a character to its US-layout keycode.
///
/// Covers ASCII letters, digits, whitespace/control (space, newline, tab,
/// backspace), the shifted digit row, and the standard punctuation pairs.
/// Returns `None` for everything else.
pub fn map_char(ch: char) -> Option<KeyMapping> {
    // Letters
    if ch.is_ascii_lowercase() {
        return Some(KeyMapping::plain(LETTER_CODES[(ch as u8 - b'a') as usize]));
    }
    if ch.is_ascii_uppercase() {
        return Some(KeyMapping::shifted(
            LETTER_CODES[(ch as u8 - b'A') as usize],
        ));
    }

    // Digit row: KEY_1..KEY_9 are 2..10, KEY_0 is 11
    if ch.is_ascii_digit() {
        let keycode = if ch == '0' {
            11
        } else {
            2 + (ch as u8 - b'1') as u32
        };
        return Some(KeyMapping::plain(keycode));
    }

    let mapping = match ch {
        // Whitespace and control
        ' ' => KeyMapping::plain(57),  // KEY_SPACE
        '\n' => KeyMapping::plain(28), // KEY_ENTER
        '\t' => KeyMapping::plain(15), // KEY_TAB
        '\u{8}' => KeyMapping::plain(14), // KEY_BACKSPACE

        // Shifted digit row
        '!' => KeyMapping::shifted(2),
        '@' => KeyMapping::shifted(3),
        '#' => KeyMapping::shifted(4),
        '$' => KeyMapping::shifted(5),
        '%' => KeyMapping::shifted(6),
        '^' => KeyMapping::shifted(7),
        '&' => KeyMapping::shifted(8),
        '*' => KeyMapping::shifted(9),
        '(' => KeyMapping::shifted(10),
        ')' => KeyMapping::shifted(11),

        // Punctuation pairs (unshifted / shifted share a key)
        '-' => KeyMapping::plain(12), // KEY_MINUS
        '_' => KeyMapping::shifted(12),
        '=' => KeyMapping::plain(13), // KEY_EQUAL
        '+' => KeyMapping::shifted(13),
        '[' => KeyMapping::plain(26), // KEY_LEFTBRACE
        '{' => KeyMapping::shifted(26),
        ']' => KeyMapping::plain(27), // KEY_RIGHTBRACE
        '}' => KeyMapping::shifted(27),
        '\\' => KeyMapping::plain(43), // KEY_BACKSLASH
        '|' => KeyMapping::shifted(43),
        ';' => KeyMapping::plain(39), // KEY_SEMICOLON
        ':' => KeyMapping::shifted(39),
        '\'' => KeyMapping::plain(40), // KEY_APOSTROPHE
        '"' => KeyMapping::shifted(40),
        '`' => KeyMapping::plain(41), // KEY_GRAVE
        '~' => KeyMapping::shifted(41),
        ',' => KeyMapping::plain(51), // KEY_COMMA
        '<' => KeyMapping::shifted(51),
        '.' => KeyMapping::plain(52), // KEY_DOT
        '>' => KeyMapping::shifted(52),
        '/' => KeyMapping::plain(53), // KEY_SLASH
        '?' => KeyMapping::shifted(53),

        _ => return None,
    };

    Some(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercase_letters_are_unshifted() {
        for ch in 'a'..='z' {
            let mapping = map_char(ch).unwrap();
            assert!(!mapping.shift, "{ch} should not need shift");
            assert!(mapping.keycode != 0);
        }
    }

    #[test]
    fn uppercase_letters_share_keycode_with_lowercase() {
        for (lower, upper) in ('a'..='z').zip('A'..='Z') {
            let lower_mapping = map_char(lower).unwrap();
            let upper_mapping = map_char(upper).unwrap();
            assert_eq!(lower_mapping.keycode, upper_mapping.keycode);
            assert!(upper_mapping.shift, "{upper} should need shift");
        }
    }

    #[test]
    fn known_letter_keycodes() {
        assert_eq!(map_char('a').unwrap().keycode, 30);
        assert_eq!(map_char('q').unwrap().keycode, 16);
        assert_eq!(map_char('z').unwrap().keycode, 44);
        assert_eq!(map_char('m').unwrap().keycode, 50);
    }

    #[test]
    fn digits_are_unshifted() {
        assert_eq!(map_char('1').unwrap(), KeyMapping::plain(2));
        assert_eq!(map_char('9').unwrap(), KeyMapping::plain(10));
        assert_eq!(map_char('0').unwrap(), KeyMapping::plain(11));
        for ch in '0'..='9' {
            assert!(!map_char(ch).unwrap().shift);
        }
    }

    #[test]
    fn shifted_digit_row_symbols() {
        let pairs = [
            ('!', '1'),
            ('@', '2'),
            ('#', '3'),
            ('$', '4'),
            ('%', '5'),
            ('^', '6'),
            ('&', '7'),
            ('*', '8'),
            ('(', '9'),
            (')', '0'),
        ];
        for (symbol, digit) in pairs {
            let symbol_mapping = map_char(symbol).unwrap();
            let digit_mapping = map_char(digit).unwrap();
            assert!(symbol_mapping.shift, "{symbol} should need shift");
            assert_eq!(symbol_mapping.keycode, digit_mapping.keycode);
        }
    }

    #[test]
    fn punctuation_pairs_share_keycode() {
        let pairs = [
            ('-', '_'),
            ('=', '+'),
            ('[', '{'),
            (']', '}'),
            ('\\', '|'),
            (';', ':'),
            ('\'', '"'),
            ('`', '~'),
            (',', '<'),
            ('.', '>'),
            ('/', '?'),
        ];
        for (plain, shifted) in pairs {
            let plain_mapping = map_char(plain).unwrap();
            let shifted_mapping = map_char(shifted).unwrap();
            assert!(!plain_mapping.shift);
            assert!(shifted_mapping.shift);
            assert_eq!(plain_mapping.keycode, shifted_mapping.keycode);
        }
    }

    #[test]
    fn whitespace_and_control() {
        assert_eq!(map_char(' ').unwrap(), KeyMapping::plain(57));
        assert_eq!(map_char('\n').unwrap(), KeyMapping::plain(28));
        assert_eq!(map_char('\t').unwrap(), KeyMapping::plain(15));
        assert_eq!(map_char('\u{8}').unwrap(), KeyMapping::plain(14));
    }

    #[test]
    fn unmapped_characters_return_none() {
        assert_eq!(map_char('é'), None);
        assert_eq!(map_char('日'), None);
        assert_eq!(map_char('🎉'), None);
        assert_eq!(map_char('\r'), None);
    }
}
