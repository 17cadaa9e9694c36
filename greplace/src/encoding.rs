//! Byte-buffer text-encoding classification.
//!
//! The classifier is a heuristic cascade: zero-byte evidence (the strongest
//! indicator of binary or wide-character content) dominates BOM evidence,
//! which dominates a final permissive UTF-8 validation. Ambiguous buffers
//! fall back to [`TextEncoding::Ansi`]. The decision gates whether a file is
//! searched at all: a `Binary` verdict excludes the file unless the caller
//! asked for binary content.

/// Classification of a raw byte buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// Not text at all (or at least not searchable as text).
    Binary,
    /// 8-bit single-byte text, decoded as Windows-1252.
    Ansi,
    Utf8,
    Utf8Bom,
    Utf16Le,
    Utf16LeBom,
    /// No verdict yet; never returned by [`detect`].
    Unknown,
}

impl TextEncoding {
    pub fn is_binary(self) -> bool {
        self == TextEncoding::Binary
    }
}

// Empirical thresholds taken from field observation, not derived from any
// corpus analysis. More than MAX_ZERO_UNITS full zero 16-bit units means
// binary; more than MAX_ZERO_HALVES zero half-units on an even-length buffer
// means ASCII stored as UTF-16LE.
const MAX_ZERO_UNITS: u32 = 2;
const MAX_ZERO_HALVES: u32 = 3;

pub(crate) const UTF8_BOM: [u8; 3] = [0xef, 0xbb, 0xbf];
pub(crate) const UTF16_LE_BOM: [u8; 2] = [0xff, 0xfe];

/// Scans the buffer as 16-bit little-endian code units and draws conclusions
/// from the distribution of zero bytes. A trailing odd byte is ignored.
fn check_zeros(data: &[u8]) -> TextEncoding {
    let mut z8: u32 = 0;
    let mut z16: u32 = 0;
    for unit in data.chunks_exact(2) {
        let test = u16::from_le_bytes([unit[0], unit[1]]);
        if test == 0 {
            z16 += 1;
            if z16 > MAX_ZERO_UNITS {
                return TextEncoding::Binary;
            }
        }
        if test & 0xff == 0 {
            z8 += 1;
        }
        if test >> 8 == 0 {
            z8 += 1;
        }
    }
    if data[..2] == UTF16_LE_BOM {
        return TextEncoding::Utf16LeBom;
    }
    if z8 > MAX_ZERO_HALVES && data.len() % 2 == 0 {
        return TextEncoding::Utf16Le;
    }
    TextEncoding::Unknown
}

/// Only reached when the zero scan produced no evidence at all.
fn check_bom(data: &[u8]) -> TextEncoding {
    if data[..2] == UTF16_LE_BOM {
        return TextEncoding::Utf16LeBom;
    }
    if data.len() < 3 {
        return TextEncoding::Ansi;
    }
    if data[..3] == UTF8_BOM {
        return TextEncoding::Utf8Bom;
    }
    TextEncoding::Unknown
}

/// Classifies a raw byte buffer.
///
/// With `prefer_utf8` set, a buffer that carries neither zero-byte nor BOM
/// evidence is strictly validated as UTF-8 before the Ansi fallback; plain
/// ASCII therefore classifies as `Utf8`.
pub fn detect(data: &[u8], prefer_utf8: bool) -> TextEncoding {
    if data.len() < 2 {
        return TextEncoding::Ansi;
    }
    let e = check_zeros(data);
    if e != TextEncoding::Unknown {
        return e;
    }
    let e = check_bom(data);
    if e != TextEncoding::Unknown {
        return e;
    }
    if !prefer_utf8 {
        return TextEncoding::Ansi;
    }
    if std::str::from_utf8(data).is_ok() {
        TextEncoding::Utf8
    } else {
        TextEncoding::Ansi
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_buffers_are_ansi() {
        assert_eq!(detect(b"", true), TextEncoding::Ansi);
        assert_eq!(detect(b"a", true), TextEncoding::Ansi);
    }

    #[test]
    fn test_zero_units_mean_binary() {
        // Three full zero units cross the threshold.
        assert_eq!(detect(b"\0\0\0\0\0\0ab", true), TextEncoding::Binary);
        // Two zero units do not.
        assert_ne!(detect(b"a\0\0b\0\0cdef", false), TextEncoding::Binary);
    }

    #[test]
    fn test_utf16_le_bom() {
        let mut data = vec![0xff, 0xfe];
        for u in "hello".encode_utf16() {
            data.extend_from_slice(&u.to_le_bytes());
        }
        assert_eq!(detect(&data, true), TextEncoding::Utf16LeBom);
    }

    #[test]
    fn test_utf16_le_without_bom() {
        let data: Vec<u8> = "abcde"
            .encode_utf16()
            .flat_map(|u| u.to_le_bytes())
            .collect();
        assert_eq!(detect(&data, true), TextEncoding::Utf16Le);
    }

    #[test]
    fn test_utf16_heuristic_requires_even_length() {
        let mut data: Vec<u8> = "abcde"
            .encode_utf16()
            .flat_map(|u| u.to_le_bytes())
            .collect();
        data.push(b'x');
        assert_ne!(detect(&data, false), TextEncoding::Utf16Le);
    }

    #[test]
    fn test_utf8_bom() {
        assert_eq!(detect(b"\xef\xbb\xbfhello", true), TextEncoding::Utf8Bom);
    }

    #[test]
    fn test_utf8_validation() {
        assert_eq!(detect("héllo".as_bytes(), true), TextEncoding::Utf8);
        // Plain ASCII validates as UTF-8 when preferred, ...
        assert_eq!(detect(b"hello", true), TextEncoding::Utf8);
        // ... and stays Ansi when not.
        assert_eq!(detect(b"hello", false), TextEncoding::Ansi);
        // Invalid sequences fall back to Ansi.
        assert_eq!(detect(b"caf\xe9 au lait", true), TextEncoding::Ansi);
    }
}
