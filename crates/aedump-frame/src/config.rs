/// Which leading bytes announce a binary frame.
///
/// AE deployments differ in their tag assignments; the reassembler treats
/// this as a protocol constant rather than inferring a single fixed scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagSet {
    /// Any byte with the top bit set starts a binary frame.
    ///
    /// ASCII traffic is 7-bit, so this never misclassifies a line byte.
    HighBit,
    /// An explicit list of tag bytes.
    Explicit(Vec<u8>),
}

impl TagSet {
    /// Whether `byte` starts a binary frame under this tag set.
    pub fn matches(&self, byte: u8) -> bool {
        match self {
            TagSet::HighBit => byte & 0x80 != 0,
            TagSet::Explicit(tags) => tags.contains(&byte),
        }
    }
}

impl Default for TagSet {
    fn default() -> Self {
        TagSet::HighBit
    }
}

/// Width and endianness of the declared-length field in a binary frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthField {
    U8,
    U16Be,
    U16Le,
    U32Be,
    U32Le,
}

impl LengthField {
    /// Number of bytes the length field occupies on the wire.
    pub fn width(self) -> usize {
        match self {
            LengthField::U8 => 1,
            LengthField::U16Be | LengthField::U16Le => 2,
            LengthField::U32Be | LengthField::U32Le => 4,
        }
    }

    /// Decode a declared length from `bytes`.
    ///
    /// `bytes` must be at least [`width`](Self::width) long; callers buffer a
    /// full header before decoding.
    pub fn decode(self, bytes: &[u8]) -> usize {
        match self {
            LengthField::U8 => bytes[0] as usize,
            LengthField::U16Be => u16::from_be_bytes([bytes[0], bytes[1]]) as usize,
            LengthField::U16Le => u16::from_le_bytes([bytes[0], bytes[1]]) as usize,
            LengthField::U32Be => {
                u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize
            }
            LengthField::U32Le => {
                u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize
            }
        }
    }
}

impl Default for LengthField {
    fn default() -> Self {
        LengthField::U16Be
    }
}

/// Wire-level protocol constants for one AE deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WireConfig {
    /// Binary frame tag recognition.
    pub tags: TagSet,
    /// Declared-length field encoding.
    pub length: LengthField,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_bit_tags_match_only_non_ascii() {
        let tags = TagSet::HighBit;
        assert!(tags.matches(0x80));
        assert!(tags.matches(0xFF));
        assert!(!tags.matches(b'A'));
        assert!(!tags.matches(b'\n'));
    }

    #[test]
    fn explicit_tags_match_listed_bytes() {
        let tags = TagSet::Explicit(vec![0x02, 0x05]);
        assert!(tags.matches(0x02));
        assert!(tags.matches(0x05));
        assert!(!tags.matches(0x03));
    }

    #[test]
    fn length_field_widths() {
        assert_eq!(LengthField::U8.width(), 1);
        assert_eq!(LengthField::U16Be.width(), 2);
        assert_eq!(LengthField::U16Le.width(), 2);
        assert_eq!(LengthField::U32Be.width(), 4);
        assert_eq!(LengthField::U32Le.width(), 4);
    }

    #[test]
    fn length_field_decoding() {
        assert_eq!(LengthField::U8.decode(&[7]), 7);
        assert_eq!(LengthField::U16Be.decode(&[0x01, 0x02]), 0x0102);
        assert_eq!(LengthField::U16Le.decode(&[0x01, 0x02]), 0x0201);
        assert_eq!(LengthField::U32Be.decode(&[0, 0, 0x01, 0x02]), 0x0102);
        assert_eq!(LengthField::U32Le.decode(&[0x02, 0x01, 0, 0]), 0x0102);
    }
}
