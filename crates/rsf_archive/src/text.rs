//! Conversion between text entries and plain text.
//!
//! | Offset (bytes) | Field        | Description                                          |
//! |----------------|--------------|------------------------------------------------------|
//! | 0x0000         | Tag          | 2 bytes: Format tag, `0` when written by this crate  |
//! | 0x0002         | Line Count   | 2 bytes: Number of line descriptors                  |
//! | 0x0004         | Reserved     | 2 bytes: Unknown, `0` when written by this crate     |
//! | 0x0006         | Entry Count  | 2 bytes: Size of the line data in bytes              |
//! | 0x0008         | Lines        | 6 bytes per line: `u16` size, `u32` start            |
//!
//! Line starts are relative to the line data which directly follows the descriptors. Line
//! terminators are stored as NUL and every byte of a line is XORed with its position in the
//! line.

use std::io::{Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{narrow, Error, Result};

/// Size of the fixed text header
pub const HEADER_SIZE: usize = 8;

/// Size of one line descriptor
pub const LINE_SIZE: usize = 6;

/// Header of a text entry
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct TextHeader {
    /// Format tag
    pub tag: u16,
    /// Number of line descriptors
    pub line_count: u16,
    /// Unidentified
    pub reserved: u16,
    /// Length of the line data
    pub entry_count: u16,
}

impl TextHeader {
    fn read<R: Read>(reader: &mut R) -> Result<TextHeader> {
        Ok(TextHeader {
            tag: reader.read_u16::<LittleEndian>()?,
            line_count: reader.read_u16::<LittleEndian>()?,
            reserved: reader.read_u16::<LittleEndian>()?,
            entry_count: reader.read_u16::<LittleEndian>()?,
        })
    }

    fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u16::<LittleEndian>(self.tag)?;
        writer.write_u16::<LittleEndian>(self.line_count)?;
        writer.write_u16::<LittleEndian>(self.reserved)?;
        writer.write_u16::<LittleEndian>(self.entry_count)?;
        Ok(())
    }
}

/// Location of one line inside the line data
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct TextLine {
    pub size: u16,
    pub start: u32,
}

impl TextLine {
    fn range(&self) -> std::ops::Range<usize> {
        let start = self.start as usize;
        start..start + self.size as usize
    }
}

/// Apply the per-line XOR. Running it twice with the same lines restores the input.
pub fn obfuscate(data: &mut [u8], lines: &[TextLine]) -> Result<()> {
    let len = data.len();
    for (index, line) in lines.iter().enumerate() {
        let range = line.range();
        let bytes = data.get_mut(range.clone()).ok_or(Error::LineOutOfBounds {
            line: index,
            start: range.start,
            end: range.end,
            len,
        })?;

        for (position, byte) in bytes.iter_mut().enumerate() {
            *byte ^= position as u8;
        }
    }
    Ok(())
}

/// Split a text entry into its header, line descriptors and still obfuscated line data.
pub fn parse(payload: &[u8]) -> Result<(TextHeader, Vec<TextLine>, &[u8])> {
    if payload.len() < HEADER_SIZE {
        return Err(Error::TruncatedInput {
            expected: HEADER_SIZE,
            available: payload.len(),
        });
    }

    let mut reader = Cursor::new(payload);
    let header = TextHeader::read(&mut reader)?;

    let data_start = HEADER_SIZE + header.line_count as usize * LINE_SIZE;
    let data_end = data_start + header.entry_count as usize;
    if payload.len() < data_end {
        return Err(Error::TruncatedInput {
            expected: data_end,
            available: payload.len(),
        });
    }

    let lines = (0..header.line_count)
        .map(|_| {
            Ok(TextLine {
                size: reader.read_u16::<LittleEndian>()?,
                start: reader.read_u32::<LittleEndian>()?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((header, lines, &payload[data_start..data_end]))
}

/// Turn a text entry into plain text with `\n` line endings.
pub fn decode(payload: &[u8]) -> Result<Vec<u8>> {
    let (_, lines, data) = parse(payload)?;

    let mut text = data.to_vec();
    obfuscate(&mut text, &lines)?;

    for byte in text.iter_mut().filter(|b| **b == 0) {
        *byte = b'\n';
    }
    Ok(text)
}

/// Turn plain text into a text entry.
///
/// Each line keeps its terminating `\n`, stored as NUL. Trailing text without a terminator
/// becomes a final line of its own.
pub fn encode(text: &[u8]) -> Result<Vec<u8>> {
    if let Some(position) = text.iter().position(|&b| b == 0) {
        return Err(Error::InvalidText(format!(
            "NUL byte at offset {position} cannot be stored"
        )));
    }

    let mut data = text.to_vec();
    let mut lines = Vec::new();
    let mut start = 0usize;
    for chunk in data.split_inclusive_mut(|&b| b == b'\n') {
        if let Some(last) = chunk.last_mut().filter(|b| **b == b'\n') {
            *last = 0;
        }
        lines.push(TextLine {
            size: narrow("text line size", chunk.len())?,
            start: narrow("text line start", start)?,
        });
        start += chunk.len();
    }

    obfuscate(&mut data, &lines)?;

    let header = TextHeader {
        tag: 0,
        line_count: narrow("text line count", lines.len())?,
        reserved: 0,
        entry_count: narrow("text size", data.len())?,
    };

    let mut payload = Vec::with_capacity(HEADER_SIZE + lines.len() * LINE_SIZE + data.len());
    header.write(&mut payload)?;
    for line in &lines {
        payload.write_u16::<LittleEndian>(line.size)?;
        payload.write_u32::<LittleEndian>(line.start)?;
    }
    payload.extend_from_slice(&data);

    Ok(payload)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::error::{Error, Result};
    use crate::text::{decode, encode, obfuscate, parse, TextHeader, TextLine};

    #[test]
    fn encode_two_lines() -> Result<()> {
        #[rustfmt::skip]
        let expected = vec![
            // Header
            0x00, 0x00,
            0x02, 0x00,
            0x00, 0x00,
            0x06, 0x00,
            // Lines
            0x03, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x03, 0x00, 0x03, 0x00, 0x00, 0x00,
            // Data
            b'h', b'i' ^ 1, 0x00 ^ 2,
            b'y', b'o' ^ 1, 0x00 ^ 2,
        ];

        assert_eq!(encode(b"hi\nyo\n")?, expected);

        Ok(())
    }

    #[test]
    fn decode_two_lines() -> Result<()> {
        #[rustfmt::skip]
        let input = [
            0x2D, 0x00,
            0x02, 0x00,
            0x00, 0x00,
            0x05, 0x00,
            0x03, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x02, 0x00, 0x03, 0x00, 0x00, 0x00,
            b'h', b'i' ^ 1, 0x02,
            b'y', b'o' ^ 1,
        ];

        assert_eq!(decode(&input)?, b"hi\nyo".to_vec());

        let (header, lines, data) = parse(&input)?;
        assert_eq!(
            header,
            TextHeader {
                tag: 0x2D,
                line_count: 2,
                reserved: 0,
                entry_count: 5
            }
        );
        assert_eq!(lines[1], TextLine { size: 2, start: 3 });
        assert_eq!(data.len(), 5);

        Ok(())
    }

    #[test]
    fn round_trip() -> Result<()> {
        let long_line = "x".repeat(256);
        let inputs = [
            String::new(),
            "single line".to_string(),
            "first\nsecond\nthird\n".to_string(),
            "\n\n".to_string(),
            long_line.clone(),
            format!("{long_line}\n{long_line}"),
        ];

        for input in inputs {
            assert_eq!(decode(&encode(input.as_bytes())?)?, input.as_bytes());
        }

        Ok(())
    }

    #[test]
    fn xor_uses_position_within_line() -> Result<()> {
        let mut input = vec![b'a'; 300];
        input.push(b'\n');
        let encoded = encode(&input)?;
        let data = &encoded[8 + 6..];

        assert_eq!(data[0], b'a');
        assert_eq!(data[255], b'a' ^ 255);
        assert_eq!(data[256], b'a');
        assert_eq!(data[257], b'a' ^ 1);

        Ok(())
    }

    #[test]
    fn obfuscate_is_self_inverse() -> Result<()> {
        let original: Vec<u8> = (0..=255).chain(0..=40).collect();
        let lines = [
            TextLine { size: 200, start: 0 },
            TextLine { size: 97, start: 200 },
            TextLine { size: 10, start: 5 },
        ];

        let mut data = original.clone();
        obfuscate(&mut data, &lines)?;
        assert_ne!(data, original);
        obfuscate(&mut data, &lines)?;
        assert_eq!(data, original);

        Ok(())
    }

    #[test]
    fn empty_text() -> Result<()> {
        let encoded = encode(b"")?;
        assert_eq!(encoded, vec![0u8; 8]);
        assert_eq!(decode(&encoded)?, Vec::<u8>::new());
        Ok(())
    }

    #[test]
    fn rejects_nul() {
        assert!(matches!(encode(b"a\0b"), Err(Error::InvalidText(_))));
    }

    #[test]
    fn truncated_text() {
        assert!(matches!(
            decode(&[0x00, 0x00, 0x01]),
            Err(Error::TruncatedInput {
                expected: 8,
                available: 3
            })
        ));

        // One line declared with 4 data bytes, but nothing after the header
        let input = [0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x04, 0x00];
        assert!(matches!(
            decode(&input),
            Err(Error::TruncatedInput {
                expected: 18,
                available: 8
            })
        ));
    }

    #[test]
    fn line_out_of_bounds() {
        #[rustfmt::skip]
        let input = [
            0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x02, 0x00,
            0x04, 0x00, 0x00, 0x00, 0x00, 0x00,
            b'a', b'b',
        ];
        assert!(matches!(
            decode(&input),
            Err(Error::LineOutOfBounds { line: 0, .. })
        ));
    }
}
