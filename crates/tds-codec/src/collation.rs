//! Collation tags and charset conversion for character columns.
//!
//! TDS 7.1+ servers follow the metadata of every character column with a
//! 5-byte collation tag: a 4-byte LCID/flags field and a 1-byte sort id.
//! The tag selects the code page used for single-byte character data;
//! wide (UTF-16) columns carry a tag too but always transfer UTF-16LE
//! regardless of it.
//!
//! [`CharConverter`] is the call point the codec uses: a stateless
//! `to_wire` for outgoing parameters and a stateful [`WireDecoder`] for
//! incoming data, so that multi-byte sequences split across chunk
//! boundaries decode correctly.

use encoding_rs::{Decoder, Encoding, UTF_16LE, UTF_8, WINDOWS_1252};

/// Flag bit indicating a UTF-8 collation (SQL Server 2019+).
pub const COLLATION_FLAG_UTF8: u32 = 0x0800_0000;

/// Mask extracting the primary language id from the LCID field.
pub const PRIMARY_LANGUAGE_MASK: u32 = 0x0000_FFFF;

/// Width of the collation tag on the wire.
pub const COLLATION_WIRE_LEN: usize = 5;

/// SQL Server collation tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Collation {
    /// Locale id plus collation flags.
    pub lcid: u32,
    /// Sort id, used by the legacy SQL collations.
    pub sort_id: u8,
}

impl Collation {
    /// Parse the 5-byte wire form: little-endian LCID/flags, then sort id.
    #[must_use]
    pub fn from_bytes(raw: [u8; COLLATION_WIRE_LEN]) -> Self {
        let lcid = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
        Self {
            lcid,
            sort_id: raw[4],
        }
    }

    /// Serialize back to the 5-byte wire form.
    #[must_use]
    pub fn to_bytes(self) -> [u8; COLLATION_WIRE_LEN] {
        let l = self.lcid.to_le_bytes();
        [l[0], l[1], l[2], l[3], self.sort_id]
    }

    /// Whether this collation stores data as UTF-8 (SQL Server 2019+).
    #[must_use]
    pub const fn is_utf8(self) -> bool {
        self.lcid & COLLATION_FLAG_UTF8 != 0
    }

    /// The code-page encoding for single-byte data under this collation.
    ///
    /// Unrecognized locales fall back to Windows-1252, the server-side
    /// default for Western installations.
    #[must_use]
    pub fn encoding(self) -> &'static Encoding {
        if self.is_utf8() {
            return UTF_8;
        }
        match self.lcid & PRIMARY_LANGUAGE_MASK {
            // CJK and Thai locales use multi-byte code pages.
            0x0411 => encoding_rs::SHIFT_JIS,
            0x0804 | 0x1004 => encoding_rs::GB18030,
            0x0404 | 0x0C04 | 0x1404 => encoding_rs::BIG5,
            0x0412 => encoding_rs::EUC_KR,
            0x041E => encoding_rs::WINDOWS_874,
            0x042A => encoding_rs::WINDOWS_1258,
            // Central European
            0x0405 | 0x0415 | 0x040E | 0x041A | 0x041B | 0x0424 | 0x0418 => {
                encoding_rs::WINDOWS_1250
            }
            // Cyrillic
            0x0419 | 0x0422 | 0x0423 | 0x0402 | 0x042F | 0x0C1A => encoding_rs::WINDOWS_1251,
            0x0408 => encoding_rs::WINDOWS_1253,
            0x041F | 0x042C => encoding_rs::WINDOWS_1254,
            0x040D => encoding_rs::WINDOWS_1255,
            0x0401 | 0x0801 | 0x0C01 | 0x0429 | 0x0420 => encoding_rs::WINDOWS_1256,
            0x0425..=0x0427 => encoding_rs::WINDOWS_1257,
            _ => WINDOWS_1252,
        }
    }
}

/// Charset transcoder attached to a character column.
#[derive(Debug, Clone, Copy)]
pub enum CharConverter {
    /// UTF-16LE wide-character transfer.
    Wide,
    /// Single/multi-byte code page resolved from the collation tag.
    CodePage(&'static Encoding),
}

impl CharConverter {
    /// Resolve the converter for a column from its collation tag.
    ///
    /// `wide` is true for the UTF-16 types, which ignore the code page.
    #[must_use]
    pub fn from_collation(collation: Collation, wide: bool) -> Self {
        if wide {
            Self::Wide
        } else {
            Self::CodePage(collation.encoding())
        }
    }

    /// Encode client text into its wire representation.
    #[must_use]
    pub fn to_wire(&self, s: &str) -> Vec<u8> {
        match self {
            Self::Wide => {
                let mut out = Vec::with_capacity(s.len() * 2);
                for unit in s.encode_utf16() {
                    out.extend_from_slice(&unit.to_le_bytes());
                }
                out
            }
            Self::CodePage(enc) => enc.encode(s).0.into_owned(),
        }
    }

    /// Decode a complete wire value. Malformed sequences are replaced,
    /// never propagated as errors. Wire data carries no byte-order marks,
    /// so none are sniffed.
    #[must_use]
    pub fn decode(&self, bytes: &[u8]) -> String {
        let enc = match self {
            Self::Wide => UTF_16LE,
            Self::CodePage(enc) => enc,
        };
        enc.decode_without_bom_handling(bytes).0.into_owned()
    }

    /// Start an incremental decoder for chunked transfer.
    #[must_use]
    pub fn decoder(&self) -> WireDecoder {
        let enc = match self {
            Self::Wide => UTF_16LE,
            Self::CodePage(enc) => enc,
        };
        WireDecoder(enc.new_decoder_without_bom_handling())
    }
}

/// Stateful incremental decoder.
///
/// Carries partial multi-byte sequences between [`WireDecoder::decode`]
/// calls; the final call must pass `last = true` to flush trailing state.
pub struct WireDecoder(Decoder);

impl WireDecoder {
    /// Decode the next run of wire bytes.
    pub fn decode(&mut self, input: &[u8], last: bool) -> String {
        let cap = self
            .0
            .max_utf8_buffer_length(input.len())
            .unwrap_or(input.len().saturating_mul(3).saturating_add(4));
        let mut out = String::with_capacity(cap);
        let (_, _, _) = self.0.decode_to_string(input, &mut out, last);
        out
    }
}

impl core::fmt::Debug for WireDecoder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WireDecoder").finish_non_exhaustive()
    }
}
