//! Byte cursor with the primitive decoders of the Wasm binary format.

use jsld_types::{
    ElemType, GlobalSignature, Limits, MemorySignature, TableSignature, ValType,
};

use crate::error::ReadError;

/// A forward-only cursor over a byte slice.
///
/// Sub-readers created with [`Reader::sub_reader`] report offsets relative
/// to the start of the whole module, not to the start of the slice.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
    /// Absolute offset of `bytes[0]`.
    base: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            pos: 0,
            base: 0,
        }
    }

    /// Absolute offset of the next byte.
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    // ── Raw bytes ─────────────────────────────────────────────────────────

    pub fn read_u8(&mut self) -> Result<u8, ReadError> {
        let byte = *self
            .bytes
            .get(self.pos)
            .ok_or(ReadError::UnexpectedEof {
                offset: self.offset(),
            })?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], ReadError> {
        if len > self.remaining() {
            return Err(ReadError::UnexpectedEof {
                offset: self.offset() + self.remaining(),
            });
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn skip(&mut self, len: usize) -> Result<(), ReadError> {
        self.read_bytes(len).map(|_| ())
    }

    /// Read a fixed-width little-endian `u32` (header fields).
    pub fn read_u32_le(&mut self) -> Result<u32, ReadError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Split off the next `len` bytes as their own reader.
    pub fn sub_reader(&mut self, len: usize) -> Result<Reader<'a>, ReadError> {
        let base = self.offset();
        let bytes = self.read_bytes(len)?;
        Ok(Reader { bytes, pos: 0, base })
    }

    // ── LEB128 ────────────────────────────────────────────────────────────

    /// Decode a LEB128 value of at most `max_bytes` bytes without range
    /// checking. Signed values are sign-extended from their last
    /// significant bit.
    fn read_leb(
        &mut self,
        max_bytes: usize,
        signed: bool,
        width: &'static str,
    ) -> Result<i128, ReadError> {
        let start = self.offset();
        let mut result: i128 = 0;
        let mut shift = 0;
        for _ in 0..max_bytes {
            let byte = self.read_u8()?;
            result |= i128::from(byte & 0x7f) << shift;
            shift += 7;
            if byte & 0x80 == 0 {
                if signed && byte & 0x40 != 0 {
                    result |= -1i128 << shift;
                }
                return Ok(result);
            }
        }
        Err(ReadError::BadLeb {
            width,
            offset: start,
        })
    }

    /// Read a ULEB32, accepting only values up to `2^31 - 1`.
    pub fn read_uleb32(&mut self) -> Result<u32, ReadError> {
        let offset = self.offset();
        let value = self.read_leb(5, false, "ULEB32")?;
        if value > i128::from(u32::MAX) {
            return Err(ReadError::BadLeb {
                width: "ULEB32",
                offset,
            });
        }
        if value > i128::from(i32::MAX) {
            return Err(ReadError::UnsupportedLeb { offset });
        }
        Ok(value as u32)
    }

    pub fn read_sleb32(&mut self) -> Result<i32, ReadError> {
        let offset = self.offset();
        let value = self.read_leb(5, true, "SLEB32")?;
        i32::try_from(value).map_err(|_| ReadError::BadLeb {
            width: "SLEB32",
            offset,
        })
    }

    pub fn read_uleb64(&mut self) -> Result<u64, ReadError> {
        let offset = self.offset();
        let value = self.read_leb(10, false, "ULEB64")?;
        u64::try_from(value).map_err(|_| ReadError::BadLeb {
            width: "ULEB64",
            offset,
        })
    }

    pub fn read_sleb64(&mut self) -> Result<i64, ReadError> {
        let offset = self.offset();
        let value = self.read_leb(10, true, "SLEB64")?;
        i64::try_from(value).map_err(|_| ReadError::BadLeb {
            width: "SLEB64",
            offset,
        })
    }

    /// Read a vector length or an index.
    pub fn read_index(&mut self) -> Result<u32, ReadError> {
        self.read_uleb32()
    }

    // ── Composite values ──────────────────────────────────────────────────

    /// Read a length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String, ReadError> {
        let len = self.read_uleb32()? as usize;
        let offset = self.offset();
        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| ReadError::BadUtf8 { offset })
    }

    /// Read a boolean flag byte; only `0` and `1` are valid.
    pub fn read_flag(&mut self) -> Result<bool, ReadError> {
        let offset = self.offset();
        match self.read_u8()? {
            0x00 => Ok(false),
            0x01 => Ok(true),
            byte => Err(ReadError::BadFlag { byte, offset }),
        }
    }

    pub fn read_val_type(&mut self) -> Result<ValType, ReadError> {
        let offset = self.offset();
        let byte = self.read_u8()?;
        ValType::from_byte(byte).ok_or(ReadError::BadTag {
            what: "valtype",
            byte,
            offset,
        })
    }

    pub fn read_limits(&mut self) -> Result<Limits, ReadError> {
        let has_max = self.read_flag()?;
        let min = self.read_uleb32()?;
        let max = if has_max {
            Some(self.read_uleb32()?)
        } else {
            None
        };
        Ok(Limits::new(min, max))
    }

    pub fn read_table_type(&mut self) -> Result<TableSignature, ReadError> {
        let offset = self.offset();
        let byte = self.read_u8()?;
        let elem_type = ElemType::from_byte(byte).ok_or(ReadError::BadTag {
            what: "table elemtype",
            byte,
            offset,
        })?;
        let limits = self.read_limits()?;
        Ok(TableSignature { elem_type, limits })
    }

    pub fn read_memory_type(&mut self) -> Result<MemorySignature, ReadError> {
        Ok(MemorySignature {
            limits: self.read_limits()?,
        })
    }

    pub fn read_global_type(&mut self) -> Result<GlobalSignature, ReadError> {
        let val_type = self.read_val_type()?;
        let mutable = self.read_flag()?;
        Ok(GlobalSignature { val_type, mutable })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uleb32(bytes: &[u8]) -> Result<u32, ReadError> {
        Reader::new(bytes).read_uleb32()
    }

    fn sleb32(bytes: &[u8]) -> Result<i32, ReadError> {
        Reader::new(bytes).read_sleb32()
    }

    /// Encode `value` as ULEB128, padded to at least `min_len` bytes.
    fn encode_uleb(mut value: u64, min_len: usize) -> Vec<u8> {
        let mut out = Vec::new();
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 && out.len() + 1 >= min_len {
                out.push(byte);
                return out;
            }
            out.push(byte | 0x80);
        }
    }

    #[test]
    fn uleb32_accepts_every_length_up_to_five_bytes() {
        let values = [0u64, 1, 127, 128, 624_485, 0x0fff_ffff, 0x7fff_ffff];
        for value in values {
            let minimal = encode_uleb(value, 1).len();
            for len in minimal..=5 {
                let bytes = encode_uleb(value, len);
                assert_eq!(bytes.len(), len);
                assert_eq!(uleb32(&bytes), Ok(value as u32), "value {value} len {len}");
            }
        }
    }

    #[test]
    fn uleb32_rejects_six_byte_encodings() {
        let bytes = encode_uleb(1, 6);
        assert!(matches!(
            uleb32(&bytes),
            Err(ReadError::BadLeb { width: "ULEB32", offset: 0 })
        ));
    }

    #[test]
    fn uleb32_rejects_upper_half() {
        assert!(matches!(
            uleb32(&encode_uleb(0x8000_0000, 1)),
            Err(ReadError::UnsupportedLeb { .. })
        ));
        assert!(matches!(
            uleb32(&[0xff, 0xff, 0xff, 0xff, 0x0f]),
            Err(ReadError::UnsupportedLeb { .. })
        ));
    }

    #[test]
    fn uleb32_rejects_bits_beyond_width() {
        assert!(matches!(
            uleb32(&[0xff, 0xff, 0xff, 0xff, 0x1f]),
            Err(ReadError::BadLeb { .. })
        ));
        assert!(matches!(
            uleb32(&[0x80, 0x80, 0x80, 0x80, 0x70]),
            Err(ReadError::BadLeb { .. })
        ));
    }

    #[test]
    fn uleb32_truncated_input() {
        assert!(matches!(
            uleb32(&[0x80, 0x80]),
            Err(ReadError::UnexpectedEof { offset: 2 })
        ));
    }

    #[test]
    fn sleb32_sign_extends() {
        assert_eq!(sleb32(&[0x7f]), Ok(-1));
        assert_eq!(sleb32(&[0x40]), Ok(-64));
        assert_eq!(sleb32(&[0x3f]), Ok(63));
        assert_eq!(sleb32(&[0x80, 0x7f]), Ok(-128));
        assert_eq!(sleb32(&[0xff, 0xff, 0xff, 0xff, 0x07]), Ok(i32::MAX));
        assert_eq!(sleb32(&[0x80, 0x80, 0x80, 0x80, 0x78]), Ok(i32::MIN));
        // Padded -1.
        assert_eq!(sleb32(&[0xff, 0xff, 0xff, 0xff, 0x7f]), Ok(-1));
    }

    #[test]
    fn sleb32_rejects_inconsistent_sign_bits() {
        assert!(matches!(
            sleb32(&[0xff, 0xff, 0xff, 0xff, 0x0f]),
            Err(ReadError::BadLeb { width: "SLEB32", .. })
        ));
        assert!(matches!(
            sleb32(&[0x80, 0x80, 0x80, 0x80, 0x70]),
            Err(ReadError::BadLeb { width: "SLEB32", .. })
        ));
    }

    #[test]
    fn leb64_widths() {
        let max = encode_uleb(u64::MAX, 1);
        assert_eq!(max.len(), 10);
        assert_eq!(Reader::new(&max).read_uleb64(), Ok(u64::MAX));

        let mut too_wide = max.clone();
        too_wide[9] = 0x03;
        assert!(Reader::new(&too_wide).read_uleb64().is_err());
        assert!(Reader::new(&encode_uleb(1, 11)).read_uleb64().is_err());

        assert_eq!(Reader::new(&[0x7f]).read_sleb64(), Ok(-1));
        let min = [0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x7f];
        assert_eq!(Reader::new(&min).read_sleb64(), Ok(i64::MIN));
        let bad = [0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x3f];
        assert!(Reader::new(&bad).read_sleb64().is_err());
    }

    #[test]
    fn strings_must_be_utf8() {
        let mut ok = vec![3];
        ok.extend_from_slice(b"env");
        assert_eq!(Reader::new(&ok).read_string().as_deref(), Ok("env"));

        assert!(matches!(
            Reader::new(&[2, 0xc3, 0x28]).read_string(),
            Err(ReadError::BadUtf8 { offset: 1 })
        ));
        assert!(matches!(
            Reader::new(&[4, b'a']).read_string(),
            Err(ReadError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn flags_and_limits() {
        assert_eq!(Reader::new(&[0x00]).read_flag(), Ok(false));
        assert_eq!(Reader::new(&[0x01]).read_flag(), Ok(true));
        assert!(matches!(
            Reader::new(&[0x02]).read_flag(),
            Err(ReadError::BadFlag { byte: 2, offset: 0 })
        ));

        assert_eq!(
            Reader::new(&[0x01, 0x02, 0x10]).read_limits(),
            Ok(Limits::new(2, Some(16)))
        );
        assert_eq!(
            Reader::new(&[0x00, 0x01]).read_limits(),
            Ok(Limits::new(1, None))
        );
    }

    #[test]
    fn sub_reader_reports_absolute_offsets() {
        let bytes = [0xaa, 0xbb, 0x80];
        let mut reader = Reader::new(&bytes);
        reader.read_u8().unwrap();
        let mut sub = reader.sub_reader(2).unwrap();
        assert_eq!(sub.offset(), 1);
        sub.read_u8().unwrap();
        assert!(matches!(
            sub.read_uleb32(),
            Err(ReadError::UnexpectedEof { offset: 3 })
        ));
        assert!(reader.at_end());
    }
}
