//! Little-endian packing helpers shared by both codecs.

use crate::error::TransactionError;

#[derive(Default)]
pub struct Packer {
    buf: Vec<u8>,
}

impl Packer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    pub fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// A 256-bit little-endian integer whose upper half is zero.
    pub fn u256(&mut self, v: u128) {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self.buf.extend_from_slice(&[0u8; 16]);
    }

    pub fn raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn count_u8(&mut self, n: usize, what: &str) -> Result<(), TransactionError> {
        let n = u8::try_from(n)
            .map_err(|_| TransactionError::Malformed(format!("too many {what}: {n}")))?;
        self.u8(n);
        Ok(())
    }

    pub fn count_u16(&mut self, n: usize, what: &str) -> Result<(), TransactionError> {
        let n = u16::try_from(n)
            .map_err(|_| TransactionError::Malformed(format!("too many {what}: {n}")))?;
        self.u16(n);
        Ok(())
    }

    pub fn bytes_u8(&mut self, bytes: &[u8], what: &str) -> Result<(), TransactionError> {
        self.count_u8(bytes.len(), what)?;
        self.raw(bytes);
        Ok(())
    }

    pub fn bytes_u16(&mut self, bytes: &[u8], what: &str) -> Result<(), TransactionError> {
        self.count_u16(bytes.len(), what)?;
        self.raw(bytes);
        Ok(())
    }

    pub fn bytes_u32(&mut self, bytes: &[u8], what: &str) -> Result<(), TransactionError> {
        let n = u32::try_from(bytes.len())
            .map_err(|_| TransactionError::Malformed(format!("{what} too long")))?;
        self.u32(n);
        self.raw(bytes);
        Ok(())
    }
}

pub struct Unpacker<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Unpacker<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8], TransactionError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| {
                TransactionError::Decode(format!(
                    "unexpected end of input at byte {} (wanted {n} more)",
                    self.pos
                ))
            })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub fn array<const N: usize>(&mut self) -> Result<[u8; N], TransactionError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8, TransactionError> {
        Ok(self.take(1)?[0])
    }

    pub fn u16(&mut self) -> Result<u16, TransactionError> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    pub fn u32(&mut self) -> Result<u32, TransactionError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub fn u64(&mut self) -> Result<u64, TransactionError> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    pub fn u256(&mut self) -> Result<u128, TransactionError> {
        let low = u128::from_le_bytes(self.array()?);
        let high: [u8; 16] = self.array()?;
        if high != [0u8; 16] {
            return Err(TransactionError::Decode("256-bit amount exceeds u128".into()));
        }
        Ok(low)
    }

    pub fn bytes_u8(&mut self) -> Result<Vec<u8>, TransactionError> {
        let n = self.u8()? as usize;
        Ok(self.take(n)?.to_vec())
    }

    pub fn bytes_u16(&mut self) -> Result<Vec<u8>, TransactionError> {
        let n = self.u16()? as usize;
        Ok(self.take(n)?.to_vec())
    }

    pub fn bytes_u32(&mut self) -> Result<Vec<u8>, TransactionError> {
        let n = self.u32()? as usize;
        Ok(self.take(n)?.to_vec())
    }

    pub fn finish(&self) -> Result<(), TransactionError> {
        if self.pos != self.data.len() {
            return Err(TransactionError::Decode(format!(
                "{} trailing bytes",
                self.data.len() - self.pos
            )));
        }
        Ok(())
    }
}
