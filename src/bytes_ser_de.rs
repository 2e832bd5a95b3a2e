//! Implement the `Serializer` and `Deserializer` objects using fixed-width
//! big-endian integers and `u32` length prefixes.

use zeroize::Zeroizing;

use crate::Error;

/// Version byte heading every top-level persisted structure.
pub const FORMAT_VERSION: u8 = 1;

/// Scans a slice sequentially, updating the cursor position on the fly.
pub struct Deserializer<'a> {
    bytes: &'a [u8],
    start: usize,
}

impl<'a> Deserializer<'a> {
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, start: 0 }
    }

    /// Returns a slice of the next `size` bytes or an error if less is
    /// available.
    pub fn next(&mut self, size: usize) -> Result<&'a [u8], Error> {
        let available = self.bytes.len() - self.start;
        if available < size {
            return Err(Error::Serialization(format!(
                "Deserializer: cannot read {size} bytes, only {available} bytes available"
            )));
        }
        let chunk = &self.bytes[self.start..self.start + size];
        self.start += size;
        Ok(chunk)
    }

    pub fn read_u8(&mut self) -> Result<u8, Error> {
        Ok(self.next(1)?[0])
    }

    /// Reads the next 4 big endian bytes to return an u32.
    pub fn read_u32(&mut self) -> Result<u32, Error> {
        Ok(u32::from_be_bytes(self.next(4)?.try_into()?))
    }

    /// Reads the next 8 big endian bytes to return an i64.
    pub fn read_i64(&mut self) -> Result<i64, Error> {
        Ok(i64::from_be_bytes(self.next(8)?.try_into()?))
    }

    /// Reads a `u32` length prefix and the byte string it announces.
    pub fn read_array(&mut self) -> Result<&'a [u8], Error> {
        let len = usize::try_from(self.read_u32()?)?;
        self.next(len)
    }

    /// Reads a length-prefixed array whose length must be exactly `LENGTH`.
    pub fn read_fixed<const LENGTH: usize>(&mut self) -> Result<[u8; LENGTH], Error> {
        let array = self.read_array()?;
        array.try_into().map_err(|_| {
            Error::Serialization(format!(
                "Deserializer: expected an array of {LENGTH} bytes, got {} bytes",
                array.len()
            ))
        })
    }

    /// Reads a length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String, Error> {
        Ok(String::from_utf8(self.read_array()?.to_vec())?)
    }

    /// Reads the format version byte and checks it is supported.
    pub fn read_version(&mut self) -> Result<(), Error> {
        match self.read_u8()? {
            FORMAT_VERSION => Ok(()),
            v => Err(Error::Serialization(format!(
                "unsupported format version {v}, expected {FORMAT_VERSION}"
            ))),
        }
    }

    /// Reads an object implementing `Serializable`.
    pub fn read<T: Serializable>(&mut self) -> Result<T, Error> {
        T::read(self)
    }

    /// Whether there are more bytes to read.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.start < self.bytes.len()
    }

    /// Returns the remaining bytes, consuming them.
    pub fn finalize(&mut self) -> &'a [u8] {
        let remainder = &self.bytes[self.start..];
        self.start = self.bytes.len();
        remainder
    }
}

pub struct Serializer {
    writable: Vec<u8>,
}

impl Serializer {
    #[must_use]
    pub fn new() -> Self {
        Self { writable: vec![] }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            writable: Vec::with_capacity(capacity),
        }
    }

    pub fn write_u8(&mut self, value: u8) -> Result<usize, Error> {
        self.writable.push(value);
        Ok(1)
    }

    pub fn write_u32(&mut self, value: u32) -> Result<usize, Error> {
        self.writable.extend_from_slice(&value.to_be_bytes());
        Ok(4)
    }

    pub fn write_i64(&mut self, value: i64) -> Result<usize, Error> {
        self.writable.extend_from_slice(&value.to_be_bytes());
        Ok(8)
    }

    /// Writes a `u32` length prefix followed by the given bytes.
    pub fn write_array(&mut self, array: &[u8]) -> Result<usize, Error> {
        let len = u32::try_from(array.len()).map_err(|_| {
            Error::Serialization(format!(
                "Serializer: array of {} bytes does not fit a u32 length prefix",
                array.len()
            ))
        })?;
        let n = self.write_u32(len)?;
        self.writable.extend_from_slice(array);
        Ok(n + array.len())
    }

    pub fn write_str(&mut self, s: &str) -> Result<usize, Error> {
        self.write_array(s.as_bytes())
    }

    pub fn write_version(&mut self) -> Result<usize, Error> {
        self.write_u8(FORMAT_VERSION)
    }

    pub fn write<T: Serializable>(&mut self, object: &T) -> Result<usize, Error> {
        object.write(self)
    }

    #[must_use]
    pub fn value(&self) -> &[u8] {
        &self.writable
    }

    #[must_use]
    pub fn finalize(self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(self.writable)
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

/// Length in bytes of a length-prefixed array holding `len` bytes.
#[must_use]
pub const fn array_length(len: usize) -> usize {
    4 + len
}

pub trait Serializable: Sized {
    /// Number of bytes written by `write`.
    fn length(&self) -> usize;

    fn write(&self, ser: &mut Serializer) -> Result<usize, Error>;

    fn read(de: &mut Deserializer) -> Result<Self, Error>;

    /// Serializes the object into a zeroized-on-drop buffer.
    fn serialize(&self) -> Result<Zeroizing<Vec<u8>>, Error> {
        let mut ser = Serializer::with_capacity(self.length());
        let n = self.write(&mut ser)?;
        if n != self.length() {
            return Err(Error::Serialization(format!(
                "wrote {n} bytes but announced {}",
                self.length()
            )));
        }
        Ok(ser.finalize())
    }

    /// Deserializes an object, rejecting any trailing bytes.
    fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        let mut de = Deserializer::new(bytes);
        let object = Self::read(&mut de)?;
        if de.has_more() {
            return Err(Error::Serialization(format!(
                "{} trailing bytes after the object",
                de.finalize().len()
            )));
        }
        Ok(object)
    }
}
