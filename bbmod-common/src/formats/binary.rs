//! Little-endian primitive readers and writers shared by every codec.
//!
//! Reads go through `byteorder`, so a short read surfaces as
//! `UnexpectedEof` and is converted to [`FormatError::Truncated`].

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{FormatError, Result};
use crate::math::{DualQuat, Vec2, Vec3};

/// Read helpers for BBMOD streams.
pub trait ReadBinaryExt: Read {
    fn read_byte(&mut self) -> Result<u8> {
        Ok(self.read_u8()?)
    }

    fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_byte()? != 0)
    }

    fn read_u32_le(&mut self) -> Result<u32> {
        Ok(self.read_u32::<LittleEndian>()?)
    }

    fn read_i32_le(&mut self) -> Result<i32> {
        Ok(self.read_i32::<LittleEndian>()?)
    }

    fn read_f32_le(&mut self) -> Result<f32> {
        Ok(self.read_f32::<LittleEndian>()?)
    }

    fn read_f64_le(&mut self) -> Result<f64> {
        Ok(self.read_f64::<LittleEndian>()?)
    }

    fn read_vec2(&mut self) -> Result<Vec2> {
        Ok(Vec2::new(self.read_f32_le()?, self.read_f32_le()?))
    }

    fn read_vec3(&mut self) -> Result<Vec3> {
        Ok(Vec3::new(
            self.read_f32_le()?,
            self.read_f32_le()?,
            self.read_f32_le()?,
        ))
    }

    fn read_dual_quat(&mut self) -> Result<DualQuat> {
        let mut values = [0.0f32; DualQuat::FLOAT_COUNT];
        self.read_f32_into::<LittleEndian>(&mut values)?;
        Ok(DualQuat::from_array(values))
    }

    /// Read a float-encoded index and convert it to an integer.
    fn read_index(&mut self, what: &'static str) -> Result<u32> {
        index_from_f32(self.read_f32_le()?, what)
    }

    /// Read a NUL-terminated UTF-8 string.
    fn read_cstring(&mut self) -> Result<String> {
        let mut bytes = Vec::new();
        loop {
            let byte = self.read_u8()?;
            if byte == 0 {
                break;
            }
            bytes.push(byte);
        }
        String::from_utf8(bytes).map_err(|_| FormatError::InvalidUtf8)
    }
}

impl<R: Read + ?Sized> ReadBinaryExt for R {}

/// Write helpers for BBMOD streams.
pub trait WriteBinaryExt: Write {
    fn write_byte(&mut self, value: u8) -> Result<()> {
        Ok(self.write_u8(value)?)
    }

    fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_byte(u8::from(value))
    }

    fn write_u32_le(&mut self, value: u32) -> Result<()> {
        Ok(self.write_u32::<LittleEndian>(value)?)
    }

    fn write_i32_le(&mut self, value: i32) -> Result<()> {
        Ok(self.write_i32::<LittleEndian>(value)?)
    }

    fn write_f32_le(&mut self, value: f32) -> Result<()> {
        Ok(self.write_f32::<LittleEndian>(value)?)
    }

    fn write_f64_le(&mut self, value: f64) -> Result<()> {
        Ok(self.write_f64::<LittleEndian>(value)?)
    }

    fn write_vec2(&mut self, v: Vec2) -> Result<()> {
        self.write_f32_le(v.x)?;
        self.write_f32_le(v.y)
    }

    fn write_vec3(&mut self, v: Vec3) -> Result<()> {
        self.write_f32_le(v.x)?;
        self.write_f32_le(v.y)?;
        self.write_f32_le(v.z)
    }

    fn write_dual_quat(&mut self, dq: &DualQuat) -> Result<()> {
        for value in dq.to_array() {
            self.write_f32_le(value)?;
        }
        Ok(())
    }

    /// Write a table size as u32.
    fn write_count(&mut self, count: usize, what: &'static str) -> Result<()> {
        let count = u32::try_from(count).map_err(|_| FormatError::CountOverflow { what, count })?;
        self.write_u32_le(count)
    }

    /// Write a NUL-terminated string.
    fn write_cstring(&mut self, value: &str) -> Result<()> {
        self.write_all(value.as_bytes())?;
        Ok(self.write_u8(0)?)
    }
}

impl<W: Write + ?Sized> WriteBinaryExt for W {}

/// Convert an on-disk float index to an integer index.
pub fn index_from_f32(value: f32, what: &'static str) -> Result<u32> {
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > u32::MAX as f32 {
        return Err(FormatError::InvalidIndex { what, value });
    }
    Ok(value as u32)
}
