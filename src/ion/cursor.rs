//! 字节游标
//!
//! 在有界切片上读取 Ion 的基本编码单元（VarUInt / VarInt / UInt / Int）。
//! 子作用域通过 [`Cursor::take`] 切出，越界即成帧错误。

use super::error::IonError;

/// 有界字节游标；`base` 为切片在原始缓冲区中的起始偏移，仅用于错误定位。
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

/// 带符号位的 VarInt；保留符号以区分 `-0`（时间戳偏移未知）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarInt {
    pub magnitude: u64,
    pub negative: bool,
}

impl VarInt {
    pub fn value(self) -> i64 {
        let m = self.magnitude.min(i64::MAX as u64) as i64;
        if self.negative { -m } else { m }
    }

    pub fn is_negative_zero(self) -> bool {
        self.negative && self.magnitude == 0
    }
}

/// 整数幅值：8 字节以内精确，否则退化为浮点近似。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Magnitude {
    Exact(u64),
    Approx(f64),
}

impl Magnitude {
    pub fn from_be_bytes(bytes: &[u8]) -> Magnitude {
        let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
        let significant = &bytes[first..];
        if significant.len() <= 8 {
            let mut v: u64 = 0;
            for b in significant {
                v = (v << 8) | u64::from(*b);
            }
            Magnitude::Exact(v)
        } else {
            let mut v = 0.0_f64;
            for b in significant {
                v = v * 256.0 + f64::from(*b);
            }
            Magnitude::Approx(v)
        }
    }

    pub fn is_zero(self) -> bool {
        match self {
            Magnitude::Exact(v) => v == 0,
            Magnitude::Approx(v) => v == 0.0,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Magnitude::Exact(v) => v as f64,
            Magnitude::Approx(v) => v,
        }
    }
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_base(data, 0)
    }

    pub fn with_base(data: &'a [u8], base: usize) -> Self {
        Self { data, pos: 0, base }
    }

    /// 当前位置在原始缓冲区中的绝对偏移
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn peek_byte(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.data[self.pos..].starts_with(prefix)
    }

    pub fn read_byte(&mut self) -> Result<u8, IonError> {
        let b = self.peek_byte().ok_or(IonError::UnexpectedEof {
            offset: self.offset(),
        })?;
        self.pos += 1;
        Ok(b)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], IonError> {
        if n > self.remaining() {
            return Err(IonError::UnexpectedEof {
                offset: self.offset(),
            });
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// 切出长度为 `n` 的子作用域，游标越过该区域。
    pub fn take(&mut self, n: usize) -> Result<Cursor<'a>, IonError> {
        if n > self.remaining() {
            return Err(IonError::LengthOverflow {
                offset: self.offset(),
                len: n,
            });
        }
        let child = Cursor::with_base(&self.data[self.pos..self.pos + n], self.offset());
        self.pos += n;
        Ok(child)
    }

    /// 读出剩余全部字节
    pub fn rest(&mut self) -> &'a [u8] {
        let out = &self.data[self.pos..];
        self.pos = self.data.len();
        out
    }

    pub fn skip(&mut self, n: usize) -> Result<(), IonError> {
        self.read_bytes(n).map(|_| ())
    }

    /// VarUInt：每字节 7 位数据，最高位为 1 表示最后一个字节。
    pub fn read_var_uint(&mut self) -> Result<u64, IonError> {
        let start = self.offset();
        let mut result: u64 = 0;
        loop {
            let b = self.read_byte()?;
            if result > (u64::MAX >> 7) {
                return Err(IonError::VarIntOverflow { offset: start });
            }
            result = (result << 7) | u64::from(b & 0x7f);
            if b & 0x80 != 0 {
                return Ok(result);
            }
        }
    }

    /// VarInt：首字节第 6 位为符号位，其余同 VarUInt。
    pub fn read_var_int(&mut self) -> Result<VarInt, IonError> {
        let start = self.offset();
        let first = self.read_byte()?;
        let negative = first & 0x40 != 0;
        let mut magnitude = u64::from(first & 0x3f);
        if first & 0x80 != 0 {
            return Ok(VarInt {
                magnitude,
                negative,
            });
        }
        loop {
            let b = self.read_byte()?;
            if magnitude > (u64::MAX >> 7) {
                return Err(IonError::VarIntOverflow { offset: start });
            }
            magnitude = (magnitude << 7) | u64::from(b & 0x7f);
            if b & 0x80 != 0 {
                return Ok(VarInt {
                    magnitude,
                    negative,
                });
            }
        }
    }

    /// 固定长度无符号大端整数
    pub fn read_uint(&mut self, n: usize) -> Result<Magnitude, IonError> {
        Ok(Magnitude::from_be_bytes(self.read_bytes(n)?))
    }

    /// 固定长度符号-幅值整数（首字节最高位为符号位）。返回 (幅值, 是否为负)。
    pub fn read_int(&mut self, n: usize) -> Result<(Magnitude, bool), IonError> {
        if n == 0 {
            return Ok((Magnitude::Exact(0), false));
        }
        let bytes = self.read_bytes(n)?;
        let negative = bytes[0] & 0x80 != 0;
        let mut buf = bytes.to_vec();
        buf[0] &= 0x7f;
        Ok((Magnitude::from_be_bytes(&buf), negative))
    }
}
