//! Ion 时间戳
//!
//! 二进制字段均为 UTC；输出为 Ion 文本形式（ISO-8601 兼容），分钟及以上精度
//! 按偏移量换算为本地时间并附带 `Z` / `±hh:mm`，未知偏移写作 `-00:00`。

use chrono::{Duration, NaiveDate, NaiveDateTime};

use super::cursor::{Cursor, Magnitude};
use super::error::IonError;

/// 小数秒最多保留的位数；超出即视为损坏
const MAX_FRACTION_DIGITS: u64 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precision {
    Year,
    Month,
    Day,
    Minute,
    Second,
}

/// 解码时间戳主体为文本表示。
pub fn decode_timestamp(body: &mut Cursor<'_>) -> Result<String, IonError> {
    let offset = body.read_var_int()?;
    let year = body.read_var_uint()?;
    let mut month = 1;
    let mut day = 1;
    let (mut hour, mut minute, mut second) = (0, 0, 0);
    let mut fraction: Option<String> = None;

    let mut precision = Precision::Year;
    if !body.is_empty() {
        month = body.read_var_uint()?;
        precision = Precision::Month;
    }
    if !body.is_empty() {
        day = body.read_var_uint()?;
        precision = Precision::Day;
    }
    if !body.is_empty() {
        hour = body.read_var_uint()?;
        if body.is_empty() {
            return Err(IonError::InvalidTimestamp("hour without minute"));
        }
        minute = body.read_var_uint()?;
        precision = Precision::Minute;
    }
    if !body.is_empty() {
        second = body.read_var_uint()?;
        precision = Precision::Second;
    }
    if !body.is_empty() {
        let exponent = body.read_var_int()?;
        let rest = body.remaining();
        let (coefficient, negative) = body.read_int(rest)?;
        fraction = format_fraction(exponent.value(), coefficient, negative)?;
    }

    if !(1..=9999).contains(&year) {
        return Err(IonError::InvalidTimestamp("year out of range"));
    }
    if month > 12 || day > 31 || hour > 23 || minute > 59 || second > 59 {
        return Err(IonError::InvalidTimestamp("field out of range"));
    }
    let date = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .ok_or(IonError::InvalidTimestamp("invalid calendar date"))?;

    match precision {
        Precision::Year => return Ok(format!("{year:04}T")),
        Precision::Month => return Ok(format!("{year:04}-{month:02}T")),
        Precision::Day => return Ok(date.format("%Y-%m-%d").to_string()),
        Precision::Minute | Precision::Second => {}
    }

    let utc: NaiveDateTime = date
        .and_hms_opt(hour as u32, minute as u32, second as u32)
        .ok_or(IonError::InvalidTimestamp("invalid time of day"))?;
    let known_offset = !offset.is_negative_zero();
    let offset_minutes = offset.value();
    if offset_minutes.abs() >= 24 * 60 {
        return Err(IonError::InvalidTimestamp("offset out of range"));
    }
    let local = if known_offset {
        utc + Duration::minutes(offset_minutes)
    } else {
        utc
    };

    let mut out = if precision == Precision::Minute {
        local.format("%Y-%m-%dT%H:%M").to_string()
    } else {
        local.format("%Y-%m-%dT%H:%M:%S").to_string()
    };
    if let Some(frac) = fraction {
        out.push_str(&frac);
    }
    out.push_str(&format_offset(known_offset, offset_minutes));
    Ok(out)
}

fn format_fraction(
    exponent: i64,
    coefficient: Magnitude,
    negative: bool,
) -> Result<Option<String>, IonError> {
    let Magnitude::Exact(coefficient) = coefficient else {
        return Err(IonError::InvalidTimestamp("fraction coefficient too wide"));
    };
    if negative && coefficient != 0 {
        return Err(IonError::InvalidTimestamp("negative fraction"));
    }
    if exponent >= 0 {
        if coefficient != 0 {
            return Err(IonError::InvalidTimestamp("fraction not below one second"));
        }
        return Ok(None);
    }
    if exponent.unsigned_abs() > MAX_FRACTION_DIGITS {
        return Err(IonError::InvalidTimestamp("fraction exponent too large"));
    }
    let digits = exponent.unsigned_abs() as usize;
    let text = format!("{coefficient:0digits$}");
    if text.len() > digits {
        return Err(IonError::InvalidTimestamp("fraction not below one second"));
    }
    Ok(Some(format!(".{text}")))
}

fn format_offset(known: bool, minutes: i64) -> String {
    if !known {
        return "-00:00".to_string();
    }
    if minutes == 0 {
        return "Z".to_string();
    }
    let sign = if minutes < 0 { '-' } else { '+' };
    let m = minutes.abs();
    format!("{sign}{:02}:{:02}", m / 60, m % 60)
}
