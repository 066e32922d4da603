//! Date/time codecs.
//!
//! Binary values are offsets from the PostgreSQL epoch (2000-01-01):
//! days for `date`, microseconds for the timestamps.

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone,
    Timelike, Utc,
};

use super::codec::Codec;
use super::types::{TypeTag, Value};
use crate::error::{CodecError, Result};

/// Microseconds between the Unix epoch and 2000-01-01 00:00:00 UTC.
pub const PG_EPOCH_OFFSET_USEC: i64 = 946_684_800_000_000;

/// `NaiveDate::num_days_from_ce` of 2000-01-01.
const PG_EPOCH_DAYS_FROM_CE: i32 = 730_120;

const USEC_PER_SEC: i128 = 1_000_000;
const USEC_PER_MINUTE: i128 = 60 * USEC_PER_SEC;
const USEC_PER_HOUR: i128 = 60 * USEC_PER_MINUTE;
const USEC_PER_DAY: i128 = 24 * USEC_PER_HOUR;
const USEC_PER_WEEK: i128 = 7 * USEC_PER_DAY;
/// An average Gregorian month: 30.436875 days.
const USEC_PER_MONTH: i128 = 2_629_746 * USEC_PER_SEC;
const USEC_PER_YEAR: i128 = 12 * USEC_PER_MONTH;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalKind {
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Interval,
}

#[derive(Debug, Clone)]
pub struct TemporalCodec {
    tag: TypeTag,
    kind: TemporalKind,
}

impl TemporalCodec {
    pub fn new(tag: TypeTag, kind: TemporalKind) -> Self {
        Self { tag, kind }
    }

    pub fn builtins() -> Vec<TemporalCodec> {
        [
            (TypeTag::DATE, TemporalKind::Date),
            (TypeTag::TIME, TemporalKind::Time),
            (TypeTag::TIMESTAMP, TemporalKind::Timestamp),
            (TypeTag::TIMESTAMPTZ, TemporalKind::TimestampTz),
            (TypeTag::INTERVAL, TemporalKind::Interval),
        ]
        .into_iter()
        .map(|(tag, kind)| TemporalCodec::new(tag, kind))
        .collect()
    }

    fn mismatch(&self, value: &Value) -> CodecError {
        CodecError::unsupported(&self.tag, value.kind())
    }

    fn invalid(&self, raw: impl AsRef<[u8]>, reason: impl Into<String>) -> CodecError {
        CodecError::decode(&self.tag, raw, reason)
    }

    fn out_of_range(&self) -> CodecError {
        CodecError::unsupported(&self.tag, "out-of-range value")
    }

    fn be_i64(&self, data: &[u8]) -> Result<i64> {
        <[u8; 8]>::try_from(data)
            .map(i64::from_be_bytes)
            .map_err(|_| self.invalid(data, format!("expected 8 bytes, got {}", data.len())))
    }
}

impl Codec for TemporalCodec {
    fn tag(&self) -> &TypeTag {
        &self.tag
    }

    fn encode_text(&self, value: &Value) -> Result<String> {
        match (self.kind, value) {
            (TemporalKind::Date, Value::Date(d)) => Ok(format_date(*d)),
            (TemporalKind::Time, Value::Time(t)) => Ok(format_time(*t)),
            (TemporalKind::Timestamp, Value::Timestamp(ts)) => Ok(format_timestamp(*ts)),
            (TemporalKind::TimestampTz, Value::TimestampTz(ts)) => Ok(format_timestamptz(ts)),
            (TemporalKind::Interval, Value::Interval(d)) => {
                format_interval(*d).ok_or_else(|| self.out_of_range())
            }
            _ => Err(self.mismatch(value)),
        }
    }

    fn decode_text(&self, text: &str) -> Result<Value> {
        let decoded = match self.kind {
            TemporalKind::Date => parse_date(text).map(Value::Date),
            TemporalKind::Time => parse_time(text).map(Value::Time),
            TemporalKind::Timestamp => parse_timestamp(text).map(Value::Timestamp),
            TemporalKind::TimestampTz => parse_timestamptz(text).map(Value::TimestampTz),
            TemporalKind::Interval => parse_iso_interval(text)
                .and_then(|us| i64::try_from(us).ok())
                .map(|us| Value::Interval(TimeDelta::microseconds(us))),
        };
        decoded.ok_or_else(|| self.invalid(text, format!("invalid {} syntax", self.tag)))
    }

    fn supports_binary(&self) -> bool {
        true
    }

    fn encode_binary(&self, value: &Value) -> Result<Vec<u8>> {
        match (self.kind, value) {
            (TemporalKind::Date, Value::Date(d)) => {
                let days = d.num_days_from_ce() - PG_EPOCH_DAYS_FROM_CE;
                Ok(days.to_be_bytes().to_vec())
            }
            (TemporalKind::Time, Value::Time(t)) => {
                let usec = t.num_seconds_from_midnight() as i64 * 1_000_000
                    + (t.nanosecond() % 1_000_000_000) as i64 / 1_000;
                Ok(usec.to_be_bytes().to_vec())
            }
            (TemporalKind::Timestamp, Value::Timestamp(ts)) => {
                let usec = pg_usec(&Utc.from_utc_datetime(ts)).ok_or_else(|| self.out_of_range())?;
                Ok(usec.to_be_bytes().to_vec())
            }
            (TemporalKind::TimestampTz, Value::TimestampTz(ts)) => {
                let usec = pg_usec(ts).ok_or_else(|| self.out_of_range())?;
                Ok(usec.to_be_bytes().to_vec())
            }
            (TemporalKind::Interval, Value::Interval(d)) => {
                let usec = d.num_microseconds().ok_or_else(|| self.out_of_range())?;
                let mut buf = Vec::with_capacity(16);
                buf.extend_from_slice(&usec.to_be_bytes());
                buf.extend_from_slice(&0i32.to_be_bytes()); // days
                buf.extend_from_slice(&0i32.to_be_bytes()); // months
                Ok(buf)
            }
            _ => Err(self.mismatch(value)),
        }
    }

    fn decode_binary(&self, data: &[u8]) -> Result<Value> {
        match self.kind {
            TemporalKind::Date => {
                let days = <[u8; 4]>::try_from(data)
                    .map(i32::from_be_bytes)
                    .map_err(|_| self.invalid(data, "expected 4 bytes"))?;
                days.checked_add(PG_EPOCH_DAYS_FROM_CE)
                    .and_then(NaiveDate::from_num_days_from_ce_opt)
                    .map(Value::Date)
                    .ok_or_else(|| self.invalid(data, "date out of range"))
            }
            TemporalKind::Time => {
                // 24:00:00 has no NaiveTime form; rejected in both formats
                let usec = self.be_i64(data)?;
                if !(0..86_400_000_000).contains(&usec) {
                    return Err(self.invalid(data, "time out of range"));
                }
                NaiveTime::from_num_seconds_from_midnight_opt(
                    (usec / 1_000_000) as u32,
                    (usec % 1_000_000) as u32 * 1_000,
                )
                .map(Value::Time)
                .ok_or_else(|| self.invalid(data, "time out of range"))
            }
            TemporalKind::Timestamp => from_pg_usec(self.be_i64(data)?)
                .map(|dt| Value::Timestamp(dt.naive_utc()))
                .ok_or_else(|| self.invalid(data, "timestamp out of range")),
            TemporalKind::TimestampTz => from_pg_usec(self.be_i64(data)?)
                .map(|dt| Value::TimestampTz(dt.fixed_offset()))
                .ok_or_else(|| self.invalid(data, "timestamp out of range")),
            TemporalKind::Interval => {
                if data.len() != 16 {
                    return Err(self.invalid(data, "expected 16 bytes"));
                }
                let usec = self.be_i64(&data[..8])? as i128;
                let days = i32::from_be_bytes([data[8], data[9], data[10], data[11]]) as i128;
                let months = i32::from_be_bytes([data[12], data[13], data[14], data[15]]) as i128;
                let total = usec + days * USEC_PER_DAY + months * USEC_PER_MONTH;
                i64::try_from(total)
                    .map(|us| Value::Interval(TimeDelta::microseconds(us)))
                    .map_err(|_| self.invalid(data, "interval out of range"))
            }
        }
    }
}

fn pg_usec<Tz: TimeZone>(dt: &DateTime<Tz>) -> Option<i64> {
    dt.timestamp_micros().checked_sub(PG_EPOCH_OFFSET_USEC)
}

fn from_pg_usec(usec: i64) -> Option<DateTime<Utc>> {
    let unix = usec.checked_add(PG_EPOCH_OFFSET_USEC)?;
    let secs = unix.div_euclid(1_000_000);
    let nanos = (unix.rem_euclid(1_000_000) * 1_000) as u32;
    DateTime::from_timestamp(secs, nanos)
}

// ============================================================================
// Text formats
// ============================================================================

/// `YYYY-MM-DD`, with years before 1 written as ` BC` (there is no year 0).
fn format_date(d: NaiveDate) -> String {
    let (year, era) = if d.year() <= 0 {
        (1 - d.year(), " BC")
    } else {
        (d.year(), "")
    };
    format!("{:04}-{:02}-{:02}{}", year, d.month(), d.day(), era)
}

fn format_time(t: NaiveTime) -> String {
    t.format("%H:%M:%S%.f").to_string()
}

fn format_timestamp(ts: NaiveDateTime) -> String {
    let (date, era) = split_era(format_date(ts.date()));
    format!("{} {}{}", date, format_time(ts.time()), era)
}

fn format_timestamptz(ts: &DateTime<FixedOffset>) -> String {
    let local = ts.naive_local();
    let (date, era) = split_era(format_date(local.date()));
    format!(
        "{} {}{}{}",
        date,
        format_time(local.time()),
        format_offset(ts.offset().local_minus_utc()),
        era
    )
}

fn split_era(date: String) -> (String, &'static str) {
    match date.strip_suffix(" BC") {
        Some(d) => (d.to_string(), " BC"),
        None => (date, ""),
    }
}

/// `+HH:MM`, or `+HH:MM:SS` when the offset has seconds.
fn format_offset(seconds: i32) -> String {
    let sign = if seconds < 0 { '-' } else { '+' };
    let abs = seconds.unsigned_abs();
    let (h, m, s) = (abs / 3600, abs / 60 % 60, abs % 60);
    if s == 0 {
        format!("{}{:02}:{:02}", sign, h, m)
    } else {
        format!("{}{:02}:{:02}:{:02}", sign, h, m, s)
    }
}

/// Interval output is plain seconds, e.g. `3600s` or `-1.5s`.
fn format_interval(d: TimeDelta) -> Option<String> {
    let usec = d.num_microseconds()?;
    let sign = if usec < 0 { "-" } else { "" };
    let abs = usec.unsigned_abs();
    let (secs, frac) = (abs / 1_000_000, abs % 1_000_000);
    if frac == 0 {
        return Some(format!("{}{}s", sign, secs));
    }
    let frac = format!("{:06}", frac);
    Some(format!("{}{}.{}s", sign, secs, frac.trim_end_matches('0')))
}

fn strip_era(text: &str) -> (&str, bool) {
    match text.strip_suffix(" BC") {
        Some(rest) => (rest, true),
        None => (text, false),
    }
}

fn parse_date_with_era(text: &str, bc: bool) -> Option<NaiveDate> {
    let mut parts = text.splitn(3, '-');
    let mut field = || -> Option<u32> {
        let p = parts.next()?;
        if p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        p.parse().ok()
    };
    let (y, m, d) = (field()?, field()?, field()?);
    let year = i32::try_from(y).ok()?;
    let year = if bc {
        if year == 0 {
            return None;
        }
        1 - year
    } else {
        year
    };
    NaiveDate::from_ymd_opt(year, m, d)
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    let (text, bc) = strip_era(text);
    parse_date_with_era(text, bc)
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(text, "%H:%M:%S%.f").ok()
}

/// Split `date<sep>time` on the first space or `T`.
fn split_date_time(text: &str) -> Option<(&str, &str)> {
    let i = text.find([' ', 'T'])?;
    Some((&text[..i], &text[i + 1..]))
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let (text, bc) = strip_era(text);
    let (date, time) = split_date_time(text)?;
    Some(NaiveDateTime::new(
        parse_date_with_era(date, bc)?,
        parse_time(time)?,
    ))
}

fn parse_timestamptz(text: &str) -> Option<DateTime<FixedOffset>> {
    let (text, bc) = strip_era(text);
    let (date, rest) = split_date_time(text)?;
    let (time, offset) = match rest.strip_suffix('Z') {
        Some(time) => (time, FixedOffset::east_opt(0)?),
        None => {
            let i = rest.rfind(['+', '-'])?;
            (&rest[..i], parse_offset(&normalize_offset(&rest[i..])?)?)
        }
    };
    let naive = NaiveDateTime::new(parse_date_with_era(date, bc)?, parse_time(time)?);
    offset.from_local_datetime(&naive).single()
}

/// Rewrite a server offset (`+HH`, `+HHMM`, `+HH:MM`, `+HH:MM:SS`) into
/// colon form.
pub(crate) fn normalize_offset(raw: &str) -> Option<String> {
    let sign = raw.chars().next().filter(|c| *c == '+' || *c == '-')?;
    let body = &raw[1..];
    let digits: String = body.chars().filter(|c| *c != ':').collect();
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let colons_at = |positions: &[usize]| positions.iter().all(|&i| body.as_bytes()[i] == b':');
    match (body.len(), digits.len()) {
        (2, 2) => Some(format!("{}{}:00", sign, digits)),
        (4, 4) => Some(format!("{}{}:{}", sign, &digits[..2], &digits[2..])),
        (5, 4) if colons_at(&[2]) => Some(format!("{}{}:{}", sign, &digits[..2], &digits[2..])),
        (6, 6) | (8, 6) if body.len() == 6 || colons_at(&[2, 5]) => Some(format!(
            "{}{}:{}:{}",
            sign,
            &digits[..2],
            &digits[2..4],
            &digits[4..]
        )),
        _ => None,
    }
}

fn parse_offset(colon_form: &str) -> Option<FixedOffset> {
    let negative = colon_form.starts_with('-');
    let mut seconds = 0i32;
    for (i, part) in colon_form[1..].split(':').enumerate() {
        let n: i32 = part.parse().ok()?;
        seconds += n * [3600, 60, 1].get(i)?;
    }
    FixedOffset::east_opt(if negative { -seconds } else { seconds })
}

/// Parse an ISO-8601 duration `P[nY][nM][nW][nD][T[nH][nM][nS]]` into
/// microseconds. Components may be signed and fractional; months and
/// years use the average Gregorian month.
fn parse_iso_interval(text: &str) -> Option<i128> {
    let body = text.strip_prefix('P')?;
    let (date_part, time_part) = match body.split_once('T') {
        Some((d, t)) if !t.is_empty() => (d, Some(t)),
        Some(_) => return None,
        None => (body, None),
    };

    let mut total = sum_components(
        date_part,
        &[
            ('Y', USEC_PER_YEAR),
            ('M', USEC_PER_MONTH),
            ('W', USEC_PER_WEEK),
            ('D', USEC_PER_DAY),
        ],
    )?;
    if let Some(t) = time_part {
        total = total.checked_add(sum_components(
            t,
            &[('H', USEC_PER_HOUR), ('M', USEC_PER_MINUTE), ('S', USEC_PER_SEC)],
        )?)?;
    }
    Some(total)
}

fn sum_components(mut part: &str, units: &[(char, i128)]) -> Option<i128> {
    let mut total = 0i128;
    while !part.is_empty() {
        let end = part.find(|c: char| c.is_ascii_alphabetic())?;
        let unit = part[end..].chars().next()?;
        let (_, scale) = units.iter().find(|(u, _)| *u == unit)?;
        total = total.checked_add(scaled_number(&part[..end], *scale)?)?;
        part = &part[end + unit.len_utf8()..];
    }
    Some(total)
}

/// `[+-]digits[.digits]` times `scale`, truncated to whole microseconds.
fn scaled_number(text: &str, scale: i128) -> Option<i128> {
    let (negative, digits) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };
    let (int, frac) = digits.split_once('.').unwrap_or((digits, ""));
    if int.len() + frac.len() == 0
        || int.len() + frac.len() > 30
        || !int.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit())
    {
        return None;
    }
    let mantissa: i128 = format!("{}{}", int, frac).parse().ok()?;
    let divisor = 10i128.checked_pow(frac.len() as u32)?;
    let value = mantissa.checked_mul(scale)? / divisor;
    Some(if negative { -value } else { value })
}
