//! Arbitrary-precision `numeric`, carried as an exact rational.
//!
//! Text encoding is scientific notation truncated to a configurable number
//! of characters, so values like 1/3 never produce unbounded output.
//! Binary decoding reads the server's base-10000 digit format:
//!
//! ```text
//! ndigits: u16 | weight: i16 | sign: u16 | dscale: u16 | digits: [i16; ndigits]
//! ```

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

use super::codec::Codec;
use super::quote::quote_literal;
use super::types::{TypeTag, Value};
use crate::error::{CodecError, Result};

/// Default number of characters of scientific notation kept when encoding.
pub const DEFAULT_PRECISION: usize = 30;

/// Room for a sign, one digit and the decimal point.
pub const MIN_PRECISION: usize = 3;

// Sign word of the binary format
const NUMERIC_POS: u16 = 0x0000;
const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

const NBASE: u32 = 10_000;

// Decimal exponents beyond this are rejected rather than materialized.
const MAX_EXPONENT: i64 = 150_000;

/// The NaN sentinel: a rational with a zero denominator.
pub fn nan() -> BigRational {
    BigRational::new_raw(BigInt::zero(), BigInt::zero())
}

pub fn is_nan(value: &BigRational) -> bool {
    value.denom().is_zero()
}

fn pow10(exp: u64) -> BigInt {
    num_traits::pow(BigInt::from(10u8), exp as usize)
}

/// Codec for `numeric` with a fixed output precision.
#[derive(Debug, Clone)]
pub struct NumericCodec {
    tag: TypeTag,
    precision: usize,
}

impl Default for NumericCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl NumericCodec {
    pub fn new() -> Self {
        Self::with_precision(DEFAULT_PRECISION)
    }

    /// Keep at most `precision` characters (sign and point included) before
    /// the exponent. Values below [`MIN_PRECISION`] are raised to it.
    pub fn with_precision(precision: usize) -> Self {
        Self {
            tag: TypeTag::NUMERIC,
            precision: precision.max(MIN_PRECISION),
        }
    }

    pub fn precision(&self) -> usize {
        self.precision
    }

    fn rational(&self, value: &Value) -> Result<BigRational> {
        match value {
            Value::Numeric(r) => Ok(r.clone()),
            Value::Int2(_) | Value::Int4(_) | Value::Int8(_) => value
                .as_i64()
                .map(|i| BigRational::from_integer(BigInt::from(i)))
                .ok_or_else(|| CodecError::unsupported(&self.tag, value.kind())),
            other => Err(CodecError::unsupported(&self.tag, other.kind())),
        }
    }

    fn invalid(&self, raw: impl AsRef<[u8]>, reason: impl Into<String>) -> CodecError {
        CodecError::decode(&self.tag, raw, reason)
    }

    /// Render `value` as `d.ddd…e<exp>`, truncating (never rounding) the
    /// mantissa to the configured precision.
    pub fn render(&self, value: &BigRational) -> String {
        if is_nan(value) {
            return "NaN".to_string();
        }
        if value.is_zero() {
            return "0".to_string();
        }

        let abs = value.abs();
        let exp = decimal_exponent(&abs);

        // mantissa = abs / 10^exp, kept as num/den in [1, 10)
        let (mut num, den) = if exp >= 0 {
            (abs.numer().clone(), abs.denom() * pow10(exp as u64))
        } else {
            (abs.numer() * pow10(exp.unsigned_abs()), abs.denom().clone())
        };

        let mut out = String::with_capacity(self.precision + 8);
        if value.is_negative() {
            out.push('-');
        }
        let lead = &num / &den;
        out.push_str(&lead.to_string());
        num = &num % &den;

        if !num.is_zero() && out.len() + 1 < self.precision {
            out.push('.');
            let ten = BigInt::from(10u8);
            while !num.is_zero() && out.len() < self.precision {
                num *= &ten;
                out.push_str(&(&num / &den).to_string());
                num = &num % &den;
            }
        }

        out.push('e');
        out.push_str(&exp.to_string());
        out
    }

    /// Parse decimal or scientific text exactly.
    pub fn parse(&self, text: &str) -> Result<BigRational> {
        if text.eq_ignore_ascii_case("nan") || text.to_ascii_lowercase().contains("inf") {
            return Err(self.invalid(text, "special value has no rational representation"));
        }
        parse_decimal(text).ok_or_else(|| self.invalid(text, "invalid numeric syntax"))
    }
}

/// Exact decimal exponent `e` with `10^e <= value < 10^(e+1)`, for a
/// positive `value`.
fn decimal_exponent(value: &BigRational) -> i64 {
    let num = value.numer();
    let den = value.denom();
    let guess = num.to_string().len() as i64 - den.to_string().len() as i64;

    // value lies in (10^(guess-1), 10^(guess+1)), so the exponent is guess
    // or guess - 1
    let at_least_guess = if guess >= 0 {
        *num >= den * pow10(guess as u64)
    } else {
        num * pow10(guess.unsigned_abs()) >= *den
    };
    if at_least_guess {
        guess
    } else {
        guess - 1
    }
}

fn parse_decimal(text: &str) -> Option<BigRational> {
    let (negative, rest) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };

    let (mantissa, exp) = match rest.find(['e', 'E']) {
        Some(i) => {
            let exp: i64 = rest[i + 1..].parse().ok()?;
            (&rest[..i], exp)
        }
        None => (rest, 0),
    };
    if !(-MAX_EXPONENT..=MAX_EXPONENT).contains(&exp) {
        return None;
    }

    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((i, f)) => (i, f),
        None => (mantissa, ""),
    };
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if int_part.len() + frac_part.len() == 0 || !all_digits(int_part) || !all_digits(frac_part)
    {
        return None;
    }

    let digits = format!("{}{}", int_part, frac_part);
    let mut num = BigInt::parse_bytes(digits.as_bytes(), 10)?;
    if negative {
        num = -num;
    }

    let scale = frac_part.len() as i64 - exp;
    let value = if scale >= 0 {
        BigRational::new(num, pow10(scale as u64))
    } else {
        BigRational::from_integer(num * pow10(scale.unsigned_abs()))
    };
    Some(value)
}

impl Codec for NumericCodec {
    fn tag(&self) -> &TypeTag {
        &self.tag
    }

    fn encode_text(&self, value: &Value) -> Result<String> {
        Ok(self.render(&self.rational(value)?))
    }

    fn decode_text(&self, text: &str) -> Result<Value> {
        self.parse(text).map(Value::Numeric)
    }

    fn decode_binary(&self, data: &[u8]) -> Result<Value> {
        if data.len() < 8 {
            return Err(self.invalid(data, "numeric header too short"));
        }
        let ndigits = u16::from_be_bytes([data[0], data[1]]) as usize;
        let weight = i16::from_be_bytes([data[2], data[3]]) as i64;
        let sign = u16::from_be_bytes([data[4], data[5]]);

        match sign {
            NUMERIC_POS | NUMERIC_NEG => {}
            NUMERIC_NAN | NUMERIC_PINF | NUMERIC_NINF => {
                return Err(self.invalid(data, "special value has no rational representation"))
            }
            other => return Err(self.invalid(data, format!("invalid sign word 0x{:04x}", other))),
        }
        if data.len() != 8 + ndigits * 2 {
            return Err(self.invalid(data, "digit count does not match payload length"));
        }
        if ndigits == 0 {
            return Ok(Value::Numeric(BigRational::zero()));
        }

        let base = BigInt::from(NBASE);
        let mut acc = BigInt::zero();
        for chunk in data[8..].chunks_exact(2) {
            let digit = i16::from_be_bytes([chunk[0], chunk[1]]);
            if !(0..NBASE as i16).contains(&digit) {
                return Err(self.invalid(data, format!("invalid base-10000 digit {}", digit)));
            }
            acc = acc * &base + BigInt::from(digit);
        }
        if sign == NUMERIC_NEG {
            acc = -acc;
        }

        // Weight is the base-10000 exponent of the first digit
        let last = weight - (ndigits as i64 - 1);
        let scale = num_traits::pow(base, last.unsigned_abs() as usize);
        let value = if last >= 0 {
            BigRational::from_integer(acc * scale)
        } else {
            BigRational::new(acc, scale)
        };
        Ok(Value::Numeric(value))
    }

    fn to_literal(&self, value: &Value) -> Result<String> {
        let r = self.rational(value)?;
        if is_nan(&r) {
            return Ok(quote_literal("NaN"));
        }
        Ok(format!("({}/{}::numeric)", r.numer(), r.denom()))
    }
}

/// Convenience for building numerics in code, e.g. `ratio(1, 3)`.
pub fn ratio(numer: i64, denom: i64) -> BigRational {
    if denom == 0 {
        return nan();
    }
    BigRational::new(BigInt::from(numer), BigInt::from(denom))
}

/// Whether a numeric value is a whole number.
pub fn is_integer(value: &BigRational) -> bool {
    !is_nan(value) && value.denom().is_one()
}
