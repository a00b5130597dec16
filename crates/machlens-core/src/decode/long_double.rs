//! C `long double` decoding.
//!
//! The layout depends on the CPU: x87 80-bit extended on x86, plain
//! `double` on ARM, and a pair of doubles on PowerPC. Values are printed
//! the way C's `%Lg` does (six significant digits).

use gimli::{Endianity, RunTimeEndian};

use crate::types::LongDoubleLayout;

/// Decode a 16-byte `long double` slot.
///
/// Returns an empty string if `data` is not 16 bytes long.
pub fn decode_long_double(data: &[u8], layout: LongDoubleLayout, endian: RunTimeEndian) -> String
{
    if data.len() != 16 {
        return String::new();
    }
    match layout {
        LongDoubleLayout::X87Extended => {
            let mantissa = endian.read_u64(&data[..8]);
            let sign_exponent = endian.read_u16(&data[8..10]);
            format_x87(mantissa, sign_exponent)
        }
        LongDoubleLayout::Binary64 => format_c_g(endian.read_f64(&data[..8])),
        LongDoubleLayout::DoubleDouble => {
            let hi = endian.read_f64(&data[..8]);
            let lo = endian.read_f64(&data[8..16]);
            format_c_g(hi + lo)
        }
    }
}

fn format_x87(mantissa: u64, sign_exponent: u16) -> String
{
    let negative = sign_exponent & 0x8000 != 0;
    let exponent = i32::from(sign_exponent & 0x7fff);
    let sign = if negative { "-" } else { "" };

    if exponent == 0x7fff {
        return if mantissa << 1 == 0 {
            format!("{sign}inf")
        } else {
            "nan".to_string()
        };
    }
    if mantissa == 0 {
        return format!("{sign}0");
    }

    // value = mantissa * 2^(exponent - 16383 - 63); denormals use exponent 1
    let unbiased = if exponent == 0 { 1 - 16383 } else { exponent - 16383 };
    let fraction = mantissa as f64 / 2f64.powi(63);
    if (-1022..=1023).contains(&unbiased) {
        let value = fraction * 2f64.powi(unbiased);
        return format_c_g(if negative { -value } else { value });
    }

    // outside the range of f64: work in log10
    let log10 = fraction.log10() + f64::from(unbiased) * std::f64::consts::LOG10_2;
    let mut decimal_exponent = log10.floor() as i64;
    let mut digits = format!("{:.5}", 10f64.powf(log10 - log10.floor()));
    if digits.starts_with("10") {
        decimal_exponent += 1;
        digits = "1.00000".to_string();
    }
    let digits = strip_fraction_zeros(&digits);
    let exp_sign = if decimal_exponent < 0 { '-' } else { '+' };
    format!("{sign}{digits}e{exp_sign}{:02}", decimal_exponent.unsigned_abs())
}

fn strip_fraction_zeros(text: &str) -> &str
{
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

/// C `%g` with the default precision of 6.
pub fn format_c_g(value: f64) -> String
{
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let scientific = format!("{value:.5e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if (-4..6).contains(&exponent) {
        let fixed = format!("{value:.*}", (5 - exponent) as usize);
        return strip_fraction_zeros(&fixed).to_string();
    }
    let exp_sign = if exponent < 0 { '-' } else { '+' };
    format!(
        "{}e{exp_sign}{:02}",
        strip_fraction_zeros(mantissa),
        exponent.unsigned_abs()
    )
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn x87(value_mantissa: u64, sign_exponent: u16) -> Vec<u8>
    {
        let mut data = Vec::with_capacity(16);
        data.extend_from_slice(&value_mantissa.to_le_bytes());
        data.extend_from_slice(&sign_exponent.to_le_bytes());
        data.resize(16, 0);
        data
    }

    #[test]
    fn test_format_c_g()
    {
        assert_eq!(format_c_g(1.0), "1");
        assert_eq!(format_c_g(0.5), "0.5");
        assert_eq!(format_c_g(123_456.0), "123456");
        assert_eq!(format_c_g(1_234_567.0), "1.23457e+06");
        assert_eq!(format_c_g(0.0001), "0.0001");
        assert_eq!(format_c_g(0.000_012_5), "1.25e-05");
        assert_eq!(format_c_g(std::f64::consts::PI), "3.14159");
    }

    #[test]
    fn test_x87_one()
    {
        let data = x87(0x8000_0000_0000_0000, 0x3fff);
        assert_eq!(
            decode_long_double(&data, LongDoubleLayout::X87Extended, RunTimeEndian::Little),
            "1"
        );
    }

    #[test]
    fn test_x87_negative_two_and_infinity()
    {
        let data = x87(0x8000_0000_0000_0000, 0xc000);
        assert_eq!(
            decode_long_double(&data, LongDoubleLayout::X87Extended, RunTimeEndian::Little),
            "-2"
        );
        let data = x87(0x8000_0000_0000_0000, 0x7fff);
        assert_eq!(
            decode_long_double(&data, LongDoubleLayout::X87Extended, RunTimeEndian::Little),
            "inf"
        );
    }

    #[test]
    fn test_x87_out_of_double_range()
    {
        // 2^16000
        let data = x87(0x8000_0000_0000_0000, 0x3fff + 16000);
        let text = decode_long_double(&data, LongDoubleLayout::X87Extended, RunTimeEndian::Little);
        assert!(text.ends_with("e+4816"), "{text}");
    }

    #[test]
    fn test_binary64_and_double_double()
    {
        let mut data = 2.5f64.to_be_bytes().to_vec();
        data.extend_from_slice(&0.25f64.to_be_bytes());
        assert_eq!(
            decode_long_double(&data, LongDoubleLayout::Binary64, RunTimeEndian::Big),
            "2.5"
        );
        assert_eq!(
            decode_long_double(&data, LongDoubleLayout::DoubleDouble, RunTimeEndian::Big),
            "2.75"
        );
    }
}
