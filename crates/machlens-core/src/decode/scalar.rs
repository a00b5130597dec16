//! Fixed-width value renderings: ASCII dumps, quoted strings and
//! characters, `%g`-style floats and pointers.

use gimli::{Endianity, RunTimeEndian};

/// Printable ASCII as-is, everything else as `.`.
pub fn to_ascii(data: &[u8]) -> String
{
    data.iter()
        .map(|&c| if (32..127).contains(&c) { c as char } else { '.' })
        .collect()
}

/// Space-separated lowercase hex bytes.
pub fn hex_bytes(data: &[u8]) -> String
{
    let parts: Vec<String> = data.iter().map(|b| format!("{b:02x}")).collect();
    parts.join(" ")
}

fn is_print(c: char) -> bool
{
    c == ' ' || !(c.is_control() || c.is_whitespace())
}

fn push_escaped(out: &mut String, c: char, quote: char)
{
    match c {
        '\x07' => out.push_str("\\a"),
        '\x08' => out.push_str("\\b"),
        '\x0c' => out.push_str("\\f"),
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        '\x0b' => out.push_str("\\v"),
        '\\' => out.push_str("\\\\"),
        c if c == quote => {
            out.push('\\');
            out.push(c);
        }
        c if is_print(c) => out.push(c),
        c if (c as u32) < 0x80 => out.push_str(&format!("\\x{:02x}", c as u32)),
        c if (c as u32) < 0x1_0000 => out.push_str(&format!("\\u{:04x}", c as u32)),
        c => out.push_str(&format!("\\U{:08x}", c as u32)),
    }
}

/// Double-quoted string with C-style escapes; invalid UTF-8 bytes become
/// `\xNN`.
pub fn quote_string(data: &[u8]) -> String
{
    let mut out = String::with_capacity(data.len() + 2);
    out.push('"');
    for chunk in data.utf8_chunks() {
        for c in chunk.valid().chars() {
            push_escaped(&mut out, c, '"');
        }
        for b in chunk.invalid() {
            out.push_str(&format!("\\x{b:02x}"));
        }
    }
    out.push('"');
    out
}

/// Single-quoted character literal; values that are not Unicode scalar
/// values print as U+FFFD.
pub fn quote_char(value: i64) -> String
{
    let c = u32::try_from(value)
        .ok()
        .and_then(char::from_u32)
        .unwrap_or(char::REPLACEMENT_CHARACTER);
    let mut out = String::from("'");
    push_escaped(&mut out, c, '\'');
    out.push('\'');
    out
}

/// One C string starting at `data[0]`.
///
/// ## Returns
///
/// The quoted text and the bytes consumed, including the NUL. Without a
/// terminator the whole slice is consumed and the closing quote dropped.
pub fn decode_cstring(data: &[u8]) -> (String, usize)
{
    match data.iter().position(|&b| b == 0) {
        Some(nul) => (quote_string(&data[..nul]), nul + 1),
        None => {
            let mut quoted = quote_string(data);
            quoted.pop();
            (quoted, data.len())
        }
    }
}

/// Shortest round-trip float text in `%g` form: plain digits for decimal
/// exponents in `[-4, 6)`, otherwise `d.ddde±XX`.
pub fn format_float(value: f64, single: bool) -> String
{
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }

    let scientific = if single {
        format!("{:e}", value as f32)
    } else {
        format!("{value:e}")
    };
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let negative = mantissa.starts_with('-');
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let sign = if negative { "-" } else { "" };

    if exponent < -4 || exponent >= 6 {
        let (first, rest) = digits.split_at(1);
        let fraction = if rest.is_empty() { String::new() } else { format!(".{rest}") };
        let exp_sign = if exponent < 0 { '-' } else { '+' };
        return format!("{sign}{first}{fraction}e{exp_sign}{:02}", exponent.unsigned_abs());
    }

    let point = exponent + 1;
    let body = if point <= 0 {
        format!("0.{}{digits}", "0".repeat(point.unsigned_abs() as usize))
    } else if point as usize >= digits.len() {
        format!("{digits}{}", "0".repeat(point as usize - digits.len()))
    } else {
        let (int, frac) = digits.split_at(point as usize);
        format!("{int}.{frac}")
    };
    format!("{sign}{body}")
}

/// Read an unsigned integer of 1, 2, 4 or 8 bytes.
pub fn read_unsigned(data: &[u8], endian: RunTimeEndian) -> Option<u64>
{
    Some(match data.len() {
        1 => u64::from(data[0]),
        2 => u64::from(endian.read_u16(data)),
        4 => u64::from(endian.read_u32(data)),
        8 => endian.read_u64(data),
        _ => return None,
    })
}

/// Read a signed integer of 1, 2, 4 or 8 bytes.
pub fn read_signed(data: &[u8], endian: RunTimeEndian) -> Option<i64>
{
    Some(match data.len() {
        1 => i64::from(data[0] as i8),
        2 => i64::from(endian.read_i16(data)),
        4 => i64::from(endian.read_i32(data)),
        8 => endian.read_i64(data),
        _ => return None,
    })
}

/// `0x1f`, `-0x1f`
pub fn signed_hex_value(value: i64) -> String
{
    if value < 0 {
        format!("-{:#x}", value.unsigned_abs())
    } else {
        format!("{value:#x}")
    }
}

pub fn decode_float32(data: &[u8], endian: RunTimeEndian) -> String
{
    if data.len() != 4 {
        return String::new();
    }
    format_float(f64::from(endian.read_f32(data)), true)
}

pub fn decode_float64(data: &[u8], endian: RunTimeEndian) -> String
{
    if data.len() != 8 {
        return String::new();
    }
    format_float(endian.read_f64(data), false)
}
