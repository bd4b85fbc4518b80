//! Number formatting that hides floating-point noise.
//!
//! Values are rounded half-up on their shortest decimal representation: magnitudes of
//! at least one keep 12 decimal places, smaller magnitudes keep 12 significant digits.
//! Trailing zeros are stripped and the result never uses exponent notation, so a value
//! that went through a unit round-trip prints the same as the value it started from.

const DECIMAL_PLACES: i32 = 12;
const SIGNIFICANT_DIGITS: i32 = 12;

pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let (negative, mut digits, mut exponent) = decompose(value);

    // Number of leading significant digits to keep.
    let keep = if value.abs() >= 1.0 {
        exponent + 1 + DECIMAL_PLACES
    } else {
        SIGNIFICANT_DIGITS
    };

    if keep >= 0 && (keep as usize) < digits.len() {
        let round_up = digits[keep as usize] >= 5;
        digits.truncate(keep as usize);
        if round_up && increment(&mut digits) {
            digits.insert(0, 1);
            exponent += 1;
        }
    }

    while digits.len() > 1 && digits.last() == Some(&0) {
        digits.pop();
    }

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&render_plain(&digits, exponent));
    out
}

/// Splits a finite, non-zero value into its shortest round-trip decimal digits and the
/// power of ten of the first digit.
fn decompose(value: f64) -> (bool, Vec<u8>, i32) {
    // `{:e}` yields the shortest representation, e.g. `-1.2345e3`.
    let sci = format!("{:e}", value);
    let (negative, body) = match sci.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, sci.as_str()),
    };
    let (mantissa, exp) = body.split_once('e').unwrap_or((body, "0"));
    let exponent = exp.parse::<i32>().unwrap_or(0);
    let digits = mantissa
        .bytes()
        .filter(u8::is_ascii_digit)
        .map(|b| b - b'0')
        .collect();
    (negative, digits, exponent)
}

/// Adds one to the last digit. Returns true when the carry runs off the front.
fn increment(digits: &mut [u8]) -> bool {
    for d in digits.iter_mut().rev() {
        if *d == 9 {
            *d = 0;
        } else {
            *d += 1;
            return false;
        }
    }
    true
}

fn render_plain(digits: &[u8], exponent: i32) -> String {
    let text: String = digits.iter().map(|d| char::from(b'0' + d)).collect();
    if exponent < 0 {
        let zeros = "0".repeat((-exponent - 1) as usize);
        return format!("0.{}{}", zeros, text);
    }

    let int_len = exponent as usize + 1;
    if text.len() <= int_len {
        format!("{}{}", text, "0".repeat(int_len - text.len()))
    } else {
        format!("{}.{}", &text[..int_len], &text[int_len..])
    }
}
