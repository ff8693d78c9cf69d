use crate::constant::{MAX_FRACTION_DIGITS, MIN_FRACTION_DIGITS};

/// Raw token amount scaled to `MAX_FRACTION_DIGITS` fixed point, rounded half-up.
fn to_fixed_point(raw: u64, decimals: u8) -> u128 {
    let raw = u128::from(raw);
    let decimals = u32::from(decimals);
    if decimals <= MAX_FRACTION_DIGITS {
        return raw * 10u128.pow(MAX_FRACTION_DIGITS - decimals);
    }

    match 10u128.checked_pow(decimals - MAX_FRACTION_DIGITS) {
        Some(divisor) => (raw + divisor / 2) / divisor,
        // Larger than any u64 amount, rounds to zero.
        None => 0,
    }
}

fn group_thousands(value: u128) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Formats `raw / 10^decimals` the way an en-US locale does with two to
/// three fraction digits: `1,234.50`, `0.125`.
pub fn format_token_amount(raw: u64, decimals: u8) -> String {
    let scale = 10u128.pow(MAX_FRACTION_DIGITS);
    let fixed = to_fixed_point(raw, decimals);

    let mut fraction = format!(
        "{:0width$}",
        fixed % scale,
        width = MAX_FRACTION_DIGITS as usize
    );
    while fraction.len() > MIN_FRACTION_DIGITS && fraction.ends_with('0') {
        fraction.pop();
    }

    format!("{}.{}", group_thousands(fixed / scale), fraction)
}
