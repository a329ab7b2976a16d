//! Check-digit rules for the 11-digit Turkish national identity number (TC Kimlik No).
//!
//! The tenth digit is `(7 * (d1 + d3 + d5 + d7 + d9) - (d2 + d4 + d6 + d8)) mod 10` and the
//! eleventh is the sum of the first ten digits mod 10 (1-based positions). The first digit is
//! never zero.

pub const LENGTH: usize = 11;

/// Returns `true` when `candidate` is exactly 11 ASCII digits satisfying both check digits.
pub fn is_valid(candidate: &str) -> bool {
    let Some(digits) = parse_digits(candidate) else {
        return false;
    };

    if digits[0] == 0 {
        return false;
    }

    if tenth_digit(&digits[..9]) != digits[9] {
        return false;
    }

    eleventh_digit(&digits[..10]) == digits[10]
}

/// Appends both check digits to a 9-digit prefix, producing a valid identity number.
pub fn complete(prefix: &str) -> Option<String> {
    let bytes = prefix.as_bytes();
    if bytes.len() != 9 || bytes[0] == b'0' || !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }

    let mut digits: Vec<u8> = bytes.iter().map(|byte| byte - b'0').collect();
    digits.push(tenth_digit(&digits));
    digits.push(eleventh_digit(&digits));

    Some(digits.iter().map(|digit| char::from(b'0' + digit)).collect())
}

fn parse_digits(candidate: &str) -> Option<[u8; LENGTH]> {
    let bytes = candidate.as_bytes();
    if bytes.len() != LENGTH {
        return None;
    }

    let mut digits = [0u8; LENGTH];
    for (slot, byte) in digits.iter_mut().zip(bytes) {
        if !byte.is_ascii_digit() {
            return None;
        }
        *slot = byte - b'0';
    }
    Some(digits)
}

fn tenth_digit(first_nine: &[u8]) -> u8 {
    let odd: i32 = first_nine.iter().step_by(2).map(|&d| i32::from(d)).sum();
    let even: i32 = first_nine.iter().skip(1).step_by(2).map(|&d| i32::from(d)).sum();
    // 7 * odd can fall below even, so the remainder must be Euclidean.
    (7 * odd - even).rem_euclid(10) as u8
}

fn eleventh_digit(first_ten: &[u8]) -> u8 {
    let total: u32 = first_ten.iter().map(|&d| u32::from(d)).sum();
    (total % 10) as u8
}
