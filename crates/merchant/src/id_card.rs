//! Resident identity number check (GB 11643-1999, 18-character form).

use chrono::{Datelike, NaiveDate};

const WEIGHTS: [u32; 17] = [7, 9, 10, 5, 8, 4, 2, 1, 6, 3, 7, 9, 10, 5, 8, 4, 2];
const CHECK_CHARS: [char; 11] = ['1', '0', 'X', '9', '8', '7', '6', '5', '4', '3', '2'];

/// Whether `id` is a syntactically valid 18-character resident identity
/// number: 17 digits, a valid birth date in positions 7-14 and a matching
/// check character (`X` accepted in either case).
pub fn is_valid_resident_id(id: &str) -> bool {
    let id = id.trim();
    if id.len() != 18 || !id.is_ascii() {
        return false;
    }
    let (body, check) = id.split_at(17);

    let mut sum = 0u32;
    for (c, w) in body.chars().zip(WEIGHTS) {
        match c.to_digit(10) {
            Some(d) => sum += d * w,
            None => return false,
        }
    }

    if !has_valid_birth_date(&body[6..14]) {
        return false;
    }

    let expected = CHECK_CHARS[(sum % 11) as usize];
    check
        .chars()
        .next()
        .is_some_and(|c| c.to_ascii_uppercase() == expected)
}

fn has_valid_birth_date(yyyymmdd: &str) -> bool {
    NaiveDate::parse_from_str(yyyymmdd, "%Y%m%d").is_ok_and(|d| d.year() >= 1900)
}
