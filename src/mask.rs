//! Masking of personal data inside log strings.
//!
//! Each pattern runs as its own pass over the input and returns a new string;
//! text without a match comes back unchanged. Word boundaries are ASCII-only,
//! so a non-ASCII letter next to a match does not shield it.
//!
//! Masking is not idempotent for phone numbers: a `0` kept in the unmasked
//! tail can start a new match on a second pass.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Character used in place of redacted characters.
pub const MASK_CHAR: char = 'X';

/// Phone numbers: a Swedish country code or trunk zero followed by 9-12
/// digits, spaces or dashes.
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\+46|0)[0-9\s-]{9,12}").expect("valid phone pattern"));

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?-u:\b)[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}(?-u:\b)")
        .expect("valid email pattern")
});

/// Swedish personal identity numbers in the YYYYMMDDXXXX form.
static SSN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?-u:\b)[0-9]{12}(?-u:\b)").expect("valid ssn pattern"));

static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}(T[0-9]{2}:[0-9]{2}:[0-9]{2}Z)?$|^[0-9]{8}$")
        .expect("valid date pattern")
});

/// A compiled pattern paired with the function that masks one match.
pub struct MaskPattern {
    pub name: &'static str,
    regex: &'static Lazy<Regex>,
    mask: fn(&str) -> String,
}

impl MaskPattern {
    /// Mask every non-overlapping match in `input`.
    pub fn apply(&self, input: &str) -> String {
        let regex: &Regex = self.regex;
        regex
            .replace_all(input, |caps: &Captures<'_>| (self.mask)(&caps[0]))
            .into_owned()
    }

    pub fn is_match(&self, input: &str) -> bool {
        let regex: &Regex = self.regex;
        regex.is_match(input)
    }
}

pub static PHONE: MaskPattern = MaskPattern {
    name: "phone",
    regex: &PHONE_RE,
    mask: mask_phone_match,
};

pub static EMAIL: MaskPattern = MaskPattern {
    name: "email",
    regex: &EMAIL_RE,
    mask: mask_email_match,
};

pub static SSN: MaskPattern = MaskPattern {
    name: "ssn",
    regex: &SSN_RE,
    mask: mask_ssn_match,
};

/// Mask phone numbers, keeping the first and last three digits and the
/// original separators. Dates and numbers of eight characters or fewer are
/// left alone.
pub fn mask_phone(input: &str) -> String {
    PHONE.apply(input)
}

/// Mask the local part of e-mail addresses, keeping its first and last
/// character when it is longer than two. The domain is kept.
pub fn mask_email(input: &str) -> String {
    EMAIL.apply(input)
}

/// Mask the birth-date part of 12-digit personal identity numbers, keeping
/// the last four digits.
pub fn mask_ssn(input: &str) -> String {
    SSN.apply(input)
}

/// Replace every occurrence of `to_mask` with a mask of the same length.
pub fn mask_string(input: &str, to_mask: &str) -> String {
    if to_mask.is_empty() {
        return input.to_string();
    }
    input.replace(to_mask, &mask(to_mask.chars().count()))
}

/// Run the SSN, phone and email passes one after another.
pub fn mask_pii(input: &str) -> String {
    [&SSN, &PHONE, &EMAIL]
        .iter()
        .fold(input.to_string(), |text, pattern| pattern.apply(&text))
}

/// `YYYY-MM-DD`, `YYYY-MM-DDThh:mm:ssZ` or `YYYYMMDD`, matched against the
/// whole token.
pub fn is_date_like(token: &str) -> bool {
    DATE_RE.is_match(token)
}

fn mask(len: usize) -> String {
    std::iter::repeat(MASK_CHAR).take(len).collect()
}

fn is_separator(c: char) -> bool {
    c == '-' || c.is_whitespace()
}

fn mask_phone_match(phone: &str) -> String {
    let plain: Vec<char> = phone.chars().filter(|c| !is_separator(*c)).collect();
    let plain_str: String = plain.iter().collect();

    if is_date_like(&plain_str) || plain.len() <= 8 {
        return phone.to_string();
    }

    let keep_tail = plain.len() - 3;
    let mut digits = plain.iter().enumerate().map(|(i, c)| {
        if i < 3 || i >= keep_tail {
            *c
        } else {
            MASK_CHAR
        }
    });

    phone
        .chars()
        .map(|c| {
            if is_separator(c) {
                c
            } else {
                digits.next().unwrap_or(c)
            }
        })
        .collect()
}

fn mask_email_match(email: &str) -> String {
    let Some((local, domain)) = email.split_once('@') else {
        return email.to_string();
    };
    let len = local.chars().count();
    if len > 2 {
        let first = &local[..1];
        let last = &local[local.len() - 1..];
        format!("{}{}{}@{}", first, mask(len - 2), last, domain)
    } else {
        format!("{}@{}", mask(len), domain)
    }
}

fn mask_ssn_match(ssn: &str) -> String {
    format!("{}{}", mask(8), &ssn[8..])
}
