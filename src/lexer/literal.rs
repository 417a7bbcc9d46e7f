use std::{error::Error, fmt, num::ParseIntError};

/// Error parsing a numeric literal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LiteralError {
    /// A leading `0` followed by something other than `x`, `o` or `b`.
    InvalidPrefix { prefix: String },
    /// Digits do not form a valid number in the selected base.
    Malformed { radix: u32, error: ParseIntError },
}

impl Error for LiteralError {}

impl fmt::Display for LiteralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPrefix { prefix } => {
                write!(f, "invalid number literal prefix `{}`", prefix)
            }
            Self::Malformed { radix, error } => {
                write!(f, "invalid base-{} number literal: {}", radix, error)
            }
        }
    }
}

/// Parse an integer literal. `0x`, `0o` and `0b` select hex, octal and binary, anything
/// else is read as decimal.
pub fn parse_number(literal: &str) -> Result<i64, LiteralError> {
    let (radix, digits) = split_radix(literal)?;
    i64::from_str_radix(digits, radix).map_err(|error| LiteralError::Malformed { radix, error })
}

fn split_radix(literal: &str) -> Result<(u32, &str), LiteralError> {
    let mut chars = literal.chars();
    if literal.len() < 2 || chars.next() != Some('0') {
        return Ok((10, literal));
    }
    let radix = match chars.next() {
        Some('x') => 16,
        Some('o') => 8,
        Some('b') => 2,
        _ => {
            return Err(LiteralError::InvalidPrefix {
                prefix: literal.chars().take(2).collect(),
            })
        }
    };
    Ok((radix, &literal[2..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bases() {
        #[rustfmt::skip]
        let cases = [
            ("42", 42), ("0", 0), ("-7", -7),
            ("0x1F", 31), ("0xff", 255),
            ("0o17", 15),
            ("0b101", 5),
            ("0x-5", -5),
        ];
        for (input, expected) in cases {
            assert_eq!(parse_number(input), Ok(expected), "parse_number({input:?})");
        }
    }

    #[test]
    fn invalid_prefix() {
        for input in ["0z9", "07", "00", "0X1F"] {
            assert!(
                matches!(parse_number(input), Err(LiteralError::InvalidPrefix { .. })),
                "parse_number({input:?}) should reject the prefix"
            );
        }
    }

    #[test]
    fn malformed_digits() {
        for input in ["", "abc", "0x", "0xg", "0o8", "0b102", "1_000", "99999999999999999999"] {
            assert!(
                matches!(parse_number(input), Err(LiteralError::Malformed { .. })),
                "parse_number({input:?}) should be malformed"
            );
        }
    }

    #[test]
    fn display() {
        let err = parse_number("0z9").unwrap_err();
        assert_eq!(err.to_string(), "invalid number literal prefix `0z`");
        let err = parse_number("0b2").unwrap_err();
        assert!(err.to_string().starts_with("invalid base-2 number literal"));
    }
}
