//! Utility functions and types.

use std::fmt::Debug;

/// Redact wraps a secret so its Debug output leaks at most a few characters.
///
/// - Strings shorter than 12 characters are fully redacted.
/// - Longer strings keep the first and last three characters, which is
///   enough to tell two secrets apart without exposing either.
pub struct Redact<'a>(&'a str);

impl<'a> From<&'a str> for Redact<'a> {
    fn from(value: &'a str) -> Self {
        Redact(value)
    }
}

impl<'a> From<&'a String> for Redact<'a> {
    fn from(value: &'a String) -> Self {
        Redact(value.as_str())
    }
}

impl<'a> From<&'a Option<String>> for Redact<'a> {
    fn from(value: &'a Option<String>) -> Self {
        match value {
            None => Redact(""),
            Some(v) => Redact(v),
        }
    }
}

impl<'a> Debug for Redact<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Count chars, not bytes, so multi-byte secrets never split on a
        // non-boundary.
        let length = self.0.chars().count();
        if length == 0 {
            f.write_str("EMPTY")
        } else if length < 12 {
            f.write_str("***")
        } else {
            for c in self.0.chars().take(3) {
                write!(f, "{c}")?;
            }
            f.write_str("***")?;
            for c in self.0.chars().skip(length - 3) {
                write!(f, "{c}")?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact() {
        let cases = vec![
            ("", "EMPTY"),
            ("tiny", "***"),
            ("elevenchars", "***"),
            ("AKIDEXAMPLE.", "AKI***LE."),
            ("wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY", "wJa***KEY"),
            // Multi-byte characters near the cut points.
            ("pässwörd-pässwörd", "päs***örd"),
            ("日本語のひみつ", "***"),
        ];

        for (input, expected) in cases {
            assert_eq!(
                format!("{:?}", Redact(input)),
                expected,
                "failed on input: {input}",
            );
        }
    }
}
