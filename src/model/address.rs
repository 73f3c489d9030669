//! Sender header parsing.

/// A parsed email address.
///
/// # Examples
/// - `"MoMo <no-reply@momo.vn>"` → `display_name = "MoMo"`, `address = "no-reply@momo.vn"`
/// - `"no-reply@momo.vn"` → `display_name = ""`, `address = "no-reply@momo.vn"`
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct EmailAddress {
    /// Human-readable display name (may be empty).
    pub display_name: String,
    /// The bare email address (`user@domain`).
    pub address: String,
}

impl EmailAddress {
    /// Parse a single email address from a header value.
    ///
    /// Supported formats:
    /// - `"user@domain.com"`
    /// - `"<user@domain.com>"`
    /// - `"Display Name <user@domain.com>"`
    /// - `"\"Display, Name\" <user@domain.com>"`
    ///
    /// If parsing fails, the raw string is stored as `address`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();

        if let Some(angle_start) = trimmed.rfind('<') {
            if let Some(angle_end) = trimmed.rfind('>') {
                if angle_end > angle_start {
                    let address = trimmed[angle_start + 1..angle_end].trim().to_string();
                    let display_name = strip_quotes(&trimmed[..angle_start]);
                    return Self {
                        display_name,
                        address,
                    };
                }
            }
        }

        Self {
            display_name: String::new(),
            address: trimmed.to_string(),
        }
    }

    /// Case-insensitive comparison of the bare address against `expected`.
    pub fn is(&self, expected: &str) -> bool {
        !self.address.is_empty() && self.address.eq_ignore_ascii_case(expected.trim())
    }

    /// Format for display: `"Display Name <address>"` or just `"address"`.
    pub fn display(&self) -> String {
        if self.display_name.is_empty() {
            self.address.clone()
        } else {
            format!("{} <{}>", self.display_name, self.address)
        }
    }
}

/// Strip surrounding double-quotes and trim whitespace.
fn strip_quotes(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_address() {
        let addr = EmailAddress::parse("no-reply@momo.vn");
        assert_eq!(addr.address, "no-reply@momo.vn");
        assert_eq!(addr.display_name, "");
    }

    #[test]
    fn test_parse_name_and_address() {
        let addr = EmailAddress::parse("Vi MoMo <no-reply@momo.vn>");
        assert_eq!(addr.address, "no-reply@momo.vn");
        assert_eq!(addr.display_name, "Vi MoMo");
    }

    #[test]
    fn test_parse_quoted_name() {
        let addr = EmailAddress::parse("\"MoMo, Payments\" <no-reply@momo.vn>");
        assert_eq!(addr.display_name, "MoMo, Payments");
        assert_eq!(addr.address, "no-reply@momo.vn");
    }

    #[test]
    fn test_is_case_insensitive() {
        let addr = EmailAddress::parse("MoMo <No-Reply@MoMo.vn>");
        assert!(addr.is("no-reply@momo.vn"));
        assert!(!addr.is("support@momo.vn"));
    }

    #[test]
    fn test_empty_never_matches() {
        assert!(!EmailAddress::parse("").is(""));
    }

    #[test]
    fn test_display() {
        let addr = EmailAddress::parse("MoMo <no-reply@momo.vn>");
        assert_eq!(addr.to_string(), "MoMo <no-reply@momo.vn>");
    }
}
