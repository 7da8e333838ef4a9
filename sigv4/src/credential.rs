use awsauth_core::time::{now, DateTime};
use awsauth_core::utils::Redact;
use awsauth_core::SigningCredential;
use std::fmt::{Debug, Formatter};

/// Credential that holds the access key and secret key.
#[derive(Default, Clone, PartialEq, Eq, Hash)]
pub struct Credential {
    /// Access key id for aws services.
    pub access_key_id: String,
    /// Secret access key for aws services.
    pub secret_access_key: String,
    /// Session token for aws services.
    pub session_token: Option<String>,
    /// Expiration time for this credential.
    pub expires_in: Option<DateTime>,
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_key_id", &Redact::from(&self.access_key_id))
            .field("secret_access_key", &Redact::from(&self.secret_access_key))
            .field("session_token", &Redact::from(&self.session_token))
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

impl SigningCredential for Credential {
    fn is_valid(&self) -> bool {
        if self.access_key_id.is_empty() || self.secret_access_key.is_empty() {
            return false;
        }
        // Take 120s as buffer to avoid edge cases.
        if let Some(valid) = self
            .expires_in
            .map(|v| v > now() + chrono::TimeDelta::try_minutes(2).expect("in bounds"))
        {
            return valid;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid() {
        let cred = Credential {
            access_key_id: "ak".to_string(),
            secret_access_key: "sk".to_string(),
            ..Default::default()
        };
        assert!(cred.is_valid());

        let empty = Credential::default();
        assert!(!empty.is_valid());

        let expiring = Credential {
            expires_in: Some(now() + chrono::TimeDelta::try_seconds(60).unwrap()),
            ..cred.clone()
        };
        assert!(!expiring.is_valid());

        let fresh = Credential {
            expires_in: Some(now() + chrono::TimeDelta::try_hours(1).unwrap()),
            ..cred
        };
        assert!(fresh.is_valid());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let cred = Credential {
            access_key_id: "AKIDEXAMPLEKEYID".to_string(),
            secret_access_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string(),
            session_token: Some("short".to_string()),
            expires_in: None,
        };

        let out = format!("{cred:?}");
        assert!(!out.contains("wJalrXUtnFEMI"));
        assert!(out.contains("AKI***YID"));
    }
}
