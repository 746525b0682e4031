//! Session state and the demo bearer-token format.
//!
//! Tokens look like `token_<issued-at-millis>_<random>`. Validity is decided
//! purely from the embedded timestamp: a token is accepted while it is
//! younger than `TOKEN_TTL`. This is a placeholder check and carries no
//! cryptographic meaning.

use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use crate::types::User;

pub const TOKEN_PREFIX: &str = "token";

/// Lifetime of an issued token.
pub fn token_ttl() -> Duration {
    Duration::hours(24)
}

/// `expiresIn` reported by login, in seconds.
pub const TOKEN_TTL_SECS: u64 = 24 * 60 * 60;

/// Mint a token stamped with `issued_at`.
pub fn issue_token(issued_at: DateTime<Utc>) -> String {
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(9).collect();
    format!("{TOKEN_PREFIX}_{}_{suffix}", issued_at.timestamp_millis())
}

/// Creation time embedded in `token`, if it has the expected shape.
pub fn token_issued_at(token: &str) -> Option<DateTime<Utc>> {
    let mut parts = token.split('_');
    let (Some(prefix), Some(millis), Some(_), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };
    if prefix != TOKEN_PREFIX {
        return None;
    }
    let millis: i64 = millis.parse().ok()?;
    Utc.timestamp_millis_opt(millis).single()
}

pub fn is_token_valid(token: &str, now: DateTime<Utc>) -> bool {
    token_issued_at(token).is_some_and(|issued| now - issued < token_ttl())
}

/// The two session states.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Session {
    #[default]
    Anonymous,
    Authenticated { token: String, user: User },
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Session::Authenticated { .. })
    }

    pub fn token(&self) -> Option<&str> {
        match self {
            Session::Authenticated { token, .. } => Some(token),
            Session::Anonymous => None,
        }
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Session::Authenticated { user, .. } => Some(user),
            Session::Anonymous => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    #[test]
    fn issued_token_round_trips_its_timestamp() {
        let issued = at(1_705_300_000_000);
        let token = issue_token(issued);
        assert!(token.starts_with("token_1705300000000_"));
        assert_eq!(token.rsplit('_').next().unwrap().len(), 9);
        assert_eq!(token_issued_at(&token), Some(issued));
    }

    #[test]
    fn token_expires_after_a_day() {
        let issued = at(1_705_300_000_000);
        let token = issue_token(issued);
        assert!(is_token_valid(&token, issued + Duration::hours(23)));
        assert!(!is_token_valid(&token, issued + Duration::hours(24)));
        assert!(!is_token_valid(&token, issued + Duration::hours(24) + Duration::seconds(1)));
    }

    #[test]
    fn malformed_tokens_are_invalid() {
        let now = at(1_705_300_000_000);
        for token in ["", "token", "token_abc_x", "bearer_1705300000000_x", "token_1_x_y"] {
            assert!(!is_token_valid(token, now), "{token}");
        }
    }
}
