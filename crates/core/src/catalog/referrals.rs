//! Referral program levels.

use serde::Serialize;

use crate::IdentityId;

/// Commission paid for referrals at a given depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReferralLevel {
    pub level: u8,
    pub commission_percent: u32,
}

/// Direct referrals earn 5%, second level 3%, third level 1%.
pub const REFERRAL_LEVELS: [ReferralLevel; 3] = [
    ReferralLevel {
        level: 1,
        commission_percent: 5,
    },
    ReferralLevel {
        level: 2,
        commission_percent: 3,
    },
    ReferralLevel {
        level: 3,
        commission_percent: 1,
    },
];

/// Shareable sign-up link for `identity`.
#[must_use]
pub fn referral_link(base_url: &str, identity: &IdentityId) -> String {
    format!(
        "{}/ref/{}",
        base_url.trim_end_matches('/'),
        urlencode_path_segment(identity.as_str())
    )
}

fn urlencode_path_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes()).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_referral_link() {
        let id = IdentityId::parse("user_2abc").unwrap();
        assert_eq!(
            referral_link("https://securemonance.com/", &id),
            "https://securemonance.com/ref/user_2abc"
        );
    }

    #[test]
    fn test_referral_link_escapes_identity() {
        let id = IdentityId::parse("auth0|abc").unwrap();
        assert_eq!(
            referral_link("https://securemonance.com", &id),
            "https://securemonance.com/ref/auth0%7Cabc"
        );
    }
}
