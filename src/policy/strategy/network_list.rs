//! Forwarded-address list check.
//!
//! # Responsibilities
//! - Split a list header (e.g. `X-Forwarded-For`) into addresses
//! - Drop addresses that belong to trusted networks (own proxies, LBs)
//! - Require exactly one survivor and test it against the target network
//!
//! # Design Decisions
//! - Any unparsable entry rejects the whole list
//! - IPv4-mapped IPv6 entries (`::ffff:a.b.c.d`) are matched as IPv4
//! - Zero and several survivors are the same failure
//! - Deadline checked per entry to bound very long lists

use std::net::IpAddr;

use ipnet::IpNet;

use crate::policy::context::CheckContext;
use crate::policy::error::AuthorizationError;

#[derive(Debug, Clone)]
pub struct NetworkList {
    target: IpNet,
    trusted: Vec<IpNet>,
    separator: String,
    reverse: bool,
}

impl NetworkList {
    pub fn new(target: IpNet, trusted: Vec<IpNet>, separator: impl Into<String>, reverse: bool) -> Self {
        Self {
            target,
            trusted,
            separator: separator.into(),
            reverse,
        }
    }

    pub fn check(&self, value: &str, ctx: &CheckContext) -> Result<bool, AuthorizationError> {
        let mut survivor: Option<IpAddr> = None;
        let mut survivors = 0usize;

        for entry in value.split(self.separator.as_str()) {
            ctx.ensure_within_deadline()?;

            let entry = entry.trim();
            let addr = entry
                .parse::<IpAddr>()
                .map_err(|_| AuthorizationError::InvalidAddress(entry.to_string()))?
                .to_canonical();

            if self.trusted.iter().any(|net| net.contains(&addr)) {
                continue;
            }

            survivors += 1;
            survivor = Some(addr);
        }

        match survivor {
            Some(addr) if survivors == 1 => Ok(self.target.contains(&addr) != self.reverse),
            _ => Err(AuthorizationError::AmbiguousList),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn list(reverse: bool) -> NetworkList {
        NetworkList::new(
            "192.168.1.0/24".parse().unwrap(),
            vec!["10.0.0.0/8".parse().unwrap()],
            ",",
            reverse,
        )
    }

    #[test]
    fn test_single_untrusted_entry_in_target() {
        let ctx = CheckContext::at(0);
        assert_eq!(list(false).check("10.1.2.3, 192.168.1.5", &ctx), Ok(true));
        assert_eq!(list(true).check("10.1.2.3, 192.168.1.5", &ctx), Ok(false));
    }

    #[test]
    fn test_single_entry_outside_target() {
        let ctx = CheckContext::at(0);
        assert_eq!(list(false).check("172.16.0.1,10.9.9.9", &ctx), Ok(false));
        assert_eq!(list(true).check("172.16.0.1,10.9.9.9", &ctx), Ok(true));
    }

    #[test]
    fn test_all_trusted_is_ambiguous() {
        assert_eq!(
            list(false).check("10.1.2.3, 10.1.2.4", &CheckContext::at(0)),
            Err(AuthorizationError::AmbiguousList)
        );
    }

    #[test]
    fn test_several_untrusted_is_ambiguous() {
        assert_eq!(
            list(false).check("192.168.1.5, 192.168.1.6", &CheckContext::at(0)),
            Err(AuthorizationError::AmbiguousList)
        );
    }

    #[test]
    fn test_invalid_entry() {
        assert_eq!(
            list(false).check("192.168.1.5, not-an-ip", &CheckContext::at(0)),
            Err(AuthorizationError::InvalidAddress("not-an-ip".to_string()))
        );
    }

    #[test]
    fn test_mapped_trusted_entry_is_filtered() {
        assert_eq!(
            list(false).check("::ffff:10.1.2.3, 192.168.1.5", &CheckContext::at(0)),
            Ok(true)
        );
    }

    #[test]
    fn test_mapped_entry_matches_ipv4_target() {
        let ctx = CheckContext::at(0);
        assert_eq!(list(false).check("::ffff:192.168.1.5", &ctx), Ok(true));
        assert_eq!(list(true).check("::ffff:192.168.1.5", &ctx), Ok(false));
        assert_eq!(list(false).check("::ffff:172.16.0.1", &ctx), Ok(false));
    }

    #[test]
    fn test_ipv6_and_custom_separator() {
        let nl = NetworkList::new(
            "2001:db8::/32".parse().unwrap(),
            vec!["fd00::/8".parse().unwrap()],
            ";",
            false,
        );
        assert_eq!(nl.check("fd00::1; 2001:db8::7", &CheckContext::at(0)), Ok(true));
    }

    #[test]
    fn test_deadline_stops_evaluation() {
        let ctx = CheckContext::at(0).with_deadline(Instant::now());
        assert_eq!(
            list(false).check("192.168.1.5", &ctx),
            Err(AuthorizationError::DeadlineExceeded)
        );
    }
}
