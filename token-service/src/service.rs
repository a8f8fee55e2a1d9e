use crate::{
    clock::Clock,
    error::{Result, TokenError},
    models::AccessToken,
};
use chrono::Duration;
use dashmap::DashMap;
use rand::{distributions::Alphanumeric, Rng};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

const SECRET_LEN: usize = 40;

/// Issues, validates and revokes family access tokens.
///
/// Validation and lookup are read-only and lock-free; revocation flips a
/// flag under the map's shard guard. Expiry is decided by comparison at
/// validation time, so no background sweeper exists.
pub struct TokenService {
    tokens: DashMap<Uuid, AccessToken>,
    /// secret -> token id
    by_secret: DashMap<String, Uuid>,
    clock: Arc<dyn Clock>,
    max_ttl: Duration,
}

impl TokenService {
    pub fn new(clock: Arc<dyn Clock>, max_ttl: Duration) -> Self {
        Self {
            tokens: DashMap::new(),
            by_secret: DashMap::new(),
            clock,
            max_ttl,
        }
    }

    /// Issue a token for `student_id` valid for `ttl` from now. The TTL is
    /// bounded: non-positive or above the configured maximum is rejected.
    /// Authorization of the issuer is the caller's responsibility (checked
    /// through the access engine before entry).
    pub fn issue(&self, student_id: Uuid, issued_by: Uuid, ttl: Duration) -> Result<AccessToken> {
        if ttl <= Duration::zero() {
            return Err(TokenError::InvalidTtl("ttl must be positive".into()));
        }
        if ttl > self.max_ttl {
            return Err(TokenError::InvalidTtl(format!(
                "ttl exceeds the configured maximum of {}s",
                self.max_ttl.num_seconds()
            )));
        }

        let now = self.clock.now();
        let token = AccessToken {
            id: Uuid::new_v4(),
            secret: generate_secret(),
            student_id,
            issued_by,
            issued_at: now,
            expires_at: now + ttl,
            revoked: false,
        };
        self.by_secret.insert(token.secret.clone(), token.id);
        self.tokens.insert(token.id, token.clone());
        info!(token_id = %token.id, student_id = %student_id, expires_at = %token.expires_at, "family token issued");
        Ok(token)
    }

    /// Validate a presented secret. Side-effect-free: the audit record of
    /// the attempt is the caller's job.
    pub fn validate(&self, secret: &str) -> Result<AccessToken> {
        let id = self
            .by_secret
            .get(secret)
            .map(|entry| *entry)
            .ok_or(TokenError::NotFound)?;
        let token = self.tokens.get(&id).ok_or(TokenError::NotFound)?;
        if token.revoked {
            return Err(TokenError::Revoked);
        }
        if self.clock.now() >= token.expires_at {
            return Err(TokenError::Expired);
        }
        Ok(token.clone())
    }

    /// Revoke by token id. Idempotent: revoking an already-revoked or
    /// expired token is a no-op success.
    pub fn revoke(&self, token_id: Uuid, revoked_by: Uuid) -> Result<()> {
        match self.tokens.get_mut(&token_id) {
            Some(mut token) => {
                if !token.revoked {
                    token.revoked = true;
                    info!(token_id = %token_id, revoked_by = %revoked_by, "family token revoked");
                } else {
                    debug!(token_id = %token_id, "revoke on already-revoked token; no-op");
                }
                Ok(())
            }
            None => Err(TokenError::NotFound),
        }
    }

    /// The regenerate flow: revoke every live token for the student, then
    /// issue a fresh one.
    pub fn reissue(&self, student_id: Uuid, issued_by: Uuid, ttl: Duration) -> Result<AccessToken> {
        for mut entry in self.tokens.iter_mut() {
            if entry.student_id == student_id && !entry.revoked {
                entry.revoked = true;
            }
        }
        self.issue(student_id, issued_by, ttl)
    }

    pub fn get(&self, token_id: Uuid) -> Option<AccessToken> {
        self.tokens.get(&token_id).map(|t| t.clone())
    }
}

fn generate_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SECRET_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::test_support::ManualClock;
    use chrono::Utc;

    fn service() -> (Arc<ManualClock>, TokenService) {
        let clock = Arc::new(ManualClock::starting_at(Utc::now()));
        let service = TokenService::new(clock.clone(), Duration::days(30));
        (clock, service)
    }

    #[test]
    fn ttl_bounds_are_enforced() {
        let (_clock, service) = service();
        let student = Uuid::new_v4();
        let issuer = Uuid::new_v4();

        assert!(matches!(
            service.issue(student, issuer, Duration::zero()),
            Err(TokenError::InvalidTtl(_))
        ));
        assert!(matches!(
            service.issue(student, issuer, Duration::seconds(-5)),
            Err(TokenError::InvalidTtl(_))
        ));
        // Exactly at the maximum succeeds; one second past fails.
        assert!(service.issue(student, issuer, Duration::days(30)).is_ok());
        assert!(matches!(
            service.issue(student, issuer, Duration::days(30) + Duration::seconds(1)),
            Err(TokenError::InvalidTtl(_))
        ));
    }

    #[test]
    fn validation_follows_absolute_expiry() {
        let (clock, service) = service();
        let student = Uuid::new_v4();
        let token = service
            .issue(student, Uuid::new_v4(), Duration::seconds(60))
            .unwrap();

        clock.advance(Duration::seconds(59));
        let validated = service.validate(&token.secret).unwrap();
        assert_eq!(validated.student_id, student);

        clock.advance(Duration::seconds(2));
        assert_eq!(service.validate(&token.secret), Err(TokenError::Expired));
    }

    #[test]
    fn unknown_secret_is_not_found() {
        let (_clock, service) = service();
        assert_eq!(service.validate("nope"), Err(TokenError::NotFound));
    }

    #[test]
    fn revoke_is_idempotent_and_terminal() {
        let (_clock, service) = service();
        let revoker = Uuid::new_v4();
        let token = service
            .issue(Uuid::new_v4(), Uuid::new_v4(), Duration::seconds(60))
            .unwrap();

        service.revoke(token.id, revoker).unwrap();
        service.revoke(token.id, revoker).unwrap();
        assert_eq!(service.validate(&token.secret), Err(TokenError::Revoked));
        assert_eq!(service.validate(&token.secret), Err(TokenError::Revoked));
    }

    #[test]
    fn revoking_an_expired_token_is_a_noop_success() {
        let (clock, service) = service();
        let token = service
            .issue(Uuid::new_v4(), Uuid::new_v4(), Duration::seconds(10))
            .unwrap();
        clock.advance(Duration::seconds(20));
        service.revoke(token.id, Uuid::new_v4()).unwrap();
    }

    #[test]
    fn reissue_revokes_prior_live_tokens() {
        let (_clock, service) = service();
        let student = Uuid::new_v4();
        let issuer = Uuid::new_v4();

        let first = service.issue(student, issuer, Duration::seconds(60)).unwrap();
        let second = service.reissue(student, issuer, Duration::seconds(60)).unwrap();

        assert_eq!(service.validate(&first.secret), Err(TokenError::Revoked));
        assert!(service.validate(&second.secret).is_ok());
    }

    #[test]
    fn secrets_are_long_and_distinct() {
        let (_clock, service) = service();
        let a = service
            .issue(Uuid::new_v4(), Uuid::new_v4(), Duration::seconds(60))
            .unwrap();
        let b = service
            .issue(Uuid::new_v4(), Uuid::new_v4(), Duration::seconds(60))
            .unwrap();
        assert_eq!(a.secret.len(), 40);
        assert_ne!(a.secret, b.secret);
    }
}
