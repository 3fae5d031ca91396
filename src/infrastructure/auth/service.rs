//! Authentication service
//!
//! Orchestrates the password login path, the OTP challenge lifecycle and
//! bearer-session validation over the stores and the external gateway.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::domain::account::{
    Account, AccountId, AccountRepository, LoginIdentifier, Member, MemberId, MemberWithAccount,
    normalize_phone,
};
use crate::domain::clock::Clock;
use crate::domain::otp::{
    AuthStore, ChallengeId, OtpChallengeRepository, OtpChannel, OtpGateway,
};
use crate::domain::session::{NewSession, Session, SessionRepository};
use crate::domain::{sort_team_choices, AuthError, TeamChoice};
use crate::infrastructure::password::PasswordHasher;
use crate::infrastructure::token::{SessionPolicy, SessionTokenCodec};

/// Default time-to-live for a pending OTP challenge
pub const DEFAULT_OTP_TTL_MINUTES: i64 = 5;

/// Session collisions are practically unreachable, so one regeneration is
/// plenty before giving up.
const TOKEN_RETRIES: usize = 2;

/// Everything the service needs; wired once at startup
pub struct AuthServiceDeps {
    pub accounts: Arc<dyn AccountRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub challenges: Arc<dyn OtpChallengeRepository>,
    pub store: Arc<dyn AuthStore>,
    pub gateway: Arc<dyn OtpGateway>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub clock: Arc<dyn Clock>,
    pub session_policy: SessionPolicy,
    pub otp_ttl: Duration,
}

/// Result of a successful login (password or OTP path)
///
/// `token` is the only copy of the raw bearer token that will ever exist.
#[derive(Debug, Clone)]
pub struct LoginGrant {
    pub token: String,
    pub session: Session,
    pub account: Account,
    pub member: Member,
}

/// Opaque handle handed back from `request_otp`
#[derive(Debug, Clone)]
pub struct IssuedChallenge {
    pub challenge_id: ChallengeId,
    pub expires_at: DateTime<Utc>,
}

/// A validated bearer session with its resolved account and member
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub session: Session,
    pub account: Account,
    pub member: Option<Member>,
}

/// Auth service orchestrating login, OTP and session validation
pub struct AuthService {
    accounts: Arc<dyn AccountRepository>,
    sessions: Arc<dyn SessionRepository>,
    challenges: Arc<dyn OtpChallengeRepository>,
    store: Arc<dyn AuthStore>,
    gateway: Arc<dyn OtpGateway>,
    hasher: Arc<dyn PasswordHasher>,
    clock: Arc<dyn Clock>,
    session_policy: SessionPolicy,
    tokens: SessionTokenCodec,
    otp_ttl: Duration,
}

impl AuthService {
    pub fn new(deps: AuthServiceDeps) -> Self {
        Self {
            accounts: deps.accounts,
            sessions: deps.sessions,
            challenges: deps.challenges,
            store: deps.store,
            gateway: deps.gateway,
            hasher: deps.hasher,
            clock: deps.clock,
            session_policy: deps.session_policy,
            tokens: SessionTokenCodec::new(),
            otp_ttl: deps.otp_ttl,
        }
    }

    // ------------------------------------------------------------------
    // Password path
    // ------------------------------------------------------------------

    /// Log in with an identifier (email, phone or team name) and password.
    ///
    /// Candidates are checked in ascending account-id order and the first
    /// password match wins. Unknown identifier and wrong password collapse
    /// into the same `InvalidCredentials` so callers cannot enumerate
    /// accounts.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<LoginGrant, AuthError> {
        let Some(parsed) = LoginIdentifier::parse(identifier) else {
            return Err(AuthError::validation("Please enter username and password."));
        };
        if password.is_empty() {
            return Err(AuthError::validation("Please enter username and password."));
        }

        let candidates = self.login_candidates(identifier, &parsed).await?;
        if candidates.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        for candidate in &candidates {
            if self
                .hasher
                .verify(password, &candidate.account.password)
            {
                info!(account_id = candidate.account.id, "Password login succeeded");
                let (token, session) = self
                    .issue_session(candidate.account.id, Some(candidate.member.id))
                    .await?;

                return Ok(LoginGrant {
                    token,
                    session,
                    account: candidate.account.clone(),
                    member: candidate.member.clone(),
                });
            }
        }

        debug!("Password login failed for all candidates");
        Err(AuthError::InvalidCredentials)
    }

    /// Gather login candidates. An identifier without '@' matches member
    /// phones (digits-only) and, additionally, an exact team name, so teams
    /// can log in with the name they registered under.
    async fn login_candidates(
        &self,
        raw: &str,
        parsed: &LoginIdentifier,
    ) -> Result<Vec<MemberWithAccount>, AuthError> {
        let mut candidates = match parsed {
            LoginIdentifier::Email(email) => self.accounts.find_members_by_email(email).await?,
            LoginIdentifier::Phone(phone) => {
                let mut found = self.accounts.find_members_by_phone(phone).await?;
                found.extend(self.accounts.find_members_by_username(raw.trim()).await?);
                found
            }
        };

        candidates.sort_by_key(|c| (c.account.id, c.member.id));
        candidates.dedup_by_key(|c| c.member.id);

        Ok(candidates)
    }

    // ------------------------------------------------------------------
    // OTP path
    // ------------------------------------------------------------------

    /// Request a one-time passcode for an identifier on a channel.
    ///
    /// On a unique match the code is dispatched first; only then are older
    /// pending challenges superseded and the fresh one inserted, atomically.
    /// A dispatch failure therefore leaves earlier challenges untouched.
    pub async fn request_otp(
        &self,
        channel: OtpChannel,
        identifier: &str,
        team_no: Option<u32>,
    ) -> Result<IssuedChallenge, AuthError> {
        let identifier = match channel {
            OtpChannel::Whatsapp => {
                let phone = normalize_phone(identifier);
                if phone.is_empty() {
                    return Err(AuthError::validation("Please enter mobile number."));
                }
                phone
            }
            OtpChannel::Email => {
                let email = identifier.trim().to_string();
                if email.is_empty() {
                    return Err(AuthError::validation("Please enter email id."));
                }
                email
            }
        };

        let mut candidates = match channel {
            OtpChannel::Whatsapp => self.accounts.find_members_by_phone(&identifier).await?,
            OtpChannel::Email => self.accounts.find_members_by_email(&identifier).await?,
        };

        if let Some(team_no) = team_no {
            candidates.retain(|c| c.account.team_no == Some(team_no));
        }

        if candidates.is_empty() {
            return Err(AuthError::NotRegistered { channel });
        }

        if candidates.len() > 1 {
            let mut teams: Vec<TeamChoice> = candidates
                .iter()
                .map(|c| TeamChoice {
                    team_no: c.account.team_no,
                    username: c.account.username.clone(),
                })
                .collect();
            sort_team_choices(&mut teams);
            return Err(AuthError::AmbiguousIdentifier { channel, teams });
        }

        let candidate = &candidates[0];

        // The code goes to the member's stored email when matching was
        // case-insensitive; phones are already normalized.
        let dispatch_to = match channel {
            OtpChannel::Whatsapp => identifier.clone(),
            OtpChannel::Email => candidate
                .member
                .email
                .clone()
                .unwrap_or_else(|| identifier.clone()),
        };

        self.gateway
            .dispatch(channel, &dispatch_to, &candidate.member.name)
            .await?;

        let now = self.clock.now();
        let challenge = self
            .store
            .issue_challenge(candidate.member.id, &dispatch_to, now, now + self.otp_ttl)
            .await?;

        info!(
            challenge_id = challenge.id,
            member_id = candidate.member.id,
            %channel,
            "OTP challenge issued"
        );

        Ok(IssuedChallenge {
            challenge_id: challenge.id,
            expires_at: challenge.expires_at,
        })
    }

    /// Verify a passcode for a previously issued challenge and issue a
    /// session on success.
    ///
    /// Consumption is a conditional update: if a concurrent verify already
    /// consumed the challenge the gateway's acceptance does not matter and
    /// the caller gets `InvalidOtp`. Session creation shares the
    /// consumption transaction, so both succeed or fail together.
    pub async fn verify_otp(
        &self,
        challenge_id: ChallengeId,
        code: &str,
    ) -> Result<LoginGrant, AuthError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(AuthError::validation("Please enter OTP."));
        }

        let now = self.clock.now();

        // Absent, consumed, superseded and expired all collapse into the
        // same generic failure.
        let challenge = match self.challenges.get(challenge_id).await? {
            Some(c) if c.is_valid(now) => c,
            _ => return Err(AuthError::InvalidOtp),
        };
        let Some(member_id) = challenge.member_id else {
            return Err(AuthError::InvalidOtp);
        };

        // Gateway errors must not consume the challenge; a plain wrong code
        // leaves it pending for another attempt too.
        if !self.gateway.verify(&challenge.identifier, code).await? {
            return Err(AuthError::InvalidOtp);
        }

        let (account, member) = self.resolve_member(member_id).await?;

        let now = self.clock.now();
        let (created_at, expires_at) = self.session_policy.session_times(now);
        let raw_token = self.tokens.generate();

        let session = self
            .store
            .consume_and_create_session(
                challenge.id,
                now,
                NewSession {
                    account_id: account.id,
                    member_id: Some(member.id),
                    token_hash: self.tokens.fingerprint(&raw_token),
                    created_at,
                    expires_at,
                },
            )
            .await?;

        match session {
            Some(session) => {
                info!(
                    challenge_id,
                    account_id = account.id,
                    "OTP verified, session issued"
                );
                Ok(LoginGrant {
                    token: raw_token,
                    session,
                    account,
                    member,
                })
            }
            None => {
                // Lost the race against a concurrent verify
                warn!(challenge_id, "Challenge consumed concurrently");
                Err(AuthError::InvalidOtp)
            }
        }
    }

    async fn resolve_member(&self, member_id: MemberId) -> Result<(Account, Member), AuthError> {
        let member = self
            .accounts
            .get_member(member_id)
            .await?
            .ok_or_else(|| AuthError::internal(format!("Member {member_id} missing")))?;
        let account = self
            .accounts
            .get_account(member.account_id)
            .await?
            .ok_or_else(|| {
                AuthError::internal(format!("Account {} missing", member.account_id))
            })?;

        Ok((account, member))
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    /// Resolve an `Authorization` header to a live session.
    ///
    /// Missing/malformed header, unknown token, expired or revoked session
    /// and an inactive account all return `Ok(None)` indistinguishably.
    pub async fn authenticate_bearer(
        &self,
        auth_header: Option<&str>,
    ) -> Result<Option<AuthenticatedSession>, AuthError> {
        let Some(session) = self.find_bearer_session(auth_header).await? else {
            return Ok(None);
        };

        let Some(account) = self.accounts.get_account(session.account_id).await? else {
            return Ok(None);
        };
        if !account.is_active {
            return Ok(None);
        }

        let member = match session.member_id {
            Some(id) => self.accounts.get_member(id).await?,
            None => None,
        };

        Ok(Some(AuthenticatedSession {
            session,
            account,
            member,
        }))
    }

    /// Revoke the session named by an `Authorization` header. Succeeds
    /// whether or not the header resolves to a live session.
    pub async fn logout(&self, auth_header: Option<&str>) -> Result<(), AuthError> {
        if let Some(session) = self.find_bearer_session(auth_header).await? {
            self.sessions.revoke(session.id, self.clock.now()).await?;
            debug!(session_id = session.id, "Session revoked");
        }

        Ok(())
    }

    async fn find_bearer_session(
        &self,
        auth_header: Option<&str>,
    ) -> Result<Option<Session>, AuthError> {
        let Some(token) = extract_bearer_token(auth_header) else {
            return Ok(None);
        };

        self.sessions
            .find_valid_by_token_hash(&self.tokens.fingerprint(token), self.clock.now())
            .await
    }

    async fn issue_session(
        &self,
        account_id: AccountId,
        member_id: Option<MemberId>,
    ) -> Result<(String, Session), AuthError> {
        let (created_at, expires_at) = self.session_policy.session_times(self.clock.now());

        let mut last_err = AuthError::internal("Session issuance failed");
        for _ in 0..TOKEN_RETRIES {
            let raw_token = self.tokens.generate();
            let result = self
                .sessions
                .create(NewSession {
                    account_id,
                    member_id,
                    token_hash: self.tokens.fingerprint(&raw_token),
                    created_at,
                    expires_at,
                })
                .await;

            match result {
                Ok(session) => return Ok((raw_token, session)),
                Err(e @ AuthError::Conflict { .. }) => {
                    warn!("Token fingerprint collision, regenerating");
                    last_err = e;
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err)
    }
}

/// Extract the raw token from an `Authorization: Bearer <token>` header
fn extract_bearer_token(auth_header: Option<&str>) -> Option<&str> {
    let token = auth_header?.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::fixed::FixedClock;
    use crate::domain::otp::mock::MockOtpGateway;
    use crate::infrastructure::account::InMemoryAccountRepository;
    use crate::infrastructure::password::Pbkdf2Hasher;
    use crate::infrastructure::store::InMemoryAuthStore;

    const OTP_CODE: &str = "123456";

    struct Fixture {
        service: Arc<AuthService>,
        store: Arc<InMemoryAuthStore>,
        gateway: Arc<MockOtpGateway>,
        clock: Arc<FixedClock>,
    }

    fn account(id: AccountId, team_no: Option<u32>, username: &str, password: &str) -> Account {
        let now = Utc::now();
        Account {
            id,
            team_no,
            username: username.to_string(),
            email: None,
            phone: None,
            password: Pbkdf2Hasher::new(1_000).hash(password).unwrap(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn member(id: MemberId, account_id: AccountId, phone: &str, email: Option<&str>) -> Member {
        let now = Utc::now();
        Member {
            id,
            account_id,
            name: format!("Member {id}"),
            email: email.map(str::to_string),
            phone: phone.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn fixture() -> Fixture {
        let mut inactive = account(4, Some(9), "Team 9", "Team@009");
        inactive.is_active = false;

        let accounts = Arc::new(InMemoryAccountRepository::with_data(
            vec![
                account(1, Some(7), "Team 7", "Team@007"),
                account(2, Some(3), "Team 3", "Team@003"),
                account(3, None, "Unnumbered", "Team@000"),
                inactive,
            ],
            vec![
                member(10, 1, "9876543210", Some("alice@example.com")),
                member(11, 1, "5550001111", None),
                // Shares alice's email with Team 7's member
                member(20, 2, "1112223333", Some("Alice@Example.com")),
                member(30, 3, "1112223333", Some("carol@example.com")),
                member(40, 4, "9999999999", Some("dave@example.com")),
            ],
        ));

        let store = Arc::new(InMemoryAuthStore::new());
        let gateway = Arc::new(MockOtpGateway::accepting(OTP_CODE));
        let clock = Arc::new(FixedClock::new(Utc::now()));

        let service = Arc::new(AuthService::new(AuthServiceDeps {
            accounts,
            sessions: store.clone(),
            challenges: store.clone(),
            store: store.clone(),
            gateway: gateway.clone(),
            hasher: Arc::new(Pbkdf2Hasher::new(1_000)),
            clock: clock.clone(),
            session_policy: SessionPolicy::from_hours(12),
            otp_ttl: Duration::minutes(DEFAULT_OTP_TTL_MINUTES),
        }));

        Fixture {
            service,
            store,
            gateway,
            clock,
        }
    }

    // -------------------------- password path --------------------------

    #[tokio::test]
    async fn test_login_with_team_name() {
        let f = fixture();

        let grant = f.service.login("Team 7", "Team@007").await.unwrap();
        assert_eq!(grant.account.id, 1);
        assert!(grant.session.expires_at > f.clock.now());
        assert!(!grant.token.is_empty());
    }

    #[tokio::test]
    async fn test_login_with_phone() {
        let f = fixture();

        let grant = f.service.login("98765 43210", "Team@007").await.unwrap();
        assert_eq!(grant.member.id, 10);
        assert_eq!(grant.session.member_id, Some(10));
    }

    #[tokio::test]
    async fn test_login_with_email_case_insensitive() {
        let f = fixture();

        let grant = f
            .service
            .login("ALICE@example.COM", "Team@003")
            .await
            .unwrap();
        assert_eq!(grant.account.id, 2);
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let f = fixture();

        let result = f.service.login("Team 7", "wrong").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_unknown_identifier_same_error() {
        let f = fixture();

        let result = f.service.login("0000000000", "Team@007").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_empty_input_is_validation_error() {
        let f = fixture();

        assert!(matches!(
            f.service.login("", "pw").await,
            Err(AuthError::Validation { .. })
        ));
        assert!(matches!(
            f.service.login("Team 7", "").await,
            Err(AuthError::Validation { .. })
        ));
        // Phone that normalizes to nothing
        assert!(matches!(
            f.service.login("---", "pw").await,
            Err(AuthError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_login_shared_identifier_password_decides() {
        let f = fixture();

        // Phone 1112223333 belongs to members of accounts 2 and 3
        let grant = f.service.login("1112223333", "Team@000").await.unwrap();
        assert_eq!(grant.account.id, 3);

        let grant = f.service.login("1112223333", "Team@003").await.unwrap();
        assert_eq!(grant.account.id, 2);
    }

    #[tokio::test]
    async fn test_login_inactive_account_rejected() {
        let f = fixture();

        let result = f.service.login("9999999999", "Team@009").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_token_resolves_session() {
        let f = fixture();

        let grant = f.service.login("Team 7", "Team@007").await.unwrap();

        let header = format!("Bearer {}", grant.token);
        let authed = f
            .service
            .authenticate_bearer(Some(&header))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(authed.account.id, 1);
        assert_eq!(authed.member.unwrap().id, grant.member.id);
    }

    // ---------------------------- OTP path -----------------------------

    #[tokio::test]
    async fn test_request_otp_unique_phone_match() {
        let f = fixture();

        let issued = f
            .service
            .request_otp(OtpChannel::Whatsapp, "98765-43210", None)
            .await
            .unwrap();

        assert_eq!(
            issued.expires_at,
            f.clock.now() + Duration::minutes(DEFAULT_OTP_TTL_MINUTES)
        );
        assert_eq!(f.gateway.dispatch_count(), 1);
        assert_eq!(f.store.pending_count(10, "9876543210").await, 1);
    }

    #[tokio::test]
    async fn test_request_otp_unregistered() {
        let f = fixture();

        let result = f
            .service
            .request_otp(OtpChannel::Whatsapp, "0000000000", None)
            .await;
        assert!(matches!(
            result,
            Err(AuthError::NotRegistered {
                channel: OtpChannel::Whatsapp
            })
        ));

        let result = f
            .service
            .request_otp(OtpChannel::Email, "nobody@example.com", None)
            .await;
        assert!(matches!(
            result,
            Err(AuthError::NotRegistered {
                channel: OtpChannel::Email
            })
        ));
    }

    #[tokio::test]
    async fn test_request_otp_empty_identifier() {
        let f = fixture();

        assert!(matches!(
            f.service.request_otp(OtpChannel::Whatsapp, "--", None).await,
            Err(AuthError::Validation { .. })
        ));
        assert!(matches!(
            f.service.request_otp(OtpChannel::Email, "  ", None).await,
            Err(AuthError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_request_otp_ambiguous_email_lists_teams_sorted() {
        let f = fixture();

        // alice@example.com matches members of Team 7 (no. 7) and Team 3 (no. 3)
        let result = f
            .service
            .request_otp(OtpChannel::Email, "alice@example.com", None)
            .await;

        match result {
            Err(AuthError::AmbiguousIdentifier { teams, .. }) => {
                assert_eq!(teams.len(), 2);
                assert_eq!(teams[0].team_no, Some(3));
                assert_eq!(teams[1].team_no, Some(7));
            }
            other => panic!("expected AmbiguousIdentifier, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_request_otp_ambiguous_null_team_no_last() {
        let f = fixture();

        // Phone 1112223333 matches Team 3 (no. 3) and Unnumbered (None)
        let result = f
            .service
            .request_otp(OtpChannel::Whatsapp, "1112223333", None)
            .await;

        match result {
            Err(AuthError::AmbiguousIdentifier { teams, .. }) => {
                assert_eq!(teams[0].team_no, Some(3));
                assert_eq!(teams[1].team_no, None);
            }
            other => panic!("expected AmbiguousIdentifier, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_request_otp_team_no_filter_disambiguates() {
        let f = fixture();

        let issued = f
            .service
            .request_otp(OtpChannel::Whatsapp, "1112223333", Some(3))
            .await
            .unwrap();
        assert!(issued.challenge_id > 0);
    }

    #[tokio::test]
    async fn test_request_otp_dispatch_failure_leaves_pending_untouched() {
        let f = fixture();

        let issued = f
            .service
            .request_otp(OtpChannel::Whatsapp, "9876543210", None)
            .await
            .unwrap();

        f.gateway.set_fail_dispatch(true);
        let result = f
            .service
            .request_otp(OtpChannel::Whatsapp, "9876543210", None)
            .await;
        assert!(matches!(result, Err(AuthError::Dispatch { .. })));

        // The earlier challenge is still the one pending challenge
        assert_eq!(f.store.pending_count(10, "9876543210").await, 1);
        let grant = f.service.verify_otp(issued.challenge_id, OTP_CODE).await;
        assert!(grant.is_ok());
    }

    #[tokio::test]
    async fn test_second_request_supersedes_first() {
        let f = fixture();

        let first = f
            .service
            .request_otp(OtpChannel::Whatsapp, "9876543210", None)
            .await
            .unwrap();
        let second = f
            .service
            .request_otp(OtpChannel::Whatsapp, "9876543210", None)
            .await
            .unwrap();

        assert_eq!(f.store.pending_count(10, "9876543210").await, 1);

        let result = f.service.verify_otp(first.challenge_id, OTP_CODE).await;
        assert!(matches!(result, Err(AuthError::InvalidOtp)));

        let grant = f.service.verify_otp(second.challenge_id, OTP_CODE).await;
        assert!(grant.is_ok());
    }

    #[tokio::test]
    async fn test_verify_otp_happy_path_then_replay_fails() {
        let f = fixture();

        let issued = f
            .service
            .request_otp(OtpChannel::Whatsapp, "9876543210", None)
            .await
            .unwrap();

        let grant = f
            .service
            .verify_otp(issued.challenge_id, OTP_CODE)
            .await
            .unwrap();
        assert_eq!(grant.account.id, 1);
        assert_eq!(grant.member.id, 10);

        let header = format!("Bearer {}", grant.token);
        assert!(f
            .service
            .authenticate_bearer(Some(&header))
            .await
            .unwrap()
            .is_some());

        // Exactly-once: replaying the accepted code fails
        let replay = f.service.verify_otp(issued.challenge_id, OTP_CODE).await;
        assert!(matches!(replay, Err(AuthError::InvalidOtp)));
    }

    #[tokio::test]
    async fn test_verify_otp_wrong_code_keeps_challenge_pending() {
        let f = fixture();

        let issued = f
            .service
            .request_otp(OtpChannel::Whatsapp, "9876543210", None)
            .await
            .unwrap();

        let result = f.service.verify_otp(issued.challenge_id, "999999").await;
        assert!(matches!(result, Err(AuthError::InvalidOtp)));

        // A later attempt with the right code still works
        let grant = f.service.verify_otp(issued.challenge_id, OTP_CODE).await;
        assert!(grant.is_ok());
    }

    #[tokio::test]
    async fn test_verify_otp_gateway_failure_does_not_consume() {
        let f = fixture();

        let issued = f
            .service
            .request_otp(OtpChannel::Whatsapp, "9876543210", None)
            .await
            .unwrap();

        f.gateway.set_fail_verify(true);
        let result = f.service.verify_otp(issued.challenge_id, OTP_CODE).await;
        assert!(matches!(result, Err(AuthError::Verify { .. })));

        f.gateway.set_fail_verify(false);
        let grant = f.service.verify_otp(issued.challenge_id, OTP_CODE).await;
        assert!(grant.is_ok());
    }

    #[tokio::test]
    async fn test_verify_otp_expired_challenge() {
        let f = fixture();

        let issued = f
            .service
            .request_otp(OtpChannel::Whatsapp, "9876543210", None)
            .await
            .unwrap();

        f.clock.advance(Duration::minutes(6));

        let result = f.service.verify_otp(issued.challenge_id, OTP_CODE).await;
        assert!(matches!(result, Err(AuthError::InvalidOtp)));
    }

    #[tokio::test]
    async fn test_verify_otp_unknown_challenge() {
        let f = fixture();

        let result = f.service.verify_otp(424242, OTP_CODE).await;
        assert!(matches!(result, Err(AuthError::InvalidOtp)));
    }

    #[tokio::test]
    async fn test_verify_otp_empty_code() {
        let f = fixture();

        let result = f.service.verify_otp(1, "   ").await;
        assert!(matches!(result, Err(AuthError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_concurrent_verifies_single_winner() {
        let f = fixture();

        let issued = f
            .service
            .request_otp(OtpChannel::Whatsapp, "9876543210", None)
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = f.service.clone();
            let id = issued.challenge_id;
            handles.push(tokio::spawn(
                async move { service.verify_otp(id, OTP_CODE).await },
            ));
        }

        let mut sessions = 0;
        let mut invalid = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => sessions += 1,
                Err(AuthError::InvalidOtp) => invalid += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(sessions, 1);
        assert_eq!(invalid, 7);
    }

    // --------------------------- sessions ------------------------------

    #[tokio::test]
    async fn test_session_expires() {
        let f = fixture();

        let grant = f.service.login("Team 7", "Team@007").await.unwrap();
        let header = format!("Bearer {}", grant.token);

        f.clock.advance(Duration::hours(13));

        let authed = f.service.authenticate_bearer(Some(&header)).await.unwrap();
        assert!(authed.is_none());
    }

    #[tokio::test]
    async fn test_logout_revokes_session() {
        let f = fixture();

        let grant = f.service.login("Team 7", "Team@007").await.unwrap();
        let header = format!("Bearer {}", grant.token);

        f.service.logout(Some(&header)).await.unwrap();
        assert!(f
            .service
            .authenticate_bearer(Some(&header))
            .await
            .unwrap()
            .is_none());

        // Logging out again, or without a session at all, still succeeds
        f.service.logout(Some(&header)).await.unwrap();
        f.service.logout(None).await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_bearer_header() {
        let f = fixture();

        assert!(f.service.authenticate_bearer(None).await.unwrap().is_none());
        assert!(f
            .service
            .authenticate_bearer(Some("Basic dXNlcg=="))
            .await
            .unwrap()
            .is_none());
        assert!(f
            .service
            .authenticate_bearer(Some("Bearer    "))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_unknown_token_never_resolves() {
        let f = fixture();

        let header = format!("Bearer {}", SessionTokenCodec::new().generate());
        assert!(f
            .service
            .authenticate_bearer(Some(&header))
            .await
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token(Some("Bearer abc")), Some("abc"));
        assert_eq!(extract_bearer_token(Some("Bearer   abc  ")), Some("abc"));
        assert_eq!(extract_bearer_token(Some("Token abc")), None);
        assert_eq!(extract_bearer_token(Some("Bearer ")), None);
        assert_eq!(extract_bearer_token(None), None);
    }
}
