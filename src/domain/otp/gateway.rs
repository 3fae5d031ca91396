//! External OTP gateway interface
//!
//! The gateway delivers passcodes and checks submitted codes. Calls are
//! single-attempt from this core's perspective; any retry policy belongs to
//! the gateway client itself.

use async_trait::async_trait;
use std::fmt::Debug;

use super::entity::OtpChannel;
use crate::domain::AuthError;

#[async_trait]
pub trait OtpGateway: Send + Sync + Debug {
    /// Send a passcode to `identifier` over `channel`. Fails with
    /// `AuthError::Dispatch` when delivery cannot be initiated.
    async fn dispatch(
        &self,
        channel: OtpChannel,
        identifier: &str,
        display_name: &str,
    ) -> Result<(), AuthError>;

    /// Check a submitted code against the identifier it was dispatched to.
    /// `Ok(false)` means the code is wrong; `AuthError::Verify` means the
    /// gateway itself failed and the challenge must not be consumed.
    async fn verify(&self, identifier: &str, code: &str) -> Result<bool, AuthError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::RwLock;

    /// Scripted gateway for service tests
    #[derive(Debug, Default)]
    pub struct MockOtpGateway {
        accepted_code: RwLock<Option<String>>,
        fail_dispatch: RwLock<bool>,
        fail_verify: RwLock<bool>,
        dispatched: AtomicUsize,
    }

    impl MockOtpGateway {
        pub fn accepting(code: &str) -> Self {
            Self {
                accepted_code: RwLock::new(Some(code.to_string())),
                ..Self::default()
            }
        }

        pub fn set_fail_dispatch(&self, fail: bool) {
            *self.fail_dispatch.write().unwrap() = fail;
        }

        pub fn set_fail_verify(&self, fail: bool) {
            *self.fail_verify.write().unwrap() = fail;
        }

        pub fn dispatch_count(&self) -> usize {
            self.dispatched.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl OtpGateway for MockOtpGateway {
        async fn dispatch(
            &self,
            _channel: OtpChannel,
            _identifier: &str,
            _display_name: &str,
        ) -> Result<(), AuthError> {
            if *self.fail_dispatch.read().unwrap() {
                return Err(AuthError::dispatch("mock gateway dispatch failure"));
            }
            self.dispatched.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn verify(&self, _identifier: &str, code: &str) -> Result<bool, AuthError> {
            if *self.fail_verify.read().unwrap() {
                return Err(AuthError::verify("mock gateway verify failure"));
            }
            Ok(self.accepted_code.read().unwrap().as_deref() == Some(code))
        }
    }
}
