//! Anonymous sign-in and the username submission flow.

use std::future::Future;

use uno_core::error::{AppError, AuthError};
use uno_core::username::{Profile, UsernameForm};

/// Anonymous authentication.
pub trait AuthProvider {
    /// Sign in anonymously and return the uid. Returns the existing uid if
    /// already signed in.
    fn sign_in(&self) -> impl Future<Output = Result<String, AuthError>>;

    fn sign_out(&self);

    fn current_uid(&self) -> Option<String>;
}

impl<A: AuthProvider + ?Sized> AuthProvider for &A {
    fn sign_in(&self) -> impl Future<Output = Result<String, AuthError>> {
        (**self).sign_in()
    }

    fn sign_out(&self) {
        (**self).sign_out()
    }

    fn current_uid(&self) -> Option<String> {
        (**self).current_uid()
    }
}

/// A signed-in user with a chosen name and avatar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub profile: Profile,
}

/// Validate the form and sign in.
///
/// Nothing reaches the auth provider unless the form is valid.
pub async fn submit_username<A: AuthProvider>(
    form: &UsernameForm,
    auth: &A,
) -> Result<Identity, AppError> {
    let profile = form.validate()?;
    let uid = auth.sign_in().await.inspect_err(|e| {
        tracing::warn!(error = %e, "anonymous sign-in failed");
    })?;
    tracing::info!(%uid, username = %profile.username, "profile submitted");
    Ok(Identity { uid, profile })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use uno_core::docs::Pfp;
    use uno_core::error::ValidationError;

    /// Counts sign-in calls and answers with a fixed result.
    pub(crate) struct FakeAuth {
        pub calls: Cell<usize>,
        pub answer: Result<String, AuthError>,
        pub uid: RefCell<Option<String>>,
    }

    impl FakeAuth {
        pub fn ok(uid: &str) -> Self {
            Self {
                calls: Cell::new(0),
                answer: Ok(uid.to_string()),
                uid: RefCell::new(None),
            }
        }

        pub fn failing() -> Self {
            Self {
                calls: Cell::new(0),
                answer: Err(AuthError::Unavailable("offline".into())),
                uid: RefCell::new(None),
            }
        }
    }

    impl AuthProvider for FakeAuth {
        async fn sign_in(&self) -> Result<String, AuthError> {
            self.calls.set(self.calls.get() + 1);
            if let Ok(uid) = &self.answer {
                *self.uid.borrow_mut() = Some(uid.clone());
            }
            self.answer.clone()
        }

        fn sign_out(&self) {
            self.uid.borrow_mut().take();
        }

        fn current_uid(&self) -> Option<String> {
            self.uid.borrow().clone()
        }
    }

    #[tokio::test]
    async fn valid_form_signs_in() {
        let auth = FakeAuth::ok("u1");
        let form = UsernameForm {
            username: " ana ".into(),
            pfp: Some(Pfp::Koala),
        };
        let identity = submit_username(&form, &auth).await.unwrap();
        assert_eq!(identity.uid, "u1");
        assert_eq!(identity.profile.username, "ana");
        assert_eq!(auth.calls.get(), 1);
    }

    #[tokio::test]
    async fn missing_avatar_never_reaches_auth() {
        let auth = FakeAuth::ok("u1");
        let form = UsernameForm {
            username: "ana".into(),
            pfp: None,
        };
        let err = submit_username(&form, &auth).await.unwrap_err();
        assert_eq!(err, AppError::Validation(ValidationError::MissingAvatar));
        assert_eq!(err.notice().text, "Invalid profile picture!");
        assert_eq!(auth.calls.get(), 0);
    }

    #[tokio::test]
    async fn auth_failure_is_a_generic_notice() {
        let auth = FakeAuth::failing();
        let form = UsernameForm {
            username: "ana".into(),
            pfp: Some(Pfp::Lion),
        };
        let err = submit_username(&form, &auth).await.unwrap_err();
        assert_eq!(err.notice().text, "Something went wrong");
        assert_eq!(auth.calls.get(), 1);
    }
}
