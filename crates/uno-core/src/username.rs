//! Username / avatar form.

use crate::docs::Pfp;
use crate::error::ValidationError;

/// Pre-submission form state. This is the only state the client keeps that
/// is not mirrored from the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsernameForm {
    pub username: String,
    pub pfp: Option<Pfp>,
}

/// A validated username/avatar pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub username: String,
    pub pfp: Pfp,
}

impl UsernameForm {
    /// Check the form. Username is checked before avatar.
    pub fn validate(&self) -> Result<Profile, ValidationError> {
        let username = self.username.trim();
        if username.is_empty() {
            return Err(ValidationError::MissingUsername);
        }
        match self.pfp {
            Some(pfp) if pfp != Pfp::Unknown => Ok(Profile {
                username: username.to_string(),
                pfp,
            }),
            _ => Err(ValidationError::MissingAvatar),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_form_validates() {
        let form = UsernameForm {
            username: "  ana ".into(),
            pfp: Some(Pfp::Tiger),
        };
        assert_eq!(
            form.validate(),
            Ok(Profile {
                username: "ana".into(),
                pfp: Pfp::Tiger
            })
        );
    }

    #[test]
    fn missing_fields_are_reported_in_order() {
        assert_eq!(
            UsernameForm::default().validate(),
            Err(ValidationError::MissingUsername)
        );
        let no_avatar = UsernameForm {
            username: "ana".into(),
            pfp: None,
        };
        assert_eq!(no_avatar.validate(), Err(ValidationError::MissingAvatar));
        assert_eq!(
            no_avatar.validate().unwrap_err().to_string(),
            "Invalid profile picture!"
        );
        let unknown = UsernameForm {
            username: "ana".into(),
            pfp: Some(Pfp::Unknown),
        };
        assert_eq!(unknown.validate(), Err(ValidationError::MissingAvatar));
    }
}
