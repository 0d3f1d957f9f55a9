use corkboard_types::api::{FieldError, PostMessageRequest, SignupRequest};

/// Explicit field validation, composed before the domain operation runs.
/// Returns one entry per failed rule; an empty vec means the payload is
/// acceptable.
pub fn validate_signup(req: &SignupRequest) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if !length_between(&req.first_name, 2, 30) {
        errors.push(FieldError {
            field: "firstName",
            msg: "First Name must be between 2 and 30 characters.",
        });
    }
    if !length_between(&req.last_name, 5, 30) {
        errors.push(FieldError {
            field: "lastName",
            msg: "Last Name must be between 5 and 30 characters",
        });
    }
    if !is_email(&req.username) {
        errors.push(FieldError {
            field: "username",
            msg: "Username must be a valid email address",
        });
    }
    if !is_strong_password(&req.password) {
        errors.push(FieldError {
            field: "password",
            msg: "Password must be a strong password",
        });
    }
    if req.password_confirm != req.password {
        errors.push(FieldError {
            field: "passwordConfirm",
            msg: "Password confirmation does not match password",
        });
    }

    errors
}

pub fn validate_message(req: &PostMessageRequest) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if req.author.is_empty() {
        errors.push(FieldError {
            field: "author",
            msg: "author must be sent with message",
        });
    }
    if !length_between(&req.title, 1, 100) {
        errors.push(FieldError {
            field: "title",
            msg: "Title must be between 1 and 100 characters",
        });
    }
    if !length_between(&req.body, 1, 300) {
        errors.push(FieldError {
            field: "body",
            msg: "Body must be between 1 and 300 characters",
        });
    }

    errors
}

fn length_between(value: &str, min: usize, max: usize) -> bool {
    let len = value.chars().count();
    min <= len && len <= max
}

/// Cheap email-shape check: non-empty local part, a domain with a dot, no
/// whitespace. Deliverability is not our problem.
fn is_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .split_once('.')
        .is_some_and(|(head, tail)| !head.is_empty() && !tail.is_empty())
}

/// At least 8 characters with one lowercase, one uppercase, one digit and
/// one symbol.
fn is_strong_password(value: &str) -> bool {
    value.chars().count() >= 8
        && value.chars().any(|c| c.is_ascii_lowercase())
        && value.chars().any(|c| c.is_ascii_uppercase())
        && value.chars().any(|c| c.is_ascii_digit())
        && value.chars().any(|c| !c.is_alphanumeric())
}
