//! Password handling for CLI operations.

use rpassword::prompt_password;
use sevenz_forensic::Password;

/// Resolves a password for decrypting/testing an archive: a value supplied
/// on the command line wins outright, otherwise the user is prompted once.
pub fn resolve_password(provided: Option<String>) -> Option<Password> {
    if let Some(pwd) = provided {
        return Some(Password::new(pwd));
    }

    match prompt_password("Password: ") {
        Ok(pwd) if !pwd.is_empty() => Some(Password::new(pwd)),
        _ => None,
    }
}

/// Resolves a password for creating an encrypted archive: a value supplied
/// on the command line wins outright, otherwise the user is prompted twice
/// and the two entries must match.
pub fn resolve_password_with_confirmation(provided: Option<String>) -> Option<Password> {
    if let Some(pwd) = provided {
        return Some(Password::new(pwd));
    }

    let first = prompt_password("Password: ").ok()?;
    if first.is_empty() {
        eprintln!("Password cannot be empty.");
        return None;
    }
    let second = prompt_password("Confirm password: ").ok()?;
    if first != second {
        eprintln!("Passwords do not match.");
        return None;
    }
    Some(Password::new(first))
}
