/// Credential check consumed by the session during USER/PASS.
///
/// The server accepts any implementation; `FixedCredentials` is the
/// reference one used by the binary.
pub trait AuthPredicate: Send + Sync {
    fn authenticate(&self, username: &str, password: &str) -> bool;
}

impl<F> AuthPredicate for F
where
    F: Fn(&str, &str) -> bool + Send + Sync,
{
    fn authenticate(&self, username: &str, password: &str) -> bool {
        self(username, password)
    }
}

#[derive(Debug, Clone)]
pub struct FixedCredentials {
    username: String,
    password: String,
}

impl FixedCredentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

impl Default for FixedCredentials {
    fn default() -> Self {
        Self::new("admin", "password")
    }
}

impl AuthPredicate for FixedCredentials {
    fn authenticate(&self, username: &str, password: &str) -> bool {
        username == self.username && password == self.password
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_credentials_match_exactly() {
        let auth = FixedCredentials::default();
        assert!(auth.authenticate("admin", "password"));
        assert!(!auth.authenticate("admin", "wrong"));
        assert!(!auth.authenticate("Admin", "password"));
        assert!(!auth.authenticate("", ""));
    }

    #[test]
    fn closures_are_predicates() {
        let auth = |user: &str, pass: &str| user == pass;
        assert!(auth.authenticate("x", "x"));
        assert!(!auth.authenticate("x", "y"));
    }
}
