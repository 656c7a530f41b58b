use secrecy::SecretString;

/// Settings shared by every action: where the Identity Service lives and how
/// session cookies are issued.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub identity_url: String,
    pub identity_anon_key: SecretString,
    pub cookie_secure: bool,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(identity_url: String, identity_anon_key: SecretString) -> Self {
        Self {
            identity_url,
            identity_anon_key,
            cookie_secure: false,
        }
    }

    #[must_use]
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }
}
