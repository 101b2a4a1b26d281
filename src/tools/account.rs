//! Account context: credentials shared by every remote tool service

use reqwest::Url;

/// Connection string could not be turned into an account
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountError {
    #[error("connection string is empty")]
    Empty,
    #[error("connection string is not a valid URL: {0}")]
    InvalidUrl(String),
    #[error("connection string has no connection_token parameter")]
    MissingToken,
}

/// Credentials presented when building a tool client
///
/// Parsed once at startup from a connection string of the form
/// `https://accounts.example?connection_token=<token>&account_id=<id>`.
#[derive(Clone)]
pub struct AccountContext {
    origin: String,
    connection_token: String,
    account_id: Option<String>,
    network: String,
}

impl AccountContext {
    pub fn from_connection_string(raw: &str, network: &str) -> Result<Self, AccountError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AccountError::Empty);
        }

        let url = Url::parse(raw).map_err(|e| AccountError::InvalidUrl(e.to_string()))?;

        let mut connection_token = None;
        let mut account_id = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "connection_token" if !value.is_empty() => connection_token = Some(value.into_owned()),
                "account_id" if !value.is_empty() => account_id = Some(value.into_owned()),
                _ => {}
            }
        }

        Ok(Self {
            origin: url.origin().ascii_serialization(),
            connection_token: connection_token.ok_or(AccountError::MissingToken)?,
            account_id,
            network: network.to_string(),
        })
    }

    /// Token sent as the Bearer credential
    pub fn bearer_token(&self) -> &str {
        &self.connection_token
    }

    pub fn account_id(&self) -> Option<&str> {
        self.account_id.as_deref()
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    /// Accounts service the connection string points at
    pub fn origin(&self) -> &str {
        &self.origin
    }
}

impl std::fmt::Debug for AccountContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountContext")
            .field("origin", &self.origin)
            .field("connection_token", &"<redacted>")
            .field("account_id", &self.account_id)
            .field("network", &self.network)
            .finish()
    }
}
