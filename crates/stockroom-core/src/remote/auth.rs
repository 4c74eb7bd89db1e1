//! Account sign-in against the stock API.

use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::ApiClient;
use crate::error::Result;

/// Signed-in user returned by `POST /login`
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
    /// Bearer token for every later request
    pub token: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Session")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("roles", &self.roles)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

impl ApiClient {
    /// Exchange email and password for a session token
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let request = self
            .request(Method::POST, "/login")
            .json(&Credentials { email, password });
        let response = self.send(request).await?;
        let session: Session = Self::read_data(response, None).await?;
        tracing::info!("Signed in to {} as {}", self.base_url(), session.email);
        Ok(session)
    }

    /// Revoke the token this client was built with
    pub async fn logout(&self) -> Result<()> {
        self.send(self.request(Method::POST, "/logout")).await?;
        Ok(())
    }
}
