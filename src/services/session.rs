//! Auth collaborators backed by the persisted user context.

use crate::services::user_context_service;
use async_trait::async_trait;
use photoshare_auth::{jwt, AuthProbe, IdentityProvider, UserIdentity};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

pub type SharedConnection = Arc<Mutex<Connection>>;

fn stored_identity(conn: &SharedConnection) -> Option<UserIdentity> {
    let guard = conn.lock().ok()?;
    match user_context_service::load_user_context(&guard) {
        Ok(Some(context)) => {
            let token = context.jwt_token.filter(|t| !t.is_empty())?;
            Some(UserIdentity {
                user_id: context.user_id,
                token,
                issued_context: None,
            })
        }
        Ok(None) => None,
        Err(e) => {
            log::warn!("Failed to load user context: {}", e);
            None
        }
    }
}

/// Third auth probe: a stored, non-expired session token
pub struct StoredSessionProbe {
    conn: SharedConnection,
}

impl StoredSessionProbe {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl AuthProbe for StoredSessionProbe {
    fn name(&self) -> &str {
        "stored-session"
    }

    async fn is_ready(&self) -> bool {
        match stored_identity(&self.conn) {
            Some(identity) => !jwt::is_expired(&identity.token, chrono::Utc::now()),
            None => false,
        }
    }
}

/// Identity from the stored user context; expired tokens are not handed out
pub struct StoredIdentityProvider {
    conn: SharedConnection,
}

impl StoredIdentityProvider {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl IdentityProvider for StoredIdentityProvider {
    async fn current_identity(&self) -> Option<UserIdentity> {
        stored_identity(&self.conn)
            .filter(|identity| !jwt::is_expired(&identity.token, chrono::Utc::now()))
    }
}
