//! Bearer-token authentication for the dashboard endpoints

use crate::error::GatewayError;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Claims carried by a dashboard bearer token, as issued by the external
/// login flow
#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardClaims {
    /// User id
    pub sub: String,
    /// User name
    pub name: String,
    /// User email
    pub email: String,
    /// Expiration time
    pub exp: u64,
}

/// The authenticated operator attached to a request
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// Validates dashboard bearer tokens.
///
/// Absence, malformation, a bad signature and expiry all yield the same
/// authentication error; callers map it to a uniform 401.
#[derive(Clone)]
pub struct DashboardAuth {
    decoding: DecodingKey,
    validation: Validation,
}

impl DashboardAuth {
    /// Create a validator for tokens signed with the given HS256 secret
    pub fn new(secret: &str) -> Self {
        // Validation::new already requires and checks exp
        let validation = Validation::new(Algorithm::HS256);
        Self { decoding: DecodingKey::from_secret(secret.as_bytes()), validation }
    }

    /// Verify an `Authorization` header value and return the operator
    pub fn verify_header(&self, header: Option<&str>) -> Result<AuthedUser, GatewayError> {
        let header = header
            .ok_or_else(|| GatewayError::Authentication("Missing bearer token".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| GatewayError::Authentication("Malformed bearer token".to_string()))?;

        let data = decode::<DashboardClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| GatewayError::Authentication(format!("Invalid token: {e}")))?;

        Ok(AuthedUser {
            id: data.claims.sub,
            name: data.claims.name,
            email: data.claims.email,
        })
    }
}

/// Sign a dashboard token; used by fixtures and the external login flow
pub fn issue_token(
    secret: &str,
    claims: &DashboardClaims,
) -> Result<String, jsonwebtoken::errors::Error> {
    encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn now() -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs()
    }

    fn claims(exp: u64) -> DashboardClaims {
        DashboardClaims {
            sub: "u1".to_string(),
            name: "Operator".to_string(),
            email: "op@school.test".to_string(),
            exp,
        }
    }

    #[test]
    fn valid_token_yields_the_operator() {
        let auth = DashboardAuth::new("dashboard-secret");
        let token = issue_token("dashboard-secret", &claims(now() + 3600)).unwrap();
        let header = format!("Bearer {token}");

        let user = auth.verify_header(Some(&header)).unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.email, "op@school.test");
    }

    #[test]
    fn missing_header_is_unauthorized() {
        let auth = DashboardAuth::new("dashboard-secret");
        assert!(auth.verify_header(None).is_err());
    }

    #[test]
    fn non_bearer_header_is_unauthorized() {
        let auth = DashboardAuth::new("dashboard-secret");
        assert!(auth.verify_header(Some("Basic abc")).is_err());
    }

    #[test]
    fn wrong_secret_is_unauthorized() {
        let auth = DashboardAuth::new("dashboard-secret");
        let token = issue_token("some-other-secret", &claims(now() + 3600)).unwrap();
        let header = format!("Bearer {token}");
        assert!(auth.verify_header(Some(&header)).is_err());
    }

    #[test]
    fn expired_token_is_unauthorized() {
        let auth = DashboardAuth::new("dashboard-secret");
        let token = issue_token("dashboard-secret", &claims(now().saturating_sub(7200))).unwrap();
        let header = format!("Bearer {token}");
        assert!(auth.verify_header(Some(&header)).is_err());
    }
}
