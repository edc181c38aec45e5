//! Caller identity forwarded by the upstream gateway.
//!
//! Authentication happens before requests reach this service; the gateway
//! passes the authenticated user in `x-user-*` headers. Handlers check the
//! role with [`Actor::require`].

use std::str::FromStr;

use axum::{extract::FromRequestParts, http::request::Parts};

use super::error::ApiError;
use crate::domain::value_objects::UserId;
use crate::store::OrderFilter;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_NAME_HEADER: &str = "x-user-name";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role { Customer, Admin, Manager }

impl FromStr for Role {
    type Err = ApiError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" | "user" => Ok(Self::Customer),
            "admin" => Ok(Self::Admin),
            "manager" => Ok(Self::Manager),
            _ => Err(ApiError::Unauthorized),
        }
    }
}

pub const STAFF: &[Role] = &[Role::Admin, Role::Manager];
pub const CUSTOMERS: &[Role] = &[Role::Customer];
pub const EVERYONE: &[Role] = &[Role::Customer, Role::Admin, Role::Manager];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
    pub email: Option<String>,
    pub name: String,
}

impl Actor {
    /// # Errors
    ///
    /// Returns `ApiError::Forbidden` unless the actor holds one of `roles`.
    pub fn require(&self, roles: &[Role]) -> Result<(), ApiError> {
        if roles.contains(&self.role) { Ok(()) } else { Err(ApiError::Forbidden) }
    }

    /// Customers only see their own orders; staff see everything.
    pub fn order_filter(&self) -> OrderFilter {
        match self.role {
            Role::Customer => OrderFilter::owned_by(self.id),
            Role::Admin | Role::Manager => OrderFilter::all(),
        }
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim).filter(|v| !v.is_empty())
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header(parts, USER_ID_HEADER)
            .and_then(|v| v.parse::<UserId>().ok())
            .ok_or(ApiError::Unauthorized)?;
        let role = header(parts, USER_ROLE_HEADER).ok_or(ApiError::Unauthorized)?.parse::<Role>()?;
        let email = header(parts, USER_EMAIL_HEADER).map(str::to_string);
        let name = header(parts, USER_NAME_HEADER).map_or_else(|| id.to_string(), str::to_string);
        Ok(Self { id, role, email, name })
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    async fn extract(headers: &[(&str, &str)]) -> Result<Actor, ApiError> {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let (mut parts, ()) = builder.body(()).unwrap().into_parts();
        Actor::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_extracts_actor() {
        let id = UserId::new();
        let actor = extract(&[
            (USER_ID_HEADER, &id.to_string()),
            (USER_ROLE_HEADER, "Manager"),
            (USER_NAME_HEADER, "Mona"),
        ])
        .await
        .unwrap();
        assert_eq!(actor.id, id);
        assert_eq!(actor.role, Role::Manager);
        assert_eq!(actor.name, "Mona");
        assert_eq!(actor.email, None);
        assert_eq!(actor.order_filter(), OrderFilter::all());
    }

    #[tokio::test]
    async fn test_missing_or_bad_identity() {
        assert!(matches!(extract(&[]).await, Err(ApiError::Unauthorized)));
        assert!(matches!(
            extract(&[(USER_ID_HEADER, "not-a-uuid"), (USER_ROLE_HEADER, "admin")]).await,
            Err(ApiError::Unauthorized)
        ));
        assert!(matches!(
            extract(&[(USER_ID_HEADER, &UserId::new().to_string()), (USER_ROLE_HEADER, "root")]).await,
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn test_require_role() {
        let actor = Actor { id: UserId::new(), role: Role::Customer, email: None, name: "c".into() };
        assert!(actor.require(CUSTOMERS).is_ok());
        assert!(matches!(actor.require(STAFF), Err(ApiError::Forbidden)));
        assert_eq!(actor.order_filter(), OrderFilter::owned_by(actor.id));
    }
}
