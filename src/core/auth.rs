//! Viewer identity and the project visibility rule
//!
//! Authentication itself belongs to whatever fronts this service. An
//! [`AuthProvider`] only turns request headers into an [`AuthContext`], which
//! the data layer then uses for `visible_for(viewer)` filtering.

use anyhow::Result;
use async_trait::async_trait;
use axum::http::HeaderMap;

use super::model::{Project, Visibility};

/// Permission that lets a user see private projects
pub const MANAGE_PROJECT_PERMISSION: &str = "base.can_manage_project";

/// Header carrying the authenticated username
pub const REMOTE_USER_HEADER: &str = "x-remote-user";

/// Header carrying a comma-separated permission list
pub const REMOTE_PERMISSIONS_HEADER: &str = "x-remote-permissions";

/// Header flagging a superuser (`true` / `1`)
pub const REMOTE_SUPERUSER_HEADER: &str = "x-remote-superuser";

/// Identity of whoever issued the query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthContext {
    /// Authenticated user
    User {
        username: String,
        permissions: Vec<String>,
        is_superuser: bool,
    },

    /// No authentication (public access)
    #[default]
    Anonymous,
}

impl AuthContext {
    /// Build a regular user with the given permissions
    pub fn user(username: impl Into<String>, permissions: &[&str]) -> Self {
        AuthContext::User {
            username: username.into(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            is_superuser: false,
        }
    }

    /// Build a superuser, who holds every permission
    pub fn superuser(username: impl Into<String>) -> Self {
        AuthContext::User {
            username: username.into(),
            permissions: Vec::new(),
            is_superuser: true,
        }
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            AuthContext::User { username, .. } => Some(username),
            AuthContext::Anonymous => None,
        }
    }

    /// Check a permission; superusers hold all of them
    pub fn has_perm(&self, permission: &str) -> bool {
        match self {
            AuthContext::User {
                permissions,
                is_superuser,
                ..
            } => *is_superuser || permissions.iter().any(|p| p == permission),
            AuthContext::Anonymous => false,
        }
    }

    /// Whether `project` passes the `visible_for(viewer)` filter
    pub fn can_view(&self, project: &Project) -> bool {
        project.visibility == Visibility::Public || self.has_perm(MANAGE_PROJECT_PERMISSION)
    }
}

/// Trait for auth providers
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Extract auth context from HTTP request headers
    async fn extract_context(&self, headers: &HeaderMap) -> Result<AuthContext>;
}

/// Default provider: every request is anonymous
pub struct NoAuthProvider;

#[async_trait]
impl AuthProvider for NoAuthProvider {
    async fn extract_context(&self, _headers: &HeaderMap) -> Result<AuthContext> {
        Ok(AuthContext::Anonymous)
    }
}

/// Trusts identity headers set by an authenticating reverse proxy
///
/// Only deploy this behind a proxy that strips these headers from client
/// requests.
pub struct TrustedHeaderAuthProvider;

#[async_trait]
impl AuthProvider for TrustedHeaderAuthProvider {
    async fn extract_context(&self, headers: &HeaderMap) -> Result<AuthContext> {
        let Some(username) = header_str(headers, REMOTE_USER_HEADER)? else {
            return Ok(AuthContext::Anonymous);
        };
        if username.is_empty() {
            return Ok(AuthContext::Anonymous);
        }

        let permissions = header_str(headers, REMOTE_PERMISSIONS_HEADER)?
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let is_superuser = matches!(
            header_str(headers, REMOTE_SUPERUSER_HEADER)?,
            Some("true") | Some("1")
        );

        Ok(AuthContext::User {
            username: username.to_string(),
            permissions,
            is_superuser,
        })
    }
}

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Result<Option<&'h str>> {
    headers
        .get(name)
        .map(|value| {
            value
                .to_str()
                .map_err(|e| anyhow::anyhow!("Invalid {} header: {}", name, e))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn project(visibility: Visibility) -> Project {
        Project {
            slug: "firefox".to_string(),
            name: "Firefox".to_string(),
            visibility,
            ..Project::default()
        }
    }

    #[test]
    fn test_anonymous_sees_only_public_projects() {
        let viewer = AuthContext::Anonymous;
        assert!(viewer.can_view(&project(Visibility::Public)));
        assert!(!viewer.can_view(&project(Visibility::Private)));
    }

    #[test]
    fn test_manager_sees_private_projects() {
        let viewer = AuthContext::user("pm", &[MANAGE_PROJECT_PERMISSION]);
        assert!(viewer.can_view(&project(Visibility::Private)));
    }

    #[test]
    fn test_plain_user_does_not_see_private_projects() {
        let viewer = AuthContext::user("translator", &["base.can_translate_locale"]);
        assert!(!viewer.can_view(&project(Visibility::Private)));
        assert_eq!(viewer.username(), Some("translator"));
    }

    #[test]
    fn test_superuser_holds_every_permission() {
        let viewer = AuthContext::superuser("admin");
        assert!(viewer.has_perm(MANAGE_PROJECT_PERMISSION));
        assert!(viewer.has_perm("anything.at_all"));
        assert!(viewer.can_view(&project(Visibility::Private)));
    }

    #[tokio::test]
    async fn test_no_auth_provider_is_anonymous() {
        let mut headers = HeaderMap::new();
        headers.insert(REMOTE_USER_HEADER, HeaderValue::from_static("someone"));
        let ctx = NoAuthProvider
            .extract_context(&headers)
            .await
            .expect("should extract");
        assert_eq!(ctx, AuthContext::Anonymous);
    }

    #[tokio::test]
    async fn test_trusted_headers_build_user() {
        let mut headers = HeaderMap::new();
        headers.insert(REMOTE_USER_HEADER, HeaderValue::from_static("pm"));
        headers.insert(
            REMOTE_PERMISSIONS_HEADER,
            HeaderValue::from_static("base.can_manage_project, base.can_translate_locale"),
        );

        let ctx = TrustedHeaderAuthProvider
            .extract_context(&headers)
            .await
            .expect("should extract");

        assert_eq!(
            ctx,
            AuthContext::User {
                username: "pm".to_string(),
                permissions: vec![
                    "base.can_manage_project".to_string(),
                    "base.can_translate_locale".to_string()
                ],
                is_superuser: false,
            }
        );
    }

    #[tokio::test]
    async fn test_trusted_headers_without_user_are_anonymous() {
        let mut headers = HeaderMap::new();
        headers.insert(REMOTE_SUPERUSER_HEADER, HeaderValue::from_static("true"));
        let ctx = TrustedHeaderAuthProvider
            .extract_context(&headers)
            .await
            .expect("should extract");
        assert_eq!(ctx, AuthContext::Anonymous);
    }

    #[tokio::test]
    async fn test_trusted_superuser_flag() {
        let mut headers = HeaderMap::new();
        headers.insert(REMOTE_USER_HEADER, HeaderValue::from_static("root"));
        headers.insert(REMOTE_SUPERUSER_HEADER, HeaderValue::from_static("1"));
        let ctx = TrustedHeaderAuthProvider
            .extract_context(&headers)
            .await
            .expect("should extract");
        assert!(ctx.has_perm(MANAGE_PROJECT_PERMISSION));
    }
}
