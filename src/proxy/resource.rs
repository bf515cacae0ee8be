//! Per-resource proxy behavior.
//!
//! Each proxied backend resource is one variant. What a resource does under
//! a given auth mode is decided by an exhaustive `match`, so adding a mode or
//! a resource fails to compile until every combination is spelled out.

use crate::auth::mode::AuthMode;
use crate::proxy::envelope::FailureShape;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyResource {
    CurrentUser,
    AnalyticsOverview,
    Transcripts,
    Feedback,
    QaEvaluations,
    TenantSwitch,
    Logout,
    PasswordReset,
    OAuthCallback,
}

/// What a handler does with a request under the active mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeAccess {
    /// Forward to the backend
    Forward,
    /// Answer locally with a canned response
    Simulate,
    /// Answer 400 without contacting the backend
    Reject,
}

impl ProxyResource {
    /// Stable label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CurrentUser => "current_user",
            Self::AnalyticsOverview => "analytics_overview",
            Self::Transcripts => "transcripts",
            Self::Feedback => "feedback",
            Self::QaEvaluations => "qa_evaluations",
            Self::TenantSwitch => "tenant_switch",
            Self::Logout => "logout",
            Self::PasswordReset => "password_reset",
            Self::OAuthCallback => "oauth_callback",
        }
    }

    /// Human name used in mode-mismatch messages
    pub fn operation(&self) -> &'static str {
        match self {
            Self::CurrentUser => "Current user lookup",
            Self::AnalyticsOverview => "Analytics overview",
            Self::Transcripts => "Transcript listing",
            Self::Feedback => "Feedback listing",
            Self::QaEvaluations => "QA evaluation listing",
            Self::TenantSwitch => "Tenant switch",
            Self::Logout => "Logout",
            Self::PasswordReset => "Password reset",
            Self::OAuthCallback => "OAuth login",
        }
    }

    pub fn failure_shape(&self) -> FailureShape {
        match self {
            Self::Transcripts | Self::Feedback | Self::QaEvaluations => FailureShape::EmptyPage,
            Self::CurrentUser
            | Self::AnalyticsOverview
            | Self::TenantSwitch
            | Self::Logout
            | Self::PasswordReset
            | Self::OAuthCallback => FailureShape::Envelope,
        }
    }

    /// Whether backend `Set-Cookie` headers reach the browser
    pub fn relays_set_cookie(&self) -> bool {
        matches!(self, Self::TenantSwitch | Self::Logout | Self::OAuthCallback)
    }

    pub fn access(&self, mode: AuthMode) -> ModeAccess {
        use AuthMode::*;
        match (self, mode) {
            (Self::AnalyticsOverview | Self::Transcripts | Self::Feedback | Self::QaEvaluations, _) => {
                ModeAccess::Forward
            }

            (Self::CurrentUser, Mock) => ModeAccess::Simulate,
            (Self::CurrentUser, OAuth | Legacy) => ModeAccess::Forward,

            (Self::Logout, Mock) => ModeAccess::Simulate,
            (Self::Logout, OAuth | Legacy) => ModeAccess::Forward,

            (Self::TenantSwitch | Self::PasswordReset, Legacy) => ModeAccess::Forward,
            (Self::TenantSwitch | Self::PasswordReset, Mock) => ModeAccess::Simulate,
            (Self::TenantSwitch | Self::PasswordReset, OAuth) => ModeAccess::Reject,

            (Self::OAuthCallback, OAuth) => ModeAccess::Forward,
            (Self::OAuthCallback, Mock | Legacy) => ModeAccess::Reject,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_only_operations() {
        for resource in [ProxyResource::TenantSwitch, ProxyResource::PasswordReset] {
            assert_eq!(resource.access(AuthMode::OAuth), ModeAccess::Reject);
            assert_eq!(resource.access(AuthMode::Legacy), ModeAccess::Forward);
            assert_eq!(resource.access(AuthMode::Mock), ModeAccess::Simulate);
        }
    }

    #[test]
    fn test_data_resources_ignore_mode() {
        for resource in [
            ProxyResource::AnalyticsOverview,
            ProxyResource::Transcripts,
            ProxyResource::Feedback,
            ProxyResource::QaEvaluations,
        ] {
            for mode in [AuthMode::Mock, AuthMode::OAuth, AuthMode::Legacy] {
                assert_eq!(resource.access(mode), ModeAccess::Forward);
            }
        }
    }

    #[test]
    fn test_oauth_callback_only_in_oauth_mode() {
        assert_eq!(ProxyResource::OAuthCallback.access(AuthMode::OAuth), ModeAccess::Forward);
        assert_eq!(ProxyResource::OAuthCallback.access(AuthMode::Legacy), ModeAccess::Reject);
        assert_eq!(ProxyResource::OAuthCallback.access(AuthMode::Mock), ModeAccess::Reject);
    }

    #[test]
    fn test_list_resources_fail_with_empty_page() {
        assert_eq!(ProxyResource::Transcripts.failure_shape(), FailureShape::EmptyPage);
        assert_eq!(ProxyResource::CurrentUser.failure_shape(), FailureShape::Envelope);
        assert!(ProxyResource::Logout.relays_set_cookie());
        assert!(!ProxyResource::Feedback.relays_set_cookie());
    }
}
