pub mod mode;
pub mod oauth;

pub use mode::{AuthMode, AuthModeSettings};
pub use oauth::OAuthFlow;
