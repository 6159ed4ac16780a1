use crate::location::AuthorizationLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Headless stand-in for the platform location-permission dialog: what the
/// "user" answers when a run asks for authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LocationPolicy {
    /// Grant when-in-use authorization.
    Allow,
    /// Leave the decision open.
    Ask,
    /// Deny authorization.
    Deny,
}

impl LocationPolicy {
    pub fn authorization_level(self) -> AuthorizationLevel {
        match self {
            LocationPolicy::Allow => AuthorizationLevel::WhenInUse,
            LocationPolicy::Ask => AuthorizationLevel::NotDetermined,
            LocationPolicy::Deny => AuthorizationLevel::Denied,
        }
    }
}
