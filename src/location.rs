//! Location permission state machine.
//!
//! The platform's permission callbacks are modelled as explicit message
//! passing: callers ask for the status and get a one-shot reply channel;
//! prompt requests flow out over an mpsc channel to whatever owns the real
//! permission dialog (on a headless run, the CLI answers from configuration).
//! At most one reply is ever buffered; a newer request supersedes the older
//! one, whose receiver observes the channel closing.

use std::sync::Mutex;

use tokio::sync::{mpsc, oneshot};

/// Normalized permission status seen by the rest of the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserLocationStatus {
    /// No platform answer yet.
    Initializing,
    /// The platform answered, but the user has not decided.
    Undetermined,
    Granted,
    Denied,
}

/// Raw authorization level as delivered by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationLevel {
    NotDetermined,
    WhenInUse,
    Always,
    Denied,
    Restricted,
}

impl AuthorizationLevel {
    pub fn status(self) -> UserLocationStatus {
        match self {
            AuthorizationLevel::WhenInUse | AuthorizationLevel::Always => {
                UserLocationStatus::Granted
            }
            AuthorizationLevel::NotDetermined => UserLocationStatus::Undetermined,
            AuthorizationLevel::Denied | AuthorizationLevel::Restricted => {
                UserLocationStatus::Denied
            }
        }
    }
}

struct Inner {
    level: Option<AuthorizationLevel>,
    pending: Option<oneshot::Sender<UserLocationStatus>>,
}

/// Buffers status requests until the platform answers.
pub struct LocationGateway {
    prompts: mpsc::UnboundedSender<()>,
    inner: Mutex<Inner>,
}

impl LocationGateway {
    /// Create a gateway plus the receiving end of its prompt-request channel.
    /// Whoever owns the platform permission dialog listens on the receiver
    /// and eventually calls [`authorization_changed`](Self::authorization_changed).
    pub fn new() -> (Self, mpsc::UnboundedReceiver<()>) {
        let (prompts, prompt_rx) = mpsc::unbounded_channel();
        let gateway = Self {
            prompts,
            inner: Mutex::new(Inner {
                level: None,
                pending: None,
            }),
        };
        (gateway, prompt_rx)
    }

    /// Current status without waiting.
    pub fn status(&self) -> UserLocationStatus {
        self.lock()
            .level
            .map(AuthorizationLevel::status)
            .unwrap_or(UserLocationStatus::Initializing)
    }

    /// Ask for the status.
    ///
    /// Resolved statuses reply immediately. `Undetermined` replies
    /// immediately unless `request_authorization` is set, in which case a
    /// prompt request is emitted and the reply waits for the user's decision.
    /// While still `Initializing` the reply always waits; only the newest
    /// waiting request is kept.
    pub fn request_status(
        &self,
        request_authorization: bool,
    ) -> oneshot::Receiver<UserLocationStatus> {
        let (tx, rx) = oneshot::channel();
        let mut inner = self.lock();

        let resolved = match inner.level.map(AuthorizationLevel::status) {
            Some(status @ (UserLocationStatus::Granted | UserLocationStatus::Denied)) => {
                Some(status)
            }
            Some(status @ UserLocationStatus::Undetermined) if !request_authorization => {
                Some(status)
            }
            _ => None,
        };

        if let Some(status) = resolved {
            let _ = tx.send(status);
            return rx;
        }

        if inner.pending.replace(tx).is_some() {
            tracing::debug!("superseding pending location status request");
        }
        drop(inner);

        if request_authorization {
            // Receiver gone means nobody owns a prompt dialog; the request
            // then resolves whenever authorization_changed is called.
            let _ = self.prompts.send(());
        }
        rx
    }

    /// Platform callback: an authorization decision arrived.
    pub fn authorization_changed(&self, level: AuthorizationLevel) {
        let pending = {
            let mut inner = self.lock();
            inner.level = Some(level);
            inner.pending.take()
        };
        tracing::debug!(?level, "location authorization changed");
        if let Some(tx) = pending {
            let _ = tx.send(level.status());
        }
    }

    /// Forget the platform answer and re-arm, e.g. after the app returns to
    /// the foreground. Any waiting request is dropped.
    #[allow(dead_code)] // foreground transitions only exist on the mobile host
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.level = None;
        inner.pending = None;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // State updates cannot panic, so a poisoned lock still holds
        // consistent data.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
