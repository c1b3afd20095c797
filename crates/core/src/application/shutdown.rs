// Run Abort Token
// Cancellation is only honored between steps: external tools are not
// assumed to respond to interrupts cleanly, so no mid-step kill.

use tokio::sync::watch;

/// Pending run-abort flag, checked before each step dispatch
#[derive(Clone)]
pub struct AbortToken {
    rx: watch::Receiver<bool>,
    // Keeps the channel open for tokens created via `never`
    _keepalive: Option<std::sync::Arc<watch::Sender<bool>>>,
}

impl AbortToken {
    /// Check if an abort was requested
    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Token that never fires, for runs without a cancellation source
    pub fn never() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            rx,
            _keepalive: Some(std::sync::Arc::new(tx)),
        }
    }
}

/// Abort sender
pub struct AbortSender {
    tx: watch::Sender<bool>,
}

impl AbortSender {
    /// Request abort of the running plan
    pub fn abort(&self) {
        let _ = self.tx.send(true);
    }
}

/// Create an abort channel
pub fn abort_channel() -> (AbortSender, AbortToken) {
    let (tx, rx) = watch::channel(false);
    (
        AbortSender { tx },
        AbortToken {
            rx,
            _keepalive: None,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_flag_propagates() {
        let (tx, token) = abort_channel();
        assert!(!token.is_aborted());

        tx.abort();
        assert!(token.is_aborted());
    }

    #[test]
    fn test_never_token_stays_clear() {
        let token = AbortToken::never();
        assert!(!token.is_aborted());
    }
}
