//! Upgrade driver - the two-phase upgrade protocol
//!
//! Once an upgrade action is accepted the target is reloaded at a fixed
//! cadence until its transition flag leaves `pending`, then classified:
//!
//! ```text
//! idle -> upgrading -> upgraded   (finish-upgrade issued)
//!                   -> errored    (platform message surfaced)
//!                   -> timed out  (attempt budget spent)
//! ```
//!
//! There is no backoff and no retry. The only early exit besides
//! settling is the shutdown signal.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::{Service, Stack, Transitioning, Upgradable, UPGRADED_STATE};
use crate::error::{PlatformError, UpgradeError};
use crate::infrastructure::Platform;

/// Seconds between reloads of a transitioning target
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Reloads before a still-pending target is declared timed out
pub const MAX_POLL_ATTEMPTS: u32 = 36;

/// Reload cadence and budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: POLL_INTERVAL,
            max_attempts: MAX_POLL_ATTEMPTS,
        }
    }
}

/// How a target's upgrade ended when no error was raised
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeOutcome {
    /// Settled as upgraded and finish-upgrade was accepted
    Finalized,
    /// Settled cleanly in some other lifecycle state; nothing was finalized
    NotFinalized { state: String },
    /// Stack already at the newest catalog revision; nothing was sent
    AlreadyLatest { external_id: String },
}

/// Resource kinds the driver can reload and finalize
#[async_trait]
pub trait UpgradeTarget: Upgradable + Send + Sync + Sized {
    const KIND: &'static str;

    async fn reload(&self, platform: &dyn Platform) -> Result<Self, PlatformError>;

    async fn finish_upgrade(&self, platform: &dyn Platform) -> Result<Self, PlatformError>;
}

#[async_trait]
impl UpgradeTarget for Service {
    const KIND: &'static str = "service";

    async fn reload(&self, platform: &dyn Platform) -> Result<Self, PlatformError> {
        platform.reload_service(self).await
    }

    async fn finish_upgrade(&self, platform: &dyn Platform) -> Result<Self, PlatformError> {
        platform.finish_upgrade_service(self).await
    }
}

#[async_trait]
impl UpgradeTarget for Stack {
    const KIND: &'static str = "stack";

    async fn reload(&self, platform: &dyn Platform) -> Result<Self, PlatformError> {
        platform.reload_stack(self).await
    }

    async fn finish_upgrade(&self, platform: &dyn Platform) -> Result<Self, PlatformError> {
        platform.finish_upgrade_stack(self).await
    }
}

/// Resolve once the shutdown flag is set. Never resolves if the sender is gone.
async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Reload `target` until it stops transitioning, then classify it.
///
/// Returns the settled target when the transition flag is clear. A flag
/// still pending after the budget is a timeout; any other flag is a
/// platform-reported failure carrying its transition message.
pub async fn wait_until_settled<T: UpgradeTarget>(
    platform: &dyn Platform,
    mut target: T,
    policy: &PollPolicy,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<T, UpgradeError> {
    for attempt in 1..=policy.max_attempts {
        target = target.reload(platform).await?;
        if !target.transitioning().is_pending() {
            debug!(
                "{} {} settled after {} check(s)",
                T::KIND,
                target.id(),
                attempt
            );
            break;
        }
        if attempt == policy.max_attempts {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(policy.interval) => {}
            _ = cancelled(shutdown) => {
                return Err(UpgradeError::Cancelled {
                    target: target.id().to_string(),
                });
            }
        }
    }

    match target.transitioning() {
        Transitioning::Settled => Ok(target),
        Transitioning::Pending => Err(UpgradeError::Timeout {
            target: target.id().to_string(),
            attempts: policy.max_attempts,
        }),
        Transitioning::Error | Transitioning::Unknown(_) => Err(UpgradeError::TransitionFailed {
            target: target.id().to_string(),
            message: target.transitioning_message().to_string(),
        }),
    }
}

/// Drive an accepted upgrade to completion and finalize it.
///
/// Finish-upgrade is only issued when the settled lifecycle state is
/// `upgraded`. Any other clean state is returned as
/// [`UpgradeOutcome::NotFinalized`] rather than raised.
pub async fn complete_upgrade<T: UpgradeTarget>(
    platform: &dyn Platform,
    upgrading: T,
    policy: &PollPolicy,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<UpgradeOutcome, UpgradeError> {
    let settled = wait_until_settled(platform, upgrading, policy, shutdown).await?;

    if settled.state() != UPGRADED_STATE {
        warn!(
            "{} '{}' settled in state '{}', not finalizing",
            T::KIND,
            settled.name(),
            settled.state()
        );
        return Ok(UpgradeOutcome::NotFinalized {
            state: settled.state().to_string(),
        });
    }

    settled.finish_upgrade(platform).await?;
    info!("upgrade {} '{}' success", T::KIND, settled.name());
    Ok(UpgradeOutcome::Finalized)
}

/// Result of driving one target, with timing for the summary
#[derive(Debug)]
pub struct TargetReport {
    pub kind: &'static str,
    pub id: String,
    pub name: String,
    pub elapsed: Duration,
    pub result: Result<UpgradeOutcome, UpgradeError>,
}

impl TargetReport {
    pub fn new(
        kind: &'static str,
        id: impl Into<String>,
        name: impl Into<String>,
        started: Instant,
        result: Result<UpgradeOutcome, UpgradeError>,
    ) -> Self {
        Self {
            kind,
            id: id.into(),
            name: name.into(),
            elapsed: started.elapsed(),
            result,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.result.is_err()
    }
}
