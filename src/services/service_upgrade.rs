//! Service upgrade - selector-driven in-service upgrades
//!
//! Every service whose primary or secondary launch configuration matches
//! the selector is upgraded independently in its own task. Each task owns
//! its service and strategy; one failure never cancels or delays another.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ServiceUpgradeConfig;
use crate::domain::{build_strategy, match_service, Service, ServiceUpgrade};
use crate::error::UpgradeError;
use crate::infrastructure::Platform;
use crate::services::driver::{complete_upgrade, PollPolicy, TargetReport, UpgradeOutcome};

/// Upgrades services matching a label selector
pub struct ServiceUpgrader {
    platform: Arc<dyn Platform>,
    policy: PollPolicy,
    shutdown: watch::Receiver<bool>,
}

impl ServiceUpgrader {
    pub fn new(platform: Arc<dyn Platform>, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            platform,
            policy: PollPolicy::default(),
            shutdown,
        }
    }

    /// Plan the upgrade: one strategy per matching service.
    ///
    /// Listing failure is fatal for the whole run.
    pub async fn plan(
        &self,
        config: &ServiceUpgradeConfig,
    ) -> Result<Vec<(Service, ServiceUpgrade)>, UpgradeError> {
        let services = self.platform.list_services().await?;
        debug!("Evaluating {} service(s) against {}", services.len(), config.selector);

        let planned: Vec<(Service, ServiceUpgrade)> = services
            .into_iter()
            .filter_map(|service| {
                let matched = match_service(&service, &config.selector, &config.image)?;
                let upgrade = build_strategy(&config.batch, matched);
                Some((service, upgrade))
            })
            .collect();

        info!(
            "{} service(s) match selector {}",
            planned.len(),
            config.selector
        );
        Ok(planned)
    }

    /// Upgrade every matching service concurrently and report each one
    pub async fn run(&self, config: &ServiceUpgradeConfig) -> Result<Vec<TargetReport>, UpgradeError> {
        let planned = self.plan(config).await?;

        let handles: Vec<(String, String, Instant, JoinHandle<TargetReport>)> = planned
            .into_iter()
            .map(|(service, upgrade)| {
                let id = service.id.clone();
                let name = service.name.clone();
                let started = Instant::now();
                let handle = tokio::spawn(upgrade_one(
                    Arc::clone(&self.platform),
                    service,
                    upgrade,
                    self.policy,
                    self.shutdown.clone(),
                ));
                (id, name, started, handle)
            })
            .collect();

        let mut reports = Vec::with_capacity(handles.len());
        for (id, name, started, handle) in handles {
            let report = match handle.await {
                Ok(report) => report,
                Err(e) => {
                    warn!("upgrade task for service {} did not complete: {}", id, e);
                    TargetReport::new(
                        "service",
                        id.clone(),
                        name,
                        started,
                        Err(UpgradeError::TaskAborted {
                            target: id,
                            message: e.to_string(),
                        }),
                    )
                }
            };
            reports.push(report);
        }

        Ok(reports)
    }
}

/// One unit of work: issue the upgrade, then drive it to completion
async fn upgrade_one(
    platform: Arc<dyn Platform>,
    service: Service,
    upgrade: ServiceUpgrade,
    policy: PollPolicy,
    mut shutdown: watch::Receiver<bool>,
) -> TargetReport {
    let started = Instant::now();
    let id = service.id.clone();
    let name = service.name.clone();

    let result: Result<UpgradeOutcome, UpgradeError> = async {
        info!("upgrading service '{}' ({})", name, id);
        let upgrading = platform.upgrade_service(&service, &upgrade).await?;
        complete_upgrade(platform.as_ref(), upgrading, &policy, &mut shutdown).await
    }
    .await;

    if let Err(ref e) = result {
        warn!("upgrade of service '{}' failed: {}", name, e);
    }

    TargetReport::new("service", id, name, started, result)
}

/// Outcome counts for the run summary
pub fn tally(reports: &[TargetReport]) -> (usize, usize, usize) {
    reports.iter().fold((0, 0, 0), |(ok, skipped, failed), r| match &r.result {
        Ok(UpgradeOutcome::Finalized) => (ok + 1, skipped, failed),
        Ok(_) => (ok, skipped + 1, failed),
        Err(_) => (ok, skipped, failed + 1),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BatchPolicy, LabelSelector};
    use crate::infrastructure::fake::{FakePlatform, Step};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn config(key: &str, value: &str) -> ServiceUpgradeConfig {
        ServiceUpgradeConfig {
            selector: LabelSelector::new(BTreeMap::from([(key.to_string(), value.to_string())])),
            image: "registry/web:42".to_string(),
            batch: BatchPolicy::new(2, 3, true).unwrap(),
        }
    }

    fn platform() -> FakePlatform {
        FakePlatform::new()
            .with_service(json!({
                "id": "1s1", "name": "web",
                "launchConfig": {"imageUuid": "docker:web:1", "labels": {"app": "web"}}
            }))
            .with_service(json!({
                "id": "1s2", "name": "api",
                "launchConfig": {"imageUuid": "docker:api:1", "labels": {"app": "api"}},
                "secondaryLaunchConfigs": [
                    {"name": "web-sidecar", "imageUuid": "docker:web:1", "labels": {"App": "WEB"}}
                ]
            }))
            .with_service(json!({
                "id": "1s3", "name": "db",
                "launchConfig": {"imageUuid": "docker:db:1", "labels": {"app": "db"}}
            }))
    }

    #[tokio::test]
    async fn test_plan_skips_non_matching() {
        let platform = Arc::new(platform());
        let (_tx, rx) = watch::channel(false);
        let upgrader = ServiceUpgrader::new(platform, rx);

        let planned = upgrader.plan(&config("app", "web")).await.unwrap();
        let ids: Vec<&str> = planned.iter().map(|(s, _)| s.id.as_str()).collect();
        assert_eq!(ids, vec!["1s1", "1s2"]);

        let (_, api) = &planned[1];
        let strategy = &api.in_service_strategy;
        assert!(strategy.launch_config.is_none());
        assert_eq!(strategy.secondary_launch_configs.as_ref().unwrap().len(), 1);
        assert_eq!(strategy.interval_millis, 3000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_upgrades_matching_only() {
        let platform = Arc::new(platform());
        let (_tx, rx) = watch::channel(false);
        let upgrader = ServiceUpgrader::new(platform.clone(), rx);

        let reports = upgrader.run(&config("app", "web")).await.unwrap();

        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.result.as_ref().ok() == Some(&UpgradeOutcome::Finalized)));
        assert_eq!(platform.count("upgrade:1s3"), 0);
        assert_eq!(platform.count_prefix("finish:"), 2);

        let inputs = platform.inputs();
        let (_, web) = inputs.iter().find(|(id, _)| id == "1s1").unwrap();
        assert_eq!(
            web["inServiceStrategy"]["launchConfig"]["imageUuid"],
            "docker:registry/web:42"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_isolated_per_service() {
        let platform = Arc::new(
            platform()
                .failing("upgrade:1s1")
                .script("1s2", vec![Step::pending(), Step::settled("upgraded")]),
        );
        let (_tx, rx) = watch::channel(false);
        let upgrader = ServiceUpgrader::new(platform.clone(), rx);

        let reports = upgrader.run(&config("app", "web")).await.unwrap();

        let web = reports.iter().find(|r| r.id == "1s1").unwrap();
        let api = reports.iter().find(|r| r.id == "1s2").unwrap();
        assert!(web.is_failure());
        assert_eq!(api.result.as_ref().unwrap(), &UpgradeOutcome::Finalized);
        assert_eq!(platform.count("reload:1s1"), 0);
        assert_eq!(tally(&reports), (1, 0, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_units_run_concurrently() {
        // both services need 36 checks; sequential runs would take twice as long
        let platform = Arc::new(
            platform()
                .script("1s1", vec![Step::pending()])
                .script("1s2", vec![Step::pending()]),
        );
        let (_tx, rx) = watch::channel(false);
        let upgrader = ServiceUpgrader::new(platform.clone(), rx);

        let start = tokio::time::Instant::now();
        let reports = upgrader.run(&config("app", "web")).await.unwrap();

        assert_eq!(start.elapsed(), crate::services::driver::POLL_INTERVAL * 35);
        assert!(reports
            .iter()
            .all(|r| matches!(r.result, Err(UpgradeError::Timeout { .. }))));
    }

    #[tokio::test]
    async fn test_listing_failure_is_fatal() {
        let platform = Arc::new(platform().failing("list:services"));
        let (_tx, rx) = watch::channel(false);
        let upgrader = ServiceUpgrader::new(platform, rx);

        assert!(upgrader.run(&config("app", "web")).await.is_err());
    }
}
