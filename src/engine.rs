use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::models::{sensor_id, MonitorState, ServiceStatus, ServiceType};
use crate::page::{self, PageAssessment};
use crate::registry::{self, Location, RegistrationForm};

/// Outcome of the single page fetch shared by every location in a cycle.
enum FetchOutcome {
    Body(String),
    Failed(ServiceStatus),
}

pub struct Monitor {
    pub config: MonitorConfig,
    http_client: reqwest::Client,
    pub state: Arc<Mutex<MonitorState>>,
}

impl Monitor {
    pub fn new(config: MonitorConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            config,
            http_client,
            state: Arc::new(Mutex::new(MonitorState::new())),
        })
    }

    /// Seeds the registry from the config file. Duplicate or blank entries
    /// are skipped with a warning instead of failing startup.
    pub async fn initialize_state(&self) {
        let mut state = self.state.lock().await;
        for entry in &self.config.locations {
            let form = RegistrationForm {
                street: entry.street.clone(),
                zone: entry.zone,
            };
            match registry::register_into(&form, &mut state) {
                Ok(location) => info!("Monitoring {}", location.title),
                Err(e) => warn!("Skipping configured location '{}': {}", entry.street, e),
            }
        }
        info!(
            "Registry seeded with {} locations ({} sensors)",
            state.locations.len(),
            state.sensors.len()
        );
    }

    pub async fn run(self: Arc<Self>) -> Result<()> {
        info!(
            "Polling {} every {} minutes",
            self.config.provider_url, self.config.check_interval_minutes
        );

        self.initialize_state().await;

        loop {
            self.poll_cycle().await;
            tokio::time::sleep(Duration::from_secs(self.config.check_interval_minutes * 60)).await;
        }
    }

    /// One fetch-parse-update pass over every registered location. Never
    /// fails: network and site problems become sensor statuses and the
    /// next scheduled cycle retries from scratch.
    pub async fn poll_cycle(&self) {
        let locations: Vec<Location> = {
            let state = self.state.lock().await;
            state.locations.values().cloned().collect()
        };
        if locations.is_empty() {
            debug!("No locations registered, skipping cycle");
            return;
        }

        let outcome = self.fetch_page().await;

        for location in &locations {
            let assessment = match &outcome {
                FetchOutcome::Body(text) => page::assess(text, &location.street),
                FetchOutcome::Failed(status) => PageAssessment::all_failed(*status),
            };
            self.apply_assessment(location, &assessment).await;
        }
    }

    async fn fetch_page(&self) -> FetchOutcome {
        let response = match self.http_client.get(&self.config.provider_url).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                warn!("Provider page timed out: {}", e);
                return FetchOutcome::Failed(ServiceStatus::Timeout);
            }
            Err(e) => {
                warn!("Provider page unreachable: {}", e);
                return FetchOutcome::Failed(ServiceStatus::ConnectionError);
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!("Provider returned status code {}", status);
            return FetchOutcome::Failed(ServiceStatus::SiteError);
        }

        match response.text().await {
            Ok(body) => FetchOutcome::Body(body),
            Err(e) if e.is_timeout() => {
                warn!("Provider page timed out mid-body: {}", e);
                FetchOutcome::Failed(ServiceStatus::Timeout)
            }
            Err(e) => {
                warn!("Failed to read provider page body: {}", e);
                FetchOutcome::Failed(ServiceStatus::ConnectionError)
            }
        }
    }

    async fn apply_assessment(&self, location: &Location, assessment: &PageAssessment) {
        let now = Utc::now();
        let mut state = self.state.lock().await;

        for service in ServiceType::ALL {
            let outcome = assessment.outcome(service);
            let key = sensor_id(&location.id, service);
            // The location may have been removed since the cycle snapshot.
            let Some(sensor) = state.sensors.get_mut(&key) else {
                continue;
            };

            let old = sensor.status;
            sensor.status = outcome.status;
            sensor.available = outcome.status.is_available();
            sensor.period = outcome.period.clone();
            sensor.detail = outcome.detail.clone();
            if sensor.available {
                sensor.last_update = Some(now);
            }

            if old != outcome.status {
                let msg = format!(
                    "[CHANGE] {}/{}: {} -> {}",
                    location.street,
                    service.label(),
                    old,
                    outcome.status
                );
                if outcome.status == ServiceStatus::Normal {
                    info!("{}", msg);
                } else {
                    warn!("{}", msg);
                }
            }
        }
    }
}
