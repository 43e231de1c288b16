//! Provider failover: automatic fallback when the primary provider fails.
//!
//! Lightweight failover chain: try primary → fallback₁ → fallback₂.
//! A provider that keeps failing is skipped until its cool-down expires.

use async_trait::async_trait;
use mamaguide_core::error::{MamaGuideError, Result};
use mamaguide_core::traits::{GenerateParams, Provider};
use mamaguide_core::types::{Message, ProviderResponse};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Per-provider health tracking.
struct ProviderSlot {
    provider: Box<dyn Provider>,
    /// Consecutive failure count.
    failures: AtomicU32,
    /// Timestamp of last failure (unix secs, 0 = never failed).
    last_failure: AtomicU64,
    /// Max failures before skip.
    max_failures: u32,
    /// Cool-down period in seconds before retrying a failed provider.
    cooldown_secs: u64,
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

impl ProviderSlot {
    fn new(provider: Box<dyn Provider>) -> Self {
        Self {
            provider,
            failures: AtomicU32::new(0),
            last_failure: AtomicU64::new(0),
            max_failures: 3,
            cooldown_secs: 60,
        }
    }

    /// Healthy while below the failure threshold, or once the cool-down has expired.
    fn is_healthy(&self) -> bool {
        let fails = self.failures.load(Ordering::Relaxed);
        if fails < self.max_failures {
            return true;
        }
        let last = self.last_failure.load(Ordering::Relaxed);
        now_secs().saturating_sub(last) > self.cooldown_secs
    }

    fn record_success(&self) {
        self.failures.store(0, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        self.last_failure.store(now_secs(), Ordering::Relaxed);
    }
}

/// Failover provider: tries providers in order, skipping unhealthy ones.
pub struct FailoverProvider {
    slots: Vec<ProviderSlot>,
}

impl FailoverProvider {
    /// Create a failover chain. First provider is primary, rest are fallbacks.
    pub fn new(providers: Vec<Box<dyn Provider>>) -> Result<Self> {
        if providers.is_empty() {
            return Err(MamaGuideError::Config(
                "Failover chain needs at least one provider".into(),
            ));
        }
        Ok(Self {
            slots: providers.into_iter().map(ProviderSlot::new).collect(),
        })
    }

    /// Number of providers in the chain.
    pub fn chain_len(&self) -> usize {
        self.slots.len()
    }

    /// Health status of all providers: (name, healthy, consecutive failures).
    pub fn health_status(&self) -> Vec<(&str, bool, u32)> {
        self.slots
            .iter()
            .map(|s| {
                (
                    s.provider.name(),
                    s.is_healthy(),
                    s.failures.load(Ordering::Relaxed),
                )
            })
            .collect()
    }
}

#[async_trait]
impl Provider for FailoverProvider {
    fn name(&self) -> &str {
        self.slots
            .first()
            .map(|s| s.provider.name())
            .unwrap_or("failover")
    }

    async fn chat(&self, messages: &[Message], params: &GenerateParams) -> Result<ProviderResponse> {
        let mut last_error = None;

        for (idx, slot) in self.slots.iter().enumerate() {
            if !slot.is_healthy() {
                tracing::debug!(
                    "⏭️ Skipping unhealthy provider: {} ({} failures)",
                    slot.provider.name(),
                    slot.failures.load(Ordering::Relaxed)
                );
                continue;
            }

            match slot.provider.chat(messages, params).await {
                Ok(response) => {
                    if idx > 0 {
                        tracing::info!(
                            "🔄 Failover: {} → {} (success)",
                            self.slots[0].provider.name(),
                            slot.provider.name()
                        );
                    }
                    slot.record_success();
                    return Ok(response);
                }
                Err(e) => {
                    slot.record_failure();
                    tracing::warn!(
                        "⚠️ Provider {} failed (attempt {}): {}",
                        slot.provider.name(),
                        slot.failures.load(Ordering::Relaxed),
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| MamaGuideError::Provider("All providers unhealthy".into())))
    }

    async fn health_check(&self) -> Result<bool> {
        for slot in &self.slots {
            if slot.is_healthy() && matches!(slot.provider.health_check().await, Ok(true)) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
