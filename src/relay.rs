//! The interval loop: sample, publish, sleep, repeat.
//!
//! One tick runs to completion before the next starts, so at most one publish
//! is ever in flight. Shutdown is honored at the sleep boundary only.

use std::future::Future;
use std::time::Duration;

use crate::appearance::{Appearance, AppearanceCache, REFRESH_RATE_MIN_MS};
use crate::bridge::Transport;
use crate::config::{Config, ConfigSource};
use crate::document::{Document, OutputFormat};
use crate::format::preview;
use crate::publish::Publisher;
use crate::system::SnapshotSource;

pub const LEGACY_INTERVAL: Duration = Duration::from_secs(5);

/// Command-line overrides applied on top of the per-tick config.
#[derive(Debug, Clone, Default)]
pub struct RelayOptions {
    pub interval: Option<Duration>,
    pub format: Option<OutputFormat>,
    pub max_ticks: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct TickReport {
    pub document: Document,
    pub format: OutputFormat,
    pub published: bool,
    pub interval: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelaySummary {
    pub ticks: u64,
    pub published: u64,
    pub failed: u64,
}

pub struct Relay<S, T> {
    source: S,
    config: ConfigSource,
    publisher: Publisher<T>,
    options: RelayOptions,
    appearance: AppearanceCache,
}

impl<S: SnapshotSource, T: Transport> Relay<S, T> {
    pub fn new(source: S, config: ConfigSource, publisher: Publisher<T>, options: RelayOptions) -> Self {
        Relay {
            source,
            config,
            publisher,
            options,
            appearance: AppearanceCache::default(),
        }
    }

    pub fn publisher(&self) -> &Publisher<T> {
        &self.publisher
    }

    /// SAMPLING then PUBLISHING. Never fails: a dropped publish is reported
    /// in the returned [`TickReport`].
    pub fn tick(&mut self) -> TickReport {
        let config = self.config.load();
        let appearance = self.appearance.resolve(&config.appearance);
        let format = self
            .options
            .format
            .unwrap_or_else(|| OutputFormat::from_str_config(&config.monitoring.format));
        let interval = self.interval_for(&config, format, &appearance);

        let snapshot = self.source.sample();
        if let Some(warning) = &snapshot.warning {
            tracing::debug!(warning = %warning, "snapshot incomplete");
        }
        let summary = preview(&snapshot);
        let document = Document::now(snapshot, appearance);

        let published = match format.render(&document) {
            Ok(body) => match self.publisher.publish(&body, &config.bridge.target_path) {
                Ok(()) => {
                    tracing::info!(target = %config.bridge.target_path, "{summary}");
                    true
                }
                Err(err) => {
                    tracing::warn!(error = %err, "publish failed, dropping tick");
                    false
                }
            },
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize document");
                false
            }
        };

        TickReport {
            document,
            format,
            published,
            interval,
        }
    }

    /// Runs until `shutdown` resolves or `max_ticks` is reached.
    pub async fn run<F>(&mut self, shutdown: F) -> RelaySummary
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut summary = RelaySummary::default();

        loop {
            let report = self.tick();
            summary.ticks += 1;
            if report.published {
                summary.published += 1;
            } else {
                summary.failed += 1;
            }

            if self.options.max_ticks.is_some_and(|max| summary.ticks >= max) {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(report.interval) => {}
                _ = &mut shutdown => {
                    tracing::info!("shutdown requested");
                    break;
                }
            }
        }

        tracing::info!(
            ticks = summary.ticks,
            published = summary.published,
            failed = summary.failed,
            "relay stopped"
        );
        summary
    }

    fn interval_for(&self, config: &Config, format: OutputFormat, appearance: &Appearance) -> Duration {
        if let Some(interval) = self.options.interval {
            return interval;
        }
        if let Some(ms) = config.monitoring.interval_ms {
            return Duration::from_millis(ms.max(u64::from(REFRESH_RATE_MIN_MS)));
        }
        match format {
            OutputFormat::Legacy => LEGACY_INTERVAL,
            OutputFormat::Current => Duration::from_millis(u64::from(appearance.refresh_rate_ms)),
        }
    }
}
