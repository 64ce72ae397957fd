//! Network quality monitoring.
//!
//! Maps a downlink bandwidth estimate onto a [`QualityTier`]. The estimate
//! comes from a [`BandwidthSource`] capability that may be polled by
//! [`spawn_bandwidth_monitor`] or pushed directly into the session handle.
//! Hosts without any bandwidth signal keep the configured default tier.

mod poller;

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::Mutex;
pub use poller::spawn_bandwidth_monitor;

use crate::domain::QualityTier;

/// Provides the platform's downlink bandwidth estimate.
pub trait BandwidthSource: Send + Sync + Debug {
    /// Latest downlink estimate in megabits per second.
    ///
    /// Returns `None` when the platform exposes no bandwidth signal.
    fn downlink_mbps(&self) -> Option<f64>;
}

/// Source for hosts that expose no bandwidth signal at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBandwidthSignal;

impl BandwidthSource for NoBandwidthSignal {
    fn downlink_mbps(&self) -> Option<f64> {
        None
    }
}

/// Bandwidth estimate set explicitly by the embedding application.
///
/// Clones share the same reading, so one clone can be handed to the poller
/// while another is updated from wherever the host learns about its link.
#[derive(Debug, Default, Clone)]
pub struct ManualBandwidth {
    reading: Arc<Mutex<Option<f64>>>,
}

impl ManualBandwidth {
    /// Creates a source with an initial reading.
    pub fn new(initial: Option<f64>) -> Self {
        Self {
            reading: Arc::new(Mutex::new(initial)),
        }
    }

    /// Replaces the current reading.
    pub fn set(&self, mbps: Option<f64>) {
        *self.reading.lock() = mbps;
    }
}

impl BandwidthSource for ManualBandwidth {
    fn downlink_mbps(&self) -> Option<f64> {
        *self.reading.lock()
    }
}

/// Maps a downlink speed in Mbps to a quality tier.
///
/// Bracket boundaries are exclusive: exactly 9, 4 and 1 Mbps fall into the
/// lower bracket.
pub fn tier_for_speed(mbps: f64) -> QualityTier {
    if mbps > 9.0 {
        QualityTier::High
    } else if mbps > 4.0 {
        QualityTier::Standard
    } else if mbps > 1.0 {
        QualityTier::Medium
    } else {
        QualityTier::Low
    }
}

/// Message shown to the user after the monitor picked `tier`.
pub fn quality_notice(tier: QualityTier) -> &'static str {
    match tier {
        QualityTier::High => "Video quality has been increased due to your fast connection.",
        QualityTier::Standard => "Video quality has been adjusted.",
        QualityTier::Medium => "Video quality has been adjusted due to your moderate connection.",
        QualityTier::Low => "Video quality has been reduced due to your slow connection.",
    }
}

/// Result of feeding a bandwidth reading into the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityObservation {
    pub previous: QualityTier,
    pub tier: QualityTier,
}

impl QualityObservation {
    /// Whether the reading moved the monitor to a different tier.
    pub fn changed(&self) -> bool {
        self.previous != self.tier
    }

    /// User-facing description of the observation.
    pub fn notice(&self) -> &'static str {
        quality_notice(self.tier)
    }
}

/// Tracks the tier suggested by the most recent bandwidth reading.
#[derive(Debug, Clone)]
pub struct NetworkQualityMonitor {
    tier: QualityTier,
    last_reading: Option<f64>,
}

impl NetworkQualityMonitor {
    /// Creates a monitor that reports `default_tier` until a reading arrives.
    pub fn new(default_tier: QualityTier) -> Self {
        Self {
            tier: default_tier,
            last_reading: None,
        }
    }

    /// Tier suggested by the latest accepted reading, or the default.
    pub fn tier(&self) -> QualityTier {
        self.tier
    }

    /// Latest accepted reading in Mbps.
    pub fn last_reading(&self) -> Option<f64> {
        self.last_reading
    }

    /// Feeds a reading into the monitor.
    ///
    /// Non-finite and negative readings are rejected and leave the tier
    /// untouched.
    pub fn observe(&mut self, mbps: f64) -> Option<QualityObservation> {
        if !mbps.is_finite() || mbps < 0.0 {
            tracing::debug!(mbps, "Ignoring invalid bandwidth reading");
            return None;
        }

        let previous = self.tier;
        self.tier = tier_for_speed(mbps);
        self.last_reading = Some(mbps);

        tracing::debug!(mbps, from = %previous, to = %self.tier, "Bandwidth observed");
        Some(QualityObservation {
            previous,
            tier: self.tier,
        })
    }
}

impl Default for NetworkQualityMonitor {
    fn default() -> Self {
        Self::new(QualityTier::default())
    }
}
