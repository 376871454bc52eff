//! Live consumption simulator for the monitoring view.
//!
//! Each region runs a small state machine: `Normal` or `Elevated` with an
//! episode describing how consumption is inflated. [`LiveSimulator::advance`]
//! is the only transition and produces one reading per region.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

/// Simulated regions and their base consumption in litres per day.
pub const REGIONS: [(&str, f64); 5] = [
    ("North", 12000.0),
    ("South", 8000.0),
    ("East", 15000.0),
    ("West", 13000.0),
    ("Central", 14000.0),
];

/// Minimum hours between elevation draws for a Normal region.
const CHECK_INTERVAL_HOURS: f64 = 2.0;
const ELEVATION_CHANCE: f64 = 0.03;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ElevationKind {
    Sudden,
    Gradual,
    Persistent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Pattern {
    Constant,
    Increasing,
    Fluctuating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// An active elevated-consumption episode.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Elevation {
    pub kind: ElevationKind,
    pub pattern: Pattern,
    pub severity: Severity,
    pub multiplier: f64,
    pub start_time: DateTime<Utc>,
    pub duration_hours: u32,
}

impl Elevation {
    /// Draw a new episode of `kind` starting at `now`.
    fn draw<R: Rng>(kind: ElevationKind, now: DateTime<Utc>, rng: &mut R) -> Self {
        let (multiplier, duration_hours, pattern, severity) = match kind {
            ElevationKind::Sudden => (
                rng.gen_range(1.4..=2.2),
                rng.gen_range(4..=24),
                Pattern::Constant,
                Severity::Medium,
            ),
            ElevationKind::Gradual => (
                rng.gen_range(1.2..=1.6),
                rng.gen_range(48..=336),
                Pattern::Increasing,
                Severity::Low,
            ),
            ElevationKind::Persistent => (
                rng.gen_range(1.3..=1.8),
                rng.gen_range(72..=240),
                Pattern::Fluctuating,
                Severity::High,
            ),
        };
        Self {
            kind,
            pattern,
            severity,
            multiplier,
            start_time: now,
            duration_hours,
        }
    }

    pub fn estimated_end(&self) -> DateTime<Utc> {
        self.start_time + Duration::hours(self.duration_hours as i64)
    }

    fn elapsed_hours(&self, now: DateTime<Utc>) -> f64 {
        (now - self.start_time).num_milliseconds() as f64 / 3_600_000.0
    }

    /// Consumption multiplier at `elapsed_hours` into the episode.
    fn factor<R: Rng>(&self, elapsed_hours: f64, rng: &mut R) -> f64 {
        match self.pattern {
            Pattern::Constant => self.multiplier,
            Pattern::Increasing => {
                let progress = (elapsed_hours / self.duration_hours as f64).clamp(0.0, 1.0);
                1.0 + (self.multiplier - 1.0) * progress
            }
            Pattern::Fluctuating => self.multiplier * rng.gen_range(0.8..=1.2),
        }
    }

    fn risk_score(&self, deviation: f64) -> f64 {
        match self.severity {
            Severity::High => (60.0 + deviation * 100.0).min(85.0),
            Severity::Medium => (45.0 + deviation * 80.0).min(70.0),
            Severity::Low => (30.0 + deviation * 60.0).min(55.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegionState {
    Normal { last_check: DateTime<Utc> },
    Elevated(Elevation),
}

/// Outcome of the latest transition for a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RiskStatus {
    Normal,
    Elevated,
    NewElevation,
}

/// Score-based label for the live view: High ≥ 70, Medium ≥ 50, Elevated ≥ 30.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum LiveLevel {
    Normal,
    Elevated,
    Medium,
    High,
}

impl LiveLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 70.0 {
            LiveLevel::High
        } else if score >= 50.0 {
            LiveLevel::Medium
        } else if score >= 30.0 {
            LiveLevel::Elevated
        } else {
            LiveLevel::Normal
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LiveReading {
    pub region: String,
    pub timestamp: DateTime<Utc>,
    /// Litres per day at the current rate.
    pub consumption: f64,
    pub risk_status: RiskStatus,
    pub risk_score: f64,
    pub level: LiveLevel,
    pub elevation: Option<Elevation>,
}

/// Entry of the `/live/elevated` listing.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ElevatedRegion {
    pub region: String,
    pub kind: ElevationKind,
    pub start_time: DateTime<Utc>,
    pub estimated_end: DateTime<Utc>,
    pub severity: Severity,
    pub pattern: Pattern,
}

#[derive(Debug, Clone)]
struct SimulatedRegion {
    name: &'static str,
    base: f64,
    state: RegionState,
}

pub struct LiveSimulator {
    regions: Vec<SimulatedRegion>,
    rng: ChaCha8Rng,
}

impl LiveSimulator {
    /// Fresh simulator with the demo episodes in East and West.
    pub fn new(seed: Option<u64>, now: DateTime<Utc>) -> Self {
        let mut rng = match seed {
            Some(s) => ChaCha8Rng::seed_from_u64(s),
            None => ChaCha8Rng::from_entropy(),
        };

        let regions = REGIONS
            .iter()
            .map(|&(name, base)| {
                let state = match name {
                    "East" => RegionState::Elevated(Elevation {
                        kind: ElevationKind::Persistent,
                        pattern: Pattern::Fluctuating,
                        severity: Severity::High,
                        multiplier: 1.6,
                        start_time: now - Duration::hours(48),
                        duration_hours: 120,
                    }),
                    "West" => RegionState::Elevated(Elevation {
                        kind: ElevationKind::Gradual,
                        pattern: Pattern::Increasing,
                        severity: Severity::Medium,
                        multiplier: 1.3,
                        start_time: now - Duration::hours(24),
                        duration_hours: 72,
                    }),
                    _ => RegionState::Normal {
                        last_check: now - Duration::hours(rng.gen_range(1..=6)),
                    },
                };
                SimulatedRegion { name, base, state }
            })
            .collect();

        Self { regions, rng }
    }

    /// Advance every region to `now` and return the resulting readings.
    pub fn advance(&mut self, now: DateTime<Utc>) -> Vec<LiveReading> {
        let rng = &mut self.rng;
        self.regions
            .iter_mut()
            .map(|region| step(region, now, rng))
            .collect()
    }

    /// Regions currently inside an elevated episode, without advancing.
    pub fn elevated(&self) -> Vec<ElevatedRegion> {
        self.regions
            .iter()
            .filter_map(|r| match &r.state {
                RegionState::Elevated(e) => Some(ElevatedRegion {
                    region: r.name.to_string(),
                    kind: e.kind,
                    start_time: e.start_time,
                    estimated_end: e.estimated_end(),
                    severity: e.severity,
                    pattern: e.pattern,
                }),
                RegionState::Normal { .. } => None,
            })
            .collect()
    }

    pub fn state(&self, region: &str) -> Option<&RegionState> {
        self.regions.iter().find(|r| r.name == region).map(|r| &r.state)
    }
}

fn step<R: Rng>(region: &mut SimulatedRegion, now: DateTime<Utc>, rng: &mut R) -> LiveReading {
    let normal = normal_consumption(region.base, now, rng);

    let (consumption, risk_status, risk_score) = match &mut region.state {
        RegionState::Elevated(episode) => {
            let elapsed = episode.elapsed_hours(now);
            if elapsed > episode.duration_hours as f64 {
                info!(region = region.name, kind = ?episode.kind, "Elevated episode ended");
                region.state = RegionState::Normal { last_check: now };
                (normal, RiskStatus::Normal, rng.gen_range(15.0..=35.0))
            } else {
                let consumption = normal * episode.factor(elapsed, rng);
                let deviation = (consumption - normal) / normal;
                (consumption, RiskStatus::Elevated, episode.risk_score(deviation))
            }
        }
        RegionState::Normal { last_check } => {
            let score = rng.gen_range(10.0..=40.0);
            let mut status = RiskStatus::Normal;
            let since_check = (now - *last_check).num_milliseconds() as f64 / 3_600_000.0;
            if since_check >= CHECK_INTERVAL_HOURS {
                *last_check = now;
                if rng.gen_bool(ELEVATION_CHANCE) {
                    let kind = draw_kind(rng);
                    info!(region = region.name, ?kind, "Region entered elevated state");
                    region.state = RegionState::Elevated(Elevation::draw(kind, now, rng));
                    status = RiskStatus::NewElevation;
                }
            }
            (normal, status, score)
        }
    };

    let elevation = match &region.state {
        RegionState::Elevated(e) => Some(e.clone()),
        RegionState::Normal { .. } => None,
    };

    LiveReading {
        region: region.name.to_string(),
        timestamp: now,
        consumption: (consumption * 100.0).round() / 100.0,
        risk_status,
        risk_score: (risk_score * 10.0).round() / 10.0,
        level: LiveLevel::from_score(risk_score),
        elevation,
    }
}

fn draw_kind<R: Rng>(rng: &mut R) -> ElevationKind {
    const KINDS: [ElevationKind; 3] = [ElevationKind::Gradual, ElevationKind::Sudden, ElevationKind::Persistent];
    match WeightedIndex::new([0.5, 0.3, 0.2]) {
        Ok(dist) => KINDS[dist.sample(rng)],
        Err(_) => ElevationKind::Gradual,
    }
}

/// Baseline consumption rate with daily, weekly, and short-term variation.
fn normal_consumption<R: Rng>(base: f64, now: DateTime<Utc>, rng: &mut R) -> f64 {
    let hour_factor = 0.6 + 0.4 * ((now.hour() as f64 - 6.0) * std::f64::consts::PI / 12.0).sin().abs();
    let weekday_factor = if now.weekday().num_days_from_monday() < 5 { 1.1 } else { 0.9 };
    let wave = 1.0 + 0.05 * (now.second() as f64 * std::f64::consts::PI / 30.0).sin();
    let noise = rng.gen_range(0.95..=1.05);
    (base * hour_factor * weekday_factor * wave * noise).max(base * 0.3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 12, 0, 0).unwrap()
    }

    #[test]
    fn demo_episodes_are_seeded() {
        let sim = LiveSimulator::new(Some(1), t0());
        let elevated = sim.elevated();
        let names: Vec<&str> = elevated.iter().map(|e| e.region.as_str()).collect();
        assert_eq!(names, vec!["East", "West"]);
        assert_eq!(elevated[0].kind, ElevationKind::Persistent);
        assert_eq!(elevated[0].estimated_end, t0() + Duration::hours(72));
        assert_eq!(elevated[1].pattern, Pattern::Increasing);
    }

    #[test]
    fn advance_reads_every_region() {
        let mut sim = LiveSimulator::new(Some(7), t0());
        let readings = sim.advance(t0());
        assert_eq!(readings.len(), REGIONS.len());

        let east = readings.iter().find(|r| r.region == "East").unwrap();
        assert_eq!(east.risk_status, RiskStatus::Elevated);
        assert!(east.risk_score <= 85.0);
        for reading in &readings {
            assert!(reading.consumption > 0.0);
            if reading.risk_status == RiskStatus::Normal {
                assert!((10.0..=40.0).contains(&reading.risk_score));
            }
        }
    }

    #[test]
    fn episodes_expire_back_to_normal() {
        let mut sim = LiveSimulator::new(Some(3), t0());
        // East ends 72h later, West 48h later.
        let readings = sim.advance(t0() + Duration::hours(100));
        for region in ["East", "West"] {
            let r = readings.iter().find(|r| r.region == region).unwrap();
            assert_eq!(r.risk_status, RiskStatus::Normal);
            assert!((15.0..=35.0).contains(&r.risk_score));
            assert!(matches!(sim.state(region), Some(RegionState::Normal { .. })));
        }
    }

    #[test]
    fn gradual_episode_ramps_up() {
        let episode = Elevation {
            kind: ElevationKind::Gradual,
            pattern: Pattern::Increasing,
            severity: Severity::Low,
            multiplier: 1.4,
            start_time: t0(),
            duration_hours: 100,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!((episode.factor(0.0, &mut rng) - 1.0).abs() < 1e-12);
        assert!((episode.factor(50.0, &mut rng) - 1.2).abs() < 1e-12);
        assert!((episode.risk_score(0.4) - 54.0).abs() < 1e-9);
        assert_eq!(episode.risk_score(1.0), 55.0);
    }

    #[test]
    fn live_levels() {
        assert_eq!(LiveLevel::from_score(70.0), LiveLevel::High);
        assert_eq!(LiveLevel::from_score(50.0), LiveLevel::Medium);
        assert_eq!(LiveLevel::from_score(30.0), LiveLevel::Elevated);
        assert_eq!(LiveLevel::from_score(29.9), LiveLevel::Normal);
    }

    #[test]
    fn seeded_draws_are_reproducible() {
        let mut a = LiveSimulator::new(Some(42), t0());
        let mut b = LiveSimulator::new(Some(42), t0());
        let ra = a.advance(t0() + Duration::hours(3));
        let rb = b.advance(t0() + Duration::hours(3));
        for (x, y) in ra.iter().zip(&rb) {
            assert_eq!(x.consumption, y.consumption);
            assert_eq!(x.risk_status, y.risk_status);
        }
    }
}
