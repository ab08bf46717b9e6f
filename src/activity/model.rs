use geo_types::{Coord, Geometry, GeometryCollection, LineString};

use crate::foundation::error::{TopotrackError, TopotrackResult};

/// Summary metadata for a recorded activity.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Activity {
    pub id: String,
    pub name: String,
    /// ISO-8601 start date or timestamp, e.g. `2024-05-03T07:12:00Z`.
    pub start_date: String,
    #[serde(default)]
    pub sport: String,
    #[serde(default)]
    pub distance_m: f64,
    #[serde(default)]
    pub moving_time_s: f64,
    #[serde(default)]
    pub elevation_gain_m: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TelemetrySample {
    /// Seconds since the activity start.
    pub time: f64,
    /// Meters since the activity start.
    pub distance: f64,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub altitude: f64,
}

impl TelemetrySample {
    pub fn coord(&self) -> Coord<f64> {
        Coord {
            x: self.lng,
            y: self.lat,
        }
    }
}

/// Ordered samples; time and distance never decrease.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ActivityTelemetry {
    samples: Vec<TelemetrySample>,
}

impl ActivityTelemetry {
    pub fn new(samples: Vec<TelemetrySample>) -> TopotrackResult<Self> {
        let t = Self { samples };
        t.validate()?;
        Ok(t)
    }

    pub fn validate(&self) -> TopotrackResult<()> {
        for (i, s) in self.samples.iter().enumerate() {
            let finite = [s.time, s.distance, s.lat, s.lng, s.altitude]
                .iter()
                .all(|v| v.is_finite());
            if !finite {
                return Err(TopotrackError::validation(format!(
                    "telemetry sample {i} has a non-finite field"
                )));
            }
            if !(-90.0..=90.0).contains(&s.lat) || !(-180.0..=180.0).contains(&s.lng) {
                return Err(TopotrackError::validation(format!(
                    "telemetry sample {i} is outside lat/lng bounds"
                )));
            }
        }
        for (i, w) in self.samples.windows(2).enumerate() {
            if w[1].time < w[0].time || w[1].distance < w[0].distance {
                return Err(TopotrackError::validation(format!(
                    "telemetry must be monotonic in time and distance (sample {})",
                    i + 1
                )));
            }
        }
        Ok(())
    }

    pub fn samples(&self) -> &[TelemetrySample] {
        &self.samples
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn route(&self) -> LineString<f64> {
        LineString::new(self.samples.iter().map(TelemetrySample::coord).collect())
    }

    /// The route as a feature collection, ready for projection.
    pub fn features(&self) -> GeometryCollection<f64> {
        GeometryCollection(vec![Geometry::LineString(self.route())])
    }

    pub fn total_distance(&self) -> f64 {
        self.samples.last().map_or(0.0, |s| s.distance)
    }

    pub fn duration(&self) -> f64 {
        match (self.samples.first(), self.samples.last()) {
            (Some(a), Some(b)) => b.time - a.time,
            _ => 0.0,
        }
    }

    /// `(min, max)` altitude, or `None` without samples.
    pub fn altitude_range(&self) -> Option<(f64, f64)> {
        self.samples.iter().fold(None, |acc, s| match acc {
            None => Some((s.altitude, s.altitude)),
            Some((lo, hi)) => Some((lo.min(s.altitude), hi.max(s.altitude))),
        })
    }

    /// Sum of positive altitude deltas.
    pub fn elevation_gain(&self) -> f64 {
        self.samples
            .windows(2)
            .map(|w| (w[1].altitude - w[0].altitude).max(0.0))
            .sum()
    }
}
