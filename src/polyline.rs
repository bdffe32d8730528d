//! Polyline representation for leg geometries.
//!
//! The routing service returns geometry in the compact encoded polyline
//! format (precision 1e5). Decoding happens here, at the boundary; the rest
//! of the crate only sees decoded coordinate sequences.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::LatLng;

const PRECISION: f64 = 1e5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolylineError {
    #[error("invalid polyline character {0:?} at offset {1}")]
    InvalidCharacter(char, usize),
    #[error("polyline ends in the middle of a value")]
    Truncated,
    #[error("polyline value too long at offset {0}")]
    Overflow(usize),
}

/// A polyline representing a route geometry as decoded coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<(f64, f64)>,
}

impl Polyline {
    /// Creates a new Polyline from decoded coordinate points.
    ///
    /// Each point is a (latitude, longitude) tuple.
    pub fn new(points: Vec<(f64, f64)>) -> Self {
        Self { points }
    }

    /// A two-point polyline, used when no road geometry is known.
    pub fn straight(from: LatLng, to: LatLng) -> Self {
        Self::new(vec![(from.lat, from.lng), (to.lat, to.lng)])
    }

    /// Decodes an encoded polyline string.
    pub fn decode(encoded: &str) -> Result<Self, PolylineError> {
        let bytes = encoded.as_bytes();
        let mut index = 0;
        let mut lat: i64 = 0;
        let mut lng: i64 = 0;
        let mut points = Vec::new();

        while index < bytes.len() {
            lat += decode_value(bytes, &mut index)?;
            if index >= bytes.len() {
                return Err(PolylineError::Truncated);
            }
            lng += decode_value(bytes, &mut index)?;
            points.push((lat as f64 / PRECISION, lng as f64 / PRECISION));
        }

        Ok(Self { points })
    }

    /// Encodes the points into the compact polyline format.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        let mut prev_lat: i64 = 0;
        let mut prev_lng: i64 = 0;

        for &(lat, lng) in &self.points {
            let lat = (lat * PRECISION).round() as i64;
            let lng = (lng * PRECISION).round() as i64;
            encode_value(lat - prev_lat, &mut out);
            encode_value(lng - prev_lng, &mut out);
            prev_lat = lat;
            prev_lng = lng;
        }

        out
    }

    /// Returns a reference to the coordinate points.
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Consumes the polyline and returns the owned coordinate points.
    pub fn into_points(self) -> Vec<(f64, f64)> {
        self.points
    }
}

fn decode_value(bytes: &[u8], index: &mut usize) -> Result<i64, PolylineError> {
    let mut result: i64 = 0;
    let mut shift = 0;

    loop {
        let Some(&byte) = bytes.get(*index) else {
            return Err(PolylineError::Truncated);
        };
        if !(63..=126).contains(&byte) {
            return Err(PolylineError::InvalidCharacter(byte as char, *index));
        }
        if shift > 60 {
            return Err(PolylineError::Overflow(*index));
        }
        *index += 1;

        let chunk = (byte - 63) as i64;
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        if chunk < 0x20 {
            break;
        }
    }

    Ok(if result & 1 != 0 {
        !(result >> 1)
    } else {
        result >> 1
    })
}

fn encode_value(delta: i64, out: &mut String) {
    let mut value = if delta < 0 { !(delta << 1) } else { delta << 1 };
    while value >= 0x20 {
        out.push((((value & 0x1f) | 0x20) as u8 + 63) as char);
        value >>= 5;
    }
    out.push((value as u8 + 63) as char);
}
