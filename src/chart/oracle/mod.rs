mod analytic;
pub mod sphere;

pub use analytic::AnalyticOracle;

use crate::chart::{
    error::EphemerisError,
    types::{AstronomicalInstant, Ayanamsa, Body, HouseSystem},
};

/// Geocentric ecliptic state of a body, tropical and of date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawBodyState {
    pub longitude: f64,
    pub latitude: f64,
    /// AU.
    pub distance: f64,
    pub speed_longitude: f64,
    pub speed_latitude: f64,
    pub speed_distance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawHouses {
    pub cusps: [f64; 12],
    pub ascendant: f64,
    pub midheaven: f64,
    pub armc: f64,
    pub vertex: f64,
}

/// Source of planetary positions and house cusps.
///
/// Implementations hold no frame state: results are always tropical, and the sidereal shift is
/// applied by the caller from `ayanamsa`.
pub trait EphemerisOracle: Send + Sync {
    fn name(&self) -> &str;

    /// Half-open Julian Day range `[start, end)` the oracle can answer for.
    fn supported_range(&self) -> (f64, f64);

    fn ensure_supported(&self, instant: AstronomicalInstant) -> Result<(), EphemerisError> {
        let (start, end) = self.supported_range();
        let jd = instant.julian_day();
        if !jd.is_finite() || !(start..end).contains(&jd) {
            return Err(EphemerisError::OutOfRange { jd, start, end });
        }
        Ok(())
    }

    fn body_state(
        &self,
        instant: AstronomicalInstant,
        body: Body,
    ) -> Result<RawBodyState, EphemerisError>;

    fn ayanamsa(&self, instant: AstronomicalInstant, ayanamsa: Ayanamsa)
    -> Result<f64, EphemerisError>;

    fn houses(
        &self,
        instant: AstronomicalInstant,
        latitude: f64,
        longitude: f64,
        system: HouseSystem,
    ) -> Result<RawHouses, EphemerisError>;
}
