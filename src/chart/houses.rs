use std::sync::Arc;

use crate::chart::{
    error::{ChartError, EphemerisError},
    oracle::{EphemerisOracle, sphere::whole_sign_cusps},
    types::{AstronomicalInstant, HouseFrame, HouseSystem, ResolvedAyanamsa},
    zodiac::{arc_forward, normalize_degrees, sign_index},
};

#[derive(Clone)]
pub struct HouseCalculator {
    oracle: Arc<dyn EphemerisOracle>,
}

impl HouseCalculator {
    pub fn new(oracle: Arc<dyn EphemerisOracle>) -> Self {
        Self { oracle }
    }

    /// Same as [`HouseCalculator::houses`] for a textual system id such as `"P"`.
    pub fn houses_by_id(
        &self,
        instant: AstronomicalInstant,
        latitude: f64,
        longitude: f64,
        system_id: &str,
    ) -> Result<HouseFrame, ChartError> {
        let system: HouseSystem = system_id.parse()?;
        Ok(self.houses(instant, latitude, longitude, system, None)?)
    }

    /// House frame at `instant`; with `ayanamsa` every ecliptic point is shifted into the
    /// sidereal frame the bodies use.
    pub fn houses(
        &self,
        instant: AstronomicalInstant,
        latitude: f64,
        longitude: f64,
        system: HouseSystem,
        ayanamsa: Option<&ResolvedAyanamsa>,
    ) -> Result<HouseFrame, EphemerisError> {
        self.oracle.ensure_supported(instant)?;
        let raw = self.oracle.houses(instant, latitude, longitude, system)?;
        if !raw
            .cusps
            .iter()
            .chain([&raw.ascendant, &raw.midheaven, &raw.armc, &raw.vertex])
            .all(|value| value.is_finite())
        {
            return Err(EphemerisError::Oracle(format!(
                "{} returned non-finite {} houses",
                self.oracle.name(),
                system
            )));
        }

        let offset = ayanamsa.map_or(0.0, |resolved| resolved.value);
        let shift = |deg: f64| normalize_degrees(deg - offset);
        let ascendant = shift(raw.ascendant);
        let cusps = match system {
            // Sign boundaries do not survive a shift; rebuild them from the shifted Ascendant.
            HouseSystem::WholeSign => whole_sign_cusps(ascendant),
            _ => raw.cusps.map(shift),
        };

        Ok(HouseFrame {
            cusps,
            ascendant,
            midheaven: shift(raw.midheaven),
            armc: normalize_degrees(raw.armc),
            vertex: shift(raw.vertex),
        })
    }
}

/// House (1..=12) containing `longitude`. Total for every input.
pub fn house_for_longitude(frame: &HouseFrame, system: HouseSystem, longitude: f64) -> u8 {
    match system {
        HouseSystem::WholeSign => whole_sign_house(frame.ascendant, longitude),
        _ => cusp_house(&frame.cusps, longitude),
    }
}

pub fn whole_sign_house(ascendant: f64, longitude: f64) -> u8 {
    let offset = (sign_index(longitude) + 12 - sign_index(ascendant)) % 12;
    offset as u8 + 1
}

/// Walks `[cusp_i, cusp_i+1)` arcs. If none claims the longitude, which only happens for a
/// non-monotonic cusp sequence, the house of the nearest preceding cusp wins.
pub fn cusp_house(cusps: &[f64; 12], longitude: f64) -> u8 {
    let longitude = normalize_degrees(longitude);
    for index in 0..12 {
        let start = normalize_degrees(cusps[index]);
        let end = normalize_degrees(cusps[(index + 1) % 12]);
        if in_arc(longitude, start, end) {
            return index as u8 + 1;
        }
    }

    let mut nearest = 0;
    let mut nearest_arc = f64::INFINITY;
    for (index, cusp) in cusps.iter().enumerate() {
        let arc = arc_forward(*cusp, longitude);
        if arc < nearest_arc {
            nearest = index;
            nearest_arc = arc;
        }
    }
    nearest as u8 + 1
}

fn in_arc(longitude: f64, start: f64, end: f64) -> bool {
    if start <= end {
        longitude >= start && longitude < end
    } else {
        longitude >= start || longitude < end
    }
}
