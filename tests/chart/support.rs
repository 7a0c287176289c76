use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use natal_insight::chart::{
    AnalyticOracle, AstronomicalInstant, Ayanamsa, BirthInput, Body, ChartAssembler,
    ChartSnapshot, EphemerisError, EphemerisOracle, GeoTimeContext, HouseSystem,
    oracle::{RawBodyState, RawHouses},
};

pub fn new_york_birth() -> (BirthInput, GeoTimeContext) {
    (
        BirthInput {
            name: "Ada".to_string(),
            date: "1990-07-21".to_string(),
            time: "09:15".to_string(),
            location: "New York, USA".to_string(),
            gender: Some("female".to_string()),
        },
        GeoTimeContext {
            latitude: 40.7128,
            longitude: -74.006,
            timezone: "America/New_York".to_string(),
        },
    )
}

pub fn assembler() -> ChartAssembler {
    ChartAssembler::new(Arc::new(AnalyticOracle::new()))
}

pub fn new_york_chart(system: HouseSystem) -> ChartSnapshot {
    let (birth, geo) = new_york_birth();
    assembler()
        .assemble(&birth, &geo, system, None)
        .expect("reference chart assembles")
}

/// Analytic positions, but only answers for the day starting at J2000. Counts every query.
#[derive(Default)]
pub struct OneDayOracle {
    inner: AnalyticOracle,
    pub queries: AtomicUsize,
}

impl OneDayOracle {
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl EphemerisOracle for OneDayOracle {
    fn name(&self) -> &str {
        "one-day"
    }

    fn supported_range(&self) -> (f64, f64) {
        let start = AstronomicalInstant::J2000.julian_day();
        (start, start + 1.0)
    }

    fn body_state(
        &self,
        instant: AstronomicalInstant,
        body: Body,
    ) -> Result<RawBodyState, EphemerisError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.body_state(instant, body)
    }

    fn ayanamsa(
        &self,
        instant: AstronomicalInstant,
        ayanamsa: Ayanamsa,
    ) -> Result<f64, EphemerisError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.ayanamsa(instant, ayanamsa)
    }

    fn houses(
        &self,
        instant: AstronomicalInstant,
        latitude: f64,
        longitude: f64,
        system: HouseSystem,
    ) -> Result<RawHouses, EphemerisError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.houses(instant, latitude, longitude, system)
    }
}
