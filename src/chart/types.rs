use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::chart::{
    error::{ChartError, UnsupportedHouseSystemError, invalid_input},
    houses::house_for_longitude,
    zodiac::normalize_degrees,
};

pub const J2000_JD: f64 = 2_451_545.0;
pub const DAYS_PER_JULIAN_CENTURY: f64 = 36_525.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Body {
    Sun,
    Moon,
    Mercury,
    Venus,
    Mars,
    Jupiter,
    Saturn,
    Uranus,
    Neptune,
    Pluto,
    #[serde(rename = "Rahu")]
    MeanNode,
    #[serde(rename = "Ketu")]
    SouthNode,
}

impl Body {
    /// Every body a natal chart carries, in serialization order.
    pub const CHART_SET: [Body; 12] = [
        Body::Sun,
        Body::Moon,
        Body::Mercury,
        Body::Venus,
        Body::Mars,
        Body::Jupiter,
        Body::Saturn,
        Body::Uranus,
        Body::Neptune,
        Body::Pluto,
        Body::MeanNode,
        Body::SouthNode,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Body::Sun => "Sun",
            Body::Moon => "Moon",
            Body::Mercury => "Mercury",
            Body::Venus => "Venus",
            Body::Mars => "Mars",
            Body::Jupiter => "Jupiter",
            Body::Saturn => "Saturn",
            Body::Uranus => "Uranus",
            Body::Neptune => "Neptune",
            Body::Pluto => "Pluto",
            Body::MeanNode => "Rahu",
            Body::SouthNode => "Ketu",
        }
    }

    /// Ketu is never asked of the oracle; it is derived from Rahu.
    pub fn is_derived(self) -> bool {
        matches!(self, Body::SouthNode)
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HouseSystem {
    #[serde(rename = "P")]
    Placidus,
    #[serde(rename = "K")]
    Koch,
    #[serde(rename = "R")]
    Regiomontanus,
    #[serde(rename = "C")]
    Campanus,
    #[serde(rename = "E")]
    Equal,
    #[serde(rename = "W")]
    WholeSign,
}

impl HouseSystem {
    pub fn code(self) -> char {
        match self {
            HouseSystem::Placidus => 'P',
            HouseSystem::Koch => 'K',
            HouseSystem::Regiomontanus => 'R',
            HouseSystem::Campanus => 'C',
            HouseSystem::Equal => 'E',
            HouseSystem::WholeSign => 'W',
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            HouseSystem::Placidus => "Placidus",
            HouseSystem::Koch => "Koch",
            HouseSystem::Regiomontanus => "Regiomontanus",
            HouseSystem::Campanus => "Campanus",
            HouseSystem::Equal => "Equal",
            HouseSystem::WholeSign => "Whole Sign",
        }
    }
}

impl fmt::Display for HouseSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HouseSystem {
    type Err = UnsupportedHouseSystemError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "P" | "p" => Ok(HouseSystem::Placidus),
            "K" | "k" => Ok(HouseSystem::Koch),
            "R" | "r" => Ok(HouseSystem::Regiomontanus),
            "C" | "c" => Ok(HouseSystem::Campanus),
            "E" | "e" => Ok(HouseSystem::Equal),
            "W" | "w" => Ok(HouseSystem::WholeSign),
            _ => Err(UnsupportedHouseSystemError(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Ayanamsa {
    Lahiri,
    Raman,
    Krishnamurti,
}

impl Ayanamsa {
    pub fn as_str(self) -> &'static str {
        match self {
            Ayanamsa::Lahiri => "LAHIRI",
            Ayanamsa::Raman => "RAMAN",
            Ayanamsa::Krishnamurti => "KRISHNAMURTI",
        }
    }
}

impl fmt::Display for Ayanamsa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Ayanamsa {
    type Err = ChartError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "LAHIRI" => Ok(Ayanamsa::Lahiri),
            "RAMAN" => Ok(Ayanamsa::Raman),
            "KRISHNAMURTI" => Ok(Ayanamsa::Krishnamurti),
            _ => Err(invalid_input(format!("unknown ayanamsa '{}'", raw))),
        }
    }
}

/// Reference frame for ecliptic longitudes, threaded explicitly into every query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "ayanamsa", rename_all = "snake_case")]
pub enum Zodiac {
    #[default]
    Tropical,
    Sidereal(Ayanamsa),
}

impl Zodiac {
    pub fn from_ayanamsa(ayanamsa: Option<Ayanamsa>) -> Self {
        ayanamsa.map_or(Zodiac::Tropical, Zodiac::Sidereal)
    }

    pub fn ayanamsa(self) -> Option<Ayanamsa> {
        match self {
            Zodiac::Tropical => None,
            Zodiac::Sidereal(ayanamsa) => Some(ayanamsa),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedAyanamsa {
    pub name: Ayanamsa,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BirthInput {
    pub name: String,
    pub date: String,
    pub time: String,
    pub location: String,
    #[serde(default)]
    pub gender: Option<String>,
}

impl BirthInput {
    /// Checks the textual shape only; calendar validity is enforced by `TimeResolver`.
    pub fn validate(&self) -> Result<(), ChartError> {
        if !matches_shape(&self.date, "dddd-dd-dd") {
            return Err(invalid_input(format!(
                "birth date '{}' must match YYYY-MM-DD",
                self.date
            )));
        }
        if !matches_shape(&self.time, "dd:dd") {
            return Err(invalid_input(format!(
                "birth time '{}' must match HH:MM",
                self.time
            )));
        }
        if self.location.trim().is_empty() {
            return Err(invalid_input("birth location cannot be empty"));
        }
        Ok(())
    }
}

pub(crate) fn matches_shape(value: &str, shape: &str) -> bool {
    value.len() == shape.len()
        && value.bytes().zip(shape.bytes()).all(|(actual, expected)| {
            if expected == b'd' {
                actual.is_ascii_digit()
            } else {
                actual == expected
            }
        })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoTimeContext {
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
}

impl GeoTimeContext {
    pub fn validate(&self) -> Result<(), ChartError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(invalid_input(format!(
                "latitude {} must be within [-90, 90]",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(invalid_input(format!(
                "longitude {} must be within [-180, 180]",
                self.longitude
            )));
        }
        if self.timezone.trim().is_empty() {
            return Err(invalid_input("timezone cannot be empty"));
        }
        Ok(())
    }
}

/// A point in time as a Julian Day in Universal Time.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AstronomicalInstant {
    julian_day: f64,
}

impl AstronomicalInstant {
    pub const J2000: AstronomicalInstant = AstronomicalInstant {
        julian_day: J2000_JD,
    };

    pub fn from_julian_day(julian_day: f64) -> Self {
        Self { julian_day }
    }

    pub fn julian_day(self) -> f64 {
        self.julian_day
    }

    pub fn centuries_since_j2000(self) -> f64 {
        (self.julian_day - J2000_JD) / DAYS_PER_JULIAN_CENTURY
    }

    pub fn offset_days(self, days: f64) -> Self {
        Self {
            julian_day: self.julian_day + days,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyPosition {
    pub longitude: f64,
    pub latitude: f64,
    pub distance: f64,
    pub speed_longitude: f64,
    pub is_retrograde: bool,
}

impl BodyPosition {
    pub fn new(longitude: f64, latitude: f64, distance: f64, speed_longitude: f64) -> Self {
        Self {
            longitude: normalize_degrees(longitude),
            latitude,
            distance,
            speed_longitude,
            is_retrograde: speed_longitude < 0.0,
        }
    }

    pub fn antipode(&self) -> Self {
        Self::new(
            self.longitude + 180.0,
            -self.latitude,
            self.distance,
            self.speed_longitude,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseFrame {
    /// `cusps[i]` opens house `i + 1`.
    pub cusps: [f64; 12],
    pub ascendant: f64,
    pub midheaven: f64,
    pub armc: f64,
    pub vertex: f64,
}

impl HouseFrame {
    pub fn cusp(&self, house: u8) -> Option<f64> {
        (1..=12)
            .contains(&house)
            .then(|| self.cusps[usize::from(house) - 1])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSnapshot {
    subject: BirthInput,
    instant: AstronomicalInstant,
    geo: GeoTimeContext,
    house_system: HouseSystem,
    #[serde(default)]
    ayanamsa: Option<ResolvedAyanamsa>,
    #[serde(default)]
    bodies: BTreeMap<Body, BodyPosition>,
    #[serde(default)]
    houses: Option<HouseFrame>,
    computed_at: DateTime<Utc>,
}

impl ChartSnapshot {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn freeze(
        subject: BirthInput,
        instant: AstronomicalInstant,
        geo: GeoTimeContext,
        house_system: HouseSystem,
        ayanamsa: Option<ResolvedAyanamsa>,
        bodies: BTreeMap<Body, BodyPosition>,
        houses: HouseFrame,
        computed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            subject,
            instant,
            geo,
            house_system,
            ayanamsa,
            bodies,
            houses: Some(houses),
            computed_at,
        }
    }

    pub fn subject(&self) -> &BirthInput {
        &self.subject
    }

    pub fn instant(&self) -> AstronomicalInstant {
        self.instant
    }

    pub fn geo(&self) -> &GeoTimeContext {
        &self.geo
    }

    pub fn house_system(&self) -> HouseSystem {
        self.house_system
    }

    pub fn ayanamsa(&self) -> Option<&ResolvedAyanamsa> {
        self.ayanamsa.as_ref()
    }

    pub fn bodies(&self) -> &BTreeMap<Body, BodyPosition> {
        &self.bodies
    }

    pub fn body(&self, body: Body) -> Option<&BodyPosition> {
        self.bodies.get(&body)
    }

    pub fn houses(&self) -> Option<&HouseFrame> {
        self.houses.as_ref()
    }

    pub fn computed_at(&self) -> DateTime<Utc> {
        self.computed_at
    }

    pub fn house_of(&self, body: Body) -> Option<u8> {
        let position = self.bodies.get(&body)?;
        let frame = self.houses.as_ref()?;
        Some(house_for_longitude(
            frame,
            self.house_system,
            position.longitude,
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitSnapshot {
    date: NaiveDate,
    instant: AstronomicalInstant,
    #[serde(default)]
    ayanamsa: Option<ResolvedAyanamsa>,
    #[serde(default)]
    bodies: BTreeMap<Body, BodyPosition>,
}

impl TransitSnapshot {
    pub(crate) fn freeze(
        date: NaiveDate,
        instant: AstronomicalInstant,
        ayanamsa: Option<ResolvedAyanamsa>,
        bodies: BTreeMap<Body, BodyPosition>,
    ) -> Self {
        Self {
            date,
            instant,
            ayanamsa,
            bodies,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn instant(&self) -> AstronomicalInstant {
        self.instant
    }

    pub fn ayanamsa(&self) -> Option<&ResolvedAyanamsa> {
        self.ayanamsa.as_ref()
    }

    pub fn bodies(&self) -> &BTreeMap<Body, BodyPosition> {
        &self.bodies
    }
}
