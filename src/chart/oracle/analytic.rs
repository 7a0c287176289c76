//! Built-in low-precision ephemeris.
//!
//! Planets use the JPL "approximate positions" Keplerian mean elements (valid 1800-2050, errors
//! of a few arcminutes for the inner planets); the Moon a truncated Meeus ch. 47 series; the node
//! its mean motion. Longitudes are referred to the mean equinox of date by adding general
//! precession to the J2000 ecliptic result.

use crate::chart::{
    error::EphemerisError,
    types::{AstronomicalInstant, Ayanamsa, Body, HouseSystem},
    zodiac::normalize_degrees,
};

use super::{EphemerisOracle, RawBodyState, RawHouses, sphere};

/// 1800-01-01 00:00 UT.
const RANGE_START_JD: f64 = 2_378_496.5;
/// 2051-01-01 00:00 UT.
const RANGE_END_JD: f64 = 2_470_172.5;
const SPEED_HALF_STEP_DAYS: f64 = 0.5;
const KM_PER_AU: f64 = 149_597_870.7;
const MEAN_NODE_DISTANCE_AU: f64 = 0.002_569_555_2;

/// Element value at J2000 and its rate per Julian century.
type Element = [f64; 2];

struct OrbitalElements {
    semi_major_axis: Element,
    eccentricity: Element,
    inclination: Element,
    mean_longitude: Element,
    perihelion_longitude: Element,
    node_longitude: Element,
}

const MERCURY: OrbitalElements = OrbitalElements {
    semi_major_axis: [0.387_099_27, 0.000_000_37],
    eccentricity: [0.205_635_93, 0.000_019_06],
    inclination: [7.004_979_02, -0.005_947_49],
    mean_longitude: [252.250_323_50, 149_472.674_111_75],
    perihelion_longitude: [77.457_796_28, 0.160_476_89],
    node_longitude: [48.330_765_93, -0.125_340_81],
};

const VENUS: OrbitalElements = OrbitalElements {
    semi_major_axis: [0.723_335_66, 0.000_003_90],
    eccentricity: [0.006_776_72, -0.000_041_07],
    inclination: [3.394_676_05, -0.000_788_90],
    mean_longitude: [181.979_099_50, 58_517.815_387_29],
    perihelion_longitude: [131.602_467_18, 0.002_683_29],
    node_longitude: [76.679_842_55, -0.277_694_18],
};

const EARTH_MOON_BARYCENTER: OrbitalElements = OrbitalElements {
    semi_major_axis: [1.000_002_61, 0.000_005_62],
    eccentricity: [0.016_711_23, -0.000_043_92],
    inclination: [-0.000_015_31, -0.012_946_68],
    mean_longitude: [100.464_571_66, 35_999.372_449_81],
    perihelion_longitude: [102.937_681_93, 0.323_273_64],
    node_longitude: [0.0, 0.0],
};

const MARS: OrbitalElements = OrbitalElements {
    semi_major_axis: [1.523_710_34, 0.000_018_47],
    eccentricity: [0.093_394_10, 0.000_078_82],
    inclination: [1.849_691_42, -0.008_131_31],
    mean_longitude: [-4.553_432_05, 19_140.302_684_99],
    perihelion_longitude: [-23.943_629_59, 0.444_410_88],
    node_longitude: [49.559_538_91, -0.292_573_43],
};

const JUPITER: OrbitalElements = OrbitalElements {
    semi_major_axis: [5.202_887_00, -0.000_116_07],
    eccentricity: [0.048_386_24, -0.000_132_53],
    inclination: [1.304_396_95, -0.001_837_14],
    mean_longitude: [34.396_440_51, 3_034.746_127_75],
    perihelion_longitude: [14.728_479_83, 0.212_526_68],
    node_longitude: [100.473_909_09, 0.204_691_06],
};

const SATURN: OrbitalElements = OrbitalElements {
    semi_major_axis: [9.536_675_94, -0.001_250_60],
    eccentricity: [0.053_861_79, -0.000_509_91],
    inclination: [2.485_991_87, 0.001_936_09],
    mean_longitude: [49.954_244_23, 1_222.493_622_01],
    perihelion_longitude: [92.598_878_31, -0.418_972_16],
    node_longitude: [113.662_424_48, -0.288_677_94],
};

const URANUS: OrbitalElements = OrbitalElements {
    semi_major_axis: [19.189_164_64, -0.001_961_76],
    eccentricity: [0.047_257_44, -0.000_043_97],
    inclination: [0.772_637_83, -0.002_429_39],
    mean_longitude: [313.238_104_51, 428.482_027_85],
    perihelion_longitude: [170.954_276_30, 0.408_052_81],
    node_longitude: [74.016_925_03, 0.042_405_89],
};

const NEPTUNE: OrbitalElements = OrbitalElements {
    semi_major_axis: [30.069_922_76, 0.000_262_91],
    eccentricity: [0.008_590_48, 0.000_051_05],
    inclination: [1.770_043_47, 0.000_353_72],
    mean_longitude: [-55.120_029_69, 218.459_453_25],
    perihelion_longitude: [44.964_762_27, -0.322_414_64],
    node_longitude: [131.784_225_74, -0.005_086_64],
};

const PLUTO: OrbitalElements = OrbitalElements {
    semi_major_axis: [39.482_116_75, -0.000_315_96],
    eccentricity: [0.248_827_30, 0.000_051_70],
    inclination: [17.140_012_06, 0.000_048_18],
    mean_longitude: [238.929_038_33, 145.207_805_15],
    perihelion_longitude: [224.068_916_29, -0.040_629_42],
    node_longitude: [110.303_936_84, -0.011_834_82],
};

/// Sidereal offset of each ayanamsa at J2000, in degrees.
fn ayanamsa_at_j2000(ayanamsa: Ayanamsa) -> f64 {
    match ayanamsa {
        Ayanamsa::Lahiri => 23.853,
        Ayanamsa::Raman => 22.370,
        Ayanamsa::Krishnamurti => 23.850,
    }
}

/// IAU 2006 general precession in longitude, degrees.
fn general_precession_deg(t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;
    (5028.796_195 * t + 1.105_434_8 * t2 + 0.000_079_64 * t3) / 3600.0
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyticOracle;

impl AnalyticOracle {
    pub fn new() -> Self {
        Self
    }
}

impl EphemerisOracle for AnalyticOracle {
    fn name(&self) -> &str {
        "analytic"
    }

    fn supported_range(&self) -> (f64, f64) {
        (RANGE_START_JD, RANGE_END_JD)
    }

    fn body_state(
        &self,
        instant: AstronomicalInstant,
        body: Body,
    ) -> Result<RawBodyState, EphemerisError> {
        self.ensure_supported(instant)?;
        if body.is_derived() {
            return Err(EphemerisError::UnresolvableBody(body));
        }

        let jd = instant.julian_day();
        let before = ecliptic_of_date(body, jd - SPEED_HALF_STEP_DAYS);
        let now = ecliptic_of_date(body, jd);
        let after = ecliptic_of_date(body, jd + SPEED_HALF_STEP_DAYS);
        let span = 2.0 * SPEED_HALF_STEP_DAYS;

        Ok(RawBodyState {
            longitude: now.longitude,
            latitude: now.latitude,
            distance: now.distance,
            speed_longitude: signed_arc(before.longitude, after.longitude) / span,
            speed_latitude: (after.latitude - before.latitude) / span,
            speed_distance: (after.distance - before.distance) / span,
        })
    }

    fn ayanamsa(
        &self,
        instant: AstronomicalInstant,
        ayanamsa: Ayanamsa,
    ) -> Result<f64, EphemerisError> {
        self.ensure_supported(instant)?;
        Ok(ayanamsa_at_j2000(ayanamsa) + general_precession_deg(instant.centuries_since_j2000()))
    }

    fn houses(
        &self,
        instant: AstronomicalInstant,
        latitude: f64,
        longitude: f64,
        system: HouseSystem,
    ) -> Result<RawHouses, EphemerisError> {
        self.ensure_supported(instant)?;
        sphere::compute_houses(instant.julian_day(), latitude, longitude, system)
    }
}

#[derive(Debug, Clone, Copy)]
struct Spherical {
    longitude: f64,
    latitude: f64,
    distance: f64,
}

/// Shortest signed arc from `from` to `to`, in [-180, 180).
fn signed_arc(from: f64, to: f64) -> f64 {
    (to - from + 180.0).rem_euclid(360.0) - 180.0
}

fn ecliptic_of_date(body: Body, julian_day: f64) -> Spherical {
    let t = (julian_day - crate::chart::types::J2000_JD) / 36_525.0;
    match body {
        Body::Moon => moon(t),
        Body::MeanNode | Body::SouthNode => Spherical {
            longitude: mean_node_longitude(t),
            latitude: 0.0,
            distance: MEAN_NODE_DISTANCE_AU,
        },
        _ => {
            let earth = heliocentric(&EARTH_MOON_BARYCENTER, t);
            let geocentric = match planet_elements(body) {
                Some(elements) => {
                    let planet = heliocentric(elements, t);
                    [
                        planet[0] - earth[0],
                        planet[1] - earth[1],
                        planet[2] - earth[2],
                    ]
                }
                None => [-earth[0], -earth[1], -earth[2]],
            };
            let [x, y, z] = geocentric;
            Spherical {
                longitude: normalize_degrees(
                    y.atan2(x).to_degrees() + general_precession_deg(t),
                ),
                latitude: z.atan2(x.hypot(y)).to_degrees(),
                distance: (x * x + y * y + z * z).sqrt(),
            }
        }
    }
}

fn planet_elements(body: Body) -> Option<&'static OrbitalElements> {
    match body {
        Body::Mercury => Some(&MERCURY),
        Body::Venus => Some(&VENUS),
        Body::Mars => Some(&MARS),
        Body::Jupiter => Some(&JUPITER),
        Body::Saturn => Some(&SATURN),
        Body::Uranus => Some(&URANUS),
        Body::Neptune => Some(&NEPTUNE),
        Body::Pluto => Some(&PLUTO),
        Body::Sun | Body::Moon | Body::MeanNode | Body::SouthNode => None,
    }
}

/// Heliocentric ecliptic J2000 coordinates in AU.
fn heliocentric(elements: &OrbitalElements, t: f64) -> [f64; 3] {
    let at = |element: Element| element[0] + element[1] * t;
    let a = at(elements.semi_major_axis);
    let e = at(elements.eccentricity);
    let inclination = at(elements.inclination).to_radians();
    let mean_longitude = at(elements.mean_longitude);
    let perihelion = at(elements.perihelion_longitude);
    let node = at(elements.node_longitude);

    let argument_of_perihelion = (perihelion - node).to_radians();
    let mean_anomaly = (mean_longitude - perihelion + 180.0).rem_euclid(360.0) - 180.0;
    let eccentric_anomaly = solve_kepler(mean_anomaly, e).to_radians();

    let x_orbit = a * (eccentric_anomaly.cos() - e);
    let y_orbit = a * (1.0 - e * e).sqrt() * eccentric_anomaly.sin();

    let (sin_w, cos_w) = argument_of_perihelion.sin_cos();
    let (sin_node, cos_node) = node.to_radians().sin_cos();
    let (sin_i, cos_i) = inclination.sin_cos();

    [
        (cos_w * cos_node - sin_w * sin_node * cos_i) * x_orbit
            + (-sin_w * cos_node - cos_w * sin_node * cos_i) * y_orbit,
        (cos_w * sin_node + sin_w * cos_node * cos_i) * x_orbit
            + (-sin_w * sin_node + cos_w * cos_node * cos_i) * y_orbit,
        sin_w * sin_i * x_orbit + cos_w * sin_i * y_orbit,
    ]
}

/// Kepler's equation in degrees, Newton iteration.
fn solve_kepler(mean_anomaly_deg: f64, eccentricity: f64) -> f64 {
    let e_deg = eccentricity.to_degrees();
    let mut eccentric = mean_anomaly_deg + e_deg * mean_anomaly_deg.to_radians().sin();
    for _ in 0..50 {
        let delta_m = mean_anomaly_deg - (eccentric - e_deg * eccentric.to_radians().sin());
        let delta_e = delta_m / (1.0 - eccentricity * eccentric.to_radians().cos());
        eccentric += delta_e;
        if delta_e.abs() < 1e-9 {
            break;
        }
    }
    eccentric
}

fn mean_node_longitude(t: f64) -> f64 {
    normalize_degrees(
        125.044_52 - 1_934.136_261 * t + 0.002_070_8 * t * t + t * t * t / 450_000.0,
    )
}

/// (coefficient, D, M, M', F) rows of the largest periodic terms.
const MOON_LONGITUDE_TERMS: [(f64, f64, f64, f64, f64); 13] = [
    (6.288_774, 0.0, 0.0, 1.0, 0.0),
    (1.274_027, 2.0, 0.0, -1.0, 0.0),
    (0.658_314, 2.0, 0.0, 0.0, 0.0),
    (0.213_618, 0.0, 0.0, 2.0, 0.0),
    (-0.185_116, 0.0, 1.0, 0.0, 0.0),
    (-0.114_332, 0.0, 0.0, 0.0, 2.0),
    (0.058_793, 2.0, 0.0, -2.0, 0.0),
    (0.057_066, 2.0, -1.0, -1.0, 0.0),
    (0.053_322, 2.0, 0.0, 1.0, 0.0),
    (0.045_758, 2.0, -1.0, 0.0, 0.0),
    (-0.040_923, 0.0, 1.0, -1.0, 0.0),
    (-0.034_720, 1.0, 0.0, 0.0, 0.0),
    (-0.030_383, 0.0, 1.0, 1.0, 0.0),
];

const MOON_LATITUDE_TERMS: [(f64, f64, f64, f64, f64); 6] = [
    (5.128_122, 0.0, 0.0, 0.0, 1.0),
    (0.280_602, 0.0, 0.0, 1.0, 1.0),
    (0.277_693, 0.0, 0.0, 1.0, -1.0),
    (0.173_237, 2.0, 0.0, 0.0, -1.0),
    (0.055_413, 2.0, 0.0, -1.0, 1.0),
    (0.046_271, 2.0, 0.0, -1.0, -1.0),
];

/// Kilometres.
const MOON_DISTANCE_TERMS: [(f64, f64, f64, f64, f64); 4] = [
    (-20_905.355, 0.0, 0.0, 1.0, 0.0),
    (-3_699.111, 2.0, 0.0, -1.0, 0.0),
    (-2_955.968, 2.0, 0.0, 0.0, 0.0),
    (-569.925, 0.0, 0.0, 2.0, 0.0),
];

fn moon(t: f64) -> Spherical {
    let mean_longitude = 218.316_447_7 + 481_267.881_234_21 * t;
    let elongation = 297.850_192_1 + 445_267.111_403_4 * t;
    let sun_anomaly = 357.529_109_2 + 35_999.050_290_9 * t;
    let moon_anomaly = 134.963_396_4 + 477_198.867_505_5 * t;
    let latitude_argument = 93.272_095_0 + 483_202.017_523_3 * t;

    let argument = |(_, d, m, mp, f): (f64, f64, f64, f64, f64)| {
        (d * elongation + m * sun_anomaly + mp * moon_anomaly + f * latitude_argument).to_radians()
    };
    let sine_series = |terms: &[(f64, f64, f64, f64, f64)]| -> f64 {
        terms
            .iter()
            .map(|term| term.0 * argument(*term).sin())
            .sum()
    };
    let cosine_series = |terms: &[(f64, f64, f64, f64, f64)]| -> f64 {
        terms
            .iter()
            .map(|term| term.0 * argument(*term).cos())
            .sum()
    };

    Spherical {
        longitude: normalize_degrees(mean_longitude + sine_series(&MOON_LONGITUDE_TERMS)),
        latitude: sine_series(&MOON_LATITUDE_TERMS),
        distance: (385_000.56 + cosine_series(&MOON_DISTANCE_TERMS)) / KM_PER_AU,
    }
}
