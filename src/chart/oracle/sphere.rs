//! Spherical astronomy for the local sky: sidereal time, obliquity and the ecliptic points
//! where house circles cut the ecliptic.

use crate::chart::{
    error::EphemerisError,
    types::{HouseSystem, J2000_JD},
    zodiac::normalize_degrees,
};

use super::RawHouses;

/// Placidus and Koch divide diurnal arcs, which vanish beyond the polar circles.
pub const MAX_TIME_BASED_LATITUDE: f64 = 66.5;

/// Greenwich mean sidereal time in degrees (Meeus 12.4).
pub fn greenwich_mean_sidereal_deg(julian_day: f64) -> f64 {
    let d = julian_day - J2000_JD;
    let t = d / 36_525.0;
    normalize_degrees(
        280.460_618_37 + 360.985_647_366_29 * d + 0.000_387_933 * t * t - t * t * t / 38_710_000.0,
    )
}

/// Mean obliquity of the ecliptic in degrees (IAU 1980, Meeus 22.2).
pub fn mean_obliquity_deg(t: f64) -> f64 {
    23.439_291_1 - 0.013_004_166_7 * t - 0.000_000_163_9 * t * t + 0.000_000_503_6 * t * t * t
}

/// Ecliptic longitude where a great circle through the north and south points of a horizon
/// with pole height `pole_deg` crosses the ecliptic, for right ascension `ra_deg` on the
/// equator. With `pole_deg = latitude` and `ra = ARMC + 90` this is the Ascendant.
pub fn oblique_ecliptic_point(ra_deg: f64, pole_deg: f64, obliquity_deg: f64) -> f64 {
    let ra = ra_deg.to_radians();
    let eps = obliquity_deg.to_radians();
    let y = ra.sin();
    let x = ra.cos() * eps.cos() - pole_deg.to_radians().tan() * eps.sin();
    normalize_degrees(y.atan2(x).to_degrees())
}

/// Ecliptic longitude with right ascension `ra_deg`.
fn ecliptic_from_ra(ra_deg: f64, obliquity_deg: f64) -> f64 {
    oblique_ecliptic_point(ra_deg, 0.0, obliquity_deg)
}

pub fn compute_houses(
    julian_day: f64,
    latitude: f64,
    longitude: f64,
    system: HouseSystem,
) -> Result<RawHouses, EphemerisError> {
    let t = (julian_day - J2000_JD) / 36_525.0;
    let eps = mean_obliquity_deg(t);
    let armc = normalize_degrees(greenwich_mean_sidereal_deg(julian_day) + longitude);

    let ascendant = oblique_ecliptic_point(armc + 90.0, latitude, eps);
    let midheaven = ecliptic_from_ra(armc, eps);
    let vertex_pole = if latitude >= 0.0 {
        90.0 - latitude
    } else {
        -90.0 - latitude
    };
    let vertex = oblique_ecliptic_point(armc - 90.0, vertex_pole, eps);

    let cusps = match system {
        HouseSystem::Equal => {
            std::array::from_fn(|i| normalize_degrees(ascendant + 30.0 * i as f64))
        }
        HouseSystem::WholeSign => whole_sign_cusps(ascendant),
        HouseSystem::Placidus => {
            ensure_time_based_latitude(system, latitude)?;
            let cusp = |quadrant_index| placidus_cusp(armc, latitude, eps, quadrant_index);
            let intermediate = [cusp(1), cusp(2), cusp(4), cusp(5)];
            let [c11, c12, c2, c3] = match intermediate {
                [Some(a), Some(b), Some(c), Some(d)] => [a, b, c, d],
                _ => {
                    return Err(EphemerisError::HousesUndefined { system, latitude });
                }
            };
            quadrant_cusps(ascendant, midheaven, c11, c12, c2, c3)
        }
        HouseSystem::Koch => {
            ensure_time_based_latitude(system, latitude)?;
            let sin_dec_mc = midheaven.to_radians().sin() * eps.to_radians().sin();
            let cos_dec_mc = (1.0 - sin_dec_mc * sin_dec_mc).sqrt();
            let ratio = latitude.to_radians().tan() * sin_dec_mc / cos_dec_mc;
            if ratio.abs() > 1.0 {
                return Err(EphemerisError::HousesUndefined { system, latitude });
            }
            let ad3 = ratio.asin().to_degrees() / 3.0;
            let point = |ra: f64| oblique_ecliptic_point(ra, latitude, eps);
            quadrant_cusps(
                ascendant,
                midheaven,
                point(armc + 30.0 - 2.0 * ad3),
                point(armc + 60.0 - ad3),
                point(armc + 120.0 + ad3),
                point(armc + 150.0 + 2.0 * ad3),
            )
        }
        HouseSystem::Regiomontanus => {
            let tan_lat = latitude.to_radians().tan();
            let pole_30 = (tan_lat * 0.5).atan().to_degrees();
            let pole_60 = (tan_lat * 60f64.to_radians().sin()).atan().to_degrees();
            let point = |ra: f64, pole: f64| oblique_ecliptic_point(ra, pole, eps);
            quadrant_cusps(
                ascendant,
                midheaven,
                point(armc + 30.0, pole_30),
                point(armc + 60.0, pole_60),
                point(armc + 120.0, pole_60),
                point(armc + 150.0, pole_30),
            )
        }
        HouseSystem::Campanus => {
            let lat = latitude.to_radians();
            // Prime-vertical division: altitude circles at 60 and 30 degrees from the meridian.
            let point = |prime_vertical_deg: f64| {
                let a = prime_vertical_deg.to_radians();
                let offset = (lat.cos() * a.cos()).atan2(a.sin()).to_degrees();
                let pole = (lat.sin() * a.cos()).asin().to_degrees();
                oblique_ecliptic_point(armc + offset, pole, eps)
            };
            quadrant_cusps(
                ascendant,
                midheaven,
                point(60.0),
                point(30.0),
                point(-30.0),
                point(-60.0),
            )
        }
    };

    Ok(RawHouses {
        cusps,
        ascendant,
        midheaven,
        armc,
        vertex,
    })
}

pub fn whole_sign_cusps(ascendant: f64) -> [f64; 12] {
    let first = (normalize_degrees(ascendant) / 30.0).floor() * 30.0;
    std::array::from_fn(|i| normalize_degrees(first + 30.0 * i as f64))
}

fn ensure_time_based_latitude(system: HouseSystem, latitude: f64) -> Result<(), EphemerisError> {
    if latitude.abs() > MAX_TIME_BASED_LATITUDE {
        return Err(EphemerisError::HousesUndefined { system, latitude });
    }
    Ok(())
}

/// Lays out the four angles and the four computed intermediates; the remaining cusps are
/// their opposites.
fn quadrant_cusps(
    ascendant: f64,
    midheaven: f64,
    c11: f64,
    c12: f64,
    c2: f64,
    c3: f64,
) -> [f64; 12] {
    let opposite = |deg: f64| normalize_degrees(deg + 180.0);
    [
        ascendant,
        c2,
        c3,
        opposite(midheaven),
        opposite(c11),
        opposite(c12),
        opposite(ascendant),
        opposite(c2),
        opposite(c3),
        midheaven,
        c11,
        c12,
    ]
}

/// Placidus intermediate cusp by trisecting semi-arcs.
///
/// `quadrant_index` counts 30 degree steps from the MC: 1 and 2 are houses 11 and 12 (diurnal
/// arc), 4 and 5 are houses 2 and 3 (nocturnal arc).
fn placidus_cusp(armc: f64, latitude: f64, obliquity: f64, quadrant_index: u8) -> Option<f64> {
    let tan_lat = latitude.to_radians().tan();
    let tan_eps = obliquity.to_radians().tan();
    let mut ra = armc + 30.0 * f64::from(quadrant_index);

    for _ in 0..100 {
        let declination = (ra.to_radians().sin() * tan_eps).atan();
        let cos_arg = -tan_lat * declination.tan();
        if cos_arg.abs() > 1.0 {
            return None;
        }
        let diurnal = cos_arg.acos().to_degrees();
        let next = match quadrant_index {
            1 => armc + diurnal / 3.0,
            2 => armc + 2.0 * diurnal / 3.0,
            4 => armc + 60.0 + 2.0 * diurnal / 3.0,
            5 => armc + 120.0 + diurnal / 3.0,
            _ => return None,
        };
        let converged = (next - ra).abs() < 1e-10;
        ra = next;
        if converged {
            break;
        }
    }

    Some(ecliptic_from_ra(ra, obliquity))
}
