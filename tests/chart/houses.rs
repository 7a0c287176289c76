use std::sync::Arc;

use natal_insight::chart::{
    AnalyticOracle, AstronomicalInstant, Ayanamsa, ChartError, EphemerisError, HouseCalculator,
    HouseSystem, ResolvedAyanamsa, houses::house_for_longitude, zodiac::arc_forward,
};

use crate::support::OneDayOracle;

const ALL_SYSTEMS: [HouseSystem; 6] = [
    HouseSystem::Placidus,
    HouseSystem::Koch,
    HouseSystem::Regiomontanus,
    HouseSystem::Campanus,
    HouseSystem::Equal,
    HouseSystem::WholeSign,
];

fn calculator() -> HouseCalculator {
    HouseCalculator::new(Arc::new(AnalyticOracle::new()))
}

fn new_york_instant() -> AstronomicalInstant {
    AstronomicalInstant::from_julian_day(2_448_094.052_083_333_3)
}

#[test]
fn given_each_system_when_every_half_degree_is_placed_then_a_single_house_claims_it() {
    let calculator = calculator();
    for system in ALL_SYSTEMS {
        let frame = calculator
            .houses(new_york_instant(), 40.7128, -74.006, system, None)
            .expect("mid-latitude frame");
        for step in 0..720 {
            let house = house_for_longitude(&frame, system, f64::from(step) * 0.5);
            assert!((1..=12).contains(&house), "{system}: house {house}");
        }
    }
}

#[test]
fn given_longitude_exactly_on_a_cusp_when_placed_then_it_opens_that_house() {
    let calculator = calculator();
    for system in ALL_SYSTEMS {
        let frame = calculator
            .houses(new_york_instant(), 40.7128, -74.006, system, None)
            .expect("mid-latitude frame");
        for (index, cusp) in frame.cusps.iter().enumerate() {
            assert_eq!(
                house_for_longitude(&frame, system, *cusp),
                index as u8 + 1,
                "{system} cusp {}",
                index + 1
            );
        }
    }
}

#[test]
fn given_quadrant_system_when_computed_then_first_and_tenth_cusps_are_the_angles() {
    let frame = calculator()
        .houses(new_york_instant(), 40.7128, -74.006, HouseSystem::Regiomontanus, None)
        .expect("mid-latitude frame");
    assert!((frame.cusps[0] - frame.ascendant).abs() < 1e-9);
    assert!((frame.cusps[9] - frame.midheaven).abs() < 1e-9);
    assert!((frame.ascendant - 159.2428).abs() < 0.01, "asc {}", frame.ascendant);
    assert!((frame.midheaven - 65.6907).abs() < 0.01, "mc {}", frame.midheaven);
}

#[test]
fn given_equal_system_when_computed_then_cusps_step_thirty_degrees_from_ascendant() {
    let frame = calculator()
        .houses(new_york_instant(), 40.7128, -74.006, HouseSystem::Equal, None)
        .expect("equal houses are defined everywhere");
    for index in 0..12 {
        let arc = arc_forward(frame.ascendant, frame.cusps[index]);
        let expected = 30.0 * index as f64;
        assert!(
            (arc - expected).abs() < 1e-9 || (index == 0 && (arc - 360.0).abs() < 1e-9),
            "cusp {} sits {arc} from the ascendant",
            index + 1
        );
    }
}

#[test]
fn given_latitude_inside_polar_circle_when_placidus_requested_then_houses_are_undefined() {
    let err = calculator()
        .houses_by_id(new_york_instant(), 70.0, 25.0, "P")
        .expect_err("placidus fails above the polar circle");
    assert!(matches!(
        err,
        ChartError::Ephemeris(EphemerisError::HousesUndefined { .. })
    ));

    calculator()
        .houses_by_id(new_york_instant(), 70.0, 25.0, "E")
        .expect("equal houses still work at 70 degrees");
}

#[test]
fn given_unknown_system_id_when_houses_requested_then_unsupported_house_system_error() {
    let err = calculator()
        .houses_by_id(new_york_instant(), 40.0, -74.0, "X")
        .expect_err("X is not a house system");
    assert!(matches!(err, ChartError::UnsupportedHouseSystem(ref inner) if inner.0 == "X"));
}

#[test]
fn given_sidereal_offset_when_whole_sign_computed_then_cusps_stay_on_sign_boundaries() {
    let lahiri = ResolvedAyanamsa {
        name: Ayanamsa::Lahiri,
        value: 23.72,
    };
    let tropical = calculator()
        .houses(new_york_instant(), 40.7128, -74.006, HouseSystem::WholeSign, None)
        .expect("frame");
    let sidereal = calculator()
        .houses(
            new_york_instant(),
            40.7128,
            -74.006,
            HouseSystem::WholeSign,
            Some(&lahiri),
        )
        .expect("frame");

    assert!((arc_forward(sidereal.ascendant, tropical.ascendant) - 23.72).abs() < 1e-9);
    for cusp in sidereal.cusps {
        assert_eq!(cusp % 30.0, 0.0, "cusp {cusp} is not a sign boundary");
    }
    // Tropical Virgo rising becomes sidereal Leo rising.
    assert_eq!(tropical.cusps[0], 150.0);
    assert_eq!(sidereal.cusps[0], 120.0);
}

#[test]
fn given_instant_outside_oracle_range_when_houses_requested_then_out_of_range_without_query() {
    let oracle = Arc::new(OneDayOracle::default());
    let calculator = HouseCalculator::new(oracle.clone());

    let err = calculator
        .houses(new_york_instant(), 40.7128, -74.006, HouseSystem::Placidus, None)
        .expect_err("1990 is outside the oracle's range");

    assert!(matches!(err, EphemerisError::OutOfRange { .. }));
    assert_eq!(oracle.queries(), 0);
}
