use chrono::NaiveDate;
use natal_insight::chart::{
    AssemblyStage, Ayanamsa, Body, ChartError, EphemerisError, HouseSystem, InvalidTimeError,
};

use crate::support::{assembler, new_york_birth, new_york_chart};

#[test]
fn given_identical_inputs_when_assembled_twice_then_snapshots_match() {
    let first = new_york_chart(HouseSystem::Placidus);
    let second = new_york_chart(HouseSystem::Placidus);

    assert_eq!(first.instant(), second.instant());
    assert_eq!(first.bodies(), second.bodies());
    assert_eq!(first.houses(), second.houses());
    assert_eq!(first.bodies().len(), Body::CHART_SET.len());
}

#[test]
fn given_new_york_birth_when_assembled_with_placidus_then_reference_placements_hold() {
    let chart = new_york_chart(HouseSystem::Placidus);

    let sun = chart.body(Body::Sun).expect("sun");
    assert!((sun.longitude - 118.52).abs() < 0.05, "sun {}", sun.longitude);
    assert_eq!(chart.house_of(Body::Sun), Some(11));
    assert_eq!(chart.house_of(Body::Mars), Some(9));
    assert_eq!(chart.house_of(Body::Saturn), Some(5));
    for body in Body::CHART_SET {
        assert!(chart.house_of(body).is_some(), "{body} has no house");
    }
}

#[test]
fn given_new_york_birth_when_assembled_with_whole_signs_then_houses_count_from_virgo() {
    let chart = new_york_chart(HouseSystem::WholeSign);

    let frame = chart.houses().expect("houses present");
    assert_eq!(frame.cusps[0], 150.0);
    // Cancer Sun, Capricorn Saturn.
    assert_eq!(chart.house_of(Body::Sun), Some(11));
    assert_eq!(chart.house_of(Body::Saturn), Some(5));
}

#[test]
fn given_lahiri_when_assembled_then_snapshot_records_sidereal_frame() {
    let (birth, geo) = new_york_birth();
    let chart = assembler()
        .assemble_with_ids(&birth, &geo, "W", Some("lahiri"))
        .expect("sidereal chart assembles");

    let ayanamsa = chart.ayanamsa().expect("sidereal frame");
    assert_eq!(ayanamsa.name, Ayanamsa::Lahiri);
    let frame = chart.houses().expect("houses present");
    // Sidereal Leo rising.
    assert_eq!(frame.cusps[0], 120.0);
    assert_eq!(chart.house_of(Body::Sun), Some(12));
}

#[test]
fn given_unknown_timezone_when_assembled_then_error_wraps_invalid_time_at_time_resolution() {
    let (birth, mut geo) = new_york_birth();
    geo.timezone = "Atlantis/Capital".to_string();

    let err = assembler()
        .assemble(&birth, &geo, HouseSystem::Placidus, None)
        .expect_err("zone does not exist");
    assert_eq!(err.stage, AssemblyStage::TimeResolution);
    assert_eq!(
        err.cause(),
        &ChartError::InvalidTime(InvalidTimeError::UnknownTimezone(
            "Atlantis/Capital".to_string()
        ))
    );
}

#[test]
fn given_malformed_birth_date_when_assembled_then_validation_stage_fails() {
    let (mut birth, geo) = new_york_birth();
    birth.date = "21/07/1990".to_string();

    let err = assembler()
        .assemble(&birth, &geo, HouseSystem::Placidus, None)
        .expect_err("date shape is wrong");
    assert_eq!(err.stage, AssemblyStage::Validation);
    assert!(matches!(err.cause(), ChartError::InvalidInput(_)));
}

#[test]
fn given_unknown_house_system_id_when_assembled_then_validation_stage_fails() {
    let (birth, geo) = new_york_birth();
    let err = assembler()
        .assemble_with_ids(&birth, &geo, "Z", None)
        .expect_err("Z is not a house system");
    assert_eq!(err.stage, AssemblyStage::Validation);
    assert!(matches!(err.cause(), ChartError::UnsupportedHouseSystem(_)));
}

#[test]
fn given_arctic_birthplace_when_placidus_requested_then_houses_stage_fails() {
    let (birth, mut geo) = new_york_birth();
    geo.latitude = 69.6492;
    geo.longitude = 18.9553;
    geo.timezone = "Europe/Oslo".to_string();

    let err = assembler()
        .assemble(&birth, &geo, HouseSystem::Placidus, None)
        .expect_err("placidus is undefined at Tromso");
    assert_eq!(err.stage, AssemblyStage::Houses);
    assert!(matches!(
        err.cause(),
        ChartError::Ephemeris(EphemerisError::HousesUndefined { .. })
    ));

    assembler()
        .assemble(&birth, &geo, HouseSystem::WholeSign, None)
        .expect("whole sign houses work at any latitude");
}

#[test]
fn given_date_when_transit_assembled_then_positions_are_taken_at_noon_utc() {
    let date = NaiveDate::from_ymd_opt(2026, 10, 19).expect("valid date");
    let transit = assembler()
        .assemble_transit(date, None)
        .expect("in range");

    assert_eq!(transit.date(), date);
    assert!((transit.instant().julian_day() - 2_461_333.0).abs() < 1e-9);
    assert_eq!(transit.bodies().len(), Body::CHART_SET.len());
    assert!(transit.ayanamsa().is_none());
}
