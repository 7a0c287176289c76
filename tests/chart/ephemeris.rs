use std::sync::Arc;

use natal_insight::chart::{
    AnalyticOracle, AstronomicalInstant, Ayanamsa, Body, EphemerisError, EphemerisGateway, Zodiac,
    zodiac::normalize_degrees,
};

use crate::support::OneDayOracle;

fn gateway() -> EphemerisGateway {
    EphemerisGateway::new(Arc::new(AnalyticOracle::new()))
}

fn sample_instants() -> Vec<AstronomicalInstant> {
    // Every 97 days from 1900 to 2040 so the samples drift through the year.
    (0..530)
        .map(|step| AstronomicalInstant::from_julian_day(2_415_020.5 + f64::from(step) * 97.0))
        .collect()
}

#[test]
fn given_chart_set_when_positions_computed_then_ketu_mirrors_rahu() {
    let gateway = gateway();
    for instant in sample_instants().into_iter().step_by(25) {
        let set = gateway
            .positions(instant, &Body::CHART_SET, Zodiac::Tropical)
            .expect("in range");
        let rahu = set.bodies[&Body::MeanNode];
        let ketu = set.bodies[&Body::SouthNode];

        let separation = normalize_degrees(ketu.longitude - rahu.longitude);
        assert!((separation - 180.0).abs() < 1e-9, "separation {separation}");
        assert_eq!(ketu.latitude, -rahu.latitude);
        assert_eq!(ketu.speed_longitude, rahu.speed_longitude);
        assert_eq!(ketu.is_retrograde, rahu.is_retrograde);
    }
}

#[test]
fn given_many_instants_when_positions_computed_then_longitudes_are_normalized_and_retrograde_follows_speed()
 {
    let gateway = gateway();
    let mut retrograde_seen = false;
    for instant in sample_instants() {
        let set = gateway
            .positions(instant, &Body::CHART_SET, Zodiac::Tropical)
            .expect("in range");
        assert_eq!(set.bodies.len(), Body::CHART_SET.len());
        for (body, position) in &set.bodies {
            assert!(
                (0.0..360.0).contains(&position.longitude),
                "{body} longitude {} at {}",
                position.longitude,
                instant.julian_day()
            );
            assert_eq!(position.is_retrograde, position.speed_longitude < 0.0);
            retrograde_seen |=
                position.is_retrograde && !matches!(body, Body::MeanNode | Body::SouthNode);
        }
        assert!(!set.bodies[&Body::Sun].is_retrograde);
        assert!(!set.bodies[&Body::Moon].is_retrograde);
    }
    assert!(retrograde_seen, "some planet must station retrograde over 140 years");
}

#[test]
fn given_lahiri_when_positions_computed_then_every_body_shifts_by_the_reported_ayanamsa() {
    let gateway = gateway();
    let instant = AstronomicalInstant::from_julian_day(2_448_094.052_083_333_3);
    let tropical = gateway
        .positions(instant, &Body::CHART_SET, Zodiac::Tropical)
        .expect("in range");
    let sidereal = gateway
        .positions(instant, &Body::CHART_SET, Zodiac::Sidereal(Ayanamsa::Lahiri))
        .expect("in range");

    assert!(tropical.ayanamsa.is_none());
    let ayanamsa = sidereal.ayanamsa.expect("sidereal frame reports its offset");
    assert_eq!(ayanamsa.name, Ayanamsa::Lahiri);
    assert!(
        (23.6..23.8).contains(&ayanamsa.value),
        "lahiri {}",
        ayanamsa.value
    );

    for body in Body::CHART_SET {
        let delta = normalize_degrees(
            tropical.bodies[&body].longitude - sidereal.bodies[&body].longitude,
        );
        assert!((delta - ayanamsa.value).abs() < 1e-9, "{body} shifted by {delta}");
        assert_eq!(tropical.bodies[&body].latitude, sidereal.bodies[&body].latitude);
    }
}

#[test]
fn given_instant_before_supported_span_when_positions_computed_then_out_of_range() {
    let err = gateway()
        .positions(
            AstronomicalInstant::from_julian_day(2_378_000.0),
            &[Body::Sun],
            Zodiac::Tropical,
        )
        .expect_err("1799 is outside the element span");
    assert!(matches!(err, EphemerisError::OutOfRange { .. }));
}

#[test]
fn given_instant_outside_oracle_range_when_positions_computed_then_oracle_is_never_queried() {
    let oracle = Arc::new(OneDayOracle::default());
    let gateway = EphemerisGateway::new(oracle.clone());

    let err = gateway
        .positions(
            AstronomicalInstant::from_julian_day(2_451_547.0),
            &Body::CHART_SET,
            Zodiac::Sidereal(Ayanamsa::Lahiri),
        )
        .expect_err("two days past J2000 is outside the oracle's range");

    assert!(matches!(
        err,
        EphemerisError::OutOfRange { start, end, .. }
            if start == 2_451_545.0 && end == 2_451_546.0
    ));
    assert_eq!(oracle.queries(), 0);

    gateway
        .positions(AstronomicalInstant::J2000, &[Body::Sun], Zodiac::Tropical)
        .expect("J2000 is inside the range");
    assert_eq!(oracle.queries(), 1);
}

#[test]
fn given_subset_request_when_positions_computed_then_only_requested_bodies_return() {
    let set = gateway()
        .positions(
            AstronomicalInstant::J2000,
            &[Body::Venus, Body::SouthNode],
            Zodiac::Tropical,
        )
        .expect("in range");
    let bodies: Vec<Body> = set.bodies.keys().copied().collect();
    assert_eq!(bodies, vec![Body::Venus, Body::SouthNode]);
}
