use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use crate::chart::{
    error::EphemerisError,
    oracle::EphemerisOracle,
    types::{AstronomicalInstant, Body, BodyPosition, ResolvedAyanamsa, Zodiac},
};

#[derive(Debug, Clone, PartialEq)]
pub struct PositionSet {
    pub bodies: BTreeMap<Body, BodyPosition>,
    pub ayanamsa: Option<ResolvedAyanamsa>,
}

/// Body positions in the requested frame, with Ketu derived from Rahu.
#[derive(Clone)]
pub struct EphemerisGateway {
    oracle: Arc<dyn EphemerisOracle>,
}

impl EphemerisGateway {
    pub fn new(oracle: Arc<dyn EphemerisOracle>) -> Self {
        Self { oracle }
    }

    pub fn oracle(&self) -> &Arc<dyn EphemerisOracle> {
        &self.oracle
    }

    pub fn ayanamsa(
        &self,
        instant: AstronomicalInstant,
        zodiac: Zodiac,
    ) -> Result<Option<ResolvedAyanamsa>, EphemerisError> {
        zodiac
            .ayanamsa()
            .map(|name| {
                let value = self.oracle.ayanamsa(instant, name)?;
                if !value.is_finite() {
                    return Err(EphemerisError::Oracle(format!(
                        "{} resolved ayanamsa {} to a non-finite value",
                        self.oracle.name(),
                        name
                    )));
                }
                Ok(ResolvedAyanamsa { name, value })
            })
            .transpose()
    }

    /// Positions for exactly the bodies in `bodies`. Any oracle failure fails the whole set.
    pub fn positions(
        &self,
        instant: AstronomicalInstant,
        bodies: &[Body],
        zodiac: Zodiac,
    ) -> Result<PositionSet, EphemerisError> {
        self.oracle.ensure_supported(instant)?;
        let ayanamsa = self.ayanamsa(instant, zodiac)?;
        let offset = ayanamsa.map_or(0.0, |resolved| resolved.value);

        let requested: BTreeSet<Body> = bodies.iter().copied().collect();
        let mut queried: BTreeSet<Body> = requested
            .iter()
            .copied()
            .filter(|body| !body.is_derived())
            .collect();
        if requested.contains(&Body::SouthNode) {
            queried.insert(Body::MeanNode);
        }

        let mut computed = BTreeMap::new();
        for body in queried {
            let state = self.oracle.body_state(instant, body)?;
            if ![state.longitude, state.latitude, state.distance, state.speed_longitude]
                .iter()
                .all(|value| value.is_finite())
            {
                return Err(EphemerisError::Oracle(format!(
                    "{} returned a non-finite state for {}",
                    self.oracle.name(),
                    body
                )));
            }
            computed.insert(
                body,
                BodyPosition::new(
                    state.longitude - offset,
                    state.latitude,
                    state.distance,
                    state.speed_longitude,
                ),
            );
        }

        if let Some(rahu) = computed.get(&Body::MeanNode).copied() {
            computed.insert(Body::SouthNode, rahu.antipode());
        }
        computed.retain(|body, _| requested.contains(body));

        Ok(PositionSet {
            bodies: computed,
            ayanamsa,
        })
    }
}
