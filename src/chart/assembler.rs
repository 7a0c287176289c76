use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};

use crate::chart::{
    ephemeris::EphemerisGateway,
    error::{AssemblyStage, ChartAssemblyError, InvalidTimeError},
    houses::HouseCalculator,
    oracle::EphemerisOracle,
    time::TimeResolver,
    types::{
        Ayanamsa, BirthInput, Body, ChartSnapshot, GeoTimeContext, HouseSystem, TransitSnapshot,
        Zodiac,
    },
};

/// Builds frozen chart snapshots. Every sub-query of one chart uses the same instant.
#[derive(Clone)]
pub struct ChartAssembler {
    time: TimeResolver,
    ephemeris: EphemerisGateway,
    houses: HouseCalculator,
}

impl ChartAssembler {
    pub fn new(oracle: Arc<dyn EphemerisOracle>) -> Self {
        Self {
            time: TimeResolver::new(),
            ephemeris: EphemerisGateway::new(oracle.clone()),
            houses: HouseCalculator::new(oracle),
        }
    }

    pub fn assemble_with_ids(
        &self,
        birth: &BirthInput,
        geo: &GeoTimeContext,
        house_system_id: &str,
        ayanamsa_name: Option<&str>,
    ) -> Result<ChartSnapshot, ChartAssemblyError> {
        let house_system: HouseSystem = house_system_id
            .parse()
            .map_err(|err| ChartAssemblyError::new(AssemblyStage::Validation, err))?;
        let ayanamsa = ayanamsa_name
            .map(str::parse::<Ayanamsa>)
            .transpose()
            .map_err(|err| ChartAssemblyError::new(AssemblyStage::Validation, err))?;
        self.assemble(birth, geo, house_system, ayanamsa)
    }

    pub fn assemble(
        &self,
        birth: &BirthInput,
        geo: &GeoTimeContext,
        house_system: HouseSystem,
        ayanamsa: Option<Ayanamsa>,
    ) -> Result<ChartSnapshot, ChartAssemblyError> {
        let result = self.assemble_inner(birth, geo, house_system, ayanamsa);
        match &result {
            Ok(snapshot) => tracing::info!(
                target: "chart",
                julian_day = snapshot.instant().julian_day(),
                house_system = %house_system.code(),
                ayanamsa = ?ayanamsa,
                bodies = snapshot.bodies().len(),
                "chart_assembled"
            ),
            Err(err) => tracing::warn!(
                target: "chart",
                stage = %err.stage,
                error = %err,
                "chart_assembly_failed"
            ),
        }
        result
    }

    fn assemble_inner(
        &self,
        birth: &BirthInput,
        geo: &GeoTimeContext,
        house_system: HouseSystem,
        ayanamsa: Option<Ayanamsa>,
    ) -> Result<ChartSnapshot, ChartAssemblyError> {
        birth
            .validate()
            .and_then(|()| geo.validate())
            .map_err(|err| ChartAssemblyError::new(AssemblyStage::Validation, err))?;

        let instant = self
            .time
            .resolve(&birth.date, &birth.time, &geo.timezone)
            .map_err(|err| ChartAssemblyError::new(AssemblyStage::TimeResolution, err))?;

        let positions = self
            .ephemeris
            .positions(instant, &Body::CHART_SET, Zodiac::from_ayanamsa(ayanamsa))
            .map_err(|err| ChartAssemblyError::new(AssemblyStage::Positions, err))?;

        let frame = self
            .houses
            .houses(
                instant,
                geo.latitude,
                geo.longitude,
                house_system,
                positions.ayanamsa.as_ref(),
            )
            .map_err(|err| ChartAssemblyError::new(AssemblyStage::Houses, err))?;

        Ok(ChartSnapshot::freeze(
            birth.clone(),
            instant,
            geo.clone(),
            house_system,
            positions.ayanamsa,
            positions.bodies,
            frame,
            Utc::now(),
        ))
    }

    /// Sky positions at 12:00 UTC on `date`. No houses.
    pub fn assemble_transit(
        &self,
        date: NaiveDate,
        ayanamsa: Option<Ayanamsa>,
    ) -> Result<TransitSnapshot, ChartAssemblyError> {
        let noon = date.and_time(NaiveTime::from_hms_opt(12, 0, 0).ok_or_else(|| {
            ChartAssemblyError::new(
                AssemblyStage::TimeResolution,
                InvalidTimeError::MalformedTime("12:00".to_string()),
            )
        })?);
        let instant = self.time.resolve_utc(Utc.from_utc_datetime(&noon));

        let positions = self
            .ephemeris
            .positions(instant, &Body::CHART_SET, Zodiac::from_ayanamsa(ayanamsa))
            .map_err(|err| ChartAssemblyError::new(AssemblyStage::Positions, err))?;

        tracing::info!(
            target: "chart",
            date = %date,
            julian_day = instant.julian_day(),
            ayanamsa = ?ayanamsa,
            "transit_assembled"
        );
        Ok(TransitSnapshot::freeze(
            date,
            instant,
            positions.ayanamsa,
            positions.bodies,
        ))
    }
}
