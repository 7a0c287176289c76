pub mod assembler;
pub mod ephemeris;
pub mod error;
pub mod houses;
pub mod oracle;
pub mod serializer;
pub mod time;
pub mod types;
pub mod zodiac;

pub use assembler::ChartAssembler;
pub use ephemeris::EphemerisGateway;
pub use error::{
    AssemblyStage, ChartAssemblyError, ChartError, EphemerisError, InvalidTimeError,
    UnsupportedHouseSystemError,
};
pub use houses::HouseCalculator;
pub use oracle::{AnalyticOracle, EphemerisOracle};
pub use serializer::{ChartSerializer, StructuredText};
pub use time::TimeResolver;
pub use types::{
    AstronomicalInstant, Ayanamsa, BirthInput, Body, BodyPosition, ChartSnapshot, GeoTimeContext,
    HouseFrame, HouseSystem, ResolvedAyanamsa, TransitSnapshot, Zodiac,
};
