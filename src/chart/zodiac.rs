use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Sign {
    Aries,
    Taurus,
    Gemini,
    Cancer,
    Leo,
    Virgo,
    Libra,
    Scorpio,
    Sagittarius,
    Capricorn,
    Aquarius,
    Pisces,
}

pub const ALL_SIGNS: [Sign; 12] = [
    Sign::Aries,
    Sign::Taurus,
    Sign::Gemini,
    Sign::Cancer,
    Sign::Leo,
    Sign::Virgo,
    Sign::Libra,
    Sign::Scorpio,
    Sign::Sagittarius,
    Sign::Capricorn,
    Sign::Aquarius,
    Sign::Pisces,
];

impl Sign {
    pub fn name(self) -> &'static str {
        match self {
            Sign::Aries => "Aries",
            Sign::Taurus => "Taurus",
            Sign::Gemini => "Gemini",
            Sign::Cancer => "Cancer",
            Sign::Leo => "Leo",
            Sign::Virgo => "Virgo",
            Sign::Libra => "Libra",
            Sign::Scorpio => "Scorpio",
            Sign::Sagittarius => "Sagittarius",
            Sign::Capricorn => "Capricorn",
            Sign::Aquarius => "Aquarius",
            Sign::Pisces => "Pisces",
        }
    }

    /// 0-based index (Aries = 0).
    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_longitude(longitude: f64) -> Self {
        ALL_SIGNS[sign_index(longitude)]
    }
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Normalize an angle into [0, 360).
pub fn normalize_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs.
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Forward arc from `from` to `to`, in [0, 360).
pub fn arc_forward(from: f64, to: f64) -> f64 {
    normalize_degrees(to - from)
}

pub fn sign_index(longitude: f64) -> usize {
    ((normalize_degrees(longitude) / 30.0).floor() as usize).min(11)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignPosition {
    pub sign: Sign,
    pub degrees: u8,
    pub minutes: u8,
    pub seconds: u8,
}

/// Splits a longitude into its sign and the truncated D/M/S inside the sign.
pub fn sign_position(longitude: f64) -> SignPosition {
    // Whole arcseconds on the circle. The epsilon absorbs binary rounding below an exact second.
    let total_arcseconds =
        (normalize_degrees(longitude) * 3600.0 + 1e-7).floor() as u64 % 1_296_000;
    let sign_index = (total_arcseconds / 108_000) as usize;
    let within_sign = total_arcseconds % 108_000;

    SignPosition {
        sign: ALL_SIGNS[sign_index],
        degrees: (within_sign / 3600) as u8,
        minutes: ((within_sign % 3600) / 60) as u8,
        seconds: (within_sign % 60) as u8,
    }
}

/// `15.5069 -> 15° Aries 30' 24"`.
pub fn format_longitude(longitude: f64) -> String {
    let position = sign_position(longitude);
    format!(
        "{}° {} {}' {}\"",
        position.degrees,
        position.sign.name(),
        position.minutes,
        position.seconds
    )
}
