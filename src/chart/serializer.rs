//! XML-like structured text handed to the language model.
//!
//! Rendering never fails: a body or house frame missing from a persisted snapshot is written as
//! an inline `<error>` element and the rest of the document is still produced.

use std::fmt::Write as _;

use crate::chart::{
    types::{
        AstronomicalInstant, Body, BodyPosition, ChartSnapshot, HouseFrame, ResolvedAyanamsa,
        TransitSnapshot,
    },
    zodiac::{Sign, format_longitude},
};

/// Opening tag of the inline failure element.
pub const ERROR_MARKER: &str = "<error>";

pub trait StructuredText {
    fn to_structured_text(&self) -> String;
}

impl StructuredText for ChartSnapshot {
    fn to_structured_text(&self) -> String {
        ChartSerializer::chart(self)
    }
}

impl StructuredText for TransitSnapshot {
    fn to_structured_text(&self) -> String {
        ChartSerializer::transit(self)
    }
}

pub fn contains_error_marker(text: &str) -> bool {
    text.contains(ERROR_MARKER)
}

pub struct ChartSerializer;

impl ChartSerializer {
    pub fn chart(chart: &ChartSnapshot) -> String {
        let mut xml = XmlWriter::default();
        xml.open("birth_chart_details", &[]);

        let subject = chart.subject();
        let geo = chart.geo();
        xml.open("personal_information", &[]);
        xml.leaf("name", &subject.name);
        xml.leaf("birth_date", &subject.date);
        xml.leaf("birth_time", &subject.time);
        xml.leaf("birth_location", &subject.location);
        if let Some(gender) = subject.gender.as_deref() {
            xml.leaf("gender", gender);
        }
        xml.leaf("latitude", &format!("{:.4}", geo.latitude));
        xml.leaf("longitude", &format!("{:.4}", geo.longitude));
        xml.leaf("timezone", &geo.timezone);
        xml.close("personal_information");

        xml.open("astrological_system", &[]);
        write_frame(&mut xml, chart.ayanamsa(), chart.instant());
        let system = chart.house_system();
        xml.leaf_with(
            "house_system",
            &[("code", system.code().to_string().as_str())],
            system.name(),
        );
        xml.close("astrological_system");

        xml.open("planetary_positions", &[]);
        for body in Body::CHART_SET {
            match chart.body(body) {
                Some(position) => {
                    xml.open("planet", &[("name", body.name())]);
                    write_position(&mut xml, position);
                    match chart.house_of(body) {
                        Some(house) => xml.leaf("house", &house.to_string()),
                        None => xml.error_in("house", "house data unavailable"),
                    }
                    xml.close("planet");
                }
                None => xml.error(&format!("missing position for {}", body.name())),
            }
        }
        xml.close("planetary_positions");

        match chart.houses() {
            Some(frame) => write_houses(&mut xml, frame),
            None => {
                xml.error_in("house_cusps", "house data unavailable");
                xml.error_in("angles", "house data unavailable");
            }
        }

        xml.close("birth_chart_details");
        xml.finish()
    }

    pub fn transit(transit: &TransitSnapshot) -> String {
        let mut xml = XmlWriter::default();
        xml.open("transit_details", &[]);
        xml.leaf("transit_date", &transit.date().format("%Y-%m-%d").to_string());

        xml.open("astrological_system", &[]);
        write_frame(&mut xml, transit.ayanamsa(), transit.instant());
        xml.close("astrological_system");

        xml.open("transiting_planets", &[]);
        for body in Body::CHART_SET {
            match transit.bodies().get(&body) {
                Some(position) => {
                    xml.open("planet", &[("name", body.name())]);
                    write_position(&mut xml, position);
                    xml.close("planet");
                }
                None => xml.error(&format!("missing position for {}", body.name())),
            }
        }
        xml.close("transiting_planets");

        xml.close("transit_details");
        xml.finish()
    }
}

fn write_frame(
    xml: &mut XmlWriter,
    ayanamsa: Option<&ResolvedAyanamsa>,
    instant: AstronomicalInstant,
) {
    match ayanamsa {
        Some(resolved) => {
            xml.leaf("zodiac", "sidereal");
            xml.leaf_with(
                "ayanamsa",
                &[("name", resolved.name.as_str())],
                &format!("{:.6}", resolved.value),
            );
        }
        None => xml.leaf("zodiac", "tropical"),
    }
    xml.leaf("julian_day_ut", &format!("{:.6}", instant.julian_day()));
}

fn write_position(xml: &mut XmlWriter, position: &BodyPosition) {
    xml.leaf("longitude", &format!("{:.6}", position.longitude));
    xml.leaf("formatted", &format_longitude(position.longitude));
    xml.leaf("sign", Sign::from_longitude(position.longitude).name());
    xml.leaf("latitude", &format!("{:.6}", position.latitude));
    xml.leaf("speed", &format!("{:.6}", position.speed_longitude));
    xml.leaf("retrograde", if position.is_retrograde { "true" } else { "false" });
}

fn write_houses(xml: &mut XmlWriter, frame: &HouseFrame) {
    xml.open("house_cusps", &[]);
    for (index, cusp) in frame.cusps.iter().enumerate() {
        let number = (index + 1).to_string();
        xml.open("house_cusp", &[("number", number.as_str())]);
        xml.leaf("longitude", &format!("{:.6}", cusp));
        xml.leaf("formatted", &format_longitude(*cusp));
        xml.close("house_cusp");
    }
    xml.close("house_cusps");

    xml.open("angles", &[]);
    for (tag, value) in [("ascendant", frame.ascendant), ("midheaven", frame.midheaven)] {
        xml.open(tag, &[]);
        xml.leaf("longitude", &format!("{:.6}", value));
        xml.leaf("formatted", &format_longitude(value));
        xml.close(tag);
    }
    xml.close("angles");
}

#[derive(Default)]
struct XmlWriter {
    out: String,
    depth: usize,
}

impl XmlWriter {
    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
    }

    fn start_tag(&mut self, tag: &str, attributes: &[(&str, &str)]) {
        self.indent();
        self.out.push('<');
        self.out.push_str(tag);
        for (name, value) in attributes {
            let _ = write!(self.out, " {}=\"{}\"", name, escape_attribute(value));
        }
        self.out.push('>');
    }

    fn open(&mut self, tag: &str, attributes: &[(&str, &str)]) {
        self.start_tag(tag, attributes);
        self.out.push('\n');
        self.depth += 1;
    }

    fn close(&mut self, tag: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.indent();
        let _ = writeln!(self.out, "</{}>", tag);
    }

    fn leaf(&mut self, tag: &str, text: &str) {
        self.leaf_with(tag, &[], text);
    }

    fn leaf_with(&mut self, tag: &str, attributes: &[(&str, &str)], text: &str) {
        self.start_tag(tag, attributes);
        let _ = writeln!(self.out, "{}</{}>", escape_text(text), tag);
    }

    fn error(&mut self, message: &str) {
        self.leaf("error", message);
    }

    fn error_in(&mut self, tag: &str, message: &str) {
        self.open(tag, &[]);
        self.error(message);
        self.close(tag);
    }

    fn finish(self) -> String {
        self.out
    }
}

fn escape_text(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn escape_attribute(raw: &str) -> String {
    escape_text(raw)
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
