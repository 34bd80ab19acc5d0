use geo::Point;

use crate::Result;
use crate::codec::WireVersion;
use crate::convert::Timestamp;
use crate::extensions::ExtensionElement;
use crate::schema::{FieldSpec, Record, Schema, SchemaError, SchemaTables};

/// Allowed values of `<fix>`
pub const FIX_TYPES: &[&str] = &["none", "2d", "3d", "dgps", "pps"];

/// A point: waypoint, route point or track point
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Waypoint {
    /// Degrees north, WGS84
    pub latitude: f64,
    /// Degrees east, WGS84
    pub longitude: f64,
    /// Meters above mean sea level
    pub elevation: Option<f64>,
    pub time: Option<Timestamp>,
    /// Degrees, GPX 1.0 only
    pub course: Option<f64>,
    /// Meters per second, GPX 1.0 only
    pub speed: Option<f64>,
    pub magnetic_variation: Option<f64>,
    pub geoid_height: Option<f64>,
    pub name: Option<String>,
    pub comment: Option<String>,
    pub description: Option<String>,
    pub source: Option<String>,
    pub link: Option<String>,
    pub link_text: Option<String>,
    pub link_type: Option<String>,
    pub symbol: Option<String>,
    /// Classification, the `<type>` element
    pub kind: Option<String>,
    /// One of [`FIX_TYPES`]
    pub fix: Option<String>,
    pub satellites: Option<u32>,
    pub horizontal_dilution: Option<f64>,
    pub vertical_dilution: Option<f64>,
    pub position_dilution: Option<f64>,
    /// Seconds since the last DGPS update
    pub age_of_dgps_data: Option<f64>,
    pub dgps_id: Option<u32>,
    pub extensions: Vec<ExtensionElement>,
}

impl Waypoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            ..Default::default()
        }
    }

    /// Position as a `geo` point (x = longitude, y = latitude)
    #[inline]
    pub fn point(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }
}

fn waypoint_v1_0() -> std::result::Result<Schema<Waypoint>, SchemaError> {
    Schema::builder()
        .field(FieldSpec::new(slot!(Waypoint, latitude)).attribute("lat").mandatory())
        .field(FieldSpec::new(slot!(Waypoint, longitude)).attribute("lon").mandatory())
        .element(slot!(Waypoint, elevation), "ele")
        .element(slot!(Waypoint, time), "time")
        .element(slot!(Waypoint, course), "course")
        .element(slot!(Waypoint, speed), "speed")
        .element(slot!(Waypoint, magnetic_variation), "magvar")
        .element(slot!(Waypoint, geoid_height), "geoidheight")
        .element(slot!(Waypoint, name), "name")
        .field(FieldSpec::new(slot!(Waypoint, comment)).tag("cmt").free_text())
        .field(FieldSpec::new(slot!(Waypoint, description)).tag("desc").free_text())
        .element(slot!(Waypoint, source), "src")
        .element(slot!(Waypoint, link), "url")
        .element(slot!(Waypoint, link_text), "urlname")
        .element(slot!(Waypoint, symbol), "sym")
        .element(slot!(Waypoint, kind), "type")
        .field(FieldSpec::new(slot!(Waypoint, fix)).possible(FIX_TYPES))
        .element(slot!(Waypoint, satellites), "sat")
        .element(slot!(Waypoint, horizontal_dilution), "hdop")
        .element(slot!(Waypoint, vertical_dilution), "vdop")
        .element(slot!(Waypoint, position_dilution), "pdop")
        .element(slot!(Waypoint, age_of_dgps_data), "ageofdgpsdata")
        .element(slot!(Waypoint, dgps_id), "dgpsid")
        .build()
}

fn waypoint_v1_1() -> std::result::Result<Schema<Waypoint>, SchemaError> {
    Schema::builder()
        .field(FieldSpec::new(slot!(Waypoint, latitude)).attribute("lat").mandatory())
        .field(FieldSpec::new(slot!(Waypoint, longitude)).attribute("lon").mandatory())
        .element(slot!(Waypoint, elevation), "ele")
        .element(slot!(Waypoint, time), "time")
        .element(slot!(Waypoint, magnetic_variation), "magvar")
        .element(slot!(Waypoint, geoid_height), "geoidheight")
        .element(slot!(Waypoint, name), "name")
        .field(FieldSpec::new(slot!(Waypoint, comment)).tag("cmt").free_text())
        .field(FieldSpec::new(slot!(Waypoint, description)).tag("desc").free_text())
        .element(slot!(Waypoint, source), "src")
        .directive("link:link:link_text:link_type")
        .attribute(slot!(Waypoint, link), "href")
        .element(slot!(Waypoint, link_text), "text")
        .element(slot!(Waypoint, link_type), "type")
        .directive("/link")
        .element(slot!(Waypoint, symbol), "sym")
        .element(slot!(Waypoint, kind), "type")
        .field(FieldSpec::new(slot!(Waypoint, fix)).possible(FIX_TYPES))
        .element(slot!(Waypoint, satellites), "sat")
        .element(slot!(Waypoint, horizontal_dilution), "hdop")
        .element(slot!(Waypoint, vertical_dilution), "vdop")
        .element(slot!(Waypoint, position_dilution), "pdop")
        .element(slot!(Waypoint, age_of_dgps_data), "ageofdgpsdata")
        .element(slot!(Waypoint, dgps_id), "dgpsid")
        .extensions(slot!(Waypoint, extensions), "extensions")
        .build()
}

impl Record for Waypoint {
    fn schema(version: WireVersion) -> Result<&'static Schema<Self>> {
        static TABLES: SchemaTables<Waypoint> = SchemaTables::new(waypoint_v1_0, waypoint_v1_1);
        TABLES.get(version)
    }
}
