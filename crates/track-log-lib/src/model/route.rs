use crate::Result;
use crate::codec::WireVersion;
use crate::extensions::ExtensionElement;
use crate::model::Waypoint;
use crate::schema::{FieldSpec, Record, Schema, SchemaError, SchemaTables};

/// An ordered list of points leading to a destination
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Route {
    pub name: Option<String>,
    pub comment: Option<String>,
    pub description: Option<String>,
    pub source: Option<String>,
    pub link: Option<String>,
    pub link_text: Option<String>,
    pub link_type: Option<String>,
    pub number: Option<u32>,
    /// GPX 1.1 only
    pub kind: Option<String>,
    pub extensions: Vec<ExtensionElement>,
    pub points: Vec<Waypoint>,
}

impl Route {
    /// Great-circle length in meters
    pub fn length_2d(&self) -> f64 {
        crate::geometry::length_2d(&self.points)
    }
}

fn route_v1_0() -> std::result::Result<Schema<Route>, SchemaError> {
    Schema::builder()
        .element(slot!(Route, name), "name")
        .field(FieldSpec::new(slot!(Route, comment)).tag("cmt").free_text())
        .field(FieldSpec::new(slot!(Route, description)).tag("desc").free_text())
        .element(slot!(Route, source), "src")
        .element(slot!(Route, link), "url")
        .element(slot!(Route, link_text), "urlname")
        .element(slot!(Route, number), "number")
        .repeated(slot!(Route, points), "rtept")
        .build()
}

fn route_v1_1() -> std::result::Result<Schema<Route>, SchemaError> {
    Schema::builder()
        .element(slot!(Route, name), "name")
        .field(FieldSpec::new(slot!(Route, comment)).tag("cmt").free_text())
        .field(FieldSpec::new(slot!(Route, description)).tag("desc").free_text())
        .element(slot!(Route, source), "src")
        .directive("link:link:link_text:link_type")
        .attribute(slot!(Route, link), "href")
        .element(slot!(Route, link_text), "text")
        .element(slot!(Route, link_type), "type")
        .directive("/link")
        .element(slot!(Route, number), "number")
        .element(slot!(Route, kind), "type")
        .extensions(slot!(Route, extensions), "extensions")
        .repeated(slot!(Route, points), "rtept")
        .build()
}

impl Record for Route {
    fn schema(version: WireVersion) -> Result<&'static Schema<Self>> {
        static TABLES: SchemaTables<Route> = SchemaTables::new(route_v1_0, route_v1_1);
        TABLES.get(version)
    }
}
