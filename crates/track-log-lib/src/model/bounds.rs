use crate::Result;
use crate::codec::WireVersion;
use crate::schema::{Record, Schema, SchemaError, SchemaTables};

/// Bounding box in degrees, as declared by the document
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bounds {
    pub min_latitude: Option<f64>,
    pub max_latitude: Option<f64>,
    pub min_longitude: Option<f64>,
    pub max_longitude: Option<f64>,
}

impl Bounds {
    /// Whether all four corners are set
    pub fn is_complete(&self) -> bool {
        self.min_latitude.is_some()
            && self.max_latitude.is_some()
            && self.min_longitude.is_some()
            && self.max_longitude.is_some()
    }
}

/// Same layout in both versions
fn bounds_table() -> std::result::Result<Schema<Bounds>, SchemaError> {
    Schema::builder()
        .attribute(slot!(Bounds, min_latitude), "minlat")
        .attribute(slot!(Bounds, max_latitude), "maxlat")
        .attribute(slot!(Bounds, min_longitude), "minlon")
        .attribute(slot!(Bounds, max_longitude), "maxlon")
        .build()
}

impl Record for Bounds {
    fn schema(version: WireVersion) -> Result<&'static Schema<Self>> {
        static TABLES: SchemaTables<Bounds> = SchemaTables::new(bounds_table, bounds_table);
        TABLES.get(version)
    }
}
