use crate::Result;
use crate::codec::WireVersion;
use crate::extensions::ExtensionElement;
use crate::model::Waypoint;
use crate::schema::{FieldSpec, Record, Schema, SchemaError, SchemaTables};

/// A recorded path, split into segments wherever reception was lost
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Track {
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
    pub segments: Vec<TrackSegment>,
}

/// Consecutive points of a track
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackSegment {
    pub points: Vec<Waypoint>,
    pub extensions: Vec<ExtensionElement>,
}

impl Track {
    /// Sum of the segment lengths in meters; gaps between segments are not counted
    pub fn length_2d(&self) -> f64 {
        self.segments.iter().map(TrackSegment::length_2d).sum()
    }

    pub fn length_3d(&self) -> f64 {
        self.segments.iter().map(TrackSegment::length_3d).sum()
    }

    pub fn point_count(&self) -> usize {
        self.segments.iter().map(|s| s.points.len()).sum()
    }

    /// All points of all segments in order
    pub fn points(&self) -> impl Iterator<Item = &Waypoint> {
        self.segments.iter().flat_map(|s| s.points.iter())
    }
}

impl TrackSegment {
    pub fn length_2d(&self) -> f64 {
        crate::geometry::length_2d(&self.points)
    }

    pub fn length_3d(&self) -> f64 {
        crate::geometry::length_3d(&self.points)
    }
}

fn track_v1_0() -> std::result::Result<Schema<Track>, SchemaError> {
    Schema::builder()
        .element(slot!(Track, name), "name")
        .field(FieldSpec::new(slot!(Track, comment)).tag("cmt").free_text())
        .field(FieldSpec::new(slot!(Track, description)).tag("desc").free_text())
        .element(slot!(Track, source), "src")
        .element(slot!(Track, link), "url")
        .element(slot!(Track, link_text), "urlname")
        .element(slot!(Track, number), "number")
        .repeated(slot!(Track, segments), "trkseg")
        .build()
}

fn track_v1_1() -> std::result::Result<Schema<Track>, SchemaError> {
    Schema::builder()
        .element(slot!(Track, name), "name")
        .field(FieldSpec::new(slot!(Track, comment)).tag("cmt").free_text())
        .field(FieldSpec::new(slot!(Track, description)).tag("desc").free_text())
        .element(slot!(Track, source), "src")
        .directive("link:link:link_text:link_type")
        .attribute(slot!(Track, link), "href")
        .element(slot!(Track, link_text), "text")
        .element(slot!(Track, link_type), "type")
        .directive("/link")
        .element(slot!(Track, number), "number")
        .element(slot!(Track, kind), "type")
        .extensions(slot!(Track, extensions), "extensions")
        .repeated(slot!(Track, segments), "trkseg")
        .build()
}

fn segment_v1_0() -> std::result::Result<Schema<TrackSegment>, SchemaError> {
    Schema::builder()
        .repeated(slot!(TrackSegment, points), "trkpt")
        .build()
}

fn segment_v1_1() -> std::result::Result<Schema<TrackSegment>, SchemaError> {
    Schema::builder()
        .repeated(slot!(TrackSegment, points), "trkpt")
        .extensions(slot!(TrackSegment, extensions), "extensions")
        .build()
}

impl Record for Track {
    fn schema(version: WireVersion) -> Result<&'static Schema<Self>> {
        static TABLES: SchemaTables<Track> = SchemaTables::new(track_v1_0, track_v1_1);
        TABLES.get(version)
    }
}

impl Record for TrackSegment {
    fn schema(version: WireVersion) -> Result<&'static Schema<Self>> {
        static TABLES: SchemaTables<TrackSegment> =
            SchemaTables::new(segment_v1_0, segment_v1_1);
        TABLES.get(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{self, EncodeOptions};
    use crate::extensions::NamespaceMap;

    fn segment(points: &[(f64, f64)]) -> TrackSegment {
        TrackSegment {
            points: points
                .iter()
                .map(|&(lat, lon)| Waypoint::new(lat, lon))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_track_counts_and_points() {
        let track = Track {
            segments: vec![segment(&[(0.0, 0.0), (0.0, 1.0)]), segment(&[(1.0, 1.0)])],
            ..Default::default()
        };
        assert_eq!(track.point_count(), 3);
        assert_eq!(track.points().count(), 3);
        // Only the first segment contributes distance
        assert!((track.length_2d() - track.segments[0].length_2d()).abs() < 1e-9);
        assert!(track.length_2d() > 111_000.0);
    }

    #[test]
    fn test_segments_encode_in_order() {
        let track = Track {
            name: Some("Morning".to_string()),
            segments: vec![segment(&[(1.0, 2.0)]), segment(&[(3.0, 4.0)])],
            ..Default::default()
        };
        let xml = codec::encode(
            &track,
            "trk",
            WireVersion::V1_1,
            &NamespaceMap::new(),
            &EncodeOptions::compact(),
        )
        .unwrap();
        assert_eq!(
            xml,
            concat!(
                "<trk><name>Morning</name>",
                r#"<trkseg><trkpt lat="1" lon="2"/></trkseg>"#,
                r#"<trkseg><trkpt lat="3" lon="4"/></trkseg>"#,
                "</trk>"
            )
        );
    }
}
