//! GPX records and their schema tables
//!
//! One [`Waypoint`] type serves `<wpt>`, `<rtept>` and `<trkpt>`; the containing record
//! decides the tag. Fields that only exist in one wire version are kept on the record and
//! simply left out of the other version's table.

mod bounds;
mod gpx;
mod route;
mod track;
mod waypoint;

pub use bounds::Bounds;
pub use gpx::{Gpx, read};
pub use route::Route;
pub use track::{Track, TrackSegment};
pub use waypoint::{FIX_TYPES, Waypoint};

use crate::Result;
use crate::codec::WireVersion;
use crate::schema::Record;

/// Build and validate every schema table
///
/// Tables are otherwise built lazily on first use; calling this at startup turns a
/// malformed table into an immediate error.
pub fn validate_schemas() -> Result<()> {
    for version in WireVersion::ALL {
        Gpx::schema(version)?;
        Bounds::schema(version)?;
        Waypoint::schema(version)?;
        Route::schema(version)?;
        Track::schema(version)?;
        TrackSegment::schema(version)?;
    }
    tracing::debug!("All schema tables validated");
    Ok(())
}
