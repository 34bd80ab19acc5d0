use super::cli::{Command, parse_args};
use super::logging::setup_logging;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use thiserror::Error;
use track_log_lib::{CodecError, EncodeOptions, Gpx, WireVersion};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} of {1} files could not be read")]
    Failed(usize, usize),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Command line entry point
pub fn main() -> ExitCode {
    setup_logging();
    log_version_info();

    let cli = parse_args();
    let result = track_log_lib::validate_schemas()
        .map_err(AppError::from)
        .and_then(|()| run(cli.command));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn log_version_info() {
    tracing::debug!(
        "{} {} starting",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );
}

fn run(command: Command) -> Result<(), AppError> {
    match command {
        Command::Info { files } => info(&files),
        Command::Convert {
            input,
            to,
            output,
            compact,
            creator,
        } => {
            let options = EncodeOptions {
                pretty: !compact,
                creator,
            };
            convert(&input, to, output.as_deref(), &options)
        }
    }
}

/// Reads one GPX file
fn load(path: &Path) -> Result<Gpx, AppError> {
    let wrap = |source: CodecError| AppError::Load {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(|e| wrap(e.into()))?;
    track_log_lib::read(BufReader::new(file)).map_err(wrap)
}

fn info(files: &[PathBuf]) -> Result<(), AppError> {
    #[cfg(feature = "profiling")]
    profiling::scope!("run::info");

    let start = std::time::Instant::now();
    let loaded: Vec<_> = files.par_iter().map(|path| (path, load(path))).collect();
    tracing::info!("Loaded {} files in {:?}", files.len(), start.elapsed());

    let mut failures = 0;
    for (path, result) in loaded {
        match result {
            Ok(gpx) => println!("{}", summary(path, &gpx)),
            Err(err) => {
                tracing::error!("{err}");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        return Err(AppError::Failed(failures, files.len()));
    }
    Ok(())
}

fn summary(path: &Path, gpx: &Gpx) -> String {
    let version = gpx
        .version
        .map(|v| v.to_string())
        .unwrap_or_else(|| "?".to_string());
    let mut text = format!(
        "{}: GPX {} by {}\n  {} waypoints, {} routes, {} tracks, {} points\n  length: {:.3} km (3D {:.3} km)",
        path.display(),
        version,
        gpx.creator.as_deref().unwrap_or("unknown"),
        gpx.waypoints.len(),
        gpx.routes.len(),
        gpx.tracks.len(),
        gpx.point_count(),
        gpx.length_2d() / 1000.0,
        gpx.length_3d() / 1000.0,
    );
    if let Some(bounds) = gpx.compute_bounds()
        && bounds.is_complete()
    {
        text.push_str(&format!(
            "\n  bounds: lat [{:.6}, {:.6}] lon [{:.6}, {:.6}]",
            bounds.min_latitude.unwrap_or_default(),
            bounds.max_latitude.unwrap_or_default(),
            bounds.min_longitude.unwrap_or_default(),
            bounds.max_longitude.unwrap_or_default(),
        ));
    }
    text
}

fn convert(
    input: &Path,
    to: WireVersion,
    output: Option<&Path>,
    options: &EncodeOptions,
) -> Result<(), AppError> {
    #[cfg(feature = "profiling")]
    profiling::scope!("run::convert");

    let gpx = load(input)?;
    let xml = gpx.to_xml(to, options)?;

    match output {
        Some(path) => std::fs::write(path, &xml).map_err(|source| AppError::Write {
            path: path.to_path_buf(),
            source,
        })?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(xml.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }

    tracing::info!(
        "Converted {} from GPX {} to GPX {}",
        input.display(),
        gpx.version.map(|v| v.to_string()).unwrap_or_default(),
        to
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<gpx version="1.1" creator="unit" xmlns="http://www.topografix.com/GPX/1/1">
  <trk><trkseg>
    <trkpt lat="45.0" lon="7.0"><ele>100</ele></trkpt>
    <trkpt lat="45.01" lon="7.0"><ele>110</ele></trkpt>
  </trkseg></trk>
</gpx>"#;

    #[test]
    fn test_summary_lists_counts() {
        let gpx = Gpx::parse(SAMPLE).unwrap();
        let text = summary(Path::new("ride.gpx"), &gpx);
        assert!(text.starts_with("ride.gpx: GPX 1.1 by unit"));
        assert!(text.contains("0 waypoints, 0 routes, 1 tracks, 2 points"));
        assert!(text.contains("bounds: lat [45.000000, 45.010000]"));
    }

    #[test]
    fn test_load_missing_file_names_path() {
        let err = load(Path::new("/nonexistent/track.gpx")).unwrap_err();
        assert!(err.to_string().starts_with("/nonexistent/track.gpx: "));
    }

    #[test]
    fn test_convert_writes_target_version() {
        let dir = std::env::temp_dir().join(format!("track-log-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let input = dir.join("in.gpx");
        let output = dir.join("out.gpx");
        std::fs::write(&input, SAMPLE).unwrap();

        convert(&input, WireVersion::V1_0, Some(&output), &EncodeOptions::compact()).unwrap();
        let written = std::fs::read_to_string(&output).unwrap();
        assert!(written.contains(r#"version="1.0""#));
        assert!(written.contains("http://www.topografix.com/GPX/1/0"));

        let back = Gpx::parse(&written).unwrap();
        assert_eq!(back.point_count(), 2);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
