use crate::io::slc_id::{parse_filename_time, SlcId};
use crate::types::{AzimuthError, AzimuthResult, OrbitData, StateVector};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

const EOF_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Orbit file types available from ESA
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OrbitType {
    /// Precise Orbit Ephemerides (best accuracy, ~20 days delay)
    POEORB,
    /// Restituted Orbit Ephemerides (lower accuracy, ~3 hours delay)
    RESORB,
}

impl std::fmt::Display for OrbitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrbitType::POEORB => write!(f, "POEORB"),
            OrbitType::RESORB => write!(f, "RESORB"),
        }
    }
}

/// Parsed orbit file name:
/// `S1X_OPER_AUX_<type>_OPOD_<produced>_V<validity start>_<validity stop>.EOF[.zip]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrbitFileName {
    pub platform: String,
    pub orbit_type: OrbitType,
    pub produced: DateTime<Utc>,
    pub validity_start: DateTime<Utc>,
    pub validity_stop: DateTime<Utc>,
}

impl OrbitFileName {
    pub fn parse(file_name: &str) -> AzimuthResult<Self> {
        let invalid = |reason: &str| AzimuthError::InvalidFormat(format!("Orbit file name '{}': {}", file_name, reason));

        let stem = file_name
            .strip_suffix(".EOF.zip")
            .or_else(|| file_name.strip_suffix(".EOF"))
            .ok_or_else(|| invalid("expected .EOF or .EOF.zip extension"))?;

        let parts: Vec<&str> = stem.split('_').collect();
        if parts.len() != 8 || parts[1] != "OPER" || parts[2] != "AUX" || parts[4] != "OPOD" {
            return Err(invalid("unexpected field layout"));
        }

        let orbit_type = match parts[3] {
            "POEORB" => OrbitType::POEORB,
            "RESORB" => OrbitType::RESORB,
            other => return Err(invalid(&format!("unknown orbit type {}", other))),
        };

        let validity_start = parts[6]
            .strip_prefix('V')
            .ok_or_else(|| invalid("validity start must begin with 'V'"))?;

        Ok(Self {
            platform: parts[0].to_string(),
            orbit_type,
            produced: parse_filename_time(parts[5])?,
            validity_start: parse_filename_time(validity_start)?,
            validity_stop: parse_filename_time(parts[7])?,
        })
    }

    /// Whether the validity window contains all of `[start, end]`
    pub fn covers(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.validity_start <= start && self.validity_stop >= end
    }

    pub fn validity_span(&self) -> Duration {
        self.validity_stop - self.validity_start
    }
}

/// Sentinel-1 orbit file (EOF) reader and writer
pub struct OrbitReader;

impl OrbitReader {
    /// Read an orbit file, either plain EOF XML or a zip holding one `.EOF` member
    pub fn read_orbit_file<P: AsRef<Path>>(path: P) -> AzimuthResult<OrbitData> {
        log::info!("Reading orbit file: {}", path.as_ref().display());

        let bytes = fs::read(&path)?;
        let content = if Self::is_zip_content(&bytes) {
            Self::extract_eof_from_zip(&bytes)?
        } else {
            String::from_utf8(bytes)
                .map_err(|e| AzimuthError::InvalidFormat(format!("Orbit file is not UTF-8: {}", e)))?
        };

        Self::parse_eof(&content)
    }

    /// Parse EOF XML content
    pub fn parse_eof(content: &str) -> AzimuthResult<OrbitData> {
        log::debug!("Parsing EOF orbit content ({} bytes)", content.len());

        let mut reader = Reader::from_str(content);
        reader.trim_text(true);

        let mut state_vectors = Vec::new();
        let mut validity_start = None;
        let mut validity_stop = None;
        let mut current_tag = String::new();
        let mut osv: Option<OsvBuilder> = None;

        loop {
            match reader.read_event()? {
                Event::Start(ref e) => {
                    current_tag = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                    if current_tag == "OSV" {
                        osv = Some(OsvBuilder::default());
                    }
                }
                Event::End(ref e) => {
                    if e.local_name().as_ref() == b"OSV" {
                        if let Some(builder) = osv.take() {
                            match builder.build() {
                                Some(sv) => state_vectors.push(sv),
                                None => log::warn!("Skipping incomplete OSV block in orbit file"),
                            }
                        }
                    }
                    current_tag.clear();
                }
                Event::Text(e) => {
                    let text = e.unescape()?;
                    let value = strip_key_prefix(text.as_ref());
                    match (current_tag.as_str(), osv.as_mut()) {
                        ("Validity_Start", None) => validity_start = Some(parse_eof_time(value)?),
                        ("Validity_Stop", None) => validity_stop = Some(parse_eof_time(value)?),
                        ("UTC", Some(b)) => b.time = Some(parse_eof_time(value)?),
                        ("X", Some(b)) => b.position[0] = Some(parse_eof_number(&current_tag, value)?),
                        ("Y", Some(b)) => b.position[1] = Some(parse_eof_number(&current_tag, value)?),
                        ("Z", Some(b)) => b.position[2] = Some(parse_eof_number(&current_tag, value)?),
                        ("VX", Some(b)) => b.velocity[0] = Some(parse_eof_number(&current_tag, value)?),
                        ("VY", Some(b)) => b.velocity[1] = Some(parse_eof_number(&current_tag, value)?),
                        ("VZ", Some(b)) => b.velocity[2] = Some(parse_eof_number(&current_tag, value)?),
                        _ => {}
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if state_vectors.is_empty() {
            return Err(AzimuthError::InvalidFormat(
                "No orbit state vectors found in EOF content".to_string(),
            ));
        }

        state_vectors.sort_by_key(|sv| sv.time);
        Self::validate_orbit_data(&state_vectors);

        log::info!(
            "Parsed {} state vectors ({} to {})",
            state_vectors.len(),
            state_vectors[0].time.format("%Y-%m-%d %H:%M:%S"),
            state_vectors[state_vectors.len() - 1].time.format("%Y-%m-%d %H:%M:%S")
        );

        Ok(OrbitData {
            state_vectors,
            validity_start,
            validity_stop,
        })
    }

    /// Render orbit data as minimal EOF XML
    pub fn to_eof_string(orbit: &OrbitData) -> String {
        let mut content = String::new();
        content.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        content.push_str("<Earth_Explorer_File>\n");
        content.push_str("  <Earth_Explorer_Header>\n");
        content.push_str("    <Fixed_Header>\n");
        content.push_str("      <Validity_Period>\n");
        if let Some(start) = orbit.validity_start {
            content.push_str(&format!(
                "        <Validity_Start>UTC={}</Validity_Start>\n",
                start.format("%Y-%m-%dT%H:%M:%S")
            ));
        }
        if let Some(stop) = orbit.validity_stop {
            content.push_str(&format!(
                "        <Validity_Stop>UTC={}</Validity_Stop>\n",
                stop.format("%Y-%m-%dT%H:%M:%S")
            ));
        }
        content.push_str("      </Validity_Period>\n");
        content.push_str("    </Fixed_Header>\n");
        content.push_str("  </Earth_Explorer_Header>\n");
        content.push_str("  <Data_Block type=\"xml\">\n");
        content.push_str(&format!(
            "    <List_of_OSVs count=\"{}\">\n",
            orbit.state_vectors.len()
        ));

        for sv in &orbit.state_vectors {
            let stamp = sv.time.format("%Y-%m-%dT%H:%M:%S.%6f");
            content.push_str("      <OSV>\n");
            content.push_str(&format!("        <UTC>UTC={}</UTC>\n", stamp));
            content.push_str(&format!("        <X unit=\"m\">{:.6}</X>\n", sv.position[0]));
            content.push_str(&format!("        <Y unit=\"m\">{:.6}</Y>\n", sv.position[1]));
            content.push_str(&format!("        <Z unit=\"m\">{:.6}</Z>\n", sv.position[2]));
            content.push_str(&format!("        <VX unit=\"m/s\">{:.6}</VX>\n", sv.velocity[0]));
            content.push_str(&format!("        <VY unit=\"m/s\">{:.6}</VY>\n", sv.velocity[1]));
            content.push_str(&format!("        <VZ unit=\"m/s\">{:.6}</VZ>\n", sv.velocity[2]));
            content.push_str("      </OSV>\n");
        }

        content.push_str("    </List_of_OSVs>\n");
        content.push_str("  </Data_Block>\n");
        content.push_str("</Earth_Explorer_File>\n");
        content
    }

    /// Write orbit data as an EOF file; a `.zip` path gets a zipped EOF
    pub fn write_eof<P: AsRef<Path>>(orbit: &OrbitData, path: P) -> AzimuthResult<()> {
        let path = path.as_ref();
        log::info!("Writing orbit file: {}", path.display());

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = Self::to_eof_string(orbit);
        let is_zip = path.extension().map_or(false, |ext| ext.eq_ignore_ascii_case("zip"));

        if is_zip {
            let member = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "orbit.EOF".to_string());
            let file = fs::File::create(path)?;
            let mut zip = zip::ZipWriter::new(file);
            zip.start_file(member, zip::write::FileOptions::default())?;
            zip.write_all(content.as_bytes())?;
            zip.finish()?;
        } else {
            fs::write(path, content)?;
        }

        log::debug!("Wrote {} state vectors", orbit.state_vectors.len());
        Ok(())
    }

    /// Check if content is a ZIP file by examining magic bytes
    fn is_zip_content(bytes: &[u8]) -> bool {
        bytes.len() >= 4 && bytes[0..4] == [0x50, 0x4B, 0x03, 0x04]
    }

    /// Extract the first `.EOF` member of a zip archive
    fn extract_eof_from_zip(zip_bytes: &[u8]) -> AzimuthResult<String> {
        let mut archive = zip::ZipArchive::new(Cursor::new(zip_bytes))?;

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.name().ends_with(".EOF") {
                log::debug!("Found EOF file in ZIP: {}", file.name());
                let mut contents = String::new();
                file.read_to_string(&mut contents)?;
                return Ok(contents);
            }
        }

        Err(AzimuthError::InvalidFormat(
            "No .EOF file found in ZIP archive".to_string(),
        ))
    }

    /// Warn about state vectors with implausible low-Earth-orbit motion
    fn validate_orbit_data(state_vectors: &[StateVector]) {
        for sv in state_vectors {
            let speed = norm(&sv.velocity);
            if !(6000.0..=9000.0).contains(&speed) {
                log::warn!(
                    "Unusual orbital velocity: {:.1} m/s at {}",
                    speed,
                    sv.time.format("%Y-%m-%d %H:%M:%S")
                );
            }

            let radius = norm(&sv.position);
            if !(6_500_000.0..=7_500_000.0).contains(&radius) {
                log::warn!(
                    "Unusual orbital radius: {:.1} km at {}",
                    radius / 1000.0,
                    sv.time.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
    }
}

#[derive(Default)]
struct OsvBuilder {
    time: Option<DateTime<Utc>>,
    position: [Option<f64>; 3],
    velocity: [Option<f64>; 3],
}

impl OsvBuilder {
    fn build(&self) -> Option<StateVector> {
        let [x, y, z] = self.position;
        let [vx, vy, vz] = self.velocity;
        Some(StateVector {
            time: self.time?,
            position: [x?, y?, z?],
            velocity: [vx?, vy?, vz?],
        })
    }
}

/// `UTC=2021-07-22T22:59:42.000000` -> `2021-07-22T22:59:42.000000`
fn strip_key_prefix(text: &str) -> &str {
    match text.split_once('=') {
        Some((_, value)) => value.trim(),
        None => text.trim(),
    }
}

fn parse_eof_time(text: &str) -> AzimuthResult<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text, EOF_TIME_FORMAT)
        .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc))
        .map_err(|e| AzimuthError::InvalidFormat(format!("Bad EOF time '{}': {}", text, e)))
}

fn parse_eof_number(tag: &str, text: &str) -> AzimuthResult<f64> {
    text.parse()
        .map_err(|e| AzimuthError::InvalidFormat(format!("Invalid {} value '{}': {}", tag, text, e)))
}

fn norm(v: &[f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

/// Supplies orbit files for an acquisition
pub trait OrbitProvider {
    /// Path of an orbit file whose validity covers the acquisition padded by `pad`
    fn orbit_file(&self, slc_id: &SlcId, pad: Duration) -> AzimuthResult<PathBuf>;
}

/// Directory of already downloaded orbit files
#[derive(Debug, Clone)]
pub struct LocalOrbitArchive {
    directory: PathBuf,
}

impl LocalOrbitArchive {
    pub fn new<P: Into<PathBuf>>(directory: P) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// `<user cache dir>/s1_azimuth_time_grid/orbits`
    pub fn default_directory() -> AzimuthResult<PathBuf> {
        dirs::cache_dir()
            .map(|dir| dir.join("s1_azimuth_time_grid").join("orbits"))
            .ok_or_else(|| AzimuthError::Processing("No user cache directory on this platform".to_string()))
    }

    /// Archive at [`default_directory`](Self::default_directory)
    pub fn in_default_directory() -> AzimuthResult<Self> {
        Ok(Self::new(Self::default_directory()?))
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// All parseable orbit files in the archive directory
    pub fn list(&self) -> AzimuthResult<Vec<(OrbitFileName, PathBuf)>> {
        if !self.directory.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&self.directory)? {
            let path = entry?.path();
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name,
                None => continue,
            };
            match OrbitFileName::parse(name) {
                Ok(parsed) => files.push((parsed, path.clone())),
                Err(e) => log::debug!("Ignoring {}: {}", path.display(), e),
            }
        }
        Ok(files)
    }
}

impl OrbitProvider for LocalOrbitArchive {
    fn orbit_file(&self, slc_id: &SlcId, pad: Duration) -> AzimuthResult<PathBuf> {
        let start = slc_id.start - pad;
        let stop = slc_id.stop + pad;

        let mut candidates: Vec<(OrbitFileName, PathBuf)> = self
            .list()?
            .into_iter()
            .filter(|(name, _)| name.platform == slc_id.platform && name.covers(start, stop))
            .collect();

        candidates.sort_by(|(a, pa), (b, pb)| {
            a.orbit_type
                .cmp(&b.orbit_type)
                .then(a.validity_span().cmp(&b.validity_span()))
                .then(pa.cmp(pb))
        });

        match candidates.into_iter().next() {
            Some((name, path)) => {
                log::info!("Using {} orbit file {} for {}", name.orbit_type, path.display(), slc_id);
                Ok(path)
            }
            None => Err(AzimuthError::OrbitNotFound(format!(
                "No {} orbit file in {} covers {} to {}",
                slc_id.platform,
                self.directory.display(),
                start,
                stop
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SAMPLE_EOF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Earth_Explorer_File>
  <Earth_Explorer_Header>
    <Fixed_Header>
      <Validity_Period>
        <Validity_Start>UTC=2021-07-22T22:59:42</Validity_Start>
        <Validity_Stop>UTC=2021-07-24T00:59:42</Validity_Stop>
      </Validity_Period>
    </Fixed_Header>
  </Earth_Explorer_Header>
  <Data_Block type="xml">
    <List_of_OSVs count="2">
      <OSV>
        <TAI>TAI=2021-07-23T01:00:37.000000</TAI>
        <UTC>UTC=2021-07-23T01:00:00.000000</UTC>
        <UT1>UT1=2021-07-23T00:59:59.899000</UT1>
        <Absolute_Orbit>+27915</Absolute_Orbit>
        <X unit="m">-2213813.123456</X>
        <Y unit="m">-4966427.654321</Y>
        <Z unit="m">4518315.000001</Z>
        <VX unit="m/s">X=1734.509000</VX>
        <VY unit="m/s">-4651.512000</VY>
        <VZ unit="m/s">-5934.889000</VZ>
        <Quality>NOMINAL</Quality>
      </OSV>
      <OSV>
        <UTC>UTC=2021-07-23T00:59:50.000000</UTC>
        <X unit="m">-2231139.0</X>
        <Y unit="m">-4919757.0</Y>
        <Z unit="m">4577546.0</Z>
        <VX unit="m/s">1730.0</VX>
        <VY unit="m/s">-4682.0</VY>
        <VZ unit="m/s">-5911.0</VZ>
      </OSV>
    </List_of_OSVs>
  </Data_Block>
</Earth_Explorer_File>
"#;

    #[test]
    fn test_parse_sample_eof() {
        let orbit = OrbitReader::parse_eof(SAMPLE_EOF).unwrap();

        assert_eq!(orbit.state_vectors.len(), 2);
        // Sorted by time
        assert_eq!(orbit.state_vectors[0].time, Utc.with_ymd_and_hms(2021, 7, 23, 0, 59, 50).unwrap());
        let sv = &orbit.state_vectors[1];
        assert_eq!(sv.position[0], -2213813.123456);
        assert_eq!(sv.velocity[0], 1734.509);
        assert_eq!(orbit.validity_start, Some(Utc.with_ymd_and_hms(2021, 7, 22, 22, 59, 42).unwrap()));
        assert_eq!(orbit.validity_stop, Some(Utc.with_ymd_and_hms(2021, 7, 24, 0, 59, 42).unwrap()));
    }

    #[test]
    fn test_empty_eof_is_rejected() {
        let content = "<Earth_Explorer_File><Data_Block><List_of_OSVs count=\"0\"></List_of_OSVs></Data_Block></Earth_Explorer_File>";
        assert!(matches!(OrbitReader::parse_eof(content), Err(AzimuthError::InvalidFormat(_))));
    }

    #[test]
    fn test_bad_number_is_rejected() {
        let content = SAMPLE_EOF.replace("-4682.0", "fast");
        assert!(matches!(OrbitReader::parse_eof(&content), Err(AzimuthError::InvalidFormat(_))));
    }

    #[test]
    fn test_orbit_file_name() {
        let name = OrbitFileName::parse(
            "S1B_OPER_AUX_POEORB_OPOD_20210812T111944_V20210722T225942_20210724T005942.EOF.zip",
        )
        .unwrap();

        assert_eq!(name.platform, "S1B");
        assert_eq!(name.orbit_type, OrbitType::POEORB);
        assert_eq!(name.validity_start, Utc.with_ymd_and_hms(2021, 7, 22, 22, 59, 42).unwrap());
        assert_eq!(name.validity_stop, Utc.with_ymd_and_hms(2021, 7, 24, 0, 59, 42).unwrap());
        assert_eq!(name.validity_span(), Duration::hours(26));

        let t = Utc.with_ymd_and_hms(2021, 7, 23, 1, 49, 47).unwrap();
        assert!(name.covers(t, t + Duration::seconds(27)));
        assert!(!name.covers(t, t + Duration::days(2)));
    }

    #[test]
    fn test_orbit_file_name_rejects_other_files() {
        assert!(OrbitFileName::parse("notes.txt").is_err());
        assert!(OrbitFileName::parse("S1B_OPER_AUX_PREORB_OPOD_20210812T111944_V20210722T225942_20210724T005942.EOF").is_err());
        assert!(OrbitFileName::parse("S1B_OPER_AUX_POEORB_OPOD_20210812T111944_20210722T225942_20210724T005942.EOF").is_err());
    }

    #[test]
    fn test_orbit_type_ordering_prefers_precise() {
        assert!(OrbitType::POEORB < OrbitType::RESORB);
        assert_eq!(OrbitType::RESORB.to_string(), "RESORB");
    }
}
