use crate::types::{AzimuthError, AzimuthResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ground footprint of an acquisition as a lon/lat polygon ring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    vertices: Vec<(f64, f64)>,
}

impl Footprint {
    /// Polygon from `(lon, lat)` vertices; a closing vertex is optional
    pub fn new(vertices: Vec<(f64, f64)>) -> AzimuthResult<Self> {
        let distinct = match (vertices.first(), vertices.last()) {
            (Some(first), Some(last)) if first == last => vertices.len() - 1,
            _ => vertices.len(),
        };
        if distinct < 3 {
            return Err(AzimuthError::InvalidFormat(format!(
                "Footprint needs at least 3 vertices, got {}",
                distinct
            )));
        }
        if vertices.iter().any(|(lon, lat)| !lon.is_finite() || !lat.is_finite()) {
            return Err(AzimuthError::InvalidFormat("Footprint has non-finite vertices".to_string()));
        }
        Ok(Self { vertices })
    }

    /// Parse `POLYGON((lon1 lat1, lon2 lat2, ...))`; only the outer ring is kept
    pub fn from_wkt(wkt: &str) -> AzimuthResult<Self> {
        let wkt = wkt.trim();
        if !wkt.to_uppercase().starts_with("POLYGON") {
            return Err(AzimuthError::InvalidFormat(format!("Expected WKT POLYGON, got '{}'", wkt)));
        }

        let start = wkt
            .find("((")
            .ok_or_else(|| AzimuthError::InvalidFormat("WKT polygon missing '(('".to_string()))?;
        let end = wkt
            .rfind("))")
            .ok_or_else(|| AzimuthError::InvalidFormat("WKT polygon missing '))'".to_string()))?;
        if end <= start {
            return Err(AzimuthError::InvalidFormat("WKT polygon parentheses out of order".to_string()));
        }

        // Holes are separated from the outer ring by "), ("
        let body = &wkt[start + 2..end];
        let outer = body.split(')').next().unwrap_or(body);

        let vertices = outer
            .split(',')
            .map(|pair| {
                let parts: Vec<&str> = pair.split_whitespace().collect();
                if parts.len() != 2 {
                    return Err(AzimuthError::InvalidFormat(format!(
                        "Expected 'lon lat' pair, got '{}'",
                        pair.trim()
                    )));
                }
                let lon = parts[0]
                    .parse::<f64>()
                    .map_err(|e| AzimuthError::InvalidFormat(format!("Bad longitude '{}': {}", parts[0], e)))?;
                let lat = parts[1]
                    .parse::<f64>()
                    .map_err(|e| AzimuthError::InvalidFormat(format!("Bad latitude '{}': {}", parts[1], e)))?;
                Ok((lon, lat))
            })
            .collect::<AzimuthResult<Vec<_>>>()?;

        Self::new(vertices)
    }

    /// Axis-aligned rectangle footprint
    pub fn from_bounds(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> AzimuthResult<Self> {
        Self::new(vec![
            (min_lon, min_lat),
            (max_lon, min_lat),
            (max_lon, max_lat),
            (min_lon, max_lat),
        ])
    }

    pub fn vertices(&self) -> &[(f64, f64)] {
        &self.vertices
    }

    /// Ray-casting point-in-polygon test
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        let n = self.vertices.len();
        let mut inside = false;
        let mut j = n - 1;

        for i in 0..n {
            let (xi, yi) = self.vertices[i];
            let (xj, yj) = self.vertices[j];

            if ((yi > lat) != (yj > lat)) && (lon < (xj - xi) * (lat - yi) / (yj - yi) + xi) {
                inside = !inside;
            }
            j = i;
        }

        inside
    }

    pub fn to_wkt(&self) -> String {
        let mut ring: Vec<String> = self.vertices.iter().map(|(lon, lat)| format!("{} {}", lon, lat)).collect();
        if self.vertices.first() != self.vertices.last() {
            if let Some((lon, lat)) = self.vertices.first() {
                ring.push(format!("{} {}", lon, lat));
            }
        }
        format!("POLYGON(({}))", ring.join(", "))
    }
}

/// A catalog acquisition record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub scene_name: String,
    pub footprint: Footprint,
    pub start: DateTime<Utc>,
    pub stop: DateTime<Utc>,
}

impl CatalogEntry {
    /// Whether the acquisition window overlaps `[start, end]`
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start <= end && self.stop >= start
    }
}

/// Source of acquisitions covering a point in a time window
pub trait CatalogQuery {
    fn search(
        &self,
        longitude: f64,
        latitude: f64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AzimuthResult<Vec<CatalogEntry>>;
}

/// Catalog held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    entries: Vec<CatalogEntry>,
}

impl InMemoryCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn insert(&mut self, entry: CatalogEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CatalogQuery for InMemoryCatalog {
    fn search(
        &self,
        longitude: f64,
        latitude: f64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AzimuthResult<Vec<CatalogEntry>> {
        let hits: Vec<CatalogEntry> = self
            .entries
            .iter()
            .filter(|e| e.overlaps(start, end) && e.footprint.contains(longitude, latitude))
            .cloned()
            .collect();

        log::debug!(
            "Catalog search at ({:.4}, {:.4}) {}..{}: {} of {} entries",
            longitude,
            latitude,
            start,
            end,
            hits.len(),
            self.entries.len()
        );

        Ok(hits)
    }
}
