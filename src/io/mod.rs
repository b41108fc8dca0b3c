//! I/O modules for orbit files, product identifiers and acquisition catalogs

pub mod catalog;
pub mod orbit;
pub mod slc_id;

pub use catalog::{CatalogEntry, CatalogQuery, Footprint, InMemoryCatalog};
pub use orbit::{LocalOrbitArchive, OrbitFileName, OrbitProvider, OrbitReader, OrbitType};
pub use slc_id::{acquisition_start_from_id, SlcId};
