//! Source spectra catalog storage.
//!
//! Maps integer source ids (matching the segmentation map of a simulated
//! scene) to flux-versus-wavelength tables. Units travel with the data as
//! plain strings; interpreting them is the job of the surrounding
//! pipeline's units machinery, so this module only guards that they are
//! present and well-formed enough to round-trip.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    /// A unit annotation is missing or blank; writing it out would produce
    /// a malformed catalog.
    #[error("source {source_id}: {field} must be a non-empty unit string")]
    InvalidUnits { source_id: u32, field: &'static str },

    /// Wavelength and flux columns of one source disagree in length.
    #[error("source {source_id}: {wavelengths} wavelengths vs {fluxes} fluxes")]
    MismatchedColumns {
        source_id: u32,
        wavelengths: usize,
        fluxes: usize,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("malformed catalog file: {0}")]
    Format(#[from] serde_json::Error),
}

/// Flux versus wavelength for one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSpectrum {
    pub wavelengths: Vec<f64>,
    /// Unit string for the wavelength column (e.g. "um").
    pub wavelength_units: String,
    pub fluxes: Vec<f64>,
    /// Unit string for the flux column (e.g. "flam").
    pub flux_units: String,
}

/// Catalog of source spectra keyed by source id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpectraCatalog {
    sources: BTreeMap<u32, SourceSpectrum>,
}

impl SpectraCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the spectrum for `source_id`.
    pub fn insert(&mut self, source_id: u32, spectrum: SourceSpectrum) {
        self.sources.insert(source_id, spectrum);
    }

    pub fn get(&self, source_id: u32) -> Option<&SourceSpectrum> {
        self.sources.get(&source_id)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&u32, &SourceSpectrum)> {
        self.sources.iter()
    }

    /// Read a catalog from `path`.
    ///
    /// # Errors
    /// * `CatalogError::Io` - the file cannot be read
    /// * `CatalogError::Format` - the file is not a valid catalog
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Validate and write the catalog to `path`.
    ///
    /// Every source must carry non-blank unit strings and equally long
    /// wavelength/flux columns; the first offender fails the whole save
    /// before anything is written.
    ///
    /// # Errors
    /// * `CatalogError::InvalidUnits` - a blank or missing unit annotation
    /// * `CatalogError::MismatchedColumns` - ragged data columns
    /// * `CatalogError::Io` - the file cannot be written
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), CatalogError> {
        for (&source_id, spectrum) in &self.sources {
            if spectrum.wavelength_units.trim().is_empty() {
                return Err(CatalogError::InvalidUnits {
                    source_id,
                    field: "wavelength_units",
                });
            }
            if spectrum.flux_units.trim().is_empty() {
                return Err(CatalogError::InvalidUnits {
                    source_id,
                    field: "flux_units",
                });
            }
            if spectrum.wavelengths.len() != spectrum.fluxes.len() {
                return Err(CatalogError::MismatchedColumns {
                    source_id,
                    wavelengths: spectrum.wavelengths.len(),
                    fluxes: spectrum.fluxes.len(),
                });
            }
        }

        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_spectrum() -> SourceSpectrum {
        SourceSpectrum {
            wavelengths: vec![0.9, 1.5, 2.4, 5.0],
            wavelength_units: "um".to_string(),
            fluxes: vec![1.0e-17, 1.2e-17, 0.8e-17, 0.5e-17],
            flux_units: "flam".to_string(),
        }
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spectra.json");

        let mut catalog = SpectraCatalog::new();
        catalog.insert(1, sample_spectrum());
        catalog.insert(44, sample_spectrum());
        catalog.save(&path).unwrap();

        let loaded = SpectraCatalog::open(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get(44), Some(&sample_spectrum()));
        assert_eq!(loaded.get(44).unwrap().wavelength_units, "um");
    }

    #[test]
    fn test_save_rejects_blank_units() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spectra.json");

        let mut spectrum = sample_spectrum();
        spectrum.flux_units = "  ".to_string();

        let mut catalog = SpectraCatalog::new();
        catalog.insert(7, spectrum);

        let err = catalog.save(&path).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::InvalidUnits {
                source_id: 7,
                field: "flux_units"
            }
        ));
        assert!(!path.exists(), "rejected save must not create the file");
    }

    #[test]
    fn test_save_rejects_ragged_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spectra.json");

        let mut spectrum = sample_spectrum();
        spectrum.fluxes.pop();

        let mut catalog = SpectraCatalog::new();
        catalog.insert(3, spectrum);

        assert!(matches!(
            catalog.save(&path).unwrap_err(),
            CatalogError::MismatchedColumns { source_id: 3, .. }
        ));
    }

    #[test]
    fn test_open_missing_file() {
        let err = SpectraCatalog::open("/nonexistent/spectra.json").unwrap_err();
        assert!(matches!(err, CatalogError::Io(_)));
    }

    #[test]
    fn test_open_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            SpectraCatalog::open(&path).unwrap_err(),
            CatalogError::Format(_)
        ));
    }
}
