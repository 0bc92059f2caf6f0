//! Doctor and hospital catalogs.
//!
//! Read-only configuration. Entries come from an operator-supplied JSON file
//! when one is configured, otherwise from the embedded defaults. Listing
//! order on the pages is the literal order of the entries, never sorted.

use crate::error::AppResult;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub name: String,
    pub specialty: String,
    pub description: String,
    /// Asset path under /static, opaque to the core.
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hospital {
    pub name: String,
    pub available: bool,
    pub address: String,
    pub phone: String,
    pub beds: u32,
    pub specialties: Vec<String>,
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub doctors: Vec<Doctor>,
    pub hospitals: Vec<Hospital>,
}

/// Default catalog data. Same shape as an operator-supplied catalog file.
const DEFAULT_CATALOG: &str = r#"{
    "doctors": [
        {
            "name": "Dr. AK Verma",
            "specialty": "Cardiologist",
            "description": "Specialist in heart-related issues with 10+ years of experience.",
            "image": "img/doctor-verma.svg"
        },
        {
            "name": "Dr. Kabir Singh",
            "specialty": "Dermatologist",
            "description": "Expert in skin care and treatments with 8+ years of experience.",
            "image": "img/doctor-singh.svg"
        },
        {
            "name": "Dr. Ashi",
            "specialty": "Surgeon",
            "description": "Specialist in surgical procedures with 8+ years of experience.",
            "image": "img/doctor-ashi.svg"
        }
    ],
    "hospitals": [
        {
            "name": "VERMA Hospital",
            "available": true,
            "address": "Jankpuri West",
            "phone": "7701815002",
            "beds": 25,
            "specialties": ["Cardiology", "General Medicine", "Pediatrics"],
            "image": "img/hospital-verma.svg"
        },
        {
            "name": "Mata Rukmani Devi Hospital",
            "available": false,
            "address": "Dwarka Mor",
            "phone": "8708464668",
            "beds": 50,
            "specialties": ["Orthopedics", "Neurology", "Oncology"],
            "image": "img/hospital-rukmani.svg"
        },
        {
            "name": "Yadav Clinic",
            "available": true,
            "address": "Uttam Nagar",
            "phone": "7668451843",
            "beds": 15,
            "specialties": ["General Practice", "Dermatology", "ENT"],
            "image": "img/hospital-yadav.svg"
        }
    ]
}"#;

static EMBEDDED: Lazy<Catalog> = Lazy::new(|| {
    // Literal above, pinned by test_embedded_catalog_parses.
    serde_json::from_str(DEFAULT_CATALOG).expect("embedded catalog is valid JSON")
});

impl Catalog {
    /// Load the catalog from `path`, or fall back to the embedded defaults.
    pub fn load(path: Option<&Path>) -> AppResult<Catalog> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                let catalog: Catalog = serde_json::from_str(&raw)?;
                log::info!(
                    "[CATALOG] loaded {} doctors / {} hospitals from {:?}",
                    catalog.doctors.len(),
                    catalog.hospitals.len(),
                    path
                );
                Ok(catalog)
            }
            None => Ok(EMBEDDED.clone()),
        }
    }

    pub fn doctor(&self, name: &str) -> Option<&Doctor> {
        self.doctors.iter().find(|d| d.name == name)
    }

    pub fn hospital(&self, name: &str) -> Option<&Hospital> {
        self.hospitals.iter().find(|h| h.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_catalog_parses() {
        let catalog = Catalog::load(None).unwrap();
        assert_eq!(catalog.doctors.len(), 3);
        assert_eq!(catalog.hospitals.len(), 3);
        // Literal order is the display order.
        assert_eq!(catalog.doctors[0].name, "Dr. AK Verma");
        assert_eq!(catalog.hospitals[1].name, "Mata Rukmani Devi Hospital");
        assert!(!catalog.hospitals[1].available);
    }

    #[test]
    fn test_lookup_by_name() {
        let catalog = Catalog::load(None).unwrap();
        assert_eq!(catalog.doctor("Dr. Ashi").unwrap().specialty, "Surgeon");
        assert!(catalog.doctor("Dr. Nobody").is_none());
        assert_eq!(catalog.hospital("Yadav Clinic").unwrap().beds, 15);
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(
            &path,
            r#"{"doctors": [{"name": "Dr. X", "specialty": "GP", "description": "", "image": "img/x.svg"}], "hospitals": []}"#,
        )
        .unwrap();

        let catalog = Catalog::load(Some(&path)).unwrap();
        assert_eq!(catalog.doctors.len(), 1);
        assert!(catalog.hospitals.is_empty());
    }

    #[test]
    fn test_load_from_bad_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(Catalog::load(Some(&path)).is_err());
    }
}
