//! Interface to the electron kinetics collaborator (Boltzmann solver or equivalent).
//! The chemistry only consumes the electron-impact rate coefficients it produces.
use crate::Chemistry::chem_errors::ChemistryError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// rate coefficient of one electron collision, `value = [inelastic, superelastic]` in m^3/s
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionRateCoeff {
    pub id: usize,
    pub value: [f64; 2],
    /// eV
    pub threshold: f64,
    pub description: String,
}

pub trait ElectronKinetics {
    /// collisions solved self-consistently with the EEDF
    fn rate_coeff_all(&self) -> &[CollisionRateCoeff];
    /// extra collisions evaluated with the converged EEDF only
    fn rate_coeff_extra(&self) -> &[CollisionRateCoeff];

    /// looks a collision up by its description in both lists
    fn find_rate_coeff(&self, description: &str) -> Option<&CollisionRateCoeff> {
        self.rate_coeff_all()
            .iter()
            .chain(self.rate_coeff_extra().iter())
            .find(|c| c.description == description)
    }
}

/// plain container for results handed over by an electron kinetics solver
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectronKineticsSnapshot {
    #[serde(default)]
    pub rate_coeff_all: Vec<CollisionRateCoeff>,
    #[serde(default)]
    pub rate_coeff_extra: Vec<CollisionRateCoeff>,
}

impl ElectronKineticsSnapshot {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ChemistryError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl ElectronKinetics for ElectronKineticsSnapshot {
    fn rate_coeff_all(&self) -> &[CollisionRateCoeff] {
        &self.rate_coeff_all
    }

    fn rate_coeff_extra(&self) -> &[CollisionRateCoeff] {
        &self.rate_coeff_extra
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_rate_coeff_in_both_lists() {
        let snapshot = ElectronKineticsSnapshot {
            rate_coeff_all: vec![CollisionRateCoeff {
                id: 0,
                value: [1e-16, 2e-16],
                threshold: 0.29,
                description: "e + N2(X,v=0) <-> e + N2(X,v=1)".to_string(),
            }],
            rate_coeff_extra: vec![CollisionRateCoeff {
                id: 1,
                value: [3e-17, 0.0],
                threshold: 15.6,
                description: "e + N2(X) -> 2e + N2(+,X)".to_string(),
            }],
        };
        assert_eq!(
            snapshot
                .find_rate_coeff("e + N2(X) -> 2e + N2(+,X)")
                .map(|c| c.id),
            Some(1)
        );
        assert!(snapshot.find_rate_coeff("e + O2(X) -> e + O2(a)").is_none());
    }

    #[test]
    fn test_snapshot_from_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"{"rateCoeffAll": [{"id": 4, "value": [1e-15, 5e-16], "threshold": 0.29, "description": "e + N2(X,v=0) <-> e + N2(X,v=1)"}]}"#,
        )
        .unwrap();
        let snapshot = ElectronKineticsSnapshot::from_file(file.path()).unwrap();
        assert_eq!(snapshot.rate_coeff_all[0].id, 4);
        assert!(snapshot.rate_coeff_extra.is_empty());
        assert!(ElectronKineticsSnapshot::from_file("no/such/file.json").is_err());
    }
}
