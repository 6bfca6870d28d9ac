use nalgebra::Vector3;

use crate::prelude::{Constellation, SV};
use crate::record::{is_missing, Record};

/// Demultiplexed satellite
#[derive(Debug, Clone)]
pub struct Satellite {
    sv: SV,
    /// GLONASS frequency slot
    slot: Option<i8>,
    observations: Record,
    ephemeris: Option<Record>,
}

impl Satellite {
    pub fn new(sv: SV, slot: Option<i8>, observations: Record, ephemeris: Option<Record>) -> Self {
        Self {
            sv,
            slot,
            observations,
            ephemeris,
        }
    }
    pub fn sv(&self) -> SV {
        self.sv
    }
    /// "G01"
    pub fn name(&self) -> String {
        self.sv.to_string()
    }
    pub fn constellation(&self) -> Constellation {
        self.sv.constellation
    }
    /// Satellite number
    pub fn number(&self) -> u8 {
        self.sv.prn
    }
    /// GLONASS frequency slot, None when unknown or not GLONASS
    pub fn slot(&self) -> Option<i8> {
        self.slot
    }
    /// Frequency slot for GLONASS, satellite number otherwise
    pub fn prn(&self) -> Option<i32> {
        if self.sv.constellation == Constellation::Glonass {
            self.slot.map(|slot| slot as i32)
        } else {
            Some(self.sv.prn as i32)
        }
    }
    /// "R07(+1)", "R07(?)" when the slot is unknown, "G01" for other constellations
    pub fn display_name(&self) -> String {
        if self.sv.constellation != Constellation::Glonass {
            return self.name();
        }
        match self.slot {
            Some(slot) => format!("{}({:+})", self.sv, slot),
            None => format!("{}(?)", self.sv),
        }
    }
    pub fn observations(&self) -> &Record {
        &self.observations
    }
    pub fn ephemeris(&self) -> Option<&Record> {
        self.ephemeris.as_ref()
    }
    /// Series for this observable, or ephemeris field ("x", "y", "z", "dt")
    pub fn get(&self, label: &str) -> Option<&[f64]> {
        self.observations
            .get(label)
            .or_else(|| self.ephemeris.as_ref()?.get(label))
    }
    /// Position (km) at this grid index.
    /// None when unknown or when any coordinate is missing.
    pub fn position(&self, index: usize) -> Option<Vector3<f64>> {
        let eph = self.ephemeris.as_ref()?;
        let x = *eph.get("x")?.get(index)?;
        let y = *eph.get("y")?.get(index)?;
        let z = *eph.get("z")?.get(index)?;
        if is_missing(x) || is_missing(y) || is_missing(z) {
            None
        } else {
            Some(Vector3::new(x, y, z))
        }
    }
    /// Clock offset (us) at this grid index
    pub fn clock(&self, index: usize) -> Option<f64> {
        let dt = *self.ephemeris.as_ref()?.get("dt")?.get(index)?;
        if is_missing(dt) {
            None
        } else {
            Some(dt)
        }
    }
    /// Number of samples per series
    pub fn len(&self) -> usize {
        self.observations.len()
    }
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
    pub(crate) fn retain_mask(&mut self, mask: &[bool]) {
        self.observations.retain_mask(mask);
        if let Some(eph) = self.ephemeris.as_mut() {
            eph.retain_mask(mask);
        }
    }
}

#[cfg(test)]
mod test {
    use super::Satellite;
    use crate::prelude::SV;
    use crate::record::{Record, MISSING};
    use nalgebra::Vector3;
    use std::str::FromStr;

    fn labels(codes: &[&str]) -> Vec<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn display_names() {
        let obs = Record::new(&labels(&["C1C"]), 0);
        for (sv, slot, name, prn) in [
            ("R07", Some(1), "R07(+1)", Some(1)),
            ("R08", Some(-4), "R08(-4)", Some(-4)),
            ("R09", Some(0), "R09(+0)", Some(0)),
            ("R10", None, "R10(?)", None),
            ("G05", None, "G05", Some(5)),
        ] {
            let sat = Satellite::new(SV::from_str(sv).unwrap(), slot, obs.clone(), None);
            assert_eq!(sat.display_name(), name);
            assert_eq!(sat.prn(), prn);
            assert_eq!(sat.name(), sv);
        }
    }

    #[test]
    fn field_access() {
        let mut obs = Record::new(&labels(&["C1C", "S1C"]), 2);
        obs.push_row(&[1.0, 40.0]);
        obs.push_row(&[2.0, 41.0]);
        let mut eph = Record::new(&labels(&["x", "y", "z", "dt"]), 2);
        eph.push_row(&[1.0, 2.0, 3.0, 4.0]);
        eph.push_row(&[1.0, MISSING, 3.0, 4.0]);

        let sat = Satellite::new(SV::from_str("G01").unwrap(), None, obs, Some(eph));
        assert_eq!(sat.len(), 2);
        assert_eq!(sat.get("S1C"), Some(&[40.0, 41.0][..]));
        assert_eq!(sat.get("dt"), Some(&[4.0, 4.0][..]));
        assert!(sat.get("L1C").is_none());
        assert_eq!(sat.position(0), Some(Vector3::new(1.0, 2.0, 3.0)));
        assert_eq!(sat.position(1), None);
        assert_eq!(sat.position(2), None);
        assert_eq!(sat.clock(1), Some(4.0));
    }
}
