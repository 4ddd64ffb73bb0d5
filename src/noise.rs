//! Noise exposure cost model.
//!
//! Turns per-edge noise exposures (dB level -> contaminated length along
//! the edge) into routing costs for quiet path optimization, plus the
//! aggregation helpers used when comparing exposures between paths.
//!
//! The tri-state of an edge's exposure map matters throughout: `None` means
//! the edge lies outside noise data coverage (penalized heavily),
//! an empty map means the edge was measured and is quiet (zero noise cost),
//! and a populated map is priced through the dB cost table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Noise exposures of one edge: dB level -> contaminated length, in the
/// same unit as the edge length. Ordered by dB, so a gap-filled 40 dB
/// entry sorts first.
pub type NoiseMap = BTreeMap<i32, f64>;

/// dB levels covered by the cost table.
const DB_MIN: i32 = 40;
const DB_MAX: i32 = 79;

/// Tolerance (in length units) for the exposure sum vs. edge length check.
const EXPOSURE_TOLERANCE: f64 = 0.5;

/// Scoring function used to generate the dB cost table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CostVersion {
    /// Linear scale over 45..75 dB
    V2,
    /// Logarithmic loudness: every 10 dB increase doubles the cost
    V3,
}

impl CostVersion {
    /// Resolve a numeric version identifier; only 2 and 3 exist.
    pub fn from_number(version: u8) -> Result<Self> {
        match version {
            2 => Ok(Self::V2),
            3 => Ok(Self::V3),
            other => Err(Error::UnknownCostVersion(other)),
        }
    }
}

fn db_cost_v2(db: i32) -> f64 {
    if db <= 44 {
        return 0.0;
    }
    round_to((db - 40) as f64 / (75 - 40) as f64, 3)
}

fn db_cost_v3(db: i32) -> f64 {
    if db <= 44 {
        return 0.0;
    }
    round_to(10f64.powf(0.3 * db as f64 / 10.0) / 100.0, 3)
}

/// dB-specific noise cost coefficients over [40, 79], built once at process
/// startup and shared read-only. Alternative noise costs are produced by
/// multiplying the base coefficient with different noise sensitivities.
#[derive(Clone, Debug, PartialEq)]
pub struct DbCostTable {
    costs: BTreeMap<i32, f64>,
}

impl DbCostTable {
    pub fn new(version: CostVersion) -> Self {
        let cost = match version {
            CostVersion::V2 => db_cost_v2,
            CostVersion::V3 => db_cost_v3,
        };
        Self {
            costs: (DB_MIN..=DB_MAX).map(|db| (db, cost(db))).collect(),
        }
    }

    /// Build from a numeric version identifier (invalid-argument failure
    /// for anything but 2 or 3).
    pub fn from_version(version: u8) -> Result<Self> {
        Ok(Self::new(CostVersion::from_number(version)?))
    }

    /// Cost coefficient for an exact dB level. Levels outside [40, 79] are
    /// a hard failure; the table does not clamp.
    pub fn get(&self, db: i32) -> Result<f64> {
        self.costs.get(&db).copied().ok_or(Error::DbOutOfRange(db))
    }

    pub fn costs(&self) -> &BTreeMap<i32, f64> {
        &self.costs
    }
}

/// Lower bounds of the six pre-defined dB ranges used for reporting.
///
/// Coarser than the per-dB cost table: levels of 70 dB and above collapse
/// into `Db70`, levels below 50 dB into `Db40`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NoiseRange {
    Db40,
    Db50,
    Db55,
    Db60,
    Db65,
    Db70,
}

impl NoiseRange {
    pub const ALL: [NoiseRange; 6] = [
        NoiseRange::Db40,
        NoiseRange::Db50,
        NoiseRange::Db55,
        NoiseRange::Db60,
        NoiseRange::Db65,
        NoiseRange::Db70,
    ];

    /// Bucket a raw dB level into its reporting range.
    pub fn from_db(db: f64) -> Self {
        if db >= 70.0 {
            Self::Db70
        } else if db >= 65.0 {
            Self::Db65
        } else if db >= 60.0 {
            Self::Db60
        } else if db >= 55.0 {
            Self::Db55
        } else if db >= 50.0 {
            Self::Db50
        } else {
            Self::Db40
        }
    }

    pub fn lower_bound(self) -> i32 {
        match self {
            Self::Db40 => 40,
            Self::Db50 => 50,
            Self::Db55 => 55,
            Self::Db60 => 60,
            Self::Db65 => 65,
            Self::Db70 => 70,
        }
    }
}

impl std::fmt::Display for NoiseRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.lower_bound())
    }
}

/// Noise cost coefficient of one edge: the length-weighted mean of the dB
/// cost coefficients over the exposure map. Zero for an empty map or a
/// zero total exposed length.
pub fn noise_cost_coeff(noises: &NoiseMap, db_costs: &DbCostTable) -> Result<f64> {
    if noises.is_empty() {
        return Ok(0.0);
    }
    let mut weighted = 0.0;
    let mut total_length = 0.0;
    for (&db, &length) in noises {
        weighted += db_costs.get(db)? * length;
        total_length += length;
    }
    if total_length == 0.0 {
        Ok(0.0)
    } else {
        Ok(round_to(weighted / total_length, 3))
    }
}

/// Composite edge cost: base cost plus sensitivity-scaled noise cost.
///
/// The base cost is `bike_time_cost` when given and non-zero, otherwise the
/// edge length. Edges outside noise data coverage (`noises` = `None`) get
/// `base + base * 100 * sensitivity`, a strong penalty modeling the risk of
/// unknown exposure. A populated map must sum to the edge length within
/// 0.5 length units or the computation fails.
pub fn noise_adjusted_edge_cost(
    sensitivity: f64,
    db_costs: &DbCostTable,
    noises: Option<&NoiseMap>,
    length: f64,
    bike_time_cost: Option<f64>,
) -> Result<f64> {
    if let Some(noises) = noises {
        if !noises.is_empty() {
            let exposed: f64 = noises.values().sum();
            if (length - exposed).abs() > EXPOSURE_TOLERANCE {
                return Err(Error::ExposureLengthMismatch { length, exposed });
            }
        }
    }

    let base_cost = match bike_time_cost {
        Some(cost) if cost != 0.0 => cost,
        _ => length,
    };

    match noises {
        None => Ok(round_to(base_cost + base_cost * 100.0 * sensitivity, 2)),
        Some(noises) => {
            let coeff = noise_cost_coeff(noises, db_costs)?;
            Ok(round_to(base_cost + base_cost * coeff * sensitivity, 2))
        }
    }
}

/// Fill the unmeasured remainder of an edge as quiet (40 dB) exposure.
///
/// Returns the map unchanged when there is no data (`None`), the length is
/// zero, or a 40 dB entry already exists; otherwise the remainder
/// `length - total exposed` (rounded to 2 decimals) is inserted under 40,
/// where it orders first.
pub fn add_db_40_exposure(noises: Option<&NoiseMap>, length: f64) -> Option<NoiseMap> {
    let noises = noises?;
    if length == 0.0 || noises.contains_key(&40) {
        return Some(noises.clone());
    }

    let total: f64 = noises.values().sum();
    let db_40_len = round_to(length - total, 2);

    let mut filled = noises.clone();
    if db_40_len != 0.0 {
        filled.insert(40, db_40_len);
    }
    Some(filled)
}

/// Aggregate exposures into the six reporting ranges (lengths rounded to
/// 3 decimals).
pub fn noise_range_exps(noises: &NoiseMap) -> BTreeMap<NoiseRange, f64> {
    let mut ranges: BTreeMap<NoiseRange, f64> = BTreeMap::new();
    for (&db, &length) in noises {
        *ranges.entry(NoiseRange::from_db(db as f64)).or_insert(0.0) += length;
    }
    for length in ranges.values_mut() {
        *length = round_to(*length, 3);
    }
    ranges
}

/// Shares (%) of total length exposed to each reporting range.
pub fn noise_range_pcts(
    range_exps: &BTreeMap<NoiseRange, f64>,
    length: f64,
) -> BTreeMap<NoiseRange, f64> {
    range_exps
        .iter()
        .map(|(&range, &range_length)| (range, round_to(range_length * 100.0 / length, 3)))
        .collect()
}

/// Sum a sequence of exposure maps (e.g. over the edges of a path) into one.
pub fn aggregate_exposures(exposures: &[NoiseMap]) -> NoiseMap {
    let mut total = NoiseMap::new();
    for noises in exposures {
        for (&db, &length) in noises {
            *total.entry(db).or_insert(0.0) += length;
        }
    }
    for length in total.values_mut() {
        *length = round_to(*length, 3);
    }
    total
}

/// Total length exposed to any noise level.
pub fn total_noises_len(noises: &NoiseMap) -> f64 {
    if noises.is_empty() {
        0.0
    } else {
        round_to(noises.values().sum(), 3)
    }
}

/// Mean noise level weighted by contaminated distances. Each 5 dB range is
/// represented by its lower bound + 2.5 dB.
pub fn mean_noise_level(noises: &NoiseMap, length: f64) -> f64 {
    let sum_db: f64 = noises
        .iter()
        .map(|(&db, &exp_length)| (db as f64 + 2.5) * exp_length)
        .sum();
    round_to(sum_db / length, 1)
}

/// Noise exposure index: the raw (not length-normalized) cost-weighted sum
/// of exposures, for comparing total exposure between paths.
pub fn noise_exposure_index(noises: &NoiseMap, db_costs: &DbCostTable) -> Result<f64> {
    if noises.is_empty() {
        return Ok(0.0);
    }
    let mut sum = 0.0;
    for (&db, &length) in noises {
        sum += db_costs.get(db)? * length;
    }
    Ok(round_to(sum, 2))
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noises(pairs: &[(i32, f64)]) -> NoiseMap {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_cost_table_versions() {
        let v2 = DbCostTable::new(CostVersion::V2);
        let v3 = DbCostTable::new(CostVersion::V3);

        assert_eq!(v2.get(44).unwrap(), 0.0);
        assert_eq!(v3.get(44).unwrap(), 0.0);
        assert_eq!(v2.get(45).unwrap(), 0.143);
        assert_eq!(v2.get(75).unwrap(), 1.0);
        assert_eq!(v3.get(60).unwrap(), 0.631);

        assert_eq!(v2.costs().len(), 40);
        assert_eq!(v3.costs().len(), 40);
    }

    #[test]
    fn test_cost_tables_non_decreasing() {
        for version in [CostVersion::V2, CostVersion::V3] {
            let table = DbCostTable::new(version);
            for db in 45..=79 {
                assert!(
                    table.get(db).unwrap() >= table.get(db - 1).unwrap(),
                    "{:?} decreases at {} dB",
                    version,
                    db
                );
            }
        }
    }

    #[test]
    fn test_invalid_version() {
        assert!(matches!(
            DbCostTable::from_version(4),
            Err(Error::UnknownCostVersion(4))
        ));
        assert!(DbCostTable::from_version(2).is_ok());
        assert!(DbCostTable::from_version(3).is_ok());
    }

    #[test]
    fn test_db_out_of_range() {
        let table = DbCostTable::new(CostVersion::V3);
        assert!(matches!(table.get(39), Err(Error::DbOutOfRange(39))));
        assert!(matches!(table.get(80), Err(Error::DbOutOfRange(80))));
        assert!(table.get(40).is_ok());
        assert!(table.get(79).is_ok());
    }

    #[test]
    fn test_noise_range_boundaries() {
        assert_eq!(NoiseRange::from_db(69.0), NoiseRange::Db65);
        assert_eq!(NoiseRange::from_db(70.0), NoiseRange::Db70);
        assert_eq!(NoiseRange::from_db(49.0), NoiseRange::Db40);
        assert_eq!(NoiseRange::from_db(50.0), NoiseRange::Db50);
        // extremes collapse into the outer ranges
        assert_eq!(NoiseRange::from_db(95.0), NoiseRange::Db70);
        assert_eq!(NoiseRange::from_db(10.0), NoiseRange::Db40);

        let bounds: Vec<i32> = NoiseRange::ALL.iter().map(|r| r.lower_bound()).collect();
        assert_eq!(bounds, vec![40, 50, 55, 60, 65, 70]);
        assert_eq!(NoiseRange::Db55.to_string(), "55");
    }

    #[test]
    fn test_noise_cost_coeff() {
        let table = DbCostTable::new(CostVersion::V3);
        assert_eq!(noise_cost_coeff(&NoiseMap::new(), &table).unwrap(), 0.0);

        // (table[40]*5 + table[60]*15) / 20 = (0*5 + 0.631*15) / 20
        let map = noises(&[(40, 5.0), (60, 15.0)]);
        assert_eq!(noise_cost_coeff(&map, &table).unwrap(), 0.473);
    }

    #[test]
    fn test_edge_cost_scenario_v3() {
        let table = DbCostTable::new(CostVersion::V3);
        let map = noises(&[(40, 5.0), (60, 15.0)]);
        let cost = noise_adjusted_edge_cost(0.5, &table, Some(&map), 20.0, None).unwrap();
        // base 20, coeff 0.473: 20 + 20 * 0.473 * 0.5
        assert_eq!(cost, 24.73);
    }

    #[test]
    fn test_edge_cost_no_data_penalty() {
        let table = DbCostTable::new(CostVersion::V3);
        let cost = noise_adjusted_edge_cost(0.1, &table, None, 100.0, None).unwrap();
        assert_eq!(cost, 1100.0);
    }

    #[test]
    fn test_edge_cost_exposure_mismatch() {
        let table = DbCostTable::new(CostVersion::V3);
        let map = noises(&[(50, 10.0)]);
        let result = noise_adjusted_edge_cost(0.5, &table, Some(&map), 20.0, None);
        assert!(matches!(
            result,
            Err(Error::ExposureLengthMismatch { length, exposed })
                if length == 20.0 && exposed == 10.0
        ));
        // within tolerance passes
        assert!(noise_adjusted_edge_cost(0.5, &table, Some(&map), 10.4, None).is_ok());
    }

    #[test]
    fn test_edge_cost_bike_time_base() {
        let table = DbCostTable::new(CostVersion::V3);
        // override used when non-zero
        let cost = noise_adjusted_edge_cost(0.1, &table, None, 100.0, Some(50.0)).unwrap();
        assert_eq!(cost, 550.0);
        // zero override falls back to length
        let cost = noise_adjusted_edge_cost(0.1, &table, None, 100.0, Some(0.0)).unwrap();
        assert_eq!(cost, 1100.0);
    }

    #[test]
    fn test_edge_cost_quiet_edge() {
        let table = DbCostTable::new(CostVersion::V3);
        // measured, no noise: plain base cost
        let cost = noise_adjusted_edge_cost(0.9, &table, Some(&NoiseMap::new()), 35.5, None).unwrap();
        assert_eq!(cost, 35.5);
    }

    #[test]
    fn test_add_db_40_exposure() {
        let filled = add_db_40_exposure(Some(&noises(&[(50, 8.0)])), 10.0).unwrap();
        assert_eq!(filled, noises(&[(40, 2.0), (50, 8.0)]));
        // 40-entry orders first
        assert_eq!(filled.keys().next(), Some(&40));

        // no data stays no data
        assert_eq!(add_db_40_exposure(None, 10.0), None);
        // zero length unchanged
        let map = noises(&[(50, 8.0)]);
        assert_eq!(add_db_40_exposure(Some(&map), 0.0).unwrap(), map);
        // existing 40 entry unchanged
        let map = noises(&[(40, 1.0), (50, 8.0)]);
        assert_eq!(add_db_40_exposure(Some(&map), 10.0).unwrap(), map);
        // fully covered edge gains nothing
        let map = noises(&[(50, 10.0)]);
        assert_eq!(add_db_40_exposure(Some(&map), 10.0).unwrap(), map);
    }

    #[test]
    fn test_noise_range_exps_and_pcts() {
        let map = noises(&[(45, 5.0), (50, 10.0), (52, 5.0), (75, 10.0)]);
        let ranges = noise_range_exps(&map);
        assert_eq!(ranges[&NoiseRange::Db40], 5.0);
        assert_eq!(ranges[&NoiseRange::Db50], 15.0);
        assert_eq!(ranges[&NoiseRange::Db70], 10.0);

        let pcts = noise_range_pcts(&ranges, 30.0);
        assert_eq!(pcts[&NoiseRange::Db40], 16.667);
        assert_eq!(pcts[&NoiseRange::Db50], 50.0);
        assert_eq!(pcts[&NoiseRange::Db70], 33.333);
    }

    #[test]
    fn test_aggregate_exposures() {
        let total = aggregate_exposures(&[
            noises(&[(50, 10.0), (55, 5.0)]),
            noises(&[(50, 2.5), (60, 1.0)]),
        ]);
        assert_eq!(total, noises(&[(50, 12.5), (55, 5.0), (60, 1.0)]));
        assert!(aggregate_exposures(&[]).is_empty());
    }

    #[test]
    fn test_total_noises_len() {
        assert_eq!(total_noises_len(&NoiseMap::new()), 0.0);
        assert_eq!(total_noises_len(&noises(&[(50, 10.0), (55, 4.5)])), 14.5);
    }

    #[test]
    fn test_mean_noise_level() {
        // (52.5 * 10 + 62.5 * 10) / 20 = 57.5
        let map = noises(&[(50, 10.0), (60, 10.0)]);
        assert_eq!(mean_noise_level(&map, 20.0), 57.5);
    }

    #[test]
    fn test_noise_exposure_index() {
        let table = DbCostTable::new(CostVersion::V3);
        assert_eq!(noise_exposure_index(&NoiseMap::new(), &table).unwrap(), 0.0);

        // 0.631 * 15 = 9.465 -> 9.47 (not normalized by length)
        let map = noises(&[(40, 5.0), (60, 15.0)]);
        assert_eq!(noise_exposure_index(&map, &table).unwrap(), 9.47);
    }
}
