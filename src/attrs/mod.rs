//! Attribute registry for the street network graph.
//!
//! Every node and edge attribute the pipeline knows about is listed here as
//! an enum variant carrying a semantic name (used in code and extracted
//! attribute tables), a compact wire key (used as the attribute name in
//! exported GraphML, to keep exchange files small) and a value kind that
//! selects the wire codec. The catalogs are closed: the codec silently
//! carries nothing that is not declared below.

pub mod literal;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use geo_types::Geometry;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry;
use crate::noise::NoiseMap;

/// Wire literal meaning "value absent".
pub const NULL_LITERAL: &str = "None";

/// Wire representation selected by each attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Str,
    Int,
    Float,
    Bool,
    Geom,
    NoiseMap,
    CountMap,
    IntPair,
}

macro_rules! attr_catalog {
    ($(#[$doc:meta])* $name:ident {
        $($variant:ident => ($sem:literal, $wire:literal, $kind:ident)),+ $(,)?
    }) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every attribute of the catalog, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Descriptive attribute name, used in extracted records.
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $sem),+
                }
            }

            /// Compact attribute name used in the exchange format.
            pub fn wire_key(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }

            /// Wire codec for the attribute's values.
            pub fn kind(self) -> ValueKind {
                match self {
                    $(Self::$variant => ValueKind::$kind),+
                }
            }

            /// Inverse lookup from a wire key; `None` means the key is not
            /// recognized by this version of the registry.
            pub fn from_wire_key(key: &str) -> Option<Self> {
                match key {
                    $($wire => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

attr_catalog! {
    /// Node attribute catalog.
    NodeAttr {
        IdIg => ("id_ig", "ii", Int),
        IdOtp => ("id_otp", "io", Str),
        NameOtp => ("name_otp", "no", Str),
        Geometry => ("geometry", "geom", Geom),
        GeomWgs => ("geom_wgs", "geom_wgs", Geom),
        TraversableWalking => ("traversable_walking", "b_tw", Bool),
        TraversableBiking => ("traversable_biking", "b_tb", Bool),
        TrafficLight => ("traffic_light", "tl", Bool),
    }
}

attr_catalog! {
    /// Edge attribute catalog.
    EdgeAttr {
        IdIg => ("id_ig", "ii", Int),
        IdOtp => ("id_otp", "io", Str),
        // shared by the edge pair of a two-way street
        IdWay => ("id_way", "iw", Int),
        // source & target node ids as a pair
        Uv => ("uv", "uv", IntPair),
        NameOtp => ("name_otp", "no", Str),
        Geometry => ("geometry", "geom", Geom),
        GeomWgs => ("geom_wgs", "geom_wgs", Geom),
        Length => ("length", "l", Float),
        BikeTimeCost => ("bike_time_cost", "c_bt", Float),
        BikeSafetyCost => ("bike_safety_cost", "c_bs", Float),
        EdgeClass => ("edge_class", "ec", Str),
        StreetClass => ("street_class", "sc", Str),
        IsStairs => ("is_stairs", "b_st", Bool),
        IsNoThruTraffic => ("is_no_thru_traffic", "b_ntt", Bool),
        AllowsWalking => ("allows_walking", "b_aw", Bool),
        AllowsBiking => ("allows_biking", "b_ab", Bool),
        TraversableWalking => ("traversable_walking", "b_tw", Bool),
        TraversableBiking => ("traversable_biking", "b_tb", Bool),
        BikeSafetyFactor => ("bike_safety_factor", "bsf", Float),
        // nodata = None, no noises = {}
        Noises => ("noises", "n", NoiseMap),
        // dominant source; nodata = None, no noises = ''
        NoiseSource => ("noise_source", "ns", Str),
        NoiseSources => ("noise_sources", "nss", CountMap),
        // air quality index
        Aqi => ("aqi", "aqi", Float),
        // mean green view index from street-level imagery
        GviGsv => ("gvi_gsv", "g_gsv", Float),
        // share of low (<2m) vegetation in 30m buffer around edge
        GviLowVegShare => ("gvi_low_veg_share", "g_lv", Float),
        // share of high (>2m) vegetation in 30m buffer around edge
        GviHighVegShare => ("gvi_high_veg_share", "g_hv", Float),
        GviCombGsvVeg => ("gvi_comb_gsv_veg", "g_gsv_v", Float),
        GviCombGsvHighVeg => ("gvi_comb_gsv_high_veg", "g_gsv_hv", Float),
        // combined GVI to use in routing (one of the above two)
        Gvi => ("gvi", "g", Float),
    }
}

/// Noise source categories of the exposure data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseSource {
    Road,
    Train,
    Metro,
    Tram,
}

impl NoiseSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Road => "road",
            Self::Train => "train",
            Self::Metro => "metro",
            Self::Tram => "tram",
        }
    }
}

impl fmt::Display for NoiseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoiseSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "road" => Ok(Self::Road),
            "train" => Ok(Self::Train),
            "metro" => Ok(Self::Metro),
            "tram" => Ok(Self::Tram),
            _ => Err(Error::Literal(s.to_string())),
        }
    }
}

/// A typed attribute value.
///
/// `Null` is the decoded form of the wire literal `None` and is distinct
/// from the attribute being absent altogether. `Raw` holds the original
/// wire text of a column whose conversion failed; typed accessors treat it
/// as missing.
#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
    Null,
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Geom(Geometry<f64>),
    Noises(NoiseMap),
    Counts(BTreeMap<String, i64>),
    Pair(i64, i64),
    Raw(String),
}

impl AttrValue {
    /// Decode a wire string according to the attribute's value kind.
    pub fn decode(kind: ValueKind, wire: &str) -> Result<AttrValue> {
        // geometry and boolean columns never carry the null sentinel
        let nullable = !matches!(kind, ValueKind::Geom | ValueKind::Bool);
        if nullable && wire == NULL_LITERAL {
            return Ok(AttrValue::Null);
        }

        match kind {
            ValueKind::Str => Ok(AttrValue::Str(wire.to_string())),
            ValueKind::Int => wire
                .parse()
                .map(AttrValue::Int)
                .map_err(|_| Error::Literal(wire.to_string())),
            ValueKind::Float => wire
                .parse()
                .map(AttrValue::Float)
                .map_err(|_| Error::Literal(wire.to_string())),
            ValueKind::Bool => {
                // 1-character fast path; anything longer is a literal token
                if wire.len() == 1 {
                    Ok(AttrValue::Bool(wire == "1"))
                } else {
                    literal::parse_bool(wire).map(AttrValue::Bool)
                }
            }
            ValueKind::Geom => geometry::parse_wkt(wire).map(AttrValue::Geom),
            ValueKind::NoiseMap => literal::parse_db_map(wire).map(AttrValue::Noises),
            ValueKind::CountMap => literal::parse_count_map(wire).map(AttrValue::Counts),
            ValueKind::IntPair => literal::parse_int_pair(wire).map(|(a, b)| AttrValue::Pair(a, b)),
        }
    }

    /// Encode the value as its wire string. Booleans become `1`/`0` to keep
    /// exchange files small; absent values become the null sentinel; raw
    /// values pass through unchanged.
    pub fn encode(&self) -> String {
        match self {
            AttrValue::Null => NULL_LITERAL.to_string(),
            AttrValue::Str(s) => s.clone(),
            AttrValue::Int(i) => i.to_string(),
            AttrValue::Float(v) => literal::format_float(*v),
            AttrValue::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            AttrValue::Geom(g) => geometry::wkt_string(g),
            AttrValue::Noises(m) => literal::format_db_map(m),
            AttrValue::Counts(m) => literal::format_count_map(m),
            AttrValue::Pair(a, b) => format!("({}, {})", a, b),
            AttrValue::Raw(s) => s.clone(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttrValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_geom(&self) -> Option<&Geometry<f64>> {
        match self {
            AttrValue::Geom(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_noises(&self) -> Option<&NoiseMap> {
        match self {
            AttrValue::Noises(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_counts(&self) -> Option<&BTreeMap<String, i64>> {
        match self {
            AttrValue::Counts(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_pair(&self) -> Option<(i64, i64)> {
        match self {
            AttrValue::Pair(a, b) => Some((*a, *b)),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }
}
