//! Typed shot records.
//!
//! A [`ShotRecord`] is what the adapter produces from a raw container and
//! what the merger consumes. Absence is always explicit: a channel that the
//! container did not carry is simply not in the map, and metadata that was
//! not found is `None`.
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PrepError, Result};

// ── Identifiers ────────────────────────────────────────────────────────────

/// Numeric shot (discharge) number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShotId(pub u32);

impl ShotId {
    /// Extract the shot number from a file name such as `JET_99971.mat`
    /// or `no99971.csv`: the last run of ASCII digits in the stem.
    pub fn from_file_name(name: &str) -> Result<Self> {
        let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
        let stem = base.split('.').next().unwrap_or(base);
        let digits: String = stem
            .chars()
            .rev()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit())
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        digits
            .parse()
            .map(ShotId)
            .map_err(|_| PrepError::MalformedRecord(format!("no shot number in {name:?}")))
    }
}

impl fmt::Display for ShotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Known diagnostic channels.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// Soft X-ray, core chord.
    SSXcore,
    /// Plasma current (newer signal name).
    IPLA,
    /// Plasma current (older signal name).
    IP,
    DAO_EDG7,
    DAI_EDG7,
    /// Diamagnetic stored energy.
    WMHD,
    /// Neutron rate.
    RNT,
    /// ECE electron temperature.
    ECE_PF,
}

impl Channel {
    pub const ALL: [Channel; 8] = [
        Channel::SSXcore,
        Channel::IPLA,
        Channel::IP,
        Channel::DAO_EDG7,
        Channel::DAI_EDG7,
        Channel::WMHD,
        Channel::RNT,
        Channel::ECE_PF,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::SSXcore => "SSXcore",
            Channel::IPLA => "IPLA",
            Channel::IP => "IP",
            Channel::DAO_EDG7 => "DAO_EDG7",
            Channel::DAI_EDG7 => "DAI_EDG7",
            Channel::WMHD => "WMHD",
            Channel::RNT => "RNT",
            Channel::ECE_PF => "ECE_PF",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self> {
        Channel::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| PrepError::UnknownChannel(s.to_string()))
    }
}

/// Parse a comma-separated channel list (`"SSXcore,IPLA,RNT"`).
pub fn parse_channel_list(s: &str) -> Result<Vec<Channel>> {
    s.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(Channel::from_str)
        .collect()
}

// ── Series and intervals ───────────────────────────────────────────────────

/// One channel: paired `time` (seconds) and `signal` samples.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelSeries {
    #[serde(with = "nan_as_null")]
    pub signal: Vec<f64>,
    #[serde(with = "nan_as_null")]
    pub time: Vec<f64>,
}

/// JSON has no NaN or infinity: non-finite values are stored as `null`.
mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &[f64], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(v.iter().map(|x| x.is_finite().then_some(*x)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<f64>, D::Error> {
        let v: Vec<Option<f64>> = Vec::deserialize(d)?;
        Ok(v.into_iter().map(|x| x.unwrap_or(f64::NAN)).collect())
    }
}

impl ChannelSeries {
    pub fn new(time: Vec<f64>, signal: Vec<f64>) -> Result<Self> {
        if time.len() != signal.len() {
            return Err(PrepError::LengthMismatch {
                what: "channel time vs signal",
                left: time.len(),
                right: signal.len(),
            });
        }
        Ok(Self { signal, time })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.time.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

/// `(start, end)` pair in seconds. Inclusivity is decided by the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub start: f64,
    pub end: f64,
}

impl Interval {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Build from a flattened 2-element array, as stored in the containers.
    pub fn from_slice(v: &[f64]) -> Option<Self> {
        match v {
            [start, end, ..] => Some(Self::new(*start, *end)),
            _ => None,
        }
    }

    /// Strictly inside: `start < t < end`.
    #[inline]
    pub fn contains_open(&self, t: f64) -> bool {
        self.start < t && t < self.end
    }
}

// ── Shot record ────────────────────────────────────────────────────────────

/// Everything the pipeline knows about one shot.
#[derive(Debug, Clone, PartialEq)]
pub struct ShotRecord {
    pub shot: ShotId,
    pub channels: BTreeMap<Channel, ChannelSeries>,
    /// `disr_ipla_td`; `Some(NaN)` is kept as found and rejected later.
    pub disruption_time: Option<f64>,
    pub ramp_up: Option<Interval>,
    pub flat_top: Option<Interval>,
    pub ramp_down: Option<Interval>,
}

impl ShotRecord {
    pub fn new(shot: ShotId) -> Self {
        Self {
            shot,
            channels: BTreeMap::new(),
            disruption_time: None,
            ramp_up: None,
            flat_top: None,
            ramp_down: None,
        }
    }

    #[inline]
    pub fn channel(&self, ch: Channel) -> Option<&ChannelSeries> {
        self.channels.get(&ch)
    }

    pub fn insert_channel(&mut self, ch: Channel, series: ChannelSeries) {
        self.channels.insert(ch, series);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shot_id_from_file_names() {
        assert_eq!(ShotId::from_file_name("JET_99971.mat").unwrap(), ShotId(99971));
        assert_eq!(ShotId::from_file_name("no94512.csv").unwrap(), ShotId(94512));
        assert_eq!(ShotId::from_file_name("/db/JET_1_87000.h5").unwrap(), ShotId(87000));
        assert!(ShotId::from_file_name("README.txt").is_err());
    }

    #[test]
    fn channel_names_round_trip() {
        for ch in Channel::ALL {
            assert_eq!(ch.as_str().parse::<Channel>().unwrap(), ch);
        }
        assert!("IPLA2".parse::<Channel>().is_err());
    }

    #[test]
    fn channel_list_parsing_skips_blanks() {
        let chans = parse_channel_list("SSXcore, IPLA,,RNT").unwrap();
        assert_eq!(chans, vec![Channel::SSXcore, Channel::IPLA, Channel::RNT]);
    }

    #[test]
    fn series_rejects_unequal_lengths() {
        let err = ChannelSeries::new(vec![0.0, 1.0], vec![1.0]).unwrap_err();
        assert!(matches!(err, PrepError::LengthMismatch { left: 2, right: 1, .. }));
        assert!(ChannelSeries::new(vec![], vec![]).unwrap().is_empty());
    }

    #[test]
    fn series_json_keeps_nan() {
        let s = ChannelSeries::new(vec![0.0, 1.0], vec![f64::NAN, 2.0]).unwrap();
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, r#"{"signal":[null,2.0],"time":[0.0,1.0]}"#);
        let back: ChannelSeries = serde_json::from_str(&json).unwrap();
        assert!(back.signal[0].is_nan());
        assert_eq!(back.time, s.time);
    }

    #[test]
    fn interval_from_short_slice_is_none() {
        assert_eq!(Interval::from_slice(&[1.0]), None);
        assert_eq!(Interval::from_slice(&[1.0, 2.0]), Some(Interval::new(1.0, 2.0)));
    }
}
