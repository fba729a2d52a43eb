//! Cluster cells, summaries and the items returned for a viewport.

use crate::entity::{Entity, Sport};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A grid cell at one zoom level.
///
/// Rows count northwards from latitude -90, columns eastwards from
/// longitude -180. The textual form `"{zoom}:{row}:{col}"` is the cluster id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GeoCell {
    pub zoom: u8,
    pub row: i64,
    pub col: i64,
}

impl GeoCell {
    pub const fn new(zoom: u8, row: i64, col: i64) -> Self {
        Self { zoom, row, col }
    }

    /// The cell one zoom level up that contains this one.
    pub fn parent(&self) -> Option<GeoCell> {
        let zoom = self.zoom.checked_sub(1)?;
        Some(GeoCell::new(
            zoom,
            self.row.div_euclid(2),
            self.col.div_euclid(2),
        ))
    }
}

impl fmt::Display for GeoCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.zoom, self.row, self.col)
    }
}

/// Error parsing a [`GeoCell`] id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidCellId(pub String);

impl fmt::Display for InvalidCellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid cell id: {:?}", self.0)
    }
}

impl std::error::Error for InvalidCellId {}

impl FromStr for GeoCell {
    type Err = InvalidCellId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidCellId(s.to_string());
        let mut parts = s.split(':');
        let zoom = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        let row = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        let col = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(GeoCell::new(zoom, row, col))
    }
}

/// Per-sport member counts of a cluster.
///
/// Entries are kept sorted by descending count, ties broken by the sport's
/// display name, so the first entry is the dominant sport. Serializes as a
/// JSON object whose keys appear in that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SportCounts(Vec<(Sport, usize)>);

impl SportCounts {
    /// Build from unordered tallies; zero counts are dropped.
    pub fn from_tallies(tallies: impl IntoIterator<Item = (Sport, usize)>) -> Self {
        let mut merged: BTreeMap<Sport, usize> = BTreeMap::new();
        for (sport, count) in tallies {
            *merged.entry(sport).or_default() += count;
        }
        let mut entries: Vec<(Sport, usize)> =
            merged.into_iter().filter(|(_, count)| *count > 0).collect();
        entries.sort_by(|(sa, ca), (sb, cb)| cb.cmp(ca).then_with(|| sa.as_str().cmp(sb.as_str())));
        Self(entries)
    }

    pub fn dominant(&self) -> Option<Sport> {
        self.0.first().map(|(sport, _)| *sport)
    }

    pub fn get(&self, sport: Sport) -> usize {
        self.0
            .iter()
            .find(|(s, _)| *s == sport)
            .map_or(0, |(_, count)| *count)
    }

    pub fn total(&self) -> usize {
        self.0.iter().map(|(_, count)| count).sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Sport, usize)> + '_ {
        self.0.iter().copied()
    }
}

impl Serialize for SportCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (sport, count) in &self.0 {
            map.serialize_entry(sport.as_str(), count)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SportCounts {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CountsVisitor;

        impl<'de> Visitor<'de> for CountsVisitor {
            type Value = SportCounts;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of sport name to member count")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut tallies = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, count)) = access.next_entry::<String, usize>()? {
                    let sport = name.parse::<Sport>().map_err(de::Error::custom)?;
                    tallies.push((sport, count));
                }
                Ok(SportCounts::from_tallies(tallies))
            }
        }

        deserializer.deserialize_map(CountsVisitor)
    }
}

/// Aggregate standing in for every entity of one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSummary {
    pub cell: GeoCell,
    /// Mean latitude of the members.
    pub latitude: f64,
    /// Mean longitude of the members.
    pub longitude: f64,
    pub count: usize,
    pub sport_counts: SportCounts,
}

impl ClusterSummary {
    pub fn id(&self) -> String {
        self.cell.to_string()
    }
}

/// One marker in a viewport response: a cluster or an individual entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "ClusterItemWire", try_from = "ClusterItemWire")]
pub enum ClusterItem {
    Cluster(ClusterSummary),
    Single(Entity),
}

impl ClusterItem {
    pub fn id(&self) -> String {
        match self {
            ClusterItem::Cluster(summary) => summary.id(),
            ClusterItem::Single(entity) => entity.id.clone(),
        }
    }

    pub fn is_cluster(&self) -> bool {
        matches!(self, ClusterItem::Cluster(_))
    }

    /// Number of entities this marker represents.
    pub fn count(&self) -> usize {
        match self {
            ClusterItem::Cluster(summary) => summary.count,
            ClusterItem::Single(_) => 1,
        }
    }

    pub fn position(&self) -> (f64, f64) {
        match self {
            ClusterItem::Cluster(summary) => (summary.latitude, summary.longitude),
            ClusterItem::Single(entity) => (entity.latitude, entity.longitude),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClusterItemWire {
    id: String,
    is_cluster: bool,
    latitude: f64,
    longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sport_counts: Option<SportCounts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    entity: Option<Entity>,
}

impl From<ClusterItem> for ClusterItemWire {
    fn from(item: ClusterItem) -> Self {
        match item {
            ClusterItem::Cluster(summary) => ClusterItemWire {
                id: summary.id(),
                is_cluster: true,
                latitude: summary.latitude,
                longitude: summary.longitude,
                count: Some(summary.count),
                sport_counts: Some(summary.sport_counts),
                entity: None,
            },
            ClusterItem::Single(entity) => ClusterItemWire {
                id: entity.id.clone(),
                is_cluster: false,
                latitude: entity.latitude,
                longitude: entity.longitude,
                count: None,
                sport_counts: None,
                entity: Some(entity),
            },
        }
    }
}

impl TryFrom<ClusterItemWire> for ClusterItem {
    type Error = String;

    fn try_from(wire: ClusterItemWire) -> Result<Self, Self::Error> {
        if wire.is_cluster {
            let cell = wire.id.parse::<GeoCell>().map_err(|e| e.to_string())?;
            Ok(ClusterItem::Cluster(ClusterSummary {
                cell,
                latitude: wire.latitude,
                longitude: wire.longitude,
                count: wire.count.ok_or("cluster item without count")?,
                sport_counts: wire.sport_counts.unwrap_or_default(),
            }))
        } else {
            wire.entity
                .map(ClusterItem::Single)
                .ok_or_else(|| format!("individual item {} without entity", wire.id))
        }
    }
}
