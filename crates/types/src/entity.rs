//! Locatable actors (players and coaches) and the tags used to filter them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when a tag string does not belong to a known vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTag {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {}: {:?}", self.kind, self.value)
    }
}

impl std::error::Error for UnknownTag {}

macro_rules! sports {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Category tag of an entity.
        ///
        /// The vocabulary is closed; values serialize to their display name
        /// (`"Table Tennis"`, `"Kho Kho"`, ...).
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum Sport {
            $(
                #[serde(rename = $name)]
                $variant,
            )+
        }

        impl Sport {
            /// Every sport, in declaration order.
            pub const ALL: &'static [Sport] = &[$(Sport::$variant),+];

            /// Display name, also used for lexical tie-breaking.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Sport::$variant => $name,)+
                }
            }
        }
    };
}

sports! {
    Cricket => "Cricket",
    Football => "Football",
    Hockey => "Hockey",
    Badminton => "Badminton",
    Tennis => "Tennis",
    TableTennis => "Table Tennis",
    Kabaddi => "Kabaddi",
    Wrestling => "Wrestling",
    Boxing => "Boxing",
    Shooting => "Shooting",
    Archery => "Archery",
    Athletics => "Athletics",
    Swimming => "Swimming",
    Volleyball => "Volleyball",
    Basketball => "Basketball",
    Chess => "Chess",
    Carrom => "Carrom",
    KhoKho => "Kho Kho",
    Squash => "Squash",
    Golf => "Golf",
    Cycling => "Cycling",
    Weightlifting => "Weightlifting",
    Gymnastics => "Gymnastics",
    MartialArts => "Martial Arts",
    Yoga => "Yoga",
    Running => "Running",
    Marathon => "Marathon",
    Throwball => "Throwball",
    Handball => "Handball",
    Baseball => "Baseball",
    Gym => "Gym",
    Padel => "Padel",
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sport {
    type Err = UnknownTag;

    /// Case-insensitive; `"table tennis"` and `"Table Tennis"` are the same sport.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Sport::ALL
            .iter()
            .copied()
            .find(|sport| sport.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownTag {
                kind: "sport",
                value: s.to_string(),
            })
    }
}

/// Whether an entity is a player or a coach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Player,
    Coach,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Player => "player",
            Role::Coach => "coach",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "player" | "players" => Ok(Role::Player),
            "coach" | "coaches" => Ok(Role::Coach),
            _ => Err(UnknownTag {
                kind: "role",
                value: s.to_string(),
            }),
        }
    }
}

/// Self-reported skill level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
    Professional,
}

impl SkillLevel {
    pub const ALL: &'static [SkillLevel] = &[
        SkillLevel::Beginner,
        SkillLevel::Intermediate,
        SkillLevel::Advanced,
        SkillLevel::Professional,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            SkillLevel::Beginner => "Beginner",
            SkillLevel::Intermediate => "Intermediate",
            SkillLevel::Advanced => "Advanced",
            SkillLevel::Professional => "Professional",
        }
    }
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkillLevel {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        SkillLevel::ALL
            .iter()
            .copied()
            .find(|level| level.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownTag {
                kind: "skill level",
                value: s.to_string(),
            })
    }
}

/// One locatable actor.
///
/// Coordinates are WGS84 decimal degrees. The payload is opaque to the
/// engine and is returned untouched in individual (unclustered) items.
///
/// # Examples
///
/// ```
/// use pitchmap_types::entity::{Entity, Role, Sport};
///
/// let player = Entity::new("p-1", 12.97, 77.59, Sport::Cricket, Role::Player)
///     .with_payload(serde_json::json!({"name": "Asha"}));
/// assert_eq!(player.sport, Sport::Cricket);
/// assert_eq!(player.payload["name"], "Asha");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub sport: Sport,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<SkillLevel>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Entity {
    pub fn new(
        id: impl Into<String>,
        latitude: f64,
        longitude: f64,
        sport: Sport,
        role: Role,
    ) -> Self {
        Self {
            id: id.into(),
            latitude,
            longitude,
            sport,
            role,
            level: None,
            payload: serde_json::Value::Null,
        }
    }

    pub fn with_level(mut self, level: SkillLevel) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Same entity at a new position.
    pub fn moved_to(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = latitude;
        self.longitude = longitude;
        self
    }
}

/// Category/role/level predicate applied during index scans.
///
/// Every absent part matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sport: Option<Sport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// Accepted skill levels; entities without a level never match a level filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub levels: Option<Vec<SkillLevel>>,
}

impl EntityFilter {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn sport(sport: Sport) -> Self {
        Self {
            sport: Some(sport),
            ..Self::default()
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_levels(mut self, levels: impl IntoIterator<Item = SkillLevel>) -> Self {
        let mut levels: Vec<SkillLevel> = levels.into_iter().collect();
        levels.sort();
        levels.dedup();
        self.levels = Some(levels);
        self
    }

    pub fn is_unfiltered(&self) -> bool {
        self.sport.is_none() && self.role.is_none() && self.levels.is_none()
    }

    #[inline]
    pub fn matches(&self, entity: &Entity) -> bool {
        if let Some(sport) = self.sport
            && entity.sport != sport
        {
            return false;
        }
        if let Some(role) = self.role
            && entity.role != role
        {
            return false;
        }
        match (&self.levels, entity.level) {
            (None, _) => true,
            (Some(levels), Some(level)) => levels.contains(&level),
            (Some(_), None) => false,
        }
    }
}
