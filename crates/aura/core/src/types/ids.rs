use std::fmt;

/// Kind of world object encoded in the high bits of an [`ObjectGuid`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum ObjectKind {
    Empty,
    Player,
    Creature,
    Pet,
    DynamicObject,
    GameObject,
    Item,
}

impl ObjectKind {
    const fn tag(self) -> u64 {
        match self {
            Self::Empty => 0,
            Self::Player => 1,
            Self::Creature => 2,
            Self::Pet => 3,
            Self::DynamicObject => 4,
            Self::GameObject => 5,
            Self::Item => 6,
        }
    }

    const fn from_tag(tag: u64) -> Self {
        match tag {
            1 => Self::Player,
            2 => Self::Creature,
            3 => Self::Pet,
            4 => Self::DynamicObject,
            5 => Self::GameObject,
            6 => Self::Item,
            _ => Self::Empty,
        }
    }

    /// Units can be aura targets and unit-aura owners.
    pub const fn is_unit(self) -> bool {
        matches!(self, Self::Player | Self::Creature | Self::Pet)
    }
}

/// Identifier of any world object (units, dynamic objects, items).
///
/// The top 16 bits carry the [`ObjectKind`], the rest is a per-kind counter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectGuid(pub u64);

impl ObjectGuid {
    pub const EMPTY: Self = Self(0);

    const KIND_SHIFT: u32 = 48;
    const COUNTER_MASK: u64 = (1 << Self::KIND_SHIFT) - 1;

    pub const fn new(kind: ObjectKind, counter: u64) -> Self {
        Self((kind.tag() << Self::KIND_SHIFT) | (counter & Self::COUNTER_MASK))
    }

    pub const fn player(counter: u64) -> Self {
        Self::new(ObjectKind::Player, counter)
    }

    /// Creature guid; the common "unit" for tests and tools.
    pub const fn unit(counter: u64) -> Self {
        Self::new(ObjectKind::Creature, counter)
    }

    pub const fn pet(counter: u64) -> Self {
        Self::new(ObjectKind::Pet, counter)
    }

    pub const fn dynamic_object(counter: u64) -> Self {
        Self::new(ObjectKind::DynamicObject, counter)
    }

    pub const fn item(counter: u64) -> Self {
        Self::new(ObjectKind::Item, counter)
    }

    pub const fn game_object(counter: u64) -> Self {
        Self::new(ObjectKind::GameObject, counter)
    }

    pub const fn kind(self) -> ObjectKind {
        ObjectKind::from_tag(self.0 >> Self::KIND_SHIFT)
    }

    pub const fn counter(self) -> u64 {
        self.0 & Self::COUNTER_MASK
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn is_unit(self) -> bool {
        self.kind().is_unit()
    }
}

impl fmt::Display for ObjectGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind(), self.counter())
    }
}

/// Static spell identifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpellId(pub u32);

impl fmt::Display for SpellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle of one aura instance inside an [`crate::AuraState`].
///
/// Ids are never reused, so a stale handle simply resolves to nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AuraId(pub u64);

impl fmt::Display for AuraId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "aura#{}", self.0)
    }
}

/// Identifier of the cast that produced an aura.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CastId(pub u64);

/// Simulation partition (map instance) an object lives in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PartitionId(pub u32);

/// Monotonic game clock in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GameTime(pub u64);

impl GameTime {
    pub const ZERO: Self = Self(0);

    pub fn new(millis: u64) -> Self {
        Self(millis)
    }

    /// Milliseconds elapsed since `earlier`, zero if `earlier` is in the future.
    pub fn millis_since(self, earlier: GameTime) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    pub fn seconds_since(self, earlier: GameTime) -> f32 {
        self.millis_since(earlier) as f32 / 1000.0
    }
}

impl std::ops::Add<u64> for GameTime {
    type Output = GameTime;
    fn add(self, rhs: u64) -> GameTime {
        GameTime(self.0 + rhs)
    }
}

impl std::ops::Sub<u64> for GameTime {
    type Output = GameTime;
    fn sub(self, rhs: u64) -> GameTime {
        GameTime(self.0.saturating_sub(rhs))
    }
}

impl fmt::Display for GameTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// World-space position.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub const ORIGIN: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn is_within(&self, other: &Position, radius: f32) -> bool {
        self.distance(other) <= radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guid_round_trips_kind_and_counter() {
        let guid = ObjectGuid::dynamic_object(77);
        assert_eq!(guid.kind(), ObjectKind::DynamicObject);
        assert_eq!(guid.counter(), 77);
        assert!(!guid.is_unit());

        assert!(ObjectGuid::player(1).is_unit());
        assert!(ObjectGuid::EMPTY.is_empty());
        assert_eq!(ObjectGuid::EMPTY.kind(), ObjectKind::Empty);
    }

    #[test]
    fn game_time_subtraction_saturates() {
        let now = GameTime(500);
        assert_eq!(now - 1000, GameTime::ZERO);
        assert_eq!(now.millis_since(GameTime(800)), 0);
        assert!((GameTime(4500).seconds_since(GameTime(2000)) - 2.5).abs() < f32::EPSILON);
    }
}
