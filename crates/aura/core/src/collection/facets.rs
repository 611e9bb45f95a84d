use bitflags::bitflags;

use crate::spell::{AuraStateType, DiminishingGroup, DispelType};
use crate::types::{AuraFlags, AuraId, CastId, EffectMask, ObjectGuid, SpellId};

bitflags! {
    /// Boolean facets of an aura, each indexed separately.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct FacetFlags: u16 {
        const SINGLE_TARGET        = 1 << 0;
        const SAVEABLE             = 1 << 1;
        const PASSIVE              = 1 << 2;
        const DEATH_PERSISTENT     = 1 << 3;
        const PERMANENT            = 1 << 4;
        const NEGATIVE             = 1 << 5;
        const GROUP_BUFF           = 1 << 6;
        const REQUIRES_DEAD_TARGET = 1 << 7;
    }
}

/// Index key. Every aura is linked under each key it carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Facet {
    Spell(SpellId),
    Caster(ObjectGuid),
    CastItem(ObjectGuid),
    CastId(CastId),
    Owner(ObjectGuid),
    Label(u32),
    Diminishing(DiminishingGroup),
    CasterAuraState(AuraStateType),
    Dispel(DispelType),
    Category(u32),
    /// A single bit of [`FacetFlags`].
    Flag(FacetFlags),
}

/// Indexed view of one aura.
#[derive(Clone, Debug, PartialEq)]
pub struct AuraFacets {
    pub id: AuraId,
    pub spell: SpellId,
    pub caster: Option<ObjectGuid>,
    pub cast_item: Option<ObjectGuid>,
    pub cast_id: CastId,
    pub owner: ObjectGuid,
    pub labels: Vec<u32>,
    pub diminishing_group: DiminishingGroup,
    pub caster_aura_state: AuraStateType,
    pub dispel: DispelType,
    pub category: u32,
    pub flags: FacetFlags,
}

impl AuraFacets {
    pub fn keys(&self) -> Vec<Facet> {
        let mut keys = Vec::with_capacity(10 + self.labels.len());
        keys.push(Facet::Spell(self.spell));
        if let Some(caster) = self.caster {
            keys.push(Facet::Caster(caster));
        }
        if let Some(item) = self.cast_item {
            keys.push(Facet::CastItem(item));
        }
        keys.push(Facet::CastId(self.cast_id));
        keys.push(Facet::Owner(self.owner));
        keys.extend(self.labels.iter().copied().map(Facet::Label));
        keys.push(Facet::Diminishing(self.diminishing_group));
        keys.push(Facet::CasterAuraState(self.caster_aura_state));
        keys.push(Facet::Dispel(self.dispel));
        keys.push(Facet::Category(self.category));
        keys.extend(self.flags.iter().map(Facet::Flag));
        keys
    }
}

/// Anything that can live in an indexed store.
pub trait Indexed {
    fn facets(&self) -> &AuraFacets;
}

impl Indexed for AuraFacets {
    fn facets(&self) -> &AuraFacets {
        self
    }
}

/// Entry of a unit's applied-aura collection.
#[derive(Clone, Debug, PartialEq)]
pub struct ApplicationEntry {
    pub facets: AuraFacets,
    pub target: ObjectGuid,
    pub slot: Option<u8>,
    pub effect_mask: EffectMask,
    pub flags: AuraFlags,
}

impl Indexed for ApplicationEntry {
    fn facets(&self) -> &AuraFacets {
        &self.facets
    }
}
