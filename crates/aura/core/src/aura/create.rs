use crate::types::{AuraId, CastId, EffectMask, ObjectGuid, SpellId};

/// Request to put a spell's auras on an owner.
#[derive(Clone, Debug, PartialEq)]
pub struct AuraCreateInfo {
    pub spell: SpellId,
    pub owner: ObjectGuid,
    pub caster: Option<ObjectGuid>,
    pub cast_id: CastId,
    pub cast_item: Option<ObjectGuid>,
    pub cast_item_level: u16,
    /// Effects the caller wants; narrowed to the ones the owner kind carries.
    pub effect_mask: EffectMask,
    /// Per-slot base point overrides, indexed by effect index.
    pub base_amounts: Option<Vec<i32>>,
    /// Radius of the dynamic object owning the aura.
    pub radius: Option<f32>,
    pub reset_periodic_timer: bool,
    pub stack_amount: u8,
}

impl AuraCreateInfo {
    pub fn new(spell: SpellId, owner: ObjectGuid) -> Self {
        Self {
            spell,
            owner,
            caster: None,
            cast_id: CastId::default(),
            cast_item: None,
            cast_item_level: 0,
            effect_mask: EffectMask::ALL,
            base_amounts: None,
            radius: None,
            reset_periodic_timer: true,
            stack_amount: 1,
        }
    }

    pub fn with_caster(mut self, caster: ObjectGuid) -> Self {
        self.caster = Some(caster);
        self
    }

    pub fn with_cast_id(mut self, cast_id: CastId) -> Self {
        self.cast_id = cast_id;
        self
    }

    pub fn with_cast_item(mut self, item: ObjectGuid, item_level: u16) -> Self {
        self.cast_item = Some(item);
        self.cast_item_level = item_level;
        self
    }

    pub fn with_effect_mask(mut self, mask: EffectMask) -> Self {
        self.effect_mask = mask;
        self
    }

    pub fn with_base_amounts(mut self, amounts: Vec<i32>) -> Self {
        self.base_amounts = Some(amounts);
        self
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = Some(radius);
        self
    }

    pub fn with_stack_amount(mut self, stacks: u8) -> Self {
        self.stack_amount = stacks;
        self
    }

    /// Keep running periodic timers when this request refreshes an aura.
    pub fn keep_periodic_timer(mut self) -> Self {
        self.reset_periodic_timer = false;
        self
    }

    pub(crate) fn base_amount(&self, index: u8) -> Option<i32> {
        self.base_amounts
            .as_ref()
            .and_then(|amounts| amounts.get(usize::from(index)).copied())
    }
}

/// Result of a create-or-refresh request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuraHandle {
    pub aura: AuraId,
    /// An existing aura absorbed the request instead of a new one being made.
    pub refreshed: bool,
}
