/// Aura runtime limits and tunable parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AuraConfig {
    /// Milliseconds between two target-map reconciliations of the same aura.
    pub update_target_map_interval: i32,
    /// Extra search distance added to enemy area auras so targets standing on
    /// the radius edge are not dropped and re-added every update.
    pub enemy_extra_search_radius: f32,
    /// Delay applied by [`crate::AuraEngine::drop_charge_delayed`] when the
    /// proc entry asks for a deferred charge drop.
    pub charge_drop_delay: u32,
    /// Milliseconds without a new hit before a diminishing group resets.
    pub diminishing_window: u64,
    /// Upper bound for "seconds since last attempt" in the PPM formula.
    pub proc_attempt_window: f32,
    /// Upper bound for "seconds since last success" in the PPM formula.
    pub proc_success_window: f32,
    /// Seconds a fresh aura counts as having last attempted a PPM roll.
    pub proc_initial_attempt_age: f32,
    /// Seconds a fresh aura counts as having last succeeded a PPM roll.
    pub proc_initial_success_age: f32,
}

impl AuraConfig {
    // ===== compile-time constants used as type parameters =====
    /// Effect slots per spell. Effect masks are 32 bits wide, the per-aura
    /// effect table only holds this many.
    pub const MAX_SPELL_EFFECTS: usize = 8;
    /// Visible aura slots per unit (slot ids are `u8`, 0xFF means "no slot").
    pub const MAX_VISIBLE_AURAS: usize = 255;
    pub const MAX_STACK_AMOUNT: u8 = 255;
    pub const MAX_PROC_CHARGES: u8 = 255;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_UPDATE_TARGET_MAP_INTERVAL: i32 = 500;
    pub const DEFAULT_ENEMY_EXTRA_SEARCH_RADIUS: f32 = 4.0;
    pub const DEFAULT_CHARGE_DROP_DELAY: u32 = 50;
    pub const DEFAULT_DIMINISHING_WINDOW: u64 = 18_000;
    pub const DEFAULT_PROC_ATTEMPT_WINDOW: f32 = 10.0;
    pub const DEFAULT_PROC_SUCCESS_WINDOW: f32 = 1000.0;
    pub const DEFAULT_PROC_INITIAL_ATTEMPT_AGE: f32 = 10.0;
    pub const DEFAULT_PROC_INITIAL_SUCCESS_AGE: f32 = 120.0;

    pub fn new() -> Self {
        Self {
            update_target_map_interval: Self::DEFAULT_UPDATE_TARGET_MAP_INTERVAL,
            enemy_extra_search_radius: Self::DEFAULT_ENEMY_EXTRA_SEARCH_RADIUS,
            charge_drop_delay: Self::DEFAULT_CHARGE_DROP_DELAY,
            diminishing_window: Self::DEFAULT_DIMINISHING_WINDOW,
            proc_attempt_window: Self::DEFAULT_PROC_ATTEMPT_WINDOW,
            proc_success_window: Self::DEFAULT_PROC_SUCCESS_WINDOW,
            proc_initial_attempt_age: Self::DEFAULT_PROC_INITIAL_ATTEMPT_AGE,
            proc_initial_success_age: Self::DEFAULT_PROC_INITIAL_SUCCESS_AGE,
        }
    }

    pub fn with_update_target_map_interval(mut self, interval: i32) -> Self {
        self.update_target_map_interval = interval;
        self
    }

    pub fn with_charge_drop_delay(mut self, delay: u32) -> Self {
        self.charge_drop_delay = delay;
        self
    }
}

impl Default for AuraConfig {
    fn default() -> Self {
        Self::new()
    }
}
