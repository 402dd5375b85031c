//! Simulation State
//!
//! The entity registry: player, enemies, projectiles, drops, obstacles,
//! companions and particles, plus run-level bookkeeping.
//! Enemies live in a BTreeMap so every pass visits them in id order.

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{CharacterConfig, Difficulty, RunConfig, SimConfig};
use crate::core::geometry::Rect;
use crate::core::rng::DeterministicRng;
use crate::game::ability::{AbilityId, FRENZY_COOLDOWN_MULT, FRENZY_DAMAGE_MULT};
use crate::game::companion::{apply_companion_passives, spawn_companions, CompanionKind};
use crate::game::enemy::{AttackPhase, AttackProfile};
use crate::game::events::{GameEvent, GameEventData};
use crate::game::hud::RunResult;
use crate::game::progression::{apply_persistent_upgrades, LevelUpRequest, INITIAL_LEVEL_XP};
use crate::game::schedule::Scheduler;
use crate::game::spawn::SpawnDirector;
use crate::game::status::{OnHitStatus, StatusEffects, StatusKind};
use crate::game::weapon::WeaponSlot;

/// Identifier shared by every entity kind (monotonic per run).
pub type EntityId = u32;

/// Player collision radius.
pub const PLAYER_RADIUS: f32 = 16.0;

/// Invulnerability window after the player takes a hit (seconds).
pub const HIT_INVULNERABILITY: f32 = 0.5;

/// Seconds a dead enemy stays in the registry before removal.
pub const DEATH_DECAY: f32 = 0.6;

/// Maximum live cosmetic particles.
pub const MAX_PARTICLES: usize = 512;

/// Horizontal facing used to pick sprite direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Facing {
    /// Facing left
    Left,
    /// Facing right
    #[default]
    Right,
}

impl Facing {
    /// Facing implied by a horizontal delta, keeping `self` when it is ~0.
    pub fn toward(self, dx: f32) -> Facing {
        if dx < -0.01 {
            Facing::Left
        } else if dx > 0.01 {
            Facing::Right
        } else {
            self
        }
    }
}

// =============================================================================
// PLAYER STATE
// =============================================================================

/// Per-run stat modifiers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    /// Multiplier on all weapon and ability damage
    pub damage_mult: f32,
    /// Multiplier on weapon and ability cooldowns (lower is faster)
    pub cooldown_mult: f32,
    /// Radius within which drops are pulled in
    pub pickup_range: f32,
    /// Flat damage reduction against hits
    pub armor: f32,
    /// Extra projectiles per weapon volley
    pub projectile_count: u32,
    /// Bonus to xp gain and drop chances
    pub luck: f32,
    /// Fraction of damage dealt returned as healing
    pub life_steal: f32,
    /// Extra knockback distance on player hits
    pub knockback: f32,
    /// Multiplier on movement speed
    pub move_speed_mult: f32,
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self {
            damage_mult: 1.0,
            cooldown_mult: 1.0,
            pickup_range: 60.0,
            armor: 0.0,
            projectile_count: 0,
            luck: 0.0,
            life_steal: 0.0,
            knockback: 0.0,
            move_speed_mult: 1.0,
        }
    }
}

/// Ability-driven timed buffs (seconds remaining, 0 = inactive).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TimedBuffs {
    /// Passes through enemies, projectiles and obstacles
    pub intangible: f32,
    /// Ignores all damage
    pub invulnerable: f32,
    /// Faster cooldowns and more damage
    pub frenzy: f32,
}

impl TimedBuffs {
    /// Count every buff down, clamping at 0.
    pub fn tick(&mut self, dt: f32) {
        self.intangible = (self.intangible - dt).max(0.0);
        self.invulnerable = (self.invulnerable - dt).max(0.0);
        self.frenzy = (self.frenzy - dt).max(0.0);
    }

    /// Intangibility active?
    #[inline]
    pub fn is_intangible(&self) -> bool {
        self.intangible > 0.0
    }

    /// Invulnerability active?
    #[inline]
    pub fn is_invulnerable(&self) -> bool {
        self.invulnerable > 0.0
    }

    /// Frenzy active?
    #[inline]
    pub fn is_frenzied(&self) -> bool {
        self.frenzy > 0.0
    }
}

/// The player.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayerState {
    /// Current position
    pub position: Vec2,

    /// Current hp, always within [0, max_hp]
    pub hp: f32,

    /// Maximum hp
    pub max_hp: f32,

    /// Experience toward the next level
    pub xp: f32,

    /// Experience needed for the next level
    pub next_level_xp: f32,

    /// Current level (starts at 1)
    pub level: u32,

    /// Base movement speed from the character
    pub base_speed: f32,

    /// Sprite facing
    pub facing: Facing,

    /// Last non-zero movement direction (unit length)
    pub direction: Vec2,

    // =========================================================================
    // Animation
    // =========================================================================

    /// Moved this frame?
    pub moving: bool,

    /// Walk cycle frame
    pub anim_frame: u8,

    /// Time accumulated toward the next walk frame
    pub anim_timer: f32,

    // =========================================================================
    // Loadout
    // =========================================================================

    /// Per-run stat modifiers
    pub stats: PlayerStats,

    /// Owned weapons
    pub weapons: Vec<WeaponSlot>,

    /// Equipped abilities and their remaining cooldown (0 = ready)
    pub ability_cooldowns: BTreeMap<AbilityId, f32>,

    /// Full cooldown set by each ability's last activation
    pub ability_cooldown_totals: BTreeMap<AbilityId, f32>,

    /// Orbiter count per companion kind
    pub passive_levels: BTreeMap<CompanionKind, u32>,

    /// Scales all companion damage; restored to 1.0 by the scheduler
    pub companion_damage_mult: f32,

    // =========================================================================
    // Defensive state
    // =========================================================================

    /// Ability buffs
    pub buffs: TimedBuffs,

    /// Short window after a hit during which further hits are ignored
    pub hit_invulnerable: f32,

    /// Status effects from elemental enemy attacks
    pub status: StatusEffects,
}

impl PlayerState {
    /// Create the player for a new run.
    pub fn new(position: Vec2, character: &CharacterConfig, abilities: &[AbilityId]) -> Self {
        Self {
            position,
            hp: character.max_hp,
            max_hp: character.max_hp,
            xp: 0.0,
            next_level_xp: INITIAL_LEVEL_XP,
            level: 1,
            base_speed: character.speed,
            facing: Facing::Right,
            direction: Vec2::X,
            moving: false,
            anim_frame: 0,
            anim_timer: 0.0,
            stats: PlayerStats {
                armor: character.armor,
                ..PlayerStats::default()
            },
            weapons: vec![WeaponSlot::new(character.starting_weapon)],
            ability_cooldowns: abilities.iter().map(|id| (*id, 0.0)).collect(),
            ability_cooldown_totals: BTreeMap::new(),
            passive_levels: BTreeMap::new(),
            companion_damage_mult: 1.0,
            buffs: TimedBuffs::default(),
            hit_invulnerable: 0.0,
            status: StatusEffects::default(),
        }
    }

    /// Current movement speed including slows.
    #[inline]
    pub fn speed(&self) -> f32 {
        self.base_speed * self.stats.move_speed_mult * self.status.speed_factor()
    }

    /// Still alive?
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.hp > 0.0
    }

    /// Damage multiplier including frenzy.
    pub fn damage_mult(&self) -> f32 {
        if self.buffs.is_frenzied() {
            self.stats.damage_mult * FRENZY_DAMAGE_MULT
        } else {
            self.stats.damage_mult
        }
    }

    /// Cooldown multiplier including frenzy.
    pub fn cooldown_mult(&self) -> f32 {
        if self.buffs.is_frenzied() {
            self.stats.cooldown_mult * FRENZY_COOLDOWN_MULT
        } else {
            self.stats.cooldown_mult
        }
    }

    /// Whether a hit landing now would deal damage.
    #[inline]
    pub fn can_be_hit(&self) -> bool {
        self.is_alive()
            && !self.buffs.is_invulnerable()
            && !self.buffs.is_intangible()
            && self.hit_invulnerable <= 0.0
    }

    /// Apply a hit: `max(1, raw - armor)` damage and a fresh hit window.
    ///
    /// Returns the damage dealt, or `None` when the hit was ignored.
    pub fn take_hit(&mut self, raw_damage: f32) -> Option<f32> {
        if !self.can_be_hit() {
            return None;
        }
        let damage = (raw_damage - self.stats.armor).max(1.0);
        self.hp = (self.hp - damage).clamp(0.0, self.max_hp);
        self.hit_invulnerable = HIT_INVULNERABILITY;
        Some(damage)
    }

    /// Restore hp, never past max.
    pub fn heal(&mut self, amount: f32) {
        if self.is_alive() && amount > 0.0 {
            self.hp = (self.hp + amount).min(self.max_hp);
        }
    }
}

// =============================================================================
// ENEMIES
// =============================================================================

/// Elemental flavor of a ranged enemy's projectiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Element {
    /// Sets the target burning
    Fire,
    /// Slows the target
    Frost,
    /// Makes the target bleed
    Venom,
    /// Fast, hard-hitting bolts
    Storm,
}

impl Element {
    /// All elements.
    pub const ALL: [Element; 4] = [Element::Fire, Element::Frost, Element::Venom, Element::Storm];

    /// Status applied to the player on hit.
    pub fn on_hit_status(self) -> Option<OnHitStatus> {
        match self {
            Element::Fire => Some(OnHitStatus { kind: StatusKind::Burn, duration: 2.0, magnitude: 4.0 }),
            Element::Frost => Some(OnHitStatus { kind: StatusKind::Slow, duration: 1.5, magnitude: 0.4 }),
            Element::Venom => Some(OnHitStatus { kind: StatusKind::Bleed, duration: 3.0, magnitude: 3.0 }),
            Element::Storm => None,
        }
    }

    /// Projectile speed (units per second).
    pub fn projectile_speed(self) -> f32 {
        match self {
            Element::Storm => 340.0,
            _ => 220.0,
        }
    }

    /// Damage relative to the enemy's base damage.
    pub fn damage_factor(self) -> f32 {
        match self {
            Element::Storm => 1.3,
            _ => 1.0,
        }
    }
}

/// Boss-class attack pattern fired at the impact threshold.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum BossPattern {
    /// Evenly spaced projectiles in every direction
    RadialBurst {
        /// Projectiles per burst
        count: u32,
    },
    /// A fan of projectiles aimed at the target
    AimedVolley {
        /// Projectiles per volley
        shots: u32,
        /// Total fan angle (radians)
        spread: f32,
    },
}

/// Enemy variant with kind-specific payload.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum EnemyKind {
    /// Regular wave enemy
    Normal,
    /// Tougher wave enemy
    Elite,
    /// Scheduled champion
    SubBoss {
        /// Attack pattern
        pattern: BossPattern,
    },
    /// The terminal boss
    Boss {
        /// Attack pattern
        pattern: BossPattern,
    },
}

impl EnemyKind {
    /// Collision radius.
    pub fn radius(self) -> f32 {
        match self {
            EnemyKind::Normal => 12.0,
            EnemyKind::Elite => 18.0,
            EnemyKind::SubBoss { .. } => 28.0,
            EnemyKind::Boss { .. } => 40.0,
        }
    }

    /// Value of the XP gem dropped on death.
    pub fn xp_value(self) -> f32 {
        match self {
            EnemyKind::Normal => 1.0,
            EnemyKind::Elite => 5.0,
            EnemyKind::SubBoss { .. } => 25.0,
            EnemyKind::Boss { .. } => 100.0,
        }
    }

    /// Sub-boss or boss?
    #[inline]
    pub fn is_boss_class(self) -> bool {
        matches!(self, EnemyKind::SubBoss { .. } | EnemyKind::Boss { .. })
    }

    /// The terminal boss?
    #[inline]
    pub fn is_main_boss(self) -> bool {
        matches!(self, EnemyKind::Boss { .. })
    }

    /// Boss pattern, if any.
    pub fn pattern(self) -> Option<BossPattern> {
        match self {
            EnemyKind::SubBoss { pattern } | EnemyKind::Boss { pattern } => Some(pattern),
            _ => None,
        }
    }

    /// Fraction of knockback distance this kind receives.
    pub fn knockback_factor(self) -> f32 {
        match self {
            EnemyKind::Normal | EnemyKind::Elite => 1.0,
            EnemyKind::SubBoss { .. } => 0.5,
            EnemyKind::Boss { .. } => 0.0,
        }
    }

    /// Name shown on the boss bar.
    pub fn display_name(self) -> &'static str {
        match self {
            EnemyKind::Normal => "Ghoul",
            EnemyKind::Elite => "Brute",
            EnemyKind::SubBoss { .. } => "Champion",
            EnemyKind::Boss { .. } => "Warlord",
        }
    }
}

/// A live (or dying) enemy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Enemy {
    /// Entity id
    pub id: EntityId,
    /// Current position
    pub position: Vec2,
    /// Current hp, within [0, max_hp]
    pub hp: f32,
    /// Maximum hp
    pub max_hp: f32,
    /// Damage per melee strike or projectile
    pub damage: f32,
    /// Base movement speed
    pub speed: f32,
    /// Collision radius
    pub radius: f32,
    /// Variant
    pub kind: EnemyKind,
    /// Ranged flavor; `None` for melee enemies
    pub element: Option<Element>,
    /// Attack countdown (see [`AttackPhase::from_timer`])
    pub attack_timer: f32,
    /// Sprite facing
    pub facing: Facing,
    /// Active status effects
    pub status: StatusEffects,
    /// Time until companions may hit this enemy again
    pub orbital_cooldown: f32,
    /// Decay time left once dead; `None` while alive
    pub dying: Option<f32>,
}

impl Enemy {
    /// Create a living enemy.
    pub fn new(id: EntityId, position: Vec2, kind: EnemyKind, hp: f32, damage: f32, speed: f32) -> Self {
        Self {
            id,
            position,
            hp,
            max_hp: hp,
            damage,
            speed,
            radius: kind.radius(),
            kind,
            element: None,
            attack_timer: 0.0,
            facing: Facing::Right,
            status: StatusEffects::default(),
            orbital_cooldown: 0.0,
            dying: None,
        }
    }

    /// Make this a ranged enemy of the given element.
    pub fn with_element(mut self, element: Element) -> Self {
        self.element = Some(element);
        self
    }

    /// Dead and decaying?
    #[inline]
    pub fn is_dying(&self) -> bool {
        self.dying.is_some()
    }

    /// Alive and able to act or be hit?
    #[inline]
    pub fn is_active(&self) -> bool {
        self.dying.is_none()
    }

    /// Attack profile for this enemy.
    pub fn attack_profile(&self) -> AttackProfile {
        AttackProfile::for_enemy(self)
    }

    /// Attack phase derived from the timer.
    pub fn attack_phase(&self) -> AttackPhase {
        AttackPhase::from_timer(self.attack_profile(), self.attack_timer)
    }
}

// =============================================================================
// PROJECTILES
// =============================================================================

/// Pierce budget meaning "never consumed by hits".
pub const PIERCE_UNLIMITED: u32 = u32::MAX;

/// Who fired a projectile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Owner {
    /// The player's weapons and abilities
    Player,
    /// A ranged enemy
    Enemy,
    /// A sub-boss or boss pattern
    Boss,
}

/// Lingering hazard payload.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    /// Damage radius
    pub radius: f32,
    /// Seconds between damage ticks
    pub interval: f32,
    /// Time until the next damage tick
    pub timer: f32,
}

/// A projectile or lingering zone.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Projectile {
    /// Entity id
    pub id: EntityId,
    /// Owner
    pub owner: Owner,
    /// Current position
    pub position: Vec2,
    /// Velocity (units per second)
    pub velocity: Vec2,
    /// Collision half extent / radius
    pub radius: f32,
    /// Damage per hit
    pub damage: f32,
    /// Seconds left before expiry
    pub lifetime: f32,
    /// Remaining pierces (0 = consumed on next hit)
    pub pierce: u32,
    /// Enemies already hit
    pub hit_ids: Vec<EntityId>,
    /// Splash radius on hit
    pub explosion_radius: Option<f32>,
    /// Lingering zone payload
    pub zone: Option<Zone>,
    /// Status applied on hit
    pub status: Option<OnHitStatus>,
    /// Knockback distance on hit
    pub knockback: f32,
}

impl Projectile {
    /// Create a plain, non-piercing projectile.
    pub fn new(owner: Owner, position: Vec2, velocity: Vec2, damage: f32, lifetime: f32) -> Self {
        Self {
            id: 0,
            owner,
            position,
            velocity,
            radius: 6.0,
            damage,
            lifetime,
            pierce: 0,
            hit_ids: Vec::new(),
            explosion_radius: None,
            zone: None,
            status: None,
            knockback: 0.0,
        }
    }

    /// Set the collision radius.
    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    /// Set the pierce budget.
    pub fn with_pierce(mut self, pierce: u32) -> Self {
        self.pierce = pierce;
        self
    }

    /// Explode on hit.
    pub fn with_explosion(mut self, radius: Option<f32>) -> Self {
        self.explosion_radius = radius;
        self
    }

    /// Turn into a lingering zone ticking every `interval`.
    pub fn with_zone(mut self, radius: f32, interval: f32) -> Self {
        self.zone = Some(Zone { radius, interval, timer: 0.0 });
        self
    }

    /// Apply a status on hit.
    pub fn with_status(mut self, status: Option<OnHitStatus>) -> Self {
        self.status = status;
        self
    }

    /// Knock enemies back on hit.
    pub fn with_knockback(mut self, knockback: f32) -> Self {
        self.knockback = knockback;
        self
    }

    /// Lingering zone?
    #[inline]
    pub fn is_zone(&self) -> bool {
        self.zone.is_some()
    }

    /// Already damaged this enemy?
    #[inline]
    pub fn has_hit(&self, id: EntityId) -> bool {
        self.hit_ids.contains(&id)
    }

    /// Spend one pierce after a hit. Returns whether the projectile survives.
    pub fn spend_pierce(&mut self) -> bool {
        match self.pierce {
            0 => false,
            PIERCE_UNLIMITED => true,
            _ => {
                self.pierce -= 1;
                true
            }
        }
    }
}

// =============================================================================
// DROPS, OBSTACLES, COMPANIONS, PARTICLES
// =============================================================================

/// Kind of pickup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropKind {
    /// Experience
    XpGem,
    /// Currency
    Coin,
    /// Boss loot: currency and a heal
    Chest,
    /// Restores hp
    Heal,
}

/// A pickup lying in the world.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Drop {
    /// Entity id
    pub id: EntityId,
    /// Current position
    pub position: Vec2,
    /// Kind
    pub kind: DropKind,
    /// Amount granted
    pub value: f32,
}

/// Static stage obstacle.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Obstacle {
    /// Entity id
    pub id: EntityId,
    /// Center
    pub position: Vec2,
    /// Collision radius
    pub radius: f32,
    /// Hp if destructible
    pub hp: Option<f32>,
}

/// An orbiting companion.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Companion {
    /// Kind
    pub kind: CompanionKind,
    /// Angle at t = 0
    pub base_angle: f32,
    /// Orbit radius
    pub radius: f32,
    /// Radial oscillation amplitude
    pub wobble: f32,
    /// Radians per second
    pub angular_speed: f32,
    /// Contact radius
    pub capture_radius: f32,
    /// Contact damage
    pub damage: f32,
    /// Status applied on contact
    pub status: Option<OnHitStatus>,
}

/// Cosmetic particle. Never read by gameplay.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Particle {
    /// Position
    pub position: Vec2,
    /// Velocity
    pub velocity: Vec2,
    /// Seconds left
    pub life: f32,
    /// Draw size
    pub size: f32,
}

// =============================================================================
// RUN PHASE
// =============================================================================

/// Global phase of the run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    /// Waves spawning normally
    #[default]
    Survival,
    /// A scheduled champion or boss is imminent
    EliteWarning,
    /// Boss alive, player locked in the arena, waves suppressed
    BossArena,
    /// Boss dead, victory pending
    Extraction,
    /// Terminal
    Ended,
}

/// Banner text shown by the presentation layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    /// Text
    pub text: String,
    /// Seconds left on screen
    pub remaining: f32,
}

/// Run counters reported in the result.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    /// Enemies killed
    pub kills: u32,
    /// Sub-bosses and bosses killed
    pub bosses_killed: u32,
    /// Currency collected
    pub currency: u32,
}

// =============================================================================
// SIMULATION STATE
// =============================================================================

/// Complete state of one run.
///
/// Owned by the host and passed `&mut` into every subsystem.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationState {
    /// Frames simulated
    pub frame: u64,

    /// Simulated seconds since run start
    pub elapsed: f32,

    /// Current phase
    pub phase: RunPhase,

    /// Paused by the host
    pub paused: bool,

    /// Terminal latch: set exactly once
    pub ended: bool,

    /// Terminal result, once ended
    pub outcome: Option<RunResult>,

    /// Stage number
    pub stage: u32,

    /// Active difficulty
    pub difficulty: Difficulty,

    /// World bounds
    pub world: Rect,

    /// Boss arena bounds while locked
    pub arena: Option<Rect>,

    /// Gameplay RNG
    #[serde(skip)]
    pub rng: DeterministicRng,

    /// Cosmetic RNG (particles only)
    #[serde(skip)]
    pub cosmetic_rng: DeterministicRng,

    /// The player
    pub player: PlayerState,

    /// Enemies (BTreeMap for deterministic iteration)
    pub enemies: BTreeMap<EntityId, Enemy>,

    /// Live projectiles and zones
    pub projectiles: Vec<Projectile>,

    /// Pickups
    pub drops: Vec<Drop>,

    /// Stage obstacles
    pub obstacles: Vec<Obstacle>,

    /// Orbiting companions
    pub companions: Vec<Companion>,

    /// Cosmetic particles
    pub particles: Vec<Particle>,

    /// Next entity id (monotonic counter)
    pub next_id: EntityId,

    /// Run counters
    pub stats: RunStats,

    /// Spawn schedule and latches
    pub spawner: SpawnDirector,

    /// Banner text
    pub warning: Option<Warning>,

    /// Pending level-up; simulation is suspended while set
    pub level_up: Option<LevelUpRequest>,

    /// Simulation-time delayed actions
    pub scheduler: Scheduler,

    /// Time accumulated toward the next HUD snapshot
    pub hud_timer: f32,

    /// Events generated since the last drain
    #[serde(skip)]
    pub pending_events: Vec<GameEvent>,
}

impl SimulationState {
    /// Create the state for a new run.
    pub fn new(run: &RunConfig, config: &SimConfig) -> Self {
        let mut player = PlayerState::new(Vec2::ZERO, &run.character, &run.abilities);
        apply_persistent_upgrades(&mut player, &run.upgrades);
        apply_companion_passives(&mut player, &run.companions);

        let mut state = Self {
            frame: 0,
            elapsed: 0.0,
            phase: RunPhase::Survival,
            paused: false,
            ended: false,
            outcome: None,
            stage: run.stage.max(1),
            difficulty: run.difficulty.clone(),
            world: Rect::centered(Vec2::ZERO, config.world_half_extents),
            arena: None,
            rng: DeterministicRng::new(run.seed),
            cosmetic_rng: DeterministicRng::new(run.seed ^ 0x5EED_C05E_71C5_0000),
            player,
            enemies: BTreeMap::new(),
            projectiles: Vec::new(),
            drops: Vec::new(),
            obstacles: Vec::new(),
            companions: spawn_companions(&run.companions),
            particles: Vec::new(),
            next_id: 1,
            stats: RunStats::default(),
            spawner: SpawnDirector::new(&run.difficulty, config),
            warning: None,
            level_up: None,
            scheduler: Scheduler::default(),
            // Publish a snapshot on the first frame
            hud_timer: config.hud_interval,
            pending_events: Vec::new(),
        };

        state.generate_obstacles(config.obstacle_count);
        state
    }

    /// Allocate an entity id.
    pub fn next_entity_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Register an enemy, assigning its id.
    pub fn insert_enemy(&mut self, mut enemy: Enemy) -> EntityId {
        let id = self.next_entity_id();
        enemy.id = id;
        self.enemies.insert(id, enemy);
        id
    }

    /// Register a projectile unless the cap is reached.
    pub fn spawn_projectile(&mut self, mut projectile: Projectile, cap: usize) -> Option<EntityId> {
        if self.projectiles.len() >= cap {
            debug!(cap, "projectile cap reached, skipping spawn");
            return None;
        }
        let id = self.next_entity_id();
        projectile.id = id;
        self.projectiles.push(projectile);
        Some(id)
    }

    /// Place a drop.
    pub fn spawn_drop(&mut self, position: Vec2, kind: DropKind, value: f32) -> EntityId {
        let id = self.next_entity_id();
        self.drops.push(Drop { id, position, kind, value });
        id
    }

    /// Enemies that are alive (not dying).
    pub fn live_enemy_count(&self) -> usize {
        self.enemies.values().filter(|e| e.is_active()).count()
    }

    /// Is the terminal boss alive?
    pub fn boss_alive(&self) -> bool {
        self.enemies
            .values()
            .any(|e| e.is_active() && e.kind.is_main_boss())
    }

    /// Nearest live enemy to `position`, skipping `exclude`.
    ///
    /// Ties resolve to the lowest id.
    pub fn nearest_enemy(&self, position: Vec2, exclude: Option<EntityId>) -> Option<(EntityId, Vec2)> {
        let mut best: Option<(EntityId, Vec2, f32)> = None;
        for enemy in self.enemies.values() {
            if !enemy.is_active() || Some(enemy.id) == exclude {
                continue;
            }
            let d = enemy.position.distance_squared(position);
            if best.map_or(true, |(_, _, bd)| d < bd) {
                best = Some((enemy.id, enemy.position, d));
            }
        }
        best.map(|(id, pos, _)| (id, pos))
    }

    /// Check if the run has ended.
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Queue an event stamped with the current frame.
    pub fn emit(&mut self, data: GameEventData) {
        let event = GameEvent::new(self.frame, data);
        self.pending_events.push(event);
    }

    /// Push a game event.
    pub fn push_event(&mut self, event: GameEvent) {
        self.pending_events.push(event);
    }

    /// Take pending events (consumes them).
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Spawn a cosmetic burst at `position`.
    pub fn emit_burst(&mut self, position: Vec2, count: usize) {
        for _ in 0..count {
            if self.particles.len() >= MAX_PARTICLES {
                break;
            }
            let velocity = self.cosmetic_rng.random_direction() * self.cosmetic_rng.next_f32_range(40.0, 160.0);
            let life = self.cosmetic_rng.next_f32_range(0.3, 0.8);
            let size = self.cosmetic_rng.next_f32_range(2.0, 5.0);
            self.particles.push(Particle { position, velocity, life, size });
        }
    }

    /// Advance cosmetic particles.
    pub fn tick_particles(&mut self, dt: f32) {
        for particle in &mut self.particles {
            particle.position += particle.velocity * dt;
            particle.velocity *= 0.9;
            particle.life -= dt;
        }
        self.particles.retain(|p| p.life > 0.0);
    }

    /// Scatter obstacles over the world, keeping the spawn point clear.
    fn generate_obstacles(&mut self, count: u32) {
        const SPAWN_CLEARANCE: f32 = 250.0;
        const EDGE_MARGIN: f32 = 100.0;
        const ATTEMPTS: u32 = 8;

        let half = self.world.half_extents() - Vec2::splat(EDGE_MARGIN);
        for _ in 0..count {
            for _ in 0..ATTEMPTS {
                let position = Vec2::new(
                    self.rng.next_f32_range(-half.x, half.x),
                    self.rng.next_f32_range(-half.y, half.y),
                );
                if position.length() < SPAWN_CLEARANCE {
                    continue;
                }
                let radius = self.rng.next_f32_range(20.0, 48.0);
                let hp = if self.rng.chance(0.33) { Some(30.0) } else { None };
                let id = self.next_entity_id();
                self.obstacles.push(Obstacle { id, position, radius, hp });
                break;
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
