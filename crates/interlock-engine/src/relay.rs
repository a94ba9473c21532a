//! Relays: armatures driven by coil nodes, observed by contact nodes.
//!
//! A [`Relay`] is not a node. Coils ([`RelayCoil`](crate::node::relay_coil::RelayCoil))
//! power it on and off; the relay moves its armature over simulated time in
//! scheduler ticks; every state change is pushed into the linked relay
//! contacts, which re-route current.
//!
//! The armature position is a value in `[0, 1]`. Below 0.1 the relay is
//! [`Down`](RelayState::Down), above 0.9 it is [`Up`](RelayState::Up), in
//! between it is travelling.

use serde::{Deserialize, Serialize};

use interlock_core::NodeId;

use crate::config::RelayTiming;

// ── Settings ───────────────────────────────────────────────────────

/// Armature behaviour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayType {
    /// Picks up while any coil is powered, drops otherwise.
    #[default]
    Normal,
    /// Coils only accept current entering on the first pole.
    Polarized,
    /// Coils only accept current entering on the second pole.
    PolarizedInverted,
    /// Keeps its position without power; the second coil pulls it down.
    Stabilized,
    /// Bistable with a single bifilar coil routed between its connectors.
    Combinator,
}

impl RelayType {
    /// Whether the armature stays where it is when power is lost.
    pub const fn is_state_independent(self) -> bool {
        matches!(self, RelayType::Stabilized | RelayType::Combinator)
    }
}

/// Persistent description of a relay.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    /// Unique name; coils and contacts refer to the relay by it.
    pub name: String,
    /// Armature behaviour.
    pub relay_type: RelayType,
    /// Rest position of state-independent relays.
    pub normally_up: bool,
    /// Pickup travel override, in milliseconds.
    pub custom_up_ms: Option<u32>,
    /// Drop travel override, in milliseconds.
    pub custom_down_ms: Option<u32>,
}

impl RelaySettings {
    /// A normal relay with default timings.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Same settings with another type.
    pub fn with_type(mut self, relay_type: RelayType) -> Self {
        self.relay_type = relay_type;
        self
    }
}

// ── State ──────────────────────────────────────────────────────────

/// Observable armature state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayState {
    /// Fully up.
    Up,
    /// Fully down.
    Down,
    /// Travelling up.
    GoingUp,
    /// Travelling down.
    GoingDown,
}

/// Direction of armature travel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Travel {
    Up,
    Down,
}

/// What a travel tick did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct TickOutcome {
    /// New state, if it changed.
    pub changed: Option<RelayState>,
    /// Whether another tick must be scheduled.
    pub keep_going: bool,
}

/// A relay and its armature.
#[derive(Clone, Debug)]
pub struct Relay {
    settings: RelaySettings,
    position: f64,
    state: RelayState,
    travel: Option<Travel>,
    delta: f64,
    tick_ms: u64,
    generation: u64,
    active_up: u32,
    active_down: u32,
    coils: Vec<NodeId>,
    contacts: Vec<NodeId>,
}

impl Relay {
    /// A relay at rest.
    pub fn new(settings: RelaySettings) -> Self {
        let up = settings.relay_type.is_state_independent() && settings.normally_up;
        Self {
            settings,
            position: if up { 1.0 } else { 0.0 },
            state: if up { RelayState::Up } else { RelayState::Down },
            travel: None,
            delta: 0.0,
            tick_ms: 0,
            generation: 0,
            active_up: 0,
            active_down: 0,
            coils: Vec::new(),
            contacts: Vec::new(),
        }
    }

    /// Relay name.
    pub fn name(&self) -> &str {
        &self.settings.name
    }

    /// Persistent settings.
    pub fn settings(&self) -> &RelaySettings {
        &self.settings
    }

    /// Armature behaviour.
    pub fn relay_type(&self) -> RelayType {
        self.settings.relay_type
    }

    /// Current state.
    pub fn state(&self) -> RelayState {
        self.state
    }

    /// Armature position in `[0, 1]`.
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Whether the armature is travelling.
    pub fn is_moving(&self) -> bool {
        self.travel.is_some()
    }

    /// Powered coils as `(up, down)`. Only state-independent relays have
    /// down coils.
    pub fn active_coils(&self) -> (u32, u32) {
        (self.active_up, self.active_down)
    }

    /// Coil nodes linked to this relay.
    pub fn coils(&self) -> &[NodeId] {
        &self.coils
    }

    /// Contact nodes linked to this relay.
    pub fn contacts(&self) -> &[NodeId] {
        &self.contacts
    }

    pub(crate) fn link_coil(&mut self, node: NodeId) {
        if !self.coils.contains(&node) {
            self.coils.push(node);
        }
    }

    pub(crate) fn unlink_coil(&mut self, node: NodeId) {
        self.coils.retain(|&n| n != node);
    }

    pub(crate) fn link_contact(&mut self, node: NodeId) {
        if !self.contacts.contains(&node) {
            self.contacts.push(node);
        }
    }

    pub(crate) fn unlink_contact(&mut self, node: NodeId) {
        self.contacts.retain(|&n| n != node);
    }

    // ── Coil power ─────────────────────────────────────────────────

    /// A coil became powered. Returns the travel to start, if any.
    pub(crate) fn power_on(&mut self, second_coil: bool) -> Option<Travel> {
        let had_up = self.active_up > 0;
        let had_down = self.active_down > 0;
        let independent = self.relay_type().is_state_independent();

        if independent && second_coil {
            self.active_down += 1;
        } else {
            self.active_up += 1;
        }

        if !independent {
            return (self.active_up == 1).then_some(Travel::Up);
        }
        if self.active_down == 0 {
            // Up only once the down coil has let go.
            ((had_down || !had_up) && self.active_up > 0).then_some(Travel::Up)
        } else if !had_down {
            Some(Travel::Down)
        } else {
            None
        }
    }

    /// A coil lost power. Returns the travel to start, if any.
    pub(crate) fn power_off(&mut self, second_coil: bool) -> Option<Travel> {
        let had_up = self.active_up > 0;
        let had_down = self.active_down > 0;
        let independent = self.relay_type().is_state_independent();

        if independent && second_coil {
            assert!(self.active_down > 0, "relay {} has no active down coil", self.name());
            self.active_down -= 1;
        } else {
            assert!(self.active_up > 0, "relay {} has no active up coil", self.name());
            self.active_up -= 1;
        }

        if !independent {
            return (self.active_up == 0).then_some(Travel::Down);
        }
        if self.active_down > 0 {
            return (!had_down).then_some(Travel::Down);
        }

        // Stabilized magnets are weaker, so the armature needs more momentum.
        let threshold = match self.relay_type() {
            RelayType::Stabilized => 0.7,
            _ => 0.5,
        };
        if (had_down || !had_up) && (self.active_up > 0 || self.position > 0.5) {
            (self.active_up > 0 || self.position > threshold).then_some(Travel::Up)
        } else if had_up && self.position < threshold {
            Some(Travel::Down)
        } else {
            None
        }
    }

    // ── Travel ─────────────────────────────────────────────────────

    /// Nominal travel time before jitter.
    pub(crate) fn nominal_travel_ms(&self, travel: Travel, timing: &RelayTiming) -> u32 {
        let custom = |ms: Option<u32>, default: u32| ms.filter(|&v| v > 0).unwrap_or(default);
        match (self.relay_type(), travel) {
            (RelayType::Combinator, _) => {
                custom(self.settings.custom_up_ms, timing.default_combinator_ms)
            }
            (_, Travel::Up) => custom(self.settings.custom_up_ms, timing.default_up_ms),
            (_, Travel::Down) => custom(self.settings.custom_down_ms, timing.default_down_ms),
        }
    }

    /// Start travelling for `total_ms`. Returns the tick interval and the
    /// generation tag the ticks must carry.
    pub(crate) fn begin_travel(&mut self, travel: Travel, total_ms: u32) -> (u64, u64) {
        let total = total_ms.max(1);
        let tick_ms = (total / 10).clamp(20, 200);
        self.delta = f64::from(tick_ms) / f64::from(total);
        self.tick_ms = u64::from(tick_ms);
        self.travel = Some(travel);
        self.generation += 1;
        (self.tick_ms, self.generation)
    }

    /// Interval between ticks of the current travel.
    pub(crate) fn tick_interval(&self) -> u64 {
        self.tick_ms
    }

    /// Tag of the current travel.
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Advance the armature one step. `None` if the tick is stale.
    pub(crate) fn tick(&mut self, generation: u64) -> Option<TickOutcome> {
        if generation != self.generation {
            return None;
        }
        let travel = self.travel?;
        let target = match travel {
            Travel::Up => self.position + self.delta,
            Travel::Down => self.position - self.delta,
        };
        let finished = !(0.0..=1.0).contains(&target);
        if finished {
            self.travel = None;
        }
        let changed = self.set_position(target);
        Some(TickOutcome {
            changed,
            keep_going: !finished,
        })
    }

    fn set_position(&mut self, position: f64) -> Option<RelayState> {
        let position = position.clamp(0.0, 1.0);
        if (position - self.position).abs() < 1e-9 {
            self.position = position;
            return None;
        }
        let rising = position > self.position;
        self.position = position;
        let state = if position < 0.1 {
            RelayState::Down
        } else if position > 0.9 {
            RelayState::Up
        } else if rising {
            RelayState::GoingUp
        } else {
            RelayState::GoingDown
        };
        if state == self.state {
            return None;
        }
        self.state = state;
        Some(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_to_rest(relay: &mut Relay, travel: Travel, total_ms: u32) -> Vec<RelayState> {
        let (_, generation) = relay.begin_travel(travel, total_ms);
        let mut seen = Vec::new();
        for _ in 0..100 {
            let out = relay.tick(generation).expect("current generation");
            seen.extend(out.changed);
            if !out.keep_going {
                break;
            }
        }
        seen
    }

    #[test]
    fn normal_relay_picks_up_on_first_coil_only() {
        let mut r = Relay::new(RelaySettings::named("R1"));
        assert_eq!(r.power_on(false), Some(Travel::Up));
        assert_eq!(r.power_on(false), None);
        assert_eq!(r.power_off(false), None);
        assert_eq!(r.power_off(false), Some(Travel::Down));
    }

    #[test]
    fn armature_reaches_up_through_going_up() {
        let mut r = Relay::new(RelaySettings::named("R1"));
        let states = run_to_rest(&mut r, Travel::Up, 700);
        assert_eq!(states.first(), Some(&RelayState::GoingUp));
        assert_eq!(states.last(), Some(&RelayState::Up));
        assert_eq!(r.position(), 1.0);
        assert!(!r.is_moving());
    }

    #[test]
    fn tick_interval_is_clamped() {
        let mut r = Relay::new(RelaySettings::named("R1"));
        assert_eq!(r.begin_travel(Travel::Up, 50).0, 20);
        assert_eq!(r.begin_travel(Travel::Up, 700).0, 70);
        assert_eq!(r.begin_travel(Travel::Up, 5000).0, 200);
    }

    #[test]
    fn stale_ticks_are_ignored() {
        let mut r = Relay::new(RelaySettings::named("R1"));
        let (_, old) = r.begin_travel(Travel::Up, 700);
        let (_, new) = r.begin_travel(Travel::Down, 200);
        assert!(r.tick(old).is_none());
        assert!(r.tick(new).is_some());
    }

    #[test]
    fn stabilized_down_coil_wins() {
        let settings = RelaySettings::named("S").with_type(RelayType::Stabilized);
        let mut r = Relay::new(settings);
        assert_eq!(r.power_on(false), Some(Travel::Up));
        assert_eq!(r.power_on(true), Some(Travel::Down));
        // Down coil released while the up coil still holds.
        assert_eq!(r.power_off(true), Some(Travel::Up));
    }

    #[test]
    fn stabilized_holds_position_without_power() {
        let settings = RelaySettings::named("S").with_type(RelayType::Stabilized);
        let mut r = Relay::new(settings);
        r.power_on(false);
        run_to_rest(&mut r, Travel::Up, 700);
        assert_eq!(r.state(), RelayState::Up);
        assert_eq!(r.power_off(false), None);
    }

    #[test]
    fn normally_up_only_applies_to_state_independent_types() {
        let mut settings = RelaySettings::named("N");
        settings.normally_up = true;
        assert_eq!(Relay::new(settings.clone()).state(), RelayState::Down);
        let stabilized = Relay::new(settings.with_type(RelayType::Stabilized));
        assert_eq!(stabilized.state(), RelayState::Up);
        assert_eq!(stabilized.position(), 1.0);
    }

    #[test]
    fn nominal_travel_uses_overrides_and_defaults() {
        let timing = RelayTiming::default();
        let mut settings = RelaySettings::named("R");
        settings.custom_down_ms = Some(300);
        let r = Relay::new(settings.clone());
        assert_eq!(r.nominal_travel_ms(Travel::Up, &timing), 700);
        assert_eq!(r.nominal_travel_ms(Travel::Down, &timing), 300);
        let c = Relay::new(settings.with_type(RelayType::Combinator));
        assert_eq!(c.nominal_travel_ms(Travel::Down, &timing), 500);
    }

    #[test]
    #[should_panic(expected = "no active up coil")]
    fn power_off_without_power_on_panics() {
        let mut r = Relay::new(RelaySettings::named("R1"));
        r.power_off(false);
    }
}
