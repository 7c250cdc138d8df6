// src/gesture.rs - Tap/hold sequence that secretly selects a card
//
// suit tap (quadrant) -> comparison tap (left/right half) -> hold while
// counting haptic pulses -> release reveals the card.
use crate::card::{Card, Rank, Suit};
use crate::config::GestureConfig;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Rank used when the hold is released before any pulse or never happens.
pub const PIVOT_RANK: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingSuit,
    AwaitingComparison,
    AwaitingMagnitude,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Press,
    Release,
}

/// Pointer event with coordinates relative to the control surface's top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub x: f32,
    pub y: f32,
}

impl PointerEvent {
    pub fn press(x: f32, y: f32) -> Self {
        Self { kind: PointerKind::Press, x, y }
    }

    pub fn release(x: f32, y: f32) -> Self {
        Self { kind: PointerKind::Release, x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub width: f32,
    pub height: f32,
}

impl Surface {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// A coordinate exactly on a midpoint belongs to the right / bottom side.
    pub fn suit_at(&self, x: f32, y: f32) -> Suit {
        let left = x < self.width / 2.0;
        let top = y < self.height / 2.0;
        match (top, left) {
            (true, true) => Suit::Hearts,
            (true, false) => Suit::Diamonds,
            (false, true) => Suit::Clubs,
            (false, false) => Suit::Spades,
        }
    }

    pub fn is_right_half(&self, x: f32) -> bool {
        x >= self.width / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEffect {
    /// First interaction of the run; the overlay starts drawing.
    OverlayActivated,
    Pulse(Duration),
    Reveal(Card),
}

#[derive(Debug, Clone, Copy)]
struct PulseTimer {
    next_due: Instant,
}

/// Maps the pulse count to a rank: no pulses is the pivot, otherwise the
/// count itself or the count above the pivot.
pub fn rank_for(pulses: u32, is_major: bool) -> Rank {
    let value = match (pulses, is_major) {
        (0, _) => PIVOT_RANK,
        (n, false) => n,
        (n, true) => n + PIVOT_RANK,
    };
    Rank::clamped(value)
}

/// The whole gesture protocol. Owns its timers: at most one pulse train and
/// one fallback deadline exist, and arming either cancels the other.
pub struct GestureSession {
    config: GestureConfig,
    phase: Phase,
    suit: Suit,
    is_major: bool,
    pulse_count: u32,
    overlay_active: bool,
    pulse_timer: Option<PulseTimer>,
    fallback_deadline: Option<Instant>,
}

impl GestureSession {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            phase: Phase::AwaitingSuit,
            suit: Suit::Hearts,
            is_major: false,
            pulse_count: 0,
            overlay_active: false,
            pulse_timer: None,
            fallback_deadline: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn overlay_active(&self) -> bool {
        self.overlay_active
    }

    pub fn pulse_count(&self) -> u32 {
        self.pulse_count
    }

    pub fn is_pulsing(&self) -> bool {
        self.pulse_timer.is_some()
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback_deadline.is_some()
    }

    /// Earliest pending timer, for scheduling the next wake-up.
    pub fn next_deadline(&self) -> Option<Instant> {
        let pulse = self.pulse_timer.map(|t| t.next_due);
        match (pulse, self.fallback_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Fires every timer that is due at `now`.
    pub fn tick(&mut self, now: Instant) -> Vec<GestureEffect> {
        let mut effects = Vec::new();

        while let Some(timer) = self.pulse_timer {
            if now < timer.next_due {
                break;
            }
            self.pulse_count += 1;
            effects.push(GestureEffect::Pulse(self.config.pulse_duration()));
            debug!(count = self.pulse_count, "Pulse");

            if self.pulse_count >= self.config.max_pulses {
                self.pulse_timer = None;
            } else {
                self.pulse_timer = Some(PulseTimer {
                    next_due: timer.next_due + self.config.pulse_period(),
                });
            }
        }

        if let Some(deadline) = self.fallback_deadline {
            if now >= deadline && self.phase == Phase::AwaitingMagnitude {
                debug!("No hold before fallback deadline");
                effects.push(self.reveal(Rank::clamped(PIVOT_RANK)));
            }
        }

        effects
    }

    /// Feeds one pointer event. Timers due before `now` fire first.
    pub fn handle_pointer(&mut self, event: PointerEvent, surface: Surface, now: Instant) -> Vec<GestureEffect> {
        let mut effects = self.tick(now);

        match (self.phase, event.kind) {
            (Phase::AwaitingSuit, PointerKind::Release) => {
                self.cancel_timers();
                if !self.overlay_active {
                    self.overlay_active = true;
                    effects.push(GestureEffect::OverlayActivated);
                }
                self.suit = surface.suit_at(event.x, event.y);
                self.phase = Phase::AwaitingComparison;
                debug!(suit = ?self.suit, "Suit selected");
            }
            (Phase::AwaitingComparison, PointerKind::Release) => {
                self.is_major = surface.is_right_half(event.x);
                self.phase = Phase::AwaitingMagnitude;
                self.arm_fallback(now);
                debug!(is_major = self.is_major, "Comparison selected");
            }
            (Phase::AwaitingMagnitude, PointerKind::Press) => {
                self.pulse_count = 0;
                self.arm_pulses(now);
            }
            (Phase::AwaitingMagnitude, PointerKind::Release) if self.pulse_timer.is_some() || self.fallback_deadline.is_none() => {
                let rank = rank_for(self.pulse_count, self.is_major);
                effects.push(self.reveal(rank));
            }
            // out of order for the current phase
            _ => {}
        }

        effects
    }

    fn arm_fallback(&mut self, now: Instant) {
        self.pulse_timer = None;
        self.fallback_deadline = Some(now + self.config.fallback_delay());
    }

    fn arm_pulses(&mut self, now: Instant) {
        self.fallback_deadline = None;
        self.pulse_timer = Some(PulseTimer {
            next_due: now + self.config.pulse_period(),
        });
    }

    fn cancel_timers(&mut self) {
        self.pulse_timer = None;
        self.fallback_deadline = None;
    }

    fn reveal(&mut self, rank: Rank) -> GestureEffect {
        self.cancel_timers();
        self.phase = Phase::AwaitingSuit;
        let card = Card::new(rank, self.suit);
        info!(%card, "Card revealed");
        GestureEffect::Reveal(card)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface() -> Surface {
        Surface::new(200.0, 100.0)
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn reveals(effects: &[GestureEffect]) -> Vec<Card> {
        effects
            .iter()
            .filter_map(|e| match e {
                GestureEffect::Reveal(card) => Some(*card),
                _ => None,
            })
            .collect()
    }

    fn pulses(effects: &[GestureEffect]) -> usize {
        effects
            .iter()
            .filter(|e| matches!(e, GestureEffect::Pulse(_)))
            .count()
    }

    /// Suit tap, comparison tap, press, hold for `hold`, release.
    fn perform(session: &mut GestureSession, base: Instant, suit: (f32, f32), major: bool, hold: Duration) -> Vec<GestureEffect> {
        let s = surface();
        let mut effects = session.handle_pointer(PointerEvent::release(suit.0, suit.1), s, base);
        let x = if major { 150.0 } else { 50.0 };
        effects.extend(session.handle_pointer(PointerEvent::release(x, 50.0), s, base + ms(100)));
        effects.extend(session.handle_pointer(PointerEvent::press(x, 50.0), s, base + ms(200)));
        effects.extend(session.handle_pointer(PointerEvent::release(x, 50.0), s, base + ms(200) + hold));
        effects
    }

    #[test]
    fn quadrants_map_to_each_suit() {
        let s = surface();
        assert_eq!(s.suit_at(10.0, 10.0), Suit::Hearts);
        assert_eq!(s.suit_at(190.0, 10.0), Suit::Diamonds);
        assert_eq!(s.suit_at(10.0, 90.0), Suit::Clubs);
        assert_eq!(s.suit_at(190.0, 90.0), Suit::Spades);
        // exact midpoint belongs to the bottom-right
        assert_eq!(s.suit_at(100.0, 50.0), Suit::Spades);
        assert_eq!(s.suit_at(99.9, 49.9), Suit::Hearts);
        assert!(s.is_right_half(100.0));
        assert!(!s.is_right_half(99.9));
    }

    #[test]
    fn quadrant_interiors_are_constant() {
        let s = surface();
        for i in 0..10 {
            for j in 0..10 {
                let x = 1.0 + i as f32 * 9.8;
                let y = 1.0 + j as f32 * 4.8;
                assert_eq!(s.suit_at(x, y), Suit::Hearts);
                assert_eq!(s.suit_at(x + 100.0, y), Suit::Diamonds);
                assert_eq!(s.suit_at(x, y + 50.0), Suit::Clubs);
                assert_eq!(s.suit_at(x + 100.0, y + 50.0), Suit::Spades);
            }
        }
    }

    #[test]
    fn rank_mapping() {
        assert_eq!(rank_for(0, false), Rank::Seven);
        assert_eq!(rank_for(0, true), Rank::Seven);
        assert_eq!(rank_for(1, false), Rank::Ace);
        assert_eq!(rank_for(6, false), Rank::Six);
        assert_eq!(rank_for(1, true), Rank::Eight);
        assert_eq!(rank_for(6, true), Rank::King);
        assert_eq!(rank_for(9, true), Rank::King);
    }

    #[test]
    fn every_pulse_count_reveals_expected_rank() {
        for major in [false, true] {
            for n in 0..=6u64 {
                let mut session = GestureSession::new(GestureConfig::default());
                let base = Instant::now();
                // release halfway between pulse n and n + 1
                let hold = ms(300 * n + 150);
                let effects = perform(&mut session, base, (10.0, 10.0), major, hold);

                let expected = match (n, major) {
                    (0, _) => 7,
                    (n, false) => n as u8,
                    (n, true) => n as u8 + 7,
                };
                assert_eq!(pulses(&effects), n as usize);
                assert_eq!(
                    reveals(&effects),
                    vec![Card::new(Rank::from_value(expected).unwrap(), Suit::Hearts)]
                );
                assert_eq!(session.phase(), Phase::AwaitingSuit);
                assert!(session.next_deadline().is_none());
            }
        }
    }

    #[test]
    fn pulses_stop_at_cap() {
        let mut session = GestureSession::new(GestureConfig::default());
        let base = Instant::now();
        let effects = perform(&mut session, base, (190.0, 90.0), true, ms(10_000));
        assert_eq!(pulses(&effects), 6);
        assert_eq!(reveals(&effects), vec![Card::new(Rank::King, Suit::Spades)]);
    }

    #[test]
    fn first_interaction_activates_overlay_once() {
        let mut session = GestureSession::new(GestureConfig::default());
        let base = Instant::now();
        assert!(!session.overlay_active());

        let first = perform(&mut session, base, (10.0, 90.0), false, ms(0));
        assert_eq!(first[0], GestureEffect::OverlayActivated);
        assert!(session.overlay_active());

        let second = perform(&mut session, base + ms(5_000), (10.0, 90.0), false, ms(0));
        assert!(!second.contains(&GestureEffect::OverlayActivated));
        assert_eq!(reveals(&second), vec![Card::new(Rank::Seven, Suit::Clubs)]);
    }

    #[test]
    fn fallback_reveals_seven_without_hold() {
        let mut session = GestureSession::new(GestureConfig::default());
        let s = surface();
        let base = Instant::now();

        session.handle_pointer(PointerEvent::release(190.0, 10.0), s, base);
        session.handle_pointer(PointerEvent::release(150.0, 50.0), s, base);
        assert_eq!(session.phase(), Phase::AwaitingMagnitude);
        assert_eq!(session.next_deadline(), Some(base + ms(1200)));

        assert!(session.tick(base + ms(1199)).is_empty());
        let effects = session.tick(base + ms(1200));
        assert_eq!(effects, vec![GestureEffect::Reveal(Card::new(Rank::Seven, Suit::Diamonds))]);
        assert_eq!(session.phase(), Phase::AwaitingSuit);
        assert!(session.tick(base + ms(5000)).is_empty());
    }

    #[test]
    fn late_event_sees_fallback_first() {
        let mut session = GestureSession::new(GestureConfig::default());
        let s = surface();
        let base = Instant::now();

        session.handle_pointer(PointerEvent::release(10.0, 10.0), s, base);
        session.handle_pointer(PointerEvent::release(10.0, 50.0), s, base);
        // the press arrives after the deadline, so it lands in the new cycle as a no-op
        let effects = session.handle_pointer(PointerEvent::press(10.0, 50.0), s, base + ms(1500));
        assert_eq!(reveals(&effects), vec![Card::new(Rank::Seven, Suit::Hearts)]);
        assert_eq!(session.phase(), Phase::AwaitingSuit);
        assert!(!session.is_pulsing());
    }

    #[test]
    fn press_cancels_fallback_and_timers_never_overlap() {
        let mut session = GestureSession::new(GestureConfig::default());
        let s = surface();
        let base = Instant::now();

        session.handle_pointer(PointerEvent::release(10.0, 10.0), s, base);
        session.handle_pointer(PointerEvent::release(10.0, 50.0), s, base);
        assert!(session.has_fallback() && !session.is_pulsing());

        session.handle_pointer(PointerEvent::press(10.0, 50.0), s, base + ms(100));
        assert!(!session.has_fallback() && session.is_pulsing());

        // a second press restarts the same train instead of adding one
        let effects = session.handle_pointer(PointerEvent::press(10.0, 50.0), s, base + ms(500));
        assert_eq!(pulses(&effects), 1);
        assert_eq!(session.pulse_count(), 0);
        assert_eq!(session.next_deadline(), Some(base + ms(800)));

        // well past the old fallback deadline: only pulses fire
        let effects = session.tick(base + ms(1300));
        assert_eq!(pulses(&effects), 2);
        assert!(reveals(&effects).is_empty());
    }

    #[test]
    fn out_of_order_events_are_ignored() {
        let mut session = GestureSession::new(GestureConfig::default());
        let s = surface();
        let base = Instant::now();

        assert!(session.handle_pointer(PointerEvent::press(10.0, 10.0), s, base).is_empty());
        assert_eq!(session.phase(), Phase::AwaitingSuit);

        session.handle_pointer(PointerEvent::release(10.0, 10.0), s, base);
        assert!(session.handle_pointer(PointerEvent::press(10.0, 10.0), s, base).is_empty());
        assert_eq!(session.phase(), Phase::AwaitingComparison);

        // release before any press while the fallback is pending
        session.handle_pointer(PointerEvent::release(10.0, 50.0), s, base);
        assert!(session.handle_pointer(PointerEvent::release(10.0, 50.0), s, base + ms(10)).is_empty());
        assert_eq!(session.phase(), Phase::AwaitingMagnitude);
        assert!(session.has_fallback());
    }
}
