//! The simulated mining competition.
//!
//! One block is "current" at any time. Every visitor mining right now is
//! registered in it, the pool's combined hash rate drives a per-poll
//! discovery roll, and a weighted pick over the registered miners decides
//! who found the block. Session anchors live in the [`Store`] so an
//! interrupted session is reconstructed from wall-clock time on the next
//! poll rather than replayed.
//!
//! Operations take an explicit `now` (epoch seconds), computed once per
//! reconciler tick, so every read and write within a tick observes the
//! same instant and tests never sleep.

use rand::Rng;
use rand::rngs::StdRng;

use crate::store::{Store, keys};

pub const BASE_SESSION_SECS: i64 = 2 * 60 * 60;
const BLOCK_TIME_SECS: i64 = 60;
const NEW_BLOCK_DELAY_SECS: i64 = 5;
const BASE_DIFFICULTY: f64 = 23.2;
const DIFFICULTY_PER_MINER: f64 = 0.1;
const BASE_BLOCK_REWARD: u64 = 100;
const MIN_BLOCK_REWARD: u64 = 10;
pub const STARTING_HASH_RATE: u64 = 1;
pub const ANONYMOUS_USER: &str = "anonymous";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStatus {
    Mining,
    Mined,
}

#[derive(Debug, Clone)]
pub struct MinerSlot {
    pub user_id: String,
    pub hash_rate: u64,
    pub start_time: i64,
    pub shares: u64,
}

#[derive(Debug)]
struct Block {
    height: u64,
    difficulty: f64,
    start_time: i64,
    // Insertion order matters: the weighted pick walks miners in the
    // order they registered.
    miners: Vec<MinerSlot>,
    total_hash_rate: u64,
    status: BlockStatus,
    mined_by: Option<String>,
    reward: u64,
}

impl Block {
    fn fresh(height: u64, now: i64) -> Self {
        Self {
            height,
            difficulty: BASE_DIFFICULTY,
            start_time: now,
            miners: Vec::new(),
            total_hash_rate: 0,
            status: BlockStatus::Mining,
            mined_by: None,
            reward: 0,
        }
    }

    fn miner(&self, user_id: &str) -> Option<&MinerSlot> {
        self.miners.iter().find(|m| m.user_id == user_id)
    }

    fn miner_mut(&mut self, user_id: &str) -> Option<&mut MinerSlot> {
        self.miners.iter_mut().find(|m| m.user_id == user_id)
    }

    fn recompute_total(&mut self) {
        self.total_hash_rate = self.miners.iter().map(|m| m.hash_rate).sum();
    }
}

/// What a single miner sees after a poll. A pending discovery shows up in
/// the snapshot (`mined_by`, `reward`) and is credited by the reconciler
/// on the block transition.
#[derive(Debug, Clone)]
pub struct MinerState {
    pub active: bool,
    pub earned: u64,
    pub time_left: i64,
    pub block: BlockSnapshot,
}

#[derive(Debug, Clone)]
pub struct BlockSnapshot {
    pub height: u64,
    pub difficulty: f64,
    pub reward: u64,
    pub online: usize,
    pub status: BlockStatus,
    pub mined_by: Option<String>,
    pub time_left: i64,
    pub total_hash_rate: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionProgress {
    pub active: bool,
    pub progress: f64,
    pub time_left: i64,
    pub total: i64,
}

pub struct Engine {
    block: Block,
    /// Logical-time deadline for the mined block to be replaced. Checked
    /// whenever an operation observes `now`, so the transition cannot be
    /// lost to a cancelled timer.
    next_block_at: Option<i64>,
    rng: StdRng,
}

impl Engine {
    pub fn new(rng: StdRng, now: i64) -> Self {
        Self {
            block: Block::fresh(1, now),
            next_block_at: None,
            rng,
        }
    }

    /// Starts (or restarts) the user's mining session and registers them
    /// in the current block. Registration is idempotent per block: one
    /// slot and one difficulty bump per user, but the session anchor is
    /// always reset. New slots open at the base hash rate; the next poll
    /// syncs the real one.
    pub fn start_session(
        &mut self,
        store: &mut Store,
        duration_bonus: i64,
        user_id: &str,
        now: i64,
    ) -> (i64, i64) {
        self.advance(now);

        let duration = BASE_SESSION_SECS + duration_bonus.max(0);
        store.set(keys::MINING_START, now);
        store.set(keys::MINING_DURATION, duration);
        store.set(keys::USER_ID, user_id);

        if self.block.miner(user_id).is_none() {
            self.block.miners.push(MinerSlot {
                user_id: user_id.to_string(),
                hash_rate: STARTING_HASH_RATE,
                start_time: now,
                shares: 0,
            });
            self.block.recompute_total();
            self.block.difficulty = round1(
                BASE_DIFFICULTY + DIFFICULTY_PER_MINER * self.block.miners.len() as f64,
            );
        }

        (now, duration)
    }

    /// Clears the session anchor. The user stays registered in the block;
    /// they stop earning session income but keep competing for it.
    pub fn stop_session(&self, store: &mut Store) {
        store.remove(keys::MINING_START);
        store.remove(keys::MINING_DURATION);
    }

    /// Overwrites a registered miner's hash rate. No-op for users never
    /// registered in the current block.
    pub fn set_miner_hash_rate(&mut self, user_id: &str, hash_rate: u64) {
        if let Some(miner) = self.block.miner_mut(user_id) {
            miner.hash_rate = hash_rate;
            self.block.recompute_total();
        }
    }

    /// One reconciliation step for a miner: syncs their hash rate into the
    /// block, rolls the discovery check, reads the session anchor and
    /// settles it if it expired. Expiry settles exactly once; the anchor
    /// is cleared on that transition and later polls earn zero.
    pub fn poll_miner(
        &mut self,
        store: &mut Store,
        hash_rate: u64,
        user_id: &str,
        now: i64,
    ) -> MinerState {
        self.advance(now);

        if let Some(miner) = self.block.miner_mut(user_id) {
            miner.hash_rate = hash_rate;
            self.block.recompute_total();
        }

        if self.block.status == BlockStatus::Mining {
            self.check_discovery(now);
        }

        let Some((start, duration)) = read_anchor(store) else {
            return MinerState {
                active: false,
                earned: 0,
                time_left: 0,
                block: self.block_snapshot(now),
            };
        };

        let end = start + duration;
        if now >= end {
            self.stop_session(store);
            return MinerState {
                active: false,
                earned: hash_rate * duration.max(0) as u64,
                time_left: 0,
                block: self.block_snapshot(now),
            };
        }

        if self.block.status == BlockStatus::Mining {
            if let Some(miner) = self.block.miner_mut(user_id) {
                miner.shares += hash_rate;
            }
        }

        MinerState {
            active: true,
            earned: hash_rate * (now - start).max(0) as u64,
            time_left: end - now,
            block: self.block_snapshot(now),
        }
    }

    pub fn block_snapshot(&self, now: i64) -> BlockSnapshot {
        BlockSnapshot {
            height: self.block.height,
            difficulty: self.block.difficulty,
            reward: self.block.reward,
            online: self.block.miners.len(),
            status: self.block.status,
            mined_by: self.block.mined_by.clone(),
            time_left: (BLOCK_TIME_SECS - (now - self.block.start_time)).max(0),
            total_hash_rate: self.block.total_hash_rate,
        }
    }

    /// Miners registered in the current block, in registration order.
    pub fn miners(&self) -> &[MinerSlot] {
        &self.block.miners
    }

    pub fn session_progress(&self, store: &Store, now: i64) -> SessionProgress {
        let Some((start, duration)) = read_anchor(store) else {
            return SessionProgress {
                active: false,
                progress: 0.0,
                time_left: 0,
                total: 0,
            };
        };
        let time_left = (start + duration - now).max(0);
        let progress = if duration > 0 {
            ((duration - time_left) as f64 / duration as f64 * 100.0).min(100.0)
        } else {
            0.0
        };
        SessionProgress {
            active: time_left > 0,
            progress,
            time_left,
            total: duration,
        }
    }

    /// Wipes the profile and restarts the simulation at block #1.
    pub fn reset(&mut self, store: &mut Store, now: i64) {
        store.clear();
        self.block = Block::fresh(1, now);
        self.next_block_at = None;
    }

    fn advance(&mut self, now: i64) {
        if let Some(at) = self.next_block_at {
            if now >= at {
                self.block = Block::fresh(self.block.height + 1, now);
                self.next_block_at = None;
            }
        }
    }

    fn check_discovery(&mut self, now: i64) {
        let elapsed = (now - self.block.start_time).max(0) as f64;
        let find_chance =
            self.block.total_hash_rate as f64 * elapsed / (self.block.difficulty * 100.0);
        if self.rng.gen_range(0.0..1.0) >= find_chance / 1000.0 {
            return;
        }

        let Some(winner) = weighted_pick(&self.block.miners, &mut self.rng) else {
            return;
        };
        self.block.mined_by = Some(self.block.miners[winner].user_id.clone());
        self.block.status = BlockStatus::Mined;
        self.block.reward = block_reward(self.block.difficulty, self.block.miners.len());
        self.next_block_at = Some(now + NEW_BLOCK_DELAY_SECS);
    }
}

fn read_anchor(store: &Store) -> Option<(i64, i64)> {
    let start = store.get_i64(keys::MINING_START)?;
    let duration = store.get_i64(keys::MINING_DURATION)?;
    Some((start, duration))
}

/// Weighted reservoir pick: walk the miners in registration order,
/// subtracting each hash rate from a uniform threshold; the miner that
/// drives it to zero or below wins.
fn weighted_pick(miners: &[MinerSlot], rng: &mut StdRng) -> Option<usize> {
    let total: f64 = miners.iter().map(|m| m.hash_rate as f64).sum();
    if total <= 0.0 {
        return None;
    }
    let mut threshold = rng.gen_range(0.0..total);
    for (idx, miner) in miners.iter().enumerate() {
        threshold -= miner.hash_rate as f64;
        if threshold <= 0.0 {
            return Some(idx);
        }
    }
    // Floating-point slop can leave a sliver above zero; the last miner
    // absorbs it.
    Some(miners.len() - 1)
}

fn block_reward(difficulty: f64, miner_count: usize) -> u64 {
    let count = miner_count.max(1) as f64;
    let reward = (BASE_BLOCK_REWARD as f64 * (difficulty / BASE_DIFFICULTY) / count).floor();
    (reward as u64).max(MIN_BLOCK_REWARD)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    const T0: i64 = 1_700_000_000;

    fn engine(seed: u64) -> Engine {
        Engine::new(StdRng::seed_from_u64(seed), T0)
    }

    fn slot(user_id: &str, hash_rate: u64) -> MinerSlot {
        MinerSlot {
            user_id: user_id.to_string(),
            hash_rate,
            start_time: T0,
            shares: 0,
        }
    }

    #[test]
    fn ten_seconds_of_mining() {
        let mut engine = engine(3);
        let mut store = Store::in_memory();
        engine.start_session(&mut store, 0, "alice", T0);

        let state = engine.poll_miner(&mut store, 2, "alice", T0 + 10);
        assert!(state.active);
        assert_eq!(state.earned, 20);
        assert_eq!(state.time_left, 7190);
        assert_eq!(state.block.online, 1);
    }

    #[test]
    fn registration_is_idempotent_per_block() {
        let mut engine = engine(3);
        let mut store = Store::in_memory();
        engine.start_session(&mut store, 0, "alice", T0);
        engine.start_session(&mut store, 0, "alice", T0 + 5);

        let snapshot = engine.block_snapshot(T0 + 5);
        assert_eq!(snapshot.online, 1);
        assert_eq!(snapshot.difficulty, 23.3);
        assert_eq!(snapshot.total_hash_rate, 1);

        // The anchor was reset by the second start.
        let state = engine.poll_miner(&mut store, 1, "alice", T0 + 15);
        assert_eq!(state.earned, 10);
    }

    #[test]
    fn each_distinct_miner_bumps_difficulty() {
        let mut engine = engine(3);
        let mut store = Store::in_memory();
        engine.start_session(&mut store, 0, "alice", T0);
        engine.start_session(&mut store, 0, "bob", T0);
        assert_eq!(engine.block_snapshot(T0).difficulty, 23.4);
        assert_eq!(engine.block_snapshot(T0).online, 2);
    }

    #[test]
    fn session_expiry_settles_exactly_once() {
        let mut engine = engine(1);
        let mut store = Store::in_memory();
        engine.start_session(&mut store, 0, "alice", T0);

        let settled = engine.poll_miner(&mut store, 3, "alice", T0 + BASE_SESSION_SECS);
        assert!(!settled.active);
        assert_eq!(settled.earned, 3 * BASE_SESSION_SECS as u64);
        assert_eq!(settled.time_left, 0);

        let after = engine.poll_miner(&mut store, 3, "alice", T0 + BASE_SESSION_SECS + 1);
        assert!(!after.active);
        assert_eq!(after.earned, 0);
    }

    #[test]
    fn duration_bonus_extends_the_anchor() {
        let mut engine = engine(3);
        let mut store = Store::in_memory();
        let (_, duration) = engine.start_session(&mut store, 7200, "alice", T0);
        assert_eq!(duration, 14_400);

        let state = engine.poll_miner(&mut store, 1, "alice", T0 + 7200);
        assert!(state.active);
        assert_eq!(state.time_left, 7200);
    }

    #[test]
    fn stop_clears_the_anchor_but_not_the_slot() {
        let mut engine = engine(3);
        let mut store = Store::in_memory();
        engine.start_session(&mut store, 0, "alice", T0);
        engine.stop_session(&mut store);

        let state = engine.poll_miner(&mut store, 2, "alice", T0 + 10);
        assert!(!state.active);
        assert_eq!(state.earned, 0);
        assert_eq!(state.block.online, 1);
    }

    #[test]
    fn hash_rate_updates_only_registered_miners() {
        let mut engine = engine(3);
        let mut store = Store::in_memory();
        engine.start_session(&mut store, 0, "alice", T0);

        engine.set_miner_hash_rate("alice", 5);
        assert_eq!(engine.block_snapshot(T0).total_hash_rate, 5);

        engine.set_miner_hash_rate("ghost", 50);
        assert_eq!(engine.block_snapshot(T0).total_hash_rate, 5);
    }

    #[test]
    fn shares_accumulate_while_block_is_mining() {
        let mut engine = engine(3);
        let mut store = Store::in_memory();
        engine.start_session(&mut store, 0, "alice", T0);

        engine.poll_miner(&mut store, 2, "alice", T0 + 1);
        engine.poll_miner(&mut store, 2, "alice", T0 + 2);
        let slot = &engine.miners()[0];
        assert_eq!(slot.hash_rate, 2);
        assert_eq!(slot.shares, 4);
    }

    #[test]
    fn overwhelming_hash_rate_finds_the_block() {
        let mut engine = engine(7);
        let mut store = Store::in_memory();
        engine.start_session(&mut store, 0, "solo", T0);

        // find_chance / 1000 > 1 here, so the roll always lands.
        let state = engine.poll_miner(&mut store, 1000, "solo", T0 + 3000);
        assert_eq!(state.block.status, BlockStatus::Mined);
        assert_eq!(state.block.mined_by.as_deref(), Some("solo"));
        // floor(100 × 23.3 / 23.2 / 1) = 100
        assert_eq!(state.block.reward, 100);
    }

    #[test]
    fn mined_block_rolls_over_after_the_delay() {
        let mut engine = engine(7);
        let mut store = Store::in_memory();
        engine.start_session(&mut store, 0, "solo", T0);
        engine.poll_miner(&mut store, 1000, "solo", T0 + 3000);

        // One second before the deadline nothing moves.
        let held = engine.poll_miner(&mut store, 1000, "solo", T0 + 3004);
        assert_eq!(held.block.height, 1);
        assert_eq!(held.block.status, BlockStatus::Mined);

        let rolled = engine.poll_miner(&mut store, 1000, "solo", T0 + 3005);
        assert_eq!(rolled.block.height, 2);
        assert_eq!(rolled.block.status, BlockStatus::Mining);
        assert_eq!(rolled.block.online, 0);
        assert_eq!(rolled.block.reward, 0);
        assert_eq!(rolled.block.difficulty, BASE_DIFFICULTY);
    }

    #[test]
    fn reward_never_drops_below_the_floor() {
        assert_eq!(block_reward(23.2, 20), MIN_BLOCK_REWARD);
        assert_eq!(block_reward(23.4, 2), 50);
        assert_eq!(block_reward(23.2, 0), 100);
    }

    #[test]
    fn weighted_pick_is_proportional() {
        let miners = vec![slot("light", 1), slot("heavy", 3)];
        let mut rng = StdRng::seed_from_u64(42);
        let mut wins = [0u32; 2];
        for _ in 0..10_000 {
            wins[weighted_pick(&miners, &mut rng).unwrap()] += 1;
        }
        let ratio = wins[1] as f64 / wins[0] as f64;
        assert!((2.6..3.4).contains(&ratio), "ratio {}", ratio);
    }

    #[test]
    fn weighted_pick_needs_weight() {
        let mut rng = StdRng::seed_from_u64(42);
        assert_eq!(weighted_pick(&[], &mut rng), None);
        assert_eq!(weighted_pick(&[slot("idle", 0)], &mut rng), None);
    }

    #[test]
    fn block_countdown_clamps_at_zero() {
        let engine = engine(3);
        assert_eq!(engine.block_snapshot(T0 + 10).time_left, 50);
        assert_eq!(engine.block_snapshot(T0 + 70).time_left, 0);
    }

    #[test]
    fn progress_tracks_the_anchor() {
        let mut engine = engine(3);
        let mut store = Store::in_memory();

        let idle = engine.session_progress(&store, T0);
        assert!(!idle.active);
        assert_eq!(idle.progress, 0.0);

        engine.start_session(&mut store, 0, "alice", T0);
        let halfway = engine.session_progress(&store, T0 + 3600);
        assert!(halfway.active);
        assert_eq!(halfway.time_left, 3600);
        assert!((halfway.progress - 50.0).abs() < 1e-9);
    }

    #[test]
    fn reset_returns_to_genesis() {
        let mut engine = engine(3);
        let mut store = Store::in_memory();
        engine.start_session(&mut store, 0, "alice", T0);
        engine.poll_miner(&mut store, 2, "alice", T0 + 5);

        engine.reset(&mut store, T0 + 100);
        assert_eq!(store.get(keys::MINING_START), None);
        let snapshot = engine.block_snapshot(T0 + 100);
        assert_eq!(snapshot.height, 1);
        assert_eq!(snapshot.online, 0);
        assert_eq!(snapshot.difficulty, BASE_DIFFICULTY);
    }

    #[test]
    fn malformed_anchor_degrades_to_inactive() {
        let mut engine = engine(3);
        let mut store = Store::in_memory();
        store.set(keys::MINING_START, "yesterday");
        store.set(keys::MINING_DURATION, 7200i64);

        let state = engine.poll_miner(&mut store, 2, "alice", T0);
        assert!(!state.active);
        assert_eq!(state.earned, 0);
    }
}
