use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};

use crate::engine::{ANONYMOUS_USER, BlockSnapshot, Engine, STARTING_HASH_RATE, SessionProgress};
use crate::notify::{NotificationKind, Notifications};
use crate::price;
use crate::store::{Store, keys};
use crate::wallet::Wallet;

pub const ENERGY_RATE: i64 = 1;
pub const ENERGY_PACK: i64 = 1000;
const DEFAULT_ENERGY: i64 = 2000;
const DEFAULT_INTERVAL_HOURS: i64 = 2;
pub const CHECKIN_REWARD_BH: i64 = 500;
const CHECKIN_COOLDOWN_HOURS: i64 = 24;
pub const HASH_RATE_COST: i64 = 1000;
pub const DURATION_COST: i64 = 2000;
pub const ENERGY_COST: i64 = 500;
const DURATION_STEP_SECS: i64 = 7200;
const HOUR_MS: i64 = 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Mining,
    Intervals,
}

impl Tab {
    fn next(self) -> Self {
        match self {
            Tab::Mining => Tab::Intervals,
            Tab::Intervals => Tab::Mining,
        }
    }

    fn prev(self) -> Self {
        self.next()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntervalTier {
    pub id: u32,
    pub hours: i64,
    pub cost: i64,
    pub purchased: bool,
}

fn default_intervals() -> Vec<IntervalTier> {
    let tiers = [
        (1, 2, 0, true),
        (2, 4, 500, false),
        (3, 6, 1500, false),
        (4, 8, 3000, false),
        (5, 10, 5000, false),
        (6, 12, 8000, false),
    ];
    tiers
        .into_iter()
        .map(|(id, hours, cost, purchased)| IntervalTier {
            id,
            hours,
            cost,
            purchased,
        })
        .collect()
}

pub struct App {
    pub should_quit: bool,
    pub tab: Tab,
    pub show_notifications: bool,
    pub selected_interval: usize,

    pub store: Store,
    pub engine: Engine,
    pub wallet: Box<dyn Wallet>,
    pub notifications: Notifications,

    pub user_id: String,
    pub balance: i64,
    pub hash_rate: u64,
    pub duration_bonus: i64,
    pub energy: i64,
    pub max_energy: i64,
    pub intervals: Vec<IntervalTier>,
    pub current_interval: i64,
    pub last_mining_time: Option<i64>,
    pub last_checkin: Option<i64>,

    pub mining: bool,
    pub session_earned: u64,
    pub session_time_left: i64,
    pub shares: u64,
    pub can_mine: bool,
    pub mining_wait_ms: i64,
    pub can_checkin: bool,
    pub checkin_wait_ms: i64,

    pub eth_price: Option<f64>,
    pub block: BlockSnapshot,
    pub session: SessionProgress,
    /// Instant of the last reconcile, for views that show elapsed time.
    pub clock: i64,

    // While a session is active, balance == session_base + engine earnings.
    // Credits and debits shift the base so they survive the per-tick mirror.
    session_base: i64,
    prev_block: BlockSnapshot,
}

impl App {
    pub fn new(store: Store, engine: Engine, wallet: Box<dyn Wallet>, now: i64) -> Self {
        let block = engine.block_snapshot(now);
        let user_id = wallet.address().unwrap_or(ANONYMOUS_USER).to_string();
        let mut app = Self {
            should_quit: false,
            tab: Tab::Mining,
            show_notifications: false,
            selected_interval: 0,
            store,
            engine,
            wallet,
            notifications: Notifications::new(),
            user_id,
            balance: 0,
            hash_rate: STARTING_HASH_RATE,
            duration_bonus: 0,
            energy: DEFAULT_ENERGY,
            max_energy: DEFAULT_ENERGY,
            intervals: default_intervals(),
            current_interval: DEFAULT_INTERVAL_HOURS,
            last_mining_time: None,
            last_checkin: None,
            mining: false,
            session_earned: 0,
            session_time_left: 0,
            shares: 0,
            can_mine: true,
            mining_wait_ms: 0,
            can_checkin: true,
            checkin_wait_ms: 0,
            eth_price: None,
            session_base: 0,
            prev_block: block.clone(),
            block,
            session: SessionProgress {
                active: false,
                progress: 0.0,
                time_left: 0,
                total: 0,
            },
            clock: now,
        };
        app.load_profile(now);
        app
    }

    fn load_profile(&mut self, now: i64) {
        self.intervals = self
            .store
            .get_json(keys::INTERVALS)
            .unwrap_or_else(default_intervals);
        self.current_interval = self
            .store
            .get_i64(keys::CURRENT_INTERVAL)
            .unwrap_or(DEFAULT_INTERVAL_HOURS);
        self.last_mining_time = self.store.get_i64(keys::LAST_MINING_TIME);
        self.energy = self.store.get_i64(keys::ENERGY).unwrap_or(DEFAULT_ENERGY);
        self.max_energy = self
            .store
            .get_i64(keys::MAX_ENERGY)
            .unwrap_or(DEFAULT_ENERGY);
        self.last_checkin = self.store.get_i64(keys::LAST_CHECKIN);
        self.balance = self.store.get_i64(keys::BALANCE).unwrap_or(0);
        self.hash_rate = self
            .store
            .get_u64(keys::HASH_RATE)
            .unwrap_or(STARTING_HASH_RATE);
        self.duration_bonus = self.store.get_i64(keys::DURATION_BONUS).unwrap_or(0);
        self.session_base = self.balance;

        // Interrupted session: the durable balance is the session base, so
        // accrual since the anchor is rebuilt from wall-clock time here.
        if let (Some(start), Some(duration)) = (
            self.store.get_i64(keys::MINING_START),
            self.store.get_i64(keys::MINING_DURATION),
        ) {
            let elapsed = (now - start).clamp(0, duration.max(0));
            self.balance = self.session_base + self.hash_rate as i64 * elapsed;
        }

        self.session = self.engine.session_progress(&self.store, now);
        // An unexpired anchor resumes as a live session right away; an
        // expired one settles on the first tick.
        self.mining = self.session.active;
    }

    /// One reconciliation tick. `now` is epoch seconds, sampled once so
    /// every concern in the tick sees the same instant.
    pub fn on_tick(&mut self, now: i64) {
        self.clock = now;
        let now_ms = now * 1000;
        self.tick_mining_cooldown(now_ms);
        self.tick_checkin_cooldown(now_ms);
        self.tick_energy(now);
        self.tick_engine_sync(now);
        self.notifications.sweep(now_ms);
        self.persist();
    }

    fn tick_mining_cooldown(&mut self, now_ms: i64) {
        let wait = self.mining_wait(now_ms);
        let can = wait <= 0;
        if can && !self.can_mine {
            self.notifications
                .push(NotificationKind::System, "⏰ You can start new mining!");
        }
        self.mining_wait_ms = wait;
        self.can_mine = can;
    }

    fn tick_checkin_cooldown(&mut self, now_ms: i64) {
        let wait = self.checkin_wait(now_ms);
        let can = wait <= 0;
        if can && !self.can_checkin {
            self.notifications
                .push(NotificationKind::System, "🎁 Daily Check-in is available!");
        }
        self.checkin_wait_ms = wait;
        self.can_checkin = can;
    }

    fn tick_energy(&mut self, now: i64) {
        if !self.mining || self.energy <= 0 {
            return;
        }
        self.energy -= ENERGY_RATE;
        if self.energy <= 0 {
            self.energy = 0;
            // Fold the accrual so far into the balance before the anchor goes.
            if let Some(start) = self.store.get_i64(keys::MINING_START) {
                let mut elapsed = (now - start).max(0);
                if let Some(duration) = self.store.get_i64(keys::MINING_DURATION) {
                    elapsed = elapsed.min(duration.max(0));
                }
                self.balance = self.session_base + self.hash_rate as i64 * elapsed;
            }
            self.engine.stop_session(&mut self.store);
            self.mining = false;
            self.session_time_left = 0;
            self.notifications
                .push(NotificationKind::System, "⚠️ Energy ran out! Mining stopped");
        }
    }

    fn tick_engine_sync(&mut self, now: i64) {
        let state = self
            .engine
            .poll_miner(&mut self.store, self.hash_rate, &self.user_id, now);
        let was_mining = self.mining;

        self.mining = state.active;
        self.session_time_left = state.time_left;
        if state.active {
            self.balance = self.session_base + state.earned as i64;
            self.session_earned = state.earned;
            self.shares = state.earned / 10;
        } else if was_mining && state.earned > 0 {
            // Natural expiry settles the whole session in one step.
            self.balance = self.session_base + state.earned as i64;
            self.session_earned = state.earned;
            self.notifications
                .push(NotificationKind::System, "✅ Mining session completed");
        }

        if state.block.height > self.prev_block.height
            && self.prev_block.mined_by.as_deref() == Some(self.user_id.as_str())
        {
            let reward = self.prev_block.reward;
            self.credit(reward as i64);
            self.notifications.push_reward(
                NotificationKind::Success,
                format!("🎉 You found block #{}!", self.prev_block.height),
                reward,
            );
        }
        self.prev_block = state.block.clone();
        self.block = state.block;
        self.session = self.engine.session_progress(&self.store, now);
    }

    pub fn on_price(&mut self, result: Result<f64>) {
        match result {
            Ok(price) => self.eth_price = Some(price),
            Err(err) => {
                log::warn!("eth price fetch failed: {:#}", err);
                self.eth_price = Some(price::FALLBACK_ETH_PRICE);
            }
        }
    }

    pub fn checkin_cost(&self) -> Option<f64> {
        self.eth_price
            .map(|quote| price::checkin_cost_eth(Some(quote)))
    }

    pub fn on_key(&mut self, key: KeyEvent, now: i64) {
        if matches!(key.code, KeyCode::Char('q' | 'Q')) {
            self.should_quit = true;
            return;
        }

        match key.code {
            KeyCode::Tab => self.tab = self.tab.next(),
            KeyCode::BackTab => self.tab = self.tab.prev(),
            KeyCode::Char('n') => self.show_notifications = !self.show_notifications,
            KeyCode::Char('m') => self.notifications.mark_all_read(),
            KeyCode::Char('x') => self.notifications.clear(),
            KeyCode::Char('c') => self.toggle_wallet(),
            KeyCode::Char('s') => self.start_mining(now),
            KeyCode::Char('d') => self.daily_checkin(now),
            KeyCode::Char('h') => self.upgrade_hash_rate(),
            KeyCode::Char('u') => self.upgrade_duration(),
            KeyCode::Char('e') => self.buy_energy(),
            KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.hard_reset(now)
            }
            _ => match self.tab {
                Tab::Mining => {}
                Tab::Intervals => self.handle_interval_input(key),
            },
        }
    }

    fn handle_interval_input(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up => self.select_previous_interval(),
            KeyCode::Down => self.select_next_interval(),
            KeyCode::Enter => self.purchase_selected_interval(),
            _ => {}
        }
    }

    fn toggle_wallet(&mut self) {
        if self.wallet.is_connected() {
            self.wallet.disconnect();
        } else if let Err(err) = self.wallet.connect() {
            log::warn!("wallet connect failed: {:#}", err);
            self.notifications
                .push(NotificationKind::Error, "❌ Wallet connection failed");
        }
        self.user_id = self.wallet.address().unwrap_or(ANONYMOUS_USER).to_string();
    }

    fn start_mining(&mut self, now: i64) {
        if !self.wallet.is_connected() {
            self.notifications
                .push(NotificationKind::Error, "❌ Connect wallet first");
            return;
        }
        let wait = self.mining_wait(now * 1000);
        if wait > 0 {
            let hours = wait / HOUR_MS;
            let minutes = wait % HOUR_MS / 60_000;
            self.notifications
                .push(NotificationKind::Error, format!("⏳ Wait {}h {}m", hours, minutes));
            return;
        }
        if self.energy <= 0 {
            self.notifications
                .push(NotificationKind::Error, "❌ No energy for mining! Buy energy");
            return;
        }
        if self.mining {
            self.notifications
                .push(NotificationKind::Error, "❌ Mining already active");
            return;
        }

        self.engine.stop_session(&mut self.store);
        let (_, duration) =
            self.engine
                .start_session(&mut self.store, self.duration_bonus, &self.user_id, now);
        self.session_base = self.balance;
        self.last_mining_time = Some(now * 1000);
        self.mining = true;
        self.session_earned = 0;
        self.shares = 0;
        self.session_time_left = duration;
        self.notifications.push(
            NotificationKind::System,
            format!("🚀 Mining started! Energy consumption: {}/sec", ENERGY_RATE),
        );
    }

    fn daily_checkin(&mut self, now: i64) {
        if !self.wallet.is_connected() {
            self.notifications
                .push(NotificationKind::Error, "❌ Connect wallet for Daily Check-in");
            return;
        }
        let wait = self.checkin_wait(now * 1000);
        if wait > 0 {
            let hours = wait / HOUR_MS;
            let minutes = wait % HOUR_MS / 60_000;
            self.notifications.push(
                NotificationKind::Error,
                format!("⏳ Daily Check-in available in {}h {}m", hours, minutes),
            );
            return;
        }
        let Some(cost) = self.checkin_cost() else {
            self.notifications
                .push(NotificationKind::System, "⏳ Fetching ETH price...");
            return;
        };
        let funds = self.wallet.balance_eth().unwrap_or(0.0);
        if funds < cost {
            self.notifications.push(
                NotificationKind::Error,
                format!(
                    "❌ Not enough ETH. Need ~{:.8} ETH (${})",
                    cost,
                    price::CHECKIN_COST_USD
                ),
            );
            return;
        }

        self.credit(CHECKIN_REWARD_BH);
        self.last_checkin = Some(now * 1000);
        self.notifications.push_reward(
            NotificationKind::Success,
            format!("🎉 Daily Check-in successful! +{} BH", CHECKIN_REWARD_BH),
            CHECKIN_REWARD_BH as u64,
        );
    }

    fn upgrade_hash_rate(&mut self) {
        if self.balance >= HASH_RATE_COST {
            self.hash_rate += 1;
            self.debit(HASH_RATE_COST);
            if self.wallet.is_connected() && self.mining {
                self.engine.set_miner_hash_rate(&self.user_id, self.hash_rate);
            }
            self.notifications.push(
                NotificationKind::Upgrade,
                format!("⚡ Hashrate {} BH/sec", self.hash_rate),
            );
        } else {
            self.notifications
                .push(NotificationKind::Error, "❌ Not enough BH");
        }
    }

    fn upgrade_duration(&mut self) {
        if self.balance >= DURATION_COST {
            self.duration_bonus += DURATION_STEP_SECS;
            self.debit(DURATION_COST);
            self.notifications
                .push(NotificationKind::Upgrade, "⏱️ Mining duration +2 hours");
        } else {
            self.notifications
                .push(NotificationKind::Error, "❌ Not enough BH");
        }
    }

    fn buy_energy(&mut self) {
        if self.balance >= ENERGY_COST {
            self.energy = (self.energy + ENERGY_PACK).min(self.max_energy);
            self.debit(ENERGY_COST);
            self.notifications
                .push(NotificationKind::Upgrade, "🔋 Energy +1000");
        } else {
            self.notifications
                .push(NotificationKind::Error, "❌ Not enough BH");
        }
    }

    /// Tiers offered on the INTERVALS tab; the base tier is not listed.
    pub fn purchasable_intervals(&self) -> Vec<&IntervalTier> {
        self.intervals
            .iter()
            .filter(|tier| tier.hours > DEFAULT_INTERVAL_HOURS)
            .collect()
    }

    fn select_next_interval(&mut self) {
        let len = self.purchasable_intervals().len();
        if len == 0 {
            return;
        }
        self.selected_interval = (self.selected_interval + 1) % len;
    }

    fn select_previous_interval(&mut self) {
        let len = self.purchasable_intervals().len();
        if len == 0 {
            return;
        }
        if self.selected_interval == 0 {
            self.selected_interval = len - 1;
        } else {
            self.selected_interval -= 1;
        }
    }

    fn purchase_selected_interval(&mut self) {
        let selected = {
            let visible = self.purchasable_intervals();
            match visible.get(self.selected_interval) {
                Some(tier) => (tier.id, tier.hours, tier.cost, tier.purchased),
                None => return,
            }
        };
        let (id, hours, cost, purchased) = selected;

        if purchased {
            self.notifications
                .push(NotificationKind::Error, "❌ This upgrade is already purchased");
            return;
        }
        if self.balance < cost {
            self.notifications.push(
                NotificationKind::Error,
                format!("❌ Not enough BH (need {} BH)", cost),
            );
            return;
        }

        if let Some(tier) = self.intervals.iter_mut().find(|tier| tier.id == id) {
            tier.purchased = true;
        }
        self.current_interval = hours;
        self.debit(cost);
        self.notifications.push(
            NotificationKind::Upgrade,
            format!("🎉 Interval increased to {} hours!", hours),
        );
    }

    fn hard_reset(&mut self, now: i64) {
        self.engine.reset(&mut self.store, now);
        self.load_profile(now);
        self.mining = false;
        self.session_earned = 0;
        self.session_time_left = 0;
        self.shares = 0;
        self.can_mine = true;
        self.mining_wait_ms = 0;
        self.can_checkin = true;
        self.checkin_wait_ms = 0;
        self.selected_interval = 0;
        self.block = self.engine.block_snapshot(now);
        self.prev_block = self.block.clone();
        self.notifications
            .push(NotificationKind::System, "🔄 Simulation reset");
    }

    fn mining_wait(&self, now_ms: i64) -> i64 {
        match self.last_mining_time {
            Some(last) => (last + self.current_interval * HOUR_MS - now_ms).max(0),
            None => 0,
        }
    }

    fn checkin_wait(&self, now_ms: i64) -> i64 {
        match self.last_checkin {
            Some(last) => (last + CHECKIN_COOLDOWN_HOURS * HOUR_MS - now_ms).max(0),
            None => 0,
        }
    }

    fn credit(&mut self, amount: i64) {
        self.balance += amount;
        if self.mining {
            self.session_base += amount;
        }
    }

    fn debit(&mut self, amount: i64) {
        self.credit(-amount);
    }

    fn persist(&mut self) {
        self.store.set_json(keys::INTERVALS, &self.intervals);
        self.store.set(keys::CURRENT_INTERVAL, self.current_interval);
        if let Some(last) = self.last_mining_time {
            self.store.set(keys::LAST_MINING_TIME, last);
        }
        self.store.set(keys::ENERGY, self.energy);
        self.store.set(keys::MAX_ENERGY, self.max_energy);
        if let Some(last) = self.last_checkin {
            self.store.set(keys::LAST_CHECKIN, last);
        }
        // While a session anchor exists, BALANCE holds the pre-session base
        // and load_profile rebuilds the accrual from the anchor.
        let balance = if self.store.get_i64(keys::MINING_START).is_some() {
            self.session_base
        } else {
            self.balance
        };
        self.store.set(keys::BALANCE, balance);
        self.store.set(keys::HASH_RATE, self.hash_rate);
        self.store.set(keys::DURATION_BONUS, self.duration_bonus);
        self.store.flush();
    }

    pub fn shutdown(&mut self) {
        self.persist();
    }
}
