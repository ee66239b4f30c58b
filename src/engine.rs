//! Volume accounting and reward settlement engine.
//!
//! The engine is the single ledger object of a venue. It is a fixed-size
//! `Pod` struct that the program views in place over the slab account, so
//! an instruction reads and writes only the records it needs. It owns:
//! 1. A period clock mapping unix time to fixed-length accounting periods
//! 2. A table of `MAX_TRADERS` trader records, open-addressed by identity.
//!    Each record holds the net position, the reward account and the
//!    trader's `TRADER_HISTORY` most recent period volumes
//! 3. A ring of `MARKET_HISTORY` market period volumes indexed by
//!    `period % MARKET_HISTORY`
//! 4. Pool statistics and the owner and settlement-trigger roles
//!
//! An entry that leaves a trader's history, or whose market period is
//! recycled, first has its share credited to the trader's `earned`
//! balance. Dropping history never drops a reward.
//!
//! Invariants maintained by every operation:
//! - For each retained period p:
//!   market_volume(p) == retired(p) + sum over traders of trader_volume(t, p)
//! - Every retained trader entry belongs to a retained market period
//! - A period strictly before the current period never receives new volume
//! - A (trader, period) entry is credited to `earned` at most once
//! - withdrawn <= earned for every trader
//!
//! Every operation either commits completely or returns an error having
//! mutated nothing. The engine never reads the wall clock or the caller on
//! its own: both arrive through [`CallContext`].

use bytemuck::{Pod, Zeroable};
use thiserror::Error;

use crate::math::{mul_div_floor, I64, U128, U64};

/// Trader records in the table
pub const MAX_TRADERS: usize = 1024;
/// Period volumes retained per trader
pub const TRADER_HISTORY: usize = 8;
/// Market periods retained
pub const MARKET_HISTORY: usize = 512;

/// 32-byte account identity (a Solana pubkey on-chain).
pub type Identity = [u8; 32];

/// The zero identity never holds a role.
pub const ZERO_IDENTITY: Identity = [0u8; 32];

// ============================================================================
// Errors
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Trade amount is zero
    #[error("volume cannot be zero")]
    InvalidVolume,

    /// Caller does not hold the role the operation requires
    #[error("caller is not authorized for this operation")]
    Unauthorized,

    /// Nothing new to disburse (no volume, already settled, or rounded to zero)
    #[error("no reward to distribute")]
    ZeroReward,

    /// The asset transfer capability refused the payment
    #[error("reward transfer failed")]
    TransferFailed,

    /// Close amount is larger than the held position
    #[error("close amount exceeds the held position")]
    PositionExceeded,

    /// Checked arithmetic overflowed
    #[error("arithmetic overflow")]
    Overflow,

    /// A role cannot be assigned to the zero identity
    #[error("identity must not be zero")]
    InvalidIdentity,

    #[error("period duration must be positive")]
    InvalidPeriodDuration,

    /// Every trader slot is taken
    #[error("trader table is full")]
    VenueFull,

    /// A stored record holds a value no operation produces
    #[error("ledger record is corrupt")]
    Corrupt,
}

pub type Result<T> = core::result::Result<T, LedgerError>;

// ============================================================================
// Call Context
// ============================================================================

/// Who is calling and when. Passed explicitly into every operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Identity,
    /// Unix timestamp (seconds) of the call
    pub now: i64,
}

impl CallContext {
    pub fn new(caller: Identity, now: i64) -> Self {
        Self { caller, now }
    }
}

// ============================================================================
// Asset Transfer Capability
// ============================================================================

/// Moves reward tokens out of the pool.
///
/// The engine calls this exactly once per successful claim or pool
/// withdrawal and commits its own state only after `transfer` returned `Ok`.
pub trait AssetTransfer {
    fn transfer(&mut self, to: &Identity, amount: u64) -> Result<()>;
}

/// Transfer capability that accepts every payment (for testing)
pub struct NoOpTransfer;

impl AssetTransfer for NoOpTransfer {
    fn transfer(&mut self, _to: &Identity, _amount: u64) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Period Clock
// ============================================================================

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct PeriodClock {
    genesis_time: I64,
    period_duration: U64,
}

impl PeriodClock {
    pub fn new(genesis_time: i64, period_duration: u64) -> Result<Self> {
        if period_duration == 0 {
            return Err(LedgerError::InvalidPeriodDuration);
        }
        Ok(Self {
            genesis_time: I64::new(genesis_time),
            period_duration: U64::new(period_duration),
        })
    }

    pub fn genesis_time(&self) -> i64 {
        self.genesis_time.get()
    }

    pub fn period_duration(&self) -> u64 {
        self.period_duration.get()
    }

    /// Period index containing `now`. Times before genesis map to period 0.
    pub fn period_at(&self, now: i64) -> u64 {
        let genesis = self.genesis_time();
        if now <= genesis {
            return 0;
        }
        now.abs_diff(genesis).checked_div(self.period_duration()).unwrap_or(0)
    }

    /// First timestamp of `period`, saturating at `i64::MAX`.
    pub fn period_start(&self, period: u64) -> i64 {
        let offset = (period as i128).saturating_mul(self.period_duration() as i128);
        let start = (self.genesis_time() as i128).saturating_add(offset);
        start.min(i64::MAX as i128) as i64
    }
}

// ============================================================================
// Positions and the Netting Policy
// ============================================================================

/// Net notional exposure. `amount == 0` is flat and flat is always stored as
/// [`Position::FLAT`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Position {
    pub amount: u128,
    pub is_long: bool,
}

impl Position {
    pub const FLAT: Self = Self {
        amount: 0,
        is_long: false,
    };

    pub fn new(amount: u128, is_long: bool) -> Self {
        if amount == 0 {
            Self::FLAT
        } else {
            Self { amount, is_long }
        }
    }

    pub fn is_flat(&self) -> bool {
        self.amount == 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Trade {
    pub amount: u128,
    /// `true` adds exposure in `is_long` direction, `false` reduces the held position
    pub is_open: bool,
    /// Direction of an opening trade; ignored for closes
    pub is_long: bool,
}

impl Trade {
    pub fn open(amount: u128, is_long: bool) -> Self {
        Self {
            amount,
            is_open: true,
            is_long,
        }
    }

    pub fn close(amount: u128) -> Self {
        Self {
            amount,
            is_open: false,
            is_long: false,
        }
    }
}

/// How a trade changed a position and how much volume it carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fill {
    /// Exposure removed from the held position
    pub closed: u128,
    /// Exposure added (from flat, pyramided, or the remainder after a flip)
    pub opened: u128,
    /// Position after the trade
    pub next: Position,
}

impl Fill {
    /// Volume attributed to the trade: every unit of exposure change counts once.
    pub fn volume(&self) -> u128 {
        // closed + opened == trade amount, see attribute_volume
        self.closed + self.opened
    }
}

/// Netting and volume-accrual policy.
///
/// - close: reduces the held position; fails if it would go below zero
/// - open while flat or in the held direction: grows the position
/// - open against the held direction: nets `min(amount, held)` as a close,
///   the remainder flips the position and counts as opened
///
/// The closed and opened parts always sum to the trade amount, so pyramiding
/// accrues volume exactly like an open from flat.
pub fn attribute_volume(held: Position, trade: Trade) -> Result<Fill> {
    if trade.amount == 0 {
        return Err(LedgerError::InvalidVolume);
    }

    if !trade.is_open {
        let remaining = held
            .amount
            .checked_sub(trade.amount)
            .ok_or(LedgerError::PositionExceeded)?;
        return Ok(Fill {
            closed: trade.amount,
            opened: 0,
            next: Position::new(remaining, held.is_long),
        });
    }

    if held.is_flat() || held.is_long == trade.is_long {
        let amount = held
            .amount
            .checked_add(trade.amount)
            .ok_or(LedgerError::Overflow)?;
        return Ok(Fill {
            closed: 0,
            opened: trade.amount,
            next: Position::new(amount, trade.is_long),
        });
    }

    let closed = trade.amount.min(held.amount);
    let opened = trade.amount - closed;
    let next = if opened > 0 {
        Position::new(opened, trade.is_long)
    } else {
        Position::new(held.amount - closed, held.is_long)
    };
    Ok(Fill {
        closed,
        opened,
        next,
    })
}

// ============================================================================
// Position & Volume Ledger
// ============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TraderPosition {
    pub position: Position,
    pub last_trade_time: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TradeReceipt {
    pub period: u64,
    pub fill: Fill,
    /// Trader's volume in `period` after the trade
    pub trader_volume: u128,
    /// Market volume in `period` after the trade
    pub market_volume: u128,
}

impl TradeReceipt {
    pub fn volume(&self) -> u128 {
        self.fill.volume()
    }
}

// PeriodVolume::status
const EMPTY: u8 = 0;
const UNSETTLED: u8 = 1;
const SETTLED: u8 = 2;

/// Retained (trader, period) volume accumulator.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct PeriodVolume {
    period: U64,
    volume: U128,
    status: u8,
    _padding: [u8; 7],
}

impl PeriodVolume {
    fn open(period: u64) -> Self {
        Self {
            period: U64::new(period),
            volume: U128::ZERO,
            status: UNSETTLED,
            _padding: [0; 7],
        }
    }

    fn holds(&self, period: u64) -> bool {
        self.status != EMPTY && self.period.get() == period
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct TraderRecord {
    owner: Identity,
    position_amount: U128,
    last_trade_time: I64,
    /// Reward credited over every settled or retired period
    earned: U128,
    withdrawn: U128,
    used: u8,
    is_long: u8,
    _padding: [u8; 6],
    history: [PeriodVolume; TRADER_HISTORY],
}

impl TraderRecord {
    fn check(&self) -> Result<()> {
        let flags_ok = self.used <= 1 && self.is_long <= 1;
        let history_ok = self.history.iter().all(|e| e.status <= SETTLED);
        if !flags_ok || !history_ok || self.withdrawn.get() > self.earned.get() {
            return Err(LedgerError::Corrupt);
        }
        Ok(())
    }

    fn position(&self) -> Position {
        Position::new(self.position_amount.get(), self.is_long == 1)
    }

    fn entry(&self, period: u64) -> Option<usize> {
        self.history.iter().position(|e| e.holds(period))
    }

    /// History slot for a new period: an empty one, else the oldest settled
    /// entry, else the oldest unsettled one.
    fn victim(&self) -> usize {
        self.history
            .iter()
            .enumerate()
            .min_by_key(|(_, e)| {
                let rank = match e.status {
                    EMPTY => 0u8,
                    SETTLED => 1,
                    _ => 2,
                };
                (rank, e.period.get())
            })
            .map_or(0, |(i, _)| i)
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct MarketPeriod {
    period: U64,
    volume: U128,
    /// Volume of trader entries that already left their trader's history
    retired: U128,
    /// Reward credited to traders out of this period
    credited: U64,
    used: u8,
    _padding: [u8; 7],
}

impl MarketPeriod {
    fn holds(&self, period: u64) -> bool {
        self.used != 0 && self.period.get() == period
    }
}

fn market_slot(period: u64) -> usize {
    (period % MARKET_HISTORY as u64) as usize
}

fn home_slot(trader: &Identity) -> usize {
    let mut h = 0u64;
    for chunk in trader.chunks_exact(8) {
        let mut word = [0u8; 8];
        word.copy_from_slice(chunk);
        h = (h ^ u64::from_le_bytes(word)).wrapping_mul(0x9e37_79b9_7f4a_7c15);
    }
    (h >> 32) as usize % MAX_TRADERS
}

enum Slot {
    Found(usize),
    Vacant(usize),
    Full,
}

/// Share credited for a retained entry. Retained volume never exceeds its
/// market total, so the share always fits the pool.
fn retained_share(pool: u64, volume: u128, market_volume: u128) -> u64 {
    period_share(pool, volume.min(market_volume), market_volume).unwrap_or(0)
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct PositionLedger {
    trader_count: U64,
    /// Sum of every trader's `earned`
    credited: U128,
    traders: [TraderRecord; MAX_TRADERS],
    market: [MarketPeriod; MARKET_HISTORY],
}

impl PositionLedger {
    /// Scan forward from the identity's home slot. Records are never
    /// removed, so the first vacant slot ends the search.
    fn locate(&self, trader: &Identity) -> Slot {
        let home = home_slot(trader);
        for i in 0..MAX_TRADERS {
            let idx = (home + i) % MAX_TRADERS;
            let record = &self.traders[idx];
            if record.used == 0 {
                return Slot::Vacant(idx);
            }
            if record.owner == *trader {
                return Slot::Found(idx);
            }
        }
        Slot::Full
    }

    fn record(&self, trader: &Identity) -> Option<&TraderRecord> {
        match self.locate(trader) {
            Slot::Found(idx) => Some(&self.traders[idx]),
            _ => None,
        }
    }

    pub fn position(&self, trader: &Identity) -> TraderPosition {
        self.record(trader).map_or_else(TraderPosition::default, |r| TraderPosition {
            position: r.position(),
            last_trade_time: r.last_trade_time.get(),
        })
    }

    /// Volume of `trader` in `period`, 0 once the entry left the history.
    pub fn trader_volume(&self, trader: &Identity, period: u64) -> u128 {
        self.record(trader)
            .and_then(|r| r.entry(period).map(|e| r.history[e].volume.get()))
            .unwrap_or(0)
    }

    pub fn market_volume(&self, period: u64) -> u128 {
        let market = &self.market[market_slot(period)];
        if market.holds(period) {
            market.volume.get()
        } else {
            0
        }
    }

    pub fn reward_account(&self, trader: &Identity) -> RewardAccount {
        self.record(trader).map_or_else(RewardAccount::default, |r| RewardAccount {
            earned: r.earned.get(),
            withdrawn: r.withdrawn.get(),
        })
    }

    pub fn is_settled(&self, trader: &Identity, period: u64) -> bool {
        self.record(trader)
            .and_then(|r| r.entry(period).map(|e| r.history[e].status == SETTLED))
            .unwrap_or(false)
    }

    pub fn trader_count(&self) -> u64 {
        self.trader_count.get()
    }

    pub fn total_credited(&self) -> u128 {
        self.credited.get()
    }

    /// Apply `trade` for `trader` in `period`. Every fallible check runs
    /// before the first write.
    pub fn apply(
        &mut self,
        trader: &Identity,
        period: u64,
        trade: Trade,
        now: i64,
        reward_per_period: u64,
    ) -> Result<TradeReceipt> {
        let slot = self.locate(trader);
        let held = match slot {
            Slot::Found(idx) => {
                self.traders[idx].check()?;
                self.traders[idx].position()
            }
            _ => Position::FLAT,
        };
        let fill = attribute_volume(held, trade)?;
        let (idx, existing) = match slot {
            Slot::Found(idx) => (idx, self.traders[idx].entry(period)),
            Slot::Vacant(idx) => (idx, None),
            Slot::Full => return Err(LedgerError::VenueFull),
        };
        let volume = fill.volume();

        let m = market_slot(period);
        let market_live = self.market[m].holds(period);
        let market_volume = if market_live {
            self.market[m]
                .volume
                .get()
                .checked_add(volume)
                .ok_or(LedgerError::Overflow)?
        } else {
            volume
        };
        let trader_volume = match existing {
            Some(e) => self.traders[idx].history[e]
                .volume
                .get()
                .checked_add(volume)
                .ok_or(LedgerError::Overflow)?,
            None => volume,
        };

        if !market_live {
            self.recycle_market_slot(m, period, reward_per_period);
        }
        if let Slot::Vacant(_) = slot {
            let record = &mut self.traders[idx];
            *record = TraderRecord::zeroed();
            record.owner = *trader;
            record.used = 1;
            self.trader_count.set(self.trader_count.get().saturating_add(1));
        }
        let e = match existing {
            Some(e) => e,
            None => {
                let e = self.traders[idx].victim();
                self.retire_entry(idx, e, reward_per_period);
                self.traders[idx].history[e] = PeriodVolume::open(period);
                e
            }
        };

        let record = &mut self.traders[idx];
        record.history[e].volume.set(trader_volume);
        record.position_amount.set(fill.next.amount);
        record.is_long = fill.next.is_long as u8;
        record.last_trade_time.set(now);
        self.market[m].volume.set(market_volume);

        Ok(TradeReceipt {
            period,
            fill,
            trader_volume,
            market_volume,
        })
    }

    /// Drop history entry `e` of record `idx`, crediting its share first if
    /// it was never settled.
    fn retire_entry(&mut self, idx: usize, e: usize, reward_per_period: u64) {
        let entry = self.traders[idx].history[e];
        if entry.status == EMPTY {
            return;
        }
        let period = entry.period.get();
        let volume = entry.volume.get();
        let m = market_slot(period);
        if self.market[m].holds(period) {
            let market = &mut self.market[m];
            market.retired.set(market.retired.get().saturating_add(volume));
            if entry.status == UNSETTLED {
                let share = retained_share(reward_per_period, volume, market.volume.get());
                market.credited.set(market.credited.get().saturating_add(share));
                let record = &mut self.traders[idx];
                record.earned.set(record.earned.get().saturating_add(share as u128));
                self.credited.set(self.credited.get().saturating_add(share as u128));
            }
        }
        self.traders[idx].history[e] = PeriodVolume::zeroed();
    }

    /// Hand market slot `m` to `period`. Every trader entry of the period it
    /// held is retired first. Scans the whole table, once per recycled slot.
    fn recycle_market_slot(&mut self, m: usize, period: u64, reward_per_period: u64) {
        if self.market[m].used != 0 {
            let stale = self.market[m].period.get();
            for idx in 0..MAX_TRADERS {
                if self.traders[idx].used == 0 {
                    continue;
                }
                for e in 0..TRADER_HISTORY {
                    if self.traders[idx].history[e].holds(stale) {
                        self.retire_entry(idx, e, reward_per_period);
                    }
                }
            }
        }
        self.market[m] = MarketPeriod {
            period: U64::new(period),
            used: 1,
            ..MarketPeriod::zeroed()
        };
    }

    /// Credit every unsettled period before `current_period` and mark the
    /// credited total as withdrawn. Runs only after the payout succeeded.
    fn settle(&mut self, trader: &Identity, current_period: u64, reward_per_period: u64) {
        let idx = match self.locate(trader) {
            Slot::Found(idx) => idx,
            _ => return,
        };
        for e in 0..TRADER_HISTORY {
            let entry = self.traders[idx].history[e];
            let period = entry.period.get();
            if entry.status != UNSETTLED || period >= current_period {
                continue;
            }
            let m = market_slot(period);
            let share = retained_share(reward_per_period, entry.volume.get(), self.market_volume(period));
            if self.market[m].holds(period) {
                let market = &mut self.market[m];
                market.credited.set(market.credited.get().saturating_add(share));
            }
            let record = &mut self.traders[idx];
            record.history[e].status = SETTLED;
            record.earned.set(record.earned.get().saturating_add(share as u128));
            self.credited.set(self.credited.get().saturating_add(share as u128));
        }
        let record = &mut self.traders[idx];
        record.withdrawn = record.earned;
    }

    /// Unpaid `earned` balance plus the share of every unsettled period
    /// before `current_period`.
    pub fn quote(&self, trader: &Identity, current_period: u64, reward_per_period: u64) -> Result<RewardQuote> {
        let record = match self.locate(trader) {
            Slot::Found(idx) => &self.traders[idx],
            _ => return Ok(RewardQuote::default()),
        };
        record.check()?;

        let unpaid = record.earned.get() - record.withdrawn.get();
        let mut quote = RewardQuote {
            amount: u64::try_from(unpaid).map_err(|_| LedgerError::Overflow)?,
            periods: Vec::new(),
        };
        for entry in record.history.iter() {
            let period = entry.period.get();
            if entry.status != UNSETTLED || period >= current_period {
                continue;
            }
            let share = retained_share(reward_per_period, entry.volume.get(), self.market_volume(period));
            quote.amount = quote.amount.checked_add(share).ok_or(LedgerError::Overflow)?;
            quote.periods.push(period);
        }
        quote.periods.sort_unstable();
        Ok(quote)
    }

    /// For every retained period: market volume == retired + sum of trader
    /// entries, and credited reward <= `reward_per_period`. Also checks the
    /// trader count and the credited total against the records.
    pub fn check_conservation(&self, reward_per_period: u64) -> bool {
        let mut live = vec![0u128; MARKET_HISTORY];
        let mut count = 0u64;
        let mut earned = 0u128;

        for record in self.traders.iter().filter(|r| r.used != 0) {
            if record.check().is_err() {
                return false;
            }
            count += 1;
            earned = earned.saturating_add(record.earned.get());
            for entry in record.history.iter().filter(|e| e.status != EMPTY) {
                let period = entry.period.get();
                let m = market_slot(period);
                if !self.market[m].holds(period) {
                    return false;
                }
                live[m] = match live[m].checked_add(entry.volume.get()) {
                    Some(v) => v,
                    None => return false,
                };
            }
        }

        let markets_balance = self.market.iter().zip(&live).all(|(market, sum)| {
            if market.used == 0 {
                return *sum == 0;
            }
            market.retired.get().checked_add(*sum) == Some(market.volume.get())
                && market.credited.get() <= reward_per_period
        });
        markets_balance && count == self.trader_count.get() && earned == self.credited.get()
    }
}

// ============================================================================
// Reward Settlement Ledger
// ============================================================================

/// Share of `pool` for `volume` out of `market_volume`, rounded down.
///
/// The rounding remainder stays in the pool. `volume <= market_volume` keeps
/// the result at or below `pool`.
pub fn period_share(pool: u64, volume: u128, market_volume: u128) -> Result<u64> {
    if volume == 0 || market_volume == 0 {
        return Ok(0);
    }
    let share = mul_div_floor(pool as u128, volume, market_volume).ok_or(LedgerError::Overflow)?;
    u64::try_from(share).map_err(|_| LedgerError::Overflow)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RewardAccount {
    /// Reward credited over every settled or retired period
    pub earned: u128,
    /// Total reward paid out
    pub withdrawn: u128,
}

/// Preview of what a claim would pay right now.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RewardQuote {
    /// Unpaid credited balance plus the shares of `periods`
    pub amount: u64,
    /// Unsettled periods the claim covers, ascending
    pub periods: Vec<u64>,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct RewardLedger {
    /// Paid to traders
    disbursed: U128,
    /// Swept back to the owner
    swept: U128,
}

impl RewardLedger {
    pub fn total_disbursed(&self) -> u128 {
        self.disbursed.get()
    }

    pub fn total_swept(&self) -> u128 {
        self.swept.get()
    }
}

// ============================================================================
// Authorization Gate
// ============================================================================

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct Roles {
    pub owner: Identity,
    /// Only identity allowed to request reward disbursement
    pub settlement_trigger: Identity,
}

/// A role authorizes a caller only when it is set (non-zero) and matches.
#[inline]
pub fn role_ok(role: &Identity, caller: &Identity) -> bool {
    *role != ZERO_IDENTITY && role == caller
}

impl Roles {
    pub fn new(owner: Identity, settlement_trigger: Identity) -> Result<Self> {
        if owner == ZERO_IDENTITY || settlement_trigger == ZERO_IDENTITY {
            return Err(LedgerError::InvalidIdentity);
        }
        Ok(Self {
            owner,
            settlement_trigger,
        })
    }

    pub fn require_owner(&self, caller: &Identity) -> Result<()> {
        if !role_ok(&self.owner, caller) {
            return Err(LedgerError::Unauthorized);
        }
        Ok(())
    }

    pub fn require_settlement_trigger(&self, caller: &Identity) -> Result<()> {
        if !role_ok(&self.settlement_trigger, caller) {
            return Err(LedgerError::Unauthorized);
        }
        Ok(())
    }
}

// ============================================================================
// Venue Engine
// ============================================================================

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct VenueEngine {
    clock: PeriodClock,
    /// Reward tokens distributable for each settled period
    reward_per_period: U64,
    roles: Roles,
    /// Highest period any trade or claim has been attributed to
    high_water_period: U64,
    rewards: RewardLedger,
    ledger: PositionLedger,
}

impl VenueEngine {
    /// Heap-allocated engine. The program never builds one: it views the
    /// slab in place and calls [`VenueEngine::init`].
    pub fn new(clock: PeriodClock, reward_per_period: u64, roles: Roles) -> Box<Self> {
        let mut engine: Box<Self> = bytemuck::zeroed_box();
        engine.init(clock, reward_per_period, roles);
        engine
    }

    /// Reset to an empty venue.
    pub fn init(&mut self, clock: PeriodClock, reward_per_period: u64, roles: Roles) {
        bytemuck::bytes_of_mut(self).fill(0);
        self.clock = clock;
        self.reward_per_period = U64::new(reward_per_period);
        self.roles = roles;
        self.high_water_period = U64::new(clock.period_at(clock.genesis_time()));
    }

    /// Header values every operation relies on are ones `init` can produce.
    pub fn is_well_formed(&self) -> bool {
        self.clock.period_duration() != 0
            && self.ledger.trader_count() <= MAX_TRADERS as u64
            && self.roles.owner != ZERO_IDENTITY
            && self.roles.settlement_trigger != ZERO_IDENTITY
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    pub fn clock(&self) -> &PeriodClock {
        &self.clock
    }

    pub fn roles(&self) -> &Roles {
        &self.roles
    }

    pub fn reward_per_period(&self) -> u64 {
        self.reward_per_period.get()
    }

    pub fn ledger(&self) -> &PositionLedger {
        &self.ledger
    }

    pub fn rewards(&self) -> &RewardLedger {
        &self.rewards
    }

    pub fn reward_account(&self, trader: &Identity) -> RewardAccount {
        self.ledger.reward_account(trader)
    }

    pub fn period_start_time(&self) -> i64 {
        self.clock.genesis_time()
    }

    pub fn period_duration(&self) -> u64 {
        self.clock.period_duration()
    }

    /// Current period: the clock reading, never below a period already used.
    pub fn current_period(&self, now: i64) -> u64 {
        self.clock.period_at(now).max(self.high_water_period.get())
    }

    pub fn trader_current_period_volume(&self, trader: &Identity, now: i64) -> u128 {
        self.ledger.trader_volume(trader, self.current_period(now))
    }

    pub fn submit_trade(&mut self, ctx: &CallContext, trade: Trade) -> Result<TradeReceipt> {
        let period = self.current_period(ctx.now);
        let receipt = self
            .ledger
            .apply(&ctx.caller, period, trade, ctx.now, self.reward_per_period())?;
        self.high_water_period.set(period);
        Ok(receipt)
    }

    pub fn quote_reward(&self, trader: &Identity, now: i64) -> Result<RewardQuote> {
        self.ledger
            .quote(trader, self.current_period(now), self.reward_per_period())
    }

    /// Pay `trader` its credited balance and its share of every finished,
    /// unsettled period.
    ///
    /// The caller must be the settlement trigger. State is committed only
    /// after `transfer` succeeded.
    pub fn claim_reward<T: AssetTransfer + ?Sized>(
        &mut self,
        ctx: &CallContext,
        trader: &Identity,
        transfer: &mut T,
    ) -> Result<RewardQuote> {
        self.roles.require_settlement_trigger(&ctx.caller)?;

        let period = self.current_period(ctx.now);
        let quote = self.ledger.quote(trader, period, self.reward_per_period())?;
        if quote.amount == 0 {
            return Err(LedgerError::ZeroReward);
        }
        let disbursed = self
            .rewards
            .disbursed
            .get()
            .checked_add(quote.amount as u128)
            .ok_or(LedgerError::Overflow)?;

        transfer
            .transfer(trader, quote.amount)
            .map_err(|_| LedgerError::TransferFailed)?;

        self.ledger.settle(trader, period, self.reward_per_period());
        self.rewards.disbursed.set(disbursed);
        self.high_water_period.set(period);
        Ok(quote)
    }

    /// Sweep the whole `available` pool balance to the owner.
    pub fn withdraw_pool<T: AssetTransfer + ?Sized>(
        &mut self,
        ctx: &CallContext,
        available: u64,
        transfer: &mut T,
    ) -> Result<u64> {
        self.roles.require_owner(&ctx.caller)?;
        if available == 0 {
            return Ok(0);
        }
        let swept = self
            .rewards
            .swept
            .get()
            .checked_add(available as u128)
            .ok_or(LedgerError::Overflow)?;

        transfer
            .transfer(&ctx.caller, available)
            .map_err(|_| LedgerError::TransferFailed)?;

        self.rewards.swept.set(swept);
        Ok(available)
    }

    pub fn set_settlement_trigger(&mut self, ctx: &CallContext, trigger: Identity) -> Result<()> {
        self.roles.require_owner(&ctx.caller)?;
        if trigger == ZERO_IDENTITY {
            return Err(LedgerError::InvalidIdentity);
        }
        self.roles.settlement_trigger = trigger;
        Ok(())
    }

    pub fn update_owner(&mut self, ctx: &CallContext, new_owner: Identity) -> Result<()> {
        self.roles.require_owner(&ctx.caller)?;
        if new_owner == ZERO_IDENTITY {
            return Err(LedgerError::InvalidIdentity);
        }
        self.roles.owner = new_owner;
        Ok(())
    }

    /// Ledger conservation plus the payout side: total withdrawn equals
    /// total disbursed.
    pub fn check_conservation(&self) -> bool {
        if !self.ledger.check_conservation(self.reward_per_period()) {
            return false;
        }
        let withdrawn = self
            .ledger
            .traders
            .iter()
            .filter(|r| r.used != 0)
            .fold(0u128, |acc, r| acc.saturating_add(r.withdrawn.get()));
        withdrawn == self.rewards.disbursed.get()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const GENESIS: i64 = 1_700_000_000;
    const DAY: u64 = 86_400;
    const OWNER: Identity = [1u8; 32];
    const TRIGGER: Identity = [2u8; 32];
    const ALICE: Identity = [10u8; 32];
    const BOB: Identity = [11u8; 32];

    fn engine() -> Box<VenueEngine> {
        let clock = PeriodClock::new(GENESIS, DAY).unwrap();
        VenueEngine::new(clock, 1_000, Roles::new(OWNER, TRIGGER).unwrap())
    }

    fn at(caller: Identity, period: u64) -> CallContext {
        CallContext::new(caller, GENESIS + (period * DAY) as i64 + 1)
    }

    struct Recorder(Vec<(Identity, u64)>);

    impl AssetTransfer for Recorder {
        fn transfer(&mut self, to: &Identity, amount: u64) -> Result<()> {
            self.0.push((*to, amount));
            Ok(())
        }
    }

    struct Refuse;

    impl AssetTransfer for Refuse {
        fn transfer(&mut self, _to: &Identity, _amount: u64) -> Result<()> {
            Err(LedgerError::TransferFailed)
        }
    }

    #[test]
    fn clock_maps_time_to_periods() {
        let clock = PeriodClock::new(GENESIS, DAY).unwrap();
        assert_eq!(clock.period_at(GENESIS - 1_000), 0);
        assert_eq!(clock.period_at(GENESIS), 0);
        assert_eq!(clock.period_at(GENESIS + DAY as i64 - 1), 0);
        assert_eq!(clock.period_at(GENESIS + DAY as i64), 1);
        assert_eq!(clock.period_at(i64::MAX), (i64::MAX - GENESIS) as u64 / DAY);
        assert_eq!(clock.period_start(3), GENESIS + 3 * DAY as i64);
        assert_eq!(clock.period_start(u64::MAX), i64::MAX);
    }

    #[test]
    fn clock_rejects_zero_duration() {
        assert_eq!(PeriodClock::new(GENESIS, 0), Err(LedgerError::InvalidPeriodDuration));
    }

    #[test]
    fn open_from_flat() {
        let fill = attribute_volume(Position::FLAT, Trade::open(100, true)).unwrap();
        assert_eq!(fill, Fill { closed: 0, opened: 100, next: Position::new(100, true) });
        assert_eq!(fill.volume(), 100);
    }

    #[test]
    fn pyramiding_accrues_full_amount() {
        let fill = attribute_volume(Position::new(100, false), Trade::open(40, false)).unwrap();
        assert_eq!(fill.opened, 40);
        assert_eq!(fill.closed, 0);
        assert_eq!(fill.next, Position::new(140, false));
    }

    #[test]
    fn close_ignores_direction_flag() {
        let held = Position::new(50, false);
        let a = attribute_volume(held, Trade { amount: 20, is_open: false, is_long: true }).unwrap();
        let b = attribute_volume(held, Trade::close(20)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.next, Position::new(30, false));
        assert_eq!(a.volume(), 20);
    }

    #[test]
    fn close_to_flat_normalizes_direction() {
        let fill = attribute_volume(Position::new(50, true), Trade::close(50)).unwrap();
        assert_eq!(fill.next, Position::FLAT);
    }

    #[test]
    fn close_beyond_position_fails() {
        assert_eq!(
            attribute_volume(Position::new(10, true), Trade::close(11)),
            Err(LedgerError::PositionExceeded)
        );
        assert_eq!(attribute_volume(Position::FLAT, Trade::close(1)), Err(LedgerError::PositionExceeded));
    }

    #[test]
    fn opposite_open_nets_then_flips() {
        let fill = attribute_volume(Position::new(30, false), Trade::open(100, true)).unwrap();
        assert_eq!(fill.closed, 30);
        assert_eq!(fill.opened, 70);
        assert_eq!(fill.next, Position::new(70, true));

        let partial = attribute_volume(Position::new(30, false), Trade::open(10, true)).unwrap();
        assert_eq!(partial.closed, 10);
        assert_eq!(partial.opened, 0);
        assert_eq!(partial.next, Position::new(20, false));

        let exact = attribute_volume(Position::new(30, false), Trade::open(30, true)).unwrap();
        assert_eq!(exact.next, Position::FLAT);
        assert_eq!(exact.volume(), 30);
    }

    #[test]
    fn zero_amount_is_invalid_volume() {
        assert_eq!(attribute_volume(Position::FLAT, Trade::open(0, true)), Err(LedgerError::InvalidVolume));
        assert_eq!(attribute_volume(Position::new(5, true), Trade::close(0)), Err(LedgerError::InvalidVolume));
    }

    #[test]
    fn rejected_trade_changes_nothing() {
        let mut e = engine();
        e.submit_trade(&at(ALICE, 0), Trade::open(100, true)).unwrap();
        let before = e.as_bytes().to_vec();

        assert_eq!(e.submit_trade(&at(ALICE, 0), Trade::open(0, true)), Err(LedgerError::InvalidVolume));
        assert_eq!(e.submit_trade(&at(ALICE, 0), Trade::close(101)), Err(LedgerError::PositionExceeded));
        assert!(e.as_bytes() == &before[..]);
    }

    #[test]
    fn overflowing_accumulator_is_rejected_atomically() {
        let mut e = engine();
        e.submit_trade(&at(ALICE, 0), Trade::open(u128::MAX, true)).unwrap();
        let before = e.as_bytes().to_vec();
        // Netting close keeps the position in range, but the volume sum overflows.
        assert_eq!(e.submit_trade(&at(ALICE, 0), Trade::close(1)), Err(LedgerError::Overflow));
        assert!(e.as_bytes() == &before[..]);
    }

    #[test]
    fn receipt_reports_period_totals() {
        let mut e = engine();
        e.submit_trade(&at(ALICE, 2), Trade::open(100, true)).unwrap();
        let r = e.submit_trade(&at(BOB, 2), Trade::open(40, false)).unwrap();
        assert_eq!(r.period, 2);
        assert_eq!(r.volume(), 40);
        assert_eq!(r.trader_volume, 40);
        assert_eq!(r.market_volume, 140);
        assert_eq!(e.ledger().position(&BOB).last_trade_time, at(BOB, 2).now);
        assert!(e.check_conservation());
    }

    #[test]
    fn backwards_clock_never_reenters_elapsed_period() {
        let mut e = engine();
        e.submit_trade(&at(ALICE, 3), Trade::open(100, true)).unwrap();
        let r = e.submit_trade(&at(BOB, 1), Trade::open(50, true)).unwrap();
        assert_eq!(r.period, 3);
        assert_eq!(e.ledger().market_volume(1), 0);
        assert_eq!(e.current_period(at(BOB, 0).now), 3);
    }

    #[test]
    fn claim_requires_settlement_trigger() {
        let mut e = engine();
        e.submit_trade(&at(ALICE, 0), Trade::open(100, true)).unwrap();
        let mut rec = Recorder(Vec::new());
        assert_eq!(e.claim_reward(&at(ALICE, 1), &ALICE, &mut rec), Err(LedgerError::Unauthorized));
        assert_eq!(e.claim_reward(&at(OWNER, 1), &ALICE, &mut rec), Err(LedgerError::Unauthorized));
        assert!(rec.0.is_empty());
    }

    #[test]
    fn open_period_does_not_pay() {
        let mut e = engine();
        e.submit_trade(&at(ALICE, 0), Trade::open(100, true)).unwrap();
        let mut rec = Recorder(Vec::new());
        assert_eq!(e.claim_reward(&at(TRIGGER, 0), &ALICE, &mut rec), Err(LedgerError::ZeroReward));
        assert!(rec.0.is_empty());
    }

    #[test]
    fn claim_pays_pro_rata_once() {
        let mut e = engine();
        e.submit_trade(&at(ALICE, 0), Trade::open(100, true)).unwrap();
        e.submit_trade(&at(BOB, 0), Trade::open(200, false)).unwrap();

        let mut rec = Recorder(Vec::new());
        let quote = e.claim_reward(&at(TRIGGER, 1), &ALICE, &mut rec).unwrap();
        assert_eq!(quote.amount, 333);
        assert_eq!(quote.periods, vec![0]);
        assert_eq!(rec.0, vec![(ALICE, 333)]);

        let acct = e.reward_account(&ALICE);
        assert_eq!((acct.earned, acct.withdrawn), (333, 333));
        assert!(e.ledger().is_settled(&ALICE, 0));

        assert_eq!(e.claim_reward(&at(TRIGGER, 1), &ALICE, &mut rec), Err(LedgerError::ZeroReward));
        assert_eq!(rec.0.len(), 1);
        assert_eq!(e.reward_account(&ALICE).withdrawn, 333);

        e.claim_reward(&at(TRIGGER, 1), &BOB, &mut rec).unwrap();
        assert_eq!(rec.0[1], (BOB, 666));
        assert_eq!(e.rewards().total_disbursed(), 999);
        assert!(e.check_conservation());
    }

    #[test]
    fn claim_without_volume_is_zero_reward() {
        let mut e = engine();
        e.submit_trade(&at(ALICE, 0), Trade::open(100, true)).unwrap();
        let mut rec = Recorder(Vec::new());
        assert_eq!(e.claim_reward(&at(TRIGGER, 1), &BOB, &mut rec), Err(LedgerError::ZeroReward));
    }

    #[test]
    fn failed_transfer_commits_nothing() {
        let mut e = engine();
        e.submit_trade(&at(ALICE, 0), Trade::open(100, true)).unwrap();
        let before = e.as_bytes().to_vec();
        assert_eq!(e.claim_reward(&at(TRIGGER, 1), &ALICE, &mut Refuse), Err(LedgerError::TransferFailed));
        assert!(e.as_bytes() == &before[..]);

        let quote = e.claim_reward(&at(TRIGGER, 1), &ALICE, &mut NoOpTransfer).unwrap();
        assert_eq!(quote.amount, 1_000);
    }

    #[test]
    fn later_claim_only_covers_new_periods() {
        let mut e = engine();
        e.submit_trade(&at(ALICE, 0), Trade::open(100, true)).unwrap();
        e.claim_reward(&at(TRIGGER, 1), &ALICE, &mut NoOpTransfer).unwrap();

        e.submit_trade(&at(ALICE, 1), Trade::close(100)).unwrap();
        e.submit_trade(&at(BOB, 1), Trade::open(300, true)).unwrap();

        let quote = e.quote_reward(&ALICE, at(TRIGGER, 2).now).unwrap();
        assert_eq!(quote, RewardQuote { amount: 250, periods: vec![1] });
        e.claim_reward(&at(TRIGGER, 2), &ALICE, &mut NoOpTransfer).unwrap();

        let acct = e.reward_account(&ALICE);
        assert_eq!(acct.withdrawn, 1_250);
        assert!(e.ledger().is_settled(&ALICE, 0));
        assert!(e.ledger().is_settled(&ALICE, 1));
    }

    #[test]
    fn admin_operations_are_owner_only() {
        let mut e = engine();
        let mut rec = Recorder(Vec::new());

        assert_eq!(e.withdraw_pool(&at(ALICE, 0), 500, &mut rec), Err(LedgerError::Unauthorized));
        assert_eq!(e.set_settlement_trigger(&at(TRIGGER, 0), ALICE), Err(LedgerError::Unauthorized));
        assert_eq!(e.update_owner(&at(ALICE, 0), ALICE), Err(LedgerError::Unauthorized));

        assert_eq!(e.withdraw_pool(&at(OWNER, 0), 500, &mut rec), Ok(500));
        assert_eq!(rec.0, vec![(OWNER, 500)]);
        assert_eq!(e.rewards().total_swept(), 500);
        assert_eq!(e.withdraw_pool(&at(OWNER, 0), 0, &mut rec), Ok(0));
        assert_eq!(rec.0.len(), 1);

        assert_eq!(e.set_settlement_trigger(&at(OWNER, 0), ZERO_IDENTITY), Err(LedgerError::InvalidIdentity));
        e.set_settlement_trigger(&at(OWNER, 0), BOB).unwrap();
        assert_eq!(e.roles().settlement_trigger, BOB);

        e.update_owner(&at(OWNER, 0), ALICE).unwrap();
        assert_eq!(e.withdraw_pool(&at(OWNER, 0), 1, &mut rec), Err(LedgerError::Unauthorized));
    }

    #[test]
    fn zero_roles_never_authorize() {
        assert!(!role_ok(&ZERO_IDENTITY, &ZERO_IDENTITY));
        assert!(role_ok(&OWNER, &OWNER));
        assert_eq!(Roles::new(ZERO_IDENTITY, TRIGGER), Err(LedgerError::InvalidIdentity));
    }

    fn nth_trader(i: usize) -> Identity {
        let mut id = [0u8; 32];
        id[..8].copy_from_slice(&(i as u64 + 1).to_le_bytes());
        id[31] = 0x7f;
        id
    }

    #[test]
    fn leaving_history_credits_unsettled_share() {
        let mut e = engine();
        for p in 0..TRADER_HISTORY as u64 {
            e.submit_trade(&at(ALICE, p), Trade::open(100, true)).unwrap();
        }
        assert_eq!(e.reward_account(&ALICE), RewardAccount::default());

        // A ninth active period pushes period 0 out of the history
        let p = TRADER_HISTORY as u64;
        e.submit_trade(&at(ALICE, p), Trade::open(100, true)).unwrap();
        assert_eq!(e.reward_account(&ALICE), RewardAccount { earned: 1_000, withdrawn: 0 });
        assert_eq!(e.ledger().trader_volume(&ALICE, 0), 0);
        assert_eq!(e.ledger().market_volume(0), 100);
        assert_eq!(e.ledger().total_credited(), 1_000);
        assert!(e.check_conservation());

        let quote = e.quote_reward(&ALICE, at(TRIGGER, p + 1).now).unwrap();
        assert_eq!(quote.amount, 1_000 * (p + 1));
        assert_eq!(quote.periods, (1..=p).collect::<Vec<_>>());

        e.claim_reward(&at(TRIGGER, p + 1), &ALICE, &mut NoOpTransfer).unwrap();
        let acct = e.reward_account(&ALICE);
        assert_eq!((acct.earned, acct.withdrawn), (9_000, 9_000));
        assert!(e.check_conservation());
    }

    #[test]
    fn claim_pays_credited_balance_with_closed_periods() {
        let mut e = engine();
        for p in 0..=TRADER_HISTORY as u64 {
            e.submit_trade(&at(ALICE, p), Trade::open(100, true)).unwrap();
        }
        // Period 0 was credited on eviction, periods 1 to 7 are closed and 8 is open
        let quote = e.claim_reward(&at(TRIGGER, TRADER_HISTORY as u64), &ALICE, &mut NoOpTransfer).unwrap();
        assert_eq!(quote.amount, 1_000 * TRADER_HISTORY as u64);
        assert_eq!(
            e.claim_reward(&at(TRIGGER, TRADER_HISTORY as u64), &ALICE, &mut NoOpTransfer),
            Err(LedgerError::ZeroReward)
        );
        assert!(e.check_conservation());
    }

    #[test]
    fn recycled_market_period_keeps_dormant_reward() {
        let mut e = engine();
        e.submit_trade(&at(ALICE, 0), Trade::open(100, true)).unwrap();
        e.submit_trade(&at(BOB, 0), Trade::open(100, true)).unwrap();
        for p in 1..=MARKET_HISTORY as u64 {
            e.submit_trade(&at(BOB, p), Trade::open(1, true)).unwrap();
        }
        // Period MARKET_HISTORY took over the slot of period 0
        assert_eq!(e.ledger().market_volume(0), 0);
        assert_eq!(e.ledger().trader_volume(&ALICE, 0), 0);
        assert_eq!(e.reward_account(&ALICE), RewardAccount { earned: 500, withdrawn: 0 });
        assert!(e.check_conservation());

        let now = MARKET_HISTORY as u64 + 1;
        let quote = e.claim_reward(&at(TRIGGER, now), &ALICE, &mut NoOpTransfer).unwrap();
        assert_eq!(quote, RewardQuote { amount: 500, periods: vec![] });

        let quote = e.claim_reward(&at(TRIGGER, now), &BOB, &mut NoOpTransfer).unwrap();
        assert_eq!(quote.amount, 500 + 1_000 * MARKET_HISTORY as u64);
        assert_eq!(e.rewards().total_disbursed(), 1_000 * (MARKET_HISTORY as u128 + 1));
        assert!(e.check_conservation());
    }

    #[test]
    fn full_trader_table_rejects_newcomers_only() {
        let mut e = engine();
        for i in 0..MAX_TRADERS {
            e.submit_trade(&at(nth_trader(i), 0), Trade::open(1, true)).unwrap();
        }
        assert_eq!(e.ledger().trader_count(), MAX_TRADERS as u64);

        let before = e.as_bytes().to_vec();
        assert_eq!(
            e.submit_trade(&at(nth_trader(MAX_TRADERS), 0), Trade::open(1, true)),
            Err(LedgerError::VenueFull)
        );
        assert!(e.as_bytes() == &before[..]);

        let r = e.submit_trade(&at(nth_trader(7), 0), Trade::open(4, true)).unwrap();
        assert_eq!(r.trader_volume, 5);
        assert_eq!(r.market_volume, MAX_TRADERS as u128 + 4);
        assert!(e.check_conservation());
    }

    #[test]
    fn corrupt_record_is_reported() {
        let mut e = engine();
        e.submit_trade(&at(ALICE, 0), Trade::open(100, true)).unwrap();
        let idx = match e.ledger.locate(&ALICE) {
            Slot::Found(idx) => idx,
            _ => panic!("alice has a record"),
        };
        e.ledger.traders[idx].history[0].status = 9;
        let before = e.as_bytes().to_vec();

        assert_eq!(e.submit_trade(&at(ALICE, 0), Trade::open(1, true)), Err(LedgerError::Corrupt));
        assert_eq!(e.quote_reward(&ALICE, at(ALICE, 1).now), Err(LedgerError::Corrupt));
        assert_eq!(
            e.claim_reward(&at(TRIGGER, 1), &ALICE, &mut NoOpTransfer),
            Err(LedgerError::Corrupt)
        );
        assert!(e.as_bytes() == &before[..]);
        assert!(!e.check_conservation());
    }

    #[test]
    fn zeroed_engine_is_not_well_formed() {
        let blank: Box<VenueEngine> = bytemuck::zeroed_box();
        assert!(!blank.is_well_formed());
        // Division by the zero duration must not panic
        assert_eq!(blank.current_period(GENESIS + 10), 0);
        assert!(engine().is_well_formed());
    }

    #[test]
    fn engine_is_byte_aligned() {
        assert_eq!(core::mem::align_of::<VenueEngine>(), 1);
        assert_eq!(core::mem::size_of::<PeriodVolume>(), 32);
    }
}
