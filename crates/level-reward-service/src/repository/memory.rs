//! 进程内存储
//!
//! 以一把互斥锁保护全部表数据，实现与 PostgreSQL 仓储相同的约束语义：
//! 唯一约束、外键检查、以及发放事务的隔离与回滚。
//! 写入与其他事务未提交的发放记录冲突时，与唯一索引一样等待对方结束：
//! 对方提交则违反唯一约束，对方回滚则写入成功。
//! 用于本地演示和不依赖数据库的测试。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::constraints;
use super::traits::{
    AwardRepositoryTrait, AwardTransaction, BoostRepositoryTrait, CatalogRepositoryTrait,
    GameplayRepositoryTrait, ProgressRepositoryTrait,
};
use crate::error::{Result, RewardError};
use crate::models::player::validate_player_identifier;
use crate::models::{
    Boost, Level, LevelPrize, Player, PlayerBoost, PlayerLevel, PlayerLevelPrize, Prize,
    ProgressCursor, ProgressRow,
};

fn violation(constraint: &str) -> RewardError {
    RewardError::ConstraintViolation {
        constraint: constraint.to_string(),
    }
}

/// 发放记录槽位
///
/// `pending_tx` 非空表示记录属于尚未提交的事务，只对该事务可见
#[derive(Debug, Clone)]
struct AwardSlot {
    award: PlayerLevelPrize,
    pending_tx: Option<u64>,
}

#[derive(Debug, Default)]
struct MemoryState {
    last_id: i64,
    last_tx: u64,
    players: Vec<Player>,
    levels: Vec<Level>,
    prizes: Vec<Prize>,
    level_prizes: Vec<LevelPrize>,
    player_levels: Vec<PlayerLevel>,
    awards: Vec<AwardSlot>,
    boosts: Vec<Boost>,
    player_boosts: Vec<PlayerBoost>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn player_exists(&self, player_id: i64) -> bool {
        self.players.iter().any(|p| p.id == player_id)
    }

    fn level_exists(&self, level_id: i64) -> bool {
        self.levels.iter().any(|l| l.id == level_id)
    }

    fn find_player_level(&self, player_id: i64, level_id: i64) -> Option<PlayerLevel> {
        self.player_levels
            .iter()
            .find(|pl| pl.player_id == player_id && pl.level_id == level_id)
            .cloned()
    }

    fn find_level_prize(&self, level_id: i64) -> Option<LevelPrize> {
        self.level_prizes
            .iter()
            .find(|lp| lp.level_id == level_id)
            .cloned()
    }

    fn committed_awards(&self) -> impl Iterator<Item = &PlayerLevelPrize> {
        self.awards
            .iter()
            .filter(|slot| slot.pending_tx.is_none())
            .map(|slot| &slot.award)
    }

    fn discard_pending(&mut self, tx_id: u64) {
        self.awards.retain(|slot| slot.pending_tx != Some(tx_id));
    }

    fn progress_row(&self, player_level: &PlayerLevel) -> Option<ProgressRow> {
        let player = self.players.iter().find(|p| p.id == player_level.player_id)?;
        let level = self.levels.iter().find(|l| l.id == player_level.level_id)?;
        Some(ProgressRow {
            player_level_id: player_level.id,
            player_id: player.id,
            player_identifier: player.player_id.clone(),
            level_id: level.id,
            level_title: level.title.clone(),
            level_sort_order: level.sort_order,
            is_completed: player_level.is_completed,
        })
    }
}

/// 与其他事务未提交记录冲突时的写入结果
enum InsertAttempt {
    Inserted(PlayerLevelPrize),
    Blocked,
}

/// 进程内存储
///
/// 克隆后共享同一份数据
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    /// 任一发放事务结束（提交、回滚或丢弃）时唤醒等待者
    released: Arc<Notify>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已提交的发放记录数
    pub fn award_count(&self) -> usize {
        self.state.lock().committed_awards().count()
    }

    /// 尚未提交的发放记录数
    pub fn pending_award_count(&self) -> usize {
        self.state
            .lock()
            .awards
            .iter()
            .filter(|slot| slot.pending_tx.is_some())
            .count()
    }
}

#[async_trait]
impl AwardRepositoryTrait for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn AwardTransaction>> {
        let tx_id = {
            let mut state = self.state.lock();
            state.last_tx += 1;
            state.last_tx
        };

        Ok(Box::new(MemoryAwardTransaction {
            state: Arc::clone(&self.state),
            released: Arc::clone(&self.released),
            tx_id,
            finished: false,
        }))
    }

    async fn find_player_id(&self, player_identifier: &str) -> Result<Option<i64>> {
        Ok(self
            .state
            .lock()
            .players
            .iter()
            .find(|p| p.player_id == player_identifier)
            .map(|p| p.id))
    }
}

/// 进程内发放事务
///
/// 未提交即被丢弃时自动回滚
pub struct MemoryAwardTransaction {
    state: Arc<Mutex<MemoryState>>,
    released: Arc<Notify>,
    tx_id: u64,
    finished: bool,
}

impl MemoryAwardTransaction {
    fn ensure_open(&self) -> Result<()> {
        if self.finished {
            return Err(RewardError::Internal("发放事务已结束".to_string()));
        }
        Ok(())
    }

    fn try_insert_award(&self, player_id: i64, level_prize_id: i64) -> Result<InsertAttempt> {
        let mut state = self.state.lock();

        if !state.player_exists(player_id) {
            return Err(violation(constraints::FK_PLAYER_LEVEL_PRIZE_PLAYER));
        }
        if !state.level_prizes.iter().any(|lp| lp.id == level_prize_id) {
            return Err(violation(constraints::FK_PLAYER_LEVEL_PRIZE_LEVEL_PRIZE));
        }

        let conflict = state
            .awards
            .iter()
            .find(|slot| {
                slot.award.player_id == player_id && slot.award.level_prize_id == level_prize_id
            })
            .map(|slot| slot.pending_tx);
        match conflict {
            Some(Some(owner)) if owner != self.tx_id => return Ok(InsertAttempt::Blocked),
            Some(_) => return Err(violation(constraints::UNIQUE_PLAYER_LEVEL_PRIZE)),
            None => {}
        }

        let award = PlayerLevelPrize {
            id: state.next_id(),
            player_id,
            level_prize_id,
            received: Utc::now(),
        };
        state.awards.push(AwardSlot {
            award: award.clone(),
            pending_tx: Some(self.tx_id),
        });

        Ok(InsertAttempt::Inserted(award))
    }

    fn release(&mut self, commit: bool) {
        self.finished = true;
        {
            let mut state = self.state.lock();
            if commit {
                for slot in state.awards.iter_mut() {
                    if slot.pending_tx == Some(self.tx_id) {
                        slot.pending_tx = None;
                    }
                }
            } else {
                state.discard_pending(self.tx_id);
            }
        }
        self.released.notify_waiters();
    }
}

#[async_trait]
impl AwardTransaction for MemoryAwardTransaction {
    async fn find_player_level(
        &mut self,
        player_id: i64,
        level_id: i64,
    ) -> Result<Option<PlayerLevel>> {
        self.ensure_open()?;
        Ok(self.state.lock().find_player_level(player_id, level_id))
    }

    async fn find_level_prize(&mut self, level_id: i64) -> Result<Option<LevelPrize>> {
        self.ensure_open()?;
        Ok(self.state.lock().find_level_prize(level_id))
    }

    async fn award_exists(&mut self, player_id: i64, level_prize_id: i64) -> Result<bool> {
        self.ensure_open()?;
        let tx_id = self.tx_id;
        Ok(self.state.lock().awards.iter().any(|slot| {
            slot.award.player_id == player_id
                && slot.award.level_prize_id == level_prize_id
                && slot.pending_tx.is_none_or(|owner| owner == tx_id)
        }))
    }

    async fn insert_award(
        &mut self,
        player_id: i64,
        level_prize_id: i64,
    ) -> Result<PlayerLevelPrize> {
        self.ensure_open()?;
        let released = Arc::clone(&self.released);

        loop {
            // 先登记等待再检查冲突，避免错过两者之间的释放通知
            let notified = released.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.try_insert_award(player_id, level_prize_id)? {
                InsertAttempt::Inserted(award) => return Ok(award),
                InsertAttempt::Blocked => notified.await,
            }
        }
    }

    async fn commit(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.release(true);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        if !self.finished {
            self.release(false);
        }
        Ok(())
    }
}

impl Drop for MemoryAwardTransaction {
    fn drop(&mut self) {
        if !self.finished {
            self.release(false);
        }
    }
}

#[async_trait]
impl ProgressRepositoryTrait for MemoryStore {
    async fn level_prize_titles(&self) -> Result<HashMap<i64, String>> {
        let state = self.state.lock();
        Ok(state
            .level_prizes
            .iter()
            .filter_map(|lp| {
                state
                    .prizes
                    .iter()
                    .find(|p| p.id == lp.prize_id)
                    .map(|p| (lp.level_id, p.title.clone()))
            })
            .collect())
    }

    async fn awarded_pairs(&self) -> Result<HashSet<(i64, i64)>> {
        let state = self.state.lock();
        Ok(state
            .committed_awards()
            .filter_map(|award| {
                state
                    .level_prizes
                    .iter()
                    .find(|lp| lp.id == award.level_prize_id)
                    .map(|lp| (award.player_id, lp.level_id))
            })
            .collect())
    }

    async fn progress_chunk(
        &self,
        after: Option<ProgressCursor>,
        limit: i64,
    ) -> Result<Vec<ProgressRow>> {
        let state = self.state.lock();
        let limit = usize::try_from(limit).unwrap_or(0);

        // 只按排序键比较借用数据，仅克隆本批需要的行
        let mut keys: Vec<((&str, i32, i64), &PlayerLevel)> = state
            .player_levels
            .iter()
            .filter_map(|pl| {
                let player = state.players.iter().find(|p| p.id == pl.player_id)?;
                let level = state.levels.iter().find(|l| l.id == pl.level_id)?;
                Some(((player.player_id.as_str(), level.sort_order, pl.id), pl))
            })
            .filter(|(key, _)| after.as_ref().is_none_or(|cursor| cursor.precedes(*key)))
            .collect();

        if keys.len() > limit {
            if limit == 0 {
                return Ok(Vec::new());
            }
            keys.select_nth_unstable_by(limit - 1, |a, b| a.0.cmp(&b.0));
            keys.truncate(limit);
        }
        keys.sort_unstable_by(|a, b| a.0.cmp(&b.0));

        Ok(keys
            .into_iter()
            .filter_map(|(_, pl)| state.progress_row(pl))
            .collect())
    }
}

#[async_trait]
impl CatalogRepositoryTrait for MemoryStore {
    async fn create_level(&self, title: &str, sort_order: i32) -> Result<Level> {
        let mut state = self.state.lock();
        let level = Level {
            id: state.next_id(),
            title: title.to_string(),
            sort_order,
        };
        state.levels.push(level.clone());
        Ok(level)
    }

    async fn create_prize(&self, title: &str) -> Result<Prize> {
        let mut state = self.state.lock();
        let prize = Prize {
            id: state.next_id(),
            title: title.to_string(),
        };
        state.prizes.push(prize.clone());
        Ok(prize)
    }

    async fn assign_level_prize(&self, level_id: i64, prize_id: i64) -> Result<LevelPrize> {
        let mut state = self.state.lock();

        if !state.level_exists(level_id) {
            return Err(RewardError::LevelNotFound(level_id));
        }
        if !state.prizes.iter().any(|p| p.id == prize_id) {
            return Err(RewardError::PrizeNotFound(prize_id));
        }
        if state.find_level_prize(level_id).is_some() {
            return Err(RewardError::PrizeAlreadyConfigured(level_id));
        }

        let level_prize = LevelPrize {
            id: state.next_id(),
            level_id,
            prize_id,
        };
        state.level_prizes.push(level_prize.clone());
        Ok(level_prize)
    }

    async fn get_level_prize(&self, level_id: i64) -> Result<Option<LevelPrize>> {
        Ok(self.state.lock().find_level_prize(level_id))
    }

    async fn list_levels(&self) -> Result<Vec<Level>> {
        let mut levels = self.state.lock().levels.clone();
        levels.sort_by_key(|l| (l.sort_order, l.id));
        Ok(levels)
    }
}

#[async_trait]
impl GameplayRepositoryTrait for MemoryStore {
    async fn register_player(&self, player_identifier: &str) -> Result<Player> {
        validate_player_identifier(player_identifier)?;

        let mut state = self.state.lock();
        if let Some(existing) = state
            .players
            .iter()
            .find(|p| p.player_id == player_identifier)
        {
            return Ok(existing.clone());
        }

        let player = Player {
            id: state.next_id(),
            player_id: player_identifier.to_string(),
            registered_at: Utc::now(),
        };
        state.players.push(player.clone());
        Ok(player)
    }

    async fn find_player(&self, player_identifier: &str) -> Result<Option<Player>> {
        Ok(self
            .state
            .lock()
            .players
            .iter()
            .find(|p| p.player_id == player_identifier)
            .cloned())
    }

    async fn start_level(&self, player_id: i64, level_id: i64) -> Result<PlayerLevel> {
        let mut state = self.state.lock();

        if !state.player_exists(player_id) {
            return Err(RewardError::PlayerNotFound(player_id.to_string()));
        }
        if !state.level_exists(level_id) {
            return Err(RewardError::LevelNotFound(level_id));
        }
        if let Some(existing) = state.find_player_level(player_id, level_id) {
            return Ok(existing);
        }

        let player_level = PlayerLevel {
            id: state.next_id(),
            player_id,
            level_id,
            completed: None,
            is_completed: false,
            score: 0,
        };
        state.player_levels.push(player_level.clone());
        Ok(player_level)
    }

    async fn complete_level(
        &self,
        player_id: i64,
        level_id: i64,
        score: i32,
        completed: NaiveDate,
    ) -> Result<PlayerLevel> {
        if score < 0 {
            return Err(RewardError::Validation("得分不能为负数".to_string()));
        }

        let mut state = self.state.lock();
        let player_level = state
            .player_levels
            .iter_mut()
            .find(|pl| pl.player_id == player_id && pl.level_id == level_id)
            .ok_or(RewardError::LevelNotStarted {
                player_id,
                level_id,
            })?;

        player_level.is_completed = true;
        player_level.score = score;
        player_level.completed = Some(completed);
        Ok(player_level.clone())
    }

    async fn list_awards(&self, player_id: i64) -> Result<Vec<PlayerLevelPrize>> {
        Ok(self
            .state
            .lock()
            .committed_awards()
            .filter(|award| award.player_id == player_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BoostRepositoryTrait for MemoryStore {
    async fn create_boost(&self, name: &str) -> Result<Boost> {
        let mut state = self.state.lock();
        if state.boosts.iter().any(|b| b.name == name) {
            return Err(RewardError::Validation(format!("加成名称已存在: {}", name)));
        }

        let boost = Boost {
            id: state.next_id(),
            name: name.to_string(),
            is_active: true,
        };
        state.boosts.push(boost.clone());
        Ok(boost)
    }

    async fn find_boost_by_name(&self, name: &str) -> Result<Option<Boost>> {
        Ok(self
            .state
            .lock()
            .boosts
            .iter()
            .find(|b| b.name == name)
            .cloned())
    }

    async fn set_boost_active(&self, boost_id: i64, is_active: bool) -> Result<()> {
        let mut state = self.state.lock();
        let boost = state
            .boosts
            .iter_mut()
            .find(|b| b.id == boost_id)
            .ok_or_else(|| RewardError::BoostNotFound(boost_id.to_string()))?;
        boost.is_active = is_active;
        Ok(())
    }

    async fn create_player_boost(
        &self,
        player_id: i64,
        boost_id: i64,
        activated_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<PlayerBoost> {
        let mut state = self.state.lock();

        if !state.player_exists(player_id) {
            return Err(RewardError::PlayerNotFound(player_id.to_string()));
        }
        if !state.boosts.iter().any(|b| b.id == boost_id) {
            return Err(RewardError::BoostNotFound(boost_id.to_string()));
        }

        let player_boost = PlayerBoost {
            id: state.next_id(),
            player_id,
            boost_id,
            activated_at,
            expires_at,
            is_active: true,
        };
        state.player_boosts.push(player_boost.clone());
        Ok(player_boost)
    }

    async fn list_player_boosts(&self, player_id: i64) -> Result<Vec<PlayerBoost>> {
        let mut boosts: Vec<PlayerBoost> = self
            .state
            .lock()
            .player_boosts
            .iter()
            .filter(|pb| pb.player_id == player_id)
            .cloned()
            .collect();
        boosts.sort_by(|a, b| (b.activated_at, b.id).cmp(&(a.activated_at, a.id)));
        Ok(boosts)
    }

    async fn deactivate_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut state = self.state.lock();
        let mut updated = 0;
        for pb in state.player_boosts.iter_mut() {
            if pb.is_active && pb.is_expired(now) {
                pb.is_active = false;
                updated += 1;
            }
        }
        Ok(updated)
    }
}
