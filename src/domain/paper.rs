//! Paper trading: the engine driven one quote at a time.
//!
//! A [`PaperSession`] owns its engine state for the session's lifetime.
//! [`PaperTradingDesk`] keeps at most one live session per
//! (symbol, strategy id) and serializes calls into each session with that
//! session's own mutex, so different keys never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::backtest::{BacktestConfig, BacktestResult};
use super::bar::Bar;
use super::engine::Engine;
use super::error::TradesimError;
use super::execution::ExecutionState;
use super::metrics::{AnalysisConfig, Metrics};
use super::portfolio::PortfolioState;
use super::position::Trade;
use super::risk::RiskState;
use super::strategy::{SignalGenerator, StrategyConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub symbol: String,
    pub strategy_id: String,
    pub active: bool,
    pub bars_processed: usize,
    pub last_timestamp: Option<NaiveDateTime>,
    pub execution_state: ExecutionState,
    pub portfolio: PortfolioState,
    /// Open position marked at the last close; None when flat.
    pub unrealized_pnl: Option<f64>,
    pub risk_state: RiskState,
    pub trade_count: usize,
    pub metrics: Metrics,
}

#[derive(Debug)]
pub struct PaperSession {
    engine: Engine,
    analysis: AnalysisConfig,
    result: Option<BacktestResult>,
}

impl PaperSession {
    /// Validate `config` and open a session. `close_open_position` is not
    /// consulted: stopping a session never liquidates.
    pub fn start(strategy: &StrategyConfig, config: &BacktestConfig) -> Result<Self, TradesimError> {
        config.validate()?;
        let strategy = strategy.build()?;
        let engine = Engine::new(
            &config.symbol,
            strategy,
            config.risk_limits.clone(),
            config.initial_capital,
            config.execution.clone(),
        )?;
        info!(
            symbol = %engine.symbol(),
            strategy = %engine.strategy().id(),
            capital = config.initial_capital,
            "paper session started"
        );
        Ok(PaperSession {
            engine,
            analysis: config.analysis(),
            result: None,
        })
    }

    pub fn symbol(&self) -> &str {
        self.engine.symbol()
    }

    pub fn strategy_id(&self) -> String {
        self.engine.strategy().id()
    }

    pub fn is_active(&self) -> bool {
        self.result.is_none()
    }

    /// Process one quote. Protocol violations are rejected and leave the
    /// session as it was.
    pub fn on_tick(&mut self, bar: Bar) -> Result<Option<Trade>, TradesimError> {
        if !self.is_active() {
            return Err(TradesimError::SessionClosed {
                symbol: self.symbol().to_string(),
                strategy: self.strategy_id(),
            });
        }
        self.engine.on_bar(bar).inspect_err(|err| {
            warn!(symbol = %self.engine.symbol(), error = %err, "tick rejected");
        })
    }

    pub fn status(&self) -> SessionStatus {
        let engine = &self.engine;
        let portfolio = engine.portfolio();
        let unrealized_pnl = portfolio
            .position
            .as_ref()
            .zip(portfolio.last_price)
            .map(|(position, price)| position.unrealized_pnl(price));
        SessionStatus {
            symbol: engine.symbol().to_string(),
            strategy_id: engine.strategy().id(),
            active: self.is_active(),
            bars_processed: engine.bars_seen(),
            last_timestamp: engine.last_timestamp(),
            execution_state: engine.execution_state(),
            portfolio: portfolio.clone(),
            unrealized_pnl,
            risk_state: engine.risk_state().clone(),
            trade_count: engine.trades().len(),
            metrics: Metrics::compute(engine.equity_curve(), engine.trades(), &self.analysis),
        }
    }

    /// End the session and return its result. Calling again returns the
    /// same result.
    pub fn stop(&mut self) -> BacktestResult {
        if let Some(result) = &self.result {
            return result.clone();
        }
        let result = BacktestResult::from_engine(&self.engine, &self.analysis);
        info!(
            symbol = %result.symbol,
            strategy = %result.strategy_id,
            bars = result.bars_processed,
            trades = result.trades.len(),
            "paper session stopped"
        );
        self.result = Some(result.clone());
        result
    }
}

type SessionKey = (String, String);
type Registry = Arc<Mutex<HashMap<SessionKey, Arc<Mutex<PaperSession>>>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic mid-tick cannot leave the engine half-updated in a way later
    // calls depend on, so a poisoned lock is still usable.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Registry of live paper sessions.
#[derive(Debug, Default, Clone)]
pub struct PaperTradingDesk {
    sessions: Registry,
}

impl PaperTradingDesk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(
        &self,
        strategy: &StrategyConfig,
        config: &BacktestConfig,
    ) -> Result<SessionHandle, TradesimError> {
        let key = (config.symbol.clone(), strategy.build()?.id());

        let mut sessions = lock(&self.sessions);
        if sessions.contains_key(&key) {
            return Err(TradesimError::SessionAlreadyActive {
                symbol: key.0,
                strategy: key.1,
            });
        }
        let session = Arc::new(Mutex::new(PaperSession::start(strategy, config)?));
        sessions.insert(key.clone(), Arc::clone(&session));
        Ok(SessionHandle {
            key,
            session,
            registry: Arc::clone(&self.sessions),
        })
    }

    pub fn handle(&self, symbol: &str, strategy_id: &str) -> Option<SessionHandle> {
        let key = (symbol.to_string(), strategy_id.to_string());
        let session = lock(&self.sessions).get(&key).cloned()?;
        Some(SessionHandle {
            key,
            session,
            registry: Arc::clone(&self.sessions),
        })
    }

    pub fn active_sessions(&self) -> Vec<(String, String)> {
        let mut keys: Vec<SessionKey> = lock(&self.sessions).keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Stop every live session, in key order.
    pub fn stop_all(&self) -> Vec<BacktestResult> {
        let handles: Vec<SessionHandle> = self
            .active_sessions()
            .iter()
            .filter_map(|(symbol, strategy)| self.handle(symbol, strategy))
            .collect();
        handles.iter().map(SessionHandle::stop).collect()
    }
}

/// Shared access to one live session. Cloning the handle shares the session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    key: SessionKey,
    session: Arc<Mutex<PaperSession>>,
    registry: Registry,
}

impl SessionHandle {
    pub fn symbol(&self) -> &str {
        &self.key.0
    }

    pub fn strategy_id(&self) -> &str {
        &self.key.1
    }

    pub fn on_tick(&self, bar: Bar) -> Result<Option<Trade>, TradesimError> {
        lock(&self.session).on_tick(bar)
    }

    pub fn status(&self) -> SessionStatus {
        lock(&self.session).status()
    }

    /// Stop the session and release its key. Waits for an in-flight tick to
    /// finish first.
    pub fn stop(&self) -> BacktestResult {
        let result = lock(&self.session).stop();
        let mut sessions = lock(&self.registry);
        if sessions
            .get(&self.key)
            .is_some_and(|live| Arc::ptr_eq(live, &self.session))
        {
            sessions.remove(&self.key);
        }
        result
    }
}
