use actix_web::{HttpResponse, error::BlockingError, web};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Mutex;

use crate::attack::AttackSimulator;
use crate::blockchain::{Block, Ledger};
use crate::error::LedgerError;
use crate::transaction::{Amount, Transaction};

/// Shared application state: the honest ledger and the attack simulator.
pub struct AppState {
    pub ledger: Mutex<Ledger>,
    pub simulator: AttackSimulator,
}

impl AppState {
    pub fn new(ledger: Ledger, simulator: AttackSimulator) -> Self {
        Self {
            ledger: Mutex::new(ledger),
            simulator,
        }
    }
}

/// Run `f` against the locked ledger on the blocking pool, so a long mine
/// or attack scenario holding the lock never parks an async worker.
pub async fn with_ledger<F, R>(state: &web::Data<AppState>, f: F) -> Result<R, BlockingError>
where
    F: FnOnce(&mut Ledger) -> R + Send + 'static,
    R: Send + 'static,
{
    let state = state.clone();
    web::block(move || {
        let mut ledger = state.ledger.lock().expect("mutex poisoned");
        f(&mut ledger)
    })
    .await
}

/// Map a core error onto an HTTP response.
pub fn error_response(err: &LedgerError) -> HttpResponse {
    warn!("request failed: {err}");
    match err {
        LedgerError::MiningFailure { .. } => HttpResponse::ServiceUnavailable().body(err.to_string()),
        LedgerError::StaleBlock { .. } => HttpResponse::Conflict().body(err.to_string()),
        _ => HttpResponse::BadRequest().body(err.to_string()),
    }
}

/// Accepts a JSON number or a decimal string.
pub fn parse_amount(value: &Value) -> Result<Amount, LedgerError> {
    match value {
        Value::String(s) => s.parse(),
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Amount::from_whole(u)
            } else if let Some(f) = n.as_f64() {
                if f < 0.0 {
                    return Err(LedgerError::InvalidAmount(format!("{n} is negative")));
                }
                Amount::from_f64(f)
            } else {
                Err(LedgerError::InvalidAmount(format!("{n} is not a number")))
            }
        }
        other => Err(LedgerError::InvalidAmount(format!(
            "{other} is not numeric"
        ))),
    }
}

/* ---------- Chain API Models ---------- */

#[derive(Serialize)]
pub struct ChainResponse {
    pub length: usize,
    pub difficulty: u32,
    pub chain: Vec<Block>,
}

#[derive(Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub length: usize,
    pub difficulty: u32,
    pub error: Option<String>,
}

#[derive(Deserialize)]
pub struct MineRequest {
    pub miner_address: String,
}

#[derive(Serialize, Deserialize)]
pub struct MineResponse {
    pub mined_index: u64,
    pub hash: String,
    pub nonce: u64,
    pub difficulty: u32,
    pub transactions: usize,
}

#[derive(Deserialize)]
pub struct ResolveRequest {
    pub chain: Vec<Block>,
}

#[derive(Serialize, Deserialize)]
pub struct ResolveResponse {
    pub replaced: bool,
    pub length: usize,
    pub reason: Option<String>,
}

/* ---------- TX API Models ---------- */

#[derive(Deserialize)]
pub struct NewTxRequest {
    pub sender: String,
    pub receiver: String,
    pub amount: Value,
    pub currency: Option<String>,
}

#[derive(Serialize)]
pub struct MempoolResponse {
    pub size: usize,
    pub transactions: Vec<Transaction>,
}

/* ---------- Attack API Models ---------- */

#[derive(Deserialize)]
pub struct AttackRequest {
    pub sender: String,
    pub victim: String,
    pub attacker: String,
    pub amount: Value,
    pub currency: Option<String>,
}

impl AttackRequest {
    /// Builds the (victim, attacker) double-spend pair.
    pub fn to_pair(&self, default_currency: &str) -> Result<(Transaction, Transaction), LedgerError> {
        let amount = parse_amount(&self.amount)?;
        let currency = self
            .currency
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(default_currency);
        Ok((
            Transaction::new(self.sender.as_str(), self.victim.as_str(), amount, currency),
            Transaction::new(self.sender.as_str(), self.attacker.as_str(), amount, currency),
        ))
    }
}
