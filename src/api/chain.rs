use actix_web::{HttpResponse, Responder, get, post, web};
use log::{info, warn};

use super::models::{
    AppState, ChainResponse, MineRequest, MineResponse, ResolveRequest, ResolveResponse,
    ValidateResponse, error_response, with_ledger,
};
use crate::blockchain::ForkChoice;
use crate::error::LedgerError;

/// Times a sealed block is re-mined after losing the tip to another writer.
const MAX_MINE_ATTEMPTS: u32 = 3;

/// Get the full blockchain.
#[get("/chain/")]
pub async fn get_chain(state: web::Data<AppState>) -> actix_web::Result<impl Responder> {
    let resp = with_ledger(&state, |ledger| ChainResponse {
        length: ledger.len(),
        difficulty: ledger.difficulty(),
        chain: ledger.chain().to_vec(),
    })
    .await?;
    Ok(HttpResponse::Ok().json(resp))
}

/// Validate the whole chain.
#[get("/validate/")]
pub async fn validate_chain(state: web::Data<AppState>) -> actix_web::Result<impl Responder> {
    let resp = with_ledger(&state, |ledger| {
        let result = ledger.validate();
        ValidateResponse {
            valid: result.is_ok(),
            length: ledger.len(),
            difficulty: ledger.difficulty(),
            error: result.err().map(|e| e.to_string()),
        }
    })
    .await?;
    Ok(HttpResponse::Ok().json(resp))
}

/// Mine the pending pool plus a coinbase to `miner_address`.
///
/// Snapshot under the lock, release before PoW, then re-lock to commit.
/// If the tip moved meanwhile the block is rebuilt and sealed again.
#[post("/mine/")]
pub async fn mine_block(
    state: web::Data<AppState>,
    req: web::Json<MineRequest>,
) -> actix_web::Result<impl Responder> {
    let miner_address = req.miner_address.trim().to_string();
    if miner_address.is_empty() {
        return Ok(HttpResponse::BadRequest().body("miner_address required"));
    }

    let data = state.clone();
    let mined = web::block(move || -> Result<MineResponse, LedgerError> {
        let mut attempt = 1;
        loop {
            let mut job = data
                .ledger
                .lock()
                .expect("mutex poisoned")
                .prepare_block(&miner_address);
            job.seal()?;

            let difficulty = job.difficulty();
            let mut ledger = data.ledger.lock().expect("mutex poisoned");
            match ledger.commit_block(job) {
                Ok(b) => {
                    return Ok(MineResponse {
                        mined_index: b.index,
                        hash: b.hash.clone(),
                        nonce: b.nonce,
                        difficulty,
                        transactions: b.transactions.len(),
                    });
                }
                Err(LedgerError::StaleBlock { index }) if attempt < MAX_MINE_ATTEMPTS => {
                    warn!("POST /mine/ - block #{index} went stale, retrying (attempt {attempt})");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    })
    .await?;

    Ok(match mined {
        Ok(resp) => HttpResponse::Ok().json(resp),
        Err(e) => error_response(&e),
    })
}

/// Offer a peer's chain. It replaces ours only if strictly longer and valid.
#[post("/chain/resolve/")]
pub async fn resolve_chain(
    state: web::Data<AppState>,
    body: web::Json<ResolveRequest>,
) -> actix_web::Result<impl Responder> {
    let candidate = body.into_inner().chain;
    let (choice, length) = with_ledger(&state, move |ledger| {
        let choice = ledger.replace_chain(candidate);
        (choice, ledger.len())
    })
    .await?;

    let reason = match &choice {
        ForkChoice::Replace => None,
        ForkChoice::KeepShorter { local, candidate } => Some(format!(
            "candidate length {candidate} does not exceed local length {local}"
        )),
        ForkChoice::KeepInvalid(e) => Some(e.to_string()),
    };
    info!(
        "POST /chain/resolve/ - replaced={} length={}",
        choice.is_replace(),
        length
    );

    Ok(HttpResponse::Ok().json(ResolveResponse {
        replaced: choice.is_replace(),
        length,
        reason,
    }))
}
