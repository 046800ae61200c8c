use actix_web::{HttpResponse, Responder, post, web};
use log::error;

use super::models::{AppState, AttackRequest, error_response};
use crate::attack::{AttackKind, AttackOutcome};
use crate::error::LedgerError;

#[post("/attack/race/")]
pub async fn race_attack(state: web::Data<AppState>, body: web::Json<AttackRequest>) -> impl Responder {
    run(state, body.into_inner(), AttackKind::Race).await
}

#[post("/attack/majority/")]
pub async fn majority_attack(
    state: web::Data<AppState>,
    body: web::Json<AttackRequest>,
) -> impl Responder {
    run(state, body.into_inner(), AttackKind::Majority).await
}

/// Scenarios mine several blocks and must see one consistent honest chain,
/// so they hold the ledger lock throughout. Running on the blocking pool
/// keeps that wait off the async workers, where other handlers also lock.
async fn run(state: web::Data<AppState>, req: AttackRequest, kind: AttackKind) -> HttpResponse {
    let outcome = web::block(move || -> Result<AttackOutcome, LedgerError> {
        let mut ledger = state.ledger.lock().expect("mutex poisoned");
        let (victim, attacker) = req.to_pair(ledger.reward_currency())?;
        match kind {
            AttackKind::Race => state.simulator.race_attack(&mut ledger, victim, attacker),
            AttackKind::Majority => state.simulator.majority_attack(&mut ledger, victim, attacker),
        }
    })
    .await;

    match outcome {
        Ok(Ok(outcome)) => HttpResponse::Ok().json(outcome),
        Ok(Err(e)) => error_response(&e),
        Err(e) => {
            error!("attack task failed: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}
