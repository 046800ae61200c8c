use actix_web::{HttpResponse, Responder, get, post, web};
use log::{debug, info, warn};

use super::models::{
    AppState, MempoolResponse, NewTxRequest, error_response, parse_amount, with_ledger,
};

/// Submit a new transaction into the pending pool.
#[post("/tx/")]
pub async fn post_transaction(
    state: web::Data<AppState>,
    body: web::Json<NewTxRequest>,
) -> actix_web::Result<impl Responder> {
    let sender = body.sender.trim().to_string();
    let receiver = body.receiver.trim().to_string();
    if sender.is_empty() || receiver.is_empty() {
        warn!("POST /tx/ - rejected: missing sender or receiver");
        return Ok(HttpResponse::BadRequest().body("sender and receiver are required"));
    }

    let amount = match parse_amount(&body.amount) {
        Ok(a) => a,
        Err(e) => return Ok(error_response(&e)),
    };
    let currency = body
        .currency
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);

    let added = with_ledger(&state, move |ledger| {
        ledger
            .add_transaction(&sender, &receiver, amount, currency.as_deref())
            .map(|tx| (tx, ledger.pending().len()))
    })
    .await?;

    Ok(match added {
        Ok((tx, pending)) => {
            info!(
                "POST /tx/ - {} -> {} {} {} accepted (pending={})",
                tx.sender, tx.receiver, tx.amount, tx.currency, pending
            );
            HttpResponse::Created().json(tx)
        }
        Err(e) => error_response(&e),
    })
}

/// List the pending pool in inclusion order.
#[get("/mempool/")]
pub async fn get_mempool(state: web::Data<AppState>) -> actix_web::Result<impl Responder> {
    let transactions = with_ledger(&state, |ledger| ledger.pending().to_vec()).await?;
    debug!("GET /mempool/ - size={}", transactions.len());
    Ok(HttpResponse::Ok().json(MempoolResponse {
        size: transactions.len(),
        transactions,
    }))
}
