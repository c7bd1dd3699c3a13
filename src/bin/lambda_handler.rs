//! AWS Lambda handler for ECL calculations
//!
//! Accepts a single loan or `{"loans": [...]}` as JSON and returns the ECL
//! result(s). Supports Lambda Function URLs for direct HTTP access.

use ecl_engine::batch::{EclRunner, PortfolioSummary};
use ecl_engine::{EclResult, EngineError, Loan};
use lambda_http::{run, service_fn, Body, Error, Request, Response};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EclRequest {
    Batch {
        loans: Vec<Loan>,
        /// Follow each loan's IFRS 9 stage instead of lifetime ECL
        #[serde(default)]
        staged: bool,
    },
    Single(Loan),
}

#[derive(Debug, Serialize)]
struct BatchResponse {
    summary: PortfolioSummary,
    results: Vec<EclResult>,
    execution_time_ms: u64,
}

fn cors(builder: lambda_http::http::response::Builder) -> lambda_http::http::response::Builder {
    builder
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "POST, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type")
}

fn error_response(status: u16, message: &str) -> Result<Response<Body>, Error> {
    let body = serde_json::json!({ "error": message }).to_string();
    Ok(cors(Response::builder())
        .status(status)
        .header("Content-Type", "application/json")
        .body(Body::Text(body))?)
}

fn json_response<T: Serialize>(body: &T) -> Result<Response<Body>, Error> {
    Ok(cors(Response::builder())
        .status(200)
        .header("Content-Type", "application/json")
        .body(Body::Text(serde_json::to_string(body)?))?)
}

fn warn_out_of_range(loan: &Loan) {
    let fields = loan.out_of_range_fields();
    if !fields.is_empty() {
        log::warn!("loan {} has values outside [0, 1]: {}", loan.loan_id, fields.join(", "));
    }
}

async fn handler(event: Request) -> Result<Response<Body>, Error> {
    let start = std::time::Instant::now();

    // Handle CORS preflight
    if event.method().as_str() == "OPTIONS" {
        return Ok(cors(Response::builder()).status(200).body(Body::Empty)?);
    }

    let body_str = match event.body() {
        Body::Text(s) => s.clone(),
        Body::Binary(b) => String::from_utf8_lossy(b).to_string(),
        Body::Empty => "{}".to_string(),
    };

    let request: EclRequest = match serde_json::from_str(&body_str) {
        Ok(r) => r,
        Err(e) => return error_response(400, &format!("Invalid JSON: {e}")),
    };

    match request {
        EclRequest::Single(loan) => {
            warn_out_of_range(&loan);
            match EclRunner::new().run(&loan) {
                Ok(result) => json_response(&result),
                Err(e @ EngineError::InvalidInput { .. }) => error_response(422, &e.to_string()),
                Err(e) => {
                    log::error!("error calculating ECL: {e}");
                    error_response(500, "Internal Server Error")
                }
            }
        }
        EclRequest::Batch { loans, staged } => {
            loans.iter().for_each(warn_out_of_range);
            let runner = if staged { EclRunner::staged() } else { EclRunner::new() };
            let (results, summary) = runner.run_portfolio(&loans);
            json_response(&BatchResponse {
                summary,
                results,
                execution_time_ms: start.elapsed().as_millis() as u64,
            })
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();
    run(service_fn(handler)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_single_loan_is_parsed_and_flagged() {
        let body = r#"{"loan_amount": 10000, "annual_interest_rate": 0.06, "annual_pd": 1.2,
                       "lgd": 0.45, "eir": 0.06, "term_months": 12}"#;
        let EclRequest::Single(loan) = serde_json::from_str::<EclRequest>(body).unwrap() else {
            panic!("expected a single loan");
        };
        assert_eq!(loan.out_of_range_fields(), vec!["annual_pd"]);
        assert!(EclRunner::new().run(&loan).is_ok());
    }

    #[test]
    fn test_batch_request_defaults_to_lifetime() {
        let body = r#"{"loans": [{"loan_amount": 10000, "annual_interest_rate": 0.06,
                       "annual_pd": 0.05, "lgd": -0.1, "eir": 0.06, "term_months": 12}]}"#;
        let EclRequest::Batch { loans, staged } = serde_json::from_str::<EclRequest>(body).unwrap() else {
            panic!("expected a batch");
        };
        assert!(!staged);
        assert_eq!(loans[0].out_of_range_fields(), vec!["lgd"]);
    }
}
