#![forbid(unsafe_code)]

use std::sync::Arc;

use poem::Request;
use poem_openapi::{ OpenApi, payload::Json, Object, param::Query, ApiResponse };
use log::{debug, error, warn};

use crate::classifier;
use crate::utils::errors::Errors;
use crate::utils::facts::{FactSource, fallback_fact};
use crate::utils::numclass_utils::{RequestDebug, debug_request};

// ***************************************************************************
//                          Request/Response Definiions
// ***************************************************************************
pub struct ClassifyNumberApi {
    facts: Arc<dyn FactSource>,
}

struct ReqClassifyNumber
{
    number: Option<String>,
}

#[derive(Object, Debug)]
pub struct RespClassifyNumber
{
    number: i64,
    is_prime: bool,
    is_perfect: bool,
    properties: Vec<String>,
    digit_sum: u64,
    fun_fact: String,
}

/// Returned in place of a classification.  The number is the raw query
/// value, left out when the parameter wasn't sent.
#[derive(Object, Debug)]
pub struct RespClassifyError
{
    #[oai(skip_serializing_if_is_none)]
    number: Option<String>,
    error: bool,
}

// Implement the debug record trait for logging.
impl RequestDebug for ReqClassifyNumber {
    type Req = ReqClassifyNumber;
    fn get_request_info(&self) -> String {
        let mut s = String::with_capacity(64);
        s.push_str("  Request parameters:");
        s.push_str("\n    number: ");
        s.push_str(self.number.as_deref().unwrap_or("<missing>"));
        s
    }
}

// ------------------- HTTP Status Codes -------------------
#[derive(Debug, ApiResponse)]
enum ClassifyResponse {
    #[oai(status = 200)]
    Http200(Json<RespClassifyNumber>),
    #[oai(status = 400)]
    Http400(Json<RespClassifyError>),
    #[oai(status = 500)]
    Http500(Json<RespClassifyError>),
}

fn make_http_200(resp: RespClassifyNumber) -> ClassifyResponse {
    ClassifyResponse::Http200(Json(resp))
}
fn make_http_400(number: Option<String>) -> ClassifyResponse {
    ClassifyResponse::Http400(Json(RespClassifyError::new(number)))
}
fn make_http_500(number: Option<String>) -> ClassifyResponse {
    ClassifyResponse::Http500(Json(RespClassifyError::new(number)))
}

// ***************************************************************************
//                             OpenAPI Endpoint
// ***************************************************************************
#[OpenApi]
impl ClassifyNumberApi {
    #[oai(path = "/classify-number", method = "get")]
    async fn classify_number_api(&self, http_req: &Request, number: Query<Option<String>>) -> ClassifyResponse {
        // Package the request parameters.
        let req = ReqClassifyNumber {number: number.0};
        debug_request(http_req, &req);

        // -------------------- Validate -----------------------------
        let value = match parse_number(req.number.as_deref()) {
            Ok(n) => n,
            Err(e) => {
                debug!("{}", e);
                return make_http_400(req.number);
            }
        };

        // -------------------- Process Request ----------------------
        // The request runs in its own task so that a panic anywhere in
        // classification or fact lookup still produces a 500.
        let facts = self.facts.clone();
        let task = tokio::spawn(async move {
            RespClassifyNumber::process(value, facts.as_ref()).await
        });
        let result = match task.await {
            Ok(r) => r,
            Err(e) => Err(Errors::Internal(format!("processing of {} failed: {}", value, e))),
        };

        match result {
            Ok(r) => make_http_200(r),
            Err(e) => {
                let msg = "ERROR: ".to_owned() + e.to_string().as_str();
                error!("{}", msg);
                make_http_500(req.number)
            }
        }
    }
}

impl ClassifyNumberApi {
    pub fn new(facts: Arc<dyn FactSource>) -> Self {
        Self {facts}
    }
}

// ***************************************************************************
//                          Request/Response Methods
// ***************************************************************************
impl RespClassifyNumber {
    /// Classify the number and attach a fact about it.
    async fn process(number: i64, facts: &dyn FactSource) -> Result<RespClassifyNumber, Errors> {
        // Trial division on a large prime takes seconds, so keep it off
        // the request workers.
        let classified = tokio::task::spawn_blocking(move || {
            (classifier::is_prime(number),
             classifier::is_perfect(number),
             classifier::properties(number),
             classifier::digit_sum(number))
        }).await;
        let (is_prime, is_perfect, properties, digit_sum) = match classified {
            Ok(c) => c,
            Err(e) => return Err(Errors::Internal(format!("classification of {} failed: {}", number, e))),
        };

        let fun_fact = get_fun_fact(number, facts).await;

        Ok(Self {number, is_prime, is_perfect, properties, digit_sum, fun_fact})
    }
}

impl RespClassifyError {
    fn new(number: Option<String>) -> Self {
        Self {number, error: true}
    }
}

// ***************************************************************************
//                          Private Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// parse_number:
// ---------------------------------------------------------------------------
/** Convert the raw query value into an integer.  The conversion follows
 * javascript number coercion:
 *
 *   - empty or whitespace-only values are 0,
 *   - unsigned 0x, 0o and 0b literals are hex, octal and binary,
 *   - plain integers take an optional sign,
 *   - decimal or exponent notation is accepted when its value is exactly
 *     an integer (4.0, 1e3).
 *
 * Absent, non-numeric, fractional, non-finite and out of range values are
 * rejected.
 */
fn parse_number(raw: Option<&str>) -> Result<i64, Errors> {
    let raw = match raw {
        Some(r) => r,
        None => return Err(Errors::InvalidInput("missing number parameter".to_string())),
    };

    let s = raw.trim();
    if s.is_empty() {
        return Ok(0);
    }
    if let Some(n) = parse_radix_literal(s) {
        return n.ok_or_else(|| Errors::InvalidInput(raw.to_string()));
    }
    if let Ok(n) = s.parse::<i64>() {
        return Ok(n);
    }

    let f: f64 = match s.parse() {
        Ok(f) => f,
        Err(_) => return Err(Errors::InvalidInput(raw.to_string())),
    };
    if !f.is_finite() || f.fract() != 0.0 {
        return Err(Errors::InvalidInput(raw.to_string()));
    }

    // i64::MAX as f64 rounds up to 2^63, which is itself out of range.
    if f < i64::MIN as f64 || f >= i64::MAX as f64 {
        return Err(Errors::InvalidInput(raw.to_string()));
    }
    Ok(f as i64)
}

// ---------------------------------------------------------------------------
// parse_radix_literal:
// ---------------------------------------------------------------------------
/** None when the value has no 0x/0o/0b prefix, otherwise the parsed digits
 * or None inside when they are invalid or don't fit.  Signs are not allowed.
 */
fn parse_radix_literal(s: &str) -> Option<Option<i64>> {
    let prefix = s.get(..2)?.to_ascii_lowercase();
    let radix = match prefix.as_str() {
        "0x" => 16,
        "0o" => 8,
        "0b" => 2,
        _ => return None,
    };

    // from_str_radix takes a leading sign, javascript doesn't.
    let digits = &s[2..];
    if digits.starts_with(['+', '-']) {
        return Some(None);
    }
    Some(i64::from_str_radix(digits, radix).ok())
}

// ---------------------------------------------------------------------------
// get_fun_fact:
// ---------------------------------------------------------------------------
/** Ask the fact source once.  Any failure is replaced with the fallback
 * text and never reaches the caller.
 */
async fn get_fun_fact(number: i64, facts: &dyn FactSource) -> String {
    match facts.fetch_fact(number).await {
        Ok(fact) => fact,
        Err(e) => {
            warn!("Using fallback fact for {}: {}", number, e);
            fallback_fact(number)
        }
    }
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use futures::future::{BoxFuture, FutureExt};
    use poem::http::StatusCode;
    use poem::test::TestClient;
    use serde_json::json;

    use crate::build_app;
    use crate::utils::facts::NumbersApiClient;

    // Fact source with a canned answer that counts its lookups.
    struct StubFacts {
        answer: Result<String, String>,
        calls: AtomicUsize,
    }

    impl StubFacts {
        fn ok(fact: &str) -> Arc<Self> {
            Arc::new(Self {answer: Ok(fact.to_string()), calls: AtomicUsize::new(0)})
        }
        fn failing() -> Arc<Self> {
            Arc::new(Self {answer: Err("connection refused".to_string()), calls: AtomicUsize::new(0)})
        }
    }

    impl FactSource for StubFacts {
        fn fetch_fact(&self, _number: i64) -> BoxFuture<'_, Result<String, Errors>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let answer = self.answer.clone().map_err(Errors::FactLookup);
            async move { answer }.boxed()
        }
    }

    fn client(facts: Arc<StubFacts>) -> TestClient<impl poem::Endpoint> {
        TestClient::new(build_app(facts, "Number Classifier", "http://localhost:5000/api"))
    }

    #[test]
    fn parses_integers() {
        assert_eq!(parse_number(Some("371")).unwrap(), 371);
        assert_eq!(parse_number(Some("-42")).unwrap(), -42);
        assert_eq!(parse_number(Some("+7")).unwrap(), 7);
        assert_eq!(parse_number(Some(" 12 ")).unwrap(), 12);
        assert_eq!(parse_number(Some("4.0")).unwrap(), 4);
        assert_eq!(parse_number(Some("1e3")).unwrap(), 1000);
        assert_eq!(parse_number(Some("9223372036854775807")).unwrap(), i64::MAX);
        assert_eq!(parse_number(Some("-9223372036854775808")).unwrap(), i64::MIN);
    }

    #[test]
    fn parses_empty_as_zero() {
        assert_eq!(parse_number(Some("")).unwrap(), 0);
        assert_eq!(parse_number(Some("   ")).unwrap(), 0);
    }

    #[test]
    fn parses_radix_literals() {
        assert_eq!(parse_number(Some("0x1A")).unwrap(), 26);
        assert_eq!(parse_number(Some("0X1a")).unwrap(), 26);
        assert_eq!(parse_number(Some("0b101")).unwrap(), 5);
        assert_eq!(parse_number(Some("0o17")).unwrap(), 15);
        assert_eq!(parse_number(Some(" 0x10 ")).unwrap(), 16);
        assert_eq!(parse_number(Some("0x7fffffffffffffff")).unwrap(), i64::MAX);
    }

    #[test]
    fn rejects_non_integers() {
        for raw in ["abc", "4.5", "NaN", "inf", "-Infinity", "12abc", "1e300",
                    "9223372036854775808", "0x", "0xg1", "0b102", "0o8", "-0x10",
                    "0x-10", "+0b1", "0x8000000000000000"] {
            let result = parse_number(Some(raw));
            assert!(matches!(result, Err(Errors::InvalidInput(_))), "accepted {:?}", raw);
        }
        assert!(parse_number(None).is_err());
    }

    #[tokio::test]
    async fn classifies_armstrong_number() {
        let facts = StubFacts::ok("371 is a narcissistic number.");
        let resp = client(facts.clone())
            .get("/api/classify-number")
            .query("number", &"371")
            .send()
            .await;
        resp.assert_status_is_ok();
        resp.assert_json(json!({
            "number": 371,
            "is_prime": false,
            "is_perfect": false,
            "properties": ["armstrong", "odd"],
            "digit_sum": 11,
            "fun_fact": "371 is a narcissistic number."
        })).await;
        assert_eq!(facts.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn classifies_perfect_number() {
        let resp = client(StubFacts::ok("28 is perfect."))
            .get("/api/classify-number")
            .query("number", &"28")
            .send()
            .await;
        resp.assert_status_is_ok();
        resp.assert_json(json!({
            "number": 28,
            "is_prime": false,
            "is_perfect": true,
            "properties": ["even"],
            "digit_sum": 10,
            "fun_fact": "28 is perfect."
        })).await;
    }

    #[tokio::test]
    async fn classifies_prime_number() {
        let resp = client(StubFacts::ok("7 is lucky."))
            .get("/api/classify-number")
            .query("number", &"7")
            .send()
            .await;
        resp.assert_status_is_ok();
        resp.assert_json(json!({
            "number": 7,
            "is_prime": true,
            "is_perfect": false,
            "properties": ["armstrong", "odd"],
            "digit_sum": 7,
            "fun_fact": "7 is lucky."
        })).await;
    }

    #[tokio::test]
    async fn negative_number_uses_absolute_digits() {
        let resp = client(StubFacts::ok("-153 is negative."))
            .get("/api/classify-number")
            .query("number", &"-153")
            .send()
            .await;
        resp.assert_status_is_ok();
        resp.assert_json(json!({
            "number": -153,
            "is_prime": false,
            "is_perfect": false,
            "properties": ["armstrong", "odd"],
            "digit_sum": 9,
            "fun_fact": "-153 is negative."
        })).await;
    }

    #[tokio::test]
    async fn rejects_non_numeric_input() {
        let facts = StubFacts::ok("unused");
        let resp = client(facts.clone())
            .get("/api/classify-number")
            .query("number", &"abc")
            .send()
            .await;
        resp.assert_status(StatusCode::BAD_REQUEST);
        resp.assert_json(json!({"number": "abc", "error": true})).await;
        assert_eq!(facts.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rejects_fractional_input() {
        let resp = client(StubFacts::ok("unused"))
            .get("/api/classify-number")
            .query("number", &"4.5")
            .send()
            .await;
        resp.assert_status(StatusCode::BAD_REQUEST);
        resp.assert_json(json!({"number": "4.5", "error": true})).await;
    }

    #[tokio::test]
    async fn rejects_missing_parameter() {
        let resp = client(StubFacts::ok("unused"))
            .get("/api/classify-number")
            .send()
            .await;
        resp.assert_status(StatusCode::BAD_REQUEST);
        resp.assert_json(json!({"error": true})).await;
    }

    #[tokio::test]
    async fn empty_value_classifies_zero() {
        let resp = client(StubFacts::ok("0 is nothing."))
            .get("/api/classify-number")
            .query("number", &"")
            .send()
            .await;
        resp.assert_status_is_ok();
        resp.assert_json(json!({
            "number": 0,
            "is_prime": false,
            "is_perfect": false,
            "properties": ["armstrong", "even"],
            "digit_sum": 0,
            "fun_fact": "0 is nothing."
        })).await;
    }

    #[tokio::test]
    async fn classifies_radix_literals() {
        let cli = client(StubFacts::ok("radix"));
        let cases = [
            ("0x1A", json!({"number": 26, "is_prime": false, "is_perfect": false,
                            "properties": ["even"], "digit_sum": 8, "fun_fact": "radix"})),
            ("0b101", json!({"number": 5, "is_prime": true, "is_perfect": false,
                             "properties": ["armstrong", "odd"], "digit_sum": 5, "fun_fact": "radix"})),
            ("0o17", json!({"number": 15, "is_prime": false, "is_perfect": false,
                            "properties": ["odd"], "digit_sum": 6, "fun_fact": "radix"})),
        ];
        for (raw, expected) in cases {
            let resp = cli
                .get("/api/classify-number")
                .query("number", &raw)
                .send()
                .await;
            resp.assert_status_is_ok();
            resp.assert_json(expected).await;
        }
    }

    #[tokio::test]
    async fn failed_lookup_uses_fallback() {
        let facts = StubFacts::failing();
        let resp = client(facts.clone())
            .get("/api/classify-number")
            .query("number", &"371")
            .send()
            .await;
        resp.assert_status_is_ok();
        resp.assert_json(json!({
            "number": 371,
            "is_prime": false,
            "is_perfect": false,
            "properties": ["armstrong", "odd"],
            "digit_sum": 11,
            "fun_fact": "371 is a number"
        })).await;
        assert_eq!(facts.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unreachable_service_uses_fallback() {
        // Nothing listens on the discard port.
        let facts = NumbersApiClient::new("http://127.0.0.1:9", 2).unwrap();
        let cli = TestClient::new(build_app(Arc::new(facts), "Number Classifier", "http://localhost:5000/api"));
        let resp = cli
            .get("/api/classify-number")
            .query("number", &"371")
            .send()
            .await;
        resp.assert_status_is_ok();
        resp.assert_json(json!({
            "number": 371,
            "is_prime": false,
            "is_perfect": false,
            "properties": ["armstrong", "odd"],
            "digit_sum": 11,
            "fun_fact": "371 is a number"
        })).await;
    }

    #[tokio::test]
    async fn repeated_requests_agree() {
        let cli = client(StubFacts::ok("9474 is fun."));
        for _ in 0..3 {
            let resp = cli
                .get("/api/classify-number")
                .query("number", &"9474")
                .send()
                .await;
            resp.assert_status_is_ok();
            resp.assert_json(json!({
                "number": 9474,
                "is_prime": false,
                "is_perfect": false,
                "properties": ["armstrong", "even"],
                "digit_sum": 24,
                "fun_fact": "9474 is fun."
            })).await;
        }
    }

    // Fact source whose lookup panics instead of failing.
    struct PanickingFacts;

    impl FactSource for PanickingFacts {
        fn fetch_fact(&self, number: i64) -> BoxFuture<'_, Result<String, Errors>> {
            async move {
                if number != 0 {
                    panic!("fact source blew up on {}", number);
                }
                Ok(number.to_string())
            }.boxed()
        }
    }

    #[tokio::test]
    async fn panicking_lookup_is_internal_error() {
        let cli = TestClient::new(build_app(Arc::new(PanickingFacts), "Number Classifier",
                                            "http://localhost:5000/api"));
        let resp = cli
            .get("/api/classify-number")
            .query("number", &"371")
            .send()
            .await;
        resp.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        resp.assert_json(json!({"number": "371", "error": true})).await;
    }

    #[tokio::test]
    async fn open_cors_policy() {
        let resp = client(StubFacts::ok("1 is one."))
            .get("/api/classify-number")
            .query("number", &"1")
            .header("Origin", "http://elsewhere.example.com")
            .send()
            .await;
        resp.assert_status_is_ok();
        resp.assert_header_exist("access-control-allow-origin");
    }
}
