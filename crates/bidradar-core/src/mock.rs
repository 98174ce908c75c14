//! Offline record source with failure injection.
//!
//! Generated items use the upstream field names, so mock runs go through the
//! same normalizer as live runs. Bids and awards share one identifier scheme
//! (`YYYYMM` + 5-digit sequence) and therefore correlate.

use chrono::{Duration as ChronoDuration, NaiveDate};
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::normalize::{RawRecord, RecordKind};
use crate::retry::{BackoffPolicy, FailureClass, Sleeper, TransportKind};
use crate::retry_queue::RetryQueueEntry;

pub const MOCK_FAILURE_OPERATION: &str = "mock_failure_injection";

const COMPANY_PREFIXES: &[&str] = &["한국", "대한", "글로벌", "테크", "솔루션"];
const COMPANY_SUFFIXES: &[&str] = &["정보", "시스템", "산업", "기술"];
const AGENCIES: &[&str] = &[
    "서울특별시청",
    "부산광역시청",
    "경기도청",
    "대전광역시 교육청",
    "충남도청",
    "제주특별자치도청",
    "조달청",
];
const BID_TITLES: &[&str] = &[
    "청사 시설 보수 공사",
    "차세대 정보화 시스템 구축",
    "홍보 컨설팅 용역",
    "사무용 물품 구매",
    "도로 건설 공사",
    "행정 서비스 운영 용역",
    "연구 장비 임차",
];

/// Failure mode chosen for an injected failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    ServerError,
    Timeout,
}

impl InjectedFailure {
    pub fn class(self) -> FailureClass {
        match self {
            InjectedFailure::ServerError => FailureClass::ServerError,
            InjectedFailure::Timeout => FailureClass::Transport(TransportKind::Timeout),
        }
    }

    /// Label stored in the retry queue entry.
    pub fn label(self) -> &'static str {
        match self {
            InjectedFailure::ServerError => "500",
            InjectedFailure::Timeout => "timeout",
        }
    }

    pub fn pick<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.gen_bool(0.5) {
            InjectedFailure::ServerError
        } else {
            InjectedFailure::Timeout
        }
    }
}

impl fmt::Display for InjectedFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Identifier for the `index`-th (0-based) mock record of a month.
pub fn mock_identifier(today: NaiveDate, index: usize) -> String {
    format!("{}{:05}", today.format("%Y%m"), index + 1)
}

/// `count` raw items of `kind`, dated within the 30 days before `today`.
pub fn generate<R: Rng + ?Sized>(
    kind: RecordKind,
    count: usize,
    today: NaiveDate,
    rng: &mut R,
) -> Vec<RawRecord> {
    (0..count)
        .map(|i| {
            let id = mock_identifier(today, i);
            let day = today - ChronoDuration::days(rng.gen_range(1..=30));
            let agency = pick(AGENCIES, rng);
            let mut fields = Map::new();
            fields.insert("bidNtceNo".into(), Value::String(id));
            fields.insert("ntceInsttNm".into(), Value::String(agency.to_string()));
            match kind {
                RecordKind::Bid => {
                    let budget = rng.gen_range(50u64..=700) * 1_000_000;
                    fields.insert(
                        "bidNtceNm".into(),
                        Value::String(pick(BID_TITLES, rng).to_string()),
                    );
                    fields.insert("asignBdgtAmt".into(), json!(budget));
                    fields.insert(
                        "bidNtceDt".into(),
                        Value::String(format!("{}0900", day.format("%Y%m%d"))),
                    );
                    let closes = day + ChronoDuration::days(14);
                    fields.insert(
                        "bidClseDt".into(),
                        Value::String(format!("{}1800", closes.format("%Y%m%d"))),
                    );
                }
                RecordKind::Award => {
                    let rate = (rng.gen_range(85.0..99.9_f64) * 100.0).round() / 100.0;
                    let amount = rng.gen_range(50u64..=700) * 1_000_000;
                    let company = format!(
                        "(주){}{}",
                        pick(COMPANY_PREFIXES, rng),
                        pick(COMPANY_SUFFIXES, rng)
                    );
                    fields.insert("opengDt".into(), Value::String(format!("{}1000", day.format("%Y%m%d"))));
                    fields.insert("rbidCnt".into(), json!(rng.gen_range(3..=15)));
                    fields.insert("sucsfbidAmt".into(), Value::String(group_thousands(amount)));
                    fields.insert("sucsfbidRate".into(), json!(rate));
                    fields.insert("sucsfbidCorpNm".into(), Value::String(company));
                }
            }
            RawRecord::new(fields)
        })
        .collect()
}

/// Walk the full retry schedule for an injected failure and return the
/// queue entry it leaves behind. Every attempt waits, the last one included.
pub async fn simulate_failure<R: Rng + Send + ?Sized>(
    policy: &BackoffPolicy,
    sleeper: &dyn Sleeper,
    fail_rate: f64,
    rng: &mut R,
) -> RetryQueueEntry {
    let failure = InjectedFailure::pick(rng);
    let class = failure.class();
    tracing::warn!(fail_rate, failure = failure.label(), "injecting mock failure");
    for attempt in 0..policy.max_attempts {
        let Some(wait) = policy.wait(class, attempt, rng) else {
            break;
        };
        tracing::warn!(
            attempt = attempt + 1,
            max_attempts = policy.max_attempts,
            class = class.as_str(),
            wait_secs = wait.as_secs_f64(),
            "mock upstream failure, backing off"
        );
        sleeper.sleep(wait).await;
    }

    let mut params = BTreeMap::new();
    params.insert("fail_rate".to_string(), json!(fail_rate));
    params.insert("failure_type".to_string(), json!(failure.label()));
    RetryQueueEntry {
        operation_name: MOCK_FAILURE_OPERATION.to_string(),
        request_parameters: params,
        page_index: 0,
        failed_at: chrono::Utc::now(),
        retry_attempts: policy.max_attempts,
    }
}

fn pick<'a, R: Rng + ?Sized>(items: &[&'a str], rng: &mut R) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

/// `123456000` → `"123,456,000"`, the way the portal formats amounts.
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
