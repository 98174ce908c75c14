//! Raw upstream items → canonical records.
//!
//! Only a missing identifier rejects a record. Every other field degrades to
//! `None` on parse failure so partially broken records stay addressable.

mod fields;
mod parse;
mod record;

pub use fields::{categorize, region_of, FieldMap, REGIONS};
pub use parse::{parse_count, parse_date_prefix, parse_number};
pub use record::{Category, NormalizedRecord, RawRecord, RecordKind, SourceTag};

use chrono::Utc;
use std::collections::HashMap;
use std::fmt;

/// Why a raw record was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejection {
    pub reason: &'static str,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason)
    }
}

/// Converts raw items of one kind and counts rejections.
#[derive(Debug)]
pub struct Normalizer {
    kind: RecordKind,
    source_tag: SourceTag,
    rejected: usize,
}

impl Normalizer {
    pub fn new(kind: RecordKind, source_tag: SourceTag) -> Self {
        Self {
            kind,
            source_tag,
            rejected: 0,
        }
    }

    /// Normalize one raw record.
    pub fn normalize(&self, raw: &RawRecord) -> Result<NormalizedRecord, Rejection> {
        let map = self.kind.field_map();
        let identifier = raw.text(map.identifier).ok_or(Rejection {
            reason: "missing identifier",
        })?;

        let field = |name: Option<&'static str>| name.and_then(|n| raw.text(n));
        let title = field(map.title);
        let agency = field(map.agency);
        let category = match self.kind {
            RecordKind::Bid => Some(categorize(title.as_deref().unwrap_or_default())),
            RecordKind::Award => None,
        };
        let region = agency
            .as_deref()
            .and_then(region_of)
            .map(str::to_string);

        Ok(NormalizedRecord {
            identifier,
            occurred_at: raw
                .text(map.occurred_at)
                .as_deref()
                .and_then(parse_date_prefix),
            deadline: field(map.deadline).as_deref().and_then(parse_date_prefix),
            amount: field(map.amount).as_deref().and_then(parse_number),
            count: field(map.count).as_deref().and_then(parse_count),
            rate: field(map.rate).as_deref().and_then(parse_number),
            title,
            agency,
            category,
            region,
            source_tag: self.source_tag,
            collected_at: Utc::now(),
        })
    }

    /// Normalize a batch, logging and counting rejections.
    pub fn normalize_batch(&mut self, raws: &[RawRecord]) -> Vec<NormalizedRecord> {
        let mut out = Vec::with_capacity(raws.len());
        for raw in raws {
            match self.normalize(raw) {
                Ok(record) => out.push(record),
                Err(rejection) => {
                    self.rejected += 1;
                    tracing::warn!(
                        kind = self.kind.as_str(),
                        reason = rejection.reason,
                        fields = raw.len(),
                        "dropping raw record"
                    );
                }
            }
        }
        out
    }

    /// Rejections so far.
    pub fn rejected(&self) -> usize {
        self.rejected
    }
}

/// Collapse repeated identifiers, keeping the first position and the latest values.
/// Returns the deduplicated records and how many were folded away.
pub fn dedup_by_identifier(records: Vec<NormalizedRecord>) -> (Vec<NormalizedRecord>, usize) {
    let mut index: HashMap<String, usize> = HashMap::with_capacity(records.len());
    let mut out: Vec<NormalizedRecord> = Vec::with_capacity(records.len());
    let mut folded = 0;
    for record in records {
        match index.get(&record.identifier) {
            Some(&i) => {
                out[i] = record;
                folded += 1;
            }
            None => {
                index.insert(record.identifier.clone(), out.len());
                out.push(record);
            }
        }
    }
    (out, folded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn award_fields_map_to_canonical_schema() {
        let n = Normalizer::new(RecordKind::Award, SourceTag::LiveApi);
        let r = n
            .normalize(&raw(json!({
                "bidNtceNo": " 20240112345 ",
                "opengDt": "2024-01-15 10:00",
                "rbidCnt": "12",
                "sucsfbidAmt": "123,456,000",
                "sucsfbidRate": "87.745",
                "sucsfbidCorpNm": "(주)한국정보",
                "ntceInsttNm": "부산광역시청"
            })))
            .unwrap();
        assert_eq!(r.identifier, "20240112345");
        assert_eq!(r.occurred_at, None);
        assert_eq!(r.count, Some(12));
        assert_eq!(r.amount, Some(123_456_000.0));
        assert_eq!(r.rate, Some(87.745));
        assert_eq!(r.title.as_deref(), Some("(주)한국정보"));
        assert_eq!(r.region.as_deref(), Some("부산"));
        assert_eq!(r.category, None);
        assert_eq!(r.deadline, None);
        assert_eq!(r.source_tag, SourceTag::LiveApi);
    }

    #[test]
    fn bid_fields_get_category_and_region() {
        let n = Normalizer::new(RecordKind::Bid, SourceTag::LiveApi);
        let r = n
            .normalize(&raw(json!({
                "bidNtceNo": "R24BK00000001",
                "bidNtceNm": "스마트시티 통합플랫폼 정보화 사업",
                "ntceInsttNm": "경기도청",
                "asignBdgtAmt": 500000000,
                "bidNtceDt": "20240110",
                "bidClseDt": "202401241800"
            })))
            .unwrap();
        assert_eq!(r.amount, Some(500_000_000.0));
        assert_eq!(r.category, Some(Category::Software));
        assert_eq!(r.region.as_deref(), Some("경기"));
        assert_eq!(
            r.occurred_at.map(|d| d.to_string()).as_deref(),
            Some("2024-01-10 00:00:00")
        );
        assert_eq!(
            r.deadline.map(|d| d.to_string()).as_deref(),
            Some("2024-01-24 00:00:00")
        );
        assert_eq!(r.count, None);
        assert_eq!(r.rate, None);
    }

    #[test]
    fn missing_or_blank_identifier_is_rejected() {
        let n = Normalizer::new(RecordKind::Award, SourceTag::LiveApi);
        for value in [
            json!({"opengDt": "20240101"}),
            json!({"bidNtceNo": ""}),
            json!({"bidNtceNo": "   "}),
            json!({"bidNtceNo": null}),
        ] {
            let err = n.normalize(&raw(value)).unwrap_err();
            assert_eq!(err.reason, "missing identifier");
        }
    }

    #[test]
    fn malformed_fields_degrade_to_null() {
        let n = Normalizer::new(RecordKind::Award, SourceTag::LiveApi);
        let r = n
            .normalize(&raw(json!({
                "bidNtceNo": "X1",
                "opengDt": "not-a-date",
                "rbidCnt": "several",
                "sucsfbidAmt": "n/a",
                "sucsfbidRate": ""
            })))
            .unwrap();
        assert_eq!(r.identifier, "X1");
        assert!(r.occurred_at.is_none());
        assert!(r.count.is_none());
        assert!(r.amount.is_none());
        assert!(r.rate.is_none());
        assert!(r.title.is_none());
    }

    #[test]
    fn batch_counts_rejections_and_keeps_order() {
        let mut n = Normalizer::new(RecordKind::Award, SourceTag::LiveApi);
        let out = n.normalize_batch(&[
            raw(json!({"bidNtceNo": "A"})),
            raw(json!({"sucsfbidAmt": "1"})),
            raw(json!({"bidNtceNo": "B", "sucsfbidAmt": "bad"})),
            raw(json!({})),
        ]);
        let ids: Vec<&str> = out.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert_eq!(n.rejected(), 2);
    }

    #[test]
    fn dedup_keeps_first_position_and_latest_values() {
        let n = Normalizer::new(RecordKind::Award, SourceTag::LiveApi);
        let a1 = n.normalize(&raw(json!({"bidNtceNo": "A", "rbidCnt": "1"}))).unwrap();
        let b = n.normalize(&raw(json!({"bidNtceNo": "B"}))).unwrap();
        let a2 = n.normalize(&raw(json!({"bidNtceNo": "A", "rbidCnt": "2"}))).unwrap();
        let (out, folded) = dedup_by_identifier(vec![a1, b, a2]);
        assert_eq!(folded, 1);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].identifier, "A");
        assert_eq!(out[0].count, Some(2));
        assert_eq!(out[1].identifier, "B");
    }
}
