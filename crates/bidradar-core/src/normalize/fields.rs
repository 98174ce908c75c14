//! Upstream field names per record kind, plus bid categorization.

use super::record::{Category, RecordKind};

/// Upstream field names feeding each canonical field.
#[derive(Debug, Clone, Copy)]
pub struct FieldMap {
    pub identifier: &'static str,
    pub occurred_at: &'static str,
    pub deadline: Option<&'static str>,
    pub amount: Option<&'static str>,
    pub count: Option<&'static str>,
    pub rate: Option<&'static str>,
    pub title: Option<&'static str>,
    pub agency: Option<&'static str>,
}

const BID_FIELDS: FieldMap = FieldMap {
    identifier: "bidNtceNo",
    occurred_at: "bidNtceDt",
    deadline: Some("bidClseDt"),
    amount: Some("asignBdgtAmt"),
    count: None,
    rate: None,
    title: Some("bidNtceNm"),
    agency: Some("ntceInsttNm"),
};

const AWARD_FIELDS: FieldMap = FieldMap {
    identifier: "bidNtceNo",
    occurred_at: "opengDt",
    deadline: None,
    amount: Some("sucsfbidAmt"),
    count: Some("rbidCnt"),
    rate: Some("sucsfbidRate"),
    title: Some("sucsfbidCorpNm"),
    agency: Some("ntceInsttNm"),
};

impl RecordKind {
    pub fn field_map(self) -> &'static FieldMap {
        match self {
            RecordKind::Bid => &BID_FIELDS,
            RecordKind::Award => &AWARD_FIELDS,
        }
    }
}

const CATEGORY_KEYWORDS: &[(Category, &[&str])] = &[
    (Category::Construction, &["건설", "공사", "시설"]),
    (Category::Software, &["소프트웨어", "SW", "시스템", "정보화"]),
    (Category::Services, &["용역", "서비스", "컨설팅"]),
    (Category::Goods, &["물품", "구매", "납품"]),
];

/// Provinces and metropolitan cities, matched as substrings of the agency name.
pub const REGIONS: &[&str] = &[
    "서울", "경기", "인천", "부산", "대구", "광주", "대전", "울산", "세종", "강원", "충북", "충남",
    "전북", "전남", "경북", "경남", "제주",
];

/// First matching keyword group wins; no match is `Other`.
pub fn categorize(title: &str) -> Category {
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| title.contains(w)))
        .map(|(c, _)| *c)
        .unwrap_or(Category::Other)
}

pub fn region_of(agency: &str) -> Option<&'static str> {
    REGIONS.iter().copied().find(|r| agency.contains(r))
}
