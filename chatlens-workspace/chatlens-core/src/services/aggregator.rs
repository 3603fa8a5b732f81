// src/services/aggregator.rs
//! Deterministic rollups over a history snapshot.
//!
//! Pure functions: no I/O, no state. Classification is table driven; each
//! table is evaluated top to bottom and the first category with a matching
//! marker wins, regardless of where the markers sit in the text.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::services::history::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Purchase,
    Inquiry,
    Complaint,
    Other,
    Unknown,
}

/// Priority order: positive, negative, neutral.
pub const SENTIMENT_RULES: &[(Sentiment, &[&str])] = &[
    (Sentiment::Positive, &["积极", "正面", "满意"]),
    (Sentiment::Negative, &["消极", "负面", "不满", "投诉"]),
    (Sentiment::Neutral, &["中性", "一般"]),
];

/// Priority order: purchase, inquiry, complaint, other.
pub const INTENT_RULES: &[(Intent, &[&str])] = &[
    (Intent::Purchase, &["购买", "下单", "付款"]),
    (Intent::Inquiry, &["咨询", "询问", "了解"]),
    (Intent::Complaint, &["投诉", "问题", "退款"]),
    (Intent::Other, &["其他"]),
];

/// Merchant vocabulary. Order breaks frequency ties.
pub const KEYWORDS: &[&str] = &[
    "价格", "产品", "质量", "服务", "delivery", "退款", "优惠", "折扣",
];

/// First category in `rules` whose markers occur in `text`.
fn first_match<C: Copy>(rules: &[(C, &[&str])], text: &str) -> Option<C> {
    rules
        .iter()
        .find(|(_, markers)| markers.iter().any(|m| text.contains(m)))
        .map(|(category, _)| *category)
}

pub fn classify_sentiment(text: &str) -> Sentiment {
    first_match(SENTIMENT_RULES, text).unwrap_or(Sentiment::Unknown)
}

pub fn classify_intent(text: &str) -> Intent {
    first_match(INTENT_RULES, text).unwrap_or(Intent::Unknown)
}

/// Vocabulary keywords a record hits, each at most once, in vocabulary order.
pub fn keywords_in(record: &Record) -> Vec<&'static str> {
    KEYWORDS
        .iter()
        .copied()
        .filter(|k| record.result_text.contains(k) || record.input_excerpt.contains(k))
        .collect()
}

/// Per-record view of what `summarize` counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub sentiment: Sentiment,
    pub intent: Intent,
    pub keywords: Vec<&'static str>,
}

pub fn classify(record: &Record) -> Classification {
    Classification {
        sentiment: classify_sentiment(&record.result_text),
        intent: classify_intent(&record.result_text),
        keywords: keywords_in(record),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SentimentDistribution {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
    pub unknown: usize,
}

impl SentimentDistribution {
    fn bump(&mut self, s: Sentiment) {
        match s {
            Sentiment::Positive => self.positive += 1,
            Sentiment::Neutral => self.neutral += 1,
            Sentiment::Negative => self.negative += 1,
            Sentiment::Unknown => self.unknown += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntentDistribution {
    pub purchase: usize,
    pub inquiry: usize,
    pub complaint: usize,
    pub other: usize,
    pub unknown: usize,
}

impl IntentDistribution {
    fn bump(&mut self, i: Intent) {
        match i {
            Intent::Purchase => self.purchase += 1,
            Intent::Inquiry => self.inquiry += 1,
            Intent::Complaint => self.complaint += 1,
            Intent::Other => self.other += 1,
            Intent::Unknown => self.unknown += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    /// UTC calendar day, `YYYY-MM-DD`.
    pub date: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordCount {
    pub keyword: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_count: usize,
    pub sentiment_distribution: SentimentDistribution,
    pub intent_distribution: IntentDistribution,
    pub daily_trend: Vec<DailyCount>,
    pub keyword_frequency: Vec<KeywordCount>,
}

/// Window sizes for the trend and keyword rollups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsPolicy {
    pub trend_days: usize,
    pub top_keywords: usize,
}

impl Default for StatsPolicy {
    fn default() -> Self {
        Self {
            trend_days: 30,
            top_keywords: 10,
        }
    }
}

pub fn summarize(records: &[Record]) -> Statistics {
    summarize_with(records, &StatsPolicy::default())
}

pub fn summarize_with(records: &[Record], policy: &StatsPolicy) -> Statistics {
    let mut stats = Statistics {
        total_count: records.len(),
        ..Statistics::default()
    };

    let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    let mut keyword_hits = vec![0usize; KEYWORDS.len()];

    for record in records {
        let c = classify(record);
        stats.sentiment_distribution.bump(c.sentiment);
        stats.intent_distribution.bump(c.intent);

        *per_day.entry(record.created_at.date_naive()).or_insert(0) += 1;

        for (i, k) in KEYWORDS.iter().enumerate() {
            if c.keywords.contains(k) {
                keyword_hits[i] += 1;
            }
        }
    }

    // BTreeMap iterates ascending; keep the newest `trend_days` dates.
    let skip = per_day.len().saturating_sub(policy.trend_days);
    stats.daily_trend = per_day
        .into_iter()
        .skip(skip)
        .map(|(date, count)| DailyCount {
            date: date.format("%Y-%m-%d").to_string(),
            count,
        })
        .collect();

    // Stable sort keeps vocabulary order among equal counts.
    let mut ranked: Vec<KeywordCount> = KEYWORDS
        .iter()
        .zip(keyword_hits)
        .filter(|(_, count)| *count > 0)
        .map(|(k, count)| KeywordCount {
            keyword: (*k).to_string(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(policy.top_keywords);
    stats.keyword_frequency = ranked;

    stats
}
