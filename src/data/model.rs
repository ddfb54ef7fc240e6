use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

// ---------------------------------------------------------------------------
// Column names
// ---------------------------------------------------------------------------

pub const RECENCY: &str = "Recency";
pub const FREQUENCY: &str = "Frequency";
pub const MONETARY: &str = "Monetary";
pub const R_SCORE: &str = "R_Score";
pub const F_SCORE: &str = "F_Score";
pub const M_SCORE: &str = "M_Score";
pub const RFM_SCORE: &str = "RFM_Score";
pub const CLUSTER: &str = "Cluster";
pub const SEGMENT: &str = "Segment";

/// The three metric columns every input table must carry.
pub const METRIC_COLUMNS: [&str; 3] = [RECENCY, FREQUENCY, MONETARY];
pub const SUB_SCORE_COLUMNS: [&str; 3] = [R_SCORE, F_SCORE, M_SCORE];

// ---------------------------------------------------------------------------
// CellValue – a single cell of the input table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell mirroring the common dtypes of a CSV column.
/// Cluster ids live in `BTreeSet`s downstream so `CellValue` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

// -- Manual Eq/Ord so we can put CellValue in BTreeSet --

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::String(s) => s.hash(state),
            CellValue::Integer(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Bool(b) => b.hash(state),
            CellValue::Null => {}
        }
    }
}

/// Prints the value the way it is written back to CSV: floats use the
/// shortest representation that parses back to the same `f64`, nulls are
/// empty.
impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            // Integral floats keep a ".0" so they reload as floats.
            CellValue::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{v:.1}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => Ok(()),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::String(s) => serializer.serialize_str(s),
            CellValue::Integer(i) => serializer.serialize_i64(*i),
            CellValue::Float(v) => serializer.serialize_f64(*v),
            CellValue::Bool(b) => serializer.serialize_bool(*b),
            CellValue::Null => serializer.serialize_none(),
        }
    }
}

impl CellValue {
    /// Guess the type of a raw text cell.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() {
            return CellValue::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return CellValue::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return CellValue::Float(f);
        }
        if s == "true" || s == "false" {
            return CellValue::Bool(s == "true");
        }
        CellValue::String(s.to_string())
    }

    /// Try to interpret the value as an `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Segment / Label
// ---------------------------------------------------------------------------

/// Rule-based customer segment. Variants are declared in increasing
/// severity rank so the derived `Ord` follows the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Segment {
    #[serde(rename = "Churned")]
    Churned,
    #[serde(rename = "At Risk")]
    AtRisk,
    #[serde(rename = "Loyal Customers")]
    LoyalCustomers,
    #[serde(rename = "Best Customers")]
    BestCustomers,
}

impl Segment {
    /// Best first, the order the dashboard lists them in.
    pub const ALL: [Segment; 4] = [
        Segment::BestCustomers,
        Segment::LoyalCustomers,
        Segment::AtRisk,
        Segment::Churned,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Segment::BestCustomers => "Best Customers",
            Segment::LoyalCustomers => "Loyal Customers",
            Segment::AtRisk => "At Risk",
            Segment::Churned => "Churned",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSegment(pub String);

impl fmt::Display for UnknownSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown segment name '{}'", self.0)
    }
}

impl std::error::Error for UnknownSegment {}

impl FromStr for Segment {
    type Err = UnknownSegment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Segment::ALL
            .into_iter()
            .find(|seg| seg.name() == s.trim())
            .ok_or_else(|| UnknownSegment(s.to_string()))
    }
}

/// The grouping key of a record: a derived segment or an opaque cluster id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Label {
    Segment(Segment),
    Cluster(CellValue),
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Segment(seg) => write!(f, "{seg}"),
            Label::Cluster(CellValue::Null) => f.write_str("<null>"),
            Label::Cluster(id) => write!(f, "{id}"),
        }
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// CustomerRecord – one row of the table
// ---------------------------------------------------------------------------

/// Ordinal R/F/M sub-scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SubScores {
    pub r: f64,
    pub f: f64,
    pub m: f64,
}

impl SubScores {
    pub fn total(&self) -> f64 {
        self.r + self.f + self.m
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomerRecord {
    pub recency: f64,
    pub frequency: f64,
    pub monetary: f64,
    /// Present when the input carries all three sub-score columns.
    pub scores: Option<SubScores>,
    /// Read from input, or derived once from `scores`.
    pub rfm_score: Option<f64>,
    pub cluster: Option<CellValue>,
    /// Set by score-based labelling only.
    pub segment: Option<Segment>,
    /// Every input cell by column name, written back unchanged on export.
    pub cells: BTreeMap<String, CellValue>,
}

impl CustomerRecord {
    /// A bare record with only the three metrics set.
    pub fn new(recency: f64, frequency: f64, monetary: f64) -> Self {
        Self {
            recency,
            frequency,
            monetary,
            scores: None,
            rfm_score: None,
            cluster: None,
            segment: None,
            cells: BTreeMap::new(),
        }
    }

    pub fn with_scores(mut self, r: f64, f: f64, m: f64) -> Self {
        self.scores = Some(SubScores { r, f, m });
        self
    }

    pub fn with_rfm_score(mut self, score: f64) -> Self {
        self.rfm_score = Some(score);
        self
    }

    pub fn with_cluster(mut self, cluster: CellValue) -> Self {
        self.cluster = Some(cluster);
        self
    }
}

// ---------------------------------------------------------------------------
// CustomerTable – the complete loaded table
// ---------------------------------------------------------------------------

/// The parsed table with pre-computed cluster index.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerTable {
    /// Input column names in file order.
    pub columns: Vec<String>,
    pub records: Vec<CustomerRecord>,
    /// Sorted set of distinct `Cluster` values (empty without that column).
    pub clusters: BTreeSet<CellValue>,
    /// `RFM_Score` was computed from sub-scores rather than read.
    pub derived_rfm_score: bool,
    /// Records carry a rule-based `Segment`.
    pub segmented: bool,
}

impl CustomerTable {
    /// Build the cluster index from the loaded records.
    pub fn from_records(columns: Vec<String>, records: Vec<CustomerRecord>) -> Self {
        let clusters = records
            .iter()
            .filter_map(|rec| rec.cluster.clone())
            .collect();
        CustomerTable {
            columns,
            records,
            clusters,
            derived_rfm_score: false,
            segmented: false,
        }
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Number of customers.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over the records at `rows`, skipping out-of-range indices.
    pub fn select<'a>(&'a self, rows: &'a [usize]) -> impl Iterator<Item = &'a CustomerRecord> + 'a {
        rows.iter().filter_map(move |&i| self.records.get(i))
    }

    /// Indices of every row, i.e. the unfiltered selection.
    pub fn all_rows(&self) -> Vec<usize> {
        (0..self.records.len()).collect()
    }
}
