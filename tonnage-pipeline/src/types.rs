use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Document types
// ---------------------------------------------------------------------------

/// Kind of commercial document a movement was recorded on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    #[serde(alias = "invoice", alias = "factura", alias = "nota_venta")]
    Sale,
    #[serde(alias = "remision")]
    DeliveryNote,
    #[serde(alias = "devolucion", alias = "credit_note")]
    Return,
    #[serde(alias = "cancelacion")]
    Cancellation,
    Other,
}

impl DocumentType {
    /// Map an ERP document-model id to a document type.
    pub fn from_source_id(id: u32) -> Self {
        match id {
            3 => DocumentType::DeliveryNote,
            4 | 35 => DocumentType::Sale,
            5 | 6 | 7 | 20 | 21 | 22 | 36 => DocumentType::Return,
            2 | 8 => DocumentType::Cancellation,
            _ => DocumentType::Other,
        }
    }

    /// Returns and cancellations undo an earlier outbound movement.
    pub fn is_reversal(self) -> bool {
        matches!(self, DocumentType::Return | DocumentType::Cancellation)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentType::Sale => "sale",
            DocumentType::DeliveryNote => "delivery_note",
            DocumentType::Return => "return",
            DocumentType::Cancellation => "cancellation",
            DocumentType::Other => "other",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = String;

    /// Accepts names (`sale`, `invoice`, `delivery note`, ...) or numeric
    /// ERP document ids.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(id) = s.parse::<u32>() {
            return Ok(DocumentType::from_source_id(id));
        }
        match s.to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "sale" | "invoice" | "factura" | "nota_venta" => Ok(DocumentType::Sale),
            "delivery_note" | "remision" => Ok(DocumentType::DeliveryNote),
            "return" | "devolucion" | "credit_note" => Ok(DocumentType::Return),
            "cancellation" | "cancelacion" => Ok(DocumentType::Cancellation),
            "other" => Ok(DocumentType::Other),
            other => Err(format!("unknown document type '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Movements
// ---------------------------------------------------------------------------

/// One immutable transaction line.
///
/// `quantity` is signed: positive is outbound, negative is a return or
/// adjustment as recorded by the source system.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub product_code: String,
    pub quantity: f64,
    pub document_type: DocumentType,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

impl Movement {
    pub fn new(
        product_code: impl Into<String>,
        quantity: f64,
        document_type: DocumentType,
        date: NaiveDate,
    ) -> Self {
        Self {
            product_code: product_code.into(),
            quantity,
            document_type,
            date,
            agent: None,
        }
    }

    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    pub fn period(&self, granularity: PeriodGranularity) -> Period {
        Period::from_date(self.date, granularity)
    }
}

// ---------------------------------------------------------------------------
// Periods
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodGranularity {
    Day,
    #[default]
    Month,
    Year,
    /// Calendar month with all years folded together.
    MonthOfYear,
}

/// Reporting period. Serialized as `YYYY-MM-DD`, `YYYY-MM`, `YYYY` or `--MM`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Period {
    Day(NaiveDate),
    Month { year: i32, month: u32 },
    Year(i32),
    MonthOfYear(u32),
}

impl Period {
    pub fn from_date(date: NaiveDate, granularity: PeriodGranularity) -> Self {
        match granularity {
            PeriodGranularity::Day => Period::Day(date),
            PeriodGranularity::Month => Period::Month {
                year: date.year(),
                month: date.month(),
            },
            PeriodGranularity::Year => Period::Year(date.year()),
            PeriodGranularity::MonthOfYear => Period::MonthOfYear(date.month()),
        }
    }

    pub fn granularity(&self) -> PeriodGranularity {
        match self {
            Period::Day(_) => PeriodGranularity::Day,
            Period::Month { .. } => PeriodGranularity::Month,
            Period::Year(_) => PeriodGranularity::Year,
            Period::MonthOfYear(_) => PeriodGranularity::MonthOfYear,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Day(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Period::Month { year, month } => write!(f, "{year:04}-{month:02}"),
            Period::Year(year) => write!(f, "{year:04}"),
            Period::MonthOfYear(month) => write!(f, "--{month:02}"),
        }
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let bad = || format!("invalid period '{s}'");
        let month_in_range = |m: u32| (1..=12).contains(&m);

        if let Some(month) = s.strip_prefix("--") {
            let month: u32 = month.parse().map_err(|_| bad())?;
            return month_in_range(month)
                .then_some(Period::MonthOfYear(month))
                .ok_or_else(bad);
        }

        let parts: Vec<&str> = s.split('-').collect();
        match parts.as_slice() {
            [year] => Ok(Period::Year(year.parse().map_err(|_| bad())?)),
            [year, month] => {
                let year: i32 = year.parse().map_err(|_| bad())?;
                let month: u32 = month.parse().map_err(|_| bad())?;
                month_in_range(month)
                    .then_some(Period::Month { year, month })
                    .ok_or_else(bad)
            }
            [_, _, _] => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(Period::Day)
                .map_err(|_| bad()),
            _ => Err(bad()),
        }
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Inclusive date range; either end may be open.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

// ---------------------------------------------------------------------------
// Buckets
// ---------------------------------------------------------------------------

/// Grouping key. Absent secondary dimensions are `None`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct BucketKey {
    pub period: Period,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Physical-quantity totals for one key.
#[derive(Clone, Debug, PartialEq)]
pub struct AggregationBucket {
    pub key: BucketKey,
    pub total_quantity: f64,
    /// Kilograms.
    pub total_mass: f64,
    pub movement_count: usize,
    pub unclassified_movements: usize,
    pub unclassified_quantity: f64,
}

impl AggregationBucket {
    pub fn total_tonnes(&self) -> f64 {
        self.total_mass / 1000.0
    }
}

impl Serialize for AggregationBucket {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("AggregationBucket", 7)?;
        state.serialize_field("key", &self.key)?;
        state.serialize_field("total_quantity", &self.total_quantity)?;
        state.serialize_field("total_mass", &self.total_mass)?;
        state.serialize_field("total_tonnes", &self.total_tonnes())?;
        state.serialize_field("movement_count", &self.movement_count)?;
        state.serialize_field("unclassified_movements", &self.unclassified_movements)?;
        state.serialize_field("unclassified_quantity", &self.unclassified_quantity)?;
        state.end()
    }
}
