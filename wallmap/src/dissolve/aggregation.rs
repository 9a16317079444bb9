use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::{DissolveError, DissolveResult};
use crate::layer::AttrValue;

/// Attribute aggregation rule applied to every group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Aggregation {
    /// First non-null value in input order.
    First,
    /// Last non-null value in input order.
    Last,
    /// Numeric sum; nulls count as zero.
    Sum,
    Min,
    Max,
    /// Number of non-null values.
    Count,
}

impl Aggregation {
    pub fn name(&self) -> &'static str {
        match self {
            Aggregation::First => "first",
            Aggregation::Last => "last",
            Aggregation::Sum => "sum",
            Aggregation::Min => "min",
            Aggregation::Max => "max",
            Aggregation::Count => "count",
        }
    }

    /// Reduces the values of `column` for one group.
    pub fn apply<'a>(
        &self,
        column: &str,
        values: impl IntoIterator<Item = &'a AttrValue>,
    ) -> DissolveResult<AttrValue> {
        let mut present = values.into_iter().filter(|v| !v.is_null());

        match self {
            Aggregation::First => Ok(present.next().cloned().unwrap_or_default()),
            Aggregation::Last => Ok(present.last().cloned().unwrap_or_default()),
            Aggregation::Count => Ok(AttrValue::Number(present.count() as f64)),
            Aggregation::Sum => {
                let mut total = 0.0;
                for v in present {
                    total += numeric(column, v)?;
                }
                Ok(AttrValue::Number(total))
            }
            Aggregation::Min | Aggregation::Max => {
                let wanted = if *self == Aggregation::Min {
                    Ordering::Less
                } else {
                    Ordering::Greater
                };
                let mut best: Option<&AttrValue> = None;
                for v in present {
                    best = match best {
                        None => Some(v),
                        Some(b) if order(column, v, b)? == wanted => Some(v),
                        keep => keep,
                    };
                }
                Ok(best.cloned().unwrap_or_default())
            }
        }
    }
}

fn numeric(column: &str, value: &AttrValue) -> DissolveResult<f64> {
    value.as_f64().ok_or_else(|| DissolveError::NonNumeric {
        column: column.to_string(),
        value: value.to_string(),
    })
}

fn order(column: &str, a: &AttrValue, b: &AttrValue) -> DissolveResult<Ordering> {
    match (a, b) {
        (AttrValue::Text(x), AttrValue::Text(y)) => Ok(x.cmp(y)),
        _ => Ok(numeric(column, a)?.total_cmp(&numeric(column, b)?)),
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Aggregation {
    type Err = DissolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(Aggregation::First),
            "last" => Ok(Aggregation::Last),
            "sum" => Ok(Aggregation::Sum),
            "min" => Ok(Aggregation::Min),
            "max" => Ok(Aggregation::Max),
            "count" => Ok(Aggregation::Count),
            other => Err(DissolveError::UnknownAggregation(other.to_string())),
        }
    }
}

/// Ordered column → rule mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationPlan {
    entries: Vec<(String, Aggregation)>,
}

impl AggregationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, rule: Aggregation) -> Self {
        self.entries.push((column.into(), rule));
        self
    }

    /// Parses `column:rule` pairs separated by commas, e.g.
    /// `name:first, area_sqkm:sum`.
    pub fn parse(text: &str) -> DissolveResult<Self> {
        let mut plan = Self::new();
        for entry in text.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (column, rule) = entry
                .split_once(':')
                .ok_or_else(|| DissolveError::InvalidPlanEntry(entry.to_string()))?;
            plan = plan.with(column.trim(), rule.parse()?);
        }
        Ok(plan)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Aggregation)> {
        self.entries.iter().map(|(c, a)| (c.as_str(), *a))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromStr for AggregationPlan {
    type Err = DissolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(value: impl Into<AttrValue>) -> AttrValue {
        value.into()
    }

    fn vals(items: &[AttrValue]) -> Vec<&AttrValue> {
        items.iter().collect()
    }

    #[test]
    fn test_first_and_last_skip_nulls() {
        let items: Vec<AttrValue> = vec![AttrValue::Null, v("a"), v("b"), AttrValue::Null];
        assert_eq!(Aggregation::First.apply("c", vals(&items)).unwrap(), v("a"));
        assert_eq!(Aggregation::Last.apply("c", vals(&items)).unwrap(), v("b"));
        let nulls: Vec<AttrValue> = vec![AttrValue::Null, AttrValue::Null];
        assert_eq!(Aggregation::First.apply("c", vals(&nulls)).unwrap(), AttrValue::Null);
    }

    #[test]
    fn test_sum_treats_nulls_as_zero() {
        let items: Vec<AttrValue> = vec![v(100.0), AttrValue::Null, v(50.0)];
        assert_eq!(Aggregation::Sum.apply("area", vals(&items)).unwrap(), v(150.0));
        let nulls: Vec<AttrValue> = vec![AttrValue::Null];
        assert_eq!(Aggregation::Sum.apply("area", vals(&nulls)).unwrap(), v(0.0));
    }

    #[test]
    fn test_sum_rejects_text() {
        let items: Vec<AttrValue> = vec![v(1.0), v("ten")];
        let err = Aggregation::Sum.apply("area", vals(&items)).unwrap_err();
        assert!(matches!(err, DissolveError::NonNumeric { ref column, .. } if column == "area"));
    }

    #[test]
    fn test_min_max_count() {
        let items: Vec<AttrValue> = vec![v(3.0), AttrValue::Null, v(-1.0), v(7.0)];
        assert_eq!(Aggregation::Min.apply("n", vals(&items)).unwrap(), v(-1.0));
        assert_eq!(Aggregation::Max.apply("n", vals(&items)).unwrap(), v(7.0));
        assert_eq!(Aggregation::Count.apply("n", vals(&items)).unwrap(), v(3.0));

        let words: Vec<AttrValue> = vec![v("pear"), v("apple")];
        assert_eq!(Aggregation::Min.apply("w", vals(&words)).unwrap(), v("apple"));
        assert_eq!(Aggregation::Max.apply("w", &Vec::<AttrValue>::new()).unwrap(), AttrValue::Null);
    }

    #[test]
    fn test_parse_rules() {
        assert_eq!("SUM".parse::<Aggregation>().unwrap(), Aggregation::Sum);
        assert!(matches!(
            "median".parse::<Aggregation>(),
            Err(DissolveError::UnknownAggregation(ref r)) if r == "median"
        ));
    }

    #[test]
    fn test_parse_plan() {
        let plan = AggregationPlan::parse("name:first, area_sqkm:sum,").unwrap();
        let entries: Vec<_> = plan.iter().collect();
        assert_eq!(entries, vec![("name", Aggregation::First), ("area_sqkm", Aggregation::Sum)]);

        assert!(AggregationPlan::parse("name").is_err());
        assert!(AggregationPlan::parse("name:mode").is_err());
    }
}
