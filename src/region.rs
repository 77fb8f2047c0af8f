//! Genomic region filters.
//!
//! A partition of a pipeline often covers one region (`"7"`,
//! `"chr7:1,000,000-2,000,000"`). [`RegionFilter`] restricts any record
//! source to such a region while keeping it restartable.

use crate::error::{Result, TableError};
use crate::record::{Record, RecordSource, RecordStream, Value};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// A chromosome with optional 1-based, inclusive bounds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Region {
    pub chrom: String,
    pub start: Option<i64>,
    pub end: Option<i64>,
}

fn region_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<chrom>[^:\s]+)(?::(?P<start>[\d,]+)?(?:-(?P<end>[\d,]+)?)?)?$")
            .expect("region pattern is valid")
    })
}

impl Region {
    #[must_use]
    pub fn chrom(chrom: impl Into<String>) -> Self {
        Self {
            chrom: chrom.into(),
            start: None,
            end: None,
        }
    }

    #[must_use]
    pub fn span(chrom: impl Into<String>, start: i64, end: i64) -> Self {
        Self {
            chrom: chrom.into(),
            start: Some(start),
            end: Some(end),
        }
    }

    /// Parse `chrom`, `chrom:start-end`, `chrom:start-` or `chrom:-end`.
    /// Thousands separators are accepted in coordinates.
    ///
    /// # Errors
    /// Returns [`TableError::InvalidArgument`] for malformed text or an end before the start.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let caps = region_pattern()
            .captures(text)
            .ok_or_else(|| TableError::InvalidArgument(format!("malformed region `{text}`")))?;
        let coord = |name: &str| -> Result<Option<i64>> {
            caps.name(name)
                .map(|m| {
                    m.as_str().replace(',', "").parse::<i64>().map_err(|e| {
                        TableError::InvalidArgument(format!("bad coordinate in `{text}`: {e}"))
                    })
                })
                .transpose()
        };
        let region = Self {
            chrom: caps["chrom"].to_string(),
            start: coord("start")?,
            end: coord("end")?,
        };
        if let (Some(s), Some(e)) = (region.start, region.end)
            && e < s
        {
            return Err(TableError::InvalidArgument(format!(
                "region `{text}` ends before it starts"
            )));
        }
        Ok(region)
    }

    /// `true` if `coord` on `chrom` falls inside the region.
    #[must_use]
    pub fn contains(&self, chrom: &str, coord: i64) -> bool {
        chrom == self.chrom
            && self.start.is_none_or(|s| coord >= s)
            && self.end.is_none_or(|e| coord <= e)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start, self.end) {
            (None, None) => write!(f, "{}", self.chrom),
            (Some(s), Some(e)) => write!(f, "{}:{s}-{e}", self.chrom),
            (Some(s), None) => write!(f, "{}:{s}-", self.chrom),
            (None, Some(e)) => write!(f, "{}:-{e}", self.chrom),
        }
    }
}

impl std::str::FromStr for Region {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self> {
        Region::parse(s)
    }
}

/// A record source restricted to one region.
pub struct RegionFilter<S> {
    inner: S,
    region: Region,
    chrom_field: String,
    coord_field: String,
}

impl<S: RecordSource> RegionFilter<S> {
    /// Filter on the `chrom` and `coord` fields.
    pub fn new(inner: S, region: Region) -> Self {
        Self {
            inner,
            region,
            chrom_field: "chrom".into(),
            coord_field: "coord".into(),
        }
    }

    #[must_use]
    pub fn with_fields(mut self, chrom: impl Into<String>, coord: impl Into<String>) -> Self {
        self.chrom_field = chrom.into();
        self.coord_field = coord.into();
        self
    }

    #[must_use]
    pub fn region(&self) -> &Region {
        &self.region
    }

    fn keep(&self, record: &Record) -> Result<bool> {
        let chrom = record
            .get(&self.chrom_field)
            .ok_or_else(|| TableError::Record(format!("record has no `{}` field", self.chrom_field)))?
            .canonical_string();
        if chrom != self.region.chrom {
            return Ok(false);
        }
        match record.get(&self.coord_field) {
            Some(Value::Int(c)) => Ok(self.region.contains(&chrom, *c)),
            Some(other) => Err(TableError::Record(format!(
                "field `{}` is not an integer coordinate: {other:?}",
                self.coord_field
            ))),
            None => Err(TableError::Record(format!(
                "record has no `{}` field",
                self.coord_field
            ))),
        }
    }
}

impl<S: RecordSource> RecordSource for RegionFilter<S> {
    fn open_stream(&self) -> Result<RecordStream<'_>> {
        let stream = self.inner.open_stream()?;
        Ok(Box::new(stream.filter_map(move |r| match r {
            Ok(record) => match self.keep(&record) {
                Ok(true) => Some(Ok(record)),
                Ok(false) => None,
                Err(e) => Some(Err(e)),
            },
            Err(e) => Some(Err(e)),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::VecSource;

    #[test]
    fn parses_region_forms() {
        assert_eq!(Region::parse("7").unwrap(), Region::chrom("7"));
        assert_eq!(
            Region::parse("chr7:1,000-2,000").unwrap(),
            Region::span("chr7", 1000, 2000)
        );
        assert_eq!(Region::parse("X:500-").unwrap().end, None);
        assert!(Region::parse("1:20-10").is_err());
        assert!(Region::parse("1:a-b").is_err());
    }

    #[test]
    fn display_round_trips() {
        let open_end = Region {
            chrom: "X".into(),
            start: Some(500),
            end: None,
        };
        let open_start = Region {
            chrom: "X".into(),
            start: None,
            end: Some(900),
        };
        for r in [Region::span("2", 10, 20), Region::chrom("MT"), open_end, open_start] {
            assert_eq!(Region::parse(&r.to_string()).unwrap(), r, "{r}");
        }
    }

    #[test]
    fn filter_keeps_region_records() {
        let src = VecSource::new(vec![
            Record::new().with("chrom", "1").with("coord", 5i64),
            Record::new().with("chrom", "1").with("coord", 50i64),
            Record::new().with("chrom", "2").with("coord", 5i64),
        ]);
        let f = RegionFilter::new(src, Region::span("1", 1, 10));
        let kept: Vec<_> = f.open_stream().unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(kept.len(), 1);
    }
}
