use chrono::NaiveDate;

use crate::error::{Error, Result};

const DATE_FORMAT: &str = "%d/%m/%Y";

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|_| Error::BadRequest(format!("Invalid date '{}', expected DD/MM/YYYY", s)))
}

/// A range is only formed when both bounds are supplied; a single bound, even
/// a malformed one, is ignored. Once both are present, either failing to parse
/// is a client error.
pub fn parse_date_range(
    from: Option<&str>,
    to: Option<&str>,
) -> Result<Option<(NaiveDate, NaiveDate)>> {
    match (from, to) {
        (Some(from), Some(to)) => Ok(Some((parse_date(from)?, parse_date(to)?))),
        _ => Ok(None),
    }
}
