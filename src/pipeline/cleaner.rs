//! Cleaning and type conversion of raw policy records

use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

use super::error::{AnalysisError, Result};

/// Response variable modelled throughout the pipeline
pub const RESPONSE_COLUMN: &str = "current_premium";

/// Raw birthdate column, replaced by `age`
pub const BIRTHDATE_COLUMN: &str = "birthdate";

/// Derived integer age column
pub const AGE_COLUMN: &str = "age";

/// Columns recast as categorical
pub const CATEGORICAL_COLUMNS: [&str; 2] = ["gender", "territory"];

/// Premium-adjacent columns that are not modelled. Absent columns are ignored.
pub const DROPPED_COLUMNS: [&str; 6] = [
    "indicated_premium",
    "selected_premium",
    "underlying_premium",
    "underlying_total_premium",
    "fixed_expenses",
    "cgr",
];

/// Expected birthdate format (month/day/year)
pub const BIRTHDATE_FORMAT: &str = "%m/%d/%Y";

/// Produce a model-ready copy of the raw dataset.
///
/// Drops the premium-adjacent columns, recasts `gender` and `territory` as
/// categorical, replaces `birthdate` by `age` (completed years at `as_of`)
/// and moves the response to the first position. The input is not modified.
pub fn clean_dataset(raw: &DataFrame, as_of: NaiveDate) -> Result<DataFrame> {
    for required in [RESPONSE_COLUMN, BIRTHDATE_COLUMN]
        .iter()
        .chain(CATEGORICAL_COLUMNS.iter())
    {
        if raw.column(required).is_err() {
            return Err(AnalysisError::ColumnNotFound(required.to_string()));
        }
    }

    let mut df = raw.drop_many(DROPPED_COLUMNS);

    for name in CATEGORICAL_COLUMNS {
        let categorical = to_categorical(df.column(name)?)?;
        df.with_column(categorical)?;
    }

    let ages = derive_ages(df.column(BIRTHDATE_COLUMN)?, as_of)?;

    // Swap birthdate for age in place so the column order stays readable
    let mut columns: Vec<Column> = Vec::with_capacity(df.width());
    let mut age = Some(Column::new(AGE_COLUMN.into(), ages));
    for column in df.get_columns() {
        if column.name().as_str() == BIRTHDATE_COLUMN {
            if let Some(age) = age.take() {
                columns.push(age);
            }
        } else {
            columns.push(column.clone());
        }
    }
    let df = DataFrame::new(columns)?;

    move_to_front(&df, RESPONSE_COLUMN)
}

/// Completed years between `birthdate` and `as_of`.
///
/// This is the floor of the exact elapsed year fraction. Returns `None`
/// when the birthdate lies after `as_of`.
pub fn age_on(birthdate: NaiveDate, as_of: NaiveDate) -> Option<i64> {
    if birthdate > as_of {
        return None;
    }
    let mut years = (as_of.year() - birthdate.year()) as i64;
    if (as_of.month(), as_of.day()) < (birthdate.month(), birthdate.day()) {
        years -= 1;
    }
    Some(years)
}

/// Parse a single MM/DD/YYYY birthdate
pub fn parse_birthdate(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), BIRTHDATE_FORMAT).ok()
}

/// Return a copy of `df` with `column` moved to the first position
pub fn move_to_front(df: &DataFrame, column: &str) -> Result<DataFrame> {
    if df.column(column).is_err() {
        return Err(AnalysisError::ColumnNotFound(column.to_string()));
    }
    let mut order: Vec<String> = vec![column.to_string()];
    order.extend(
        df.get_column_names()
            .iter()
            .map(|s| s.to_string())
            .filter(|name| name != column),
    );
    Ok(df.select(order)?)
}

fn to_categorical(column: &Column) -> Result<Column> {
    let as_string = column.cast(&DataType::String)?;
    let categorical = as_string.cast(&DataType::Categorical(None, CategoricalOrdering::Lexical))?;
    Ok(categorical)
}

fn derive_ages(column: &Column, as_of: NaiveDate) -> Result<Vec<i64>> {
    let as_string = column.cast(&DataType::String)?;
    let values = as_string.str()?;

    let mut ages = Vec::with_capacity(values.len());
    for (row, value) in values.iter().enumerate() {
        let raw = value.unwrap_or("");
        let birthdate = parse_birthdate(raw).ok_or_else(|| AnalysisError::MalformedDate {
            column: BIRTHDATE_COLUMN.to_string(),
            row,
            value: value.unwrap_or("<missing>").to_string(),
        })?;
        let age = age_on(birthdate, as_of).ok_or_else(|| AnalysisError::FutureBirthdate {
            row,
            birthdate: birthdate.to_string(),
            as_of: as_of.to_string(),
        })?;
        ages.push(age);
    }
    Ok(ages)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_age_before_and_after_birthday() {
        let bd = date(1980, 6, 15);
        assert_eq!(age_on(bd, date(2020, 6, 14)), Some(39));
        assert_eq!(age_on(bd, date(2020, 6, 15)), Some(40));
        assert_eq!(age_on(bd, date(2020, 12, 31)), Some(40));
    }

    #[test]
    fn test_age_leap_day_birthday() {
        let bd = date(2000, 2, 29);
        assert_eq!(age_on(bd, date(2001, 2, 28)), Some(0));
        assert_eq!(age_on(bd, date(2001, 3, 1)), Some(1));
        assert_eq!(age_on(bd, date(2004, 2, 29)), Some(4));
    }

    #[test]
    fn test_age_same_day_and_future() {
        let d = date(2021, 1, 1);
        assert_eq!(age_on(d, d), Some(0));
        assert_eq!(age_on(date(2022, 1, 1), d), None);
    }

    #[test]
    fn test_parse_birthdate_formats() {
        assert_eq!(parse_birthdate("03/07/1975"), Some(date(1975, 3, 7)));
        assert_eq!(parse_birthdate(" 3/7/1975 "), Some(date(1975, 3, 7)));
        assert_eq!(parse_birthdate("1975-03-07"), None);
        assert_eq!(parse_birthdate("13/01/1975"), None);
        assert_eq!(parse_birthdate(""), None);
    }

    #[test]
    fn test_move_to_front() {
        let df = df! {
            "a" => [1i32, 2],
            "b" => [3i32, 4],
            "c" => [5i32, 6],
        }
        .unwrap();
        let moved = move_to_front(&df, "c").unwrap();
        let names: Vec<String> = moved.get_column_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
        assert!(matches!(
            move_to_front(&df, "z"),
            Err(AnalysisError::ColumnNotFound(_))
        ));
    }
}
