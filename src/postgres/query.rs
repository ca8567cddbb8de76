use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use tokio_postgres::Statement;
use tokio_postgres::types::{FromSql, Type};

use crate::error::NadoError;
use crate::results::ResultSet;
use crate::types::SqlValue;

/// Build a result set using statement metadata for column names.
///
/// # Errors
/// Returns errors from row value extraction.
pub fn build_result_set(
    stmt: &Statement,
    rows: &[tokio_postgres::Row],
) -> Result<ResultSet, NadoError> {
    let column_names: Vec<String> = stmt
        .columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect();
    let column_count = column_names.len();

    let mut result_set = ResultSet::with_capacity(rows.len());
    result_set.set_columns(Arc::new(column_names));

    for row in rows {
        let mut row_values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            row_values.push(extract_value(row, idx)?);
        }
        result_set.add_row_values(row_values);
    }

    Ok(result_set)
}

/// Extract a [`SqlValue`] from a `tokio_postgres` row at the given
/// index, keyed on the column's declared type.
///
/// # Errors
/// Returns driver errors when a column cannot be read as the mapped
/// Rust type.
pub fn extract_value(row: &tokio_postgres::Row, idx: usize) -> Result<SqlValue, NadoError> {
    let type_info = row.columns()[idx].type_();

    if type_info.name() == "int2" {
        let val: Option<i16> = row.try_get(idx)?;
        Ok(val.map_or(SqlValue::Null, |v| SqlValue::Int(i64::from(v))))
    } else if type_info.name() == "int4" {
        let val: Option<i32> = row.try_get(idx)?;
        Ok(val.map_or(SqlValue::Null, |v| SqlValue::Int(i64::from(v))))
    } else if type_info.name() == "int8" {
        let val: Option<i64> = row.try_get(idx)?;
        Ok(val.map_or(SqlValue::Null, SqlValue::Int))
    } else if type_info.name() == "float4" {
        let val: Option<f32> = row.try_get(idx)?;
        Ok(val.map_or(SqlValue::Null, |v| SqlValue::Float(f64::from(v))))
    } else if type_info.name() == "float8" {
        let val: Option<f64> = row.try_get(idx)?;
        Ok(val.map_or(SqlValue::Null, SqlValue::Float))
    } else if type_info.name() == "numeric" {
        let val: Option<NumericText> = row.try_get(idx)?;
        Ok(val.map_or(SqlValue::Null, |v| SqlValue::Decimal(v.0)))
    } else if type_info.name() == "bool" {
        let val: Option<bool> = row.try_get(idx)?;
        Ok(val.map_or(SqlValue::Null, SqlValue::Bool))
    } else if type_info.name() == "timestamp" || type_info.name() == "timestamptz" {
        let val: Option<NaiveDateTime> = row.try_get(idx)?;
        Ok(val.map_or(SqlValue::Null, SqlValue::Timestamp))
    } else if type_info.name() == "date" {
        let val: Option<NaiveDate> = row.try_get(idx)?;
        Ok(val.map_or(SqlValue::Null, SqlValue::Date))
    } else if type_info.name() == "json" || type_info.name() == "jsonb" {
        let val: Option<Value> = row.try_get(idx)?;
        Ok(val.map_or(SqlValue::Null, SqlValue::Json))
    } else if type_info.name() == "bytea" {
        let val: Option<Vec<u8>> = row.try_get(idx)?;
        Ok(val.map_or(SqlValue::Null, SqlValue::Blob))
    } else {
        // Text types, and a last-resort attempt for anything else
        let val: Option<String> = row.try_get(idx)?;
        Ok(val.map_or(SqlValue::Null, SqlValue::Text))
    }
}

/// Text rendering of a `numeric` column, decoded from the binary wire
/// format so the digits survive untouched.
struct NumericText(String);

impl<'a> FromSql<'a> for NumericText {
    fn from_sql(
        _ty: &Type,
        raw: &'a [u8],
    ) -> Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        decode_numeric(raw).map(NumericText).map_err(Into::into)
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }
}

// Wire layout: ndigits, weight, sign, dscale (all 16-bit), then ndigits
// base-10000 digit groups. weight is the exponent of the first group.
fn decode_numeric(raw: &[u8]) -> Result<String, String> {
    const SIGN_POS: u16 = 0x0000;
    const SIGN_NEG: u16 = 0x4000;
    const SIGN_NAN: u16 = 0xC000;

    if raw.len() < 8 {
        return Err("numeric value shorter than its header".to_string());
    }
    let ndigits = u16::from_be_bytes([raw[0], raw[1]]) as usize;
    let weight = i32::from(i16::from_be_bytes([raw[2], raw[3]]));
    let sign = u16::from_be_bytes([raw[4], raw[5]]);
    let dscale = u16::from_be_bytes([raw[6], raw[7]]) as usize;
    if raw.len() < 8 + ndigits * 2 {
        return Err("numeric digit buffer truncated".to_string());
    }
    let mut digits = Vec::with_capacity(ndigits);
    for i in 0..ndigits {
        digits.push(u16::from_be_bytes([raw[8 + i * 2], raw[9 + i * 2]]));
    }

    match sign {
        SIGN_POS | SIGN_NEG => {}
        SIGN_NAN => return Ok("NaN".to_string()),
        other => return Err(format!("unrecognized numeric sign {other:#06x}")),
    }

    let mut out = String::new();
    if sign == SIGN_NEG {
        out.push('-');
    }

    if weight < 0 {
        out.push('0');
    } else {
        for w in 0..=weight {
            let group = digits.get(usize::try_from(w).unwrap_or(usize::MAX)).copied();
            let d = group.unwrap_or(0);
            if w == 0 {
                out.push_str(&d.to_string());
            } else {
                out.push_str(&format!("{d:04}"));
            }
        }
    }

    if dscale > 0 {
        out.push('.');
        let mut frac = String::with_capacity(dscale + 4);
        let mut idx = weight + 1;
        while frac.len() < dscale {
            let d = if idx < 0 {
                0
            } else {
                digits
                    .get(usize::try_from(idx).unwrap_or(usize::MAX))
                    .copied()
                    .unwrap_or(0)
            };
            frac.push_str(&format!("{d:04}"));
            idx += 1;
        }
        frac.truncate(dscale);
        out.push_str(&frac);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::decode_numeric;

    fn buf(ndigits: u16, weight: i16, sign: u16, dscale: u16, digits: &[u16]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&ndigits.to_be_bytes());
        out.extend_from_slice(&weight.to_be_bytes());
        out.extend_from_slice(&sign.to_be_bytes());
        out.extend_from_slice(&dscale.to_be_bytes());
        for d in digits {
            out.extend_from_slice(&d.to_be_bytes());
        }
        out
    }

    #[test]
    fn decodes_plain_decimal() {
        let raw = buf(2, 0, 0x0000, 2, &[123, 4500]);
        assert_eq!(decode_numeric(&raw).unwrap(), "123.45");
    }

    #[test]
    fn decodes_negative() {
        let raw = buf(2, 0, 0x4000, 1, &[1, 5000]);
        assert_eq!(decode_numeric(&raw).unwrap(), "-1.5");
    }

    #[test]
    fn decodes_zero() {
        let raw = buf(0, 0, 0x0000, 0, &[]);
        assert_eq!(decode_numeric(&raw).unwrap(), "0");
    }

    #[test]
    fn pads_trailing_integer_groups() {
        let raw = buf(1, 1, 0x0000, 0, &[1]);
        assert_eq!(decode_numeric(&raw).unwrap(), "10000");
    }

    #[test]
    fn pads_leading_fraction_groups() {
        let raw = buf(1, -2, 0x0000, 5, &[1000]);
        assert_eq!(decode_numeric(&raw).unwrap(), "0.00001");
    }

    #[test]
    fn decodes_nan() {
        let raw = buf(0, 0, 0xC000, 0, &[]);
        assert_eq!(decode_numeric(&raw).unwrap(), "NaN");
    }

    #[test]
    fn rejects_truncated_buffer() {
        assert!(decode_numeric(&[0, 1, 0, 0]).is_err());
        let raw = buf(2, 0, 0x0000, 0, &[7]);
        assert!(decode_numeric(&raw).is_err());
    }
}
