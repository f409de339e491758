use std::error::Error;

use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use tokio_util::bytes;

use crate::types::DatabaseValue;

/// Borrowed `ToSql` references for one statement's values.
pub struct Params<'a> {
    references: Vec<&'a (dyn ToSql + Sync)>,
}

impl<'a> Params<'a> {
    #[must_use]
    pub fn convert(values: &'a [DatabaseValue]) -> Params<'a> {
        let mut references = Vec::with_capacity(values.len());
        for value in values {
            references.push(value as &(dyn ToSql + Sync));
        }
        Params { references }
    }

    #[must_use]
    pub fn as_refs(&self) -> &[&(dyn ToSql + Sync)] {
        &self.references
    }
}

fn is_text(ty: &Type) -> bool {
    matches!(*ty, Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME)
}

impl ToSql for DatabaseValue {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut bytes::BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        // Every arm goes through the inner type's checked encoder, so a value
        // whose type cannot represent `ty` fails with `WrongType`.
        match self {
            // The server declares the parameter type; narrow to its width.
            DatabaseValue::Int(i) => match *ty {
                Type::INT2 => i16::try_from(*i)?.to_sql_checked(ty, out),
                Type::INT4 => i32::try_from(*i)?.to_sql_checked(ty, out),
                Type::FLOAT8 => {
                    #[allow(clippy::cast_precision_loss)]
                    let widened = *i as f64;
                    widened.to_sql_checked(ty, out)
                }
                _ if is_text(ty) => i.to_string().to_sql_checked(ty, out),
                _ => i.to_sql_checked(ty, out),
            },
            DatabaseValue::Float(f) => match *ty {
                Type::FLOAT4 => {
                    #[allow(clippy::cast_possible_truncation)]
                    let narrowed = *f as f32;
                    narrowed.to_sql_checked(ty, out)
                }
                _ if is_text(ty) => f.to_string().to_sql_checked(ty, out),
                _ => f.to_sql_checked(ty, out),
            },
            DatabaseValue::Text(s) => s.to_sql_checked(ty, out),
            DatabaseValue::Bool(b) => b.to_sql_checked(ty, out),
            DatabaseValue::Timestamp(dt) => match *ty {
                Type::TIMESTAMPTZ => dt.and_utc().to_sql_checked(ty, out),
                Type::DATE => dt.date().to_sql_checked(ty, out),
                _ => dt.to_sql_checked(ty, out),
            },
            DatabaseValue::Null => Ok(IsNull::Yes),
            DatabaseValue::Json(value) => value.to_sql_checked(ty, out),
            DatabaseValue::Blob(bytes) => bytes.to_sql_checked(ty, out),
        }
    }

    fn accepts(ty: &Type) -> bool {
        matches!(
            *ty,
            Type::INT2
                | Type::INT4
                | Type::INT8
                | Type::FLOAT4
                | Type::FLOAT8
                | Type::TEXT
                | Type::VARCHAR
                | Type::BPCHAR
                | Type::NAME
                | Type::BOOL
                | Type::TIMESTAMP
                | Type::TIMESTAMPTZ
                | Type::DATE
                | Type::JSON
                | Type::JSONB
                | Type::BYTEA
        )
    }

    to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use tokio_postgres::types::WrongType;

    use super::*;

    fn encode(value: &DatabaseValue, ty: &Type) -> Vec<u8> {
        let mut out = bytes::BytesMut::new();
        value.to_sql_checked(ty, &mut out).unwrap();
        out.to_vec()
    }

    #[test]
    fn integers_narrow_to_declared_width() {
        assert_eq!(encode(&DatabaseValue::Int(7), &Type::INT2), 7_i16.to_be_bytes());
        assert_eq!(encode(&DatabaseValue::Int(7), &Type::INT4), 7_i32.to_be_bytes());
        assert_eq!(encode(&DatabaseValue::Int(7), &Type::INT8), 7_i64.to_be_bytes());
        assert_eq!(encode(&DatabaseValue::Int(7), &Type::TEXT), b"7");
    }

    #[test]
    fn out_of_range_integer_is_an_error() {
        let mut out = bytes::BytesMut::new();
        let outcome = DatabaseValue::Int(i64::from(i32::MAX) + 1).to_sql_checked(&Type::INT4, &mut out);
        assert!(outcome.is_err());
    }

    #[test]
    fn mismatched_values_are_rejected_not_reinterpreted() {
        let rejected = [
            (DatabaseValue::Text("1234".into()), Type::INT4),
            (DatabaseValue::Text("f".into()), Type::BOOL),
            (DatabaseValue::Int(5), Type::TIMESTAMP),
            (DatabaseValue::Bool(true), Type::INT8),
            (DatabaseValue::Float(1.5), Type::INT4),
        ];
        for (value, ty) in rejected {
            let mut out = bytes::BytesMut::new();
            let Err(err) = value.to_sql_checked(&ty, &mut out) else {
                panic!("{value:?} as {ty}: expected an error");
            };
            assert!(err.is::<WrongType>(), "{value:?} as {ty}: {err}");
            assert!(out.is_empty());
        }
    }

    #[test]
    fn float_and_timestamp_adapt_to_declared_type() {
        assert_eq!(encode(&DatabaseValue::Int(2), &Type::FLOAT8), 2.0_f64.to_be_bytes());
        assert_eq!(encode(&DatabaseValue::Float(0.5), &Type::FLOAT4), 0.5_f32.to_be_bytes());
        assert_eq!(encode(&DatabaseValue::Float(0.5), &Type::TEXT), b"0.5");

        let noon = chrono::NaiveDate::from_ymd_opt(2000, 1, 2)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        // DATE is days since 2000-01-01.
        assert_eq!(encode(&DatabaseValue::Timestamp(noon), &Type::DATE), 1_i32.to_be_bytes());
        assert_eq!(
            encode(&DatabaseValue::Timestamp(noon), &Type::TIMESTAMPTZ),
            encode(&DatabaseValue::Timestamp(noon), &Type::TIMESTAMP)
        );
    }

    #[test]
    fn null_and_unsupported_types() {
        let mut out = bytes::BytesMut::new();
        assert!(matches!(
            DatabaseValue::Null.to_sql_checked(&Type::INT4, &mut out),
            Ok(IsNull::Yes)
        ));
        assert!(!<DatabaseValue as ToSql>::accepts(&Type::POINT));
        assert_eq!(Params::convert(&[DatabaseValue::Int(1), DatabaseValue::Null]).as_refs().len(), 2);
    }
}
