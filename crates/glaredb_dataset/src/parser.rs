//! Parsing of SQL expression text into unresolved expressions.

use std::fmt;

use sqlparser::ast;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::Token;

use crate::arrays::datatype::DataType;
use crate::arrays::scalar::ScalarValue;
use crate::errors::{DatasetError, Result};
use crate::expr::aggregate_expr::AggregateFunction;
use crate::expr::arith_expr::ArithOperator;
use crate::expr::comparison_expr::ComparisonOperator;
use crate::expr::conjunction_expr::ConjunctionOperator;
use crate::expr::{
    Expression,
    UnresolvedColumn,
    aggregate,
    arith,
    cast,
    compare,
    conjunction,
};

static DIALECT: GenericDialect = GenericDialect {};

/// Parses textual expressions used by `filter_expr`, `select_expr` and
/// friends.
pub trait ExpressionParser: fmt::Debug + Sync + Send {
    /// Parse a scalar expression.
    fn parse_expression(&self, sql: &str) -> Result<Expression>;

    /// Parse an item of a select list, which may carry an alias or be a
    /// wildcard.
    fn parse_select_item(&self, sql: &str) -> Result<Expression>;
}

/// Parser backed by sqlparser's generic dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlExpressionParser;

impl SqlExpressionParser {
    fn parser(sql: &str) -> Result<Parser<'static>> {
        Ok(Parser::new(&DIALECT).try_with_sql(sql)?)
    }

    fn expect_end(parser: &Parser, sql: &str) -> Result<()> {
        let next = parser.peek_token();
        if next.token != Token::EOF {
            return Err(DatasetError::Parse(format!(
                "Unexpected '{}' in expression: {sql}",
                next.token
            )));
        }
        Ok(())
    }
}

impl ExpressionParser for SqlExpressionParser {
    fn parse_expression(&self, sql: &str) -> Result<Expression> {
        let mut parser = Self::parser(sql)?;
        let expr = parser.parse_expr()?;
        Self::expect_end(&parser, sql)?;
        convert_expr(expr)
    }

    fn parse_select_item(&self, sql: &str) -> Result<Expression> {
        let mut parser = Self::parser(sql)?;
        let item = parser.parse_select_item()?;
        Self::expect_end(&parser, sql)?;

        match item {
            ast::SelectItem::UnnamedExpr(expr) => convert_expr(expr),
            ast::SelectItem::ExprWithAlias { expr, alias } => {
                Ok(convert_expr(expr)?.alias(alias.value))
            }
            ast::SelectItem::Wildcard(_) => Ok(Expression::UnresolvedStar(None)),
            ast::SelectItem::QualifiedWildcard(name, _) => Ok(Expression::UnresolvedStar(Some(
                name.0
                    .into_iter()
                    .map(|ident| ident.value)
                    .collect::<Vec<_>>()
                    .join("."),
            ))),
        }
    }
}

fn unsupported(what: impl fmt::Display) -> DatasetError {
    DatasetError::Parse(format!("Unsupported expression: {what}"))
}

fn convert_expr(expr: ast::Expr) -> Result<Expression> {
    Ok(match expr {
        ast::Expr::Identifier(ident) => Expression::UnresolvedColumn(UnresolvedColumn {
            name_parts: vec![ident.value],
        }),
        ast::Expr::CompoundIdentifier(idents) => Expression::UnresolvedColumn(UnresolvedColumn {
            name_parts: idents.into_iter().map(|ident| ident.value).collect(),
        }),
        ast::Expr::Value(value) => Expression::Literal(convert_value(value)?),
        ast::Expr::Nested(expr) => convert_expr(*expr)?,
        ast::Expr::IsNull(expr) => Expression::IsNull(Box::new(convert_expr(*expr)?)),
        ast::Expr::IsNotNull(expr) => Expression::IsNotNull(Box::new(convert_expr(*expr)?)),
        ast::Expr::UnaryOp { op, expr } => match (op, *expr) {
            (ast::UnaryOperator::Not, expr) => Expression::Not(Box::new(convert_expr(expr)?)),
            (ast::UnaryOperator::Plus, expr) => convert_expr(expr)?,
            (ast::UnaryOperator::Minus, ast::Expr::Value(ast::Value::Number(n, _))) => {
                Expression::Literal(parse_number(&format!("-{n}"))?)
            }
            (ast::UnaryOperator::Minus, expr) => {
                Expression::Negate(Box::new(convert_expr(expr)?))
            }
            (op, expr) => return Err(unsupported(format!("{op}{expr}"))),
        },
        ast::Expr::BinaryOp { left, op, right } => {
            let left = convert_expr(*left)?;
            let right = convert_expr(*right)?;
            match op {
                ast::BinaryOperator::Plus => arith(ArithOperator::Add, left, right),
                ast::BinaryOperator::Minus => arith(ArithOperator::Sub, left, right),
                ast::BinaryOperator::Multiply => arith(ArithOperator::Mul, left, right),
                ast::BinaryOperator::Divide => arith(ArithOperator::Div, left, right),
                ast::BinaryOperator::Modulo => arith(ArithOperator::Rem, left, right),
                ast::BinaryOperator::Eq => compare(ComparisonOperator::Eq, left, right),
                ast::BinaryOperator::Spaceship => {
                    compare(ComparisonOperator::EqNullSafe, left, right)
                }
                ast::BinaryOperator::NotEq => compare(ComparisonOperator::NotEq, left, right),
                ast::BinaryOperator::Lt => compare(ComparisonOperator::Lt, left, right),
                ast::BinaryOperator::LtEq => compare(ComparisonOperator::LtEq, left, right),
                ast::BinaryOperator::Gt => compare(ComparisonOperator::Gt, left, right),
                ast::BinaryOperator::GtEq => compare(ComparisonOperator::GtEq, left, right),
                ast::BinaryOperator::And => conjunction(ConjunctionOperator::And, left, right),
                ast::BinaryOperator::Or => conjunction(ConjunctionOperator::Or, left, right),
                other => return Err(unsupported(format!("operator {other}"))),
            }
        }
        ast::Expr::Between {
            expr,
            negated,
            low,
            high,
        } => {
            let expr = convert_expr(*expr)?;
            let between = conjunction(
                ConjunctionOperator::And,
                compare(ComparisonOperator::GtEq, expr.clone(), convert_expr(*low)?),
                compare(ComparisonOperator::LtEq, expr, convert_expr(*high)?),
            );
            if negated {
                Expression::Not(Box::new(between))
            } else {
                between
            }
        }
        ast::Expr::InList {
            expr,
            list,
            negated,
        } => {
            let expr = convert_expr(*expr)?;
            let any = list
                .into_iter()
                .map(|item| Ok(compare(ComparisonOperator::Eq, expr.clone(), convert_expr(item)?)))
                .collect::<Result<Vec<_>>>()?
                .into_iter()
                .reduce(|acc, item| conjunction(ConjunctionOperator::Or, acc, item))
                .ok_or_else(|| DatasetError::Parse("IN list must not be empty".to_string()))?;
            if negated {
                Expression::Not(Box::new(any))
            } else {
                any
            }
        }
        ast::Expr::Cast {
            expr, data_type, ..
        } => cast(convert_expr(*expr)?, convert_datatype(&data_type)?),
        ast::Expr::Function(func) => convert_function(func)?,
        other => return Err(unsupported(other)),
    })
}

fn convert_function(func: ast::Function) -> Result<Expression> {
    let name = func
        .name
        .0
        .iter()
        .map(|ident| ident.value.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join(".");

    let (distinct, args) = match func.args {
        ast::FunctionArguments::None => (false, Vec::new()),
        ast::FunctionArguments::List(list) => (
            matches!(
                list.duplicate_treatment,
                Some(ast::DuplicateTreatment::Distinct)
            ),
            list.args,
        ),
        ast::FunctionArguments::Subquery(_) => {
            return Err(unsupported(format!("subquery argument to {name}")));
        }
    };

    let args = args
        .into_iter()
        .map(|arg| match arg {
            ast::FunctionArg::Unnamed(ast::FunctionArgExpr::Expr(expr)) => convert_expr(expr),
            ast::FunctionArg::Unnamed(ast::FunctionArgExpr::Wildcard) => {
                Ok(Expression::UnresolvedStar(None))
            }
            other => Err(unsupported(format!("function argument {other}"))),
        })
        .collect::<Result<Vec<_>>>()?;

    let function = match name.as_str() {
        "count" => AggregateFunction::Count,
        "sum" => AggregateFunction::Sum,
        "avg" | "mean" => AggregateFunction::Avg,
        "min" => AggregateFunction::Min,
        "max" => AggregateFunction::Max,
        "first" => AggregateFunction::First,
        "stddev" | "stddev_samp" | "std" => AggregateFunction::StddevSamp,
        "coalesce" => return Ok(Expression::Coalesce(args)),
        _ => return Err(DatasetError::Parse(format!("Unknown function: {name}"))),
    };

    let mut args = args.into_iter();
    match (args.next(), args.next()) {
        (Some(input), None) => Ok(aggregate(function, input, distinct)),
        _ => Err(DatasetError::Parse(format!(
            "Function '{name}' expects exactly one argument"
        ))),
    }
}

fn parse_number(s: &str) -> Result<ScalarValue> {
    if let Ok(v) = s.parse::<i64>() {
        return Ok(match i32::try_from(v) {
            Ok(v) => ScalarValue::Int32(v),
            Err(_) => ScalarValue::Int64(v),
        });
    }
    s.parse::<f64>()
        .map(ScalarValue::Float64)
        .map_err(|_| DatasetError::Parse(format!("Failed to parse number: {s}")))
}

fn convert_value(value: ast::Value) -> Result<ScalarValue> {
    Ok(match value {
        ast::Value::Number(n, _) => parse_number(&n)?,
        ast::Value::SingleQuotedString(s) | ast::Value::DoubleQuotedString(s) => {
            ScalarValue::Utf8(s)
        }
        ast::Value::Boolean(b) => ScalarValue::Boolean(b),
        ast::Value::Null => ScalarValue::Null,
        other => return Err(unsupported(other)),
    })
}

fn convert_datatype(datatype: &ast::DataType) -> Result<DataType> {
    let name = datatype.to_string().to_ascii_lowercase();
    let base = name.split('(').next().unwrap_or_default().trim();
    Ok(match base {
        "boolean" | "bool" => DataType::Boolean,
        "int" | "integer" | "int4" | "int32" => DataType::Int32,
        "bigint" | "long" | "int8" | "int64" => DataType::Int64,
        "double" | "double precision" | "float" | "float8" | "float64" | "real" => {
            DataType::Float64
        }
        "string" | "text" | "varchar" | "char" | "character varying" => DataType::Utf8,
        _ => {
            return Err(DatasetError::Parse(format!(
                "Unsupported cast target type: {datatype}"
            )));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::lit;
    use crate::functions::col;

    #[test]
    fn parse_comparison() {
        let expr = SqlExpressionParser.parse_expression("age > 35").unwrap();
        assert_eq!(
            compare(ComparisonOperator::Gt, col("age").into_expr(), lit(35)),
            expr
        );
    }

    #[test]
    fn parse_nested_and_literals() {
        let expr = SqlExpressionParser
            .parse_expression("person.name = 'bob' AND NOT flag")
            .unwrap();
        assert_eq!("((person.name = 'bob') AND (NOT flag))", expr.to_string());

        let expr = SqlExpressionParser.parse_expression("-3000000000").unwrap();
        assert_eq!(lit(-3_000_000_000_i64), expr);
    }

    #[test]
    fn parse_select_items() {
        let parser = SqlExpressionParser;
        let expr = parser.parse_select_item("age + 1 AS next").unwrap();
        assert_eq!("next", expr.output_name());

        assert_eq!(
            Expression::UnresolvedStar(None),
            parser.parse_select_item("*").unwrap()
        );

        let expr = parser.parse_select_item("count(DISTINCT k)").unwrap();
        assert_eq!("count(DISTINCT k)", expr.to_string());
    }

    #[test]
    fn parse_cast_and_in() {
        let expr = SqlExpressionParser
            .parse_expression("CAST(a AS BIGINT) IN (1, 2)")
            .unwrap();
        assert_eq!(
            "((CAST(a AS bigint) = 1) OR (CAST(a AS bigint) = 2))",
            expr.to_string()
        );
    }

    #[test]
    fn parse_errors() {
        let err = SqlExpressionParser.parse_expression("a >").unwrap_err();
        assert!(err.is_parse());

        let err = SqlExpressionParser.parse_expression("a b").unwrap_err();
        assert!(err.is_parse());

        let err = SqlExpressionParser.parse_expression("frobnicate(a)").unwrap_err();
        assert!(err.message().contains("Unknown function"));
    }
}
