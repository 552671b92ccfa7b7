use crate::arrays::datatype::DataType;
use crate::arrays::scalar::ScalarValue;
use crate::errors::{DatasetError, Result, analysis};
use crate::expr::aggregate_expr::AggregateFunction;
use crate::expr::attribute::Attribute;
use crate::expr::{Expression, GetFieldExpr};

/// Function deciding if two identifiers refer to the same name.
pub type NameMatcher = fn(&str, &str) -> bool;

pub fn case_sensitive_match(a: &str, b: &str) -> bool {
    a == b
}

pub fn case_insensitive_match(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

pub fn name_matcher(case_sensitive: bool) -> NameMatcher {
    if case_sensitive {
        case_sensitive_match
    } else {
        case_insensitive_match
    }
}

/// Split a column name into its dot separated parts.
///
/// Backticks quote a part, and a doubled backtick inside quotes is a literal
/// backtick.
pub fn parse_attribute_name(name: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    let mut chars = name.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '`' if in_quotes && chars.peek() == Some(&'`') => {
                chars.next();
                current.push('`');
            }
            '`' => in_quotes = !in_quotes,
            '.' if !in_quotes => parts.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    parts.push(current);

    parts
}

/// Resolves names against the output of a plan.
#[derive(Debug, Clone, Copy)]
pub struct ColumnResolver<'a> {
    pub output: &'a [Attribute],
    pub matcher: NameMatcher,
}

impl<'a> ColumnResolver<'a> {
    pub fn new(output: &'a [Attribute], matcher: NameMatcher) -> Self {
        ColumnResolver { output, matcher }
    }

    /// Resolve a user provided name.
    ///
    /// `*` resolves to every output attribute.
    pub fn resolve_name(&self, name: &str) -> Result<Vec<Expression>> {
        if name == "*" {
            return Ok(self.output.iter().cloned().map(Expression::Column).collect());
        }

        let parts = parse_attribute_name(name);
        match self.resolve_parts(&parts)? {
            Some(expr) => Ok(vec![expr]),
            None => Err(self.not_found(name)),
        }
    }

    /// Resolve a single, non-star name, erroring if it can't be found.
    pub fn resolve_one(&self, name: &str) -> Result<Expression> {
        let parts = parse_attribute_name(name);
        self.resolve_parts(&parts)?
            .ok_or_else(|| self.not_found(name))
    }

    pub fn not_found(&self, name: &str) -> DatasetError {
        let names: Vec<_> = self.output.iter().map(|a| a.name.as_str()).collect();
        analysis!(
            "Cannot resolve column name \"{name}\" among ({})",
            names.join(", ")
        )
    }

    /// Resolve a name that's already been split into parts.
    ///
    /// The first part is tried as a relation qualifier before being tried as
    /// an attribute name. Remaining parts address nested struct fields.
    ///
    /// Returns `None` if nothing matches.
    pub fn resolve_parts(&self, parts: &[String]) -> Result<Option<Expression>> {
        if parts.is_empty() {
            return Ok(None);
        }

        let mut candidates: Vec<(&Attribute, &[String])> = Vec::new();

        if parts.len() >= 2 {
            candidates.extend(
                self.output
                    .iter()
                    .filter(|attr| {
                        attr.qualifier
                            .as_deref()
                            .is_some_and(|q| (self.matcher)(q, &parts[0]))
                            && (self.matcher)(&attr.name, &parts[1])
                    })
                    .map(|attr| (attr, &parts[2..])),
            );
        }

        if candidates.is_empty() {
            candidates.extend(
                self.output
                    .iter()
                    .filter(|attr| (self.matcher)(&attr.name, &parts[0]))
                    .map(|attr| (attr, &parts[1..])),
            );
        }

        match candidates.as_slice() {
            [] => Ok(None),
            [(attr, nested)] => {
                if nested.is_empty() {
                    return Ok(Some(Expression::Column((*attr).clone())));
                }
                let mut expr = Expression::Column((*attr).clone());
                let mut datatype = attr.datatype.clone();
                for field in nested.iter() {
                    let (actual, next) = self.resolve_field(&datatype, field)?;
                    expr = Expression::GetField(GetFieldExpr {
                        child: Box::new(expr),
                        field: actual,
                    });
                    datatype = next;
                }
                let alias = nested.last().cloned().unwrap_or_default();
                Ok(Some(expr.alias(alias)))
            }
            many => {
                let refs: Vec<_> = many.iter().map(|(attr, _)| attr.to_string()).collect();
                Err(analysis!(
                    "Reference '{}' is ambiguous, could be: {}",
                    parts.join("."),
                    refs.join(", ")
                ))
            }
        }
    }

    /// Expand `qualifier.*`.
    pub fn expand_qualified_star(&self, qualifier: &str) -> Result<Vec<Attribute>> {
        let attrs: Vec<_> = self
            .output
            .iter()
            .filter(|attr| {
                attr.qualifier
                    .as_deref()
                    .is_some_and(|q| (self.matcher)(q, qualifier))
            })
            .cloned()
            .collect();

        if attrs.is_empty() {
            let names: Vec<_> = self.output.iter().map(|a| a.name.as_str()).collect();
            return Err(analysis!(
                "Cannot resolve '{qualifier}.*' given input columns ({})",
                names.join(", ")
            ));
        }

        Ok(attrs)
    }

    fn resolve_field(&self, datatype: &DataType, field: &str) -> Result<(String, DataType)> {
        let meta = datatype
            .try_get_struct_meta()
            .ok_or_else(|| analysis!("Can't extract value from {datatype}: need struct type"))?;

        let matches: Vec<_> = meta
            .fields
            .iter()
            .filter(|f| (self.matcher)(&f.name, field))
            .collect();

        match matches.as_slice() {
            [f] => Ok((f.name.clone(), f.datatype.clone())),
            [] => Err(analysis!(
                "No such struct field {field} in {}",
                meta.field_names().collect::<Vec<_>>().join(", ")
            )),
            _ => Err(analysis!("Ambiguous reference to fields {field}")),
        }
    }
}

/// Resolve every column reference in an expression.
///
/// A nested field reference at the top of the expression keeps the alias
/// naming it after the field, nested references deeper in the expression
/// don't.
pub fn resolve_expression(expr: Expression, resolver: &ColumnResolver) -> Result<Expression> {
    if let Expression::UnresolvedColumn(col) = &expr {
        return resolver
            .resolve_parts(&col.name_parts)?
            .ok_or_else(|| resolver.not_found(&col.to_string()));
    }

    expr.transform_up(&mut |expr| match expr {
        Expression::UnresolvedColumn(col) => {
            let resolved = resolver
                .resolve_parts(&col.name_parts)?
                .ok_or_else(|| resolver.not_found(&col.to_string()))?;
            Ok(match resolved {
                Expression::Alias(alias) => *alias.child,
                other => other,
            })
        }
        // `count(*)` counts rows.
        Expression::Aggregate(mut agg)
            if agg.function == AggregateFunction::Count
                && matches!(agg.input.as_ref(), Expression::UnresolvedStar(None)) =>
        {
            agg.input = Box::new(Expression::Literal(ScalarValue::Int32(1)));
            Ok(Expression::Aggregate(agg))
        }
        other => Ok(other),
    })
}

/// Resolve a list of output expressions, expanding stars and naming every
/// expression.
pub fn resolve_output_list(
    exprs: Vec<Expression>,
    resolver: &ColumnResolver,
) -> Result<Vec<Expression>> {
    let mut resolved = Vec::with_capacity(exprs.len());
    for expr in exprs {
        match expr {
            Expression::UnresolvedStar(None) => {
                resolved.extend(resolver.output.iter().cloned().map(Expression::Column))
            }
            Expression::UnresolvedStar(Some(qualifier)) => resolved.extend(
                resolver
                    .expand_qualified_star(&qualifier)?
                    .into_iter()
                    .map(Expression::Column),
            ),
            Expression::ResolvedStar(attrs) => {
                resolved.extend(attrs.into_iter().map(Expression::Column))
            }
            other => {
                let expr = resolve_expression(other, resolver)?;
                resolved.push(name_expression(expr));
            }
        }
    }
    Ok(resolved)
}

/// Alias an expression after itself if it isn't already named.
pub fn name_expression(expr: Expression) -> Expression {
    match expr {
        expr @ (Expression::Column(_) | Expression::Alias(_)) => expr,
        other => {
            let name = other.output_name();
            other.alias(name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::field::Field;

    #[test]
    fn parse_names() {
        assert_eq!(vec!["a"], parse_attribute_name("a"));
        assert_eq!(vec!["a", "b", "c"], parse_attribute_name("a.b.c"));
        assert_eq!(vec!["a.b", "c"], parse_attribute_name("`a.b`.c"));
        assert_eq!(vec!["a`b"], parse_attribute_name("`a``b`"));
    }

    #[test]
    fn resolve_case_insensitive() {
        let name = Attribute::new("Name", DataType::Utf8, true);
        let output = vec![name.clone()];

        let resolver = ColumnResolver::new(&output, case_insensitive_match);
        assert_eq!(
            Expression::Column(name.clone()),
            resolver.resolve_one("name").unwrap()
        );

        let resolver = ColumnResolver::new(&output, case_sensitive_match);
        let err = resolver.resolve_one("name").unwrap_err();
        assert_eq!(
            "Cannot resolve column name \"name\" among (Name)",
            err.message()
        );
    }

    #[test]
    fn resolve_star() {
        let output = vec![
            Attribute::new("a", DataType::Int32, true),
            Attribute::new("b", DataType::Int32, true),
        ];
        let resolver = ColumnResolver::new(&output, case_sensitive_match);
        assert_eq!(2, resolver.resolve_name("*").unwrap().len());
    }

    #[test]
    fn resolve_qualified_and_ambiguous() {
        let left = Attribute::new("k", DataType::Int32, true).with_qualifier(Some("l".into()));
        let right = Attribute::new("k", DataType::Int32, true).with_qualifier(Some("r".into()));
        let output = vec![left.clone(), right.clone()];
        let resolver = ColumnResolver::new(&output, case_sensitive_match);

        assert_eq!(
            Expression::Column(right),
            resolver.resolve_one("r.k").unwrap()
        );
        let err = resolver.resolve_one("k").unwrap_err();
        assert!(err.is_analysis());
        assert!(err.message().contains("ambiguous"));
    }

    #[test]
    fn resolve_nested() {
        let person = Attribute::new(
            "person",
            DataType::struct_type([
                Field::new("name", DataType::Utf8, true),
                Field::new("age", DataType::Int32, true),
            ]),
            true,
        );
        let output = vec![person];
        let resolver = ColumnResolver::new(&output, case_insensitive_match);

        let expr = resolver.resolve_one("person.AGE").unwrap();
        assert_eq!("AGE", expr.output_name());
        assert_eq!(DataType::Int32, expr.datatype().unwrap());

        let err = resolver.resolve_one("person.height").unwrap_err();
        assert!(err.message().contains("No such struct field"));
    }

    #[test]
    fn resolve_and_name_output_list() {
        let a = Attribute::new("a", DataType::Int32, false);
        let b = Attribute::new("b", DataType::Int32, false);
        let output = vec![a.clone(), b.clone()];
        let resolver = ColumnResolver::new(&output, case_insensitive_match);

        let exprs = vec![
            crate::functions::col("*").into_expr(),
            (crate::functions::col("a") + 1).into_expr(),
        ];
        let resolved = resolve_output_list(exprs, &resolver).unwrap();
        assert_eq!(3, resolved.len());
        assert_eq!(Expression::Column(a), resolved[0]);
        assert_eq!(Expression::Column(b), resolved[1]);
        assert_eq!("(a + 1)", resolved[2].output_name());
        assert!(matches!(resolved[2], Expression::Alias(_)));
    }

    #[test]
    fn count_star_counts_rows() {
        let output = vec![Attribute::new("a", DataType::Int32, false)];
        let resolver = ColumnResolver::new(&output, case_insensitive_match);
        let expr = crate::functions::count(crate::functions::col("*")).into_expr();
        let resolved = resolve_expression(expr, &resolver).unwrap();
        assert_eq!("count(1)", resolved.to_string());
    }
}
