pub mod aggregate_expr;
pub mod arith_expr;
pub mod attribute;
pub mod column;
pub mod comparison_expr;
pub mod conjunction_expr;
pub mod sort_expr;

use std::fmt;

use aggregate_expr::{AggregateExpr, AggregateFunction};
use arith_expr::{ArithExpr, ArithOperator};
use attribute::{Attribute, AttributeId};
use comparison_expr::{ComparisonExpr, ComparisonOperator};
use conjunction_expr::{ConjunctionExpr, ConjunctionOperator};

use crate::arrays::datatype::DataType;
use crate::arrays::field::Field;
use crate::arrays::scalar::ScalarValue;
use crate::errors::{Result, analysis};

/// A column reference that hasn't been resolved against a plan yet.
///
/// Produced by parsed SQL text and by `functions::col`. Resolution happens
/// during analysis.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnresolvedColumn {
    /// Name split on (unquoted) dots.
    pub name_parts: Vec<String>,
}

impl fmt::Display for UnresolvedColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name_parts.join("."))
    }
}

/// Names an expression, producing a new attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct AliasExpr {
    pub child: Box<Expression>,
    pub name: String,
    /// Id of the attribute this alias produces. Assigned when the alias is
    /// created.
    pub id: AttributeId,
}

impl AliasExpr {
    pub fn to_attribute(&self) -> Result<Attribute> {
        Ok(Attribute {
            id: self.id,
            name: self.name.clone(),
            datatype: self.child.datatype()?,
            nullable: self.child.nullable(),
            qualifier: None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CastExpr {
    pub child: Box<Expression>,
    pub to: DataType,
}

/// Extract a field from a struct.
#[derive(Debug, Clone, PartialEq)]
pub struct GetFieldExpr {
    pub child: Box<Expression>,
    pub field: String,
}

impl GetFieldExpr {
    /// Position and definition of the extracted field in the child's struct
    /// type.
    pub fn field_position(&self) -> Result<(usize, Field)> {
        let datatype = self.child.datatype()?;
        let meta = datatype
            .try_get_struct_meta()
            .ok_or_else(|| analysis!("Cannot extract field '{}' from {datatype}", self.field))?;
        meta.fields
            .iter()
            .enumerate()
            .find(|(_, f)| f.name == self.field)
            .map(|(idx, f)| (idx, f.clone()))
            .ok_or_else(|| {
                analysis!(
                    "No such struct field '{}' in {}",
                    self.field,
                    meta.field_names().collect::<Vec<_>>().join(", ")
                )
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A resolved reference to an attribute produced by a child plan.
    Column(Attribute),
    UnresolvedColumn(UnresolvedColumn),
    /// `*` or `qualifier.*` that hasn't been expanded yet.
    UnresolvedStar(Option<String>),
    /// A `*` that's already been expanded into the attributes it covers.
    ResolvedStar(Vec<Attribute>),
    Literal(ScalarValue),
    Alias(AliasExpr),
    Comparison(ComparisonExpr),
    Arith(ArithExpr),
    Conjunction(ConjunctionExpr),
    Not(Box<Expression>),
    Negate(Box<Expression>),
    IsNull(Box<Expression>),
    IsNotNull(Box<Expression>),
    Cast(CastExpr),
    GetField(GetFieldExpr),
    CreateStruct(Vec<(String, Expression)>),
    Coalesce(Vec<Expression>),
    Aggregate(AggregateExpr),
}

impl Expression {
    pub fn datatype(&self) -> Result<DataType> {
        Ok(match self {
            Self::Column(attr) => attr.datatype.clone(),
            Self::UnresolvedColumn(_) | Self::UnresolvedStar(_) | Self::ResolvedStar(_) => {
                return Err(analysis!("Cannot get the datatype of unresolved '{self}'"));
            }
            Self::Literal(lit) => lit.datatype()?,
            Self::Alias(alias) => alias.child.datatype()?,
            Self::Comparison(cmp) => {
                let left = cmp.left.datatype()?;
                let right = cmp.right.datatype()?;
                if DataType::common_type(&left, &right).is_none() {
                    return Err(analysis!(
                        "Cannot compare {left} with {right} in '{self}'"
                    ));
                }
                DataType::Boolean
            }
            Self::Arith(arith) => arith.datatype()?,
            Self::Conjunction(conj) => {
                for child in [&conj.left, &conj.right] {
                    let datatype = child.datatype()?;
                    if !matches!(datatype, DataType::Boolean | DataType::Null) {
                        return Err(analysis!(
                            "Expected boolean input to {}, got {datatype} for '{child}'",
                            conj.op
                        ));
                    }
                }
                DataType::Boolean
            }
            Self::Not(child) => {
                let datatype = child.datatype()?;
                if !matches!(datatype, DataType::Boolean | DataType::Null) {
                    return Err(analysis!("Expected boolean input to NOT, got {datatype}"));
                }
                DataType::Boolean
            }
            Self::Negate(child) => {
                let datatype = child.datatype()?;
                if !(datatype.is_numeric() || datatype.is_null()) {
                    return Err(analysis!("Cannot negate {datatype}"));
                }
                datatype
            }
            Self::IsNull(_) | Self::IsNotNull(_) => DataType::Boolean,
            Self::Cast(cast) => {
                cast.child.datatype()?;
                cast.to.clone()
            }
            Self::GetField(get) => get.field_position()?.1.datatype,
            Self::CreateStruct(fields) => DataType::struct_type(
                fields
                    .iter()
                    .map(|(name, expr)| Ok(Field::new(name.clone(), expr.datatype()?, expr.nullable())))
                    .collect::<Result<Vec<_>>>()?,
            ),
            Self::Coalesce(exprs) => {
                let mut datatype = DataType::Null;
                for expr in exprs {
                    let next = expr.datatype()?;
                    datatype = DataType::common_type(&datatype, &next).ok_or_else(|| {
                        analysis!("Mismatched types in coalesce: {datatype} and {next}")
                    })?;
                }
                datatype
            }
            Self::Aggregate(agg) => agg.datatype()?,
        })
    }

    pub fn nullable(&self) -> bool {
        match self {
            Self::Column(attr) => attr.nullable,
            Self::Literal(lit) => lit.is_null(),
            Self::Alias(alias) => alias.child.nullable(),
            Self::IsNull(_) | Self::IsNotNull(_) => false,
            Self::Comparison(cmp) if cmp.op == ComparisonOperator::EqNullSafe => false,
            Self::Comparison(cmp) => cmp.left.nullable() || cmp.right.nullable(),
            Self::Arith(arith) => {
                // Division by zero produces null.
                arith.op == ArithOperator::Div
                    || arith.op == ArithOperator::Rem
                    || arith.left.nullable()
                    || arith.right.nullable()
            }
            Self::Conjunction(conj) => conj.left.nullable() || conj.right.nullable(),
            Self::Not(child) | Self::Negate(child) => child.nullable(),
            // Failed string parses produce null.
            Self::Cast(_) => true,
            Self::GetField(get) => {
                get.child.nullable() || get.field_position().map(|(_, f)| f.nullable).unwrap_or(true)
            }
            Self::CreateStruct(_) => false,
            Self::Coalesce(exprs) => exprs.iter().all(|e| e.nullable()),
            Self::Aggregate(agg) => agg.nullable(),
            Self::UnresolvedColumn(_) | Self::UnresolvedStar(_) | Self::ResolvedStar(_) => true,
        }
    }

    /// Name to use for the attribute this expression produces when it's part
    /// of a projection.
    pub fn output_name(&self) -> String {
        match self {
            Self::Column(attr) => attr.name.clone(),
            Self::Alias(alias) => alias.name.clone(),
            Self::UnresolvedColumn(col) => col
                .name_parts
                .last()
                .cloned()
                .unwrap_or_default(),
            Self::GetField(get) => get.field.clone(),
            other => other.to_string(),
        }
    }

    /// Direct children of this expression.
    pub fn children(&self) -> Vec<&Expression> {
        match self {
            Self::Column(_)
            | Self::UnresolvedColumn(_)
            | Self::UnresolvedStar(_)
            | Self::ResolvedStar(_)
            | Self::Literal(_) => Vec::new(),
            Self::Alias(alias) => vec![alias.child.as_ref()],
            Self::Comparison(cmp) => vec![cmp.left.as_ref(), cmp.right.as_ref()],
            Self::Arith(arith) => vec![arith.left.as_ref(), arith.right.as_ref()],
            Self::Conjunction(conj) => vec![conj.left.as_ref(), conj.right.as_ref()],
            Self::Not(child) | Self::Negate(child) | Self::IsNull(child) | Self::IsNotNull(child) => {
                vec![child.as_ref()]
            }
            Self::Cast(cast) => vec![cast.child.as_ref()],
            Self::GetField(get) => vec![get.child.as_ref()],
            Self::CreateStruct(fields) => fields.iter().map(|(_, expr)| expr).collect(),
            Self::Coalesce(exprs) => exprs.iter().collect(),
            Self::Aggregate(agg) => vec![agg.input.as_ref()],
        }
    }

    pub fn for_each_child<F>(&self, func: &mut F) -> Result<()>
    where
        F: FnMut(&Expression) -> Result<()>,
    {
        for child in self.children() {
            func(child)?;
        }
        Ok(())
    }

    pub fn for_each_child_mut<F>(&mut self, func: &mut F) -> Result<()>
    where
        F: FnMut(&mut Expression) -> Result<()>,
    {
        match self {
            Self::Column(_)
            | Self::UnresolvedColumn(_)
            | Self::UnresolvedStar(_)
            | Self::ResolvedStar(_)
            | Self::Literal(_) => (),
            Self::Alias(alias) => func(&mut alias.child)?,
            Self::Comparison(cmp) => {
                func(&mut cmp.left)?;
                func(&mut cmp.right)?;
            }
            Self::Arith(arith) => {
                func(&mut arith.left)?;
                func(&mut arith.right)?;
            }
            Self::Conjunction(conj) => {
                func(&mut conj.left)?;
                func(&mut conj.right)?;
            }
            Self::Not(child) | Self::Negate(child) | Self::IsNull(child) | Self::IsNotNull(child) => {
                func(child)?
            }
            Self::Cast(cast) => func(&mut cast.child)?,
            Self::GetField(get) => func(&mut get.child)?,
            Self::CreateStruct(fields) => {
                for (_, expr) in fields {
                    func(expr)?;
                }
            }
            Self::Coalesce(exprs) => {
                for expr in exprs {
                    func(expr)?;
                }
            }
            Self::Aggregate(agg) => func(&mut agg.input)?,
        }
        Ok(())
    }

    /// Rewrite this expression bottom up, children before their parents.
    pub fn transform_up<F>(mut self, func: &mut F) -> Result<Expression>
    where
        F: FnMut(Expression) -> Result<Expression>,
    {
        self.for_each_child_mut(&mut |child| {
            let owned = std::mem::replace(child, Expression::Literal(ScalarValue::Null));
            *child = owned.transform_up(func)?;
            Ok(())
        })?;
        func(self)
    }

    /// Rewrite this expression top down. Children of a replaced node are the
    /// children of the replacement.
    pub fn transform_down<F>(self, func: &mut F) -> Result<Expression>
    where
        F: FnMut(Expression) -> Result<Expression>,
    {
        let mut expr = func(self)?;
        expr.for_each_child_mut(&mut |child| {
            let owned = std::mem::replace(child, Expression::Literal(ScalarValue::Null));
            *child = owned.transform_down(func)?;
            Ok(())
        })?;
        Ok(expr)
    }

    /// Walk all nodes in the expression, parents before children.
    pub fn walk<F>(&self, func: &mut F) -> Result<()>
    where
        F: FnMut(&Expression) -> Result<()>,
    {
        func(self)?;
        self.for_each_child(&mut |child| child.walk(func))
    }

    /// Pre-order traversal with a callback that can't fail.
    pub fn visit<F>(&self, func: &mut F)
    where
        F: FnMut(&Expression),
    {
        func(self);
        for child in self.children() {
            child.visit(func);
        }
    }

    /// All attributes referenced by this expression.
    pub fn references(&self) -> Vec<Attribute> {
        let mut refs = Vec::new();
        self.visit(&mut |expr| match expr {
            Self::Column(attr) => refs.push(attr.clone()),
            Self::ResolvedStar(attrs) => refs.extend(attrs.iter().cloned()),
            _ => (),
        });
        refs
    }

    pub fn contains_aggregate(&self) -> bool {
        let mut found = false;
        self.visit(&mut |expr| found |= matches!(expr, Self::Aggregate(_)));
        found
    }

    pub fn is_resolved(&self) -> bool {
        let mut resolved = true;
        self.visit(&mut |expr| {
            resolved &= !matches!(
                expr,
                Self::UnresolvedColumn(_) | Self::UnresolvedStar(_) | Self::ResolvedStar(_)
            );
        });
        resolved
    }

    /// Get the attribute this expression produces if it's already named.
    pub fn try_as_attribute(&self) -> Result<Option<Attribute>> {
        Ok(match self {
            Self::Column(attr) => Some(attr.clone()),
            Self::Alias(alias) => Some(alias.to_attribute()?),
            _ => None,
        })
    }

    pub fn alias(self, name: impl Into<String>) -> Expression {
        let child = match self {
            // Re-aliasing replaces the name, not stacks it.
            Self::Alias(alias) => alias.child,
            other => Box::new(other),
        };
        Expression::Alias(AliasExpr {
            child,
            name: name.into(),
            id: AttributeId::next(),
        })
    }
}

impl From<Attribute> for Expression {
    fn from(value: Attribute) -> Self {
        Expression::Column(value)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column(attr) => write!(f, "{}", attr.name),
            Self::UnresolvedColumn(col) => write!(f, "{col}"),
            Self::UnresolvedStar(None) | Self::ResolvedStar(_) => write!(f, "*"),
            Self::UnresolvedStar(Some(qualifier)) => write!(f, "{qualifier}.*"),
            Self::Literal(ScalarValue::Utf8(s)) => write!(f, "'{s}'"),
            Self::Literal(lit) => write!(f, "{lit}"),
            Self::Alias(alias) => write!(f, "{} AS {}", alias.child, alias.name),
            Self::Comparison(cmp) => write!(f, "{cmp}"),
            Self::Arith(arith) => write!(f, "{arith}"),
            Self::Conjunction(conj) => write!(f, "{conj}"),
            Self::Not(child) => write!(f, "(NOT {child})"),
            Self::Negate(child) => write!(f, "(- {child})"),
            Self::IsNull(child) => write!(f, "({child} IS NULL)"),
            Self::IsNotNull(child) => write!(f, "({child} IS NOT NULL)"),
            Self::Cast(cast) => write!(f, "CAST({} AS {})", cast.child, cast.to),
            Self::GetField(get) => write!(f, "{}.{}", get.child, get.field),
            Self::CreateStruct(fields) => {
                write!(f, "struct(")?;
                for (idx, (_, expr)) in fields.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{expr}")?;
                }
                write!(f, ")")
            }
            Self::Coalesce(exprs) => {
                write!(f, "coalesce(")?;
                for (idx, expr) in exprs.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{expr}")?;
                }
                write!(f, ")")
            }
            Self::Aggregate(agg) => write!(f, "{agg}"),
        }
    }
}

pub fn column(attr: &Attribute) -> Expression {
    Expression::Column(attr.clone())
}

pub fn lit(value: impl Into<ScalarValue>) -> Expression {
    Expression::Literal(value.into())
}

pub fn compare(op: ComparisonOperator, left: Expression, right: Expression) -> Expression {
    Expression::Comparison(ComparisonExpr {
        left: Box::new(left),
        right: Box::new(right),
        op,
    })
}

pub fn eq(left: Expression, right: Expression) -> Expression {
    compare(ComparisonOperator::Eq, left, right)
}

pub fn arith(op: ArithOperator, left: Expression, right: Expression) -> Expression {
    Expression::Arith(ArithExpr {
        left: Box::new(left),
        right: Box::new(right),
        op,
    })
}

pub fn conjunction(op: ConjunctionOperator, left: Expression, right: Expression) -> Expression {
    Expression::Conjunction(ConjunctionExpr {
        op,
        left: Box::new(left),
        right: Box::new(right),
    })
}

/// AND together all expressions. Returns None if the iterator is empty.
pub fn and_all(exprs: impl IntoIterator<Item = Expression>) -> Option<Expression> {
    exprs
        .into_iter()
        .reduce(|acc, expr| conjunction(ConjunctionOperator::And, acc, expr))
}

pub fn cast(expr: Expression, to: DataType) -> Expression {
    Expression::Cast(CastExpr {
        child: Box::new(expr),
        to,
    })
}

pub fn aggregate(function: AggregateFunction, input: Expression, distinct: bool) -> Expression {
    Expression::Aggregate(AggregateExpr {
        function,
        input: Box::new(input),
        distinct,
    })
}
