//! Query request types

use serde::{Deserialize, Serialize};

use crate::error::QueryParseError;

/// Queryable record tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Table {
    Expenses,
    Incomes,
}

const EXPENSE_COLUMNS: &[&str] = &[
    "id",
    "amount",
    "category",
    "date",
    "notes",
    "frequency",
    "recurring_group_id",
];

const INCOME_COLUMNS: &[&str] = &["id", "amount", "date", "source"];

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Expenses => "expenses",
            Table::Incomes => "incomes",
        }
    }

    /// Record columns in display order
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Table::Expenses => EXPENSE_COLUMNS,
            Table::Incomes => INCOME_COLUMNS,
        }
    }

    pub fn has_column(&self, field: &str) -> bool {
        self.columns().contains(&field)
    }

    /// Columns compared numerically
    pub fn is_numeric(field: &str) -> bool {
        matches!(field, "id" | "amount")
    }
}

impl std::str::FromStr for Table {
    type Err = QueryParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "expenses" | "expense" => Ok(Table::Expenses),
            "incomes" | "income" => Ok(Table::Incomes),
            _ => Err(QueryParseError::UnknownTable { table: s.to_string() }),
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Filter comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    #[serde(rename = "=", alias = "eq")]
    Eq,
    #[serde(rename = "!=", alias = "ne")]
    Ne,
    #[serde(rename = "<", alias = "lt")]
    Lt,
    #[serde(rename = "<=", alias = "le")]
    Le,
    #[serde(rename = ">", alias = "gt")]
    Gt,
    #[serde(rename = ">=", alias = "ge")]
    Ge,
    /// String prefix, e.g. `date ^= 2024-01`
    #[serde(rename = "^=", alias = "prefix")]
    Prefix,
    /// Case-insensitive substring
    #[serde(rename = "~", alias = "contains")]
    Contains,
}

impl Op {
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Ne => "!=",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::Prefix => "^=",
            Op::Contains => "~",
        }
    }
}

impl std::str::FromStr for Op {
    type Err = QueryParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "=" | "==" | "eq" => Ok(Op::Eq),
            "!=" | "ne" => Ok(Op::Ne),
            "<" | "lt" => Ok(Op::Lt),
            "<=" | "le" => Ok(Op::Le),
            ">" | "gt" => Ok(Op::Gt),
            ">=" | "ge" => Ok(Op::Ge),
            "^=" | "prefix" => Ok(Op::Prefix),
            "~" | "contains" => Ok(Op::Contains),
            _ => Err(QueryParseError::UnknownOperator { op: s.to_string() }),
        }
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Aggregate function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggFunc {
    Sum,
    Count,
    Avg,
    Min,
    Max,
}

impl AggFunc {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggFunc::Sum => "sum",
            AggFunc::Count => "count",
            AggFunc::Avg => "avg",
            AggFunc::Min => "min",
            AggFunc::Max => "max",
        }
    }

    /// Whether the function only makes sense over numeric columns
    pub fn needs_numeric(&self) -> bool {
        matches!(self, AggFunc::Sum | AggFunc::Avg)
    }
}

impl std::str::FromStr for AggFunc {
    type Err = QueryParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sum" => Ok(AggFunc::Sum),
            "count" => Ok(AggFunc::Count),
            "avg" | "mean" => Ok(AggFunc::Avg),
            "min" => Ok(AggFunc::Min),
            "max" => Ok(AggFunc::Max),
            _ => Err(QueryParseError::MalformedStage {
                stage: s.to_string(),
                message: "expected sum, count, avg, min or max".to_string(),
            }),
        }
    }
}

impl std::fmt::Display for AggFunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One `field op value` condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub op: Op,
    pub value: String,
}

/// Aggregate over one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub func: AggFunc,
    pub field: String,
}

impl Aggregate {
    /// Name of the output column, e.g. `sum_amount`
    pub fn column_name(&self) -> String {
        format!("{}_{}", self.func, self.field)
    }
}

/// Result ordering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sort {
    pub key: String,
    #[serde(default)]
    pub descending: bool,
}

/// A whitelisted query over one record table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub table: Table,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub group_by: Option<String>,
    #[serde(default)]
    pub aggregate: Option<Aggregate>,
    #[serde(default)]
    pub sort: Option<Sort>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl QueryRequest {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            filters: Vec::new(),
            group_by: None,
            aggregate: None,
            sort: None,
            limit: None,
        }
    }

    /// Parse a JSON request body
    pub fn from_json(value: serde_json::Value) -> Result<Self, QueryParseError> {
        let request: QueryRequest = serde_json::from_value(value)
            .map_err(|e| QueryParseError::InvalidJson { message: e.to_string() })?;
        request.validate()?;
        Ok(request)
    }

    /// Aggregate actually applied: grouping without one counts rows
    pub fn effective_aggregate(&self) -> Option<Aggregate> {
        match (&self.aggregate, &self.group_by) {
            (Some(agg), _) => Some(agg.clone()),
            (None, Some(_)) => Some(Aggregate { func: AggFunc::Count, field: "id".to_string() }),
            (None, None) => None,
        }
    }

    /// Columns of the result table
    pub fn output_columns(&self) -> Vec<String> {
        match self.effective_aggregate() {
            Some(agg) => {
                let mut cols = Vec::new();
                if let Some(ref group) = self.group_by {
                    cols.push(group.clone());
                }
                cols.push(agg.column_name());
                cols
            }
            None => self.table.columns().iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Check every field name against the table's whitelist
    pub fn validate(&self) -> Result<(), QueryParseError> {
        let check_field = |field: &str| {
            if self.table.has_column(field) {
                Ok(())
            } else {
                Err(QueryParseError::UnknownField {
                    table: self.table.to_string(),
                    field: field.to_string(),
                })
            }
        };

        for filter in &self.filters {
            check_field(&filter.field)?;
        }
        if let Some(ref group) = self.group_by {
            check_field(group)?;
        }
        if let Some(ref agg) = self.aggregate {
            check_field(&agg.field)?;
            if agg.func.needs_numeric() && !Table::is_numeric(&agg.field) {
                return Err(QueryParseError::InvalidAggregate {
                    func: agg.func.to_string(),
                    field: agg.field.clone(),
                });
            }
        }
        if let Some(ref sort) = self.sort {
            let columns = self.output_columns();
            if !columns.iter().any(|c| c == &sort.key) {
                return Err(QueryParseError::InvalidSortKey {
                    key: sort.key.clone(),
                    available: columns.join(", "),
                });
            }
        }
        Ok(())
    }
}
