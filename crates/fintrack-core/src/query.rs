//! Query execution over in-memory records and the agent-facing wrappers

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::str::FromStr;

use fintrack_query::{AggFunc, Aggregate, Filter, Op, QueryRequest, Table, GRAMMAR};

use crate::error::{CoreError, CoreResult};
use crate::models::{Expense, Income};

/// Returned to the agent when a query matches nothing
pub const NO_RESULTS: &str = "No results found. Please try another query.";

/// One result cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Int(i64),
    Num(Decimal),
    Text(String),
}

impl Cell {
    fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Cell::Int(i) => Some(Decimal::from(*i)),
            Cell::Num(d) => Some(*d),
            _ => None,
        }
    }

    fn as_text(&self) -> String {
        match self {
            Cell::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// Numbers compare numerically, everything else as text; nulls sort first
    fn compare(&self, other: &Cell) -> Ordering {
        match (self, other) {
            (Cell::Null, Cell::Null) => Ordering::Equal,
            (Cell::Null, _) => Ordering::Less,
            (_, Cell::Null) => Ordering::Greater,
            _ => match (self.as_decimal(), other.as_decimal()) {
                (Some(a), Some(b)) => a.cmp(&b),
                _ => self.as_text().cmp(&other.as_text()),
            },
        }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Null => write!(f, "null"),
            Cell::Int(i) => write!(f, "{}", i),
            Cell::Num(d) => write!(f, "{}", d.normalize()),
            Cell::Text(s) => write!(f, "{}", s),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Null => serializer.serialize_none(),
            Cell::Int(i) => serializer.serialize_i64(*i),
            Cell::Num(d) => serializer.serialize_f64(d.to_f64().unwrap_or_default()),
            Cell::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// Records the executor can read columns from
pub trait QueryRow {
    fn cell(&self, field: &str) -> Cell;
}

fn text(value: &Option<String>) -> Cell {
    value.as_ref().map(|s| Cell::Text(s.clone())).unwrap_or(Cell::Null)
}

impl QueryRow for Expense {
    fn cell(&self, field: &str) -> Cell {
        match field {
            "id" => Cell::Int(self.id),
            "amount" => Cell::Num(self.amount),
            "category" => Cell::Text(self.category.clone()),
            "date" => Cell::Text(self.date.format("%Y-%m-%d").to_string()),
            "notes" => text(&self.notes),
            "frequency" => self.frequency.map(|f| Cell::Text(f.to_string())).unwrap_or(Cell::Null),
            "recurring_group_id" => text(&self.recurring_group_id),
            _ => Cell::Null,
        }
    }
}

impl QueryRow for Income {
    fn cell(&self, field: &str) -> Cell {
        match field {
            "id" => Cell::Int(self.id),
            "amount" => Cell::Num(self.amount),
            "date" => Cell::Text(self.date.format("%Y-%m-%d").to_string()),
            "source" => text(&self.source),
            _ => Cell::Null,
        }
    }
}

/// Tabular query output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    /// More rows matched than were returned
    pub truncated: bool,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Fixed-width text table
    pub fn to_text_table(&self) -> String {
        let rendered: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect();
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                rendered
                    .iter()
                    .map(|r| r[i].chars().count())
                    .chain(std::iter::once(col.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let format_line = |cells: &[String]| -> String {
            cells
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{:<width$}", c, width = *w))
                .collect::<Vec<_>>()
                .join(" | ")
                .trim_end()
                .to_string()
        };

        let mut out = String::new();
        out.push_str(&format_line(&self.columns));
        out.push('\n');
        out.push_str(
            &widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join("-+-"),
        );
        for row in &rendered {
            out.push('\n');
            out.push_str(&format_line(row));
        }
        if self.truncated {
            out.push_str(&format!("\n({} rows shown, more matched)", self.rows.len()));
        }
        out
    }
}

fn matches(cell: &Cell, filter: &Filter) -> CoreResult<bool> {
    let numeric = Table::is_numeric(&filter.field);
    let result = match filter.op {
        Op::Prefix => cell.as_text().starts_with(&filter.value),
        Op::Contains => cell
            .as_text()
            .to_lowercase()
            .contains(&filter.value.to_lowercase()),
        op if numeric => {
            let wanted = Decimal::from_str(filter.value.trim()).map_err(|_| CoreError::QueryError {
                message: format!("'{}' is not a number, cannot compare with {}", filter.value, filter.field),
            })?;
            let actual = cell.as_decimal().unwrap_or(Decimal::ZERO);
            compare_with(op, actual.cmp(&wanted))
        }
        op => compare_with(op, cell.as_text().as_str().cmp(filter.value.as_str())),
    };
    Ok(result)
}

fn compare_with(op: Op, ordering: Ordering) -> bool {
    match op {
        Op::Eq => ordering == Ordering::Equal,
        Op::Ne => ordering != Ordering::Equal,
        Op::Lt => ordering == Ordering::Less,
        Op::Le => ordering != Ordering::Greater,
        Op::Gt => ordering == Ordering::Greater,
        Op::Ge => ordering != Ordering::Less,
        Op::Prefix | Op::Contains => false,
    }
}

fn aggregate(agg: &Aggregate, rows: &[&dyn QueryRow]) -> Cell {
    let cells: Vec<Cell> = rows
        .iter()
        .map(|r| r.cell(&agg.field))
        .filter(|c| *c != Cell::Null)
        .collect();
    match agg.func {
        AggFunc::Count => Cell::Int(rows.len() as i64),
        AggFunc::Sum => Cell::Num(cells.iter().filter_map(Cell::as_decimal).sum()),
        AggFunc::Avg => {
            let values: Vec<Decimal> = cells.iter().filter_map(Cell::as_decimal).collect();
            if values.is_empty() {
                Cell::Null
            } else {
                let total: Decimal = values.iter().sum();
                Cell::Num((total / Decimal::from(values.len())).round_dp(2))
            }
        }
        AggFunc::Min => cells.into_iter().min_by(|a, b| a.compare(b)).unwrap_or(Cell::Null),
        AggFunc::Max => cells.into_iter().max_by(|a, b| a.compare(b)).unwrap_or(Cell::Null),
    }
}

/// Run a validated request over the rows of its table.
///
/// No matching records gives an empty result, also when aggregating.
pub fn execute(request: &QueryRequest, rows: &[&dyn QueryRow], max_rows: usize) -> CoreResult<QueryResult> {
    request.validate()?;

    let mut filtered: Vec<&dyn QueryRow> = Vec::new();
    for row in rows {
        let mut keep = true;
        for filter in &request.filters {
            if !matches(&row.cell(&filter.field), filter)? {
                keep = false;
                break;
            }
        }
        if keep {
            filtered.push(*row);
        }
    }

    let columns = request.output_columns();
    let mut out: Vec<Vec<Cell>> = match request.effective_aggregate() {
        _ if filtered.is_empty() => Vec::new(),
        Some(agg) => match request.group_by {
            Some(ref field) => {
                let mut groups: BTreeMap<String, (Cell, Vec<&dyn QueryRow>)> = BTreeMap::new();
                for row in &filtered {
                    let key = row.cell(field);
                    groups
                        .entry(key.as_text())
                        .or_insert_with(|| (key.clone(), Vec::new()))
                        .1
                        .push(*row);
                }
                groups
                    .into_values()
                    .map(|(key, members)| vec![key, aggregate(&agg, &members)])
                    .collect()
            }
            None => vec![vec![aggregate(&agg, &filtered)]],
        },
        None => filtered
            .iter()
            .map(|row| columns.iter().map(|c| row.cell(c)).collect())
            .collect(),
    };

    if let Some(ref sort) = request.sort {
        if let Some(index) = columns.iter().position(|c| c == &sort.key) {
            out.sort_by(|a, b| {
                let ordering = a[index].compare(&b[index]);
                if sort.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }
    }

    let cap = request.limit.unwrap_or(max_rows).min(max_rows);
    let truncated = out.len() > max_rows && cap == max_rows;
    out.truncate(cap);

    Ok(QueryResult { columns, rows: out, truncated })
}

/// Human-readable schema of a table, shown to agents
pub fn data_schema(table: Table) -> String {
    match table {
        Table::Expenses => "Table expenses:\n  \
            - id: integer\n  \
            - amount: decimal\n  \
            - category: text\n  \
            - date: text (YYYY-MM-DD)\n  \
            - notes: text (nullable)\n  \
            - frequency: text (nullable; Weekly, Biweekly, Monthly, Quarterly, Yearly)\n  \
            - recurring_group_id: text (nullable)"
            .to_string(),
        Table::Incomes => "Table incomes:\n  \
            - id: integer\n  \
            - amount: decimal\n  \
            - date: text (YYYY-MM-DD)\n  \
            - source: text (nullable)"
            .to_string(),
    }
}

/// Description handed to an external agent framework
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

pub fn tool_descriptor(max_rows: usize) -> ToolDescriptor {
    let description = format!(
        "Query the user's personal finance records. Pass a direct query string.\n\n\
         {}\n\n{}\n\nGrammar:\n{}\n\nAt most {} rows are returned. \
         Example: from expenses | where date ^= 2024-01 | group by category | sum amount | sort by sum_amount desc",
        data_schema(Table::Expenses),
        data_schema(Table::Incomes),
        GRAMMAR,
        max_rows
    );
    ToolDescriptor {
        name: "query_expenses".to_string(),
        description,
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Direct query, e.g. 'from expenses | where category = Grocery | sum amount'"
                }
            },
            "required": ["query"]
        }),
    }
}

/// Agent-facing rendering: errors and empty results become text, never failures
pub fn render_answer(result: CoreResult<QueryResult>) -> String {
    match result {
        Ok(result) if result.is_empty() => NO_RESULTS.to_string(),
        Ok(result) => result.to_text_table(),
        Err(CoreError::QueryError { message }) => {
            format!("Query error: {}; please try another query.", message)
        }
        Err(e) => format!("Query failed: {}; please try another query.", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExpenseDraft;
    use chrono::NaiveDate;
    use fintrack_query::QueryParser;

    fn expense(id: i64, category: &str, amount: &str, date: &str) -> Expense {
        ExpenseDraft::new(
            Decimal::from_str(amount).unwrap(),
            category,
            NaiveDate::from_str(date).unwrap(),
        )
        .into_expense(id)
    }

    fn sample() -> Vec<Expense> {
        vec![
            expense(1, "Grocery", "100", "2024-01-05"),
            expense(2, "Grocery", "50", "2024-02-10"),
            expense(3, "Rent", "800", "2024-01-01"),
            expense(4, "Food & Dining", "12.5", "2024-01-20"),
        ]
    }

    fn run(text: &str, expenses: &[Expense]) -> CoreResult<QueryResult> {
        let request = QueryParser::parse(text).map_err(CoreError::from)?;
        let rows: Vec<&dyn QueryRow> = expenses.iter().map(|e| e as &dyn QueryRow).collect();
        execute(&request, &rows, 100)
    }

    #[test]
    fn test_group_sum_sort() {
        let result = run(
            "from expenses | where date ^= 2024-01 | group by category | sum amount | sort by sum_amount desc",
            &sample(),
        )
        .unwrap();
        assert_eq!(result.columns, vec!["category", "sum_amount"]);
        assert_eq!(result.rows.len(), 3);
        assert_eq!(result.rows[0][0], Cell::Text("Rent".to_string()));
        assert_eq!(result.rows[1][1], Cell::Num(Decimal::from(100)));
    }

    #[test]
    fn test_filter_numeric_and_contains() {
        let result = run("from expenses | where amount >= 50 | where category ~ groc", &sample()).unwrap();
        let ids: Vec<Cell> = result.rows.iter().map(|r| r[0].clone()).collect();
        assert_eq!(ids, vec![Cell::Int(1), Cell::Int(2)]);
    }

    #[test]
    fn test_whole_table_aggregate() {
        let result = run("from expenses | avg amount", &sample()).unwrap();
        assert_eq!(result.rows, vec![vec![Cell::Num(Decimal::from_str("240.62").unwrap())]]);

        let result = run("from expenses | max amount", &sample()).unwrap();
        assert_eq!(result.rows[0][0], Cell::Num(Decimal::from(800)));
    }

    #[test]
    fn test_limit_and_max_rows() {
        let result = run("from expenses | sort by amount | limit 2", &sample()).unwrap();
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0][1], Cell::Num(Decimal::from_str("12.5").unwrap()));
        assert!(!result.truncated);

        let request = QueryParser::parse("from expenses").unwrap();
        let expenses = sample();
        let rows: Vec<&dyn QueryRow> = expenses.iter().map(|e| e as &dyn QueryRow).collect();
        let result = execute(&request, &rows, 3).unwrap();
        assert_eq!(result.rows.len(), 3);
        assert!(result.truncated);
    }

    #[test]
    fn test_non_numeric_value_is_query_error() {
        let err = run("from expenses | where amount > lots", &sample()).unwrap_err();
        assert!(matches!(err, CoreError::QueryError { .. }));
    }

    #[test]
    fn test_render_answer_strings() {
        assert_eq!(render_answer(run("from expenses | where category = Pets", &sample())), NO_RESULTS);

        let answer = render_answer(run("from users", &sample()));
        assert!(answer.starts_with("Query error: unknown table 'users'"));
        assert!(answer.ends_with("please try another query."));

        let answer = render_answer(run("from expenses | where id = 3", &sample()));
        assert!(answer.contains("Rent"));
        assert!(answer.lines().next().unwrap().starts_with("id"));
    }

    #[test]
    fn test_text_table_layout() {
        let result = QueryResult {
            columns: vec!["category".to_string(), "n".to_string()],
            rows: vec![vec![Cell::Text("Rent".to_string()), Cell::Int(12)]],
            truncated: false,
        };
        assert_eq!(result.to_text_table(), "category | n\n---------+---\nRent     | 12");
    }

    #[test]
    fn test_tool_descriptor_mentions_schema() {
        let tool = tool_descriptor(50);
        assert_eq!(tool.name, "query_expenses");
        assert!(tool.description.contains("recurring_group_id"));
        assert!(tool.description.contains("At most 50 rows"));
        assert_eq!(tool.input_schema["required"][0], "query");
    }
}
