//! Direct-query text parser
//!
//! A query is a list of stages separated by `|`:
//!
//! ```text
//! from expenses | where date ^= 2024-01 | group by category | sum amount | sort by sum_amount desc | limit 5
//! ```

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::error::QueryParseError;
use crate::types::{AggFunc, Aggregate, Filter, QueryRequest, Sort, Table};

/// Grammar summary shown to agents
pub const GRAMMAR: &str = "\
from <expenses|incomes>
| where <field> <op> <value>     (op: = != < <= > >= ^= ~; quote values with spaces)
| group by <field>
| <sum|count|avg|min|max> <field>
| sort by <column> [asc|desc]
| limit <n>";

/// Line-oriented parser for direct-query strings
pub struct QueryParser;

impl QueryParser {
    /// Parse and validate a direct-query string
    pub fn parse(text: &str) -> Result<QueryRequest, QueryParseError> {
        let stages: Vec<String> = split_stages(text)
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let first = stages.first().ok_or(QueryParseError::EmptyQuery)?;
        let mut request = QueryRequest::new(Self::parse_from(first)?);

        for stage in &stages[1..] {
            Self::apply_stage(&mut request, stage)?;
        }

        request.validate()?;
        Ok(request)
    }

    fn parse_from(stage: &str) -> Result<Table, QueryParseError> {
        static FROM: OnceCell<Regex> = OnceCell::new();
        let re = FROM.get_or_init(|| Regex::new(r"(?i)^from\s+(\w+)$").unwrap());

        let caps = re.captures(stage).ok_or_else(|| QueryParseError::MalformedStage {
            stage: stage.to_string(),
            message: "a query must start with 'from <table>'".to_string(),
        })?;
        caps[1].parse()
    }

    fn apply_stage(request: &mut QueryRequest, stage: &str) -> Result<(), QueryParseError> {
        static WHERE: OnceCell<Regex> = OnceCell::new();
        static WHERE_LOOSE: OnceCell<Regex> = OnceCell::new();
        static GROUP: OnceCell<Regex> = OnceCell::new();
        static AGG: OnceCell<Regex> = OnceCell::new();
        static SORT: OnceCell<Regex> = OnceCell::new();
        static LIMIT: OnceCell<Regex> = OnceCell::new();

        let where_re = WHERE.get_or_init(|| {
            Regex::new(r"(?i)^where\s+(\w+)\s*(!=|<=|>=|\^=|==|=|<|>|~)\s*(.+)$").unwrap()
        });
        let where_loose = WHERE_LOOSE.get_or_init(|| Regex::new(r"(?i)^where\s+(\w+)\s+(\S+)").unwrap());
        let group_re = GROUP.get_or_init(|| Regex::new(r"(?i)^group\s+by\s+(\w+)$").unwrap());
        let agg_re = AGG.get_or_init(|| {
            Regex::new(r"(?i)^(sum|count|avg|mean|min|max)(?:\s+(\w+))?$").unwrap()
        });
        let sort_re = SORT.get_or_init(|| {
            Regex::new(r"(?i)^(?:sort|order)\s+by\s+(\w+)(?:\s+(asc|desc))?$").unwrap()
        });
        let limit_re = LIMIT.get_or_init(|| Regex::new(r"(?i)^limit\s+(\d+)$").unwrap());

        let malformed = |message: &str| QueryParseError::MalformedStage {
            stage: stage.to_string(),
            message: message.to_string(),
        };

        if let Some(caps) = where_re.captures(stage) {
            request.filters.push(Filter {
                field: caps[1].to_lowercase(),
                op: caps[2].parse()?,
                value: unquote(caps[3].trim()),
            });
        } else if let Some(caps) = where_loose.captures(stage) {
            return Err(QueryParseError::UnknownOperator { op: caps[2].to_string() });
        } else if let Some(caps) = group_re.captures(stage) {
            if request.group_by.is_some() {
                return Err(malformed("only one 'group by' stage is allowed"));
            }
            request.group_by = Some(caps[1].to_lowercase());
        } else if let Some(caps) = agg_re.captures(stage) {
            if request.aggregate.is_some() {
                return Err(malformed("only one aggregate stage is allowed"));
            }
            let func: AggFunc = caps[1].parse()?;
            let field = match caps.get(2) {
                Some(m) => m.as_str().to_lowercase(),
                None if func == AggFunc::Count => "id".to_string(),
                None => "amount".to_string(),
            };
            request.aggregate = Some(Aggregate { func, field });
        } else if let Some(caps) = sort_re.captures(stage) {
            if request.sort.is_some() {
                return Err(malformed("only one 'sort by' stage is allowed"));
            }
            let descending = caps
                .get(2)
                .map(|m| m.as_str().eq_ignore_ascii_case("desc"))
                .unwrap_or(false);
            request.sort = Some(Sort { key: caps[1].to_lowercase(), descending });
        } else if let Some(caps) = limit_re.captures(stage) {
            let limit = caps[1]
                .parse::<usize>()
                .map_err(|_| malformed("limit is too large"))?;
            request.limit = Some(limit);
        } else if stage.to_lowercase().starts_with("from ") {
            return Err(malformed("'from' may only appear as the first stage"));
        } else {
            return Err(malformed("expected where, group by, an aggregate, sort by or limit"));
        }

        Ok(())
    }
}

/// Split on `|` outside of quoted values
fn split_stages(text: &str) -> Vec<String> {
    let mut stages = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in text.chars() {
        match (c, quote) {
            ('"' | '\'', None) => {
                quote = Some(c);
                current.push(c);
            }
            (c, Some(q)) if c == q => {
                quote = None;
                current.push(c);
            }
            ('|', None) => stages.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    stages.push(current);
    stages
}

fn unquote(value: &str) -> String {
    let quoted = value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')));
    if quoted {
        value[1..value.len() - 1].to_string()
    } else {
        value.to_string()
    }
}

impl std::str::FromStr for QueryRequest {
    type Err = QueryParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QueryParser::parse(s)
    }
}
