//! Query-filter parsing, ported from the original `processOneFilter` /
//! `processFilters` textual scan in `server_core.go`: filters are `AND`-
//! joined clauses appended to a path after `?`, each naming one of six
//! well-known filter keywords and an operator.

use serde::Serialize;

/// The six filter keywords defined by spec.md §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterName {
    Spec,
    Path,
    Data,
    Interval,
    Range,
    Change,
}

impl FilterName {
    const ALL: [(&'static str, FilterName); 6] = [
        ("$spec", FilterName::Spec),
        ("$path", FilterName::Path),
        ("$data", FilterName::Data),
        ("$interval", FilterName::Interval),
        ("$range", FilterName::Range),
        ("$change", FilterName::Change),
    ];

    /// Filters consumed by the dispatcher itself rather than forwarded to
    /// the subscription layer (spec.md §4.H step 2).
    fn is_consumed(self) -> bool {
        matches!(self, FilterName::Spec | FilterName::Path | FilterName::Data)
    }
}

/// Comparison operator attached to a filter clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FilterOp {
    Eq,
    Gt,
    Lt,
}

impl FilterOp {
    const ALL: [(&'static str, FilterOp); 3] = [
        ("EQ", FilterOp::Eq),
        ("GT", FilterOp::Gt),
        ("LT", FilterOp::Lt),
    ];
}

/// One parsed filter clause.
#[derive(Debug, Clone, Serialize)]
pub struct FilterDescriptor {
    pub name: FilterName,
    pub operator: FilterOp,
    pub value: String,
}

/// Split `path` into its bare path and the list of filter clauses in its
/// query component. Clauses for `$spec`/`$path`/`$data` are stripped out
/// of the returned path and appended to `outFilters`; clauses for
/// `$interval`/`$range`/`$change` are only re-joined with `AND` behind a
/// single `?` on the returned path, never appended to `outFilters` — a
/// second pass over that re-joined path would otherwise re-discover and
/// re-append them (spec.md §4.B, §8 idempotence). A path with no query,
/// or one where every clause is consumed, comes back with no trailing
/// `?`.
pub fn process_filters(path: &str) -> (String, Vec<FilterDescriptor>) {
    let Some(qpos) = path.find('?') else {
        return (path.to_string(), Vec::new());
    };
    let (bare, query) = path.split_at(qpos);
    let query = &query[1..]; // drop leading '?'

    let mut descriptors = Vec::new();
    let mut passthrough = Vec::new();

    for clause in query.split("AND") {
        let clause = clause.trim();
        if clause.is_empty() {
            continue;
        }
        match process_one_filter(clause) {
            Some(descriptor) if descriptor.name.is_consumed() => descriptors.push(descriptor),
            Some(_) => passthrough.push(clause.to_string()),
            None => passthrough.push(clause.to_string()),
        }
    }

    let rebuilt = if passthrough.is_empty() {
        bare.to_string()
    } else {
        format!("{bare}?{}", passthrough.join("AND"))
    };

    (rebuilt, descriptors)
}

fn process_one_filter(clause: &str) -> Option<FilterDescriptor> {
    let (_, name) = FilterName::ALL.iter().find(|(tag, _)| clause.contains(tag))?;
    let (op_str, operator) = FilterOp::ALL
        .iter()
        .find(|(tag, _)| clause.contains(tag))
        .copied()?;

    let name_tag = FilterName::ALL.iter().find(|(_, n)| n == name)?.0;
    let value = clause
        .splitn(2, name_tag)
        .nth(1)?
        .splitn(2, op_str)
        .nth(1)?
        .trim()
        .to_string();

    Some(FilterDescriptor {
        name: *name,
        operator,
        value,
    })
}
