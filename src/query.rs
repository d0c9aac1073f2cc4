//! Collection list queries.
//!
//! `GET /{resource}` understands:
//!
//! | Parameter              | Effect                                               |
//! |------------------------|------------------------------------------------------|
//! | `field=v`              | keep items whose `field` renders as `v` (repeat = OR)|
//! | `field_ne=v`           | drop items whose `field` renders as `v`              |
//! | `field_gte=v` / `_lte` | range, numeric when both sides are numbers           |
//! | `field_like=v`         | case-insensitive substring                           |
//! | `q=text`               | any scalar anywhere in the item contains `text`      |
//! | `_sort=a,b&_order=asc,desc` | stable multi-key sort                           |
//! | `_start`, `_end`, `_limit`  | slice                                           |
//! | `_page`, `_limit`           | page (limit defaults to 10)                     |
//!
//! Fields may be dotted paths (`author.name`). `callback` and any other
//! `_`-prefixed key are not filters.

use std::cmp::Ordering;

use serde_json::Value;

const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Op {
    Eq,
    Ne,
    Gte,
    Lte,
    Like,
}

#[derive(Debug)]
struct Filter {
    path: String,
    op: Op,
    value: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Order {
    Asc,
    Desc,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Slice {
    Range { start: usize, end: Option<usize> },
    Page { page: usize, limit: usize },
}

/// A parsed list query.
#[derive(Debug, Default)]
pub struct ListQuery {
    filters: Vec<Filter>,
    search: Option<String>,
    sort: Vec<(String, Order)>,
    slice: Option<Slice>,
}

/// The result of [`ListQuery::apply`].
#[derive(Debug)]
pub struct Listing {
    pub items: Vec<Value>,
    /// Number of matches before slicing; set only when a slice was requested.
    pub total: Option<usize>,
}

impl ListQuery {
    pub fn parse(pairs: &[(String, String)]) -> Self {
        let mut query = Self::default();
        let (mut sort, mut order) = (Vec::new(), Vec::new());
        let mut start: Option<usize> = None;
        let mut end: Option<usize> = None;
        let mut limit: Option<usize> = None;
        let mut page: Option<usize> = None;

        for (key, value) in pairs {
            match key.as_str() {
                "callback" => {}
                "q" => query.search = Some(value.to_lowercase()),
                "_sort" => sort.extend(value.split(',').map(str::to_owned)),
                "_order" => order.extend(value.split(',').map(|o| {
                    if o.eq_ignore_ascii_case("desc") { Order::Desc } else { Order::Asc }
                })),
                "_start" => start = value.parse().ok(),
                "_end" => end = value.parse().ok(),
                "_limit" => limit = value.parse().ok(),
                "_page" => page = value.parse().ok(),
                k if k.starts_with('_') => {}
                k => query.filters.push(Filter::parse(k, value)),
            }
        }

        query.sort = sort.into_iter()
            .enumerate()
            .map(|(i, field)| (field, order.get(i).copied().unwrap_or(Order::Asc)))
            .collect();

        query.slice = match (page, start, end, limit) {
            (Some(page), ..) => Some(Slice::Page {
                page: page.max(1),
                limit: limit.unwrap_or(DEFAULT_PAGE_SIZE),
            }),
            (None, None, None, None) => None,
            (None, start, end, limit) => {
                let start = start.unwrap_or(0);
                Some(Slice::Range { start, end: end.or(limit.map(|l| start.saturating_add(l))) })
            }
        };

        query
    }

    pub fn apply(&self, items: Vec<Value>) -> Listing {
        let mut items: Vec<Value> = items.into_iter()
            .filter(|item| self.matches(item))
            .collect();

        if !self.sort.is_empty() {
            items.sort_by(|a, b| {
                self.sort.iter()
                    .map(|(field, order)| {
                        let ord = compare(lookup(a, field), lookup(b, field));
                        if *order == Order::Desc { ord.reverse() } else { ord }
                    })
                    .find(|ord| ord.is_ne())
                    .unwrap_or(Ordering::Equal)
            });
        }

        let Some(slice) = self.slice else {
            return Listing { items, total: None };
        };

        let total = items.len();
        let (start, end) = match slice {
            Slice::Range { start, end } => (start, end.unwrap_or(total)),
            Slice::Page { page, limit } => {
                ((page - 1).saturating_mul(limit), page.saturating_mul(limit))
            }
        };
        let start = start.min(total);
        let end = end.clamp(start, total);
        let items = items.drain(start..end).collect();
        Listing { items, total: Some(total) }
    }

    fn matches(&self, item: &Value) -> bool {
        let search_ok = self.search.as_deref().is_none_or(|q| contains_text(item, q));

        // Equality filters on the same field are OR'ed; everything else is AND'ed.
        let eq_ok = self.filters.iter()
            .filter(|f| f.op == Op::Eq)
            .all(|f| {
                self.filters.iter()
                    .filter(|g| g.op == Op::Eq && g.path == f.path)
                    .any(|g| g.test(item))
            });
        let rest_ok = self.filters.iter()
            .filter(|f| f.op != Op::Eq)
            .all(|f| f.test(item));

        search_ok && eq_ok && rest_ok
    }
}

impl Filter {
    fn parse(key: &str, value: &str) -> Self {
        let suffixes = [("_ne", Op::Ne), ("_gte", Op::Gte), ("_lte", Op::Lte), ("_like", Op::Like)];
        let (path, op) = suffixes.iter()
            .find_map(|(suffix, op)| key.strip_suffix(suffix).map(|path| (path, *op)))
            .unwrap_or((key, Op::Eq));
        Self { path: path.to_owned(), op, value: value.to_owned() }
    }

    fn test(&self, item: &Value) -> bool {
        let Some(field) = lookup(item, &self.path) else {
            return self.op == Op::Ne;
        };
        let rendered = render(field);
        match self.op {
            Op::Eq => rendered == self.value,
            Op::Ne => rendered != self.value,
            Op::Gte => compare_text(&rendered, &self.value).is_ge(),
            Op::Lte => compare_text(&rendered, &self.value).is_le(),
            Op::Like => rendered.to_lowercase().contains(&self.value.to_lowercase()),
        }
    }
}

/// Follows a dotted path through objects and array indices.
fn lookup<'a>(item: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(item, |value, segment| match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn contains_text(value: &Value, needle: &str) -> bool {
    match value {
        Value::Object(map) => map.values().any(|v| contains_text(v, needle)),
        Value::Array(items) => items.iter().any(|v| contains_text(v, needle)),
        scalar => render(scalar).to_lowercase().contains(needle),
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.cmp(b),
    }
}

/// Missing fields sort first.
fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(x), Some(y)) => render(x).cmp(&render(y)),
    }
}
