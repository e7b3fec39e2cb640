//! Path queries over report JSON
//!
//! Supports the jq path subset the check modules need:
//!
//! ```text
//! .                                identity
//! .services.iam                    object fields
//! .findings["iam-user-no-key"]     quoted fields (also ."quoted")
//! .AccessKeys[0]  .items[-1]       array indices, negative from the end
//! .items[]                         iterate array elements / object values
//! ```
//!
//! Like jq, indexing `null` yields `null`, a missing field yields `null`, and
//! indexing a value of the wrong kind is an evaluation error that ends the
//! output stream.

use std::fmt;

use serde_json::Value;

use super::{ReportError, value_kind};

static NULL: Value = Value::Null;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Field(String),
    Index(i64),
    Iterate,
}

/// A compiled path query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    source: String,
    steps: Vec<Step>,
}

impl Query {
    pub fn parse(source: &str) -> Result<Self, ReportError> {
        let steps = Parser::new(source).parse().map_err(|reason| ReportError::QueryParse {
            query: source.to_string(),
            reason,
        })?;

        Ok(Self {
            source: source.to_string(),
            steps,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate the query, yielding each output value in order
    ///
    /// An evaluation error is yielded as the final item of the stream.
    pub fn run<'a>(&self, root: &'a Value) -> QueryStream<'a> {
        let mut values = Vec::new();
        let error = eval(&self.steps, root, &mut values)
            .err()
            .map(|reason| ReportError::QueryEvaluation {
                query: self.source.clone(),
                reason,
            });

        QueryStream {
            values: values.into_iter(),
            error,
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Output of [`Query::run`]
pub struct QueryStream<'a> {
    values: std::vec::IntoIter<&'a Value>,
    error: Option<ReportError>,
}

impl<'a> Iterator for QueryStream<'a> {
    type Item = Result<&'a Value, ReportError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.values.next() {
            Some(value) => Some(Ok(value)),
            None => self.error.take().map(Err),
        }
    }
}

fn eval<'a>(steps: &[Step], value: &'a Value, out: &mut Vec<&'a Value>) -> Result<(), String> {
    let Some((step, rest)) = steps.split_first() else {
        out.push(value);
        return Ok(());
    };

    match step {
        Step::Field(name) => match value {
            Value::Object(map) => eval(rest, map.get(name).unwrap_or(&NULL), out),
            Value::Null => eval(rest, &NULL, out),
            other => Err(format!("cannot index {} with \"{}\"", value_kind(other), name)),
        },
        Step::Index(index) => match value {
            Value::Array(items) => {
                let resolved = if *index < 0 {
                    items.len().checked_sub(index.unsigned_abs() as usize)
                } else {
                    Some(*index as usize)
                };
                let item = resolved.and_then(|i| items.get(i)).unwrap_or(&NULL);
                eval(rest, item, out)
            }
            Value::Null => eval(rest, &NULL, out),
            other => Err(format!("cannot index {} with number", value_kind(other))),
        },
        Step::Iterate => match value {
            Value::Array(items) => items.iter().try_for_each(|item| eval(rest, item, out)),
            Value::Object(map) => map.values().try_for_each(|item| eval(rest, item, out)),
            other => Err(format!("cannot iterate over {}", value_kind(other))),
        },
    }
}

struct Parser<'s> {
    chars: std::iter::Peekable<std::str::CharIndices<'s>>,
}

impl<'s> Parser<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            chars: source.char_indices().peekable(),
        }
    }

    fn parse(mut self) -> Result<Vec<Step>, String> {
        match self.chars.next() {
            Some((_, '.')) => {}
            Some((pos, c)) => return Err(format!("expected '.' at {pos}, found '{c}'")),
            None => return Err("empty query".to_string()),
        }

        let mut steps = Vec::new();

        // Right after the leading dot: identity, a field, or a bracket
        match self.chars.peek().copied() {
            None => return Ok(steps),
            Some((_, '[')) => {}
            Some(_) => steps.push(self.field_after_dot()?),
        }

        while let Some((pos, c)) = self.chars.next() {
            match c {
                '.' => steps.push(self.field_after_dot()?),
                '[' => steps.push(self.bracket()?),
                _ => return Err(format!("unexpected character '{c}' at {pos}")),
            }
        }

        Ok(steps)
    }

    fn field_after_dot(&mut self) -> Result<Step, String> {
        match self.chars.peek().copied() {
            Some((_, '"')) => {
                self.chars.next();
                Ok(Step::Field(self.string()?))
            }
            Some((_, '[')) => {
                self.chars.next();
                self.bracket()
            }
            Some((_, c)) if c.is_ascii_alphabetic() || c == '_' => Ok(Step::Field(self.ident())),
            Some((pos, c)) => Err(format!("unexpected character '{c}' at {pos} after '.'")),
            None => Err("unexpected end of query after '.'".to_string()),
        }
    }

    fn ident(&mut self) -> String {
        let mut ident = String::new();
        while let Some((_, c)) = self.chars.peek().copied() {
            if c.is_ascii_alphanumeric() || c == '_' {
                ident.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        ident
    }

    fn bracket(&mut self) -> Result<Step, String> {
        let step = match self.chars.peek().copied() {
            Some((_, ']')) => Step::Iterate,
            Some((_, '"')) => {
                self.chars.next();
                Step::Field(self.string()?)
            }
            Some((_, c)) if c.is_ascii_digit() || c == '-' => Step::Index(self.integer()?),
            Some((pos, c)) => {
                return Err(format!("unexpected character '{c}' at {pos} in brackets"));
            }
            None => return Err("unterminated '['".to_string()),
        };

        match self.chars.next() {
            Some((_, ']')) => Ok(step),
            Some((pos, c)) => Err(format!("expected ']' at {pos}, found '{c}'")),
            None => Err("unterminated '['".to_string()),
        }
    }

    fn integer(&mut self) -> Result<i64, String> {
        let mut digits = String::new();
        if let Some((_, '-')) = self.chars.peek().copied() {
            digits.push('-');
            self.chars.next();
        }
        while let Some((_, c)) = self.chars.peek().copied() {
            if !c.is_ascii_digit() {
                break;
            }
            digits.push(c);
            self.chars.next();
        }
        digits
            .parse()
            .map_err(|_| format!("invalid array index '{digits}'"))
    }

    fn string(&mut self) -> Result<String, String> {
        let mut out = String::new();
        loop {
            match self.chars.next() {
                Some((_, '"')) => return Ok(out),
                Some((_, '\\')) => match self.chars.next() {
                    Some((_, '"')) => out.push('"'),
                    Some((_, '\\')) => out.push('\\'),
                    Some((_, '/')) => out.push('/'),
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((pos, c)) => return Err(format!("unsupported escape '\\{c}' at {pos}")),
                    None => return Err("unterminated string".to_string()),
                },
                Some((_, c)) => out.push(c),
                None => return Err("unterminated string".to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values(query: &str, doc: &Value) -> Vec<Value> {
        Query::parse(query)
            .unwrap()
            .run(doc)
            .map(|v| v.unwrap().clone())
            .collect()
    }

    #[test]
    fn test_identity() {
        let doc = json!({"a": 1});
        assert_eq!(values(".", &doc), vec![doc.clone()]);
    }

    #[test]
    fn test_fields_and_quoted_fields() {
        let doc = json!({
            "services": {"iam": {"findings": {"iam-user-no-Active-key-rotation": {"items": ["x"]}}}}
        });
        assert_eq!(
            values(".services.iam.findings[\"iam-user-no-Active-key-rotation\"].items", &doc),
            vec![json!(["x"])]
        );
        assert_eq!(
            values(".services.iam.findings.\"iam-user-no-Active-key-rotation\".items[0]", &doc),
            vec![json!("x")]
        );
    }

    #[test]
    fn test_indices() {
        let doc = json!({"keys": [{"id": "a"}, {"id": "b"}]});
        assert_eq!(values(".keys[1].id", &doc), vec![json!("b")]);
        assert_eq!(values(".keys[-1].id", &doc), vec![json!("b")]);
        assert_eq!(values(".keys[5].id", &doc), vec![Value::Null]);
        assert_eq!(values(".[0]", &json!([7])), vec![json!(7)]);
    }

    #[test]
    fn test_iterate() {
        let doc = json!({"items": ["a", "b"], "map": {"x": 1, "y": 2}});
        assert_eq!(values(".items[]", &doc), vec![json!("a"), json!("b")]);
        assert_eq!(values(".map[]", &doc).len(), 2);
    }

    #[test]
    fn test_missing_fields_yield_null() {
        let doc = json!({"a": {}});
        assert_eq!(values(".a.b.c", &doc), vec![Value::Null]);
    }

    #[test]
    fn test_wrong_kind_is_evaluation_error() {
        let doc = json!({"a": "text", "list": [1, {"b": 2}]});
        let query = Query::parse(".a.b").unwrap();
        let results: Vec<_> = query.run(&doc).collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(ReportError::QueryEvaluation { .. })));

        // Values produced before the failure are still streamed
        let results: Vec<_> = Query::parse(".list[].b").unwrap().run(&doc).collect();
        assert!(matches!(results.last(), Some(Err(ReportError::QueryEvaluation { .. }))));
    }

    #[test]
    fn test_parse_errors() {
        let inputs = [
            "", "services", ".a..b", ".a[", ".a[\"x\"", ".a.", ".a b", ".9lives", "..", ".a[x]",
        ];
        for bad in inputs {
            assert!(
                matches!(Query::parse(bad), Err(ReportError::QueryParse { .. })),
                "expected parse failure for {bad:?}"
            );
        }
    }

    #[test]
    fn test_display_is_source() {
        let query = Query::parse(".services.iam").unwrap();
        assert_eq!(query.to_string(), ".services.iam");
    }
}
