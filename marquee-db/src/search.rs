//! Free-text search over an entity's search columns.
//!
//! The `q` of a find filter is split into terms. Every term must match
//! some search column; `a or b` accepts either; `"quoted phrases"` are
//! matched whole; a leading `-` requires that no column matches.

use rusqlite::types::Value;

use crate::clause::ClauseSet;

/// Parsed search text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchTerms {
    /// Each group must match; any term within a group will do.
    pub must: Vec<Vec<String>>,
    /// None of these may match.
    pub not: Vec<String>,
}

impl SearchTerms {
    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.not.is_empty()
    }
}

#[derive(Debug)]
struct Token {
    text: String,
    quoted: bool,
    negated: bool,
}

fn tokens(q: &str) -> Vec<Token> {
    let mut out = Vec::new();
    let mut chars = q.chars().peekable();
    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let Some(&first) = chars.peek() else {
            break;
        };

        let negated = first == '-';
        if negated {
            chars.next();
        }
        let quoted = chars.next_if_eq(&'"').is_some();

        let mut text = String::new();
        if quoted {
            for c in chars.by_ref() {
                if c == '"' {
                    break;
                }
                text.push(c);
            }
        } else {
            while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                text.push(c);
            }
        }

        let text = text.trim().to_string();
        if !text.is_empty() {
            out.push(Token {
                text,
                quoted,
                negated,
            });
        }
    }
    out
}

/// Split `q` into required groups and negated terms.
pub fn parse(q: &str) -> SearchTerms {
    let mut terms = SearchTerms::default();
    let mut join_next = false;
    let toks = tokens(q);
    for (i, tok) in toks.iter().enumerate() {
        if tok.negated {
            terms.not.push(tok.text.clone());
            join_next = false;
            continue;
        }

        let is_or = !tok.quoted && tok.text.eq_ignore_ascii_case("or");
        let has_left = !terms.must.is_empty() && !join_next;
        let has_right = toks.get(i + 1).is_some_and(|t| !t.negated);
        if is_or && has_left && has_right {
            join_next = true;
            continue;
        }

        match terms.must.last_mut() {
            Some(group) if join_next => group.push(tok.text.clone()),
            _ => terms.must.push(vec![tok.text.clone()]),
        }
        join_next = false;
    }
    terms
}

/// Add the clauses for `q` over `columns`. Joins the columns need are the
/// caller's business.
pub fn apply(f: &mut ClauseSet, q: &str, columns: &[String]) {
    if columns.is_empty() {
        return;
    }
    let terms = parse(q);

    for group in &terms.must {
        let mut parts = Vec::new();
        let mut args = Vec::new();
        for term in group {
            for column in columns {
                parts.push(format!("{column} LIKE ?"));
                args.push(Value::Text(format!("%{term}%")));
            }
        }
        f.add_where(format!("({})", parts.join(" OR ")), args);
    }

    for term in &terms.not {
        let parts: Vec<String> = columns
            .iter()
            .map(|c| format!("COALESCE({c}, '') NOT LIKE ?"))
            .collect();
        let args = columns
            .iter()
            .map(|_| Value::Text(format!("%{term}%")))
            .collect();
        f.add_where(format!("({})", parts.join(" AND ")), args);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn words_phrases_and_negation() {
        let terms = parse(r#"sunset "long beach" -rain"#);
        assert_eq!(terms.must, vec![group(&["sunset"]), group(&["long beach"])]);
        assert_eq!(terms.not, group(&["rain"]));
    }

    #[test]
    fn or_joins_neighbours() {
        let terms = parse("red or blue car");
        assert_eq!(terms.must, vec![group(&["red", "blue"]), group(&["car"])]);

        let chained = parse("a or b or c");
        assert_eq!(chained.must, vec![group(&["a", "b", "c"])]);
    }

    #[test]
    fn dangling_or_is_a_word() {
        assert_eq!(parse("or").must, vec![group(&["or"])]);
        assert_eq!(parse("red or").must, vec![group(&["red"]), group(&["or"])]);
        assert_eq!(parse(r#""or" nothing"#).must.len(), 2);
    }

    #[test]
    fn blank_input() {
        assert!(parse("   ").is_empty());
        assert!(parse(r#"- """#).is_empty());
    }

    #[test]
    fn clauses_cover_every_column() {
        let mut f = ClauseSet::new();
        let columns = vec!["scenes.title".to_string(), "scenes.details".to_string()];
        apply(&mut f, "beach -rain", &columns);
        let (sql, args) = f.where_sql();
        assert_eq!(
            sql,
            "(((scenes.title LIKE ? OR scenes.details LIKE ?)) AND \
             ((COALESCE(scenes.title, '') NOT LIKE ? AND COALESCE(scenes.details, '') NOT LIKE ?)))"
        );
        assert_eq!(args.len(), 4);
        assert_eq!(args[0], Value::Text("%beach%".into()));
        assert_eq!(args[3], Value::Text("%rain%".into()));
    }
}
