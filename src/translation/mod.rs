use std::borrow::Cow;

mod scanner;

use scanner::{Scanner, Token};

/// Native positional-parameter syntax of a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// PostgreSQL-style placeholders like `$1`.
    Postgres,
    /// SQLite-style placeholders like `?1`.
    Sqlite,
    /// DB-API `format` style `%s` (MySQL connectors). Literal `%` is doubled.
    Format,
}

/// Translate caller-side `?` placeholders into `target` syntax.
///
/// Bare `?` markers are numbered left to right starting at 1; an explicitly numbered
/// `?N` keeps its number. Quoted strings, identifiers, comments and dollar-quoted
/// blocks are copied untouched. The scanner is a lightweight state machine, so SQL
/// that leans on dialect-specific lexing (e.g. PL/pgSQL bodies) is best written in the
/// driver's native syntax with translation switched off.
///
/// ```rust
/// use sql_scope::{PlaceholderStyle, translate_placeholders};
///
/// let sql = "select * from user where id=? and name=?";
/// assert_eq!(
///     translate_placeholders(sql, PlaceholderStyle::Postgres, true),
///     "select * from user where id=$1 and name=$2"
/// );
/// ```
///
/// Returns a borrowed `Cow` when no changes are needed.
#[must_use]
pub fn translate_placeholders(sql: &str, target: PlaceholderStyle, enabled: bool) -> Cow<'_, str> {
    if !enabled {
        return Cow::Borrowed(sql);
    }

    let escape_percent = target == PlaceholderStyle::Format;
    let mut out: Option<String> = None;
    let mut next_ordinal: usize = 1;

    for token in Scanner::new(sql, escape_percent) {
        let span = token.span();
        let replacement = match token {
            Token::Text(_) => None,
            Token::Percent(_) => Some(Cow::Borrowed("%%")),
            Token::Marker { number, .. } => marker_for(target, number, &mut next_ordinal),
        };
        match replacement {
            Some(text) => out
                .get_or_insert_with(|| sql[..span.start].to_string())
                .push_str(&text),
            None => {
                if let Some(buf) = out.as_mut() {
                    buf.push_str(&sql[span]);
                }
            }
        }
    }

    out.map_or(Cow::Borrowed(sql), Cow::Owned)
}

/// Native spelling of one marker, or `None` when the original text already is one.
fn marker_for(
    target: PlaceholderStyle,
    number: Option<&str>,
    next_ordinal: &mut usize,
) -> Option<Cow<'static, str>> {
    let mut take = || {
        let current = *next_ordinal;
        *next_ordinal += 1;
        current
    };
    match (target, number) {
        (PlaceholderStyle::Sqlite, Some(_)) => None,
        (PlaceholderStyle::Sqlite, None) => Some(format!("?{}", take()).into()),
        (PlaceholderStyle::Postgres, Some(digits)) => Some(format!("${digits}").into()),
        (PlaceholderStyle::Postgres, None) => Some(format!("${}", take()).into()),
        (PlaceholderStyle::Format, _) => Some(Cow::Borrowed("%s")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_bare_markers_for_sqlite() {
        let sql = "select * from t where a = ? and b = ?";
        let res = translate_placeholders(sql, PlaceholderStyle::Sqlite, true);
        assert_eq!(res, "select * from t where a = ?1 and b = ?2");
    }

    #[test]
    fn keeps_explicit_numbers() {
        let sql = "select * from t where a = ?2 and b = ?1";
        let sqlite = translate_placeholders(sql, PlaceholderStyle::Sqlite, true);
        assert!(matches!(sqlite, Cow::Borrowed(_)));
        let pg = translate_placeholders(sql, PlaceholderStyle::Postgres, true);
        assert_eq!(pg, "select * from t where a = $2 and b = $1");
    }

    #[test]
    fn format_style_escapes_percent() {
        let sql = "update user set name=? where email like '%@test.org' and id=?";
        let res = translate_placeholders(sql, PlaceholderStyle::Format, true);
        assert_eq!(
            res,
            "update user set name=%s where email like '%%@test.org' and id=%s"
        );
    }

    #[test]
    fn skips_inside_literals_and_comments() {
        let sql = "select '?', \"col?\", ? -- ?\n/* ? /* ? */ ? */ from t where a = ?";
        let res = translate_placeholders(sql, PlaceholderStyle::Postgres, true);
        assert_eq!(
            res,
            "select '?', \"col?\", $1 -- ?\n/* ? /* ? */ ? */ from t where a = $2"
        );
    }

    #[test]
    fn escaped_quotes_stay_inside_literal() {
        let sql = "select 'it''s ?' , ?";
        let res = translate_placeholders(sql, PlaceholderStyle::Sqlite, true);
        assert_eq!(res, "select 'it''s ?' , ?1");
    }

    #[test]
    fn block_comment_needs_a_real_close() {
        let sql = "/*/ ? */ select ?";
        let res = translate_placeholders(sql, PlaceholderStyle::Sqlite, true);
        assert_eq!(res, "/*/ ? */ select ?1");
    }

    #[test]
    fn skips_dollar_quoted_blocks() {
        let sql = "$foo$ select ? from t $foo$ where a = ?";
        let res = translate_placeholders(sql, PlaceholderStyle::Postgres, true);
        assert_eq!(res, "$foo$ select ? from t $foo$ where a = $1");
    }

    #[test]
    fn preserves_multibyte_text() {
        let sql = "insert into t (name) values ('Zoë'), (?)";
        let res = translate_placeholders(sql, PlaceholderStyle::Sqlite, true);
        assert_eq!(res, "insert into t (name) values ('Zoë'), (?1)");
    }

    #[test]
    fn respects_disabled_flag() {
        let sql = "select * from t where a = ?";
        let res = translate_placeholders(sql, PlaceholderStyle::Postgres, false);
        assert!(matches!(res, Cow::Borrowed(_)));
        assert_eq!(res, sql);
    }
}
