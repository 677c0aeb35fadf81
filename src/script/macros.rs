// ABOUTME: Best-effort `${VAR}` / `$VAR` macro substitution.
// ABOUTME: Unknown tokens stay verbatim and substituted values are never rescanned.

use std::collections::HashMap;

/// Replace `${NAME}` and `$NAME` tokens with values from `env`.
///
/// `${...}` names may contain letters, digits, `_` and `.`; bare `$NAME`
/// names letters, digits and `_`. Tokens whose name is not in `env`, and
/// malformed tokens such as a lone `$` or an unterminated `${`, are copied
/// through unchanged.
pub fn substitute(input: &str, env: &HashMap<String, String>) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'$' {
            i += 1;
            continue;
        }

        let Some((name, end)) = token_at(bytes, i) else {
            i += 1;
            continue;
        };

        if let Some(value) = env.get(name_str(input, name)) {
            out.push_str(&input[copied..i]);
            out.push_str(value);
            copied = end;
        }
        i = end;
    }

    out.push_str(&input[copied..]);
    out
}

/// Byte range of the name and the index just past the token starting at `start`.
fn token_at(bytes: &[u8], start: usize) -> Option<((usize, usize), usize)> {
    let after = start + 1;
    match bytes.get(after) {
        Some(b'{') => {
            let name_start = after + 1;
            let len = bytes[name_start..]
                .iter()
                .take_while(|b| is_braced_name_byte(**b))
                .count();
            let close = name_start + len;
            if len > 0 && bytes.get(close) == Some(&b'}') {
                Some(((name_start, close), close + 1))
            } else {
                None
            }
        }
        Some(_) => {
            let len = bytes[after..]
                .iter()
                .take_while(|b| is_bare_name_byte(**b))
                .count();
            (len > 0).then_some(((after, after + len), after + len))
        }
        None => None,
    }
}

fn name_str(input: &str, (from, to): (usize, usize)) -> &str {
    &input[from..to]
}

fn is_bare_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn is_braced_name_byte(b: u8) -> bool {
    is_bare_name_byte(b) || b == b'.'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn braced_and_bare_tokens() {
        let env = env(&[("STAGE", "prod"), ("HOST", "web1")]);
        assert_eq!(
            substitute("deploy ${STAGE} to $HOST now", &env),
            "deploy prod to web1 now"
        );
    }

    #[test]
    fn unknown_tokens_stay_verbatim() {
        let env = env(&[("STAGE", "prod")]);
        assert_eq!(substitute("${MISSING}-$ALSO", &env), "${MISSING}-$ALSO");
    }

    #[test]
    fn malformed_tokens_do_not_truncate() {
        let env = env(&[("A", "x")]);
        assert_eq!(substitute("cost: 5$", &env), "cost: 5$");
        assert_eq!(substitute("${A", &env), "${A");
        assert_eq!(substitute("${}", &env), "${}");
        assert_eq!(substitute("$$A", &env), "$x");
    }

    #[test]
    fn values_are_not_rescanned() {
        let env = env(&[("A", "${B}"), ("B", "boom")]);
        assert_eq!(substitute("${A}", &env), "${B}");
    }

    #[test]
    fn dotted_names_only_in_braces() {
        let env = env(&[("build.number", "7")]);
        assert_eq!(substitute("${build.number}", &env), "7");
        assert_eq!(substitute("$build.number", &env), "$build.number");
    }

    #[test]
    fn multibyte_text_survives() {
        let env = env(&[("WHO", "wörld")]);
        assert_eq!(substitute("héllo ${WHO} ✓", &env), "héllo wörld ✓");
    }
}
