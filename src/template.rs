//! Tiny `{N}`-hole format interpreter.
//!
//! The opcode schema's `print_fmt`/`decompile_fmt` strings are data, not Rust
//! source, so we cannot lean on `format!`'s compile-time argument checking.
//! Rather than reach for runtime reflection we precompile each template once
//! into a small sequence of literal/hole parts and replay it against a slice
//! of rendered argument strings.

#[derive(Debug, Clone)]
enum Part {
    Literal(&'static str),
    Hole(usize),
}

/// A template string precompiled into literal runs and `{N}` argument holes.
#[derive(Debug, Clone)]
pub struct Template {
    parts: Vec<Part>,
}

impl Template {
    /// Compiles a template string such as `"set_val({0}, {1})"`.
    ///
    /// Holes are `{` followed by one or more ASCII digits and `}`; anything
    /// else between braces is copied through literally (there are none in
    /// this schema, but it keeps the parser total instead of panicking).
    pub fn compile(src: &'static str) -> Self {
        let mut parts = Vec::new();
        let bytes = src.as_bytes();
        let mut lit_start = 0;
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'{' {
                if let Some(end) = src[i + 1..].find('}') {
                    let digits = &src[i + 1..i + 1 + end];
                    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                        if lit_start < i {
                            parts.push(Part::Literal(&src[lit_start..i]));
                        }
                        let idx: usize = digits.parse().expect("validated ascii digits");
                        parts.push(Part::Hole(idx));
                        i = i + 1 + end + 1;
                        lit_start = i;
                        continue;
                    }
                }
            }
            i += 1;
        }
        if lit_start < src.len() {
            parts.push(Part::Literal(&src[lit_start..]));
        }
        Self { parts }
    }

    /// Renders the template against `args`, indexed by hole number.
    ///
    /// A hole past the end of `args` renders as empty — this happens for
    /// `Call`'s decompile template before its variadic argument holes have
    /// been appended to the schema at parse time, and is otherwise a sign of
    /// a malformed schema row, not something worth panicking the decoder
    /// over.
    pub fn render(&self, args: &[String]) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Literal(s) => out.push_str(s),
                Part::Hole(idx) => {
                    if let Some(s) = args.get(*idx) {
                        out.push_str(s);
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_literal_and_holes() {
        let t = Template::compile("set_val({0}, {1})");
        assert_eq!(
            t.render(&["BUTTON_A".to_string(), "1".to_string()]),
            "set_val(BUTTON_A, 1)"
        );
    }

    #[test]
    fn empty_template_renders_empty() {
        let t = Template::compile("");
        assert_eq!(t.render(&[]), "");
    }

    #[test]
    fn repeated_hole_reuses_arg() {
        let t = Template::compile("{0} = {0}");
        assert_eq!(t.render(&["v0".to_string()]), "v0 = v0");
    }

    #[test]
    fn missing_arg_renders_empty_string() {
        let t = Template::compile("{0}({1})");
        assert_eq!(t.render(&["f".to_string()]), "f()");
    }
}
