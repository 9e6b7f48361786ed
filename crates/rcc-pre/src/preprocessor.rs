//! The directive evaluator.
//!
//! Works a line at a time: directive lines are interpreted and consumed,
//! ordinary lines get macro substitution and are appended to the output.

use std::path::{Path, PathBuf};

use rcc_util::{Handler, Span};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::PreprocessError;
use crate::headers::system_header;

/// Maximum `#include` nesting.
pub const MAX_INCLUDE_DEPTH: usize = 10;

/// Preprocessor state for one translation unit.
///
/// Macro bindings and the set of already-included files persist across
/// nested includes, which is what makes re-inclusion idempotent.
pub struct Preprocessor<'a> {
    include_paths: Vec<PathBuf>,
    macros: FxHashMap<String, String>,
    included: FxHashSet<PathBuf>,
    included_system: FxHashSet<String>,
    handler: &'a Handler,
}

/// One open `#if[n]def` region.
struct Cond {
    /// Whether the enclosing region was active when this one opened.
    parent_active: bool,
    /// Whether the `#if[n]def` branch itself was taken.
    entered: bool,
    /// Whether lines are currently included at this depth.
    taken_now: bool,
}

impl<'a> Preprocessor<'a> {
    pub fn new(include_paths: Vec<PathBuf>, handler: &'a Handler) -> Self {
        Self {
            include_paths,
            macros: FxHashMap::default(),
            included: FxHashSet::default(),
            included_system: FxHashSet::default(),
            handler,
        }
    }

    /// Preprocess a file into a single flat buffer.
    pub fn preprocess_file(&mut self, path: &Path) -> Result<String, PreprocessError> {
        let mut out = String::new();
        self.expand_file(path, 0, &mut out)?;
        Ok(out)
    }

    /// Preprocess in-memory source; `dir` anchors relative includes.
    pub fn preprocess_source(
        &mut self,
        source: &str,
        dir: &Path,
    ) -> Result<String, PreprocessError> {
        let mut out = String::new();
        self.expand_source(source, dir, Path::new("<source>"), 0, &mut out)?;
        Ok(out)
    }

    fn expand_file(
        &mut self,
        path: &Path,
        depth: usize,
        out: &mut String,
    ) -> Result<(), PreprocessError> {
        if depth > MAX_INCLUDE_DEPTH {
            return Err(PreprocessError::IncludeDepth {
                path: path.to_path_buf(),
            });
        }
        let source = std::fs::read_to_string(path).map_err(|e| PreprocessError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        self.expand_source(&source, &dir, path, depth, out)
    }

    fn expand_source(
        &mut self,
        source: &str,
        dir: &Path,
        path: &Path,
        depth: usize,
        out: &mut String,
    ) -> Result<(), PreprocessError> {
        let mut conds: Vec<Cond> = Vec::new();

        for line in source.lines() {
            let trimmed = line.trim_start();
            let Some(directive) = trimmed.strip_prefix('#') else {
                if conds.iter().all(|c| c.taken_now) {
                    out.push_str(&self.substitute(line));
                    out.push('\n');
                }
                continue;
            };

            let directive = directive.trim_start();
            let (name, rest) = split_word(directive);
            let active = conds.iter().all(|c| c.taken_now);

            match name {
                "include" => {
                    if active {
                        self.handle_include(rest, dir, depth, out, line)?;
                    }
                }
                "define" => {
                    if active {
                        let (macro_name, value) = split_word(rest);
                        if !macro_name.is_empty() {
                            self.macros
                                .insert(macro_name.to_string(), value.trim().to_string());
                        }
                    }
                }
                "ifdef" | "ifndef" => {
                    let (macro_name, _) = split_word(rest);
                    let defined = self.macros.contains_key(macro_name);
                    let cond_holds = if name == "ifdef" { defined } else { !defined };
                    conds.push(Cond {
                        parent_active: active,
                        entered: active && cond_holds,
                        taken_now: active && cond_holds,
                    });
                }
                "else" => {
                    let Some(top) = conds.last_mut() else {
                        return Err(PreprocessError::UnbalancedConditional {
                            path: path.to_path_buf(),
                        });
                    };
                    top.taken_now = top.parent_active && !top.entered;
                }
                "endif" => {
                    if conds.pop().is_none() {
                        return Err(PreprocessError::UnbalancedConditional {
                            path: path.to_path_buf(),
                        });
                    }
                }
                // Recognized but deliberately inert.
                "undef" | "pragma" | "error" | "warning" | "line" => {}
                // Anything else is dropped like the inert set.
                _ => {}
            }
        }

        if !conds.is_empty() {
            return Err(PreprocessError::UnbalancedConditional {
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }

    fn handle_include(
        &mut self,
        arg: &str,
        dir: &Path,
        depth: usize,
        out: &mut String,
        line: &str,
    ) -> Result<(), PreprocessError> {
        let arg = arg.trim();
        if let Some(rest) = arg.strip_prefix('"') {
            let Some(name) = rest.split('"').next().filter(|_| rest.contains('"')) else {
                return Err(PreprocessError::InvalidInclude {
                    line: line.trim().to_string(),
                });
            };
            self.include_user(name, dir, depth, out)
        } else if let Some(rest) = arg.strip_prefix('<') {
            let Some(name) = rest.split('>').next().filter(|_| rest.contains('>')) else {
                return Err(PreprocessError::InvalidInclude {
                    line: line.trim().to_string(),
                });
            };
            self.include_system(name, out);
            Ok(())
        } else {
            Err(PreprocessError::InvalidInclude {
                line: line.trim().to_string(),
            })
        }
    }

    /// `#include "name"`: search the literal path, the including file's
    /// directory, then the include path list. Missing is a warning.
    fn include_user(
        &mut self,
        name: &str,
        dir: &Path,
        depth: usize,
        out: &mut String,
    ) -> Result<(), PreprocessError> {
        let mut candidates = vec![PathBuf::from(name), dir.join(name)];
        for p in &self.include_paths {
            candidates.push(p.join(name));
        }

        for candidate in candidates {
            if candidate.is_file() {
                let resolved = candidate.canonicalize().unwrap_or(candidate);
                if !self.included.insert(resolved.clone()) {
                    return Ok(());
                }
                return self.expand_file(&resolved, depth + 1, out);
            }
        }

        self.handler.warn(
            format!("{}: include file not found, ignored", name),
            Span::DUMMY,
        );
        Ok(())
    }

    /// `#include <name>`: splice the synthetic declaration block for
    /// recognized headers, drop unknown ones.
    fn include_system(&mut self, name: &str, out: &mut String) {
        if let Some(decls) = system_header(name) {
            if self.included_system.insert(name.to_string()) {
                out.push_str(decls);
            }
        }
    }

    /// Replace macro names in one ordinary source line. Identifiers inside
    /// string and character literals are left alone.
    fn substitute(&self, line: &str) -> String {
        let mut out = String::with_capacity(line.len());
        let mut chars = line.char_indices().peekable();

        while let Some(&(i, c)) = chars.peek() {
            if c == '"' || c == '\'' {
                let quote = c;
                out.push(c);
                chars.next();
                let mut escaped = false;
                while let Some(&(_, c2)) = chars.peek() {
                    out.push(c2);
                    chars.next();
                    if escaped {
                        escaped = false;
                    } else if c2 == '\\' {
                        escaped = true;
                    } else if c2 == quote {
                        break;
                    }
                }
            } else if c.is_ascii_alphabetic() || c == '_' {
                let start = i;
                let mut end = i;
                while let Some(&(j, c2)) = chars.peek() {
                    if c2.is_ascii_alphanumeric() || c2 == '_' {
                        end = j + c2.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let ident = &line[start..end];
                match self.macros.get(ident) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(ident),
                }
            } else {
                out.push(c);
                chars.next();
            }
        }
        out
    }
}

/// Split off the first whitespace-delimited word.
fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(|c: char| c.is_ascii_whitespace()) {
        Some(idx) => (&s[..idx], &s[idx..]),
        None => (s, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn run(source: &str) -> String {
        let handler = Handler::new();
        let mut pre = Preprocessor::new(Vec::new(), &handler);
        pre.preprocess_source(source, Path::new(".")).unwrap()
    }

    #[test]
    fn test_plain_lines_pass_through() {
        assert_eq!(run("int x;\nint y;\n"), "int x;\nint y;\n");
    }

    #[test]
    fn test_define_substitution() {
        let out = run("#define MAX 100\nint a = MAX;\nint MAXIMUM = 1;\n");
        assert_eq!(out, "int a = 100;\nint MAXIMUM = 1;\n");
    }

    #[test]
    fn test_no_substitution_in_strings() {
        let out = run("#define X 9\nchar *s = \"X marks X\";\nint y = X;\n");
        assert_eq!(out, "char *s = \"X marks X\";\nint y = 9;\n");
    }

    #[test]
    fn test_ifdef_gating() {
        let out = run("#define A 1\n#ifdef A\nyes\n#else\nno\n#endif\n");
        assert_eq!(out, "yes\n");
        let out = run("#ifdef B\nyes\n#else\nno\n#endif\n");
        assert_eq!(out, "no\n");
    }

    #[test]
    fn test_ifndef() {
        let out = run("#ifndef B\nabsent\n#endif\n");
        assert_eq!(out, "absent\n");
    }

    #[test]
    fn test_nested_conditionals() {
        let out = run(
            "#define A 1\n#ifdef A\nouter\n#ifdef B\ninner\n#else\nno_inner\n#endif\n#endif\n",
        );
        assert_eq!(out, "outer\nno_inner\n");
    }

    #[test]
    fn test_inactive_region_suppresses_defines() {
        let out = run("#ifdef NOPE\n#define X 1\n#endif\n#ifdef X\ngot\n#else\nnot\n#endif\n");
        assert_eq!(out, "not\n");
    }

    #[test]
    fn test_unbalanced_endif() {
        let handler = Handler::new();
        let mut pre = Preprocessor::new(Vec::new(), &handler);
        assert!(matches!(
            pre.preprocess_source("#endif\n", Path::new(".")),
            Err(PreprocessError::UnbalancedConditional { .. })
        ));
        assert!(matches!(
            pre.preprocess_source("#ifdef A\n", Path::new(".")),
            Err(PreprocessError::UnbalancedConditional { .. })
        ));
    }

    #[test]
    fn test_system_header_substitution() {
        let out = run("#include <stdio.h>\nint main() {}\n");
        assert!(out.contains("int printf(char *fmt, ...);"));
        assert!(out.contains("int main() {}"));
    }

    #[test]
    fn test_system_header_included_once() {
        let out = run("#include <stdlib.h>\n#include <stdlib.h>\n");
        assert_eq!(out.matches("void exit(int status);").count(), 1);
    }

    #[test]
    fn test_unknown_system_header_dropped() {
        assert_eq!(run("#include <math.h>\nx\n"), "x\n");
    }

    #[test]
    fn test_ignored_directives() {
        let out = run("#pragma once\n#undef A\n#error nope\n#warning w\n#line 5\nok\n");
        assert_eq!(out, "ok\n");
    }

    #[test]
    fn test_output_has_no_directives() {
        let out = run("#include <stdio.h>\n#define A 1\n#ifdef A\nint x = A;\n#endif\n");
        assert!(!out.contains('#'));
    }

    #[test]
    fn test_missing_user_include_is_warning() {
        let handler = Handler::new();
        let mut pre = Preprocessor::new(Vec::new(), &handler);
        let out = pre
            .preprocess_source("#include \"no_such_file.h\"\nint x;\n", Path::new("."))
            .unwrap();
        assert_eq!(out, "int x;\n");
        assert_eq!(handler.warning_count(), 1);
    }

    #[test]
    fn test_user_include_and_idempotent_reinclusion() {
        let dir = tempfile::tempdir().unwrap();
        let header = dir.path().join("defs.h");
        let mut f = std::fs::File::create(&header).unwrap();
        writeln!(f, "int shared;").unwrap();

        let handler = Handler::new();
        let mut pre = Preprocessor::new(vec![dir.path().to_path_buf()], &handler);
        let out = pre
            .preprocess_source(
                "#include \"defs.h\"\n#include \"defs.h\"\nint main;\n",
                dir.path(),
            )
            .unwrap();
        assert_eq!(out.matches("int shared;").count(), 1);
        assert!(out.contains("int main;"));
    }

    #[test]
    fn test_include_depth_limit() {
        let dir = tempfile::tempdir().unwrap();
        // Self-inclusion is stopped by the idempotence set, so chain
        // distinct files to exceed the depth cap.
        let mut names = Vec::new();
        for i in 0..(MAX_INCLUDE_DEPTH + 2) {
            names.push(dir.path().join(format!("h{}.h", i)));
        }
        for (i, name) in names.iter().enumerate() {
            let next = if i + 1 < names.len() {
                format!("#include \"h{}.h\"\n", i + 1)
            } else {
                String::new()
            };
            std::fs::write(name, next).unwrap();
        }

        let handler = Handler::new();
        let mut pre = Preprocessor::new(vec![dir.path().to_path_buf()], &handler);
        assert!(matches!(
            pre.preprocess_source("#include \"h0.h\"\n", dir.path()),
            Err(PreprocessError::IncludeDepth { .. })
        ));
    }

    #[test]
    fn test_idempotence_on_own_output() {
        let first = run("#define N 3\n#ifdef N\nint a = N;\n#endif\n#include <ctype.h>\n");
        let handler = Handler::new();
        let mut pre = Preprocessor::new(Vec::new(), &handler);
        let second = pre.preprocess_source(&first, Path::new(".")).unwrap();
        assert_eq!(first, second);
    }
}
