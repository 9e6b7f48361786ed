//! rcc-drv - Compiler driver.
//!
//! Parses the command line, orchestrates the pipeline
//! (`preprocess → tokenize → parse → elaborate → codegen`), derives the
//! output path, and hands the emitted assembly to the system toolchain
//! unless `-S` was given. Fatal diagnostics are rendered with their source
//! line and a caret; the process exits 0 on success and 1 on any error.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use rcc_gen::Assembler;
use rcc_pre::Preprocessor;
use rcc_util::{Handler, SourceMap, Span};

/// What to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitMode {
    /// `-S`: emit assembly and stop.
    Asm,
    /// `-c`: compile and assemble, do not link.
    Object,
    /// Default: full executable.
    Executable,
}

/// One compiler invocation's configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub emit: EmitMode,
    /// User `-I` paths, in order, searched before the defaults.
    pub include_paths: Vec<PathBuf>,
    pub verbose: bool,
}

/// Parsed command line: either a help request or a compile job.
#[derive(Debug)]
pub enum Invocation {
    Help,
    Compile(Config),
}

pub const USAGE: &str = "\
Usage: rcc [options] file
Options:
  -o <file>  Write output to <file>
  -S         Generate assembly only
  -c         Compile only (do not link)
  -I <dir>   Add directory to include search path
  -v         Verbose phase tracing
  -h         Display this help
";

/// Parse command-line arguments (program name excluded).
pub fn parse_args(args: &[String]) -> Result<Invocation, String> {
    let mut input = None;
    let mut output = None;
    let mut emit = EmitMode::Executable;
    let mut include_paths = Vec::new();
    let mut verbose = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-o" => {
                let value = iter.next().ok_or("missing output file")?;
                output = Some(PathBuf::from(value));
            }
            "-S" => emit = EmitMode::Asm,
            "-c" => emit = EmitMode::Object,
            "-I" => {
                let value = iter.next().ok_or("missing include directory")?;
                include_paths.push(PathBuf::from(value));
            }
            "-v" => verbose = true,
            "-h" => return Ok(Invocation::Help),
            other if other.starts_with('-') => {
                return Err(format!("unknown option: {}", other));
            }
            other => input = Some(PathBuf::from(other)),
        }
    }

    let input = input.ok_or("no input file")?;
    Ok(Invocation::Compile(Config {
        input,
        output,
        emit,
        include_paths,
        verbose,
    }))
}

/// Entry point for the binary; returns the process exit code.
pub fn run() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let config = match parse_args(&args) {
        Ok(Invocation::Compile(config)) => config,
        Ok(Invocation::Help) => {
            eprint!("{}", USAGE);
            return 1;
        }
        Err(message) => {
            eprintln!("error: {}", message);
            eprint!("{}", USAGE);
            return 1;
        }
    };

    match compile(&config) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{:#}", err);
            1
        }
    }
}

/// Run the whole pipeline for one configuration.
pub fn compile(config: &Config) -> Result<()> {
    // User include paths first, then the defaults.
    let mut include_paths = config.include_paths.clone();
    include_paths.push(PathBuf::from("."));
    include_paths.push(PathBuf::from("/usr/include"));
    include_paths.push(PathBuf::from("/usr/local/include"));

    if config.verbose {
        eprintln!("[rcc] preprocessing {}", config.input.display());
    }
    let handler = Handler::new();
    let mut preprocessor = Preprocessor::new(include_paths, &handler);
    let preprocessed = preprocessor
        .preprocess_file(&config.input)
        .map_err(|e| anyhow!("error: {}", e))?;
    for warning in handler.take() {
        eprintln!("warning: {}", warning.message);
    }

    let mut map = SourceMap::new();
    let name = config.input.display().to_string();
    let asm = build_asm(&preprocessed, &name, &mut map, config.verbose)?;

    let output = config.output.clone().unwrap_or_else(|| match config.emit {
        EmitMode::Asm => config.input.with_extension("s"),
        _ => PathBuf::from("a.out"),
    });

    if config.emit == EmitMode::Asm {
        std::fs::write(&output, asm)
            .with_context(|| format!("cannot write output file: {}", output.display()))?;
        return Ok(());
    }

    // Assemble via the system toolchain, through a temporary file that is
    // removed on success.
    let asm_path = std::env::temp_dir().join(format!("rcc-{}.s", std::process::id()));
    std::fs::write(&asm_path, asm)
        .with_context(|| format!("cannot write output file: {}", asm_path.display()))?;

    if config.verbose {
        eprintln!("[rcc] assembling to {}", output.display());
    }
    let link = config.emit == EmitMode::Executable;
    let result = Assembler::new().assemble(&asm_path, &output, link);
    match result {
        Ok(()) => {
            let _ = std::fs::remove_file(&asm_path);
            Ok(())
        }
        Err(e) => bail!("error: {}", e),
    }
}

/// Lex, parse, elaborate, and generate assembly for preprocessed source.
///
/// This is the pipeline below the preprocessor, shared by [`compile`] and
/// the test suites.
pub fn build_asm(
    preprocessed: &str,
    name: &str,
    map: &mut SourceMap,
    verbose: bool,
) -> Result<String> {
    let file_id = map.add_file(name, preprocessed);

    if verbose {
        eprintln!("[rcc] lexing");
    }
    let tokens = rcc_lex::tokenize(preprocessed, file_id)
        .map_err(|e| render(map, Some(e.span()), &e.to_string()))?;

    if verbose {
        eprintln!("[rcc] parsing ({} tokens)", tokens.len());
    }
    let mut prog = rcc_par::parse(tokens).map_err(|e| render(map, Some(e.span()), &e.to_string()))?;

    if verbose {
        eprintln!("[rcc] elaborating types");
    }
    rcc_par::elaborate(&mut prog).map_err(|e| render(map, Some(e.span()), &e.to_string()))?;

    if verbose {
        eprintln!("[rcc] generating code");
    }
    rcc_gen::codegen(&prog).map_err(|e| render(map, e.span(), &e.to_string()))
}

/// Compile in-memory source straight to assembly text (test helper and
/// library entry point). Runs the preprocessor with no extra include
/// paths.
pub fn compile_to_asm(source: &str, name: &str) -> Result<String> {
    let handler = Handler::new();
    let mut preprocessor = Preprocessor::new(Vec::new(), &handler);
    let preprocessed = preprocessor
        .preprocess_source(source, Path::new("."))
        .map_err(|e| anyhow!("error: {}", e))?;
    let mut map = SourceMap::new();
    build_asm(&preprocessed, name, &mut map, false)
}

/// Render a fatal diagnostic: message first, then the source line with a
/// caret when a location is known.
fn render(map: &SourceMap, span: Option<Span>, message: &str) -> anyhow::Error {
    match span.and_then(|s| map.format_span(s)) {
        Some(location) => anyhow!("error: {}\n{}", message, location),
        None => anyhow!("error: {}", message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args_defaults() {
        let inv = parse_args(&args(&["main.c"])).unwrap();
        match inv {
            Invocation::Compile(config) => {
                assert_eq!(config.input, PathBuf::from("main.c"));
                assert_eq!(config.emit, EmitMode::Executable);
                assert!(config.output.is_none());
                assert!(config.include_paths.is_empty());
            }
            other => panic!("expected compile, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_args_flags() {
        let inv = parse_args(&args(&["-S", "-o", "out.s", "-I", "inc", "-I", "inc2", "x.c"]))
            .unwrap();
        match inv {
            Invocation::Compile(config) => {
                assert_eq!(config.emit, EmitMode::Asm);
                assert_eq!(config.output, Some(PathBuf::from("out.s")));
                assert_eq!(
                    config.include_paths,
                    vec![PathBuf::from("inc"), PathBuf::from("inc2")]
                );
            }
            other => panic!("expected compile, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_args_errors() {
        assert_eq!(parse_args(&args(&[])).unwrap_err(), "no input file");
        assert_eq!(parse_args(&args(&["-o"])).unwrap_err(), "missing output file");
        assert_eq!(
            parse_args(&args(&["-X", "x.c"])).unwrap_err(),
            "unknown option: -X"
        );
        assert!(matches!(
            parse_args(&args(&["-h"])).unwrap(),
            Invocation::Help
        ));
    }

    #[test]
    fn test_compile_to_asm_smoke() {
        let asm = compile_to_asm("int main() { return 42; }", "t.c").unwrap();
        assert!(asm.contains("mov rax, 42"));
    }

    #[test]
    fn test_error_rendering_has_caret() {
        let err = compile_to_asm("int main() { return @; }", "t.c").unwrap_err();
        let text = format!("{:#}", err);
        assert!(text.contains("error: invalid token at '@'"));
        assert!(text.contains("t.c:1:21"));
        assert!(text.contains('^'));
    }
}
