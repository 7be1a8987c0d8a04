use std::fs::{self, File};
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info, warn};

use bytebeat::bytecode::disasm::print_program;
use bytebeat::bytecode::{CompileError, Program, compile};
use bytebeat::frontend::lexer::Lexer;
use bytebeat::frontend::token_dumper::TokenDumper;
use bytebeat::presets::{FACTORY_PRESETS, preset};
use bytebeat::reference::{REFERENCE_CASES, ReferenceCase, run_case};
use bytebeat::runtime::{Player, PlayerConfig, SampleCounter, program_slots};

/// Compile and play bytebeat expressions
#[derive(Parser)]
#[command(name = "bytebeat")]
#[command(about = "Compile bytebeat expressions to bytecode and render them as 8-bit audio")]
struct Cli {
    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render raw unsigned 8-bit PCM
    Render {
        #[command(flatten)]
        input: ProgramInput,

        /// Number of samples to render
        #[arg(long, default_value_t = 8000)]
        samples: u32,

        /// Starting value of t
        #[arg(long, default_value_t = 0)]
        start: u32,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Read expressions from stdin and play them in real time
    Live {
        #[arg(
            long,
            default_value_t = PlayerConfig::default().sample_rate,
            value_parser = clap::value_parser!(u32).range(1..)
        )]
        sample_rate: u32,

        /// Samples per rendered block
        #[arg(
            long,
            default_value_t = PlayerConfig::default().block_size,
            value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
        )]
        block_size: usize,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the lexemes of an expression
    Tokens {
        expr: String,

        #[arg(long)]
        no_color: bool,

        /// Print source forms instead of token names
        #[arg(long)]
        pretty: bool,
    },

    /// Show the compiled bytecode
    Disasm {
        #[command(flatten)]
        input: ProgramInput,
    },

    /// Compile an expression to a bytecode image file
    Compile {
        expr: String,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Compare reference expressions against native implementations
    Check {
        #[arg(long, default_value_t = 1_000_000)]
        samples: u32,

        #[arg(long, default_value_t = 0)]
        start: u32,

        /// Run only this case (1-based, see `list`)
        #[arg(long)]
        case: Option<usize>,

        /// Print the first mismatching samples
        #[arg(short, long)]
        verbose: bool,
    },

    /// List the reference cases
    List,

    /// List the factory presets
    Presets,
}

/// Where a program comes from.
#[derive(Args)]
#[group(required = true, multiple = false)]
struct ProgramInput {
    /// Expression source
    expr: Option<String>,

    /// Factory preset slot (1-based)
    #[arg(long)]
    preset: Option<usize>,

    /// Bytecode image written by `compile`
    #[arg(long)]
    program: Option<PathBuf>,
}

impl ProgramInput {
    /// Returns a display label and the compiled program.
    fn load(&self) -> Result<(String, Program)> {
        if let Some(expr) = &self.expr {
            let program = compile(expr)
                .map_err(|e| explain_compile_error(expr, e))
                .with_context(|| format!("failed to compile {:?}", expr))?;
            return Ok((expr.clone(), program));
        }

        if let Some(slot) = self.preset {
            let p = preset(slot).ok_or_else(|| {
                anyhow!("no preset {} (have 1..={})", slot, FACTORY_PRESETS.len())
            })?;
            let program = compile(p.source)
                .map_err(|e| explain_compile_error(p.source, e))
                .with_context(|| format!("failed to compile preset {}", slot))?;
            return Ok((p.source.to_string(), program));
        }

        if let Some(path) = &self.program {
            let bytes =
                fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
            let program = Program::from_bytes(&bytes)
                .with_context(|| format!("failed to load bytecode image {}", path.display()))?;
            return Ok((path.display().to_string(), program));
        }

        bail!("no expression, preset or program given")
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // PCM may go to stdout, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(&cli.log_level)
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Render {
            input,
            samples,
            start,
            output,
        } => render(&input, samples, start, output),
        Command::Live {
            sample_rate,
            block_size,
            output,
        } => live(
            PlayerConfig {
                sample_rate,
                block_size,
            },
            output,
        ),
        Command::Tokens {
            expr,
            no_color,
            pretty,
        } => dump_tokens(&expr, no_color, pretty),
        Command::Disasm { input } => {
            let (label, program) = input.load()?;
            print_program(&label, &program);
            Ok(())
        }
        Command::Compile { expr, output } => compile_image(&expr, &output),
        Command::Check {
            samples,
            start,
            case,
            verbose,
        } => check(samples, start, case, verbose),
        Command::List => {
            for (i, case) in REFERENCE_CASES.iter().enumerate() {
                println!("{:>2}  {:<22} {}", i + 1, case.name, case.source);
            }
            Ok(())
        }
        Command::Presets => {
            for (i, p) in FACTORY_PRESETS.iter().enumerate() {
                println!("{:>2}  {:<20} {}", i + 1, p.name, p.source);
            }
            Ok(())
        }
    }
}

fn open_output(output: Option<&Path>) -> Result<Box<dyn Write + Send>> {
    let sink: Box<dyn Write + Send> = match output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
        )),
        None => Box::new(io::stdout()),
    };
    Ok(sink)
}

fn render(input: &ProgramInput, samples: u32, start: u32, output: Option<PathBuf>) -> Result<()> {
    let (label, program) = input.load()?;
    debug!(source = %label, instructions = program.len(), samples, start, "rendering");

    let (mut writer, reader) = program_slots();
    writer.publish(&program);
    let mut player = Player::new(reader, Arc::new(SampleCounter::new(start)));

    let mut sink = open_output(output.as_deref())?;
    let mut block = vec![0u8; PlayerConfig::default().block_size];
    let mut remaining = samples as usize;

    while remaining > 0 {
        let n = remaining.min(block.len());
        player.fill(&mut block[..n]);
        sink.write_all(&block[..n]).context("failed to write samples")?;
        remaining -= n;
    }
    sink.flush().context("failed to flush output")?;

    Ok(())
}

/// The lexer's own message for `source`, if lexing is what failed.
fn lexer_note(source: &str) -> Option<String> {
    Lexer::new(source).tokenize().err().map(|e| e.message)
}

fn explain_compile_error(source: &str, e: CompileError) -> anyhow::Error {
    let err = anyhow::Error::new(e);
    match lexer_note(source) {
        Some(note) => err.context(note),
        None => err,
    }
}

fn print_compile_error(source: &str, e: &CompileError) {
    eprintln!("Compile error: {}", e);
    if let Some(note) = lexer_note(source) {
        eprintln!("Lexer error: {}", note);
    }
    if let Some(col) = e.col() {
        eprintln!("  {}", source);
        eprintln!("  {}^", " ".repeat(col.saturating_sub(1)));
    }
}

fn live(config: PlayerConfig, output: Option<PathBuf>) -> Result<()> {
    let (mut writer, reader) = program_slots();
    let counter = Arc::new(SampleCounter::default());
    let player = Player::new(reader, Arc::clone(&counter));
    let running = Arc::new(AtomicBool::new(true));
    let sink = open_output(output.as_deref())?;

    if let Some(first) = preset(1) {
        writer.compile(first.source)?;
        info!(preset = first.name, source = first.source, "loaded startup preset");
    }

    info!(
        sample_rate = config.sample_rate,
        block_size = config.block_size,
        "live mode: one expression per line, :preset N, :reset, :quit"
    );

    let rt = thread::Builder::new()
        .name("bytebeat-rt".to_string())
        .spawn({
            let running = Arc::clone(&running);
            move || render_loop(player, sink, config, &running)
        })
        .context("failed to start render thread")?;

    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read stdin")?;
        let line = line.trim();

        if rt.is_finished() {
            break;
        }

        match line.split_once(' ').unwrap_or((line, "")) {
            ("", _) => {}
            (":quit" | ":q", _) => break,
            (":reset", _) => {
                counter.reset();
                info!("t reset");
            }
            (":preset", arg) => {
                let Some(p) = arg.trim().parse().ok().and_then(preset) else {
                    warn!(arg, "no such preset (have 1..={})", FACTORY_PRESETS.len());
                    continue;
                };
                match writer.compile(p.source) {
                    Ok(_) => {
                        counter.reset();
                        info!(preset = p.name, source = p.source, "loaded preset");
                    }
                    Err(e) => print_compile_error(p.source, &e),
                }
            }
            _ => {
                if let Err(e) = writer.compile(line) {
                    print_compile_error(line, &e);
                }
            }
        }
    }

    running.store(false, Ordering::Release);
    rt.join().map_err(|_| anyhow!("render thread panicked"))?
}

/// Real-time side of `live`: renders one block per block period.
fn render_loop(
    mut player: Player,
    mut sink: Box<dyn Write + Send>,
    config: PlayerConfig,
    running: &AtomicBool,
) -> Result<()> {
    let mut block = vec![0u8; config.block_size];
    let period = config.block_duration();
    let mut deadline = Instant::now();

    while running.load(Ordering::Acquire) {
        player.fill(&mut block);
        sink.write_all(&block).context("failed to write samples")?;
        sink.flush().context("failed to flush output")?;

        deadline += period;
        match deadline.checked_duration_since(Instant::now()) {
            Some(wait) => thread::sleep(wait),
            None => {
                debug!(t = player.counter().get(), "render loop fell behind");
                deadline = Instant::now();
            }
        }
    }

    Ok(())
}

fn dump_tokens(expr: &str, no_color: bool, pretty: bool) -> Result<()> {
    let tokens = Lexer::new(expr).tokenize().context("lexer error")?;

    let mut dumper = TokenDumper::new();
    if no_color {
        dumper = dumper.no_color();
    }
    if pretty {
        dumper = dumper.pretty();
    }
    dumper.dump(&tokens);
    Ok(())
}

fn compile_image(expr: &str, output: &Path) -> Result<()> {
    let program = compile(expr)
        .map_err(|e| explain_compile_error(expr, e))
        .with_context(|| format!("failed to compile {:?}", expr))?;
    let bytes = program.to_bytes().context("failed to encode bytecode image")?;
    fs::write(output, &bytes).with_context(|| format!("failed to write {}", output.display()))?;

    info!(
        instructions = program.len(),
        bytes = bytes.len(),
        path = %output.display(),
        "wrote bytecode image"
    );
    Ok(())
}

fn check(samples: u32, start: u32, case: Option<usize>, verbose: bool) -> Result<()> {
    let cases: Vec<&ReferenceCase> = match case {
        Some(i) => {
            let c = i
                .checked_sub(1)
                .and_then(|i| REFERENCE_CASES.get(i))
                .ok_or_else(|| anyhow!("no case {} (have 1..={})", i, REFERENCE_CASES.len()))?;
            vec![c]
        }
        None => REFERENCE_CASES.iter().collect(),
    };

    println!("Testing {} samples starting from t={}", samples, start);

    let mut failed = 0;
    for c in &cases {
        println!();
        println!("=== Testing: {} ===", c.name);
        println!("Expression: {}", c.source);

        let report = match run_case(c, start, samples) {
            Ok(report) => report,
            Err(e) => {
                println!("COMPILE ERROR: {}", e);
                failed += 1;
                continue;
            }
        };
        println!("Compiled to {} instructions", report.instructions);

        if report.passed() {
            println!("PASSED: all {} samples match", samples);
            continue;
        }

        failed += 1;
        if verbose {
            for m in &report.recorded {
                println!(
                    "  DIFF at t={}: native={:#010x} vm={:#010x} [byte: native={} vm={}]",
                    m.t,
                    m.expected,
                    m.actual,
                    m.expected & 0xFF,
                    m.actual & 0xFF
                );
            }
        }
        println!(
            "FAILED: {}/{} samples differ ({:.2}%)",
            report.mismatches,
            samples,
            100.0 * f64::from(report.mismatches) / f64::from(samples.max(1))
        );
        if let Some(first) = report.first_mismatch() {
            println!("First difference at t={}", first.t);
        }
    }

    println!();
    println!("Passed: {}/{}", cases.len() - failed, cases.len());

    if failed > 0 {
        bail!("{} of {} reference cases failed", failed, cases.len());
    }
    Ok(())
}
