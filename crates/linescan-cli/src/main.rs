use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use linescan_core::{
    backward_scan, count_lines, forward_scan, head_lines, load_config, parse_separator, tail_lines, FsStorage,
    ScanContext, ScanFlow, ScanOptions, TailOptions,
};
use rayon::prelude::*;
use regex::bytes::Regex;
use serde::Serialize;
use std::borrow::Cow;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 未指定 --config 时尝试加载的默认配置文件
const DEFAULT_CONFIG: &str = "./linescan.toml";

/// 命令行入口（基于 clap）
#[derive(Parser, Debug)]
#[command(name = "linescan", version, about = "Bounded-memory line scanning, forward or backward")]
struct Cli {
    /// 配置文件（TOML），默认 ./linescan.toml（存在时）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 每次读取的字节数
    #[arg(long, global = true)]
    chunk_size: Option<usize>,

    /// 行分隔符，支持 \n \r \t \0 \\ \xHH 转义；纯文本输出也以它结束每一行
    #[arg(long, global = true)]
    separator: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 输出前 N 行
    Head {
        file: PathBuf,
        #[arg(short = 'n', long, default_value_t = 10)]
        lines: usize,
    },
    /// 输出后 N 行（反向扫描，不读取整个文件）
    Tail {
        file: PathBuf,
        #[arg(short = 'n', long, default_value_t = 10)]
        lines: usize,
        /// 文件以分隔符结尾时保留末尾空行
        #[arg(long)]
        keep_trailing_empty: bool,
    },
    /// 逐行扫描并输出
    Scan {
        file: PathBuf,
        /// 正向为起始偏移；--reverse 时为排他上界
        #[arg(long)]
        from: Option<u64>,
        /// 从文件末尾向开头扫描
        #[arg(long)]
        reverse: bool,
        /// 只输出匹配该正则（按原始字节匹配）的行
        #[arg(long)]
        grep: Option<String>,
        /// 每行输出一个 JSON 对象
        #[arg(long)]
        json: bool,
        /// 最多输出的行数
        #[arg(long)]
        limit: Option<u64>,
    },
    /// 统计行数（多个文件并行）
    Count {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// 线程数（"auto"=rayon 默认）
        #[arg(long, default_value = "auto")]
        threads: String,
    },
}

/// `scan --json` 的单行输出
#[derive(Debug, Serialize)]
struct LineRecord<'a> {
    line_count: u64,
    line_offset: u64,
    is_final: bool,
    text: Cow<'a, str>,
}

fn main() -> Result<()> {
    // 初始化日志（支持通过 RUST_LOG 控制等级，例如 info、debug）
    init_tracing();
    let cli = Cli::parse();
    let opts = resolve_options(&cli)?;
    debug!(chunk_size = opts.chunk_size, separator = ?opts.separator, "options resolved");

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    run_command(&mut out, cli.command, opts)?;
    out.flush().context("flush output")?;
    Ok(())
}

fn run_command(out: &mut impl Write, command: Commands, opts: ScanOptions) -> Result<()> {
    match command {
        Commands::Head { file, lines } => {
            let found = head_lines(&FsStorage, &file, lines, &opts).with_context(|| format!("head {}", file.display()))?;
            write_lines(out, &found, &opts.separator)?;
        }
        Commands::Tail { file, lines, keep_trailing_empty } => {
            let tail = TailOptions { skip_trailing_empty: !keep_trailing_empty };
            let found =
                tail_lines(&FsStorage, &file, lines, &opts, tail).with_context(|| format!("tail {}", file.display()))?;
            write_lines(out, &found, &opts.separator)?;
        }
        Commands::Scan { file, from, reverse, grep, json, limit } => {
            let filter = grep.as_deref().map(Regex::new).transpose().context("invalid --grep pattern")?;
            let mut opts = opts;
            opts.position = from;
            let emitted = run_scan(out, &file, &opts, reverse, filter.as_ref(), json, limit)?;
            info!(path = %file.display(), emitted, "scan finished");
        }
        Commands::Count { files, threads } => {
            let counts = count_files(&files, &opts, parse_threads(&threads))?;
            for (path, count) in files.iter().zip(counts) {
                let count = count.with_context(|| format!("count {}", path.display()))?;
                writeln!(out, "{count}\t{}", path.display())?;
            }
        }
    }
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};
    // 日志写 stderr，stdout 只留给行输出
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(env_filter).with_writer(io::stderr).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// 优先级：命令行参数 > 配置文件 > 内置默认值
fn resolve_options(cli: &Cli) -> Result<ScanOptions> {
    let mut opts = ScanOptions::default();

    let config_path = match &cli.config {
        Some(p) => Some(p.clone()),
        None => Some(PathBuf::from(DEFAULT_CONFIG)).filter(|p| p.is_file()),
    };
    if let Some(path) = config_path {
        let cfg = load_config(&path)?;
        cfg.scan.apply(&mut opts)?;
        debug!(config = %path.display(), "config loaded");
    }

    if let Some(size) = cli.chunk_size {
        opts.chunk_size = size;
    }
    if let Some(sep) = &cli.separator {
        opts.separator = parse_separator(sep)?;
    }
    Ok(opts)
}

/// 每行后写回扫描所用的分隔符
fn write_lines(out: &mut impl Write, lines: &[Vec<u8>], separator: &[u8]) -> io::Result<()> {
    for line in lines {
        out.write_all(line)?;
        out.write_all(separator)?;
    }
    Ok(())
}

/// 执行单文件扫描；写出失败时停止扫描并返回该错误
///
/// 纯文本输出以扫描分隔符结束每行，JSON 输出固定为每行一个对象。
fn run_scan(
    out: &mut impl Write,
    file: &Path,
    opts: &ScanOptions,
    reverse: bool,
    filter: Option<&Regex>,
    json: bool,
    limit: Option<u64>,
) -> Result<u64> {
    if limit == Some(0) {
        return Ok(0);
    }
    let mut emitted = 0u64;
    let mut write_err: Option<io::Error> = None;

    let on_line = |line: &[u8], ctx: &ScanContext| {
        if filter.is_some_and(|re| !re.is_match(line)) {
            return ScanFlow::Continue;
        }
        let res = if json {
            let record = LineRecord {
                line_count: ctx.line_count,
                line_offset: ctx.line_offset,
                is_final: ctx.is_final,
                text: String::from_utf8_lossy(line),
            };
            serde_json::to_writer(&mut *out, &record).map_err(io::Error::from).and_then(|_| out.write_all(b"\n"))
        } else {
            out.write_all(line).and_then(|_| out.write_all(&opts.separator))
        };
        if let Err(e) = res {
            write_err = Some(e);
            return ScanFlow::Stop;
        }
        emitted += 1;
        if limit.is_some_and(|n| emitted >= n) { ScanFlow::Stop } else { ScanFlow::Continue }
    };

    let consumed = if reverse {
        backward_scan(file, on_line, opts)
    } else {
        forward_scan(file, on_line, opts)
    }
    .with_context(|| format!("scan {}", file.display()))?;

    if let Some(e) = write_err {
        return Err(e).context("write output");
    }
    debug!(path = %file.display(), consumed, "bytes consumed");
    Ok(emitted)
}

/// 并行统计多个文件；每个扫描独占自己的句柄，结果顺序与输入一致
fn count_files(files: &[PathBuf], opts: &ScanOptions, threads: Option<usize>) -> Result<Vec<linescan_core::Result<u64>>> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    let pool = builder.build().context("build rayon pool")?;
    Ok(pool.install(|| files.par_iter().map(|path| count_lines(&FsStorage, path, opts)).collect()))
}

/// 解析线程参数
fn parse_threads(s: &str) -> Option<usize> {
    if s.eq_ignore_ascii_case("auto") { return None; }
    match s.parse::<usize>() {
        Ok(n) if n >= 1 => Some(n),
        _ => None,
    }
}
