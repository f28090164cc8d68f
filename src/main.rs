// src/main.rs

use aigis::diagnostics;
use aigis::regen;
use aigis::reporter::CompilerError;
use aigis::symtab::DEFAULT_BUDGET;
use aigis::{Compilation, CompileOptions, compile};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::process;

/// Aigis 语言的编译器前端：词法、语法、语义分析与优化
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// 需要编译的源文件路径
    input_file: PathBuf,

    /// 不运行优化器
    #[arg(long)]
    no_optimize: bool,

    /// 声明表驻留内存的预算（字节）
    #[arg(long, default_value_t = DEFAULT_BUDGET)]
    budget: usize,

    /// 打印 Token 列表
    #[arg(long)]
    tokens: bool,

    /// 以 JSON 打印语法分析得到的 AST
    #[arg(long)]
    ast: bool,

    /// 打印声明表、语义符号表与内存统计
    #[arg(long)]
    symbols: bool,

    /// 把重新生成的源代码写入这个文件
    #[arg(long)]
    emit: Option<PathBuf>,

    /// 提高日志级别，可以重复：-v info，-vv debug，-vvv trace
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match run(&cli) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}

/// 日志级别由 `RUST_LOG` 决定，没有设置时按 `-v` 的次数。
fn setup_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env = env_logger::Env::default().filter_or("RUST_LOG", level);
    env_logger::Builder::from_env(env).format_timestamp(None).init();
}

/// 编译并打印结果。没有语法或语义错误时返回 `Ok(true)`。
fn run(cli: &Cli) -> Result<bool, CompilerError> {
    let source = fs::read_to_string(&cli.input_file)?;
    let file_name = cli.input_file.display().to_string();
    let options = CompileOptions {
        optimize: !cli.no_optimize,
        memory_budget: cli.budget,
    };

    let compilation = compile(&source, &options)?;

    if cli.tokens {
        println!("== Tokens ==");
        for token in &compilation.tokens {
            println!("{}", token);
        }
        println!();
    }
    if cli.ast {
        println!("== AST ==");
        println!("{}", compilation.parsed.to_json()?);
        println!();
    }

    diagnostics::print_all(&file_name, &source, compilation.diagnostics())?;

    if cli.symbols {
        print_symbols(&compilation)?;
    }

    let analysis = &compilation.analysis;
    if !analysis.applied.is_empty() {
        println!("== Optimizations ==");
        for applied in &analysis.applied {
            println!("- {}", applied);
        }
        println!();
    }

    let output = regen::regenerate(&analysis.ast);
    match &cli.emit {
        Some(path) => {
            fs::write(path, &output)?;
            println!("Regenerated source written to '{}'", path.display());
        }
        None => {
            println!("== Source ==");
            print!("{}", output);
        }
    }

    let ok = !compilation.has_errors();
    if ok {
        println!("Compilation finished");
    } else {
        println!(
            "Compilation finished with {} syntax error(s) and {} semantic error(s)",
            compilation.syntax.len(),
            analysis.errors.len()
        );
    }
    Ok(ok)
}

fn print_symbols(compilation: &Compilation) -> Result<(), CompilerError> {
    println!("== Declaration table ==");
    for (record, residency) in compilation.declarations.listing()? {
        println!(
            "{:<5} {:<16} {:<10} {:<16} line {}",
            residency, record.identifier, record.category, record.ty, record.line
        );
    }
    let stats = compilation.declarations.stats()?;
    println!(
        "memory: {}/{} bytes, {} resident, {} on disk, {} total",
        stats.resident_bytes,
        stats.budget,
        stats.resident_count,
        stats.secondary_count,
        stats.total_count
    );
    println!();

    println!("== Symbol table ==");
    for record in compilation.analysis.symbols.symbols() {
        println!(
            "{:<16} {:<16} {:<10} {:<32} init={:<5} refs={}",
            record.identifier,
            record.ty,
            record.category,
            record.scope,
            record.initialized,
            record.references
        );
    }
    println!();
    Ok(())
}
