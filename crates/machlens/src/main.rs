use std::error::Error;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use machlens_core::decode::DecodedView;
use machlens_core::ehframe::{EhFrame, EhRecord};
use machlens_core::macho::structure::StructNode;
use machlens_core::relocs::table::{section_list, ReltabRow, RELTAB_HEADER};
use machlens_core::{Anchor, EngineError, SemanticType, Session, SessionOptions, View};
use machlens_utils::{info, init_logging_with, LogConfig, LogFormat, LogLevel};

/// Inspect Mach-O objects: symbols, relocations, typed section data,
/// disassembly and eh_frame records.
#[derive(Parser, Debug)]
#[command(name = "machlens")]
#[command(version)]
#[command(about = "Inspect Mach-O objects and executables", long_about = None)]
struct Cli
{
    /// Mach-O (or fat) file to inspect
    file: PathBuf,

    #[command(subcommand)]
    command: Commands,

    /// Log level (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log format (overrides MACHLENS_LOG_FORMAT)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Do not load __DWARF sections
    #[arg(long, global = true, default_value_t = false)]
    no_dwarf: bool,

    /// Decode long double even when the file's CPU is not the host's
    #[arg(long, global = true, default_value_t = false)]
    force_long_double: bool,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Show the file summary, header and load commands
    Info,
    /// List sections with their relocation counts
    Sections,
    /// List the symbol table
    Symbols,
    /// Name the symbol covering an address
    Lookup
    {
        /// Address (hex with 0x prefix, or decimal)
        address: String,
    },
    /// Decode a section
    Section
    {
        /// `segment,section` or 1-based section number
        section: String,
        /// Semantic type (code, cstring, float32, int64, pointer64, data, eh_frame, ...)
        #[arg(long = "type")]
        semantic: Option<SemanticType>,
    },
    /// Decode a symbol
    Symbol
    {
        /// Symbol name or symbol table index
        symbol: String,
        /// Semantic type (dwarf, code, data, ...)
        #[arg(long = "type")]
        semantic: Option<SemanticType>,
    },
    /// Print relocation tables
    Relocs
    {
        /// `segment,section` or 1-based section number; all sections if omitted
        section: Option<String>,
        /// Show the relocations bound to this symbol instead
        #[arg(long, conflicts_with = "section")]
        symbol: Option<String>,
    },
    /// Break __TEXT,__eh_frame down into CIE and FDE fields
    EhFrame,
    /// Open a `/symbol/N?addend=A&size=S` or `/address/N?size=S` anchor
    Open
    {
        anchor: Anchor,
    },
}

fn main()
{
    let cli = Cli::parse();

    let config = match LogConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(1);
        }
    };
    let config = LogConfig {
        level: cli.log_level.or(config.level),
        format: cli.log_format.unwrap_or(config.format),
        ..config
    };
    if let Err(e) = init_logging_with(&config) {
        eprintln!("Failed to initialize logging: {e}");
        process::exit(1);
    }

    if let Err(e) = run_command(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(cli: Cli) -> Result<(), Box<dyn Error>>
{
    let options = SessionOptions {
        load_dwarf: !cli.no_dwarf,
        force_long_double: cli.force_long_double,
    };
    let session = Session::open(&cli.file, options)?;
    info!(command = ?cli.command, "running command");

    match cli.command {
        Commands::Info => print_info(&session),
        Commands::Sections => {
            for line in section_list(session.file()) {
                println!("{line}");
            }
        }
        Commands::Symbols => print_symbols(&session),
        Commands::Lookup { address } => {
            let address = parse_address(&address)?;
            match session.lookup(address) {
                Some(hit) => println!("{address:#x}: {} (base {:#x})", hit.names, hit.base),
                None => println!("{address:#x}: no symbol"),
            }
        }
        Commands::Section { section, semantic } => {
            let number = session
                .find_section(&section)
                .ok_or_else(|| EngineError::InvalidArgument(format!("no section '{section}'")))?;
            print_view(&session.section_view(number, semantic)?);
        }
        Commands::Symbol { symbol, semantic } => {
            let index = find_symbol(&session, &symbol)?;
            print_view(&session.symbol_view(index, semantic)?);
        }
        Commands::Relocs { section, symbol } => print_relocs(&session, section.as_deref(), symbol.as_deref())?,
        Commands::EhFrame => {
            let number = session
                .find_section("__TEXT,__eh_frame")
                .ok_or_else(|| EngineError::InvalidArgument("no __TEXT,__eh_frame section".into()))?;
            print_view(&session.section_view(number, Some(SemanticType::EhFrame))?);
        }
        Commands::Open { anchor } => print_view(&session.open_anchor(&anchor)?),
    }

    for warning in session.warnings() {
        eprintln!("warning: {warning}");
    }
    Ok(())
}

fn parse_address(text: &str) -> Result<u64, EngineError>
{
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|_| EngineError::InvalidArgument(format!("invalid address '{text}'")))
}

fn find_symbol(session: &Session, symbol: &str) -> Result<usize, EngineError>
{
    session
        .find_symbol(symbol)
        .ok_or_else(|| EngineError::InvalidArgument(format!("no symbol '{symbol}'")))
}

fn print_info(session: &Session)
{
    let file = session.file();
    println!("{}", file.description());
    println!("  Architecture: {}", file.architecture);
    println!("  Sections: {}", file.sections.len());
    println!("  Symbols: {}", file.symbols.len());
    println!("  DWARF: {}", if session.dwarf().is_some() { "yes" } else { "no" });
    println!();
    for node in session.structure() {
        print_node(&node, 0);
    }
}

fn print_node(node: &StructNode, depth: usize)
{
    let indent = "  ".repeat(depth);
    if node.value.is_empty() {
        println!("{indent}{}", node.label);
    } else {
        let continuation = format!("\n{indent}  {:width$}", "", width = node.label.len());
        println!("{indent}{}: {}", node.label, node.value.replace('\n', &continuation));
    }
    for child in &node.children {
        print_node(child, depth + 1);
    }
}

fn print_symbols(session: &Session)
{
    for row in session.symtab() {
        println!(
            "{:>5} {} {:<18} {:<24} {} [{}] {}",
            row.index,
            row.letter,
            row.value,
            row.section,
            row.kind.replace('\n', " "),
            row.desc.replace('\n', " "),
            row.name
        );
    }
}

fn print_relocs(session: &Session, section: Option<&str>, symbol: Option<&str>) -> Result<(), EngineError>
{
    if let Some(symbol) = symbol {
        let index = find_symbol(session, symbol)?;
        print_reltab(&session.symbol_reltab(index)?);
        return Ok(());
    }

    let numbers: Vec<usize> = match section {
        Some(section) => vec![session
            .find_section(section)
            .ok_or_else(|| EngineError::InvalidArgument(format!("no section '{section}'")))?],
        None => session.file().sections.iter().map(|s| s.index).collect(),
    };
    for number in numbers {
        let rows = session.section_reltab(number)?;
        if rows.is_empty() && section.is_none() {
            continue;
        }
        if let Some(s) = session.file().section(number as u32) {
            println!("{}", s.label());
        }
        print_reltab(&rows);
        println!();
    }
    Ok(())
}

fn print_reltab(rows: &[ReltabRow])
{
    println!("{}", RELTAB_HEADER.join("\t"));
    for row in rows {
        println!("{}", row.columns().map(|column| column.replace('\n', " ")).join("\t"));
    }
}

fn print_view(view: &View)
{
    match view {
        View::Rows(rows) => print_rows(rows),
        View::EhFrame(frame) => print_eh_frame(frame),
    }
    for warning in view.warnings() {
        eprintln!("warning: {warning}");
    }
}

fn print_rows(view: &DecodedView)
{
    println!("{} [{}]", view.title, view.semantic);
    for row in &view.rows {
        let marker = if row.focused { '>' } else { ' ' };
        println!(
            "{marker} {}  {:<24}  {}",
            row.address_string(),
            row.bytes_string(),
            row.text
        );
        for reloc in &row.relocations {
            let anchor = Anchor::for_target(&reloc.target).map(|a| format!("  {a}")).unwrap_or_default();
            println!(
                "      reloc {:#018x} {} {}{anchor}",
                reloc.address,
                reloc.kind,
                reloc.target_text
            );
        }
    }
}

fn print_eh_frame(frame: &EhFrame)
{
    println!("{}", frame.title);
    for group in &frame.groups {
        println!("  {}", group.title());
        print_record(&group.cie);
        for fde in &group.fdes {
            print_record(fde);
        }
    }
}

fn print_record(record: &EhRecord)
{
    println!("    {} @ {:#x}", record.title(), record.address);
    for field in &record.fields {
        println!(
            "      {:#018x}  {:<24}  {}: {}",
            field.address,
            field.bytes_string(),
            field.name,
            field.value.replace('\n', " | ")
        );
    }
    if let Some(error) = &record.error {
        println!("      error: {error}");
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_parse_address()
    {
        assert_eq!(parse_address("0x1f00").unwrap(), 0x1f00);
        assert_eq!(parse_address("4096").unwrap(), 4096);
        assert!(parse_address("0xzz").is_err());
    }

    #[test]
    fn test_cli_parses_section_type()
    {
        let cli = Cli::try_parse_from(["machlens", "a.o", "section", "__TEXT,__cstring", "--type", "cstring"]).unwrap();
        match cli.command {
            Commands::Section { section, semantic } => {
                assert_eq!(section, "__TEXT,__cstring");
                assert_eq!(semantic, Some(SemanticType::CString));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_parses_anchor()
    {
        let cli = Cli::try_parse_from(["machlens", "a.o", "open", "/address/4096?size=4"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Open {
                anchor: Anchor::Address { address: 4096, size: 4 }
            }
        ));
    }
}
