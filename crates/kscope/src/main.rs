use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use kscope_core::finder::FindKind;
#[cfg(unix)]
use kscope_core::memory::CoreDump;
#[cfg(target_os = "linux")]
use kscope_core::memory::ProcessMemory;
use kscope_core::memory::{MemoryReader, SegmentMemory};
use kscope_core::platform::{KernelConfig, PlatformBuilder};
use kscope_core::symbols::SymbolTable;
use kscope_core::types::{Architecture, TypeKind};
use kscope_core::{KscopeError, Object, ObjectKind, Program, Result as KscopeResult};
use kscope_utils::{default_log_file, info, init_logging, LogConfig, LogLevel};

/// Resolve kernel and program symbols to typed objects.
#[derive(Parser, Debug)]
#[command(name = "kscope")]
#[command(version)]
#[command(about = "Resolve kernel and program symbols to typed objects", long_about = None)]
struct Cli
{
    /// Log level (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Also write logs to ~/.kscope/<date>-kscope.log
    #[arg(long, global = true, default_value_t = false)]
    log_to_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Look up a name and print the resulting object
    Find
    {
        /// Symbol name (case-sensitive)
        name: String,
        /// Restrict the lookup to a module or compilation unit
        #[arg(long)]
        scope: Option<String>,
        /// Kind of object to look for
        #[arg(long, value_enum, default_value_t = KindArg::Any)]
        kind: KindArg,
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Print the platform context of the target
    Platform
    {
        #[command(flatten)]
        target: TargetArgs,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum KindArg
{
    Constant,
    Function,
    Variable,
    Any,
}

impl From<KindArg> for FindKind
{
    fn from(kind: KindArg) -> Self
    {
        match kind {
            KindArg::Constant => FindKind::CONSTANT,
            KindArg::Function => FindKind::FUNCTION,
            KindArg::Variable => FindKind::VARIABLE,
            KindArg::Any => FindKind::ANY,
        }
    }
}

#[derive(Args, Debug)]
struct TargetArgs
{
    /// ELF core dump (vmcore, /proc/kcore, or a process core)
    #[arg(long, conflicts_with = "pid")]
    core: Option<PathBuf>,
    /// Live process to read through /proc/<pid>/mem
    #[arg(long)]
    pid: Option<u32>,
    /// System.map, /proc/kallsyms or an ELF file with a symbol table
    #[arg(long)]
    symbols: Option<PathBuf>,
    /// Kernel .config
    #[arg(long)]
    config: Option<PathBuf>,
    /// Kernel release (uname -r); makes the target a kernel
    #[arg(long)]
    release: Option<String>,
    /// Target architecture (defaults to the core's, then the host's)
    #[arg(long)]
    arch: Option<Architecture>,
}

fn host_arch() -> Architecture
{
    std::env::consts::ARCH.parse().unwrap_or(Architecture::X86_64)
}

fn load_symbols(path: &Path) -> KscopeResult<SymbolTable>
{
    let data = std::fs::read(path)?;
    if data.starts_with(b"\x7fELF") {
        SymbolTable::from_elf(&data)
    } else {
        let text = String::from_utf8(data).map_err(|err| KscopeError::Parse(format!("{}: {err}", path.display())))?;
        SymbolTable::parse_system_map(&text)
    }
}

/// Kernel release of the running system, for /proc/kcore
fn running_release() -> Option<String>
{
    std::fs::read_to_string("/proc/sys/kernel/osrelease")
        .ok()
        .map(|release| release.trim().to_string())
}

#[cfg(unix)]
fn open_core(path: &Path, builder: PlatformBuilder, arch_given: bool) -> KscopeResult<(Arc<dyn MemoryReader>, PlatformBuilder)>
{
    let core = CoreDump::open(path)?;
    let builder = if arch_given { builder } else { PlatformBuilder::new(core.architecture()) };
    let mut builder = builder.word_size(core.word_size()).byte_order(core.byte_order());
    if path == Path::new("/proc/kcore") {
        if let Some(release) = running_release() {
            builder = builder.kernel_release(release);
        }
    }
    Ok((Arc::new(core), builder))
}

#[cfg(not(unix))]
fn open_core(_path: &Path, _builder: PlatformBuilder, _arch_given: bool) -> KscopeResult<(Arc<dyn MemoryReader>, PlatformBuilder)>
{
    Err(KscopeError::InvalidArgument("core dumps are only supported on Unix".to_string()))
}

#[cfg(target_os = "linux")]
fn attach_process(pid: u32) -> KscopeResult<Arc<dyn MemoryReader>>
{
    Ok(Arc::new(ProcessMemory::attach(pid)?))
}

#[cfg(not(target_os = "linux"))]
fn attach_process(_pid: u32) -> KscopeResult<Arc<dyn MemoryReader>>
{
    Err(KscopeError::InvalidArgument("live processes are only supported on Linux".to_string()))
}

fn build_program(target: &TargetArgs) -> KscopeResult<Program>
{
    let builder = PlatformBuilder::new(target.arch.unwrap_or_else(host_arch));
    let (memory, mut builder): (Arc<dyn MemoryReader>, _) = match (&target.core, target.pid) {
        (Some(path), _) => open_core(path, builder, target.arch.is_some())?,
        (None, Some(pid)) => (attach_process(pid)?, builder),
        (None, None) => (Arc::new(SegmentMemory::new()) as Arc<dyn MemoryReader>, builder),
    };
    if let Some(release) = &target.release {
        builder = builder.kernel_release(release.clone());
    }
    if let Some(path) = &target.config {
        builder = builder.kernel_config(KernelConfig::from_path(path)?);
    }
    let platform = builder.build()?;
    info!(%platform, "target ready");

    let mut program = Program::new(platform, memory);
    if let Some(path) = &target.symbols {
        program = program.with_symbols(load_symbols(path)?);
    }
    Ok(program)
}

fn describe_value(program: &Program, object: &Object) -> KscopeResult<String>
{
    let ty = object.ty();
    if ty.is_integer_like() {
        let value = program.read_unsigned(object)?;
        if ty.is_signed() {
            return Ok(format!("{} (0x{value:x})", program.read_signed(object)?));
        }
        return Ok(format!("{value} (0x{value:x})"));
    }
    if let TypeKind::Array { element, .. } = ty.kind() {
        if element.is_integer_like() && element.byte_size() == Some(1) {
            let text = object.read_c_string(program.memory())?;
            return Ok(format!("{:?}", String::from_utf8_lossy(&text)));
        }
    }
    let bytes = program.read(object)?;
    Ok(bytes.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(" "))
}

fn print_object(program: &Program, name: &str, object: &Object)
{
    println!("{name}:");
    println!("  Type: {}", object.ty());
    match object.kind() {
        ObjectKind::Value => println!("  Kind: value"),
        ObjectKind::Reference => match object.address() {
            Some(address) => println!("  Kind: reference at {address}"),
            None => println!("  Kind: register reference"),
        },
        ObjectKind::Absent => {
            println!("  Kind: absent");
            return;
        }
    }
    match describe_value(program, object) {
        Ok(value) => println!("  Value: {value}"),
        Err(err) => println!("  Value: <{err}>"),
    }
}

fn print_platform(program: &Program)
{
    let platform = program.platform();
    println!("Platform:");
    println!("  Architecture: {}", platform.arch());
    println!("  Word size: {}", platform.word_size());
    println!("  Byte order: {}", platform.byte_order());
    match platform.kernel() {
        Some(kernel) => {
            println!("  Kernel release: {}", kernel.release());
            if let Some(version) = kernel.version() {
                println!("  Kernel version: {version}");
            }
            println!("  Config options: {}", kernel.config().len());
        }
        None => println!("  Kernel: no"),
    }
    println!("  Symbols: {}", program.symbols().len());
    println!("  Resolvers: {}", program.registry().names().join(", "));
}

fn run_command(cli: Cli) -> KscopeResult<()>
{
    match cli.command {
        Commands::Find {
            name,
            scope,
            kind,
            target,
        } => {
            let program = build_program(&target)?;
            match program.find(&name, scope.as_deref(), kind.into())? {
                Some(object) => {
                    print_object(&program, &name, &object);
                    Ok(())
                }
                None => Err(KscopeError::NotFound(name)),
            }
        }
        Commands::Platform { target } => {
            let program = build_program(&target)?;
            print_platform(&program);
            Ok(())
        }
    }
}

fn main()
{
    let cli = Cli::parse();

    let mut config = match LogConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            process::exit(1);
        }
    };
    if let Some(level) = cli.log_level {
        config = config.with_level(level);
    }
    if cli.log_to_file {
        match default_log_file() {
            Ok(path) => config = config.with_file(path),
            Err(e) => eprintln!("Not logging to file: {}", e),
        }
    }
    let _guard = match init_logging(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli) {
        eprintln!("Error: {}", e);
        process::exit(if e.is_not_found() { 2 } else { 1 });
    }
}
