//! Tests for the resolver chain through `Program`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use kscope_core::finder::{
    CatalogEntry, DebugInfoFinder, FindContext, FindKind, FindRequest, FnResolver, Placement, Resolution,
    Resolver, StaticCatalog,
};
use kscope_core::kernel::{KernelFinder, SyntheticSymbol};
use kscope_core::memory::{MemoryReader, SegmentMemory};
use kscope_core::object::Object;
use kscope_core::platform::{Platform, PlatformBuilder};
use kscope_core::symbols::SymbolTable;
use kscope_core::types::{Address, Architecture, CPrimitive};
use kscope_core::{KscopeError, Program, Result};

/// Memory backend that counts reads and their sizes
struct CountingMemory
{
    inner: SegmentMemory,
    reads: AtomicUsize,
    last_length: AtomicUsize,
}

impl CountingMemory
{
    fn new(inner: SegmentMemory) -> Self
    {
        Self {
            inner,
            reads: AtomicUsize::new(0),
            last_length: AtomicUsize::new(0),
        }
    }
}

impl MemoryReader for CountingMemory
{
    fn read_memory(&self, address: Address, length: usize) -> Result<Vec<u8>>
    {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.last_length.store(length, Ordering::SeqCst);
        self.inner.read_memory(address, length)
    }
}

fn kernel_platform() -> Platform
{
    PlatformBuilder::new(Architecture::X86_64)
        .kernel_release("6.6.0")
        .build()
        .unwrap()
}

fn int_constant(program: &Program, value: i64) -> Object
{
    Object::from_signed(program.primitive(CPrimitive::Int), value, program.platform().byte_order()).unwrap()
}

fn fixed(name: &'static str, value: i64) -> Arc<dyn Resolver>
{
    Arc::new(FnResolver::new(
        name,
        move |ctx: &FindContext<'_>, request: &FindRequest<'_>| -> Result<Resolution> {
            if request.name != "answer" {
                return Ok(Resolution::NotApplicable);
            }
            let int = ctx.primitive(CPrimitive::Int);
            Ok(Resolution::Found(Object::from_signed(int, value, ctx.platform.byte_order())?))
        },
    ))
}

#[test]
fn test_first_match_wins_in_order()
{
    let mut program = Program::new(kernel_platform(), Arc::new(SegmentMemory::new()));
    program.register(fixed("one", 1), Placement::Last);
    program.register(fixed("two", 2), Placement::Last);
    assert_eq!(program.read_signed(&program.constant("answer").unwrap()).unwrap(), 1);

    program.register(fixed("zero", 0), Placement::First);
    assert_eq!(program.read_signed(&program.constant("answer").unwrap()).unwrap(), 0);
}

#[test]
fn test_disjoint_resolvers_commute()
{
    let page_size = |first: Placement| {
        let mut program = Program::new(kernel_platform(), Arc::new(SegmentMemory::new()));
        let hz = int_constant(&program, 250);
        let catalog = StaticCatalog::new().with(CatalogEntry::constant("HZ", hz));
        program.register(Arc::new(DebugInfoFinder::new(catalog)), first);
        (
            program.read_unsigned(&program.constant("PAGE_SIZE").unwrap()).unwrap(),
            program.read_signed(&program.constant("HZ").unwrap()).unwrap(),
        )
    };
    assert_eq!(page_size(Placement::First), page_size(Placement::Last));
    assert_eq!(page_size(Placement::Last), (4096, 250));
}

#[test]
fn test_debug_info_first_shadows_synthetic()
{
    let mut program = Program::new(kernel_platform(), Arc::new(SegmentMemory::new()));
    let fake = Object::from_unsigned(program.primitive(CPrimitive::UnsignedLong), 8192, program.platform().byte_order())
        .unwrap();
    let catalog = StaticCatalog::new().with(CatalogEntry::constant("PAGE_SIZE", fake));
    program.register(Arc::new(DebugInfoFinder::new(catalog)), Placement::First);
    assert_eq!(program.read_unsigned(&program.constant("PAGE_SIZE").unwrap()).unwrap(), 8192);
}

#[test]
fn test_unknown_name_is_not_found()
{
    let program = Program::new(kernel_platform(), Arc::new(SegmentMemory::new()));
    assert!(program.find("init_task", None, FindKind::ANY).unwrap().is_none());
    assert!(program.object("init_task", FindKind::ANY).unwrap_err().is_not_found());
}

#[test]
fn test_wrong_kind_is_not_found()
{
    let program = Program::new(kernel_platform(), Arc::new(SegmentMemory::new()));
    assert!(program.find("PAGE_SIZE", None, FindKind::VARIABLE).unwrap().is_none());
    assert!(program.find("PAGE_SIZE", None, FindKind::FUNCTION).unwrap().is_none());
}

/// A synthetic name requested under the wrong kind ends the lookup, so a
/// later resolver that does know a variable of that name is never asked.
/// Callers that need such a variable must register their resolver first.
#[test]
fn test_wrong_kind_shadows_later_resolvers()
{
    let mut program = Program::new(kernel_platform(), Arc::new(SegmentMemory::new()));
    let variable = int_constant(&program, 7);
    let catalog = StaticCatalog::new().with(CatalogEntry::variable("PAGE_SIZE", variable));
    program.register(Arc::new(DebugInfoFinder::new(catalog.clone())), Placement::Last);
    assert!(program.find("PAGE_SIZE", None, FindKind::VARIABLE).unwrap().is_none());

    program.register(Arc::new(DebugInfoFinder::named("early", catalog)), Placement::First);
    assert!(program.find("PAGE_SIZE", None, FindKind::VARIABLE).unwrap().is_some());
}

#[test]
fn test_scoped_request_skips_synthetic_symbols()
{
    let mut program = Program::new(kernel_platform(), Arc::new(SegmentMemory::new()));
    assert!(program.find("PAGE_SIZE", Some("mm"), FindKind::CONSTANT).unwrap().is_none());

    let scoped = int_constant(&program, 16384);
    let catalog = StaticCatalog::new().with(CatalogEntry::constant("PAGE_SIZE", scoped).in_scope("mm"));
    program.register(Arc::new(DebugInfoFinder::new(catalog)), Placement::Last);
    let object = program.find("PAGE_SIZE", Some("mm"), FindKind::CONSTANT).unwrap().unwrap();
    assert_eq!(program.read_signed(&object).unwrap(), 16384);
    // an empty scope is the same as no scope
    let object = program.find("PAGE_SIZE", Some(""), FindKind::CONSTANT).unwrap().unwrap();
    assert_eq!(program.read_unsigned(&object).unwrap(), 4096);
}

#[test]
fn test_scoped_synthetic_names_reach_debug_info_for_every_kind()
{
    let mut program = Program::new(kernel_platform(), Arc::new(SegmentMemory::new()));
    let marker = int_constant(&program, -1);
    let mut catalog = StaticCatalog::new();
    for symbol in SyntheticSymbol::ALL {
        catalog.insert(CatalogEntry::constant(symbol.name(), marker.clone()).in_scope("drivers/gpu"));
        catalog.insert(CatalogEntry::variable(symbol.name(), marker.clone()).in_scope("drivers/gpu"));
        catalog.insert(CatalogEntry::function(symbol.name(), marker.clone()).in_scope("drivers/gpu"));
    }
    program.register(Arc::new(DebugInfoFinder::new(catalog)), Placement::Last);

    for symbol in SyntheticSymbol::ALL {
        for kind in [FindKind::CONSTANT, FindKind::FUNCTION, FindKind::VARIABLE, FindKind::ANY] {
            let object = program
                .find(symbol.name(), Some("drivers/gpu"), kind)
                .unwrap()
                .unwrap_or_else(|| panic!("{symbol} as {kind} not found"));
            assert_eq!(program.read_signed(&object).unwrap(), -1, "{symbol} as {kind}");
        }
    }
}

#[test]
fn test_hard_error_stops_the_chain()
{
    let mut program = Program::new(kernel_platform(), Arc::new(SegmentMemory::new()));
    program.register(
        Arc::new(FnResolver::new("faulty", |_: &FindContext<'_>, _: &FindRequest<'_>| -> Result<Resolution> {
            Err(KscopeError::Fault {
                address: Address::from(0x1000),
                length: 8,
            })
        })),
        Placement::First,
    );
    program.register(fixed("never", 1), Placement::Last);
    let err = program.find("answer", None, FindKind::ANY).unwrap_err();
    assert!(err.is_memory_error());
}

#[test]
fn test_jiffies_reads_one_word_per_access()
{
    let mut segment = SegmentMemory::new();
    segment
        .add_segment(Address::from(0xffff_ffff_8200_5000), 1_000_000u64.to_le_bytes().to_vec())
        .unwrap();
    let memory = Arc::new(CountingMemory::new(segment));
    let symbols = SymbolTable::parse_system_map("ffffffff82005000 D jiffies_64\n").unwrap();
    let program = Program::new(kernel_platform(), memory.clone()).with_symbols(symbols);

    assert!(program.find("jiffies", None, FindKind::CONSTANT).unwrap().is_none());
    let jiffies = program.variable("jiffies").unwrap();
    assert_eq!(memory.reads.load(Ordering::SeqCst), 0);

    assert_eq!(program.read_unsigned(&jiffies).unwrap(), 1_000_000);
    assert_eq!(memory.reads.load(Ordering::SeqCst), 1);
    assert_eq!(memory.last_length.load(Ordering::SeqCst), 8);

    program.read(&jiffies).unwrap();
    assert_eq!(memory.reads.load(Ordering::SeqCst), 2);
}

#[test]
fn test_jiffies_fault_propagates_on_read()
{
    let symbols = SymbolTable::parse_system_map("ffffffff82005000 D jiffies_64\n").unwrap();
    let program = Program::new(kernel_platform(), Arc::new(SegmentMemory::new())).with_symbols(symbols);
    let jiffies = program.variable("jiffies").unwrap();
    let err = program.read_unsigned(&jiffies).unwrap_err();
    assert!(matches!(err, KscopeError::Fault { .. }));
}

#[test]
fn test_registry_names()
{
    let mut program = Program::new(kernel_platform(), Arc::new(SegmentMemory::new()));
    program.register(Arc::new(DebugInfoFinder::new(StaticCatalog::new())), Placement::Last);
    assert_eq!(program.registry().names(), vec![KernelFinder::NAME, "debug-info"]);
    assert!(program.registry_mut().unregister(KernelFinder::NAME).is_some());
    assert!(program.find("PAGE_SIZE", None, FindKind::ANY).unwrap().is_none());
}
