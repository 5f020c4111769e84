use isaforge::toolchain::{CodeSizeQuery, ElfInspector, KernelEnumerator};
use isaforge::PipelineError;
use object::write::{Object, Symbol, SymbolSection};
use object::{Architecture, BinaryFormat, Endianness, SectionKind, SymbolFlags, SymbolKind, SymbolScope};
use std::path::Path;

/// Function symbols `(name, size, global)` in `.text`, and kernel descriptors
/// for `descriptors` in `.rodata`.
fn code_object(functions: &[(&str, u64, bool)], descriptors: &[&str]) -> Vec<u8> {
    let mut obj = Object::new(BinaryFormat::Elf, Architecture::X86_64, Endianness::Little);
    let text = obj.add_section(Vec::new(), b".text".to_vec(), SectionKind::Text);
    let rodata = obj.add_section(Vec::new(), b".rodata".to_vec(), SectionKind::ReadOnlyData);

    for &(name, size, global) in functions {
        let offset = obj.append_section_data(text, &vec![0u8; size.max(4) as usize], 16);
        obj.add_symbol(Symbol {
            name: name.as_bytes().to_vec(),
            value: offset,
            size,
            kind: SymbolKind::Text,
            scope: if global { SymbolScope::Dynamic } else { SymbolScope::Compilation },
            weak: false,
            section: SymbolSection::Section(text),
            flags: SymbolFlags::None,
        });
    }
    for name in descriptors {
        let offset = obj.append_section_data(rodata, &[0u8; 64], 64);
        obj.add_symbol(Symbol {
            name: format!("{name}.kd").into_bytes(),
            value: offset,
            size: 64,
            kind: SymbolKind::Data,
            scope: SymbolScope::Dynamic,
            weak: false,
            section: SymbolSection::Section(rodata),
            flags: SymbolFlags::None,
        });
    }
    obj.write().unwrap()
}

fn write_object(dir: &Path, bytes: &[u8]) -> std::path::PathBuf {
    let path = dir.join("kernels.bin");
    std::fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn test_kernels_are_symbols_with_descriptors() {
    let dir = tempfile::tempdir().unwrap();
    let binary = write_object(
        dir.path(),
        &code_object(&[("vadd", 64, true), ("helper", 32, true), ("vmul", 128, true)], &["vadd", "vmul"]),
    );

    let inspector = ElfInspector::new();
    assert_eq!(inspector.kernel_names(&binary).unwrap(), vec!["vadd".to_string(), "vmul".to_string()]);
    assert_eq!(inspector.kernel_code_size(&binary, "vadd").unwrap(), Some(64));
    assert_eq!(inspector.kernel_code_size(&binary, "vmul").unwrap(), Some(128));
    assert_eq!(inspector.kernel_code_size(&binary, "missing").unwrap(), None);
}

#[test]
fn test_global_functions_without_descriptors() {
    let dir = tempfile::tempdir().unwrap();
    let binary = write_object(dir.path(), &code_object(&[("k1", 16, true), ("local_fn", 16, false)], &[]));

    let names = ElfInspector::new().kernel_names(&binary).unwrap();
    assert_eq!(names, vec!["k1".to_string()]);
}

#[test]
fn test_zero_size_is_absent() {
    let dir = tempfile::tempdir().unwrap();
    let binary = write_object(dir.path(), &code_object(&[("k1", 0, true)], &["k1"]));
    assert_eq!(ElfInspector::new().kernel_code_size(&binary, "k1").unwrap(), None);
}

#[test]
fn test_not_an_object_file() {
    let dir = tempfile::tempdir().unwrap();
    let binary = write_object(dir.path(), b"not an ELF file");
    let err = ElfInspector::new().kernel_names(&binary).unwrap_err();
    assert!(matches!(err, PipelineError::CodeObject { .. }));
}
