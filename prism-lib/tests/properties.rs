use prism_lib::core::*;
use prism_lib::vm::{NativeTable, Vm, VmConfig};
use proptest::prelude::*;

proptest! {
    #[test]
    fn leaving_scopes_restores_bindings(
        names in prop::collection::vec("[a-d]", 0..24),
    ) {
        let mut table = SymbolTable::new();
        table.define("a", DataType::String, true, false, Datum::Slot(0));
        let before = table.depth();

        for (i, name) in names.iter().enumerate() {
            table.enter_scope();
            table.define(name, DataType::Int, false, false, Datum::Slot(i as u16 + 1));
        }
        for _ in &names {
            table.exit_scope();
        }

        prop_assert_eq!(table.depth(), before);
        let entry = table.lookup("a").cloned();
        prop_assert_eq!(entry.map(|e| (e.dtype, e.datum)), Some((DataType::String, Datum::Slot(0))));
        for name in ["b", "c", "d"] {
            prop_assert!(table.lookup(name).is_none());
        }
    }

    #[test]
    fn jumps_land_where_patched(skipped in 0usize..=MAX_JUMP) {
        let mut chunk = Chunk::new("<script>", 0);
        let at = chunk.emit_jump(OpCode::Jump, 1);
        chunk.code.resize(chunk.code.len() + skipped, OpCode::Nop as u8);
        chunk.lines.resize(chunk.code.len(), 1);
        chunk.patch_jump(at).unwrap();
        prop_assert_eq!(chunk.read_u16(at), Some(skipped as u16));

        chunk.emit_constant(Value::Int(1), 2).unwrap();
        chunk.emit(OpCode::Return, 2);
        let module = Module {
            chunks: vec![chunk],
            natives: NativeTable::new(),
            slot_count: 0,
        };
        let mut vm = Vm::new(&module, VmConfig::default());
        prop_assert_eq!(vm.step().map(|_| vm.position()), Ok((0, 3 + skipped)));
        prop_assert_eq!(vm.run(), Ok(Value::Int(1)));
    }
}

#[test]
fn jumps_past_the_limit_are_rejected() {
    let mut chunk = Chunk::new("<script>", 0);
    let at = chunk.emit_jump(OpCode::JumpIfFalse, 1);
    chunk.code.resize(chunk.code.len() + MAX_JUMP + 1, OpCode::Nop as u8);
    assert_eq!(chunk.patch_jump(at), Err(ChunkError::JumpTooLarge));
}
