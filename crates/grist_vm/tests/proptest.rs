//! Property-based tests for the literal encoders and the assemble/run
//! pipeline.

use grist_vm::encoder::{decode_hex, decode_int, encode_byte, encode_int};
use grist_vm::{assemble, Interpreter, InterpreterConfig, RunOutcome};
use proptest::prelude::*;

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn arb_source() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::char::range('\0', '\x7f'), 0..128)
        .prop_map(|v| v.into_iter().collect())
}

proptest! {
    #[test]
    fn byte_literals_round_trip(value in any::<u8>()) {
        prop_assert_eq!(encode_byte(&value.to_string()), Ok(value));
    }

    #[test]
    fn byte_literals_above_255_fail(value in 256u32..) {
        prop_assert!(encode_byte(&value.to_string()).is_err());
    }

    #[test]
    fn int_literals_round_trip(value in any::<i32>()) {
        let bytes = encode_int(&value.to_string()).unwrap();
        prop_assert_eq!(decode_int(bytes), value);
    }

    #[test]
    fn int_literals_outside_i32_fail(
        value in prop_oneof![
            i64::MIN..i64::from(i32::MIN),
            (i64::from(i32::MAX) + 1)..=i64::MAX,
        ]
    ) {
        prop_assert!(encode_int(&value.to_string()).is_err());
    }

    #[test]
    fn hex_round_trips(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        prop_assert_eq!(decode_hex(&to_hex(&bytes)).unwrap(), bytes.clone());
        prop_assert_eq!(decode_hex(&to_hex(&bytes).to_uppercase()).unwrap(), bytes);
    }

    #[test]
    fn odd_length_hex_fails(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let mut text = to_hex(&bytes);
        text.push('a');
        prop_assert!(decode_hex(&text).is_err());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// The assembler never panics, whatever the input.
    #[test]
    fn no_panic_on_arbitrary_source(input in arb_source()) {
        let _ = assemble(&input);
    }

    /// Nor does the interpreter on arbitrary bytes.
    #[test]
    fn no_panic_on_arbitrary_program(
        program in prop::collection::vec(any::<u8>(), 0..64),
        registers in 0usize..=16,
    ) {
        let config = InterpreterConfig::new()
            .with_register_count(registers)
            .with_stack_size(16);
        let mut vm = Interpreter::with_config(&program, config).unwrap();
        if let Ok(outcome) = vm.run_with_fuel(1000) {
            // Every instruction is at least one byte long.
            let halted = matches!(outcome, RunOutcome::Halted { steps } if steps <= 64);
            prop_assert!(halted, "did not halt within the program length: {:?}", outcome);
        }
        let _ = vm.dump();
    }

    #[test]
    fn assembled_xor_matches_native(a in any::<i32>(), b in any::<i32>()) {
        let source = format!("setreg 0 int {a}\nsetreg 1 int {b}\nxor 0 1");
        let program = assemble(&source).unwrap();
        let mut vm = Interpreter::new(&program).unwrap();
        vm.run().unwrap();
        prop_assert_eq!(vm.registers()[0], a ^ b);
        prop_assert_eq!(vm.registers()[1], b);
    }
}
