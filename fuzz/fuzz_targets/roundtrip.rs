#![no_main]
use libfuzzer_sys::fuzz_target;
use mfbf::{decode, encode, prologue, Error, Opcode};

fuzz_target!(|data: &[u8]| {
    // Property: decode(encode(x)) == prologue ++ x restricted to BF opcodes,
    // and encode fails exactly when the brackets are unbalanced.
    let mut depth = 0i64;
    let mut balanced = true;
    for &c in data {
        match c {
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                balanced &= depth >= 0;
            }
            _ => {}
        }
    }
    balanced &= depth == 0;

    match encode(data, 16) {
        Ok(mf) => {
            assert!(balanced, "encoded unbalanced input");
            let bf = decode(&mf).expect("decode failed on encoder output");
            let mut expected: Vec<u8> = Vec::new();
            prologue(16, &mut expected);
            expected.extend(data.iter().copied().filter(|c| Opcode::from_bf(*c).is_some()));
            assert_eq!(bf, expected);
        }
        Err(Error::UnbalancedBrackets { .. }) => assert!(!balanced),
        Err(e) => panic!("encode failed: {:?}", e),
    }
});
