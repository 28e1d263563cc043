#![no_main]

use kestrel_vm::Vm;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(vm) = Vm::from_snapshot(data) else {
        return;
    };
    let bytes = vm.to_snapshot();
    assert!(data.starts_with(&bytes), "re-encoded snapshot differs");
});
