#![no_main]

use kestrel_vm::{BufferDevice, INITIAL_CAPACITY, MODULO, Vm};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(mut vm) = Vm::load(data) else {
        return;
    };
    let mut dev = BufferDevice::new(b"fuzz\n");
    dev.checkpoint_on_eof = true;

    // Faults are fine, as long as the machine stays consistent
    let _ = vm.run_until(&mut dev, |vm, i| {
        let s = vm.stack();
        assert!(s.len() <= s.capacity());
        assert!(s.capacity() >= INITIAL_CAPACITY);
        assert!(s.capacity().is_power_of_two());
        i > 65536
    });
    assert!(vm.registers().iter().all(|&r| r < MODULO));

    // Whatever state we ended up in must survive a checkpoint
    let bytes = vm.to_snapshot();
    let restored = Vm::from_snapshot(&bytes).expect("snapshot rejected");
    assert_eq!(restored.to_snapshot(), bytes);
});
