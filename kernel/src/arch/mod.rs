// Architecture primitives
//
// The polled console needs exactly one CPU instruction Rust cannot
// express: halting until the next interrupt. Used by the panic path.
//
// Unsupported architectures spin instead.

#[inline(always)]
pub fn halt() {
    #[cfg(target_arch = "x86_64")]
    x86_64::instructions::hlt();

    #[cfg(target_arch = "aarch64")]
    unsafe {
        core::arch::asm!("wfi", options(nomem, nostack, preserves_flags));
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    loop {
        core::hint::spin_loop();
    }
}
