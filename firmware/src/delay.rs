use embedded_hal::delay::DelayNs;

/// Busy-wait delay, calibrated for a 16MHz core clock.
pub struct BusyDelay;

impl DelayNs for BusyDelay {
    fn delay_ns(&mut self, ns: u32) {
        // ~4 cycles per iteration = 250ns
        for _ in 0..ns.div_ceil(250) {
            unsafe { core::arch::asm!("nop") };
        }
    }

    fn delay_ms(&mut self, ms: u32) {
        for _ in 0..ms {
            // 16000 cycles / 4 cycles per iteration
            for _ in 0..4000u16 {
                unsafe { core::arch::asm!("nop") };
            }
        }
    }
}
