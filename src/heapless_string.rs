//! heapless_string.rs — fixed-capacity strings for trace lines
use core::fmt::Write;

pub type HeaplessString<const N: usize> = heapless::String<N>;

/// Pushes characters one at a time so a piece that does not fit is cut, not dropped.
struct Truncating<'a, const N: usize> {
    out: &'a mut HeaplessString<N>,
}

impl<const N: usize> Write for Truncating<'_, N> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        for c in s.chars() {
            self.out.push(c).map_err(|_| core::fmt::Error)?;
        }
        Ok(())
    }
}

/// Format into a fixed-capacity string, keeping as many characters as fit.
pub fn format_heapless<const N: usize>(args: core::fmt::Arguments<'_>) -> HeaplessString<N> {
    let mut out = HeaplessString::<N>::new();
    // a full buffer ends formatting; what fit is the result
    let _ = Truncating { out: &mut out }.write_fmt(args);
    out
}
